//! Binary entry point for the retemplate CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Parse and print every template (restyles mustache quotes only)
//! retemplate rewrite app/templates --single-quote-mustache
//!
//! # Run one migration
//! retemplate convert-each-in app/templates
//!
//! # Preview without writing
//! retemplate --dry-run convert-content-modal app/templates/modal.hbs
//!
//! # Run the formulas listed in an options file
//! retemplate --config retemplate.json rewrite
//! ```
//!
//! Output is a single JSON report on stdout. Logs go to stderr.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use retemplate::cli::run_rewrite;
use retemplate::error::{OutputErrorCode, RewriteError};
use retemplate::formulas;
use retemplate::output::{emit_response, ErrorResponse, FormulasResponse};
use retemplate::{QuoteStyle, RewriteOptions};

// ============================================================================
// CLI Structure
// ============================================================================

/// Rewrite Handlebars templates with targeted migration formulas.
#[derive(Parser, Debug)]
#[command(name = "retemplate", version, about = "Rewrite Handlebars templates")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for stderr output. `RUST_LOG` takes precedence.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// JSON options file: `{"formulas": [...], "quotes": {"mustache": "'"}}`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report what would change without writing any file.
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// A template path plus the quote flags every rewrite command takes.
#[derive(Args, Debug)]
struct Target {
    /// Template file or directory to search for `.hbs` files.
    #[arg(default_value = "app/templates")]
    path: PathBuf,

    /// Single quotes in mustache expressions.
    #[arg(long, conflicts_with = "double_quote_mustache")]
    single_quote_mustache: bool,

    /// Double quotes in mustache expressions (default).
    #[arg(long)]
    double_quote_mustache: bool,
}

impl Target {
    fn quote(&self) -> Option<QuoteStyle> {
        if self.single_quote_mustache {
            Some(QuoteStyle::Single)
        } else if self.double_quote_mustache {
            Some(QuoteStyle::Double)
        } else {
            None
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and print. Runs the formulas from `--config`, if any.
    Rewrite(Target),
    /// Replace {{bind-attr attr=bound}} with attr={{bound}}.
    ConvertBindAttr(Target),
    /// Replace {{#each person in people}} with {{#each people as |person|}}.
    ConvertEachIn(Target),
    /// Replace {{foo barBinding="baz"}} with {{foo bar=baz}}.
    ConvertBindings(Target),
    /// Replace {{#content-modal}} with {{#content-modal-v2}}.
    ConvertContentModal(Target),
    /// List the registered formulas.
    Formulas,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(code) => code,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<ExitCode, RewriteError> {
    let (target, formula) = match &cli.command {
        Command::Formulas => {
            let names = formulas::names().map(str::to_string).collect();
            emit(&FormulasResponse::new(names))?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Rewrite(target) => (target, None),
        Command::ConvertBindAttr(target) => (target, Some("convert-bind-attr")),
        Command::ConvertEachIn(target) => (target, Some("convert-each-in")),
        Command::ConvertBindings(target) => (target, Some("convert-bindings")),
        Command::ConvertContentModal(target) => (target, Some("convert-content-modal")),
    };

    let options = load_options(cli.global.config.as_deref(), target, formula)?;
    let response = run_rewrite(&target.path, &options, cli.global.dry_run)?;
    emit(&response)?;

    Ok(match response.first_error_code() {
        Some(code) => ExitCode::from(code),
        None => ExitCode::SUCCESS,
    })
}

/// Options from the config file, with the command's formula and quote flags
/// taking precedence.
fn load_options(
    config: Option<&Path>,
    target: &Target,
    formula: Option<&str>,
) -> Result<RewriteOptions, RewriteError> {
    let mut options = match config {
        Some(path) => RewriteOptions::load(path)?,
        None => RewriteOptions::default(),
    };
    if let Some(formula) = formula {
        options.formulas = vec![formula.to_string()];
    }
    if let Some(quote) = target.quote() {
        options = options.with_mustache_quote(quote);
    }
    Ok(options)
}

fn emit<T: serde::Serialize>(response: &T) -> Result<(), RewriteError> {
    let mut stdout = io::stdout();
    emit_response(response, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}
