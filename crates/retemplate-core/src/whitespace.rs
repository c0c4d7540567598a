//! Reversible encoding of whitespace-significant entities.
//!
//! Non-breaking spaces can be spelled several ways in template markup. Before
//! a template is parsed or searched, [`escape`] folds each spelling into its
//! own private-use placeholder character so that every later stage sees a
//! single stable character. [`unescape`] restores the original spelling on the
//! way out.
//!
//! Text that already contains a placeholder (or the escape marker itself) is
//! protected by prefixing the marker, so `unescape(&escape(s)) == s` for all
//! `s`.

/// Entity spellings and their placeholders.
const ENTITIES: [(&str, char); 5] = [
    ("&nbsp;", '\u{E000}'),
    ("&#160;", '\u{E001}'),
    ("&#xa0;", '\u{E002}'),
    ("&#xA0;", '\u{E003}'),
    ("\u{a0}", '\u{E004}'),
];

/// Marks the following character as literal input.
const MARKER: char = '\u{E0FF}';

fn is_reserved(ch: char) -> bool {
    ch == MARKER || ENTITIES.iter().any(|&(_, placeholder)| placeholder == ch)
}

/// Replace every non-breaking-space spelling with its placeholder.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    'scan: while let Some(ch) = rest.chars().next() {
        if ch == '&' || ch == '\u{a0}' {
            for &(entity, placeholder) in &ENTITIES {
                if let Some(after) = rest.strip_prefix(entity) {
                    out.push(placeholder);
                    rest = after;
                    continue 'scan;
                }
            }
        }
        if is_reserved(ch) {
            out.push(MARKER);
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out
}

/// Restore the spellings replaced by [`escape`].
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch == MARKER {
            if let Some(literal) = chars.next() {
                out.push(literal);
            }
            continue;
        }
        match ENTITIES.iter().find(|&&(_, placeholder)| placeholder == ch) {
            Some(&(entity, _)) => out.push_str(entity),
            None => out.push(ch),
        }
    }

    out
}
