// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Template syntax tree.
//!
//! Every node owns a [`SourceSpan`] assigned by the parser. Nodes built by
//! rewrites use [`SourceSpan::SYNTHETIC`]; the printer lays those out
//! canonically instead of reconstructing source spacing.

use retemplate_core::location::SourceSpan;

/// Anything that knows where it came from.
pub trait Spanned {
    fn span(&self) -> SourceSpan;
}

macro_rules! impl_spanned {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Spanned for $ty {
                fn span(&self) -> SourceSpan {
                    self.span
                }
            }
        )*
    };
}

impl_spanned!(
    Template,
    Program,
    MustacheStatement,
    BlockStatement,
    ElementNode,
    AttrNode,
    ElementModifierStatement,
    ConcatStatement,
    TextNode,
    CommentStatement,
    MustacheCommentStatement,
    PathExpression,
    SubExpression,
    Literal,
    Hash,
    HashPair,
);

// ============================================================================
// Programs
// ============================================================================

/// The root of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub body: Vec<Statement>,
    pub span: SourceSpan,
}

/// The body of a block, from the end of its open tag to the start of the
/// `{{else}}` or close tag that ends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub body: Vec<Statement>,
    /// Names bound with `as |a b|` on the owning block's open tag.
    pub block_params: Vec<String>,
    pub block_params_span: SourceSpan,
    pub span: SourceSpan,
}

impl Program {
    pub fn synthetic(body: Vec<Statement>) -> Self {
        Program {
            body,
            block_params: Vec::new(),
            block_params_span: SourceSpan::SYNTHETIC,
            span: SourceSpan::SYNTHETIC,
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Mustache(MustacheStatement),
    Block(Box<BlockStatement>),
    Element(Box<ElementNode>),
    Text(TextNode),
    MustacheComment(MustacheCommentStatement),
    Comment(CommentStatement),
}

impl Spanned for Statement {
    fn span(&self) -> SourceSpan {
        match self {
            Statement::Mustache(node) => node.span,
            Statement::Block(node) => node.span,
            Statement::Element(node) => node.span,
            Statement::Text(node) => node.span,
            Statement::MustacheComment(node) => node.span,
            Statement::Comment(node) => node.span,
        }
    }
}

/// `~` whitespace-control markers on either side of a tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripFlags {
    pub open: bool,
    pub close: bool,
}

/// `{{path params hash}}`, or `{{{...}}}` when `trusting`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MustacheStatement {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    pub trusting: bool,
    pub strip: StripFlags,
    pub span: SourceSpan,
}

impl MustacheStatement {
    pub fn synthetic(path: Expression, params: Vec<Expression>) -> Self {
        MustacheStatement {
            path,
            params,
            hash: Hash::default(),
            trusting: false,
            strip: StripFlags::default(),
            span: SourceSpan::SYNTHETIC,
        }
    }
}

/// `{{#path params hash as |x|}}...{{else}}...{{/path}}`.
///
/// An `{{else if ...}}` chain is an inverse program holding a single block
/// with `chained` set. A chained block owns no close tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStatement {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    pub program: Program,
    pub inverse: Option<Program>,
    pub chained: bool,
    pub open_strip: StripFlags,
    pub inverse_strip: StripFlags,
    pub close_strip: StripFlags,
    /// The open tag, `{{#...}}` (or `{{else ...}}` for a chained block).
    pub open: SourceSpan,
    pub span: SourceSpan,
}

impl BlockStatement {
    pub fn synthetic(path: &str, hash: Hash, program: Program) -> Self {
        BlockStatement {
            path: Expression::Path(PathExpression::synthetic(path)),
            params: Vec::new(),
            hash,
            program,
            inverse: None,
            chained: false,
            open_strip: StripFlags::default(),
            inverse_strip: StripFlags::default(),
            close_strip: StripFlags::default(),
            open: SourceSpan::SYNTHETIC,
            span: SourceSpan::SYNTHETIC,
        }
    }

    /// The helper name as written, for path heads.
    pub fn name(&self) -> Option<&str> {
        self.path.as_path().map(|path| path.original.as_str())
    }

    /// The inverse program's single chained block, if this is an else-if chain.
    pub fn chained_inverse(&self) -> Option<&BlockStatement> {
        match self.inverse.as_ref().map(|inverse| inverse.body.as_slice()) {
            Some([Statement::Block(block)]) if block.chained => Some(block.as_ref()),
            _ => None,
        }
    }
}

/// Literal markup: `<tag attrs modifiers as |x|>children</tag>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<AttrNode>,
    pub modifiers: Vec<ElementModifierStatement>,
    /// Mustache comments inside the start tag.
    pub comments: Vec<MustacheCommentStatement>,
    pub block_params: Vec<String>,
    pub block_params_span: SourceSpan,
    pub children: Vec<Statement>,
    pub self_closing: bool,
    pub start_tag: SourceSpan,
    pub span: SourceSpan,
}

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

impl ElementNode {
    /// Elements that never have a close tag.
    pub fn is_void(&self) -> bool {
        is_void_tag(&self.tag)
    }
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// `name`, `name=value`, `name="value"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrNode {
    pub name: String,
    pub value: Option<AttrValue>,
    /// The quote character around the value, if any.
    pub quote: Option<char>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Text(TextNode),
    Mustache(MustacheStatement),
    Concat(ConcatStatement),
}

impl Spanned for AttrValue {
    fn span(&self) -> SourceSpan {
        match self {
            AttrValue::Text(node) => node.span,
            AttrValue::Mustache(node) => node.span,
            AttrValue::Concat(node) => node.span,
        }
    }
}

/// A quoted attribute value mixing text and mustaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatStatement {
    /// Only `Statement::Text` and `Statement::Mustache` appear here.
    pub parts: Vec<Statement>,
    pub span: SourceSpan,
}

/// `{{helper params hash}}` in element start-tag position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementModifierStatement {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    pub span: SourceSpan,
}

impl ElementModifierStatement {
    pub fn name(&self) -> Option<&str> {
        self.path.as_path().map(|path| path.original.as_str())
    }
}

/// Raw template text, exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub chars: String,
    pub span: SourceSpan,
}

impl TextNode {
    pub fn synthetic(chars: impl Into<String>) -> Self {
        TextNode {
            chars: chars.into(),
            span: SourceSpan::SYNTHETIC,
        }
    }
}

/// `<!--value-->`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentStatement {
    pub value: String,
    pub span: SourceSpan,
}

/// `{{!value}}`, or `{{!--value--}}` when `long`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MustacheCommentStatement {
    pub value: String,
    pub long: bool,
    pub strip: StripFlags,
    pub span: SourceSpan,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Path(PathExpression),
    SubExpression(Box<SubExpression>),
    Literal(Literal),
}

impl Expression {
    pub fn as_path(&self) -> Option<&PathExpression> {
        match self {
            Expression::Path(path) => Some(path),
            _ => None,
        }
    }

    /// The first path segment, for path expressions.
    pub fn head(&self) -> Option<&str> {
        self.as_path()
            .and_then(|path| path.parts.first())
            .map(String::as_str)
    }
}

impl Spanned for Expression {
    fn span(&self) -> SourceSpan {
        match self {
            Expression::Path(node) => node.span,
            Expression::SubExpression(node) => node.span,
            Expression::Literal(node) => node.span,
        }
    }
}

/// A dotted reference: `foo.bar`, `this.foo`, `@index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    /// The path exactly as written.
    pub original: String,
    /// Segments after any `this` or `@` prefix.
    pub parts: Vec<String>,
    pub this: bool,
    pub data: bool,
    pub span: SourceSpan,
}

impl PathExpression {
    /// Build a path from its written form.
    pub fn new(original: &str, span: SourceSpan) -> Self {
        let data = original.starts_with('@');
        let body = original.trim_start_matches('@');
        let this = body == "this" || body.starts_with("this.") || body.starts_with("this/");
        let parts = body
            .split(['.', '/'])
            .enumerate()
            .filter(|&(i, part)| !part.is_empty() && !(this && i == 0) && part != "..")
            .map(|(_, part)| part.to_string())
            .collect();
        PathExpression {
            original: original.to_string(),
            parts,
            this,
            data,
            span,
        }
    }

    pub fn synthetic(original: &str) -> Self {
        PathExpression::new(original, SourceSpan::SYNTHETIC)
    }
}

/// A nested helper call: `(helper params hash)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubExpression {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    pub span: SourceSpan,
}

impl SubExpression {
    pub fn synthetic(helper: &str, params: Vec<Expression>) -> Self {
        SubExpression {
            path: Expression::Path(PathExpression::synthetic(helper)),
            params,
            hash: Hash::default(),
            span: SourceSpan::SYNTHETIC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: SourceSpan,
}

impl Literal {
    pub fn synthetic(value: LiteralValue) -> Self {
        Literal {
            value,
            span: SourceSpan::SYNTHETIC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralValue {
    String(String),
    Boolean(bool),
    /// Kept as written so it prints back unchanged.
    Number(String),
    Null,
    Undefined,
}

// ============================================================================
// Hashes
// ============================================================================

/// Named arguments, in source order. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hash {
    pub pairs: Vec<HashPair>,
    pub span: SourceSpan,
}

impl Hash {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Expression> {
        self.pairs
            .iter()
            .find(|pair| pair.key == key)
            .map(|pair| &pair.value)
    }

    /// Set `key`, replacing the value in place when it already exists.
    pub fn insert(&mut self, key: &str, value: Expression) {
        match self.pairs.iter_mut().find(|pair| pair.key == key) {
            Some(pair) => pair.value = value,
            None => self.pairs.push(HashPair::synthetic(key, value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashPair {
    pub key: String,
    pub value: Expression,
    pub span: SourceSpan,
}

impl HashPair {
    pub fn synthetic(key: &str, value: Expression) -> Self {
        HashPair {
            key: key.to_string(),
            value,
            span: SourceSpan::SYNTHETIC,
        }
    }
}
