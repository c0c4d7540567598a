// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Tree-wide span operations.
//!
//! [`SpansMut`] reaches every span a node owns, including those of all
//! transitive descendants: block bodies, inverse programs, hash values,
//! sub-expressions, attribute values and element children. Offsetting and
//! detaching are both built on it so that no kind of node is ever skipped.

use retemplate_core::location::{LocationError, Offset, Position, SourceSpan};

use crate::nodes::*;

/// The minimal span covering every positioned node in `nodes`.
///
/// # Errors
///
/// `LocationError::EmptyInput` when `nodes` holds no positioned node.
pub fn span_of<T: Spanned>(nodes: &[T]) -> Result<SourceSpan, LocationError> {
    SourceSpan::covering(nodes.iter().map(Spanned::span))
}

/// Shift every span in `root` for an edit that took effect at `starting_at`.
///
/// See [`Offset::shift`] for the per-span rule.
pub fn apply_offset<N: SpansMut + ?Sized>(root: &mut N, offset: &Offset, starting_at: Position) {
    if offset.is_zero() {
        return;
    }
    root.spans_mut(&mut |span| *span = offset.shift(*span, starting_at));
}

/// Mark `node` and everything under it as synthetic.
///
/// Used when a rewrite moves a subtree somewhere its old spans no longer
/// describe.
pub fn detach<N: SpansMut + ?Sized>(node: &mut N) {
    node.spans_mut(&mut |span| *span = SourceSpan::SYNTHETIC);
}

/// Visits every span owned by a node and its descendants.
pub trait SpansMut {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan));
}

impl<T: SpansMut> SpansMut for Vec<T> {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        for item in self.iter_mut() {
            item.spans_mut(f);
        }
    }
}

impl<T: SpansMut> SpansMut for Option<T> {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        if let Some(inner) = self {
            inner.spans_mut(f);
        }
    }
}

impl<T: SpansMut + ?Sized> SpansMut for Box<T> {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        (**self).spans_mut(f);
    }
}

impl SpansMut for Template {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        f(&mut self.span);
        self.body.spans_mut(f);
    }
}

impl SpansMut for Program {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        f(&mut self.span);
        f(&mut self.block_params_span);
        self.body.spans_mut(f);
    }
}

impl SpansMut for Statement {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        match self {
            Statement::Mustache(node) => node.spans_mut(f),
            Statement::Block(node) => node.spans_mut(f),
            Statement::Element(node) => node.spans_mut(f),
            Statement::Text(node) => f(&mut node.span),
            Statement::MustacheComment(node) => f(&mut node.span),
            Statement::Comment(node) => f(&mut node.span),
        }
    }
}

impl SpansMut for MustacheStatement {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        f(&mut self.span);
        self.path.spans_mut(f);
        self.params.spans_mut(f);
        self.hash.spans_mut(f);
    }
}

impl SpansMut for BlockStatement {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        f(&mut self.span);
        f(&mut self.open);
        self.path.spans_mut(f);
        self.params.spans_mut(f);
        self.hash.spans_mut(f);
        self.program.spans_mut(f);
        self.inverse.spans_mut(f);
    }
}

impl SpansMut for ElementNode {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        f(&mut self.span);
        f(&mut self.start_tag);
        f(&mut self.block_params_span);
        self.attributes.spans_mut(f);
        self.modifiers.spans_mut(f);
        for comment in &mut self.comments {
            f(&mut comment.span);
        }
        self.children.spans_mut(f);
    }
}

impl SpansMut for AttrNode {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        f(&mut self.span);
        self.value.spans_mut(f);
    }
}

impl SpansMut for AttrValue {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        match self {
            AttrValue::Text(node) => f(&mut node.span),
            AttrValue::Mustache(node) => node.spans_mut(f),
            AttrValue::Concat(node) => {
                f(&mut node.span);
                node.parts.spans_mut(f);
            }
        }
    }
}

impl SpansMut for ElementModifierStatement {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        f(&mut self.span);
        self.path.spans_mut(f);
        self.params.spans_mut(f);
        self.hash.spans_mut(f);
    }
}

impl SpansMut for Expression {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        match self {
            Expression::Path(node) => f(&mut node.span),
            Expression::Literal(node) => f(&mut node.span),
            Expression::SubExpression(node) => {
                f(&mut node.span);
                node.path.spans_mut(f);
                node.params.spans_mut(f);
                node.hash.spans_mut(f);
            }
        }
    }
}

impl SpansMut for Hash {
    fn spans_mut(&mut self, f: &mut dyn FnMut(&mut SourceSpan)) {
        f(&mut self.span);
        for pair in &mut self.pairs {
            f(&mut pair.span);
            pair.value.spans_mut(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use retemplate_core::location::offset_for;

    use super::*;
    use crate::parse_template;

    fn block(template: &Template, index: usize) -> &BlockStatement {
        match &template.body[index] {
            Statement::Block(block) => block,
            other => panic!("expected block, found {:?}", other),
        }
    }

    #[test]
    fn span_of_modifiers() {
        let template =
            parse_template("{{#if foo}}\n  <h1 {{bind-attr foo=bar baz=foo}}></h1>{{/if}}").unwrap();
        let Statement::Element(element) = &block(&template, 0).program.body[1] else {
            panic!("expected element");
        };
        let span = span_of(&element.modifiers).unwrap();
        assert_eq!(span.start, Position::new(2, 6));
        assert_eq!(span.end, Position::new(2, 35));
    }

    #[test]
    fn span_of_empty_fails() {
        let nodes: Vec<Statement> = Vec::new();
        assert_eq!(span_of(&nodes), Err(LocationError::EmptyInput));
    }

    #[test]
    fn offset_reaches_nested_nodes() {
        let mut template = parse_template(
            "{{#each person in people}}\n  {{#if person.ok}}{{format (upper person.name) x=1}}{{/if}}\n{{/each}}",
        )
        .unwrap();
        let removed = SourceSpan::new(Position::new(1, 8), Position::new(1, 18));
        let offset = offset_for(removed, SourceSpan::point(Position::new(1, 8)));
        apply_offset(&mut template, &offset, Position::new(1, 8));

        let each = block(&template, 0);
        // `people` moved left on the edited line
        assert_eq!(each.params[2].span().start, Position::new(1, 8));
        // the program starts where the shortened open tag ends
        assert_eq!(each.program.span.start, Position::new(1, 16));
        assert_eq!(each.open.end, Position::new(1, 16));
        // enclosing block keeps its start
        assert_eq!(each.span.start, Position::new(1, 0));

        // later lines keep their columns
        let Statement::Block(inner) = &each.program.body[1] else {
            panic!("expected inner block");
        };
        assert_eq!(inner.span.start, Position::new(2, 2));
        let Statement::Mustache(format) = &inner.program.body[0] else {
            panic!("expected mustache");
        };
        let Expression::SubExpression(upper) = &format.params[0] else {
            panic!("expected sub-expression");
        };
        assert_eq!(upper.params[0].span().start, Position::new(2, 35));
        assert_eq!(format.hash.pairs[0].value.span().start, Position::new(2, 50));
    }

    #[test]
    fn offset_across_lines() {
        let mut template =
            parse_template("{{#each person\n    in people}}\n{{person}}\n{{/each}}").unwrap();
        let each = block(&template, 0);
        let item = each.params[0].span();
        let collection = each.params[2].span();
        let offset = offset_for(
            SourceSpan::new(item.start, collection.start),
            SourceSpan::point(item.start),
        );
        apply_offset(&mut template, &offset, item.start);

        let each = block(&template, 0);
        assert_eq!(each.params[2].span().start, Position::new(1, 8));
        assert_eq!(each.params[2].span().end, Position::new(1, 14));
        assert_eq!(each.program.body[1].span().start, Position::new(2, 0));
        assert_eq!(each.span.end, Position::new(3, 9));
    }

    #[test]
    fn detach_clears_every_span() {
        let mut template = parse_template("<p class=\"a {{b}}\" {{on c}}>{{d (e f=g)}}</p>").unwrap();
        detach(&mut template);
        let mut seen = 0;
        template.spans_mut(&mut |span| {
            assert!(span.is_synthetic());
            seen += 1;
        });
        assert!(seen > 10);
    }
}
