// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Pre-order traversal that tolerates edits.
//!
//! [`walk`] keeps an explicit stack of [`NodePath`]s instead of recursing.
//! Each path is resolved against the tree only when it is popped, and a
//! node's children are listed only after the node itself has been visited.
//! A visitor may therefore rewrite the visited node, its subtree, or the slot
//! it occupies in its parent's list:
//!
//! - removing the visited node (or replacing it with several) shifts the
//!   pending paths of its later siblings so none is skipped or repeated;
//! - a slot that no longer resolves is skipped;
//! - nodes inserted by the visitor are not visited.
//!
//! [`inspect`] is the read-only counterpart, handing out borrowed
//! [`NodeRef`]s in the same order.

use std::mem::discriminant;

use retemplate_core::location::SourceSpan;

use crate::nodes::*;

// ============================================================================
// Paths
// ============================================================================

/// One edge from a node to a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Entry of a statement list: template/program body, element children,
    /// concat parts.
    Statement(usize),
    Program,
    Inverse,
    /// The helper path of a mustache, block, modifier or sub-expression.
    Head,
    Param(usize),
    Hash,
    Pair(usize),
    /// The value of a hash pair.
    Value,
    Attribute(usize),
    Modifier(usize),
    /// A mustache comment inside an element start tag.
    TagComment(usize),
    /// The value of an attribute.
    AttrValue,
}

impl Step {
    /// Position in a list, for steps into lists.
    pub fn index(self) -> Option<usize> {
        match self {
            Step::Statement(i)
            | Step::Param(i)
            | Step::Pair(i)
            | Step::Attribute(i)
            | Step::Modifier(i)
            | Step::TagComment(i) => Some(i),
            _ => None,
        }
    }

    fn with_index(self, index: usize) -> Step {
        match self {
            Step::Statement(_) => Step::Statement(index),
            Step::Param(_) => Step::Param(index),
            Step::Pair(_) => Step::Pair(index),
            Step::Attribute(_) => Step::Attribute(index),
            Step::Modifier(_) => Step::Modifier(index),
            Step::TagComment(_) => Step::TagComment(index),
            other => other,
        }
    }
}

/// Location of a node as the steps taken from the template root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<Step>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn child(&self, step: Step) -> NodePath {
        let mut steps = self.0.clone();
        steps.push(step);
        NodePath(steps)
    }

    pub fn parent(&self) -> Option<NodePath> {
        let (_, init) = self.0.split_last()?;
        Some(NodePath(init.to_vec()))
    }

    pub fn last(&self) -> Option<Step> {
        self.0.last().copied()
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Move this path by `delta` if it points at a later sibling of
    /// `parent`'s entry `at`.
    fn shift_sibling(&mut self, parent: &NodePath, at: Step, delta: isize) {
        let depth = parent.0.len();
        if self.0.len() <= depth || self.0[..depth] != parent.0[..] {
            return;
        }
        let step = self.0[depth];
        if discriminant(&step) != discriminant(&at) {
            return;
        }
        if let (Some(index), Some(origin)) = (step.index(), at.index()) {
            if index > origin {
                self.0[depth] = step.with_index(index.saturating_add_signed(delta));
            }
        }
    }
}

// ============================================================================
// Node views
// ============================================================================

/// A borrowed view of any node in a template.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Template(&'a Template),
    Program(&'a Program),
    Block(&'a BlockStatement),
    Mustache(&'a MustacheStatement),
    Element(&'a ElementNode),
    Text(&'a TextNode),
    Comment(&'a CommentStatement),
    MustacheComment(&'a MustacheCommentStatement),
    Concat(&'a ConcatStatement),
    Attribute(&'a AttrNode),
    Modifier(&'a ElementModifierStatement),
    Path(&'a PathExpression),
    SubExpression(&'a SubExpression),
    Literal(&'a Literal),
    Hash(&'a Hash),
    HashPair(&'a HashPair),
}

/// A mutable view of any node in a template.
#[derive(Debug)]
pub enum NodeMut<'a> {
    Template(&'a mut Template),
    Program(&'a mut Program),
    Block(&'a mut BlockStatement),
    Mustache(&'a mut MustacheStatement),
    Element(&'a mut ElementNode),
    Text(&'a mut TextNode),
    Comment(&'a mut CommentStatement),
    MustacheComment(&'a mut MustacheCommentStatement),
    Concat(&'a mut ConcatStatement),
    Attribute(&'a mut AttrNode),
    Modifier(&'a mut ElementModifierStatement),
    Path(&'a mut PathExpression),
    SubExpression(&'a mut SubExpression),
    Literal(&'a mut Literal),
    Hash(&'a mut Hash),
    HashPair(&'a mut HashPair),
}

impl<'a> From<&'a Statement> for NodeRef<'a> {
    fn from(statement: &'a Statement) -> Self {
        match statement {
            Statement::Mustache(node) => NodeRef::Mustache(node),
            Statement::Block(node) => NodeRef::Block(node),
            Statement::Element(node) => NodeRef::Element(node),
            Statement::Text(node) => NodeRef::Text(node),
            Statement::MustacheComment(node) => NodeRef::MustacheComment(node),
            Statement::Comment(node) => NodeRef::Comment(node),
        }
    }
}

impl<'a> From<&'a Expression> for NodeRef<'a> {
    fn from(expression: &'a Expression) -> Self {
        match expression {
            Expression::Path(node) => NodeRef::Path(node),
            Expression::SubExpression(node) => NodeRef::SubExpression(node),
            Expression::Literal(node) => NodeRef::Literal(node),
        }
    }
}

impl<'a> From<&'a AttrValue> for NodeRef<'a> {
    fn from(value: &'a AttrValue) -> Self {
        match value {
            AttrValue::Text(node) => NodeRef::Text(node),
            AttrValue::Mustache(node) => NodeRef::Mustache(node),
            AttrValue::Concat(node) => NodeRef::Concat(node),
        }
    }
}

impl<'a> From<&'a mut Statement> for NodeMut<'a> {
    fn from(statement: &'a mut Statement) -> Self {
        match statement {
            Statement::Mustache(node) => NodeMut::Mustache(node),
            Statement::Block(node) => NodeMut::Block(node),
            Statement::Element(node) => NodeMut::Element(node),
            Statement::Text(node) => NodeMut::Text(node),
            Statement::MustacheComment(node) => NodeMut::MustacheComment(node),
            Statement::Comment(node) => NodeMut::Comment(node),
        }
    }
}

impl<'a> From<&'a mut Expression> for NodeMut<'a> {
    fn from(expression: &'a mut Expression) -> Self {
        match expression {
            Expression::Path(node) => NodeMut::Path(node),
            Expression::SubExpression(node) => NodeMut::SubExpression(node),
            Expression::Literal(node) => NodeMut::Literal(node),
        }
    }
}

impl<'a> From<&'a mut AttrValue> for NodeMut<'a> {
    fn from(value: &'a mut AttrValue) -> Self {
        match value {
            AttrValue::Text(node) => NodeMut::Text(node),
            AttrValue::Mustache(node) => NodeMut::Mustache(node),
            AttrValue::Concat(node) => NodeMut::Concat(node),
        }
    }
}

fn call_child<'a>(
    path: &'a Expression,
    params: &'a [Expression],
    hash: &'a Hash,
    step: Step,
) -> Option<NodeRef<'a>> {
    match step {
        Step::Head => Some(path.into()),
        Step::Param(i) => params.get(i).map(NodeRef::from),
        Step::Hash => Some(NodeRef::Hash(hash)),
        _ => None,
    }
}

fn call_child_mut<'a>(
    path: &'a mut Expression,
    params: &'a mut [Expression],
    hash: &'a mut Hash,
    step: Step,
) -> Option<NodeMut<'a>> {
    match step {
        Step::Head => Some(path.into()),
        Step::Param(i) => params.get_mut(i).map(NodeMut::from),
        Step::Hash => Some(NodeMut::Hash(hash)),
        _ => None,
    }
}

fn call_steps(params: &[Expression], steps: &mut Vec<Step>) {
    steps.push(Step::Head);
    steps.extend((0..params.len()).map(Step::Param));
    steps.push(Step::Hash);
}

impl<'a> NodeRef<'a> {
    /// Short name of the node kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            NodeRef::Template(_) => "Template",
            NodeRef::Program(_) => "Program",
            NodeRef::Block(_) => "BlockStatement",
            NodeRef::Mustache(_) => "MustacheStatement",
            NodeRef::Element(_) => "ElementNode",
            NodeRef::Text(_) => "TextNode",
            NodeRef::Comment(_) => "CommentStatement",
            NodeRef::MustacheComment(_) => "MustacheCommentStatement",
            NodeRef::Concat(_) => "ConcatStatement",
            NodeRef::Attribute(_) => "AttrNode",
            NodeRef::Modifier(_) => "ElementModifierStatement",
            NodeRef::Path(_) => "PathExpression",
            NodeRef::SubExpression(_) => "SubExpression",
            NodeRef::Literal(_) => "Literal",
            NodeRef::Hash(_) => "Hash",
            NodeRef::HashPair(_) => "HashPair",
        }
    }

    /// The child reached by `step`, if there is one.
    pub fn child(self, step: Step) -> Option<NodeRef<'a>> {
        match (self, step) {
            (NodeRef::Template(t), Step::Statement(i)) => t.body.get(i).map(NodeRef::from),
            (NodeRef::Program(p), Step::Statement(i)) => p.body.get(i).map(NodeRef::from),
            (NodeRef::Block(b), Step::Program) => Some(NodeRef::Program(&b.program)),
            (NodeRef::Block(b), Step::Inverse) => b.inverse.as_ref().map(NodeRef::Program),
            (NodeRef::Block(b), step) => call_child(&b.path, &b.params, &b.hash, step),
            (NodeRef::Mustache(m), step) => call_child(&m.path, &m.params, &m.hash, step),
            (NodeRef::Modifier(m), step) => call_child(&m.path, &m.params, &m.hash, step),
            (NodeRef::SubExpression(s), step) => call_child(&s.path, &s.params, &s.hash, step),
            (NodeRef::Hash(h), Step::Pair(i)) => h.pairs.get(i).map(NodeRef::HashPair),
            (NodeRef::HashPair(p), Step::Value) => Some((&p.value).into()),
            (NodeRef::Element(e), Step::Attribute(i)) => e.attributes.get(i).map(NodeRef::Attribute),
            (NodeRef::Element(e), Step::Modifier(i)) => e.modifiers.get(i).map(NodeRef::Modifier),
            (NodeRef::Element(e), Step::TagComment(i)) => {
                e.comments.get(i).map(NodeRef::MustacheComment)
            }
            (NodeRef::Element(e), Step::Statement(i)) => e.children.get(i).map(NodeRef::from),
            (NodeRef::Attribute(a), Step::AttrValue) => a.value.as_ref().map(NodeRef::from),
            (NodeRef::Concat(c), Step::Statement(i)) => c.parts.get(i).map(NodeRef::from),
            _ => None,
        }
    }

    /// Steps to every child, in document order.
    pub fn child_steps(self) -> Vec<Step> {
        let mut steps = Vec::new();
        match self {
            NodeRef::Template(t) => steps.extend((0..t.body.len()).map(Step::Statement)),
            NodeRef::Program(p) => steps.extend((0..p.body.len()).map(Step::Statement)),
            NodeRef::Block(b) => {
                call_steps(&b.params, &mut steps);
                steps.push(Step::Program);
                if b.inverse.is_some() {
                    steps.push(Step::Inverse);
                }
            }
            NodeRef::Mustache(m) => call_steps(&m.params, &mut steps),
            NodeRef::Modifier(m) => call_steps(&m.params, &mut steps),
            NodeRef::SubExpression(s) => call_steps(&s.params, &mut steps),
            NodeRef::Hash(h) => steps.extend((0..h.pairs.len()).map(Step::Pair)),
            NodeRef::HashPair(_) => steps.push(Step::Value),
            NodeRef::Element(e) => {
                let mut tag_parts: Vec<(SourceSpan, Step)> = Vec::new();
                tag_parts.extend(e.attributes.iter().enumerate().map(|(i, a)| (a.span, Step::Attribute(i))));
                tag_parts.extend(e.modifiers.iter().enumerate().map(|(i, m)| (m.span, Step::Modifier(i))));
                tag_parts.extend(e.comments.iter().enumerate().map(|(i, c)| (c.span, Step::TagComment(i))));
                tag_parts.sort_by_key(|(span, _)| (span.is_synthetic(), span.start));
                steps.extend(tag_parts.into_iter().map(|(_, step)| step));
                steps.extend((0..e.children.len()).map(Step::Statement));
            }
            NodeRef::Attribute(a) => {
                if a.value.is_some() {
                    steps.push(Step::AttrValue);
                }
            }
            NodeRef::Concat(c) => steps.extend((0..c.parts.len()).map(Step::Statement)),
            NodeRef::Text(_)
            | NodeRef::Comment(_)
            | NodeRef::MustacheComment(_)
            | NodeRef::Path(_)
            | NodeRef::Literal(_) => {}
        }
        steps
    }

    /// Length of the list that `step` indexes into.
    fn list_len(self, step: Step) -> Option<usize> {
        match (self, step) {
            (NodeRef::Template(t), Step::Statement(_)) => Some(t.body.len()),
            (NodeRef::Program(p), Step::Statement(_)) => Some(p.body.len()),
            (NodeRef::Element(e), Step::Statement(_)) => Some(e.children.len()),
            (NodeRef::Concat(c), Step::Statement(_)) => Some(c.parts.len()),
            (NodeRef::Element(e), Step::Attribute(_)) => Some(e.attributes.len()),
            (NodeRef::Element(e), Step::Modifier(_)) => Some(e.modifiers.len()),
            (NodeRef::Element(e), Step::TagComment(_)) => Some(e.comments.len()),
            (NodeRef::Block(b), Step::Param(_)) => Some(b.params.len()),
            (NodeRef::Mustache(m), Step::Param(_)) => Some(m.params.len()),
            (NodeRef::Modifier(m), Step::Param(_)) => Some(m.params.len()),
            (NodeRef::SubExpression(s), Step::Param(_)) => Some(s.params.len()),
            (NodeRef::Hash(h), Step::Pair(_)) => Some(h.pairs.len()),
            _ => None,
        }
    }
}

impl Spanned for NodeRef<'_> {
    fn span(&self) -> SourceSpan {
        match self {
            NodeRef::Template(n) => n.span,
            NodeRef::Program(n) => n.span,
            NodeRef::Block(n) => n.span,
            NodeRef::Mustache(n) => n.span,
            NodeRef::Element(n) => n.span,
            NodeRef::Text(n) => n.span,
            NodeRef::Comment(n) => n.span,
            NodeRef::MustacheComment(n) => n.span,
            NodeRef::Concat(n) => n.span,
            NodeRef::Attribute(n) => n.span,
            NodeRef::Modifier(n) => n.span,
            NodeRef::Path(n) => n.span,
            NodeRef::SubExpression(n) => n.span,
            NodeRef::Literal(n) => n.span,
            NodeRef::Hash(n) => n.span,
            NodeRef::HashPair(n) => n.span,
        }
    }
}

impl<'a> NodeMut<'a> {
    /// The child reached by `step`, if there is one.
    pub fn child(self, step: Step) -> Option<NodeMut<'a>> {
        match (self, step) {
            (NodeMut::Template(t), Step::Statement(i)) => t.body.get_mut(i).map(NodeMut::from),
            (NodeMut::Program(p), Step::Statement(i)) => p.body.get_mut(i).map(NodeMut::from),
            (NodeMut::Block(b), Step::Program) => Some(NodeMut::Program(&mut b.program)),
            (NodeMut::Block(b), Step::Inverse) => b.inverse.as_mut().map(NodeMut::Program),
            (NodeMut::Block(b), step) => call_child_mut(&mut b.path, &mut b.params, &mut b.hash, step),
            (NodeMut::Mustache(m), step) => {
                call_child_mut(&mut m.path, &mut m.params, &mut m.hash, step)
            }
            (NodeMut::Modifier(m), step) => {
                call_child_mut(&mut m.path, &mut m.params, &mut m.hash, step)
            }
            (NodeMut::SubExpression(s), step) => {
                call_child_mut(&mut s.path, &mut s.params, &mut s.hash, step)
            }
            (NodeMut::Hash(h), Step::Pair(i)) => h.pairs.get_mut(i).map(NodeMut::HashPair),
            (NodeMut::HashPair(p), Step::Value) => Some((&mut p.value).into()),
            (NodeMut::Element(e), Step::Attribute(i)) => {
                e.attributes.get_mut(i).map(NodeMut::Attribute)
            }
            (NodeMut::Element(e), Step::Modifier(i)) => e.modifiers.get_mut(i).map(NodeMut::Modifier),
            (NodeMut::Element(e), Step::TagComment(i)) => {
                e.comments.get_mut(i).map(NodeMut::MustacheComment)
            }
            (NodeMut::Element(e), Step::Statement(i)) => e.children.get_mut(i).map(NodeMut::from),
            (NodeMut::Attribute(a), Step::AttrValue) => a.value.as_mut().map(NodeMut::from),
            (NodeMut::Concat(c), Step::Statement(i)) => c.parts.get_mut(i).map(NodeMut::from),
            _ => None,
        }
    }

    /// The statement list this node owns, if any.
    pub fn into_statements(self) -> Option<&'a mut Vec<Statement>> {
        match self {
            NodeMut::Template(t) => Some(&mut t.body),
            NodeMut::Program(p) => Some(&mut p.body),
            NodeMut::Element(e) => Some(&mut e.children),
            NodeMut::Concat(c) => Some(&mut c.parts),
            _ => None,
        }
    }
}

/// Follow `path` from the root.
pub fn resolve<'a>(template: &'a Template, path: &NodePath) -> Option<NodeRef<'a>> {
    path.0
        .iter()
        .try_fold(NodeRef::Template(template), |node, &step| node.child(step))
}

/// Follow `path` from the root, mutably.
pub fn resolve_mut<'a>(template: &'a mut Template, path: &NodePath) -> Option<NodeMut<'a>> {
    path.0
        .iter()
        .try_fold(NodeMut::Template(template), |node, &step| node.child(step))
}

// ============================================================================
// Traversal
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitResult {
    Continue,
    /// Do not descend into the visited node.
    SkipChildren,
    /// End the walk.
    Stop,
}

/// Called once per node by [`walk`]. The visitor receives the whole tree so
/// that it can edit the visited node's parent as well as the node itself.
pub trait Visitor {
    fn visit(&mut self, template: &mut Template, path: &NodePath) -> VisitResult;
}

impl<F> Visitor for F
where
    F: FnMut(&mut Template, &NodePath) -> VisitResult,
{
    fn visit(&mut self, template: &mut Template, path: &NodePath) -> VisitResult {
        self(template, path)
    }
}

/// Number of entries in the list holding the node at `path`.
fn sibling_count(template: &Template, path: &NodePath) -> Option<usize> {
    let step = path.last()?;
    step.index()?;
    resolve(template, &path.parent()?)?.list_len(step)
}

/// Visit every node of `template` in document order, root first.
pub fn walk<V: Visitor + ?Sized>(template: &mut Template, visitor: &mut V) {
    let mut stack = vec![NodePath::root()];

    while let Some(path) = stack.pop() {
        if resolve(template, &path).is_none() {
            continue;
        }

        let before = sibling_count(template, &path);
        match visitor.visit(template, &path) {
            VisitResult::Stop => return,
            VisitResult::SkipChildren => continue,
            VisitResult::Continue => {}
        }
        let after = sibling_count(template, &path);

        if let (Some(before), Some(after)) = (before, after) {
            if before != after {
                // The visited slot was replaced; its old children are gone.
                if let (Some(parent), Some(step)) = (path.parent(), path.last()) {
                    let delta = after as isize - before as isize;
                    for pending in &mut stack {
                        pending.shift_sibling(&parent, step, delta);
                    }
                }
                continue;
            }
        }

        if let Some(node) = resolve(template, &path) {
            stack.extend(node.child_steps().into_iter().rev().map(|step| path.child(step)));
        }
    }
}

/// Visit every node of `template` in document order without mutating it.
pub fn inspect<'a, F>(template: &'a Template, mut f: F)
where
    F: FnMut(NodeRef<'a>, &NodePath) -> VisitResult,
{
    let mut stack = vec![NodePath::root()];

    while let Some(path) = stack.pop() {
        let Some(node) = resolve(template, &path) else {
            continue;
        };
        match f(node, &path) {
            VisitResult::Stop => return,
            VisitResult::SkipChildren => continue,
            VisitResult::Continue => {}
        }
        stack.extend(node.child_steps().into_iter().rev().map(|step| path.child(step)));
    }
}
