use super::path::VariablePath;
use super::span::{SourcePos, Spanned};
use super::value::Value;

/// A template is the top-level AST unit. It contains a sequence of nodes
/// whose rendered outputs are concatenated to produce the final result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
}

pub type Node = Spanned<NodeKind>;

/// The kinds of content that can appear in a template.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Raw text between tags, emitted verbatim.
    Text(String),

    /// `{{ base|filter:arg|... }}` in output position.
    Variable(FilterExpression),

    /// `{# ... #}`. Produces nothing.
    Comment,

    /// `{% if ... %}...{% elif ... %}...{% else %}...{% endif %}`
    If(IfBlock),

    /// `{% for item in ... %}...{% empty %}...{% endfor %}`
    For(ForBlock),

    /// `{% filter name %}...{% endfilter %}`: renders the body, then passes
    /// the resulting string through a filter.
    FilterBlock(FilterBlock),
}

/// The operand of a filter expression or a filter argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `"text"`, `42`, `true`, `none`
    Literal(Value),
    /// `user.name`
    Variable(VariablePath),
}

impl Operand {
    pub fn as_path(&self) -> Option<&VariablePath> {
        match self {
            Operand::Variable(path) => Some(path),
            Operand::Literal(_) => None,
        }
    }
}

/// A value followed by a chain of filters, e.g. `user.name|default:"N/A"|upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    pub base: Spanned<Operand>,
    pub filters: Vec<Spanned<FilterCall>>,
}

impl FilterExpression {
    /// Position of the outermost part of the chain: the last filter call,
    /// or the base when there are no filters.
    pub fn outer_pos(&self) -> Option<SourcePos> {
        match self.filters.last() {
            Some(call) => call.pos,
            None => self.base.pos,
        }
    }
}

/// One `|name` or `|name:arg` link of a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub arg: Option<Spanned<Operand>>,
}

/// An `if`/`elif` test: an optionally negated filter expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub negated: bool,
    pub expr: FilterExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBlock {
    pub condition: Condition,
    pub body: Template,
    pub elif_branches: Vec<ElifBranch>,
    pub else_body: Option<Template>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElifBranch {
    pub condition: Condition,
    pub body: Template,
}

/// A `{% for binding in iterable %}...{% endfor %}` block.
///
/// The binding and a `forloop` record live in a frame pushed for the
/// duration of the loop; they shadow outer entries of the same name and
/// do not leak after the loop ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ForBlock {
    pub binding: String,
    pub iterable: FilterExpression,
    pub body: Template,
    /// Rendered instead of the body when the iterable yields nothing.
    pub empty: Option<Template>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterBlock {
    pub filter: Spanned<FilterCall>,
    pub body: Template,
}
