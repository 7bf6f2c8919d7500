//! Template parser, built on [pest](https://pest.rs/).
//!
//! The grammar is defined in `template.pest`. This module converts pest's
//! parse tree into the typed AST defined in [`crate::ast`], stamping every
//! node, filter call and operand with its 1-based source position.
//!
//! Filter names are not checked here: the interpreter looks them up at
//! render time and the compiler at compile time.

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;

use crate::ast::path::VariablePath;
use crate::ast::span::{SourcePos, Span, Spanned};
use crate::ast::template::*;
use crate::ast::value::Value;
use crate::error::ParseError;

#[derive(Parser)]
#[grammar = "parser/template.pest"]
struct TemplateParser;

type ParseResult<T> = Result<T, Vec<ParseError>>;

/// Parse source text into a [`Template`] AST.
///
/// Returns a list of [`ParseError`]s if the source contains invalid syntax.
/// Each error carries a byte [`Span`] for diagnostic formatting.
pub fn parse(source: &str) -> ParseResult<Template> {
    let pairs = TemplateParser::parse(Rule::template, source).map_err(|e| {
        let span = pest_span_to_span(&e);
        vec![ParseError::new(span, format!("parse error: {e}"))]
    })?;

    let mut nodes = Vec::new();

    // TemplateParser::parse returns a top-level `template` pair whose
    // children are the actual nodes.
    for pair in pairs {
        if pair.as_rule() == Rule::template {
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::EOI => break,
                    _ => nodes.push(build_node(inner)?),
                }
            }
        }
    }

    Ok(Template { nodes })
}

/// Parse a single filter expression such as `user.name|default:"N/A"`.
///
/// Useful for hosts that build nodes programmatically.
pub fn parse_filter_expression(source: &str) -> ParseResult<FilterExpression> {
    let mut pairs = TemplateParser::parse(Rule::filter_expression, source).map_err(|e| {
        let span = pest_span_to_span(&e);
        vec![ParseError::new(span, format!("parse error: {e}"))]
    })?;
    let pair = child(&mut pairs, Span::new(0, source.len()), "filter expression")?;
    if pair.as_span().end() != source.len() {
        let end = pair.as_span().end();
        return Err(vec![ParseError::new(
            Span::new(end, source.len()),
            "unexpected trailing input after filter expression",
        )]);
    }
    build_filter_expression(pair)
}

fn pest_span_to_span(e: &pest::error::Error<Rule>) -> Span {
    match &e.location {
        pest::error::InputLocation::Pos(p) => Span::new(*p, *p + 1),
        pest::error::InputLocation::Span((s, e)) => Span::new(*s, *e),
    }
}

fn pair_span(pair: &Pair<Rule>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

fn pair_pos(pair: &Pair<Rule>) -> SourcePos {
    // `Pair::line_col` uses pest's line index, shared by the whole parse.
    let (line, column) = pair.line_col();
    SourcePos::new(line as u32, column as u32)
}

/// Take the next child the grammar guarantees, reporting a parse error
/// rather than panicking if the tree is not shaped as expected.
fn child<'i>(pairs: &mut Pairs<'i, Rule>, span: Span, what: &str) -> ParseResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| vec![ParseError::new(span, format!("expected {what}"))])
}

// -- Node building -------------------------------------------------------

fn build_node(pair: Pair<Rule>) -> ParseResult<Node> {
    let span = pair_span(&pair);
    let pos = pair_pos(&pair);

    match pair.as_rule() {
        Rule::text => Ok(Spanned::new(NodeKind::Text(pair.as_str().to_string()), pos)),
        Rule::comment => Ok(Spanned::new(NodeKind::Comment, pos)),
        Rule::variable_tag => {
            let mut inner = pair.into_inner();
            let expr = build_filter_expression(child(&mut inner, span, "filter expression")?)?;
            Ok(Spanned::new(NodeKind::Variable(expr), pos))
        }
        Rule::if_block => Ok(Spanned::new(NodeKind::If(build_if_block(pair)?), pos)),
        Rule::for_block => Ok(Spanned::new(NodeKind::For(build_for_block(pair)?), pos)),
        Rule::filter_block => {
            let mut inner = pair.into_inner();
            let filter = build_filter_call(child(&mut inner, span, "filter name")?)?;
            let body = build_body(inner)?;
            Ok(Spanned::new(
                NodeKind::FilterBlock(FilterBlock { filter, body }),
                pos,
            ))
        }
        rule => Err(vec![ParseError::new(
            span,
            format!("unexpected rule in node position: {rule:?}"),
        )]),
    }
}

fn build_body(pairs: Pairs<Rule>) -> ParseResult<Template> {
    let mut nodes = Vec::new();
    for pair in pairs {
        nodes.push(build_node(pair)?);
    }
    Ok(Template { nodes })
}

// -- Filter expressions --------------------------------------------------

fn build_filter_expression(pair: Pair<Rule>) -> ParseResult<FilterExpression> {
    let span = pair_span(&pair);
    let mut inner = pair.into_inner();

    let base = build_operand(child(&mut inner, span, "value")?)?;
    let mut filters = Vec::new();
    for call in inner {
        filters.push(build_filter_call(call)?);
    }

    Ok(FilterExpression { base, filters })
}

fn build_filter_call(pair: Pair<Rule>) -> ParseResult<Spanned<FilterCall>> {
    let span = pair_span(&pair);
    let pos = pair_pos(&pair);
    let mut inner = pair.into_inner();

    let name = child(&mut inner, span, "filter name")?.as_str().to_string();
    let arg = match inner.next() {
        Some(arg) => Some(build_operand(arg)?),
        None => None,
    };

    Ok(Spanned::new(FilterCall { name, arg }, pos))
}

fn build_operand(pair: Pair<Rule>) -> ParseResult<Spanned<Operand>> {
    let span = pair_span(&pair);
    let pos = pair_pos(&pair);

    let operand = match pair.as_rule() {
        Rule::path => {
            let path = VariablePath::parse(pair.as_str()).ok_or_else(|| {
                vec![ParseError::new(
                    span,
                    format!("invalid variable path: {}", pair.as_str()),
                )]
            })?;
            Operand::Variable(path)
        }
        Rule::quoted_string => Operand::Literal(Value::String(extract_string_content(pair))),
        Rule::number => {
            let n: f64 = pair.as_str().parse().map_err(|_| {
                vec![ParseError::new(
                    span,
                    format!("invalid number: {}", pair.as_str()),
                )]
            })?;
            Operand::Literal(Value::Number(n))
        }
        Rule::bool_literal => Operand::Literal(Value::Bool(pair.as_str() == "true")),
        Rule::none_literal => Operand::Literal(Value::None),
        rule => {
            return Err(vec![ParseError::new(
                span,
                format!("unexpected rule in operand position: {rule:?}"),
            )]);
        }
    };

    Ok(Spanned::new(operand, pos))
}

// -- Control flow building -----------------------------------------------

fn build_condition(pair: Pair<Rule>) -> ParseResult<Condition> {
    let span = pair_span(&pair);
    let mut inner = pair.into_inner().peekable();

    let negated = inner
        .next_if(|p| p.as_rule() == Rule::negation)
        .is_some();
    let expr_pair = inner
        .next()
        .ok_or_else(|| vec![ParseError::new(span, "expected condition")])?;

    Ok(Condition {
        negated,
        expr: build_filter_expression(expr_pair)?,
    })
}

fn build_if_block(pair: Pair<Rule>) -> ParseResult<IfBlock> {
    let span = pair_span(&pair);
    let mut inner = pair.into_inner();

    let condition = build_condition(child(&mut inner, span, "condition")?)?;

    let mut body_nodes = Vec::new();
    let mut elif_branches = Vec::new();
    let mut else_body = None;

    for child_pair in inner {
        match child_pair.as_rule() {
            Rule::elif_branch => {
                let elif_span = pair_span(&child_pair);
                let mut elif_inner = child_pair.into_inner();
                let elif_condition =
                    build_condition(child(&mut elif_inner, elif_span, "condition")?)?;
                elif_branches.push(ElifBranch {
                    condition: elif_condition,
                    body: build_body(elif_inner)?,
                });
            }
            Rule::else_branch => {
                else_body = Some(build_body(child_pair.into_inner())?);
            }
            _ => body_nodes.push(build_node(child_pair)?),
        }
    }

    Ok(IfBlock {
        condition,
        body: Template { nodes: body_nodes },
        elif_branches,
        else_body,
    })
}

fn build_for_block(pair: Pair<Rule>) -> ParseResult<ForBlock> {
    let span = pair_span(&pair);
    let mut inner = pair.into_inner();

    let binding = child(&mut inner, span, "loop variable")?.as_str().to_string();
    let iterable = build_filter_expression(child(&mut inner, span, "iterable")?)?;

    let mut body_nodes = Vec::new();
    let mut empty = None;
    for child_pair in inner {
        if child_pair.as_rule() == Rule::empty_branch {
            empty = Some(build_body(child_pair.into_inner())?);
        } else {
            body_nodes.push(build_node(child_pair)?);
        }
    }

    Ok(ForBlock {
        binding,
        iterable,
        body: Template { nodes: body_nodes },
        empty,
    })
}

// -- Helpers -------------------------------------------------------------

fn extract_string_content(pair: Pair<Rule>) -> String {
    let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");

    // Process escape sequences
    let mut result = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some('\\') => result.push('\\'),
                Some(c) => {
                    result.push('\\');
                    result.push(c);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    result
}
