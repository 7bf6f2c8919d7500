//! The standard filter set.

use crate::ast::value::Value;
use crate::error::RenderError;

use super::{ArgSpec, ClosureFilter, Registry};

pub(super) fn register_all(registry: &mut Registry) {
    registry.register_filter(ClosureFilter::new("default", ArgSpec::Required, default));
    registry.register_filter(ClosureFilter::new("upper", ArgSpec::None, |v, _| {
        Ok(Value::String(v.to_output_string().to_uppercase()))
    }));
    registry.register_filter(ClosureFilter::new("lower", ArgSpec::None, |v, _| {
        Ok(Value::String(v.to_output_string().to_lowercase()))
    }));
    registry.register_filter(ClosureFilter::new("capfirst", ArgSpec::None, |v, _| {
        Ok(Value::String(capitalize(&v.to_output_string())))
    }));
    registry.register_filter(ClosureFilter::new("title", ArgSpec::None, title));
    registry.register_filter(ClosureFilter::new("length", ArgSpec::None, length));
    registry.register_filter(ClosureFilter::new("first", ArgSpec::None, |v, _| {
        Ok(edge(v, true))
    }));
    registry.register_filter(ClosureFilter::new("last", ArgSpec::None, |v, _| {
        Ok(edge(v, false))
    }));
    registry.register_filter(ClosureFilter::new("join", ArgSpec::Required, join));
    registry.register_filter(ClosureFilter::new("add", ArgSpec::Required, add));
    registry.register_filter(ClosureFilter::new("yesno", ArgSpec::Optional, yesno));
}

/// The argument if the value is falsy, otherwise the value.
fn default(value: Value, arg: Option<Value>) -> Result<Value, RenderError> {
    if value.is_truthy() {
        Ok(value)
    } else {
        Ok(arg.unwrap_or(Value::None))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().chain(chars).collect(),
    }
}

fn title(value: Value, _arg: Option<Value>) -> Result<Value, RenderError> {
    let text = value.to_output_string();
    let titled = text
        .split(' ')
        .map(|word| capitalize(&word.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ");
    Ok(Value::String(titled))
}

fn length(value: Value, _arg: Option<Value>) -> Result<Value, RenderError> {
    let len = match &value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Map(entries) => entries.len(),
        _ => 0,
    };
    Ok(Value::from(len as i64))
}

fn edge(value: Value, first: bool) -> Value {
    match value {
        Value::Array(mut items) => {
            let item = if first {
                (!items.is_empty()).then(|| items.swap_remove(0))
            } else {
                items.pop()
            };
            item.unwrap_or(Value::None)
        }
        Value::String(s) => {
            let ch = if first { s.chars().next() } else { s.chars().last() };
            ch.map(|c| Value::String(c.to_string())).unwrap_or(Value::None)
        }
        _ => Value::None,
    }
}

fn join(value: Value, arg: Option<Value>) -> Result<Value, RenderError> {
    let separator = arg.map(|a| a.to_output_string()).unwrap_or_default();
    match value {
        Value::Array(items) => Ok(Value::String(
            items
                .iter()
                .map(Value::to_output_string)
                .collect::<Vec<_>>()
                .join(&separator),
        )),
        other => Ok(other),
    }
}

/// Numbers are summed, arrays concatenated, anything else involving a
/// string is concatenated as text. Other combinations yield an empty string.
fn add(value: Value, arg: Option<Value>) -> Result<Value, RenderError> {
    let arg = arg.unwrap_or(Value::None);
    Ok(match (value, arg) {
        (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Value::Array(a)
        }
        (a @ Value::String(_), b) | (a, b @ Value::String(_)) => {
            Value::String(format!("{}{}", a.to_output_string(), b.to_output_string()))
        }
        _ => Value::String(String::new()),
    })
}

/// `yesno:"yes,no,maybe"`. `None` maps to the third choice when given,
/// otherwise to the second.
fn yesno(value: Value, arg: Option<Value>) -> Result<Value, RenderError> {
    let spec = arg
        .map(|a| a.to_output_string())
        .unwrap_or_else(|| "yes,no,maybe".to_string());
    let choices: Vec<&str> = spec.split(',').collect();
    if choices.len() < 2 {
        return Err(RenderError::filter_argument(
            "yesno",
            "needs at least two comma-separated choices",
        ));
    }
    let picked = match value {
        Value::None => choices.get(2).copied().unwrap_or(choices[1]),
        v if v.is_truthy() => choices[0],
        _ => choices[1],
    };
    Ok(Value::String(picked.to_string()))
}
