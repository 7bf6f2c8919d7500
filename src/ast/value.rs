use std::collections::BTreeMap;
use std::fmt;

/// The set of runtime value types a template can see.
///
/// Context entries, resolved variables and filter results are all
/// `Value`s. When a `Value` is emitted into the output it is converted to
/// a string via [`to_output_string`](Value::to_output_string); until then
/// types are preserved so that filters and conditions operate correctly.
///
/// Conversion from common Rust types is provided via `From` impls:
///
/// ```rust
/// use tapestry::Value;
///
/// let s: Value = "hello".into();
/// let n: Value = 42i64.into();
/// let b: Value = true.into();
/// let a: Value = vec!["a", "b"].into();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    Array(Vec<Value>),
    /// String-keyed record, walked by dotted paths such as `user.name`.
    Map(BTreeMap<String, Value>),
    /// The absence of a value. Falsy, renders as an empty string.
    None,
}

impl Value {
    /// Convert this value to its string representation for template output.
    ///
    /// - `String`: returned as-is
    /// - `Number`: formatted without trailing `.0` for whole numbers
    /// - `Bool`: `"true"` or `"false"`
    /// - `Array`: elements joined with `", "`
    /// - `Map`: `key: value` pairs joined with `", "`, in key order
    /// - `None`: empty string
    pub fn to_output_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Array(items) => items
                .iter()
                .map(|v| v.to_output_string())
                .collect::<Vec<_>>()
                .join(", "),
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| format!("{k}: {}", v.to_output_string()))
                .collect::<Vec<_>>()
                .join(", "),
            Value::None => String::new(),
        }
    }

    /// Type name for diagnostic messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::None => "none",
        }
    }

    /// Truthiness check, used by `{% if %}`, the `default` filter and the
    /// fallback-dropping rule of lenient resolution.
    ///
    /// Falsy values: empty string, `0`, `false`, empty array, empty map, `None`.
    /// Everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0,
            Value::Bool(b) => *b,
            Value::Array(a) => !a.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::None => false,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Look up one path segment: a map key, or a numeric index into an array.
    pub fn get_segment(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_output_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_numbers_render_without_fraction() {
        assert_eq!(Value::Number(3.0).to_output_string(), "3");
        assert_eq!(Value::Number(2.5).to_output_string(), "2.5");
    }

    #[test]
    fn test_falsy_values() {
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Array(Vec::new()).is_truthy());
        assert!(!Value::Map(BTreeMap::new()).is_truthy());
        assert!(!Value::None.is_truthy());
        assert!(Value::from("x").is_truthy());
    }

    #[test]
    fn test_get_segment() {
        let user: Value = [("name", "Ada")].into_iter().collect();
        assert_eq!(user.get_segment("name"), Some(&Value::from("Ada")));
        assert_eq!(user.get_segment("age"), None);

        let list = Value::from(vec!["a", "b"]);
        assert_eq!(list.get_segment("1"), Some(&Value::from("b")));
        assert_eq!(list.get_segment("2"), None);
        assert_eq!(list.get_segment("x"), None);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from("a").as_string(), Some("a"));
        assert_eq!(Value::from(3i64).as_number(), Some(3.0));
        assert_eq!(Value::from(vec![1i64]).as_array().map(<[Value]>::len), Some(1));
        assert_eq!(Value::None.as_string(), None);
    }
}
