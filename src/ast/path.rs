use std::fmt;

/// A dotted variable path such as `user.profile.name` or `items.0`.
///
/// The first segment names a context entry; each following segment is a
/// map key or a numeric array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariablePath {
    segments: Vec<String>,
}

impl VariablePath {
    /// Parse a dotted path. Surrounding whitespace is ignored; empty
    /// segments (`a..b`, `.a`, `a.`) are rejected.
    pub fn parse(source: &str) -> Option<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return None;
        }
        let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(Self { segments })
    }

    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The context entry this path starts from.
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// Normalized form used as an interning key: segments joined by `.`.
    pub fn key(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
