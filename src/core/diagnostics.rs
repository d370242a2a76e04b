//! IB-001: Diagnostics — recoverable, reportable binding problems.
//!
//! Nothing that a user can cause by writing a bad program is a Rust error.
//! Every such problem becomes a `Diagnostic` anchored at a `SourceRange`,
//! and a bind run always completes with the full list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A line/column position in the program source (1-based).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

/// A half-open source span. Ordering is by start, then end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Pos,
    #[serde(default)]
    pub end: Pos,
}

impl SourceRange {
    /// A range covering a single line starting at `column`.
    pub fn line(line: u32, column: u32) -> Self {
        Self {
            start: Pos { line, column },
            end: Pos { line, column },
        }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

/// Diagnostic severity. Whether an error is fatal is the caller's call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single binding diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: SourceRange,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(range: SourceRange, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(range: SourceRange, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.range, self.severity, self.message)
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Append all of `other`, preserving its order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn error(&mut self, range: SourceRange, message: impl Into<String>) {
        self.push(Diagnostic::error(range, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    /// Stable sort by source position so output does not depend on
    /// the order in which blocks finished binding.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| a.range.cmp(&b.range));
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(v: Vec<Diagnostic>) -> Self {
        Self(v)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ib001_display() {
        let d = Diagnostic::error(SourceRange::line(3, 5), "unknown resource type");
        assert_eq!(d.to_string(), "3:5: error: unknown resource type");
    }

    #[test]
    fn test_ib001_sort_is_stable_by_position() {
        let mut diags = Diagnostics::new();
        diags.error(SourceRange::line(4, 1), "b");
        diags.error(SourceRange::line(2, 1), "a");
        diags.error(SourceRange::line(4, 1), "c");
        diags.sort();
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ib001_has_errors() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());
        diags.push(Diagnostic::warning(SourceRange::default(), "w"));
        assert!(!diags.has_errors());
        diags.error(SourceRange::default(), "e");
        assert!(diags.has_errors());
    }

    #[test]
    fn test_ib001_serde_json() {
        let d = Diagnostic::error(SourceRange::line(1, 2), "bad");
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"severity\":\"error\""));
        assert!(json.contains("\"line\":1"));
    }
}
