//! IB-003: Type token decomposition.
//!
//! A type token names a schema type as `package:module:Type`, or
//! `package:Type` with the module defaulted to `index`. Decomposition never
//! fails hard: a malformed token yields a best-effort triple plus a
//! diagnostic so the binder can continue with a degraded type.

use super::diagnostics::{Diagnostic, Diagnostics, SourceRange};
use std::fmt;

/// Module assumed for two-segment tokens.
pub const DEFAULT_MODULE: &str = "index";

/// The (package, module, type) parts of a type token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TokenParts {
    pub package: String,
    pub module: String,
    pub type_name: String,
}

impl TokenParts {
    pub fn new(package: &str, module: &str, type_name: &str) -> Self {
        Self {
            package: package.to_string(),
            module: module.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

impl fmt::Display for TokenParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.package, self.module, self.type_name)
    }
}

/// Decompose `token` into its parts.
///
/// Exactly two or three `:`-separated segments are accepted and the type
/// segment must be non-empty. On failure the returned triple holds the
/// first segment as package (when there is more than one), an empty module,
/// and the last segment as type name.
pub fn decompose_token(token: &str, range: SourceRange) -> (TokenParts, Diagnostics) {
    let segments: Vec<&str> = token.split(':').collect();
    let mut diagnostics = Diagnostics::new();

    let parts = match segments.as_slice() {
        [package, type_name] if !type_name.is_empty() => {
            TokenParts::new(package, DEFAULT_MODULE, type_name)
        }
        [package, module, type_name] if !type_name.is_empty() => {
            TokenParts::new(package, module, type_name)
        }
        _ => {
            diagnostics.push(malformed_token(token, range));
            let package = if segments.len() > 1 { segments[0] } else { "" };
            let type_name = segments.last().copied().unwrap_or_default();
            TokenParts::new(package, "", type_name)
        }
    };

    (parts, diagnostics)
}

fn malformed_token(token: &str, range: SourceRange) -> Diagnostic {
    Diagnostic::error(
        range,
        format!(
            "invalid type token '{}': expected 'package:module:Type' or 'package:Type'",
            token
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ib003_three_segments() {
        let (parts, diags) = decompose_token("aws:s3/bucket:Bucket", SourceRange::default());
        assert!(diags.is_empty());
        assert_eq!(parts, TokenParts::new("aws", "s3/bucket", "Bucket"));
    }

    #[test]
    fn test_ib003_two_segments_default_module() {
        let (parts, diags) = decompose_token("random:RandomPet", SourceRange::default());
        assert!(diags.is_empty());
        assert_eq!(parts.module, DEFAULT_MODULE);
        assert_eq!(parts.type_name, "RandomPet");
    }

    #[test]
    fn test_ib003_empty_package_is_core() {
        let (parts, diags) = decompose_token(":index:Stack", SourceRange::default());
        assert!(diags.is_empty());
        assert_eq!(parts.package, "");
    }

    #[test]
    fn test_ib003_single_segment() {
        let range = SourceRange::line(7, 3);
        let (parts, diags) = decompose_token("Bucket", range);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().range, range);
        assert_eq!(parts, TokenParts::new("", "", "Bucket"));
    }

    #[test]
    fn test_ib003_four_segments() {
        let (parts, diags) = decompose_token("a:b:c:D", SourceRange::default());
        assert_eq!(diags.len(), 1);
        assert_eq!(parts.package, "a");
        assert_eq!(parts.type_name, "D");
    }

    #[test]
    fn test_ib003_empty_type_segment() {
        let (_, diags) = decompose_token("aws:s3:", SourceRange::default());
        assert_eq!(diags.len(), 1);
        assert!(diags.iter().next().unwrap().message.contains("package:module:Type"));
    }

    proptest! {
        #[test]
        fn prop_ib003_three_segment_roundtrip(
            p in "[a-z0-9]{0,8}",
            m in "[a-z0-9/]{0,8}",
            t in "[A-Za-z0-9]{1,12}",
        ) {
            let token = format!("{p}:{m}:{t}");
            let (parts, diags) = decompose_token(&token, SourceRange::default());
            prop_assert!(diags.is_empty());
            prop_assert_eq!(parts, TokenParts::new(&p, &m, &t));
        }

        #[test]
        fn prop_ib003_bad_segment_count(segments in prop::collection::vec("[a-z]{1,5}", 4..7)) {
            let token = segments.join(":");
            let (parts, diags) = decompose_token(&token, SourceRange::default());
            prop_assert_eq!(diags.len(), 1);
            prop_assert_eq!(&parts.type_name, segments.last().unwrap());
        }

        #[test]
        fn prop_ib003_no_delimiter(name in "[A-Za-z]{1,12}") {
            let (parts, diags) = decompose_token(&name, SourceRange::default());
            prop_assert_eq!(diags.len(), 1);
            prop_assert_eq!(parts.type_name, name);
        }
    }
}
