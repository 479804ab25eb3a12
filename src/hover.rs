//! The hover-query seam between the matcher and a type-checking service.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Result of one hover query.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Hover {
    pub contents: Option<String>,
}

impl Hover {
    pub fn text(contents: impl Into<String>) -> Self {
        Self { contents: Some(contents.into()) }
    }

    pub fn empty() -> Self {
        Self { contents: None }
    }
}

/// A session-based, position-addressed type information service.
///
/// `hover` must report a request that exceeds its deadline as
/// [`crate::SigcovError::QueryTimeout`], never as an empty hover: the matcher
/// relies on that distinction to decide when to restart the session.
pub trait HoverService {
    /// Start a session scoped to `root`. Callable again after [`HoverService::close`].
    fn open(&mut self, root: &Path) -> Result<()>;

    /// Describe what is at `(line, column)`, both zero-based, in `uri`.
    fn hover(&mut self, uri: &str, line: u32, column: u32) -> Result<Hover>;

    fn close(&mut self);
}

// ─── Hover text parsing ─────────────────────────────────────────────

static SIG_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sig\b").expect("valid sig regex"));
static RETURNS_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\breturns\(").expect("valid returns regex"));

/// Reduce hover contents to a type string.
///
/// Only the first line counts. A full `sig { ... }` rendering is reduced to the
/// expression inside its first `returns(...)`; any other line is the type itself.
/// Shared by receiver and selector lookups.
pub fn parse_hover_type(contents: Option<&str>) -> Option<String> {
    let line = contents?.lines().next()?.trim();
    if line.is_empty() {
        return None;
    }
    if SIG_PREFIX.is_match(line) {
        if let Some(inner) = returns_argument(line) {
            return (!inner.is_empty()).then(|| inner.to_string());
        }
    }
    Some(line.to_string())
}

/// Text between the first `returns(` and its matching `)`.
fn returns_argument(line: &str) -> Option<&str> {
    let open = RETURNS_CALL.find(line)?;
    let start = open.end();
    let mut depth = 1usize;
    for (offset, ch) in line[start..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(line[start..start + offset].trim());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_type_is_kept_verbatim() {
        assert_eq!(parse_hover_type(Some("Widget")), Some("Widget".to_string()));
        assert_eq!(parse_hover_type(Some("  T::Array[String]  ")), Some("T::Array[String]".to_string()));
    }

    #[test]
    fn test_absent_or_blank_is_none() {
        assert_eq!(parse_hover_type(None), None);
        assert_eq!(parse_hover_type(Some("")), None);
        assert_eq!(parse_hover_type(Some("   ")), None);
        assert_eq!(parse_hover_type(Some("\nString")), None);
    }

    #[test]
    fn test_only_first_line_counts() {
        let text = "String\n# some documentation\nmore";
        assert_eq!(parse_hover_type(Some(text)), Some("String".to_string()));
    }

    #[test]
    fn test_sig_reduced_to_return_type() {
        let text = "sig { params(x: Integer).returns(String) }\ndef foo(x); end";
        assert_eq!(parse_hover_type(Some(text)), Some("String".to_string()));
    }

    #[test]
    fn test_sig_return_type_with_nested_parens() {
        let text = "sig { params(x: T.nilable(Integer)).returns(T.nilable(T::Array[String])) }";
        assert_eq!(parse_hover_type(Some(text)), Some("T.nilable(T::Array[String])".to_string()));
    }

    #[test]
    fn test_sig_without_returns_is_kept() {
        assert_eq!(parse_hover_type(Some("sig { void }")), Some("sig { void }".to_string()));
    }

    #[test]
    fn test_sig_with_empty_returns_is_none() {
        assert_eq!(parse_hover_type(Some("sig { returns( ) }")), None);
    }

    #[test]
    fn test_sig_with_unbalanced_returns_is_kept() {
        let text = "sig { returns(String }";
        assert_eq!(parse_hover_type(Some(text)), Some(text.to_string()));
    }

    #[test]
    fn test_signal_is_not_a_sig() {
        assert_eq!(parse_hover_type(Some("signal.returns(Foo)")), Some("signal.returns(Foo)".to_string()));
    }

    #[test]
    fn test_returns_in_plain_line_untouched() {
        assert_eq!(
            parse_hover_type(Some("T.proc.returns(Integer)")),
            Some("T.proc.returns(Integer)".to_string())
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Parsing never yields an empty string and never spans lines.
            #[test]
            fn parsed_type_is_single_nonempty_line(input in "\\PC{0,120}(\n\\PC{0,40}){0,3}") {
                if let Some(t) = parse_hover_type(Some(&input)) {
                    prop_assert!(!t.is_empty());
                    prop_assert!(!t.contains('\n'));
                    prop_assert_eq!(t.trim(), t.as_str());
                }
            }

            /// A sig rendering always reduces to exactly its return type.
            #[test]
            fn sig_reduces_to_return_type(ty in "[A-Z][A-Za-z0-9_:]{0,20}", arg in "[a-z]{1,8}") {
                let line = format!("sig {{ params({}: Integer).returns({}) }}", arg, ty);
                prop_assert_eq!(parse_hover_type(Some(&line)), Some(ty));
            }
        }
    }
}
