//! # sigcov: Sorbet signature coverage for call sites
//!
//! Finds the method calls in a Ruby codebase that Sorbet cannot match to a
//! signature, and ranks them by how often they occur.
//!
//! ## Library usage
//!
//! This crate is primarily a CLI tool, but the pipeline stages are exposed as a
//! library for benchmarking and integration testing:
//! [`collector`] → [`matcher`] (through a [`hover::HoverService`]) → [`report`].

pub mod collector;
pub mod config;
pub mod discovery;
pub mod error;
pub mod hover;
pub mod location;
pub mod lsp;
pub mod matcher;
pub mod method_index;
pub mod pipeline;
pub mod report;
pub mod syntax;

#[cfg(test)]
pub(crate) mod test_utils;

pub use collector::{CallCollector, CallRecord, ExcludedCalls};
pub use error::{Result, SigcovError};
pub use hover::{Hover, HoverService};
pub use location::Location;
pub use matcher::{Matcher, ResolvedCall};
pub use method_index::{MethodDeclaration, MethodIndex};
pub use report::{Report, ReportBuilder, ReportEntry};

/// Strip the `\\?\` extended-length path prefix that Windows canonicalize adds.
#[must_use]
pub fn clean_path(p: &str) -> String {
    p.strip_prefix(r"\\?\").unwrap_or(p).to_string()
}

/// Read a file as a String, using lossy UTF-8 conversion for non-UTF8 files.
/// Returns `(content, was_lossy)` where `was_lossy` is true if replacement characters
/// were inserted. Old Ruby sources still carry Latin-1 comments and string literals.
pub fn read_file_lossy(path: &std::path::Path) -> std::io::Result<(String, bool)> {
    let raw = std::fs::read(path)?;
    match String::from_utf8(raw) {
        Ok(s) => Ok((s, false)),
        Err(e) => Ok((String::from_utf8_lossy(e.as_bytes()).into_owned(), true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path_strips_prefix() {
        assert_eq!(clean_path(r"\\?\C:\Repos\app"), r"C:\Repos\app");
        assert_eq!(clean_path("/home/app"), "/home/app");
    }

    #[test]
    fn test_read_file_lossy_reports_replacement() {
        let tmp = tempfile::tempdir().unwrap();
        let utf8 = tmp.path().join("a.rb");
        let latin1 = tmp.path().join("b.rb");
        std::fs::write(&utf8, "puts 'héllo'").unwrap();
        std::fs::write(&latin1, b"# caf\xe9\nputs 1\n").unwrap();

        assert_eq!(read_file_lossy(&utf8).unwrap(), ("puts 'héllo'".to_string(), false));
        let (text, lossy) = read_file_lossy(&latin1).unwrap();
        assert!(lossy);
        assert!(text.contains('\u{FFFD}'));
    }
}
