//! Call-site collection: walks a syntax tree and records every call worth checking.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::location::Location;
use crate::read_file_lossy;
use crate::syntax::{NodeId, NodeKind, SourceParser, SyntaxTree};

/// Call names that never need a signature: scoping keywords and the
/// signature DSL itself.
pub const DEFAULT_EXCLUDED_CALLS: &[&str] = &[
    "include", "extend", "require", "require_relative", "private", "protected", "super",
    "sig", "params", "returns", "void", "nilable", "unsafe", "let", "const", "prop", "override",
];

// ─── Exclusion set ──────────────────────────────────────────────────

/// Immutable set of call names the collector skips.
#[derive(Debug, Clone)]
pub struct ExcludedCalls {
    names: HashSet<String>,
}

impl ExcludedCalls {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The default set plus `extra`.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        set.names.extend(extra.into_iter().map(Into::into));
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ExcludedCalls {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_CALLS.iter().copied())
    }
}

// ─── Call records ───────────────────────────────────────────────────

/// One syntactic method call.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub method_name: String,
    pub node: NodeId,
    pub receiver_node: Option<NodeId>,
    pub location: Location,
    /// Present iff `receiver_node` is.
    pub receiver_location: Option<Location>,
    pub selector_location: Location,
}

impl std::fmt::Display for CallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.method_name, self.location)
    }
}

// ─── Collector ──────────────────────────────────────────────────────

pub struct CallCollector {
    excluded: ExcludedCalls,
}

impl CallCollector {
    pub fn new(excluded: ExcludedCalls) -> Self {
        Self { excluded }
    }

    pub fn excluded(&self) -> &ExcludedCalls {
        &self.excluded
    }

    /// Every non-excluded call in `tree`, in pre-order document order.
    ///
    /// Excluded calls are skipped but their children are still visited, so
    /// `sig { returns(foo.bar) }` still records `bar`.
    pub fn collect(&self, file: &str, tree: &SyntaxTree) -> Vec<CallRecord> {
        let mut calls = Vec::new();
        let Some(root) = tree.root() else {
            return calls;
        };

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = tree.node(id);
            if let NodeKind::Call(parts) = &node.kind {
                match parts.name.as_deref() {
                    Some(name) if !self.excluded.contains(name) => {
                        let receiver_location = parts
                            .receiver
                            .map(|recv| Location::from_range(file, tree.node(recv).range));
                        calls.push(CallRecord {
                            method_name: name.to_string(),
                            node: id,
                            receiver_node: parts.receiver,
                            location: Location::from_range(file, node.range),
                            receiver_location,
                            selector_location: Location::from_range(file, parts.selector),
                        });
                    }
                    _ => {}
                }
            }
            stack.extend(node.children.iter().rev().copied());
        }
        calls
    }

    /// Read, parse and collect one file. `display` is the path recorded in locations.
    pub fn analyze_file<P: SourceParser>(
        &self,
        parser: &mut P,
        path: &Path,
        display: &str,
    ) -> Result<Vec<CallRecord>> {
        let (content, was_lossy) = read_file_lossy(path)?;
        if was_lossy {
            let file_name = display;
            tracing::warn!(file = %file_name, "File is not valid UTF-8, using lossy conversion");
        }
        let tree = parser.parse(display, &content)?;
        let calls = self.collect(display, &tree);
        let file_name = display;
        debug!(file = %file_name, nodes = tree.len(), calls = calls.len(), "Collected calls");
        Ok(calls)
    }
}

impl Default for CallCollector {
    fn default() -> Self {
        Self::new(ExcludedCalls::default())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
