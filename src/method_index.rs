//! Name-keyed index of methods declared in interface (RBI) files.
//!
//! Used only as a hint: when a call's receiver type is unknown, the report lists
//! every declared method sharing the call's name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::location::Location;
use crate::syntax::rbi::parse_rbi_file;
use crate::syntax::ruby::RubyParser;

/// A method declared in an interface file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MethodDeclaration {
    pub simple_name: String,
    pub fully_qualified_name: String,
    pub location: Location,
}

/// One node of a parsed interface file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceNode {
    /// A module or class. `name` is fully qualified.
    Scope { name: String, children: Vec<InterfaceNode> },
    Method(MethodDeclaration),
}

/// Simple name → declarations, in the order they were encountered.
#[derive(Debug, Default)]
pub struct MethodIndex {
    by_name: HashMap<String, Vec<MethodDeclaration>>,
    total: usize,
}

impl MethodIndex {
    /// Build the index from a forest of interface trees.
    pub fn build<'a, I>(forest: I) -> Self
    where
        I: IntoIterator<Item = &'a InterfaceNode>,
    {
        let mut index = Self::default();
        for node in forest {
            index.visit(node);
        }
        index
    }

    fn visit(&mut self, node: &InterfaceNode) {
        match node {
            InterfaceNode::Scope { children, .. } => {
                for child in children {
                    self.visit(child);
                }
            }
            InterfaceNode::Method(decl) => {
                self.by_name
                    .entry(decl.simple_name.clone())
                    .or_default()
                    .push(decl.clone());
                self.total += 1;
            }
        }
    }

    /// All declarations with this simple name, or an empty slice.
    pub fn lookup(&self, name: &str) -> &[MethodDeclaration] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of declarations indexed.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct simple names.
    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }
}

/// Parse every RBI file and index its methods. Unparsable files are skipped with a warning.
/// Declaration locations are relative to `root` when the file lies under it.
pub fn index_rbi_files(root: &Path, files: &[PathBuf]) -> MethodIndex {
    let mut parser = RubyParser::new();
    let mut forest = Vec::new();
    let mut errors = 0usize;
    for file in files {
        let display = file
            .strip_prefix(root)
            .unwrap_or(file)
            .to_string_lossy()
            .replace('\\', "/");
        match parse_rbi_file(&mut parser, file, &display) {
            Ok(nodes) => forest.extend(nodes),
            Err(e) => {
                errors += 1;
                warn!(file = %file.display(), error = %e, "Skipping unreadable RBI file");
            }
        }
    }
    let index = MethodIndex::build(&forest);
    info!(
        files = files.len(),
        errors,
        methods = index.len(),
        names = index.name_count(),
        "Indexed RBI methods"
    );
    index
}
