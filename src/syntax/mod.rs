//! Parser-independent syntax trees.
//!
//! The collector never sees a concrete grammar. Parsers lower their output into
//! a [`SyntaxTree`]: an arena of nodes addressed by opaque [`NodeId`] handles,
//! where every node is either a method call (with its name, receiver and
//! selector range) or something else that only contributes children.

pub mod rbi;
pub mod ruby;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ─── Ranges ──────────────────────────────────────────────────────────

/// A point in a source file: 1-based line, 0-based column.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Start and end of a node as reported by the parser.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start: Position { line: start_line, column: start_column },
            end: Position { line: end_line, column: end_column },
        }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────

/// Opaque handle to a node of one [`SyntaxTree`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn for_tests(index: u32) -> Self {
        Self(index)
    }
}

/// The parts of a call node the collector needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParts {
    /// Method name token. `None` for nameless calls such as `callable.()`.
    pub name: Option<String>,
    /// The expression the call is sent to. Also listed among the node's children.
    pub receiver: Option<NodeId>,
    /// Range of the method name token.
    pub selector: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Call(CallParts),
    /// Any other construct, tagged with the parser's own kind name.
    Other(String),
}

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub range: SourceRange,
    pub children: Vec<NodeId>,
}

// ─── Tree ────────────────────────────────────────────────────────────

/// A parsed file. Empty sources produce a tree without a root.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn builder() -> SyntaxTreeBuilder {
        SyntaxTreeBuilder::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Bottom-up construction: children are added before their parent.
#[derive(Debug, Default)]
pub struct SyntaxTreeBuilder {
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTreeBuilder {
    pub fn push(&mut self, kind: NodeKind, range: SourceRange, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SyntaxNode { kind, range, children });
        id
    }

    /// Add a non-call node.
    pub fn other(&mut self, kind: &str, range: SourceRange, children: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Other(kind.to_string()), range, children)
    }

    /// Add a call node. `children` must include the receiver when there is one.
    pub fn call(
        &mut self,
        name: &str,
        receiver: Option<NodeId>,
        selector: SourceRange,
        range: SourceRange,
        children: Vec<NodeId>,
    ) -> NodeId {
        let parts = CallParts {
            name: Some(name.to_string()),
            receiver,
            selector,
        };
        self.push(NodeKind::Call(parts), range, children)
    }

    pub fn finish(self, root: NodeId) -> SyntaxTree {
        SyntaxTree {
            nodes: self.nodes,
            root: Some(root),
        }
    }

    pub fn finish_empty(self) -> SyntaxTree {
        SyntaxTree {
            nodes: self.nodes,
            root: None,
        }
    }
}

// ─── Parser seam ─────────────────────────────────────────────────────

/// Turns source text into a [`SyntaxTree`].
///
/// Implementations must fail with [`crate::SigcovError::Parse`] on syntax
/// errors instead of returning a partial tree.
pub trait SourceParser {
    fn parse(&mut self, file: &str, source: &str) -> Result<SyntaxTree>;
}
