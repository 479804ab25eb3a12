//! Ruby source parser using tree-sitter: lowers a tree-sitter tree into a [`SyntaxTree`].

use std::collections::{HashMap, HashSet};

use super::{
    CallParts, NodeId, NodeKind, Position, SourceParser, SourceRange, SyntaxTree, SyntaxTreeBuilder,
};
use crate::error::{Result, SigcovError};
use crate::location::Location;

/// [`SourceParser`] backed by `tree-sitter-ruby`.
pub struct RubyParser {
    parser: tree_sitter::Parser,
}

impl RubyParser {
    pub fn new() -> Self {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_ruby::LANGUAGE.into())
            .expect("Error loading Ruby grammar");
        Self { parser }
    }

    /// Parse into the raw tree-sitter tree, failing on any syntax error.
    pub(crate) fn parse_checked(&mut self, file: &str, source: &str) -> Result<tree_sitter::Tree> {
        let tree = self.parser.parse(source, None).ok_or_else(|| SigcovError::Parse {
            file: file.to_string(),
            location: None,
            message: "parser returned no tree".to_string(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let (location, message) = match first_error_node(root) {
                Some(bad) => (
                    Some(Location::from_range(file, node_range(bad, source))),
                    describe_error(bad, source),
                ),
                None => (None, "syntax error".to_string()),
            };
            return Err(SigcovError::Parse {
                file: file.to_string(),
                location,
                message,
            });
        }
        Ok(tree)
    }
}

impl Default for RubyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for RubyParser {
    fn parse(&mut self, file: &str, source: &str) -> Result<SyntaxTree> {
        let tree = self.parse_checked(file, source)?;
        let mut lowering = Lowering::new(source);
        let root = lowering.lower(tree.root_node());
        Ok(lowering.builder.finish(root))
    }
}

// ─── Lowering ───────────────────────────────────────────────────────

/// Binary operators that are control flow, not method sends.
const LOGICAL_OPERATORS: &[&str] = &["&&", "||", "and", "or"];

const NUMERIC_LITERALS: &[&str] = &["integer", "float", "rational", "complex"];

/// Converts tree-sitter nodes bottom-up while tracking which bare identifiers
/// are local variables. An identifier that is not a known local is a
/// receiverless call without arguments (`items` in `items.each`).
struct Lowering<'s> {
    source: &'s str,
    builder: SyntaxTreeBuilder,
    scopes: Vec<HashSet<&'s str>>,
}

impl<'s> Lowering<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            builder: SyntaxTree::builder(),
            scopes: vec![HashSet::new()],
        }
    }

    fn lower(&mut self, node: tree_sitter::Node) -> NodeId {
        let scoped = match node.kind() {
            "method" | "singleton_method" | "class" | "module" | "singleton_class" => {
                self.scopes.push(HashSet::new());
                true
            }
            "block" | "do_block" | "lambda" => {
                let inherited = self.scopes.last().cloned().unwrap_or_default();
                self.scopes.push(inherited);
                true
            }
            _ => false,
        };

        // Identifiers declare as they are classified, so in `x = x` the right side reads a local.
        let kind = self.classify(node);

        let mut children = Vec::with_capacity(node.named_child_count());
        let mut by_ts_id: HashMap<usize, NodeId> = HashMap::new();
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                let id = self.lower(child);
                by_ts_id.insert(child.id(), id);
                children.push(id);
            }
        }

        if scoped {
            self.scopes.pop();
        }

        let kind = match kind {
            Lowered::Call { name, receiver, selector } => NodeKind::Call(CallParts {
                name,
                receiver: receiver.and_then(|r| by_ts_id.get(&r.id()).copied()),
                selector,
            }),
            Lowered::Other => NodeKind::Other(node.kind().to_string()),
        };
        self.builder.push(kind, node_range(node, self.source), children)
    }

    fn classify<'t>(&mut self, node: tree_sitter::Node<'t>) -> Lowered<'t> {
        let source = self.source;
        match node.kind() {
            "call" => {
                let safe_navigation = node
                    .child_by_field_name("operator")
                    .is_some_and(|op| node_text(op, source) == "&.");
                if safe_navigation {
                    return Lowered::Other;
                }
                let method = node.child_by_field_name("method");
                let name = method.map(|m| {
                    let text = node_text(m, source);
                    if is_assignment_target(node) {
                        format!("{}=", text)
                    } else {
                        text.to_string()
                    }
                });
                Lowered::Call {
                    name,
                    receiver: node.child_by_field_name("receiver"),
                    selector: node_range(method.unwrap_or(node), source),
                }
            }
            "element_reference" => {
                let bracket = (0..node.child_count())
                    .filter_map(|i| node.child(i))
                    .find(|c| c.kind() == "[");
                let name = if is_assignment_target(node) { "[]=" } else { "[]" };
                Lowered::Call {
                    name: Some(name.to_string()),
                    receiver: node.child_by_field_name("object"),
                    selector: node_range(bracket.unwrap_or(node), source),
                }
            }
            "binary" => {
                let Some(op) = node.child_by_field_name("operator") else {
                    return Lowered::Other;
                };
                let text = node_text(op, source);
                if LOGICAL_OPERATORS.contains(&text) {
                    return Lowered::Other;
                }
                Lowered::Call {
                    name: Some(text.to_string()),
                    receiver: node.child_by_field_name("left"),
                    selector: node_range(op, source),
                }
            }
            "unary" => {
                let Some(op) = node.child_by_field_name("operator") else {
                    return Lowered::Other;
                };
                let operand = node.child_by_field_name("operand");
                let numeric = operand.is_some_and(|o| NUMERIC_LITERALS.contains(&o.kind()));
                let name = match node_text(op, source) {
                    "-" if numeric => return Lowered::Other,
                    "+" if numeric => return Lowered::Other,
                    "-" => "-@",
                    "+" => "+@",
                    "!" | "not" => "!",
                    "~" => "~",
                    _ => return Lowered::Other,
                };
                Lowered::Call {
                    name: Some(name.to_string()),
                    receiver: operand,
                    selector: node_range(op, source),
                }
            }
            "identifier" => match identifier_role(node) {
                IdentifierRole::Declaration => {
                    let name = node_text(node, source);
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(name);
                    }
                    Lowered::Other
                }
                IdentifierRole::Name => Lowered::Other,
                IdentifierRole::Reference => {
                    let name = node_text(node, source);
                    if self.is_local(name) {
                        Lowered::Other
                    } else {
                        Lowered::Call {
                            name: Some(name.to_string()),
                            receiver: None,
                            selector: node_range(node, source),
                        }
                    }
                }
            },
            _ => Lowered::Other,
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|scope| scope.contains(name))
    }
}

enum Lowered<'t> {
    Call {
        name: Option<String>,
        receiver: Option<tree_sitter::Node<'t>>,
        selector: SourceRange,
    },
    Other,
}

enum IdentifierRole {
    /// Binds a local: parameter, assignment target, pattern variable.
    Declaration,
    /// Part of another construct: a call's method token, a `def` name, an alias.
    Name,
    /// An expression: a local read or a receiverless call.
    Reference,
}

fn identifier_role(node: tree_sitter::Node) -> IdentifierRole {
    let Some(parent) = node.parent() else {
        return IdentifierRole::Reference;
    };
    match parent.kind() {
        "call" if is_field(parent, "method", node) => IdentifierRole::Name,
        "method" | "singleton_method" if is_field(parent, "name", node) => IdentifierRole::Name,
        "alias" | "undef" | "setter" | "scope_resolution" => IdentifierRole::Name,
        "assignment" | "operator_assignment" if is_field(parent, "left", node) => {
            IdentifierRole::Declaration
        }
        "optional_parameter" | "keyword_parameter" | "as_pattern"
            if is_field(parent, "name", node) =>
        {
            IdentifierRole::Declaration
        }
        "for" if is_field(parent, "pattern", node) => IdentifierRole::Declaration,
        "in_clause" if is_field(parent, "pattern", node) => IdentifierRole::Declaration,
        "keyword_pattern" if is_field(parent, "value", node) => IdentifierRole::Declaration,
        "method_parameters" | "block_parameters" | "lambda_parameters" | "splat_parameter"
        | "hash_splat_parameter" | "block_parameter" | "destructured_parameter"
        | "left_assignment_list" | "destructured_left_assignment" | "rest_assignment"
        | "exception_variable" | "array_pattern" | "find_pattern" | "alternative_pattern" => {
            IdentifierRole::Declaration
        }
        _ => IdentifierRole::Reference,
    }
}

/// `a.b = 1`, `a.b += 1`, `h[k] = v` and multiple-assignment targets call the writer.
fn is_assignment_target(node: tree_sitter::Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "assignment" | "operator_assignment" => is_field(parent, "left", node),
        "left_assignment_list" | "destructured_left_assignment" | "rest_assignment" => true,
        _ => false,
    }
}

fn is_field(parent: tree_sitter::Node, field: &str, node: tree_sitter::Node) -> bool {
    parent.child_by_field_name(field).is_some_and(|f| f.id() == node.id())
}

// ─── Helper utilities ───────────────────────────────────────────────

pub(crate) fn node_text<'a>(node: tree_sitter::Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Node range with columns in UTF-16 code units, the unit of LSP positions.
pub(crate) fn node_range(node: tree_sitter::Node, source: &str) -> SourceRange {
    let start = node.start_position();
    let end = node.end_position();
    SourceRange {
        start: Position {
            line: start.row as u32 + 1,
            column: utf16_column(source, node.start_byte(), start.column),
        },
        end: Position {
            line: end.row as u32 + 1,
            column: utf16_column(source, node.end_byte(), end.column),
        },
    }
}

/// Convert a byte column into UTF-16 code units using the line text before it.
fn utf16_column(source: &str, byte: usize, byte_column: usize) -> u32 {
    let line_start = byte.saturating_sub(byte_column);
    match source.get(line_start..byte) {
        Some(prefix) => prefix.encode_utf16().count() as u32,
        None => byte_column as u32,
    }
}

/// Depth-first search for the first ERROR or MISSING node.
fn first_error_node(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if let Some(found) = first_error_node(child) {
                return Some(found);
            }
        }
    }
    None
}

fn describe_error(node: tree_sitter::Node, source: &str) -> String {
    if node.is_missing() {
        return format!("missing '{}'", node.kind());
    }
    let text = node_text(node, source);
    let snippet: String = text.lines().next().unwrap_or("").chars().take(40).collect();
    if snippet.is_empty() {
        "unexpected end of input".to_string()
    } else {
        format!("unexpected '{}'", snippet)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "ruby_tests.rs"]
mod tests;
