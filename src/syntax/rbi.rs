//! RBI (Ruby interface) parser using tree-sitter: extracts scopes and method declarations.

use std::path::Path;

use super::ruby::{node_range, node_text, RubyParser};
use crate::error::Result;
use crate::location::Location;
use crate::method_index::{InterfaceNode, MethodDeclaration};
use crate::read_file_lossy;

/// Parse one `.rbi` file into its top-level interface nodes. Locations name
/// the file as `display`.
pub fn parse_rbi_file(parser: &mut RubyParser, path: &Path, display: &str) -> Result<Vec<InterfaceNode>> {
    let (content, was_lossy) = read_file_lossy(path)?;
    if was_lossy {
        let file_name = display;
        tracing::warn!(file = %file_name, "RBI file is not valid UTF-8, using lossy conversion");
    }
    parse_rbi(parser, display, &content)
}

/// Parse RBI source text. `file` is used for declaration locations only.
pub fn parse_rbi(parser: &mut RubyParser, file: &str, source: &str) -> Result<Vec<InterfaceNode>> {
    let tree = parser.parse_checked(file, source)?;
    let ctx = WalkContext { file, source };
    let mut out = Vec::new();
    walk_rbi_node(tree.root_node(), &ctx, &ScopeState::root(), &mut out);
    Ok(out)
}

struct WalkContext<'a> {
    file: &'a str,
    source: &'a str,
}

/// Fully-qualified scope name plus whether `def`s inside are singleton methods.
#[derive(Clone)]
struct ScopeState {
    qualified: String,
    singleton: bool,
}

impl ScopeState {
    fn root() -> Self {
        Self { qualified: String::new(), singleton: false }
    }

    fn nested(&self, name: &str) -> Self {
        let qualified = match name.strip_prefix("::") {
            Some(absolute) => format!("::{}", absolute),
            None => format!("{}::{}", self.qualified, name),
        };
        Self { qualified, singleton: false }
    }

    fn method_name(&self, name: &str, singleton: bool) -> String {
        if singleton || self.singleton {
            format!("{}::{}", self.qualified, name)
        } else {
            format!("{}#{}", self.qualified, name)
        }
    }
}

// ─── AST walking ────────────────────────────────────────────────────

fn walk_rbi_node(
    node: tree_sitter::Node,
    ctx: &WalkContext,
    scope: &ScopeState,
    out: &mut Vec<InterfaceNode>,
) {
    match node.kind() {
        "module" | "class" => {
            let Some(name_node) = node.child_by_field_name("name") else {
                return;
            };
            let name = node_text(name_node, ctx.source).to_string();
            let inner = scope.nested(&name);
            let mut children = Vec::new();
            walk_children(node, ctx, &inner, &mut children);
            out.push(InterfaceNode::Scope {
                name: inner.qualified,
                children,
            });
            return;
        }
        "singleton_class" => {
            // class << self
            let inner = ScopeState {
                qualified: scope.qualified.clone(),
                singleton: true,
            };
            walk_children(node, ctx, &inner, out);
            return;
        }
        "method" | "singleton_method" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let simple_name = node_text(name_node, ctx.source).to_string();
                let singleton = node.kind() == "singleton_method";
                out.push(InterfaceNode::Method(MethodDeclaration {
                    fully_qualified_name: scope.method_name(&simple_name, singleton),
                    simple_name,
                    location: Location::from_range(ctx.file, node_range(node, ctx.source)),
                }));
            }
            return;
        }
        _ => {}
    }

    walk_children(node, ctx, scope, out);
}

fn walk_children(
    node: tree_sitter::Node,
    ctx: &WalkContext,
    scope: &ScopeState,
    out: &mut Vec<InterfaceNode>,
) {
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            walk_rbi_node(child, ctx, scope, out);
        }
    }
}
