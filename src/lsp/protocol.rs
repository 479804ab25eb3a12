use lsp_types::{
    ClientCapabilities, HoverClientCapabilities, HoverContents, HoverParams, InitializeParams,
    MarkedString, MarkupKind, Position, TextDocumentClientCapabilities, TextDocumentIdentifier,
    TextDocumentPositionParams, Url, WorkDoneProgressParams,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hover::Hover;

// ─── JSON-RPC 2.0 base types ────────────────────────────────────────

/// Outgoing request
#[derive(Serialize, Debug)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// Outgoing notification (no id, no response)
#[derive(Serialize, Debug)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

/// Outgoing response to a request the server sent us
#[derive(Serialize, Debug)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    pub result: Value,
}

/// Anything the server writes: a response, a notification or a server-to-client request.
#[derive(Deserialize, Debug, Default)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

impl JsonRpcNotification {
    pub fn new(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        }
    }
}

impl JsonRpcResponse {
    pub fn new(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result,
        }
    }
}

impl IncomingMessage {
    /// A response carries an id and no method.
    pub fn response_id(&self) -> Option<u64> {
        if self.method.is_some() {
            return None;
        }
        self.id.as_ref().and_then(Value::as_u64)
    }

    /// A request from the server that expects an answer.
    pub fn is_server_request(&self) -> bool {
        self.method.is_some() && self.id.is_some()
    }
}

// ─── LSP payloads ───────────────────────────────────────────────────

// Sorbet still reads the root from `rootUri`/`rootPath`.
#[allow(deprecated)]
pub fn initialize_params(root: &Url, root_path: &str) -> InitializeParams {
    InitializeParams {
        process_id: Some(std::process::id()),
        root_path: Some(root_path.to_string()),
        root_uri: Some(root.clone()),
        capabilities: ClientCapabilities {
            text_document: Some(TextDocumentClientCapabilities {
                hover: Some(HoverClientCapabilities {
                    dynamic_registration: None,
                    content_format: Some(vec![MarkupKind::PlainText]),
                }),
                ..TextDocumentClientCapabilities::default()
            }),
            ..ClientCapabilities::default()
        },
        ..InitializeParams::default()
    }
}

pub fn hover_params(uri: Url, line: u32, character: u32) -> HoverParams {
    HoverParams {
        text_document_position_params: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri },
            position: Position { line, character },
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
    }
}

/// Turn a `textDocument/hover` result into a [`Hover`].
///
/// `null` and results that do not decode as an LSP hover are empty. Of a
/// MarkedString array only the first element counts.
pub fn hover_from_result(result: &Value) -> Hover {
    let decoded: Option<lsp_types::Hover> = serde_json::from_value(result.clone()).unwrap_or(None);
    let text = decoded.and_then(|hover| match hover.contents {
        HoverContents::Scalar(marked) => Some(marked_text(marked)),
        HoverContents::Array(items) => items.into_iter().next().map(marked_text),
        HoverContents::Markup(markup) => Some(markup.value),
    });
    Hover {
        contents: text
            .as_deref()
            .map(strip_code_fences)
            .filter(|s| !s.trim().is_empty()),
    }
}

fn marked_text(marked: MarkedString) -> String {
    match marked {
        MarkedString::String(text) => text,
        MarkedString::LanguageString(block) => block.value,
    }
}

/// Drop markdown fence lines (```ruby, ```).
fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}
