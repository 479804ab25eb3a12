//! LSP client for `srb tc --lsp`.
//!
//! The server's stdout is drained by a reader thread that decodes framed
//! messages and forwards them over an `mpsc` channel. Requests are written
//! synchronously and the caller waits on the channel with `recv_timeout`, so a
//! stuck server costs exactly one deadline.

use std::io::{BufReader, ErrorKind};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use lsp_types::{InitializedParams, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SigcovError};
use crate::hover::{Hover, HoverService};

use super::protocol::{
    hover_from_result, hover_params, initialize_params, IncomingMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse,
};
use super::transport::{read_message, write_message};

const HOVER_METHOD: &str = "textDocument/hover";

struct Session {
    child: Child,
    stdin: ChildStdin,
    incoming: Receiver<IncomingMessage>,
    reader: Option<JoinHandle<()>>,
}

/// One Sorbet LSP process at a time; [`HoverService::open`] after
/// [`HoverService::close`] starts a fresh one.
pub struct LspClient {
    config: SessionConfig,
    session: Option<Session>,
    next_id: u64,
}

impl LspClient {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            session: None,
            next_id: 1,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn spawn(&self, root: &Path) -> Result<Session> {
        let mut child = Command::new(&self.config.sorbet_bin)
            .args(&self.config.sorbet_args)
            .current_dir(root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SigcovError::Spawn {
                command: self.config.command_line(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (stdin, stdout) = match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SigcovError::Protocol("server pipes unavailable".to_string()));
            }
        };

        let (tx, rx) = mpsc::channel();
        let reader = std::thread::spawn(move || {
            let mut stdout = BufReader::new(stdout);
            loop {
                match read_message(&mut stdout) {
                    Ok(Some(value)) => match serde_json::from_value::<IncomingMessage>(value) {
                        Ok(msg) => {
                            if tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Ignoring malformed message from type service"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "Type service output closed");
                        break;
                    }
                }
            }
        });

        Ok(Session {
            child,
            stdin,
            incoming: rx,
            reader: Some(reader),
        })
    }

    fn request(&mut self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;
        let session = self.session.as_mut().ok_or(SigcovError::SessionClosed)?;
        send(&mut session.stdin, &JsonRpcRequest::new(id, method, params))?;
        let Session { stdin, incoming, .. } = session;
        await_response(incoming, id, method, timeout, |request| {
            // Server-to-client requests (capability registration, progress) get an empty answer.
            if let Some(req_id) = request.id.clone() {
                let _ = send(&mut *stdin, &JsonRpcResponse::new(req_id, Value::Null));
            }
        })
    }

    fn notify(&mut self, method: &str, params: Value) -> Result<()> {
        let session = self.session.as_mut().ok_or(SigcovError::SessionClosed)?;
        send(&mut session.stdin, &JsonRpcNotification::new(method, params))
    }

    fn handshake(&mut self, root: &Path) -> Result<()> {
        let root_path = root.to_string_lossy().to_string();
        let root_uri = Url::from_file_path(root)
            .map_err(|_| SigcovError::Protocol(format!("cannot express '{}' as a file URI", root_path)))?;
        let init_timeout = self.config.init_timeout;
        let params = serde_json::to_value(initialize_params(&root_uri, &root_path))?;
        self.request("initialize", params, init_timeout)?;
        self.notify("initialized", serde_json::to_value(InitializedParams {})?)
    }

    fn teardown(&mut self, graceful: bool) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if graceful {
            let id = self.next_id;
            self.next_id += 1;
            let timeout = self.config.hover_timeout;
            let shutdown = send(&mut session.stdin, &JsonRpcRequest::new(id, "shutdown", Value::Null))
                .and_then(|_| await_response(&session.incoming, id, "shutdown", timeout, |_| {}));
            if let Err(e) = shutdown {
                debug!(error = %e, "Type service did not acknowledge shutdown");
            }
            let _ = send(&mut session.stdin, &JsonRpcNotification::new("exit", Value::Null));
        }
        drop(session.stdin);
        let _ = session.child.kill();
        let _ = session.child.wait();
        if let Some(reader) = session.reader.take() {
            let _ = reader.join();
        }
    }
}

impl HoverService for LspClient {
    fn open(&mut self, root: &Path) -> Result<()> {
        if self.session.is_some() {
            self.teardown(true);
        }
        let started = Instant::now();
        info!(command = %self.config.command_line(), root = %root.display(), "Starting type service");
        self.session = Some(self.spawn(root)?);
        if let Err(e) = self.handshake(root) {
            self.teardown(false);
            return Err(e);
        }
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Type service ready");
        Ok(())
    }

    fn hover(&mut self, uri: &str, line: u32, column: u32) -> Result<Hover> {
        let timeout = self.config.hover_timeout;
        let url = Url::parse(uri)
            .map_err(|e| SigcovError::Protocol(format!("invalid document URI '{}': {}", uri, e)))?;
        let params = serde_json::to_value(hover_params(url, line, column))?;
        let result = self.request(HOVER_METHOD, params, timeout)?;
        let hover = hover_from_result(&result);
        if hover.contents.is_none() && !result.is_null() {
            debug!(uri, line, column, result = %result, "Hover without readable contents");
        }
        Ok(hover)
    }

    fn close(&mut self) {
        self.teardown(true);
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        self.teardown(true);
    }
}

/// Write one message; a closed pipe means the server is gone.
fn send<T: serde::Serialize>(stdin: &mut ChildStdin, message: &T) -> Result<()> {
    write_message(stdin, message).map_err(|e| match e {
        SigcovError::Io(io) if io.kind() == ErrorKind::BrokenPipe => SigcovError::Disconnected,
        other => other,
    })
}

/// Wait for the response to `id`, skipping notifications and unrelated responses.
/// Server-to-client requests are handed to `on_server_request`.
fn await_response<F>(
    incoming: &Receiver<IncomingMessage>,
    id: u64,
    method: &str,
    timeout: Duration,
    mut on_server_request: F,
) -> Result<Value>
where
    F: FnMut(&IncomingMessage),
{
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let timed_out = || SigcovError::QueryTimeout {
            method: method.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        };
        if remaining.is_zero() {
            return Err(timed_out());
        }
        match incoming.recv_timeout(remaining) {
            Ok(msg) => {
                if msg.response_id() == Some(id) {
                    if let Some(err) = msg.error {
                        return Err(SigcovError::Query {
                            code: err.code,
                            message: err.message,
                        });
                    }
                    return Ok(msg.result.unwrap_or(Value::Null));
                }
                if msg.is_server_request() {
                    on_server_request(&msg);
                }
            }
            Err(RecvTimeoutError::Timeout) => return Err(timed_out()),
            Err(RecvTimeoutError::Disconnected) => return Err(SigcovError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(value: Value) -> IncomingMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_await_skips_notifications_and_stale_responses() {
        let (tx, rx) = mpsc::channel();
        tx.send(message(json!({"method": "window/logMessage", "params": {}}))).unwrap();
        tx.send(message(json!({"id": 3, "result": "stale"}))).unwrap();
        tx.send(message(json!({"id": 4, "result": {"contents": "String"}}))).unwrap();

        let result = await_response(&rx, 4, HOVER_METHOD, Duration::from_secs(1), |_| {}).unwrap();
        assert_eq!(result["contents"], "String");
    }

    #[test]
    fn test_await_answers_server_requests() {
        let (tx, rx) = mpsc::channel();
        tx.send(message(json!({"id": 1, "method": "client/registerCapability", "params": {}}))).unwrap();
        tx.send(message(json!({"id": 1, "result": null}))).unwrap();

        let mut seen = Vec::new();
        let result = await_response(&rx, 1, "initialize", Duration::from_secs(1), |req| {
            seen.push(req.method.clone());
        })
        .unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(seen, vec![Some("client/registerCapability".to_string())]);
    }

    #[test]
    fn test_await_error_response() {
        let (tx, rx) = mpsc::channel();
        tx.send(message(json!({"id": 2, "error": {"code": -32602, "message": "bad position"}}))).unwrap();
        let err = await_response(&rx, 2, HOVER_METHOD, Duration::from_secs(1), |_| {}).unwrap_err();
        assert!(matches!(err, SigcovError::Query { code: -32602, .. }));
        assert!(!err.needs_restart());
    }

    #[test]
    fn test_await_times_out() {
        let (_tx, rx) = mpsc::channel::<IncomingMessage>();
        let started = Instant::now();
        let err = await_response(&rx, 1, HOVER_METHOD, Duration::from_millis(50), |_| {}).unwrap_err();
        assert!(matches!(err, SigcovError::QueryTimeout { timeout_ms: 50, .. }));
        assert!(err.needs_restart());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_await_disconnected() {
        let (tx, rx) = mpsc::channel::<IncomingMessage>();
        drop(tx);
        let err = await_response(&rx, 1, HOVER_METHOD, Duration::from_secs(1), |_| {}).unwrap_err();
        assert!(matches!(err, SigcovError::Disconnected));
    }

    #[test]
    fn test_open_missing_binary_is_spawn_error() {
        let mut client = LspClient::new(SessionConfig {
            sorbet_bin: "sigcov-test-no-such-binary".to_string(),
            ..SessionConfig::default()
        });
        let tmp = tempfile::tempdir().unwrap();
        let err = client.open(tmp.path()).unwrap_err();
        assert!(matches!(err, SigcovError::Spawn { .. }));
        assert!(!client.is_open());
    }

    #[test]
    fn test_hover_without_session_is_session_closed() {
        let mut client = LspClient::new(SessionConfig::default());
        let err = client.hover("file:///a.rb", 0, 1).unwrap_err();
        assert!(matches!(err, SigcovError::SessionClosed));
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_server_times_out_handshake() {
        let mut client = LspClient::new(SessionConfig {
            sorbet_bin: "sh".to_string(),
            sorbet_args: vec!["-c".to_string(), "cat > /dev/null".to_string()],
            init_timeout: Duration::from_millis(100),
            hover_timeout: Duration::from_millis(100),
        });
        let tmp = tempfile::tempdir().unwrap();
        let err = client.open(tmp.path()).unwrap_err();
        assert!(matches!(err, SigcovError::QueryTimeout { ref method, .. } if method == "initialize"));
        assert!(!client.is_open());
    }

    #[cfg(unix)]
    #[test]
    fn test_exiting_server_is_disconnected() {
        let mut client = LspClient::new(SessionConfig {
            sorbet_bin: "true".to_string(),
            sorbet_args: vec![],
            init_timeout: Duration::from_secs(5),
            hover_timeout: Duration::from_secs(5),
        });
        let tmp = tempfile::tempdir().unwrap();
        let err = client.open(tmp.path()).unwrap_err();
        assert!(matches!(err, SigcovError::Disconnected), "got {:?}", err);
    }
}
