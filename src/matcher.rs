//! Type resolution for collected calls through a hover session.
//!
//! The matcher owns one session and moves through a small state machine:
//!
//! ```text
//!   Closed --new()--> Open --timeout--> Closed --reopen--> Open
//!                      |
//!                      +--shutdown()--> ShutDown (terminal)
//! ```
//!
//! A timed-out call is dropped, not retried. Error responses drop the call but
//! keep the session.

use std::path::{Path, PathBuf};

use lsp_types::Url;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collector::CallRecord;
use crate::error::{Result, SigcovError};
use crate::hover::{parse_hover_type, HoverService};
use crate::location::Location;

/// Receiver type used for implicit-self calls.
pub const SELF_MARKER: &str = "<self>";
/// Receiver type used when the service could not name one.
pub const UNKNOWN_MARKER: &str = "<unknown>";
/// Sorbet's explicit "no static type" annotation.
pub const UNTYPED_MARKER: &str = "T.untyped";

// ─── Resolved calls ─────────────────────────────────────────────────

/// A call paired with what the type service knows about it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCall {
    pub call: CallRecord,
    pub receiver_type: Option<String>,
    pub method_signature: Option<String>,
}

impl ResolvedCall {
    /// `<receiver type>#<method>`; the aggregation key.
    pub fn id(&self) -> String {
        format!("{}#{}", self.receiver_type_or_unknown(), self.call.method_name)
    }

    pub fn receiver_type_or_unknown(&self) -> &str {
        self.receiver_type.as_deref().unwrap_or(UNKNOWN_MARKER)
    }

    pub fn has_signature(&self) -> bool {
        self.method_signature.is_some()
    }
}

impl std::fmt::Display for ResolvedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sig = self.method_signature.as_deref().unwrap_or("no sig");
        write!(f, "Calling `{}`: {} ({})", self.id(), sig, self.call.location)
    }
}

// ─── Session state ──────────────────────────────────────────────────

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    ShutDown,
}

/// Counters for the run summary.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatcherStats {
    pub matched: usize,
    pub timeouts: usize,
    pub query_errors: usize,
    pub restarts: usize,
    pub hover_requests: usize,
}

// ─── Matcher ────────────────────────────────────────────────────────

pub struct Matcher<S: HoverService> {
    service: S,
    root: PathBuf,
    state: SessionState,
    stats: MatcherStats,
}

impl<S: HoverService> Matcher<S> {
    /// Open a session against `root`.
    pub fn new(service: S, root: impl Into<PathBuf>) -> Result<Self> {
        let mut matcher = Self {
            service,
            root: root.into(),
            state: SessionState::Closed,
            stats: MatcherStats::default(),
        };
        matcher.open()?;
        Ok(matcher)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> MatcherStats {
        self.stats
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Resolve one call.
    ///
    /// `Ok(None)` means the call contributes nothing: its query timed out (the
    /// session has been restarted) or the service returned an error. `Err` is
    /// reserved for a session that cannot be reopened or was shut down.
    pub fn match_call(&mut self, call: &CallRecord) -> Result<Option<ResolvedCall>> {
        match self.state {
            SessionState::Open => {}
            SessionState::Closed => self.open()?,
            SessionState::ShutDown => return Err(SigcovError::SessionClosed),
        }

        match self.resolve(call) {
            Ok(resolved) => {
                self.stats.matched += 1;
                Ok(Some(resolved))
            }
            Err(e) if e.needs_restart() => {
                self.stats.timeouts += 1;
                warn!(call = %call, error = %e, "Hover timed out, restarting session");
                self.restart()?;
                Ok(None)
            }
            Err(e @ SigcovError::Query { .. }) => {
                self.stats.query_errors += 1;
                debug!(call = %call, error = %e, "Hover failed, dropping call");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Close the session for good.
    pub fn shutdown(&mut self) {
        if self.state == SessionState::Open {
            self.service.close();
            info!(root = %self.root.display(), "Type service session closed");
        }
        self.state = SessionState::ShutDown;
    }

    fn resolve(&mut self, call: &CallRecord) -> Result<ResolvedCall> {
        let receiver_type = match &call.receiver_location {
            Some(loc) => self.hover_type_at(loc)?,
            None => Some(SELF_MARKER.to_string()),
        };
        let method_signature = self.hover_type_at(&call.selector_location)?;
        Ok(ResolvedCall {
            call: call.clone(),
            receiver_type,
            method_signature,
        })
    }

    /// Hover one column past the start of `loc`, landing inside the token.
    fn hover_type_at(&mut self, loc: &Location) -> Result<Option<String>> {
        let uri = file_uri(&self.root, &loc.file);
        let line = loc.begin_line.saturating_sub(1);
        let column = loc.begin_column + 1;
        self.stats.hover_requests += 1;
        let hover = self.service.hover(&uri, line, column)?;
        Ok(parse_hover_type(hover.contents.as_deref()))
    }

    fn open(&mut self) -> Result<()> {
        self.service.open(&self.root)?;
        self.state = SessionState::Open;
        info!(root = %self.root.display(), "Type service session opened");
        Ok(())
    }

    fn restart(&mut self) -> Result<()> {
        self.service.close();
        self.state = SessionState::Closed;
        self.stats.restarts += 1;
        self.open()
    }
}

impl<S: HoverService> Drop for Matcher<S> {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            self.shutdown();
        }
    }
}

/// Percent-encoded `file://` URI for a path; relative paths are taken from `root`.
pub fn file_uri(root: &Path, file: &str) -> String {
    let path = Path::new(file);
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    match Url::from_file_path(&full) {
        Ok(url) => url.to_string(),
        Err(()) => format!("file://{}", full.to_string_lossy()),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
