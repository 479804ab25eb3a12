//! Shared test helpers: a scripted hover service and call-record builders.
//! Used by the matcher, report and pipeline test modules.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::collector::CallRecord;
use crate::error::{Result, SigcovError};
use crate::hover::{Hover, HoverService};
use crate::location::Location;
use crate::syntax::NodeId;

/// Hover service answering from a (line, column) table.
#[derive(Default)]
pub(crate) struct FakeHoverService {
    pub answers: HashMap<(u32, u32), String>,
    /// 0-based request numbers that time out.
    pub timeout_on: HashSet<usize>,
    /// 0-based request numbers that fail with an error response.
    pub error_on: HashSet<usize>,
    pub fail_open_after: Option<usize>,
    pub requests: Vec<(String, u32, u32)>,
    pub opens: usize,
    pub closes: usize,
    pub is_open: bool,
}

impl FakeHoverService {
    pub fn with_answers(answers: &[((u32, u32), &str)]) -> Self {
        Self {
            answers: answers.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            ..Self::default()
        }
    }
}

impl HoverService for FakeHoverService {
    fn open(&mut self, _root: &Path) -> Result<()> {
        if self.fail_open_after.is_some_and(|n| self.opens >= n) {
            return Err(SigcovError::Spawn {
                command: "srb".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            });
        }
        self.opens += 1;
        self.is_open = true;
        Ok(())
    }

    fn hover(&mut self, uri: &str, line: u32, column: u32) -> Result<Hover> {
        assert!(self.is_open, "hover issued on a closed session");
        let n = self.requests.len();
        self.requests.push((uri.to_string(), line, column));
        if self.timeout_on.contains(&n) {
            return Err(SigcovError::QueryTimeout {
                method: "textDocument/hover".to_string(),
                timeout_ms: 10,
            });
        }
        if self.error_on.contains(&n) {
            return Err(SigcovError::Query { code: -32603, message: "internal".to_string() });
        }
        Ok(Hover {
            contents: self.answers.get(&(line, column)).cloned(),
        })
    }

    fn close(&mut self) {
        self.closes += 1;
        self.is_open = false;
    }
}

pub(crate) fn call_at(name: &str, line: u32, recv_col: Option<u32>, sel_col: u32) -> CallRecord {
    let receiver_location = recv_col.map(|c| Location::new("lib/a.rb", line, c, line, c + 1));
    CallRecord {
        method_name: name.to_string(),
        node: NodeId::for_tests(line),
        receiver_node: recv_col.map(|_| NodeId::for_tests(line)),
        location: Location::new("lib/a.rb", line, recv_col.unwrap_or(sel_col), line, sel_col + 5),
        receiver_location,
        selector_location: Location::new("lib/a.rb", line, sel_col, line, sel_col + name.len() as u32),
    }
}

