//! Aggregation and ranking of calls that lack a signature.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::matcher::{ResolvedCall, SELF_MARKER, UNKNOWN_MARKER, UNTYPED_MARKER};
use crate::method_index::{MethodDeclaration, MethodIndex};

/// One ranked identity.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub id: String,
    pub count: usize,
    /// First call seen with this id.
    pub sample: ResolvedCall,
    /// Interface declarations sharing the method name, when the receiver is not known.
    pub candidates: Vec<MethodDeclaration>,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    /// Every resolved call fed to the builder.
    pub total_calls: usize,
    /// Calls whose method has a signature.
    pub with_signature: usize,
    /// Calls counted in the entries.
    pub without_signature: usize,
    pub distinct_ids: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub entries: Vec<ReportEntry>,
    pub stats: ReportStats,
}

/// Whether candidates should be looked up for a receiver type.
pub fn needs_candidates(receiver_type: &str) -> bool {
    matches!(receiver_type, SELF_MARKER | UNKNOWN_MARKER | UNTYPED_MARKER)
}

struct Group {
    count: usize,
    sample: ResolvedCall,
}

/// Streams resolved calls into per-id counters.
#[derive(Default)]
pub struct ReportBuilder {
    groups: HashMap<String, Group>,
    total: usize,
    with_signature: usize,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resolved: ResolvedCall) {
        self.total += 1;
        if resolved.has_signature() {
            self.with_signature += 1;
            return;
        }
        self.groups
            .entry(resolved.id())
            .and_modify(|g| g.count += 1)
            .or_insert(Group { count: 1, sample: resolved });
    }

    pub fn extend<I: IntoIterator<Item = ResolvedCall>>(&mut self, calls: I) {
        for call in calls {
            self.add(call);
        }
    }

    /// Rank by count (descending), then id (ascending), and attach candidates.
    pub fn finish(self, index: &MethodIndex) -> Report {
        let stats = ReportStats {
            total_calls: self.total,
            with_signature: self.with_signature,
            without_signature: self.total - self.with_signature,
            distinct_ids: self.groups.len(),
        };

        let mut entries: Vec<ReportEntry> = self
            .groups
            .into_iter()
            .map(|(id, group)| {
                let candidates = if needs_candidates(group.sample.receiver_type_or_unknown()) {
                    index.lookup(&group.sample.call.method_name).to_vec()
                } else {
                    Vec::new()
                };
                ReportEntry {
                    id,
                    count: group.count,
                    sample: group.sample,
                    candidates,
                }
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.id.cmp(&b.id)));

        Report { entries, stats }
    }
}

// ─── Rendering ──────────────────────────────────────────────────────

/// Tab-separated listing: `count\tid`, then one `\t\tfqn (location)` line per candidate.
pub fn render_text(entries: &[ReportEntry], top: Option<usize>) -> String {
    let mut out = String::new();
    for entry in entries.iter().take(top.unwrap_or(usize::MAX)) {
        let _ = writeln!(out, "{}\t{}", entry.count, entry.id);
        for candidate in &entry.candidates {
            let _ = writeln!(
                out,
                "\t\t{} ({})",
                candidate.fully_qualified_name, candidate.location
            );
        }
    }
    out
}

pub fn render_json(report: &Report, top: Option<usize>) -> serde_json::Result<String> {
    let limit = top.unwrap_or(usize::MAX).min(report.entries.len());
    let value = serde_json::json!({
        "entries": &report.entries[..limit],
        "stats": report.stats,
    });
    serde_json::to_string_pretty(&value)
}
