//! End-to-end analysis: collect calls from every file, resolve them, rank the rest.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::collector::{CallCollector, CallRecord};
use crate::config::{AnalysisConfig, ParseErrorPolicy};
use crate::discovery::SourceFile;
use crate::error::{Result, SigcovError};
use crate::hover::HoverService;
use crate::matcher::{Matcher, MatcherStats};
use crate::method_index::MethodIndex;
use crate::report::{Report, ReportBuilder};
use crate::syntax::SourceParser;

/// Calls gathered from a set of files.
#[derive(Debug, Default)]
pub struct Collected {
    pub calls: Vec<CallRecord>,
    pub files: usize,
    /// Files dropped under [`ParseErrorPolicy::Skip`].
    pub skipped: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct Analysis {
    pub report: Report,
    pub matcher: MatcherStats,
    pub files: usize,
    pub skipped_files: usize,
    pub calls: usize,
}

/// Collect calls from `files` in order.
///
/// A parse error aborts the run or skips the file depending on `policy`. Read
/// errors always abort.
pub fn collect_calls<P: SourceParser>(
    parser: &mut P,
    collector: &CallCollector,
    files: &[SourceFile],
    policy: ParseErrorPolicy,
) -> Result<Collected> {
    let mut collected = Collected::default();
    for file in files {
        match collector.analyze_file(parser, &file.path, &file.display) {
            Ok(calls) => {
                collected.calls.extend(calls);
                collected.files += 1;
            }
            Err(e @ SigcovError::Parse { .. }) if policy == ParseErrorPolicy::Skip => {
                warn!(file = %file.display, error = %e, "Skipping unparsable file");
                collected.skipped.push(file.display.clone());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(collected)
}

/// Resolve every call through `service` and rank those without a signature.
pub fn resolve_and_rank<S: HoverService>(
    service: S,
    root: &Path,
    calls: &[CallRecord],
    index: &MethodIndex,
) -> Result<(Report, MatcherStats)> {
    let mut matcher = Matcher::new(service, root)?;
    let mut builder = ReportBuilder::new();

    let start = Instant::now();
    for call in calls {
        if let Some(resolved) = matcher.match_call(call)? {
            builder.add(resolved);
        }
    }
    matcher.shutdown();

    let stats = matcher.stats();
    let report = builder.finish(index);
    info!(
        calls = calls.len(),
        matched = stats.matched,
        timeouts = stats.timeouts,
        query_errors = stats.query_errors,
        without_signature = report.stats.without_signature,
        ids = report.stats.distinct_ids,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Matched calls with signatures"
    );
    Ok((report, stats))
}

/// The whole `sends` run over already-discovered files.
pub fn analyze<S: HoverService, P: SourceParser>(
    service: S,
    parser: &mut P,
    root: &Path,
    files: &[SourceFile],
    index: &MethodIndex,
    config: &AnalysisConfig,
) -> Result<Analysis> {
    let collector = CallCollector::new(config.excluded.clone());
    let collected = collect_calls(parser, &collector, files, config.on_parse_error)?;
    info!(
        files = collected.files,
        skipped = collected.skipped.len(),
        calls = collected.calls.len(),
        "Collected calls"
    );

    let (report, matcher) = resolve_and_rank(service, root, &collected.calls, index)?;
    Ok(Analysis {
        report,
        matcher,
        files: collected.files,
        skipped_files: collected.skipped.len(),
        calls: collected.calls.len(),
    })
}
