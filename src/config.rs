//! Runtime configuration for the type service session and the analysis run.

use std::time::Duration;

use crate::collector::ExcludedCalls;

pub const DEFAULT_SORBET_BIN: &str = "srb";
pub const DEFAULT_SORBET_ARGS: &[&str] = &[
    "tc",
    "--lsp",
    "--enable-all-experimental-lsp-features",
    "--disable-watchman",
];
pub const DEFAULT_HOVER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_INIT_TIMEOUT_MS: u64 = 120_000;

/// How the type service is started and how long requests may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub sorbet_bin: String,
    pub sorbet_args: Vec<String>,
    pub hover_timeout: Duration,
    /// Deadline for the `initialize` handshake; Sorbet typechecks the whole
    /// project before answering.
    pub init_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sorbet_bin: DEFAULT_SORBET_BIN.to_string(),
            sorbet_args: DEFAULT_SORBET_ARGS.iter().map(|s| s.to_string()).collect(),
            hover_timeout: Duration::from_millis(DEFAULT_HOVER_TIMEOUT_MS),
            init_timeout: Duration::from_millis(DEFAULT_INIT_TIMEOUT_MS),
        }
    }
}

impl SessionConfig {
    /// Command line for log messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.sorbet_bin.as_str())
            .chain(self.sorbet_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What to do with a file the parser rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseErrorPolicy {
    /// Stop the run with the parse error.
    #[default]
    Abort,
    /// Log the error and continue with the next file.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{}', expected 'text' or 'json'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub excluded: ExcludedCalls,
    pub on_parse_error: ParseErrorPolicy,
    /// Print only the first N entries.
    pub top: Option<usize>,
    pub format: OutputFormat,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            excluded: ExcludedCalls::default(),
            on_parse_error: ParseErrorPolicy::Abort,
            top: None,
            format: OutputFormat::Text,
        }
    }
}
