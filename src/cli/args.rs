//! CLI argument structs for all subcommands.

use std::time::Duration;

use clap::Parser;

use sigcov::config::{
    AnalysisConfig, OutputFormat, ParseErrorPolicy, SessionConfig, DEFAULT_HOVER_TIMEOUT_MS,
    DEFAULT_INIT_TIMEOUT_MS, DEFAULT_SORBET_BIN,
};
use sigcov::ExcludedCalls;

#[derive(Parser, Debug)]
#[command(after_long_help = r#"EXAMPLES:
  Whole project:    sigcov sends -d ~/src/shop
  Some files:       sigcov sends app/models/order.rb app/models/user.rb
  Top 20 as JSON:   sigcov sends --top 20 --format json
  Custom binary:    sigcov sends --sorbet-bin bin/srb
  Skip bad files:   sigcov sends --keep-going
  Ignore a DSL:     sigcov sends --exclude attr_reader --exclude delegate

NOTES:
  - Must run inside a Sorbet project (a directory with sorbet/config)
  - Without FILES, inputs come from sorbet/config (paths and --ignore)
  - Gem RBIs under sorbet/rbi/gems/ provide candidates for untyped receivers
  - Output: one "<count>\t<receiver>#<method>" line per call identity,
    most frequent first; candidate declarations are indented below
"#)]
pub struct SendsArgs {
    /// Files to analyze (default: every file selected by sorbet/config).
    pub files: Vec<String>,

    /// Project root.
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Sorbet executable.
    #[arg(long, default_value = DEFAULT_SORBET_BIN)]
    pub sorbet_bin: String,

    /// Replace the default Sorbet arguments (repeatable).
    #[arg(long, action = clap::ArgAction::Append, allow_hyphen_values = true)]
    pub sorbet_arg: Vec<String>,

    /// Per-hover timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_HOVER_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Timeout for the initial typecheck, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_INIT_TIMEOUT_MS)]
    pub init_timeout_ms: u64,

    /// Extra call names to ignore (repeatable).
    #[arg(long, action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Skip files with syntax errors instead of stopping.
    #[arg(long)]
    pub keep_going: bool,

    /// Show only the N most frequent entries.
    #[arg(long)]
    pub top: Option<usize>,

    /// Output format: text or json.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Log level for stderr output (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit stderr logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

impl SendsArgs {
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig {
            sorbet_bin: self.sorbet_bin.clone(),
            hover_timeout: Duration::from_millis(self.timeout_ms),
            init_timeout: Duration::from_millis(self.init_timeout_ms),
            ..SessionConfig::default()
        };
        if !self.sorbet_arg.is_empty() {
            config.sorbet_args = self.sorbet_arg.clone();
        }
        config
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            excluded: ExcludedCalls::with_extra(self.exclude.iter().cloned()),
            on_parse_error: if self.keep_going {
                ParseErrorPolicy::Skip
            } else {
                ParseErrorPolicy::Abort
            },
            top: self.top,
            format: self.format,
        }
    }
}

#[derive(Parser, Debug)]
pub struct CallsArgs {
    /// Files to scan (default: every file selected by sorbet/config).
    pub files: Vec<String>,

    /// Project root.
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Extra call names to ignore (repeatable).
    #[arg(long, action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Skip files with syntax errors instead of stopping.
    #[arg(long)]
    pub keep_going: bool,

    /// Log level for stderr output (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Parser, Debug)]
pub struct MethodsArgs {
    /// Method name to look up, e.g. `save`.
    pub name: String,

    /// Project root.
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Log level for stderr output (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}
