//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;

pub use args::*;

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sigcov::collector::CallCollector;
use sigcov::config::{OutputFormat, ParseErrorPolicy};
use sigcov::discovery::{gem_rbi_files, resolve_inputs, SorbetConfig};
use sigcov::lsp::LspClient;
use sigcov::method_index::index_rbi_files;
use sigcov::pipeline::{analyze, collect_calls};
use sigcov::report::{render_json, render_text};
use sigcov::syntax::ruby::RubyParser;
use sigcov::{clean_path, SigcovError};

// ─── CLI ─────────────────────────────────────────────────────────────

/// Rank the call sites of a Sorbet project that have no matching signature
#[derive(Parser, Debug)]
#[command(name = "sigcov", version, about, after_help = "\
Run 'sigcov <COMMAND> --help' for detailed options and examples.\n\
Common options: -d <DIR> (project root), --exclude <NAME> (ignore a call name)")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// List calls without a signature, most frequent first (starts Sorbet)
    Sends(SendsArgs),

    /// List the calls that would be checked, without starting Sorbet
    Calls(CallsArgs),

    /// Look up a method name in the gem RBIs
    Methods(MethodsArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sends(args) => cmd_sends(args),
        Commands::Calls(args) => cmd_calls(args),
        Commands::Methods(args) => cmd_methods(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` overrides `--log-level`.
fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn project_root(dir: &str) -> Result<PathBuf, SigcovError> {
    let root = std::fs::canonicalize(dir)?;
    Ok(PathBuf::from(clean_path(&root.to_string_lossy())))
}

// ─── Commands ───────────────────────────────────────────────────────

fn cmd_sends(args: SendsArgs) -> Result<(), SigcovError> {
    init_logging(&args.log_level, args.log_json);
    let start = Instant::now();
    let root = project_root(&args.dir)?;
    let sorbet_config = SorbetConfig::load(&root)?;
    let files = resolve_inputs(&root, &args.files, &sorbet_config)?;
    if files.is_empty() {
        return Err(SigcovError::NoInputFiles {
            dir: root.display().to_string(),
        });
    }

    info!("Indexing methods from gem RBIs");
    let index = index_rbi_files(&root, &gem_rbi_files(&root));

    let config = args.analysis_config();
    let service = LspClient::new(args.session_config());
    let analysis = analyze(service, &mut RubyParser::new(), &root, &files, &index, &config)?;

    let out = match config.format {
        OutputFormat::Text => {
            format!("Top sends:\n{}", render_text(&analysis.report.entries, config.top))
        }
        OutputFormat::Json => render_json(&analysis.report, config.top)? + "\n",
    };
    write_stdout(&out)?;

    info!(
        files = analysis.files,
        skipped = analysis.skipped_files,
        calls = analysis.calls,
        unsigned = analysis.report.stats.without_signature,
        restarts = analysis.matcher.restarts,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Done"
    );
    Ok(())
}

fn cmd_calls(args: CallsArgs) -> Result<(), SigcovError> {
    init_logging(&args.log_level, false);
    let root = project_root(&args.dir)?;
    let sorbet_config = if args.files.is_empty() {
        SorbetConfig::load(&root)?
    } else {
        SorbetConfig::default()
    };
    let files = resolve_inputs(&root, &args.files, &sorbet_config)?;

    let collector = CallCollector::new(sigcov::ExcludedCalls::with_extra(args.exclude.iter().cloned()));
    let policy = if args.keep_going {
        ParseErrorPolicy::Skip
    } else {
        ParseErrorPolicy::Abort
    };
    let collected = collect_calls(&mut RubyParser::new(), &collector, &files, policy)?;

    let mut out = String::new();
    for call in &collected.calls {
        out.push_str(&call.to_string());
        out.push('\n');
    }
    write_stdout(&out)?;
    eprintln!(
        "{} calls in {} files ({} skipped)",
        collected.calls.len(),
        collected.files,
        collected.skipped.len()
    );
    Ok(())
}

fn cmd_methods(args: MethodsArgs) -> Result<(), SigcovError> {
    init_logging(&args.log_level, false);
    let root = project_root(&args.dir)?;
    let index = index_rbi_files(&root, &gem_rbi_files(&root));
    let found = index.lookup(&args.name);
    if found.is_empty() {
        eprintln!("No declaration of '{}' in {} gem RBI methods", args.name, index.len());
        return Ok(());
    }
    let mut out = String::new();
    for decl in found {
        out.push_str(&format!("{} ({})\n", decl.fully_qualified_name, decl.location));
    }
    write_stdout(&out)
}

/// Write the whole report at once; a closed pipe (`| head`) is not an error.
fn write_stdout(text: &str) -> Result<(), SigcovError> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    match lock.write_all(text.as_bytes()).and_then(|_| lock.flush()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(e.into()),
    }
}
