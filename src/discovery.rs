//! Project discovery: `sorbet/config` parsing and input file enumeration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::clean_path;
use crate::error::{Result, SigcovError};

pub const CONFIG_FILE: &str = "sorbet/config";
pub const GEM_RBI_DIR: &str = "sorbet/rbi/gems";

/// Options in `sorbet/config` whose value may sit on the next line.
const OPTIONS_WITH_VALUE: &[&str] = &[
    "--dir",
    "--ignore",
    "--allowed-extension",
    "--cache-dir",
    "--suppress-error-code",
    "--isolate-error-code",
    "--typed",
];

/// The subset of `sorbet/config` that decides which files get analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorbetConfig {
    pub paths: Vec<String>,
    pub ignore: Vec<String>,
    pub allowed_extensions: Vec<String>,
}

impl Default for SorbetConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            ignore: Vec::new(),
            allowed_extensions: vec![".rb".to_string(), ".rbi".to_string()],
        }
    }
}

impl SorbetConfig {
    /// Load `<root>/sorbet/config`. Fails when the directory is not a Sorbet project.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Err(SigcovError::NotSorbetProject {
                dir: clean_path(&root.to_string_lossy()),
            });
        }
        let text = std::fs::read_to_string(&path)?;
        Ok(Self::parse(&text))
    }

    /// One argument per line, `#` comments, options as `--opt=value` or `--opt value`.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        let mut custom_extensions = Vec::new();
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        while let Some(line) = lines.next() {
            if !line.starts_with('-') {
                config.paths.push(line.to_string());
                continue;
            }
            let (option, inline) = match line.split_once('=') {
                Some((o, v)) => (o, Some(v.trim().to_string())),
                None => (line, None),
            };
            let value = match inline {
                Some(v) => Some(v),
                None if OPTIONS_WITH_VALUE.contains(&option) => lines.next().map(str::to_string),
                None => None,
            };
            match (option, value) {
                ("--dir", Some(v)) => config.paths.push(v),
                ("--ignore", Some(v)) => config.ignore.push(v),
                ("--allowed-extension", Some(v)) => custom_extensions.extend(
                    v.split(',').map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
                ),
                _ => {}
            }
        }

        if !custom_extensions.is_empty() {
            config.allowed_extensions = custom_extensions;
        }
        if config.paths.is_empty() {
            config.paths.push(".".to_string());
        }
        config
    }

    /// Sorbet's `--ignore` rule: a leading `/` anchors the pattern at the start of
    /// the project-relative path, anything else matches as a substring.
    pub fn is_ignored(&self, relative: &str) -> bool {
        let anchored = format!("/{}", relative.trim_start_matches("./"));
        self.ignore.iter().any(|pattern| {
            if pattern.starts_with('/') {
                anchored.starts_with(pattern.as_str())
            } else {
                anchored.contains(pattern.as_str())
            }
        })
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let dotted = format!(".{}", ext.to_string_lossy());
        self.allowed_extensions.iter().any(|e| *e == dotted)
    }
}

/// A source file to analyze: where to read it and how to name it in output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Project-relative path with `/` separators.
    pub display: String,
    pub path: PathBuf,
}

impl SourceFile {
    /// A path given on the command line, relative to `root` unless absolute.
    pub fn from_arg(root: &Path, arg: &str) -> Self {
        let path = Path::new(arg);
        let full = if path.is_absolute() { path.to_path_buf() } else { root.join(path) };
        let display = full
            .strip_prefix(root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| arg.to_string());
        Self { display, path: full }
    }
}

fn is_rbi(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "rbi")
}

/// Source files selected by `config`, sorted, without interface (`.rbi`) files.
pub fn source_files(root: &Path, config: &SorbetConfig) -> Result<Vec<SourceFile>> {
    let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();

    for input in &config.paths {
        let start = root.join(input);
        if start.is_file() {
            let file = SourceFile::from_arg(root, input);
            if !is_rbi(&file.path) && !config.is_ignored(&file.display) {
                found.insert(file.display, file.path);
            }
            continue;
        }
        if !start.is_dir() {
            debug!(path = %start.display(), "Configured input path does not exist");
            continue;
        }

        let mut builder = WalkBuilder::new(&start);
        builder.standard_filters(false);
        builder.hidden(true);
        builder.sort_by_file_name(|a, b| a.cmp(b));

        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if is_rbi(path) || !config.extension_allowed(path) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let display = relative.to_string_lossy().replace('\\', "/");
            if config.is_ignored(&display) {
                continue;
            }
            found.insert(display, path.to_path_buf());
        }
    }

    if found.is_empty() {
        return Err(SigcovError::NoInputFiles {
            dir: clean_path(&root.to_string_lossy()),
        });
    }
    Ok(found
        .into_iter()
        .map(|(display, path)| SourceFile { display, path })
        .collect())
}

/// Files named on the command line, or the configured project files when none are given.
pub fn resolve_inputs(root: &Path, args: &[String], config: &SorbetConfig) -> Result<Vec<SourceFile>> {
    if args.is_empty() {
        return source_files(root, config);
    }
    Ok(args
        .iter()
        .map(|arg| SourceFile::from_arg(root, arg))
        .filter(|f| !is_rbi(&f.path))
        .collect())
}

/// Every `sorbet/rbi/gems/**/*.rbi`, sorted.
pub fn gem_rbi_files(root: &Path) -> Vec<PathBuf> {
    let dir = root.join(GEM_RBI_DIR);
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut builder = WalkBuilder::new(&dir);
    builder.standard_filters(false);
    let mut files: Vec<PathBuf> = builder
        .build()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
        .map(|e| e.into_path())
        .filter(|p| is_rbi(p))
        .collect();
    files.sort();
    files
}
