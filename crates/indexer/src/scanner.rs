use crate::error::{IndexerError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Traversal settings, derived from the indexing config
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Glob patterns a file must match to be kept (empty = keep all)
    pub include: Vec<String>,

    /// Glob patterns that always exclude a file, even when included
    pub exclude: Vec<String>,

    /// Honor .gitignore files during traversal
    pub follow_ignore_file: bool,
}

/// One file that survived filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Path relative to the scan root, with forward slashes
    pub rel_path: String,
    pub size: u64,
}

/// What a scan produced: files to index plus everything that was
/// skipped along the way
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<ScannedFile>,
    /// Files skipped because they looked binary
    pub binary_skipped: usize,
    /// Unreadable paths and other non-fatal traversal problems
    pub warnings: Vec<String>,
}

/// Scanner for finding indexable source files in a project
pub struct FileScanner {
    root: PathBuf,
    config: ScanConfig,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>, config: ScanConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let include = build_globset(&config.include)?;
        let exclude = build_globset(&config.exclude)?;

        Ok(Self {
            root,
            config,
            include,
            exclude,
        })
    }

    /// Walk the project and collect files to index.
    ///
    /// Siblings are visited in lexicographic order, so repeated scans of
    /// an unchanged tree produce identical outcomes.
    pub fn scan(&self) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            // Honor ignore files even when the tree is not a git repo.
            .require_git(false)
            .git_ignore(self.config.follow_ignore_file)
            .git_global(self.config.follow_ignore_file)
            .git_exclude(self.config.follow_ignore_file)
            .ignore(self.config.follow_ignore_file)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(move |entry| !Self::is_denied_scope(entry.path(), &root));

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    outcome.warnings.push(e.to_string());
                    continue;
                }
            };

            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            let rel_path = match path.strip_prefix(&self.root) {
                Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                Err(_) => path.to_string_lossy().into_owned(),
            };

            if let Some(exclude) = &self.exclude {
                if exclude.is_match(&rel_path) {
                    continue;
                }
            }
            if let Some(include) = &self.include {
                if !include.is_match(&rel_path) {
                    continue;
                }
            }

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    outcome
                        .warnings
                        .push(format!("cannot stat {rel_path}: {e}"));
                    continue;
                }
            };

            match is_binary(path) {
                Ok(true) => {
                    log::debug!("Skipping binary file {rel_path}");
                    outcome.binary_skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    outcome
                        .warnings
                        .push(format!("cannot read {rel_path}: {e}"));
                    continue;
                }
            }

            outcome.files.push(ScannedFile {
                path: path.to_path_buf(),
                rel_path,
                size,
            });
        }

        log::info!(
            "Found {} files ({} binary skipped, {} warnings)",
            outcome.files.len(),
            outcome.binary_skipped,
            outcome.warnings.len()
        );
        outcome
    }

    /// Built-in scope denylist.
    ///
    /// These never hold indexable sources; a negated gitignore pattern
    /// cannot bring them back.
    fn is_denied_scope(path: &Path, root: &Path) -> bool {
        if let Ok(relative) = path.strip_prefix(root) {
            for component in relative.components() {
                if let std::path::Component::Normal(name) = component {
                    let lowered = name.to_string_lossy().to_lowercase();
                    if DENIED_SCOPES.iter().any(|denied| denied == &lowered) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| IndexerError::InvalidPattern(format!("{pattern}: {e}")))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| IndexerError::InvalidPattern(e.to_string()))?;
    Ok(Some(set))
}

/// Binary detection: a known binary extension, or a NUL byte in the
/// first KiB of content
fn is_binary(path: &Path) -> std::io::Result<bool> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let ext = ext.to_lowercase();
        if BINARY_EXTENSIONS.iter().any(|candidate| candidate == &ext) {
            return Ok(true);
        }
    }

    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; 1024];
    let read = file.read(&mut buf)?;
    Ok(buf[..read].contains(&0))
}

const DENIED_SCOPES: &[&str] = &[
    // VCS / tooling
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    // caches / builds
    "__pycache__",
    "node_modules",
    ".venv",
    "venv",
    ".ctxai",
    "dist",
    "build",
    "target",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".tox",
    ".cache",
    ".next",
    "coverage",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "o", "obj", "a", "lib", "pyc", "class", "jar", "wasm",
    "zip", "tar", "gz", "bz2", "xz", "7z", "rar", "jpg", "jpeg", "png", "gif", "bmp", "ico",
    "webp", "pdf", "mp3", "mp4", "avi", "mov", "woff", "woff2", "ttf", "otf", "eot", "db",
    "sqlite", "sqlite3", "parquet",
];
