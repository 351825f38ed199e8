//! File walker with ignore rules.
//!
//! Enumerates candidate files under a set of roots, pruning ignored
//! directories and rejecting hidden files, excluded extensions, and
//! ignore-glob matches. Directory entries are visited in sorted order so the
//! resulting file list (and therefore index row order) is deterministic.

use crate::config::{DEFAULT_EXCLUDED_EXTENSIONS, IndexConfig};
use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Walks directory trees applying ignore-dir and ignore-glob rules.
///
/// # Examples
///
/// ```no_run
/// use code_cognitio::config::IndexConfig;
/// use code_cognitio::ingest::FileWalker;
///
/// let walker = FileWalker::from_config(&IndexConfig::default()).unwrap();
/// let files = walker.walk(&["src".into()]);
/// ```
pub struct FileWalker {
    /// Directory basenames to prune.
    ignore_dirs: BTreeSet<String>,
    /// Compiled ignore globs matched against file basenames.
    ignore_globs: GlobSet,
    /// Extensions always excluded.
    excluded_extensions: Vec<String>,
}

impl FileWalker {
    /// Builds a walker from the configured ignore lists.
    ///
    /// # Errors
    ///
    /// Returns an error if an ignore glob fails to compile.
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore_globs {
            let glob = Glob::new(pattern).map_err(|e| Error::Config {
                message: format!("invalid ignore glob '{pattern}': {e}"),
            })?;
            builder.add(glob);
        }
        let ignore_globs = builder.build().map_err(|e| Error::Config {
            message: format!("failed to build ignore glob set: {e}"),
        })?;

        Ok(Self {
            ignore_dirs: config.ignore_dirs.iter().cloned().collect(),
            ignore_globs,
            excluded_extensions: DEFAULT_EXCLUDED_EXTENSIONS
                .iter()
                .map(|e| format!(".{e}"))
                .collect(),
        })
    }

    /// Enumerates candidate files under the given roots.
    ///
    /// A root that is a regular file is yielded as-is; directories are
    /// walked recursively. Unreadable directories are logged and skipped,
    /// never propagated.
    #[must_use]
    pub fn walk(&self, roots: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in roots {
            if root.is_file() {
                files.push(root.clone());
            } else if root.is_dir() {
                self.visit(root, &mut files);
            } else {
                warn!(path = %root.display(), "path is neither file nor directory, skipping");
            }
        }
        files
    }

    fn visit(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory, skipping");
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        paths.sort();

        for path in paths {
            let Some(basename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if path.is_dir() {
                if basename.starts_with('.') || self.ignore_dirs.contains(basename) {
                    debug!(path = %path.display(), "pruning ignored directory");
                    continue;
                }
                self.visit(&path, files);
            } else if self.accepts(basename) {
                files.push(path);
            }
        }
    }

    /// Returns true if a file with this basename passes the ignore rules.
    #[must_use]
    pub fn accepts(&self, basename: &str) -> bool {
        if basename.starts_with('.') {
            return false;
        }
        if self
            .excluded_extensions
            .iter()
            .any(|ext| basename.ends_with(ext.as_str()))
        {
            return false;
        }
        !self.ignore_globs.is_match(basename)
    }
}
