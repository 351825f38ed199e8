//! Configuration for indexing and search.
//!
//! All tunables live in a single [`IndexConfig`] record so the CLI, the
//! ingest pipeline, and the index agree on defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default data directory for the persisted index.
pub const DEFAULT_DATA_DIR: &str = "data/processed";

/// Default embedding model identifier.
pub const DEFAULT_EMBEDDER_ID: &str = "all-MiniLM-L6-v2";

/// Files above this size are parsed with the chunked large-file path.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 1024 * 1024;

/// Documentation sections above this length are split by the chunker.
pub const DEFAULT_SECTION_CHUNK_MAX_CHARS: usize = 500;

/// Nearest-neighbor over-fetch factor for post-filtered search.
pub const DEFAULT_OVER_FETCH_MULTIPLIER: usize = 2;

/// Directory basenames pruned by the file walker.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    "build",
    "dist",
    "venv",
    ".venv",
    ".pytest_cache",
    ".mypy_cache",
    ".coverage",
    "htmlcov",
];

/// File globs rejected by the file walker.
pub const DEFAULT_IGNORE_GLOBS: &[&str] = &[
    ".git",
    ".DS_Store",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    "*.so",
    "*.dylib",
    "*.dll",
    "*.class",
    "*.log",
];

/// Extensions always excluded from indexing, before user filters apply.
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &[
    "pyc", "pyo", "DS_Store", "git", "svn", "bzr", "hg", "idea", "vscode", "cache", "egg-info",
];

/// Configuration record for the whole ingest-and-search system.
///
/// # Examples
///
/// ```
/// use code_cognitio::config::IndexConfig;
///
/// let config = IndexConfig::new()
///     .data_dir("target/index")
///     .over_fetch_multiplier(4);
/// assert_eq!(config.over_fetch_multiplier, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory where the persisted index lives.
    pub data_dir: PathBuf,

    /// Identifier of the embedding model in use.
    pub embedder_identifier: String,

    /// Whether GPU acceleration was requested for the embedder.
    pub use_gpu: bool,

    /// Whether the normalizer applies stop-word removal and lemmatization.
    ///
    /// When false, normalization stops after punctuation stripping and
    /// whitespace collapsing.
    pub use_rich_normalization: bool,

    /// Size in bytes above which Python files use chunked parsing.
    pub large_file_threshold_bytes: u64,

    /// Maximum documentation-section length before splitting.
    pub section_chunk_max_chars: usize,

    /// Directory basenames pruned during walking.
    pub ignore_dirs: Vec<String>,

    /// File globs rejected during walking.
    pub ignore_globs: Vec<String>,

    /// Over-fetch factor for filtered nearest-neighbor search.
    pub over_fetch_multiplier: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            embedder_identifier: DEFAULT_EMBEDDER_ID.to_string(),
            use_gpu: false,
            use_rich_normalization: true,
            large_file_threshold_bytes: DEFAULT_LARGE_FILE_THRESHOLD,
            section_chunk_max_chars: DEFAULT_SECTION_CHUNK_MAX_CHARS,
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(ToString::to_string).collect(),
            ignore_globs: DEFAULT_IGNORE_GLOBS
                .iter()
                .map(ToString::to_string)
                .collect(),
            over_fetch_multiplier: DEFAULT_OVER_FETCH_MULTIPLIER,
        }
    }
}

impl IndexConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the data directory.
    #[must_use]
    pub fn data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets the embedder identifier.
    #[must_use]
    pub fn embedder_identifier(mut self, id: &str) -> Self {
        self.embedder_identifier = id.to_string();
        self
    }

    /// Sets whether GPU acceleration is requested.
    #[must_use]
    pub const fn use_gpu(mut self, gpu: bool) -> Self {
        self.use_gpu = gpu;
        self
    }

    /// Sets whether rich normalization (stop words, lemmatization) is used.
    #[must_use]
    pub const fn use_rich_normalization(mut self, rich: bool) -> Self {
        self.use_rich_normalization = rich;
        self
    }

    /// Sets the large-file threshold in bytes.
    #[must_use]
    pub const fn large_file_threshold_bytes(mut self, bytes: u64) -> Self {
        self.large_file_threshold_bytes = bytes;
        self
    }

    /// Sets the maximum section length before chunking.
    #[must_use]
    pub const fn section_chunk_max_chars(mut self, chars: usize) -> Self {
        self.section_chunk_max_chars = chars;
        self
    }

    /// Sets the over-fetch multiplier (clamped to at least 1).
    #[must_use]
    pub fn over_fetch_multiplier(mut self, factor: usize) -> Self {
        self.over_fetch_multiplier = factor.max(1);
        self
    }
}
