//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros. Three verbs: `build`
//! walks roots and persists an index, `search` runs a filtered query against
//! it, `list-file-types` enumerates supported extensions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Code Cognitio: semantic search for source-code repositories.
///
/// Extracts functions, classes, documentation sections, and container-build
/// directives into a vector index and serves filtered nearest-neighbor
/// queries over it.
#[derive(Parser, Debug)]
#[command(name = "code-cognitio")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory where the index is stored.
    ///
    /// Defaults to `data/processed` in the current directory.
    #[arg(long, env = "DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and persist the search index from source trees.
    Build {
        /// Files or directories to index.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Comma-separated file types to include, or `all`.
        #[arg(long, default_value = "all")]
        file_types: String,

        /// Comma-separated file types to exclude.
        #[arg(long, default_value = "")]
        exclude_types: String,

        /// Embedding model identifier recorded in the index.
        #[arg(long)]
        embedder_id: Option<String>,

        /// Request GPU acceleration for embedding.
        #[arg(long)]
        gpu: bool,
    },

    /// Search the index.
    Search {
        /// The search query.
        query: String,

        /// Number of results to return.
        #[arg(long, default_value = "5")]
        top_k: usize,

        /// Filter by content type (code, documentation).
        #[arg(long)]
        filter: Option<String>,

        /// Minimum similarity score.
        #[arg(long, default_value = "0.0")]
        min_score: f32,

        /// Filter by chunk kind (function, method, class, module, ...).
        #[arg(long = "type")]
        type_filter: Option<String>,

        /// Filter by parameter type substring.
        #[arg(long)]
        param_type: Option<String>,

        /// Filter by parameter name substring.
        #[arg(long)]
        param_name: Option<String>,

        /// Filter by return type substring.
        #[arg(long)]
        return_type: Option<String>,

        /// Emit results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List supported code and documentation file types.
    ListFileTypes {
        /// Emit the listing as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Returns the data directory, using the default if not specified.
    #[must_use]
    pub fn get_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::config::DEFAULT_DATA_DIR))
    }
}
