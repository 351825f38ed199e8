//! Error types for code-cognitio operations.
//!
//! This module provides a comprehensive error hierarchy using `thiserror` for
//! extraction, indexing, I/O, and CLI command failures.
//!
//! Extractors never fail a build: the ingest pipeline downgrades
//! [`ExtractionError`] to a warning and skips the file. Only embedder and
//! persistence failures are fatal to a build.

use thiserror::Error;

/// Result type alias for code-cognitio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for code-cognitio operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Extraction-related errors (parsing source files).
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Index-related errors (embedding, persistence, search).
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Extraction-specific errors for source-file parsing.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The file could not be parsed into any chunks.
    #[error("failed to extract from {path}: {reason}")]
    NoChunks {
        /// Path to the file.
        path: String,
        /// Reason extraction produced nothing.
        reason: String,
    },

    /// Syntax-level parse failure (before regex salvage).
    #[error("parse failure in {path}: {reason}")]
    ParseFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Parser backend could not be initialized (grammar load).
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// Regex compilation error in an extractor.
    #[error("regex error: {0}")]
    Regex(String),
}

/// Index-specific errors for embedding, persistence, and search.
#[derive(Error, Debug)]
pub enum IndexError {
    /// No persisted index exists in the data directory.
    #[error("no index found in {data_dir}. Run: code-cognitio build <paths>")]
    Missing {
        /// Data directory that was searched.
        data_dir: String,
    },

    /// The persisted index was built with a different embedder.
    #[error("index built with embedder '{found}' but '{expected}' is in use")]
    Incompatible {
        /// Embedder identifier currently configured.
        expected: String,
        /// Embedder identifier recorded in the index metadata.
        found: String,
    },

    /// Embedding generation failed. Fatal to a build.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Vector dimension mismatch between embedder and stored matrix.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Dimension the embedder produces.
        expected: usize,
        /// Dimension found in the data.
        found: usize,
    },

    /// Persistence read/write failure.
    #[error("persistence error: {path}: {reason}")]
    Persist {
        /// File involved.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Corrupt or unrecognized index binary file.
    #[error("corrupt index file: {path}: {reason}")]
    Corrupt {
        /// File involved.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation or traversal error.
    #[error("failed to access directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),

    /// Output format error.
    #[error("output format error: {0}")]
    OutputFormat(String),
}

// Implement From traits for standard library and ecosystem errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Index(IndexError::Serialization(err.to_string()))
    }
}

impl From<regex::Error> for ExtractionError {
    fn from(err: regex::Error) -> Self {
        Self::Regex(err.to_string())
    }
}

impl Error {
    /// Returns the process exit code for this error.
    ///
    /// Mapping: 1 for a missing index on search, 2 for I/O, embedding, and
    /// persistence failures, 3 for invalid arguments and configuration.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Index(IndexError::Missing { .. }) => 1,
            Self::Command(CommandError::InvalidArgument(_)) | Self::Config { .. } => 3,
            _ => 2,
        }
    }
}
