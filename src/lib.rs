//! # Code Cognitio
//!
//! Semantic search for source-code repositories.
//!
//! Code Cognitio walks a directory tree, extracts semantically meaningful
//! units (functions, methods, classes, documentation sections, code blocks,
//! container-build directives) into a uniform chunk schema, embeds each
//! chunk with a sentence-embedding model, and serves nearest-neighbor
//! queries filtered by structural predicates.
//!
//! ## Features
//!
//! - **Extraction**: AST-level Python parsing plus regex-based extractors
//!   for JavaScript/TypeScript, Markdown, reStructuredText, and
//!   container-build files
//! - **Normalization**: stop-word removal and lemmatization producing an
//!   embedding-ready string per chunk
//! - **Vector index**: three parallel flat inner-product collections
//!   (all / code / documentation) with an eight-file persisted layout
//! - **Filtered search**: over-fetched nearest-neighbor recall with
//!   structural post-filters (kind, parameter name/type, return type)

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod io;
pub mod processing;
pub mod search;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{Chunk, ChunkKind, ChunkPayload, ContentType};

// Re-export configuration
pub use config::IndexConfig;

// Re-export extraction types
pub use extract::{Extractor, ExtractorRegistry};

// Re-export ingest types
pub use ingest::{FileWalker, IngestPipeline};

// Re-export embedding types
#[cfg(feature = "fastembed-embeddings")]
pub use embedding::FastEmbedEmbedder;
pub use embedding::{DEFAULT_DIMENSIONS, Embedder, FallbackEmbedder, create_embedder};

// Re-export index and search types
pub use index::{IndexStatus, SearchIndex};
pub use search::{SearchOptions, SearchResult};
