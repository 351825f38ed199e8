//! The vector search index.
//!
//! Three parallel append-only collections (all / code / documentation),
//! each a flat inner-product index over L2-normalized embeddings, with a
//! persistent on-disk layout. Building embeds chunks in batches and routes
//! every chunk to `all` plus the collection matching its content type;
//! searching over-fetches from one collection and applies the structural
//! post-filters.

mod collection;
mod persist;

pub use collection::VectorCollection;
pub use persist::{IndexMetadata, METADATA_FILE, index_exists, index_size_bytes, read_metadata};

use crate::config::IndexConfig;
use crate::core::{Chunk, ChunkPayload, ContentType};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::processing::TextNormalizer;
use crate::search::{SearchOptions, SearchResult, display_content, passes_filters};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Embedding batch size for index builds.
const EMBED_BATCH_SIZE: usize = 32;

/// The filtered vector search engine.
///
/// # Examples
///
/// ```
/// use code_cognitio::config::IndexConfig;
/// use code_cognitio::embedding::{FallbackEmbedder, DEFAULT_DIMENSIONS};
/// use code_cognitio::index::SearchIndex;
///
/// let embedder = Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS));
/// let index = SearchIndex::new(embedder, IndexConfig::default());
/// assert_eq!(index.total_chunks(), 0);
/// ```
pub struct SearchIndex {
    config: IndexConfig,
    embedder: Box<dyn Embedder>,
    normalizer: TextNormalizer,
    all: VectorCollection,
    code: VectorCollection,
    doc: VectorCollection,
}

impl SearchIndex {
    /// Creates an empty index backed by the given embedder.
    #[must_use]
    pub fn new(embedder: Box<dyn Embedder>, config: IndexConfig) -> Self {
        let dimension = embedder.dimensions();
        let normalizer = TextNormalizer::new(config.use_rich_normalization);
        Self {
            config,
            embedder,
            normalizer,
            all: VectorCollection::new(dimension),
            code: VectorCollection::new(dimension),
            doc: VectorCollection::new(dimension),
        }
    }

    /// Returns the total number of indexed chunks.
    #[must_use]
    pub const fn total_chunks(&self) -> usize {
        self.all.len()
    }

    /// Returns the number of code chunks.
    #[must_use]
    pub const fn code_chunks(&self) -> usize {
        self.code.len()
    }

    /// Returns the number of documentation chunks.
    #[must_use]
    pub const fn doc_chunks(&self) -> usize {
        self.doc.len()
    }

    /// Returns the configuration this index was created with.
    #[must_use]
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Embeds and appends chunks to the collections.
    ///
    /// Every chunk lands in `all`; code chunks additionally land in `code`
    /// and documentation chunks in `doc`. Embedding runs in batches.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedder fails; a failed build leaves no
    /// partial persistence behind.
    pub fn add_chunks(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        info!(count = chunks.len(), "generating embeddings");
        let texts: Vec<String> = chunks.iter().map(embedding_text).collect();

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            embeddings.extend(self.embedder.embed_batch(&refs)?);
        }

        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            match chunk.content_type() {
                ContentType::Code => self.code.add(&embedding, chunk.clone())?,
                ContentType::Documentation => self.doc.add(&embedding, chunk.clone())?,
            }
            self.all.add(&embedding, chunk)?;
        }

        info!(
            total = self.all.len(),
            code = self.code.len(),
            doc = self.doc.len(),
            "chunks added to index"
        );
        Ok(())
    }

    /// Searches the index.
    ///
    /// Selects the collection matching the content filter, over-fetches
    /// nearest neighbors, drops candidates below the minimum score, applies
    /// the structural post-filters, and truncates to `top_k`.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query fails.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let collection = match options.content_filter {
            Some(ContentType::Code) if !self.code.is_empty() => &self.code,
            Some(ContentType::Documentation) if !self.doc.is_empty() => &self.doc,
            _ => &self.all,
        };

        if collection.is_empty() || options.top_k == 0 {
            return Ok(Vec::new());
        }

        // Queries pass through the same normalization as indexed text so
        // the embedder sees both sides in one vocabulary.
        let cleaned = self.normalizer.clean_text(query);
        let query_text = if cleaned.is_empty() { query } else { &cleaned };
        let query_embedding = self.embedder.embed(query_text)?;
        let over_fetch = options
            .top_k
            .saturating_mul(self.config.over_fetch_multiplier.max(1));

        let mut results = Vec::new();
        for (row, score) in collection.search(&query_embedding, over_fetch) {
            if score < options.min_score {
                break;
            }
            let Some(chunk) = collection.chunk(row) else {
                continue;
            };
            if !passes_filters(chunk, options) {
                continue;
            }
            results.push(SearchResult {
                chunk: chunk.clone(),
                score,
                display_content: display_content(chunk),
            });
            if results.len() >= options.top_k {
                break;
            }
        }

        Ok(results)
    }

    /// Persists the index to the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the eight files cannot be written.
    pub fn save(&self) -> Result<()> {
        let metadata = IndexMetadata {
            embedder_identifier: self.embedder.identifier().to_string(),
            dimension: self.embedder.dimensions(),
            total_chunks: self.all.len(),
            code_chunks: self.code.len(),
            doc_chunks: self.doc.len(),
        };
        persist::save(&self.config.data_dir, &metadata, [&self.all, &self.code, &self.doc])?;
        info!(
            data_dir = %self.config.data_dir.display(),
            chunks = self.all.len(),
            "index persisted"
        );
        Ok(())
    }

    /// Loads a persisted index.
    ///
    /// An embedder-identifier mismatch is logged at WARN but does not fail
    /// the load; results against a foreign index are undefined.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::IndexError::Missing`] when no index exists,
    /// or a corruption error for damaged files.
    pub fn load(embedder: Box<dyn Embedder>, config: IndexConfig) -> Result<Self> {
        let (metadata, [all, code, doc]) = persist::load(&config.data_dir)?;

        if metadata.embedder_identifier != embedder.identifier() {
            warn!(
                index_embedder = metadata.embedder_identifier,
                current_embedder = embedder.identifier(),
                "index was built with a different embedder; results are undefined"
            );
        }

        info!(
            total = all.len(),
            code = code.len(),
            doc = doc.len(),
            "index loaded"
        );

        let normalizer = TextNormalizer::new(config.use_rich_normalization);
        Ok(Self {
            config,
            embedder,
            normalizer,
            all,
            code,
            doc,
        })
    }
}

/// Status snapshot of a persisted index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    /// Whether a persisted index exists.
    pub ready: bool,
    /// Total chunks recorded in metadata.
    pub total_chunks: usize,
    /// Code chunks recorded in metadata.
    pub code_chunks: usize,
    /// Documentation chunks recorded in metadata.
    pub doc_chunks: usize,
    /// On-disk size of the index files in bytes.
    pub size_bytes: u64,
    /// Embedder identifier recorded in metadata.
    pub embedder_identifier: String,
    /// Data directory inspected.
    pub data_dir: String,
}

impl IndexStatus {
    /// Inspects the persisted index under a data directory.
    #[must_use]
    pub fn inspect(data_dir: &Path) -> Self {
        read_metadata(data_dir).map_or_else(
            |_| Self {
                ready: false,
                total_chunks: 0,
                code_chunks: 0,
                doc_chunks: 0,
                size_bytes: 0,
                embedder_identifier: String::new(),
                data_dir: data_dir.display().to_string(),
            },
            |metadata| Self {
                ready: true,
                total_chunks: metadata.total_chunks,
                code_chunks: metadata.code_chunks,
                doc_chunks: metadata.doc_chunks,
                size_bytes: index_size_bytes(data_dir),
                embedder_identifier: metadata.embedder_identifier,
                data_dir: data_dir.display().to_string(),
            },
        )
    }
}

/// Composes the embedding input for a chunk.
///
/// Callables use their signature plus docstring; classes their name plus
/// docstring; sections and code blocks their title plus content. Anything
/// else uses name plus content, falling back to whatever raw text exists so
/// the embedder never sees an empty string.
#[must_use]
pub fn embedding_text(chunk: &Chunk) -> String {
    let processed_or = |raw: &str| -> String {
        if chunk.processed_text.trim().is_empty() {
            raw.to_string()
        } else {
            chunk.processed_text.clone()
        }
    };

    let text = match &chunk.payload {
        ChunkPayload::Function(info) | ChunkPayload::Method(info) => {
            format!("{}\n{}", info.signature, processed_or(&info.docstring))
        }
        ChunkPayload::Class(info) => {
            format!("class {}\n{}", chunk.name, processed_or(&info.docstring))
        }
        ChunkPayload::Section(info) => {
            format!("{}\n{}", info.title, processed_or(&chunk.raw_text))
        }
        ChunkPayload::CodeBlock(info) => {
            format!("{}\n{}", info.title, processed_or(&chunk.raw_text))
        }
        _ => format!("{}\n{}", chunk.name, processed_or(&chunk.raw_text)),
    };

    if !text.trim().is_empty() {
        return text;
    }
    if !chunk.raw_text.trim().is_empty() {
        return chunk.raw_text.clone();
    }
    chunk.name.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallableInfo, ChunkKind, Param, SectionInfo};
    use crate::embedding::{DEFAULT_DIMENSIONS, FallbackEmbedder};
    use tempfile::TempDir;

    fn test_index() -> SearchIndex {
        SearchIndex::new(
            Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)),
            IndexConfig::default(),
        )
    }

    fn function_chunk(name: &str, doc: &str, param: Option<Param>) -> Chunk {
        let mut chunk = Chunk::new(
            ChunkPayload::Function(CallableInfo {
                docstring: doc.to_string(),
                params: param.into_iter().collect(),
                full_name: name.to_string(),
                ..CallableInfo::default()
            }),
            name,
            "src/lib.py",
            1,
            "python",
        );
        TextNormalizer::default().process_chunk(&mut chunk);
        chunk
    }

    fn section_chunk(title: &str, body: &str) -> Chunk {
        let mut chunk = Chunk::new(
            ChunkPayload::Section(SectionInfo {
                title: title.to_string(),
                level: 1,
                document_title: "README".to_string(),
                ..SectionInfo::default()
            }),
            title,
            "README.md",
            1,
            "markdown",
        )
        .with_raw_text(body);
        TextNormalizer::default().process_chunk(&mut chunk);
        chunk
    }

    #[test]
    fn test_add_routes_by_content_type() {
        let mut index = test_index();
        index
            .add_chunks(vec![
                function_chunk("parse", "Parses input data", None),
                section_chunk("Usage", "how to use the parser"),
            ])
            .unwrap();

        assert_eq!(index.total_chunks(), 2);
        assert_eq!(index.code_chunks(), 1);
        assert_eq!(index.doc_chunks(), 1);
    }

    #[test]
    fn test_search_returns_sorted_results() {
        let mut index = test_index();
        index
            .add_chunks(vec![
                function_chunk("parse_json", "parse json documents quickly", None),
                function_chunk("render_html", "render html templates", None),
                section_chunk("Parsing", "parse json documents with the parser"),
            ])
            .unwrap();

        let results = index
            .search("parse json documents", &SearchOptions::new())
            .unwrap();
        assert!(!results.is_empty());
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_content_filter_disjoint() {
        let mut index = test_index();
        index
            .add_chunks(vec![
                function_chunk("parse", "parse documents", None),
                section_chunk("Parsing", "parse documents"),
            ])
            .unwrap();

        let code = index
            .search(
                "parse documents",
                &SearchOptions::new().content_filter(ContentType::Code),
            )
            .unwrap();
        assert!(!code.is_empty());
        assert!(code.iter().all(|r| r.chunk.content_type() == ContentType::Code));

        let docs = index
            .search(
                "parse documents",
                &SearchOptions::new().content_filter(ContentType::Documentation),
            )
            .unwrap();
        assert!(!docs.is_empty());
        assert!(
            docs.iter()
                .all(|r| r.chunk.content_type() == ContentType::Documentation)
        );

        let unfiltered = index
            .search("parse documents", &SearchOptions::new().top_k(10))
            .unwrap();
        assert_eq!(unfiltered.len(), 2);
    }

    #[test]
    fn test_param_type_post_filter() {
        let mut index = test_index();
        index
            .add_chunks(vec![
                function_chunk(
                    "process_items",
                    "process the items",
                    Some(Param::typed("items", "List[str]")),
                ),
                function_chunk("process_value", "process one value", None),
            ])
            .unwrap();

        let results = index
            .search(
                "process",
                &SearchOptions::new().top_k(10).param_type("list"),
            )
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.name, "process_items");
    }

    #[test]
    fn test_min_score_monotonic() {
        let mut index = test_index();
        index
            .add_chunks(vec![
                function_chunk("alpha", "first function about parsing", None),
                function_chunk("beta", "second function about rendering", None),
                section_chunk("Notes", "completely unrelated paragraph"),
            ])
            .unwrap();

        let low = index
            .search("parsing functions", &SearchOptions::new().top_k(10))
            .unwrap();
        let high = index
            .search(
                "parsing functions",
                &SearchOptions::new().top_k(10).min_score(0.5),
            )
            .unwrap();
        assert!(high.len() <= low.len());
        assert!(high.iter().all(|r| r.score >= 0.5));
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let config = IndexConfig::new().data_dir(tmp.path());

        let mut index = SearchIndex::new(
            Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)),
            config.clone(),
        );
        index
            .add_chunks(vec![
                function_chunk("parse", "parse documents", None),
                section_chunk("Usage", "usage notes"),
            ])
            .unwrap();
        index.save().unwrap();

        let loaded = SearchIndex::load(
            Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)),
            config,
        )
        .unwrap();
        assert_eq!(loaded.total_chunks(), 2);
        assert_eq!(loaded.code_chunks(), 1);
        assert_eq!(loaded.doc_chunks(), 1);

        let results = loaded
            .search("parse documents", &SearchOptions::new())
            .unwrap();
        assert!(!results.is_empty());
    }

    #[test]
    fn test_load_missing() {
        let tmp = TempDir::new().unwrap();
        let config = IndexConfig::new().data_dir(tmp.path());
        let result = SearchIndex::load(
            Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)),
            config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_status() {
        let tmp = TempDir::new().unwrap();
        let status = IndexStatus::inspect(tmp.path());
        assert!(!status.ready);

        let config = IndexConfig::new().data_dir(tmp.path());
        let mut index = SearchIndex::new(
            Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)),
            config,
        );
        index
            .add_chunks(vec![function_chunk("f", "doc", None)])
            .unwrap();
        index.save().unwrap();

        let status = IndexStatus::inspect(tmp.path());
        assert!(status.ready);
        assert_eq!(status.total_chunks, 1);
        assert!(status.size_bytes > 0);
        assert_eq!(status.embedder_identifier, "hash-fallback");
    }

    #[test]
    fn test_embedding_text_composition() {
        let chunk = function_chunk("add", "sum numbers", None);
        let text = embedding_text(&chunk);
        assert!(text.starts_with("add()\n"));
        assert!(text.contains("sum number"));

        let section = section_chunk("Install", "run pip install");
        assert!(embedding_text(&section).starts_with("Install\n"));

        let empty = Chunk::new(ChunkPayload::GenericFile, "empty.txt", "empty.txt", 1, "unknown");
        assert_eq!(embedding_text(&empty), "empty.txt");
    }

    #[test]
    fn test_search_results_bounded_by_k() {
        let mut index = test_index();
        let chunks: Vec<Chunk> = (0..20)
            .map(|i| function_chunk(&format!("func_{i}"), "shared docstring text", None))
            .collect();
        index.add_chunks(chunks).unwrap();

        let results = index
            .search("shared docstring", &SearchOptions::new().top_k(5))
            .unwrap();
        assert!(results.len() <= 5);
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn test_kind_round_trip_through_persistence() {
        let tmp = TempDir::new().unwrap();
        let config = IndexConfig::new().data_dir(tmp.path());
        let mut index = SearchIndex::new(
            Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)),
            config.clone(),
        );
        index
            .add_chunks(vec![function_chunk("f", "doc text", None)])
            .unwrap();
        index.save().unwrap();

        let loaded = SearchIndex::load(
            Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)),
            config,
        )
        .unwrap();
        let results = loaded.search("doc text", &SearchOptions::new()).unwrap();
        assert_eq!(results[0].chunk.kind(), ChunkKind::Function);
    }
}
