//! The ingest pipeline: walk, dispatch, extract, chunk, normalize.
//!
//! Files are independent, so extraction and normalization fan out over a
//! rayon pool; the order-preserving collect keeps chunk order deterministic
//! (walker output is sorted), which fixes the index row order. Extractor
//! failures are logged and skipped; they never cross the pipeline boundary.

mod walker;

pub use walker::FileWalker;

use crate::config::IndexConfig;
use crate::core::Chunk;
use crate::error::Result;
use crate::extract::ExtractorRegistry;
use crate::processing::{SectionChunker, TextNormalizer};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-file extraction pipeline.
///
/// # Examples
///
/// ```
/// use code_cognitio::config::IndexConfig;
/// use code_cognitio::ingest::IngestPipeline;
///
/// let pipeline = IngestPipeline::new(&IndexConfig::default());
/// let chunks = pipeline.process_files(&[]);
/// assert!(chunks.is_empty());
/// ```
pub struct IngestPipeline {
    registry: ExtractorRegistry,
    normalizer: TextNormalizer,
    chunker: SectionChunker,
    include_types: Vec<String>,
    exclude_types: Vec<String>,
}

impl IngestPipeline {
    /// Creates a pipeline with the default extractor registry.
    #[must_use]
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            registry: ExtractorRegistry::with_defaults(config),
            normalizer: TextNormalizer::new(config.use_rich_normalization),
            chunker: SectionChunker::new(config.section_chunk_max_chars),
            include_types: Vec::new(),
            exclude_types: Vec::new(),
        }
    }

    /// Restricts processing to the given file types (bare extensions).
    ///
    /// An empty list, or one containing `all`, admits every supported type.
    #[must_use]
    pub fn with_type_filters(mut self, include: Vec<String>, exclude: Vec<String>) -> Self {
        self.include_types = include
            .into_iter()
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self.exclude_types = exclude
            .into_iter()
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Returns the extractor registry (for file-type listings).
    #[must_use]
    pub const fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Processes many files in parallel, preserving input order.
    #[must_use]
    pub fn process_files(&self, files: &[PathBuf]) -> Vec<Chunk> {
        let admitted: Vec<&PathBuf> = files
            .iter()
            .filter(|path| {
                let ok = self
                    .registry
                    .admits(path, &self.include_types, &self.exclude_types);
                if !ok {
                    debug!(path = %path.display(), "skipped by file-type filters");
                }
                ok
            })
            .collect();

        info!(files = admitted.len(), "processing files");

        let chunks: Vec<Chunk> = admitted
            .par_iter()
            .map(|path| match self.process_file(path) {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "extraction failed, skipping file");
                    Vec::new()
                }
            })
            .flatten()
            .collect();

        info!(chunks = chunks.len(), "processing complete");
        chunks
    }

    /// Processes a single file: extract, split oversize sections, normalize.
    ///
    /// # Errors
    ///
    /// Returns an error when the extractor fails outright; partial results
    /// (regex salvage) are not errors.
    pub fn process_file(&self, path: &Path) -> Result<Vec<Chunk>> {
        let extracted = self.registry.extract(path)?;
        if extracted.is_empty() {
            debug!(path = %path.display(), "no chunks extracted");
            return Ok(Vec::new());
        }

        let mut chunks = self.chunker.chunk_all(extracted);
        for chunk in &mut chunks {
            self.normalizer.process_chunk(chunk);
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChunkKind, ContentType};
    use std::fs;
    use tempfile::TempDir;

    fn pipeline() -> IngestPipeline {
        IngestPipeline::new(&IndexConfig::default())
    }

    #[test]
    fn test_process_python_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("app.py");
        fs::write(
            &path,
            "def add(a: int, b: int = 0) -> int:\n    \"\"\"Sum.\"\"\"\n    return a + b\n",
        )
        .unwrap();

        let chunks = pipeline().process_file(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind(), ChunkKind::Function);
        // Normalizer ran: signature and processed text are set.
        assert_eq!(
            chunks[0].callable().unwrap().signature,
            "add(a: int, b: int) -> int"
        );
        assert!(chunks[0].processed_text.contains("sum"));
    }

    #[test]
    fn test_process_files_order_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.py", "b.py", "c.py"] {
            fs::write(
                tmp.path().join(name),
                format!("def f_{}():\n    pass\n", name.replace(".py", "")),
            )
            .unwrap();
        }

        let files: Vec<PathBuf> = ["a.py", "b.py", "c.py"]
            .iter()
            .map(|n| tmp.path().join(n))
            .collect();

        let first = pipeline().process_files(&files);
        let second = pipeline().process_files(&files);
        let names_first: Vec<&str> = first.iter().map(|c| c.name.as_str()).collect();
        let names_second: Vec<&str> = second.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names_first, vec!["f_a", "f_b", "f_c"]);
        assert_eq!(names_first, names_second);
    }

    #[test]
    fn test_type_filters() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.py"), "def f():\n    pass\n").unwrap();
        fs::write(tmp.path().join("b.js"), "function g(x) { return x; }").unwrap();

        let files = vec![tmp.path().join("a.py"), tmp.path().join("b.js")];

        let only_py = pipeline()
            .with_type_filters(vec!["py".to_string()], vec![])
            .process_files(&files);
        assert!(only_py.iter().all(|c| c.language == "python"));

        let no_js = pipeline()
            .with_type_filters(vec![], vec!["js".to_string()])
            .process_files(&files);
        assert!(no_js.iter().all(|c| c.language != "javascript"));
    }

    #[test]
    fn test_markdown_sections_chunked_and_classified() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("README.md");
        fs::write(
            &path,
            "# Project\n\nIntro.\n\n## Installation\n\npip install project\n",
        )
        .unwrap();

        let chunks = pipeline().process_file(&path).unwrap();
        let install = chunks
            .iter()
            .find(|c| c.name == "Installation")
            .unwrap();
        assert_eq!(install.content_type(), ContentType::Documentation);
        assert_eq!(
            install.section_info().unwrap().section_type,
            Some(crate::core::SectionType::Installation)
        );
    }

    #[test]
    fn test_oversize_section_split() {
        let config = IndexConfig::new().section_chunk_max_chars(80);
        let pipeline = IngestPipeline::new(&config);

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.md");
        let body: String = (0..6)
            .map(|i| format!("Paragraph number {i} with some filler text."))
            .collect::<Vec<_>>()
            .join("\n\n");
        fs::write(&path, format!("# Guide\n\n{body}\n")).unwrap();

        let chunks = pipeline.process_file(&path).unwrap();
        let sections: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind() == ChunkKind::Section)
            .collect();
        assert!(sections.len() > 1);
        assert!(sections.iter().all(|c| c.chunk_index.is_some()));
        // Sub-chunks were normalized individually.
        assert!(sections.iter().all(|c| !c.processed_text.is_empty()));
    }

    #[test]
    fn test_unknown_type_generic_fallback() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.cfg");
        fs::write(&path, "key = value\n").unwrap();

        let chunks = pipeline().process_file(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind(), ChunkKind::GenericFile);
    }

    #[test]
    fn test_missing_file_error_does_not_cross_pipeline() {
        let chunks = pipeline().process_files(&[PathBuf::from("/no/such/file.py")]);
        assert!(chunks.is_empty());
    }
}
