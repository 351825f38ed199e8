//! Chunk extraction from source and documentation files.
//!
//! The [`ExtractorRegistry`] is the dispatcher: it maps a path to an
//! extractor by filename pattern, extension (after alias resolution), or
//! documentation extension, falling back to whole-file generic extraction.
//! Language support is added by table mutation only; there is no hard-coded
//! case split.

mod docker;
mod generic;
mod javascript;
mod markdown;
mod python;
mod rst;

pub use docker::DockerfileExtractor;
pub use generic::GenericExtractor;
pub use javascript::JavaScriptExtractor;
pub use markdown::MarkdownExtractor;
pub use python::PythonExtractor;
pub use rst::RstExtractor;

use crate::config::IndexConfig;
use crate::core::{Chunk, ContentType};
use crate::error::Result;
use crate::io::read_file_lossy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Trait for language-specific chunk extractors.
///
/// Implementations must be `Send + Sync` so files can be processed in
/// parallel. Extractors should produce deterministic output in source order.
pub trait Extractor: Send + Sync {
    /// Returns the name of the extractor (for logging).
    fn name(&self) -> &'static str;

    /// Returns the primary file extensions this extractor handles
    /// (with leading dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Returns whether this extractor produces code or documentation chunks.
    fn category(&self) -> ContentType {
        ContentType::Code
    }

    /// Extracts chunks from already-read content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be turned into any chunks.
    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>>;

    /// Extracts chunks from a file on disk.
    ///
    /// The default implementation reads the whole file with lossy UTF-8
    /// salvage; extractors with size-sensitive strategies override this.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or extracted from.
    fn extract_from_file(&self, path: &Path) -> Result<Vec<Chunk>> {
        let content = read_file_lossy(path)?;
        self.extract(&content, &path.to_string_lossy())
    }
}

/// Dispatcher mapping paths to extractors.
///
/// Resolution order: filename pattern, then alias-resolved extension, then
/// generic whole-file fallback.
///
/// # Examples
///
/// ```
/// use code_cognitio::config::IndexConfig;
/// use code_cognitio::extract::ExtractorRegistry;
/// use std::path::Path;
///
/// let registry = ExtractorRegistry::with_defaults(&IndexConfig::default());
/// assert!(registry.resolve(Path::new("app.py")).is_some());
/// assert!(registry.resolve(Path::new("Dockerfile")).is_some());
/// assert!(registry.resolve(Path::new("data.bin")).is_none());
/// ```
pub struct ExtractorRegistry {
    /// Extension (with dot, lowercase) to extractor.
    extractors: HashMap<String, Arc<dyn Extractor>>,
    /// Extension aliases (`.pyw` resolves to `.py`).
    aliases: HashMap<String, String>,
    /// Exact basename to extractor (`Dockerfile`, `docker-compose.yml`).
    filename_patterns: HashMap<String, Arc<dyn Extractor>>,
    /// Fallback for unsupported types.
    generic: GenericExtractor,
}

impl ExtractorRegistry {
    /// Creates a registry with no registered extractors.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
            aliases: HashMap::new(),
            filename_patterns: HashMap::new(),
            generic: GenericExtractor::new(),
        }
    }

    /// Creates a registry with the default extractor set.
    #[must_use]
    pub fn with_defaults(config: &IndexConfig) -> Self {
        let mut registry = Self::empty();

        let python: Arc<dyn Extractor> =
            Arc::new(PythonExtractor::new(config.large_file_threshold_bytes));
        let javascript: Arc<dyn Extractor> = Arc::new(JavaScriptExtractor::new());
        let markdown: Arc<dyn Extractor> = Arc::new(MarkdownExtractor::new());
        let rst: Arc<dyn Extractor> = Arc::new(RstExtractor::new());
        let docker: Arc<dyn Extractor> = Arc::new(DockerfileExtractor::new());

        for extractor in [&python, &javascript, &markdown, &rst, &docker] {
            for ext in extractor.extensions() {
                registry.register(ext, Arc::clone(extractor));
            }
        }

        registry.register_alias(".pyw", ".py");
        registry.register_alias(".pyi", ".py");
        for alias in [".mdown", ".mkd", ".mdwn", ".mdtxt", ".mdtext", ".rmd", ".txt"] {
            registry.register_alias(alias, ".md");
        }

        for name in [
            "Dockerfile",
            "dockerfile",
            "docker-compose.yml",
            "docker-compose.yaml",
        ] {
            registry.register_filename(name, Arc::clone(&docker));
        }

        registry
    }

    /// Registers an extractor for an extension (with leading dot).
    pub fn register(&mut self, extension: &str, extractor: Arc<dyn Extractor>) {
        self.extractors
            .insert(extension.to_lowercase(), extractor);
    }

    /// Registers an extension alias pointing at an existing extension.
    pub fn register_alias(&mut self, alias: &str, target: &str) {
        self.aliases
            .insert(alias.to_lowercase(), target.to_lowercase());
    }

    /// Registers an extractor for an exact basename.
    pub fn register_filename(&mut self, basename: &str, extractor: Arc<dyn Extractor>) {
        self.filename_patterns
            .insert(basename.to_string(), extractor);
    }

    /// Resolves a path to its extractor, or `None` when only the generic
    /// fallback applies.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> Option<&Arc<dyn Extractor>> {
        if let Some(basename) = path.file_name().and_then(|n| n.to_str())
            && let Some(extractor) = self.filename_patterns.get(basename)
        {
            return Some(extractor);
        }

        let ext = normalized_extension(path)?;
        let resolved = self.aliases.get(&ext).cloned().unwrap_or(ext);
        self.extractors.get(&resolved)
    }

    /// Extracts chunks from a file, falling back to generic extraction for
    /// unsupported types.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved extractor fails.
    pub fn extract(&self, path: &Path) -> Result<Vec<Chunk>> {
        if let Some(extractor) = self.resolve(path) {
            debug!(extractor = extractor.name(), path = %path.display(), "dispatching");
            return extractor.extract_from_file(path);
        }
        debug!(path = %path.display(), "no extractor registered, using generic fallback");
        self.generic.extract_from_file(path)
    }

    /// Returns the supported extensions of one category, dots stripped and
    /// sorted, aliases included.
    #[must_use]
    pub fn extensions_for(&self, category: ContentType) -> Vec<String> {
        let mut result: Vec<String> = self
            .extractors
            .iter()
            .filter(|(_, e)| e.category() == category)
            .map(|(ext, _)| ext.trim_start_matches('.').to_string())
            .collect();

        for (alias, target) in &self.aliases {
            if self
                .extractors
                .get(target)
                .is_some_and(|e| e.category() == category)
            {
                result.push(alias.trim_start_matches('.').to_string());
            }
        }

        result.sort();
        result.dedup();
        result
    }

    /// Returns true if the path resolves to an extractor whose primary
    /// extension (dot stripped) appears in `include` and not in `exclude`.
    ///
    /// An empty `include` (or one containing `all`) admits every supported
    /// type. Filename-pattern matches are always admitted.
    #[must_use]
    pub fn admits(&self, path: &Path, include: &[String], exclude: &[String]) -> bool {
        if let Some(basename) = path.file_name().and_then(|n| n.to_str())
            && self.filename_patterns.contains_key(basename)
        {
            return true;
        }

        let Some(ext) = normalized_extension(path) else {
            return include.is_empty() || include.iter().any(|t| t == "all");
        };
        let resolved = self.aliases.get(&ext).cloned().unwrap_or(ext);
        let bare = resolved.trim_start_matches('.');

        if exclude.iter().any(|t| t == bare) {
            return false;
        }
        include.is_empty() || include.iter().any(|t| t == "all" || t == bare)
    }
}

/// Returns the lowercased extension with a leading dot.
fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ExtractorRegistry {
        ExtractorRegistry::with_defaults(&IndexConfig::default())
    }

    #[test]
    fn test_resolve_by_extension() {
        let r = registry();
        assert_eq!(r.resolve(Path::new("a.py")).unwrap().name(), "python");
        assert_eq!(r.resolve(Path::new("a.TS")).unwrap().name(), "javascript");
        assert_eq!(r.resolve(Path::new("a.md")).unwrap().name(), "markdown");
        assert_eq!(r.resolve(Path::new("a.rest")).unwrap().name(), "rst");
    }

    #[test]
    fn test_resolve_by_filename() {
        let r = registry();
        assert_eq!(
            r.resolve(Path::new("some/dir/Dockerfile")).unwrap().name(),
            "dockerfile"
        );
        assert_eq!(
            r.resolve(Path::new("docker-compose.yml")).unwrap().name(),
            "dockerfile"
        );
    }

    #[test]
    fn test_resolve_aliases() {
        let r = registry();
        assert_eq!(r.resolve(Path::new("stub.pyi")).unwrap().name(), "python");
        assert_eq!(r.resolve(Path::new("notes.txt")).unwrap().name(), "markdown");
        assert_eq!(r.resolve(Path::new("doc.mkd")).unwrap().name(), "markdown");
    }

    #[test]
    fn test_resolve_unknown() {
        let r = registry();
        assert!(r.resolve(Path::new("binary.bin")).is_none());
        assert!(r.resolve(Path::new("noextension")).is_none());
    }

    #[test]
    fn test_extension_listing() {
        let r = registry();
        let code = r.extensions_for(ContentType::Code);
        assert!(code.contains(&"py".to_string()));
        assert!(code.contains(&"tsx".to_string()));
        assert!(code.contains(&"pyw".to_string()));
        assert!(!code.contains(&"md".to_string()));

        let docs = r.extensions_for(ContentType::Documentation);
        assert!(docs.contains(&"md".to_string()));
        assert!(docs.contains(&"rst".to_string()));
        assert!(docs.contains(&"txt".to_string()));
    }

    #[test]
    fn test_admits_filters() {
        let r = registry();
        let none: Vec<String> = vec![];
        let py_only = vec!["py".to_string()];
        let exclude_js = vec!["js".to_string()];

        assert!(r.admits(Path::new("a.py"), &none, &none));
        assert!(r.admits(Path::new("a.py"), &py_only, &none));
        assert!(!r.admits(Path::new("a.js"), &py_only, &none));
        assert!(!r.admits(Path::new("a.js"), &none, &exclude_js));
        assert!(r.admits(Path::new("Dockerfile"), &py_only, &none));
        // Aliases resolve before filtering
        assert!(r.admits(Path::new("a.pyw"), &py_only, &none));
    }

    #[test]
    fn test_registration_is_table_mutation() {
        let mut r = ExtractorRegistry::empty();
        assert!(r.resolve(Path::new("a.py")).is_none());
        r.register(".py", Arc::new(GenericExtractor::new()));
        assert!(r.resolve(Path::new("a.py")).is_some());
    }
}
