//! Filtered search operator.
//!
//! Defines the search options, the result shape, and the structural
//! post-filters applied after nearest-neighbor recall: exact kind match,
//! case-insensitive substring match on parameter names and types, and on
//! the return type. The first failed predicate rejects a candidate; a
//! filter naming a dimension the candidate lacks rejects it silently.

use crate::core::{Chunk, ChunkKind, ChunkPayload, ContentType};
use serde::Serialize;

/// Options for a filtered search.
///
/// # Examples
///
/// ```
/// use code_cognitio::search::SearchOptions;
/// use code_cognitio::core::ChunkKind;
///
/// let options = SearchOptions::new()
///     .top_k(10)
///     .type_filter(ChunkKind::Function)
///     .param_type("list");
/// assert_eq!(options.top_k, 10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum number of results.
    pub top_k: usize,
    /// Restrict to one content collection.
    pub content_filter: Option<ContentType>,
    /// Minimum similarity score.
    pub min_score: f32,
    /// Exact chunk-kind filter.
    pub type_filter: Option<ChunkKind>,
    /// Case-insensitive substring filter on parameter names.
    pub param_name: Option<String>,
    /// Case-insensitive substring filter on parameter types.
    pub param_type: Option<String>,
    /// Case-insensitive substring filter on the return type.
    pub return_type: Option<String>,
}

impl SearchOptions {
    /// Creates options with the default `top_k` of 5 and no filters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            top_k: 5,
            ..Self::default()
        }
    }

    /// Sets the number of results.
    #[must_use]
    pub const fn top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Restricts results to one content type.
    #[must_use]
    pub const fn content_filter(mut self, filter: ContentType) -> Self {
        self.content_filter = Some(filter);
        self
    }

    /// Sets the minimum similarity score.
    #[must_use]
    pub const fn min_score(mut self, score: f32) -> Self {
        self.min_score = score;
        self
    }

    /// Restricts results to one chunk kind.
    #[must_use]
    pub const fn type_filter(mut self, kind: ChunkKind) -> Self {
        self.type_filter = Some(kind);
        self
    }

    /// Filters on parameter name substring.
    #[must_use]
    pub fn param_name(mut self, name: &str) -> Self {
        self.param_name = Some(name.to_string());
        self
    }

    /// Filters on parameter type substring.
    #[must_use]
    pub fn param_type(mut self, ty: &str) -> Self {
        self.param_type = Some(ty.to_string());
        self
    }

    /// Filters on return type substring.
    #[must_use]
    pub fn return_type(mut self, ty: &str) -> Self {
        self.return_type = Some(ty.to_string());
        self
    }
}

/// One search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (inner product over unit vectors).
    pub score: f32,
    /// Rendered content for display.
    pub display_content: String,
}

/// Applies the structural post-filters to one candidate.
///
/// Predicates are checked in order; the first failure rejects.
#[must_use]
pub fn passes_filters(chunk: &Chunk, options: &SearchOptions) -> bool {
    if let Some(kind) = options.type_filter
        && chunk.kind() != kind
    {
        return false;
    }

    if let Some(name_filter) = &options.param_name {
        let Some(info) = chunk.callable() else {
            return false;
        };
        let needle = name_filter.to_lowercase();
        if !info
            .params
            .iter()
            .any(|p| p.name.to_lowercase().contains(&needle))
        {
            return false;
        }
    }

    if let Some(type_filter) = &options.param_type {
        let Some(info) = chunk.callable() else {
            return false;
        };
        let needle = type_filter.to_lowercase();
        if !info
            .params
            .iter()
            .any(|p| p.ty.as_ref().is_some_and(|t| t.to_lowercase().contains(&needle)))
        {
            return false;
        }
    }

    if let Some(return_filter) = &options.return_type {
        let Some(info) = chunk.callable() else {
            return false;
        };
        let needle = return_filter.to_lowercase();
        if !info
            .return_type
            .as_ref()
            .is_some_and(|r| r.to_lowercase().contains(&needle))
        {
            return false;
        }
    }

    true
}

/// Renders the display content for a search hit.
#[must_use]
pub fn display_content(chunk: &Chunk) -> String {
    match &chunk.payload {
        ChunkPayload::Function(info) => format!(
            "{}\n\n{}\n\nLocation: {}:{}",
            info.signature, info.docstring, chunk.file_path, chunk.lineno
        ),
        ChunkPayload::Method(info) => format!(
            "Class: {}\n{}\n\n{}\n\nLocation: {}:{}",
            info.class_name.as_deref().unwrap_or_default(),
            info.signature,
            info.docstring,
            chunk.file_path,
            chunk.lineno
        ),
        ChunkPayload::Class(info) => format!(
            "Class: {}\n\n{}\n\nLocation: {}:{}",
            chunk.name, info.docstring, chunk.file_path, chunk.lineno
        ),
        ChunkPayload::Section(info) => format!(
            "Document: {}\nSection: {}\n\n{}\n\nLocation: {}",
            info.document_title, info.title, chunk.raw_text, chunk.file_path
        ),
        ChunkPayload::FileDirective(info) if !info.description.is_empty() => format!(
            "{}\n\nLocation: {}",
            info.description, chunk.file_path
        ),
        _ => {
            let body = if chunk.raw_text.is_empty() {
                &chunk.processed_text
            } else {
                &chunk.raw_text
            };
            format!("{}\n\nLocation: {}", body, chunk.file_path)
        }
    }
}
