//! Output formatting for CLI commands.
//!
//! Human-readable block output and JSON, matching the tool-protocol
//! contract: `search --json` emits the same record shape the `search_code`
//! tool returns.

use crate::core::{ChunkPayload, ContentType};
use crate::error::Result;
use crate::index::IndexStatus;
use crate::search::SearchResult;
use std::fmt::Write;

/// Formats search results as a human-readable block per result.
#[must_use]
pub fn format_search_results(results: &[SearchResult], query: &str) -> String {
    if results.is_empty() {
        return "No results found matching your query.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Search results for: {query}");
    let _ = writeln!(out, "Found {} results:", results.len());

    for (i, result) in results.iter().enumerate() {
        let chunk = &result.chunk;
        let _ = writeln!(out, "Result {} (Score: {:.4}):", i + 1, result.score);
        let _ = writeln!(out, "Type: {}", chunk.kind());
        let _ = writeln!(out, "File: {}", chunk.file_path);
        let _ = writeln!(out, "Line: {}", chunk.lineno);

        if let ChunkPayload::Section(info) = &chunk.payload {
            if chunk.content_type() == ContentType::Documentation {
                let _ = writeln!(out, "Document: {}", info.document_title);
            }
            let _ = writeln!(out, "Section: {}", info.title);
        }

        if let Some(info) = chunk.callable() {
            if !info.readable_name.is_empty() {
                let _ = writeln!(out, "Description: {}", info.readable_name);
            }
            if !info.patterns.is_empty() {
                let patterns: Vec<&str> = info.patterns.iter().map(String::as_str).collect();
                let _ = writeln!(out, "Patterns: {}", patterns.join(", "));
            }
            if !info.key_operations.is_empty() {
                let ops: Vec<&str> = info
                    .key_operations
                    .iter()
                    .take(3)
                    .map(String::as_str)
                    .collect();
                let _ = writeln!(out, "Key Operations: {}", ops.join(", "));
            }
            if let Some(usage) = &info.usage {
                if !usage.common_usage.is_empty() {
                    let _ = writeln!(out, "Common Usage: {}", usage.common_usage.join(", "));
                }
                let _ = writeln!(out, "Called {} times in this file", usage.call_count);
            }
            if !info.relationships.is_empty() {
                let rels: Vec<String> = info
                    .relationships
                    .iter()
                    .take(3)
                    .map(|r| format!("{} {}", r.rel_type, r.display_name))
                    .collect();
                let _ = writeln!(out, "Relationships: {}", rels.join(", "));
            }
        }

        if let ChunkPayload::Class(info) = &chunk.payload
            && !info.patterns.is_empty()
        {
            let patterns: Vec<&str> = info.patterns.iter().map(String::as_str).collect();
            let _ = writeln!(out, "Patterns: {}", patterns.join(", "));
        }

        let _ = writeln!(out, "\n{}\n", result.display_content);
        let _ = writeln!(out, "Location: {}", chunk.file_path);
        let _ = writeln!(out, "{}", "-".repeat(80));
    }

    out
}

/// Formats search results as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn format_search_results_json(results: &[SearchResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Formats the supported file types listing.
#[must_use]
pub fn format_file_types(code: &[String], documentation: &[String]) -> String {
    let mut out = String::new();
    out.push_str("Supported file types:\n");

    out.push_str("\nCode files:\n");
    for ext in code {
        let _ = writeln!(out, "  - {ext}");
    }

    out.push_str("\nDocumentation files:\n");
    for ext in documentation {
        let _ = writeln!(out, "  - {ext}");
    }

    out
}

/// Formats the file types listing as JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn format_file_types_json(code: &[String], documentation: &[String]) -> Result<String> {
    let value = serde_json::json!({
        "code": code,
        "documentation": documentation,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Formats a build summary with the resulting index status.
#[must_use]
pub fn format_build_summary(files: usize, chunks: usize, status: &IndexStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Indexed {chunks} chunks from {files} files.");
    out.push_str(&format_index_status(status));
    out
}

/// Formats an index status snapshot.
#[must_use]
pub fn format_index_status(status: &IndexStatus) -> String {
    if !status.ready {
        return format!("No index found in {}.\n", status.data_dir);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Index is ready.");
    #[allow(clippy::cast_precision_loss)]
    let size_mb = status.size_bytes as f64 / (1024.0 * 1024.0);
    let _ = writeln!(out, "  Size: {size_mb:.2} MB");
    let _ = writeln!(
        out,
        "  Chunks: {} ({} code, {} documentation)",
        status.total_chunks, status.code_chunks, status.doc_chunks
    );
    let _ = writeln!(out, "  Embedder: {}", status.embedder_identifier);
    let _ = writeln!(out, "  Data dir: {}", status.data_dir);
    out
}
