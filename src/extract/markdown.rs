//! Markdown extraction.
//!
//! Splits a document into one section chunk per ATX header, with a
//! whole-document fallback when the document has no headers at all. Fenced
//! code blocks longer than two lines become separate `code_block` chunks
//! titled after the nearest preceding header.

use crate::core::{Chunk, ChunkPayload, CodeBlockInfo, ContentType, SectionInfo};
use crate::error::Result;
use crate::extract::Extractor;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: OnceLock<Regex> = OnceLock::new();
        $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

fn header_re() -> &'static Regex {
    static_regex!(MD_HEADER, r"(?m)^(#{1,6})\s+(.+)$")
}

fn fence_re() -> &'static Regex {
    static_regex!(MD_FENCE, r"```([a-zA-Z0-9]*)\n([\s\S]*?)\n```")
}

/// Extractor for Markdown documents.
///
/// # Examples
///
/// ```
/// use code_cognitio::extract::{Extractor, MarkdownExtractor};
///
/// let chunks = MarkdownExtractor::new()
///     .extract("# Title\n\nIntro text.\n\n## Usage\n\nRun it.\n", "README.md")
///     .unwrap();
/// assert_eq!(chunks.len(), 2);
/// ```
pub struct MarkdownExtractor;

impl MarkdownExtractor {
    /// Creates a new Markdown extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for MarkdownExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for MarkdownExtractor {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".md", ".markdown"]
    }

    fn category(&self) -> ContentType {
        ContentType::Documentation
    }

    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>> {
        let document_title = first_h1(content)
            .unwrap_or_else(|| basename(file_path));

        let headers: Vec<(usize, usize, String)> = header_re()
            .captures_iter(content)
            .filter_map(|c| {
                let whole = c.get(0)?;
                let level = c.get(1)?.as_str().len();
                let title = c.get(2)?.as_str().trim().to_string();
                Some((whole.start(), level, title))
            })
            .collect();

        let mut chunks = Vec::new();

        if headers.is_empty() {
            // Whole-document fallback, level 0.
            let chunk = Chunk::new(
                ChunkPayload::Section(SectionInfo {
                    title: document_title.clone(),
                    level: 0,
                    position: 0,
                    document_title: document_title.clone(),
                    ..SectionInfo::default()
                }),
                &document_title,
                file_path,
                1,
                "markdown",
            )
            .with_raw_text(content.trim());
            chunks.push(chunk);
        }

        for (i, (start, level, title)) in headers.iter().enumerate() {
            let end = headers.get(i + 1).map_or(content.len(), |(s, _, _)| *s);
            let section_text = &content[*start..end];
            // Drop the header line itself from the body.
            let body = section_text
                .split_once('\n')
                .map_or("", |(_, rest)| rest)
                .trim();

            let parent_title = headers[..i]
                .iter()
                .rev()
                .find(|(_, parent_level, _)| parent_level < level)
                .map(|(_, _, parent)| parent.clone());

            #[allow(clippy::cast_possible_truncation)]
            let chunk = Chunk::new(
                ChunkPayload::Section(SectionInfo {
                    title: title.clone(),
                    level: *level as u8,
                    position: *start,
                    document_title: document_title.clone(),
                    parent_title,
                    ..SectionInfo::default()
                }),
                title,
                file_path,
                line_of_offset(content, *start),
                "markdown",
            )
            .with_raw_text(body);
            chunks.push(chunk);
        }

        extract_code_blocks(content, file_path, &headers, &mut chunks);

        chunks.sort_by_key(|c| match &c.payload {
            ChunkPayload::Section(s) => s.position,
            ChunkPayload::CodeBlock(b) => b.position,
            _ => 0,
        });
        Ok(chunks)
    }
}

/// Emits a `code_block` chunk for each fenced block spanning more than two
/// lines.
fn extract_code_blocks(
    content: &str,
    file_path: &str,
    headers: &[(usize, usize, String)],
    chunks: &mut Vec<Chunk>,
) {
    for caps in fence_re().captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let language = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("text");
        let Some(code) = caps.get(2) else { continue };

        if code.as_str().lines().count() <= 2 {
            continue;
        }

        let title = headers
            .iter()
            .rev()
            .find(|(start, _, _)| *start < whole.start())
            .map_or_else(
                || format!("Code block ({language})"),
                |(_, _, t)| t.clone(),
            );

        let chunk = Chunk::new(
            ChunkPayload::CodeBlock(CodeBlockInfo {
                title: title.clone(),
                position: whole.start(),
            }),
            &title,
            file_path,
            line_of_offset(content, whole.start()),
            language,
        )
        .with_raw_text(code.as_str());
        chunks.push(chunk);
    }
}

fn first_h1(content: &str) -> Option<String> {
    let h1_re = static_regex!(MD_H1, r"(?m)^# (.+)$");
    h1_re
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn basename(file_path: &str) -> String {
    Path::new(file_path)
        .file_name()
        .map_or_else(|| file_path.to_string(), |n| n.to_string_lossy().to_string())
}

fn line_of_offset(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}
