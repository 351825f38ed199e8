//! reStructuredText extraction.
//!
//! Detects section titles by the underline (and optional overline)
//! convention, mapping marker characters to header levels by the common
//! ordering `# * = - ^ "`. Emits a whole-document section, one section per
//! title, and `code_block` chunks for `.. code-block::` directives and
//! literal blocks with common indentation stripped.

use crate::core::{Chunk, ChunkPayload, CodeBlockInfo, ContentType, SectionInfo};
use crate::error::Result;
use crate::extract::Extractor;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Marker characters in conventional level order; unknown markers map to
/// level 6.
const LEVEL_MARKERS: &[char] = &['#', '*', '=', '-', '^', '"'];

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: OnceLock<Regex> = OnceLock::new();
        $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

/// Extractor for reStructuredText documents.
///
/// # Examples
///
/// ```
/// use code_cognitio::extract::{Extractor, RstExtractor};
///
/// let chunks = RstExtractor::new()
///     .extract("Title\n=====\n\nBody text.\n", "doc.rst")
///     .unwrap();
/// assert!(chunks.iter().any(|c| c.name == "Title"));
/// ```
pub struct RstExtractor;

impl RstExtractor {
    /// Creates a new reStructuredText extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for RstExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for RstExtractor {
    fn name(&self) -> &'static str {
        "rst"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".rst", ".rest"]
    }

    fn category(&self) -> ContentType {
        ContentType::Documentation
    }

    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>> {
        let lines: Vec<&str> = content.lines().collect();
        let titles = find_titles(&lines);
        let document_title = titles
            .first()
            .map_or_else(|| basename(file_path), |t| t.title.clone());

        let mut chunks = Vec::new();

        // Whole-document section at level 0.
        let doc_name = basename(file_path);
        chunks.push(
            Chunk::new(
                ChunkPayload::Section(SectionInfo {
                    title: doc_name.clone(),
                    level: 0,
                    position: 0,
                    document_title: document_title.clone(),
                    ..SectionInfo::default()
                }),
                &doc_name,
                file_path,
                1,
                "rst",
            )
            .with_raw_text(content.trim()),
        );

        for (i, title) in titles.iter().enumerate() {
            let body_start = title.body_start_line;
            let body_end = titles
                .get(i + 1)
                .map_or(lines.len(), |next| next.title_line);
            let body = lines[body_start.min(lines.len())..body_end.min(lines.len())]
                .join("\n")
                .trim()
                .to_string();

            let position = lines[..title.title_line]
                .iter()
                .map(|l| l.len() + 1)
                .sum();

            chunks.push(
                Chunk::new(
                    ChunkPayload::Section(SectionInfo {
                        title: title.title.clone(),
                        level: title.level,
                        position,
                        document_title: document_title.clone(),
                        ..SectionInfo::default()
                    }),
                    &title.title,
                    file_path,
                    title.title_line + 1,
                    "rst",
                )
                .with_raw_text(&body),
            );
        }

        extract_code_blocks(content, file_path, &titles, &mut chunks);

        Ok(chunks)
    }
}

/// A detected section title.
struct RstTitle {
    /// 0-based line of the title text.
    title_line: usize,
    /// 0-based first line of the section body.
    body_start_line: usize,
    level: u8,
    title: String,
}

/// Returns true for a line made of one repeated punctuation character.
fn is_header_marker(line: &str) -> bool {
    let trimmed = line.trim();
    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if first.is_alphanumeric() || trimmed.len() < 2 {
        return false;
    }
    chars.all(|c| c == first)
}

fn marker_level(marker: char) -> u8 {
    LEVEL_MARKERS
        .iter()
        .position(|&m| m == marker)
        .map_or(6, |i| {
            #[allow(clippy::cast_possible_truncation)]
            let level = (i + 1) as u8;
            level
        })
}

/// Finds all section titles, handling both underline and overline+underline
/// styles.
fn find_titles(lines: &[&str]) -> Vec<RstTitle> {
    let mut titles = Vec::new();
    let mut claimed = vec![false; lines.len()];

    for i in 0..lines.len() {
        if claimed[i] {
            continue;
        }
        // Overline + title + underline.
        if i + 2 < lines.len()
            && is_header_marker(lines[i])
            && !lines[i + 1].trim().is_empty()
            && !is_header_marker(lines[i + 1])
            && is_header_marker(lines[i + 2])
        {
            let marker = lines[i].trim().chars().next().unwrap_or('=');
            titles.push(RstTitle {
                title_line: i + 1,
                body_start_line: i + 3,
                level: marker_level(marker),
                title: lines[i + 1].trim().to_string(),
            });
            claimed[i] = true;
            claimed[i + 1] = true;
            claimed[i + 2] = true;
            continue;
        }
        // Title + underline.
        if i + 1 < lines.len()
            && !lines[i].trim().is_empty()
            && !is_header_marker(lines[i])
            && is_header_marker(lines[i + 1])
        {
            let marker = lines[i + 1].trim().chars().next().unwrap_or('=');
            titles.push(RstTitle {
                title_line: i,
                body_start_line: i + 2,
                level: marker_level(marker),
                title: lines[i].trim().to_string(),
            });
            claimed[i] = true;
            claimed[i + 1] = true;
        }
    }

    titles
}

/// Extracts `.. code-block:: lang` directives and `::` literal blocks.
fn extract_code_blocks(
    content: &str,
    file_path: &str,
    titles: &[RstTitle],
    chunks: &mut Vec<Chunk>,
) {
    let directive_re = static_regex!(
        RST_CODE_BLOCK,
        r"\.\. code-block:: (\w+)\s*\n\s*\n((?:[ \t]+.*\n?|\n)*)"
    );
    let literal_re = static_regex!(RST_LITERAL, r"::\s*\n\s*\n((?:[ \t]+.*\n|\n)+)");

    let title_for = |offset: usize| -> String {
        let line = content[..offset].matches('\n').count();
        titles
            .iter()
            .rev()
            .find(|t| t.title_line < line)
            .map_or_else(|| basename(file_path), |t| t.title.clone())
    };

    for caps in directive_re.captures_iter(content) {
        let (Some(whole), Some(language), Some(code)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let title = title_for(whole.start());
        chunks.push(
            Chunk::new(
                ChunkPayload::CodeBlock(CodeBlockInfo {
                    title: title.clone(),
                    position: whole.start(),
                }),
                &title,
                file_path,
                content[..whole.start()].matches('\n').count() + 1,
                language.as_str(),
            )
            .with_raw_text(&strip_common_indent(code.as_str())),
        );
    }

    for caps in literal_re.captures_iter(content) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // Skip literal blocks already captured as code-block directives.
        let preceding_line_start = content[..whole.start()]
            .rfind('\n')
            .map_or(0, |p| p + 1);
        if content[preceding_line_start..].starts_with(".. code-block::") {
            continue;
        }
        let title = title_for(whole.start());
        chunks.push(
            Chunk::new(
                ChunkPayload::CodeBlock(CodeBlockInfo {
                    title: title.clone(),
                    position: whole.start(),
                }),
                &title,
                file_path,
                content[..whole.start()].matches('\n').count() + 1,
                "text",
            )
            .with_raw_text(&strip_common_indent(code.as_str())),
        );
    }
}

/// Removes the smallest common leading indentation from non-empty lines.
fn strip_common_indent(code: &str) -> String {
    let min_indent = code
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    code.lines()
        .map(|l| {
            if l.trim().is_empty() {
                l
            } else {
                &l[min_indent.min(l.len())..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

fn basename(file_path: &str) -> String {
    Path::new(file_path)
        .file_name()
        .map_or_else(|| file_path.to_string(), |n| n.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChunkKind;

    fn extract(content: &str) -> Vec<Chunk> {
        RstExtractor::new().extract(content, "guide.rst").unwrap()
    }

    #[test]
    fn test_underline_titles() {
        let doc = "Overview\n========\n\nSome intro.\n\nDetails\n-------\n\nMore text.\n";
        let chunks = extract(doc);

        let overview = chunks.iter().find(|c| c.name == "Overview").unwrap();
        let info = overview.section_info().unwrap();
        assert_eq!(info.level, 3);
        assert_eq!(info.document_title, "Overview");
        assert_eq!(overview.raw_text, "Some intro.");

        let details = chunks.iter().find(|c| c.name == "Details").unwrap();
        assert_eq!(details.section_info().unwrap().level, 4);
        assert_eq!(details.raw_text, "More text.");
    }

    #[test]
    fn test_overline_title() {
        let doc = "#######\n Title\n#######\n\nBody here.\n";
        let chunks = extract(doc);
        let title = chunks.iter().find(|c| c.name == "Title").unwrap();
        assert_eq!(title.section_info().unwrap().level, 1);
        assert_eq!(title.raw_text, "Body here.");
    }

    #[test]
    fn test_whole_document_section() {
        let doc = "Title\n=====\n\nBody.\n";
        let chunks = extract(doc);
        let whole = chunks
            .iter()
            .find(|c| c.section_info().is_some_and(|s| s.level == 0))
            .unwrap();
        assert_eq!(whole.name, "guide.rst");
        // Level 0 occurs exactly once.
        assert_eq!(
            chunks
                .iter()
                .filter(|c| c.section_info().is_some_and(|s| s.level == 0))
                .count(),
            1
        );
    }

    #[test]
    fn test_unknown_marker_level() {
        assert_eq!(marker_level('='), 3);
        assert_eq!(marker_level('~'), 6);
    }

    #[test]
    fn test_code_block_directive() {
        let doc = "Usage\n=====\n\n.. code-block:: python\n\n    import os\n    print(os.name)\n\nAfter.\n";
        let chunks = extract(doc);
        let block = chunks
            .iter()
            .find(|c| c.kind() == ChunkKind::CodeBlock)
            .unwrap();
        assert_eq!(block.language, "python");
        assert_eq!(block.name, "Usage");
        assert_eq!(block.raw_text, "import os\nprint(os.name)");
    }

    #[test]
    fn test_literal_block() {
        let doc = "Example\n=======\n\nRun this::\n\n    make all\n    make test\n\nDone.\n";
        let chunks = extract(doc);
        let block = chunks
            .iter()
            .find(|c| c.kind() == ChunkKind::CodeBlock)
            .unwrap();
        assert_eq!(block.language, "text");
        assert_eq!(block.raw_text, "make all\nmake test");
    }

    #[test]
    fn test_is_header_marker() {
        assert!(is_header_marker("====="));
        assert!(is_header_marker("-----"));
        assert!(!is_header_marker("== =="));
        assert!(!is_header_marker("abc"));
        assert!(!is_header_marker(""));
    }
}
