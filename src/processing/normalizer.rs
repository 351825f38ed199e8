//! Text normalization for indexing and search.
//!
//! Produces the embedding-ready `processed_text` for every chunk:
//! lowercase, punctuation stripped, stop words removed, tokens stemmed.
//! Also classifies documentation sections by title and renders the
//! canonical signature string for callables.

use crate::core::{CallableInfo, Chunk, ChunkPayload, SectionType};
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

/// Default English stop words.
///
/// A fixed baseline list; larger supersets are acceptable so long as they
/// contain these.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "because", "as", "what", "which", "this", "that",
    "these", "those", "then", "just", "so", "than", "such", "both", "through", "about", "for",
    "is", "of", "while", "during", "to", "from", "in", "on", "by", "at", "be", "with", "into",
    "has", "are", "have", "had", "was", "were", "been", "being", "do", "does", "did", "can",
    "could", "may", "might", "shall", "should", "will", "would", "not", "up", "down", "no", "yes",
];

fn fence_re() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```[\s\S]*?```").expect("valid regex"))
}

/// Normalizer turning raw chunk text into embedding-ready text.
///
/// # Examples
///
/// ```
/// use code_cognitio::processing::TextNormalizer;
///
/// let normalizer = TextNormalizer::new(true);
/// let cleaned = normalizer.clean_text("The QUICK brown foxes are running!");
/// assert!(!cleaned.contains("the"));
/// assert!(cleaned.contains("quick"));
/// ```
pub struct TextNormalizer {
    stop_words: HashSet<&'static str>,
    stemmer: Stemmer,
    /// When false, normalization stops after punctuation stripping.
    rich: bool,
}

impl TextNormalizer {
    /// Creates a normalizer.
    ///
    /// `rich` enables stop-word removal and stemming; without it only
    /// lowercasing, punctuation stripping, and whitespace collapsing apply.
    #[must_use]
    pub fn new(rich: bool) -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
            stemmer: Stemmer::create(Algorithm::English),
            rich,
        }
    }

    /// Populates `processed_text`, `section_type`, and `signature` on a
    /// chunk in place.
    pub fn process_chunk(&self, chunk: &mut Chunk) {
        match &mut chunk.payload {
            ChunkPayload::Function(info) | ChunkPayload::Method(info) => {
                info.signature = render_signature(info);
                chunk.processed_text = self.clean_text(&info.docstring);
            }
            ChunkPayload::Class(info) => {
                chunk.processed_text = self.clean_text(&info.docstring);
            }
            ChunkPayload::Module(info) => {
                chunk.processed_text = self.clean_text(&info.docstring);
            }
            ChunkPayload::Section(info) => {
                let without_code = remove_code_blocks(&chunk.raw_text);
                chunk.processed_text = self.clean_text(&without_code);
                info.section_type = Some(classify_section(&info.title));
            }
            ChunkPayload::CodeBlock(info) => {
                let combined = format!("{} {}", info.title, chunk.raw_text);
                chunk.processed_text = self.clean_text(&combined);
            }
            ChunkPayload::FileDirective(info) => {
                chunk.processed_text = self.clean_text(&info.description);
            }
            ChunkPayload::Component(info) => {
                let source = if info.docstring.is_empty() {
                    &info.body_digest
                } else {
                    &info.docstring
                };
                chunk.processed_text = self.clean_text(source);
            }
            ChunkPayload::GenericFile => {
                // Whole-file fallbacks are searched by raw content.
            }
        }
    }

    /// Cleans and normalizes text: lowercase, punctuation to spaces,
    /// collapsed whitespace, then (when rich) stop-word removal and
    /// stemming.
    #[must_use]
    pub fn clean_text(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let lowered: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        if !self.rich {
            return lowered.split_whitespace().collect::<Vec<_>>().join(" ");
        }

        lowered
            .unicode_words()
            .filter(|word| !self.stop_words.contains(word))
            .map(|word| self.stemmer.stem(word).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Renders the canonical signature: `full_name(p1: T1, p2, ...) -> R`.
///
/// Defaults are omitted; the return arrow is omitted when unannotated.
#[must_use]
pub fn render_signature(info: &CallableInfo) -> String {
    let params = info
        .params
        .iter()
        .map(|p| {
            p.ty.as_ref()
                .map_or_else(|| p.name.clone(), |ty| format!("{}: {ty}", p.name))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let returns = info
        .return_type
        .as_ref()
        .map(|r| format!(" -> {r}"))
        .unwrap_or_default();

    format!("{}({params}){returns}", info.full_name)
}

/// Classifies a section by title substrings; the first matching rule wins.
#[must_use]
pub fn classify_section(title: &str) -> SectionType {
    let title = title.to_lowercase();
    if title.contains("install") || title.contains("setup") {
        SectionType::Installation
    } else if title.contains("usage") || title.contains("example") {
        SectionType::Usage
    } else if title.contains("api") || title.contains("reference") {
        SectionType::Reference
    } else if title.contains("config") {
        SectionType::Configuration
    } else {
        SectionType::General
    }
}

/// Strips fenced and indented code blocks before normalization.
///
/// The raw text keeps them; only the embedding view drops them.
#[must_use]
pub fn remove_code_blocks(text: &str) -> String {
    let without_fences = fence_re().replace_all(text, "");

    without_fences
        .lines()
        .filter(|line| !line.starts_with("    ") && !line.starts_with('\t'))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Chunk, ChunkKind, Param, SectionInfo};

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(true)
    }

    #[test]
    fn test_clean_text_removes_stop_words() {
        let cleaned = normalizer().clean_text("This is the index of the repository");
        assert!(!cleaned.split(' ').any(|w| w == "the" || w == "is" || w == "of"));
        assert!(cleaned.contains("index"));
        assert!(cleaned.contains("repositori"));
    }

    #[test]
    fn test_clean_text_strips_punctuation() {
        let cleaned = normalizer().clean_text("hello, world! (parenthetical)");
        assert!(!cleaned.contains(','));
        assert!(!cleaned.contains('('));
        assert!(cleaned.contains("hello"));
    }

    #[test]
    fn test_clean_text_stems() {
        let cleaned = normalizer().clean_text("running processes connected");
        // Snowball English reduces inflected forms.
        assert_eq!(cleaned, "run process connect");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(normalizer().clean_text(""), "");
    }

    #[test]
    fn test_plain_normalization() {
        let plain = TextNormalizer::new(false);
        let cleaned = plain.clean_text("The Running Dogs!");
        assert_eq!(cleaned, "the running dogs");
    }

    #[test]
    fn test_process_function_chunk() {
        let info = CallableInfo {
            docstring: "Sum.".to_string(),
            params: vec![
                Param::typed("a", "int"),
                Param {
                    name: "b".to_string(),
                    ty: Some("int".to_string()),
                    default: Some("0".to_string()),
                },
            ],
            return_type: Some("int".to_string()),
            full_name: "add".to_string(),
            ..CallableInfo::default()
        };
        let mut chunk = Chunk::new(
            ChunkPayload::Function(info),
            "add",
            "math.py",
            1,
            "python",
        );
        normalizer().process_chunk(&mut chunk);

        assert!(chunk.processed_text.contains("sum"));
        assert_eq!(
            chunk.callable().unwrap().signature,
            "add(a: int, b: int) -> int"
        );
    }

    #[test]
    fn test_signature_without_types_or_return() {
        let info = CallableInfo {
            params: vec![Param::named("x"), Param::named("y")],
            full_name: "Point.move".to_string(),
            ..CallableInfo::default()
        };
        assert_eq!(render_signature(&info), "Point.move(x, y)");
    }

    #[test]
    fn test_process_section_chunk() {
        let mut chunk = Chunk::new(
            ChunkPayload::Section(SectionInfo {
                title: "Installation".to_string(),
                level: 2,
                ..SectionInfo::default()
            }),
            "Installation",
            "README.md",
            3,
            "markdown",
        )
        .with_raw_text("Install with pip.\n\n```sh\npip install pkg\nextra line\nmore\n```\n");

        normalizer().process_chunk(&mut chunk);
        assert_eq!(
            chunk.section_info().unwrap().section_type,
            Some(SectionType::Installation)
        );
        assert!(chunk.processed_text.contains("instal"));
        // The fenced block is stripped from the embedding view only.
        assert!(!chunk.processed_text.contains("extra"));
        assert!(chunk.raw_text.contains("pip install pkg"));
    }

    #[test]
    fn test_classify_section() {
        assert_eq!(classify_section("Installation"), SectionType::Installation);
        assert_eq!(classify_section("Project Setup"), SectionType::Installation);
        assert_eq!(classify_section("Usage Examples"), SectionType::Usage);
        assert_eq!(classify_section("API Reference"), SectionType::Reference);
        assert_eq!(classify_section("Configuration"), SectionType::Configuration);
        assert_eq!(classify_section("Contributing"), SectionType::General);
    }

    #[test]
    fn test_remove_code_blocks() {
        let text = "Intro.\n\n```py\ncode here\n```\n\n    indented code\nNormal line.";
        let cleaned = remove_code_blocks(text);
        assert!(!cleaned.contains("code here"));
        assert!(!cleaned.contains("indented code"));
        assert!(cleaned.contains("Intro."));
        assert!(cleaned.contains("Normal line."));
    }

    #[test]
    fn test_generic_file_untouched() {
        let mut chunk = Chunk::new(
            ChunkPayload::GenericFile,
            "notes.txt",
            "notes.txt",
            1,
            "unknown",
        )
        .with_raw_text("raw body");
        normalizer().process_chunk(&mut chunk);
        assert!(chunk.processed_text.is_empty());
        assert_eq!(chunk.kind(), ChunkKind::GenericFile);
    }

    #[test]
    fn test_module_and_class_chunks_processed() {
        use crate::core::{ClassInfo, ModuleInfo};
        let mut module = Chunk::new(
            ChunkPayload::Module(ModuleInfo {
                docstring: "Helpers for parsing.".to_string(),
                imports: Vec::new(),
            }),
            "util.py",
            "util.py",
            1,
            "python",
        );
        normalizer().process_chunk(&mut module);
        assert!(module.processed_text.contains("pars"));

        let mut class = Chunk::new(
            ChunkPayload::Class(ClassInfo {
                docstring: "Caches results.".to_string(),
                ..ClassInfo::default()
            }),
            "Cache",
            "cache.py",
            1,
            "python",
        );
        normalizer().process_chunk(&mut class);
        assert!(class.processed_text.contains("cach"));
    }
}
