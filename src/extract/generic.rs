//! Generic whole-file extraction for unsupported types.

use crate::core::{Chunk, ChunkPayload};
use crate::error::Result;
use crate::extract::Extractor;
use std::path::Path;

/// Fallback extractor emitting a single `generic_file` chunk.
pub struct GenericExtractor;

impl GenericExtractor {
    /// Creates a new generic extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for GenericExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for GenericExtractor {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>> {
        let path = Path::new(file_path);
        let name = path
            .file_name()
            .map_or_else(|| file_path.to_string(), |n| n.to_string_lossy().to_string());

        let chunk = Chunk::new(
            ChunkPayload::GenericFile,
            &name,
            file_path,
            1,
            guess_language(path),
        )
        .with_raw_text(content);

        Ok(vec![chunk])
    }
}

/// Guesses a language tag from the file extension.
#[must_use]
pub fn guess_language(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return "unknown";
    };

    match ext.to_lowercase().as_str() {
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "c++",
        "cs" => "csharp",
        "go" => "go",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "m" => "objective-c",
        "rs" => "rust",
        "scala" => "scala",
        "kt" | "kts" => "kotlin",
        "sh" | "bash" => "shell",
        "pl" => "perl",
        "r" => "r",
        "lua" => "lua",
        "groovy" => "groovy",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "sql" => "sql",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "json" => "json",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChunkKind;

    #[test]
    fn test_generic_extraction() {
        let extractor = GenericExtractor::new();
        let chunks = extractor
            .extract("file contents here", "some/dir/config.toml")
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind(), ChunkKind::GenericFile);
        assert_eq!(chunks[0].name, "config.toml");
        assert_eq!(chunks[0].language, "toml");
        assert_eq!(chunks[0].raw_text, "file contents here");
        assert_eq!(chunks[0].lineno, 1);
    }

    #[test]
    fn test_guess_language() {
        assert_eq!(guess_language(Path::new("a.rs")), "rust");
        assert_eq!(guess_language(Path::new("a.go")), "go");
        assert_eq!(guess_language(Path::new("a.unknown_ext")), "unknown");
        assert_eq!(guess_language(Path::new("noext")), "unknown");
    }
}
