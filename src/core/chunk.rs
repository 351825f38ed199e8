//! Chunk representation for code-cognitio.
//!
//! A [`Chunk`] is the universal unit of extraction: one function, method,
//! class, documentation section, code block, or container-build directive,
//! with a common header and a kind-specific payload. Chunks are created by
//! extractors, enriched by the text normalizer, then frozen; the index
//! embeds them and retains them by insertion order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Content category of a chunk, derived from its kind.
///
/// `section` and `code_block` chunks are documentation; every other kind is
/// code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Source-code content.
    Code,
    /// Documentation content.
    Documentation,
}

impl ContentType {
    /// Returns the canonical string form (`code` / `documentation`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Documentation => "documentation",
        }
    }

    /// Parses a content type from its string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "code" => Some(Self::Code),
            "documentation" | "doc" | "docs" => Some(Self::Documentation),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator for the chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Module-level docstring and imports.
    Module,
    /// Top-level function.
    Function,
    /// Method within a class.
    Method,
    /// Class definition.
    Class,
    /// Documentation section.
    Section,
    /// Fenced or literal code block inside documentation.
    CodeBlock,
    /// Container-build file or one of its instructions.
    FileDirective,
    /// Whole-file fallback for unsupported types.
    GenericFile,
    /// React component from JSX/TSX sources.
    Component,
}

impl ChunkKind {
    /// Returns the content type implied by this kind.
    #[must_use]
    pub const fn content_type(self) -> ContentType {
        match self {
            Self::Section | Self::CodeBlock => ContentType::Documentation,
            _ => ContentType::Code,
        }
    }

    /// Returns the canonical snake_case name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Section => "section",
            Self::CodeBlock => "code_block",
            Self::FileDirective => "file_directive",
            Self::GenericFile => "generic_file",
            Self::Component => "component",
        }
    }

    /// Parses a kind from its string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "module" => Some(Self::Module),
            "function" => Some(Self::Function),
            "method" => Some(Self::Method),
            "class" => Some(Self::Class),
            "section" => Some(Self::Section),
            "code_block" => Some(Self::CodeBlock),
            "file_directive" => Some(Self::FileDirective),
            "generic_file" => Some(Self::GenericFile),
            "component" => Some(Self::Component),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function or method parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name as written in source.
    pub name: String,

    /// Type annotation, if any.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    /// Default value expression, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Param {
    /// Creates an untyped parameter.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: None,
            default: None,
        }
    }

    /// Creates a typed parameter.
    #[must_use]
    pub fn typed(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: Some(ty.to_string()),
            default: None,
        }
    }
}

/// Kind of an import record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import name [as alias]`
    Import,
    /// `from module import name [as alias]`
    ImportFrom,
}

/// One imported name at module level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Import statement form.
    pub kind: ImportKind,

    /// Source module for `from`-imports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Imported name.
    pub name: String,

    /// Binding alias, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Import {
    /// Renders the import back to a source-like string.
    #[must_use]
    pub fn render(&self) -> String {
        let alias = self
            .alias
            .as_ref()
            .map(|a| format!(" as {a}"))
            .unwrap_or_default();
        match (&self.kind, &self.module) {
            (ImportKind::ImportFrom, Some(module)) => {
                format!("from {module} import {}{alias}", self.name)
            }
            _ => format!("import {}{alias}", self.name),
        }
    }
}

/// Relationship kind between same-file symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// The source symbol calls the target.
    Calls,
    /// The source class inherits from the target.
    InheritsFrom,
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calls => f.write_str("calls"),
            Self::InheritsFrom => f.write_str("inherits from"),
        }
    }
}

/// A relationship edge to another symbol in the same file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship kind.
    #[serde(rename = "type")]
    pub rel_type: RelationKind,

    /// Target symbol name.
    pub target: String,

    /// Display name for rendering.
    pub display_name: String,
}

/// Shape of the arguments at one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPattern {
    /// Called with no arguments.
    NoArgs,
    /// Positional arguments only.
    PositionalOnly,
    /// Keyword arguments only.
    KeywordOnly,
    /// Mix of positional and keyword arguments.
    Mixed,
}

impl CallPattern {
    /// Human phrase used in usage summaries.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::NoArgs => "no arguments",
            Self::PositionalOnly => "positional arguments only",
            Self::KeywordOnly => "keyword arguments only",
            Self::Mixed => "mixed positional and keyword arguments",
        }
    }
}

/// Argument shape observed at a single call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgPattern {
    /// Number of positional arguments.
    pub positional_count: usize,

    /// Number of keyword arguments.
    pub keyword_count: usize,

    /// Names of the keyword arguments used.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyword_args: Vec<String>,

    /// Classified call pattern.
    pub pattern: CallPattern,
}

/// Per-function usage statistics accumulated across a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Number of call sites in the file.
    pub call_count: usize,

    /// Names of the enclosing functions/methods at each call site.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callers: Vec<String>,

    /// Argument shape of each call site.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arg_patterns: Vec<ArgPattern>,

    /// Syntactic-position keywords (`in_loop`, `assigned_to_x`, ...).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub context_keywords: BTreeSet<String>,

    /// Summarized common usage phrases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_usage: Vec<String>,
}

/// Surrounding-code context attached to functions, methods, and classes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeContext {
    /// Rendered module-level import statements (at most 10).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,

    /// Module-level variable names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub module_variables: Vec<String>,

    /// Other top-level functions defined nearby (functions only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub neighboring_functions: Vec<String>,

    /// Other methods of the enclosing class (methods only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sibling_methods: Vec<String>,

    /// Instance attributes of the enclosing class (methods only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instance_attributes: Vec<String>,

    /// Base classes (classes only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_classes: Vec<String>,

    /// Same-file classes that inherit from this class (classes only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subclasses: Vec<String>,

    /// Module (file) the symbol belongs to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module: String,
}

/// Payload shared by function and method chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallableInfo {
    /// Docstring, empty if absent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docstring: String,

    /// Ordered parameter list, matching source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,

    /// Return type annotation; `None` iff unannotated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,

    /// Enclosing class name (methods only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// `Class.method` for methods, bare name for functions.
    pub full_name: String,

    /// Body rendering used for search display (truncated).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body_digest: String,

    /// Short operation tags extracted from the body.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub key_operations: BTreeSet<String>,

    /// Design-pattern tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub patterns: BTreeSet<String>,

    /// Human-readable phrase derived from the name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub readable_name: String,

    /// Same-file call/inheritance relationships.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,

    /// Usage statistics from same-file call sites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageStats>,

    /// Surrounding-code context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<CodeContext>,

    /// Rendered signature: `name(p: T, ...) -> R`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
}

/// Payload of a class chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Docstring, empty if absent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docstring: String,

    /// Base class names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,

    /// Names of the methods defined in the class body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,

    /// Class-level attribute names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class_attributes: Vec<String>,

    /// Design-pattern tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub patterns: BTreeSet<String>,

    /// Same-file call/inheritance relationships.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,

    /// Surrounding-code context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<CodeContext>,
}

/// Payload of a module chunk (docstring plus imports).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Module docstring.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docstring: String,

    /// Module-level imports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
}

/// Classification of a documentation section by its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    /// Installation / setup instructions.
    Installation,
    /// Usage and examples.
    Usage,
    /// API reference material.
    Reference,
    /// Configuration documentation.
    Configuration,
    /// Anything else.
    General,
}

impl SectionType {
    /// Returns the canonical snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Installation => "installation",
            Self::Usage => "usage",
            Self::Reference => "reference",
            Self::Configuration => "configuration",
            Self::General => "general",
        }
    }
}

/// Payload of a documentation section chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionInfo {
    /// Section title.
    pub title: String,

    /// Header level 1-6; 0 for the whole-document fallback.
    pub level: u8,

    /// Byte position of the section start in the document.
    pub position: usize,

    /// Title of the containing document.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_title: String,

    /// Title-based classification, set by the normalizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_type: Option<SectionType>,

    /// Optional short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Title of the nearest shallower section, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_title: Option<String>,
}

/// Payload of a fenced or literal code block chunk.
///
/// The block's language tag lives in the chunk header `language` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeBlockInfo {
    /// Title of the nearest enclosing section.
    pub title: String,

    /// Byte position of the block in the document.
    pub position: usize,
}

/// Base image reference in a container-build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseImage {
    /// Image name.
    pub image: String,

    /// Image tag (`latest` when unspecified).
    pub tag: String,

    /// Build-stage alias, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// One instruction line in a container-build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerInstruction {
    /// Instruction verb (FROM, RUN, ...).
    pub verb: String,

    /// Instruction value.
    pub value: String,

    /// 1-based line number.
    pub lineno: usize,
}

/// Environment variable set by a container-build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub key: String,

    /// Variable value.
    pub value: String,
}

/// Payload of a container-build chunk.
///
/// The whole-file chunk carries the full aggregates; per-instruction chunks
/// carry a single entry in `instructions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectiveInfo {
    /// Base images referenced by FROM lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_images: Vec<BaseImage>,

    /// Instruction lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<DockerInstruction>,

    /// Environment variables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<EnvVar>,

    /// Exposed ports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exposed_ports: Vec<String>,

    /// Declared volumes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,

    /// Comment lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,

    /// Generated human-readable description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Payload of a React component chunk (JSX/TSX).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Component props parsed from the parameter list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<Param>,

    /// PascalCase JSX element names used in the body.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub jsx_elements: BTreeSet<String>,

    /// Truncated body rendering.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body_digest: String,

    /// JSDoc description, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docstring: String,
}

/// Kind-specific payload of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkPayload {
    /// Module docstring and imports.
    Module(ModuleInfo),
    /// Top-level function.
    Function(CallableInfo),
    /// Method within a class.
    Method(CallableInfo),
    /// Class definition.
    Class(ClassInfo),
    /// Documentation section.
    Section(SectionInfo),
    /// Code block inside documentation.
    CodeBlock(CodeBlockInfo),
    /// Container-build file or instruction.
    FileDirective(DirectiveInfo),
    /// Whole-file fallback.
    GenericFile,
    /// React component.
    Component(ComponentInfo),
}

impl ChunkPayload {
    /// Returns the kind discriminator of this payload.
    #[must_use]
    pub const fn kind(&self) -> ChunkKind {
        match self {
            Self::Module(_) => ChunkKind::Module,
            Self::Function(_) => ChunkKind::Function,
            Self::Method(_) => ChunkKind::Method,
            Self::Class(_) => ChunkKind::Class,
            Self::Section(_) => ChunkKind::Section,
            Self::CodeBlock(_) => ChunkKind::CodeBlock,
            Self::FileDirective(_) => ChunkKind::FileDirective,
            Self::GenericFile => ChunkKind::GenericFile,
            Self::Component(_) => ChunkKind::Component,
        }
    }
}

/// A single unit of retrievable content with structured metadata.
///
/// # Examples
///
/// ```
/// use code_cognitio::core::{Chunk, ChunkKind, ChunkPayload, ContentType, ModuleInfo};
///
/// let chunk = Chunk::new(
///     ChunkPayload::Module(ModuleInfo::default()),
///     "app.py",
///     "src/app.py",
///     1,
///     "python",
/// );
/// assert_eq!(chunk.kind(), ChunkKind::Module);
/// assert_eq!(chunk.content_type(), ContentType::Code);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Display identifier.
    pub name: String,

    /// Path of the source file as discovered.
    pub file_path: String,

    /// 1-based source line; 1 for whole-file items.
    pub lineno: usize,

    /// Language tag (`python`, `javascript`, `markdown`, ...).
    pub language: String,

    /// Original body text used for display.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_text: String,

    /// Normalizer output, ready for embedding.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub processed_text: String,

    /// Set when the chunk was recovered by regex salvage after a parse
    /// failure.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,

    /// 0-based index when a section was split by the chunker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,

    /// Kind-specific payload, tagged with `kind` in the serialized form.
    #[serde(flatten)]
    pub payload: ChunkPayload,

    /// Untyped key/value map for cross-cutting extensions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Chunk {
    /// Creates a chunk with an empty body and no extras.
    #[must_use]
    pub fn new(
        payload: ChunkPayload,
        name: &str,
        file_path: &str,
        lineno: usize,
        language: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            file_path: file_path.to_string(),
            lineno: lineno.max(1),
            language: language.to_string(),
            raw_text: String::new(),
            processed_text: String::new(),
            partial: false,
            chunk_index: None,
            payload,
            extra: BTreeMap::new(),
        }
    }

    /// Sets the raw body text.
    #[must_use]
    pub fn with_raw_text(mut self, raw: &str) -> Self {
        self.raw_text = raw.to_string();
        self
    }

    /// Returns the kind discriminator.
    #[must_use]
    pub const fn kind(&self) -> ChunkKind {
        self.payload.kind()
    }

    /// Returns the content type, derived from the kind.
    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        self.kind().content_type()
    }

    /// Returns the callable payload for function and method chunks.
    #[must_use]
    pub const fn callable(&self) -> Option<&CallableInfo> {
        match &self.payload {
            ChunkPayload::Function(info) | ChunkPayload::Method(info) => Some(info),
            _ => None,
        }
    }

    /// Returns the mutable callable payload for function and method chunks.
    pub const fn callable_mut(&mut self) -> Option<&mut CallableInfo> {
        match &mut self.payload {
            ChunkPayload::Function(info) | ChunkPayload::Method(info) => Some(info),
            _ => None,
        }
    }

    /// Returns the class payload for class chunks.
    #[must_use]
    pub const fn class_info(&self) -> Option<&ClassInfo> {
        match &self.payload {
            ChunkPayload::Class(info) => Some(info),
            _ => None,
        }
    }

    /// Returns the section payload for section chunks.
    #[must_use]
    pub const fn section_info(&self) -> Option<&SectionInfo> {
        match &self.payload {
            ChunkPayload::Section(info) => Some(info),
            _ => None,
        }
    }

    /// Returns true if the chunk carries any indexable text.
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.processed_text.trim().is_empty() || !self.raw_text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_function() -> Chunk {
        let info = CallableInfo {
            docstring: "Add two numbers.".to_string(),
            params: vec![Param::typed("a", "int"), Param::typed("b", "int")],
            return_type: Some("int".to_string()),
            full_name: "add".to_string(),
            signature: "add(a: int, b: int) -> int".to_string(),
            ..CallableInfo::default()
        };
        Chunk::new(
            ChunkPayload::Function(info),
            "add",
            "src/math.py",
            10,
            "python",
        )
    }

    #[test]
    fn test_kind_and_content_type() {
        let chunk = sample_function();
        assert_eq!(chunk.kind(), ChunkKind::Function);
        assert_eq!(chunk.content_type(), ContentType::Code);

        let section = Chunk::new(
            ChunkPayload::Section(SectionInfo {
                title: "Usage".to_string(),
                level: 2,
                ..SectionInfo::default()
            }),
            "Usage",
            "README.md",
            1,
            "markdown",
        );
        assert_eq!(section.content_type(), ContentType::Documentation);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ChunkKind::Module,
            ChunkKind::Function,
            ChunkKind::Method,
            ChunkKind::Class,
            ChunkKind::Section,
            ChunkKind::CodeBlock,
            ChunkKind::FileDirective,
            ChunkKind::GenericFile,
            ChunkKind::Component,
        ] {
            assert_eq!(ChunkKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChunkKind::parse("unknown"), None);
    }

    #[test]
    fn test_content_type_parse() {
        assert_eq!(ContentType::parse("code"), Some(ContentType::Code));
        assert_eq!(
            ContentType::parse("documentation"),
            Some(ContentType::Documentation)
        );
        assert_eq!(ContentType::parse("doc"), Some(ContentType::Documentation));
        assert_eq!(ContentType::parse("other"), None);
    }

    #[test]
    fn test_serialization_kind_tag() {
        let chunk = sample_function();
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["kind"], "function");
        assert_eq!(json["full_name"], "add");
        assert_eq!(json["params"][0]["type"], "int");
    }

    #[test]
    fn test_serialization_round_trip() {
        let chunk = sample_function();
        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn test_generic_file_round_trip() {
        let chunk = Chunk::new(
            ChunkPayload::GenericFile,
            "notes.txt",
            "notes.txt",
            1,
            "unknown",
        )
        .with_raw_text("some text");
        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), ChunkKind::GenericFile);
        assert_eq!(back.raw_text, "some text");
    }

    #[test]
    fn test_import_render() {
        let import = Import {
            kind: ImportKind::Import,
            module: None,
            name: "os".to_string(),
            alias: None,
        };
        assert_eq!(import.render(), "import os");

        let from_import = Import {
            kind: ImportKind::ImportFrom,
            module: Some("pathlib".to_string()),
            name: "Path".to_string(),
            alias: Some("P".to_string()),
        };
        assert_eq!(from_import.render(), "from pathlib import Path as P");
    }

    #[test]
    fn test_callable_accessors() {
        let mut chunk = sample_function();
        assert!(chunk.callable().is_some());
        assert!(chunk.class_info().is_none());

        if let Some(info) = chunk.callable_mut() {
            info.patterns.insert("accessor".to_string());
        }
        assert!(
            chunk
                .callable()
                .is_some_and(|i| i.patterns.contains("accessor"))
        );
    }

    #[test]
    fn test_lineno_clamped() {
        let chunk = Chunk::new(ChunkPayload::GenericFile, "f", "f", 0, "unknown");
        assert_eq!(chunk.lineno, 1);
    }

    #[test]
    fn test_has_text() {
        let chunk = Chunk::new(ChunkPayload::GenericFile, "f", "f", 1, "unknown");
        assert!(!chunk.has_text());
        let chunk = chunk.with_raw_text("content");
        assert!(chunk.has_text());
    }
}
