//! Python extraction using tree-sitter.
//!
//! The richest extractor: a full AST parse producing module, function,
//! class, and method chunks enriched with parameters, docstrings, design
//! patterns, same-file relationships, surrounding-code context, and usage
//! statistics. Files above the large-file threshold are scanned
//! definition-by-definition instead of being parsed whole, and files whose
//! tree contains syntax errors fall back to regex salvage with chunks
//! tagged `partial`.

use crate::core::{
    ArgPattern, CallPattern, CallableInfo, Chunk, ChunkPayload, ClassInfo, CodeContext, Import,
    ImportKind, ModuleInfo, Param, RelationKind, Relationship, UsageStats,
};
use crate::error::{ExtractionError, Result};
use crate::extract::Extractor;
use crate::io::{FileReader, mmap_lines};
use regex::Regex;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};
use tree_sitter::{Node, Parser};

// Thread-local parser cache: tree-sitter parsers are cheap to reuse but not
// Sync, and extraction runs on a rayon pool.
thread_local! {
    static PYTHON_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn with_parser<F, R>(f: F) -> Result<R>
where
    F: FnOnce(&mut Parser) -> R,
{
    PYTHON_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let mut parser = Parser::new();
            parser
                .set_language(&tree_sitter_python::LANGUAGE.into())
                .map_err(|e| ExtractionError::ParserInit(e.to_string()))?;
            *slot = Some(parser);
        }
        let parser = slot
            .as_mut()
            .ok_or_else(|| ExtractionError::ParserInit("parser cache poisoned".to_string()))?;
        Ok(f(parser))
    })
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: OnceLock<Regex> = OnceLock::new();
        $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

/// Symbol table of a parsed file: classes with their members, and top-level
/// functions, keyed the way relationships are keyed.
#[derive(Debug, Default)]
struct CodeMap {
    /// Top-level function names with start lines.
    functions: BTreeMap<String, usize>,
    /// Class name to (methods, class attribute names, instance attribute names).
    classes: BTreeMap<String, ClassEntry>,
}

#[derive(Debug, Default)]
struct ClassEntry {
    methods: Vec<String>,
    class_attributes: Vec<String>,
    instance_attributes: Vec<String>,
    bases: Vec<String>,
}

impl CodeMap {
    fn defines(&self, name: &str) -> bool {
        self.functions.contains_key(name)
            || self.classes.contains_key(name)
            || self
                .classes
                .values()
                .any(|c| c.methods.iter().any(|m| m == name))
    }

    fn is_callable(&self, name: &str) -> bool {
        self.functions.contains_key(name)
            || self
                .classes
                .values()
                .any(|c| c.methods.iter().any(|m| m == name))
    }
}

/// Extractor for Python source files.
///
/// # Examples
///
/// ```
/// use code_cognitio::extract::{Extractor, PythonExtractor};
///
/// let extractor = PythonExtractor::default();
/// let chunks = extractor
///     .extract("def greet(name: str) -> str:\n    \"\"\"Say hello.\"\"\"\n    return name\n", "a.py")
///     .unwrap();
/// assert_eq!(chunks[0].name, "greet");
/// ```
pub struct PythonExtractor {
    /// Files above this size are scanned definition-by-definition.
    large_file_threshold: u64,
}

impl PythonExtractor {
    /// Creates an extractor with the given large-file threshold in bytes.
    #[must_use]
    pub const fn new(large_file_threshold: u64) -> Self {
        Self {
            large_file_threshold,
        }
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LARGE_FILE_THRESHOLD)
    }
}

impl Extractor for PythonExtractor {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".py"]
    }

    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>> {
        let tree = with_parser(|parser| parser.parse(content, None))?.ok_or_else(|| {
            ExtractionError::ParseFailed {
                path: file_path.to_string(),
                reason: "tree-sitter returned no tree".to_string(),
            }
        })?;

        let root = tree.root_node();
        if root.has_error() {
            info!(path = file_path, "syntax errors, falling back to regex salvage");
            return Ok(salvage_with_regex(content, file_path));
        }

        Ok(extract_full(root, content, file_path))
    }

    fn extract_from_file(&self, path: &Path) -> Result<Vec<Chunk>> {
        let reader = FileReader::open(path)?;
        let file_path = path.to_string_lossy().to_string();

        if reader.size() > self.large_file_threshold {
            info!(
                path = %path.display(),
                size = reader.size(),
                "large file detected, processing definition-by-definition"
            );
            return self.extract_large_file(&reader, &file_path);
        }

        let content = reader.read_to_string()?;
        self.extract(&content, &file_path)
    }
}

// ---------------------------------------------------------------------------
// Full-tree extraction
// ---------------------------------------------------------------------------

fn extract_full(root: Node<'_>, content: &str, file_path: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    if let Some(module_chunk) = extract_module_chunk(root, content, file_path) {
        chunks.push(module_chunk);
    }

    let code_map = build_code_map(root, content);
    let relationships = analyze_relationships(root, content, &code_map);
    let module_imports = extract_imports(root, content);
    let module_variables = module_variable_names(root, content);

    let mut cursor = root.walk();
    for statement in root.children(&mut cursor) {
        let (node, decorators) = unwrap_decorated(statement, content);
        match node.kind() {
            "function_definition" => {
                let mut chunk = extract_callable(node, content, file_path, None, &decorators);
                attach_function_extras(
                    &mut chunk,
                    node,
                    &code_map,
                    &relationships,
                    &module_imports,
                    &module_variables,
                    file_path,
                );
                chunks.push(chunk);
            }
            "class_definition" => {
                extract_class_with_methods(
                    node,
                    content,
                    file_path,
                    &code_map,
                    &relationships,
                    &module_imports,
                    &mut chunks,
                );
            }
            _ => {}
        }
    }

    let usage = analyze_usage(root, content, &code_map);
    for chunk in &mut chunks {
        let name = chunk.name.clone();
        if let Some(info) = chunk.callable_mut()
            && let Some(stats) = usage.get(&name)
        {
            info.usage = Some(stats.clone());
        }
    }

    debug!(path = file_path, chunks = chunks.len(), "python extraction complete");
    chunks
}

fn extract_module_chunk(root: Node<'_>, content: &str, file_path: &str) -> Option<Chunk> {
    let first = root.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = find_child(first, "string")?;
    let docstring = string_literal_text(string, content);

    let name = basename(file_path);
    let imports = extract_imports(root, content);
    let chunk = Chunk::new(
        ChunkPayload::Module(ModuleInfo {
            docstring: docstring.clone(),
            imports,
        }),
        &name,
        file_path,
        1,
        "python",
    )
    .with_raw_text(&docstring);
    Some(chunk)
}

fn extract_class_with_methods(
    node: Node<'_>,
    content: &str,
    file_path: &str,
    code_map: &CodeMap,
    relationships: &HashMap<String, Vec<Relationship>>,
    module_imports: &[Import],
    chunks: &mut Vec<Chunk>,
) {
    let Some(class_name) = identifier_field(node, "name", content) else {
        return;
    };

    let mut class_chunk = extract_class(node, content, file_path);
    if let ChunkPayload::Class(info) = &mut class_chunk.payload {
        info.patterns = class_patterns(node, content);
        if let Some(rels) = relationships.get(&format!("class:{class_name}")) {
            info.relationships = rels.clone();
        }
        info.context = Some(class_context(&class_name, code_map, file_path));
    }
    chunks.push(class_chunk);

    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for statement in body.children(&mut cursor) {
        let (member, decorators) = unwrap_decorated(statement, content);
        if member.kind() != "function_definition" {
            continue;
        }
        let mut chunk =
            extract_callable(member, content, file_path, Some(&class_name), &decorators);
        let method_name = chunk.name.clone();
        if let Some(info) = chunk.callable_mut() {
            if let Some(rels) = relationships.get(&format!("method:{class_name}.{method_name}")) {
                info.relationships = rels.clone();
            }
            info.context = Some(method_context(
                &class_name,
                &method_name,
                code_map,
                module_imports,
                file_path,
            ));
        }
        chunks.push(chunk);
    }
}

fn attach_function_extras(
    chunk: &mut Chunk,
    node: Node<'_>,
    code_map: &CodeMap,
    relationships: &HashMap<String, Vec<Relationship>>,
    module_imports: &[Import],
    module_variables: &[String],
    file_path: &str,
) {
    let name = chunk.name.clone();
    let lineno = node.start_position().row + 1;
    if let Some(info) = chunk.callable_mut() {
        if let Some(rels) = relationships.get(&format!("function:{name}")) {
            info.relationships = rels.clone();
        }
        info.context = Some(function_context(
            &name,
            lineno,
            code_map,
            module_imports,
            module_variables,
            file_path,
        ));
    }
}

/// Extracts a function or method chunk (without context or usage).
fn extract_callable(
    node: Node<'_>,
    content: &str,
    file_path: &str,
    class_name: Option<&str>,
    decorators: &[String],
) -> Chunk {
    let name = identifier_field(node, "name", content).unwrap_or_default();
    let params = extract_params(node, content);
    let return_type = node
        .child_by_field_name("return_type")
        .map(|n| node_text(n, content));
    let docstring = body_docstring(node, content).unwrap_or_default();
    let body_digest = node
        .child_by_field_name("body")
        .map(|b| node_text(b, content))
        .unwrap_or_default();

    let full_name = class_name.map_or_else(|| name.clone(), |c| format!("{c}.{name}"));

    let info = CallableInfo {
        docstring,
        params,
        return_type,
        class_name: class_name.map(ToString::to_string),
        full_name,
        key_operations: key_operations(node, content),
        patterns: function_patterns(node, &name, decorators),
        readable_name: name_to_phrase(&name),
        body_digest,
        ..CallableInfo::default()
    };

    let payload = if class_name.is_some() {
        ChunkPayload::Method(info)
    } else {
        ChunkPayload::Function(info)
    };

    Chunk::new(
        payload,
        &name,
        file_path,
        node.start_position().row + 1,
        "python",
    )
    .with_raw_text(&node_text(node, content))
}

fn extract_class(node: Node<'_>, content: &str, file_path: &str) -> Chunk {
    let name = identifier_field(node, "name", content).unwrap_or_default();
    let docstring = body_docstring(node, content).unwrap_or_default();
    let bases = class_bases(node, content);

    let mut methods = Vec::new();
    let mut class_attributes = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for statement in body.children(&mut cursor) {
            let (member, _) = unwrap_decorated(statement, content);
            match member.kind() {
                "function_definition" => {
                    if let Some(m) = identifier_field(member, "name", content) {
                        methods.push(m);
                    }
                }
                "expression_statement" => {
                    if let Some(assign) = find_child(member, "assignment")
                        && let Some(target) = assign.child_by_field_name("left")
                        && target.kind() == "identifier"
                    {
                        class_attributes.push(node_text(target, content));
                    }
                }
                _ => {}
            }
        }
    }

    Chunk::new(
        ChunkPayload::Class(ClassInfo {
            docstring,
            bases,
            methods,
            class_attributes,
            ..ClassInfo::default()
        }),
        &name,
        file_path,
        node.start_position().row + 1,
        "python",
    )
    .with_raw_text(&node_text(node, content))
}

// ---------------------------------------------------------------------------
// Large-file fallback
// ---------------------------------------------------------------------------

impl PythonExtractor {
    /// Extracts a large file without loading it whole: the module docstring
    /// is recovered from the first 10 KiB, then each definition block is
    /// buffered and parsed independently.
    fn extract_large_file(&self, reader: &FileReader, file_path: &str) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();

        let head = reader.read_head(10 * 1024)?;
        if let Some(module_chunk) = parse_head_docstring(&head, file_path) {
            chunks.push(module_chunk);
        }

        let mmap = reader.mmap()?;
        for (block, start_line) in DefinitionScanner::new(mmap_lines(&mmap)) {
            match self.parse_definition_block(&block, start_line, file_path) {
                Ok(mut block_chunks) => chunks.append(&mut block_chunks),
                Err(e) => {
                    debug!(path = file_path, line = start_line, error = %e, "skipping unparseable block");
                }
            }
        }

        Ok(chunks)
    }

    /// Parses one buffered definition block, shifting line numbers back to
    /// absolute positions.
    fn parse_definition_block(
        &self,
        block: &str,
        start_line: usize,
        file_path: &str,
    ) -> Result<Vec<Chunk>> {
        let mut chunks = self.extract(block, file_path)?;
        for chunk in &mut chunks {
            chunk.lineno = chunk.lineno + start_line - 1;
        }
        Ok(chunks)
    }
}

fn parse_head_docstring(head: &str, file_path: &str) -> Option<Chunk> {
    let tree = with_parser(|parser| parser.parse(head, None)).ok()??;
    extract_module_chunk(tree.root_node(), head, file_path).map(|mut chunk| {
        // Imports can't be recovered reliably from a truncated head.
        if let ChunkPayload::Module(info) = &mut chunk.payload {
            info.imports.clear();
        }
        chunk
    })
}

/// Streams definition blocks out of a line iterator.
///
/// A definition begins at a line matching `def name(` or `class name(:` and
/// ends at the first non-blank, non-comment line at the same or lower
/// indentation.
struct DefinitionScanner<I> {
    lines: I,
    line_num: usize,
    pending: Option<(String, usize, usize)>,
}

impl<'a, I: Iterator<Item = std::borrow::Cow<'a, str>>> DefinitionScanner<I> {
    fn new(lines: I) -> Self {
        Self {
            lines,
            line_num: 0,
            pending: None,
        }
    }
}

impl<'a, I: Iterator<Item = std::borrow::Cow<'a, str>>> Iterator for DefinitionScanner<I> {
    type Item = (String, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let def_re = static_regex!(DEF_START, r"^def\s+\w+\s*\(");
        let class_re = static_regex!(CLASS_START, r"^class\s+\w+\s*[(:]");

        loop {
            let Some(line) = self.lines.next() else {
                // Flush the last buffered definition.
                return self
                    .pending
                    .take()
                    .map(|(buffer, start, _)| (buffer, start));
            };
            self.line_num += 1;
            let trimmed = line.trim_start();
            let indent = line.len() - trimmed.len();
            let starts_definition = def_re.is_match(trimmed) || class_re.is_match(trimmed);

            match &mut self.pending {
                None => {
                    if starts_definition {
                        self.pending = Some((format!("{line}\n"), self.line_num, indent));
                    }
                }
                Some((buffer, start, def_indent)) => {
                    let blank_or_comment = trimmed.is_empty() || trimmed.starts_with('#');
                    if !blank_or_comment && indent <= *def_indent {
                        let finished = (std::mem::take(buffer), *start);
                        self.pending = if starts_definition {
                            Some((format!("{line}\n"), self.line_num, indent))
                        } else {
                            None
                        };
                        return Some(finished);
                    }
                    buffer.push_str(&line);
                    buffer.push('\n');
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Regex salvage
// ---------------------------------------------------------------------------

/// Recovers function, class, and method chunks from content that failed to
/// parse. Parameters, return types, and bases are left empty; every chunk is
/// tagged `partial`.
fn salvage_with_regex(content: &str, file_path: &str) -> Vec<Chunk> {
    let func_re = static_regex!(
        SALVAGE_FUNC,
        r#"(?ms)^def\s+(\w+)\s*\([^)]*\)[^:]*:(?:\s*"""(.*?)""")?"#
    );
    let class_re = static_regex!(
        SALVAGE_CLASS,
        r#"(?ms)^class\s+(\w+)(?:\([^)]*\))?[^:]*:(?:\s*"""(.*?)""")?"#
    );
    let method_re = static_regex!(
        SALVAGE_METHOD,
        r#"(?ms)^\s+def\s+(\w+)\s*\([^)]*\)[^:]*:(?:\s*"""(.*?)""")?"#
    );

    let mut chunks = Vec::new();

    for m in func_re.captures_iter(content) {
        let Some(name) = m.get(1) else { continue };
        let docstring = m.get(2).map(|d| d.as_str().trim().to_string());
        let lineno = line_of_offset(content, name.start());
        let mut chunk = Chunk::new(
            ChunkPayload::Function(CallableInfo {
                docstring: docstring.unwrap_or_default(),
                full_name: name.as_str().to_string(),
                readable_name: name_to_phrase(name.as_str()),
                ..CallableInfo::default()
            }),
            name.as_str(),
            file_path,
            lineno,
            "python",
        );
        chunk.partial = true;
        chunks.push(chunk);
    }

    for m in class_re.captures_iter(content) {
        let Some(name) = m.get(1) else { continue };
        let class_name = name.as_str();
        let docstring = m.get(2).map(|d| d.as_str().trim().to_string());
        let class_start = m.get(0).map_or(0, |g| g.start());
        let lineno = line_of_offset(content, class_start);
        let mut chunk = Chunk::new(
            ChunkPayload::Class(ClassInfo {
                docstring: docstring.unwrap_or_default(),
                ..ClassInfo::default()
            }),
            class_name,
            file_path,
            lineno,
            "python",
        );
        chunk.partial = true;
        chunks.push(chunk);

        // Methods live in the indented block that follows the class line.
        let block = class_block(&content[class_start..]);
        for mm in method_re.captures_iter(block) {
            let Some(method) = mm.get(1) else { continue };
            let method_doc = mm.get(2).map(|d| d.as_str().trim().to_string());
            let method_line = lineno + block[..mm.get(0).map_or(0, |g| g.start())].matches('\n').count();
            let mut method_chunk = Chunk::new(
                ChunkPayload::Method(CallableInfo {
                    docstring: method_doc.unwrap_or_default(),
                    class_name: Some(class_name.to_string()),
                    full_name: format!("{class_name}.{}", method.as_str()),
                    readable_name: name_to_phrase(method.as_str()),
                    ..CallableInfo::default()
                }),
                method.as_str(),
                file_path,
                method_line,
                "python",
            );
            method_chunk.partial = true;
            chunks.push(method_chunk);
        }
    }

    chunks
}

/// Returns the slice from a class header through the end of its indented
/// block.
fn class_block(from_class: &str) -> &str {
    let mut end = from_class.len();
    for (offset, line) in line_offsets(from_class).skip(1) {
        if !line.trim().is_empty() && !line.starts_with(' ') && !line.starts_with('\t') {
            end = offset;
            break;
        }
    }
    &from_class[..end]
}

fn line_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_inclusive('\n').scan(0, |offset, line| {
        let start = *offset;
        *offset += line.len();
        Some((start, line.trim_end_matches(['\n', '\r'])))
    })
}

fn line_of_offset(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

// ---------------------------------------------------------------------------
// Imports, parameters, docstrings
// ---------------------------------------------------------------------------

fn extract_imports(root: Node<'_>, content: &str) -> Vec<Import> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for statement in root.children(&mut cursor) {
        match statement.kind() {
            "import_statement" => {
                let mut inner = statement.walk();
                for child in statement.children(&mut inner) {
                    match child.kind() {
                        "dotted_name" => imports.push(Import {
                            kind: ImportKind::Import,
                            module: None,
                            name: node_text(child, content),
                            alias: None,
                        }),
                        "aliased_import" => {
                            if let Some(name) = statement_field(child, "name", content) {
                                imports.push(Import {
                                    kind: ImportKind::Import,
                                    module: None,
                                    name,
                                    alias: statement_field(child, "alias", content),
                                });
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                let module = statement_field(statement, "module_name", content);
                let mut inner = statement.walk();
                // Skip the module-name node itself; remaining names are the
                // imported bindings.
                let module_node_id = statement
                    .child_by_field_name("module_name")
                    .map(|n| n.id());
                for child in statement.children(&mut inner) {
                    if Some(child.id()) == module_node_id {
                        continue;
                    }
                    match child.kind() {
                        "dotted_name" => imports.push(Import {
                            kind: ImportKind::ImportFrom,
                            module: module.clone(),
                            name: node_text(child, content),
                            alias: None,
                        }),
                        "aliased_import" => {
                            if let Some(name) = statement_field(child, "name", content) {
                                imports.push(Import {
                                    kind: ImportKind::ImportFrom,
                                    module: module.clone(),
                                    name,
                                    alias: statement_field(child, "alias", content),
                                });
                            }
                        }
                        "wildcard_import" => imports.push(Import {
                            kind: ImportKind::ImportFrom,
                            module: module.clone(),
                            name: "*".to_string(),
                            alias: None,
                        }),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    imports
}

fn extract_params(node: Node<'_>, content: &str) -> Vec<Param> {
    let Some(params_node) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };

    let mut params = Vec::new();
    let mut cursor = params_node.walk();
    for child in params_node.children(&mut cursor) {
        match child.kind() {
            "identifier" => params.push(Param::named(&node_text(child, content))),
            "typed_parameter" => {
                let name = child
                    .named_child(0)
                    .map(|n| node_text(n, content))
                    .unwrap_or_default();
                let ty = child
                    .child_by_field_name("type")
                    .map(|n| node_text(n, content));
                params.push(Param {
                    name,
                    ty,
                    default: None,
                });
            }
            "default_parameter" => {
                let name = statement_field(child, "name", content).unwrap_or_default();
                let default = statement_field(child, "value", content);
                params.push(Param {
                    name,
                    ty: None,
                    default,
                });
            }
            "typed_default_parameter" => {
                let name = statement_field(child, "name", content).unwrap_or_default();
                let ty = child
                    .child_by_field_name("type")
                    .map(|n| node_text(n, content));
                let default = statement_field(child, "value", content);
                params.push(Param { name, ty, default });
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                params.push(Param::named(&node_text(child, content)));
            }
            _ => {}
        }
    }
    params
}

/// Returns the docstring of a function or class body, if the first statement
/// is a standalone string literal.
fn body_docstring(node: Node<'_>, content: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = find_child(first, "string")?;
    Some(string_literal_text(string, content))
}

/// Extracts the inner text of a string literal, preferring the grammar's
/// `string_content` nodes and falling back to quote trimming.
fn string_literal_text(string: Node<'_>, content: &str) -> String {
    let mut cursor = string.walk();
    let parts: Vec<String> = string
        .children(&mut cursor)
        .filter(|c| c.kind() == "string_content")
        .map(|c| node_text(c, content))
        .collect();

    let raw = if parts.is_empty() {
        let text = node_text(string, content);
        text.trim_start_matches(['r', 'b', 'u', 'f', 'R', 'B', 'U', 'F'])
            .trim_start_matches("\"\"\"")
            .trim_start_matches("'''")
            .trim_end_matches("\"\"\"")
            .trim_end_matches("'''")
            .trim_matches(['"', '\''])
            .to_string()
    } else {
        parts.join("")
    };

    dedent(&raw).trim().to_string()
}

/// Strips the common leading whitespace from all lines after the first.
fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let min_indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    if min_indent == 0 {
        return text.to_string();
    }

    let mut result: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 || line.trim().is_empty() {
            result.push(line.trim_end().to_string());
        } else {
            result.push(line[min_indent.min(line.len())..].to_string());
        }
    }
    result.join("\n")
}

fn class_bases(node: Node<'_>, content: &str) -> Vec<String> {
    let Some(superclasses) = node.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut cursor = superclasses.walk();
    superclasses
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "keyword_argument")
        .map(|c| node_text(c, content))
        .collect()
}

// ---------------------------------------------------------------------------
// Code map, relationships, context
// ---------------------------------------------------------------------------

fn build_code_map(root: Node<'_>, content: &str) -> CodeMap {
    let mut map = CodeMap::default();

    let mut cursor = root.walk();
    for statement in root.children(&mut cursor) {
        let (node, _) = unwrap_decorated(statement, content);
        match node.kind() {
            "function_definition" => {
                if let Some(name) = identifier_field(node, "name", content) {
                    map.functions.insert(name, node.start_position().row + 1);
                }
            }
            "class_definition" => {
                let Some(class_name) = identifier_field(node, "name", content) else {
                    continue;
                };
                let mut entry = ClassEntry {
                    bases: class_bases(node, content),
                    ..ClassEntry::default()
                };
                if let Some(body) = node.child_by_field_name("body") {
                    let mut body_cursor = body.walk();
                    for member in body.children(&mut body_cursor) {
                        let (member, _) = unwrap_decorated(member, content);
                        match member.kind() {
                            "function_definition" => {
                                if let Some(m) = identifier_field(member, "name", content) {
                                    collect_instance_attributes(
                                        member,
                                        content,
                                        &mut entry.instance_attributes,
                                    );
                                    entry.methods.push(m);
                                }
                            }
                            "expression_statement" => {
                                if let Some(assign) = find_child(member, "assignment")
                                    && let Some(target) = assign.child_by_field_name("left")
                                    && target.kind() == "identifier"
                                {
                                    entry.class_attributes.push(node_text(target, content));
                                }
                            }
                            _ => {}
                        }
                    }
                }
                entry.instance_attributes.sort();
                entry.instance_attributes.dedup();
                map.classes.insert(class_name, entry);
            }
            _ => {}
        }
    }
    map
}

/// Collects `self.attr = ...` targets from a method body.
fn collect_instance_attributes(method: Node<'_>, content: &str, out: &mut Vec<String>) {
    visit(method, &mut |node| {
        if node.kind() == "assignment"
            && let Some(left) = node.child_by_field_name("left")
            && left.kind() == "attribute"
            && let Some(object) = left.child_by_field_name("object")
            && object.kind() == "identifier"
            && node_text(object, content) == "self"
            && let Some(attr) = left.child_by_field_name("attribute")
        {
            out.push(node_text(attr, content));
        }
    });
}

/// Single-pass relationship analysis: call edges to same-file symbols keyed
/// under the enclosing symbol, plus inheritance edges for same-file bases.
fn analyze_relationships(
    root: Node<'_>,
    content: &str,
    code_map: &CodeMap,
) -> HashMap<String, Vec<Relationship>> {
    let mut relationships: HashMap<String, Vec<Relationship>> = HashMap::new();

    for (class_name, entry) in &code_map.classes {
        for base in &entry.bases {
            if code_map.classes.contains_key(base) {
                relationships
                    .entry(format!("class:{class_name}"))
                    .or_default()
                    .push(Relationship {
                        rel_type: RelationKind::InheritsFrom,
                        target: base.clone(),
                        display_name: base.clone(),
                    });
            }
        }
    }

    // The enclosing symbol is carried on an explicit stack; the tree is
    // walked exactly once.
    let mut stack: Vec<String> = Vec::new();
    walk_with_scope(root, content, &mut stack, &mut |node, stack| {
        if node.kind() != "call" {
            return;
        }
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        if function.kind() != "identifier" {
            return;
        }
        let target = node_text(function, content);
        if !code_map.defines(&target) {
            return;
        }
        let Some(enclosing) = stack.last() else {
            return;
        };
        relationships
            .entry(enclosing.clone())
            .or_default()
            .push(Relationship {
                rel_type: RelationKind::Calls,
                target: target.clone(),
                display_name: target,
            });
    });

    relationships
}

fn function_context(
    name: &str,
    lineno: usize,
    code_map: &CodeMap,
    imports: &[Import],
    module_variables: &[String],
    file_path: &str,
) -> CodeContext {
    let neighboring_functions = code_map
        .functions
        .iter()
        .filter(|(other, line)| other.as_str() != name && line.abs_diff(lineno) <= 20)
        .map(|(other, _)| other.clone())
        .collect();

    CodeContext {
        imports: rendered_imports(imports),
        module_variables: module_variables.to_vec(),
        neighboring_functions,
        module: basename(file_path),
        ..CodeContext::default()
    }
}

fn method_context(
    class_name: &str,
    method_name: &str,
    code_map: &CodeMap,
    imports: &[Import],
    file_path: &str,
) -> CodeContext {
    let entry = code_map.classes.get(class_name);
    CodeContext {
        imports: rendered_imports(imports),
        sibling_methods: entry
            .map(|e| {
                e.methods
                    .iter()
                    .filter(|m| m.as_str() != method_name)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default(),
        instance_attributes: entry
            .map(|e| e.instance_attributes.clone())
            .unwrap_or_default(),
        module: basename(file_path),
        ..CodeContext::default()
    }
}

fn class_context(class_name: &str, code_map: &CodeMap, file_path: &str) -> CodeContext {
    let entry = code_map.classes.get(class_name);
    let subclasses = code_map
        .classes
        .iter()
        .filter(|(_, e)| e.bases.iter().any(|b| b == class_name))
        .map(|(name, _)| name.clone())
        .collect();

    CodeContext {
        base_classes: entry.map(|e| e.bases.clone()).unwrap_or_default(),
        subclasses,
        module: basename(file_path),
        ..CodeContext::default()
    }
}

fn rendered_imports(imports: &[Import]) -> Vec<String> {
    imports.iter().take(10).map(Import::render).collect()
}

fn module_variable_names(root: Node<'_>, content: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = root.walk();
    for statement in root.children(&mut cursor) {
        if statement.kind() == "expression_statement"
            && let Some(assign) = find_child(statement, "assignment")
            && let Some(target) = assign.child_by_field_name("left")
            && target.kind() == "identifier"
        {
            names.push(node_text(target, content));
        }
    }
    names
}

// ---------------------------------------------------------------------------
// Usage analysis
// ---------------------------------------------------------------------------

#[derive(Default)]
struct UsageContext {
    in_loop: bool,
    in_try: bool,
    in_except: bool,
    in_with: bool,
    if_condition_names: Vec<String>,
    assign_target: Option<String>,
}

/// Single-pass usage analysis: for every call whose target is a same-file
/// function or method, accumulate call counts, callers, argument shapes, and
/// syntactic-position keywords.
fn analyze_usage(root: Node<'_>, content: &str, code_map: &CodeMap) -> HashMap<String, UsageStats> {
    let mut usage: HashMap<String, UsageStats> = HashMap::new();
    let mut scope: Vec<String> = Vec::new();
    let ctx = UsageContext::default();

    usage_walk(root, content, code_map, &mut usage, &mut scope, &ctx);

    for stats in usage.values_mut() {
        stats.callers.sort();
        stats.callers.dedup();
        stats.common_usage = summarize_usage(&stats.arg_patterns);
    }
    usage
}

#[allow(clippy::too_many_lines)]
fn usage_walk(
    node: Node<'_>,
    content: &str,
    code_map: &CodeMap,
    usage: &mut HashMap<String, UsageStats>,
    scope: &mut Vec<String>,
    ctx: &UsageContext,
) {
    let mut child_ctx = UsageContext {
        in_loop: ctx.in_loop,
        in_try: ctx.in_try,
        in_except: ctx.in_except,
        in_with: ctx.in_with,
        if_condition_names: ctx.if_condition_names.clone(),
        assign_target: None,
    };

    match node.kind() {
        "for_statement" | "while_statement" => child_ctx.in_loop = true,
        "try_statement" => child_ctx.in_try = true,
        "except_clause" => child_ctx.in_except = true,
        "with_statement" => child_ctx.in_with = true,
        "if_statement" => {
            if let Some(condition) = node.child_by_field_name("condition") {
                collect_identifiers(condition, content, &mut child_ctx.if_condition_names);
            }
        }
        "assignment" => {
            if let Some(left) = node.child_by_field_name("left")
                && left.kind() == "identifier"
            {
                child_ctx.assign_target = Some(node_text(left, content));
            }
        }
        "call" => {
            record_call_site(node, content, code_map, usage, scope, ctx);
        }
        _ => {}
    }

    let pushed_scope = match node.kind() {
        "function_definition" | "class_definition" => {
            identifier_field(node, "name", content).map(|name| {
                scope.push(name);
            })
        }
        _ => None,
    };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        usage_walk(child, content, code_map, usage, scope, &child_ctx);
    }

    if pushed_scope.is_some() {
        scope.pop();
    }
}

fn record_call_site(
    node: Node<'_>,
    content: &str,
    code_map: &CodeMap,
    usage: &mut HashMap<String, UsageStats>,
    scope: &[String],
    ctx: &UsageContext,
) {
    let Some(function) = node.child_by_field_name("function") else {
        return;
    };

    // Resolve to a bare name: `foo(...)` or the method of `obj.method(...)`.
    let target = match function.kind() {
        "identifier" => node_text(function, content),
        "attribute" => {
            let object_is_name = function
                .child_by_field_name("object")
                .is_some_and(|o| o.kind() == "identifier");
            if !object_is_name {
                return;
            }
            let Some(attr) = function.child_by_field_name("attribute") else {
                return;
            };
            node_text(attr, content)
        }
        _ => return,
    };

    if !code_map.is_callable(&target) {
        return;
    }

    let stats = usage.entry(target).or_default();
    stats.call_count += 1;

    if let Some(caller) = scope.last() {
        stats.callers.push(caller.clone());
    }

    stats.arg_patterns.push(arg_pattern(node, content));

    if ctx.in_loop {
        stats.context_keywords.insert("in_loop".to_string());
    }
    if ctx.in_try {
        stats.context_keywords.insert("in_error_handler".to_string());
    }
    if ctx.in_except {
        stats
            .context_keywords
            .insert("in_exception_handler".to_string());
    }
    if ctx.in_with {
        stats
            .context_keywords
            .insert("in_context_manager".to_string());
    }
    if let Some(target_var) = &ctx.assign_target {
        stats
            .context_keywords
            .insert(format!("assigned_to_{target_var}"));
    }
    for name in &ctx.if_condition_names {
        stats.context_keywords.insert(name.clone());
    }
}

fn arg_pattern(call: Node<'_>, content: &str) -> ArgPattern {
    let mut positional = 0usize;
    let mut keyword_args = Vec::new();

    if let Some(arguments) = call.child_by_field_name("arguments") {
        let mut cursor = arguments.walk();
        for arg in arguments.named_children(&mut cursor) {
            if arg.kind() == "keyword_argument" {
                if let Some(name) = statement_field(arg, "name", content) {
                    keyword_args.push(name);
                }
            } else if arg.kind() != "comment" {
                positional += 1;
            }
        }
    }

    let pattern = match (positional, keyword_args.len()) {
        (0, 0) => CallPattern::NoArgs,
        (_, 0) => CallPattern::PositionalOnly,
        (0, _) => CallPattern::KeywordOnly,
        _ => CallPattern::Mixed,
    };

    ArgPattern {
        positional_count: positional,
        keyword_count: keyword_args.len(),
        keyword_args,
        pattern,
    }
}

/// Summarizes the dominant calling conventions: the majority call pattern
/// (>50% of sites) and keyword arguments used at >30% of sites.
fn summarize_usage(patterns: &[ArgPattern]) -> Vec<String> {
    if patterns.is_empty() {
        return Vec::new();
    }

    let mut summaries = Vec::new();
    let total = patterns.len();

    let mut by_pattern: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut shapes: HashMap<&'static str, CallPattern> = HashMap::new();
    for p in patterns {
        let key = match p.pattern {
            CallPattern::NoArgs => "no_args",
            CallPattern::PositionalOnly => "positional_only",
            CallPattern::KeywordOnly => "keyword_only",
            CallPattern::Mixed => "mixed",
        };
        *by_pattern.entry(key).or_default() += 1;
        shapes.insert(key, p.pattern);
    }
    if let Some((key, count)) = by_pattern.iter().max_by_key(|(_, c)| **c)
        && *count * 2 > total
        && let Some(shape) = shapes.get(key)
    {
        summaries.push(format!("typically called with {}", shape.describe()));
    }

    let mut keyword_counts: BTreeMap<String, usize> = BTreeMap::new();
    for p in patterns {
        for kw in &p.keyword_args {
            *keyword_counts.entry(kw.clone()).or_default() += 1;
        }
    }
    let common_keywords: Vec<String> = keyword_counts
        .into_iter()
        .filter(|(_, count)| count * 10 > total * 3)
        .map(|(kw, _)| kw)
        .collect();
    if !common_keywords.is_empty() {
        summaries.push(format!(
            "commonly used with keywords: {}",
            common_keywords.join(", ")
        ));
    }

    summaries
}

// ---------------------------------------------------------------------------
// Key operations
// ---------------------------------------------------------------------------

fn key_operations(node: Node<'_>, content: &str) -> BTreeSet<String> {
    let mut operations = BTreeSet::new();
    let Some(body) = node.child_by_field_name("body") else {
        return operations;
    };

    visit(body, &mut |child| match child.kind() {
        "call" => {
            if let Some(function) = child.child_by_field_name("function") {
                match function.kind() {
                    "identifier" => {
                        operations
                            .insert(format!("calls function {}", node_text(function, content)));
                    }
                    "attribute" => {
                        if let Some(object) = function.child_by_field_name("object")
                            && object.kind() == "identifier"
                            && let Some(attr) = function.child_by_field_name("attribute")
                        {
                            operations.insert(format!(
                                "uses {}.{}",
                                node_text(object, content),
                                node_text(attr, content)
                            ));
                        }
                    }
                    _ => {}
                }
            }
        }
        "return_statement" => {
            if child.named_child_count() > 0 {
                operations.insert("returns a value".to_string());
            }
        }
        "assignment" => {
            if let Some(left) = child.child_by_field_name("left")
                && left.kind() == "identifier"
            {
                operations.insert(format!("assigns to variable {}", node_text(left, content)));
            }
        }
        "if_statement" => {
            operations.insert("uses conditional logic".to_string());
        }
        "for_statement" => {
            operations.insert("uses loop".to_string());
        }
        "while_statement" => {
            operations.insert("uses while loop".to_string());
        }
        "try_statement" => {
            operations.insert("uses exception handling".to_string());
        }
        _ => {}
    });

    operations
}

// ---------------------------------------------------------------------------
// Pattern detection
// ---------------------------------------------------------------------------

const CRUD_PATTERNS: &[(&str, &[&str])] = &[
    ("create", &["create", "add", "insert", "new"]),
    ("read", &["read", "get", "fetch", "retrieve", "find", "search"]),
    ("update", &["update", "modify", "change", "edit", "set"]),
    ("delete", &["delete", "remove", "drop", "clear"]),
];

const API_DECORATORS: &[&str] = &["route", "get", "post", "put", "delete", "patch", "api"];
const HTTP_VERBS: &[&str] = &["get", "post", "put", "delete", "patch"];

fn function_patterns(node: Node<'_>, name: &str, decorators: &[String]) -> BTreeSet<String> {
    let mut patterns = BTreeSet::new();

    if name.starts_with("get_") {
        patterns.insert("accessor".to_string());
    } else if name.starts_with("set_") {
        patterns.insert("mutator".to_string());
    }

    for decorator in decorators {
        let bare = decorator_head(decorator);
        if bare == "property" {
            patterns.insert("property getter".to_string());
        }
        if let Some(attr) = decorator_attr(decorator)
            && (attr == "setter" || attr == "deleter")
        {
            patterns.insert(format!("property {attr}"));
        }
    }

    if (name.starts_with("create_") || name.starts_with("build_") || name.starts_with("make_"))
        && returns_call(node)
    {
        patterns.insert("factory method".to_string());
    }

    if name.starts_with("validate_")
        || name.starts_with("check_")
        || name.starts_with("is_valid_")
        || name.starts_with("is_")
    {
        patterns.insert("validation".to_string());
    }

    if name.contains("callback") || name.contains("handler") || name.contains("on_") {
        patterns.insert("callback/event handler".to_string());
    }

    if name == "__iter__" || name == "__next__" {
        patterns.insert("iterator".to_string());
    }
    if name == "__enter__" || name == "__exit__" {
        patterns.insert("context manager".to_string());
    }
    if name == "__init__" {
        patterns.insert("constructor".to_string());
    }

    for (operation, keywords) in CRUD_PATTERNS {
        if keywords
            .iter()
            .any(|kw| name == *kw || name.starts_with(&format!("{kw}_")))
        {
            patterns.insert(format!("CRUD {operation} operation"));
        }
    }

    patterns.extend(api_patterns(name, decorators));

    if ["transform", "convert", "format", "parse"]
        .iter()
        .any(|kw| name.contains(kw))
    {
        patterns.insert("data transformation".to_string());
    }

    if has_try_block(node) {
        patterns.insert("error handling".to_string());
    }

    patterns
}

fn api_patterns(name: &str, decorators: &[String]) -> BTreeSet<String> {
    let mut patterns = BTreeSet::new();

    if ["endpoint", "api", "route", "handler", "controller"]
        .iter()
        .any(|kw| name.contains(kw))
    {
        patterns.insert("API endpoint".to_string());
    }

    for decorator in decorators {
        let head = decorator_head(decorator);
        let attr = decorator_attr(decorator);

        // Plain decorator name: @route, @get(...), ...
        if attr.is_none() && API_DECORATORS.contains(&head.to_lowercase().as_str()) {
            patterns.insert(format!("API endpoint ({})", head.to_uppercase()));
        }

        if let Some(attr) = &attr {
            let attr_lower = attr.to_lowercase();
            if API_DECORATORS.contains(&attr_lower.as_str()) {
                patterns.insert(format!("API endpoint ({})", attr.to_uppercase()));
            }
            // @app.route / @app.<verb> is the Flask form; @router.<verb> the
            // FastAPI form.
            if head == "app" && (attr_lower == "route" || HTTP_VERBS.contains(&attr_lower.as_str()))
            {
                patterns.insert(format!("Flask {attr} endpoint"));
            } else if head == "router" && HTTP_VERBS.contains(&attr_lower.as_str()) {
                patterns.insert(format!("FastAPI {attr} endpoint"));
            }
        }

        // Django view decorators.
        if attr.is_none() {
            if head == "login_required" || head == "permission_required" {
                patterns.insert(format!("Django {head} view"));
            }
            if head == "api_view" || head == "require_http_methods" {
                patterns.insert("Django REST API view".to_string());
            }
        }
    }

    patterns
}

/// First dotted component of a decorator expression, call parentheses
/// stripped (`app.route("/")` yields `app`).
fn decorator_head(decorator: &str) -> &str {
    let no_call = decorator.split('(').next().unwrap_or(decorator);
    no_call.split('.').next().unwrap_or(no_call).trim()
}

/// Attribute component of a dotted decorator (`app.route("/")` yields
/// `route`), or `None` for plain names.
fn decorator_attr(decorator: &str) -> Option<String> {
    let no_call = decorator.split('(').next().unwrap_or(decorator);
    let mut parts = no_call.split('.');
    let _head = parts.next()?;
    parts.next_back().map(|s| s.trim().to_string())
}

fn returns_call(node: Node<'_>) -> bool {
    let Some(body) = node.child_by_field_name("body") else {
        return false;
    };
    let mut found = false;
    visit(body, &mut |child| {
        if child.kind() == "return_statement"
            && child
                .named_child(0)
                .is_some_and(|value| value.kind() == "call")
        {
            found = true;
        }
    });
    found
}

fn has_try_block(node: Node<'_>) -> bool {
    let Some(body) = node.child_by_field_name("body") else {
        return false;
    };
    let mut found = false;
    visit(body, &mut |child| {
        if child.kind() == "try_statement" {
            found = true;
        }
    });
    found
}

const CLASS_PATTERN_INDICATORS: &[(&str, &[&str])] = &[
    ("adapter", &["adapter"]),
    ("decorator", &["decorator"]),
    ("observer", &["observer", "listener", "subscriber"]),
    ("strategy", &["strategy"]),
    ("command", &["command", "action"]),
    ("proxy", &["proxy"]),
    ("builder", &["builder"]),
    ("composite", &["composite"]),
    ("iterator", &["iterator"]),
    ("prototype", &["prototype"]),
    ("state", &["state"]),
    ("template", &["template"]),
    ("visitor", &["visitor"]),
];

#[allow(clippy::too_many_lines)]
fn class_patterns(node: Node<'_>, content: &str) -> BTreeSet<String> {
    let mut patterns = BTreeSet::new();
    let Some(raw_name) = identifier_field(node, "name", content) else {
        return patterns;
    };
    let name = raw_name.to_lowercase();
    let bases = class_bases(node, content);

    let mut has_instance_vars = false;
    let mut has_non_dunder_methods = false;
    let mut constant_count = 0usize;

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for statement in body.children(&mut cursor) {
            let (member, _) = unwrap_decorated(statement, content);
            match member.kind() {
                "function_definition" => {
                    if let Some(m) = identifier_field(member, "name", content) {
                        if m == "__new__" {
                            patterns.insert("singleton".to_string());
                        }
                        if !m.starts_with("__") {
                            has_non_dunder_methods = true;
                        }
                    }
                }
                "expression_statement" => {
                    let assign = find_child(member, "assignment")
                        .or_else(|| find_child(member, "augmented_assignment"));
                    if let Some(assign) = assign
                        && let Some(target) = assign.child_by_field_name("left")
                        && target.kind() == "identifier"
                    {
                        has_instance_vars = true;
                        let target_name = node_text(target, content);
                        if target_name == "_instance" {
                            patterns.insert("singleton".to_string());
                        }
                        if !target_name.is_empty()
                            && target_name
                                .chars()
                                .all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit())
                        {
                            constant_count += 1;
                        }
                    }
                }
                _ => {}
            }
        }
    }

    if name.contains("factory") {
        patterns.insert("factory".to_string());
    }

    for (pattern, keywords) in CLASS_PATTERN_INDICATORS {
        if keywords.iter().any(|kw| name.contains(kw)) {
            patterns.insert((*pattern).to_string());
        }
    }

    let lower_bases: Vec<String> = bases.iter().map(|b| b.to_lowercase()).collect();
    if name.contains("exception")
        || name.contains("error")
        || lower_bases
            .iter()
            .any(|b| b.contains("error") || b.contains("exception"))
    {
        patterns.insert("exception".to_string());
    }

    if name.contains("abstract") || lower_bases.iter().any(|b| b.contains("abc")) {
        patterns.insert("abstract base class".to_string());
    }

    if name.contains("mixin") || name.contains("interface") {
        patterns.insert("mixin/interface".to_string());
    }

    if ["repository", "dao", "data"].iter().any(|kw| name.contains(kw)) {
        patterns.insert("data access object".to_string());
    }

    if name.contains("service") {
        patterns.insert("service".to_string());
    }
    if name.contains("controller") {
        patterns.insert("controller".to_string());
    }
    if name.contains("model") {
        patterns.insert("model".to_string());
    }

    if ["util", "utils", "helper", "helpers"]
        .iter()
        .any(|kw| name.contains(kw))
    {
        patterns.insert("utility".to_string());
    }

    if has_instance_vars && !has_non_dunder_methods {
        patterns.insert("data container".to_string());
    }

    if constant_count >= 3 {
        patterns.insert("enumeration".to_string());
    }

    patterns
}

// ---------------------------------------------------------------------------
// Readable names
// ---------------------------------------------------------------------------

const SPECIAL_METHODS: &[(&str, &str)] = &[
    ("__init__", "initialize object"),
    ("__str__", "convert to string"),
    ("__repr__", "get representation"),
    ("__eq__", "check equality"),
    ("__lt__", "compare less than"),
    ("__gt__", "compare greater than"),
    ("__le__", "compare less than or equal"),
    ("__ge__", "compare greater than or equal"),
    ("__add__", "add objects"),
    ("__sub__", "subtract objects"),
    ("__mul__", "multiply objects"),
    ("__call__", "make callable"),
    ("__enter__", "enter context"),
    ("__exit__", "exit context"),
    ("__len__", "get length"),
    ("__getitem__", "get item by key"),
    ("__setitem__", "set item by key"),
    ("__delitem__", "delete item by key"),
    ("__iter__", "iterate over object"),
    ("__next__", "get next item"),
];

const PREFIX_PHRASES: &[(&str, &str)] = &[
    ("get", "get"),
    ("set", "set"),
    ("is", "check if"),
    ("has", "check if has"),
    ("calc", "calculate"),
    ("calculate", "calculate"),
    ("compute", "compute"),
    ("find", "find"),
    ("search", "search for"),
    ("fetch", "fetch"),
    ("load", "load"),
    ("save", "save"),
    ("store", "store"),
    ("update", "update"),
    ("delete", "delete"),
    ("remove", "remove"),
    ("add", "add"),
    ("create", "create"),
    ("build", "build"),
    ("convert", "convert"),
    ("transform", "transform"),
    ("process", "process"),
    ("handle", "handle"),
    ("validate", "validate"),
    ("check", "check"),
    ("parse", "parse"),
    ("format", "format"),
    ("render", "render"),
    ("init", "initialize"),
    ("setup", "set up"),
    ("cleanup", "clean up"),
    ("open", "open"),
    ("close", "close"),
    ("read", "read"),
    ("write", "write"),
    ("send", "send"),
    ("receive", "receive"),
    ("extract", "extract"),
];

/// Converts an identifier to a human-readable phrase.
fn name_to_phrase(name: &str) -> String {
    if name.starts_with("__") && name.ends_with("__") {
        for (method, phrase) in SPECIAL_METHODS {
            if name == *method {
                return (*phrase).to_string();
            }
        }
        return format!("special method {name}");
    }

    let words: Vec<String> = if name.contains('_') {
        name.split('_')
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect()
    } else {
        split_camel_case(name)
    };

    if words.len() > 1 {
        for (prefix, phrase) in PREFIX_PHRASES {
            if words[0] == *prefix {
                return format!("{phrase} {}", words[1..].join(" "));
            }
        }
    }

    words.join(" ")
}

fn split_camel_case(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in name.chars() {
        if c.is_uppercase() && !current.is_empty() {
            words.push(current.to_lowercase());
            current = String::new();
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current.to_lowercase());
    }
    words
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

fn node_text(node: Node<'_>, content: &str) -> String {
    content
        .get(node.byte_range())
        .unwrap_or_default()
        .to_string()
}

fn find_child<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

fn identifier_field(node: Node<'_>, field: &str, content: &str) -> Option<String> {
    node.child_by_field_name(field)
        .filter(|n| n.kind() == "identifier")
        .map(|n| node_text(n, content))
}

fn statement_field(node: Node<'_>, field: &str, content: &str) -> Option<String> {
    node.child_by_field_name(field).map(|n| node_text(n, content))
}

/// Unwraps `decorated_definition`, returning the inner definition and the
/// decorator expressions (without the leading `@`).
fn unwrap_decorated<'a>(node: Node<'a>, content: &str) -> (Node<'a>, Vec<String>) {
    if node.kind() != "decorated_definition" {
        return (node, Vec::new());
    }

    let mut decorators = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            let text = node_text(child, content);
            decorators.push(text.trim_start_matches('@').trim().to_string());
        }
    }

    node.child_by_field_name("definition")
        .map_or((node, Vec::new()), |inner| (inner, decorators))
}

fn visit<'a, F: FnMut(Node<'a>)>(node: Node<'a>, f: &mut F) {
    f(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, f);
    }
}

fn walk_with_scope<'a, F>(node: Node<'a>, content: &str, stack: &mut Vec<String>, f: &mut F)
where
    F: FnMut(Node<'a>, &[String]),
{
    f(node, stack);

    let pushed = match node.kind() {
        "function_definition" => identifier_field(node, "name", content).map(|name| {
            // A def directly inside a class body is a method.
            let key = enclosing_method_key(stack, &name);
            stack.push(key);
        }),
        "class_definition" => identifier_field(node, "name", content).map(|name| {
            stack.push(format!("class:{name}"));
        }),
        _ => None,
    };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_with_scope(child, content, stack, f);
    }

    if pushed.is_some() {
        stack.pop();
    }
}

fn enclosing_method_key(stack: &[String], name: &str) -> String {
    stack.last().and_then(|top| top.strip_prefix("class:")).map_or_else(
        || format!("function:{name}"),
        |class_name| format!("method:{class_name}.{name}"),
    )
}

fn collect_identifiers(node: Node<'_>, content: &str, out: &mut Vec<String>) {
    visit(node, &mut |child| {
        if child.kind() == "identifier" {
            out.push(node_text(child, content));
        }
    });
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
        PythonExtractor::default()
            .extract(content, "test.py")
            .unwrap()
    }

    #[test]
    fn test_simple_function() {
        let chunks = extract(
            "def add(a: int, b: int = 0) -> int:\n    \"\"\"Sum.\"\"\"\n    return a + b\n",
        );
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.kind(), ChunkKind::Function);
        assert_eq!(chunk.name, "add");
        assert_eq!(chunk.lineno, 1);

        let info = chunk.callable().unwrap();
        assert_eq!(info.docstring, "Sum.");
        assert_eq!(info.params.len(), 2);
        assert_eq!(info.params[0].name, "a");
        assert_eq!(info.params[0].ty.as_deref(), Some("int"));
        assert_eq!(info.params[1].name, "b");
        assert_eq!(info.params[1].ty.as_deref(), Some("int"));
        assert_eq!(info.params[1].default.as_deref(), Some("0"));
        assert_eq!(info.return_type.as_deref(), Some("int"));
        assert_eq!(info.full_name, "add");
    }

    #[test]
    fn test_module_docstring_and_imports() {
        let chunks = extract(
            "\"\"\"Utility module.\"\"\"\nimport os\nfrom pathlib import Path as P\n\ndef f():\n    pass\n",
        );
        assert_eq!(chunks[0].kind(), ChunkKind::Module);
        let ChunkPayload::Module(info) = &chunks[0].payload else {
            unreachable!("expected module payload");
        };
        assert_eq!(info.docstring, "Utility module.");
        assert_eq!(info.imports.len(), 2);
        assert_eq!(info.imports[0].name, "os");
        assert_eq!(info.imports[1].module.as_deref(), Some("pathlib"));
        assert_eq!(info.imports[1].alias.as_deref(), Some("P"));
    }

    #[test]
    fn test_class_with_methods() {
        let code = r#"
class Stack:
    """LIFO container."""

    limit = 100

    def __init__(self):
        self.items = []

    def push(self, item):
        self.items.append(item)
"#;
        let chunks = extract(code);
        let class_chunk = chunks.iter().find(|c| c.kind() == ChunkKind::Class).unwrap();
        assert_eq!(class_chunk.name, "Stack");
        let info = class_chunk.class_info().unwrap();
        assert_eq!(info.docstring, "LIFO container.");
        assert_eq!(info.methods, vec!["__init__", "push"]);
        assert_eq!(info.class_attributes, vec!["limit"]);

        let methods: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind() == ChunkKind::Method)
            .collect();
        assert_eq!(methods.len(), 2);
        assert_eq!(
            methods[0].callable().unwrap().class_name.as_deref(),
            Some("Stack")
        );
        assert_eq!(methods[1].callable().unwrap().full_name, "Stack.push");
    }

    #[test]
    fn test_source_order_preserved() {
        let code = "def first():\n    pass\n\nclass Middle:\n    def inner(self):\n        pass\n\ndef last():\n    pass\n";
        let names: Vec<String> = extract(code).iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["first", "Middle", "inner", "last"]);
    }

    #[test]
    fn test_decorated_function() {
        let code = "@property\ndef value(self):\n    return self._value\n";
        let chunks = extract(code);
        assert_eq!(chunks[0].name, "value");
        assert!(
            chunks[0]
                .callable()
                .unwrap()
                .patterns
                .contains("property getter")
        );
    }

    #[test]
    fn test_crud_and_repository_patterns() {
        let code = r#"
class BaseRepository:
    pass

class UserRepository(BaseRepository):
    def create_user(self, name):
        pass

    def find_by_username(self, username):
        pass

    def delete_user(self, name):
        pass
"#;
        let chunks = extract(code);
        let repo = chunks.iter().find(|c| c.name == "UserRepository").unwrap();
        let info = repo.class_info().unwrap();
        assert!(info.patterns.contains("data access object"));
        assert!(info.relationships.iter().any(|r| {
            r.rel_type == RelationKind::InheritsFrom && r.target == "BaseRepository"
        }));

        let create = chunks.iter().find(|c| c.name == "create_user").unwrap();
        assert!(
            create
                .callable()
                .unwrap()
                .patterns
                .contains("CRUD create operation")
        );

        let find = chunks.iter().find(|c| c.name == "find_by_username").unwrap();
        assert!(
            find.callable()
                .unwrap()
                .patterns
                .contains("CRUD read operation")
        );

        let delete = chunks.iter().find(|c| c.name == "delete_user").unwrap();
        assert!(
            delete
                .callable()
                .unwrap()
                .patterns
                .contains("CRUD delete operation")
        );
    }

    #[test]
    fn test_framework_endpoint_patterns() {
        let code = r#"
@app.route("/users")
def list_users():
    pass

@router.get("/items")
def list_items():
    pass
"#;
        let chunks = extract(code);
        let flask = chunks.iter().find(|c| c.name == "list_users").unwrap();
        assert!(
            flask
                .callable()
                .unwrap()
                .patterns
                .contains("Flask route endpoint")
        );

        let fastapi = chunks.iter().find(|c| c.name == "list_items").unwrap();
        assert!(
            fastapi
                .callable()
                .unwrap()
                .patterns
                .contains("FastAPI get endpoint")
        );
    }

    #[test]
    fn test_singleton_and_enumeration_patterns() {
        let code = r#"
class Registry:
    _instance = None

    def __new__(cls):
        return cls._instance

class Color:
    RED = 1
    GREEN = 2
    BLUE = 3
"#;
        let chunks = extract(code);
        let registry = chunks.iter().find(|c| c.name == "Registry").unwrap();
        assert!(registry.class_info().unwrap().patterns.contains("singleton"));

        let color = chunks.iter().find(|c| c.name == "Color").unwrap();
        assert!(color.class_info().unwrap().patterns.contains("enumeration"));
    }

    #[test]
    fn test_relationships_calls() {
        let code = r#"
def helper():
    pass

def main():
    helper()
"#;
        let chunks = extract(code);
        let main = chunks.iter().find(|c| c.name == "main").unwrap();
        let rels = &main.callable().unwrap().relationships;
        assert!(
            rels.iter()
                .any(|r| r.rel_type == RelationKind::Calls && r.target == "helper")
        );
    }

    #[test]
    fn test_usage_analysis() {
        let code = r#"
def target(a, b=None):
    pass

def caller_one():
    target(1, b=2)

def caller_two():
    for i in range(3):
        target(i, b=i)
"#;
        let chunks = extract(code);
        let target = chunks.iter().find(|c| c.name == "target").unwrap();
        let usage = target.callable().unwrap().usage.as_ref().unwrap();
        assert_eq!(usage.call_count, 2);
        assert!(usage.callers.contains(&"caller_one".to_string()));
        assert!(usage.callers.contains(&"caller_two".to_string()));
        assert!(usage.context_keywords.contains("in_loop"));
        assert_eq!(usage.arg_patterns.len(), 2);
        assert_eq!(usage.arg_patterns[0].pattern, CallPattern::Mixed);
        assert!(
            usage
                .common_usage
                .iter()
                .any(|s| s.contains("mixed positional and keyword"))
        );
        assert!(usage.common_usage.iter().any(|s| s.contains("b")));
    }

    #[test]
    fn test_usage_context_keywords() {
        let code = r#"
def target():
    pass

def caller():
    try:
        result = target()
    except ValueError:
        target()
"#;
        let chunks = extract(code);
        let target = chunks.iter().find(|c| c.name == "target").unwrap();
        let usage = target.callable().unwrap().usage.as_ref().unwrap();
        assert!(usage.context_keywords.contains("in_error_handler"));
        assert!(usage.context_keywords.contains("in_exception_handler"));
        assert!(usage.context_keywords.contains("assigned_to_result"));
    }

    #[test]
    fn test_key_operations() {
        let code = r#"
def work(items):
    total = 0
    for item in items:
        if item:
            total = compute(item)
    return total
"#;
        let chunks = extract(code);
        let ops = &chunks[0].callable().unwrap().key_operations;
        assert!(ops.contains("uses loop"));
        assert!(ops.contains("uses conditional logic"));
        assert!(ops.contains("calls function compute"));
        assert!(ops.contains("returns a value"));
        assert!(ops.contains("assigns to variable total"));
    }

    #[test]
    fn test_function_context() {
        let code = r#"
import os

LIMIT = 10

def alpha():
    pass

def beta():
    pass
"#;
        let chunks = extract(code);
        let alpha = chunks.iter().find(|c| c.name == "alpha").unwrap();
        let context = alpha.callable().unwrap().context.as_ref().unwrap();
        assert_eq!(context.imports, vec!["import os"]);
        assert_eq!(context.module_variables, vec!["LIMIT"]);
        assert!(context.neighboring_functions.contains(&"beta".to_string()));
        assert_eq!(context.module, "test.py");
    }

    #[test]
    fn test_method_context_instance_attributes() {
        let code = r#"
class Config:
    def __init__(self):
        self.path = None
        self.verbose = False

    def load(self):
        pass
"#;
        let chunks = extract(code);
        let load = chunks.iter().find(|c| c.name == "load").unwrap();
        let context = load.callable().unwrap().context.as_ref().unwrap();
        assert!(context.sibling_methods.contains(&"__init__".to_string()));
        assert!(context.instance_attributes.contains(&"path".to_string()));
        assert!(context.instance_attributes.contains(&"verbose".to_string()));
    }

    #[test]
    fn test_class_context_subclasses() {
        let code = r#"
class Base:
    pass

class Child(Base):
    pass
"#;
        let chunks = extract(code);
        let base = chunks.iter().find(|c| c.name == "Base").unwrap();
        let context = base.class_info().unwrap().context.as_ref().unwrap();
        assert!(context.subclasses.contains(&"Child".to_string()));
    }

    #[test]
    fn test_regex_salvage_on_syntax_error() {
        let code = "def broken(:\n    pass\n\ndef working(a):\n    \"\"\"Works.\"\"\"\n    return a\n";
        let chunks = extract(code);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.partial));
        assert!(chunks.iter().any(|c| c.name == "working"));
    }

    #[test]
    fn test_salvage_methods_inside_class() {
        let code = "class Broken(:\n    pass\n\nclass Ok:\n    def method(self):\n        pass\n";
        let chunks = extract(code);
        let method = chunks.iter().find(|c| c.kind() == ChunkKind::Method);
        assert!(method.is_some());
        assert_eq!(
            method.unwrap().callable().unwrap().class_name.as_deref(),
            Some("Ok")
        );
    }

    #[test]
    fn test_definition_scanner() {
        let text = "import os\n\ndef first():\n    a = 1\n    return a\n\ndef second():\n    pass\n";
        let lines = text.split('\n').map(std::borrow::Cow::from);
        let blocks: Vec<(String, usize)> = DefinitionScanner::new(lines).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].1, 3);
        assert!(blocks[0].0.contains("def first"));
        assert_eq!(blocks[1].1, 7);
        assert!(blocks[1].0.contains("def second"));
    }

    #[test]
    fn test_large_file_extraction() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::with_suffix(".py").unwrap();
        writeln!(file, "\"\"\"Big module.\"\"\"").unwrap();
        for i in 0..50 {
            writeln!(file, "def func_{i}(x):\n    \"\"\"Doc {i}.\"\"\"\n    return x\n").unwrap();
        }
        file.flush().unwrap();

        let extractor = PythonExtractor::new(64);
        let chunks = extractor.extract_from_file(file.path()).unwrap();
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Module));
        let functions: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind() == ChunkKind::Function)
            .collect();
        assert_eq!(functions.len(), 50);
        // Line numbers are absolute, not block-relative.
        let f10 = functions.iter().find(|c| c.name == "func_10").unwrap();
        assert!(f10.lineno > 10);
    }

    #[test]
    fn test_name_to_phrase() {
        assert_eq!(name_to_phrase("__init__"), "initialize object");
        assert_eq!(name_to_phrase("__missing__"), "special method __missing__");
        assert_eq!(name_to_phrase("get_user_name"), "get user name");
        assert_eq!(name_to_phrase("is_valid"), "check if valid");
        assert_eq!(name_to_phrase("calcTotal"), "calculate total");
        assert_eq!(name_to_phrase("plain"), "plain");
    }

    #[test]
    fn test_async_function_extracted() {
        let chunks = extract("async def fetch(url: str) -> bytes:\n    return b\"\"\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name, "fetch");
        assert_eq!(
            chunks[0].callable().unwrap().return_type.as_deref(),
            Some("bytes")
        );
    }

    #[test]
    fn test_splat_params() {
        let chunks = extract("def f(a, *args, **kwargs):\n    pass\n");
        let params = &chunks[0].callable().unwrap().params;
        assert_eq!(params.len(), 3);
        assert_eq!(params[1].name, "*args");
        assert_eq!(params[2].name, "**kwargs");
    }
}
