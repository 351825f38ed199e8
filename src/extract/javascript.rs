//! JavaScript / TypeScript extraction.
//!
//! Regex-based: no AST library is assumed for the JS family. Extracts import
//! sources, JSDoc blocks, named functions, arrow-function bindings, classes
//! with their methods, and React components for `.jsx`/`.tsx` files. A JSDoc
//! block attaches to the definition that starts within 10 characters of its
//! end. Destructured parameters are treated as a single opaque parameter.

use crate::core::{CallableInfo, Chunk, ChunkPayload, ClassInfo, ComponentInfo, Param};
use crate::error::Result;
use crate::extract::Extractor;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Maximum characters kept in a body digest.
const BODY_DIGEST_LIMIT: usize = 200;

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: OnceLock<Regex> = OnceLock::new();
        $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

fn function_re() -> &'static Regex {
    static_regex!(
        JS_FUNCTION,
        r"(?:export\s+)?(?:async\s+)?function\s+(?P<name>[a-zA-Z_$][a-zA-Z0-9_$]*)\s*(?P<params>\([^)]*\))\s*(?P<body>\{[\s\S]*?\})"
    )
}

fn arrow_re() -> &'static Regex {
    static_regex!(
        JS_ARROW,
        r"(?:export\s+)?(?:const|let|var)\s+(?P<name>[a-zA-Z_$][a-zA-Z0-9_$]*)\s*=\s*(?:async\s+)?(?P<params>\([^)]*\)|[a-zA-Z_$][a-zA-Z0-9_$]*)\s*=>\s*(?:(?P<body>\{[\s\S]*?\})|(?P<expr>[^;{\n]*))"
    )
}

fn class_re() -> &'static Regex {
    static_regex!(
        JS_CLASS,
        r"(?:export\s+)?class\s+(?P<name>[a-zA-Z_$][a-zA-Z0-9_$]*)(?:\s+extends\s+(?P<extends>[a-zA-Z_$][a-zA-Z0-9_$.]*))?\s*(?P<body>\{[\s\S]*?\n\})"
    )
}

fn method_re() -> &'static Regex {
    static_regex!(
        JS_METHOD,
        r"(?m)^\s*(?:async\s+)?(?P<name>[a-zA-Z_$][a-zA-Z0-9_$]*)\s*(?P<params>\([^)]*\))\s*\{"
    )
}

fn import_re() -> &'static Regex {
    static_regex!(
        JS_IMPORT,
        r#"import\s+(?:[a-zA-Z_$][a-zA-Z0-9_$]*\s*,?\s*)?(?:\{[^}]*\})?\s*from\s*['"](?P<source>[^'"]*)['"]"#
    )
}

fn component_re() -> &'static Regex {
    static_regex!(
        JSX_COMPONENT,
        r"(?:export\s+)?(?:function|const)\s+(?P<name>[A-Z][a-zA-Z0-9_$]*)\s*=?\s*(?P<params>\([^)]*\))\s*(?:=>\s*)?(?P<body>\{[\s\S]*?\}|\([\s\S]*?\))"
    )
}

fn jsdoc_re() -> &'static Regex {
    static_regex!(JSDOC, r"/\*\*(?P<content>[\s\S]*?)\*/")
}

fn jsx_element_re() -> &'static Regex {
    static_regex!(JSX_ELEMENT, r"<(?P<name>[A-Z][a-zA-Z0-9_$]*)[\s/>]")
}

/// Parsed JSDoc block.
#[derive(Debug, Clone, Default)]
struct JsDoc {
    description: String,
    params: Vec<serde_json::Value>,
    returns: Option<serde_json::Value>,
    throws: Vec<serde_json::Value>,
    examples: Vec<String>,
}

/// Extractor for JavaScript, TypeScript, JSX, and TSX files.
///
/// # Examples
///
/// ```
/// use code_cognitio::extract::{Extractor, JavaScriptExtractor};
///
/// let extractor = JavaScriptExtractor::new();
/// let chunks = extractor
///     .extract("function greet(name) { return name; }", "app.js")
///     .unwrap();
/// assert_eq!(chunks[0].name, "greet");
/// ```
pub struct JavaScriptExtractor;

impl JavaScriptExtractor {
    /// Creates a new JavaScript extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for JavaScriptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for JavaScriptExtractor {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".js", ".jsx", ".ts", ".tsx"]
    }

    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>> {
        let language = language_for(file_path);
        let jsdocs = extract_jsdocs(content);
        let imports = extract_import_sources(content);

        let mut chunks = Vec::new();
        extract_functions(content, file_path, language, &jsdocs, &mut chunks);
        extract_classes(content, file_path, language, &jsdocs, &mut chunks);

        if file_path.ends_with(".jsx") || file_path.ends_with(".tsx") {
            extract_components(content, file_path, language, &jsdocs, &mut chunks);
        }

        if !imports.is_empty() {
            let sources = serde_json::json!(imports);
            for chunk in &mut chunks {
                chunk.extra.insert("imports".to_string(), sources.clone());
            }
        }

        chunks.sort_by_key(|c| c.lineno);
        Ok(chunks)
    }
}

fn language_for(file_path: &str) -> &'static str {
    if file_path.ends_with(".ts") || file_path.ends_with(".tsx") {
        "typescript"
    } else {
        "javascript"
    }
}

fn extract_import_sources(content: &str) -> Vec<String> {
    import_re()
        .captures_iter(content)
        .filter_map(|c| c.name("source").map(|m| m.as_str().to_string()))
        .collect()
}

/// Parses every JSDoc block, keyed by its end offset.
fn extract_jsdocs(content: &str) -> Vec<(usize, JsDoc)> {
    jsdoc_re()
        .captures_iter(content)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let body = c.name("content")?.as_str();
            Some((whole.end(), parse_jsdoc(body)))
        })
        .collect()
}

fn parse_jsdoc(content: &str) -> JsDoc {
    let param_re = static_regex!(
        JSDOC_PARAM,
        r"@param\s+(?:\{(?P<type>[^}]*)\})?\s*(?P<name>\S+)?\s*(?P<desc>.*)?"
    );
    let returns_re = static_regex!(
        JSDOC_RETURNS,
        r"@returns?\s+(?:\{(?P<type>[^}]*)\})?\s*(?P<desc>.*)?"
    );
    let throws_re = static_regex!(
        JSDOC_THROWS,
        r"@throws?\s+(?:\{(?P<type>[^}]*)\})?\s*(?P<desc>.*)?"
    );

    let mut doc = JsDoc::default();
    let mut description_lines = Vec::new();
    let mut in_description = true;

    for raw_line in content.lines() {
        let line = raw_line.trim().trim_start_matches('*').trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('@') {
            in_description = false;
        }

        if in_description {
            description_lines.push(line.to_string());
        } else if line.starts_with("@param") {
            if let Some(c) = param_re.captures(line) {
                doc.params.push(serde_json::json!({
                    "name": c.name("name").map_or("", |m| m.as_str()),
                    "type": c.name("type").map_or("", |m| m.as_str()),
                    "description": c.name("desc").map_or("", |m| m.as_str()),
                }));
            }
        } else if line.starts_with("@returns") || line.starts_with("@return") {
            if let Some(c) = returns_re.captures(line) {
                doc.returns = Some(serde_json::json!({
                    "type": c.name("type").map_or("", |m| m.as_str()),
                    "description": c.name("desc").map_or("", |m| m.as_str()),
                }));
            }
        } else if line.starts_with("@throws") || line.starts_with("@throw") {
            if let Some(c) = throws_re.captures(line) {
                doc.throws.push(serde_json::json!({
                    "type": c.name("type").map_or("", |m| m.as_str()),
                    "description": c.name("desc").map_or("", |m| m.as_str()),
                }));
            }
        } else if line.starts_with("@example") {
            doc.examples
                .push(line.trim_start_matches("@example").trim().to_string());
        }
    }

    doc.description = description_lines.join(" ").trim().to_string();
    doc
}

/// The nearest JSDoc whose end lies within 10 characters before `start`.
fn jsdoc_before(jsdocs: &[(usize, JsDoc)], start: usize) -> Option<&JsDoc> {
    jsdocs
        .iter()
        .find(|(end, _)| *end <= start && start - *end < 10)
        .map(|(_, doc)| doc)
}

fn extract_functions(
    content: &str,
    file_path: &str,
    language: &str,
    jsdocs: &[(usize, JsDoc)],
    chunks: &mut Vec<Chunk>,
) {
    for caps in function_re().captures_iter(content) {
        let (Some(name), Some(params), Some(whole)) =
            (caps.name("name"), caps.name("params"), caps.get(0))
        else {
            continue;
        };
        let body = caps.name("body").map_or("", |m| m.as_str());
        chunks.push(callable_chunk(
            name.as_str(),
            params.as_str(),
            body,
            whole.start(),
            content,
            file_path,
            language,
            jsdoc_before(jsdocs, whole.start()),
            None,
        ));
    }

    for caps in arrow_re().captures_iter(content) {
        let (Some(name), Some(params), Some(whole)) =
            (caps.name("name"), caps.name("params"), caps.get(0))
        else {
            continue;
        };
        let body = caps
            .name("body")
            .or_else(|| caps.name("expr"))
            .map_or("", |m| m.as_str());
        let mut chunk = callable_chunk(
            name.as_str(),
            params.as_str(),
            body,
            whole.start(),
            content,
            file_path,
            language,
            jsdoc_before(jsdocs, whole.start()),
            None,
        );
        chunk
            .extra
            .insert("is_arrow_function".to_string(), serde_json::json!(true));
        chunks.push(chunk);
    }
}

fn extract_classes(
    content: &str,
    file_path: &str,
    language: &str,
    jsdocs: &[(usize, JsDoc)],
    chunks: &mut Vec<Chunk>,
) {
    for caps in class_re().captures_iter(content) {
        let (Some(name), Some(body), Some(whole)) =
            (caps.name("name"), caps.name("body"), caps.get(0))
        else {
            continue;
        };
        let class_name = name.as_str();
        let extends = caps.name("extends").map(|m| m.as_str().to_string());
        let class_lineno = line_of_offset(content, whole.start());

        let mut method_names = Vec::new();
        let mut method_chunks = Vec::new();
        for m in method_re().captures_iter(body.as_str()) {
            let (Some(method_name), Some(method_params)) = (m.name("name"), m.name("params"))
            else {
                continue;
            };
            // Keywords that introduce blocks look like methods to the regex.
            if ["if", "for", "while", "switch", "catch", "return", "function"]
                .contains(&method_name.as_str())
            {
                continue;
            }
            method_names.push(method_name.as_str().to_string());
            let method_lineno =
                class_lineno + body.as_str()[..method_name.start()].matches('\n').count();
            let mut chunk = callable_chunk(
                method_name.as_str(),
                method_params.as_str(),
                "",
                0,
                content,
                file_path,
                language,
                None,
                Some(class_name),
            );
            chunk.lineno = method_lineno;
            method_chunks.push(chunk);
        }

        let doc = jsdoc_before(jsdocs, whole.start());
        let mut class_chunk = Chunk::new(
            ChunkPayload::Class(ClassInfo {
                docstring: doc.map(|d| d.description.clone()).unwrap_or_default(),
                bases: extends.into_iter().collect(),
                methods: method_names,
                ..ClassInfo::default()
            }),
            class_name,
            file_path,
            class_lineno,
            language,
        );
        class_chunk.raw_text = truncate(whole.as_str(), BODY_DIGEST_LIMIT * 4);
        chunks.push(class_chunk);
        chunks.append(&mut method_chunks);
    }
}

fn extract_components(
    content: &str,
    file_path: &str,
    language: &str,
    jsdocs: &[(usize, JsDoc)],
    chunks: &mut Vec<Chunk>,
) {
    for caps in component_re().captures_iter(content) {
        let (Some(name), Some(params), Some(whole)) =
            (caps.name("name"), caps.name("params"), caps.get(0))
        else {
            continue;
        };
        let body = caps.name("body").map_or("", |m| m.as_str());

        // A component must actually render JSX.
        let jsx_elements: BTreeSet<String> = jsx_element_re()
            .captures_iter(body)
            .filter_map(|c| c.name("name").map(|m| m.as_str().to_string()))
            .collect();
        if jsx_elements.is_empty() && !body.contains("</") {
            continue;
        }

        let doc = jsdoc_before(jsdocs, whole.start());
        let mut chunk = Chunk::new(
            ChunkPayload::Component(ComponentInfo {
                props: parse_parameters(params.as_str()),
                jsx_elements,
                body_digest: truncate(body, BODY_DIGEST_LIMIT),
                docstring: doc.map(|d| d.description.clone()).unwrap_or_default(),
            }),
            name.as_str(),
            file_path,
            line_of_offset(content, whole.start()),
            language,
        );
        chunk.raw_text = truncate(whole.as_str(), BODY_DIGEST_LIMIT * 4);
        if let Some(doc) = doc
            && !doc.params.is_empty()
        {
            chunk
                .extra
                .insert("prop_docs".to_string(), serde_json::json!(doc.params));
        }
        chunks.push(chunk);
    }
}

#[allow(clippy::too_many_arguments)]
fn callable_chunk(
    name: &str,
    params: &str,
    body: &str,
    start: usize,
    content: &str,
    file_path: &str,
    language: &str,
    doc: Option<&JsDoc>,
    class_name: Option<&str>,
) -> Chunk {
    let full_name = class_name.map_or_else(|| name.to_string(), |c| format!("{c}.{name}"));
    let info = CallableInfo {
        docstring: doc.map(|d| d.description.clone()).unwrap_or_default(),
        params: parse_parameters(params),
        class_name: class_name.map(ToString::to_string),
        full_name,
        body_digest: truncate(body, BODY_DIGEST_LIMIT),
        readable_name: readable_name(name),
        ..CallableInfo::default()
    };

    let payload = if class_name.is_some() {
        ChunkPayload::Method(info)
    } else {
        ChunkPayload::Function(info)
    };

    let mut chunk = Chunk::new(
        payload,
        name,
        file_path,
        line_of_offset(content, start),
        language,
    );
    chunk.raw_text = truncate(body, BODY_DIGEST_LIMIT * 4);

    if let Some(doc) = doc {
        if !doc.params.is_empty() {
            chunk
                .extra
                .insert("param_docs".to_string(), serde_json::json!(doc.params));
        }
        if let Some(returns) = &doc.returns {
            chunk
                .extra
                .insert("return_docs".to_string(), returns.clone());
        }
        if !doc.throws.is_empty() {
            chunk
                .extra
                .insert("throws".to_string(), serde_json::json!(doc.throws));
        }
        if !doc.examples.is_empty() {
            chunk
                .extra
                .insert("examples".to_string(), serde_json::json!(doc.examples));
        }
    }

    chunk
}

/// Parses a parameter list, handling defaults, TypeScript annotations, rest
/// spreads, and destructuring patterns (kept as one opaque parameter).
fn parse_parameters(params_str: &str) -> Vec<Param> {
    let inner = params_str.trim().trim_start_matches('(').trim_end_matches(')');
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let piece_re = static_regex!(JS_PARAM_PIECE, r"(?:\{[^}]*\}|\[[^\]]*\]|[^,]+)(?:,|$)");

    let mut params = Vec::new();
    for piece in piece_re.find_iter(inner) {
        let text = piece.as_str().trim().trim_end_matches(',').trim();
        if text.is_empty() {
            continue;
        }

        let (mut name_part, default) = match text.split_once('=') {
            Some((n, d)) => (n.trim().to_string(), Some(d.trim().to_string())),
            None => (text.to_string(), None),
        };

        let mut ty = None;
        if !name_part.starts_with('{') && !name_part.starts_with('[') {
            if let Some((n, t)) = name_part.split_once(':') {
                ty = Some(t.trim().to_string());
                name_part = n.trim().to_string();
            }
        }

        let mut is_rest = false;
        if let Some(stripped) = name_part.strip_prefix("...") {
            name_part = stripped.to_string();
            is_rest = true;
        }

        let mut param = Param {
            name: name_part,
            ty,
            default,
        };
        if is_rest {
            param.name = format!("...{}", param.name);
        }
        params.push(param);
    }
    params
}

/// Converts camelCase / snake_case to a lowercase readable phrase.
fn readable_name(name: &str) -> String {
    let camel_re = static_regex!(CAMEL_SPLIT, r"([a-z0-9])([A-Z])");
    let spaced = camel_re.replace_all(name, "$1 $2");
    spaced.replace('_', " ").to_lowercase()
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn line_of_offset(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}
