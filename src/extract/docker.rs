//! Container-build file extraction.
//!
//! Line-oriented parsing over the standard instruction set. Emits one
//! whole-file chunk carrying the aggregates (base images, instructions,
//! environment variables, exposed ports, volumes, comments, a generated
//! description) plus one chunk per instruction line for granular search.

use crate::core::{BaseImage, Chunk, ChunkPayload, DirectiveInfo, DockerInstruction, EnvVar};
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

fn instruction_re() -> &'static Regex {
    static_regex!(
        DOCKER_INSTRUCTION,
        r"(?m)^\s*(?P<verb>FROM|RUN|CMD|LABEL|MAINTAINER|EXPOSE|ENV|ADD|COPY|ENTRYPOINT|VOLUME|USER|WORKDIR|ARG|ONBUILD|HEALTHCHECK|SHELL|STOPSIGNAL)\s+(?P<value>.*?)(?:\s*#.*)?$"
    )
}

fn from_re() -> &'static Regex {
    static_regex!(
        DOCKER_FROM,
        r"FROM\s+(?P<image>[^:\s]+)(?::(?P<tag>\S+))?(?:\s+[Aa][Ss]\s+(?P<alias>\w+))?"
    )
}

fn env_re() -> &'static Regex {
    static_regex!(DOCKER_ENV, r"ENV\s+(?P<key>\w+)(?:\s+|=)(?P<value>\S+)")
}

fn comment_re() -> &'static Regex {
    static_regex!(DOCKER_COMMENT, r"(?m)^\s*#\s*(?P<comment>.*)$")
}

/// Extractor for Dockerfiles and docker-compose files.
///
/// # Examples
///
/// ```
/// use code_cognitio::extract::{Extractor, DockerfileExtractor};
///
/// let chunks = DockerfileExtractor::new()
///     .extract("FROM python:3.9-slim\nEXPOSE 8080\n", "Dockerfile")
///     .unwrap();
/// assert_eq!(chunks.len(), 3);
/// ```
pub struct DockerfileExtractor;

impl DockerfileExtractor {
    /// Creates a new container-build extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for DockerfileExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for DockerfileExtractor {
    fn name(&self) -> &'static str {
        "dockerfile"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".dockerfile"]
    }

    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>> {
        let base_images = extract_base_images(content);
        let instructions = extract_instructions(content);
        let env_vars = extract_env_vars(content);
        let exposed_ports = extract_exposed_ports(content);
        let volumes = extract_volumes(content);
        let comments = extract_comments(content);
        let description =
            generate_description(&base_images, &instructions, &env_vars, &exposed_ports);

        let name = basename(file_path);
        let whole_file = Chunk::new(
            ChunkPayload::FileDirective(DirectiveInfo {
                base_images,
                instructions: instructions.clone(),
                env_vars,
                exposed_ports,
                volumes,
                comments,
                description: description.clone(),
            }),
            &name,
            file_path,
            1,
            "dockerfile",
        )
        .with_raw_text(content);

        let mut chunks = vec![whole_file];

        for instruction in instructions {
            let readable = format!(
                "{} {}",
                instruction.verb,
                truncate_value(&instruction.value, 30)
            );
            let chunk = Chunk::new(
                ChunkPayload::FileDirective(DirectiveInfo {
                    instructions: vec![instruction.clone()],
                    description: readable,
                    ..DirectiveInfo::default()
                }),
                &instruction.verb,
                file_path,
                instruction.lineno,
                "dockerfile",
            )
            .with_raw_text(&format!("{} {}", instruction.verb, instruction.value));
            chunks.push(chunk);
        }

        Ok(chunks)
    }
}

fn extract_base_images(content: &str) -> Vec<BaseImage> {
    from_re()
        .captures_iter(content)
        .filter_map(|c| {
            let image = c.name("image")?.as_str().to_string();
            Some(BaseImage {
                image,
                tag: c
                    .name("tag")
                    .map_or_else(|| "latest".to_string(), |m| m.as_str().to_string()),
                alias: c.name("alias").map(|m| m.as_str().to_string()),
            })
        })
        .collect()
}

fn extract_instructions(content: &str) -> Vec<DockerInstruction> {
    instruction_re()
        .captures_iter(content)
        .filter_map(|c| {
            let whole = c.get(0)?;
            Some(DockerInstruction {
                verb: c.name("verb")?.as_str().to_string(),
                value: c.name("value")?.as_str().trim().to_string(),
                lineno: content[..whole.start()].matches('\n').count() + 1,
            })
        })
        .collect()
}

fn extract_env_vars(content: &str) -> Vec<EnvVar> {
    env_re()
        .captures_iter(content)
        .filter_map(|c| {
            Some(EnvVar {
                key: c.name("key")?.as_str().to_string(),
                value: c.name("value")?.as_str().to_string(),
            })
        })
        .collect()
}

fn extract_exposed_ports(content: &str) -> Vec<String> {
    let expose_re = static_regex!(DOCKER_EXPOSE, r"(?m)^\s*EXPOSE\s+(.+?)(?:\s*#.*)?$");
    expose_re
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .flat_map(|m| {
            m.as_str()
                .split([',', ' ', '\t'])
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Extracts VOLUME values; both the JSON-array form and the
/// whitespace-separated form are handled.
fn extract_volumes(content: &str) -> Vec<String> {
    let volume_re = static_regex!(DOCKER_VOLUME, r"(?m)^\s*VOLUME\s+(.+?)(?:\s*#.*)?$");
    let mut volumes = Vec::new();

    for caps in volume_re.captures_iter(content) {
        let Some(value) = caps.get(1) else { continue };
        let value = value.as_str().trim();

        if value.starts_with('[') {
            if let Ok(serde_json::Value::Array(items)) =
                serde_json::from_str::<serde_json::Value>(value)
            {
                volumes.extend(
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(ToString::to_string)),
                );
                continue;
            }
            // Malformed JSON array falls back to naive splitting.
            volumes.extend(
                value
                    .trim_matches(['[', ']'])
                    .split([',', ' '])
                    .map(|v| v.trim_matches(['"', '\'']).to_string())
                    .filter(|v| !v.is_empty()),
            );
        } else {
            volumes.extend(
                value
                    .split([',', ' ', '\t'])
                    .filter(|v| !v.is_empty())
                    .map(ToString::to_string),
            );
        }
    }

    volumes
}

fn extract_comments(content: &str) -> Vec<String> {
    comment_re()
        .captures_iter(content)
        .filter_map(|c| c.name("comment"))
        .map(|m| m.as_str().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Generates a human-readable summary of the build file.
fn generate_description(
    base_images: &[BaseImage],
    instructions: &[DockerInstruction],
    env_vars: &[EnvVar],
    exposed_ports: &[String],
) -> String {
    let mut parts = Vec::new();

    if let Some(first) = base_images.first() {
        let mut based = format!("Based on {}:{}", first.image, first.tag);
        if base_images.len() > 1 {
            based.push_str(&format!(
                " and {} other base images",
                base_images.len() - 1
            ));
        }
        parts.push(based);
    }

    if !instructions.is_empty() {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for instruction in instructions {
            if let Some(entry) = counts.iter_mut().find(|(verb, _)| verb == &instruction.verb) {
                entry.1 += 1;
            } else {
                counts.push((instruction.verb.clone(), 1));
            }
        }
        let summary = counts
            .iter()
            .map(|(verb, count)| format!("{count} {verb}"))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("Contains {summary}"));
    }

    if !env_vars.is_empty() {
        parts.push(format!("Sets {} environment variables", env_vars.len()));
    }

    if !exposed_ports.is_empty() {
        let mut ports = format!(
            "Exposes {}",
            exposed_ports
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
        if exposed_ports.len() > 3 {
            ports.push_str(&format!(" and {} more ports", exposed_ports.len() - 3));
        }
        parts.push(ports);
    }

    parts.join(". ")
}

fn truncate_value(value: &str, limit: usize) -> String {
    if value.len() <= limit {
        return value.to_string();
    }
    let mut end = limit;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &value[..end])
}

fn basename(file_path: &str) -> String {
    Path::new(file_path)
        .file_name()
        .map_or_else(|| file_path.to_string(), |n| n.to_string_lossy().to_string())
}
