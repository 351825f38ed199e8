//! Integration tests for code-cognitio.

#![allow(clippy::expect_used)]

use code_cognitio::config::IndexConfig;
use code_cognitio::core::{ChunkKind, ChunkPayload, ContentType};
use code_cognitio::embedding::{DEFAULT_DIMENSIONS, Embedder, FallbackEmbedder};
use code_cognitio::index::SearchIndex;
use code_cognitio::ingest::{FileWalker, IngestPipeline};
use code_cognitio::search::SearchOptions;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Writes a small mixed-language corpus into a directory.
fn write_corpus(root: &Path) {
    fs::create_dir_all(root.join("src")).expect("create src dir");

    fs::write(
        root.join("src/repository.py"),
        r#""""User storage layer."""


class BaseRepository:
    """Common persistence plumbing."""

    def connect(self):
        pass


class UserRepository(BaseRepository):
    """Stores and retrieves users."""

    def create_user(self, name):
        """Create a new user record."""
        return name

    def find_by_username(self, username):
        """Look up a user by username."""
        return username

    def delete_user(self, name):
        """Remove a user record."""
        pass
"#,
    )
    .expect("write repository.py");

    fs::write(
        root.join("src/math_utils.py"),
        "def add(a: int, b: int = 0) -> int:\n    \"\"\"Sum.\"\"\"\n    return a + b\n\n\ndef process_items(items: list, limit: int) -> list:\n    \"\"\"Process a list of items.\"\"\"\n    return items[:limit]\n",
    )
    .expect("write math_utils.py");

    fs::write(
        root.join("README.md"),
        "# Demo Project\n\nA small demo.\n\n## Installation\n\nRun pip install package to get started.\n\n## Usage\n\nCall the search function with a query.\n",
    )
    .expect("write README.md");

    fs::write(
        root.join("Dockerfile"),
        "FROM python:3.9-slim\nEXPOSE 8080\nCMD [\"python\", \"app.py\"]\n",
    )
    .expect("write Dockerfile");
}

/// Builds an in-memory index over the corpus with the deterministic
/// embedder.
fn build_index(root: &Path, data_dir: &Path) -> SearchIndex {
    let config = IndexConfig::new().data_dir(data_dir);
    let walker = FileWalker::from_config(&config).expect("walker");
    let files = walker.walk(&[root.to_path_buf()]);
    assert!(!files.is_empty());

    let pipeline = IngestPipeline::new(&config);
    let chunks = pipeline.process_files(&files);
    assert!(!chunks.is_empty());

    let mut index = SearchIndex::new(
        Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)),
        config,
    );
    index.add_chunks(chunks).expect("add_chunks");
    index
}

#[test]
fn test_python_function_extraction() {
    let tmp = TempDir::new().expect("tempdir");
    write_corpus(tmp.path());

    let pipeline = IngestPipeline::new(&IndexConfig::default());
    let chunks = pipeline
        .process_file(&tmp.path().join("src/math_utils.py"))
        .expect("process math_utils.py");

    let add = chunks
        .iter()
        .find(|c| c.name == "add")
        .expect("add chunk");
    assert_eq!(add.kind(), ChunkKind::Function);

    let info = add.callable().expect("callable payload");
    assert_eq!(info.params.len(), 2);
    assert_eq!(info.params[0].name, "a");
    assert_eq!(info.params[0].ty.as_deref(), Some("int"));
    assert_eq!(info.params[1].default.as_deref(), Some("0"));
    assert_eq!(info.return_type.as_deref(), Some("int"));
    assert_eq!(info.signature, "add(a: int, b: int) -> int");
    assert!(add.processed_text.contains("sum"));
}

#[test]
fn test_class_pattern_detection() {
    let tmp = TempDir::new().expect("tempdir");
    write_corpus(tmp.path());

    let pipeline = IngestPipeline::new(&IndexConfig::default());
    let chunks = pipeline
        .process_file(&tmp.path().join("src/repository.py"))
        .expect("process repository.py");

    let repo = chunks
        .iter()
        .find(|c| c.name == "UserRepository")
        .expect("UserRepository chunk");
    let class_info = repo.class_info().expect("class payload");
    assert!(class_info.patterns.contains("data access object"));
    assert!(
        class_info
            .relationships
            .iter()
            .any(|r| r.target == "BaseRepository")
    );

    let expectations = [
        ("create_user", "CRUD create operation"),
        ("find_by_username", "CRUD read operation"),
        ("delete_user", "CRUD delete operation"),
    ];
    for (name, pattern) in expectations {
        let method = chunks.iter().find(|c| c.name == name).expect(name);
        assert!(
            method.callable().expect("callable").patterns.contains(pattern),
            "{name} should carry '{pattern}'"
        );
    }

    // Every method names a class that exists as a class chunk in the file.
    for chunk in chunks.iter().filter(|c| c.kind() == ChunkKind::Method) {
        let class_name = chunk
            .callable()
            .and_then(|i| i.class_name.clone())
            .expect("method class name");
        assert!(
            chunks
                .iter()
                .any(|c| c.kind() == ChunkKind::Class && c.name == class_name)
        );
    }
}

#[test]
fn test_markdown_section_indexing() {
    let tmp = TempDir::new().expect("tempdir");
    write_corpus(tmp.path());
    let data = TempDir::new().expect("data dir");
    let index = build_index(tmp.path(), data.path());

    let results = index
        .search(
            "install package",
            &SearchOptions::new()
                .top_k(3)
                .content_filter(ContentType::Documentation),
        )
        .expect("search");

    assert!(!results.is_empty());
    assert!(
        results.iter().any(|r| {
            r.chunk
                .section_info()
                .is_some_and(|s| s.title == "Installation")
        }),
        "Installation section should rank in the top 3"
    );

    let install = results
        .iter()
        .find(|r| {
            r.chunk
                .section_info()
                .is_some_and(|s| s.title == "Installation")
        })
        .expect("installation hit");
    assert_eq!(
        install.chunk.section_info().expect("section").section_type,
        Some(code_cognitio::core::SectionType::Installation)
    );
}

#[test]
fn test_filter_by_parameter_type() {
    let tmp = TempDir::new().expect("tempdir");
    write_corpus(tmp.path());
    let data = TempDir::new().expect("data dir");
    let index = build_index(tmp.path(), data.path());

    let results = index
        .search(
            "process",
            &SearchOptions::new().top_k(10).param_type("list"),
        )
        .expect("search");

    assert!(!results.is_empty());
    for result in &results {
        let info = result.chunk.callable().expect("only callables pass");
        assert!(
            info.params
                .iter()
                .any(|p| p.ty.as_ref().is_some_and(|t| t.to_lowercase().contains("list")))
        );
    }
}

#[test]
fn test_content_filter_disjointness() {
    let tmp = TempDir::new().expect("tempdir");
    write_corpus(tmp.path());
    let data = TempDir::new().expect("data dir");
    let index = build_index(tmp.path(), data.path());

    for query in ["user records", "install package"] {
        let code = index
            .search(
                query,
                &SearchOptions::new()
                    .top_k(20)
                    .min_score(-1.0)
                    .content_filter(ContentType::Code),
            )
            .expect("code search");
        assert!(
            code.iter()
                .all(|r| r.chunk.content_type() == ContentType::Code)
        );

        let docs = index
            .search(
                query,
                &SearchOptions::new()
                    .top_k(20)
                    .min_score(-1.0)
                    .content_filter(ContentType::Documentation),
            )
            .expect("doc search");
        assert!(
            docs.iter()
                .all(|r| r.chunk.content_type() == ContentType::Documentation)
        );

        let all = index
            .search(query, &SearchOptions::new().top_k(50).min_score(-1.0))
            .expect("unfiltered search");
        assert!(
            all.iter()
                .any(|r| r.chunk.content_type() == ContentType::Code)
        );
        assert!(
            all.iter()
                .any(|r| r.chunk.content_type() == ContentType::Documentation)
        );
    }
}

#[test]
fn test_dockerfile_extraction() {
    let tmp = TempDir::new().expect("tempdir");
    write_corpus(tmp.path());

    let pipeline = IngestPipeline::new(&IndexConfig::default());
    let chunks = pipeline
        .process_file(&tmp.path().join("Dockerfile"))
        .expect("process Dockerfile");

    // Whole-file chunk plus one per instruction line.
    assert_eq!(chunks.len(), 4);
    let ChunkPayload::FileDirective(info) = &chunks[0].payload else {
        panic!("expected directive payload");
    };
    assert_eq!(info.base_images.len(), 1);
    assert_eq!(info.base_images[0].image, "python");
    assert_eq!(info.base_images[0].tag, "3.9-slim");
    assert_eq!(info.exposed_ports, vec!["8080"]);
    assert!(chunks.iter().skip(1).all(|c| c.kind() == ChunkKind::FileDirective));
}

#[test]
fn test_index_row_count_conservation() {
    let tmp = TempDir::new().expect("tempdir");
    write_corpus(tmp.path());
    let data = TempDir::new().expect("data dir");
    let index = build_index(tmp.path(), data.path());

    assert_eq!(
        index.total_chunks(),
        index.code_chunks() + index.doc_chunks()
    );

    index.save().expect("save");
    let loaded = SearchIndex::load(
        Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)),
        IndexConfig::new().data_dir(data.path()),
    )
    .expect("load");

    assert_eq!(loaded.total_chunks(), index.total_chunks());
    assert_eq!(loaded.code_chunks(), index.code_chunks());
    assert_eq!(loaded.doc_chunks(), index.doc_chunks());
}

#[test]
fn test_build_twice_is_byte_identical() {
    let tmp = TempDir::new().expect("tempdir");
    write_corpus(tmp.path());

    let persisted = |data: &Path| -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<_> = fs::read_dir(data)
            .expect("read data dir")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        files.sort();
        files
            .into_iter()
            .map(|p| {
                (
                    p.file_name().expect("name").to_string_lossy().to_string(),
                    fs::read(&p).expect("read"),
                )
            })
            .collect()
    };

    let data_a = TempDir::new().expect("data a");
    let data_b = TempDir::new().expect("data b");
    build_index(tmp.path(), data_a.path()).save().expect("save a");
    build_index(tmp.path(), data_b.path()).save().expect("save b");

    let a = persisted(data_a.path());
    let b = persisted(data_b.path());
    assert_eq!(a.len(), b.len());
    for ((name_a, bytes_a), (name_b, bytes_b)) in a.iter().zip(b.iter()) {
        assert_eq!(name_a, name_b);
        assert_eq!(bytes_a, bytes_b, "file {name_a} differs between builds");
    }
}

#[test]
fn test_embedding_rows_unit_norm() {
    let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
    for text in [
        "def add(a, b): return a + b",
        "Installation instructions",
        "x",
    ] {
        let embedding = embedder.embed(text).expect("embed");
        let norm: f32 = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((0.999..=1.001).contains(&norm), "norm {norm} for '{text}'");
    }
}

#[test]
fn test_search_results_sorted_and_bounded() {
    let tmp = TempDir::new().expect("tempdir");
    write_corpus(tmp.path());
    let data = TempDir::new().expect("data dir");
    let index = build_index(tmp.path(), data.path());

    let options = SearchOptions::new().top_k(4).min_score(0.05);
    let results = index.search("user", &options).expect("search");

    assert!(results.len() <= 4);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!(results.iter().all(|r| r.score >= 0.05));
}

mod cli {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn bin() -> Command {
        Command::cargo_bin("code-cognitio").expect("binary exists")
    }

    #[test]
    fn test_build_then_search() {
        let tmp = TempDir::new().expect("tempdir");
        write_corpus(tmp.path());
        let data = TempDir::new().expect("data dir");

        bin()
            .arg("build")
            .arg(tmp.path())
            .arg("--data-dir")
            .arg(data.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Index is ready."));

        bin()
            .arg("search")
            .arg("create user")
            .arg("--data-dir")
            .arg(data.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Search results for: create user"));
    }

    #[test]
    fn test_search_json_output() {
        let tmp = TempDir::new().expect("tempdir");
        write_corpus(tmp.path());
        let data = TempDir::new().expect("data dir");

        bin()
            .arg("build")
            .arg(tmp.path())
            .arg("--data-dir")
            .arg(data.path())
            .assert()
            .success();

        let output = bin()
            .arg("search")
            .arg("user")
            .arg("--json")
            .arg("--data-dir")
            .arg(data.path())
            .output()
            .expect("run search");
        assert!(output.status.success());
        let parsed: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("valid JSON");
        assert!(parsed.is_array());
    }

    #[test]
    fn test_search_without_index_exits_one() {
        let data = TempDir::new().expect("data dir");
        bin()
            .arg("search")
            .arg("anything")
            .arg("--data-dir")
            .arg(data.path())
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("no index found"));
    }

    #[test]
    fn test_invalid_filter_exits_three() {
        let data = TempDir::new().expect("data dir");
        bin()
            .arg("search")
            .arg("q")
            .arg("--filter")
            .arg("binary")
            .arg("--data-dir")
            .arg(data.path())
            .assert()
            .failure()
            .code(3);
    }

    #[test]
    fn test_list_file_types() {
        bin()
            .arg("list-file-types")
            .assert()
            .success()
            .stdout(predicate::str::contains("py"))
            .stdout(predicate::str::contains("md"));

        let output = bin()
            .arg("list-file-types")
            .arg("--json")
            .output()
            .expect("run list-file-types");
        let parsed: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("valid JSON");
        assert!(parsed["code"].as_array().is_some());
        assert!(parsed["documentation"].as_array().is_some());
    }

    #[test]
    fn test_data_dir_env_var() {
        let tmp = TempDir::new().expect("tempdir");
        write_corpus(tmp.path());
        let data = TempDir::new().expect("data dir");

        bin()
            .env("DATA_DIR", data.path())
            .arg("build")
            .arg(tmp.path())
            .assert()
            .success();

        assert!(data.path().join("index_metadata.json").is_file());
    }
}

mod properties {
    use super::*;
    use code_cognitio::core::{CallableInfo, Chunk, Param};
    use code_cognitio::search::passes_filters;
    use proptest::prelude::*;

    fn callable(params: Vec<(String, Option<String>)>, return_type: Option<String>) -> Chunk {
        Chunk::new(
            ChunkPayload::Function(CallableInfo {
                params: params
                    .into_iter()
                    .map(|(name, ty)| Param {
                        name,
                        ty,
                        default: None,
                    })
                    .collect(),
                return_type,
                full_name: "f".to_string(),
                ..CallableInfo::default()
            }),
            "f",
            "a.py",
            1,
            "python",
        )
    }

    proptest! {
        /// Raising the minimum score never adds results.
        #[test]
        fn min_score_monotonic(threshold in 0.0f32..1.0f32) {
            let embedder = FallbackEmbedder::new(16);
            let config = IndexConfig::default();
            let mut index = SearchIndex::new(Box::new(embedder), config);
            let mut chunk = callable(vec![], None);
            chunk.raw_text = "compute totals from rows".to_string();
            let mut other = callable(vec![], None);
            other.raw_text = "unrelated content entirely".to_string();
            index.add_chunks(vec![chunk, other]).expect("add");

            let base = index
                .search("compute totals", &SearchOptions::new().top_k(10))
                .expect("search");
            let raised = index
                .search(
                    "compute totals",
                    &SearchOptions::new().top_k(10).min_score(threshold),
                )
                .expect("search");

            prop_assert!(raised.len() <= base.len());
            for result in &raised {
                prop_assert!(result.score >= threshold);
            }
        }

        /// Post-filters are pure predicates: the same chunk always yields
        /// the same decision regardless of candidate order.
        #[test]
        fn post_filters_are_pure(
            param_name in "[a-z]{1,8}",
            ty in prop::option::of("[a-z]{1,8}"),
            needle in "[a-z]{1,4}",
        ) {
            let chunk = callable(vec![(param_name, ty)], None);
            let options = SearchOptions::new().param_type(&needle);
            let first = passes_filters(&chunk, &options);
            let second = passes_filters(&chunk, &options);
            prop_assert_eq!(first, second);
        }

        /// Embeddings are always unit-norm or zero.
        #[test]
        fn embeddings_unit_or_zero(text in ".{0,64}") {
            let embedder = FallbackEmbedder::new(32);
            let embedding = embedder.embed(&text).expect("embed");
            let norm: f32 = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
            prop_assert!(norm.abs() < 1e-5 || (0.999..=1.001).contains(&norm));
        }
    }
}
