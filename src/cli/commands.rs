//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Commands return the
//! output string; the binary decides where it goes and maps errors to exit
//! codes.

use crate::cli::output::{
    format_build_summary, format_file_types, format_file_types_json, format_search_results,
    format_search_results_json,
};
use crate::cli::parser::{Cli, Commands};
use crate::config::IndexConfig;
use crate::core::{ChunkKind, ContentType};
use crate::embedding::create_embedder;
use crate::error::{CommandError, Result};
use crate::index::{IndexStatus, SearchIndex};
use crate::ingest::{FileWalker, IngestPipeline};
use crate::search::SearchOptions;
use std::path::PathBuf;
use tracing::info;

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute; the error carries the
/// process exit code.
pub fn execute(cli: &Cli) -> Result<String> {
    let data_dir = cli.get_data_dir();

    match &cli.command {
        Commands::Build {
            paths,
            file_types,
            exclude_types,
            embedder_id,
            gpu,
        } => cmd_build(
            &data_dir,
            paths,
            file_types,
            exclude_types,
            embedder_id.as_deref(),
            *gpu,
        ),
        Commands::Search {
            query,
            top_k,
            filter,
            min_score,
            type_filter,
            param_type,
            param_name,
            return_type,
            json,
        } => {
            let options = build_search_options(
                *top_k,
                filter.as_deref(),
                *min_score,
                type_filter.as_deref(),
                param_type.as_deref(),
                param_name.as_deref(),
                return_type.as_deref(),
            )?;
            cmd_search(&data_dir, query, &options, *json)
        }
        Commands::ListFileTypes { json } => cmd_list_file_types(*json),
    }
}

fn cmd_build(
    data_dir: &std::path::Path,
    paths: &[PathBuf],
    file_types: &str,
    exclude_types: &str,
    embedder_id: Option<&str>,
    gpu: bool,
) -> Result<String> {
    let mut config = IndexConfig::new().data_dir(data_dir).use_gpu(gpu);
    if let Some(id) = embedder_id {
        config = config.embedder_identifier(id);
    }

    let walker = FileWalker::from_config(&config)?;
    let files = walker.walk(paths);
    info!(files = files.len(), "found files to process");

    let pipeline = IngestPipeline::new(&config)
        .with_type_filters(parse_type_list(file_types), parse_type_list(exclude_types));
    let chunks = pipeline.process_files(&files);
    let chunk_count = chunks.len();

    let embedder = create_embedder()?;
    let mut index = SearchIndex::new(embedder, config);
    index.add_chunks(chunks)?;
    index.save()?;

    let status = IndexStatus::inspect(data_dir);
    Ok(format_build_summary(files.len(), chunk_count, &status))
}

fn cmd_search(
    data_dir: &std::path::Path,
    query: &str,
    options: &SearchOptions,
    json: bool,
) -> Result<String> {
    let config = IndexConfig::new().data_dir(data_dir);
    let embedder = create_embedder()?;
    let index = SearchIndex::load(embedder, config)?;

    let results = index.search(query, options)?;

    if json {
        format_search_results_json(&results)
    } else {
        Ok(format_search_results(&results, query))
    }
}

fn cmd_list_file_types(json: bool) -> Result<String> {
    let pipeline = IngestPipeline::new(&IndexConfig::default());
    let code = pipeline.registry().extensions_for(ContentType::Code);
    let documentation = pipeline
        .registry()
        .extensions_for(ContentType::Documentation);

    if json {
        format_file_types_json(&code, &documentation)
    } else {
        Ok(format_file_types(&code, &documentation))
    }
}

#[allow(clippy::too_many_arguments)]
fn build_search_options(
    top_k: usize,
    filter: Option<&str>,
    min_score: f32,
    type_filter: Option<&str>,
    param_type: Option<&str>,
    param_name: Option<&str>,
    return_type: Option<&str>,
) -> Result<SearchOptions> {
    let mut options = SearchOptions::new().top_k(top_k).min_score(min_score);

    if let Some(filter) = filter {
        let content = ContentType::parse(filter).ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "--filter must be 'code' or 'documentation', got '{filter}'"
            ))
        })?;
        options = options.content_filter(content);
    }

    if let Some(kind) = type_filter {
        let kind = ChunkKind::parse(kind).ok_or_else(|| {
            CommandError::InvalidArgument(format!("unknown chunk type '{kind}'"))
        })?;
        options = options.type_filter(kind);
    }

    if let Some(value) = param_type {
        options = options.param_type(value);
    }
    if let Some(value) = param_name {
        options = options.param_name(value);
    }
    if let Some(value) = return_type {
        options = options.return_type(value);
    }

    Ok(options)
}

/// Parses a comma-separated type list; `all` and empties collapse away.
fn parse_type_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && t != "all")
        .collect()
}
