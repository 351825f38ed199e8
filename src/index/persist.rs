//! Index persistence.
//!
//! The data directory holds exactly eight files: `index_metadata.json`,
//! three chunk arrays (`chunks.json`, `code_chunks.json`, `doc_chunks.json`)
//! and three binary matrices (`index.bin`, `code_index.bin`,
//! `doc_index.bin`). Writes go through `_`-prefixed temporary files renamed
//! into place, so a crashed build never leaves a half-written index behind.
//!
//! Binary matrix format, little-endian: `CCIX` magic, format version (u32),
//! dimension (u32), row count (u64), then row-major `f32` data.

use crate::core::Chunk;
use crate::error::{IndexError, Result};
use crate::index::VectorCollection;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Name of the metadata file.
pub const METADATA_FILE: &str = "index_metadata.json";

const MAGIC: &[u8; 4] = b"CCIX";
const FORMAT_VERSION: u32 = 1;

/// Chunk-array and matrix filenames per collection, in (all, code, doc)
/// order.
const CHUNK_FILES: [&str; 3] = ["chunks.json", "code_chunks.json", "doc_chunks.json"];
const INDEX_FILES: [&str; 3] = ["index.bin", "code_index.bin", "doc_index.bin"];

/// Metadata describing a persisted index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Identifier of the embedder the index was built with.
    pub embedder_identifier: String,
    /// Embedding dimension.
    pub dimension: usize,
    /// Rows in the `all` collection.
    pub total_chunks: usize,
    /// Rows in the code collection.
    pub code_chunks: usize,
    /// Rows in the documentation collection.
    pub doc_chunks: usize,
}

/// Returns true if a persisted index exists under `data_dir`.
#[must_use]
pub fn index_exists(data_dir: &Path) -> bool {
    data_dir.join(METADATA_FILE).is_file()
}

/// Reads the metadata file.
///
/// # Errors
///
/// Returns [`IndexError::Missing`] when no metadata file exists.
pub fn read_metadata(data_dir: &Path) -> Result<IndexMetadata> {
    let path = data_dir.join(METADATA_FILE);
    if !path.is_file() {
        return Err(IndexError::Missing {
            data_dir: data_dir.display().to_string(),
        }
        .into());
    }
    let content = fs::read_to_string(&path).map_err(|e| persist_err(&path, &e))?;
    let metadata = serde_json::from_str(&content).map_err(IndexError::from)?;
    Ok(metadata)
}

/// Persists the metadata and all three collections atomically.
///
/// # Errors
///
/// Returns an error if any file cannot be written.
pub fn save(
    data_dir: &Path,
    metadata: &IndexMetadata,
    collections: [&VectorCollection; 3],
) -> Result<()> {
    fs::create_dir_all(data_dir).map_err(|e| persist_err(data_dir, &e))?;

    let metadata_json =
        serde_json::to_string_pretty(metadata).map_err(IndexError::from)?;
    write_atomic(&data_dir.join(METADATA_FILE), metadata_json.as_bytes())?;

    for (collection, (chunk_file, index_file)) in collections
        .iter()
        .zip(CHUNK_FILES.iter().zip(INDEX_FILES.iter()))
    {
        let chunks_json =
            serde_json::to_string_pretty(collection.chunks()).map_err(IndexError::from)?;
        write_atomic(&data_dir.join(chunk_file), chunks_json.as_bytes())?;
        write_matrix(
            &data_dir.join(index_file),
            collection.dimension(),
            collection.len(),
            collection.vectors(),
        )?;
    }

    Ok(())
}

/// Loads the three persisted collections.
///
/// # Errors
///
/// Returns [`IndexError::Missing`] when there is no index, or a corruption
/// error when files disagree.
pub fn load(data_dir: &Path) -> Result<(IndexMetadata, [VectorCollection; 3])> {
    let metadata = read_metadata(data_dir)?;

    let mut collections = Vec::with_capacity(3);
    for (chunk_file, index_file) in CHUNK_FILES.iter().zip(INDEX_FILES.iter()) {
        let chunks = read_chunks(&data_dir.join(chunk_file))?;
        let (dimension, vectors) = read_matrix(&data_dir.join(index_file))?;
        collections.push(VectorCollection::from_parts(dimension, vectors, chunks)?);
    }

    let [all, code, doc]: [VectorCollection; 3] =
        collections
            .try_into()
            .map_err(|_| IndexError::Corrupt {
                path: data_dir.display().to_string(),
                reason: "expected three collections".to_string(),
            })?;
    Ok((metadata, [all, code, doc]))
}

/// Total on-disk size of the persisted index files, in bytes.
#[must_use]
pub fn index_size_bytes(data_dir: &Path) -> u64 {
    let mut total = 0;
    let mut names: Vec<&str> = vec![METADATA_FILE];
    names.extend(CHUNK_FILES);
    names.extend(INDEX_FILES);
    for name in names {
        if let Ok(meta) = fs::metadata(data_dir.join(name)) {
            total += meta.len();
        }
    }
    total
}

fn read_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let content = fs::read_to_string(path).map_err(|e| persist_err(path, &e))?;
    let chunks = serde_json::from_str(&content).map_err(IndexError::from)?;
    Ok(chunks)
}

/// Writes bytes to `_<name>.tmp` in the target directory, then renames into
/// place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).map_err(|e| persist_err(&tmp, &e))?;
    fs::rename(&tmp, path).map_err(|e| persist_err(path, &e))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("_{name}.tmp"))
}

fn write_matrix(path: &Path, dimension: usize, rows: usize, vectors: &[f32]) -> Result<()> {
    let tmp = tmp_path(path);
    {
        let file = File::create(&tmp).map_err(|e| persist_err(&tmp, &e))?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC).map_err(|e| persist_err(&tmp, &e))?;
        writer
            .write_all(&FORMAT_VERSION.to_le_bytes())
            .map_err(|e| persist_err(&tmp, &e))?;
        let dim_u32 =
            u32::try_from(dimension).map_err(|_| IndexError::Serialization(
                format!("dimension {dimension} exceeds u32"),
            ))?;
        writer
            .write_all(&dim_u32.to_le_bytes())
            .map_err(|e| persist_err(&tmp, &e))?;
        writer
            .write_all(&(rows as u64).to_le_bytes())
            .map_err(|e| persist_err(&tmp, &e))?;

        for value in vectors {
            writer
                .write_all(&value.to_le_bytes())
                .map_err(|e| persist_err(&tmp, &e))?;
        }
        writer.flush().map_err(|e| persist_err(&tmp, &e))?;
    }
    fs::rename(&tmp, path).map_err(|e| persist_err(path, &e))?;
    Ok(())
}

fn read_matrix(path: &Path) -> Result<(usize, Vec<f32>)> {
    let file = File::open(path).map_err(|e| persist_err(path, &e))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(|e| persist_err(path, &e))?;
    if &magic != MAGIC {
        return Err(corrupt(path, "bad magic"));
    }

    let mut word = [0u8; 4];
    reader.read_exact(&mut word).map_err(|e| persist_err(path, &e))?;
    let version = u32::from_le_bytes(word);
    if version != FORMAT_VERSION {
        return Err(corrupt(path, &format!("unsupported format version {version}")));
    }

    reader.read_exact(&mut word).map_err(|e| persist_err(path, &e))?;
    let dimension = u32::from_le_bytes(word) as usize;

    let mut long = [0u8; 8];
    reader.read_exact(&mut long).map_err(|e| persist_err(path, &e))?;
    let rows = usize::try_from(u64::from_le_bytes(long))
        .map_err(|_| corrupt(path, "row count exceeds usize"))?;

    let expected = rows
        .checked_mul(dimension)
        .ok_or_else(|| corrupt(path, "matrix size overflow"))?;

    let mut vectors = Vec::with_capacity(expected);
    let mut buf = [0u8; 4];
    for _ in 0..expected {
        reader.read_exact(&mut buf).map_err(|e| persist_err(path, &e))?;
        vectors.push(f32::from_le_bytes(buf));
    }

    Ok((dimension, vectors))
}

fn persist_err(path: &Path, e: &dyn std::fmt::Display) -> crate::Error {
    IndexError::Persist {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
    .into()
}

fn corrupt(path: &Path, reason: &str) -> crate::Error {
    IndexError::Corrupt {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChunkPayload;
    use tempfile::TempDir;

    fn collection(names: &[&str]) -> VectorCollection {
        let mut c = VectorCollection::new(4);
        for (i, name) in names.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let base = i as f32;
            let raw = [base + 1.0, 0.5, 0.25, 0.125];
            let mag: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
            let normalized: Vec<f32> = raw.iter().map(|x| x / mag).collect();
            c.add(
                &normalized,
                Chunk::new(ChunkPayload::GenericFile, name, "f.txt", 1, "unknown"),
            )
            .unwrap();
        }
        c
    }

    fn metadata(total: usize) -> IndexMetadata {
        IndexMetadata {
            embedder_identifier: "hash-fallback".to_string(),
            dimension: 4,
            total_chunks: total,
            code_chunks: 0,
            doc_chunks: 0,
        }
    }

    #[test]
    fn test_round_trip() {
        let tmp = TempDir::new().unwrap();
        let all = collection(&["a", "b", "c"]);
        let code = collection(&["a"]);
        let doc = VectorCollection::new(4);

        save(tmp.path(), &metadata(3), [&all, &code, &doc]).unwrap();
        let (loaded_meta, [loaded_all, loaded_code, loaded_doc]) = load(tmp.path()).unwrap();

        assert_eq!(loaded_meta.total_chunks, 3);
        assert_eq!(loaded_all.len(), 3);
        assert_eq!(loaded_code.len(), 1);
        assert_eq!(loaded_doc.len(), 0);
        assert_eq!(loaded_all.vectors(), all.vectors());
        assert_eq!(loaded_all.chunks(), all.chunks());
    }

    #[test]
    fn test_missing_index() {
        let tmp = TempDir::new().unwrap();
        let err = load(tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Index(IndexError::Missing { .. })
        ));
        assert!(!index_exists(tmp.path()));
    }

    #[test]
    fn test_idempotent_persistence() {
        let tmp = TempDir::new().unwrap();
        let all = collection(&["a", "b"]);
        let empty = VectorCollection::new(4);

        save(tmp.path(), &metadata(2), [&all, &empty, &empty]).unwrap();
        let first = fs::read(tmp.path().join("index.bin")).unwrap();
        save(tmp.path(), &metadata(2), [&all, &empty, &empty]).unwrap();
        let second = fs::read(tmp.path().join("index.bin")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_magic_rejected() {
        let tmp = TempDir::new().unwrap();
        let all = collection(&["a"]);
        let empty = VectorCollection::new(4);
        save(tmp.path(), &metadata(1), [&all, &empty, &empty]).unwrap();

        fs::write(tmp.path().join("index.bin"), b"NOPE").unwrap();
        assert!(load(tmp.path()).is_err());
    }

    #[test]
    fn test_layout_file_names() {
        let tmp = TempDir::new().unwrap();
        let all = collection(&["a"]);
        let empty = VectorCollection::new(4);
        save(tmp.path(), &metadata(1), [&all, &empty, &empty]).unwrap();

        for name in [
            "index_metadata.json",
            "chunks.json",
            "code_chunks.json",
            "doc_chunks.json",
            "index.bin",
            "code_index.bin",
            "doc_index.bin",
        ] {
            assert!(tmp.path().join(name).is_file(), "missing {name}");
        }
        // No temporary files left behind.
        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        assert!(index_size_bytes(tmp.path()) > 0);
    }
}
