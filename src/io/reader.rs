//! File reading utilities with memory mapping support.
//!
//! Provides efficient file reading for both small and large files, with
//! automatic memory mapping above a size threshold and lossy UTF-8 salvage
//! for files with encoding problems. File handles are scoped to a single
//! reader and released on all exit paths.

// Memory mapping requires unsafe but is well-documented and safe for read-only access
#![allow(unsafe_code)]

use crate::error::{IoError, Result};
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Threshold for using memory mapping (1MB).
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Maximum file size to read into memory (1GB).
const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// File reader with support for memory mapping.
///
/// Small files (< 1MB) are read directly; large files are memory-mapped so
/// whole-file extraction paths never materialize more than they need.
///
/// # Examples
///
/// ```no_run
/// use code_cognitio::io::FileReader;
///
/// let reader = FileReader::open("src/lib.rs").unwrap();
/// let content = reader.read_to_string().unwrap();
/// ```
pub struct FileReader {
    /// File handle.
    file: File,
    /// File size in bytes.
    size: u64,
    /// File path for error messages.
    path: String,
}

impl FileReader {
    /// Opens a file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist, can't be opened, or
    /// exceeds the 1GB hard limit.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        if !path_ref.exists() {
            return Err(IoError::FileNotFound { path: path_str }.into());
        }

        let file = File::open(path_ref).map_err(|e| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let metadata = file.metadata().map_err(|e| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let size = metadata.len();

        if size > MAX_FILE_SIZE {
            return Err(IoError::ReadFailed {
                path: path_str,
                reason: format!("file too large: {size} bytes (max: {MAX_FILE_SIZE} bytes)"),
            }
            .into());
        }

        Ok(Self {
            file,
            size,
            path: path_str,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads the entire file to a string.
    ///
    /// Invalid UTF-8 is replaced rather than failing: the re-read with a
    /// replacement handler is logged at INFO and extraction continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    pub fn read_to_string(&self) -> Result<String> {
        let bytes = self.read_bytes()?;
        Ok(self.decode_lossy(bytes))
    }

    /// Reads at most `limit` bytes from the start of the file.
    ///
    /// The result is truncated to a character boundary after lossy decoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    pub fn read_head(&self, limit: usize) -> Result<String> {
        let mut handle = &self.file;
        #[allow(clippy::cast_possible_truncation)]
        let mut buf = vec![0u8; limit.min(self.size as usize)];
        let mut filled = 0;
        while filled < buf.len() {
            let n = handle
                .read(&mut buf[filled..])
                .map_err(|e| IoError::ReadFailed {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(self.decode_lossy(buf))
    }

    /// Memory-maps the file for zero-copy access.
    ///
    /// # Errors
    ///
    /// Returns an error if mapping fails.
    pub fn mmap(&self) -> Result<Mmap> {
        // SAFETY: the mapping is read-only and the file handle outlives it
        // within this call; mutation of the underlying file during iteration
        // is the same hazard any mmap-based reader accepts.
        unsafe { Mmap::map(&self.file) }.map_err(|e| {
            IoError::MmapFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        if self.size >= MMAP_THRESHOLD {
            let mmap = self.mmap()?;
            return Ok(mmap.to_vec());
        }

        let mut handle = &self.file;
        #[allow(clippy::cast_possible_truncation)]
        let mut buf = Vec::with_capacity(self.size as usize);
        handle
            .read_to_end(&mut buf)
            .map_err(|e| IoError::ReadFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(buf)
    }

    fn decode_lossy(&self, bytes: Vec<u8>) -> String {
        match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                info!(
                    path = %self.path,
                    offset = e.utf8_error().valid_up_to(),
                    "invalid UTF-8, re-reading with replacement"
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        }
    }
}

/// Reads a whole file to a string with lossy UTF-8 salvage.
///
/// # Errors
///
/// Returns an error if the file can't be opened or read.
pub fn read_file_lossy<P: AsRef<Path>>(path: P) -> Result<String> {
    FileReader::open(path)?.read_to_string()
}

/// Iterates the lines of a memory-mapped file without loading it whole.
///
/// Each line is decoded lossily; the trailing newline is not included.
pub fn mmap_lines(mmap: &Mmap) -> impl Iterator<Item = Cow<'_, str>> {
    mmap.split(|&b| b == b'\n').map(|line| {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        String::from_utf8_lossy(line)
    })
}
