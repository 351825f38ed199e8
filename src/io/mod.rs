//! File I/O utilities.

mod reader;

pub use reader::{FileReader, mmap_lines, read_file_lossy};
