//! Text normalization and section chunking.

mod chunker;
mod normalizer;

pub use chunker::SectionChunker;
pub use normalizer::TextNormalizer;
