pub mod chunking;
pub mod pdf;

pub use chunking::{chunk_text, ChunkConfig, ChunkingMetric, TextChunk};
pub use pdf::{LopdfExtractor, PdfExtract};
