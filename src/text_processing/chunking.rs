use crate::config::Config;
use crate::errors::AppError;
use std::cmp::min;
use tracing::{debug, instrument, warn};

/// One chunk of a larger document; the unit of embedding for long text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    /// Start position in the source text, measured in the configured metric.
    pub start_index: usize,
    /// End position (exclusive) in the source text, same metric.
    pub end_index: usize,
}

/// Defines the metric used for measuring chunk size and overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingMetric {
    Char,
    Word,
}

/// Configuration for the chunking process. Size and overlap come from the
/// service configuration, never from per-call parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    pub metric: ChunkingMetric,
    pub max_size: usize,
    pub overlap: usize,
}

impl From<&Config> for ChunkConfig {
    fn from(config: &Config) -> Self {
        let metric = match config.chunking_metric.to_lowercase().as_str() {
            "char" => ChunkingMetric::Char,
            "word" => ChunkingMetric::Word,
            unknown => {
                warn!(
                    "Unknown chunking_metric value '{}' in config. Defaulting to 'Char'.",
                    unknown
                );
                ChunkingMetric::Char
            }
        };

        Self {
            metric,
            max_size: config.chunking_max_size,
            overlap: config.chunking_overlap,
        }
    }
}

/// Splits text into fixed-size chunks with a fixed overlap between
/// consecutive chunks, in the configured metric. Char chunks are cut on
/// character boundaries, never bytes, so multi-byte scripts survive intact.
#[instrument(skip_all, fields(text_len = text.len(), config = ?config))]
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Result<Vec<TextChunk>, AppError> {
    if config.max_size == 0 || config.overlap >= config.max_size {
        return Err(AppError::ChunkingError(format!(
            "invalid chunking config: max_size {} / overlap {}",
            config.max_size, config.overlap
        )));
    }

    let trimmed_text = text.trim();
    if trimmed_text.is_empty() {
        debug!("Input text is empty after trimming, returning no chunks.");
        return Ok(vec![]);
    }

    let chunks = match config.metric {
        ChunkingMetric::Char => {
            let units: Vec<char> = trimmed_text.chars().collect();
            windows(&units, config, |slice| slice.iter().collect::<String>())
        }
        ChunkingMetric::Word => {
            let units: Vec<&str> = trimmed_text.split_whitespace().collect();
            windows(&units, config, |slice| slice.join(" "))
        }
    };

    debug!(num_chunks = chunks.len(), "Chunking complete.");
    Ok(chunks)
}

fn windows<T>(units: &[T], config: &ChunkConfig, render: impl Fn(&[T]) -> String) -> Vec<TextChunk> {
    let stride = config.max_size - config.overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < units.len() {
        let end = min(start + config.max_size, units.len());
        chunks.push(TextChunk {
            content: render(&units[start..end]),
            start_index: start,
            end_index: end,
        });
        if end == units.len() {
            break;
        }
        start += stride;
    }

    chunks
}
