use latentflow_types::Block;
use serde_json::Value;

use crate::error::BufferError;

#[derive(Clone, Debug, PartialEq, Eq)]
enum ChunkMode {
    Delimiter(String),
    /// Size in characters
    Fixed(usize),
}

/// Turns a raw text stream into blocks without tokenizing it.
///
/// Complete segments (by delimiter, or fixed-size chunks) are emitted as
/// trimmed string blocks; the incomplete tail waits for more input or an
/// explicit [`flush`](Self::flush). Blank segments are dropped.
#[derive(Clone, Debug)]
pub struct ContinuousBuffer {
    mode: ChunkMode,
    block_type: String,
    buf: String,
    emitted: usize,
}

impl ContinuousBuffer {
    /// Exactly one of `delimiter` and `chunk_size` must be given.
    pub fn new(
        delimiter: Option<&str>,
        chunk_size: Option<usize>,
        block_type: impl Into<String>,
    ) -> Result<Self, BufferError> {
        let mode = match (delimiter, chunk_size) {
            (None, None) => return Err(BufferError::NoMode),
            (Some(_), Some(_)) => return Err(BufferError::BothModes),
            (Some(""), None) => return Err(BufferError::EmptyDelimiter),
            (Some(d), None) => ChunkMode::Delimiter(d.to_string()),
            (None, Some(0)) => return Err(BufferError::ZeroChunk),
            (None, Some(n)) => ChunkMode::Fixed(n),
        };
        Ok(Self {
            mode,
            block_type: block_type.into(),
            buf: String::new(),
            emitted: 0,
        })
    }

    /// Newline-delimited `"event"` blocks.
    pub fn lines() -> Self {
        Self {
            mode: ChunkMode::Delimiter("\n".to_string()),
            block_type: "event".to_string(),
            buf: String::new(),
            emitted: 0,
        }
    }

    pub fn append(&mut self, data: &str) {
        self.buf.push_str(data);
    }

    /// Blocks completed since the last call.
    pub fn emit_blocks(&mut self) -> Vec<Block> {
        let mut segments = Vec::new();
        match &self.mode {
            ChunkMode::Delimiter(delimiter) => {
                if let Some(end) = self.buf.rfind(delimiter.as_str()) {
                    let tail = self.buf.split_off(end + delimiter.len());
                    let complete = std::mem::replace(&mut self.buf, tail);
                    segments.extend(complete.split(delimiter.as_str()).map(str::to_string));
                }
            }
            ChunkMode::Fixed(size) => {
                while self.buf.chars().count() >= *size {
                    let split_at = self
                        .buf
                        .char_indices()
                        .nth(*size)
                        .map_or(self.buf.len(), |(i, _)| i);
                    let tail = self.buf.split_off(split_at);
                    segments.push(std::mem::replace(&mut self.buf, tail));
                }
            }
        }
        let blocks = self.to_blocks(segments);
        self.emitted += blocks.len();
        blocks
    }

    /// Emit whatever remains, complete or not.
    pub fn flush(&mut self) -> Vec<Block> {
        let mut blocks = self.emit_blocks();
        let tail = std::mem::take(&mut self.buf);
        let rest = self.to_blocks(vec![tail]);
        self.emitted += rest.len();
        blocks.extend(rest);
        blocks
    }

    /// Text buffered but not yet emitted.
    pub fn pending(&self) -> &str {
        &self.buf
    }

    pub fn emitted_count(&self) -> usize {
        self.emitted
    }

    fn to_blocks(&self, segments: Vec<String>) -> Vec<Block> {
        segments
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| Block::new(Value::String(s.to_string()), self.block_type.as_str()))
            .collect()
    }
}
