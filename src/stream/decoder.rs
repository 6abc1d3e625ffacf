//! Byte-to-frame splitter for the solving stream.
//!
//! Chunk boundaries are arbitrary: a chunk may end inside a frame, inside the
//! blank-line delimiter, or inside a multi-byte UTF-8 sequence. The decoder
//! carries both undecoded bytes and undelimited text across calls.

use crate::defaults::FRAME_DELIMITER;

/// Stateful splitter turning byte chunks into complete, trimmed frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    /// Decoded text not yet terminated by a delimiter.
    buffer: String,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every frame completed by it, in order.
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<String> {
        // Carried text was already searched; only a delimiter straddling the
        // old end can start before it.
        let mut from = self.scan_start();
        self.decode_into_buffer(chunk);

        let mut frames = Vec::new();
        while let Some(found) = self.buffer[from..].find(FRAME_DELIMITER) {
            let idx = from + found;
            frames.push(self.buffer[..idx].trim().to_string());
            self.buffer.drain(..idx + FRAME_DELIMITER.len());
            from = 0;
        }
        frames
    }

    fn scan_start(&self) -> usize {
        let mut from = self
            .buffer
            .len()
            .saturating_sub(FRAME_DELIMITER.len() - 1);
        while !self.buffer.is_char_boundary(from) {
            from -= 1;
        }
        from
    }

    /// Signals end of stream.
    ///
    /// An undelimited trailing frame is not a frame: it is dropped.
    /// Returns the number of bytes discarded.
    pub fn finish(&mut self) -> usize {
        let discarded = self.buffer.len() + self.pending.len();
        self.buffer.clear();
        self.pending.clear();
        discarded
    }

    /// Bytes currently held back (decoded text plus undecoded tail).
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.pending.len()
    }

    /// Lossy incremental UTF-8 decoding.
    ///
    /// Invalid sequences become U+FFFD; an incomplete sequence at the end is
    /// kept in `pending` until the next chunk completes it.
    fn decode_into_buffer(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let mut consumed = 0;
        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.buffer.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_len = err.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&rest[..valid_len]));
                    match err.error_len() {
                        Some(invalid_len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid_len + invalid_len;
                        }
                        None => {
                            consumed += valid_len;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
    }
}
