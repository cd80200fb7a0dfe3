//! Incremental UTF-8 decoding for streamed response bodies.
//!
//! Network chunking does not respect character boundaries: a multi-byte
//! sequence can be split across two chunks. The decoder carries the
//! incomplete trailing bytes of each chunk forward so no character is lost
//! or mangled at a chunk boundary.

/// Streaming UTF-8 decoder.
///
/// Scoped to one exchange, like the frame buffer. An incomplete trailing
/// sequence still pending when the decoder is dropped belonged to a frame
/// that never completed and is discarded with it.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Incomplete trailing sequence from the previous chunk (at most 3 bytes)
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a new decoder with no pending bytes
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, prepending any bytes carried over from the previous
    /// call. Invalid sequences are replaced with U+FFFD rather than aborting
    /// the stream; an incomplete trailing sequence is held back for the next
    /// chunk.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        if self.pending.is_empty() {
            return self.decode_inner(chunk);
        }
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);
        self.decode_inner(&bytes)
    }

    fn decode_inner(&mut self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    if let Ok(valid) = std::str::from_utf8(&rest[..valid_up_to]) {
                        out.push_str(valid);
                    }
                    match err.error_len() {
                        // Genuinely invalid bytes: substitute and keep going
                        Some(len) => {
                            out.push('\u{FFFD}');
                            rest = &rest[valid_up_to + len..];
                        }
                        // Incomplete sequence at the end: carry it forward
                        None => {
                            self.pending = rest[valid_up_to..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Whether bytes from a split multi-byte sequence are being carried.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
