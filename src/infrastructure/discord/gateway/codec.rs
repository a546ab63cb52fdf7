use flate2::{Decompress, FlushDecompress, Status};

use super::constants::ZLIB_SUFFIX;
use super::error::{GatewayError, GatewayResult};

const CHUNK_SIZE: usize = 32 * 1024;
const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Inflates `compress=zlib-stream` transport frames.
///
/// One zlib context spans the whole socket. A message may arrive split over
/// several binary frames and is complete once the buffered bytes end with
/// the `00 00 ff ff` sync-flush marker.
pub struct ZlibStream {
    inflater: Decompress,
    pending: Vec<u8>,
}

impl ZlibStream {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflater: Decompress::new(true),
            pending: Vec::with_capacity(4096),
        }
    }

    /// Buffers one binary frame and returns the JSON text once a full
    /// message has arrived.
    ///
    /// # Errors
    /// Returns a compression error for corrupt input, oversized output or
    /// non-UTF-8 text.
    pub fn push(&mut self, frame: &[u8]) -> GatewayResult<Option<String>> {
        self.pending.extend_from_slice(frame);

        if !self.pending.ends_with(&ZLIB_SUFFIX) {
            return Ok(None);
        }

        let result = self.inflate();
        self.pending.clear();
        result.map(Some)
    }

    fn inflate(&mut self) -> GatewayResult<String> {
        let mut output = Vec::with_capacity(CHUNK_SIZE);
        let mut consumed = 0;

        loop {
            if output.len() == output.capacity() {
                if output.len() >= MAX_MESSAGE_SIZE {
                    return Err(GatewayError::compression(
                        "decompressed message exceeds maximum size",
                    ));
                }
                output.reserve(CHUNK_SIZE);
            }

            let before = self.inflater.total_in();
            let status = self
                .inflater
                .decompress_vec(&self.pending[consumed..], &mut output, FlushDecompress::Sync)
                .map_err(|e| GatewayError::compression(e.to_string()))?;
            consumed += usize::try_from(self.inflater.total_in() - before).unwrap_or(0);

            let input_done = consumed >= self.pending.len();
            let output_full = output.len() == output.capacity();
            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError if input_done && !output_full => break,
                Status::BufError if !output_full => {
                    return Err(GatewayError::compression("truncated zlib stream"));
                }
                Status::Ok | Status::BufError => {}
            }
        }

        String::from_utf8(output)
            .map_err(|e| GatewayError::compression(format!("invalid UTF-8: {e}")))
    }

    /// Starts a fresh zlib context for a new socket.
    pub fn reset(&mut self) {
        self.inflater.reset(true);
        self.pending.clear();
    }
}

impl Default for ZlibStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use flate2::{Compress, Compression, FlushCompress};

    use super::*;

    fn deflate_sync(compressor: &mut Compress, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() + 64);
        compressor
            .compress_vec(text.as_bytes(), &mut out, FlushCompress::Sync)
            .unwrap();
        out
    }

    #[test]
    fn test_incomplete_frame_is_buffered() {
        let mut stream = ZlibStream::new();
        assert!(stream.push(&[0x01, 0x02, 0x03]).unwrap().is_none());
    }

    #[test]
    fn test_messages_share_one_context() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut stream = ZlibStream::new();

        let first = deflate_sync(&mut compressor, r#"{"op":10,"d":{"heartbeat_interval":41250}}"#);
        let second = deflate_sync(&mut compressor, r#"{"op":11}"#);

        assert_eq!(
            stream.push(&first).unwrap().as_deref(),
            Some(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#)
        );
        assert_eq!(stream.push(&second).unwrap().as_deref(), Some(r#"{"op":11}"#));
    }

    #[test]
    fn test_split_frame_is_reassembled() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut stream = ZlibStream::new();
        let text = r#"{"op":0,"s":1,"t":"READY","d":{}}"#;
        let bytes = deflate_sync(&mut compressor, text);

        let (head, tail) = bytes.split_at(bytes.len() / 2);
        assert!(stream.push(head).unwrap().is_none());
        assert_eq!(stream.push(tail).unwrap().as_deref(), Some(text));
    }

    #[test]
    fn test_large_message_grows_buffer() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut stream = ZlibStream::new();
        let text = format!(r#"{{"op":0,"d":"{}"}}"#, "a".repeat(200_000));
        let bytes = deflate_sync(&mut compressor, &text);

        assert_eq!(stream.push(&bytes).unwrap(), Some(text));
    }

    #[test]
    fn test_reset_clears_pending() {
        let mut stream = ZlibStream::new();
        stream.push(&[1, 2, 3]).unwrap();
        stream.reset();
        assert!(stream.pending.is_empty());
    }
}
