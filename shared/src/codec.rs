//! Length-prefixed codec for TCP framing
//!
//! All frames are framed as:
//! ```text
//! [ 4 bytes: length (u32, big-endian) ][ N bytes: UTF-8 text ]
//! ```
//!
//! This preserves whole-frame boundaries over TCP streams, so a multi-line
//! command script always arrives as a single frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::limits::MAX_FRAME_SIZE;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),

    #[error("Invalid frame length prefix: {0}")]
    InvalidLength(u32),

    #[error("Frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Encode a text frame into a length-prefixed byte buffer
pub fn encode(frame: &str) -> Result<Bytes, CodecError> {
    let msg_len = frame.len();

    if msg_len > MAX_FRAME_SIZE as usize {
        return Err(CodecError::FrameTooLarge(msg_len));
    }

    let mut buf = BytesMut::with_capacity(4 + msg_len);
    buf.put_u32(msg_len as u32);
    buf.put_slice(frame.as_bytes());

    Ok(buf.freeze())
}

/// Try to decode a length-prefixed text frame from a buffer
///
/// Returns:
/// - `Ok(Some(frame))` if a complete frame was decoded
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the data is invalid
pub fn decode(buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
    // Need at least 4 bytes for the length prefix
    if buf.len() < 4 {
        return Ok(None);
    }

    // Peek at the length prefix without consuming
    let msg_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);

    if msg_len > MAX_FRAME_SIZE {
        return Err(CodecError::InvalidLength(msg_len));
    }

    let total_len = 4 + msg_len as usize;

    // Check if we have the complete frame
    if buf.len() < total_len {
        return Ok(None);
    }

    buf.advance(4);
    let msg_bytes = buf.split_to(msg_len as usize);

    let frame = String::from_utf8(msg_bytes.to_vec())?;
    Ok(Some(frame))
}

/// Decoder state machine for streaming decoding
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Partial frame data being accumulated
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create a new frame decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all complete frames
    pub fn decode_next(&mut self) -> Result<Option<String>, CodecError> {
        decode(&mut self.buffer)
    }

    /// Get the current buffer length (for debugging)
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let original = "controlify.io server 0.1.0";

        let encoded = encode(original).expect("encode failed");

        // Verify length prefix
        let len_prefix = u32::from_be_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]);
        assert_eq!(len_prefix as usize, encoded.len() - 4);

        let mut buf = BytesMut::from(&encoded[..]);
        let decoded = decode(&mut buf).expect("decode failed").expect("no frame");

        assert_eq!(decoded, original);
        assert!(buf.is_empty(), "buffer should be empty after decode");
    }

    #[test]
    fn test_multiline_script_is_one_frame() {
        let script = "pin 3 on\npause 100\npin 3 off";
        let encoded = encode(script).expect("encode failed");

        let mut buf = BytesMut::from(&encoded[..]);
        let decoded = decode(&mut buf).expect("decode failed").expect("no frame");
        assert_eq!(decoded, script);
    }

    #[test]
    fn test_partial_decode() {
        let encoded = encode("ok").expect("encode failed");

        // Try decoding with only partial data
        let mut buf = BytesMut::from(&encoded[..5]);
        let result = decode(&mut buf).expect("decode should not fail on partial data");
        assert!(result.is_none(), "should return None for partial data");

        // Buffer should be unchanged (data not consumed)
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_frame_decoder_feeds_in_chunks() {
        let encoded = encode("deprecated v0 clients").expect("encode failed");

        let mut decoder = FrameDecoder::new();

        decoder.extend(&encoded[..5]);
        assert!(decoder.decode_next().expect("decode error").is_none());

        decoder.extend(&encoded[5..]);
        let decoded = decoder
            .decode_next()
            .expect("decode error")
            .expect("should have frame");

        assert_eq!(decoded, "deprecated v0 clients");
    }

    #[test]
    fn test_multiple_frames() {
        let encoded1 = encode("ok").expect("encode failed");
        let encoded2 = encode("pin 1 on").expect("encode failed");

        let mut decoder = FrameDecoder::new();
        decoder.extend(&encoded1);
        decoder.extend(&encoded2);

        assert_eq!(decoder.decode_next().expect("decode error").as_deref(), Some("ok"));
        assert_eq!(
            decoder.decode_next().expect("decode error").as_deref(),
            Some("pin 1 on")
        );
        assert!(decoder.decode_next().expect("decode error").is_none());
    }

    #[test]
    fn test_frame_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u32(MAX_FRAME_SIZE + 1);
        buf.put_bytes(0, 100);

        let result = decode(&mut buf);
        assert!(matches!(result, Err(CodecError::InvalidLength(_))));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32(2);
        buf.put_slice(&[0xff, 0xfe]);

        let result = decode(&mut buf);
        assert!(matches!(result, Err(CodecError::InvalidUtf8(_))));
    }
}
