// crates/omf-sender-http/src/body.rs
// ============================================================================
// Module: OMF Message Bodies
// Description: Request body encoding and bounded response reads.
// Purpose: Frame OMF messages as one-element JSON arrays, optionally gzipped.
// Dependencies: flate2, serde_json
// ============================================================================

//! ## Overview
//! OMF ingress expects a JSON array of message objects. Each send carries
//! exactly one message, so the body is `[message]`. With compression on the
//! JSON text is gzip-encoded and the caller marks `compression: gzip`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use omf_sender_core::DeliveryError;
use serde_json::Value;

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Serializes `message` as a one-element JSON array, gzipped when `compress` is set.
///
/// # Errors
///
/// Returns [`DeliveryError::Encoding`] when serialization or compression fails.
pub fn encode_body(message: &Value, compress: bool) -> Result<Vec<u8>, DeliveryError> {
    let json =
        serde_json::to_vec(&[message]).map_err(|err| DeliveryError::Encoding(err.to_string()))?;
    if !compress {
        return Ok(json);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(|err| DeliveryError::Encoding(err.to_string()))?;
    encoder.finish().map_err(|err| DeliveryError::Encoding(err.to_string()))
}

// ============================================================================
// SECTION: Response Bodies
// ============================================================================

/// Reads at most `max_bytes` from `reader`; read errors end the body early.
pub(crate) fn read_limited(reader: impl Read, max_bytes: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = reader.take(max_bytes).read_to_end(&mut buf);
    buf
}

/// Reads a bounded response body as lossy UTF-8 text.
pub(crate) fn read_text_limited(reader: impl Read, max_bytes: u64) -> String {
    String::from_utf8_lossy(&read_limited(reader, max_bytes)).into_owned()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
