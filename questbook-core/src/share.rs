//! Share-link codec for completed-id lists.
//!
//! A completed-id list is JSON-stringified, deflate-compressed and encoded
//! as URL-safe unpadded base64 so it fits in a URL fragment. Decoding
//! reverses every step and fails safely on malformed input.

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde_json::Value;
use thiserror::Error;

/// Non-fatal decode failures; a malformed share link simply loads nothing.
#[derive(Debug, Error)]
pub enum ShareDecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid deflate stream: {0}")]
    Inflate(std::io::Error),
    #[error("payload is not a JSON id list: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a completed-id list for embedding in a share URL.
///
/// Returns `None` for an empty list, which has nothing worth sharing.
#[must_use]
pub fn encode_completed(ids: &[String]) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    let json = serde_json::to_vec(ids).ok()?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).ok()?;
    let compressed = encoder.finish().ok()?;
    Some(URL_SAFE_NO_PAD.encode(compressed))
}

/// Decode a share-link payload back into the completed-id list.
///
/// # Errors
///
/// Returns [`ShareDecodeError`] when any of the base64, deflate or JSON
/// steps fails; callers treat this as "no shared progress".
pub fn decode_completed(encoded: &str) -> Result<Vec<String>, ShareDecodeError> {
    let compressed = URL_SAFE_NO_PAD.decode(encoded)?;
    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(ShareDecodeError::Inflate)?;
    let parsed: Vec<Value> = serde_json::from_slice(&json)?;
    Ok(parsed
        .iter()
        .filter_map(crate::access::id_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_ids() {
        let ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        let encoded = encode_completed(&ids).unwrap();
        assert!(!encoded.contains('+') && !encoded.contains('/') && !encoded.contains('='));
        assert_eq!(decode_completed(&encoded).unwrap(), ids);
    }

    #[test]
    fn empty_list_encodes_to_none() {
        assert_eq!(encode_completed(&[]), None);
    }

    #[test]
    fn numeric_ids_decode_as_strings() {
        // Older share links serialized ids as numbers.
        let json = serde_json::to_vec(&[1, 2]).unwrap();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json).unwrap();
        let encoded = URL_SAFE_NO_PAD.encode(encoder.finish().unwrap());
        assert_eq!(decode_completed(&encoded).unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn invalid_base64_fails_safely() {
        assert!(matches!(
            decode_completed("not!!valid@@base64"),
            Err(ShareDecodeError::Base64(_))
        ));
    }

    #[test]
    fn valid_base64_with_garbage_payload_fails_safely() {
        let encoded = URL_SAFE_NO_PAD.encode(b"definitely not deflate");
        assert!(matches!(
            decode_completed(&encoded),
            Err(ShareDecodeError::Inflate(_))
        ));
    }
}
