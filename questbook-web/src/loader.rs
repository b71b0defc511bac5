//! Remote catalog/lang loading and uploaded-file sniffing.

use questbook_core::nbt;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TagTree(#[from] nbt::DecodeError),
}

/// Interpret an uploaded player file. Files that look like JSON text are
/// parsed as JSON; everything else goes through the tag-tree decoder,
/// which handles gzip transparently.
///
/// # Errors
///
/// Returns [`LoadError`] when the bytes parse as neither format.
pub fn parse_player_bytes(bytes: &[u8]) -> Result<Value, LoadError> {
    if let Ok(text) = std::str::from_utf8(bytes)
        && text.trim_start().starts_with('{')
    {
        return Ok(serde_json::from_str(text)?);
    }
    Ok(nbt::decode(bytes)?.into_json())
}

/// Fetch and parse a JSON document.
///
/// # Errors
///
/// Returns [`LoadError`] on transport failure, non-200 status or bad JSON.
pub async fn fetch_json(url: &str) -> Result<Value, LoadError> {
    let bytes = fetch_bytes(url).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Fetch a plain-text document, e.g. a lang file.
///
/// # Errors
///
/// Returns [`LoadError`] on transport failure or non-200 status.
pub async fn fetch_text(url: &str) -> Result<String, LoadError> {
    let response = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|err| LoadError::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
    if response.status() != 200 {
        return Err(LoadError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }
    response.text().await.map_err(|err| LoadError::Fetch {
        url: url.to_string(),
        reason: err.to_string(),
    })
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, LoadError> {
    let response = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|err| LoadError::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
    if response.status() != 200 {
        return Err(LoadError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }
    response.binary().await.map_err(|err| LoadError::Fetch {
        url: url.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_text_is_sniffed_by_leading_brace() {
        let bytes = b"  \n{\"completedQuests\": [1]}";
        let parsed = parse_player_bytes(bytes).unwrap();
        assert_eq!(parsed, json!({ "completedQuests": [1] }));
    }

    #[test]
    fn binary_bytes_route_to_the_tag_tree_decoder() {
        // Empty named compound root.
        let bytes = [0x0a, 0x00, 0x00, 0x00];
        let parsed = parse_player_bytes(&bytes).unwrap();
        assert_eq!(parsed, json!({}));
    }

    #[test]
    fn garbage_bytes_fail_with_a_decode_error() {
        assert!(matches!(
            parse_player_bytes(b"\xffnot anything"),
            Err(LoadError::TagTree(_))
        ));
    }
}
