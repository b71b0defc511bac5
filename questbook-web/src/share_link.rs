//! URL-fragment share links.
//!
//! A share link carries the encoded completed-id payload, and optionally
//! the sharing player's name, in the fragment so no server ever sees it:
//! `#share=<code>&player=<name>`.

use questbook_core::share;

/// Parsed share fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub code: String,
    pub player: Option<String>,
}

impl ShareLink {
    /// Decode the payload into completed quest ids.
    ///
    /// # Errors
    ///
    /// Returns [`share::ShareDecodeError`] for a corrupted code.
    pub fn completed_ids(&self) -> Result<Vec<String>, share::ShareDecodeError> {
        share::decode_completed(&self.code)
    }
}

/// Parse a location fragment (with or without the leading `#`).
#[must_use]
pub fn parse_fragment(fragment: &str) -> Option<ShareLink> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let mut code = None;
    let mut player = None;
    for pair in fragment.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "share" if !value.is_empty() => code = Some(value.to_string()),
            "player" if !value.is_empty() => player = Some(percent_decode(value)),
            _ => {}
        }
    }
    Some(ShareLink {
        code: code?,
        player,
    })
}

/// Build the fragment for a completed-id list. `None` when there is
/// nothing to share.
#[must_use]
pub fn build_fragment(completed: &[String], player: Option<&str>) -> Option<String> {
    let code = share::encode_completed(completed)?;
    let mut fragment = format!("#share={code}");
    if let Some(name) = player.filter(|name| !name.is_empty()) {
        fragment.push_str("&player=");
        fragment.push_str(&percent_encode(name));
    }
    Some(fragment)
}

/// Read the share link out of the current browser location, if any.
#[must_use]
pub fn current_share() -> Option<ShareLink> {
    let window = web_sys::window()?;
    let hash = window.location().hash().ok()?;
    parse_fragment(&hash)
}

fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                // Slicing the byte buffer, not the str: the two bytes after
                // a stray `%` may sit inside a multi-byte character.
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = hex {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_roundtrips_code_and_player() {
        let ids = vec!["1".to_string(), "5".to_string()];
        let fragment = build_fragment(&ids, Some("Dr. Steve")).unwrap();
        let link = parse_fragment(&fragment).unwrap();
        assert_eq!(link.player.as_deref(), Some("Dr. Steve"));
        assert_eq!(link.completed_ids().unwrap(), ids);
    }

    #[test]
    fn player_is_optional_and_share_is_required() {
        let fragment = build_fragment(&["1".to_string()], None).unwrap();
        assert!(!fragment.contains("player="));
        assert!(parse_fragment(&fragment).unwrap().player.is_none());

        assert!(parse_fragment("#player=Steve").is_none());
        assert!(parse_fragment("#share=").is_none());
        assert!(parse_fragment("").is_none());
    }

    #[test]
    fn empty_completed_list_builds_no_fragment() {
        assert_eq!(build_fragment(&[], Some("Steve")), None);
    }

    #[test]
    fn percent_escapes_roundtrip() {
        assert_eq!(percent_encode("a b/c"), "a%20b%2Fc");
        assert_eq!(percent_decode("a%20b%2Fc"), "a b/c");
        assert_eq!(percent_decode("plus+space"), "plus space");
        // Truncated escape is passed through.
        assert_eq!(percent_decode("50%"), "50%");
    }

    #[test]
    fn multibyte_text_after_stray_percent_is_kept_literal() {
        // The bytes after the `%` fall inside a two-byte character; the
        // escape is invalid and everything passes through untouched.
        assert_eq!(percent_decode("%a\u{e9}"), "%a\u{e9}");
        assert_eq!(percent_decode("%\u{e9}x"), "%\u{e9}x");
        // Proper escapes still reassemble multi-byte characters.
        assert_eq!(percent_decode("%C3%A9"), "\u{e9}");
    }

    #[test]
    fn unknown_fragment_keys_are_ignored() {
        let link = parse_fragment("#utm=x&share=abc&player=Bo").unwrap();
        assert_eq!(link.code, "abc");
        assert_eq!(link.player.as_deref(), Some("Bo"));
    }
}
