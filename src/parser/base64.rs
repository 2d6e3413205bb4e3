//! Tolerant base64 handling for share links and subscription payloads.
//!
//! Providers emit every variant in the wild: standard or URL-safe alphabet,
//! with or without `=` padding, and wrapped at arbitrary widths.

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use tracing::trace;

// ============================================================================
// Decoding
// ============================================================================

/// Decodes base64 in any of the common variants.
///
/// Whitespace is stripped first. Missing padding is restored and the
/// URL-safe alphabet (`-`/`_`) is accepted.
pub fn decode_base64(content: &str) -> Result<Vec<u8>> {
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    trace!(length = cleaned.len(), "Decoding base64");

    let padded = add_base64_padding(cleaned.trim_end_matches('='));
    for (variant, engine) in [("standard", &STANDARD), ("url-safe", &URL_SAFE)] {
        if let Ok(decoded) = engine.decode(&padded) {
            trace!("Decoded using {} base64", variant);
            return Ok(decoded);
        }
    }

    // Mixed alphabets show up in hand-edited links.
    let normalized = padded.replace('-', "+").replace('_', "/");
    if let Ok(decoded) = STANDARD.decode(&normalized) {
        trace!("Decoded after alphabet normalization");
        return Ok(decoded);
    }

    bail!("Failed to decode base64 content")
}

/// Decodes base64 and requires the result to be UTF-8 text.
pub fn decode_base64_text(content: &str) -> Result<String> {
    let bytes = decode_base64(content)?;
    String::from_utf8(bytes).context("Decoded base64 content is not valid UTF-8")
}

/// Pads a base64 string with `=` up to a multiple of four.
pub fn add_base64_padding(s: &str) -> String {
    let mut result = s.to_string();
    while !result.len().is_multiple_of(4) {
        result.push('=');
    }
    result
}

// ============================================================================
// Encoding
// ============================================================================

/// URL-safe alphabet without padding, as SIP002 recommends for user info.
pub fn encode_url_safe(data: &str) -> String {
    URL_SAFE_NO_PAD.encode(data.as_bytes())
}

/// Standard alphabet with padding.
pub fn encode_standard(data: &str) -> String {
    STANDARD.encode(data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_standard() {
        assert_eq!(decode_base64_text("aGVsbG8gd29ybGQ=").unwrap(), "hello world");
    }

    #[test]
    fn test_decode_without_padding() {
        assert_eq!(decode_base64_text("aGVsbG8gd29ybGQ").unwrap(), "hello world");
    }

    #[test]
    fn test_decode_with_line_breaks() {
        assert_eq!(
            decode_base64_text("aGVs\nbG8g\r\nd29y\tbGQ=").unwrap(),
            "hello world"
        );
    }

    #[test]
    fn test_decode_url_safe_alphabet() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet.
        assert_eq!(decode_base64("-_8").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_base64("+/8=").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_base64("!!not base64!!").is_err());
    }

    #[test]
    fn test_decode_text_rejects_binary() {
        assert!(decode_base64_text("//79").is_err());
    }

    #[test]
    fn test_add_padding() {
        assert_eq!(add_base64_padding("YQ"), "YQ==");
        assert_eq!(add_base64_padding("YWI"), "YWI=");
        assert_eq!(add_base64_padding("YWJj"), "YWJj");
    }

    #[test]
    fn test_encode_url_safe_has_no_padding() {
        let encoded = encode_url_safe("aes-256-gcm:pass");
        assert!(!encoded.contains('='));
        assert_eq!(decode_base64_text(&encoded).unwrap(), "aes-256-gcm:pass");
    }
}
