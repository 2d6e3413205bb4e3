//! Subscription payload classification.

use tracing::debug;

use super::base64::decode_base64;

/// Kind of payload a subscription endpoint returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    /// Open Online Config v1 JSON document (`version` + `servers`).
    OocV1Json,
    /// Share links, one per line.
    PlainLinkList,
    /// Share links wrapped in base64.
    Base64LinkList,
    Unknown,
}

impl std::fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionKind::OocV1Json => write!(f, "OOCv1 JSON"),
            SubscriptionKind::PlainLinkList => write!(f, "Plain Link List"),
            SubscriptionKind::Base64LinkList => write!(f, "Base64 Link List"),
            SubscriptionKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Classifies a subscription payload.
pub fn detect_subscription_kind(content: &str) -> SubscriptionKind {
    let trimmed = content.trim();
    let preview: String = trimmed.chars().take(64).collect();
    debug!(
        "Detecting subscription kind, content length: {} bytes, preview: {:?}",
        content.len(),
        preview
    );

    if is_ooc_json(trimmed) {
        return SubscriptionKind::OocV1Json;
    }

    if is_plain_link_list(trimmed) {
        return SubscriptionKind::PlainLinkList;
    }

    if is_base64_content(trimmed) {
        return SubscriptionKind::Base64LinkList;
    }

    debug!("Unable to detect subscription kind");
    SubscriptionKind::Unknown
}

/// A JSON object carrying a `servers` key.
pub fn is_ooc_json(content: &str) -> bool {
    content.starts_with('{') && content.contains("\"servers\"")
}

/// Any `://` in the payload means it is not base64-wrapped.
pub fn is_plain_link_list(content: &str) -> bool {
    content.contains("://")
}

pub fn is_base64_content(content: &str) -> bool {
    if content.is_empty() {
        return false;
    }

    let valid_chars = content.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_') || c.is_whitespace()
    });

    valid_chars && decode_base64(content).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_plain_list() {
        let content = "ss://YWVzLTI1Ni1nY206cGFzcw==@example.com:8443#a\nvless://id@h:1";
        assert_eq!(
            detect_subscription_kind(content),
            SubscriptionKind::PlainLinkList
        );
    }

    #[test]
    fn test_detect_base64_list() {
        // "vless://id@h:1"
        let content = "dmxlc3M6Ly9pZEBoOjE=";
        assert_eq!(
            detect_subscription_kind(content),
            SubscriptionKind::Base64LinkList
        );
    }

    #[test]
    fn test_detect_ooc() {
        let content = r#"{"version": 1, "servers": []}"#;
        assert_eq!(detect_subscription_kind(content), SubscriptionKind::OocV1Json);
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_subscription_kind(""), SubscriptionKind::Unknown);
        assert_eq!(
            detect_subscription_kind("<html>nope</html>"),
            SubscriptionKind::Unknown
        );
    }
}
