//! I/O helpers for the command line surface: path expansion and fetching
//! settings, profiles and subscriptions from disk or over HTTP.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::get_version;

// ============================================================================
// Path Utilities
// ============================================================================

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = dirs_home()
    {
        return path.replacen('~', &home, 1);
    }
    path.to_string()
}

/// Get home directory path
pub fn dirs_home() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok()
    }
}

/// Whether `path_or_url` names an http(s) resource rather than a local file.
///
/// Only the scheme prefix is checked; the URL itself is validated when it is
/// fetched.
pub fn is_remote(path_or_url: &str) -> bool {
    path_or_url.starts_with("http://") || path_or_url.starts_with("https://")
}

// ============================================================================
// Fetching
// ============================================================================

/// Fetch text content from a URL
pub async fn fetch_text(url: &str) -> Result<String> {
    Ok(String::from_utf8_lossy(&fetch_bytes(url).await?).into_owned())
}

/// Fetch a response body from a URL, failing on non-success status.
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    debug!("Fetching URL: {}", url);

    let client = reqwest::Client::builder()
        .user_agent(format!("routeforge/{}", get_version()))
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch URL: {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("HTTP request failed with status {}: {}", status, url);
    }

    let body = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read response body from: {}", url))?;

    Ok(body.to_vec())
}

/// Reads a local file (with `~` expansion) or downloads a URL.
pub async fn read_source(path_or_url: &str) -> Result<Vec<u8>> {
    if is_remote(path_or_url) {
        return fetch_bytes(path_or_url).await;
    }

    let expanded = expand_tilde(path_or_url);
    tokio::fs::read(Path::new(&expanded))
        .await
        .with_context(|| format!("Failed to read {}", expanded))
}

/// [`read_source`] as UTF-8 text.
pub async fn read_source_text(path_or_url: &str) -> Result<String> {
    let bytes = read_source(path_or_url).await?;
    String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path_or_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_expand_tilde_with_home() {
        if let Ok(home) = env::var("HOME") {
            let expanded = expand_tilde("~/profiles/main.json");
            assert!(expanded.starts_with(&home));
            assert!(expanded.ends_with("/profiles/main.json"));
        }
    }

    #[test]
    fn test_expand_tilde_leaves_other_paths() {
        assert_eq!(expand_tilde("/etc/routeforge.toml"), "/etc/routeforge.toml");
        assert_eq!(expand_tilde("relative/~file"), "relative/~file");
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/sub"));
        assert!(!is_remote("./sub.txt"));
    }

    #[tokio::test]
    async fn test_read_source_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(&path, "socks://h:1080\n").unwrap();

        let text = read_source_text(path.to_str().unwrap()).await.unwrap();
        assert_eq!(text, "socks://h:1080\n");
    }

    #[tokio::test]
    async fn test_read_source_missing_file() {
        assert!(read_source("/nonexistent/routeforge/file").await.is_err());
    }
}
