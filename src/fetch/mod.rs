//! Remote artifact fetching over go-getter style URLs.
//!
//! The scanners never inspect URL schemes themselves; they hand every URL
//! to a [`RemoteFetcher`] together with a timeout derived from the
//! environment. The production implementation is [`GoGetter`], a small
//! per-scheme dispatcher covering git, http(s), s3/gcs forced prefixes,
//! local files, and archive auto-extraction.

pub mod archive;
pub mod getter;

pub use getter::GoGetter;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

/// Default transfer timeout when the environment does not override it.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transfer timed out after {0:?}")]
    Timeout(Duration),

    #[error("unsupported source URL scheme")]
    UnsupportedScheme,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("git clone failed: {0}")]
    Git(String),

    #[error("source resolved to a directory, expected a single file")]
    NotAFile,

    #[error("path not found in fetched source: {0}")]
    MissingSubpath(String),

    #[error("archive extraction failed: {0}")]
    Archive(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Capability seam for downloading remote artifacts.
///
/// `fetch_file` expects the URL to resolve to a single file and writes it
/// to `dst_file` exactly. `fetch_any` accepts files, directory trees and
/// archives, and populates `dst_dir` with whatever the URL resolves to.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch_file(
        &self,
        url: &str,
        dst_file: &Path,
        timeout: Duration,
    ) -> Result<(), FetchError>;

    async fn fetch_any(
        &self,
        url: &str,
        dst_dir: &Path,
        timeout: Duration,
    ) -> Result<(), FetchError>;
}

/// Resolves a transfer timeout from an environment variable holding whole
/// seconds. Missing, malformed, or non-positive values fall back to the
/// 60-second default.
pub fn timeout_from_env(var: &str) -> Duration {
    parse_timeout_secs(std::env::var(var).ok().as_deref())
}

fn parse_timeout_secs(value: Option<&str>) -> Duration {
    match value.and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
        _ => DEFAULT_FETCH_TIMEOUT,
    }
}
