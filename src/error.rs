use crate::fetch::FetchError;

/// Error taxonomy shared by both scanners.
///
/// Variants map one-to-one onto the kinds the MCP layer cares about:
/// `Validation` becomes an `invalid_params` protocol error, everything
/// else becomes a tool error. No caller should need to inspect message
/// text to route an error.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Bad input parameters. Raised before any workspace or network I/O.
    #[error("{0}")]
    Validation(String),

    /// The per-scan temp workspace could not be created or written to.
    #[error("workspace error: {0}")]
    Workspace(#[source] std::io::Error),

    /// A remote artifact could not be fetched. Carries the original URL;
    /// never carries fetched content.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// An external binary could not run, or failed without usable output.
    #[error("{tool} execution failed: {message}")]
    Exec { tool: &'static str, message: String },

    /// The external binary produced stdout that is not valid JSON.
    #[error("failed to parse {tool} output: {message}")]
    Parse { tool: &'static str, message: String },
}

impl ScanError {
    pub fn validation(message: impl Into<String>) -> Self {
        ScanError::Validation(message.into())
    }

    pub fn fetch(url: impl Into<String>, source: FetchError) -> Self {
        ScanError::Fetch {
            url: url.into(),
            source,
        }
    }

    pub fn exec(tool: &'static str, message: impl Into<String>) -> Self {
        ScanError::Exec {
            tool,
            message: message.into(),
        }
    }

    /// Builds a parse error carrying a truncated preview of the raw body
    /// so the offending output is available for debugging.
    pub fn parse(tool: &'static str, source: &serde_json::Error, raw: &str) -> Self {
        const PREVIEW_LIMIT: usize = 200;
        let preview: String = raw.chars().take(PREVIEW_LIMIT).collect();
        let message = if raw.chars().count() > PREVIEW_LIMIT {
            format!("{source} - output: {preview}...")
        } else {
            format!("{source} - output: {preview}")
        };
        ScanError::Parse { tool, message }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ScanError::Validation(_))
    }
}
