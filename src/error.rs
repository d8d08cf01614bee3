//! Typed failures raised by the installer pipeline.
//!
//! Both types travel inside `anyhow::Error`; callers that need to branch on
//! them use `downcast_ref`.

use reqwest::StatusCode;

/// The host reported an operating system or architecture with no release asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedPlatformError {
    /// Raw operating system identifier as reported by the host
    OperatingSystem(String),
    /// Raw architecture identifier as reported by the host
    Architecture(String),
}

impl UnsupportedPlatformError {
    /// The raw host value that was not recognised.
    pub fn raw_value(&self) -> &str {
        match self {
            UnsupportedPlatformError::OperatingSystem(raw) => raw,
            UnsupportedPlatformError::Architecture(raw) => raw,
        }
    }
}

impl std::fmt::Display for UnsupportedPlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnsupportedPlatformError::OperatingSystem(raw) => {
                write!(f, "Unsupported OS: {}", raw)
            }
            UnsupportedPlatformError::Architecture(raw) => {
                write!(f, "Unsupported arch: {}", raw)
            }
        }
    }
}

impl std::error::Error for UnsupportedPlatformError {}

/// Fetching a release asset failed.
#[derive(Debug)]
pub enum DownloadError {
    /// Final response was neither a success nor a redirect
    Status { status: StatusCode, url: String },
    /// Connection, DNS, TLS, timeout or body read failure
    Transport { url: String, source: reqwest::Error },
    /// Redirect response without a usable Location header
    MissingLocation { status: StatusCode, url: String },
    /// Redirect chain longer than the configured hop limit
    TooManyRedirects { url: String, limit: usize },
}

impl DownloadError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DownloadError::Status { status, .. } => Some(*status),
            DownloadError::MissingLocation { status, .. } => Some(*status),
            DownloadError::Transport { source, .. } => source.status(),
            DownloadError::TooManyRedirects { .. } => None,
        }
    }

    /// The last URL that was requested.
    pub fn url(&self) -> &str {
        match self {
            DownloadError::Status { url, .. }
            | DownloadError::Transport { url, .. }
            | DownloadError::MissingLocation { url, .. }
            | DownloadError::TooManyRedirects { url, .. } => url,
        }
    }

    /// Transport failures and server errors may succeed on another attempt.
    /// A request reqwest refused to build (bad URL, unsupported scheme) never will.
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::Transport { source, .. } => !source.is_builder(),
            DownloadError::Status { status, .. } => status.is_server_error(),
            DownloadError::MissingLocation { .. } | DownloadError::TooManyRedirects { .. } => {
                false
            }
        }
    }
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadError::Status { status, url } => {
                write!(f, "HTTP {} for {}", status.as_u16(), url)
            }
            DownloadError::Transport { url, source } => {
                write!(f, "Request to {} failed: {}", url, source)
            }
            DownloadError::MissingLocation { status, url } => {
                write!(
                    f,
                    "HTTP {} redirect without a Location header for {}",
                    status.as_u16(),
                    url
                )
            }
            DownloadError::TooManyRedirects { url, limit } => {
                write!(f, "More than {} redirects, last URL {}", limit, url)
            }
        }
    }
}

impl std::error::Error for DownloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DownloadError::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}
