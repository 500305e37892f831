use std::io;
use thiserror::Error;

/// Errors that stop a localization run.
///
/// Tolerated HTTP failures (see `FetchConfig::skip_errors`) never surface as
/// an error; they are recorded in the run report instead.
#[derive(Debug, Error)]
pub enum LocalizeError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("cannot localize `{url}`: scheme `{scheme}` is not http or https")]
    InvalidUrlScheme { url: String, scheme: String },

    #[error("failed to fetch {url}: {reason}")]
    HttpFetch {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl LocalizeError {
    pub fn invalid_url(url: &str, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Io { .. } => 1,
            Self::InvalidUrl { .. } | Self::InvalidUrlScheme { .. } => 2,
            Self::HttpFetch { .. } => 3,
        }
    }
}

pub type Result<T, E = LocalizeError> = std::result::Result<T, E>;
