//! Errors surfaced by remote collaborators.

use thiserror::Error;

/// Failure of a list or directory fetch.
///
/// `Clone` so the latest failure can travel inside published snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("list request failed to reach the server")]
    Transport {
        /// Transport-level detail.
        message: String,
    },
    /// The server answered with a non-success status.
    #[error("list request returned an error status")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason, when available.
        message: Option<String>,
    },
    /// The response body did not match the expected shape.
    #[error("list response could not be decoded")]
    Decode {
        /// Decoder detail.
        message: String,
    },
    /// A directory kept returning full pages past the page limit.
    #[error("directory did not finish within the page limit")]
    Truncated {
        /// Directory being paged.
        directory: String,
        /// Pages fetched before giving up.
        pages: usize,
    },
}

impl FetchError {
    /// Detail carried by the error, for logs and CLI output.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Transport { message } | Self::Decode { message } => Some(message),
            Self::Status { message, .. } => message.as_deref(),
            Self::Truncated { directory, .. } => Some(directory),
        }
    }
}

/// Result alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::FetchError;

    #[test]
    fn display_and_detail() {
        let status = FetchError::Status {
            status: 503,
            message: Some("maintenance".into()),
        };
        assert_eq!(status.to_string(), "list request returned an error status");
        assert_eq!(status.detail(), Some("maintenance"));

        let decode = FetchError::Decode {
            message: "missing field `total`".into(),
        };
        assert_eq!(decode.to_string(), "list response could not be decoded");
        assert_eq!(decode.clone(), decode);
    }
}
