use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the language center client and resolver.
///
/// A missing translation is never an error: the resolver returns the
/// requested key instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote API answered with a non-success status.
    #[error("Language center API returned status {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    /// The request never completed (connection, timeout, undecodable body).
    #[error("Language center request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A key without the `group.item` separator.
    #[error("Invalid translation key '{0}': missing [.] separator")]
    InvalidKey(String),

    #[error("Cache store I/O failed: {0}")]
    StoreIo(#[from] std::io::Error),

    #[error("Cache store data is malformed: {0}")]
    StoreFormat(#[from] serde_json::Error),

    #[error("Failed to load strings from {}: {message}", path.display())]
    Loader { path: PathBuf, message: String },
}

impl Error {
    /// Whether the error came from talking to the remote API.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::RemoteStatus { .. } | Error::Transport(_))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RemoteStatus { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
