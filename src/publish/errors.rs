use reqwest::StatusCode;
use std::fmt::{Display, Formatter};
use thiserror::Error;

use crate::fetcher::FetchError;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("github responded {status}: {message} ({classification})")]
    Remote {
        status: StatusCode,
        message: String,
        classification: RemoteFailure,
    },

    #[error("failed to fetch image {url}: {source}")]
    AssetFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("github request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl PublishError {
    /// Status a caller should surface for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidDestination(_) => StatusCode::BAD_REQUEST,
            Self::Remote { status, .. } => *status,
            Self::AssetFetch { .. } | Self::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Why the remote rejected a request, with what the user can do about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFailure {
    BadCredentials,
    NotFound,
    RateLimited,
    Validation,
    Other,
}

impl RemoteFailure {
    pub fn classify(status: StatusCode) -> Self {
        match status.as_u16() {
            401 => Self::BadCredentials,
            404 => Self::NotFound,
            403 | 429 => Self::RateLimited,
            422 => Self::Validation,
            _ => Self::Other,
        }
    }

    pub fn remedy(&self) -> &'static str {
        match self {
            Self::BadCredentials => "check that the token is valid and has not expired",
            Self::NotFound => "check the repository name and that the token can see it",
            Self::RateLimited => {
                "the token lacks permission or hit the rate limit; wait or use another token"
            }
            Self::Validation => "the branch or file may already exist; retry to pick a new branch",
            Self::Other => "retry later",
        }
    }
}

impl Display for RemoteFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.remedy())
    }
}
