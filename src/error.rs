use thiserror::Error;

/// Classified failure from a remote asset fetch. The batch continues after
/// any of these.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "FETCH_INVALID_ID",
            Self::NotFound(_) => "FETCH_NOT_FOUND",
            Self::RateLimited(_) => "FETCH_RATE_LIMITED",
            Self::Other(_) => "FETCH_FAILED",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Other(err.to_string())
    }
}

/// Classified failure from publishing an asset. An unpublished item stays
/// unmapped and is retried on the next run.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("release creation failed: {0}")]
    ReleaseCreation(String),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl PublishError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReleaseCreation(_) => "PUBLISH_RELEASE",
            Self::Upload(_) => "PUBLISH_UPLOAD",
            Self::Transport(_) => "PUBLISH_TRANSPORT",
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        PublishError::Transport(err.to_string())
    }
}
