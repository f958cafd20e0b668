use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("http error: {0}")]
    Http(Box<ureq::Error>),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("feed not found")]
    FeedNotFound,
    #[error("feed server error: {status} {reason}")]
    FeedServerError { status: u16, reason: String },
    #[error("feed returned {status} {reason}")]
    FeedStatus { status: u16, reason: String },
    #[error("feed returned an empty response")]
    FeedEmpty,
    #[error("feed returned a bad payload: {0}")]
    FeedMalformed(String),
    #[error("download failed: {status} {reason}")]
    DownloadStatus { status: u16, reason: String },
    #[error("invalid file pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
    #[error("digest mismatch")]
    DigestMismatch,
    #[error("tls configuration error: {0}")]
    TlsConfig(String),
}

impl From<ureq::Error> for UpdateError {
    fn from(error: ureq::Error) -> UpdateError {
        UpdateError::Http(Box::new(error))
    }
}

pub type UpdateResult<T> = Result<T, UpdateError>;
