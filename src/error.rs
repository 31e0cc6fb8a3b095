//! Error taxonomy for the ingestion pipeline.
//!
//! Each side-effecting component has its own error enum. Errors that may
//! resolve on their own expose `is_transient()`, which is what
//! [`crate::retry::RetryPolicy`] consults before backing off.

use thiserror::Error;

/// Failure fetching a remote resource over HTTP.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("http error {status}")]
    Http { status: reqwest::StatusCode },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    /// Any status or transport failure is worth another attempt; a malformed
    /// URL never is.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }
}

/// Structural failures: the page does not look like an article.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no content container matched")]
    NoContainer,

    #[error("no heading found")]
    NoHeading,
}

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation backend returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected translation payload: {0}")]
    Payload(String),
}

/// Failure in the remote file store session.
#[derive(Error, Debug)]
pub enum FileStoreError {
    #[error("ftp: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("image download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("image decode/encode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("temporary file error: {0}")]
    TempFile(std::io::Error),

    #[error("file store error: {0}")]
    Store(#[from] FileStoreError),
}

impl MediaError {
    /// Transport and file-store protocol errors are retried; decode/encode
    /// errors fail immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_transient(),
            Self::Store(_) => true,
            Self::Image(_) | Self::TempFile(_) => false,
        }
    }
}

/// Failure inserting into the relational content store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transient storage error: {0}")]
    Transient(String),

    #[error("storage error: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

// MySQL lock wait timeout and deadlock.
const MYSQL_TRANSIENT_CODES: [&str; 2] = ["1205", "1213"];

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Transient(err.to_string()),
            sqlx::Error::Database(db)
                if db
                    .code()
                    .is_some_and(|code| MYSQL_TRANSIENT_CODES.contains(&code.as_ref())) =>
            {
                Self::Transient(err.to_string())
            }
            _ => Self::Permanent(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("article title is empty")]
    EmptyTitle,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger backend error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for LedgerError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification rejected with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("credential error: {0}")]
    Credentials(String),
}

impl From<jsonwebtoken::errors::Error> for NotifyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Credentials(err.to_string())
    }
}
