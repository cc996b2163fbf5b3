//! Custom error types and result handling for chapterwise operations.
//!
//! This module defines the internal error type used by every pipeline stage.
//! All fallible operations return a [`Result<T>`] which is a type alias for
//! `std::result::Result<T, Error>`. The orchestrators in [`crate::importer`] convert
//! these into [`ImportError`](crate::types::ImportError) records instead of propagating them.
//!
use crate::types::ImportErrorKind;

/// Type alias for Results with chapterwise errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all chapterwise operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Regular expression parsing errors
    #[error(transparent)]
    Regex(#[from] regex::Error),
    /// ZIP archive errors raised while decoding DOCX/EPUB containers
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Semaphore(#[from] tokio::sync::AcquireError),
    #[error(transparent)]
    ConfigBuilder(#[from] crate::importer::ImportConfigBuilderError),
    /// The source could not be turned into normalized text
    #[error("Parse error: {0}")]
    Parse(String),
    /// Declared or detected encoding could not be applied
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// Unknown or unsupported file type
    #[error("Unsupported format: {0}")]
    Format(String),
    /// Source exceeds the configured size limit
    #[error("Size limit exceeded: {0}")]
    Size(String),
    /// A matcher or filter rejected its input (e.g. an invalid regex)
    #[error("Content error: {0}")]
    Content(String),
    /// Error for unsupported operations (e.g. a collaborator capability that is not implemented)
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// Error for resources that couldn't be found (e.g. source directory, archive entry)
    #[error("Not found: {0}")]
    NotFound(String),
    /// Other errors that don't fit into specific categories
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Maps this error onto the import error taxonomy reported to callers.
    pub fn kind(&self) -> ImportErrorKind {
        match self {
            Error::Encoding(_) => ImportErrorKind::Encoding,
            Error::Format(_) | Error::Unsupported(_) => ImportErrorKind::Format,
            Error::Size(_) => ImportErrorKind::Size,
            Error::Content(_) | Error::Regex(_) | Error::ConfigBuilder(_) => {
                ImportErrorKind::Content
            }
            Error::Io(_)
            | Error::Zip(_)
            | Error::Join(_)
            | Error::Semaphore(_)
            | Error::Parse(_)
            | Error::NotFound(_)
            | Error::Other(_) => ImportErrorKind::Parse,
        }
    }
}

// Basic From<String> conversion for convenience
impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Other(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Other(error.to_string())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
