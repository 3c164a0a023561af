//! Custom error types and result handling for cbz2pdf operations.
//!
//! This module defines the error taxonomy used throughout the conversion pipeline.
//! All operations return a [`Result<T>`] which is a type alias for `std::result::Result<T, Error>`.
//!
//! Only job-level failures ever reach the caller of [`crate::Converter`]. Per-entry
//! ([`Error::EntryDecode`]) and per-source ([`Error::SourceUnreadable`]) failures are
//! reported through the progress channel and skipped.
use std::path::PathBuf;

/// Type alias for Results with cbz2pdf errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all cbz2pdf operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Image decoding errors
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// ZIP archive errors
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// PDF assembly errors
    #[error(transparent)]
    Pdf(#[from] lopdf::Error),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Builder(#[from] crate::request::ConversionRequestBuilderError),
    /// Error for invalid file or directory paths
    #[error("The given path '{0:?}' is invalid: {1}")]
    InvalidPath(PathBuf, String),
    /// A scratch copy could not be opened as a ZIP container
    #[error("Invalid archive '{0:?}': {1}")]
    InvalidArchive(PathBuf, String),
    /// One input could not be opened or copied to scratch storage
    #[error("Source '{source_ref}' is unreadable: {reason}")]
    SourceUnreadable { source_ref: String, reason: String },
    /// One archive entry could not be read or decoded as an image
    #[error("Entry '{entry}' could not be decoded: {reason}")]
    EntryDecode { entry: String, reason: String },
    /// Merging was requested but none of the sources could be read
    #[error("None of the {0} source(s) could be read")]
    NoReadableSources(usize),
    /// The job finished without producing a single page
    #[error("No PDF files created, {0}")]
    EmptyResult(String),
    /// The output directory could not be resolved or created
    #[error("Cannot use output directory '{path:?}': {reason}")]
    OutputDirectory { path: PathBuf, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A conversion is already running on this converter
    #[error("A conversion is already in progress")]
    Busy,
    #[error("Conversion was cancelled")]
    Cancelled,
    /// Other errors that don't fit into specific categories
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Whether this error only affects a single page or source and the job may go on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::EntryDecode { .. } | Error::SourceUnreadable { .. }
        )
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
