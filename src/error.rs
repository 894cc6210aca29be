// src/error.rs

use thiserror::Error;

/// Core error types for repodiff
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with path context
    #[error("I/O error: {0}")]
    IoError(String),

    /// Metadata document could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Declared package count disagrees with the parsed entries
    #[error("Declared package count {declared} does not match the {parsed} packages parsed")]
    CountMismatch { declared: usize, parsed: usize },

    /// Metadata document decoded to zero records
    #[error("No packages found in {0}")]
    EmptyDocument(String),

    /// Document root is not the element the decoder expects
    #[error("Expected root element <{expected}> but found <{found}>")]
    UnexpectedRoot { expected: String, found: String },

    /// Remote metadata could not be fetched
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Document contents do not hash to the manifest checksum
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Checksum algorithm not supported by the verifier
    #[error("Unsupported checksum type: {0}")]
    UnsupportedChecksum(String),

    /// Required input does not exist
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Component setup failed
    #[error("Initialization error: {0}")]
    InitError(String),
}

impl Error {
    /// Errors that make one side of the comparison unavailable instead of
    /// aborting the run
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Error::DownloadError(_) | Error::ChecksumMismatch { .. } | Error::UnsupportedChecksum(_)
        )
    }
}

/// Result type alias using repodiff's Error type
pub type Result<T> = std::result::Result<T, Error>;
