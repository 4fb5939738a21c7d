//! Ingestion failures.

use thiserror::Error;

/// Why a delivered email did not become a post.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The request is not a usable multipart form.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The form has no part named `email`.
    #[error("No \"email\" field in form")]
    MissingEmailField,

    /// The email itself could not be parsed.
    #[error("Failed to parse message: {0}")]
    MessageParse(#[from] wall_mime::Error),

    /// The email names no sender.
    #[error("Message has no sender")]
    NoSender,

    /// The sender is not a known user.
    #[error("Unknown sender: {0}")]
    UnknownSender(String),

    /// No block was ever seeded.
    #[error("No blocks configured; seed one before ingesting")]
    NoBlocksConfigured,

    /// An embedded file could not be written.
    #[error("Failed to store {file_name}: {source}")]
    StorageWrite {
        /// Storage name of the file.
        file_name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A query or insert failed.
    #[error("Database error: {0}")]
    Database(#[from] crate::Error),
}
