//! Errors raised while parsing messages and form data.

use thiserror::Error;

/// Why a message or one of its parts could not be read.
#[derive(Debug, Error)]
pub enum Error {
    /// A `Content-Type` value is not `type/subtype`.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// A base64 body does not decode.
    #[error("Invalid base64 body: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A multipart body has no boundary parameter.
    #[error("Multipart body without boundary")]
    MissingBoundary,

    /// A multipart body does not contain its boundary.
    #[error("Invalid multipart body: {0}")]
    InvalidMultipart(String),

    /// Multipart containers are nested beyond the supported depth.
    #[error("Multipart nesting exceeds {0} levels")]
    NestingTooDeep(usize),

    /// The input is not a message at all.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
