//! Pulls the raw email out of a webhook form submission.

use wall_mime::{ContentType, Part, multipart};

use super::IngestError;

/// Name of the form field carrying the raw message.
pub const EMAIL_FIELD: &str = "email";

/// The raw bytes of one email, as delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnvelope(Vec<u8>);

impl RawEnvelope {
    /// Wraps raw message bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The message bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Extracts the `email` field from a multipart request body.
///
/// # Errors
///
/// Returns [`IngestError::MalformedRequest`] if the content type is absent,
/// unparsable, not multipart, or lacks a boundary, or if the body is not
/// split by that boundary. Returns [`IngestError::MissingEmailField`] if no
/// part is named `email`.
pub fn extract_envelope(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<RawEnvelope, IngestError> {
    let content_type = content_type
        .ok_or_else(|| IngestError::MalformedRequest("missing Content-Type".to_string()))?;
    let content_type = ContentType::parse(content_type)
        .map_err(|e| IngestError::MalformedRequest(e.to_string()))?;

    if !content_type.is_multipart() {
        return Err(IngestError::MalformedRequest(format!(
            "expected multipart body, got {content_type}"
        )));
    }
    let boundary = content_type
        .boundary()
        .ok_or_else(|| IngestError::MalformedRequest("missing boundary".to_string()))?;

    let parts = multipart::split(body, boundary)
        .map_err(|e| IngestError::MalformedRequest(e.to_string()))?;

    parts
        .into_iter()
        .map(Part::parse)
        .find(|part| {
            part.disposition()
                .is_some_and(|d| d.name() == Some(EMAIL_FIELD))
        })
        .map(|part| RawEnvelope(part.body))
        .ok_or(IngestError::MissingEmailField)
}
