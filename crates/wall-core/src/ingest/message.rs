//! The parts of an email that become a post.

use wall_mime::{Address, ContentType, Message, Part};

use super::IngestError;
use super::envelope::RawEnvelope;

/// A file referenced from the body by Content-ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFile {
    /// Content-ID without angle brackets.
    pub content_id: String,
    /// Media type essence, e.g. `image/png`.
    pub media_type: String,
    /// Declared file name, if any.
    pub display_name: Option<String>,
    /// Decoded bytes.
    pub data: Vec<u8>,
}

impl EmbeddedFile {
    /// Returns `true` for `image/*` files, the only ones rendered inline.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.media_type
            .split('/')
            .next()
            .is_some_and(|main| main.eq_ignore_ascii_case("image"))
    }
}

/// A file sent alongside the message. Logged, not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Declared file name, if any.
    pub file_name: Option<String>,
    /// Media type essence.
    pub media_type: String,
    /// Decoded bytes.
    pub data: Vec<u8>,
}

/// An email reduced to what ingestion needs.
///
/// [`ParsedMessage::parse`] only yields messages with at least one sender.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    /// From addresses in header order.
    pub senders: Vec<Address>,
    /// Decoded subject, empty if absent.
    pub subject: String,
    /// Plain-text body, empty if the message has none.
    pub text_body: String,
    /// Inline files with a Content-ID.
    pub embedded_files: Vec<EmbeddedFile>,
    /// Everything else that is not a body.
    pub attachments: Vec<Attachment>,
}

impl ParsedMessage {
    /// Parses the raw email carried by an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MessageParse`] if the MIME structure or a part
    /// encoding is broken, and [`IngestError::NoSender`] if no From address
    /// can be read.
    pub fn parse(envelope: &RawEnvelope) -> Result<Self, IngestError> {
        let message = Message::parse(envelope.as_bytes())?;

        let senders = message.from();
        if senders.is_empty() {
            return Err(IngestError::NoSender);
        }

        let mut embedded_files = Vec::new();
        let mut attachments = Vec::new();

        for part in message.inline_parts() {
            match part.content_id() {
                Some(content_id) => embedded_files.push(EmbeddedFile {
                    content_id,
                    media_type: media_type(part),
                    display_name: part.file_name(),
                    data: part.decode_body()?,
                }),
                None => attachments.push(attachment(part)?),
            }
        }
        for part in message.attachments() {
            attachments.push(attachment(part)?);
        }

        Ok(Self {
            senders,
            subject: message.subject().unwrap_or_default(),
            text_body: message.text_body()?,
            embedded_files,
            attachments,
        })
    }

    /// The address posts are attributed to, the first From address.
    #[must_use]
    pub fn primary_sender(&self) -> Option<&Address> {
        self.senders.first()
    }
}

fn media_type(part: &Part) -> String {
    part.content_type()
        .unwrap_or_else(|_| ContentType::octet_stream())
        .essence()
}

fn attachment(part: &Part) -> Result<Attachment, IngestError> {
    Ok(Attachment {
        file_name: part.file_name(),
        media_type: media_type(part),
        data: part.decode_body()?,
    })
}
