//! MIME message structure and handling.

use crate::address::Address;
use crate::content_type::{ContentDisposition, ContentType, DispositionKind};
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::multipart;

/// Maximum nesting of multipart containers before parsing gives up.
const MAX_DEPTH: usize = 16;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

/// How a leaf part is presented to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// A `text/plain` body.
    Text,
    /// A `text/html` body.
    Html,
    /// A file displayed inside the message (usually an image with a Content-ID).
    Inline,
    /// A file offered for download.
    Attachment,
}

/// MIME message part.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body (raw, still transfer-encoded).
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Parses a raw part: a header block, a blank line, and a body.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let (header_bytes, body) = multipart::split_part(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(header_bytes));
        Self::new(headers, body.to_vec())
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers.content_type()
    }

    /// Gets the content disposition, if any.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers.content_disposition()
    }

    /// Gets the Content-ID without its angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<String> {
        self.headers
            .get("content-id")
            .map(|cid| cid.trim().trim_start_matches('<').trim_end_matches('>').to_string())
            .filter(|cid| !cid.is_empty())
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Gets the declared file name: the disposition `filename`, falling back
    /// to the content type `name`.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename().map(str::to_string))
            .or_else(|| {
                self.content_type()
                    .ok()
                    .and_then(|ct| ct.name().map(str::to_string))
            })
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if Base64 decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&self.body),
            TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(&self.body)),
            _ => Ok(self.body.clone()),
        }
    }

    /// Gets the decoded body as a string, honouring the declared charset.
    ///
    /// # Errors
    ///
    /// Returns an error if transfer decoding fails.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        let charset = self
            .content_type()
            .ok()
            .and_then(|ct| ct.charset().map(str::to_string))
            .unwrap_or_else(|| "utf-8".to_string());
        Ok(decode_charset(&decoded, &charset))
    }

    /// Classifies the part.
    ///
    /// Explicit attachments win; otherwise plain and HTML text are bodies,
    /// and any other part that is inline or carries a Content-ID is an
    /// inline file. Everything else is an attachment.
    #[must_use]
    pub fn kind(&self) -> PartKind {
        let content_type = self
            .content_type()
            .unwrap_or_else(|_| ContentType::octet_stream());
        let disposition = self.disposition().map(|d| d.kind);

        if disposition == Some(DispositionKind::Attachment) {
            return PartKind::Attachment;
        }

        let named_inline = disposition == Some(DispositionKind::Inline) && self.file_name().is_some();
        if content_type.is_text() && !named_inline {
            match content_type.sub_type.as_str() {
                "plain" => return PartKind::Text,
                "html" => return PartKind::Html,
                _ => {}
            }
        }

        if disposition == Some(DispositionKind::Inline) || self.content_id().is_some() {
            PartKind::Inline
        } else {
            PartKind::Attachment
        }
    }
}

/// MIME message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Leaf parts in document order. Multipart containers are flattened;
    /// a single-part message has one part carrying the message headers.
    pub parts: Vec<Part>,
}

impl Message {
    /// Parses a raw RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, has no header block, declares
    /// a malformed content type, or contains a broken multipart structure.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::MalformedMessage("empty message".to_string()));
        }

        let (header_bytes, body) = multipart::split_part(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(header_bytes));
        if headers.is_empty() {
            return Err(Error::MalformedMessage("message has no headers".to_string()));
        }

        let content_type = headers.content_type()?;
        let mut parts = Vec::new();
        if content_type.is_multipart() {
            collect_leaves(&content_type, body, 0, &mut parts)?;
        } else {
            parts.push(Part::new(headers.clone(), body.to_vec()));
        }

        Ok(Self { headers, parts })
    }

    /// Gets the From header as a list of mailboxes.
    #[must_use]
    pub fn from(&self) -> Vec<Address> {
        self.headers
            .get("from")
            .map(Address::parse_list)
            .unwrap_or_default()
    }

    /// Gets the decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers.get_decoded("subject")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("message-id")
    }

    /// Concatenates every `text/plain` body part, separated by newlines.
    ///
    /// Returns an empty string when the message has no plain-text body.
    ///
    /// # Errors
    ///
    /// Returns an error if a text part cannot be decoded.
    pub fn text_body(&self) -> Result<String> {
        let texts = self
            .parts_of_kind(PartKind::Text)
            .map(Part::body_text)
            .collect::<Result<Vec<_>>>()?;
        Ok(texts.join("\n"))
    }

    /// Finds the first `text/html` body part.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTML part cannot be decoded.
    pub fn html_body(&self) -> Result<Option<String>> {
        self.parts_of_kind(PartKind::Html)
            .next()
            .map(Part::body_text)
            .transpose()
    }

    /// Iterates over inline files (embedded images and the like).
    pub fn inline_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts_of_kind(PartKind::Inline)
    }

    /// Iterates over attachments.
    pub fn attachments(&self) -> impl Iterator<Item = &Part> {
        self.parts_of_kind(PartKind::Attachment)
    }

    fn parts_of_kind(&self, kind: PartKind) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(move |p| p.kind() == kind)
    }
}

fn collect_leaves(
    content_type: &ContentType,
    body: &[u8],
    depth: usize,
    out: &mut Vec<Part>,
) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Err(Error::NestingTooDeep(MAX_DEPTH));
    }

    let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
    for raw in multipart::split(body, boundary)? {
        let part = Part::parse(raw);
        match part.content_type() {
            Ok(child) if child.is_multipart() => {
                collect_leaves(&child, &part.body, depth + 1, out)?;
            }
            _ => out.push(part),
        }
    }

    Ok(())
}
