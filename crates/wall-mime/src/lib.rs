//! # wall-mime
//!
//! MIME parsing for inbound email webhooks.
//!
//! ## Features
//!
//! - **Message parsing**: RFC 5322 messages with nested multipart bodies
//! - **Form data**: byte-level `multipart/form-data` splitting
//! - **Decoding**: Base64, Quoted-Printable, RFC 2047 words, charsets
//! - **Addresses**: display names, groups and comments in address lists
//! - **Classification**: text, HTML, inline files and attachments
//!
//! ## Quick Start
//!
//! ```ignore
//! use wall_mime::Message;
//!
//! let raw = b"From: Ann <ann@example.com>\r\n\
//!             Subject: Test\r\n\
//!             \r\n\
//!             Hello, World!";
//!
//! let message = Message::parse(raw)?;
//! println!("From: {}", message.from()[0]);
//! println!("Body: {}", message.text_body()?);
//! for part in message.inline_parts() {
//!     println!("inline {:?} {:?}", part.content_id(), part.file_name());
//! }
//! ```
//!
//! ### Form data
//!
//! ```ignore
//! use wall_mime::{ContentType, Part, multipart};
//!
//! let ct = ContentType::parse("multipart/form-data; boundary=xyz")?;
//! for raw in multipart::split(body, ct.boundary().unwrap_or_default())? {
//!     let part = Part::parse(raw);
//!     println!("{:?}", part.disposition().and_then(|d| d.name().map(str::to_string)));
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;
pub mod multipart;

pub use address::Address;
pub use content_type::{ContentDisposition, ContentType, DispositionKind};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, PartKind, TransferEncoding};
