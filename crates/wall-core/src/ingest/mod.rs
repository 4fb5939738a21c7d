//! Email-to-post ingestion.

mod envelope;
mod error;
mod message;
mod pipeline;
mod render;

pub use envelope::{EMAIL_FIELD, RawEnvelope, extract_envelope};
pub use error::IngestError;
pub use message::{Attachment, EmbeddedFile, ParsedMessage};
pub use pipeline::{Aborted, Ingested, Ingestor, Stage};
pub use render::{link_post_references, normalize_line_endings, render, render_markdown};
