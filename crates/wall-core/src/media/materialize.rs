//! Persists embedded files and maps their placeholders to markup.

use tracing::debug;

use super::{MediaStore, SubstitutionTable};
use crate::ingest::{EmbeddedFile, IngestError};

/// Public URL path under which stored media is served.
pub const MEDIA_URL_PREFIX: &str = "images/";

/// Owner read-only.
pub const MEDIA_FILE_MODE: u32 = 0o400;

/// Storage name for an embedded file: `{content_id}-{display_name}`, with
/// anything outside `[A-Za-z0-9._@-]` replaced so the name is a single safe
/// path segment.
#[must_use]
pub fn storage_file_name(content_id: &str, display_name: &str) -> String {
    let raw = format!("{content_id}-{display_name}");
    let mut name: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.starts_with('.') {
        name.replace_range(..1, "_");
    }
    name
}

/// Writes every embedded file and returns the placeholder table for the
/// images among them.
///
/// Files are written in order; a failure stops the loop and leaves earlier
/// files in place.
///
/// # Errors
///
/// Returns [`IngestError::StorageWrite`] naming the first file that could
/// not be written.
pub async fn materialize(
    store: &dyn MediaStore,
    files: &[EmbeddedFile],
) -> Result<SubstitutionTable, IngestError> {
    let mut table = SubstitutionTable::new();

    for file in files {
        let display_name = file.display_name.as_deref().unwrap_or_default();
        let file_name = storage_file_name(&file.content_id, display_name);

        store
            .write(&file_name, &file.data, MEDIA_FILE_MODE)
            .await
            .map_err(|source| IngestError::StorageWrite {
                file_name: file_name.clone(),
                source,
            })?;

        if !file.is_image() {
            debug!(file_name, media_type = %file.media_type, "Stored non-image embedded file");
            continue;
        }

        let tag = format!("<img src=\"/{MEDIA_URL_PREFIX}{file_name}\">");
        for placeholder in placeholders(display_name) {
            table.push(placeholder, tag.clone());
        }
    }

    Ok(table)
}

/// The `[image: name]` token as it appears in rendered markup.
///
/// Markdown output escapes `&`, `<` and `>` in text, and some renderers
/// also escape quotes, so both forms are matched.
fn placeholders(display_name: &str) -> Vec<String> {
    let text = display_name
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    let quoted = text.replace('"', "&quot;");

    let mut out = vec![format!("[image: {text}]")];
    if quoted != text {
        out.push(format!("[image: {quoted}]"));
    }
    out
}
