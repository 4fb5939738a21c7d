//! Byte-level multipart body splitting (RFC 2046 §5.1, RFC 7578).
//!
//! Works on raw bytes so that binary form fields and 8-bit message bodies
//! pass through untouched.

use crate::error::{Error, Result};
use memchr::memmem;

/// Splits a multipart body into its raw parts (headers and body of each).
///
/// The preamble before the first delimiter and the epilogue after the close
/// delimiter are discarded. A body that ends without a close delimiter keeps
/// its last part.
///
/// # Errors
///
/// Returns an error if the boundary is empty or never occurs in the body.
pub fn split<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<&'a [u8]>> {
    if boundary.is_empty() {
        return Err(Error::MissingBoundary);
    }

    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut pos = find_delimiter(body, delimiter, 0).ok_or_else(|| {
        Error::InvalidMultipart(format!("boundary {boundary:?} not found"))
    })?;
    let mut parts = Vec::new();

    loop {
        let after = pos + delimiter.len();
        if body[after..].starts_with(b"--") {
            return Ok(parts);
        }

        // Skip transport padding up to the end of the delimiter line
        let Some(newline) = memchr::memchr(b'\n', &body[after..]) else {
            return Ok(parts);
        };
        let content_start = after + newline + 1;

        let Some(next) = find_delimiter(body, delimiter, content_start) else {
            parts.push(trim_line_break(&body[content_start..]));
            return Ok(parts);
        };

        // The line break before a delimiter belongs to the delimiter
        let mut end = next;
        if end > content_start && body[end - 1] == b'\n' {
            end -= 1;
            if end > content_start && body[end - 1] == b'\r' {
                end -= 1;
            }
        }
        parts.push(&body[content_start..end]);
        pos = next;
    }
}

/// Separates the header block of a part from its body.
///
/// Accepts both CRLF and bare LF line endings. A part without a blank line
/// is all headers and has an empty body.
#[must_use]
pub fn split_part(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = raw.strip_prefix(b"\r\n") {
        return (&[], body);
    }
    if let Some(body) = raw.strip_prefix(b"\n") {
        return (&[], body);
    }

    let crlf = memmem::find(raw, b"\r\n\r\n").map(|i| (i, 4));
    let lf = memmem::find(raw, b"\n\n").map(|i| (i, 2));

    let separator = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    match separator {
        Some((i, len)) => (&raw[..i], &raw[i + len..]),
        None => (raw, &[]),
    }
}

/// Finds the next delimiter at or after `from` that fills its own line.
///
/// A line that merely starts with the delimiter, such as `--b0undary` for
/// boundary `b0und`, is content.
fn find_delimiter(body: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut search = from;
    while search <= body.len() {
        let found = search + memmem::find(&body[search..], delimiter)?;
        let starts_line = found == 0 || body[found - 1] == b'\n';
        if starts_line && ends_delimiter(&body[found + delimiter.len()..]) {
            return Some(found);
        }
        search = found + 1;
    }
    None
}

/// Whether `rest` can follow a delimiter: the close marker, transport
/// padding, a line break or the end of the body.
fn ends_delimiter(rest: &[u8]) -> bool {
    match rest.first() {
        None | Some(b' ' | b'\t' | b'\r' | b'\n') => true,
        Some(b'-') => rest.starts_with(b"--"),
        Some(_) => false,
    }
}

fn trim_line_break(part: &[u8]) -> &[u8] {
    part.strip_suffix(b"\r\n")
        .or_else(|| part.strip_suffix(b"\n"))
        .unwrap_or(part)
}
