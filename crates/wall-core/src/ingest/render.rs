//! Turns a plain-text email body into post markup.

use std::sync::LazyLock;

use pulldown_cmark::{Options, Parser, html};
use regex::Regex;

use crate::media::SubstitutionTable;

#[allow(clippy::expect_used)] // static pattern
static POST_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").expect("valid post reference pattern"));

/// Renders an email body: line endings normalized, markdown rendered,
/// embedded-image placeholders substituted, `#N` references linked.
#[must_use]
pub fn render(body: &str, substitutions: &SubstitutionTable) -> String {
    let normalized = normalize_line_endings(body);
    let markup = render_markdown(&normalized);
    let markup = substitutions.apply(&markup);
    link_post_references(&markup)
}

/// Converts every carriage return to a newline.
///
/// A CRLF pair therefore becomes two newlines, which markdown reads as a
/// paragraph break.
#[must_use]
pub fn normalize_line_endings(body: &str) -> String {
    body.replace('\r', "\n")
}

/// Renders CommonMark to HTML.
#[must_use]
pub fn render_markdown(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::empty());
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Links `#N` to post `N`.
///
/// Matches inside tags and numeric character references such as `&#39;` are
/// left alone. Tag state is carried forward between matches, so the whole
/// markup is scanned once.
#[must_use]
pub fn link_post_references(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut last = 0;
    let mut scanned = 0;
    let mut in_tag = false;

    for caps in POST_REFERENCE.captures_iter(markup) {
        let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        in_tag = track_tag(in_tag, &markup.as_bytes()[scanned..whole.start()]);
        scanned = whole.start();

        if in_tag || markup[..whole.start()].ends_with('&') {
            continue;
        }

        out.push_str(&markup[last..whole.start()]);
        out.push_str(&format!(
            "<a href=\"/post?id={id}\">#{id}</a>",
            id = id.as_str()
        ));
        last = whole.end();
    }

    out.push_str(&markup[last..]);
    out
}

/// Tag state after `chunk`, starting from `in_tag`.
fn track_tag(in_tag: bool, chunk: &[u8]) -> bool {
    chunk.iter().fold(in_tag, |in_tag, &b| match b {
        b'<' => true,
        b'>' => false,
        _ => in_tag,
    })
}
