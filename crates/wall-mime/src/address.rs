//! RFC 5322 address lists.

use crate::encoding::decode_header_value;
use std::fmt;

/// A mailbox: optional display name plus address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name, decoded.
    pub name: Option<String>,
    /// The `local@domain` address.
    pub address: String,
}

impl Address {
    /// Parses an address list such as `"Ann" <ann@example.com>, bob@example.com`.
    ///
    /// Entries without an `@` are dropped. Group syntax (`team: a@x, b@y;`)
    /// is flattened into its members.
    #[must_use]
    pub fn parse_list(value: &str) -> Vec<Self> {
        split_top_level(value)
            .into_iter()
            .filter_map(Self::parse_one)
            .collect()
    }

    fn parse_one(entry: &str) -> Option<Self> {
        let entry = strip_group_prefix(entry.trim()).trim_end_matches(';').trim();

        if let Some(open) = entry.rfind('<') {
            let close = entry[open..].find('>').map_or(entry.len(), |i| open + i);
            let address = entry[open + 1..close].trim().to_string();
            let name = clean_display_name(&entry[..open]);
            return address.contains('@').then_some(Self { name, address });
        }

        // `addr@example.com (Display Name)`
        let (address, comment) = match entry.find('(') {
            Some(open) => {
                let close = entry[open..].find(')').map_or(entry.len(), |i| open + i);
                (entry[..open].trim(), Some(&entry[open + 1..close]))
            }
            None => (entry, None),
        };

        address.contains('@').then(|| Self {
            name: comment.and_then(clean_display_name),
            address: address.to_string(),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "\"{name}\" <{}>", self.address),
            None => write!(f, "<{}>", self.address),
        }
    }
}

fn clean_display_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .map_or_else(|| trimmed.to_string(), |v| v.replace("\\\"", "\""));
    let decoded = decode_header_value(&unquoted);
    let decoded = decoded.trim();
    (!decoded.is_empty()).then(|| decoded.to_string())
}

/// Drops a leading `group-name:` when the colon precedes any address syntax.
fn strip_group_prefix(entry: &str) -> &str {
    match entry.find(':') {
        Some(colon) if !entry[..colon].contains(['@', '<', '"']) => &entry[colon + 1..],
        _ => entry,
    }
}

/// Splits on commas that are outside quotes, angle brackets and comments.
fn split_top_level(value: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut in_quotes = false;
    let mut angle_depth = 0_u32;
    let mut paren_depth = 0_u32;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in value.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => angle_depth += 1,
            '>' if !in_quotes => angle_depth = angle_depth.saturating_sub(1),
            '(' if !in_quotes => paren_depth += 1,
            ')' if !in_quotes => paren_depth = paren_depth.saturating_sub(1),
            ',' if !in_quotes && angle_depth == 0 && paren_depth == 0 => {
                entries.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&value[start..]);
    entries.retain(|e| !e.trim().is_empty());
    entries
}
