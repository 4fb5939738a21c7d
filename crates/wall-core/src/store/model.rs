//! Stored records.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

use crate::{Error, Result};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a user.
    UserId
);
id_type!(
    /// Unique identifier for a block.
    BlockId
);
id_type!(
    /// Unique identifier for a post.
    PostId
);

/// A known author. Posts are attributed by exact match on `email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Database ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Address the user sends from.
    pub email: String,
}

/// A time bucket of posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Database ID.
    pub id: BlockId,
    /// Human-readable title.
    pub title: String,
    /// Start of the bucket; unique across blocks.
    pub created_at: DateTime<Utc>,
}

/// One ingested email, rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Database ID.
    pub id: PostId,
    /// Owning block.
    pub block_id: BlockId,
    /// Author.
    pub user_id: UserId,
    /// Email subject.
    pub title: String,
    /// Rendered HTML body.
    pub body: String,
    /// When the post was ingested.
    pub created_at: DateTime<Utc>,
}

/// A post that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Owning block.
    pub block_id: BlockId,
    /// Author.
    pub user_id: UserId,
    /// Email subject.
    pub title: String,
    /// Rendered HTML body.
    pub body: String,
    /// When the post was ingested.
    pub created_at: DateTime<Utc>,
}

/// Formats a timestamp for storage.
///
/// Fixed microsecond precision in UTC keeps lexical and chronological order
/// identical, and makes equal instants compare equal as text.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::InvalidData(format!("timestamp {raw:?}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(format_timestamp(at), "2024-03-01T08:00:00.000000Z");
        assert_eq!(parse_timestamp(&format_timestamp(at)).unwrap(), at);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(parse_timestamp("yesterday"), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(PostId(42).to_string(), "42");
    }
}
