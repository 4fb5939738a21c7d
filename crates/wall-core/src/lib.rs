//! # wall-core
//!
//! Turns emails delivered by a webhook into posts on a shared wall.
//!
//! This crate provides:
//! - Envelope extraction from `multipart/form-data` webhook bodies
//! - Message parsing into sender, subject, body and embedded files
//! - Embedded image storage and placeholder substitution
//! - Markdown rendering with `#N` post links
//! - Time-windowed blocks opened on a fixed cadence
//! - `SQLite` storage for users, blocks and posts
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use wall_core::{BlockSchedule, FsMediaStore, Ingestor, SqliteStore};
//!
//! let store = SqliteStore::open("wall.db").await?;
//! let ingestor = Ingestor::new(
//!     Arc::new(store),
//!     Arc::new(FsMediaStore::new("images")),
//!     BlockSchedule::default(),
//! );
//! let ingested = ingestor
//!     .ingest_request(Some(content_type), &body, chrono::Utc::now())
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod ingest;
pub mod media;
pub mod schedule;
pub mod store;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use ingest::{Aborted, IngestError, Ingested, Ingestor, Stage};
pub use media::{FsMediaStore, MediaStore};
pub use schedule::BlockSchedule;
pub use store::{Block, BlockId, Post, PostId, SqliteStore, Store, User, UserId};
