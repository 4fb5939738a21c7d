//! Users, blocks and posts in `SQLite`.

mod migrations;
mod model;
mod repository;

pub use model::{Block, BlockId, NewPost, Post, PostId, User, UserId};
pub use repository::{SqliteStore, Store};
