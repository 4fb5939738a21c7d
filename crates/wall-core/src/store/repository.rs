//! Persistent storage for users, blocks and posts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::debug;

use super::migrations;
use super::model::{
    Block, BlockId, NewPost, Post, PostId, User, UserId, format_timestamp, parse_timestamp,
};
use crate::Result;

/// Storage operations needed to ingest a post.
#[async_trait]
pub trait Store: Send + Sync {
    /// Looks up a user by exact, case-sensitive email address.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns the block with the greatest `created_at`, if any.
    async fn find_latest_block(&self) -> Result<Option<Block>>;

    /// Creates the block starting at `created_at`, or returns the existing one.
    ///
    /// Concurrent callers with the same instant get the same id and only one
    /// row is written.
    async fn create_block(&self, title: &str, created_at: DateTime<Utc>) -> Result<BlockId>;

    /// Inserts a post and returns its id.
    async fn insert_post(&self, post: &NewPost) -> Result<PostId>;
}

/// `SQLite` implementation of [`Store`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database at `database_path`, creating it if missing, and
    /// applies migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn open(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Applies pending schema migrations. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        migrations::migrate(&self.pool).await
    }

    /// Registers a user who may post by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or email is already taken.
    pub async fn add_user(&self, name: &str, email: &str) -> Result<UserId> {
        let result = sqlx::query(
            r"
            INSERT INTO users (name, email, created_at)
            VALUES (?, ?, ?)
            ",
        )
        .bind(name)
        .bind(email)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        let id = UserId(result.last_insert_rowid());
        debug!(user_id = %id, email, "Added user");
        Ok(id)
    }

    /// Lists all blocks, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub async fn list_blocks(&self) -> Result<Vec<Block>> {
        let rows = sqlx::query("SELECT id, title, created_at FROM blocks ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_block).collect()
    }

    /// Lists the posts of a block in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub async fn posts_in_block(&self, block_id: BlockId) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r"
            SELECT id, block_id, user_id, title, body, created_at
            FROM posts
            WHERE block_id = ?
            ORDER BY id
            ",
        )
        .bind(block_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_post).collect()
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| User {
            id: UserId(row.get("id")),
            name: row.get("name"),
            email: row.get("email"),
        }))
    }

    async fn find_latest_block(&self) -> Result<Option<Block>> {
        let row = sqlx::query(
            "SELECT id, title, created_at FROM blocks ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_block).transpose()
    }

    async fn create_block(&self, title: &str, created_at: DateTime<Utc>) -> Result<BlockId> {
        let created_at = format_timestamp(created_at);
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r"
            INSERT INTO blocks (title, created_at)
            VALUES (?, ?)
            ON CONFLICT(created_at) DO NOTHING
            ",
        )
        .bind(title)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let id: i64 = sqlx::query("SELECT id FROM blocks WHERE created_at = ?")
            .bind(&created_at)
            .fetch_one(&mut *tx)
            .await?
            .get("id");

        tx.commit().await?;

        if inserted == 0 {
            debug!(block_id = id, %created_at, "Block already existed");
        } else {
            debug!(block_id = id, %created_at, title, "Created block");
        }
        Ok(BlockId(id))
    }

    async fn insert_post(&self, post: &NewPost) -> Result<PostId> {
        let result = sqlx::query(
            r"
            INSERT INTO posts (block_id, user_id, title, body, created_at)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(post.block_id.0)
        .bind(post.user_id.0)
        .bind(&post.title)
        .bind(&post.body)
        .bind(format_timestamp(post.created_at))
        .execute(&self.pool)
        .await?;

        Ok(PostId(result.last_insert_rowid()))
    }
}

fn row_to_block(row: &SqliteRow) -> Result<Block> {
    let created_at: String = row.get("created_at");
    Ok(Block {
        id: BlockId(row.get("id")),
        title: row.get("title"),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_post(row: &SqliteRow) -> Result<Post> {
    let created_at: String = row.get("created_at");
    Ok(Post {
        id: PostId(row.get("id")),
        block_id: BlockId(row.get("block_id")),
        user_id: UserId(row.get("user_id")),
        title: row.get("title"),
        body: row.get("body"),
        created_at: parse_timestamp(&created_at)?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_find_user_by_email_is_exact() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = store.add_user("ann", "ann@example.com").await.unwrap();

        let user = store
            .find_user_by_email("ann@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.name, "ann");

        assert!(
            store
                .find_user_by_email("Ann@Example.com")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .find_user_by_email("bob@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.add_user("ann", "ann@example.com").await.unwrap();
        assert!(store.add_user("ann2", "ann@example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_latest_block_orders_by_created_at() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.find_latest_block().await.unwrap().is_none());

        let later = store
            .create_block("later", t0() + TimeDelta::days(1))
            .await
            .unwrap();
        store.create_block("earlier", t0()).await.unwrap();

        let latest = store.find_latest_block().await.unwrap().unwrap();
        assert_eq!(latest.id, later);
        assert_eq!(latest.title, "later");
        assert_eq!(latest.created_at, t0() + TimeDelta::days(1));
    }

    #[tokio::test]
    async fn test_create_block_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = store.create_block("a", t0()).await.unwrap();
        let second = store.create_block("b", t0()).await.unwrap();

        assert_eq!(first, second);
        let blocks = store.list_blocks().await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].title, "a");
    }

    #[tokio::test]
    async fn test_concurrent_create_block_writes_one_row() {
        let store = SqliteStore::in_memory().await.unwrap();
        let (a, b) = tokio::join!(store.create_block("x", t0()), store.create_block("x", t0()));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(store.list_blocks().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_create_block_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wall.db");
        let store = Arc::new(SqliteStore::open(path.to_str().unwrap()).await.unwrap());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create_block("x", t0()).await })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap());
        }

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(store.list_blocks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_and_list_posts() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user_id = store.add_user("ann", "ann@example.com").await.unwrap();
        let block_id = store.create_block("b", t0()).await.unwrap();

        let post_id = store
            .insert_post(&NewPost {
                block_id,
                user_id,
                title: "Hello".to_string(),
                body: "<p>World</p>\n".to_string(),
                created_at: t0() + TimeDelta::hours(1),
            })
            .await
            .unwrap();

        let posts = store.posts_in_block(block_id).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, post_id);
        assert_eq!(posts[0].user_id, user_id);
        assert_eq!(posts[0].title, "Hello");
        assert_eq!(posts[0].created_at, t0() + TimeDelta::hours(1));
    }

    #[tokio::test]
    async fn test_open_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wall.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).await.unwrap();
            store.add_user("ann", "ann@example.com").await.unwrap();
        }

        let store = SqliteStore::open(path).await.unwrap();
        assert!(
            store
                .find_user_by_email("ann@example.com")
                .await
                .unwrap()
                .is_some()
        );
    }
}
