//! In-memory fakes for the storage collaborators.

#![allow(clippy::unwrap_used)]

use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::media::MediaStore;
use crate::store::{Block, BlockId, NewPost, Post, PostId, Store, User, UserId};
use crate::{Error, Result};

/// A store call, as observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    FindUser(String),
    FindLatestBlock,
    CreateBlock(DateTime<Utc>),
    InsertPost(BlockId, UserId),
}

#[derive(Default)]
struct State {
    users: Vec<User>,
    blocks: Vec<Block>,
    posts: Vec<Post>,
    calls: Vec<StoreCall>,
    fail_inserts: bool,
}

/// A [`Store`] that keeps rows in memory and records every trait call.
/// Seeding helpers are not recorded.
#[derive(Default)]
pub struct RecordingStore {
    state: Mutex<State>,
}

impl RecordingStore {
    pub fn add_user(&self, name: &str, email: &str) -> UserId {
        let mut state = self.state.lock().unwrap();
        let id = UserId(i64::try_from(state.users.len()).unwrap() + 1);
        state.users.push(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
        });
        id
    }

    pub fn seed_block(&self, created_at: DateTime<Utc>) -> BlockId {
        let mut state = self.state.lock().unwrap();
        push_block(&mut state, "seed", created_at)
    }

    pub fn fail_inserts(&self) {
        self.state.lock().unwrap().fail_inserts = true;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state.lock().unwrap().posts.clone()
    }
}

fn push_block(state: &mut State, title: &str, created_at: DateTime<Utc>) -> BlockId {
    if let Some(block) = state.blocks.iter().find(|b| b.created_at == created_at) {
        return block.id;
    }
    let id = BlockId(i64::try_from(state.blocks.len()).unwrap() + 1);
    state.blocks.push(Block {
        id,
        title: title.to_string(),
        created_at,
    });
    id
}

#[async_trait]
impl Store for RecordingStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::FindUser(email.to_string()));
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_latest_block(&self) -> Result<Option<Block>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::FindLatestBlock);
        Ok(state.blocks.iter().max_by_key(|b| b.created_at).cloned())
    }

    async fn create_block(&self, title: &str, created_at: DateTime<Utc>) -> Result<BlockId> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::CreateBlock(created_at));
        Ok(push_block(&mut state, title, created_at))
    }

    async fn insert_post(&self, post: &NewPost) -> Result<PostId> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(StoreCall::InsertPost(post.block_id, post.user_id));
        if state.fail_inserts {
            return Err(Error::Io(io::Error::other("insert refused")));
        }

        let id = PostId(i64::try_from(state.posts.len()).unwrap() + 1);
        state.posts.push(Post {
            id,
            block_id: post.block_id,
            user_id: post.user_id,
            title: post.title.clone(),
            body: post.body.clone(),
            created_at: post.created_at,
        });
        Ok(id)
    }
}

/// A [`MediaStore`] holding files in memory, optionally refusing one name.
#[derive(Default)]
pub struct MemoryMediaStore {
    files: Mutex<Vec<(String, Vec<u8>, u32)>>,
    fail_on: Option<String>,
}

impl MemoryMediaStore {
    pub fn failing_on(file_name: &str) -> Self {
        Self {
            files: Mutex::default(),
            fail_on: Some(file_name.to_string()),
        }
    }

    pub fn file_names(&self) -> Vec<String> {
        let files = self.files.lock().unwrap();
        files.iter().map(|(name, _, _)| name.clone()).collect()
    }

    pub fn mode_of(&self, file_name: &str) -> Option<u32> {
        let files = self.files.lock().unwrap();
        files
            .iter()
            .find(|(name, _, _)| name == file_name)
            .map(|(_, _, mode)| *mode)
    }

    pub fn bytes_of(&self, file_name: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().unwrap();
        files
            .iter()
            .find(|(name, _, _)| name == file_name)
            .map(|(_, data, _)| data.clone())
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn write(&self, file_name: &str, data: &[u8], mode: u32) -> io::Result<()> {
        if self.fail_on.as_deref() == Some(file_name) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }

        let mut files = self.files.lock().unwrap();
        if !files.iter().any(|(name, _, _)| name == file_name) {
            files.push((file_name.to_string(), data.to_vec(), mode));
        }
        Ok(())
    }
}
