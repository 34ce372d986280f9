//! In-memory content store
//!
//! Used when running in dev mode without MongoDB and as the backend for
//! tests. Rows are kept in insertion order so "newest first" is stable even
//! when two documents share a millisecond timestamp.

use bson::oid::ObjectId;
use std::cmp::Reverse;
use tokio::sync::RwLock;

use super::{CommentStore, MemeQuery, MemeSort, MemeStore, MemeUpdate, UserStore, VoteStore};
use crate::db::schemas::{CommentDoc, MemeDoc, UserDoc, VoteDoc, VoteType};
use crate::types::{BattleError, Result};

#[derive(Default)]
struct Tables {
    users: Vec<UserDoc>,
    memes: Vec<MemeDoc>,
    votes: Vec<VoteDoc>,
    comments: Vec<CommentDoc>,
}

/// Content store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total vote rows across all memes
    pub async fn vote_rows(&self) -> usize {
        self.tables.read().await.votes.len()
    }
}

/// Newest-inserted first, then a stable sort on the requested key
fn ordered(memes: &[MemeDoc], query: &MemeQuery) -> Vec<MemeDoc> {
    let mut rows: Vec<MemeDoc> = memes
        .iter()
        .rev()
        .filter(|m| query.uploaded_by.map_or(true, |u| m.uploaded_by == u))
        .cloned()
        .collect();

    match query.sort {
        MemeSort::Newest => rows.sort_by_key(|m| Reverse(m.metadata.created_at)),
        MemeSort::TopVoted => {
            rows.sort_by_key(|m| (Reverse(m.vote_count), Reverse(m.metadata.created_at)))
        }
    }

    if let Some(limit) = query.limit {
        rows.truncate(limit as usize);
    }
    rows
}

#[async_trait::async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, mut user: UserDoc) -> Result<UserDoc> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(BattleError::Conflict("Email already registered".into()));
        }
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(BattleError::Conflict("Username already taken".into()));
        }

        user._id = Some(ObjectId::new());
        user.metadata.stamp();
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u._id == Some(*id)).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserDoc>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<UserDoc>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| u._id.map_or(false, |id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn update_username(&self, id: &ObjectId, username: &str) -> Result<Option<UserDoc>> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .iter()
            .any(|u| u.username == username && u._id != Some(*id))
        {
            return Err(BattleError::Conflict("Username already taken".into()));
        }

        Ok(tables
            .users
            .iter_mut()
            .find(|u| u._id == Some(*id))
            .map(|user| {
                user.username = username.to_string();
                user.metadata.touch();
                user.clone()
            }))
    }
}

#[async_trait::async_trait]
impl MemeStore for MemoryStore {
    async fn insert_meme(&self, mut meme: MemeDoc) -> Result<MemeDoc> {
        meme._id = Some(ObjectId::new());
        meme.metadata.stamp();
        self.tables.write().await.memes.push(meme.clone());
        Ok(meme)
    }

    async fn find_meme(&self, id: &ObjectId) -> Result<Option<MemeDoc>> {
        let tables = self.tables.read().await;
        Ok(tables.memes.iter().find(|m| m._id == Some(*id)).cloned())
    }

    async fn list_memes(&self, query: MemeQuery) -> Result<Vec<MemeDoc>> {
        let tables = self.tables.read().await;
        Ok(ordered(&tables.memes, &query))
    }

    async fn update_meme(&self, id: &ObjectId, update: MemeUpdate) -> Result<Option<MemeDoc>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .memes
            .iter_mut()
            .find(|m| m._id == Some(*id))
            .map(|meme| {
                if let Some(title) = update.title {
                    meme.title = title;
                }
                if let Some(image_url) = update.image_url {
                    meme.image_url = image_url;
                }
                meme.metadata.touch();
                meme.clone()
            }))
    }

    async fn set_vote_count(&self, id: &ObjectId, vote_count: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.memes.iter_mut().find(|m| m._id == Some(*id)) {
            Some(meme) => {
                meme.vote_count = vote_count;
                meme.metadata.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_meme(&self, id: &ObjectId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.memes.len();
        tables.memes.retain(|m| m._id != Some(*id));
        Ok(tables.memes.len() < before)
    }

    async fn count_memes(&self) -> Result<u64> {
        Ok(self.tables.read().await.memes.len() as u64)
    }

    async fn sum_vote_counts(&self) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables.memes.iter().map(|m| m.vote_count).sum())
    }
}

#[async_trait::async_trait]
impl VoteStore for MemoryStore {
    async fn find_vote(&self, user_id: &ObjectId, meme_id: &ObjectId) -> Result<Option<VoteDoc>> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .iter()
            .find(|v| v.user_id == *user_id && v.meme_id == *meme_id)
            .cloned())
    }

    async fn find_user_votes(
        &self,
        user_id: &ObjectId,
        meme_ids: &[ObjectId],
    ) -> Result<Vec<VoteDoc>> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .iter()
            .filter(|v| v.user_id == *user_id && meme_ids.contains(&v.meme_id))
            .cloned()
            .collect())
    }

    async fn insert_vote(&self, mut vote: VoteDoc) -> Result<VoteDoc> {
        let mut tables = self.tables.write().await;

        if tables
            .votes
            .iter()
            .any(|v| v.user_id == vote.user_id && v.meme_id == vote.meme_id)
        {
            return Err(BattleError::Conflict(format!(
                "Vote already exists for user {} on meme {}",
                vote.user_id, vote.meme_id
            )));
        }

        vote._id = Some(ObjectId::new());
        vote.metadata.stamp();
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn set_vote_type(&self, vote_id: &ObjectId, vote_type: VoteType) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.votes.iter_mut().find(|v| v._id == Some(*vote_id)) {
            Some(vote) => {
                vote.vote_type = vote_type;
                vote.metadata.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_vote(&self, vote_id: &ObjectId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.votes.len();
        tables.votes.retain(|v| v._id != Some(*vote_id));
        Ok(tables.votes.len() < before)
    }

    async fn delete_votes_for_meme(&self, meme_id: &ObjectId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.votes.len();
        tables.votes.retain(|v| v.meme_id != *meme_id);
        Ok((before - tables.votes.len()) as u64)
    }

    async fn count_votes(&self, meme_id: &ObjectId, vote_type: VoteType) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .iter()
            .filter(|v| v.meme_id == *meme_id && v.vote_type == vote_type)
            .count() as u64)
    }
}

#[async_trait::async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(&self, mut comment: CommentDoc) -> Result<CommentDoc> {
        comment._id = Some(ObjectId::new());
        comment.metadata.stamp();
        self.tables.write().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: &ObjectId) -> Result<Option<CommentDoc>> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c._id == Some(*id)).cloned())
    }

    async fn list_comments(&self, meme_id: &ObjectId) -> Result<Vec<CommentDoc>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<CommentDoc> = tables
            .comments
            .iter()
            .rev()
            .filter(|c| c.meme_id == *meme_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| Reverse(c.metadata.created_at));
        Ok(rows)
    }

    async fn delete_comment(&self, id: &ObjectId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c._id != Some(*id));
        Ok(tables.comments.len() < before)
    }

    async fn delete_comments_for_meme(&self, meme_id: &ObjectId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.meme_id != *meme_id);
        Ok((before - tables.comments.len()) as u64)
    }
}
