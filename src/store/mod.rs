//! Content store: persistence for users, memes, votes and comments
//!
//! Services only talk to these traits. Two backends implement them:
//! - [`crate::db::MongoStore`] for production
//! - [`MemoryStore`] for dev mode without MongoDB, and for tests
//!
//! Uniqueness (email, username, one vote per user+meme) is the backend's job
//! and surfaces as [`BattleError::Conflict`].

mod memory;

pub use memory::MemoryStore;

use bson::oid::ObjectId;

use crate::db::schemas::{CommentDoc, MemeDoc, UserDoc, VoteDoc, VoteType};
use crate::types::Result;

/// Ordering for meme listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemeSort {
    /// Newest first
    #[default]
    Newest,
    /// Highest vote count first, newest first among ties
    TopVoted,
}

/// Filter and ordering for [`MemeStore::list_memes`]
#[derive(Debug, Clone, Default)]
pub struct MemeQuery {
    pub uploaded_by: Option<ObjectId>,
    pub sort: MemeSort,
    pub limit: Option<u64>,
}

/// Fields a meme owner may change
#[derive(Debug, Clone, Default)]
pub struct MemeUpdate {
    pub title: Option<String>,
    pub image_url: Option<String>,
}

impl MemeUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.image_url.is_none()
    }
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user, returning it with its id
    async fn insert_user(&self, user: UserDoc) -> Result<UserDoc>;

    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserDoc>>;

    /// Batch lookup used to attach uploader/author names
    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<UserDoc>>;

    /// Returns the updated user, or None if it does not exist
    async fn update_username(&self, id: &ObjectId, username: &str) -> Result<Option<UserDoc>>;
}

#[async_trait::async_trait]
pub trait MemeStore: Send + Sync {
    async fn insert_meme(&self, meme: MemeDoc) -> Result<MemeDoc>;

    async fn find_meme(&self, id: &ObjectId) -> Result<Option<MemeDoc>>;

    async fn list_memes(&self, query: MemeQuery) -> Result<Vec<MemeDoc>>;

    /// Returns the updated meme, or None if it does not exist
    async fn update_meme(&self, id: &ObjectId, update: MemeUpdate) -> Result<Option<MemeDoc>>;

    /// Persist a recounted tally. Returns false if the meme is gone.
    async fn set_vote_count(&self, id: &ObjectId, vote_count: i64) -> Result<bool>;

    /// Returns false if nothing was deleted
    async fn delete_meme(&self, id: &ObjectId) -> Result<bool>;

    async fn count_memes(&self) -> Result<u64>;

    /// Sum of every meme's cached vote count
    async fn sum_vote_counts(&self) -> Result<i64>;
}

#[async_trait::async_trait]
pub trait VoteStore: Send + Sync {
    async fn find_vote(&self, user_id: &ObjectId, meme_id: &ObjectId) -> Result<Option<VoteDoc>>;

    /// The caller's votes restricted to the given memes
    async fn find_user_votes(
        &self,
        user_id: &ObjectId,
        meme_ids: &[ObjectId],
    ) -> Result<Vec<VoteDoc>>;

    /// Fails with Conflict if the (user, meme) pair already has a vote
    async fn insert_vote(&self, vote: VoteDoc) -> Result<VoteDoc>;

    async fn set_vote_type(&self, vote_id: &ObjectId, vote_type: VoteType) -> Result<bool>;

    async fn delete_vote(&self, vote_id: &ObjectId) -> Result<bool>;

    async fn delete_votes_for_meme(&self, meme_id: &ObjectId) -> Result<u64>;

    async fn count_votes(&self, meme_id: &ObjectId, vote_type: VoteType) -> Result<u64>;
}

#[async_trait::async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: CommentDoc) -> Result<CommentDoc>;

    async fn find_comment(&self, id: &ObjectId) -> Result<Option<CommentDoc>>;

    /// Comments on a meme, newest first
    async fn list_comments(&self, meme_id: &ObjectId) -> Result<Vec<CommentDoc>>;

    async fn delete_comment(&self, id: &ObjectId) -> Result<bool>;

    async fn delete_comments_for_meme(&self, meme_id: &ObjectId) -> Result<u64>;
}

/// Everything the services need from a backend
pub trait ContentStore: UserStore + MemeStore + VoteStore + CommentStore {}

impl<T> ContentStore for T where T: UserStore + MemeStore + VoteStore + CommentStore {}
