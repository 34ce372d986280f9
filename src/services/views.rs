//! Response shapes for memes and comments
//!
//! Documents reference users by id only; these views carry the username
//! alongside so clients do not need a second lookup.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::db::schemas::{CommentDoc, MemeDoc, UserDoc, VoteType};
use crate::store::ContentStore;
use crate::types::Result;

/// A user as embedded in another resource
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserRef {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeView {
    pub id: String,
    pub title: String,
    pub image_url: String,
    /// Null when the uploader's account is gone
    pub uploaded_by: Option<UserRef>,
    pub vote_count: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Omitted for anonymous callers; null when the caller has not voted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<Option<VoteType>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub text: String,
    pub meme_id: String,
    /// Author
    pub user_id: Option<UserRef>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A meme with its comments, newest first
#[derive(Debug, Clone, Serialize)]
pub struct MemeDetail {
    #[serde(flatten)]
    pub meme: MemeView,
    pub comments: Vec<CommentView>,
}

fn hex(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

/// Username lookup for a batch of documents
pub(crate) struct Usernames(HashMap<ObjectId, String>);

impl Usernames {
    pub(crate) async fn load(
        store: &dyn ContentStore,
        ids: impl IntoIterator<Item = ObjectId>,
    ) -> Result<Self> {
        let mut wanted: Vec<ObjectId> = ids.into_iter().collect();
        wanted.sort();
        wanted.dedup();

        let users = store.find_users(&wanted).await?;
        Ok(Self(
            users
                .into_iter()
                .filter_map(|UserDoc { _id, username, .. }| _id.map(|id| (id, username)))
                .collect(),
        ))
    }

    pub(crate) fn user_ref(&self, id: &ObjectId) -> Option<UserRef> {
        self.0.get(id).map(|username| UserRef {
            id: id.to_hex(),
            username: username.clone(),
        })
    }
}

impl MemeView {
    pub(crate) fn build(meme: MemeDoc, names: &Usernames) -> Self {
        Self {
            id: hex(meme._id),
            uploaded_by: names.user_ref(&meme.uploaded_by),
            created_at: meme.metadata.created(),
            updated_at: meme.metadata.updated(),
            title: meme.title,
            image_url: meme.image_url,
            vote_count: meme.vote_count,
            user_vote: None,
        }
    }

    /// Attach the caller's own vote
    pub(crate) fn with_user_vote(mut self, vote: Option<VoteType>) -> Self {
        self.user_vote = Some(vote);
        self
    }
}

impl CommentView {
    pub(crate) fn build(comment: CommentDoc, names: &Usernames) -> Self {
        Self {
            id: hex(comment._id),
            user_id: names.user_ref(&comment.user_id),
            meme_id: comment.meme_id.to_hex(),
            created_at: comment.metadata.created(),
            text: comment.text,
        }
    }
}
