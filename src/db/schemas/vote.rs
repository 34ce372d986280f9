//! Vote document schema
//!
//! One row per (user, meme) pair at most; the unique compound index below is
//! what enforces it on MongoDB.

use bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::BattleError;

/// Collection name for votes
pub const VOTE_COLLECTION: &str = "votes";

/// Direction of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    #[default]
    Up,
    Down,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteType::Up),
            "down" => Ok(VoteType::Down),
            _ => Err(BattleError::InvalidArgument(
                "Vote type must be \"up\" or \"down\"".into(),
            )),
        }
    }
}

impl From<VoteType> for Bson {
    fn from(v: VoteType) -> Self {
        Bson::String(v.as_str().to_string())
    }
}

/// Vote document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct VoteDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: ObjectId,

    pub meme_id: ObjectId,

    pub vote_type: VoteType,
}

impl VoteDoc {
    pub fn new(user_id: ObjectId, meme_id: ObjectId, vote_type: VoteType) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            meme_id,
            vote_type,
        }
    }
}

impl IntoIndexes for VoteDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One vote per user per meme
            (
                doc! { "user_id": 1, "meme_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_meme_unique".to_string())
                        .build(),
                ),
            ),
            // Recount by meme and direction
            (
                doc! { "meme_id": 1, "vote_type": 1 },
                Some(
                    IndexOptions::builder()
                        .name("meme_vote_type_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for VoteDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
