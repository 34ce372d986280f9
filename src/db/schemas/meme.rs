//! Meme document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for memes
pub const MEME_COLLECTION: &str = "memes";

/// Longest accepted meme title
pub const MAX_TITLE_LEN: usize = 100;

/// Meme document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MemeDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    pub image_url: String,

    /// User who uploaded the meme
    pub uploaded_by: ObjectId,

    /// Net score cached from the vote ledger: ups minus downs.
    /// Only the vote ledger writes this field.
    #[serde(default)]
    pub vote_count: i64,
}

impl MemeDoc {
    pub fn new(title: String, image_url: String, uploaded_by: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            title,
            image_url,
            uploaded_by,
            vote_count: 0,
        }
    }
}

impl IntoIndexes for MemeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Leaderboard ordering
            (
                doc! { "vote_count": -1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("leaderboard_index".to_string())
                        .build(),
                ),
            ),
            // Feed ordering
            (
                doc! { "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("created_at_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "uploaded_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("uploaded_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for MemeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
