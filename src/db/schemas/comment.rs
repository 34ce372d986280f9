//! Comment document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for comments
pub const COMMENT_COLLECTION: &str = "comments";

/// Longest accepted comment
pub const MAX_COMMENT_LEN: usize = 500;

/// Comment document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CommentDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    pub text: String,

    pub meme_id: ObjectId,

    /// Author
    pub user_id: ObjectId,
}

impl CommentDoc {
    pub fn new(text: String, meme_id: ObjectId, user_id: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            text,
            meme_id,
            user_id,
        }
    }
}

impl IntoIndexes for CommentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "meme_id": 1, "metadata.created_at": -1 },
            Some(
                IndexOptions::builder()
                    .name("meme_comments_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CommentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
