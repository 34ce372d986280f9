//! Comments on memes

use bson::oid::ObjectId;
use serde::Deserialize;
use std::sync::Arc;

use crate::db::schemas::{CommentDoc, MAX_COMMENT_LEN};
use crate::services::views::{CommentView, Usernames};
use crate::store::{CommentStore, ContentStore, MemeStore};
use crate::types::{BattleError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct CommentInput {
    #[serde(default)]
    pub text: Option<String>,
}

pub struct Comments {
    store: Arc<dyn ContentStore>,
}

impl Comments {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn add(&self, caller: ObjectId, meme_id: &ObjectId, input: CommentInput) -> Result<CommentView> {
        let text = input
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BattleError::InvalidArgument("Comment text is required".into()))?;

        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(BattleError::InvalidArgument(format!(
                "Comment cannot exceed {} characters",
                MAX_COMMENT_LEN
            )));
        }

        if self.store.find_meme(meme_id).await?.is_none() {
            return Err(BattleError::NotFound("Meme not found".into()));
        }

        let comment = self
            .store
            .insert_comment(CommentDoc::new(text, *meme_id, caller))
            .await?;

        let names = Usernames::load(self.store.as_ref(), [caller]).await?;
        Ok(CommentView::build(comment, &names))
    }

    /// Only the author may delete a comment
    pub async fn delete(&self, caller: ObjectId, meme_id: &ObjectId, comment_id: &ObjectId) -> Result<()> {
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .filter(|c| c.meme_id == *meme_id)
            .ok_or_else(|| BattleError::NotFound("Comment not found".into()))?;

        if comment.user_id != caller {
            return Err(BattleError::Forbidden(
                "You can only delete your own comments".into(),
            ));
        }

        self.store.delete_comment(comment_id).await?;
        Ok(())
    }
}
