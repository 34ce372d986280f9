//! Meme catalogue: listing, detail, and owner-only edits

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{MemeDoc, MAX_TITLE_LEN};
use crate::services::views::{CommentView, MemeDetail, MemeView, Usernames};
use crate::services::votes::VoteLedger;
use crate::store::{CommentStore, ContentStore, MemeQuery, MemeStore, MemeUpdate};
use crate::types::{BattleError, Result};

/// Body of POST /api/memes and PUT /api/memes/{id}
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// What is left of a deleted meme
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMeme {
    pub id: String,
    pub title: String,
    pub vote_count: i64,
}

/// Trimmed, non-empty value of an optional field
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_title(title: &str) -> Result<()> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(BattleError::InvalidArgument(format!(
            "Title cannot exceed {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

pub struct MemeCatalogue {
    store: Arc<dyn ContentStore>,
    ledger: Arc<VoteLedger>,
}

impl MemeCatalogue {
    pub fn new(store: Arc<dyn ContentStore>, ledger: Arc<VoteLedger>) -> Self {
        Self { store, ledger }
    }

    /// All memes, newest first, with the caller's votes when known
    pub async fn list(&self, caller: Option<ObjectId>) -> Result<Vec<MemeView>> {
        let memes = self.store.list_memes(MemeQuery::default()).await?;
        let names = Usernames::load(self.store.as_ref(), memes.iter().map(|m| m.uploaded_by)).await?;

        let votes = match caller {
            Some(user_id) => {
                let ids: Vec<ObjectId> = memes.iter().filter_map(|m| m._id).collect();
                let votes = self.store.find_user_votes(&user_id, &ids).await?;
                Some(
                    votes
                        .into_iter()
                        .map(|v| (v.meme_id, v.vote_type))
                        .collect::<HashMap<_, _>>(),
                )
            }
            None => None,
        };

        Ok(memes
            .into_iter()
            .map(|meme| {
                let id = meme._id;
                let view = MemeView::build(meme, &names);
                match (&votes, id) {
                    (Some(votes), Some(id)) => view.with_user_vote(votes.get(&id).copied()),
                    _ => view,
                }
            })
            .collect())
    }

    /// One meme with its comments
    pub async fn get(&self, id: &ObjectId, caller: Option<ObjectId>) -> Result<MemeDetail> {
        let meme = self.find(id).await?;
        let comments = self.store.list_comments(id).await?;

        let names = Usernames::load(
            self.store.as_ref(),
            std::iter::once(meme.uploaded_by).chain(comments.iter().map(|c| c.user_id)),
        )
        .await?;

        let mut view = MemeView::build(meme, &names);
        if let Some(user_id) = caller {
            let vote = self.store.find_vote(&user_id, id).await?;
            view = view.with_user_vote(vote.map(|v| v.vote_type));
        }

        Ok(MemeDetail {
            meme: view,
            comments: comments
                .into_iter()
                .map(|c| CommentView::build(c, &names))
                .collect(),
        })
    }

    pub async fn create(&self, caller: ObjectId, input: MemeInput) -> Result<MemeView> {
        let (title, image_url) = match (present(input.title), present(input.image_url)) {
            (Some(title), Some(image_url)) => (title, image_url),
            _ => {
                return Err(BattleError::InvalidArgument(
                    "Title and image URL are required".into(),
                ))
            }
        };
        check_title(&title)?;

        let meme = self
            .store
            .insert_meme(MemeDoc::new(title, image_url, caller))
            .await?;
        info!(meme_id = ?meme._id, uploaded_by = %caller, "Meme created");

        self.view(meme).await
    }

    /// Change title and/or image. Blank fields are left alone.
    pub async fn update(&self, caller: ObjectId, id: &ObjectId, input: MemeInput) -> Result<MemeView> {
        let meme = self.find(id).await?;
        if meme.uploaded_by != caller {
            return Err(BattleError::Forbidden(
                "You can only edit your own memes".into(),
            ));
        }

        let update = MemeUpdate {
            title: present(input.title),
            image_url: present(input.image_url),
        };
        if let Some(title) = &update.title {
            check_title(title)?;
        }
        if update.is_empty() {
            return self.view(meme).await;
        }

        let updated = self
            .store
            .update_meme(id, update)
            .await?
            .ok_or_else(|| BattleError::NotFound("Meme not found".into()))?;

        self.view(updated).await
    }

    /// Delete a meme with its comments and votes
    pub async fn delete(&self, caller: ObjectId, id: &ObjectId) -> Result<DeletedMeme> {
        let meme = self.find(id).await?;
        if meme.uploaded_by != caller {
            return Err(BattleError::Forbidden(
                "You can only delete your own memes".into(),
            ));
        }

        // No vote may land between the cascade and the meme's removal
        let guard = self.ledger.lock_item(id).await;

        let comments = self.store.delete_comments_for_meme(id).await?;
        let votes = self.store.delete_votes_for_meme(id).await?;
        let removed = self.store.delete_meme(id).await?;

        drop(guard);
        self.ledger.forget(id);

        // A concurrent delete got there first
        if !removed {
            return Err(BattleError::NotFound("Meme not found".into()));
        }

        info!(meme_id = %id, comments, votes, "Meme deleted");

        Ok(DeletedMeme {
            id: id.to_hex(),
            title: meme.title,
            vote_count: meme.vote_count,
        })
    }

    async fn find(&self, id: &ObjectId) -> Result<MemeDoc> {
        self.store
            .find_meme(id)
            .await?
            .ok_or_else(|| BattleError::NotFound("Meme not found".into()))
    }

    async fn view(&self, meme: MemeDoc) -> Result<MemeView> {
        let names = Usernames::load(self.store.as_ref(), [meme.uploaded_by]).await?;
        Ok(MemeView::build(meme, &names))
    }
}
