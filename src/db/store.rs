//! MongoDB implementation of the content store traits

use bson::{doc, oid::ObjectId, Bson, Document};

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    CommentDoc, MemeDoc, UserDoc, VoteDoc, VoteType, COMMENT_COLLECTION, MEME_COLLECTION,
    USER_COLLECTION, VOTE_COLLECTION,
};
use crate::store::{CommentStore, MemeQuery, MemeSort, MemeStore, MemeUpdate, UserStore, VoteStore};
use crate::types::{BattleError, Result};

/// Content store backed by four MongoDB collections
#[derive(Clone)]
pub struct MongoStore {
    users: MongoCollection<UserDoc>,
    memes: MongoCollection<MemeDoc>,
    votes: MongoCollection<VoteDoc>,
    comments: MongoCollection<CommentDoc>,
}

impl MongoStore {
    /// Open every collection, creating indexes as needed
    pub async fn open(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
            memes: client.collection(MEME_COLLECTION).await?,
            votes: client.collection(VOTE_COLLECTION).await?,
            comments: client.collection(COMMENT_COLLECTION).await?,
        })
    }
}

fn by_id(id: &ObjectId) -> Document {
    doc! { "_id": id }
}

fn id_list(ids: &[ObjectId]) -> Vec<Bson> {
    ids.iter().map(|id| Bson::ObjectId(*id)).collect()
}

fn sort_for(sort: MemeSort) -> Document {
    // _id breaks ties between documents created in the same millisecond
    match sort {
        MemeSort::Newest => doc! { "metadata.created_at": -1, "_id": -1 },
        MemeSort::TopVoted => doc! { "vote_count": -1, "metadata.created_at": -1, "_id": -1 },
    }
}

/// Map a unique-index violation on users to the index that collided
fn user_conflict(err: BattleError, user: &UserDoc) -> BattleError {
    match err {
        BattleError::Conflict(msg) if msg.contains("email_unique") => {
            BattleError::Conflict("Email already registered".into())
        }
        BattleError::Conflict(msg) if msg.contains("username_unique") => {
            BattleError::Conflict("Username already taken".into())
        }
        BattleError::Conflict(_) => {
            BattleError::Conflict(format!("User {} already exists", user.username))
        }
        other => other,
    }
}

#[async_trait::async_trait]
impl UserStore for MongoStore {
    async fn insert_user(&self, mut user: UserDoc) -> Result<UserDoc> {
        let id = self
            .users
            .insert_one(user.clone())
            .await
            .map_err(|e| user_conflict(e, &user))?;
        user._id = Some(id);
        Ok(user)
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        self.users.find_one(by_id(id)).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "username": username }).await
    }

    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<UserDoc>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.users
            .find_many(doc! { "_id": { "$in": id_list(ids) } }, None, None)
            .await
    }

    async fn update_username(&self, id: &ObjectId, username: &str) -> Result<Option<UserDoc>> {
        self.users
            .set_fields(by_id(id), doc! { "username": username })
            .await
            .map_err(|e| match e {
                BattleError::Conflict(_) => BattleError::Conflict("Username already taken".into()),
                other => other,
            })
    }
}

#[async_trait::async_trait]
impl MemeStore for MongoStore {
    async fn insert_meme(&self, mut meme: MemeDoc) -> Result<MemeDoc> {
        meme._id = Some(self.memes.insert_one(meme.clone()).await?);
        Ok(meme)
    }

    async fn find_meme(&self, id: &ObjectId) -> Result<Option<MemeDoc>> {
        self.memes.find_one(by_id(id)).await
    }

    async fn list_memes(&self, query: MemeQuery) -> Result<Vec<MemeDoc>> {
        let filter = match query.uploaded_by {
            Some(uploader) => doc! { "uploaded_by": uploader },
            None => doc! {},
        };
        let limit = query.limit.map(|l| l.min(i64::MAX as u64) as i64);

        self.memes
            .find_many(filter, Some(sort_for(query.sort)), limit)
            .await
    }

    async fn update_meme(&self, id: &ObjectId, update: MemeUpdate) -> Result<Option<MemeDoc>> {
        let mut fields = Document::new();
        if let Some(title) = update.title {
            fields.insert("title", title);
        }
        if let Some(image_url) = update.image_url {
            fields.insert("image_url", image_url);
        }

        self.memes.set_fields(by_id(id), fields).await
    }

    async fn set_vote_count(&self, id: &ObjectId, vote_count: i64) -> Result<bool> {
        self.memes
            .set_fields_quiet(by_id(id), doc! { "vote_count": vote_count })
            .await
    }

    async fn delete_meme(&self, id: &ObjectId) -> Result<bool> {
        self.memes.delete_one(by_id(id)).await
    }

    async fn count_memes(&self) -> Result<u64> {
        self.memes.count(doc! {}).await
    }

    async fn sum_vote_counts(&self) -> Result<i64> {
        let rows = self
            .memes
            .aggregate(vec![doc! {
                "$group": { "_id": Bson::Null, "total_votes": { "$sum": "$vote_count" } }
            }])
            .await?;

        // $sum yields int32 or int64 depending on magnitude; no memes means no row
        Ok(rows
            .first()
            .and_then(|row| match row.get("total_votes") {
                Some(Bson::Int64(n)) => Some(*n),
                Some(Bson::Int32(n)) => Some(i64::from(*n)),
                Some(Bson::Double(n)) => Some(*n as i64),
                _ => None,
            })
            .unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl VoteStore for MongoStore {
    async fn find_vote(&self, user_id: &ObjectId, meme_id: &ObjectId) -> Result<Option<VoteDoc>> {
        self.votes
            .find_one(doc! { "user_id": user_id, "meme_id": meme_id })
            .await
    }

    async fn find_user_votes(
        &self,
        user_id: &ObjectId,
        meme_ids: &[ObjectId],
    ) -> Result<Vec<VoteDoc>> {
        if meme_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.votes
            .find_many(
                doc! { "user_id": user_id, "meme_id": { "$in": id_list(meme_ids) } },
                None,
                None,
            )
            .await
    }

    async fn insert_vote(&self, mut vote: VoteDoc) -> Result<VoteDoc> {
        vote._id = Some(self.votes.insert_one(vote.clone()).await?);
        Ok(vote)
    }

    async fn set_vote_type(&self, vote_id: &ObjectId, vote_type: VoteType) -> Result<bool> {
        self.votes
            .set_fields_quiet(by_id(vote_id), doc! { "vote_type": vote_type })
            .await
    }

    async fn delete_vote(&self, vote_id: &ObjectId) -> Result<bool> {
        self.votes.delete_one(by_id(vote_id)).await
    }

    async fn delete_votes_for_meme(&self, meme_id: &ObjectId) -> Result<u64> {
        self.votes.delete_many(doc! { "meme_id": meme_id }).await
    }

    async fn count_votes(&self, meme_id: &ObjectId, vote_type: VoteType) -> Result<u64> {
        self.votes
            .count(doc! { "meme_id": meme_id, "vote_type": vote_type })
            .await
    }
}

#[async_trait::async_trait]
impl CommentStore for MongoStore {
    async fn insert_comment(&self, mut comment: CommentDoc) -> Result<CommentDoc> {
        comment._id = Some(self.comments.insert_one(comment.clone()).await?);
        Ok(comment)
    }

    async fn find_comment(&self, id: &ObjectId) -> Result<Option<CommentDoc>> {
        self.comments.find_one(by_id(id)).await
    }

    async fn list_comments(&self, meme_id: &ObjectId) -> Result<Vec<CommentDoc>> {
        self.comments
            .find_many(
                doc! { "meme_id": meme_id },
                Some(doc! { "metadata.created_at": -1, "_id": -1 }),
                None,
            )
            .await
    }

    async fn delete_comment(&self, id: &ObjectId) -> Result<bool> {
        self.comments.delete_one(by_id(id)).await
    }

    async fn delete_comments_for_meme(&self, meme_id: &ObjectId) -> Result<u64> {
        self.comments.delete_many(doc! { "meme_id": meme_id }).await
    }
}
