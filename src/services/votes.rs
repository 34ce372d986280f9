//! Vote ledger and tally
//!
//! Each user holds at most one vote per meme. A cast either creates, flips
//! or retracts that vote, and every cast ends by recounting the meme's net
//! score from the ledger:
//!
//! ```text
//! none   --up-->   up       up   --up-->   none (Retract) / up (Ignore)
//! none   --down--> down     up   --down--> down
//! ```
//!
//! The cached `vote_count` on a meme is never incremented in place. It is
//! always `count(up) - count(down)` as of the last cast.
//!
//! Casts on the same meme are serialized by a per-meme async lock so a slow
//! recount cannot overwrite a fresher one within this process.

use bson::oid::ObjectId;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::config::RepeatVote;
use crate::db::schemas::{VoteDoc, VoteType};
use crate::store::{ContentStore, MemeStore, VoteStore};
use crate::types::{BattleError, Result};

/// Caller's vote state and the meme's tally after a cast
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub message: &'static str,
    pub user_vote: Option<VoteType>,
    pub vote_count: i64,
}

impl VoteOutcome {
    fn new(user_vote: Option<VoteType>, vote_count: i64) -> Self {
        let message = match user_vote {
            Some(_) => "Vote recorded",
            None => "Vote removed",
        };
        Self {
            message,
            user_vote,
            vote_count,
        }
    }
}

pub struct VoteLedger {
    store: Arc<dyn ContentStore>,
    repeat: RepeatVote,
    locks: DashMap<ObjectId, Arc<Mutex<()>>>,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn ContentStore>, repeat: RepeatVote) -> Self {
        Self {
            store,
            repeat,
            locks: DashMap::new(),
        }
    }

    /// Cast a vote given its wire direction ("up" or "down").
    ///
    /// The direction is checked before anything is read from the store.
    pub async fn cast_vote(
        &self,
        user_id: &ObjectId,
        meme_id: &ObjectId,
        direction: &str,
    ) -> Result<VoteOutcome> {
        let vote_type: VoteType = direction.parse()?;
        self.cast(user_id, meme_id, vote_type).await
    }

    /// Apply one vote from `user_id` on `meme_id` and recount its tally
    pub async fn cast(
        &self,
        user_id: &ObjectId,
        meme_id: &ObjectId,
        vote_type: VoteType,
    ) -> Result<VoteOutcome> {
        let guard = self.lock_item(meme_id).await;

        if self.store.find_meme(meme_id).await?.is_none() {
            drop(guard);
            self.forget(meme_id);
            return Err(BattleError::NotFound("Meme not found".into()));
        }

        let user_vote = self.apply(user_id, meme_id, vote_type).await?;
        let vote_count = self.recount_unlocked(meme_id).await?;

        debug!(
            user_id = %user_id,
            meme_id = %meme_id,
            requested = %vote_type,
            user_vote = ?user_vote,
            vote_count,
            "Vote cast"
        );

        Ok(VoteOutcome::new(user_vote, vote_count))
    }

    /// Recompute a meme's tally from the ledger and persist it
    pub async fn recount(&self, meme_id: &ObjectId) -> Result<i64> {
        let guard = self.lock_item(meme_id).await;
        let result = self.recount_unlocked(meme_id).await;

        if matches!(result, Err(BattleError::NotFound(_))) {
            drop(guard);
            self.forget(meme_id);
        }
        result
    }

    /// Hold the per-meme lock, e.g. while deleting the meme and its votes
    pub async fn lock_item(&self, meme_id: &ObjectId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(*meme_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry of a meme that no longer exists
    pub fn forget(&self, meme_id: &ObjectId) {
        self.locks.remove(meme_id);
    }

    /// Memes that currently have a lock entry
    pub fn tracked_items(&self) -> usize {
        self.locks.len()
    }

    /// Ledger transition. Returns the caller's vote afterwards.
    async fn apply(
        &self,
        user_id: &ObjectId,
        meme_id: &ObjectId,
        vote_type: VoteType,
    ) -> Result<Option<VoteType>> {
        let existing = self.store.find_vote(user_id, meme_id).await?;

        match existing {
            None => match self
                .store
                .insert_vote(VoteDoc::new(*user_id, *meme_id, vote_type))
                .await
            {
                Ok(_) => Ok(Some(vote_type)),
                // Another process inserted first; the unique index kept one row
                Err(BattleError::Conflict(_)) => {
                    warn!(user_id = %user_id, meme_id = %meme_id, "Concurrent first vote, flipping instead");
                    if let Some(vote) = self.store.find_vote(user_id, meme_id).await? {
                        self.set_type(&vote, vote_type).await?;
                    }
                    Ok(Some(vote_type))
                }
                Err(e) => Err(e),
            },
            Some(vote) if vote.vote_type == vote_type => match self.repeat {
                RepeatVote::Retract => {
                    if let Some(id) = vote._id {
                        self.store.delete_vote(&id).await?;
                    }
                    Ok(None)
                }
                RepeatVote::Ignore => Ok(Some(vote_type)),
            },
            Some(vote) => {
                self.set_type(&vote, vote_type).await?;
                Ok(Some(vote_type))
            }
        }
    }

    async fn set_type(&self, vote: &VoteDoc, vote_type: VoteType) -> Result<()> {
        let id = vote
            ._id
            .ok_or_else(|| BattleError::Internal("Stored vote has no id".into()))?;
        self.store.set_vote_type(&id, vote_type).await?;
        Ok(())
    }

    async fn recount_unlocked(&self, meme_id: &ObjectId) -> Result<i64> {
        let up = self.store.count_votes(meme_id, VoteType::Up).await?;
        let down = self.store.count_votes(meme_id, VoteType::Down).await?;
        let vote_count = up as i64 - down as i64;

        if !self.store.set_vote_count(meme_id, vote_count).await? {
            return Err(BattleError::NotFound("Meme not found".into()));
        }
        Ok(vote_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::MemeDoc;
    use crate::store::{MemeStore, MemoryStore, VoteStore};

    async fn setup(repeat: RepeatVote) -> (VoteLedger, Arc<MemoryStore>, ObjectId) {
        let store = Arc::new(MemoryStore::new());
        let meme = store
            .insert_meme(MemeDoc::new(
                "Distracted boyfriend".into(),
                "https://img.example/db.png".into(),
                ObjectId::new(),
            ))
            .await
            .unwrap();
        (VoteLedger::new(store.clone(), repeat), store, meme._id.unwrap())
    }

    async fn stored_count(store: &MemoryStore, meme_id: &ObjectId) -> i64 {
        store.find_meme(meme_id).await.unwrap().unwrap().vote_count
    }

    #[tokio::test]
    async fn test_two_voters_and_a_change_of_heart() {
        let (ledger, store, meme) = setup(RepeatVote::Retract).await;
        let (alice, bob) = (ObjectId::new(), ObjectId::new());

        let out = ledger.cast(&alice, &meme, VoteType::Up).await.unwrap();
        assert_eq!((out.user_vote, out.vote_count), (Some(VoteType::Up), 1));

        let out = ledger.cast(&bob, &meme, VoteType::Up).await.unwrap();
        assert_eq!(out.vote_count, 2);

        let out = ledger.cast(&alice, &meme, VoteType::Up).await.unwrap();
        assert_eq!(out.user_vote, None);
        assert_eq!(out.vote_count, 1);
        assert_eq!(out.message, "Vote removed");

        let out = ledger.cast(&alice, &meme, VoteType::Down).await.unwrap();
        assert_eq!((out.user_vote, out.vote_count), (Some(VoteType::Down), 0));
        assert_eq!(out.message, "Vote recorded");

        assert_eq!(stored_count(&store, &meme).await, 0);
        assert_eq!(store.vote_rows().await, 2);
    }

    #[tokio::test]
    async fn test_flip_keeps_single_row() {
        let (ledger, store, meme) = setup(RepeatVote::Retract).await;
        let user = ObjectId::new();

        let up = ledger.cast(&user, &meme, VoteType::Up).await.unwrap();
        let down = ledger.cast(&user, &meme, VoteType::Down).await.unwrap();

        assert_eq!(up.vote_count - down.vote_count, 2);
        assert_eq!(store.vote_rows().await, 1);
        let vote = store.find_vote(&user, &meme).await.unwrap().unwrap();
        assert_eq!(vote.vote_type, VoteType::Down);
    }

    #[tokio::test]
    async fn test_ignore_policy_keeps_repeat_vote() {
        let (ledger, store, meme) = setup(RepeatVote::Ignore).await;
        let user = ObjectId::new();

        ledger.cast(&user, &meme, VoteType::Down).await.unwrap();
        let again = ledger.cast(&user, &meme, VoteType::Down).await.unwrap();

        assert_eq!(again.user_vote, Some(VoteType::Down));
        assert_eq!(again.vote_count, -1);
        assert_eq!(store.vote_rows().await, 1);
    }

    #[tokio::test]
    async fn test_missing_meme_writes_nothing() {
        let (ledger, store, _) = setup(RepeatVote::Retract).await;

        let err = ledger
            .cast(&ObjectId::new(), &ObjectId::new(), VoteType::Up)
            .await
            .unwrap_err();

        assert!(matches!(err, BattleError::NotFound(_)));
        assert_eq!(store.vote_rows().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_memes_leave_no_lock_entries() {
        let (ledger, _, meme) = setup(RepeatVote::Retract).await;

        for _ in 0..100 {
            let cast = ledger.cast(&ObjectId::new(), &ObjectId::new(), VoteType::Up).await;
            assert!(matches!(cast, Err(BattleError::NotFound(_))));
            let recount = ledger.recount(&ObjectId::new()).await;
            assert!(matches!(recount, Err(BattleError::NotFound(_))));
        }
        assert_eq!(ledger.tracked_items(), 0);

        // Live memes keep their entry
        ledger.cast(&ObjectId::new(), &meme, VoteType::Up).await.unwrap();
        assert_eq!(ledger.recount(&meme).await.unwrap(), 1);
        assert_eq!(ledger.tracked_items(), 1);
    }

    #[tokio::test]
    async fn test_bad_direction_rejected_first() {
        let (ledger, store, _) = setup(RepeatVote::Retract).await;

        // Unknown meme too: direction must be checked before the lookup
        let err = ledger
            .cast_vote(&ObjectId::new(), &ObjectId::new(), "sideways")
            .await
            .unwrap_err();

        assert!(matches!(err, BattleError::InvalidArgument(_)));
        assert_eq!(store.vote_rows().await, 0);
    }

    #[tokio::test]
    async fn test_recount_repairs_drift() {
        let (ledger, store, meme) = setup(RepeatVote::Retract).await;
        ledger.cast(&ObjectId::new(), &meme, VoteType::Up).await.unwrap();
        ledger.cast(&ObjectId::new(), &meme, VoteType::Up).await.unwrap();

        store.set_vote_count(&meme, 41).await.unwrap();
        assert_eq!(ledger.recount(&meme).await.unwrap(), 2);
        assert_eq!(stored_count(&store, &meme).await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_voters_tally_exactly() {
        let (ledger, store, meme) = setup(RepeatVote::Retract).await;
        let ledger = Arc::new(ledger);

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move {
                    let direction = if i % 4 == 0 { VoteType::Down } else { VoteType::Up };
                    ledger.cast(&ObjectId::new(), &meme, direction).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // 15 up, 5 down
        assert_eq!(stored_count(&store, &meme).await, 10);
        assert_eq!(store.vote_rows().await, 20);
    }
}
