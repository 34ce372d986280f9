//! Leaderboard and site statistics

use bson::oid::ObjectId;
use serde::Serialize;
use std::sync::Arc;

use crate::db::schemas::MemeDoc;
use crate::services::views::{MemeView, Usernames};
use crate::store::{ContentStore, MemeQuery, MemeSort, MemeStore};
use crate::types::Result;

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Serialize)]
pub struct RankedMeme {
    #[serde(flatten)]
    pub meme: MemeView,
    /// 1-based position
    pub rank: usize,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopMeme {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub vote_count: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_memes: u64,
    pub total_votes: i64,
    pub average_votes: i64,
    pub top_meme: Option<TopMeme>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    pub total_memes: u64,
    pub total_votes: i64,
}

/// Leaderboard size from the raw `limit` query value.
///
/// Only the leading integer counts, so `"5abc"` is 5 and `"2.7"` is 2.
/// Absent, zero, negative or non-numeric values fall back to the default.
pub fn resolve_limit(raw: Option<&str>) -> u64 {
    raw.and_then(leading_int)
        .filter(|n| *n > 0)
        .map(|n| (n as u64).min(MAX_LIMIT))
        .unwrap_or(DEFAULT_LIMIT)
}

/// Optional sign and the digits after it; overlong digit runs saturate
fn leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    let magnitude = rest[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Halves round up, matching JavaScript's Math.round
fn round_half_up(total: i64, count: u64) -> i64 {
    (total as f64 / count as f64 + 0.5).floor() as i64
}

pub struct Leaderboard {
    store: Arc<dyn ContentStore>,
}

impl Leaderboard {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Top memes by tally, newest first among ties
    pub async fn top(&self, limit: u64) -> Result<Vec<RankedMeme>> {
        let memes = self
            .store
            .list_memes(MemeQuery {
                sort: MemeSort::TopVoted,
                limit: Some(limit.clamp(1, MAX_LIMIT)),
                ..Default::default()
            })
            .await?;
        let names = Usernames::load(self.store.as_ref(), memes.iter().map(|m| m.uploaded_by)).await?;

        Ok(memes
            .into_iter()
            .enumerate()
            .map(|(i, meme)| RankedMeme {
                meme: MemeView::build(meme, &names),
                rank: i + 1,
            })
            .collect())
    }

    /// Uploader stats. A user with no memes gets zeros rather than NotFound.
    pub async fn user_stats(&self, user_id: &ObjectId) -> Result<UserStats> {
        let memes = self
            .store
            .list_memes(MemeQuery {
                uploaded_by: Some(*user_id),
                sort: MemeSort::TopVoted,
                limit: None,
            })
            .await?;

        if memes.is_empty() {
            return Ok(UserStats {
                total_memes: 0,
                total_votes: 0,
                average_votes: 0,
                top_meme: None,
            });
        }

        let total_memes = memes.len() as u64;
        let total_votes: i64 = memes.iter().map(|m| m.vote_count).sum();

        Ok(UserStats {
            total_memes,
            total_votes,
            average_votes: round_half_up(total_votes, total_memes),
            top_meme: memes.into_iter().next().map(top_meme),
        })
    }

    pub async fn site_stats(&self) -> Result<SiteStats> {
        Ok(SiteStats {
            total_memes: self.store.count_memes().await?,
            total_votes: self.store.sum_vote_counts().await?,
        })
    }
}

fn top_meme(meme: MemeDoc) -> TopMeme {
    TopMeme {
        id: meme._id.map(|id| id.to_hex()).unwrap_or_default(),
        title: meme.title,
        image_url: meme.image_url,
        vote_count: meme.vote_count,
    }
}
