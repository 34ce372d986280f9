//! Database schemas for meme-battle
//!
//! Defines MongoDB document structures for users, memes, votes and comments.

mod comment;
mod meme;
mod metadata;
mod user;
mod vote;

pub use comment::{CommentDoc, COMMENT_COLLECTION, MAX_COMMENT_LEN};
pub use meme::{MemeDoc, MAX_TITLE_LEN, MEME_COLLECTION};
pub use metadata::Metadata;
pub use user::{PublicUser, UserDoc, USER_COLLECTION};
pub use vote::{VoteDoc, VoteType, VOTE_COLLECTION};
