//! Database layer for meme-battle
//!
//! MongoDB storage for users, memes, votes and comments.

pub mod mongo;
pub mod schemas;
mod store;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{CommentDoc, MemeDoc, Metadata, UserDoc, VoteDoc, VoteType};
pub use store::MongoStore;
