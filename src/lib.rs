//! meme-battle - REST API for the Battle of Memes
//!
//! Users sign up, upload memes, vote them up or down and comment on them.
//! The leaderboard ranks memes by their net score.
//!
//! ## Layers
//!
//! - **Routes**: hyper handlers under `/api`, JSON in and out
//! - **Services**: accounts, meme catalogue, comments, leaderboard and the
//!   vote ledger, which keeps one vote per user per meme and recounts the
//!   tally from the ledger after every cast
//! - **Store**: async traits with MongoDB and in-memory backends

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{BattleError, Result};
