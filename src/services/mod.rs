//! Services layer for meme-battle
//!
//! Business logic between the HTTP routes and the content store.
//!
//! ## Services
//!
//! - **VoteLedger**: one vote per user per meme, tally recounted on every cast
//! - **Accounts**: signup, login, profile and username changes
//! - **MemeCatalogue**: meme listing, detail and owner-only edits
//! - **Comments**: add and delete comments
//! - **Leaderboard**: top memes, uploader stats and site totals

pub mod accounts;
pub mod comments;
pub mod leaderboard;
pub mod memes;
pub mod views;
pub mod votes;

pub use accounts::{Accounts, AuthSession, LoginRequest, SignupRequest};
pub use comments::{CommentInput, Comments};
pub use leaderboard::{resolve_limit, Leaderboard, RankedMeme, SiteStats, TopMeme, UserStats};
pub use memes::{DeletedMeme, MemeCatalogue, MemeInput};
pub use views::{CommentView, MemeDetail, MemeView, UserRef};
pub use votes::{VoteLedger, VoteOutcome};
