//! HTTP routes for meme-battle

pub mod auth_routes;
pub mod health;
pub mod leaderboard;
pub mod memes;
pub mod response;

pub use health::{health_check, version_info};
pub use response::{cors_preflight, error_response, json_response, not_found, BoxBody};
