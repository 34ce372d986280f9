//! HTTP server for meme-battle

pub mod http;

pub use http::{handle_request, run, serve, AppState};
