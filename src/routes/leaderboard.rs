//! Leaderboard and stats routes

use hyper::{body::Incoming, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::routes::response::{json_response, parse_id, parse_query, BoxBody};
use crate::server::AppState;
use crate::services::resolve_limit;
use crate::types::Result;

#[derive(Debug, Default, Deserialize)]
struct LeaderboardQuery {
    limit: Option<String>,
}

/// GET /api/leaderboard?limit=N
pub async fn handle_leaderboard(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let query: LeaderboardQuery = parse_query(&req);
    let board = state
        .leaderboard
        .top(resolve_limit(query.limit.as_deref()))
        .await?;
    Ok(json_response(StatusCode::OK, &board))
}

/// GET /api/leaderboard/user/{userId}
pub async fn handle_user_stats(state: Arc<AppState>, user_id: &str) -> Result<Response<BoxBody>> {
    let user_id = parse_id(user_id)?;
    let stats = state.leaderboard.user_stats(&user_id).await?;
    Ok(json_response(StatusCode::OK, &stats))
}

/// GET /api/stats
pub async fn handle_site_stats(state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let stats = state.leaderboard.site_stats().await?;
    Ok(json_response(StatusCode::OK, &stats))
}
