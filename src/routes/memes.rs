//! HTTP routes for memes, votes and comments
//!
//! Reads take an optional token so the caller's own vote can be shown;
//! every write requires one.

use hyper::{body::Incoming, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::routes::response::{auth_header, json_response, parse_id, parse_json_body, BoxBody};
use crate::server::AppState;
use crate::services::{CommentInput, MemeInput};
use crate::types::Result;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    #[serde(default)]
    vote_type: Option<String>,
}

/// GET /api/memes
pub async fn handle_list(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let caller = state.identity.verify_optional(auth_header(&req)).await;
    let memes = state.memes.list(caller).await?;
    Ok(json_response(StatusCode::OK, &memes))
}

/// GET /api/memes/{id}
pub async fn handle_get(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let caller = state.identity.verify_optional(auth_header(&req)).await;
    let detail = state.memes.get(&id, caller).await?;
    Ok(json_response(StatusCode::OK, &detail))
}

/// POST /api/memes
pub async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let caller = state.identity.verify(auth_header(&req)).await?;
    let input: MemeInput = parse_json_body(req, state.args.max_body_bytes).await?;

    let meme = state.memes.create(caller, input).await?;
    Ok(json_response(
        StatusCode::CREATED,
        &json!({ "message": "Meme created successfully", "meme": meme }),
    ))
}

/// PUT /api/memes/{id}
pub async fn handle_update(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let caller = state.identity.verify(auth_header(&req)).await?;
    let id = parse_id(id)?;
    let input: MemeInput = parse_json_body(req, state.args.max_body_bytes).await?;

    let meme = state.memes.update(caller, &id, input).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "message": "Meme updated successfully", "meme": meme }),
    ))
}

/// DELETE /api/memes/{id}
pub async fn handle_delete(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let caller = state.identity.verify(auth_header(&req)).await?;
    let id = parse_id(id)?;

    let deleted = state.memes.delete(caller, &id).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "message": "Meme deleted successfully", "meme": deleted }),
    ))
}

/// POST /api/memes/{id}/vote
///
/// Body `{ "voteType": "up" | "down" }`. Responds with the caller's vote
/// after the cast and the recounted tally.
pub async fn handle_vote(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let caller = state.identity.verify(auth_header(&req)).await?;
    let id = parse_id(id)?;
    let body: VoteRequest = parse_json_body(req, state.args.max_body_bytes).await?;

    let outcome = state
        .ledger
        .cast_vote(&caller, &id, body.vote_type.as_deref().unwrap_or_default())
        .await?;
    Ok(json_response(StatusCode::OK, &outcome))
}

/// POST /api/memes/{id}/comments
pub async fn handle_add_comment(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let caller = state.identity.verify(auth_header(&req)).await?;
    let id = parse_id(id)?;
    let input: CommentInput = parse_json_body(req, state.args.max_body_bytes).await?;

    let comment = state.comments.add(caller, &id, input).await?;
    Ok(json_response(
        StatusCode::CREATED,
        &json!({ "message": "Comment added", "comment": comment }),
    ))
}

/// DELETE /api/memes/{memeId}/comments/{commentId}
pub async fn handle_delete_comment(
    req: Request<Incoming>,
    state: Arc<AppState>,
    meme_id: &str,
    comment_id: &str,
) -> Result<Response<BoxBody>> {
    let caller = state.identity.verify(auth_header(&req)).await?;
    let (meme_id, comment_id) = (parse_id(meme_id)?, parse_id(comment_id)?);

    state.comments.delete(caller, &meme_id, &comment_id).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "message": "Comment deleted successfully" }),
    ))
}
