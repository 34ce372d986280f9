//! HTTP routes for accounts
//!
//! - POST /api/auth/signup       - Create an account and get a token
//! - POST /api/auth/login        - Authenticate and get a token
//! - GET  /api/auth/me           - Current user from token
//! - PUT  /api/auth/me/username  - Change the caller's username

use hyper::{body::Incoming, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::routes::response::{auth_header, json_response, parse_json_body, BoxBody};
use crate::server::AppState;
use crate::services::{LoginRequest, SignupRequest};
use crate::types::Result;

#[derive(Debug, Default, Deserialize)]
struct UsernameRequest {
    #[serde(default)]
    username: Option<String>,
}

/// POST /api/auth/signup
pub async fn handle_signup(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let body: SignupRequest = parse_json_body(req, state.args.max_body_bytes).await?;
    let session = state.accounts.signup(body).await?;
    Ok(json_response(StatusCode::CREATED, &session))
}

/// POST /api/auth/login
pub async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let body: LoginRequest = parse_json_body(req, state.args.max_body_bytes).await?;
    let session = state.accounts.login(body).await?;
    Ok(json_response(StatusCode::OK, &session))
}

/// GET /api/auth/me
pub async fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let caller = state.identity.verify(auth_header(&req)).await?;
    let user = state.accounts.me(&caller).await?;
    Ok(json_response(StatusCode::OK, &serde_json::json!({ "user": user })))
}

/// PUT /api/auth/me/username
pub async fn handle_update_username(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let caller = state.identity.verify(auth_header(&req)).await?;
    let body: UsernameRequest = parse_json_body(req, state.args.max_body_bytes).await?;

    let user = state.accounts.update_username(&caller, body.username).await?;
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "message": "Username updated successfully", "user": user }),
    ))
}
