//! End-to-end HTTP tests
//!
//! Each test starts the server on an ephemeral port with the in-memory store
//! and speaks plain HTTP/1.1 to it over a TCP socket.

use clap::Parser;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use meme_battle::{
    config::Args,
    server::{self, AppState},
    store::MemoryStore,
};

// =============================================================================
// Harness
// =============================================================================

async fn start() -> SocketAddr {
    let args = Args::try_parse_from(["meme-battle", "--dev-mode"]).unwrap();
    let state = Arc::new(AppState::new(args, Arc::new(MemoryStore::new()), "memory").unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, state));
    addr
}

async fn call(
    addr: SocketAddr,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    let mut request = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n",
        body.len()
    );
    if let Some(token) = token {
        request.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    request.push_str("\r\n");
    request.push_str(&body);

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let text = String::from_utf8(raw).unwrap();
    let (head, payload) = text.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    let json = if payload.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(payload).unwrap()
    };
    (status, json)
}

/// Sign up and return (token, user id)
async fn signup(addr: SocketAddr, username: &str) -> (String, String) {
    let (status, body) = call(
        addr,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "much-secret",
        })),
    )
    .await;
    assert_eq!(status, 201, "{body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn create_meme(addr: SocketAddr, token: &str, title: &str) -> String {
    let (status, body) = call(
        addr,
        "POST",
        "/api/memes",
        Some(token),
        Some(json!({ "title": title, "imageUrl": format!("https://img.example/{title}.png") })),
    )
    .await;
    assert_eq!(status, 201, "{body}");
    body["meme"]["id"].as_str().unwrap().to_string()
}

async fn vote(addr: SocketAddr, token: &str, meme: &str, direction: &str) -> (u16, Value) {
    call(
        addr,
        "POST",
        &format!("/api/memes/{meme}/vote"),
        Some(token),
        Some(json!({ "voteType": direction })),
    )
    .await
}

// =============================================================================
// Service surface
// =============================================================================

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let addr = start().await;

    let (status, body) = call(addr, "GET", "/api/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "Server is meowing!");
    assert_eq!(body["store"], "memory");

    let (status, body) = call(addr, "GET", "/api/nope", None, None).await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Route not found");

    let (status, _) = call(addr, "OPTIONS", "/api/memes", None, None).await;
    assert_eq!(status, 204);
}

#[tokio::test]
async fn test_auth_flow() {
    let addr = start().await;
    let (token, user_id) = signup(addr, "bongo").await;

    let (status, body) = call(addr, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = call(
        addr,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "bongo@example.com", "password": "wrong-one" })),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = call(
        addr,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "username": "bongo", "email": "other@example.com", "password": "123456" })),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = call(
        addr,
        "PUT",
        "/api/auth/me/username",
        Some(&token),
        Some(json!({ "username": "bongo-cat" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["username"], "bongo-cat");

    let (status, _) = call(addr, "GET", "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, 401);
}

// =============================================================================
// Voting
// =============================================================================

#[tokio::test]
async fn test_vote_scenario_end_to_end() {
    let addr = start().await;
    let (alice, _) = signup(addr, "alice").await;
    let (bob, _) = signup(addr, "bob").await;
    let meme = create_meme(addr, &alice, "x").await;

    let (_, body) = vote(addr, &alice, &meme, "up").await;
    assert_eq!(body["voteCount"], 1);
    assert_eq!(body["userVote"], "up");

    let (_, body) = vote(addr, &bob, &meme, "up").await;
    assert_eq!(body["voteCount"], 2);

    let (status, body) = vote(addr, &alice, &meme, "up").await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Vote removed");
    assert!(body["userVote"].is_null());
    assert_eq!(body["voteCount"], 1);

    let (_, body) = vote(addr, &alice, &meme, "down").await;
    assert_eq!(body["message"], "Vote recorded");
    assert_eq!(body["userVote"], "down");
    assert_eq!(body["voteCount"], 0);

    let (_, listing) = call(addr, "GET", "/api/memes", Some(&alice), None).await;
    assert_eq!(listing[0]["userVote"], "down");
    assert_eq!(listing[0]["voteCount"], 0);

    let (_, anonymous) = call(addr, "GET", "/api/memes", None, None).await;
    assert!(anonymous[0].get("userVote").is_none());
}

#[tokio::test]
async fn test_vote_rejections() {
    let addr = start().await;
    let (token, _) = signup(addr, "grumpy").await;
    let meme = create_meme(addr, &token, "no").await;

    let (status, _) = call(
        addr,
        "POST",
        &format!("/api/memes/{meme}/vote"),
        None,
        Some(json!({ "voteType": "up" })),
    )
    .await;
    assert_eq!(status, 401);

    let (status, body) = vote(addr, &token, &meme, "sideways").await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Vote type must be \"up\" or \"down\"");

    let (status, _) = vote(addr, &token, "64b7f0c2a1b2c3d4e5f60718", "up").await;
    assert_eq!(status, 404);

    let (status, _) = vote(addr, &token, "not-an-id", "up").await;
    assert_eq!(status, 400);

    let (_, detail) = call(addr, "GET", &format!("/api/memes/{meme}"), None, None).await;
    assert_eq!(detail["voteCount"], 0);
}

// =============================================================================
// Ownership, comments, leaderboard
// =============================================================================

#[tokio::test]
async fn test_owner_only_and_cascade() {
    let addr = start().await;
    let (owner, _) = signup(addr, "owner").await;
    let (other, _) = signup(addr, "other").await;
    let meme = create_meme(addr, &owner, "mine").await;

    vote(addr, &other, &meme, "up").await;
    let (status, body) = call(
        addr,
        "POST",
        &format!("/api/memes/{meme}/comments"),
        Some(&other),
        Some(json!({ "text": "nice" })),
    )
    .await;
    assert_eq!(status, 201);
    let comment = body["comment"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        addr,
        "DELETE",
        &format!("/api/memes/{meme}/comments/{comment}"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, 403);

    let (_, detail) = call(addr, "GET", &format!("/api/memes/{meme}"), None, None).await;
    assert_eq!(detail["comments"][0]["userId"]["username"], "other");

    let (status, _) = call(addr, "DELETE", &format!("/api/memes/{meme}"), Some(&other), None).await;
    assert_eq!(status, 403);

    let (status, body) = call(addr, "DELETE", &format!("/api/memes/{meme}"), Some(&owner), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["meme"]["voteCount"], 1);

    let (status, _) = call(addr, "GET", &format!("/api/memes/{meme}"), None, None).await;
    assert_eq!(status, 404);

    let (_, stats) = call(addr, "GET", "/api/stats", None, None).await;
    assert_eq!(stats, json!({ "totalMemes": 0, "totalVotes": 0 }));
}

#[tokio::test]
async fn test_leaderboard_and_user_stats() {
    let addr = start().await;
    let (a, a_id) = signup(addr, "pepe").await;
    let (b, _) = signup(addr, "wojak").await;
    let first = create_meme(addr, &a, "first").await;
    let second = create_meme(addr, &a, "second").await;
    create_meme(addr, &b, "third").await;

    vote(addr, &a, &first, "up").await;
    vote(addr, &b, &first, "up").await;
    vote(addr, &b, &second, "down").await;

    let (status, board) = call(addr, "GET", "/api/leaderboard?limit=2", None, None).await;
    assert_eq!(status, 200);
    let board = board.as_array().unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0]["id"], first.as_str());
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[1]["rank"], 2);

    let (_, board) = call(addr, "GET", "/api/leaderboard?limit=bogus", None, None).await;
    assert_eq!(board.as_array().unwrap().len(), 3);

    let (_, board) = call(addr, "GET", "/api/leaderboard?limit=1abc", None, None).await;
    assert_eq!(board.as_array().unwrap().len(), 1);

    let (_, stats) = call(addr, "GET", &format!("/api/leaderboard/user/{a_id}"), None, None).await;
    assert_eq!(stats["totalMemes"], 2);
    assert_eq!(stats["totalVotes"], 1);
    assert_eq!(stats["averageVotes"], 1);
    assert_eq!(stats["topMeme"]["id"], first.as_str());

    let (_, site) = call(addr, "GET", "/api/stats", None, None).await;
    assert_eq!(site, json!({ "totalMemes": 3, "totalVotes": 1 }));
}
