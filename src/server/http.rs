//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. One task per
//! connection; routing is a plain match on method and path segments.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{Identity, JwtValidator};
use crate::config::Args;
use crate::routes::{
    self, auth_routes, cors_preflight, error_response, leaderboard, memes, not_found, BoxBody,
};
use crate::services::{Accounts, Comments, Leaderboard, MemeCatalogue, VoteLedger};
use crate::store::ContentStore;
use crate::types::{BattleError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Backend name reported by the health endpoint
    pub backend: &'static str,
    pub identity: Identity,
    pub accounts: Accounts,
    pub memes: MemeCatalogue,
    pub comments: Comments,
    pub ledger: Arc<VoteLedger>,
    pub leaderboard: Leaderboard,
    pub started_at: Instant,
}

impl AppState {
    /// Wire every service to one store
    pub fn new(args: Args, store: Arc<dyn ContentStore>, backend: &'static str) -> Result<Self> {
        let secret = args
            .jwt_secret()
            .ok_or_else(|| BattleError::Config("JWT_SECRET is required in production mode".into()))?;
        let jwt = JwtValidator::new(secret, args.jwt_expiry_seconds)?;
        let ledger = Arc::new(VoteLedger::new(Arc::clone(&store), args.repeat_vote));

        Ok(Self {
            identity: Identity::new(jwt.clone(), Arc::clone(&store)),
            accounts: Accounts::new(Arc::clone(&store), jwt),
            memes: MemeCatalogue::new(Arc::clone(&store), Arc::clone(&ledger)),
            comments: Comments::new(Arc::clone(&store)),
            leaderboard: Leaderboard::new(store),
            ledger,
            backend,
            args,
            started_at: Instant::now(),
        })
    }
}

/// Start the HTTP server on the configured address
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "meme-battle listening on {} (store: {})",
        state.args.listen, state.backend
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    serve(listener, state).await
}

/// Accept connections on an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, hyper::Error>(handle_request(state, addr, req).await) }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route one request. Every failure becomes a JSON error response.
pub async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let result = match (&method, segments.as_slice()) {
        // CORS preflight
        (&Method::OPTIONS, _) => Ok(cors_preflight()),

        (&Method::GET, ["api", "health"]) => Ok(routes::health_check(Arc::clone(&state))),
        (&Method::GET, ["api", "version"]) => Ok(routes::version_info()),

        // Accounts
        (&Method::POST, ["api", "auth", "signup"]) => auth_routes::handle_signup(req, state).await,
        (&Method::POST, ["api", "auth", "login"]) => auth_routes::handle_login(req, state).await,
        (&Method::GET, ["api", "auth", "me"]) => auth_routes::handle_me(req, state).await,
        (&Method::PUT, ["api", "auth", "me", "username"]) => {
            auth_routes::handle_update_username(req, state).await
        }

        // Memes, votes, comments
        (&Method::GET, ["api", "memes"]) => memes::handle_list(req, state).await,
        (&Method::POST, ["api", "memes"]) => memes::handle_create(req, state).await,
        (&Method::GET, ["api", "memes", id]) => memes::handle_get(req, state, id).await,
        (&Method::PUT, ["api", "memes", id]) => memes::handle_update(req, state, id).await,
        (&Method::DELETE, ["api", "memes", id]) => memes::handle_delete(req, state, id).await,
        (&Method::POST, ["api", "memes", id, "vote"]) => memes::handle_vote(req, state, id).await,
        (&Method::POST, ["api", "memes", id, "comments"]) => {
            memes::handle_add_comment(req, state, id).await
        }
        (&Method::DELETE, ["api", "memes", meme_id, "comments", comment_id]) => {
            memes::handle_delete_comment(req, state, meme_id, comment_id).await
        }

        // Leaderboard and stats
        (&Method::GET, ["api", "leaderboard"]) => leaderboard::handle_leaderboard(req, state).await,
        (&Method::GET, ["api", "leaderboard", "user", user_id]) => {
            leaderboard::handle_user_stats(state, user_id).await
        }
        (&Method::GET, ["api", "stats"]) => leaderboard::handle_site_stats(state).await,

        _ => Ok(not_found()),
    };

    result.unwrap_or_else(error_response)
}
