//! meme-battle server entry point

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meme_battle::{
    config::{Args, LogFormat},
    db::{MongoClient, MongoStore},
    server::{self, AppState},
    store::{ContentStore, MemoryStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("meme_battle={},info", args.log_level).into()),
    );
    match args.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().with_target(true).json())
            .init(),
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  meme-battle API");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db {})", args.mongodb_uri, args.mongodb_db);
    info!("Repeat vote: {:?}", args.repeat_vote);
    info!("======================================");

    // MongoDB is optional in dev mode only
    let (store, backend): (Arc<dyn ContentStore>, &'static str) =
        match connect_mongo(&args).await {
            Ok(store) => (Arc::new(store), "mongodb"),
            Err(e) if args.dev_mode => {
                warn!("MongoDB unavailable (dev mode, using in-memory store): {}", e);
                (Arc::new(MemoryStore::new()), "memory")
            }
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        };

    let state = Arc::new(AppState::new(args, store, backend)?);

    server::run(state).await?;

    Ok(())
}

async fn connect_mongo(args: &Args) -> meme_battle::Result<MongoStore> {
    let client = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
    let store = MongoStore::open(&client).await?;
    info!("MongoDB connected, indexes ready");
    Ok(store)
}
