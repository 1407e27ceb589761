//! Bulletin - campus news gateway

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use bulletin::{config::Args, db::MongoClient, logging, server, store::MemoryUserDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(&args.log_level, args.log_format);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Bulletin - Campus News Gateway");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    info!("Fan-out concurrency: {}", args.fanout_concurrency);
    info!("======================================");

    // MongoDB is optional in dev mode
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB ready (db: {})", client.db_name());
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory stores): {}", e);
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let state = match mongo {
        Some(client) => server::AppState::with_mongo(args, &client).await?,
        None => server::AppState::in_memory(args, Arc::new(MemoryUserDirectory::new()))?,
    };

    info!("Storage backend: {}", state.backend);

    server::run(Arc::new(state)).await?;

    Ok(())
}
