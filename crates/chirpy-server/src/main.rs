mod config;
mod prune;

use std::sync::Arc;

use tracing::{info, warn};

use chirpy_api::tokens::TokenService;
use chirpy_api::{AppStateInner, router};
use chirpy_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chirpy=debug,chirpy_api=debug,chirpy_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    if config.reset_db {
        match std::fs::remove_file(&config.db_path) {
            Ok(()) => warn!("Reset: removed {}", config.db_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);
    info!("Database ready at {}", config.db_path.display());

    // Shared state
    let tokens = TokenService::new(&config.jwt_secret, config.token_lifetimes);
    let state = AppStateInner::new(db.clone(), tokens, config.polka_key.clone());

    tokio::spawn(prune::run_prune_loop(db, config.prune_interval_secs));

    let app = router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Chirpy server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
