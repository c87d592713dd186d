//! store-server — student organization merch store backend
//!
//! Long-running service that:
//! - Creates orders atomically against limited stock
//! - Reconciles stock as an order's status moves through its lifecycle
//! - Serves order lookups (admin listing, guest self-lookup, by reference)
//! - Dispatches confirmation/receipt emails after commit

mod api;
mod config;
mod db;
mod email;
mod error;
mod orders;
mod state;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "store_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting store-server (env: {})", config.environment);

    // Initialize application state (pool + migrations + SES)
    let state = AppState::new(&config).await?;

    let app = api::router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("store-server HTTP listening on {http_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
