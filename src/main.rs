//! obras_hub server
//!
//! Serves the session and portfolio REST API over Sled storage.
//!
//! Usage:
//!   OBRAS_JWT_SECRET=... cargo run --bin load_data   # demo identity + sample portfolio
//!   OBRAS_JWT_SECRET=... cargo run --bin obras_hub   # start server
//!   cargo run --bin obras-cli -- login -e admin@construcao.com -p admin123

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use obras_hub::auth::SessionAuthority;
use obras_hub::config::Config;
use obras_hub::rest::create_router;
use obras_hub::storage::SledStorage;
use obras_hub::telemetry::init_tracing;

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // No signing secret, no server.
    let config = Config::from_env()?;
    let _log_guard = init_tracing(&config);

    info!(?config, "obras_hub starting");

    let storage = SledStorage::open(&config.store.data_dir)?;
    let authority = SessionAuthority::new(
        config.jwt_secret.as_bytes(),
        Arc::new(storage.clone()),
        config.store.bcrypt_cost,
    )?;

    let app = create_router(storage, Arc::new(authority));

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "REST API listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
