use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use memo_api::auth::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "memo_server=debug,memo_api=debug,memo_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    // Config. The signing secret deliberately has no fallback: refusing to
    // boot beats signing sessions with a well-known key.
    let jwt_secret =
        std::env::var("MEMO_JWT_SECRET").context("MEMO_JWT_SECRET must be set")?;
    let db_path = std::env::var("MEMO_DB_PATH").unwrap_or_else(|_| "memo.db".into());
    let host = std::env::var("MEMO_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MEMO_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database (runs the idempotent migrations)
    let db = memo_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state, injected into every handler
    let state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    let app = memo_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Memo server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
