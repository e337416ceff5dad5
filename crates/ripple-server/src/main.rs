use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use ripple_api::auth::AppStateInner;
use ripple_api::blob::BlobStore;
use ripple_auth::token::TokenService;
use ripple_db::Database;

/// Bearer tokens are valid for a fixed duration from issuance; there is
/// no renewal or revocation.
const TOKEN_LIFETIME_HOURS: i64 = 24;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ripple=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("RIPPLE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("RIPPLE_DB_PATH").unwrap_or_else(|_| "ripple.db".into());
    let media_dir = std::env::var("RIPPLE_MEDIA_DIR").unwrap_or_else(|_| "./media".into());
    let host = std::env::var("RIPPLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("RIPPLE_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;
    let public_url =
        std::env::var("RIPPLE_PUBLIC_URL").unwrap_or_else(|_| format!("http://{host}:{port}"));

    // Init stores
    let db = Database::open(&PathBuf::from(&db_path))?;
    let blobs = BlobStore::new(PathBuf::from(&media_dir), &public_url).await?;

    // Shared state; the signing secret lives in the token service only.
    let tokens = TokenService::new(&jwt_secret, chrono::Duration::hours(TOKEN_LIFETIME_HOURS));
    let state = Arc::new(AppStateInner { db, tokens, blobs });

    let app = ripple_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Ripple server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
