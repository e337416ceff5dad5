pub mod auth;
pub mod blob;
pub mod error;
pub mod media;
pub mod messages;
pub mod middleware;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::auth::AppState;

/// Build the full route table: public signup/login and reads, bearer-gated
/// writes. Cross-cutting layers (CORS, tracing) are the binary's concern.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/messages", get(messages::list_messages))
        .route("/messages/{id}", get(messages::get_message))
        .route("/messages/{id}/replies", get(messages::list_replies))
        .route("/media/{object}", get(media::get_media))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/messages", post(messages::create_message))
        .route("/messages/{id}/replies", post(messages::create_reply))
        .route("/media", post(media::upload_media))
        .layer(DefaultBodyLimit::max(media::MAX_UPLOAD_SIZE))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public).merge(protected)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// RFC 3339 with microseconds: fixed-width UTC form, so lexicographic
/// order in the store matches chronological order.
pub(crate) fn timestamp(now: &DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_uuid(value: &str, context: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", context, value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(value: &str, context: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", context, value, e);
            DateTime::default()
        })
}
