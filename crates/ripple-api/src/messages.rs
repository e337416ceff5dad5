use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use ripple_db::StoreError;
use ripple_db::models::{MessageRow, ReplyRow};
use ripple_types::api::{Claims, CreateMessageRequest, CreateReplyRequest, Message, Reply};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{parse_timestamp, parse_uuid, timestamp};

/// Page size for the public message feed.
const LIST_LIMIT: u32 = 50;

pub async fn create_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("content must not be empty".into()));
    }

    // Owner is always the authenticated subject; a client-supplied owner
    // field in the body is ignored.
    let message_id = Uuid::new_v4();
    let now = Utc::now();
    let stamp = timestamp(&now);
    let media_urls_json =
        serde_json::to_string(&req.media_urls).map_err(|e| ApiError::Internal(e.into()))?;

    let db = state.clone();
    let body = content.clone();
    tokio::task::spawn_blocking(move || {
        db.db.insert_message(
            &message_id.to_string(),
            &claims.sub.to_string(),
            &body,
            &media_urls_json,
            &stamp,
        )
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))?
    .map_err(|e| ApiError::Internal(e.into()))?;

    info!(message_id = %message_id, user_id = %claims.sub, "message created");

    Ok((
        StatusCode::CREATED,
        Json(Message {
            id: message_id,
            user_id: claims.sub,
            content,
            media_urls: req.media_urls,
            created_at: now,
            updated_at: now,
        }),
    ))
}

pub async fn list_messages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_messages(LIST_LIMIT))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))?
        .map_err(|e| ApiError::Internal(e.into()))?;

    let messages: Vec<Message> = rows.into_iter().map(message_from_row).collect();
    Ok(Json(messages))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let lookup = id.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_message(&lookup))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))?
        .map_err(|e| ApiError::Internal(e.into()))?;

    match row {
        Some(row) => Ok(Json(message_from_row(row))),
        None => Err(ApiError::NotFound("message not found")),
    }
}

pub async fn create_reply(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateReplyRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("content must not be empty".into()));
    }

    let reply_id = Uuid::new_v4();
    let now = Utc::now();
    let stamp = timestamp(&now);
    let media_urls_json =
        serde_json::to_string(&req.media_urls).map_err(|e| ApiError::Internal(e.into()))?;

    // The parent is bound from the route path and checked only by the
    // store's FK constraint.
    let db = state.clone();
    let body = content.clone();
    let parent = message_id.clone();
    tokio::task::spawn_blocking(move || {
        db.db.insert_reply(
            &reply_id.to_string(),
            &parent,
            &claims.sub.to_string(),
            &body,
            &media_urls_json,
            &stamp,
        )
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))?
    .map_err(|e| match e {
        StoreError::ForeignKey => ApiError::NotFound("message not found"),
        other => ApiError::Internal(other.into()),
    })?;

    info!(reply_id = %reply_id, message_id = %message_id, user_id = %claims.sub, "reply created");

    Ok((
        StatusCode::CREATED,
        Json(Reply {
            id: reply_id,
            message_id: parse_uuid(&message_id, "reply message_id"),
            user_id: claims.sub,
            content,
            media_urls: req.media_urls,
            created_at: now,
            updated_at: now,
        }),
    ))
}

pub async fn list_replies(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_replies(&message_id))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))?
        .map_err(|e| ApiError::Internal(e.into()))?;

    let replies: Vec<Reply> = rows.into_iter().map(reply_from_row).collect();
    Ok(Json(replies))
}

fn message_from_row(row: MessageRow) -> Message {
    Message {
        id: parse_uuid(&row.id, "message id"),
        user_id: parse_uuid(&row.user_id, "message user_id"),
        media_urls: parse_media_urls(&row.media_urls, &row.id),
        created_at: parse_timestamp(&row.created_at, "message created_at"),
        updated_at: parse_timestamp(&row.updated_at, "message updated_at"),
        content: row.content,
    }
}

fn reply_from_row(row: ReplyRow) -> Reply {
    Reply {
        id: parse_uuid(&row.id, "reply id"),
        message_id: parse_uuid(&row.message_id, "reply message_id"),
        user_id: parse_uuid(&row.user_id, "reply user_id"),
        media_urls: parse_media_urls(&row.media_urls, &row.id),
        created_at: parse_timestamp(&row.created_at, "reply created_at"),
        updated_at: parse_timestamp(&row.updated_at, "reply updated_at"),
        content: row.content,
    }
}

fn parse_media_urls(json: &str, row_id: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_else(|e| {
        warn!("Corrupt media_urls on row '{}': {}", row_id, e);
        Vec::new()
    })
}
