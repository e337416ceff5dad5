use std::sync::Arc;

use anyhow::anyhow;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use ripple_auth::password::{hash_password, verify_password};
use ripple_auth::token::TokenService;
use ripple_db::{Database, StoreError};
use ripple_types::api::{AuthResponse, LoginRequest, SignupRequest, User};

use crate::blob::BlobStore;
use crate::{parse_timestamp, timestamp};
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub blobs: BlobStore,
}

/// Policy constants, not core invariants.
const MIN_PASSWORD_LEN: usize = 8;

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignupRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_email(&req.email) {
        return Err(ApiError::Validation("a valid email is required".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user_id = Uuid::new_v4();
    let now = Utc::now();
    let stamp = timestamp(&now);

    // Argon2 is deliberately CPU-expensive; run it and the insert off the
    // async runtime. The UNIQUE constraint on email is the only
    // serialization point for concurrent signups.
    let db = state.clone();
    let email = req.email.clone();
    let password = req.password;
    tokio::task::spawn_blocking(move || {
        let hash = hash_password(&password).map_err(ApiError::Internal)?;
        db.db
            .create_user(&user_id.to_string(), &email, &hash, &stamp)
            .map_err(|e| match e {
                StoreError::Conflict => ApiError::Conflict("email already exists"),
                other => ApiError::Internal(other.into()),
            })
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))??;

    let token = state
        .tokens
        .issue(user_id, &req.email)
        .map_err(|e| ApiError::Internal(e.into()))?;

    info!(user_id = %user_id, email = %req.email, "user created");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: User {
                id: user_id,
                email: req.email,
                created_at: now,
                updated_at: now,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    // Absent user and wrong password must be indistinguishable.
    fn bad_credentials() -> ApiError {
        ApiError::Unauthorized("invalid email or password")
    }

    let db = state.clone();
    let email = req.email.clone();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_email(&email))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))?
        .map_err(|e| ApiError::Internal(e.into()))?;

    let Some(user) = user else {
        return Err(bad_credentials());
    };

    let password = req.password;
    let encoded = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &encoded))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))?;

    if !verified {
        warn!(email = %req.email, "failed login attempt");
        return Err(bad_credentials());
    }

    // A corrupt stored id must not turn into a token for a fabricated
    // subject.
    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|_| ApiError::Internal(anyhow!("corrupt user id '{}'", user.id)))?;
    let token = state
        .tokens
        .issue(user_id, &user.email)
        .map_err(|e| ApiError::Internal(e.into()))?;

    info!(user_id = %user_id, email = %user.email, "user logged in");

    Ok(Json(AuthResponse {
        token,
        user: User {
            id: user_id,
            email: user.email,
            created_at: parse_timestamp(&user.created_at, "user created_at"),
            updated_at: parse_timestamp(&user.updated_at, "user updated_at"),
        },
    }))
}
