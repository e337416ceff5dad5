use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::info;
use uuid::Uuid;

use ripple_types::api::{Claims, MediaResponse};

use crate::auth::AppState;
use crate::blob::content_type;
use crate::error::ApiError;

/// 50 MB upload limit, enforced by the body limit on the upload route.
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// POST /media — accepts a multipart form with a `file` field, stores it
/// under a fresh object name, and returns the retrievable URL. The caller
/// is expected to pass that URL back in later message bodies; nothing
/// verifies the two ends up matching.
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart body".into()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::Validation("failed to read file".into()))?;

        if data.is_empty() {
            return Err(ApiError::Validation("file is required".into()));
        }

        // Fresh object name; keep the extension so content types survive.
        let ext = std::path::Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str());
        let object_name = match ext {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        let url = state
            .blobs
            .put(&object_name, &data)
            .await
            .map_err(ApiError::Internal)?;

        info!(url = %url, size = data.len(), "media uploaded");
        return Ok(Json(MediaResponse { url }));
    }

    Err(ApiError::Validation("file is required".into()))
}

/// GET /media/{object} — serves a stored blob. Public: possession of the
/// URL is the only requirement, matching the opaque-URL contract.
pub async fn get_media(
    State(state): State<AppState>,
    Path(object): Path<String>,
) -> Result<Response, ApiError> {
    // Object names are server-generated; anything path-like is bogus.
    if object.contains('/') || object.contains('\\') || object.contains("..") {
        return Err(ApiError::NotFound("media not found"));
    }

    let Some(bytes) = state.blobs.get(&object).await.map_err(ApiError::Internal)? else {
        return Err(ApiError::NotFound("media not found"));
    };

    Ok(([(header::CONTENT_TYPE, content_type(&object))], bytes).into_response())
}
