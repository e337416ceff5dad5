use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::auth::AppState;
use crate::error::ApiError;

/// Extract and validate the bearer token from the Authorization header,
/// attaching the verified claims to the request for downstream handlers.
///
/// Authorization is purely a function of the token: no store lookup, no
/// caching across requests. The three rejection states are distinct
/// (missing header, malformed scheme, failed validation) but all map to
/// 401 at the boundary.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(raw) = req.headers().get(header::AUTHORIZATION) else {
        return Err(ApiError::Unauthorized("authorization header required"));
    };

    let raw = raw
        .to_str()
        .map_err(|_| ApiError::Unauthorized("invalid authorization header format"))?;

    // Exactly "Bearer <token>", scheme case-sensitive. Extra segments are
    // a format problem, not a token problem.
    let token = match raw.split_once(' ') {
        Some(("Bearer", token)) if !token.contains(' ') => token,
        _ => return Err(ApiError::Unauthorized("invalid authorization header format")),
    };

    let claims = state
        .tokens
        .validate(token)
        .map_err(|_| ApiError::Unauthorized("invalid or expired token"))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
