//! Optional API-key gate: `X-API-Key` header or `authkey` query parameter.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::ApiError, AppState};

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        // No key configured: auth disabled.
        return Ok(next.run(request).await);
    };

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    let query_key = request.uri().query().and_then(|query| {
        query.split('&').find_map(|pair| {
            pair.strip_prefix("authkey=").map(|v| v.to_string())
        })
    });

    let provided = header_key.map(str::to_string).or(query_key);
    match provided {
        Some(key) if key == expected => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized),
    }
}
