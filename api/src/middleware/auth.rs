//! Authentication layer.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::verify_token;
use crate::error::ApiError;
use crate::ApiState;

/// Verifies the bearer token, when one is presented, and stores the
/// caller as a request extension.
///
/// A request without an Authorization header passes through anonymous;
/// the policy layer refuses it later unless the route is public. A
/// header that is present but wrong is refused here, malformed
/// credentials are never silently downgraded to anonymous.
pub async fn authenticate(
    State(state): State<Arc<ApiState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Some(header) = header {
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::InvalidToken)?;
        let claims = verify_token(token, &state.config.jwt_secret).map_err(|err| {
            tracing::debug!(error = %err, "token verification failed");
            ApiError::InvalidToken
        })?;
        let caller = claims.into_caller()?;

        tracing::debug!(
            user = %caller.user_id(),
            super_admin = caller.is_super_admin(),
            "authenticated caller"
        );
        req.extensions_mut().insert(caller);
    }

    Ok(next.run(req).await)
}
