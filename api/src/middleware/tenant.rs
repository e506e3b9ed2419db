//! Tenant scope resolution layer.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::ApiState;

const SLUG_HEADER: &str = "x-tenant-slug";

/// Works out which surface the request arrived on and stores the scope
/// as a request extension.
///
/// The Host header decides; the `X-Tenant-Slug` header overrides it for
/// frontends that sit behind a host-rewriting proxy.
pub async fn resolve_scope(
    State(state): State<Arc<ApiState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        // HTTP/2 carries the host in the :authority pseudo-header.
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_owned()));

    let slug_header = req
        .headers()
        .get(SLUG_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let scope = state
        .resolver
        .resolve(host.as_deref(), slug_header.as_deref());
    tracing::debug!(%scope, host = host.as_deref().unwrap_or("-"), "resolved tenant scope");

    req.extensions_mut().insert(scope);
    next.run(req).await
}
