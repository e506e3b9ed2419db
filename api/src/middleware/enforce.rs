//! Policy enforcement layer.
//!
//! Runs after routing, so the matched route template is available and
//! the policy table can be keyed by the same strings the router was
//! built from. A route that never got a policy declared is refused, not
//! waved through.

use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use consentry_access::{AccessDecision, Caller, DenyReason, TenantScope};

use crate::error::ApiError;
use crate::middleware::CurrentTenant;
use crate::ApiState;

pub async fn enforce_policy(
    State(state): State<Arc<ApiState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let scope = req
        .extensions()
        .get::<TenantScope>()
        .cloned()
        .unwrap_or(TenantScope::Base);
    let caller = req.extensions().get::<Caller>().cloned();

    let policy = match state.policies.lookup(method.as_str(), &path) {
        Some(policy) => policy.clone(),
        None => {
            tracing::warn!(%method, %path, "route has no declared access policy, refusing");
            return Err(ApiError::denied(
                &DenyReason::UndeclaredRoute,
                state.resolver.base_domain(),
            ));
        }
    };

    if !policy.public && caller.is_none() {
        return Err(ApiError::AuthRequired);
    }

    let decision = state.guard.authorize(&scope, caller.as_ref(), &policy).await;
    let tenant = match decision {
        AccessDecision::Admit { tenant } => tenant,
        AccessDecision::Deny(reason) => {
            return Err(ApiError::denied(&reason, state.resolver.base_domain()));
        }
    };

    // Early refusal for create routes on a full tenant. Advisory: the
    // ledger's atomic insert is the gate that holds under races.
    if let (Some(kind), Some(tenant)) = (policy.quota, tenant.as_ref()) {
        state.quota.ensure_capacity(tenant, kind).await?;
    }

    req.extensions_mut().insert(CurrentTenant(tenant));
    Ok(next.run(req).await)
}
