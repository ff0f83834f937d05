//! Axum enforcement layer for route-level access checks.
//!
//! The layer evaluates the access rules for a fixed (resource, operation)
//! pair using the `AuthContext` injected by the authentication middleware,
//! rejects denials before the handler runs, and exposes the actor and the
//! decision to the handler through an [`AccessContext`] extension.
//!
//! Record-level ownership checks (Update/Delete against an existing row)
//! still happen inside handlers, which load the persisted record and call
//! [`decide`] with a candidate.
//!
//! [`decide`]: crate::access::decide

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::decision::{Decision, DenyReason};
use super::models::{Actor, Operation, ResourceKind};
use super::policy::decide;
use crate::middleware::auth::AuthContext;

// ═══════════════════════════════════════════════════════════════════════════════
// Access Context (extracted in handlers)
// ═══════════════════════════════════════════════════════════════════════════════

/// The evaluated request context, inserted into request extensions by
/// [`RequireAccessLayer`] so handlers can reuse the actor and the decision
/// without re-evaluating the rules.
#[derive(Debug, Clone)]
pub struct AccessContext {
    /// The actor the decision was made for; `None` on the public path.
    pub actor: Option<Actor>,
    /// The decision that admitted the request (never a deny).
    pub decision: Decision,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AccessContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessContext>()
            .cloned()
            .ok_or_else(|| {
                let body = serde_json::json!({
                    "success": false,
                    "error": {
                        "code": "MISSING_ACCESS_CONTEXT",
                        "message": "Access context not available. Ensure the access layer is applied to this route.",
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer that gates a route on the access rules for one (resource, operation)
/// pair.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/api/users", post(create_user))
///     .layer(RequireAccessLayer::new(ResourceKind::User, Operation::Create));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAccessLayer {
    resource: ResourceKind,
    operation: Operation,
}

impl RequireAccessLayer {
    pub fn new(resource: ResourceKind, operation: Operation) -> Self {
        Self {
            resource,
            operation,
        }
    }
}

impl<S> Layer<S> for RequireAccessLayer {
    type Service = RequireAccessService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireAccessService {
            inner,
            resource: self.resource,
            operation: self.operation,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Service that evaluates the access rules before forwarding the request.
#[derive(Debug, Clone)]
pub struct RequireAccessService<S> {
    inner: S,
    resource: ResourceKind,
    operation: Operation,
}

impl<S> Service<Request<Body>> for RequireAccessService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let resource = self.resource;
        let operation = self.operation;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let actor = request
                .extensions()
                .get::<AuthContext>()
                .map(AuthContext::to_actor);

            let decision = decide(actor.as_ref(), resource, operation, None);

            match &decision {
                Decision::Deny(reason) => {
                    warn!(
                        resource = %resource,
                        operation = %operation,
                        reason = %reason,
                        actor = actor.as_ref().map(|a| a.id.as_str()).unwrap_or("-"),
                        "Request denied"
                    );
                    return Ok(denial_response(*reason));
                }
                decision => {
                    debug!(
                        resource = %resource,
                        operation = %operation,
                        decision = %decision,
                        "Request admitted"
                    );
                }
            }

            request
                .extensions_mut()
                .insert(AccessContext { actor, decision });
            inner.call(request).await
        })
    }
}

/// Build the JSON rejection for a denial.
fn denial_response(reason: DenyReason) -> Response {
    let (status, code, message) = match reason {
        DenyReason::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Authentication is required for this resource",
        ),
        DenyReason::InvalidRole => (
            StatusCode::FORBIDDEN,
            "INVALID_ROLE",
            "This account has an unrecognized role",
        ),
        DenyReason::TenantMismatch => (
            StatusCode::FORBIDDEN,
            "TENANT_MISMATCH",
            "This record belongs to a different tenant",
        ),
        DenyReason::Forbidden => (
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "You do not have permission to perform this action",
        ),
    };

    let body = serde_json::json!({
        "success": false,
        "error": {
            "code": code,
            "message": message,
        }
    });
    (status, Json(body)).into_response()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::models::{TenantId, TenantRef};

    #[test]
    fn test_access_context_carries_decision() {
        let ctx = AccessContext {
            actor: Some(Actor::new(
                "a1",
                "tenant-admin",
                Some(TenantRef::Id(TenantId::new("t1"))),
            )),
            decision: Decision::Allow,
        };

        assert!(ctx.decision.is_allowed());
        assert_eq!(ctx.actor.unwrap().id.as_str(), "a1");
    }

    #[test]
    fn test_denial_response_status_mapping() {
        let unauthenticated = denial_response(DenyReason::Unauthenticated);
        assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);

        for reason in [
            DenyReason::Forbidden,
            DenyReason::InvalidRole,
            DenyReason::TenantMismatch,
        ] {
            assert_eq!(denial_response(reason).status(), StatusCode::FORBIDDEN);
        }
    }
}
