//! HTTP API for Atrium Core.
//!
//! Two surfaces share one router:
//!
//! - The **management API** under `/api/*`: authenticated collection CRUD,
//!   where every handler passes the request's actor through the access rules
//!   and applies the resulting row constraint to its queries.
//! - The **public form contract**: `GET /api/forms/:id` and
//!   `POST /api/form-submissions` stay reachable for anonymous callers; the
//!   submission path is the access rules' single actor-less allow.

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::access::{Operation, RequireAccessLayer, ResourceKind};
use crate::db::Database;
use crate::middleware::auth::{AuthConfig, AuthLayer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthConfig>,
}

/// Build the API router.
///
/// Create routes are gated by [`RequireAccessLayer`]; read, update, and
/// delete handlers evaluate the rules themselves because they need the
/// resulting filter (or the persisted record's ownership view) to shape
/// their queries.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_layer = AuthLayer::new(state.auth.as_ref().clone());

    // Each create route carries its own access gate.
    let create_routes = Router::new()
        .route("/api/users", post(handlers::create_user))
        .route_layer(RequireAccessLayer::new(
            ResourceKind::User,
            Operation::Create,
        ))
        .merge(
            Router::new()
                .route("/api/media", post(handlers::create_media))
                .route_layer(RequireAccessLayer::new(
                    ResourceKind::Media,
                    Operation::Create,
                )),
        )
        .merge(
            Router::new()
                .route("/api/tenants", post(handlers::create_tenant))
                .route_layer(RequireAccessLayer::new(
                    ResourceKind::Tenant,
                    Operation::Create,
                )),
        )
        .merge(
            Router::new()
                .route("/api/forms", post(handlers::create_form))
                .route_layer(RequireAccessLayer::new(
                    ResourceKind::Form,
                    Operation::Create,
                )),
        );

    Router::new()
        // Unversioned health probe
        .route("/health", get(handlers::health_check))
        // Session
        .route("/api/users/login", post(handlers::login))
        .route("/api/users/me", get(handlers::me))
        // Users
        .route("/api/users", get(handlers::list_users))
        .route(
            "/api/users/:id",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // Media
        .route("/api/media", get(handlers::list_media))
        .route(
            "/api/media/:id",
            get(handlers::get_media)
                .patch(handlers::update_media)
                .delete(handlers::delete_media),
        )
        // Tenants
        .route("/api/tenants", get(handlers::list_tenants))
        .route("/api/tenants/:id", get(handlers::get_tenant))
        // Forms: the single-form GET is the public delivery contract
        .route("/api/forms", get(handlers::list_forms))
        .route(
            "/api/forms/:id",
            get(handlers::public_get_form)
                .patch(handlers::update_form)
                .delete(handlers::delete_form),
        )
        // Form submissions: POST is public, GET is scoped via parent form
        .route(
            "/api/form-submissions",
            get(handlers::list_form_submissions).post(handlers::create_form_submission),
        )
        .merge(create_routes)
        // Middleware
        .layer(auth_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// API response wrapper.
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, Some("test data"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error() {
        let response: ApiResponse<()> = ApiResponse::error("test error");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error, Some("test error".to_string()));
    }
}
