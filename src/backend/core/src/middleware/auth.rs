//! Authentication middleware.
//!
//! Features:
//! - JWT bearer token validation (HS256)
//! - Anonymous pass-through on public paths (the public form contract)
//! - Token revocation tracking
//! - Request context injection
//!
//! The middleware only establishes *who* is calling; *what* they may do is
//! decided per request by the access rules. The authenticated context is
//! carried in request extensions and turned into an explicit [`Actor`]
//! argument at each decision call site; there is no ambient current-user
//! state anywhere in the crate.
//!
//! [`Actor`]: crate::access::Actor

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use futures::future::BoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use thiserror::Error;
use tower::{Layer, Service};
use tracing::debug;
use uuid::Uuid;

use crate::access::{Actor, TenantId, TenantRef};

// ═══════════════════════════════════════════════════════════════════════════════
// Error Types
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication credentials")]
    MissingCredentials,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "MISSING_CREDENTIALS",
                "Authentication credentials are required",
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "The provided token is invalid",
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_EXPIRED",
                "The authentication token has expired",
            ),
            Self::TokenRevoked => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_REVOKED",
                "The authentication token has been revoked",
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An authentication error occurred",
            ),
        };

        counter!(
            "atrium_auth_errors_total",
            "error_type" => code.to_string()
        )
        .increment(1);

        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JWT Claims
// ═══════════════════════════════════════════════════════════════════════════════

/// JWT token claims.
///
/// `role` and `tenant` travel as raw strings; the access rules own their
/// interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// User email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role claim (`super-admin`, `tenant-admin`, `user`)
    pub role: String,

    /// Tenant ID (absent for super-admins)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    /// Token ID for revocation tracking
    pub jti: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

impl Claims {
    /// Create new claims for a user session.
    pub fn new(
        user_id: impl Into<String>,
        role: impl Into<String>,
        tenant: Option<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.into(),
            email: None,
            role: role.into(),
            tenant,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Check if the token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT secret key (HS256)
    pub jwt_secret: String,

    /// Token lifetime
    pub token_ttl: Duration,

    /// Leeway for expiration checks (in seconds)
    pub leeway_secs: u64,

    /// Paths reachable without credentials. An entry ending in `/*` matches
    /// any deeper path; other entries match exactly.
    pub public_paths: Vec<String>,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::hours(12),
            leeway_secs: 60,
            public_paths: vec![
                "/health".to_string(),
                "/api/users/login".to_string(),
                "/api/forms/*".to_string(),
                "/api/form-submissions".to_string(),
            ],
        }
    }

    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn add_public_path(mut self, path: impl Into<String>) -> Self {
        self.public_paths.push(path.into());
        self
    }

    /// Check whether a request path is reachable without credentials.
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| {
            if let Some(prefix) = p.strip_suffix("/*") {
                path.starts_with(prefix) && path.len() > prefix.len()
            } else {
                path == p
            }
        })
    }

    /// Issue a signed token for the given claims.
    pub fn issue_token(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Decode and validate a token.
    pub fn decode_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Revocation Store
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory set of revoked token IDs. Thread-safe via `DashMap`.
#[derive(Debug, Clone, Default)]
pub struct RevocationStore {
    revoked: Arc<DashMap<String, ()>>,
}

impl RevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, jti: impl Into<String>) {
        self.revoked.insert(jti.into(), ());
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.contains_key(jti)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Authentication Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication context attached to requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID
    pub user_id: String,

    /// User email
    pub email: Option<String>,

    /// Raw role claim
    pub role: String,

    /// Tenant reference from the token
    pub tenant: Option<TenantRef>,

    /// Authentication method used
    pub auth_method: AuthMethod,

    /// Token ID
    pub token_id: Option<String>,

    /// Request ID for correlation
    pub request_id: String,
}

/// Authentication method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Jwt,
}

impl AuthContext {
    /// Create from verified JWT claims.
    pub fn from_claims(claims: Claims, request_id: String) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            tenant: claims.tenant.map(|t| TenantRef::Id(TenantId::new(t))),
            auth_method: AuthMethod::Jwt,
            token_id: Some(claims.jti),
            request_id,
        }
    }

    /// The actor this context represents, as the access rules see it.
    pub fn to_actor(&self) -> Actor {
        Actor::new(self.user_id.as_str(), self.role.as_str(), self.tenant.clone())
    }
}

/// Axum extractor for `AuthContext`. Rejects unauthenticated requests; use
/// `Option<AuthContext>` on routes that accept anonymous callers.
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer that authenticates requests and injects [`AuthContext`].
#[derive(Clone)]
pub struct AuthLayer {
    config: Arc<AuthConfig>,
    revocations: RevocationStore,
}

impl AuthLayer {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
            revocations: RevocationStore::new(),
        }
    }

    pub fn revocations(&self) -> RevocationStore {
        self.revocations.clone()
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            config: self.config.clone(),
            revocations: self.revocations.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Service that validates bearer tokens per request.
///
/// Credentials are always validated when present, including on public paths;
/// public paths only waive the *requirement*, so an authenticated caller on
/// the public form endpoints still gets a full context.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    config: Arc<AuthConfig>,
    revocations: RevocationStore,
}

impl<S> Service<Request<Body>> for AuthService<S>
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
        let config = self.config.clone();
        let revocations = self.revocations.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let path = request.uri().path().to_string();

            let bearer = request
                .headers()
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string);

            match bearer {
                Some(token) => {
                    let claims = match config.decode_token(&token) {
                        Ok(claims) => claims,
                        Err(err) => return Ok(err.into_response()),
                    };

                    if revocations.is_revoked(&claims.jti) {
                        return Ok(AuthError::TokenRevoked.into_response());
                    }

                    debug!(
                        user_id = %claims.sub,
                        role = %claims.role,
                        request_id = %request_id,
                        "Request authenticated"
                    );

                    let ctx = AuthContext::from_claims(claims, request_id);
                    request.extensions_mut().insert(ctx);
                }
                None => {
                    if !config.is_public_path(&path) {
                        return Ok(AuthError::MissingCredentials.into_response());
                    }
                    debug!(path = %path, request_id = %request_id, "Anonymous request on public path");
                }
            }

            inner.call(request).await
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("test-secret")
    }

    #[test]
    fn test_token_round_trip() {
        let config = config();
        let claims = Claims::new("u1", "tenant-admin", Some("t1".to_string()), Duration::hours(1))
            .with_email("admin@acme.test");

        let token = config.issue_token(&claims).unwrap();
        let decoded = config.decode_token(&token).unwrap();

        assert_eq!(decoded.sub, "u1");
        assert_eq!(decoded.role, "tenant-admin");
        assert_eq!(decoded.tenant.as_deref(), Some("t1"));
        assert_eq!(decoded.email.as_deref(), Some("admin@acme.test"));
        assert!(!decoded.is_expired());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let config = config();
        let claims = Claims::new("u1", "user", Some("t1".to_string()), Duration::hours(1));
        let token = config.issue_token(&claims).unwrap();

        let other = AuthConfig::new("different-secret");
        assert!(matches!(
            other.decode_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_public_path_matching() {
        let config = config();

        assert!(config.is_public_path("/health"));
        assert!(config.is_public_path("/api/users/login"));
        assert!(config.is_public_path("/api/form-submissions"));
        assert!(config.is_public_path("/api/forms/abc-123"));

        // The forms collection root is a management endpoint, not public.
        assert!(!config.is_public_path("/api/forms"));
        assert!(!config.is_public_path("/api/users"));
        assert!(!config.is_public_path("/api/media"));
    }

    #[test]
    fn test_revocation_store() {
        let store = RevocationStore::new();
        assert!(!store.is_revoked("jti-1"));

        store.revoke("jti-1");
        assert!(store.is_revoked("jti-1"));
        assert!(!store.is_revoked("jti-2"));
    }

    #[test]
    fn test_context_to_actor() {
        let claims = Claims::new("u1", "user", Some("t1".to_string()), Duration::hours(1));
        let ctx = AuthContext::from_claims(claims, "req-1".to_string());

        let actor = ctx.to_actor();
        assert_eq!(actor.id.as_str(), "u1");
        assert_eq!(actor.role, "user");
        assert_eq!(actor.tenant_id().map(TenantId::as_str), Some("t1"));
    }

    #[test]
    fn test_super_admin_claims_carry_no_tenant() {
        let claims = Claims::new("root", "super-admin", None, Duration::hours(1));
        let ctx = AuthContext::from_claims(claims, "req-2".to_string());

        assert!(ctx.to_actor().tenant.is_none());
    }
}
