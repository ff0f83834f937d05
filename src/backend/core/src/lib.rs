//! # Atrium Core
//!
//! Multi-tenant content management backend.
//!
//! ## Architecture
//!
//! - **Access**: the tenant-scoped authorization engine, a pure decision
//!   function over (actor, resource kind, operation, candidate record)
//!   returning `Allow | Deny | Filter`
//! - **Collections**: the protected resources (Users, Media, Tenants, Forms,
//!   Form Submissions)
//! - **DB**: PostgreSQL persistence that translates filter decisions into
//!   scoped queries
//! - **API**: Axum routes, including the public form fetch/submit contract
//! - **Middleware**: JWT authentication with anonymous pass-through on the
//!   public paths
//! - **Telemetry**: structured logging

pub mod access;
pub mod api;
pub mod collections;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod telemetry;

pub use error::{AtriumError, ErrorCode, ErrorContext, ErrorSeverity, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::access::{
        decide, stamp_tenant, AccessContext, Actor, Candidate, Constraint, Decision, DenyReason,
        FormId, Operation, RequireAccessLayer, ResourceKind, Role, Tenant, TenantId, TenantRef,
        UserId,
    };
    pub use crate::collections::{
        FormField, FormRecord, MediaId, MediaRecord, SubmissionId, SubmissionRecord,
        SubmissionValue, TenantRecord, UserRecord,
    };
    pub use crate::error::{AtriumError, ErrorCode, ErrorContext, ErrorSeverity, Result};
    pub use crate::middleware::{
        AuthConfig, AuthContext, AuthError, AuthLayer, AuthMethod, Claims, RevocationStore,
    };
}
