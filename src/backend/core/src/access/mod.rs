//! Tenant-scoped access control.
//!
//! This module is the decision core of Atrium:
//! - **Models**: actors, roles, tenant references, resource kinds, operations
//! - **Decision**: the closed `Allow | Deny | Filter` outcome type
//! - **Policy**: [`decide`], the pure rule evaluation
//! - **Stamping**: tenant inheritance for newly created records
//! - **Middleware**: Axum layer enforcing decisions at the route boundary
//!
//! # Usage
//!
//! ```rust,ignore
//! use atrium_core::access::{decide, Decision, Operation, ResourceKind};
//!
//! match decide(actor.as_ref(), ResourceKind::Media, Operation::Read, None) {
//!     Decision::Allow => { /* unscoped query */ }
//!     Decision::Filter(constraint) => { /* scoped query */ }
//!     Decision::Deny(reason) => { /* 401/403 */ }
//! }
//! ```

pub mod decision;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod stamp;

pub use decision::{Constraint, Decision, DenyReason};
pub use middleware::{AccessContext, RequireAccessLayer, RequireAccessService};
pub use models::{
    Actor, Candidate, FormId, Operation, ResourceKind, Role, Tenant, TenantId, TenantRef, UserId,
};
pub use policy::decide;
pub use stamp::stamp_tenant;
