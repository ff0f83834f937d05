//! The decision type returned by the access rules.
//!
//! Every caller handles all three cases explicitly; there is no truthy value
//! or bare query object standing in for an outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::models::TenantId;

// ═══════════════════════════════════════════════════════════════════════════════
// Deny Reasons
// ═══════════════════════════════════════════════════════════════════════════════

/// Why a request was denied.
///
/// All variants produce the same rejection; the distinction exists for
/// logging and error reporting, not for branching in the rules themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No actor was present on the request.
    Unauthenticated,
    /// An actor was present but the rules deny the operation.
    Forbidden,
    /// The actor's role claim is outside the closed role set.
    InvalidRole,
    /// An ownership check found a record tenant that does not equal the
    /// actor's tenant.
    TenantMismatch,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::InvalidRole => "invalid_role",
            Self::TenantMismatch => "tenant_mismatch",
        };
        write!(f, "{}", s)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constraint
// ═══════════════════════════════════════════════════════════════════════════════

/// A row-set constraint the persistence layer must apply when a decision
/// permits the operation only on the actor's own slice of the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Rows whose tenant reference equals the given tenant.
    TenantEquals(TenantId),
    /// Rows whose parent form's tenant equals the given tenant (submissions
    /// carry no tenant column of their own).
    ParentFormTenantEquals(TenantId),
    /// Rows whose primary identifier equals the given value (self-scoped
    /// access).
    IdEquals(String),
}

impl Constraint {
    /// The tenant identifier this constraint scopes to, when it is
    /// tenant-shaped.
    pub fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            Self::TenantEquals(id) | Self::ParentFormTenantEquals(id) => Some(id),
            Self::IdEquals(_) => None,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TenantEquals(id) => write!(f, "tenant = {}", id),
            Self::ParentFormTenantEquals(id) => write!(f, "form.tenant = {}", id),
            Self::IdEquals(id) => write!(f, "id = {}", id),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// The outcome of an access evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The operation proceeds unconditionally.
    Allow,
    /// The operation is rejected.
    Deny(DenyReason),
    /// The operation proceeds, constrained to the rows the constraint admits.
    Filter(Constraint),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    /// The constraint to hand to the persistence layer: `None` means the
    /// query runs unscoped.
    pub fn constraint(&self) -> Option<&Constraint> {
        match self {
            Self::Filter(c) => Some(c),
            _ => None,
        }
    }

    /// Shorthand for a tenant-scoped filter.
    pub fn tenant_filter(tenant: TenantId) -> Self {
        Self::Filter(Constraint::TenantEquals(tenant))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny(reason) => write!(f, "deny ({})", reason),
            Self::Filter(constraint) => write!(f, "filter ({})", constraint),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_predicates() {
        assert!(Decision::Allow.is_allowed());
        assert!(!Decision::Allow.is_denied());

        let deny = Decision::Deny(DenyReason::Forbidden);
        assert!(deny.is_denied());
        assert!(!deny.is_allowed());

        let filter = Decision::tenant_filter(TenantId::new("t1"));
        assert!(!filter.is_allowed());
        assert!(!filter.is_denied());
    }

    #[test]
    fn test_constraint_accessors() {
        let filter = Decision::tenant_filter(TenantId::new("t1"));
        assert_eq!(
            filter
                .constraint()
                .and_then(Constraint::tenant_id)
                .map(TenantId::as_str),
            Some("t1")
        );

        assert!(Decision::Allow.constraint().is_none());

        let self_scope = Constraint::IdEquals("u1".to_string());
        assert!(self_scope.tenant_id().is_none());
    }

    #[test]
    fn test_parent_form_constraint_carries_tenant() {
        let c = Constraint::ParentFormTenantEquals(TenantId::new("t2"));
        assert_eq!(c.tenant_id().map(TenantId::as_str), Some("t2"));
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(Decision::Allow.to_string(), "allow");
        assert_eq!(
            Decision::Deny(DenyReason::TenantMismatch).to_string(),
            "deny (tenant_mismatch)"
        );
        assert_eq!(
            Decision::tenant_filter(TenantId::new("t1")).to_string(),
            "filter (tenant = t1)"
        );
    }
}
