//! Access-control data models: identifiers, roles, actors, and tenant references.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_uuid() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_uuid() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed form identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(pub String);

impl FormId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_uuid() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FormId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FormId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role
// ═══════════════════════════════════════════════════════════════════════════════

/// The closed set of account roles.
///
/// `role` is the sole discriminator in the access rules: there is no hierarchy
/// beyond these three fixed values. `SuperAdmin` dominates every rule for every
/// resource; the other two are always scoped to their tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    TenantAdmin,
    User,
}

impl Role {
    /// Parse a role from its wire form (`"super-admin"`, `"tenant-admin"`,
    /// `"user"`). Returns `None` for anything outside the closed set.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "super-admin" => Some(Self::SuperAdmin),
            "tenant-admin" => Some(Self::TenantAdmin),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// The canonical wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super-admin",
            Self::TenantAdmin => "tenant-admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tenant
// ═══════════════════════════════════════════════════════════════════════════════

/// A tenant: the isolation boundary that owns users, media, forms, and
/// submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TenantId::from_uuid(),
            name: name.into(),
        }
    }
}

/// A reference to a tenant as it appears on a record or an actor.
///
/// Depending on query depth, a relationship value arrives either as a raw
/// identifier or as the populated entity. Both forms normalize to the same
/// comparable identifier via [`TenantRef::id`]; equality checks in the access
/// rules must only ever go through that method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TenantRef {
    Id(TenantId),
    Populated(Tenant),
}

impl TenantRef {
    /// The comparable identifier, regardless of representation.
    pub fn id(&self) -> &TenantId {
        match self {
            Self::Id(id) => id,
            Self::Populated(tenant) => &tenant.id,
        }
    }

    /// Collapse to the identifier form (the form that is persisted).
    pub fn into_id(self) -> TenantId {
        match self {
            Self::Id(id) => id,
            Self::Populated(tenant) => tenant.id,
        }
    }
}

impl From<TenantId> for TenantRef {
    fn from(id: TenantId) -> Self {
        Self::Id(id)
    }
}

impl From<Tenant> for TenantRef {
    fn from(tenant: Tenant) -> Self {
        Self::Populated(tenant)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Actor
// ═══════════════════════════════════════════════════════════════════════════════

/// The authenticated principal making a request.
///
/// The role is kept in its raw claim form so the decision function itself owns
/// the unknown-role deny path; parsing happens inside [`decide`], not at the
/// authentication boundary.
///
/// [`decide`]: crate::access::decide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    /// Raw role claim as supplied by the authentication collaborator.
    pub role: String,
    /// Absent only for conformant `super-admin` accounts.
    pub tenant: Option<TenantRef>,
}

impl Actor {
    pub fn new(id: impl Into<UserId>, role: impl Into<String>, tenant: Option<TenantRef>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            tenant,
        }
    }

    /// The actor's tenant identifier, normalized from either reference form.
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant.as_ref().map(TenantRef::id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource Kinds and Operations
// ═══════════════════════════════════════════════════════════════════════════════

/// The protected resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    User,
    Media,
    Tenant,
    Form,
    FormSubmission,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Media => "media",
            Self::Tenant => "tenant",
            Self::Form => "form",
            Self::FormSubmission => "form-submission",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The operations a request may perform on a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Candidate
// ═══════════════════════════════════════════════════════════════════════════════

/// The ownership view of a target record, for decisions that depend on the
/// persisted record rather than a result-set filter (Update/Delete on an
/// existing row).
///
/// The tenant reference here must come from the persisted record, never from
/// the request payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub id: Option<String>,
    pub tenant: Option<TenantRef>,
}

impl Candidate {
    /// Candidate with both identity and tenant ownership.
    pub fn new(id: impl Into<String>, tenant: Option<TenantRef>) -> Self {
        Self {
            id: Some(id.into()),
            tenant,
        }
    }

    /// Candidate carrying only a tenant reference.
    pub fn owned_by(tenant: TenantRef) -> Self {
        Self {
            id: None,
            tenant: Some(tenant),
        }
    }

    /// The candidate's tenant identifier, normalized from either form.
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant.as_ref().map(TenantRef::id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_closed_set() {
        assert_eq!(Role::parse("super-admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("tenant-admin"), Some(Role::TenantAdmin));
        assert_eq!(Role::parse("user"), Some(Role::User));

        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse("SUPER-ADMIN"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::SuperAdmin, Role::TenantAdmin, Role::User] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_role_serde_kebab_case() {
        let json = serde_json::to_string(&Role::TenantAdmin).unwrap();
        assert_eq!(json, "\"tenant-admin\"");

        let role: Role = serde_json::from_str("\"super-admin\"").unwrap();
        assert_eq!(role, Role::SuperAdmin);
    }

    #[test]
    fn test_tenant_ref_normalizes_both_forms() {
        let raw = TenantRef::Id(TenantId::new("t1"));
        let populated = TenantRef::Populated(Tenant {
            id: TenantId::new("t1"),
            name: "Acme".to_string(),
        });

        assert_eq!(raw.id(), populated.id());
    }

    #[test]
    fn test_tenant_ref_deserializes_id_or_object() {
        let from_id: TenantRef = serde_json::from_str("\"t1\"").unwrap();
        assert_eq!(from_id.id().as_str(), "t1");

        let from_object: TenantRef =
            serde_json::from_str(r#"{"id": "t1", "name": "Acme"}"#).unwrap();
        assert_eq!(from_object.id().as_str(), "t1");
    }

    #[test]
    fn test_actor_tenant_id() {
        let actor = Actor::new("u1", "user", Some(TenantRef::Id(TenantId::new("t1"))));
        assert_eq!(actor.tenant_id().map(TenantId::as_str), Some("t1"));

        let no_tenant = Actor::new("u2", "super-admin", None);
        assert!(no_tenant.tenant_id().is_none());
    }

    #[test]
    fn test_candidate_tenant_id() {
        let candidate = Candidate::owned_by(TenantRef::Id(TenantId::new("t9")));
        assert_eq!(candidate.tenant_id().map(TenantId::as_str), Some("t9"));
        assert!(candidate.id.is_none());

        let full = Candidate::new("rec-1", None);
        assert_eq!(full.id.as_deref(), Some("rec-1"));
        assert!(full.tenant_id().is_none());
    }
}
