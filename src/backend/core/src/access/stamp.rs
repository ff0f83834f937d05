//! Tenant-stamping: new records inherit the creating actor's tenant.
//!
//! Runs exactly once per create, between record construction and persistence.
//! The actor's tenant is read at request time and written through directly,
//! so a later change to the account can never leak a stale or foreign tenant
//! onto the record.

use super::models::{Actor, TenantRef};

/// Stamp a new record's tenant slot from the creating actor.
///
/// Any client-supplied value is overwritten whenever the actor carries a
/// tenant. A super-admin has no tenant of their own; for them an explicitly
/// supplied reference is kept, since that is the only way a super-admin can
/// create tenant-owned content at all.
///
/// The stamped value is collapsed to the identifier form (the form that is
/// persisted) even when the actor's own reference arrived populated.
pub fn stamp_tenant(actor: &Actor, slot: &mut Option<TenantRef>) {
    if let Some(tenant) = actor.tenant.clone() {
        *slot = Some(TenantRef::Id(tenant.into_id()));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::models::{Tenant, TenantId};

    #[test]
    fn test_stamp_overwrites_client_supplied_tenant() {
        let actor = Actor::new(
            "a1",
            "tenant-admin",
            Some(TenantRef::Id(TenantId::new("t1"))),
        );

        // A client trying to smuggle a foreign tenant in.
        let mut slot = Some(TenantRef::Id(TenantId::new("t2")));
        stamp_tenant(&actor, &mut slot);

        assert_eq!(slot, Some(TenantRef::Id(TenantId::new("t1"))));
    }

    #[test]
    fn test_stamp_fills_empty_slot() {
        let actor = Actor::new("u1", "user", Some(TenantRef::Id(TenantId::new("t1"))));

        let mut slot = None;
        stamp_tenant(&actor, &mut slot);

        assert_eq!(slot, Some(TenantRef::Id(TenantId::new("t1"))));
    }

    #[test]
    fn test_stamp_collapses_populated_reference() {
        let actor = Actor::new(
            "a1",
            "tenant-admin",
            Some(TenantRef::Populated(Tenant {
                id: TenantId::new("t1"),
                name: "Acme".to_string(),
            })),
        );

        let mut slot = None;
        stamp_tenant(&actor, &mut slot);

        assert_eq!(slot, Some(TenantRef::Id(TenantId::new("t1"))));
    }

    #[test]
    fn test_super_admin_keeps_explicit_tenant() {
        let actor = Actor::new("root", "super-admin", None);

        let mut slot = Some(TenantRef::Id(TenantId::new("t3")));
        stamp_tenant(&actor, &mut slot);
        assert_eq!(slot, Some(TenantRef::Id(TenantId::new("t3"))));

        let mut empty = None;
        stamp_tenant(&actor, &mut empty);
        assert_eq!(empty, None);
    }
}
