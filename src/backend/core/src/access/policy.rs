//! The tenant-scoped access rules.
//!
//! [`decide`] answers, for every request: may this actor perform this
//! operation on this resource kind, and over which rows? It is a pure
//! function of its inputs, with no session state, no clock, and no I/O, so it is
//! safe to call concurrently from any number of requests, and identical
//! inputs always produce identical decisions.
//!
//! The function is total: malformed input (unknown role claim, missing
//! ownership data where an ownership check is required) produces a deny,
//! never a panic or an error.

use super::decision::{Constraint, Decision, DenyReason};
use super::models::{Actor, Candidate, Operation, ResourceKind, Role, TenantId};

/// Evaluate the access rules for one request.
///
/// `candidate` is the ownership view of the target record and is consulted
/// only where a decision depends on the persisted record (Form Update/Delete
/// ownership, a user updating their own account). Create and Read decisions
/// ignore it: there a filter over the result set is sufficient.
///
/// The rules, per resource kind (first match wins):
///
/// | Resource        | Operation       | super-admin | tenant-admin            | user                    |
/// |-----------------|-----------------|-------------|-------------------------|-------------------------|
/// | User            | Create          | Allow       | Allow                   | Deny                    |
/// | User            | Read            | Allow       | Filter(own tenant)      | Filter(own tenant)      |
/// | User            | Update          | Allow       | Filter(own tenant)      | self only               |
/// | User            | Delete          | Allow       | Filter(own tenant)      | Deny                    |
/// | Media           | Create          | Allow       | Allow                   | Allow                   |
/// | Media           | Read/Upd/Del    | Allow       | Filter(own tenant)      | Filter(own tenant)      |
/// | Tenant          | Read            | Allow       | Filter(own row)         | Filter(own row)         |
/// | Tenant          | Create/Upd/Del  | Allow       | Deny                    | Deny                    |
/// | Form            | Create          | Allow       | Allow                   | Deny                    |
/// | Form            | Read            | Allow       | Filter(own tenant)      | Filter(own tenant)      |
/// | Form            | Update/Delete   | Allow       | own tenant only         | Deny                    |
/// | FormSubmission  | Create          | Allow       | Allow                   | Allow (public)          |
/// | FormSubmission  | Read            | Allow       | Filter(via parent form) | Deny                    |
/// | FormSubmission  | Update/Delete   | Allow       | Deny                    | Deny                    |
///
/// An absent actor is denied everywhere except (FormSubmission, Create),
/// which is the public submission path.
pub fn decide(
    actor: Option<&Actor>,
    resource: ResourceKind,
    operation: Operation,
    candidate: Option<&Candidate>,
) -> Decision {
    let Some(actor) = actor else {
        // The public submission endpoint is the only actor-less allow.
        if resource == ResourceKind::FormSubmission && operation == Operation::Create {
            return Decision::Allow;
        }
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    let Some(role) = Role::parse(&actor.role) else {
        return Decision::Deny(DenyReason::InvalidRole);
    };

    if role == Role::SuperAdmin {
        return Decision::Allow;
    }

    // A tenant-admin or user without a tenant reference is a non-conformant
    // account. Such actors may still read their own user row; everything
    // else is denied rather than falling back to "no tenant = all tenants."
    let Some(tenant) = actor.tenant_id().cloned() else {
        if resource == ResourceKind::User && operation == Operation::Read {
            return Decision::Filter(Constraint::IdEquals(actor.id.as_str().to_string()));
        }
        return Decision::Deny(DenyReason::Forbidden);
    };

    match resource {
        ResourceKind::User => decide_user(role, operation, actor, tenant, candidate),
        ResourceKind::Media => decide_media(role, operation, tenant),
        ResourceKind::Tenant => decide_tenant(operation, tenant),
        ResourceKind::Form => decide_form(role, operation, tenant, candidate),
        ResourceKind::FormSubmission => decide_submission(role, operation, tenant),
    }
}

fn decide_user(
    role: Role,
    operation: Operation,
    actor: &Actor,
    tenant: TenantId,
    candidate: Option<&Candidate>,
) -> Decision {
    match (role, operation) {
        (Role::TenantAdmin, Operation::Create) => Decision::Allow,
        (Role::TenantAdmin, _) => Decision::tenant_filter(tenant),

        (Role::User, Operation::Read) => Decision::tenant_filter(tenant),
        (Role::User, Operation::Update) => match candidate {
            // Against a concrete record: a user may touch only their own row,
            // regardless of tenant.
            Some(c) => {
                if c.id.as_deref() == Some(actor.id.as_str()) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden)
                }
            }
            // List-shaped update: scope the row set to the actor themselves.
            None => Decision::Filter(Constraint::IdEquals(actor.id.as_str().to_string())),
        },
        (Role::User, _) => Decision::Deny(DenyReason::Forbidden),

        (Role::SuperAdmin, _) => Decision::Allow,
    }
}

fn decide_media(role: Role, operation: Operation, tenant: TenantId) -> Decision {
    match (role, operation) {
        // Any authenticated role may upload media; it is tenant-stamped on
        // the way in.
        (_, Operation::Create) => Decision::Allow,
        _ => Decision::tenant_filter(tenant),
    }
}

fn decide_tenant(operation: Operation, tenant: TenantId) -> Decision {
    match operation {
        // An account may see the tenant row it belongs to, nothing more.
        Operation::Read => Decision::Filter(Constraint::IdEquals(tenant.0)),
        _ => Decision::Deny(DenyReason::Forbidden),
    }
}

fn decide_form(
    role: Role,
    operation: Operation,
    tenant: TenantId,
    candidate: Option<&Candidate>,
) -> Decision {
    match (role, operation) {
        (Role::TenantAdmin, Operation::Create) => Decision::Allow,
        (Role::TenantAdmin, Operation::Read) => Decision::tenant_filter(tenant),
        (Role::TenantAdmin, Operation::Update | Operation::Delete) => {
            // Ownership is checked against the persisted record's tenant.
            // A request payload never participates in this comparison.
            match candidate.and_then(Candidate::tenant_id) {
                Some(record_tenant) if *record_tenant == tenant => Decision::Allow,
                Some(_) => Decision::Deny(DenyReason::TenantMismatch),
                None => Decision::Deny(DenyReason::Forbidden),
            }
        }

        (Role::User, Operation::Read) => Decision::tenant_filter(tenant),
        (Role::User, _) => Decision::Deny(DenyReason::Forbidden),

        (Role::SuperAdmin, _) => Decision::Allow,
    }
}

fn decide_submission(role: Role, operation: Operation, tenant: TenantId) -> Decision {
    match (role, operation) {
        (_, Operation::Create) => Decision::Allow,
        // Submissions carry no tenant column; reads are scoped through the
        // parent form's tenant.
        (Role::TenantAdmin, Operation::Read) => {
            Decision::Filter(Constraint::ParentFormTenantEquals(tenant))
        }
        _ => Decision::Deny(DenyReason::Forbidden),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::models::TenantRef;

    fn actor(id: &str, role: &str, tenant: Option<&str>) -> Actor {
        Actor::new(id, role, tenant.map(|t| TenantRef::Id(TenantId::new(t))))
    }

    fn all_resources() -> [ResourceKind; 5] {
        [
            ResourceKind::User,
            ResourceKind::Media,
            ResourceKind::Tenant,
            ResourceKind::Form,
            ResourceKind::FormSubmission,
        ]
    }

    fn all_operations() -> [Operation; 4] {
        [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
        ]
    }

    #[test]
    fn test_absent_actor_denied_everywhere_except_public_submission() {
        for resource in all_resources() {
            for operation in all_operations() {
                let decision = decide(None, resource, operation, None);
                if resource == ResourceKind::FormSubmission && operation == Operation::Create {
                    assert_eq!(decision, Decision::Allow);
                } else {
                    assert_eq!(decision, Decision::Deny(DenyReason::Unauthenticated));
                }
            }
        }
    }

    #[test]
    fn test_super_admin_allowed_everything() {
        let admin = actor("root", "super-admin", None);
        for resource in all_resources() {
            for operation in all_operations() {
                assert_eq!(
                    decide(Some(&admin), resource, operation, None),
                    Decision::Allow,
                    "super-admin must be allowed {} on {}",
                    operation,
                    resource
                );
            }
        }
    }

    #[test]
    fn test_unknown_role_denied() {
        let impostor = actor("u1", "administrator", Some("t1"));
        for resource in all_resources() {
            for operation in all_operations() {
                assert_eq!(
                    decide(Some(&impostor), resource, operation, None),
                    Decision::Deny(DenyReason::InvalidRole)
                );
            }
        }
    }

    #[test]
    fn test_tenantless_account_denied_except_self_read() {
        let broken = actor("u1", "tenant-admin", None);
        for resource in all_resources() {
            for operation in all_operations() {
                let decision = decide(Some(&broken), resource, operation, None);
                if resource == ResourceKind::User && operation == Operation::Read {
                    assert_eq!(
                        decision,
                        Decision::Filter(Constraint::IdEquals("u1".to_string()))
                    );
                } else {
                    assert_eq!(decision, Decision::Deny(DenyReason::Forbidden));
                }
            }
        }
    }

    #[test]
    fn test_tenant_admin_user_rules() {
        let admin = actor("a1", "tenant-admin", Some("t1"));

        assert_eq!(
            decide(Some(&admin), ResourceKind::User, Operation::Create, None),
            Decision::Allow
        );
        for operation in [Operation::Read, Operation::Update, Operation::Delete] {
            assert_eq!(
                decide(Some(&admin), ResourceKind::User, operation, None),
                Decision::tenant_filter(TenantId::new("t1"))
            );
        }
    }

    #[test]
    fn test_user_cannot_create_or_delete_users() {
        let user = actor("u1", "user", Some("t1"));
        assert_eq!(
            decide(Some(&user), ResourceKind::User, Operation::Create, None),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert_eq!(
            decide(Some(&user), ResourceKind::User, Operation::Delete, None),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_user_self_update_only() {
        let user = actor("u1", "user", Some("t1"));

        let own_row = Candidate::new("u1", Some(TenantRef::Id(TenantId::new("t1"))));
        assert_eq!(
            decide(Some(&user), ResourceKind::User, Operation::Update, Some(&own_row)),
            Decision::Allow
        );

        // A different user in the same tenant is still off limits.
        let neighbour = Candidate::new("u2", Some(TenantRef::Id(TenantId::new("t1"))));
        assert_eq!(
            decide(Some(&user), ResourceKind::User, Operation::Update, Some(&neighbour)),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_user_update_without_candidate_self_scopes() {
        let user = actor("u1", "user", Some("t1"));
        assert_eq!(
            decide(Some(&user), ResourceKind::User, Operation::Update, None),
            Decision::Filter(Constraint::IdEquals("u1".to_string()))
        );
    }

    #[test]
    fn test_media_create_open_to_all_roles() {
        for role in ["tenant-admin", "user"] {
            let a = actor("x", role, Some("t1"));
            assert_eq!(
                decide(Some(&a), ResourceKind::Media, Operation::Create, None),
                Decision::Allow
            );
        }
    }

    #[test]
    fn test_media_scoped_to_own_tenant() {
        let user = actor("u1", "user", Some("t1"));
        for operation in [Operation::Read, Operation::Update, Operation::Delete] {
            assert_eq!(
                decide(Some(&user), ResourceKind::Media, operation, None),
                Decision::tenant_filter(TenantId::new("t1"))
            );
        }
    }

    #[test]
    fn test_media_delete_filters_even_with_foreign_candidate() {
        // The filter excludes foreign rows at the query layer; the decision
        // itself stays a filter on the actor's own tenant.
        let admin = actor("a1", "tenant-admin", Some("A"));
        let foreign = Candidate::owned_by(TenantRef::Id(TenantId::new("B")));
        assert_eq!(
            decide(Some(&admin), ResourceKind::Media, Operation::Delete, Some(&foreign)),
            Decision::tenant_filter(TenantId::new("A"))
        );
    }

    #[test]
    fn test_tenant_collection_read_own_row_only() {
        let admin = actor("a1", "tenant-admin", Some("t1"));
        assert_eq!(
            decide(Some(&admin), ResourceKind::Tenant, Operation::Read, None),
            Decision::Filter(Constraint::IdEquals("t1".to_string()))
        );
        for operation in [Operation::Create, Operation::Update, Operation::Delete] {
            assert_eq!(
                decide(Some(&admin), ResourceKind::Tenant, operation, None),
                Decision::Deny(DenyReason::Forbidden)
            );
        }
    }

    #[test]
    fn test_form_create_tenant_admin_only() {
        let admin = actor("a1", "tenant-admin", Some("t1"));
        let user = actor("u1", "user", Some("t1"));

        assert_eq!(
            decide(Some(&admin), ResourceKind::Form, Operation::Create, None),
            Decision::Allow
        );
        assert_eq!(
            decide(Some(&user), ResourceKind::Form, Operation::Create, None),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_form_update_checks_persisted_tenant() {
        let admin = actor("a1", "tenant-admin", Some("t1"));

        let own = Candidate::owned_by(TenantRef::Id(TenantId::new("t1")));
        assert_eq!(
            decide(Some(&admin), ResourceKind::Form, Operation::Update, Some(&own)),
            Decision::Allow
        );

        let foreign = Candidate::owned_by(TenantRef::Id(TenantId::new("t2")));
        assert_eq!(
            decide(Some(&admin), ResourceKind::Form, Operation::Delete, Some(&foreign)),
            Decision::Deny(DenyReason::TenantMismatch)
        );

        // Missing ownership data is ambiguous input: deny, never guess.
        assert_eq!(
            decide(Some(&admin), ResourceKind::Form, Operation::Update, None),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_form_update_accepts_populated_tenant_ref() {
        let admin = actor("a1", "tenant-admin", Some("t1"));
        let populated = Candidate::owned_by(TenantRef::Populated(
            crate::access::models::Tenant {
                id: TenantId::new("t1"),
                name: "Acme".to_string(),
            },
        ));
        assert_eq!(
            decide(Some(&admin), ResourceKind::Form, Operation::Update, Some(&populated)),
            Decision::Allow
        );
    }

    #[test]
    fn test_submission_read_scoped_via_parent_form() {
        let admin = actor("a1", "tenant-admin", Some("t1"));
        assert_eq!(
            decide(Some(&admin), ResourceKind::FormSubmission, Operation::Read, None),
            Decision::Filter(Constraint::ParentFormTenantEquals(TenantId::new("t1")))
        );

        let user = actor("u1", "user", Some("t1"));
        assert_eq!(
            decide(Some(&user), ResourceKind::FormSubmission, Operation::Read, None),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_submission_mutations_denied_for_tenant_roles() {
        for role in ["tenant-admin", "user"] {
            let a = actor("x", role, Some("t1"));
            for operation in [Operation::Update, Operation::Delete] {
                assert_eq!(
                    decide(Some(&a), ResourceKind::FormSubmission, operation, None),
                    Decision::Deny(DenyReason::Forbidden)
                );
            }
        }
    }

    #[test]
    fn test_filter_always_names_own_tenant() {
        let admin = actor("a1", "tenant-admin", Some("mine"));
        let user = actor("u1", "user", Some("mine"));

        for a in [&admin, &user] {
            for resource in all_resources() {
                for operation in all_operations() {
                    if let Decision::Filter(constraint) =
                        decide(Some(a), resource, operation, None)
                    {
                        if let Some(tenant) = constraint.tenant_id() {
                            assert_eq!(tenant.as_str(), "mine");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_decide_is_idempotent() {
        let admin = actor("a1", "tenant-admin", Some("t1"));
        let candidate = Candidate::owned_by(TenantRef::Id(TenantId::new("t2")));

        let first = decide(Some(&admin), ResourceKind::Form, Operation::Update, Some(&candidate));
        let second = decide(Some(&admin), ResourceKind::Form, Operation::Update, Some(&candidate));
        assert_eq!(first, second);
    }
}
