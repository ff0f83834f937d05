//! Integration tests for the tenant-scoped access rules.

use atrium_core::access::{
    decide, stamp_tenant, Actor, Candidate, Constraint, Decision, DenyReason, Operation,
    ResourceKind, TenantId, TenantRef,
};

fn actor(id: &str, role: &str, tenant: Option<&str>) -> Actor {
    Actor::new(id, role, tenant.map(|t| TenantRef::Id(TenantId::new(t))))
}

fn super_admin() -> Actor {
    actor("root", "super-admin", None)
}

fn tenant_admin(tenant: &str) -> Actor {
    actor("admin", "tenant-admin", Some(tenant))
}

fn member(id: &str, tenant: &str) -> Actor {
    actor(id, "user", Some(tenant))
}

const ALL_RESOURCES: [ResourceKind; 5] = [
    ResourceKind::User,
    ResourceKind::Media,
    ResourceKind::Tenant,
    ResourceKind::Form,
    ResourceKind::FormSubmission,
];

const ALL_OPERATIONS: [Operation; 4] = [
    Operation::Create,
    Operation::Read,
    Operation::Update,
    Operation::Delete,
];

#[test]
fn test_anonymous_denied_everywhere_except_public_submission() {
    for resource in ALL_RESOURCES {
        for operation in ALL_OPERATIONS {
            let decision = decide(None, resource, operation, None);

            if resource == ResourceKind::FormSubmission && operation == Operation::Create {
                assert_eq!(decision, Decision::Allow, "public submission must stay open");
            } else {
                assert_eq!(
                    decision,
                    Decision::Deny(DenyReason::Unauthenticated),
                    "anonymous {} on {} must be denied",
                    operation,
                    resource
                );
            }
        }
    }
}

#[test]
fn test_super_admin_unconditional_allow() {
    let admin = super_admin();
    let foreign = Candidate::new("someone-else", Some(TenantRef::Id(TenantId::new("t9"))));

    for resource in ALL_RESOURCES {
        for operation in ALL_OPERATIONS {
            // With and without a candidate, and regardless of whose record
            // it is, the answer is the same.
            assert_eq!(decide(Some(&admin), resource, operation, None), Decision::Allow);
            assert_eq!(
                decide(Some(&admin), resource, operation, Some(&foreign)),
                Decision::Allow
            );
        }
    }
}

#[test]
fn test_filters_always_name_the_actors_own_tenant() {
    for a in [tenant_admin("tenant-a"), member("u1", "tenant-a")] {
        for resource in ALL_RESOURCES {
            for operation in ALL_OPERATIONS {
                if let Decision::Filter(constraint) = decide(Some(&a), resource, operation, None) {
                    if let Some(tenant) = constraint.tenant_id() {
                        assert_eq!(
                            tenant.as_str(),
                            "tenant-a",
                            "{} {} filter must scope to the actor's tenant",
                            resource,
                            operation
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_user_self_update_is_exact_id_match() {
    let alice = member("alice", "t1");

    let own = Candidate::new("alice", Some(TenantRef::Id(TenantId::new("t1"))));
    assert_eq!(
        decide(Some(&alice), ResourceKind::User, Operation::Update, Some(&own)),
        Decision::Allow
    );

    // Same tenant is not enough; the id must match.
    let same_tenant_other = Candidate::new("bob", Some(TenantRef::Id(TenantId::new("t1"))));
    assert_eq!(
        decide(
            Some(&alice),
            ResourceKind::User,
            Operation::Update,
            Some(&same_tenant_other)
        ),
        Decision::Deny(DenyReason::Forbidden)
    );

    let other_tenant = Candidate::new("eve", Some(TenantRef::Id(TenantId::new("t2"))));
    assert_eq!(
        decide(
            Some(&alice),
            ResourceKind::User,
            Operation::Update,
            Some(&other_tenant)
        ),
        Decision::Deny(DenyReason::Forbidden)
    );
}

#[test]
fn test_form_round_trip_visibility_across_tenants() {
    // A tenant-admin of T creates a form; stamping pins it to T.
    let creator = tenant_admin("T");
    assert_eq!(
        decide(Some(&creator), ResourceKind::Form, Operation::Create, None),
        Decision::Allow
    );

    let mut slot = None;
    stamp_tenant(&creator, &mut slot);
    let form_tenant = slot.expect("form must be tenant-stamped");
    assert_eq!(form_tenant.id().as_str(), "T");

    // A reader in T gets a filter that admits the form's tenant.
    let same_tenant_reader = member("r1", "T");
    let decision = decide(Some(&same_tenant_reader), ResourceKind::Form, Operation::Read, None);
    assert_eq!(
        decision,
        Decision::Filter(Constraint::TenantEquals(TenantId::new("T")))
    );
    let constraint = decision.constraint().unwrap();
    assert_eq!(constraint.tenant_id(), Some(form_tenant.id()));

    // A reader in T2 gets a filter that excludes it.
    let foreign_reader = member("r2", "T2");
    let decision = decide(Some(&foreign_reader), ResourceKind::Form, Operation::Read, None);
    let constraint = decision.constraint().unwrap();
    assert_ne!(constraint.tenant_id(), Some(form_tenant.id()));
}

#[test]
fn test_media_delete_scenario_from_both_sides() {
    let admin = tenant_admin("A");

    // Candidate in the actor's own tenant: proceeds, constrained to A.
    let own = Candidate::owned_by(TenantRef::Id(TenantId::new("A")));
    assert_eq!(
        decide(Some(&admin), ResourceKind::Media, Operation::Delete, Some(&own)),
        Decision::Filter(Constraint::TenantEquals(TenantId::new("A")))
    );

    // Candidate in tenant B: the decision is still Filter('A'), and the
    // filter excludes the record at the row level.
    let foreign = Candidate::owned_by(TenantRef::Id(TenantId::new("B")));
    let decision = decide(Some(&admin), ResourceKind::Media, Operation::Delete, Some(&foreign));
    assert_eq!(
        decision,
        Decision::Filter(Constraint::TenantEquals(TenantId::new("A")))
    );
    assert_ne!(
        decision.constraint().and_then(Constraint::tenant_id),
        foreign.tenant_id()
    );
}

#[test]
fn test_anonymous_submission_scenario() {
    assert_eq!(
        decide(None, ResourceKind::FormSubmission, Operation::Create, None),
        Decision::Allow
    );
}

#[test]
fn test_form_ownership_uses_persisted_record_tenant() {
    let admin = tenant_admin("t1");

    // Record tenant arriving as a raw id and as a populated object must
    // compare the same.
    let by_id = Candidate::owned_by(TenantRef::Id(TenantId::new("t1")));
    let populated = Candidate::owned_by(TenantRef::Populated(
        atrium_core::access::Tenant {
            id: TenantId::new("t1"),
            name: "Tenant One".to_string(),
        },
    ));

    for candidate in [&by_id, &populated] {
        assert_eq!(
            decide(Some(&admin), ResourceKind::Form, Operation::Update, Some(candidate)),
            Decision::Allow
        );
    }

    let foreign = Candidate::owned_by(TenantRef::Id(TenantId::new("t2")));
    assert_eq!(
        decide(Some(&admin), ResourceKind::Form, Operation::Delete, Some(&foreign)),
        Decision::Deny(DenyReason::TenantMismatch)
    );
}

#[test]
fn test_unknown_role_and_missing_tenant_are_total_denies() {
    let unknown_role = actor("x", "owner", Some("t1"));
    let tenantless_user = actor("y", "user", None);

    for resource in ALL_RESOURCES {
        for operation in ALL_OPERATIONS {
            assert_eq!(
                decide(Some(&unknown_role), resource, operation, None),
                Decision::Deny(DenyReason::InvalidRole)
            );

            let decision = decide(Some(&tenantless_user), resource, operation, None);
            if resource == ResourceKind::User && operation == Operation::Read {
                // Self-read is the single concession for a non-conformant
                // account.
                assert_eq!(
                    decision,
                    Decision::Filter(Constraint::IdEquals("y".to_string()))
                );
            } else {
                assert_eq!(decision, Decision::Deny(DenyReason::Forbidden));
            }
        }
    }
}

#[test]
fn test_decide_has_no_hidden_state() {
    let admin = tenant_admin("t1");
    let candidate = Candidate::new("u7", Some(TenantRef::Id(TenantId::new("t2"))));

    for resource in ALL_RESOURCES {
        for operation in ALL_OPERATIONS {
            let first = decide(Some(&admin), resource, operation, Some(&candidate));
            let second = decide(Some(&admin), resource, operation, Some(&candidate));
            assert_eq!(first, second);
        }
    }
}

#[test]
fn test_stamping_ignores_client_supplied_tenant() {
    let admin = tenant_admin("t1");

    let mut slot = Some(TenantRef::Id(TenantId::new("t2")));
    stamp_tenant(&admin, &mut slot);
    assert_eq!(slot.map(TenantRef::into_id), Some(TenantId::new("t1")));
}
