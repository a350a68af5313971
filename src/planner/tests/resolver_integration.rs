//! Integration tests for the scope & binding resolver
//!
//! Covers the plan-time validation contract: single-selector enforcement,
//! identifier normalization, conflict detection, flattening, and the
//! per-category aggregation that reports every problem in one pass.

use grantline_planner::{
    AttachmentConfig, BindingSpec, ConditionSpec, MemberGrantSpec, PlanError, Planner, ScopeError,
};
use proptest::prelude::*;

fn viewer_binding() -> BindingSpec {
    BindingSpec::new(["user:a@x.com", "user:b@x.com"])
}

// ============================================================================
// SCOPE SELECTION
// ============================================================================

#[test]
fn test_multiple_selectors_fail_with_scope_error() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_folder("123")
        .with_binding("roles/viewer", viewer_binding());

    let failure = Planner::new().plan(&config).unwrap_err();
    assert!(failure.has_scope_error());

    let scope_error = failure
        .errors
        .iter()
        .find_map(|e| match e {
            PlanError::Scope(s) => Some(s.clone()),
            _ => None,
        })
        .unwrap();
    match scope_error {
        ScopeError::MultipleTargets(kinds) => assert_eq!(kinds.len(), 2),
        other => panic!("expected MultipleTargets, got {other:?}"),
    }
}

#[test]
fn test_no_selector_with_bindings_fails() {
    let config = AttachmentConfig::new().with_binding("roles/viewer", viewer_binding());

    let failure = Planner::new().plan(&config).unwrap_err();
    assert!(failure
        .errors
        .contains(&PlanError::Scope(ScopeError::MissingTarget)));
}

#[test]
fn test_no_selector_without_bindings_still_fails() {
    // A missing target is a hard error even for an otherwise empty batch;
    // an engine with nothing to converge does not invoke the resolver.
    let failure = Planner::new().plan(&AttachmentConfig::new()).unwrap_err();
    assert!(failure
        .errors
        .contains(&PlanError::Scope(ScopeError::MissingTarget)));
}

#[test]
fn test_malformed_target_identifier_fails() {
    let config = AttachmentConfig::new()
        .with_folder("acme")
        .with_binding("roles/viewer", viewer_binding());

    let failure = Planner::new().plan(&config).unwrap_err();
    assert!(failure
        .errors
        .iter()
        .any(|e| matches!(e, PlanError::Resource(_))));
}

// ============================================================================
// NORMALIZATION
// ============================================================================

#[test]
fn test_folder_ids_normalize_to_the_same_plan() {
    let short = AttachmentConfig::new()
        .with_folder("123")
        .with_binding("roles/viewer", viewer_binding());
    let qualified = AttachmentConfig::new()
        .with_folder("folders/123")
        .with_binding("roles/viewer", viewer_binding());

    let planner = Planner::new();
    let a = planner.plan(&short).unwrap();
    let b = planner.plan(&qualified).unwrap();

    assert_eq!(a.scope, b.scope);
    assert_eq!(a.resource_name(), "folders/123");
    assert_eq!(a.authoritative, b.authoritative);
}

#[test]
fn test_organization_ids_normalize_to_the_same_plan() {
    let short = AttachmentConfig::new()
        .with_organization("456")
        .with_binding("roles/viewer", viewer_binding());
    let qualified = AttachmentConfig::new()
        .with_organization("organizations/456")
        .with_binding("roles/viewer", viewer_binding());

    let planner = Planner::new();
    assert_eq!(
        planner.plan(&short).unwrap().scope,
        planner.plan(&qualified).unwrap().scope
    );
}

#[test]
fn test_service_account_email_normalizes_to_qualified_path() {
    let config = AttachmentConfig::new()
        .with_service_account("ci@my-proj.iam.gserviceaccount.com")
        .with_binding("roles/iam.serviceAccountUser", viewer_binding());

    let plan = Planner::new().plan(&config).unwrap();
    assert_eq!(
        plan.resource_name(),
        "projects/-/serviceAccounts/ci@my-proj.iam.gserviceaccount.com"
    );
}

// ============================================================================
// CONFLICT DETECTION
// ============================================================================

#[test]
fn test_same_role_in_both_sets_conflicts() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding("roles/viewer", viewer_binding())
        .with_additive(MemberGrantSpec::new("roles/viewer", "user:c@x.com"));

    let failure = Planner::new().plan(&config).unwrap_err();
    assert!(failure.has_conflict());

    let pairs = failure
        .errors
        .iter()
        .find_map(|e| match e {
            PlanError::Conflict(pairs) => Some(pairs),
            _ => None,
        })
        .unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].role, "roles/viewer");
    assert_eq!(pairs[0].resource, "projects/my-proj");
}

#[test]
fn test_distinct_roles_do_not_conflict() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding("roles/viewer", viewer_binding())
        .with_additive(MemberGrantSpec::new("roles/browser", "user:c@x.com"));

    let plan = Planner::new().plan(&config).unwrap();
    assert_eq!(plan.authoritative.len(), 2);
    assert_eq!(plan.additive.len(), 1);
}

#[test]
fn test_every_colliding_pair_is_listed() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding("roles/viewer", viewer_binding())
        .with_binding("roles/browser", viewer_binding())
        .with_additive(MemberGrantSpec::new("roles/viewer", "user:c@x.com"))
        .with_additive(MemberGrantSpec::new("roles/browser", "user:d@x.com"));

    let failure = Planner::new().plan(&config).unwrap_err();
    let pairs = failure
        .errors
        .iter()
        .find_map(|e| match e {
            PlanError::Conflict(pairs) => Some(pairs),
            _ => None,
        })
        .unwrap();
    let roles: Vec<&str> = pairs.iter().map(|p| p.role.as_str()).collect();
    assert_eq!(roles, ["roles/browser", "roles/viewer"]);
}

// ============================================================================
// ROLE AND MEMBER VALIDATION
// ============================================================================

#[test]
fn test_all_malformed_roles_reported_together() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding("bogus", viewer_binding())
        .with_binding("also/bogus", viewer_binding());

    let failure = Planner::new().plan(&config).unwrap_err();
    let offenders = failure
        .errors
        .iter()
        .find_map(|e| match e {
            PlanError::RoleFormat(list) => Some(list),
            _ => None,
        })
        .unwrap();
    assert_eq!(offenders.len(), 2);
    assert!(offenders.iter().any(|o| o.contains("bogus")));
}

#[test]
fn test_primitive_roles_forbidden() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding("roles/editor", viewer_binding())
        .forbid_primitive_roles(true);

    let failure = Planner::new().plan(&config).unwrap_err();
    assert!(failure
        .errors
        .contains(&PlanError::PrimitiveRole(vec!["roles/editor".to_string()])));
}

#[test]
fn test_primitive_roles_allowed_by_default() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding("roles/editor", viewer_binding());

    assert!(Planner::new().plan(&config).is_ok());
}

#[test]
fn test_empty_member_list_fails() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding("roles/viewer", BindingSpec::new(Vec::<String>::new()));

    let failure = Planner::new().plan(&config).unwrap_err();
    assert!(failure
        .errors
        .contains(&PlanError::EmptyMembers(vec!["roles/viewer".to_string()])));
}

#[test]
fn test_invalid_members_reported_together() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding(
            "roles/viewer",
            BindingSpec::new(["user:not-an-email", "robot:rusty@x.com"]),
        );

    let failure = Planner::new().plan(&config).unwrap_err();
    let offenders = failure
        .errors
        .iter()
        .find_map(|e| match e {
            PlanError::MemberFormat(list) => Some(list),
            _ => None,
        })
        .unwrap();
    assert_eq!(offenders.len(), 2);
}

#[test]
fn test_deleted_principals_rejected_in_configuration() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_additive(MemberGrantSpec::new(
            "roles/viewer",
            "deleted:user:gone@x.com?uid=123",
        ));

    let failure = Planner::new().plan(&config).unwrap_err();
    assert!(failure
        .errors
        .iter()
        .any(|e| matches!(e, PlanError::MemberFormat(_))));
}

// ============================================================================
// CONDITIONS
// ============================================================================

#[test]
fn test_condition_expression_must_compile() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding(
            "roles/viewer",
            viewer_binding().with_condition(ConditionSpec::new("broken", "not )( valid")),
        );

    let failure = Planner::new().plan(&config).unwrap_err();
    let offenders = failure
        .errors
        .iter()
        .find_map(|e| match e {
            PlanError::Condition(list) => Some(list),
            _ => None,
        })
        .unwrap();
    assert!(offenders[0].contains("broken"));
}

#[test]
fn test_condition_title_required() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_additive(
            MemberGrantSpec::new("roles/viewer", "user:a@x.com")
                .with_condition(ConditionSpec::new("", "true")),
        );

    let failure = Planner::new().plan(&config).unwrap_err();
    assert!(failure
        .errors
        .iter()
        .any(|e| matches!(e, PlanError::Condition(_))));
}

#[test]
fn test_valid_condition_passes_and_keys_record() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_additive(MemberGrantSpec::new("roles/viewer", "user:a@x.com").with_condition(
            ConditionSpec::new("expires_2027", "request.time < timestamp('2027-01-01T00:00:00Z')"),
        ));

    let plan = Planner::new().plan(&config).unwrap();
    assert_eq!(
        plan.additive[0].key.as_str(),
        "roles/viewer/user:a@x.com/expires_2027"
    );
}

// ============================================================================
// AGGREGATION
// ============================================================================

#[test]
fn test_every_category_reported_in_one_pass() {
    let config = AttachmentConfig::new()
        .with_binding("bogus", BindingSpec::new(Vec::<String>::new()))
        .with_binding("roles/owner", BindingSpec::new(["user:not-an-email"]))
        .with_additive(MemberGrantSpec::new("roles/owner", "user:c@x.com"))
        .forbid_primitive_roles(true);

    let failure = Planner::new().plan(&config).unwrap_err();

    // Scope, role format, empty members, member format, primitive, conflict
    assert!(failure.has_scope_error());
    assert!(failure.has_conflict());
    assert!(failure.errors.len() >= 5, "got: {failure}");
}

// ============================================================================
// FLATTENING AND DETERMINISM
// ============================================================================

#[test]
fn test_flattening_yields_one_record_per_member() {
    let config = AttachmentConfig::new()
        .with_project("p1")
        .with_binding("roles/viewer", viewer_binding());

    let plan = Planner::new().plan(&config).unwrap();
    assert_eq!(plan.authoritative.len(), 2);

    let keys: Vec<&str> = plan.authoritative.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(
        keys,
        ["roles/viewer/user:a@x.com", "roles/viewer/user:b@x.com"]
    );
}

#[test]
fn test_resolution_is_idempotent() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding("roles/viewer", viewer_binding())
        .with_binding(
            "roles/storage.objectViewer",
            BindingSpec::new(["group:eng@x.com"]),
        )
        .with_additive(MemberGrantSpec::new("roles/browser", "user:c@x.com"));

    let planner = Planner::new();
    let first = planner.plan(&config).unwrap();
    let second = planner.plan(&config).unwrap();

    assert_eq!(first.authoritative, second.authoritative);
    assert_eq!(first.additive, second.additive);
}

#[test]
fn test_config_round_trips_through_json() {
    let config = AttachmentConfig::new()
        .with_project("my-proj")
        .with_binding("roles/viewer", viewer_binding())
        .with_additive(MemberGrantSpec::new("roles/browser", "user:c@x.com"));

    let json = serde_json::to_string(&config).unwrap();
    let back: AttachmentConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);

    let planner = Planner::new();
    assert_eq!(
        planner.plan(&config).unwrap().authoritative,
        planner.plan(&back).unwrap().authoritative
    );
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn member_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}".prop_map(|local| format!("user:{local}@example.com"))
}

proptest! {
    #[test]
    fn prop_two_selectors_always_fail(folder in "[0-9]{1,9}", org in "[0-9]{1,9}") {
        let config = AttachmentConfig::new()
            .with_folder(folder)
            .with_organization(org)
            .with_binding("roles/viewer", viewer_binding());

        let failure = Planner::new().plan(&config).unwrap_err();
        prop_assert!(failure.has_scope_error());
    }

    #[test]
    fn prop_folder_prefix_is_irrelevant(id in "[0-9]{1,9}") {
        let planner = Planner::new();
        let short = planner.plan(
            &AttachmentConfig::new()
                .with_folder(id.as_str())
                .with_binding("roles/viewer", viewer_binding()),
        ).unwrap();
        let qualified = planner.plan(
            &AttachmentConfig::new()
                .with_folder(format!("folders/{id}"))
                .with_binding("roles/viewer", viewer_binding()),
        ).unwrap();
        prop_assert_eq!(short.scope, qualified.scope);
    }

    #[test]
    fn prop_flattening_is_deterministic(members in proptest::collection::vec(member_strategy(), 1..20)) {
        let config = AttachmentConfig::new()
            .with_project("my-proj")
            .with_binding("roles/viewer", BindingSpec::new(members.clone()));

        let planner = Planner::new();
        let first = planner.plan(&config).unwrap();
        let second = planner.plan(&config).unwrap();
        prop_assert_eq!(&first.authoritative, &second.authoritative);

        // One record per unique member, keys strictly ascending
        let unique: std::collections::BTreeSet<&String> = members.iter().collect();
        prop_assert_eq!(first.authoritative.len(), unique.len());
        for pair in first.authoritative.windows(2) {
            prop_assert!(pair[0].key < pair[1].key);
        }
    }
}
