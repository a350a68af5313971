//! End-to-end convergence tests
//!
//! Drives the full pipeline the way an orchestration engine would:
//! configuration in from JSON, plan, diff against the observed-state store,
//! apply, re-plan, and require a no-op.

use grantline_e2e_tests::init_tracing;
use grantline_planner::{
    diff, AttachmentConfig, InMemoryStateStore, ObservedState, ObservedStateStore, Planner,
};

async fn converge(
    planner: &Planner,
    store: &InMemoryStateStore,
    config: &AttachmentConfig,
) -> anyhow::Result<usize> {
    let plan = planner.plan(config)?;
    let mut state = store
        .load(plan.resource_name())
        .await?
        .unwrap_or_else(ObservedState::new);

    let changes = diff(&plan, &state);
    let applied = changes.len();
    state.apply(&changes);
    store.record(plan.resource_name(), state).await?;
    Ok(applied)
}

#[tokio::test]
async fn test_apply_twice_is_a_noop() -> anyhow::Result<()> {
    init_tracing();

    let config: AttachmentConfig = serde_json::from_str(
        r#"{
            "project": "e2e-proj",
            "bindings": {
                "roles/storage.objectViewer": {
                    "members": ["user:alice@example.com", "group:readers@example.com"]
                },
                "roles/logging.viewer": {
                    "members": ["user:oncall@example.com"],
                    "condition": {
                        "title": "weekdays",
                        "expression": "request.time.getDayOfWeek() >= 1"
                    }
                }
            },
            "additive_bindings": [
                { "role": "roles/browser", "member": "user:guest@example.com" }
            ]
        }"#,
    )?;

    let planner = Planner::new();
    let store = InMemoryStateStore::new();

    let first = converge(&planner, &store, &config).await?;
    assert_eq!(first, 4, "three authoritative records plus one additive");

    let second = converge(&planner, &store, &config).await?;
    assert_eq!(second, 0, "second apply must converge to a no-op");
    Ok(())
}

#[tokio::test]
async fn test_removing_a_member_deletes_its_grant() -> anyhow::Result<()> {
    init_tracing();

    let planner = Planner::new();
    let store = InMemoryStateStore::new();

    let before: AttachmentConfig = serde_json::from_str(
        r#"{
            "folder": "folders/123",
            "bindings": {
                "roles/viewer": { "members": ["user:a@x.com", "user:b@x.com"] }
            }
        }"#,
    )?;
    converge(&planner, &store, &before).await?;

    // Same folder, written with the short id, one member dropped
    let after: AttachmentConfig = serde_json::from_str(
        r#"{
            "folder": "123",
            "bindings": {
                "roles/viewer": { "members": ["user:a@x.com"] }
            }
        }"#,
    )?;

    let plan = planner.plan(&after)?;
    let state = store.load(plan.resource_name()).await?.unwrap();
    let changes = diff(&plan, &state);

    assert!(changes.create.is_empty());
    assert_eq!(changes.delete.len(), 1);
    assert_eq!(changes.delete[0].as_str(), "roles/viewer/user:b@x.com");
    Ok(())
}

#[tokio::test]
async fn test_additive_grants_preserve_foreign_state() -> anyhow::Result<()> {
    init_tracing();

    let planner = Planner::new();
    let store = InMemoryStateStore::new();

    // Someone else's authoritative batch owns roles/viewer on this project
    let theirs: AttachmentConfig = serde_json::from_str(
        r#"{
            "project": "shared-proj",
            "bindings": { "roles/viewer": { "members": ["user:owner@x.com"] } }
        }"#,
    )?;
    converge(&planner, &store, &theirs).await?;

    // Our batch only adds a member under a different role
    let ours: AttachmentConfig = serde_json::from_str(
        r#"{
            "project": "shared-proj",
            "additive_bindings": [
                { "role": "roles/browser", "member": "user:visitor@x.com" }
            ]
        }"#,
    )?;
    converge(&planner, &store, &ours).await?;

    let state = store.load("projects/shared-proj").await?.unwrap();
    assert_eq!(state.len(), 2, "their grant and ours must coexist");
    Ok(())
}

#[tokio::test]
async fn test_invalid_configuration_never_reaches_the_store() {
    init_tracing();

    let config: AttachmentConfig = serde_json::from_str(
        r#"{
            "project": "e2e-proj",
            "bindings": { "roles/viewer": { "members": ["user:a@x.com"] } },
            "additive_bindings": [
                { "role": "roles/viewer", "member": "user:b@x.com" }
            ]
        }"#,
    )
    .unwrap();

    let failure = Planner::new().plan(&config).unwrap_err();
    assert!(failure.has_conflict());
    assert!(failure.to_string().contains("roles/viewer"));
}
