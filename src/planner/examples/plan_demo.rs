//! Walkthrough: resolve a configuration into a grant plan, diff it against
//! observed remote state, and converge an in-memory store.
//!
//! Run with: cargo run -p grantline-planner --example plan_demo

use grantline_planner::{
    diff, AttachmentConfig, BindingSpec, ConditionSpec, InMemoryStateStore, MemberGrantSpec,
    ObservedState, ObservedStateStore, Planner,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AttachmentConfig::new()
        .with_project("demo-proj")
        .with_binding(
            "roles/storage.objectViewer",
            BindingSpec::new(["user:alice@example.com", "group:readers@example.com"]),
        )
        .with_additive(
            MemberGrantSpec::new("roles/logging.viewer", "user:oncall@example.com")
                .with_condition(ConditionSpec::new(
                    "expires_2027",
                    "request.time < timestamp('2027-01-01T00:00:00Z')",
                )),
        )
        .forbid_primitive_roles(true);

    let planner = Planner::new();
    let plan = planner.plan(&config)?;

    info!(resource = plan.resource_name(), records = plan.len(), "plan resolved");
    for record in plan.records() {
        println!("{:?} {} -> {}", record.mode, record.key, record.key.digest());
    }

    // First apply: everything is a creation
    let store = InMemoryStateStore::new();
    let mut state = store
        .load(plan.resource_name())
        .await?
        .unwrap_or_else(ObservedState::new);

    let changes = diff(&plan, &state);
    println!(
        "first apply: {} create, {} update, {} delete",
        changes.create.len(),
        changes.update.len(),
        changes.delete.len()
    );
    state.apply(&changes);
    store.record(plan.resource_name(), state.clone()).await?;

    // Second apply converges to a no-op
    let replan = planner.plan(&config)?;
    let changes = diff(&replan, &state);
    println!("second apply is a no-op: {}", changes.is_empty());

    Ok(())
}
