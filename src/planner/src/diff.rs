//! Stateless diff between a desired grant plan and observed remote state.

use crate::plan::{GrantKey, GrantPlan, GrantRecord};
use crate::state::ObservedState;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Remote mutations required to converge observed state onto a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Grants to create
    pub create: Vec<GrantRecord>,
    /// Grants whose condition payload drifted and must be replaced
    pub update: Vec<GrantRecord>,
    /// Grant keys to delete
    pub delete: Vec<GrantKey>,
}

impl ChangeSet {
    /// Total number of mutations
    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len()
    }

    /// Whether observed state already matches the plan
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Computes the mutations converging `observed` onto `plan`.
///
/// Authoritative roles own their complete member list: observed grants
/// under them that the plan does not list are deleted. Grants under roles
/// the plan does not manage authoritatively are never touched, so additive
/// grants coexist with whatever else is attached to the resource.
pub fn diff(plan: &GrantPlan, observed: &ObservedState) -> ChangeSet {
    let desired: BTreeMap<&GrantKey, &GrantRecord> =
        plan.records().map(|record| (&record.key, record)).collect();

    let mut changes = ChangeSet::default();

    for (&key, &record) in &desired {
        match observed.grants.get(key) {
            None => changes.create.push(record.clone()),
            Some(remote) if !remote.satisfies(record) => changes.update.push(record.clone()),
            Some(_) => {}
        }
    }

    let managed: BTreeSet<&str> = plan.authoritative_roles().collect();
    for (key, remote) in &observed.grants {
        if desired.contains_key(key) {
            continue;
        }
        if managed.contains(remote.role.as_str()) {
            changes.delete.push(key.clone());
        }
    }

    debug!(
        resource = plan.resource_name(),
        create = changes.create.len(),
        update = changes.update.len(),
        delete = changes.delete.len(),
        "computed changeset"
    );
    changes
}
