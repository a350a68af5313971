//! Observed remote state and the store seam the orchestration engine
//! implements.
//!
//! Grantline never calls a cloud API; it only needs the grants the engine
//! last observed on a resource, in the same canonical key space the plan
//! uses. [`InMemoryStateStore`] backs tests and demos.

use crate::diff::ChangeSet;
use crate::plan::{GrantKey, GrantRecord};
use async_trait::async_trait;
use grantline_core::{Condition, Member, Role};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Observed-state store errors
#[derive(Debug, Error)]
pub enum StateError {
    /// The engine's state backend failed
    #[error("state backend error: {0}")]
    Backend(String),
}

/// One grant as it exists remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedGrant {
    pub role: Role,
    pub member: Member,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl ObservedGrant {
    /// The canonical key addressing this grant
    pub fn key(&self) -> GrantKey {
        GrantKey::new(&self.role, &self.member, self.condition.as_ref())
    }

    /// Record what a desired grant looks like once created
    pub fn from_record(record: &GrantRecord) -> Self {
        Self {
            role: record.role.clone(),
            member: record.member.clone(),
            condition: record.condition.clone(),
        }
    }

    /// Whether this observed grant already satisfies a desired record
    pub(crate) fn satisfies(&self, record: &GrantRecord) -> bool {
        self.role == record.role
            && self.member == record.member
            && self.condition == record.condition
    }
}

/// All grants observed on one resource, canonically keyed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    pub grants: BTreeMap<GrantKey, ObservedGrant>,
}

impl ObservedState {
    /// Create an empty observed state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a grant under its canonical key
    pub fn insert(&mut self, grant: ObservedGrant) {
        self.grants.insert(grant.key(), grant);
    }

    /// Forget a grant
    pub fn remove(&mut self, key: &GrantKey) -> Option<ObservedGrant> {
        self.grants.remove(key)
    }

    /// Number of observed grants
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Whether nothing has been observed
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Applies a changeset, as the engine would after its remote calls
    /// succeed: deletions first, then creations and updates.
    pub fn apply(&mut self, changes: &ChangeSet) {
        for key in &changes.delete {
            self.grants.remove(key);
        }
        for record in changes.create.iter().chain(changes.update.iter()) {
            self.insert(ObservedGrant::from_record(record));
        }
    }
}

/// Store of last-observed remote state, keyed by canonical resource name.
///
/// Implemented by the orchestration engine over whatever it uses for state
/// tracking; the bundled in-memory implementation backs tests.
#[async_trait]
pub trait ObservedStateStore: Send + Sync {
    /// Load the state last observed on a resource, if any
    async fn load(&self, resource: &str) -> Result<Option<ObservedState>, StateError>;

    /// Record the state now observed on a resource
    async fn record(&self, resource: &str, state: ObservedState) -> Result<(), StateError>;
}

/// In-memory observed-state store implementation
pub struct InMemoryStateStore {
    states: Arc<RwLock<HashMap<String, ObservedState>>>,
}

impl InMemoryStateStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObservedStateStore for InMemoryStateStore {
    async fn load(&self, resource: &str) -> Result<Option<ObservedState>, StateError> {
        let states = self.states.read().await;
        Ok(states.get(resource).cloned())
    }

    async fn record(&self, resource: &str, state: ObservedState) -> Result<(), StateError> {
        let mut states = self.states.write().await;
        states.insert(resource.to_string(), state);
        Ok(())
    }
}
