//! Flattened grant plans and their deterministic keys.

use chrono::{DateTime, Utc};
use grantline_core::{Condition, Member, ResourceScope, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Whether a record sets the complete member list for its role or adds a
/// single member without touching the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantMode {
    Authoritative,
    Additive,
}

/// Deterministic address of one remote grant object.
///
/// The canonical form is `{role}/{member}`, extended with `/{title}` when
/// the grant is conditioned, so a member granted under two different
/// conditions maps onto two distinct remote objects.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantKey(String);

impl GrantKey {
    pub(crate) fn new(role: &Role, member: &Member, condition: Option<&Condition>) -> Self {
        let mut key = format!("{role}/{member}");
        if let Some(condition) = condition {
            key.push('/');
            key.push_str(&condition.title);
        }
        Self(key)
    }

    /// Returns the canonical key string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Opaque fixed-width form of the key, for engines that address grants
    /// by a hashed logical name rather than the readable composite.
    pub fn digest(&self) -> String {
        blake3::hash(self.0.as_bytes()).to_hex().to_string()
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One flattened (role, member, condition) grant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub key: GrantKey,
    pub mode: GrantMode,
    pub role: Role,
    pub member: Member,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl GrantRecord {
    pub(crate) fn new(
        mode: GrantMode,
        role: Role,
        member: Member,
        condition: Option<Condition>,
    ) -> Self {
        let key = GrantKey::new(&role, &member, condition.as_ref());
        Self {
            key,
            mode,
            role,
            member,
            condition,
        }
    }
}

/// A validated, flattened batch of grants for one target resource, ready
/// for an orchestration engine to diff against remote state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantPlan {
    /// Unique plan identifier
    pub id: Uuid,

    /// When the plan was resolved
    pub created_at: DateTime<Utc>,

    /// The single resource every record applies to
    pub scope: ResourceScope,

    /// Authoritative records, sorted by key
    pub authoritative: Vec<GrantRecord>,

    /// Additive records, sorted by key
    pub additive: Vec<GrantRecord>,
}

impl GrantPlan {
    pub(crate) fn new(
        scope: ResourceScope,
        authoritative: Vec<GrantRecord>,
        additive: Vec<GrantRecord>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            scope,
            authoritative,
            additive,
        }
    }

    /// Canonical name of the target resource
    pub fn resource_name(&self) -> &str {
        self.scope.name()
    }

    /// Total number of grant records
    pub fn len(&self) -> usize {
        self.authoritative.len() + self.additive.len()
    }

    /// Whether the plan carries no records
    pub fn is_empty(&self) -> bool {
        self.authoritative.is_empty() && self.additive.is_empty()
    }

    /// All records, authoritative first
    pub fn records(&self) -> impl Iterator<Item = &GrantRecord> {
        self.authoritative.iter().chain(self.additive.iter())
    }

    /// Roles whose member lists this plan owns completely
    pub fn authoritative_roles(&self) -> impl Iterator<Item = &str> {
        let mut seen = std::collections::BTreeSet::new();
        self.authoritative
            .iter()
            .filter(move |r| seen.insert(r.role.as_str().to_string()))
            .map(|r| r.role.as_str())
    }

    /// Authoritative records grouped per role, the conventional output for
    /// downstream configuration that references bindings by role.
    pub fn authoritative_by_role(&self) -> BTreeMap<&str, Vec<&GrantRecord>> {
        let mut by_role: BTreeMap<&str, Vec<&GrantRecord>> = BTreeMap::new();
        for record in &self.authoritative {
            by_role.entry(record.role.as_str()).or_default().push(record);
        }
        by_role
    }

    /// Additive records keyed by role+member, the conventional output for
    /// downstream configuration that references individual grants.
    pub fn additive_by_key(&self) -> BTreeMap<&GrantKey, &GrantRecord> {
        self.additive.iter().map(|r| (&r.key, r)).collect()
    }
}
