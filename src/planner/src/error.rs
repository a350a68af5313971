//! Plan-time validation errors.
//!
//! Every failure here is a configuration mistake requiring a human fix;
//! nothing is retried. Each category carries every offender discovered in
//! one resolution pass, so a batch is fixed in a single round.

use grantline_core::{ResourceError, ResourceKind};
use std::fmt;
use thiserror::Error;

fn join(items: &[String]) -> String {
    items.join(", ")
}

fn join_kinds(kinds: &[ResourceKind]) -> String {
    kinds
        .iter()
        .map(ResourceKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_pairs(pairs: &[ConflictPair]) -> String {
    pairs
        .iter()
        .map(ConflictPair::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Target-resource selection errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// More than one scope selector was set
    #[error("exactly one target resource must be selected, found {}: {}", .0.len(), join_kinds(.0))]
    MultipleTargets(Vec<ResourceKind>),

    /// No scope selector was set
    #[error("no target resource selected")]
    MissingTarget,
}

/// A (resource, role) pair granted both authoritatively and additively.
///
/// The two grant styles fight for control of the role's member list and
/// would never converge under reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictPair {
    /// Canonical target resource name
    pub resource: String,
    /// The doubly granted role
    pub role: String,
}

impl fmt::Display for ConflictPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.resource, self.role)
    }
}

/// One category of plan-time validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Zero or multiple target resources selected
    #[error("scope: {0}")]
    Scope(#[from] ScopeError),

    /// The selected target identifier is malformed
    #[error("target resource: {0}")]
    Resource(#[from] ResourceError),

    /// Roles granted both authoritatively and additively
    #[error("authoritative and additive grants collide: {}", join_pairs(.0))]
    Conflict(Vec<ConflictPair>),

    /// Role strings that match no recognized path shape
    #[error("malformed role(s): {}", join(.0))]
    RoleFormat(Vec<String>),

    /// Primitive roles requested while forbidden
    #[error("primitive role(s) requested but forbidden: {}", join(.0))]
    PrimitiveRole(Vec<String>),

    /// Authoritative bindings listing zero members
    #[error("authoritative binding(s) with no members: {}", join(.0))]
    EmptyMembers(Vec<String>),

    /// Member strings that match no recognized principal form
    #[error("invalid member(s): {}", join(.0))]
    MemberFormat(Vec<String>),

    /// Conditions with missing titles or expressions that do not compile
    #[error("invalid condition(s): {}", join(.0))]
    Condition(Vec<String>),
}

/// Aggregate of every validation failure found in one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanFailure {
    pub errors: Vec<PlanError>,
}

impl PlanFailure {
    pub(crate) fn new(errors: Vec<PlanError>) -> Self {
        Self { errors }
    }

    /// Whether any error of the given discriminant shape was reported
    pub fn has_scope_error(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, PlanError::Scope(_)))
    }

    /// Whether a conflict between the authoritative and additive sets was reported
    pub fn has_conflict(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, PlanError::Conflict(_)))
    }
}

impl fmt::Display for PlanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "plan validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            writeln!(f, "  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PlanFailure {}
