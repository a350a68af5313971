//! # Grantline Planner
//!
//! Plan-time resolver for declarative IAM policy attachments.
//!
//! A configuration names exactly one target resource, a set of
//! authoritative role bindings (each owning the complete member list for
//! its role), and a list of additive member grants. The planner validates
//! the batch, normalizes identifiers, flattens bindings into
//! deterministically keyed grant records, and hands the resulting plan to
//! whatever orchestration engine diffs it against remote state.
//!
//! ## Features
//!
//! - **Plan-time validation** — every configuration mistake (scope,
//!   conflicts, role shapes, primitive roles, empty member lists, broken
//!   condition expressions) is reported in one pass, before any mutation
//! - **Deterministic keys** — each record addresses exactly one remote
//!   grant object, so repeated runs converge without duplication
//! - **Stateless diff** — desired plan vs observed state, as a pure
//!   function
//! - **CEL condition checking** — condition expressions are compiled (not
//!   evaluated) when a plan is built
//!
//! ## Example
//!
//! ```rust
//! use grantline_planner::{AttachmentConfig, BindingSpec, Planner};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AttachmentConfig::new()
//!         .with_project("my-proj")
//!         .with_binding(
//!             "roles/storage.objectViewer",
//!             BindingSpec::new(["user:alice@example.com", "user:bob@example.com"]),
//!         );
//!
//!     let plan = Planner::new().plan(&config)?;
//!
//!     assert_eq!(plan.resource_name(), "projects/my-proj");
//!     assert_eq!(plan.authoritative.len(), 2);
//!     Ok(())
//! }
//! ```

pub mod cel;
pub mod config;
pub mod diff;
pub mod error;
pub mod plan;
pub mod resolve;
pub mod state;

// Re-export commonly used types
pub use config::{AttachmentConfig, BindingSpec, ConditionSpec, MemberGrantSpec};
pub use diff::{diff, ChangeSet};
pub use error::{ConflictPair, PlanError, PlanFailure, ScopeError};
pub use plan::{GrantKey, GrantMode, GrantPlan, GrantRecord};
pub use resolve::Planner;
pub use state::{InMemoryStateStore, ObservedGrant, ObservedState, ObservedStateStore, StateError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
