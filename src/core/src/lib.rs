//! # Grantline Core
//!
//! Shared domain types for declarative IAM policy attachments: roles, member
//! principals, grant conditions, and the resource scopes grants attach to.
//! This package owns parsing, normalization, and shape validation only; it
//! performs no I/O and knows nothing about plans or remote state.

pub mod condition;
pub mod member;
pub mod resource;
pub mod role;

// Re-export commonly used types
pub use condition::{Condition, ConditionError};
pub use member::{Member, MemberError, MemberKind};
pub use resource::{ResourceError, ResourceKind, ResourceScope};
pub use role::{Role, RoleError, RoleKind, PRIMITIVE_ROLES};
