//! Role identifiers and their recognized path shapes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The broad built-in roles discouraged in favor of fine-grained ones.
pub const PRIMITIVE_ROLES: [&str; 3] = ["roles/owner", "roles/editor", "roles/viewer"];

static ROLE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.]{3,64}$").unwrap());

/// Errors raised while parsing a role string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    /// Empty role string
    #[error("role cannot be empty")]
    Empty,

    /// Role path does not match any recognized shape
    #[error("unrecognized role path '{0}' (expected roles/..., projects/.../roles/... or organizations/.../roles/...)")]
    UnrecognizedPath(String),

    /// Final role id segment has an invalid charset or length
    #[error("invalid role id segment in '{0}'")]
    InvalidId(String),
}

/// Where a role is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Built-in `roles/{id}` role
    Predefined,
    /// `projects/{project}/roles/{id}` custom role
    ProjectCustom,
    /// `organizations/{org}/roles/{id}` custom role
    OrganizationCustom,
    /// Shape not recognized; only produced by lenient parsing
    Other,
}

/// A validated role reference.
///
/// Strict parsing ([`Role::parse`], [`FromStr`]) accepts the three recognized
/// path shapes. Lenient parsing ([`Role::parse_lenient`]) accepts any
/// non-empty string and tags unrecognized shapes as [`RoleKind::Other`]; it
/// backs deserialization so previously emitted plans always round-trip.
///
/// # Examples
///
/// ```
/// use grantline_core::{Role, RoleKind};
///
/// let role: Role = "roles/storage.objectViewer".parse().unwrap();
/// assert_eq!(role.kind(), RoleKind::Predefined);
/// assert!(!role.is_primitive());
///
/// let custom = Role::parse("projects/my-proj/roles/deployer").unwrap();
/// assert_eq!(custom.kind(), RoleKind::ProjectCustom);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role {
    raw: String,
    kind: RoleKind,
}

impl Role {
    /// Parses a role string against the recognized path shapes.
    pub fn parse(s: &str) -> Result<Self, RoleError> {
        if s.is_empty() {
            return Err(RoleError::Empty);
        }
        match Self::classify(s)? {
            Some(kind) => Ok(Self {
                raw: s.to_string(),
                kind,
            }),
            None => Err(RoleError::UnrecognizedPath(s.to_string())),
        }
    }

    /// Parses a role string without enforcing a recognized shape.
    ///
    /// Only the empty string is rejected. Strings that match a recognized
    /// shape still get their precise kind; everything else is tagged
    /// [`RoleKind::Other`].
    pub fn parse_lenient(s: &str) -> Result<Self, RoleError> {
        if s.is_empty() {
            return Err(RoleError::Empty);
        }
        let kind = Self::classify(s).ok().flatten().unwrap_or(RoleKind::Other);
        Ok(Self {
            raw: s.to_string(),
            kind,
        })
    }

    /// Classifies a role path, returning `None` for unrecognized shapes.
    ///
    /// An id segment with a bad charset under an otherwise recognized shape
    /// is an [`RoleError::InvalidId`], not an unrecognized shape.
    fn classify(s: &str) -> Result<Option<RoleKind>, RoleError> {
        let segments: Vec<&str> = s.split('/').collect();
        let (kind, id) = match segments.as_slice() {
            ["roles", id] => (RoleKind::Predefined, *id),
            ["projects", project, "roles", id] if !project.is_empty() => {
                (RoleKind::ProjectCustom, *id)
            }
            ["organizations", org, "roles", id] if !org.is_empty() => {
                (RoleKind::OrganizationCustom, *id)
            }
            _ => return Ok(None),
        };
        if !ROLE_ID.is_match(id) {
            return Err(RoleError::InvalidId(s.to_string()));
        }
        Ok(Some(kind))
    }

    /// Returns the role string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns where this role is defined
    pub fn kind(&self) -> RoleKind {
        self.kind
    }

    /// Whether this is one of the broad built-in owner/editor/viewer roles
    pub fn is_primitive(&self) -> bool {
        PRIMITIVE_ROLES.contains(&self.raw.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Role {
    type Error = RoleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse_lenient(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.raw
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
