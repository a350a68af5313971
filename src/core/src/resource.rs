//! Target resource scopes and identifier normalization.
//!
//! Each scope kind accepts both the short identifier users actually write
//! and the fully qualified resource name, and normalizes to one canonical
//! form so that `"123"` and `"folders/123"` address the same folder.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

static PROJECT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]([a-z0-9-]{0,28}[a-z0-9])?$").unwrap());
static BUCKET_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9._-]{1,220}[a-z0-9]$").unwrap());
static POOL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]{4,63}$").unwrap());

/// The kinds of resource a grant batch can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Project,
    Folder,
    Organization,
    StorageBucket,
    ServiceAccount,
    PubsubTopic,
    WorkforcePool,
}

impl ResourceKind {
    /// Returns the snake_case selector name for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Folder => "folder",
            Self::Organization => "organization",
            Self::StorageBucket => "storage_bucket",
            Self::ServiceAccount => "service_account",
            Self::PubsubTopic => "pubsub_topic",
            Self::WorkforcePool => "workforce_pool",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised while normalizing a resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("{0} identifier cannot be empty")]
    Empty(ResourceKind),

    #[error("invalid {kind} identifier '{id}': {reason}")]
    Invalid {
        kind: ResourceKind,
        id: String,
        reason: String,
    },
}

impl ResourceError {
    fn invalid(kind: ResourceKind, id: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind,
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// The single resource a batch of grants applies to.
///
/// A sum type with exactly one variant per supported target, so the invalid
/// "zero or many targets" state is unrepresentable once resolution has run.
/// Each variant holds the canonical resource name.
///
/// # Examples
///
/// ```
/// use grantline_core::{ResourceKind, ResourceScope};
///
/// let short = ResourceScope::parse(ResourceKind::Folder, "123").unwrap();
/// let qualified = ResourceScope::parse(ResourceKind::Folder, "folders/123").unwrap();
/// assert_eq!(short, qualified);
/// assert_eq!(short.name(), "folders/123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceScope {
    Project(String),
    Folder(String),
    Organization(String),
    StorageBucket(String),
    ServiceAccount(String),
    PubsubTopic(String),
    WorkforcePool(String),
}

impl ResourceScope {
    /// Normalizes a raw identifier of the given kind into a canonical scope.
    pub fn parse(kind: ResourceKind, raw: &str) -> Result<Self, ResourceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ResourceError::Empty(kind));
        }
        match kind {
            ResourceKind::Project => Self::parse_project(raw),
            ResourceKind::Folder => Self::parse_numeric(kind, raw, "folders"),
            ResourceKind::Organization => Self::parse_numeric(kind, raw, "organizations"),
            ResourceKind::StorageBucket => Self::parse_bucket(raw),
            ResourceKind::ServiceAccount => Self::parse_service_account(raw),
            ResourceKind::PubsubTopic => Self::parse_topic(raw),
            ResourceKind::WorkforcePool => Self::parse_workforce_pool(raw),
        }
    }

    fn parse_project(raw: &str) -> Result<Self, ResourceError> {
        let id = raw.strip_prefix("projects/").unwrap_or(raw);
        if !PROJECT_ID.is_match(id) {
            return Err(ResourceError::invalid(
                ResourceKind::Project,
                raw,
                "project ids are lowercase letters, digits and hyphens, starting with a letter and not ending with a hyphen",
            ));
        }
        Ok(Self::Project(format!("projects/{id}")))
    }

    fn parse_numeric(kind: ResourceKind, raw: &str, prefix: &str) -> Result<Self, ResourceError> {
        let id = raw
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(raw);
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ResourceError::invalid(kind, raw, "expected a numeric id"));
        }
        let name = format!("{prefix}/{id}");
        Ok(match kind {
            ResourceKind::Folder => Self::Folder(name),
            _ => Self::Organization(name),
        })
    }

    fn parse_bucket(raw: &str) -> Result<Self, ResourceError> {
        let name = raw.strip_prefix("projects/_/buckets/").unwrap_or(raw);
        if !BUCKET_NAME.is_match(name) {
            return Err(ResourceError::invalid(
                ResourceKind::StorageBucket,
                raw,
                "bucket names are 3-222 lowercase letters, digits, dots, hyphens and underscores",
            ));
        }
        Ok(Self::StorageBucket(format!("projects/_/buckets/{name}")))
    }

    fn parse_service_account(raw: &str) -> Result<Self, ResourceError> {
        if raw.contains('/') {
            let segments: Vec<&str> = raw.split('/').collect();
            match segments.as_slice() {
                ["projects", project, "serviceAccounts", email]
                    if !project.is_empty() && is_plausible_email(email) =>
                {
                    Ok(Self::ServiceAccount(raw.to_string()))
                }
                _ => Err(ResourceError::invalid(
                    ResourceKind::ServiceAccount,
                    raw,
                    "expected a bare email or projects/{project}/serviceAccounts/{email}",
                )),
            }
        } else if is_plausible_email(raw) {
            Ok(Self::ServiceAccount(format!("projects/-/serviceAccounts/{raw}")))
        } else {
            Err(ResourceError::invalid(
                ResourceKind::ServiceAccount,
                raw,
                "expected a bare email or projects/{project}/serviceAccounts/{email}",
            ))
        }
    }

    fn parse_topic(raw: &str) -> Result<Self, ResourceError> {
        let segments: Vec<&str> = raw.split('/').collect();
        match segments.as_slice() {
            ["projects", project, "topics", topic] if !project.is_empty() && !topic.is_empty() => {
                Ok(Self::PubsubTopic(raw.to_string()))
            }
            _ => Err(ResourceError::invalid(
                ResourceKind::PubsubTopic,
                raw,
                "expected the fully qualified projects/{project}/topics/{topic}",
            )),
        }
    }

    fn parse_workforce_pool(raw: &str) -> Result<Self, ResourceError> {
        if raw.contains('/') {
            let segments: Vec<&str> = raw.split('/').collect();
            match segments.as_slice() {
                ["locations", location, "workforcePools", pool]
                    if !location.is_empty() && POOL_ID.is_match(pool) =>
                {
                    Ok(Self::WorkforcePool(raw.to_string()))
                }
                _ => Err(ResourceError::invalid(
                    ResourceKind::WorkforcePool,
                    raw,
                    "expected a pool id or locations/{location}/workforcePools/{pool}",
                )),
            }
        } else if POOL_ID.is_match(raw) {
            Ok(Self::WorkforcePool(format!(
                "locations/global/workforcePools/{raw}"
            )))
        } else {
            Err(ResourceError::invalid(
                ResourceKind::WorkforcePool,
                raw,
                "pool ids are 4-63 lowercase letters, digits and hyphens",
            ))
        }
    }

    /// Returns the canonical resource name
    pub fn name(&self) -> &str {
        match self {
            Self::Project(name)
            | Self::Folder(name)
            | Self::Organization(name)
            | Self::StorageBucket(name)
            | Self::ServiceAccount(name)
            | Self::PubsubTopic(name)
            | Self::WorkforcePool(name) => name,
        }
    }

    /// Returns this scope's kind
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Project(_) => ResourceKind::Project,
            Self::Folder(_) => ResourceKind::Folder,
            Self::Organization(_) => ResourceKind::Organization,
            Self::StorageBucket(_) => ResourceKind::StorageBucket,
            Self::ServiceAccount(_) => ResourceKind::ServiceAccount,
            Self::PubsubTopic(_) => ResourceKind::PubsubTopic,
            Self::WorkforcePool(_) => ResourceKind::WorkforcePool,
        }
    }
}

fn is_plausible_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
