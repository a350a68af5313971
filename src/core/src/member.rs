//! Member principal strings and their recognized forms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing a member string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberError {
    /// Empty member string
    #[error("member cannot be empty")]
    Empty,

    /// Unknown `kind:` prefix
    #[error("unknown member kind in '{0}'")]
    UnknownKind(String),

    /// Email payload is not a plausible address
    #[error("invalid email in member '{0}'")]
    InvalidEmail(String),

    /// Domain payload is not a plausible domain
    #[error("invalid domain in member '{0}'")]
    InvalidDomain(String),

    /// `principal://` / `principalSet://` payload is empty
    #[error("empty principal path in member '{0}'")]
    EmptyPrincipalPath(String),

    /// `deleted:` payload is not itself a member form
    #[error("malformed deleted member '{0}'")]
    MalformedDeleted(String),
}

/// The kind of principal a member string names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    User,
    ServiceAccount,
    Group,
    Domain,
    AllUsers,
    AllAuthenticatedUsers,
    /// Single workforce/workload identity subject (`principal://...`)
    Principal,
    /// Set of workforce/workload identities (`principalSet://...`)
    PrincipalSet,
    /// Tombstone of a deleted principal, as surfaced by remote state.
    /// Representable so observed state can round-trip; never valid in
    /// desired configuration.
    Deleted,
}

/// A validated member principal string.
///
/// # Examples
///
/// ```
/// use grantline_core::{Member, MemberKind};
///
/// let member: Member = "user:alice@example.com".parse().unwrap();
/// assert_eq!(member.kind(), MemberKind::User);
///
/// let everyone = Member::parse("allUsers").unwrap();
/// assert_eq!(everyone.kind(), MemberKind::AllUsers);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Member {
    raw: String,
    kind: MemberKind,
}

impl Member {
    /// Parses a member string against the recognized forms.
    pub fn parse(s: &str) -> Result<Self, MemberError> {
        let kind = Self::classify(s)?;
        Ok(Self {
            raw: s.to_string(),
            kind,
        })
    }

    fn classify(s: &str) -> Result<MemberKind, MemberError> {
        if s.is_empty() {
            return Err(MemberError::Empty);
        }
        match s {
            "allUsers" => return Ok(MemberKind::AllUsers),
            "allAuthenticatedUsers" => return Ok(MemberKind::AllAuthenticatedUsers),
            _ => {}
        }
        if let Some(path) = s.strip_prefix("principal://") {
            if path.is_empty() {
                return Err(MemberError::EmptyPrincipalPath(s.to_string()));
            }
            return Ok(MemberKind::Principal);
        }
        if let Some(path) = s.strip_prefix("principalSet://") {
            if path.is_empty() {
                return Err(MemberError::EmptyPrincipalPath(s.to_string()));
            }
            return Ok(MemberKind::PrincipalSet);
        }
        if let Some(rest) = s.strip_prefix("deleted:") {
            // Remote state renders tombstones as `deleted:<member>?uid=<id>`
            let inner = rest.split_once("?uid=").map(|(m, _)| m).unwrap_or(rest);
            match Self::classify(inner) {
                Ok(MemberKind::User | MemberKind::ServiceAccount | MemberKind::Group) => {
                    return Ok(MemberKind::Deleted)
                }
                _ => return Err(MemberError::MalformedDeleted(s.to_string())),
            }
        }
        let Some((prefix, payload)) = s.split_once(':') else {
            return Err(MemberError::UnknownKind(s.to_string()));
        };
        match prefix {
            "user" | "serviceAccount" | "group" => {
                if !is_plausible_email(payload) {
                    return Err(MemberError::InvalidEmail(s.to_string()));
                }
                Ok(match prefix {
                    "user" => MemberKind::User,
                    "serviceAccount" => MemberKind::ServiceAccount,
                    _ => MemberKind::Group,
                })
            }
            "domain" => {
                if payload.is_empty() || !payload.contains('.') || payload.contains('@') {
                    return Err(MemberError::InvalidDomain(s.to_string()));
                }
                Ok(MemberKind::Domain)
            }
            _ => Err(MemberError::UnknownKind(s.to_string())),
        }
    }

    /// Returns the member string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the kind of principal this member names
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Whether this member is a tombstone of a deleted principal
    pub fn is_deleted(&self) -> bool {
        self.kind == MemberKind::Deleted
    }
}

fn is_plausible_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    }
}

impl FromStr for Member {
    type Err = MemberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Member {
    type Error = MemberError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Member> for String {
    fn from(member: Member) -> Self {
        member.raw
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
