//! Declarative configuration for one attachment batch.

use grantline_core::{Condition, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition attached to a grant, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub expression: String,
}

impl ConditionSpec {
    /// Create a new condition spec
    pub fn new(title: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            expression: expression.into(),
        }
    }

    /// Add a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<&ConditionSpec> for Condition {
    fn from(spec: &ConditionSpec) -> Self {
        Condition {
            title: spec.title.clone(),
            description: spec.description.clone(),
            expression: spec.expression.clone(),
        }
    }
}

/// Authoritative binding: the complete member list for one role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSpec {
    #[serde(default)]
    pub members: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionSpec>,
}

impl BindingSpec {
    /// Create a binding over the given members
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            condition: None,
        }
    }

    /// Attach a condition to the binding
    pub fn with_condition(mut self, condition: ConditionSpec) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Additive grant: one member added to one role, leaving other members alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberGrantSpec {
    pub role: String,

    pub member: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionSpec>,
}

impl MemberGrantSpec {
    /// Create an additive grant
    pub fn new(role: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            member: member.into(),
            condition: None,
        }
    }

    /// Attach a condition to the grant
    pub fn with_condition(mut self, condition: ConditionSpec) -> Self {
        self.condition = Some(condition);
        self
    }
}

fn default_true() -> bool {
    true
}

/// One batch of IAM grants aimed at a single target resource.
///
/// The scope selectors are independent optional fields because that is how
/// declarative configuration arrives on the wire; the resolver enforces
/// that exactly one of them is set and converts it into the internal
/// [`grantline_core::ResourceScope`] sum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubsub_topic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workforce_pool: Option<String>,

    /// Authoritative bindings, role -> complete member list
    #[serde(default)]
    pub bindings: BTreeMap<String, BindingSpec>,

    /// Additive grants, applied one member at a time
    #[serde(default)]
    pub additive_bindings: Vec<MemberGrantSpec>,

    /// Reject the broad built-in owner/editor/viewer roles
    #[serde(default)]
    pub forbid_primitive_roles: bool,

    /// Check role strings against the recognized path shapes
    #[serde(default = "default_true")]
    pub validate_role_format: bool,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            project: None,
            folder: None,
            organization: None,
            storage_bucket: None,
            service_account: None,
            pubsub_topic: None,
            workforce_pool: None,
            bindings: BTreeMap::new(),
            additive_bindings: Vec::new(),
            forbid_primitive_roles: false,
            validate_role_format: true,
        }
    }
}

impl AttachmentConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Target a project
    pub fn with_project(mut self, id: impl Into<String>) -> Self {
        self.project = Some(id.into());
        self
    }

    /// Target a folder
    pub fn with_folder(mut self, id: impl Into<String>) -> Self {
        self.folder = Some(id.into());
        self
    }

    /// Target an organization
    pub fn with_organization(mut self, id: impl Into<String>) -> Self {
        self.organization = Some(id.into());
        self
    }

    /// Target a storage bucket
    pub fn with_storage_bucket(mut self, name: impl Into<String>) -> Self {
        self.storage_bucket = Some(name.into());
        self
    }

    /// Target a service account
    pub fn with_service_account(mut self, email_or_name: impl Into<String>) -> Self {
        self.service_account = Some(email_or_name.into());
        self
    }

    /// Target a pub/sub topic
    pub fn with_pubsub_topic(mut self, name: impl Into<String>) -> Self {
        self.pubsub_topic = Some(name.into());
        self
    }

    /// Target a workforce identity pool
    pub fn with_workforce_pool(mut self, id_or_name: impl Into<String>) -> Self {
        self.workforce_pool = Some(id_or_name.into());
        self
    }

    /// Add an authoritative binding for a role
    pub fn with_binding(mut self, role: impl Into<String>, spec: BindingSpec) -> Self {
        self.bindings.insert(role.into(), spec);
        self
    }

    /// Add an additive grant
    pub fn with_additive(mut self, grant: MemberGrantSpec) -> Self {
        self.additive_bindings.push(grant);
        self
    }

    /// Reject primitive roles when resolving
    pub fn forbid_primitive_roles(mut self, forbid: bool) -> Self {
        self.forbid_primitive_roles = forbid;
        self
    }

    /// Toggle role path-shape validation
    pub fn validate_role_format(mut self, validate: bool) -> Self {
        self.validate_role_format = validate;
        self
    }

    /// Whether the configuration carries no grants at all
    pub fn has_grants(&self) -> bool {
        !self.bindings.is_empty() || !self.additive_bindings.is_empty()
    }

    /// Every scope selector that is set, in declaration order
    pub(crate) fn selectors(&self) -> Vec<(ResourceKind, &str)> {
        let fields = [
            (ResourceKind::Project, &self.project),
            (ResourceKind::Folder, &self.folder),
            (ResourceKind::Organization, &self.organization),
            (ResourceKind::StorageBucket, &self.storage_bucket),
            (ResourceKind::ServiceAccount, &self.service_account),
            (ResourceKind::PubsubTopic, &self.pubsub_topic),
            (ResourceKind::WorkforcePool, &self.workforce_pool),
        ];
        fields
            .into_iter()
            .filter_map(|(kind, value)| value.as_deref().map(|id| (kind, id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = AttachmentConfig::new()
            .with_project("my-proj")
            .with_binding("roles/viewer", BindingSpec::new(["user:a@x.com"]))
            .with_additive(MemberGrantSpec::new("roles/browser", "user:b@x.com"))
            .forbid_primitive_roles(true);

        assert_eq!(config.project.as_deref(), Some("my-proj"));
        assert_eq!(config.bindings.len(), 1);
        assert_eq!(config.additive_bindings.len(), 1);
        assert!(config.forbid_primitive_roles);
        assert!(config.validate_role_format);
        assert!(config.has_grants());
    }

    #[test]
    fn test_selectors_in_declaration_order() {
        let config = AttachmentConfig::new()
            .with_folder("123")
            .with_project("my-proj");

        let selectors = config.selectors();
        assert_eq!(selectors.len(), 2);
        assert_eq!(selectors[0].0, ResourceKind::Project);
        assert_eq!(selectors[1].0, ResourceKind::Folder);
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: AttachmentConfig = serde_json::from_str(
            r#"{
                "project": "my-proj",
                "bindings": {
                    "roles/viewer": { "members": ["user:a@x.com"] }
                }
            }"#,
        )
        .unwrap();

        assert!(!config.forbid_primitive_roles);
        assert!(config.validate_role_format);
        assert!(config.additive_bindings.is_empty());
        assert_eq!(config.bindings["roles/viewer"].members.len(), 1);
    }

    #[test]
    fn test_serialize_omits_unset_selectors() {
        let config = AttachmentConfig::new().with_project("my-proj");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"project\""));
        assert!(!json.contains("\"folder\""));
    }
}
