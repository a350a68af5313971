//! Grant conditions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating a condition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("condition title cannot be empty")]
    EmptyTitle,

    #[error("condition '{0}' has an empty expression")]
    EmptyExpression(String),
}

/// An attribute-based condition gating one grant.
///
/// The expression is a CEL boolean expression evaluated by the remote policy
/// engine at access-check time; this type only carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    /// Short human-readable name; part of the grant's identity
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// CEL boolean expression
    pub expression: String,
}

impl Condition {
    /// Create a new condition
    pub fn new(title: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            expression: expression.into(),
        }
    }

    /// Add a description to the condition
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate the condition's shape (title and expression non-empty)
    pub fn validate(&self) -> Result<(), ConditionError> {
        if self.title.trim().is_empty() {
            return Err(ConditionError::EmptyTitle);
        }
        if self.expression.trim().is_empty() {
            return Err(ConditionError::EmptyExpression(self.title.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_creation() {
        let condition = Condition::new("expires_2027", "request.time < timestamp('2027-01-01T00:00:00Z')")
            .with_description("Grant lapses at the end of 2026");

        assert_eq!(condition.title, "expires_2027");
        assert!(condition.description.is_some());
        assert!(condition.validate().is_ok());
    }

    #[test]
    fn test_condition_validation() {
        let condition = Condition::new("", "true");
        assert_eq!(condition.validate(), Err(ConditionError::EmptyTitle));

        let condition = Condition::new("t", "  ");
        assert!(matches!(
            condition.validate(),
            Err(ConditionError::EmptyExpression(_))
        ));
    }

    #[test]
    fn test_description_omitted_from_json() {
        let condition = Condition::new("t", "true");
        let json = serde_json::to_string(&condition).unwrap();
        assert!(!json.contains("description"));
    }
}
