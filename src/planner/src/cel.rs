//! Plan-time validation of condition expressions.
//!
//! Conditions are CEL boolean expressions evaluated by the remote policy
//! engine at access-check time. The planner never evaluates them; it only
//! proves they compile, so a typo fails the plan instead of the deploy.

use cel_interpreter::Program;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

/// Condition expression errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("expression cannot be empty")]
    Empty,

    #[error("expression failed to compile: {0}")]
    Compile(String),
}

/// Compiles condition expressions, caching compiled programs per
/// expression string so repeated plans over the same configuration do not
/// recompile.
pub struct ExpressionValidator {
    programs: DashMap<String, Arc<Program>>,
}

impl ExpressionValidator {
    /// Create a new validator with an empty cache
    pub fn new() -> Self {
        Self {
            programs: DashMap::new(),
        }
    }

    /// Checks that `expr` parses as CEL.
    pub fn check(&self, expr: &str) -> Result<(), ExpressionError> {
        if expr.trim().is_empty() {
            return Err(ExpressionError::Empty);
        }
        if self.programs.contains_key(expr) {
            return Ok(());
        }
        let program = Program::compile(expr)
            .map_err(|e| ExpressionError::Compile(format!("{e:?}")))?;
        self.programs.insert(expr.to_string(), Arc::new(program));
        Ok(())
    }

    /// Number of cached compiled programs
    pub fn cached(&self) -> usize {
        self.programs.len()
    }
}

impl Default for ExpressionValidator {
    fn default() -> Self {
        Self::new()
    }
}
