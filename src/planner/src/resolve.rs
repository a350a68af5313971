//! The scope & binding resolver.
//!
//! A pure pipeline from raw configuration to either a validated, flattened
//! [`GrantPlan`] or a [`PlanFailure`] describing every configuration error
//! at once. All validation happens here, at plan time, before any remote
//! mutation is attempted; the categories are checked independently so one
//! failing check never hides another.

use crate::cel::ExpressionValidator;
use crate::config::{AttachmentConfig, ConditionSpec};
use crate::error::{ConflictPair, PlanError, PlanFailure, ScopeError};
use crate::plan::{GrantMode, GrantPlan, GrantRecord};
use grantline_core::{Condition, Member, ResourceScope, Role, PRIMITIVE_ROLES};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Resolves attachment configurations into grant plans.
///
/// Stateless apart from the compiled-expression cache, so one planner can
/// be reused across many configurations.
///
/// # Examples
///
/// ```
/// use grantline_planner::{AttachmentConfig, BindingSpec, Planner};
///
/// let planner = Planner::new();
/// let config = AttachmentConfig::new()
///     .with_folder("123")
///     .with_binding("roles/viewer", BindingSpec::new(["user:alice@example.com"]));
///
/// let plan = planner.plan(&config).unwrap();
/// assert_eq!(plan.resource_name(), "folders/123");
/// ```
pub struct Planner {
    expressions: ExpressionValidator,
}

impl Planner {
    /// Create a new planner
    pub fn new() -> Self {
        Self {
            expressions: ExpressionValidator::new(),
        }
    }

    /// Resolves a configuration into a flattened grant plan.
    ///
    /// Returns every validation failure discovered, aggregated per
    /// category, so a configuration is fixed in a single pass.
    pub fn plan(&self, config: &AttachmentConfig) -> Result<GrantPlan, PlanFailure> {
        let mut errors: Vec<PlanError> = Vec::new();

        let scope = self.resolve_scope(config, &mut errors);

        self.validate_roles(config, &mut errors);
        self.validate_member_lists(config, &mut errors);
        self.validate_members(config, &mut errors);
        self.validate_conditions(config, &mut errors);
        self.validate_primitive_roles(config, &mut errors);
        self.detect_conflicts(config, scope.as_ref(), &mut errors);

        if !errors.is_empty() {
            debug!(count = errors.len(), "plan validation failed");
            return Err(PlanFailure::new(errors));
        }

        // Validation collected no errors, so the scope resolved.
        let Some(scope) = scope else {
            return Err(PlanFailure::new(vec![ScopeError::MissingTarget.into()]));
        };

        let authoritative = self.flatten_authoritative(config);
        let additive = self.flatten_additive(config);

        let plan = GrantPlan::new(scope, authoritative, additive);
        info!(
            resource = plan.resource_name(),
            authoritative = plan.authoritative.len(),
            additive = plan.additive.len(),
            "resolved grant plan"
        );
        Ok(plan)
    }

    /// Steps 1-2: enforce the single-selector invariant and normalize the
    /// chosen identifier.
    fn resolve_scope(
        &self,
        config: &AttachmentConfig,
        errors: &mut Vec<PlanError>,
    ) -> Option<ResourceScope> {
        let selectors = config.selectors();
        match selectors.as_slice() {
            [] => {
                errors.push(ScopeError::MissingTarget.into());
                None
            }
            [(kind, raw)] => {
                let (kind, raw) = (*kind, *raw);
                debug!(kind = %kind, id = raw, "selected target resource");
                match ResourceScope::parse(kind, raw) {
                    Ok(scope) => Some(scope),
                    Err(e) => {
                        errors.push(PlanError::Resource(e));
                        None
                    }
                }
            }
            many => {
                let kinds = many.iter().map(|(kind, _)| *kind).collect();
                errors.push(ScopeError::MultipleTargets(kinds).into());
                None
            }
        }
    }

    /// Every unique role string across both grant sets, sorted.
    fn role_strings<'a>(&self, config: &'a AttachmentConfig) -> BTreeSet<&'a str> {
        config
            .bindings
            .keys()
            .map(String::as_str)
            .chain(config.additive_bindings.iter().map(|g| g.role.as_str()))
            .collect()
    }

    fn validate_roles(&self, config: &AttachmentConfig, errors: &mut Vec<PlanError>) {
        let mut offenders = Vec::new();
        for role in self.role_strings(config) {
            let result = if config.validate_role_format {
                Role::parse(role)
            } else {
                // Shape checking is off, but an empty role is never valid.
                Role::parse_lenient(role)
            };
            if let Err(e) = result {
                offenders.push(e.to_string());
            }
        }
        if !offenders.is_empty() {
            errors.push(PlanError::RoleFormat(offenders));
        }
    }

    fn validate_member_lists(&self, config: &AttachmentConfig, errors: &mut Vec<PlanError>) {
        let empty: Vec<String> = config
            .bindings
            .iter()
            .filter(|(_, spec)| spec.members.is_empty())
            .map(|(role, _)| role.clone())
            .collect();
        if !empty.is_empty() {
            errors.push(PlanError::EmptyMembers(empty));
        }
    }

    fn validate_members(&self, config: &AttachmentConfig, errors: &mut Vec<PlanError>) {
        let members: BTreeSet<&str> = config
            .bindings
            .values()
            .flat_map(|spec| spec.members.iter().map(String::as_str))
            .chain(config.additive_bindings.iter().map(|g| g.member.as_str()))
            .collect();

        let mut offenders = Vec::new();
        for raw in members {
            match Member::parse(raw) {
                Ok(member) if member.is_deleted() => {
                    offenders.push(format!("deleted principal '{raw}' cannot be granted"));
                }
                Ok(_) => {}
                Err(e) => offenders.push(e.to_string()),
            }
        }
        if !offenders.is_empty() {
            errors.push(PlanError::MemberFormat(offenders));
        }
    }

    fn validate_conditions(&self, config: &AttachmentConfig, errors: &mut Vec<PlanError>) {
        let conditions = config
            .bindings
            .values()
            .filter_map(|spec| spec.condition.as_ref())
            .chain(
                config
                    .additive_bindings
                    .iter()
                    .filter_map(|g| g.condition.as_ref()),
            );

        let mut offenders = Vec::new();
        let mut checked: BTreeSet<(&str, &str)> = BTreeSet::new();
        for spec in conditions {
            if !checked.insert((spec.title.as_str(), spec.expression.as_str())) {
                continue;
            }
            offenders.extend(self.check_condition(spec));
        }
        if !offenders.is_empty() {
            errors.push(PlanError::Condition(offenders));
        }
    }

    fn check_condition(&self, spec: &ConditionSpec) -> Option<String> {
        if spec.title.trim().is_empty() {
            return Some("condition title cannot be empty".to_string());
        }
        if let Err(e) = self.expressions.check(&spec.expression) {
            return Some(format!("'{}': {e}", spec.title));
        }
        None
    }

    fn validate_primitive_roles(&self, config: &AttachmentConfig, errors: &mut Vec<PlanError>) {
        if !config.forbid_primitive_roles {
            return;
        }
        let offenders: Vec<String> = self
            .role_strings(config)
            .into_iter()
            .filter(|role| PRIMITIVE_ROLES.contains(role))
            .map(str::to_string)
            .collect();
        if !offenders.is_empty() {
            errors.push(PlanError::PrimitiveRole(offenders));
        }
    }

    /// Step: a (resource, role) pair must not be granted both
    /// authoritatively and additively; the two styles fight for control of
    /// the role's member list and never converge.
    fn detect_conflicts(
        &self,
        config: &AttachmentConfig,
        scope: Option<&ResourceScope>,
        errors: &mut Vec<PlanError>,
    ) {
        let authoritative: BTreeSet<&str> = config.bindings.keys().map(String::as_str).collect();
        let additive: BTreeSet<&str> = config
            .additive_bindings
            .iter()
            .map(|g| g.role.as_str())
            .collect();

        let resource = scope
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| "<unresolved target>".to_string());

        let pairs: Vec<ConflictPair> = authoritative
            .intersection(&additive)
            .map(|role| ConflictPair {
                resource: resource.clone(),
                role: role.to_string(),
            })
            .collect();

        if !pairs.is_empty() {
            errors.push(PlanError::Conflict(pairs));
        }
    }

    fn parse_role(&self, config: &AttachmentConfig, raw: &str) -> Option<Role> {
        if config.validate_role_format {
            Role::parse(raw).ok()
        } else {
            Role::parse_lenient(raw).ok()
        }
    }

    /// Step: flatten each authoritative binding's member list into
    /// individual records. Duplicate members within one binding collapse
    /// (member lists are order-irrelevant sets).
    fn flatten_authoritative(&self, config: &AttachmentConfig) -> Vec<GrantRecord> {
        let mut records = Vec::new();
        for (role_str, spec) in &config.bindings {
            let Some(role) = self.parse_role(config, role_str) else {
                continue;
            };
            let condition = spec.condition.as_ref().map(Condition::from);
            let mut seen = BTreeSet::new();
            for member_str in &spec.members {
                let Ok(member) = Member::parse(member_str) else {
                    continue;
                };
                if !seen.insert(member_str.as_str()) {
                    warn!(
                        role = role_str.as_str(),
                        member = member_str.as_str(),
                        "duplicate member in binding, collapsing"
                    );
                    continue;
                }
                records.push(GrantRecord::new(
                    GrantMode::Authoritative,
                    role.clone(),
                    member,
                    condition.clone(),
                ));
            }
        }
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    /// Step: flatten additive grants, collapsing records that resolve to
    /// the same key.
    fn flatten_additive(&self, config: &AttachmentConfig) -> Vec<GrantRecord> {
        let mut records = Vec::new();
        let mut seen = BTreeSet::new();
        for grant in &config.additive_bindings {
            let Some(role) = self.parse_role(config, &grant.role) else {
                continue;
            };
            let Ok(member) = Member::parse(&grant.member) else {
                continue;
            };
            let condition = grant.condition.as_ref().map(Condition::from);
            let record = GrantRecord::new(GrantMode::Additive, role, member, condition);
            if !seen.insert(record.key.clone()) {
                warn!(key = %record.key, "duplicate additive grant, collapsing");
                continue;
            }
            records.push(record);
        }
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}
