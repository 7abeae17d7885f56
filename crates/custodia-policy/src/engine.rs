//! Rule engine
//!
//! Walks enabled rules from the store in descending priority order and
//! merges the matches into one RBAC/ABAC sub-decision. The merge is
//! first-match-wins with effect precedence: the first matched DENY in
//! priority order fixes `allow = false` (later AUDIT/REDACT matches are
//! still recorded for side effects); with no DENY, any matched ALLOW
//! allows; zero matched rules is a default deny.

use crate::condition;
use crate::store::RuleStore;
use custodia_types::{
    AppliedRule, EvaluationContext, PolicyViolation, RuleEffect, RuleKind, Severity,
};
use std::sync::Arc;
use tracing::debug;

/// Sub-decision produced by one pass over the rule set
#[derive(Debug, Clone)]
pub struct RuleEvaluation {
    /// Allow/deny outcome of the merge
    pub allow: bool,

    /// Every matched rule, in priority order
    pub applied_rules: Vec<AppliedRule>,

    /// One violation per matched DENY rule
    pub violations: Vec<PolicyViolation>,

    /// Contributing messages, in evaluation order
    pub reasons: Vec<String>,

    /// Set when any AUDIT rule matched
    pub audit_required: bool,

    /// Set when any REDACT rule matched
    pub redact_required: bool,
}

/// Evaluates contexts against the rules in a shared store
pub struct RuleEngine {
    store: Arc<RuleStore>,
}

impl RuleEngine {
    /// Create an engine over a shared rule store
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Evaluate a context against the current rule snapshot
    pub fn evaluate(&self, ctx: &EvaluationContext) -> RuleEvaluation {
        let rules = self.store.snapshot();
        let operation = format!("{}:{}", ctx.resource, ctx.action);

        let mut applied_rules = Vec::new();
        let mut violations = Vec::new();
        let mut reasons = Vec::new();
        let mut denied = false;
        let mut allowed = false;
        let mut audit_required = false;
        let mut redact_required = false;

        for rule in &rules {
            if !rule.conditions.iter().all(|c| condition::evaluate(ctx, c)) {
                continue;
            }

            debug!(rule_id = %rule.id, effect = %rule.effect, "Rule matched");
            applied_rules.push(AppliedRule {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                effect: rule.effect,
                priority: rule.priority,
            });

            match rule.effect {
                RuleEffect::Deny => {
                    if !denied {
                        denied = true;
                        reasons.push(deny_reason(rule.name.as_str(), rule.description.as_str()));
                    }
                    violations.push(PolicyViolation::new(
                        &rule.id,
                        &rule.name,
                        severity_for(rule.kind),
                        if rule.description.is_empty() {
                            format!("rule '{}' denied the operation", rule.name)
                        } else {
                            rule.description.clone()
                        },
                        &operation,
                    ));
                }
                RuleEffect::Allow => allowed = true,
                RuleEffect::Audit => audit_required = true,
                RuleEffect::Redact => redact_required = true,
            }
        }

        let allow = !denied && allowed;

        // Default deny: nothing matched, or only audit/redact side effects
        // did. Name the missing role when the pair is in the built-in matrix.
        if !denied && !allowed {
            reasons.push(default_deny_reason(ctx));
        }

        RuleEvaluation {
            allow,
            applied_rules,
            violations,
            reasons,
            audit_required,
            redact_required,
        }
    }
}

fn deny_reason(name: &str, description: &str) -> String {
    if description.is_empty() {
        format!("Denied by rule '{name}'")
    } else {
        format!("Denied by rule '{name}': {description}")
    }
}

fn default_deny_reason(ctx: &EvaluationContext) -> String {
    match crate::rbac::required_role(&ctx.resource, &ctx.action) {
        Some(required) => format!(
            "Insufficient permissions: {}:{} requires role {}",
            ctx.resource, ctx.action, required
        ),
        None => format!(
            "No policy rule allowed {}:{} (default deny)",
            ctx.resource, ctx.action
        ),
    }
}

fn severity_for(kind: RuleKind) -> Severity {
    match kind {
        RuleKind::Security => Severity::Critical,
        RuleKind::Abac | RuleKind::Residency | RuleKind::PiiProtection => Severity::High,
        RuleKind::Quota | RuleKind::Rbac => Severity::Medium,
    }
}
