//! Policy rule language
//!
//! Rules are the unit of configuration for the RBAC/ABAC engine. A rule is a
//! flat list of AND-combined conditions plus an effect; rules are evaluated
//! in descending priority order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a rule. Informational only: the engine evaluates every
/// enabled rule the same way regardless of kind, but security-kind denials
/// are surfaced as violations with elevated severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    Rbac,
    Abac,
    Residency,
    PiiProtection,
    Quota,
    Security,
}

/// Effect a matched rule contributes to the decision merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleEffect {
    /// Grants the operation (unless a deny matched first)
    Allow,

    /// Denies the operation; terminal for the allow/deny merge
    Deny,

    /// Marks the operation for audit logging; never flips allow
    Audit,

    /// Marks the operation for PII redaction; never flips allow
    Redact,
}

impl fmt::Display for RuleEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleEffect::Allow => write!(f, "ALLOW"),
            RuleEffect::Deny => write!(f, "DENY"),
            RuleEffect::Audit => write!(f, "AUDIT"),
            RuleEffect::Redact => write!(f, "REDACT"),
        }
    }
}

/// Comparison operator for a single condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
    In,
    NotIn,
    GreaterThan,
    LessThan,
    Exists,
    NotExists,
}

/// One condition within a rule. Conditions in a rule are AND-combined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCondition {
    /// Dot-path field resolved against the context (e.g. `user.roles`)
    pub field: String,

    /// Comparison operator
    pub operator: ConditionOperator,

    /// Operator-dependent comparison value
    #[serde(default)]
    pub value: serde_json::Value,

    /// Invert the final boolean result of the operator
    #[serde(default)]
    pub negate: bool,
}

impl PolicyCondition {
    /// Create a condition
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            negate: false,
        }
    }

    /// Presence-only condition; the comparison value is ignored
    pub fn exists(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: ConditionOperator::Exists,
            value: serde_json::Value::Null,
            negate: false,
        }
    }

    /// Invert the result of this condition
    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }
}

/// A policy rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Unique identifier within a rule store
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// What this rule enforces
    pub description: String,

    /// Rule classification
    pub kind: RuleKind,

    /// AND-combined conditions; an empty list matches unconditionally
    pub conditions: Vec<PolicyCondition>,

    /// Effect contributed when the rule matches
    pub effect: RuleEffect,

    /// Higher priority is evaluated first
    pub priority: i32,

    /// Disabled rules are never evaluated or reported as matched
    pub enabled: bool,
}

impl PolicyRule {
    /// Create an enabled rule with no conditions
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: RuleKind,
        effect: RuleEffect,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind,
            conditions: Vec::new(),
            effect,
            priority,
            enabled: true,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a condition
    pub fn with_condition(mut self, condition: PolicyCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Replace the condition list
    pub fn with_conditions(mut self, conditions: Vec<PolicyCondition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Mark the rule disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
