//! Decision, violation, and audit event types
//!
//! A `PolicyDecision` is produced exactly once per `evaluate` call and is
//! immutable after construction. Audit events correlate a decision with its
//! triggering context for delivery to the audit sink.

use crate::context::EvaluationContext;
use crate::pii::PiiRedactionResult;
use crate::quota::QuotaDecision;
use crate::residency::ResidencyValidation;
use crate::rule::RuleEffect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a policy violation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A matched rule whose effect was DENY, or a residency/PII/quota failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// Rule that was violated, or a synthetic id for subsystem failures
    pub rule_id: String,

    /// Rule name
    pub rule_name: String,

    /// Violation severity
    pub severity: Severity,

    /// What was violated
    pub message: String,

    /// Short description of the evaluation context (resource:action)
    pub context: String,

    /// When the violation was recorded
    pub timestamp: DateTime<Utc>,
}

impl PolicyViolation {
    /// Create a violation record
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            severity,
            message: message.into(),
            context: context.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Record of one rule that matched during evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedRule {
    /// Rule identifier
    pub rule_id: String,

    /// Rule name
    pub rule_name: String,

    /// Effect the rule contributed
    pub effect: RuleEffect,

    /// Priority at which the rule matched
    pub priority: i32,
}

/// The merged outcome of one policy evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Whether the operation may proceed
    pub allow: bool,

    /// Every contributing message in evaluation order, deduplicated
    pub reasons: Vec<String>,

    /// Residency check result, when a residency check ran
    pub residency: Option<ResidencyValidation>,

    /// PII redaction result, when the payload was scanned
    pub redaction: Option<PiiRedactionResult>,

    /// Quota check result, when a quota check ran
    pub quota: Option<QuotaDecision>,

    /// Rules that matched, in priority order
    pub applied_rules: Vec<AppliedRule>,

    /// Violations recorded by any subsystem
    pub violations: Vec<PolicyViolation>,

    /// When the decision was produced
    pub timestamp: DateTime<Utc>,

    /// Wall-clock evaluation time in milliseconds
    pub evaluation_time_ms: u64,
}

impl PolicyDecision {
    /// Check whether the decision carries any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// The highest violation severity, if any
    pub fn max_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }
}

/// Kind of audit event emitted by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAuditEventKind {
    /// One per `evaluate` call
    Decision,

    /// Emitted when a residency check ran
    ResidencyCheck,

    /// Emitted when PII redaction was applied
    PiiRedaction,
}

/// Correlates a decision with its triggering context for the audit sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyAuditEvent {
    /// Unique event id
    pub id: String,

    /// Event kind
    pub kind: PolicyAuditEventKind,

    /// Correlation id of the triggering request
    pub correlation_id: String,

    /// Workspace the request was scoped to
    pub workspace_id: String,

    /// Requester identity
    pub user_id: String,

    /// Resource:action under evaluation
    pub operation: String,

    /// The decision that was reached
    pub allow: bool,

    /// Reasons carried by the decision
    pub reasons: Vec<String>,

    /// Violations carried by the decision
    pub violations: Vec<PolicyViolation>,

    /// When the event was created
    pub timestamp: DateTime<Utc>,
}

impl PolicyAuditEvent {
    /// Build an audit event from a decision and its context
    pub fn from_decision(
        kind: PolicyAuditEventKind,
        ctx: &EvaluationContext,
        decision: &PolicyDecision,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            correlation_id: ctx.request.correlation_id.clone(),
            workspace_id: ctx.request.workspace_id.clone(),
            user_id: ctx.request.user_id.clone(),
            operation: format!("{}:{}", ctx.resource, ctx.action),
            allow: decision.allow,
            reasons: decision.reasons.clone(),
            violations: decision.violations.clone(),
            timestamp: Utc::now(),
        }
    }
}
