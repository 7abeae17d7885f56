//! Custodia Types - Core types for policy evaluation
//!
//! Custodia turns a single request context into one authoritative,
//! fail-closed allow/deny decision. This crate holds the data model shared
//! by every decision component:
//!
//! - **EvaluationContext**: immutable snapshot of one protected request
//! - **PolicyRule / PolicyCondition**: the RBAC/ABAC rule language
//! - **PolicyDecision**: the merged, auditable outcome of one evaluation
//! - **ResidencyValidation**: data-residency compliance result
//! - **PiiRedactionResult**: PII findings and the redacted payload
//! - **QuotaDecision / Money**: budget gate result in minor currency units
//!
//! ## Architectural Boundaries
//!
//! - This crate owns: the shared vocabulary of the decision pipeline
//! - `custodia-policy` owns: rule storage and evaluation semantics
//! - `custodia-engine` owns: orchestration, merging, and audit emission

#![deny(unsafe_code)]

pub mod context;
pub mod decision;
pub mod pii;
pub mod quota;
pub mod residency;
pub mod role;
pub mod rule;

// Re-export main types
pub use context::{EvaluationContext, RequestInfo, SourceType};
pub use decision::{
    AppliedRule, PolicyAuditEvent, PolicyAuditEventKind, PolicyDecision, PolicyViolation,
    Severity,
};
pub use pii::{PiiCategory, PiiRedactionResult};
pub use quota::{BudgetWindow, Money, MoneyError, QuotaDecision};
pub use residency::{GeoLocation, Region, ResidencyValidation};
pub use role::{ActionKind, ResourceKind, Role};
pub use rule::{ConditionOperator, PolicyCondition, PolicyRule, RuleEffect, RuleKind};
