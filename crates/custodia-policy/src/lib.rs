//! Custodia Policy - rule store and RBAC/ABAC evaluation engine
//!
//! The engine walks enabled rules in descending priority order, evaluates
//! each rule's AND-combined conditions against the request context, and
//! merges the matches into a single sub-decision:
//!
//! - the first matched DENY is terminal for allow/deny
//! - otherwise any matched ALLOW allows
//! - zero matched rules is a default deny
//! - AUDIT and REDACT matches never flip the decision; they only set flags
//!
//! Condition fields form a closed accessor table (`user.*`, `resource`,
//! `action`, `data.*`, `metadata.*`); unknown paths resolve to absent, and
//! absence is a non-match, never an error.

#![deny(unsafe_code)]

pub mod condition;
pub mod engine;
pub mod error;
pub mod rbac;
pub mod store;

pub use condition::{matches, resolve};
pub use engine::{RuleEngine, RuleEvaluation};
pub use error::{PolicyError, Result};
pub use rbac::{builtin_rules, required_role};
pub use store::RuleStore;
