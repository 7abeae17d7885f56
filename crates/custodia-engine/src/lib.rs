//! Custodia engine - policy decision orchestration
//!
//! The engine merges four checks into one immutable decision per request:
//! RBAC/ABAC rule evaluation, data-residency validation, PII redaction, and
//! the workspace budget gate. Audit events are emitted asynchronously and
//! never block or fail a decision. The default posture is fail closed:
//! no matching rule, an exceeded or unknown budget, and residency
//! violations all deny.
//!
//! ```no_run
//! use custodia_engine::{PolicyEngine, PolicyEngineRequest};
//! use custodia_types::{EvaluationContext, RequestInfo, Role};
//!
//! # async fn demo() {
//! let engine = PolicyEngine::builder().build();
//! let ctx = EvaluationContext::new(
//!     RequestInfo::new("ws-1", "user-1").with_roles(vec![Role::Operator]),
//!     "workflow",
//!     "execute",
//! );
//! let decision = engine.evaluate(&PolicyEngineRequest::new(ctx)).await;
//! assert!(decision.allow);
//! # }
//! ```

#![deny(unsafe_code)]

mod config;
mod engine;
mod health;
mod request;

pub use config::EngineConfig;
pub use engine::{PolicyEngine, PolicyEngineBuilder};
pub use health::{ComponentHealth, EngineHealth};
pub use request::PolicyEngineRequest;
