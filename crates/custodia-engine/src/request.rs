//! Evaluation request envelope

use custodia_types::{EvaluationContext, GeoLocation, Money};

/// Everything one `evaluate` call may act on: the rule-evaluation context
/// plus the optional inputs for residency, PII, and quota checks. Absent
/// inputs skip the corresponding check.
#[derive(Debug, Clone)]
pub struct PolicyEngineRequest {
    /// Context for rule evaluation
    pub context: EvaluationContext,

    /// Free-text payload to scan for PII
    pub payload: Option<String>,

    /// Processing location for the residency check
    pub location: Option<GeoLocation>,

    /// Operation label for the residency check; defaults to
    /// `resource:action` from the context
    pub operation: Option<String>,

    /// Estimated cost of the operation for the quota gate
    pub estimated_cost: Option<Money>,
}

impl PolicyEngineRequest {
    /// Request that runs rule evaluation only
    pub fn new(context: EvaluationContext) -> Self {
        Self {
            context,
            payload: None,
            location: None,
            operation: None,
            estimated_cost: None,
        }
    }

    /// Attach a payload for PII scanning
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Attach the processing location, enabling the residency check
    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Override the operation label used in residency reporting
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Attach an estimated cost, enabling the quota check
    pub fn with_estimated_cost(mut self, cost: Money) -> Self {
        self.estimated_cost = Some(cost);
        self
    }
}
