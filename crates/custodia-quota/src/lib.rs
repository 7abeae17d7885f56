//! Custodia quota - workspace budget gate
//!
//! The gate asks an injected [`CostAccessor`] for a workspace's current
//! spend and budget limit, projects the estimated cost of the operation on
//! top, and reports whether the budget would be exceeded. The gate itself
//! is infallible: backend errors, currency mismatches, and arithmetic
//! overflow all fail closed (`exceeded = true` with a reason) rather than
//! letting an unpriced operation through.

#![deny(unsafe_code)]

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use custodia_types::{BudgetWindow, Money, QuotaDecision};
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced by a cost backend
#[derive(Debug, Error)]
pub enum CostError {
    /// The backend could not answer (network, storage, etc.)
    #[error("cost backend unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Source of spend and budget figures for a workspace.
///
/// Implementations talk to whatever tracks usage (metering store, billing
/// service); the gate never performs I/O itself.
#[async_trait]
pub trait CostAccessor: Send + Sync {
    /// Accumulated spend for the workspace in the current window
    async fn current_spend(&self, workspace_id: &str) -> Result<Money, CostError>;

    /// Configured budget limit; `None` means the workspace is unbounded
    async fn budget_limit(&self, workspace_id: &str) -> Result<Option<Money>, CostError>;

    /// Accounting window the budget applies to
    fn window(&self) -> BudgetWindow {
        BudgetWindow::Monthly
    }
}

/// Outcome of one quota check
#[derive(Debug, Clone)]
pub struct QuotaAssessment {
    /// The structured decision carried into the policy decision
    pub decision: QuotaDecision,

    /// Deny reason when the check failed or the budget would be exceeded
    pub reason: Option<String>,
}

impl QuotaAssessment {
    fn allowed(decision: QuotaDecision) -> Self {
        Self {
            decision,
            reason: None,
        }
    }
}

/// Budget gate over an injected cost accessor
pub struct QuotaGate {
    accessor: std::sync::Arc<dyn CostAccessor>,
}

impl QuotaGate {
    /// Create a gate over a cost accessor
    pub fn new(accessor: std::sync::Arc<dyn CostAccessor>) -> Self {
        Self { accessor }
    }

    /// Check whether an operation with the given estimated cost fits the
    /// workspace budget. Never errors; failures fail closed.
    pub async fn check(&self, workspace_id: &str, estimated_cost: Money) -> QuotaAssessment {
        let window = self.accessor.window();

        let limit = match self.accessor.budget_limit(workspace_id).await {
            Ok(limit) => limit,
            Err(err) => return fail_closed(window, format!("budget lookup failed: {err}")),
        };
        let Some(limit) = limit else {
            debug!(%workspace_id, "No budget configured; quota unbounded");
            return QuotaAssessment::allowed(QuotaDecision::unbounded());
        };

        let spend = match self.accessor.current_spend(workspace_id).await {
            Ok(spend) => spend,
            Err(err) => return fail_closed(window, format!("spend lookup failed: {err}")),
        };

        let projected = match spend.checked_add(estimated_cost) {
            Ok(projected) => projected,
            Err(err) => return fail_closed(window, format!("cost projection failed: {err}")),
        };
        if projected.currency != limit.currency {
            return fail_closed(
                window,
                format!(
                    "cost projection failed: budget in {} but spend in {}",
                    limit.currency_code(),
                    projected.currency_code()
                ),
            );
        }

        let exceeded = projected.amount_minor > limit.amount_minor;
        let decision = QuotaDecision {
            remaining: Some(limit.saturating_sub(projected)),
            budget_limit: Some(limit),
            window,
            exceeded,
            reset_at: window_reset(window, Utc::now()),
        };

        if exceeded {
            warn!(%workspace_id, %estimated_cost, %limit, "Quota exceeded");
            let reason = format!(
                "Quota exceeded: estimated cost {estimated_cost} would bring spend to {projected} against a {limit} budget"
            );
            QuotaAssessment {
                decision,
                reason: Some(reason),
            }
        } else {
            QuotaAssessment::allowed(decision)
        }
    }
}

fn fail_closed(window: BudgetWindow, reason: String) -> QuotaAssessment {
    warn!(%reason, "Quota check failed closed");
    QuotaAssessment {
        decision: QuotaDecision {
            remaining: None,
            budget_limit: None,
            window,
            exceeded: true,
            reset_at: None,
        },
        reason: Some(format!("Quota check failed closed: {reason}")),
    }
}

/// Next reset instant for a rolling window; lifetime budgets never reset.
fn window_reset(window: BudgetWindow, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match window {
        BudgetWindow::Daily => {
            let midnight = now.date_naive().and_hms_opt(0, 0, 0)?;
            Some(Utc.from_utc_datetime(&midnight) + Duration::days(1))
        }
        BudgetWindow::Monthly => {
            let (year, month) = if now.month() == 12 {
                (now.year() + 1, 1)
            } else {
                (now.year(), now.month() + 1)
            };
            Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
        }
        BudgetWindow::Lifetime => None,
    }
}

struct WorkspaceCosts {
    spend: Money,
    budget: Option<Money>,
}

impl Default for WorkspaceCosts {
    fn default() -> Self {
        Self {
            spend: Money::zero(),
            budget: None,
        }
    }
}

/// In-memory cost accessor for tests and single-process deployments
pub struct MemoryCostAccessor {
    window: BudgetWindow,
    inner: Mutex<HashMap<String, WorkspaceCosts>>,
}

impl Default for MemoryCostAccessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCostAccessor {
    /// Accessor with monthly windows and no budgets configured
    pub fn new() -> Self {
        Self {
            window: BudgetWindow::Monthly,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Accessor with the given accounting window
    pub fn with_window(window: BudgetWindow) -> Self {
        Self {
            window,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Set the budget limit for a workspace
    pub fn set_budget(&self, workspace_id: impl Into<String>, limit: Money) {
        self.inner.lock().entry(workspace_id.into()).or_default().budget = Some(limit);
    }

    /// Record spend against a workspace; a currency change or overflow
    /// restarts the accumulator at the new amount
    pub fn record_spend(&self, workspace_id: impl Into<String>, amount: Money) {
        let mut inner = self.inner.lock();
        let costs = inner.entry(workspace_id.into()).or_default();
        costs.spend = match costs.spend.checked_add(amount) {
            Ok(total) => total,
            Err(_) => amount,
        };
    }
}

#[async_trait]
impl CostAccessor for MemoryCostAccessor {
    async fn current_spend(&self, workspace_id: &str) -> Result<Money, CostError> {
        Ok(self
            .inner
            .lock()
            .get(workspace_id)
            .map(|c| c.spend)
            .unwrap_or_else(Money::zero))
    }

    async fn budget_limit(&self, workspace_id: &str) -> Result<Option<Money>, CostError> {
        Ok(self.inner.lock().get(workspace_id).and_then(|c| c.budget))
    }

    fn window(&self) -> BudgetWindow {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct FailingAccessor;

    #[async_trait]
    impl CostAccessor for FailingAccessor {
        async fn current_spend(&self, _workspace_id: &str) -> Result<Money, CostError> {
            Err(CostError::Unavailable {
                reason: "metering store offline".into(),
            })
        }

        async fn budget_limit(&self, _workspace_id: &str) -> Result<Option<Money>, CostError> {
            Ok(Some(Money::eur(10_000)))
        }
    }

    fn gate_with_memory() -> (QuotaGate, Arc<MemoryCostAccessor>) {
        let accessor = Arc::new(MemoryCostAccessor::new());
        (QuotaGate::new(accessor.clone()), accessor)
    }

    #[tokio::test]
    async fn no_budget_is_unbounded() {
        let (gate, _) = gate_with_memory();
        let outcome = gate.check("ws-1", Money::eur(500)).await;
        assert!(!outcome.decision.exceeded);
        assert!(outcome.decision.budget_limit.is_none());
        assert!(outcome.decision.remaining.is_none());
        assert!(outcome.reason.is_none());
    }

    #[tokio::test]
    async fn under_budget_reports_remaining() {
        let (gate, accessor) = gate_with_memory();
        accessor.set_budget("ws-1", Money::eur(10_000));
        accessor.record_spend("ws-1", Money::eur(4_000));

        let outcome = gate.check("ws-1", Money::eur(1_000)).await;
        assert!(!outcome.decision.exceeded);
        assert_eq!(outcome.decision.remaining.unwrap().amount_minor, 5_000);
        assert!(outcome.decision.reset_at.is_some());
    }

    #[tokio::test]
    async fn over_budget_carries_reason() {
        let (gate, accessor) = gate_with_memory();
        accessor.set_budget("ws-1", Money::eur(10_000));
        accessor.record_spend("ws-1", Money::eur(9_500));

        let outcome = gate.check("ws-1", Money::eur(1_000)).await;
        assert!(outcome.decision.exceeded);
        assert_eq!(outcome.decision.remaining.unwrap().amount_minor, 0);
        assert!(outcome.reason.unwrap().contains("Quota exceeded"));
    }

    #[tokio::test]
    async fn spend_exactly_at_limit_is_allowed() {
        let (gate, accessor) = gate_with_memory();
        accessor.set_budget("ws-1", Money::eur(10_000));
        accessor.record_spend("ws-1", Money::eur(9_000));

        let outcome = gate.check("ws-1", Money::eur(1_000)).await;
        assert!(!outcome.decision.exceeded);
    }

    #[tokio::test]
    async fn accessor_error_fails_closed() {
        let gate = QuotaGate::new(Arc::new(FailingAccessor));
        let outcome = gate.check("ws-1", Money::eur(100)).await;
        assert!(outcome.decision.exceeded);
        assert!(outcome.reason.unwrap().contains("failed closed"));
    }

    #[tokio::test]
    async fn currency_mismatch_fails_closed() {
        let (gate, accessor) = gate_with_memory();
        accessor.set_budget("ws-1", Money::eur(10_000));

        let outcome = gate.check("ws-1", Money::new(100, "USD")).await;
        assert!(outcome.decision.exceeded);
        assert!(outcome.reason.unwrap().contains("failed closed"));
    }

    #[test]
    fn monthly_window_resets_on_the_first() {
        let now = Utc.with_ymd_and_hms(2025, 12, 15, 10, 0, 0).unwrap();
        let reset = window_reset(BudgetWindow::Monthly, now).unwrap();
        assert_eq!(reset, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn daily_window_resets_at_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 0).unwrap();
        let reset = window_reset(BudgetWindow::Daily, now).unwrap();
        assert_eq!(reset, Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn lifetime_window_never_resets() {
        assert!(window_reset(BudgetWindow::Lifetime, Utc::now()).is_none());
    }
}
