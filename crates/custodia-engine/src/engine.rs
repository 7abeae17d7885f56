//! Policy engine orchestrator
//!
//! One `evaluate` call runs the rule engine plus the residency, PII, and
//! quota checks, merges everything into a single immutable
//! `PolicyDecision`, and hands audit events to the dispatcher without
//! blocking. Every component failure path fails closed.

use crate::config::EngineConfig;
use crate::health::{ComponentHealth, EngineHealth};
use crate::request::PolicyEngineRequest;
use custodia_audit::{AuditDispatcher, AuditSink, TracingAuditSink};
use custodia_pii::PiiDetector;
use custodia_policy::{builtin_rules, Result as PolicyResult, RuleEngine, RuleStore};
use custodia_quota::{CostAccessor, QuotaGate};
use custodia_residency::{GeoResolver, ResidencyValidator};
use custodia_types::{
    EvaluationContext, GeoLocation, PiiRedactionResult, PolicyAuditEvent, PolicyAuditEventKind,
    PolicyDecision, PolicyRule, PolicyViolation, QuotaDecision, Region, RequestInfo,
    ResidencyValidation, Role, Severity,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{info, warn};

const REASON_CLEAN: &str = "all policy checks passed";

/// Orchestrates rule evaluation, residency, PII, and quota into one
/// decision per request. Safe to share and call concurrently.
pub struct PolicyEngine {
    config: EngineConfig,
    store: Arc<RuleStore>,
    rules: RuleEngine,
    residency: ResidencyValidator,
    geo: Option<Arc<dyn GeoResolver>>,
    pii: PiiDetector,
    quota: Option<QuotaGate>,
    dispatcher: AuditDispatcher,
}

impl PolicyEngine {
    /// Builder with the default configuration
    pub fn builder() -> PolicyEngineBuilder {
        PolicyEngineBuilder::new()
    }

    /// The active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one request into a policy decision.
    ///
    /// Rule evaluation always runs; residency runs when the request carries
    /// a location or operation label; PII scanning runs when it carries a
    /// payload; the quota gate runs when one is wired and the request
    /// carries an estimated cost.
    pub async fn evaluate(&self, request: &PolicyEngineRequest) -> PolicyDecision {
        let started = Instant::now();
        let ctx = &request.context;
        let operation = format!("{}:{}", ctx.resource, ctx.action);

        let rule_eval = self.rules.evaluate(ctx);
        let mut reasons = rule_eval.reasons;
        let mut violations = rule_eval.violations;

        let location = self.resolve_location(request).await;
        let residency =
            self.check_residency(request, location, &operation, &mut reasons, &mut violations);
        let redaction = request.payload.as_deref().map(|p| self.pii.redact(p));
        if let Some(result) = &redaction {
            if result.applied {
                reasons.push(format!(
                    "PII redacted: {} finding(s) in payload",
                    result.redacted_count
                ));
            }
        }
        let quota = self
            .check_quota(request, &operation, &mut reasons, &mut violations)
            .await;

        let residency_ok = residency.as_ref().map(|r| r.compliant).unwrap_or(true);
        let quota_ok = quota.as_ref().map(|q| !q.exceeded).unwrap_or(true);
        let mut allow = rule_eval.allow && residency_ok && quota_ok;
        if self.config.strict_mode && !violations.is_empty() {
            allow = false;
        }

        let mut seen = HashSet::new();
        reasons.retain(|r| seen.insert(r.clone()));
        if allow && reasons.is_empty() {
            reasons.push(REASON_CLEAN.to_string());
        }

        let decision = PolicyDecision {
            allow,
            reasons,
            residency,
            redaction,
            quota,
            applied_rules: rule_eval.applied_rules,
            violations,
            timestamp: chrono::Utc::now(),
            evaluation_time_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            correlation_id = %ctx.request.correlation_id,
            %operation,
            allow = decision.allow,
            violations = decision.violations.len(),
            elapsed_ms = decision.evaluation_time_ms,
            "Policy decision"
        );

        self.dispatcher.emit(PolicyAuditEvent::from_decision(
            PolicyAuditEventKind::Decision,
            ctx,
            &decision,
        ));
        if decision.residency.is_some() {
            self.dispatcher.emit(PolicyAuditEvent::from_decision(
                PolicyAuditEventKind::ResidencyCheck,
                ctx,
                &decision,
            ));
        }
        if decision.redaction.as_ref().is_some_and(|r| r.applied) {
            self.dispatcher.emit(PolicyAuditEvent::from_decision(
                PolicyAuditEventKind::PiiRedaction,
                ctx,
                &decision,
            ));
        }

        decision
    }

    /// The request's own location wins; otherwise the injected resolver is
    /// asked about the client IP, bounded by the per-check timeout.
    async fn resolve_location(&self, request: &PolicyEngineRequest) -> Option<GeoLocation> {
        if request.location.is_some() {
            return request.location.clone();
        }
        let resolver = self.geo.as_ref()?;
        let client_ip = request.context.request.client_ip.as_deref()?;
        match timeout(self.config.check_timeout, resolver.resolve(client_ip)).await {
            Ok(location) => location,
            Err(_) => {
                // An unlocatable request falls through to the validator's
                // strictness setting, same as a missing location.
                warn!(%client_ip, "Geo resolution timed out");
                None
            }
        }
    }

    fn check_residency(
        &self,
        request: &PolicyEngineRequest,
        location: Option<GeoLocation>,
        operation: &str,
        reasons: &mut Vec<String>,
        violations: &mut Vec<PolicyViolation>,
    ) -> Option<ResidencyValidation> {
        if location.is_none() && request.operation.is_none() {
            return None;
        }
        let label = request.operation.as_deref().unwrap_or(operation);
        let validation = self.residency.validate(
            label,
            &request.context.request.workspace_id,
            location.as_ref(),
        );
        for message in &validation.violations {
            reasons.push(message.clone());
            violations.push(PolicyViolation::new(
                "residency-region",
                "Data Residency",
                Severity::High,
                message,
                operation,
            ));
        }
        Some(validation)
    }

    async fn check_quota(
        &self,
        request: &PolicyEngineRequest,
        operation: &str,
        reasons: &mut Vec<String>,
        violations: &mut Vec<PolicyViolation>,
    ) -> Option<QuotaDecision> {
        let gate = self.quota.as_ref()?;
        let estimated = request.estimated_cost?;
        let workspace_id = &request.context.request.workspace_id;

        let assessment = match timeout(
            self.config.check_timeout,
            gate.check(workspace_id, estimated),
        )
        .await
        {
            Ok(assessment) => assessment,
            Err(_) => {
                warn!(%workspace_id, "Quota check timed out; failing closed");
                let reason = format!(
                    "Quota check timed out after {:?} (fail closed)",
                    self.config.check_timeout
                );
                reasons.push(reason.clone());
                violations.push(PolicyViolation::new(
                    "quota-budget",
                    "Workspace Budget",
                    Severity::Medium,
                    reason,
                    operation,
                ));
                return Some(QuotaDecision {
                    remaining: None,
                    budget_limit: None,
                    window: custodia_types::BudgetWindow::Monthly,
                    exceeded: true,
                    reset_at: None,
                });
            }
        };

        if let Some(reason) = &assessment.reason {
            reasons.push(reason.clone());
            violations.push(PolicyViolation::new(
                "quota-budget",
                "Workspace Budget",
                Severity::Medium,
                reason,
                operation,
            ));
        }
        Some(assessment.decision)
    }

    /// Rules-only allow/deny shortcut. No audit event is emitted.
    pub fn quick_check(&self, ctx: &EvaluationContext) -> bool {
        self.rules.evaluate(ctx).allow
    }

    /// Redact PII from free text without a full evaluation
    pub fn redact_pii(&self, text: &str) -> PiiRedactionResult {
        self.pii.redact(text)
    }

    /// Run the residency check directly
    pub fn validate_data_residency(
        &self,
        operation: &str,
        workspace_id: &str,
        location: Option<&GeoLocation>,
    ) -> ResidencyValidation {
        self.residency.validate(operation, workspace_id, location)
    }

    /// Add a rule to the live rule set
    pub fn add_rule(&self, rule: PolicyRule) -> PolicyResult<()> {
        self.store.add(rule)
    }

    /// Remove a rule by id
    pub fn remove_rule(&self, id: &str) -> PolicyResult<PolicyRule> {
        self.store.remove(id)
    }

    /// Look up a rule by id
    pub fn get_rule(&self, id: &str) -> Option<PolicyRule> {
        self.store.get(id)
    }

    /// All rules, enabled or not
    pub fn all_rules(&self) -> Vec<PolicyRule> {
        self.store.all()
    }

    /// Enable or disable a rule
    pub fn set_rule_enabled(&self, id: &str, enabled: bool) -> PolicyResult<()> {
        self.store.set_enabled(id, enabled)
    }

    /// Rule-set mutation counter, for cheap change detection
    pub fn rules_version(&self) -> u64 {
        self.store.version()
    }

    /// Exercise each component with synthetic input. Reports per-component
    /// status without touching the audit pipeline.
    pub async fn health_check(&self) -> EngineHealth {
        let mut components = Vec::new();

        let ctx = EvaluationContext::new(
            RequestInfo::new("health-ws", "health-probe").with_roles(vec![Role::Admin]),
            "system",
            "read",
        );
        let _ = self.rules.evaluate(&ctx);
        components.push(if self.store.is_empty() {
            ComponentHealth::failed("rules", "rule store is empty")
        } else {
            ComponentHealth::ok("rules")
        });

        // 12345678Z carries a valid control letter; any working detector
        // with the DNI category enabled must flag it.
        let probe = self.pii.redact("probe 12345678Z");
        components.push(if probe.applied {
            ComponentHealth::ok("pii")
        } else {
            ComponentHealth::failed("pii", "detector failed to flag a known identifier")
        });

        let validation = self.residency.validate(
            "health:check",
            "health-ws",
            Some(&GeoLocation::country("ES")),
        );
        components.push(if validation.compliant {
            ComponentHealth::ok("residency")
        } else {
            ComponentHealth::failed("residency", validation.violations.join("; "))
        });

        if let Some(gate) = &self.quota {
            let status = match timeout(
                self.config.check_timeout,
                gate.check("health-ws", custodia_types::Money::zero()),
            )
            .await
            {
                Ok(assessment) => match assessment.reason {
                    None => ComponentHealth::ok("quota"),
                    Some(reason) => ComponentHealth::failed("quota", reason),
                },
                Err(_) => ComponentHealth::failed("quota", "quota check timed out"),
            };
            components.push(status);
        }

        EngineHealth::from_components(components)
    }
}

/// Wires collaborators and configuration into a [`PolicyEngine`].
///
/// `build` spawns the audit drain worker and must run inside a tokio
/// runtime.
pub struct PolicyEngineBuilder {
    config: EngineConfig,
    rules: Option<Vec<PolicyRule>>,
    extra_rules: Vec<PolicyRule>,
    workspace_regions: Vec<(String, Region)>,
    pii: PiiDetector,
    geo_resolver: Option<Arc<dyn GeoResolver>>,
    cost_accessor: Option<Arc<dyn CostAccessor>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl Default for PolicyEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngineBuilder {
    /// Builder preloading the built-in RBAC rule set
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            rules: None,
            extra_rules: Vec::new(),
            workspace_regions: Vec::new(),
            pii: PiiDetector::new(),
            geo_resolver: None,
            cost_accessor: None,
            audit_sink: None,
        }
    }

    /// Replace the default configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the built-in rule set entirely
    pub fn with_rules(mut self, rules: Vec<PolicyRule>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Add a rule on top of the base rule set
    pub fn with_rule(mut self, rule: PolicyRule) -> Self {
        self.extra_rules.push(rule);
        self
    }

    /// Override the allowed region for one workspace
    pub fn with_workspace_region(mut self, workspace_id: impl Into<String>, region: Region) -> Self {
        self.workspace_regions.push((workspace_id.into(), region));
        self
    }

    /// Replace the default PII detector
    pub fn with_pii_detector(mut self, detector: PiiDetector) -> Self {
        self.pii = detector;
        self
    }

    /// Wire a geolocation resolver for requests that carry only a client IP
    pub fn with_geo_resolver(mut self, resolver: Arc<dyn GeoResolver>) -> Self {
        self.geo_resolver = Some(resolver);
        self
    }

    /// Wire a cost accessor, enabling the quota gate
    pub fn with_cost_accessor(mut self, accessor: Arc<dyn CostAccessor>) -> Self {
        self.cost_accessor = Some(accessor);
        self
    }

    /// Replace the default tracing audit sink
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    /// Build the engine and spawn its audit worker
    pub fn build(self) -> PolicyEngine {
        let mut rules = self.rules.unwrap_or_else(builtin_rules);
        rules.extend(self.extra_rules);
        let store = Arc::new(RuleStore::with_rules(rules));

        let residency = ResidencyValidator::new(self.config.residency.clone());
        for (workspace_id, region) in self.workspace_regions {
            residency.set_workspace_region(workspace_id, region);
        }

        let sink = self
            .audit_sink
            .unwrap_or_else(|| Arc::new(TracingAuditSink));
        let dispatcher = AuditDispatcher::spawn(sink, self.config.audit_queue_depth);

        PolicyEngine {
            rules: RuleEngine::new(store.clone()),
            store,
            residency,
            geo: self.geo_resolver,
            pii: self.pii,
            quota: self.cost_accessor.map(QuotaGate::new),
            dispatcher,
            config: self.config,
        }
    }
}
