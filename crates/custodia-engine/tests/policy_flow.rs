//! End-to-end engine flows: rules, residency, PII, quota, and audit
//! emission through the public engine surface.

use async_trait::async_trait;
use custodia_audit::MemoryAuditSink;
use custodia_engine::{EngineConfig, PolicyEngine, PolicyEngineRequest};
use custodia_quota::{CostAccessor, CostError, MemoryCostAccessor};
use custodia_residency::{GeoResolver, ResidencyConfig};
use custodia_types::{
    BudgetWindow, ConditionOperator, EvaluationContext, GeoLocation, Money, PolicyAuditEventKind,
    PolicyCondition, PolicyRule, RequestInfo, Role, RuleEffect, RuleKind, Severity,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn ctx(roles: Vec<Role>, resource: &str, action: &str) -> EvaluationContext {
    EvaluationContext::new(RequestInfo::new("ws-1", "user-1").with_roles(roles), resource, action)
}

async fn wait_for_events(sink: &MemoryAuditSink, expected: usize) {
    for _ in 0..200 {
        if sink.len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn operator_workflow_execute_allowed() {
    let engine = PolicyEngine::builder().build();
    let request = PolicyEngineRequest::new(ctx(vec![Role::Operator], "workflow", "execute"));

    let decision = engine.evaluate(&request).await;
    assert!(decision.allow);
    assert_eq!(decision.reasons, vec!["all policy checks passed".to_string()]);
    assert!(decision.violations.is_empty());
    assert!(!decision.applied_rules.is_empty());
}

#[tokio::test]
async fn viewer_document_create_denied_with_required_role() {
    let engine = PolicyEngine::builder().build();
    let request = PolicyEngineRequest::new(ctx(vec![Role::Viewer], "document", "create"));

    let decision = engine.evaluate(&request).await;
    assert!(!decision.allow);
    let reasons = decision.reasons.join("; ");
    assert!(reasons.contains("Insufficient permissions"), "{reasons}");
    assert!(reasons.contains("OPERATOR"), "{reasons}");
}

#[tokio::test]
async fn residency_violation_denies() {
    let engine = PolicyEngine::builder().build();
    let request = PolicyEngineRequest::new(ctx(vec![Role::Operator], "document", "read"))
        .with_location(GeoLocation::country("US"));

    let decision = engine.evaluate(&request).await;
    assert!(!decision.allow);

    let residency = decision.residency.expect("residency check ran");
    assert!(residency.enforced);
    assert!(!residency.compliant);
    assert!(decision
        .violations
        .iter()
        .any(|v| v.rule_id == "residency-region" && v.severity == Severity::High));
}

#[tokio::test]
async fn residency_disabled_lets_foreign_location_pass() {
    let config = EngineConfig {
        residency: ResidencyConfig {
            enforced: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let engine = PolicyEngine::builder().with_config(config).build();
    let request = PolicyEngineRequest::new(ctx(vec![Role::Operator], "document", "read"))
        .with_location(GeoLocation::country("US"));

    let decision = engine.evaluate(&request).await;
    assert!(decision.allow);
    let residency = decision.residency.expect("residency check ran");
    assert!(!residency.enforced);
    assert!(residency.compliant);
}

#[tokio::test]
async fn geo_resolver_supplies_location_from_client_ip() {
    struct TableResolver;

    #[async_trait]
    impl GeoResolver for TableResolver {
        async fn resolve(&self, client_ip: &str) -> Option<GeoLocation> {
            match client_ip {
                "198.51.100.7" => Some(GeoLocation::country("US")),
                "203.0.113.9" => Some(GeoLocation::country("ES")),
                _ => None,
            }
        }
    }

    let engine = PolicyEngine::builder()
        .with_geo_resolver(Arc::new(TableResolver))
        .build();

    let foreign = EvaluationContext::new(
        RequestInfo::new("ws-1", "user-1")
            .with_roles(vec![Role::Operator])
            .with_client_ip("198.51.100.7"),
        "document",
        "read",
    );
    let decision = engine.evaluate(&PolicyEngineRequest::new(foreign)).await;
    assert!(!decision.allow);
    assert!(!decision.residency.unwrap().compliant);

    let domestic = EvaluationContext::new(
        RequestInfo::new("ws-1", "user-1")
            .with_roles(vec![Role::Operator])
            .with_client_ip("203.0.113.9"),
        "document",
        "read",
    );
    let decision = engine.evaluate(&PolicyEngineRequest::new(domestic)).await;
    assert!(decision.allow);
    assert!(decision.residency.unwrap().compliant);
}

#[tokio::test]
async fn quota_exceeded_denies_with_reason() {
    let accessor = Arc::new(MemoryCostAccessor::new());
    accessor.set_budget("ws-1", Money::eur(1_000));
    accessor.record_spend("ws-1", Money::eur(900));

    let engine = PolicyEngine::builder()
        .with_cost_accessor(accessor)
        .build();
    let request = PolicyEngineRequest::new(ctx(vec![Role::Operator], "workflow", "execute"))
        .with_estimated_cost(Money::eur(200));

    let decision = engine.evaluate(&request).await;
    assert!(!decision.allow);
    assert!(decision.quota.as_ref().unwrap().exceeded);
    assert!(decision.reasons.join("; ").contains("Quota exceeded"));

    // Under budget the same operation goes through
    let request = PolicyEngineRequest::new(ctx(vec![Role::Operator], "workflow", "execute"))
        .with_estimated_cost(Money::eur(50));
    let decision = engine.evaluate(&request).await;
    assert!(decision.allow);
    assert!(!decision.quota.as_ref().unwrap().exceeded);
}

#[tokio::test]
async fn quota_timeout_fails_closed() {
    struct SlowAccessor;

    #[async_trait]
    impl CostAccessor for SlowAccessor {
        async fn current_spend(&self, _ws: &str) -> Result<Money, CostError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Money::zero())
        }

        async fn budget_limit(&self, _ws: &str) -> Result<Option<Money>, CostError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        fn window(&self) -> BudgetWindow {
            BudgetWindow::Monthly
        }
    }

    let config = EngineConfig {
        check_timeout: Duration::from_millis(20),
        ..Default::default()
    };
    let engine = PolicyEngine::builder()
        .with_config(config)
        .with_cost_accessor(Arc::new(SlowAccessor))
        .build();
    let request = PolicyEngineRequest::new(ctx(vec![Role::Operator], "workflow", "execute"))
        .with_estimated_cost(Money::eur(1));

    let decision = engine.evaluate(&request).await;
    assert!(!decision.allow);
    assert!(decision.quota.as_ref().unwrap().exceeded);
    assert!(decision.reasons.join("; ").contains("timed out"));
}

#[tokio::test]
async fn pii_redaction_emits_audit_event() {
    let sink = Arc::new(MemoryAuditSink::new());
    let engine = PolicyEngine::builder().with_audit_sink(sink.clone()).build();

    let request = PolicyEngineRequest::new(ctx(vec![Role::Operator], "document", "read"))
        .with_payload("customer dni 12345678Z and mail ana@example.com");

    let decision = engine.evaluate(&request).await;
    assert!(decision.allow);
    let redaction = decision.redaction.expect("payload was scanned");
    assert!(redaction.applied);
    assert!(redaction.redacted_text.contains("[DNI]"));
    assert!(redaction.redacted_text.contains("[EMAIL]"));

    wait_for_events(&sink, 2).await;
    let events = sink.events();
    let decisions = events
        .iter()
        .filter(|e| e.kind == PolicyAuditEventKind::Decision)
        .count();
    let redactions = events
        .iter()
        .filter(|e| e.kind == PolicyAuditEventKind::PiiRedaction)
        .count();
    assert_eq!(decisions, 1);
    assert_eq!(redactions, 1);
}

#[tokio::test]
async fn one_decision_event_per_evaluate() {
    let sink = Arc::new(MemoryAuditSink::new());
    let engine = PolicyEngine::builder().with_audit_sink(sink.clone()).build();

    for _ in 0..3 {
        let request = PolicyEngineRequest::new(ctx(vec![Role::Viewer], "document", "read"));
        engine.evaluate(&request).await;
    }

    wait_for_events(&sink, 3).await;
    let events = sink.events();
    assert_eq!(events.len(), 3);
    assert!(events
        .iter()
        .all(|e| e.kind == PolicyAuditEventKind::Decision));
    assert!(events.iter().all(|e| e.operation == "document:read"));
}

#[tokio::test]
async fn rule_management_through_engine() {
    let engine = PolicyEngine::builder().build();
    let v0 = engine.rules_version();

    let freeze = PolicyRule::new(
        "ops-freeze-workflows",
        "Workflow Freeze",
        RuleKind::Abac,
        RuleEffect::Deny,
        2000,
    )
    .with_description("workflow execution suspended during migration")
    .with_conditions(vec![
        PolicyCondition::new("resource", ConditionOperator::Equals, "workflow"),
        PolicyCondition::new("action", ConditionOperator::Equals, "execute"),
    ]);
    engine.add_rule(freeze.clone()).unwrap();
    assert!(engine.rules_version() > v0);
    assert!(engine.get_rule("ops-freeze-workflows").is_some());

    let request = PolicyEngineRequest::new(ctx(vec![Role::Admin], "workflow", "execute"));
    assert!(!engine.evaluate(&request).await.allow);

    engine.set_rule_enabled("ops-freeze-workflows", false).unwrap();
    let request = PolicyEngineRequest::new(ctx(vec![Role::Admin], "workflow", "execute"));
    assert!(engine.evaluate(&request).await.allow);

    assert!(engine.add_rule(freeze).is_err());
    engine.remove_rule("ops-freeze-workflows").unwrap();
    assert!(engine.get_rule("ops-freeze-workflows").is_none());
    assert!(engine.all_rules().iter().all(|r| r.id != "ops-freeze-workflows"));
}

#[tokio::test]
async fn quick_check_is_rules_only() {
    let engine = PolicyEngine::builder().build();
    assert!(engine.quick_check(&ctx(vec![Role::Admin], "system", "manage")));
    assert!(!engine.quick_check(&ctx(vec![Role::Viewer], "document", "create")));
}

#[tokio::test]
async fn health_check_reports_all_components() {
    let engine = PolicyEngine::builder()
        .with_cost_accessor(Arc::new(MemoryCostAccessor::new()))
        .build();

    let health = engine.health_check().await;
    assert!(health.healthy);
    for name in ["rules", "pii", "residency", "quota"] {
        let component = health.component(name).unwrap_or_else(|| panic!("missing {name}"));
        assert!(component.healthy, "{name}: {:?}", component.error);
    }
}

#[tokio::test]
async fn thousand_extra_rules_stay_within_latency_budget() {
    let engine = PolicyEngine::builder().build();
    for i in 0..1000 {
        engine
            .add_rule(
                PolicyRule::new(
                    format!("load-{i}"),
                    format!("Load Rule {i}"),
                    RuleKind::Abac,
                    RuleEffect::Allow,
                    1,
                )
                .with_condition(PolicyCondition::new(
                    "metadata.tenant_tier",
                    ConditionOperator::Equals,
                    format!("tier-{i}"),
                )),
            )
            .unwrap();
    }

    let request = PolicyEngineRequest::new(ctx(vec![Role::Operator], "workflow", "execute"));
    let started = Instant::now();
    let decision = engine.evaluate(&request).await;
    let elapsed = started.elapsed();

    assert!(decision.allow);
    assert!(elapsed <= Duration::from_millis(150), "took {elapsed:?}");
    assert!(decision.evaluation_time_ms <= 150);
}
