//! Condition resolution and matching
//!
//! Field resolution is a closed accessor table over the evaluation context;
//! there is no reflection and no generic property walking. Comparison
//! targets may reference another context field with a `$` prefix
//! (e.g. `"$user.id"`), which keeps owner-scoped and workspace-isolation
//! conditions expressible in the same closed language.

use custodia_types::{ConditionOperator, EvaluationContext, PolicyCondition, SourceType};
use serde_json::Value;
use tracing::warn;

/// Resolve a dot-path field against the context.
///
/// Known paths: `user.id`, `user.roles`, `user.workspace_id`,
/// `user.client_ip`, `user.source`, `resource`, `action`, `data.<key>`,
/// `metadata.<key>`. Unknown paths resolve to `None`.
pub fn resolve(ctx: &EvaluationContext, field: &str) -> Option<Value> {
    match field {
        "user.id" => Some(Value::String(ctx.request.user_id.clone())),
        "user.workspace_id" => Some(Value::String(ctx.request.workspace_id.clone())),
        "user.roles" => serde_json::to_value(&ctx.request.roles).ok(),
        "user.client_ip" => ctx.request.client_ip.clone().map(Value::String),
        "user.source" => Some(Value::String(
            match ctx.request.source {
                SourceType::Trusted => "trusted",
                SourceType::Untrusted => "untrusted",
            }
            .to_string(),
        )),
        "resource" => Some(Value::String(ctx.resource.clone())),
        "action" => Some(Value::String(ctx.action.clone())),
        _ => {
            if let Some(key) = field.strip_prefix("data.") {
                ctx.data.as_ref()?.as_object()?.get(key).cloned()
            } else if let Some(key) = field.strip_prefix("metadata.") {
                ctx.metadata.get(key).cloned()
            } else {
                None
            }
        }
    }
}

/// Apply an operator to a resolved value.
///
/// An absent value never matches (except via EXISTS/NOT_EXISTS); `negate`
/// is applied after the operator's raw result.
pub fn matches(
    value: Option<&Value>,
    operator: ConditionOperator,
    target: &Value,
    negate: bool,
) -> bool {
    // Presence operators look only at the found flag and ignore the target.
    let raw = match operator {
        ConditionOperator::Exists => value.is_some(),
        ConditionOperator::NotExists => value.is_none(),
        _ => {
            let Some(value) = value else {
                // Absence is a non-match, not an error; negation does not
                // resurrect a missing field.
                return false;
            };
            apply_operator(value, operator, target)
        }
    };

    if negate {
        !raw
    } else {
        raw
    }
}

/// Evaluate one condition against the context, resolving `$`-prefixed
/// targets as field references.
pub fn evaluate(ctx: &EvaluationContext, condition: &PolicyCondition) -> bool {
    let value = resolve(ctx, &condition.field);
    let resolved_target;
    let target = match condition.value.as_str() {
        Some(s) if s.starts_with('$') => {
            resolved_target = resolve(ctx, &s[1..]).unwrap_or(Value::Null);
            &resolved_target
        }
        _ => &condition.value,
    };
    matches(value.as_ref(), condition.operator, target, condition.negate)
}

fn apply_operator(value: &Value, operator: ConditionOperator, target: &Value) -> bool {
    match operator {
        ConditionOperator::Equals => value == target,
        ConditionOperator::NotEquals => value != target,
        ConditionOperator::Contains => contains(value, target),
        ConditionOperator::NotContains => !contains(value, target),
        ConditionOperator::StartsWith => match (value.as_str(), target.as_str()) {
            (Some(v), Some(t)) => v.starts_with(t),
            _ => false,
        },
        ConditionOperator::EndsWith => match (value.as_str(), target.as_str()) {
            (Some(v), Some(t)) => v.ends_with(t),
            _ => false,
        },
        ConditionOperator::Regex => match (value.as_str(), target.as_str()) {
            (Some(v), Some(pattern)) => match regex::Regex::new(pattern) {
                Ok(re) => re.is_match(v),
                Err(err) => {
                    warn!(pattern = %pattern, error = %err, "Invalid regex in condition");
                    false
                }
            },
            _ => false,
        },
        ConditionOperator::In => target
            .as_array()
            .map(|set| set.contains(value))
            .unwrap_or(false),
        ConditionOperator::NotIn => target
            .as_array()
            .map(|set| !set.contains(value))
            .unwrap_or(false),
        ConditionOperator::GreaterThan => match (value.as_f64(), target.as_f64()) {
            (Some(v), Some(t)) => v > t,
            _ => false,
        },
        ConditionOperator::LessThan => match (value.as_f64(), target.as_f64()) {
            (Some(v), Some(t)) => v < t,
            _ => false,
        },
        // Handled before apply_operator is reached.
        ConditionOperator::Exists | ConditionOperator::NotExists => unreachable!(),
    }
}

/// CONTAINS semantics: array membership for list values, substring for
/// strings, non-match for everything else.
fn contains(value: &Value, target: &Value) -> bool {
    match value {
        Value::Array(items) => items.contains(target),
        Value::String(s) => target.as_str().map(|t| s.contains(t)).unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_types::{RequestInfo, Role};
    use serde_json::json;

    fn ctx() -> EvaluationContext {
        EvaluationContext::new(
            RequestInfo::new("ws-1", "user-1").with_roles(vec![Role::Operator]),
            "document",
            "read",
        )
        .with_data(json!({"contains_pii": true, "size": 42}))
        .with_metadata("owner_id", "user-1")
    }

    #[test]
    fn resolves_known_fields() {
        let ctx = ctx();
        assert_eq!(resolve(&ctx, "user.id"), Some(json!("user-1")));
        assert_eq!(resolve(&ctx, "resource"), Some(json!("document")));
        assert_eq!(resolve(&ctx, "action"), Some(json!("read")));
        assert_eq!(resolve(&ctx, "user.roles"), Some(json!(["OPERATOR"])));
        assert_eq!(resolve(&ctx, "data.contains_pii"), Some(json!(true)));
        assert_eq!(resolve(&ctx, "metadata.owner_id"), Some(json!("user-1")));
    }

    #[test]
    fn unknown_field_resolves_to_none() {
        let ctx = ctx();
        assert_eq!(resolve(&ctx, "user.password"), None);
        assert_eq!(resolve(&ctx, "data.missing"), None);
        assert_eq!(resolve(&ctx, "nonsense"), None);
    }

    #[test]
    fn equals_and_negation() {
        assert!(matches(
            Some(&json!("read")),
            ConditionOperator::Equals,
            &json!("read"),
            false
        ));
        assert!(!matches(
            Some(&json!("read")),
            ConditionOperator::Equals,
            &json!("read"),
            true
        ));
        // NOT_EQUALS and negated EQUALS agree
        assert!(matches(
            Some(&json!("read")),
            ConditionOperator::NotEquals,
            &json!("write"),
            false
        ));
        assert!(matches(
            Some(&json!("read")),
            ConditionOperator::Equals,
            &json!("write"),
            true
        ));
    }

    #[test]
    fn contains_array_and_substring() {
        assert!(matches(
            Some(&json!(["OPERATOR", "VIEWER"])),
            ConditionOperator::Contains,
            &json!("OPERATOR"),
            false
        ));
        assert!(matches(
            Some(&json!("workflow-runner")),
            ConditionOperator::Contains,
            &json!("runner"),
            false
        ));
        assert!(!matches(
            Some(&json!(42)),
            ConditionOperator::Contains,
            &json!("4"),
            false
        ));
    }

    #[test]
    fn string_prefix_suffix() {
        assert!(matches(
            Some(&json!("audit:read")),
            ConditionOperator::StartsWith,
            &json!("audit"),
            false
        ));
        assert!(matches(
            Some(&json!("audit:read")),
            ConditionOperator::EndsWith,
            &json!("read"),
            false
        ));
    }

    #[test]
    fn regex_operator() {
        assert!(matches(
            Some(&json!("doc-123")),
            ConditionOperator::Regex,
            &json!(r"^doc-\d+$"),
            false
        ));
        // Invalid pattern never matches and never panics
        assert!(!matches(
            Some(&json!("doc-123")),
            ConditionOperator::Regex,
            &json!("("),
            false
        ));
    }

    #[test]
    fn in_and_not_in() {
        assert!(matches(
            Some(&json!("es")),
            ConditionOperator::In,
            &json!(["es", "eu"]),
            false
        ));
        assert!(matches(
            Some(&json!("us")),
            ConditionOperator::NotIn,
            &json!(["es", "eu"]),
            false
        ));
    }

    #[test]
    fn numeric_comparison() {
        assert!(matches(
            Some(&json!(10)),
            ConditionOperator::GreaterThan,
            &json!(5),
            false
        ));
        assert!(matches(
            Some(&json!(3.5)),
            ConditionOperator::LessThan,
            &json!(4),
            false
        ));
        // Non-numeric operands never match
        assert!(!matches(
            Some(&json!("ten")),
            ConditionOperator::GreaterThan,
            &json!(5),
            false
        ));
    }

    #[test]
    fn exists_ignores_target() {
        assert!(matches(
            Some(&json!(null)),
            ConditionOperator::Exists,
            &json!("ignored"),
            false
        ));
        assert!(matches(None, ConditionOperator::NotExists, &json!(0), false));
    }

    #[test]
    fn missing_field_is_non_match_even_negated() {
        assert!(!matches(
            None,
            ConditionOperator::Equals,
            &json!("x"),
            false
        ));
        assert!(!matches(None, ConditionOperator::Equals, &json!("x"), true));
    }

    #[test]
    fn dollar_target_resolves_field_reference() {
        let ctx = ctx();
        let own = PolicyCondition::new(
            "metadata.owner_id",
            ConditionOperator::Equals,
            "$user.id",
        );
        assert!(evaluate(&ctx, &own));

        let other = EvaluationContext::new(
            RequestInfo::new("ws-1", "user-2"),
            "audit",
            "read",
        )
        .with_metadata("owner_id", "user-1");
        assert!(!evaluate(&other, &own));
    }
}
