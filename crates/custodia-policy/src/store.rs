//! Rule store
//!
//! The store is the only shared mutable state in the engine. Reads vastly
//! outnumber writes, so evaluation takes a priority-sorted snapshot under a
//! read lock and releases it before any condition is evaluated. A version
//! counter is bumped on every mutation for cheap change detection.

use crate::error::{PolicyError, Result};
use custodia_types::{ConditionOperator, PolicyRule};
use parking_lot::RwLock;
use tracing::{info, warn};

#[derive(Default)]
struct StoreInner {
    /// Insertion order is preserved; snapshots sort stably by priority so
    /// insertion order breaks priority ties deterministically.
    rules: Vec<PolicyRule>,
    version: u64,
}

/// Ordered, mutable collection of policy rules keyed by id
#[derive(Default)]
pub struct RuleStore {
    inner: RwLock<StoreInner>,
}

impl RuleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with the given rules.
    ///
    /// Panics are avoided: invalid rules are skipped with a warning. Used
    /// for the built-in rule set, which is validated by construction.
    pub fn with_rules(rules: Vec<PolicyRule>) -> Self {
        let store = Self::new();
        for rule in rules {
            if let Err(err) = store.add(rule) {
                warn!(error = %err, "Skipping invalid rule during preload");
            }
        }
        store
    }

    /// Add a rule. Rejects duplicate ids and malformed definitions
    /// synchronously so no broken rule can be silently skipped later.
    pub fn add(&self, rule: PolicyRule) -> Result<()> {
        validate(&rule)?;

        let mut inner = self.inner.write();
        if inner.rules.iter().any(|r| r.id == rule.id) {
            return Err(PolicyError::DuplicateRule { id: rule.id });
        }

        info!(rule_id = %rule.id, name = %rule.name, priority = rule.priority, "Rule added");
        inner.rules.push(rule);
        inner.version += 1;
        Ok(())
    }

    /// Remove a rule by id
    pub fn remove(&self, id: &str) -> Result<PolicyRule> {
        let mut inner = self.inner.write();
        let idx = inner
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| PolicyError::RuleNotFound { id: id.to_string() })?;

        let rule = inner.rules.remove(idx);
        inner.version += 1;
        warn!(rule_id = %id, "Rule removed");
        Ok(rule)
    }

    /// Get a rule by id
    pub fn get(&self, id: &str) -> Option<PolicyRule> {
        self.inner.read().rules.iter().find(|r| r.id == id).cloned()
    }

    /// All rules in insertion order, enabled or not
    pub fn all(&self) -> Vec<PolicyRule> {
        self.inner.read().rules.clone()
    }

    /// Enable or disable a rule
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let mut inner = self.inner.write();
        let rule = inner
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PolicyError::RuleNotFound { id: id.to_string() })?;

        if rule.enabled != enabled {
            rule.enabled = enabled;
            info!(rule_id = %id, enabled, "Rule toggled");
            inner.version += 1;
        }
        Ok(())
    }

    /// Enabled rules sorted by priority descending; ties keep insertion
    /// order (stable sort) so evaluation is deterministic.
    pub fn snapshot(&self) -> Vec<PolicyRule> {
        let inner = self.inner.read();
        let mut rules: Vec<PolicyRule> =
            inner.rules.iter().filter(|r| r.enabled).cloned().collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        rules
    }

    /// Number of rules, enabled or not
    pub fn len(&self) -> usize {
        self.inner.read().rules.len()
    }

    /// Whether the store holds no rules
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutation counter; changes whenever the rule set changes
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }
}

/// Validate a rule definition at insert time
fn validate(rule: &PolicyRule) -> Result<()> {
    if rule.id.trim().is_empty() {
        return Err(PolicyError::InvalidRule {
            id: rule.id.clone(),
            reason: "rule id must not be empty".into(),
        });
    }
    if rule.name.trim().is_empty() {
        return Err(PolicyError::InvalidRule {
            id: rule.id.clone(),
            reason: "rule name must not be empty".into(),
        });
    }
    for condition in &rule.conditions {
        if condition.field.trim().is_empty() {
            return Err(PolicyError::InvalidRule {
                id: rule.id.clone(),
                reason: "condition field must not be empty".into(),
            });
        }
        // Regex targets must compile now; a broken pattern would otherwise
        // silently never match during evaluation.
        if condition.operator == ConditionOperator::Regex {
            let Some(pattern) = condition.value.as_str() else {
                return Err(PolicyError::InvalidRule {
                    id: rule.id.clone(),
                    reason: "regex condition requires a string pattern".into(),
                });
            };
            if let Err(err) = regex::Regex::new(pattern) {
                return Err(PolicyError::InvalidRule {
                    id: rule.id.clone(),
                    reason: format!("invalid regex pattern: {err}"),
                });
            }
        }
    }
    Ok(())
}
