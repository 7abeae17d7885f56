//! Built-in RBAC rule set
//!
//! Four ordered roles (ADMIN > MANAGER > OPERATOR > VIEWER) over a fixed
//! resource/action permission matrix, expressed as ordinary policy rules so
//! integrators can inspect, disable, or extend them through the normal rule
//! management API. Workspace isolation and the untrusted-content execution
//! block ride along at higher priorities.

use custodia_types::{
    ActionKind, ConditionOperator, PolicyCondition, PolicyRule, ResourceKind, Role, RuleEffect,
    RuleKind,
};
use serde_json::json;

/// Priority bands for the built-in set. Admin outranks the security denials
/// only for allow/deny merging purposes; a matched DENY is still terminal,
/// so the untrusted-execution block applies to admins as well.
const PRIORITY_ADMIN: i32 = 1000;
const PRIORITY_SECURITY: i32 = 1100;
const PRIORITY_ISOLATION: i32 = 900;
const PRIORITY_OWN_SCOPE: i32 = 520;
const PRIORITY_MATRIX: i32 = 500;

/// Minimum role required for a resource/action cell of the built-in matrix.
/// Returns `None` for pairs outside the matrix.
pub fn required_role(resource: &str, action: &str) -> Option<Role> {
    use ActionKind::*;
    use Role::*;

    let resource = ResourceKind::ALL
        .iter()
        .find(|r| r.as_str() == resource)?;
    let action = *ActionKind::ALL.iter().find(|a| a.as_str() == action)?;

    let role = match resource {
        ResourceKind::Workspace => match action {
            Read => Viewer,
            Create | Update | Execute => Manager,
            Delete | Manage => Admin,
        },
        ResourceKind::User => match action {
            Read => Operator,
            Create | Update => Manager,
            Delete | Execute | Manage => Admin,
        },
        ResourceKind::Document | ResourceKind::Workflow => match action {
            Read => Viewer,
            Create | Update | Execute => Operator,
            Delete | Manage => Manager,
        },
        ResourceKind::Audit => match action {
            Read => Manager,
            _ => Admin,
        },
        ResourceKind::Compliance => match action {
            Read | Create | Update | Execute => Manager,
            Delete | Manage => Admin,
        },
        ResourceKind::Policy => match action {
            Read | Execute => Manager,
            Create | Update | Delete | Manage => Admin,
        },
        ResourceKind::System => Admin,
    };
    Some(role)
}

/// The full built-in rule set, ready to preload into a rule store.
pub fn builtin_rules() -> Vec<PolicyRule> {
    let mut rules = Vec::new();

    // Untrusted-content execution block. Matched before anything can allow.
    rules.push(
        PolicyRule::new(
            "sec-untrusted-execute",
            "Untrusted Execution Block",
            RuleKind::Security,
            RuleEffect::Deny,
            PRIORITY_SECURITY,
        )
        .with_description("execution triggered by untrusted content is blocked")
        .with_conditions(vec![
            PolicyCondition::new("user.source", ConditionOperator::Equals, "untrusted"),
            PolicyCondition::new("action", ConditionOperator::Equals, "execute"),
        ]),
    );

    // Admin matches every resource/action pair.
    rules.push(
        PolicyRule::new(
            "rbac-admin-all",
            "Admin Full Access",
            RuleKind::Rbac,
            RuleEffect::Allow,
            PRIORITY_ADMIN,
        )
        .with_description("ADMIN role grants every resource/action pair")
        .with_condition(PolicyCondition::new(
            "user.roles",
            ConditionOperator::Contains,
            Role::Admin.to_string(),
        )),
    );

    // Workspace isolation is an ordinary ABAC rule, not merge-algorithm
    // magic: a request tagged with a foreign workspace id is denied.
    rules.push(
        PolicyRule::new(
            "abac-workspace-isolation",
            "Workspace Isolation",
            RuleKind::Abac,
            RuleEffect::Deny,
            PRIORITY_ISOLATION,
        )
        .with_description("cross-workspace access is denied")
        .with_conditions(vec![
            PolicyCondition::exists("metadata.workspace_id"),
            PolicyCondition::new(
                "metadata.workspace_id",
                ConditionOperator::NotEquals,
                "$user.workspace_id",
            ),
        ]),
    );

    // Own-scoped audit read for non-privileged roles: allowed only when the
    // audit record's owner is the requester.
    for role in [Role::Operator, Role::Viewer] {
        rules.push(
            PolicyRule::new(
                format!("rbac-audit-read-own-{}", role.to_string().to_lowercase()),
                format!("Own Audit Read ({role})"),
                RuleKind::Rbac,
                RuleEffect::Allow,
                PRIORITY_OWN_SCOPE,
            )
            .with_description("read access to the requester's own audit records")
            .with_conditions(vec![
                PolicyCondition::new("resource", ConditionOperator::Equals, "audit"),
                PolicyCondition::new("action", ConditionOperator::Equals, "read"),
                PolicyCondition::new(
                    "user.roles",
                    ConditionOperator::Contains,
                    role.to_string(),
                ),
                PolicyCondition::new("metadata.owner_id", ConditionOperator::Equals, "$user.id"),
            ]),
        );
    }

    // One allow rule per qualifying (resource, action, role) cell. Admin is
    // covered by the blanket rule above, so generation stops at Manager.
    for resource in ResourceKind::ALL {
        for action in ActionKind::ALL {
            let Some(required) = required_role(resource.as_str(), action.as_str()) else {
                continue;
            };
            if required == Role::Admin {
                continue;
            }
            for role in [Role::Viewer, Role::Operator, Role::Manager] {
                if !role.satisfies(required) {
                    continue;
                }
                rules.push(
                    PolicyRule::new(
                        format!(
                            "rbac-{}-{}-{}",
                            resource.as_str(),
                            action.as_str(),
                            role.to_string().to_lowercase()
                        ),
                        format!("{role} may {action} {resource}"),
                        RuleKind::Rbac,
                        RuleEffect::Allow,
                        PRIORITY_MATRIX,
                    )
                    .with_conditions(vec![
                        PolicyCondition::new(
                            "resource",
                            ConditionOperator::Equals,
                            json!(resource.as_str()),
                        ),
                        PolicyCondition::new(
                            "action",
                            ConditionOperator::Equals,
                            json!(action.as_str()),
                        ),
                        PolicyCondition::new(
                            "user.roles",
                            ConditionOperator::Contains,
                            role.to_string(),
                        ),
                    ]),
                );
            }
        }
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn matrix_required_roles() {
        assert_eq!(required_role("document", "create"), Some(Role::Operator));
        assert_eq!(required_role("user", "create"), Some(Role::Manager));
        assert_eq!(required_role("workflow", "execute"), Some(Role::Operator));
        assert_eq!(required_role("system", "manage"), Some(Role::Admin));
        assert_eq!(required_role("audit", "read"), Some(Role::Manager));
    }

    #[test]
    fn unknown_cell_has_no_required_role() {
        assert_eq!(required_role("gadget", "read"), None);
        assert_eq!(required_role("document", "teleport"), None);
    }

    #[test]
    fn builtin_ids_are_unique() {
        let rules = builtin_rules();
        let ids: HashSet<&str> = rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), rules.len());
    }

    #[test]
    fn builtin_set_covers_expected_shape() {
        let rules = builtin_rules();
        assert!(rules.iter().any(|r| r.id == "rbac-admin-all"));
        assert!(rules.iter().any(|r| r.id == "abac-workspace-isolation"));
        assert!(rules.iter().any(|r| r.id == "sec-untrusted-execute"));
        assert!(rules.iter().any(|r| r.id == "rbac-audit-read-own-operator"));
        // Every generated matrix rule carries exactly three conditions
        for rule in rules.iter().filter(|r| r.id.starts_with("rbac-") && r.priority == 500) {
            assert_eq!(rule.conditions.len(), 3, "rule {}", rule.id);
        }
    }
}
