//! Role, resource, and action vocabulary for the built-in RBAC matrix

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered roles, strongest first. A stronger role implies every weaker one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Viewer,
    Operator,
    Manager,
    Admin,
}

impl Role {
    /// Check whether this role meets or exceeds the required role
    pub fn satisfies(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Viewer => write!(f, "VIEWER"),
            Role::Operator => write!(f, "OPERATOR"),
            Role::Manager => write!(f, "MANAGER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Protected resource kinds covered by the built-in permission matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Workspace,
    User,
    Document,
    Workflow,
    Audit,
    Compliance,
    Policy,
    System,
}

impl ResourceKind {
    /// All resource kinds, in matrix order
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Workspace,
        ResourceKind::User,
        ResourceKind::Document,
        ResourceKind::Workflow,
        ResourceKind::Audit,
        ResourceKind::Compliance,
        ResourceKind::Policy,
        ResourceKind::System,
    ];

    /// The string form used in evaluation contexts
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Workspace => "workspace",
            ResourceKind::User => "user",
            ResourceKind::Document => "document",
            ResourceKind::Workflow => "workflow",
            ResourceKind::Audit => "audit",
            ResourceKind::Compliance => "compliance",
            ResourceKind::Policy => "policy",
            ResourceKind::System => "system",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions covered by the built-in permission matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Read,
    Update,
    Delete,
    Execute,
    Manage,
}

impl ActionKind {
    /// All actions, in matrix order
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Create,
        ActionKind::Read,
        ActionKind::Update,
        ActionKind::Delete,
        ActionKind::Execute,
        ActionKind::Manage,
    ];

    /// The string form used in evaluation contexts
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Read => "read",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
            ActionKind::Execute => "execute",
            ActionKind::Manage => "manage",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
