//! Evaluation context
//!
//! The context carries everything a single policy evaluation may inspect:
//! requester identity, the resource/action pair, optional payload data, and
//! a free-form metadata bag. It is immutable for the duration of one
//! evaluation.

use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity and transport details of the requester
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestInfo {
    /// Workspace the request is scoped to
    pub workspace_id: String,

    /// Identity of the requester
    pub user_id: String,

    /// Roles held by the requester
    pub roles: Vec<Role>,

    /// Client IP address, when known
    pub client_ip: Option<String>,

    /// Client user agent, when known
    pub user_agent: Option<String>,

    /// Request ID for correlation across the audit trail
    pub correlation_id: String,

    /// Request timestamp
    pub timestamp: DateTime<Utc>,

    /// Whether the request originated from trusted or untrusted content
    pub source: SourceType,
}

impl RequestInfo {
    /// Create request info for a workspace-scoped user
    pub fn new(workspace_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            user_id: user_id.into(),
            roles: Vec::new(),
            client_ip: None,
            user_agent: None,
            correlation_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            source: SourceType::Trusted,
        }
    }

    /// Set the roles held by the requester
    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }

    /// Set the client IP
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Mark the request as originating from untrusted content
    pub fn untrusted(mut self) -> Self {
        self.source = SourceType::Untrusted;
        self
    }

    /// Check if the requester holds the given role
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Origin classification of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Request initiated by an authenticated principal
    Trusted,

    /// Request derived from untrusted content (e.g. tool output, documents)
    Untrusted,
}

/// Context for one policy evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// The requester and transport details
    pub request: RequestInfo,

    /// Resource being accessed (e.g. "document", "workflow")
    pub resource: String,

    /// Action being performed (e.g. "read", "execute")
    pub action: String,

    /// Optional request payload attributes (e.g. `{"contains_pii": true}`)
    pub data: Option<serde_json::Value>,

    /// Additional key/value context (e.g. resource owner, workspace scoping)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EvaluationContext {
    /// Create a context for a resource/action pair
    pub fn new(
        request: RequestInfo,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            request,
            resource: resource.into(),
            action: action.into(),
            data: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach payload data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
