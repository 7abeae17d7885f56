//! Engine health reporting

/// Health of one engine component
#[derive(Debug, Clone)]
pub struct ComponentHealth {
    /// Component name ("rules", "pii", "residency", "quota")
    pub name: &'static str,

    /// Whether the component behaved as expected
    pub healthy: bool,

    /// What went wrong, when unhealthy
    pub error: Option<String>,
}

impl ComponentHealth {
    pub(crate) fn ok(name: &'static str) -> Self {
        Self {
            name,
            healthy: true,
            error: None,
        }
    }

    pub(crate) fn failed(name: &'static str, error: impl Into<String>) -> Self {
        Self {
            name,
            healthy: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregate engine health
#[derive(Debug, Clone)]
pub struct EngineHealth {
    /// True when every component is healthy
    pub healthy: bool,

    /// Per-component detail
    pub components: Vec<ComponentHealth>,
}

impl EngineHealth {
    pub(crate) fn from_components(components: Vec<ComponentHealth>) -> Self {
        Self {
            healthy: components.iter().all(|c| c.healthy),
            components,
        }
    }

    /// Look up one component by name
    pub fn component(&self, name: &str) -> Option<&ComponentHealth> {
        self.components.iter().find(|c| c.name == name)
    }
}
