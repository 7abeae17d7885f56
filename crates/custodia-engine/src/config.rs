//! Engine configuration

use custodia_residency::ResidencyConfig;
use std::time::Duration;

/// Tunables for the policy engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deny whenever the decision carries any violation, even if the
    /// allow/deny merge would have allowed
    pub strict_mode: bool,

    /// Residency validator configuration
    pub residency: ResidencyConfig,

    /// Upper bound for each async collaborator check (quota). Hitting it
    /// fails the check closed.
    pub check_timeout: Duration,

    /// Capacity of the audit dispatch queue
    pub audit_queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_mode: true,
            residency: ResidencyConfig::default(),
            check_timeout: Duration::from_millis(100),
            audit_queue_depth: 256,
        }
    }
}
