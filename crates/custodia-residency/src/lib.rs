//! Custodia residency - data-residency validation
//!
//! Compares the processing location of an operation against the region a
//! workspace is allowed to process data in. Validation never errors: an
//! unknown location is either tolerated (lenient) or reported as a
//! violation (strict), and a disabled validator reports every operation
//! compliant with `enforced = false`.

#![deny(unsafe_code)]

use async_trait::async_trait;
use custodia_types::{GeoLocation, Region, ResidencyValidation};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Resolves a client IP to a processing location when the caller did not
/// attach one. Best effort: `None` means the IP could not be located.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve(&self, client_ip: &str) -> Option<GeoLocation>;
}

/// EU/EEA member states, ISO 3166-1 alpha-2
const EU_EEA_COUNTRIES: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
    // EEA
    "IS", "LI", "NO",
];

/// Residency validator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidencyConfig {
    /// Whether residency checks are enforced at all
    pub enforced: bool,

    /// Strict mode treats an unknown processing location as a violation;
    /// lenient mode lets it pass
    pub strict: bool,

    /// Region applied to workspaces without an explicit override
    pub default_region: Region,
}

impl Default for ResidencyConfig {
    fn default() -> Self {
        Self {
            enforced: true,
            strict: false,
            default_region: Region::Es,
        }
    }
}

/// Validates processing locations against per-workspace allowed regions
pub struct ResidencyValidator {
    config: ResidencyConfig,
    overrides: RwLock<HashMap<String, Region>>,
}

impl ResidencyValidator {
    /// Create a validator with the given configuration
    pub fn new(config: ResidencyConfig) -> Self {
        Self {
            config,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// The active configuration
    pub fn config(&self) -> &ResidencyConfig {
        &self.config
    }

    /// Override the allowed region for one workspace
    pub fn set_workspace_region(&self, workspace_id: impl Into<String>, region: Region) {
        self.overrides.write().insert(workspace_id.into(), region);
    }

    /// Allowed region for a workspace, falling back to the default
    pub fn workspace_region(&self, workspace_id: &str) -> Region {
        self.overrides
            .read()
            .get(workspace_id)
            .copied()
            .unwrap_or(self.config.default_region)
    }

    /// Validate one operation's processing location for a workspace.
    ///
    /// `location` is optional: geolocation is often unavailable. What an
    /// absent location means depends on `strict`.
    pub fn validate(
        &self,
        operation: &str,
        workspace_id: &str,
        location: Option<&GeoLocation>,
    ) -> ResidencyValidation {
        let allowed = self.workspace_region(workspace_id);

        if !self.config.enforced {
            return ResidencyValidation::not_enforced(allowed);
        }

        let Some(location) = location else {
            if self.config.strict {
                warn!(%workspace_id, %operation, "Processing location unknown under strict residency");
                return ResidencyValidation::violation(
                    allowed,
                    None,
                    format!("processing location for '{operation}' is unknown (strict residency, region {allowed})"),
                );
            }
            return ResidencyValidation::compliant(allowed, None);
        };

        match self.location_compliance(allowed, location) {
            Compliance::Compliant => {
                debug!(%workspace_id, %operation, country = %location.country, "Residency check passed");
                ResidencyValidation::compliant(allowed, Some(location.clone()))
            }
            Compliance::Unknown if !self.config.strict => {
                ResidencyValidation::compliant(allowed, Some(location.clone()))
            }
            Compliance::Unknown => ResidencyValidation::violation(
                allowed,
                Some(location.clone()),
                format!(
                    "processing location for '{operation}' could not be confirmed inside region {allowed}"
                ),
            ),
            Compliance::Violation => {
                warn!(
                    %workspace_id,
                    %operation,
                    country = %location.country,
                    region = %allowed,
                    "Residency violation"
                );
                ResidencyValidation::violation(
                    allowed,
                    Some(location.clone()),
                    format!(
                        "operation '{operation}' processed in {} but workspace is restricted to region {allowed}",
                        location.country
                    ),
                )
            }
        }
    }

    /// Country code first; the provider/data-center hint is the fallback
    /// when geolocation produced no country.
    fn location_compliance(&self, allowed: Region, location: &GeoLocation) -> Compliance {
        if allowed == Region::Global {
            return Compliance::Compliant;
        }

        if !location.country.is_empty() {
            let in_region = match allowed {
                Region::Es => location.country == "ES",
                Region::Eu => EU_EEA_COUNTRIES.contains(&location.country.as_str()),
                Region::Global => true,
            };
            return if in_region {
                Compliance::Compliant
            } else {
                Compliance::Violation
            };
        }

        match location.provider_hint.as_deref().map(hint_region) {
            // An EU data-center hint satisfies an EU requirement but cannot
            // pin processing to Spain specifically.
            Some(Some(Region::Eu)) if allowed == Region::Eu => Compliance::Compliant,
            Some(Some(Region::Eu)) => Compliance::Unknown,
            Some(None) => Compliance::Violation,
            _ => Compliance::Unknown,
        }
    }
}

enum Compliance {
    Compliant,
    Violation,
    /// No evidence either way (missing country, ambiguous hint)
    Unknown,
}

/// Region implied by a provider/data-center hint such as "aws:eu-west-1".
/// Returns `None` for a hint that clearly names a non-EU data center.
fn hint_region(hint: &str) -> Option<Region> {
    let zone = hint.rsplit(':').next().unwrap_or(hint).to_ascii_lowercase();
    (zone.starts_with("eu-") || zone.starts_with("europe-")).then_some(Region::Eu)
}
