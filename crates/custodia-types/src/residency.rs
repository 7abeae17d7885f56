//! Data-residency types
//!
//! Residency compliance constrains where a workspace's data may be
//! processed. The validator compares an operation's processing location
//! against the workspace's declared region.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Allowed processing region for a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    /// Spain only
    Es,

    /// Any EU/EEA member state
    Eu,

    /// No geographic restriction
    Global,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Es => write!(f, "ES"),
            Region::Eu => write!(f, "EU"),
            Region::Global => write!(f, "GLOBAL"),
        }
    }
}

/// Geographic location of request processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// ISO 3166-1 alpha-2 country code
    pub country: String,

    /// Sub-national region, when known
    pub region: Option<String>,

    /// City, when known
    pub city: Option<String>,

    /// Cloud provider / data-center hint, used when IP geolocation is
    /// unavailable (e.g. "aws:eu-west-1")
    pub provider_hint: Option<String>,
}

impl GeoLocation {
    /// Create a location from a country code
    pub fn country(code: impl Into<String>) -> Self {
        Self {
            country: code.into().to_ascii_uppercase(),
            region: None,
            city: None,
            provider_hint: None,
        }
    }

    /// Attach a provider/data-center hint
    pub fn with_provider_hint(mut self, hint: impl Into<String>) -> Self {
        self.provider_hint = Some(hint.into());
        self
    }
}

/// Result of a residency validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidencyValidation {
    /// Region the workspace is allowed to process in
    pub allowed_region: Region,

    /// Whether residency enforcement was active for this check
    pub enforced: bool,

    /// Location that was validated, when available
    pub location: Option<GeoLocation>,

    /// Whether the operation is residency-compliant
    pub compliant: bool,

    /// Human-readable violations, empty when compliant
    pub violations: Vec<String>,
}

impl ResidencyValidation {
    /// Result for a check with enforcement disabled
    pub fn not_enforced(allowed_region: Region) -> Self {
        Self {
            allowed_region,
            enforced: false,
            location: None,
            compliant: true,
            violations: Vec::new(),
        }
    }

    /// Compliant result for an enforced check
    pub fn compliant(allowed_region: Region, location: Option<GeoLocation>) -> Self {
        Self {
            allowed_region,
            enforced: true,
            location,
            compliant: true,
            violations: Vec::new(),
        }
    }

    /// Non-compliant result with a violation message
    pub fn violation(
        allowed_region: Region,
        location: Option<GeoLocation>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            allowed_region,
            enforced: true,
            location,
            compliant: false,
            violations: vec![message.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_display() {
        assert_eq!(Region::Es.to_string(), "ES");
        assert_eq!(Region::Global.to_string(), "GLOBAL");
    }

    #[test]
    fn location_normalizes_country() {
        let loc = GeoLocation::country("es");
        assert_eq!(loc.country, "ES");
    }

    #[test]
    fn not_enforced_is_compliant() {
        let v = ResidencyValidation::not_enforced(Region::Es);
        assert!(v.compliant);
        assert!(!v.enforced);
        assert!(v.violations.is_empty());
    }

    #[test]
    fn violation_result() {
        let v = ResidencyValidation::violation(Region::Es, Some(GeoLocation::country("US")), "out of region");
        assert!(!v.compliant);
        assert!(v.enforced);
        assert_eq!(v.violations.len(), 1);
    }
}
