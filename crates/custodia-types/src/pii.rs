//! PII detection and redaction types
//!
//! Categories are formats specific to Spanish administrative documents
//! (DNI, NIE, social security numbers) plus generic contact, financial, and
//! network identifiers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Category of personally identifiable information
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiCategory {
    /// Spanish national identity document number (checksum-verified)
    Dni,

    /// Spanish foreigner identity number (checksum-verified)
    Nie,

    /// Spanish social security number
    Nuss,

    /// International bank account number
    Iban,

    /// Payment card number
    CreditCard,

    /// Email address
    Email,

    /// Phone number
    Phone,

    /// IPv4 address
    IpAddress,

    /// Spanish postal code
    PostalCode,
}

impl PiiCategory {
    /// Placeholder token substituted for matches of this category.
    /// Placeholders never re-match any detection pattern, which makes
    /// redaction idempotent.
    pub fn placeholder(&self) -> &'static str {
        match self {
            PiiCategory::Dni => "[DNI]",
            PiiCategory::Nie => "[NIE]",
            PiiCategory::Nuss => "[NUSS]",
            PiiCategory::Iban => "[IBAN]",
            PiiCategory::CreditCard => "[CARD]",
            PiiCategory::Email => "[EMAIL]",
            PiiCategory::Phone => "[PHONE]",
            PiiCategory::IpAddress => "[IP]",
            PiiCategory::PostalCode => "[POSTAL]",
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PiiCategory::Dni => "DNI",
            PiiCategory::Nie => "NIE",
            PiiCategory::Nuss => "NUSS",
            PiiCategory::Iban => "IBAN",
            PiiCategory::CreditCard => "CREDIT_CARD",
            PiiCategory::Email => "EMAIL",
            PiiCategory::Phone => "PHONE",
            PiiCategory::IpAddress => "IP_ADDRESS",
            PiiCategory::PostalCode => "POSTAL_CODE",
        };
        f.write_str(name)
    }
}

/// Result of redacting a text payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiRedactionResult {
    /// Whether anything was redacted
    pub applied: bool,

    /// Categories actually found in the input
    pub categories: BTreeSet<PiiCategory>,

    /// Number of substitutions performed
    pub redacted_count: usize,

    /// The redacted copy; never contains the original matches
    pub redacted_text: String,

    /// Pattern-specificity confidence in [0, 1]; the maximum over matched
    /// categories, 0.0 when nothing matched
    pub confidence: f64,
}

impl PiiRedactionResult {
    /// Result for text with no detected PII
    pub fn clean(text: impl Into<String>) -> Self {
        Self {
            applied: false,
            categories: BTreeSet::new(),
            redacted_count: 0,
            redacted_text: text.into(),
            confidence: 0.0,
        }
    }
}
