//! Custodia PII - detection and redaction of sensitive identifiers
//!
//! Applies a fixed, ordered set of category-specific matchers to free-text
//! payloads and replaces every match with a category placeholder token.
//! Categories cover Spanish administrative documents (DNI, NIE, NUSS) plus
//! generic contact, financial, and network identifiers.
//!
//! Redaction is idempotent: placeholder tokens never re-match any detection
//! pattern. Confidence reflects pattern specificity (checksum-verified
//! formats report 1.0), not a statistical model. The detector operates
//! purely on the given string and never logs or stores the original text.

#![deny(unsafe_code)]

mod patterns;

pub use patterns::matcher_order;

use custodia_types::{PiiCategory, PiiRedactionResult};
use std::collections::BTreeSet;

/// PII detector/redactor with per-category tuning
#[derive(Debug, Clone)]
pub struct PiiDetector {
    enabled: BTreeSet<PiiCategory>,
}

impl Default for PiiDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PiiDetector {
    /// Detector with every category enabled
    pub fn new() -> Self {
        Self {
            enabled: matcher_order().iter().copied().collect(),
        }
    }

    /// Disable a category. Generic, low-confidence patterns (postal codes)
    /// are the usual candidates.
    pub fn without_category(mut self, category: PiiCategory) -> Self {
        self.enabled.remove(&category);
        self
    }

    /// Enabled categories, in matcher order
    pub fn enabled_categories(&self) -> Vec<PiiCategory> {
        matcher_order()
            .iter()
            .copied()
            .filter(|c| self.enabled.contains(c))
            .collect()
    }

    /// Scan text and report the categories found, without redacting
    pub fn detect(&self, text: &str) -> BTreeSet<PiiCategory> {
        self.redact(text).categories
    }

    /// Produce a redacted copy of the text plus structured findings
    pub fn redact(&self, text: &str) -> PiiRedactionResult {
        let mut redacted = text.to_string();
        let mut categories = BTreeSet::new();
        let mut redacted_count = 0usize;
        let mut confidence = 0.0f64;

        // Matchers run most-specific first so broad patterns never consume
        // text that a checksum-verified category should claim. A replacement
        // can shift a word boundary and expose a shorter candidate for an
        // earlier category, so passes repeat until one makes no change. This
        // terminates: every replacement removes at least one digit or '@'
        // and placeholders contain neither.
        loop {
            let mut pass_count = 0usize;
            for category in self.enabled_categories() {
                let count = patterns::redact_category(category, &mut redacted);
                if count > 0 {
                    categories.insert(category);
                    pass_count += count;
                    confidence = confidence.max(patterns::confidence(category));
                }
            }
            if pass_count == 0 {
                break;
            }
            redacted_count += pass_count;
        }

        PiiRedactionResult {
            applied: redacted_count > 0,
            categories,
            redacted_count,
            redacted_text: redacted,
            confidence,
        }
    }
}
