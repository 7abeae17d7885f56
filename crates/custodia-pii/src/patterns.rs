//! Category matchers
//!
//! Each category owns one compiled pattern and, where the format defines
//! one, a checksum validator (DNI/NIE mod-23 control letter, Luhn for card
//! numbers). A candidate that fails its checksum is left untouched.

use custodia_types::PiiCategory;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Control letters for the Spanish DNI/NIE mod-23 checksum
const DNI_LETTERS: &[u8; 23] = b"TRWAGMYFPDXBNJZSQVHLCKE";

static DNI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{8})([A-Za-z])\b").expect("dni pattern"));

static NIE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([XYZxyz])(\d{7})([A-Za-z])\b").expect("nie pattern"));

static IBAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bES\d{2}(?: ?\d{4}){5}\b").expect("iban pattern"));

static NUSS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}[ /-]?\d{8}[ /-]?\d{2}\b").expect("nuss pattern"));

static CARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{4}\b").expect("card pattern")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+34[ -]?[679]\d{2}[ -]?\d{3}[ -]?\d{3}\b|\b[679]\d{2}[ -]?\d{3}[ -]?\d{3}\b")
        .expect("phone pattern")
});

static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:25[0-5]|2[0-4]\d|1\d{2}|[1-9]?\d)(?:\.(?:25[0-5]|2[0-4]\d|1\d{2}|[1-9]?\d)){3}\b",
    )
    .expect("ipv4 pattern")
});

static POSTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:0[1-9]|[1-4]\d|5[0-2])\d{3}\b").expect("postal pattern"));

/// Matcher application order, most specific first. Broad patterns never get
/// to consume text that a checksum-verified category should claim.
pub fn matcher_order() -> &'static [PiiCategory] {
    &[
        PiiCategory::Dni,
        PiiCategory::Nie,
        PiiCategory::Iban,
        PiiCategory::Nuss,
        PiiCategory::CreditCard,
        PiiCategory::Email,
        PiiCategory::Phone,
        PiiCategory::IpAddress,
        PiiCategory::PostalCode,
    ]
}

/// Pattern-specificity confidence per category
pub(crate) fn confidence(category: PiiCategory) -> f64 {
    match category {
        PiiCategory::Dni | PiiCategory::Nie => 1.0,
        PiiCategory::Iban => 0.95,
        PiiCategory::Nuss | PiiCategory::CreditCard | PiiCategory::Email => 0.9,
        PiiCategory::Phone | PiiCategory::IpAddress => 0.8,
        PiiCategory::PostalCode => 0.5,
    }
}

/// Redact every valid match of one category in place; returns the number of
/// substitutions performed.
pub(crate) fn redact_category(category: PiiCategory, text: &mut String) -> usize {
    let placeholder = category.placeholder();
    let mut count = 0usize;

    let replaced = match category {
        PiiCategory::Dni => DNI_RE.replace_all(text, |caps: &Captures<'_>| {
            if dni_checksum_valid(&caps[1], &caps[2]) {
                count += 1;
                placeholder.to_string()
            } else {
                caps[0].to_string()
            }
        }),
        PiiCategory::Nie => NIE_RE.replace_all(text, |caps: &Captures<'_>| {
            if nie_checksum_valid(&caps[1], &caps[2], &caps[3]) {
                count += 1;
                placeholder.to_string()
            } else {
                caps[0].to_string()
            }
        }),
        PiiCategory::CreditCard => CARD_RE.replace_all(text, |caps: &Captures<'_>| {
            if luhn_valid(&caps[0]) {
                count += 1;
                placeholder.to_string()
            } else {
                caps[0].to_string()
            }
        }),
        PiiCategory::Iban => count_all(&IBAN_RE, text, placeholder, &mut count),
        PiiCategory::Nuss => count_all(&NUSS_RE, text, placeholder, &mut count),
        PiiCategory::Email => count_all(&EMAIL_RE, text, placeholder, &mut count),
        PiiCategory::Phone => count_all(&PHONE_RE, text, placeholder, &mut count),
        PiiCategory::IpAddress => count_all(&IPV4_RE, text, placeholder, &mut count),
        PiiCategory::PostalCode => count_all(&POSTAL_RE, text, placeholder, &mut count),
    };

    if count > 0 {
        *text = replaced.into_owned();
    }
    count
}

fn count_all<'t>(
    re: &Regex,
    text: &'t str,
    placeholder: &str,
    count: &mut usize,
) -> std::borrow::Cow<'t, str> {
    re.replace_all(text, |_: &Captures<'_>| {
        *count += 1;
        placeholder.to_string()
    })
}

fn dni_checksum_valid(digits: &str, letter: &str) -> bool {
    let Ok(number) = digits.parse::<u32>() else {
        return false;
    };
    expected_letter(number) == letter.to_ascii_uppercase()
}

fn nie_checksum_valid(prefix: &str, digits: &str, letter: &str) -> bool {
    let lead = match prefix.to_ascii_uppercase().as_str() {
        "X" => 0u32,
        "Y" => 1,
        "Z" => 2,
        _ => return false,
    };
    let Ok(rest) = digits.parse::<u32>() else {
        return false;
    };
    expected_letter(lead * 10_000_000 + rest) == letter.to_ascii_uppercase()
}

fn expected_letter(number: u32) -> String {
    let idx = (number % 23) as usize;
    (DNI_LETTERS[idx] as char).to_string()
}

fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
