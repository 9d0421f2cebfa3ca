//! National identifier parsing

use std::fmt;

use serde::{Deserialize, Serialize};

/// Labels whose extracted text holds a national identifier
pub const DEFAULT_IDENTIFIER_LABELS: [&str; 4] = [
    "RUT_DEUDOR",
    "RUT_CORREDOR",
    "EMPRESA_DEUDOR_RUT",
    "EMPRESA_CORREDOR_RUT",
];

/// A numeric identifier plus its trailing check character
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NationalIdentifier {
    number: String,
    check_digit: char,
}

impl NationalIdentifier {
    /// Extracts an identifier from free text.
    ///
    /// Everything except digits and an uppercase `K` is dropped, so a
    /// lowercase `k` does not survive. The last remaining character is the
    /// check digit. Returns `None` when fewer than two characters remain.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == 'K')
            .collect();

        let check_digit = cleaned.chars().last()?;
        let number = &cleaned[..cleaned.len() - check_digit.len_utf8()];

        if number.is_empty() {
            return None;
        }

        Some(Self {
            number: number.to_string(),
            check_digit,
        })
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn check_digit(&self) -> char {
        self.check_digit
    }

    /// Canonical `number-checkdigit` form
    pub fn canonical(&self) -> String {
        format!("{}-{}", self.number, self.check_digit)
    }
}

impl fmt::Display for NationalIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.number, self.check_digit)
    }
}
