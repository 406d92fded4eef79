//! Currency amount parsing
//!
//! Amounts are held as whole cents so the composite dedup key compares
//! exactly; `9.99` scraped twice is always the same key.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

static AMOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\.(\d{1,2}))?$").expect("BUG: hardcoded amount regex is invalid")
});

/// Characters removed before parsing: currency symbols and thousands separators
const STRIPPED_CHARS: &[char] = &['$', '€', '£', '¥', ','];

/// Non-negative money value in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(cents.max(0))
    }

    #[must_use]
    pub fn cents(self) -> i64 {
        self.0
    }

    /// Parse text such as `$1,234.50` or `9.99`
    pub fn parse(text: &str) -> Result<Self, ExtractError> {
        let cleaned: String = text
            .chars()
            .filter(|c| !STRIPPED_CHARS.contains(c) && !c.is_whitespace())
            .collect();

        let invalid = || ExtractError::InvalidAmount(text.trim().to_string());

        let caps = AMOUNT_PATTERN.captures(&cleaned).ok_or_else(invalid)?;
        let whole: i64 = caps[1].parse().map_err(|_| invalid())?;
        let fraction: i64 = match caps.get(2) {
            Some(m) if m.as_str().len() == 1 => m.as_str().parse::<i64>().map_err(|_| invalid())? * 10,
            Some(m) => m.as_str().parse().map_err(|_| invalid())?,
            None => 0,
        };

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
