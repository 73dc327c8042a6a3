//! Parsing of the numeric text fragments found in statistics tables
//!
//! The site writes counts as `12 of 30`, sometimes with a trailing
//! `(40%)`, control time as `M:SS`, and percentages as `45%`. Missing
//! values are rendered as a run of dashes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+):(\d{2})$").unwrap());
static LANDED_OF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s+of\s+(\d+)(?:\s*\((\d+)%\))?$").unwrap());
static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)%$").unwrap());
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

const PLACEHOLDERS: &[&str] = &["-", "--", "---", "\u{2014}", "\u{2013}"];

/// A parsed statistic: a primary count, an optional attempted count and an
/// optional success ratio in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatTriple {
    pub primary: u32,
    pub secondary: Option<u32>,
    pub ratio: Option<f64>,
}

impl StatTriple {
    fn single(primary: u32) -> Self {
        StatTriple {
            primary,
            secondary: None,
            ratio: None,
        }
    }
}

/// Parse one table cell or label value
///
/// Returns `None` for text that matches no known format, in which case the
/// caller leaves the field unset.
pub fn parse_stat(text: &str) -> Option<StatTriple> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = CLOCK.captures(text) {
        let minutes: u32 = caps[1].parse().ok()?;
        let seconds: u32 = caps[2].parse().ok()?;
        let total = minutes.checked_mul(60)?.checked_add(seconds)?;
        return Some(StatTriple::single(total));
    }

    if let Some(caps) = LANDED_OF.captures(text) {
        let landed: u32 = caps[1].parse().ok()?;
        let attempted: u32 = caps[2].parse().ok()?;
        let ratio = match caps.get(3) {
            Some(pct) => pct.as_str().parse::<f64>().ok()? / 100.0,
            None if attempted > 0 => landed as f64 / attempted as f64,
            None => 0.0,
        };
        return Some(StatTriple {
            primary: landed,
            secondary: Some(attempted),
            ratio: Some(ratio),
        });
    }

    if let Some(caps) = PERCENT.captures(text) {
        return caps[1].parse().ok().map(StatTriple::single);
    }

    if INTEGER.is_match(text) {
        return text.parse().ok().map(StatTriple::single);
    }

    if PLACEHOLDERS.contains(&text) {
        return Some(StatTriple {
            primary: 0,
            secondary: Some(0),
            ratio: Some(0.0),
        });
    }

    None
}

/// How a bare percentage number should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentScale {
    /// Value is on a 0-100 scale and is divided by 100
    Percent,
    /// Value is already a ratio in [0, 1]
    Ratio,
}

impl PercentScale {
    /// Convert a raw reading to a ratio, rejecting readings outside the
    /// expected range for this scale
    pub fn to_ratio(self, field: &str, value: f64) -> Option<f64> {
        let (ratio, limit) = match self {
            PercentScale::Percent => (value / 100.0, 100.0),
            PercentScale::Ratio => (value, 1.0),
        };
        if !(0.0..=limit).contains(&value) {
            log::warn!(
                "Ambiguous {} reading {} for {:?} scale, leaving unset",
                field,
                value,
                self
            );
            return None;
        }
        Some(ratio)
    }
}

/// Per-field percent scaling, configurable under `[percent]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentRules {
    pub sig_strikes_pct: PercentScale,
    pub takedowns_pct: PercentScale,
    pub career_rates: PercentScale,
}

impl Default for PercentRules {
    fn default() -> Self {
        PercentRules {
            sig_strikes_pct: PercentScale::Percent,
            takedowns_pct: PercentScale::Percent,
            career_rates: PercentScale::Percent,
        }
    }
}
