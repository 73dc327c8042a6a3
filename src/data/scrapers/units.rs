//! Unit conversion for fighter profile values

use crate::Record;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

const CM_PER_INCH: f64 = 2.54;
const LBS_PER_KG: f64 = 2.20462;

static FEET_INCHES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(\d+)'\s*(\d+(?:\.\d+)?)?\s*"?$"#).unwrap());
static CENTIMETRES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*cm$").unwrap());
static POUNDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*lbs?\.?$").unwrap());
static KILOGRAMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*kg$").unwrap());
static INCHES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^(\d+(?:\.\d+)?)\s*(?:"|in)$"#).unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());
static RECORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Record:\s*(\d+)-(\d+)-(\d+)(?:\s+\((\d+)\s*NC\))?").unwrap()
});

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Height in whole inches from `5' 11"`, `180 cm` or a bare integer
pub fn parse_height(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some(caps) = FEET_INCHES.captures(text) {
        let feet: f64 = caps[1].parse().ok()?;
        let inches: f64 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0.0,
        };
        return Some((feet * 12.0 + inches).round() as u32);
    }
    if let Some(caps) = CENTIMETRES.captures(text) {
        let cm: f64 = caps[1].parse().ok()?;
        return Some((cm / CM_PER_INCH).round() as u32);
    }
    if text.chars().all(|c| c.is_ascii_digit()) && !text.is_empty() {
        return text.parse().ok();
    }
    None
}

/// Weight in pounds from `155 lbs.`, `65.8 kg` or a bare number
///
/// Kilogram values are converted and truncated, not rounded, to one decimal
/// place, so `65.8 kg` reads as 145.0 and `70.3 kg` as 154.9.
pub fn parse_weight(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(caps) = POUNDS.captures(text) {
        return caps[1].parse().ok().map(one_decimal);
    }
    if let Some(caps) = KILOGRAMS.captures(text) {
        let kg: f64 = caps[1].parse().ok()?;
        return Some((kg * LBS_PER_KG * 10.0).trunc() / 10.0);
    }
    if NUMBER.is_match(text) {
        return text.parse().ok().map(one_decimal);
    }
    None
}

/// Reach in inches from `72"`, `183 cm` or a bare number
pub fn parse_reach(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(caps) = INCHES.captures(text) {
        return caps[1].parse().ok().map(one_decimal);
    }
    if let Some(caps) = CENTIMETRES.captures(text) {
        let cm: f64 = caps[1].parse().ok()?;
        return Some(one_decimal(cm / CM_PER_INCH));
    }
    if NUMBER.is_match(text) {
        return text.parse().ok().map(one_decimal);
    }
    None
}

/// Win-loss-draw line from `Record: 22-6-0 (1 NC)`
pub fn parse_record(text: &str) -> Option<Record> {
    let caps = RECORD.captures(text)?;
    Some(Record {
        wins: caps[1].parse().ok()?,
        losses: caps[2].parse().ok()?,
        draws: caps[3].parse().ok()?,
        no_contests: match caps.get(4) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        },
    })
}

/// Date of birth from `Jul 19, 1987`
pub fn parse_dob(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%b %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(text, "%B %d, %Y"))
        .ok()
}

/// Age in whole years on the given day
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> Option<u32> {
    if dob > today {
        return None;
    }
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Result flag of one row in a fighter's history table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoutOutcome {
    Win,
    Loss,
    Draw,
    NoContest,
    Upcoming,
}

impl BoutOutcome {
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim().to_lowercase().as_str() {
            "win" | "w" => Some(BoutOutcome::Win),
            "loss" | "l" => Some(BoutOutcome::Loss),
            "draw" | "d" => Some(BoutOutcome::Draw),
            "nc" => Some(BoutOutcome::NoContest),
            "next" => Some(BoutOutcome::Upcoming),
            _ => None,
        }
    }
}

/// Current (win_streak, loss_streak) from history rows, most recent first
///
/// Upcoming bouts are ignored. Any other result ends the streak.
pub fn current_streaks(history: &[BoutOutcome]) -> (u32, u32) {
    let mut completed = history
        .iter()
        .filter(|o| **o != BoutOutcome::Upcoming)
        .peekable();

    let Some(&first) = completed.peek().copied() else {
        return (0, 0);
    };
    if first != BoutOutcome::Win && first != BoutOutcome::Loss {
        return (0, 0);
    }

    let run = completed.take_while(|o| **o == first).count() as u32;
    match first {
        BoutOutcome::Win => (run, 0),
        _ => (0, run),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height() {
        assert_eq!(parse_height("5' 11\""), Some(71));
        assert_eq!(parse_height("6'"), Some(72));
        assert_eq!(parse_height("180 cm"), Some(71));
        assert_eq!(parse_height("70"), Some(70));
        assert_eq!(parse_height("--"), None);
    }

    #[test]
    fn test_weight() {
        assert_eq!(parse_weight("155 lbs."), Some(155.0));
        assert_eq!(parse_weight("65.8 kg"), Some(145.0));
        assert_eq!(parse_weight("70.3 kg"), Some(154.9));
        assert_eq!(parse_weight("170.5"), Some(170.5));
        assert_eq!(parse_weight("heavy"), None);
    }

    #[test]
    fn test_reach() {
        assert_eq!(parse_reach("72\""), Some(72.0));
        assert_eq!(parse_reach("183 cm"), Some(72.0));
        assert_eq!(parse_reach("74.5"), Some(74.5));
        assert_eq!(parse_reach("--"), None);
    }

    #[test]
    fn test_record() {
        let record = parse_record("Record: 22-6-0 (1 NC)").unwrap();
        assert_eq!(record.wins, 22);
        assert_eq!(record.losses, 6);
        assert_eq!(record.draws, 0);
        assert_eq!(record.no_contests, 1);

        let record = parse_record("Record: 10-2-1").unwrap();
        assert_eq!(record.no_contests, 0);

        assert_eq!(parse_record("no record"), None);
    }

    #[test]
    fn test_dob_and_age() {
        let dob = parse_dob("Jul 19, 1987").unwrap();
        assert_eq!(dob, NaiveDate::from_ymd_opt(1987, 7, 19).unwrap());
        assert_eq!(parse_dob("--"), None);

        let before = NaiveDate::from_ymd_opt(2024, 7, 18).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 7, 19).unwrap();
        assert_eq!(age_on(dob, before), Some(36));
        assert_eq!(age_on(dob, after), Some(37));
    }

    #[test]
    fn test_streaks() {
        use BoutOutcome::*;
        assert_eq!(current_streaks(&[Upcoming, Win, Win, Loss, Win]), (2, 0));
        assert_eq!(current_streaks(&[Loss, Loss, Loss]), (0, 3));
        assert_eq!(current_streaks(&[Draw, Win]), (0, 0));
        assert_eq!(current_streaks(&[]), (0, 0));
        assert_eq!(BoutOutcome::from_flag(" WIN "), Some(Win));
    }
}
