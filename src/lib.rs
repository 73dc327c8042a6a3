//! Fight statistics crawler
//!
//! Rebuilds a relational dataset of fighters, events, fights and per-round
//! statistics from a public MMA statistics site.

pub mod crawl;
pub mod data;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use data::scrapers::fetcher::FetchError;
use data::scrapers::stat_text::PercentRules;

/// Unique identifier for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub i64);

/// Unique identifier for a fighter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FighterId(pub i64);

/// Unique identifier for a fight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FightId(pub i64);

/// Unique identifier for a per-round statistics row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundStatsId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({})", self.0)
    }
}

impl fmt::Display for FighterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fighter({})", self.0)
    }
}

impl fmt::Display for FightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fight({})", self.0)
    }
}

/// Kind of document on the source site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageKind {
    Event,
    Fighter,
    FightDetail,
}

impl PageKind {
    /// Classify a site URL by its path segment
    pub fn from_url(url: &str) -> Option<PageKind> {
        if url.contains("event-details") {
            Some(PageKind::Event)
        } else if url.contains("fighter-details") {
            Some(PageKind::Fighter)
        } else if url.contains("fight-details") {
            Some(PageKind::FightDetail)
        } else {
            None
        }
    }

    /// Subdirectory name used for cached copies of this kind of page
    pub fn dir_name(self) -> &'static str {
        match self {
            PageKind::Event => "events",
            PageKind::Fighter => "fighters",
            PageKind::FightDetail => "fights",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::Event => write!(f, "event"),
            PageKind::Fighter => write!(f, "fighter"),
            PageKind::FightDetail => write!(f, "fight detail"),
        }
    }
}

/// A card on a given date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub date: NaiveDate,
    pub location: Option<String>,
}

/// Fields an event page can contribute beyond its (name, date) key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventUpdate {
    pub location: Option<String>,
}

/// A competitor, keyed by the (first, last) name pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fighter {
    pub id: FighterId,
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    /// Height in inches
    pub height: Option<u32>,
    /// Reach in inches
    pub reach: Option<f64>,
    /// Weight in pounds
    pub weight: Option<f64>,
    pub stance: Option<String>,
    pub dob: Option<NaiveDate>,
    pub age: Option<u32>,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub no_contests: u32,
    pub win_streak: u32,
    pub loss_streak: u32,
    pub career: CareerRates,
}

impl Fighter {
    /// Display name as it appears on the site
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Career rate statistics shown on a fighter profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerRates {
    /// Significant strikes landed per minute
    pub slpm: Option<f64>,
    pub str_acc: Option<f64>,
    /// Significant strikes absorbed per minute
    pub sapm: Option<f64>,
    pub str_def: Option<f64>,
    /// Takedowns per 15 minutes
    pub td_avg: Option<f64>,
    pub td_acc: Option<f64>,
    pub td_def: Option<f64>,
    /// Submission attempts per 15 minutes
    pub sub_avg: Option<f64>,
}

/// Fields a fighter profile can contribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FighterUpdate {
    pub nickname: Option<String>,
    pub height: Option<u32>,
    pub reach: Option<f64>,
    pub weight: Option<f64>,
    pub stance: Option<String>,
    pub dob: Option<NaiveDate>,
    pub age: Option<u32>,
    pub record: Option<Record>,
    pub win_streak: Option<u32>,
    pub loss_streak: Option<u32>,
    pub career: CareerRates,
}

/// Win-loss-draw line with no contests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub no_contests: u32,
}

/// Per-fighter statistics for a whole fight or a single round
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub knockdowns: Option<u32>,
    pub sig_strikes_landed: Option<u32>,
    pub sig_strikes_attempted: Option<u32>,
    pub sig_strikes_pct: Option<f64>,
    pub total_strikes_landed: Option<u32>,
    pub total_strikes_attempted: Option<u32>,
    pub takedowns_landed: Option<u32>,
    pub takedowns_attempted: Option<u32>,
    pub takedowns_pct: Option<f64>,
    pub submission_attempts: Option<u32>,
    pub reversals: Option<u32>,
    pub control_time_seconds: Option<u32>,
    pub head_landed: Option<u32>,
    pub head_attempted: Option<u32>,
    pub body_landed: Option<u32>,
    pub body_attempted: Option<u32>,
    pub leg_landed: Option<u32>,
    pub leg_attempted: Option<u32>,
    pub distance_landed: Option<u32>,
    pub distance_attempted: Option<u32>,
    pub clinch_landed: Option<u32>,
    pub clinch_attempted: Option<u32>,
    pub ground_landed: Option<u32>,
    pub ground_attempted: Option<u32>,
}

impl StatLine {
    /// True when no statistic has been observed
    pub fn is_empty(&self) -> bool {
        *self == StatLine::default()
    }

    /// Overlay every field `other` observed onto `self`
    pub fn merge(&mut self, other: &StatLine) {
        self.combine(other, true);
    }

    /// Take fields from `other` only where `self` has nothing yet
    pub fn fill_missing(&mut self, other: &StatLine) {
        self.combine(other, false);
    }

    fn combine(&mut self, other: &StatLine, overwrite: bool) {
        fn pick<T: Copy>(slot: &mut Option<T>, value: Option<T>, overwrite: bool) {
            if value.is_some() && (overwrite || slot.is_none()) {
                *slot = value;
            }
        }

        pick(&mut self.knockdowns, other.knockdowns, overwrite);
        pick(&mut self.sig_strikes_landed, other.sig_strikes_landed, overwrite);
        pick(&mut self.sig_strikes_attempted, other.sig_strikes_attempted, overwrite);
        pick(&mut self.sig_strikes_pct, other.sig_strikes_pct, overwrite);
        pick(&mut self.total_strikes_landed, other.total_strikes_landed, overwrite);
        pick(&mut self.total_strikes_attempted, other.total_strikes_attempted, overwrite);
        pick(&mut self.takedowns_landed, other.takedowns_landed, overwrite);
        pick(&mut self.takedowns_attempted, other.takedowns_attempted, overwrite);
        pick(&mut self.takedowns_pct, other.takedowns_pct, overwrite);
        pick(&mut self.submission_attempts, other.submission_attempts, overwrite);
        pick(&mut self.reversals, other.reversals, overwrite);
        pick(&mut self.control_time_seconds, other.control_time_seconds, overwrite);
        pick(&mut self.head_landed, other.head_landed, overwrite);
        pick(&mut self.head_attempted, other.head_attempted, overwrite);
        pick(&mut self.body_landed, other.body_landed, overwrite);
        pick(&mut self.body_attempted, other.body_attempted, overwrite);
        pick(&mut self.leg_landed, other.leg_landed, overwrite);
        pick(&mut self.leg_attempted, other.leg_attempted, overwrite);
        pick(&mut self.distance_landed, other.distance_landed, overwrite);
        pick(&mut self.distance_attempted, other.distance_attempted, overwrite);
        pick(&mut self.clinch_landed, other.clinch_landed, overwrite);
        pick(&mut self.clinch_attempted, other.clinch_attempted, overwrite);
        pick(&mut self.ground_landed, other.ground_landed, overwrite);
        pick(&mut self.ground_attempted, other.ground_attempted, overwrite);
    }
}

/// A bout on an event card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fight {
    pub id: FightId,
    pub event_id: EventId,
    pub fighter1_id: Option<FighterId>,
    pub fighter2_id: Option<FighterId>,
    pub winner_id: Option<FighterId>,
    pub weight_class: Option<String>,
    pub method: Option<String>,
    pub end_round: Option<u32>,
    pub end_time: Option<String>,
    pub scheduled_rounds: Option<u32>,
    pub referee: Option<String>,
    pub finish_details: Option<String>,
    pub is_title_fight: bool,
    /// Aggregate statistics for slot 1 and slot 2
    pub totals: [StatLine; 2],
}

impl Fight {
    /// Fighter ids in slot order
    pub fn slots(&self) -> [Option<FighterId>; 2] {
        [self.fighter1_id, self.fighter2_id]
    }

    /// Check if the given fighter is on this fight
    pub fn involves(&self, fighter: FighterId) -> bool {
        self.fighter1_id == Some(fighter) || self.fighter2_id == Some(fighter)
    }
}

/// Fields a fight row or fight detail page can contribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FightUpdate {
    pub fighter1_id: Option<FighterId>,
    pub fighter2_id: Option<FighterId>,
    pub winner_id: Option<FighterId>,
    pub weight_class: Option<String>,
    pub method: Option<String>,
    pub end_round: Option<u32>,
    pub end_time: Option<String>,
    pub scheduled_rounds: Option<u32>,
    pub referee: Option<String>,
    pub finish_details: Option<String>,
    pub is_title_fight: Option<bool>,
    pub totals: [StatLine; 2],
}

impl FightUpdate {
    /// Drop every field the existing fight already has a value for
    pub fn only_missing(mut self, existing: &Fight) -> Self {
        fn keep<T>(value: &mut Option<T>, present: bool) {
            if present {
                *value = None;
            }
        }

        keep(&mut self.fighter1_id, existing.fighter1_id.is_some());
        keep(&mut self.fighter2_id, existing.fighter2_id.is_some());
        keep(&mut self.winner_id, existing.winner_id.is_some());
        keep(&mut self.weight_class, existing.weight_class.is_some());
        keep(&mut self.method, existing.method.is_some());
        keep(&mut self.end_round, existing.end_round.is_some());
        keep(&mut self.end_time, existing.end_time.is_some());
        keep(&mut self.scheduled_rounds, existing.scheduled_rounds.is_some());
        keep(&mut self.referee, existing.referee.is_some());
        keep(&mut self.finish_details, existing.finish_details.is_some());
        for (update, stored) in self.totals.iter_mut().zip(existing.totals.iter()) {
            clear_present(update, stored);
        }
        self
    }
}

/// Blank every field of `line` that `base` already holds
fn clear_present(line: &mut StatLine, base: &StatLine) {
    fn clear<T>(slot: &mut Option<T>, present: bool) {
        if present {
            *slot = None;
        }
    }

    clear(&mut line.knockdowns, base.knockdowns.is_some());
    clear(&mut line.sig_strikes_landed, base.sig_strikes_landed.is_some());
    clear(&mut line.sig_strikes_attempted, base.sig_strikes_attempted.is_some());
    clear(&mut line.sig_strikes_pct, base.sig_strikes_pct.is_some());
    clear(&mut line.total_strikes_landed, base.total_strikes_landed.is_some());
    clear(&mut line.total_strikes_attempted, base.total_strikes_attempted.is_some());
    clear(&mut line.takedowns_landed, base.takedowns_landed.is_some());
    clear(&mut line.takedowns_attempted, base.takedowns_attempted.is_some());
    clear(&mut line.takedowns_pct, base.takedowns_pct.is_some());
    clear(&mut line.submission_attempts, base.submission_attempts.is_some());
    clear(&mut line.reversals, base.reversals.is_some());
    clear(&mut line.control_time_seconds, base.control_time_seconds.is_some());
    clear(&mut line.head_landed, base.head_landed.is_some());
    clear(&mut line.head_attempted, base.head_attempted.is_some());
    clear(&mut line.body_landed, base.body_landed.is_some());
    clear(&mut line.body_attempted, base.body_attempted.is_some());
    clear(&mut line.leg_landed, base.leg_landed.is_some());
    clear(&mut line.leg_attempted, base.leg_attempted.is_some());
    clear(&mut line.distance_landed, base.distance_landed.is_some());
    clear(&mut line.distance_attempted, base.distance_attempted.is_some());
    clear(&mut line.clinch_landed, base.clinch_landed.is_some());
    clear(&mut line.clinch_attempted, base.clinch_attempted.is_some());
    clear(&mut line.ground_landed, base.ground_landed.is_some());
    clear(&mut line.ground_attempted, base.ground_attempted.is_some());
}

/// One fighter's statistics for one round of a fight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStats {
    pub id: RoundStatsId,
    pub fight_id: FightId,
    pub fighter_id: FighterId,
    pub round_number: u32,
    pub stats: StatLine,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FightStatsError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Could not extract {page} page: {message}")]
    Extract { page: PageKind, message: String },

    #[error("Fight not found with ID: {0}")]
    UnknownFight(FightId),

    #[error("Unsupported seed URL: {0}")]
    UnsupportedSeed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FightStatsError {
    pub(crate) fn extract(page: PageKind, message: impl Into<String>) -> Self {
        FightStatsError::Extract {
            page,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FightStatsError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub percent: PercentRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Pause after every network request, in milliseconds
    pub delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Optional cache directory for fetched HTML
    pub cache_dir: Option<String>,
    /// Only serve pages from the cache
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scraper: ScraperConfig {
                delay_ms: 1500,
                timeout_secs: 30,
                user_agent: "fightstats/0.1".to_string(),
                cache_dir: None,
                offline: false,
            },
            data: DataConfig {
                database_path: "data/fightstats.db".to_string(),
            },
            percent: PercentRules::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FightStatsError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| FightStatsError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FightStatsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_fight() -> Fight {
        Fight {
            id: FightId(1),
            event_id: EventId(1),
            fighter1_id: Some(FighterId(1)),
            fighter2_id: None,
            winner_id: None,
            weight_class: Some("Lightweight".to_string()),
            method: None,
            end_round: None,
            end_time: None,
            scheduled_rounds: Some(5),
            referee: None,
            finish_details: None,
            is_title_fight: false,
            totals: [StatLine::default(); 2],
        }
    }

    #[test]
    fn test_only_missing_keeps_new_fields() {
        let mut totals = [StatLine::default(); 2];
        totals[0].knockdowns = Some(1);
        let update = FightUpdate {
            fighter1_id: Some(FighterId(9)),
            fighter2_id: Some(FighterId(2)),
            weight_class: Some("Featherweight".to_string()),
            method: Some("KO/TKO".to_string()),
            scheduled_rounds: Some(3),
            totals,
            ..Default::default()
        };

        let trimmed = update.only_missing(&stored_fight());
        assert_eq!(trimmed.fighter1_id, None);
        assert_eq!(trimmed.fighter2_id, Some(FighterId(2)));
        assert_eq!(trimmed.weight_class, None);
        assert_eq!(trimmed.method.as_deref(), Some("KO/TKO"));
        assert_eq!(trimmed.scheduled_rounds, None);
        assert_eq!(trimmed.totals[0].knockdowns, Some(1));
    }

    #[test]
    fn test_stat_line_merge_and_fill() {
        let mut base = StatLine {
            knockdowns: Some(0),
            ..Default::default()
        };
        let other = StatLine {
            knockdowns: Some(2),
            reversals: Some(1),
            ..Default::default()
        };

        let mut filled = base;
        filled.fill_missing(&other);
        assert_eq!(filled.knockdowns, Some(0));
        assert_eq!(filled.reversals, Some(1));

        base.merge(&other);
        assert_eq!(base.knockdowns, Some(2));
        assert_eq!(base.reversals, Some(1));
    }

    #[test]
    fn test_page_kind_from_url() {
        assert_eq!(
            PageKind::from_url("http://ufcstats.com/event-details/abc"),
            Some(PageKind::Event)
        );
        assert_eq!(
            PageKind::from_url("http://ufcstats.com/fighter-details/abc"),
            Some(PageKind::Fighter)
        );
        assert_eq!(
            PageKind::from_url("http://ufcstats.com/fight-details/abc"),
            Some(PageKind::FightDetail)
        );
        assert_eq!(PageKind::from_url("http://ufcstats.com/statistics/events"), None);
    }

    #[test]
    fn test_full_name() {
        let fighter = Fighter {
            id: FighterId(1),
            first_name: "Israel".to_string(),
            last_name: String::new(),
            nickname: None,
            height: None,
            reach: None,
            weight: None,
            stance: None,
            dob: None,
            age: None,
            wins: 0,
            losses: 0,
            draws: 0,
            no_contests: 0,
            win_streak: 0,
            loss_streak: 0,
            career: CareerRates::default(),
        };
        assert_eq!(fighter.full_name(), "Israel");
    }
}
