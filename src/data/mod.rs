//! Data ingestion and storage
//!
//! Page extraction for the statistics site and the persistence boundary the
//! crawler writes through.

pub mod database;
pub mod scrapers;

pub use database::Database;

use crate::{
    Event, EventId, EventUpdate, Fight, FightId, FightUpdate, Fighter, FighterId, FighterUpdate,
    Result, RoundStats, RoundStatsId, StatLine,
};
use chrono::NaiveDate;

/// Persistence interface for crawled entities
///
/// Updates only ever fill or overwrite with observed values; a `None` in an
/// update never clears a stored field. Each write is atomic.
pub trait Store {
    fn find_event(&self, name: &str, date: NaiveDate) -> Result<Option<Event>>;
    fn create_event(&self, name: &str, date: NaiveDate, update: &EventUpdate) -> Result<Event>;
    fn update_event(&self, id: EventId, update: &EventUpdate) -> Result<()>;

    /// Exact match on the (first, last) name pair
    fn find_fighter(&self, first_name: &str, last_name: &str) -> Result<Option<Fighter>>;
    fn get_fighter(&self, id: FighterId) -> Result<Option<Fighter>>;
    fn create_fighter(
        &self,
        first_name: &str,
        last_name: &str,
        update: &FighterUpdate,
    ) -> Result<Fighter>;
    fn update_fighter(&self, id: FighterId, update: &FighterUpdate) -> Result<()>;

    /// Fight on an event between two fighters, in either slot order
    fn find_fight(
        &self,
        event: EventId,
        a: Option<FighterId>,
        b: Option<FighterId>,
    ) -> Result<Option<Fight>>;
    fn get_fight(&self, id: FightId) -> Result<Option<Fight>>;
    fn create_fight(&self, event: EventId, update: &FightUpdate) -> Result<Fight>;
    /// Slots already holding a fighter are never reassigned
    fn update_fight(&self, id: FightId, update: &FightUpdate) -> Result<()>;

    fn find_round_stats(
        &self,
        fight: FightId,
        fighter: FighterId,
        round: u32,
    ) -> Result<Option<RoundStats>>;
    fn create_round_stats(
        &self,
        fight: FightId,
        fighter: FighterId,
        round: u32,
        stats: &StatLine,
    ) -> Result<RoundStats>;
    fn update_round_stats(&self, id: RoundStatsId, stats: &StatLine) -> Result<()>;
}
