//! The crawler: pop a task, fetch, extract, resolve, upsert, enqueue links

use super::frontier::{Frontier, Task};
use super::identity::{reconcile_slots, IdentityResolver};
use crate::data::scrapers::stat_text::PercentRules;
use crate::data::scrapers::{event, fight_detail, fighter, Fetch, Page};
use crate::data::Store;
use crate::{
    EventId, EventUpdate, FightId, FightStatsError, FightUpdate, FighterId, PageKind, Result,
    StatLine,
};
use chrono::{Local, NaiveDate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Tasks popped from the frontier, including failed ones
    pub attempted: usize,
    /// Tasks still queued when the run ended
    pub pending: usize,
    /// True when the stop flag ended the run
    pub interrupted: bool,
}

/// Sequential crawler over the statistics site
pub struct Crawler<'a, F: Fetch, S: Store + ?Sized> {
    fetcher: F,
    store: &'a S,
    rules: PercentRules,
    stop: Arc<AtomicBool>,
    today: NaiveDate,
}

impl<'a, F: Fetch, S: Store + ?Sized> Crawler<'a, F, S> {
    pub fn new(fetcher: F, store: &'a S, rules: PercentRules) -> Self {
        Crawler {
            fetcher,
            store,
            rules,
            stop: Arc::new(AtomicBool::new(false)),
            today: Local::now().date_naive(),
        }
    }

    /// Share an externally owned stop flag, checked between tasks
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Date used to derive fighter ages
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Crawl from one seed URL until the frontier drains or the stop flag is raised
    pub fn run(&self, seed: &str) -> Result<CrawlReport> {
        let mut frontier = Frontier::new();
        match PageKind::from_url(seed) {
            Some(PageKind::FightDetail) => {
                log::warn!(
                    "Fight detail pages need their event for context, not crawling seed {}",
                    seed
                );
                frontier.mark_visited(seed);
                return Ok(CrawlReport::default());
            }
            Some(_) => {
                frontier.push_url(seed);
            }
            None => return Err(FightStatsError::UnsupportedSeed(seed.to_string())),
        }

        let mut report = CrawlReport::default();
        loop {
            if self.stop.load(Ordering::SeqCst) {
                log::info!("Stop requested, {} tasks left in the queue", frontier.len());
                report.interrupted = true;
                break;
            }
            let Some(task) = frontier.pop() else { break };
            report.attempted += 1;
            log::info!(
                "[{} done, {} queued] {} {}",
                report.attempted - 1,
                frontier.len(),
                task.kind(),
                task.url()
            );

            if let Err(e) = self.process(&task, &mut frontier) {
                log::warn!("Skipping {} page {}: {}", task.kind(), task.url(), e);
            }
        }

        report.pending = frontier.len();
        log::info!(
            "Crawl finished: {} attempted, {} pending, {} visited",
            report.attempted,
            report.pending,
            frontier.visited_count()
        );
        Ok(report)
    }

    fn process(&self, task: &Task, frontier: &mut Frontier) -> Result<()> {
        let html = self.fetcher.fetch(task.url())?;
        let page = Page::parse(&html, task.url());
        match task {
            Task::Event(_) => self.process_event(&page, frontier),
            Task::Fighter(_) => self.process_fighter(&page, frontier),
            Task::FightDetail { fight_id, .. } => self.process_fight_detail(&page, *fight_id),
        }
    }

    // ==================== Event pages ====================

    fn process_event(&self, page: &Page, frontier: &mut Frontier) -> Result<()> {
        let parsed = event::extract(page)?;
        let update = EventUpdate {
            location: parsed.location.clone(),
        };
        let event = match self.store.find_event(&parsed.name, parsed.date)? {
            Some(existing) => {
                self.store.update_event(existing.id, &update)?;
                existing
            }
            None => self.store.create_event(&parsed.name, parsed.date, &update)?,
        };
        log::info!(
            "Event {} ({}) lists {} fights",
            event.name,
            event.date,
            parsed.fights.len()
        );

        for row in &parsed.fights {
            if let Err(e) = self.record_fight_row(event.id, row, frontier) {
                log::warn!("Skipping fight row {}: {}", row.detail_url, e);
            }
        }
        Ok(())
    }

    fn record_fight_row(
        &self,
        event_id: EventId,
        row: &event::FightRow,
        frontier: &mut Frontier,
    ) -> Result<()> {
        let resolver = IdentityResolver::new(self.store);
        let mut ids: [Option<FighterId>; 2] = [None, None];
        for (slot, link) in row.fighters.iter().enumerate() {
            ids[slot] = resolver.resolve_or_create(&link.text)?.map(|f| f.id);
            if let Some(url) = &link.url {
                frontier.push_url(url);
            }
        }

        let update = FightUpdate {
            fighter1_id: ids[0],
            fighter2_id: ids[1],
            weight_class: row.weight_class.clone(),
            method: row.method.clone(),
            end_round: row.end_round,
            end_time: row.end_time.clone(),
            scheduled_rounds: row.scheduled_rounds,
            ..Default::default()
        };

        let fight_id = match self.store.find_fight(event_id, ids[0], ids[1])? {
            Some(existing) => {
                self.store
                    .update_fight(existing.id, &update.only_missing(&existing))?;
                existing.id
            }
            None => {
                let fight = self.store.create_fight(event_id, &update)?;
                log::debug!("Created {} on {}", fight.id, event_id);
                fight.id
            }
        };

        frontier.push(Task::FightDetail {
            url: row.detail_url.clone(),
            fight_id,
        });
        Ok(())
    }

    // ==================== Fighter pages ====================

    fn process_fighter(&self, page: &Page, frontier: &mut Frontier) -> Result<()> {
        let parsed = fighter::extract(page, &self.rules)?;
        let name = IdentityResolver::<S>::split_name(&parsed.name)
            .ok_or_else(|| FightStatsError::extract(PageKind::Fighter, "blank fighter name"))?;
        let update = parsed.to_update(self.today);

        match self.store.find_fighter(&name.given, &name.family)? {
            Some(existing) => self.store.update_fighter(existing.id, &update)?,
            None => {
                self.store
                    .create_fighter(&name.given, &name.family, &update)?;
            }
        }
        log::debug!("Stored profile of {}", parsed.name);

        for url in parsed.linked_urls() {
            frontier.push_url(url);
        }
        Ok(())
    }

    // ==================== Fight detail pages ====================

    fn process_fight_detail(&self, page: &Page, fight_id: FightId) -> Result<()> {
        let parsed = fight_detail::extract(page, &self.rules)?;
        let fight = self
            .store
            .get_fight(fight_id)?
            .ok_or(FightStatsError::UnknownFight(fight_id))?;

        let resolver = IdentityResolver::new(self.store);
        let mut observed: [Option<FighterId>; 2] = [None, None];
        for (i, name) in parsed.fighters.iter().enumerate() {
            observed[i] = resolver.resolve_or_create(name)?.map(|f| f.id);
        }

        let (slots, conflicts) = reconcile_slots(fight.slots(), observed);
        for conflict in &conflicts {
            log::warn!(
                "{} slot {} holds {} but the detail page shows {}; keeping the stored fighter",
                fight.id,
                conflict.slot + 1,
                conflict.recorded,
                conflict.observed
            );
        }

        // Stats tables may list the fighters in a different order than the header
        let lookup = |name: &str| -> Result<Option<FighterId>> {
            match parsed.fighters.iter().position(|n| n == name) {
                Some(i) => Ok(observed[i]),
                None => Ok(resolver.resolve(name)?.map(|f| f.id)),
            }
        };
        let order = parsed
            .table_order
            .clone()
            .unwrap_or_else(|| parsed.fighters.clone());
        let row_fighters = [lookup(order[0].as_str())?, lookup(order[1].as_str())?];
        let row_slot = |row: usize| {
            row_fighters[row].and_then(|id| slots.iter().position(|s| *s == Some(id)))
        };

        let mut totals = [StatLine::default(); 2];
        for (row, line) in parsed.totals.iter().enumerate() {
            match row_slot(row) {
                Some(slot) => totals[slot] = *line,
                None if !line.is_empty() => {
                    log::warn!("{}: no slot for {}, dropping totals", fight.id, order[row])
                }
                None => {}
            }
        }

        let winner_id = match &parsed.winner {
            Some(name) => lookup(name.as_str())?.filter(|id| slots.contains(&Some(*id))),
            None => None,
        };

        let update = FightUpdate {
            fighter1_id: slots[0],
            fighter2_id: slots[1],
            winner_id,
            method: parsed.method.clone(),
            end_round: parsed.end_round,
            end_time: parsed.end_time.clone(),
            scheduled_rounds: parsed.scheduled_rounds,
            referee: parsed.referee.clone(),
            finish_details: parsed.finish_details.clone(),
            // a missing title marker never clears a stored flag
            is_title_fight: parsed.is_title_fight.then_some(true),
            totals,
            ..Default::default()
        };
        self.store.update_fight(fight.id, &update)?;

        let mut written = 0;
        for (round, lines) in parsed.rounds.iter() {
            for (row, line) in lines.iter().enumerate() {
                let (Some(fighter), Some(_)) = (row_fighters[row], row_slot(row)) else {
                    continue;
                };
                if line.is_empty() {
                    continue;
                }
                match self.upsert_round(fight.id, fighter, round, line) {
                    Ok(()) => written += 1,
                    Err(e) => log::warn!(
                        "{} round {} for {}: write failed: {}",
                        fight.id,
                        round,
                        fighter,
                        e
                    ),
                }
            }
        }
        log::info!("{} updated with {} round rows", fight.id, written);
        Ok(())
    }

    fn upsert_round(
        &self,
        fight: FightId,
        fighter: FighterId,
        round: u32,
        stats: &StatLine,
    ) -> Result<()> {
        match self.store.find_round_stats(fight, fighter, round)? {
            Some(existing) => self.store.update_round_stats(existing.id, stats),
            None => self
                .store
                .create_round_stats(fight, fighter, round, stats)
                .map(|_| ()),
        }
    }
}
