//! SQLite database management for crawled fight data

use super::Store;
use crate::{
    CareerRates, Event, EventId, EventUpdate, Fight, FightId, FightStatsError, FightUpdate,
    Fighter, FighterId, FighterUpdate, Result, RoundStats, RoundStatsId, StatLine,
};
use chrono::NaiveDate;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Scheduled rounds assumed for a fight created without a time format
pub const DEFAULT_SCHEDULED_ROUNDS: u32 = 3;

/// Per-fighter statistic columns and their SQL types, in `StatLine` order
const STAT_COLUMNS: &[(&str, &str)] = &[
    ("knockdowns", "INTEGER"),
    ("sig_strikes_landed", "INTEGER"),
    ("sig_strikes_attempted", "INTEGER"),
    ("sig_strikes_pct", "REAL"),
    ("total_strikes_landed", "INTEGER"),
    ("total_strikes_attempted", "INTEGER"),
    ("takedowns_landed", "INTEGER"),
    ("takedowns_attempted", "INTEGER"),
    ("takedowns_pct", "REAL"),
    ("submission_attempts", "INTEGER"),
    ("reversals", "INTEGER"),
    ("control_time_seconds", "INTEGER"),
    ("head_landed", "INTEGER"),
    ("head_attempted", "INTEGER"),
    ("body_landed", "INTEGER"),
    ("body_attempted", "INTEGER"),
    ("leg_landed", "INTEGER"),
    ("leg_attempted", "INTEGER"),
    ("distance_landed", "INTEGER"),
    ("distance_attempted", "INTEGER"),
    ("clinch_landed", "INTEGER"),
    ("clinch_attempted", "INTEGER"),
    ("ground_landed", "INTEGER"),
    ("ground_attempted", "INTEGER"),
];

const FIGHTER_FIELDS: &[&str] = &[
    "nickname",
    "height",
    "reach",
    "weight",
    "stance",
    "dob",
    "age",
    "wins",
    "losses",
    "draws",
    "no_contests",
    "win_streak",
    "loss_streak",
    "slpm",
    "str_acc",
    "sapm",
    "str_def",
    "td_avg",
    "td_acc",
    "td_def",
    "sub_avg",
];

const FIGHT_FIELDS: &[&str] = &[
    "fighter1_id",
    "fighter2_id",
    "winner_id",
    "weight_class",
    "method",
    "end_round",
    "end_time",
    "scheduled_rounds",
    "referee",
    "finish_details",
    "is_title_fight",
];

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let stat_defs = |prefix: &str| {
            STAT_COLUMNS
                .iter()
                .map(|(name, ty)| format!("{prefix}{name} {ty}"))
                .collect::<Vec<_>>()
                .join(",\n                ")
        };

        self.conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_name TEXT NOT NULL,
                event_date TEXT NOT NULL,
                location TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(event_name, event_date)
            );

            CREATE TABLE IF NOT EXISTS fighters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL DEFAULT '',
                nickname TEXT,
                height INTEGER,
                reach REAL,
                weight REAL,
                stance TEXT,
                dob TEXT,
                age INTEGER,
                wins INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                draws INTEGER NOT NULL DEFAULT 0,
                no_contests INTEGER NOT NULL DEFAULT 0,
                win_streak INTEGER NOT NULL DEFAULT 0,
                loss_streak INTEGER NOT NULL DEFAULT 0,
                slpm REAL,
                str_acc REAL,
                sapm REAL,
                str_def REAL,
                td_avg REAL,
                td_acc REAL,
                td_def REAL,
                sub_avg REAL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(first_name, last_name)
            );

            CREATE TABLE IF NOT EXISTS fights (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id INTEGER NOT NULL REFERENCES events(id),
                fighter1_id INTEGER REFERENCES fighters(id),
                fighter2_id INTEGER REFERENCES fighters(id),
                winner_id INTEGER REFERENCES fighters(id),
                weight_class TEXT,
                method TEXT,
                end_round INTEGER,
                end_time TEXT,
                scheduled_rounds INTEGER,
                referee TEXT,
                finish_details TEXT,
                is_title_fight INTEGER NOT NULL DEFAULT 0,
                {fighter1_stats},
                {fighter2_stats},
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS fight_round_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fight_id INTEGER NOT NULL REFERENCES fights(id),
                fighter_id INTEGER NOT NULL REFERENCES fighters(id),
                round_number INTEGER NOT NULL,
                {round_stats},
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(fight_id, fighter_id, round_number)
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_fights_pair
                ON fights(event_id, MIN(fighter1_id, fighter2_id), MAX(fighter1_id, fighter2_id));
            CREATE INDEX IF NOT EXISTS idx_events_date ON events(event_date);
            CREATE INDEX IF NOT EXISTS idx_round_stats_fight ON fight_round_stats(fight_id);
            "#,
            fighter1_stats = stat_defs("fighter1_"),
            fighter2_stats = stat_defs("fighter2_"),
            round_stats = stat_defs(""),
        ))?;
        Ok(())
    }

    // ==================== Write helpers ====================

    /// Run one INSERT in its own transaction and return the new row id
    fn insert(&self, sql: &str, values: Vec<Value>) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(sql, params_from_iter(values))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    /// Run one UPDATE in its own transaction and return the changed row count
    fn update(&self, sql: &str, values: Vec<Value>) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(sql, params_from_iter(values))?;
        tx.commit()?;
        Ok(changed)
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(event_date) FROM events", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(event_date) FROM events", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            event_count: count("events")?,
            fighter_count: count("fighters")?,
            fight_count: count("fights")?,
            round_stats_count: count("fight_round_stats")?,
            earliest_event: min_date.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
            latest_event: max_date.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub event_count: usize,
    pub fighter_count: usize,
    pub fight_count: usize,
    pub round_stats_count: usize,
    pub earliest_event: Option<NaiveDate>,
    pub latest_event: Option<NaiveDate>,
}

// ==================== SQL building ====================

fn stat_columns(prefix: &str) -> Vec<String> {
    STAT_COLUMNS
        .iter()
        .map(|(name, _)| format!("{prefix}{name}"))
        .collect()
}

fn fight_columns() -> Vec<String> {
    let mut columns: Vec<String> = FIGHT_FIELDS.iter().map(|c| c.to_string()).collect();
    columns.extend(stat_columns("fighter1_"));
    columns.extend(stat_columns("fighter2_"));
    columns
}

fn insert_sql(table: &str, columns: &[String]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// UPDATE overlaying non-null parameters onto `columns`, keyed by id in the
/// final parameter. Columns in `fill_only` keep any value already stored.
fn update_sql(table: &str, columns: &[String], fill_only: &[&str]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            if fill_only.contains(&col.as_str()) {
                format!("{col} = COALESCE({col}, ?{})", i + 1)
            } else {
                format!("{col} = COALESCE(?{}, {col})", i + 1)
            }
        })
        .collect();
    format!(
        "UPDATE {table} SET {}, updated_at = datetime('now') WHERE id = ?{}",
        assignments.join(", "),
        columns.len() + 1
    )
}

fn int(value: Option<u32>) -> Value {
    value.map_or(Value::Null, |v| Value::Integer(i64::from(v)))
}

fn real(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::Real)
}

fn text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

fn id(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn date(value: Option<NaiveDate>) -> Value {
    value.map_or(Value::Null, |d| Value::Text(d.format(DATE_FORMAT).to_string()))
}

fn stat_values(line: &StatLine) -> Vec<Value> {
    vec![
        int(line.knockdowns),
        int(line.sig_strikes_landed),
        int(line.sig_strikes_attempted),
        real(line.sig_strikes_pct),
        int(line.total_strikes_landed),
        int(line.total_strikes_attempted),
        int(line.takedowns_landed),
        int(line.takedowns_attempted),
        real(line.takedowns_pct),
        int(line.submission_attempts),
        int(line.reversals),
        int(line.control_time_seconds),
        int(line.head_landed),
        int(line.head_attempted),
        int(line.body_landed),
        int(line.body_attempted),
        int(line.leg_landed),
        int(line.leg_attempted),
        int(line.distance_landed),
        int(line.distance_attempted),
        int(line.clinch_landed),
        int(line.clinch_attempted),
        int(line.ground_landed),
        int(line.ground_attempted),
    ]
}

fn stat_line_at(row: &Row, start: usize) -> rusqlite::Result<StatLine> {
    Ok(StatLine {
        knockdowns: row.get(start)?,
        sig_strikes_landed: row.get(start + 1)?,
        sig_strikes_attempted: row.get(start + 2)?,
        sig_strikes_pct: row.get(start + 3)?,
        total_strikes_landed: row.get(start + 4)?,
        total_strikes_attempted: row.get(start + 5)?,
        takedowns_landed: row.get(start + 6)?,
        takedowns_attempted: row.get(start + 7)?,
        takedowns_pct: row.get(start + 8)?,
        submission_attempts: row.get(start + 9)?,
        reversals: row.get(start + 10)?,
        control_time_seconds: row.get(start + 11)?,
        head_landed: row.get(start + 12)?,
        head_attempted: row.get(start + 13)?,
        body_landed: row.get(start + 14)?,
        body_attempted: row.get(start + 15)?,
        leg_landed: row.get(start + 16)?,
        leg_attempted: row.get(start + 17)?,
        distance_landed: row.get(start + 18)?,
        distance_attempted: row.get(start + 19)?,
        clinch_landed: row.get(start + 20)?,
        clinch_attempted: row.get(start + 21)?,
        ground_landed: row.get(start + 22)?,
        ground_attempted: row.get(start + 23)?,
    })
}

fn parse_date_column(raw: &str, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ==================== Row mapping ====================

fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let date_str: String = row.get(2)?;
    Ok(Event {
        id: EventId(row.get(0)?),
        name: row.get(1)?,
        date: parse_date_column(&date_str, 2)?,
        location: row.get(3)?,
    })
}

const FIGHTER_SELECT: &str = "SELECT id, first_name, last_name, nickname, height, reach, weight, \
     stance, dob, age, wins, losses, draws, no_contests, win_streak, loss_streak, \
     slpm, str_acc, sapm, str_def, td_avg, td_acc, td_def, sub_avg FROM fighters";

fn row_to_fighter(row: &Row) -> rusqlite::Result<Fighter> {
    let dob: Option<String> = row.get(8)?;
    let dob = match dob {
        Some(raw) => Some(parse_date_column(&raw, 8)?),
        None => None,
    };
    Ok(Fighter {
        id: FighterId(row.get(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        nickname: row.get(3)?,
        height: row.get(4)?,
        reach: row.get(5)?,
        weight: row.get(6)?,
        stance: row.get(7)?,
        dob,
        age: row.get(9)?,
        wins: row.get(10)?,
        losses: row.get(11)?,
        draws: row.get(12)?,
        no_contests: row.get(13)?,
        win_streak: row.get(14)?,
        loss_streak: row.get(15)?,
        career: CareerRates {
            slpm: row.get(16)?,
            str_acc: row.get(17)?,
            sapm: row.get(18)?,
            str_def: row.get(19)?,
            td_avg: row.get(20)?,
            td_acc: row.get(21)?,
            td_def: row.get(22)?,
            sub_avg: row.get(23)?,
        },
    })
}

/// Values for `FIGHTER_FIELDS`; with `defaults`, counters missing from the
/// update are written as zero
fn fighter_values(update: &FighterUpdate, defaults: bool) -> Vec<Value> {
    let counter = |value: Option<u32>| match value {
        None if defaults => Value::Integer(0),
        other => int(other),
    };
    let record = update.record;
    vec![
        text(&update.nickname),
        int(update.height),
        real(update.reach),
        real(update.weight),
        text(&update.stance),
        date(update.dob),
        int(update.age),
        counter(record.map(|r| r.wins)),
        counter(record.map(|r| r.losses)),
        counter(record.map(|r| r.draws)),
        counter(record.map(|r| r.no_contests)),
        counter(update.win_streak),
        counter(update.loss_streak),
        real(update.career.slpm),
        real(update.career.str_acc),
        real(update.career.sapm),
        real(update.career.str_def),
        real(update.career.td_avg),
        real(update.career.td_acc),
        real(update.career.td_def),
        real(update.career.sub_avg),
    ]
}

fn fight_select() -> String {
    format!("SELECT id, event_id, {} FROM fights", fight_columns().join(", "))
}

fn row_to_fight(row: &Row) -> rusqlite::Result<Fight> {
    let stats_start = 2 + FIGHT_FIELDS.len();
    Ok(Fight {
        id: FightId(row.get(0)?),
        event_id: EventId(row.get(1)?),
        fighter1_id: row.get::<_, Option<i64>>(2)?.map(FighterId),
        fighter2_id: row.get::<_, Option<i64>>(3)?.map(FighterId),
        winner_id: row.get::<_, Option<i64>>(4)?.map(FighterId),
        weight_class: row.get(5)?,
        method: row.get(6)?,
        end_round: row.get(7)?,
        end_time: row.get(8)?,
        scheduled_rounds: row.get(9)?,
        referee: row.get(10)?,
        finish_details: row.get(11)?,
        is_title_fight: row.get(12)?,
        totals: [
            stat_line_at(row, stats_start)?,
            stat_line_at(row, stats_start + STAT_COLUMNS.len())?,
        ],
    })
}

/// Values for `fight_columns()`
fn fight_values(update: &FightUpdate) -> Vec<Value> {
    let mut values = vec![
        id(update.fighter1_id.map(|f| f.0)),
        id(update.fighter2_id.map(|f| f.0)),
        id(update.winner_id.map(|f| f.0)),
        text(&update.weight_class),
        text(&update.method),
        int(update.end_round),
        text(&update.end_time),
        int(update.scheduled_rounds),
        text(&update.referee),
        text(&update.finish_details),
        update
            .is_title_fight
            .map_or(Value::Null, |t| Value::Integer(i64::from(t))),
    ];
    values.extend(stat_values(&update.totals[0]));
    values.extend(stat_values(&update.totals[1]));
    values
}

fn round_stats_select() -> String {
    format!(
        "SELECT id, fight_id, fighter_id, round_number, {} FROM fight_round_stats",
        stat_columns("").join(", ")
    )
}

fn row_to_round_stats(row: &Row) -> rusqlite::Result<RoundStats> {
    Ok(RoundStats {
        id: RoundStatsId(row.get(0)?),
        fight_id: FightId(row.get(1)?),
        fighter_id: FighterId(row.get(2)?),
        round_number: row.get(3)?,
        stats: stat_line_at(row, 4)?,
    })
}

impl Store for Database {
    // ==================== Event Operations ====================

    fn find_event(&self, name: &str, date: NaiveDate) -> Result<Option<Event>> {
        let event = self
            .conn
            .query_row(
                "SELECT id, event_name, event_date, location FROM events
                 WHERE event_name = ?1 AND event_date = ?2",
                params![name, date.format(DATE_FORMAT).to_string()],
                row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    fn create_event(&self, name: &str, date: NaiveDate, update: &EventUpdate) -> Result<Event> {
        let id = self.insert(
            "INSERT INTO events (event_name, event_date, location) VALUES (?1, ?2, ?3)",
            vec![
                Value::Text(name.to_string()),
                Value::Text(date.format(DATE_FORMAT).to_string()),
                text(&update.location),
            ],
        )?;
        Ok(Event {
            id: EventId(id),
            name: name.to_string(),
            date,
            location: update.location.clone(),
        })
    }

    fn update_event(&self, id: EventId, update: &EventUpdate) -> Result<()> {
        self.update(
            "UPDATE events SET location = COALESCE(?1, location), updated_at = datetime('now')
             WHERE id = ?2",
            vec![text(&update.location), Value::Integer(id.0)],
        )?;
        Ok(())
    }

    // ==================== Fighter Operations ====================

    fn find_fighter(&self, first_name: &str, last_name: &str) -> Result<Option<Fighter>> {
        let fighter = self
            .conn
            .query_row(
                &format!("{FIGHTER_SELECT} WHERE first_name = ?1 AND last_name = ?2"),
                params![first_name, last_name],
                row_to_fighter,
            )
            .optional()?;
        Ok(fighter)
    }

    fn get_fighter(&self, id: FighterId) -> Result<Option<Fighter>> {
        let fighter = self
            .conn
            .query_row(
                &format!("{FIGHTER_SELECT} WHERE id = ?1"),
                params![id.0],
                row_to_fighter,
            )
            .optional()?;
        Ok(fighter)
    }

    fn create_fighter(
        &self,
        first_name: &str,
        last_name: &str,
        update: &FighterUpdate,
    ) -> Result<Fighter> {
        let mut columns = vec!["first_name".to_string(), "last_name".to_string()];
        columns.extend(FIGHTER_FIELDS.iter().map(|c| c.to_string()));
        let mut values = vec![
            Value::Text(first_name.to_string()),
            Value::Text(last_name.to_string()),
        ];
        values.extend(fighter_values(update, true));

        let id = FighterId(self.insert(&insert_sql("fighters", &columns), values)?);
        self.get_fighter(id)?
            .ok_or_else(|| FightStatsError::Parse(format!("{} vanished after insert", id)))
    }

    fn update_fighter(&self, id: FighterId, update: &FighterUpdate) -> Result<()> {
        let columns: Vec<String> = FIGHTER_FIELDS.iter().map(|c| c.to_string()).collect();
        let mut values = fighter_values(update, false);
        values.push(Value::Integer(id.0));
        self.update(&update_sql("fighters", &columns, &[]), values)?;
        Ok(())
    }

    // ==================== Fight Operations ====================

    fn find_fight(
        &self,
        event: EventId,
        a: Option<FighterId>,
        b: Option<FighterId>,
    ) -> Result<Option<Fight>> {
        let fight = self
            .conn
            .query_row(
                &format!(
                    "{} WHERE event_id = ?1
                     AND ((fighter1_id IS ?2 AND fighter2_id IS ?3)
                       OR (fighter1_id IS ?3 AND fighter2_id IS ?2))
                     ORDER BY id LIMIT 1",
                    fight_select()
                ),
                params![event.0, a.map(|f| f.0), b.map(|f| f.0)],
                row_to_fight,
            )
            .optional()?;
        Ok(fight)
    }

    fn get_fight(&self, id: FightId) -> Result<Option<Fight>> {
        let fight = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", fight_select()),
                params![id.0],
                row_to_fight,
            )
            .optional()?;
        Ok(fight)
    }

    fn create_fight(&self, event: EventId, update: &FightUpdate) -> Result<Fight> {
        let mut update = update.clone();
        update.scheduled_rounds = update.scheduled_rounds.or(Some(DEFAULT_SCHEDULED_ROUNDS));
        update.is_title_fight = update.is_title_fight.or(Some(false));

        let mut columns = vec!["event_id".to_string()];
        columns.extend(fight_columns());
        let mut values = vec![Value::Integer(event.0)];
        values.extend(fight_values(&update));

        let id = FightId(self.insert(&insert_sql("fights", &columns), values)?);
        self.get_fight(id)?.ok_or(FightStatsError::UnknownFight(id))
    }

    fn update_fight(&self, id: FightId, update: &FightUpdate) -> Result<()> {
        let mut values = fight_values(update);
        values.push(Value::Integer(id.0));
        let sql = update_sql("fights", &fight_columns(), &["fighter1_id", "fighter2_id"]);
        if self.update(&sql, values)? == 0 {
            return Err(FightStatsError::UnknownFight(id));
        }
        Ok(())
    }

    // ==================== Round Operations ====================

    fn find_round_stats(
        &self,
        fight: FightId,
        fighter: FighterId,
        round: u32,
    ) -> Result<Option<RoundStats>> {
        let stats = self
            .conn
            .query_row(
                &format!(
                    "{} WHERE fight_id = ?1 AND fighter_id = ?2 AND round_number = ?3",
                    round_stats_select()
                ),
                params![fight.0, fighter.0, round],
                row_to_round_stats,
            )
            .optional()?;
        Ok(stats)
    }

    fn create_round_stats(
        &self,
        fight: FightId,
        fighter: FighterId,
        round: u32,
        stats: &StatLine,
    ) -> Result<RoundStats> {
        let mut columns = vec![
            "fight_id".to_string(),
            "fighter_id".to_string(),
            "round_number".to_string(),
        ];
        columns.extend(stat_columns(""));
        let mut values = vec![
            Value::Integer(fight.0),
            Value::Integer(fighter.0),
            Value::Integer(i64::from(round)),
        ];
        values.extend(stat_values(stats));

        let id = self.insert(&insert_sql("fight_round_stats", &columns), values)?;
        Ok(RoundStats {
            id: RoundStatsId(id),
            fight_id: fight,
            fighter_id: fighter,
            round_number: round,
            stats: *stats,
        })
    }

    fn update_round_stats(&self, id: RoundStatsId, stats: &StatLine) -> Result<()> {
        let mut values = stat_values(stats);
        values.push(Value::Integer(id.0));
        self.update(&update_sql("fight_round_stats", &stat_columns(""), &[]), values)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn two_fighters(db: &Database) -> (Fighter, Fighter) {
        let a = db.create_fighter("Jon", "Jones", &FighterUpdate::default()).unwrap();
        let b = db
            .create_fighter("Daniel", "Cormier", &FighterUpdate::default())
            .unwrap();
        (a, b)
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.event_count, 0);
        assert_eq!(stats.fighter_count, 0);
        assert_eq!(stats.fight_count, 0);
        assert_eq!(stats.round_stats_count, 0);
        assert_eq!(stats.earliest_event, None);
    }

    #[test]
    fn test_event_find_and_update() {
        let db = Database::in_memory().unwrap();
        let event = db
            .create_event("UFC 182", date(2015, 1, 3), &EventUpdate::default())
            .unwrap();
        assert_eq!(event.location, None);

        db.update_event(
            event.id,
            &EventUpdate {
                location: Some("Las Vegas".to_string()),
            },
        )
        .unwrap();
        db.update_event(event.id, &EventUpdate::default()).unwrap();

        let found = db.find_event("UFC 182", date(2015, 1, 3)).unwrap().unwrap();
        assert_eq!(found.id, event.id);
        assert_eq!(found.location.as_deref(), Some("Las Vegas"));
        assert!(db.find_event("UFC 182", date(2015, 1, 4)).unwrap().is_none());

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.latest_event, Some(date(2015, 1, 3)));
    }

    #[test]
    fn test_fighter_name_keyed() {
        let db = Database::in_memory().unwrap();
        let jon = db.create_fighter("Jon", "Jones", &FighterUpdate::default()).unwrap();
        assert_eq!(jon.wins, 0);

        let found = db.find_fighter("Jon", "Jones").unwrap().unwrap();
        assert_eq!(found.id, jon.id);
        assert!(db.find_fighter("Jonathan", "Jones").unwrap().is_none());

        // a second row for the same name pair is rejected
        assert!(db.create_fighter("Jon", "Jones", &FighterUpdate::default()).is_err());
        let jonathan = db
            .create_fighter("Jonathan", "Jones", &FighterUpdate::default())
            .unwrap();
        assert_ne!(jonathan.id, jon.id);
        assert_eq!(db.get_stats().unwrap().fighter_count, 2);
    }

    #[test]
    fn test_fighter_update_never_clears() {
        let db = Database::in_memory().unwrap();
        let jon = db
            .create_fighter(
                "Jon",
                "Jones",
                &FighterUpdate {
                    height: Some(76),
                    stance: Some("Orthodox".to_string()),
                    dob: Some(date(1987, 7, 19)),
                    ..Default::default()
                },
            )
            .unwrap();

        db.update_fighter(
            jon.id,
            &FighterUpdate {
                reach: Some(84.5),
                record: Some(Record {
                    wins: 27,
                    losses: 1,
                    draws: 0,
                    no_contests: 1,
                }),
                ..Default::default()
            },
        )
        .unwrap();

        let stored = db.get_fighter(jon.id).unwrap().unwrap();
        assert_eq!(stored.height, Some(76));
        assert_eq!(stored.reach, Some(84.5));
        assert_eq!(stored.stance.as_deref(), Some("Orthodox"));
        assert_eq!(stored.dob, Some(date(1987, 7, 19)));
        assert_eq!(stored.wins, 27);
        assert_eq!(stored.no_contests, 1);
    }

    #[test]
    fn test_fight_identity_order_independent() {
        let db = Database::in_memory().unwrap();
        let event = db
            .create_event("UFC 182", date(2015, 1, 3), &EventUpdate::default())
            .unwrap();
        let (a, b) = two_fighters(&db);

        let fight = db
            .create_fight(
                event.id,
                &FightUpdate {
                    fighter1_id: Some(a.id),
                    fighter2_id: Some(b.id),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(fight.scheduled_rounds, Some(DEFAULT_SCHEDULED_ROUNDS));
        assert!(!fight.is_title_fight);

        let reversed = db.find_fight(event.id, Some(b.id), Some(a.id)).unwrap().unwrap();
        assert_eq!(reversed.id, fight.id);

        db.update_fight(
            reversed.id,
            &FightUpdate {
                method: Some("Decision - Unanimous".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        // the same pair in reverse cannot be inserted twice
        assert!(db
            .create_fight(
                event.id,
                &FightUpdate {
                    fighter1_id: Some(b.id),
                    fighter2_id: Some(a.id),
                    ..Default::default()
                },
            )
            .is_err());

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.fight_count, 1);
        let stored = db.get_fight(fight.id).unwrap().unwrap();
        assert_eq!(stored.method.as_deref(), Some("Decision - Unanimous"));
    }

    #[test]
    fn test_fight_slots_only_filled() {
        let db = Database::in_memory().unwrap();
        let event = db
            .create_event("UFC 182", date(2015, 1, 3), &EventUpdate::default())
            .unwrap();
        let (a, b) = two_fighters(&db);
        let fight = db
            .create_fight(
                event.id,
                &FightUpdate {
                    fighter1_id: Some(a.id),
                    ..Default::default()
                },
            )
            .unwrap();

        let mut totals = [StatLine::default(); 2];
        totals[1].knockdowns = Some(2);
        db.update_fight(
            fight.id,
            &FightUpdate {
                fighter1_id: Some(b.id),
                fighter2_id: Some(b.id),
                winner_id: Some(a.id),
                is_title_fight: Some(true),
                totals,
                ..Default::default()
            },
        )
        .unwrap();

        let stored = db.get_fight(fight.id).unwrap().unwrap();
        assert_eq!(stored.fighter1_id, Some(a.id));
        assert_eq!(stored.fighter2_id, Some(b.id));
        assert_eq!(stored.winner_id, Some(a.id));
        assert!(stored.is_title_fight);
        assert_eq!(stored.totals[1].knockdowns, Some(2));
        assert_eq!(stored.totals[0].knockdowns, None);

        assert!(matches!(
            db.update_fight(FightId(999), &FightUpdate::default()),
            Err(FightStatsError::UnknownFight(FightId(999)))
        ));
    }

    #[test]
    fn test_round_stats_upsert() {
        let db = Database::in_memory().unwrap();
        let event = db
            .create_event("UFC 182", date(2015, 1, 3), &EventUpdate::default())
            .unwrap();
        let (a, b) = two_fighters(&db);
        let fight = db
            .create_fight(
                event.id,
                &FightUpdate {
                    fighter1_id: Some(a.id),
                    fighter2_id: Some(b.id),
                    ..Default::default()
                },
            )
            .unwrap();

        let line = StatLine {
            knockdowns: Some(1),
            sig_strikes_pct: Some(0.5),
            ..Default::default()
        };
        let created = db.create_round_stats(fight.id, a.id, 1, &line).unwrap();
        assert!(db.create_round_stats(fight.id, a.id, 1, &line).is_err());

        let more = StatLine {
            head_landed: Some(4),
            ..Default::default()
        };
        db.update_round_stats(created.id, &more).unwrap();

        let stored = db.find_round_stats(fight.id, a.id, 1).unwrap().unwrap();
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.stats.knockdowns, Some(1));
        assert_eq!(stored.stats.sig_strikes_pct, Some(0.5));
        assert_eq!(stored.stats.head_landed, Some(4));
        assert!(db.find_round_stats(fight.id, b.id, 1).unwrap().is_none());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fightstats.db");
        {
            let db = Database::open(&path).unwrap();
            db.create_fighter("Israel", "", &FighterUpdate::default()).unwrap();
        }
        let db = Database::open(&path).unwrap();
        let found = db.find_fighter("Israel", "").unwrap().unwrap();
        assert_eq!(found.full_name(), "Israel");
    }
}
