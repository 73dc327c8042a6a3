//! Fight detail page extraction
//!
//! Statistics are returned in the row order of the page's tables. The
//! fighter names from the totals table (`table_order`) tell the caller which
//! row belongs to which slot of the stored fight.

use super::columns::{apply_row, normalize_label, Column, TableKind};
use super::rounds::{column_headers, reconcile, round_nodes, row_cells, RoundLedger};
use super::stat_text::PercentRules;
use super::{first_match, non_empty_text, parent_element, text_of, Page, Strategy};
use crate::{FightStatsError, PageKind, Result, StatLine};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::collections::HashMap;

static SCHEDULED_ROUNDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+Rnd").unwrap());

const DETAIL_LABELS: &[&str] = &[
    "Method:",
    "Round:",
    "Time format:",
    "Time:",
    "Referee:",
    "Details:",
];

const TOTALS_INDICATORS: &[&str] = &["total str.", "kd", "sub. att", "rev.", "ctrl"];

/// Labelled fight details keyed by label without the colon
type Details = HashMap<String, String>;

/// Everything read from a fight detail page
#[derive(Debug, Clone, PartialEq)]
pub struct FightDetailPage {
    /// Fighter names in the order the page introduces them
    pub fighters: [String; 2],
    /// Name of the fighter marked as the winner
    pub winner: Option<String>,
    pub method: Option<String>,
    pub end_round: Option<u32>,
    pub end_time: Option<String>,
    pub scheduled_rounds: Option<u32>,
    pub referee: Option<String>,
    pub finish_details: Option<String>,
    pub is_title_fight: bool,
    /// Fighter names in the statistics tables' row order
    pub table_order: Option<[String; 2]>,
    /// Whole-fight statistics in table row order
    pub totals: [StatLine; 2],
    /// Per-round statistics in table row order
    pub rounds: RoundLedger,
}

const DETAIL_STRATEGIES: &[Strategy<Page, Details>] = &[
    ("label parents", details_from_label_parents),
    ("content text scan", details_from_text),
];

const TOTALS_STRATEGIES: &[Strategy<Page, usize>] = &[
    ("totals heading", totals_by_heading),
    ("totals header labels", totals_by_headers),
];

const STRIKES_STRATEGIES: &[Strategy<Page, usize>] = &[
    ("significant strikes heading", strikes_by_heading),
    ("significant strikes header labels", strikes_by_headers),
];

/// Parse a fight detail page
pub fn extract(page: &Page, rules: &PercentRules) -> Result<FightDetailPage> {
    let person_selector = Selector::parse("a.b-fight-details__person-link").unwrap();
    let names: Vec<String> = page
        .document
        .select(&person_selector)
        .filter_map(non_empty_text)
        .collect();
    let fighters = match names.as_slice() {
        [first, second, ..] => [first.clone(), second.clone()],
        _ => {
            return Err(FightStatsError::extract(
                PageKind::FightDetail,
                format!("found {} fighter links, expected 2", names.len()),
            ))
        }
    };

    let details = first_match(page, "fight details", DETAIL_STRATEGIES).unwrap_or_default();
    let detail = |label: &str| details.get(label).cloned().filter(|v| !v.is_empty());

    let mut totals = [StatLine::default(); 2];
    let mut table_order = None;

    if let Some(table) = first_match(page, "totals table", TOTALS_STRATEGIES).and_then(|i| nth_table(page, i)) {
        table_order = row_names(table);
        read_stats_table(table, &mut totals, TableKind::General, rules);
    } else {
        log::warn!("No totals table on {}", page.url);
    }

    if let Some(table) = first_match(page, "strikes table", STRIKES_STRATEGIES).and_then(|i| nth_table(page, i)) {
        let mut lines = [StatLine::default(); 2];
        read_stats_table(table, &mut lines, TableKind::Strikes, rules);
        if !same_order(table_order.as_ref(), row_names(table).as_ref()) {
            lines.swap(0, 1);
        }
        merge_strikes(&mut totals, &lines);
    } else {
        log::debug!("No significant strikes table on {}", page.url);
    }

    Ok(FightDetailPage {
        fighters,
        winner: winner(page),
        method: detail("Method"),
        end_round: detail("Round").and_then(|r| r.parse().ok()),
        end_time: detail("Time"),
        scheduled_rounds: detail("Time format").and_then(|f| {
            SCHEDULED_ROUNDS
                .captures(&f)
                .and_then(|caps| caps[1].parse().ok())
        }),
        referee: detail("Referee"),
        finish_details: detail("Details"),
        is_title_fight: is_title_fight(page),
        table_order,
        totals,
        rounds: round_ledger(page, rules),
    })
}

/// True unless both tables name their rows and the names disagree
fn same_order(reference: Option<&[String; 2]>, other: Option<&[String; 2]>) -> bool {
    match (reference, other) {
        (Some(reference), Some(other)) => !(reference[0] == other[1] && reference[1] == other[0]),
        _ => true,
    }
}

fn merge_strikes(totals: &mut [StatLine; 2], strikes: &[StatLine; 2]) {
    for (total, line) in totals.iter_mut().zip(strikes.iter()) {
        // counts already read from the totals table win
        total.fill_missing(line);
    }
}

fn winner(page: &Page) -> Option<String> {
    let person_selector = Selector::parse("div.b-fight-details__person").unwrap();
    let green_selector = Selector::parse("i.b-fight-details__person-status_style_green").unwrap();
    let link_selector = Selector::parse("a.b-fight-details__person-link").unwrap();

    page.document
        .select(&person_selector)
        .find(|person| person.select(&green_selector).next().is_some())
        .and_then(|person| person.select(&link_selector).next())
        .and_then(non_empty_text)
}

fn is_title_fight(page: &Page) -> bool {
    let selector = Selector::parse("i.b-fight-details__fight-title").unwrap();
    page.document
        .select(&selector)
        .next()
        .map(|title| text_of(title).to_lowercase().contains("title"))
        .unwrap_or(false)
}

fn details_from_label_parents(page: &Page) -> Option<Details> {
    let selector = Selector::parse("div.b-fight-details__content i.b-fight-details__label").unwrap();

    let details: Details = page
        .document
        .select(&selector)
        .filter_map(|label| {
            let parent = parent_element(label)?;
            let label_text = text_of(label);
            let value = text_of(parent).replacen(&label_text, "", 1).trim().to_string();
            Some((label_text.trim_end_matches(':').trim().to_string(), value))
        })
        .collect();
    if details.is_empty() {
        None
    } else {
        Some(details)
    }
}

fn details_from_text(page: &Page) -> Option<Details> {
    let content_selector = Selector::parse("div.b-fight-details__content").unwrap();
    let text = page
        .document
        .select(&content_selector)
        .next()
        .map(text_of)
        .unwrap_or_else(|| text_of(page.document.root_element()));

    let mut found: Vec<(usize, &str)> = Vec::new();
    for &label in DETAIL_LABELS {
        if let Some(pos) = text.find(label) {
            found.push((pos, label));
        }
    }
    if found.is_empty() {
        return None;
    }
    found.sort();

    let details = found
        .iter()
        .enumerate()
        .map(|(i, (pos, label))| {
            let start = pos + label.len();
            let end = found.get(i + 1).map(|(next, _)| *next).unwrap_or(text.len());
            let value = text[start..end].trim().to_string();
            (label.trim_end_matches(':').to_string(), value)
        })
        .collect();
    Some(details)
}

fn nth_table(page: &Page, index: usize) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("table").unwrap();
    page.document.select(&selector).nth(index)
}

fn table_index(page: &Page, table: ElementRef) -> Option<usize> {
    let selector = Selector::parse("table").unwrap();
    page.document
        .select(&selector)
        .position(|candidate| candidate.id() == table.id())
}

fn enclosing_section(element: ElementRef) -> Option<ElementRef> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "section")
}

fn next_sibling_named<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == name)
}

fn totals_by_heading(page: &Page) -> Option<usize> {
    let heading = Selector::parse("section.b-fight-details__section p.b-fight-details__collapse-link_tot").unwrap();
    let table_selector = Selector::parse("table").unwrap();

    let heading = page.document.select(&heading).next()?;
    let section = enclosing_section(heading)?;
    let next = next_sibling_named(section, "section")?;
    let table = next.select(&table_selector).next()?;
    table_index(page, table)
}

fn strikes_by_heading(page: &Page) -> Option<usize> {
    let heading = Selector::parse(
        r#"section.b-fight-details__section p.b-fight-details__collapse-link_tot[style*="margin-bottom: 0px"]"#,
    )
    .unwrap();

    let heading = page.document.select(&heading).next()?;
    let section = enclosing_section(heading)?;
    let table = next_sibling_named(section, "table")?;
    table_index(page, table)
}

/// Normalised header labels of every table that is not a per-round table
fn summary_tables(page: &Page) -> Vec<(usize, Vec<String>)> {
    let table_selector = Selector::parse("table").unwrap();
    let th_selector = Selector::parse("thead th").unwrap();

    page.document
        .select(&table_selector)
        .enumerate()
        .filter_map(|(i, table)| {
            let headers: Vec<String> = table
                .select(&th_selector)
                .map(|th| normalize_label(&text_of(th)))
                .collect();
            if headers.is_empty() || headers.iter().any(|h| h.contains("round")) {
                return None;
            }
            Some((i, headers))
        })
        .collect()
}

fn totals_by_headers(page: &Page) -> Option<usize> {
    summary_tables(page).into_iter().find_map(|(i, headers)| {
        let matches = TOTALS_INDICATORS
            .iter()
            .filter(|indicator| headers.iter().any(|h| h.contains(*indicator)))
            .count();
        (matches >= 3).then_some(i)
    })
}

fn strikes_by_headers(page: &Page) -> Option<usize> {
    summary_tables(page).into_iter().find_map(|(i, headers)| {
        let has = |label: &str| headers.iter().any(|h| h == label);
        (has("head") && has("body") && has("leg")).then_some(i)
    })
}

/// Fighter names in the first data row of a table
fn row_names(table: ElementRef) -> Option<[String; 2]> {
    let row_selector = Selector::parse("tbody tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();
    let link_selector = Selector::parse("p a").unwrap();

    let row = table
        .select(&row_selector)
        .find(|row| row.select(&cell_selector).next().is_some())?;
    let cell = row.select(&cell_selector).next()?;
    let names: Vec<String> = cell.select(&link_selector).filter_map(non_empty_text).collect();
    match names.as_slice() {
        [first, second, ..] => Some([first.clone(), second.clone()]),
        _ => row_cells(row).into_iter().next().flatten(),
    }
}

fn read_stats_table(table: ElementRef, lines: &mut [StatLine; 2], kind: TableKind, rules: &PercentRules) {
    let row_selector = Selector::parse("tbody tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let Some(row) = table
        .select(&row_selector)
        .find(|row| row.select(&cell_selector).next().is_some())
    else {
        return;
    };
    let layout = Column::layout(&column_headers(table), kind);
    apply_row(lines, &row_cells(row), &layout, kind, rules);
}

fn round_ledger(page: &Page, rules: &PercentRules) -> RoundLedger {
    let section_selector = Selector::parse("section.b-fight-details__section").unwrap();
    let link_selector = Selector::parse("a.b-fight-details__collapse-link_rnd").unwrap();
    let styled_table = Selector::parse("table.b-fight-details__table").unwrap();
    let any_table = Selector::parse("table").unwrap();

    let tables: Vec<ElementRef> = page
        .document
        .select(&section_selector)
        .filter(|section| section.select(&link_selector).next().is_some())
        .filter_map(|section| {
            section
                .select(&styled_table)
                .next()
                .or_else(|| section.select(&any_table).next())
        })
        .collect();

    let mut ledger = RoundLedger::new();
    if let Some(general) = tables.first() {
        let layout = Column::layout(&column_headers(*general), TableKind::General);
        for row in reconcile(round_nodes(*general)) {
            ledger.record_general(&row, &layout, rules);
        }
    }
    if let Some(strikes) = tables.get(1) {
        let layout = Column::layout(&column_headers(*strikes), TableKind::Strikes);
        for row in reconcile(round_nodes(*strikes)) {
            ledger.enrich_strikes(&row, &layout, rules);
        }
    }
    ledger
}
