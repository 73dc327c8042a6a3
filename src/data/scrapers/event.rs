//! Event page extraction

use super::{first_match, non_empty_text, text_of, Page, PageLink, Strategy};
use crate::{FightStatsError, PageKind, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

static DATE_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}",
    )
    .unwrap()
});

const DATE_FORMAT: &str = "%B %d, %Y";

/// Everything read from an event page
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    pub name: String,
    pub date: NaiveDate,
    pub location: Option<String>,
    pub fights: Vec<FightRow>,
}

/// One bout listed on an event card
#[derive(Debug, Clone, PartialEq)]
pub struct FightRow {
    pub detail_url: String,
    pub fighters: [PageLink; 2],
    pub weight_class: Option<String>,
    pub method: Option<String>,
    pub end_round: Option<u32>,
    pub end_time: Option<String>,
    pub scheduled_rounds: Option<u32>,
}

const NAME_STRATEGIES: &[Strategy<Page, String>] = &[
    ("title highlight", name_from_highlight),
    ("title heading", name_from_heading),
];

const DATE_STRATEGIES: &[Strategy<Page, NaiveDate>] = &[
    ("date list item", date_from_list),
    ("date in page text", date_from_text),
];

const ROW_STRATEGIES: &[Strategy<Page, Vec<FightRow>>] = &[
    ("linked rows", rows_with_data_link),
    ("table body rows", rows_in_table_body),
];

/// Parse an event page
///
/// Fails when the event name or date cannot be found. A missing fight table
/// yields an event with no fights.
pub fn extract(page: &Page) -> Result<EventPage> {
    let name = first_match(page, "event name", NAME_STRATEGIES)
        .ok_or_else(|| FightStatsError::extract(PageKind::Event, "no event name"))?;
    let date = first_match(page, "event date", DATE_STRATEGIES)
        .ok_or_else(|| FightStatsError::extract(PageKind::Event, "no event date"))?;
    let location = labelled_item(page, "Location:");
    if location.is_none() {
        log::warn!("No location on event page {}", page.url);
    }
    let fights = first_match(page, "fight rows", ROW_STRATEGIES).unwrap_or_default();

    Ok(EventPage {
        name,
        date,
        location,
        fights,
    })
}

fn name_from_highlight(page: &Page) -> Option<String> {
    let selector = Selector::parse("h2.b-content__title span.b-content__title-highlight").unwrap();
    page.document.select(&selector).next().and_then(non_empty_text)
}

fn name_from_heading(page: &Page) -> Option<String> {
    let selector = Selector::parse("h2.b-content__title").unwrap();
    page.document.select(&selector).next().and_then(non_empty_text)
}

/// Value of the first detail list item starting with `label`
fn labelled_item(page: &Page, label: &str) -> Option<String> {
    let selector = Selector::parse("ul.b-list__box-list li.b-list__box-list-item").unwrap();
    page.document
        .select(&selector)
        .map(text_of)
        .find(|text| text.starts_with(label))
        .map(|text| text[label.len()..].trim().to_string())
        .filter(|value| !value.is_empty())
}

fn date_from_list(page: &Page) -> Option<NaiveDate> {
    let text = labelled_item(page, "Date:")?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).ok()
}

fn date_from_text(page: &Page) -> Option<NaiveDate> {
    let text = text_of(page.document.root_element());
    let found = DATE_IN_TEXT.find(&text)?;
    NaiveDate::parse_from_str(found.as_str(), DATE_FORMAT).ok()
}

fn rows_with_data_link(page: &Page) -> Option<Vec<FightRow>> {
    let selector = Selector::parse("tr.b-fight-details__table-row[data-link]").unwrap();
    collect_rows(page, page.document.select(&selector))
}

fn rows_in_table_body(page: &Page) -> Option<Vec<FightRow>> {
    let selector = Selector::parse("tbody.b-fight-details__table-body tr").unwrap();
    let cell_selector = Selector::parse("td.b-fight-details__table-col").unwrap();
    let rows = page
        .document
        .select(&selector)
        .filter(|row| row.select(&cell_selector).next().is_some());
    collect_rows(page, rows)
}

fn collect_rows<'a>(page: &Page, rows: impl Iterator<Item = ElementRef<'a>>) -> Option<Vec<FightRow>> {
    let mut seen_any = false;
    let mut fights = Vec::new();
    for (i, row) in rows.enumerate() {
        seen_any = true;
        match parse_row(page, row) {
            Some(fight) => fights.push(fight),
            None => log::debug!("Skipping fight row {} on {}", i + 1, page.url),
        }
    }
    if seen_any {
        Some(fights)
    } else {
        None
    }
}

fn parse_row(page: &Page, row: ElementRef) -> Option<FightRow> {
    let cell_selector = Selector::parse("td").unwrap();
    let link_selector = Selector::parse("p a").unwrap();
    let detail_selector = Selector::parse(r#"a[href*="fight-details"]"#).unwrap();

    let detail_href = row.value().attr("data-link").map(str::to_string).or_else(|| {
        row.select(&detail_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string)
    })?;
    let detail_url = page.resolve(&detail_href)?;

    let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
    let fighter_cell = cells.get(1)?;
    let links: Vec<PageLink> = fighter_cell
        .select(&link_selector)
        .filter_map(|a| page.link(a))
        .collect();
    let [first, second, ..] = links.as_slice() else {
        return None;
    };

    let column = |idx: usize| cells.get(idx).copied().and_then(non_empty_text);

    Some(FightRow {
        detail_url,
        fighters: [first.clone(), second.clone()],
        weight_class: column(6),
        method: column(7),
        end_round: column(8).and_then(|text| text.parse().ok()),
        end_time: column(9),
        scheduled_rounds: column(11).and_then(|text| text.parse().ok()),
    })
}
