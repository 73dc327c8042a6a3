//! Fighter profile extraction

use super::stat_text::PercentRules;
use super::units::{self, BoutOutcome};
use super::{first_match, non_empty_text, parent_element, text_of, Page, PageLink, Strategy};
use crate::{CareerRates, FightStatsError, FighterUpdate, PageKind, Record, Result};
use chrono::NaiveDate;
use scraper::{ElementRef, Selector};
use std::collections::HashMap;

const BASIC_LABELS: &[&str] = &["HEIGHT", "WEIGHT", "REACH", "STANCE", "DOB"];

const LABEL_SELECTORS: &[&str] = &[
    "i.b-list__box-item-title",
    ".b-list__box-item-title",
    "i.b-list__box-item-title_type_width",
];

/// Physical attributes keyed by upper-case label
type BasicStats = HashMap<String, String>;

/// Everything read from a fighter profile
#[derive(Debug, Clone, PartialEq)]
pub struct FighterPage {
    pub name: String,
    pub nickname: Option<String>,
    pub height: Option<u32>,
    pub weight: Option<f64>,
    pub reach: Option<f64>,
    pub stance: Option<String>,
    pub dob: Option<NaiveDate>,
    pub record: Option<Record>,
    pub career: CareerRates,
    pub history: Vec<HistoryRow>,
}

/// One row of the fight history table, most recent first
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub outcome: Option<BoutOutcome>,
    pub fighters: Vec<PageLink>,
    pub event: Option<PageLink>,
}

impl FighterPage {
    /// Fields to store, with age and streaks computed as of `today`
    pub fn to_update(&self, today: NaiveDate) -> FighterUpdate {
        let outcomes: Vec<BoutOutcome> = self.history.iter().filter_map(|row| row.outcome).collect();
        let (win_streak, loss_streak) = units::current_streaks(&outcomes);
        let has_results = outcomes.iter().any(|o| *o != BoutOutcome::Upcoming);

        FighterUpdate {
            nickname: self.nickname.clone(),
            height: self.height,
            reach: self.reach,
            weight: self.weight,
            stance: self.stance.clone(),
            dob: self.dob,
            age: self.dob.and_then(|dob| units::age_on(dob, today)),
            record: self.record,
            win_streak: has_results.then_some(win_streak),
            loss_streak: has_results.then_some(loss_streak),
            career: self.career,
        }
    }

    /// Every fighter and event link in the history table
    pub fn linked_urls(&self) -> impl Iterator<Item = &str> {
        self.history
            .iter()
            .flat_map(|row| row.fighters.iter().chain(row.event.iter()))
            .filter_map(|link| link.url.as_deref())
    }
}

const BASIC_STRATEGIES: &[Strategy<Page, BasicStats>] = &[
    ("info box", basic_from_info_box),
    ("labelled list items", basic_from_any_item),
];

/// Parse a fighter profile
pub fn extract(page: &Page, rules: &PercentRules) -> Result<FighterPage> {
    let name_selector = Selector::parse("span.b-content__title-highlight").unwrap();
    let name = page
        .document
        .select(&name_selector)
        .next()
        .and_then(non_empty_text)
        .ok_or_else(|| FightStatsError::extract(PageKind::Fighter, "no fighter name"))?;

    let nickname_selector = Selector::parse("p.b-content__Nickname").unwrap();
    let nickname = page
        .document
        .select(&nickname_selector)
        .next()
        .map(|p| text_of(p).trim_matches(|c| c == '"' || c == ' ').to_string())
        .filter(|nick| !nick.is_empty());

    let basic = first_match(page, "basic stats", BASIC_STRATEGIES).unwrap_or_default();
    let value = |key: &str| basic.get(key).map(String::as_str).filter(|v| !is_placeholder(v));

    let record_selector = Selector::parse("span.b-content__title-record").unwrap();
    let record = page
        .document
        .select(&record_selector)
        .next()
        .and_then(|span| units::parse_record(&text_of(span)));

    Ok(FighterPage {
        name,
        nickname,
        height: value("HEIGHT").and_then(units::parse_height),
        weight: value("WEIGHT").and_then(units::parse_weight),
        reach: value("REACH").and_then(units::parse_reach),
        stance: value("STANCE").map(str::to_string),
        dob: value("DOB").and_then(units::parse_dob),
        record,
        career: career_rates(page, rules),
        history: history(page),
    })
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || value.chars().all(|c| matches!(c, '-' | '\u{2014}' | '\u{2013}'))
}

/// Label element and the remaining text of a list item
fn split_item(item: ElementRef, label_selectors: &[&str]) -> Option<(String, String)> {
    let label = label_selectors.iter().find_map(|selector| {
        let selector = Selector::parse(selector).ok()?;
        item.select(&selector).next()
    })?;
    Some(label_and_value(item, label))
}

fn label_and_value(item: ElementRef, label: ElementRef) -> (String, String) {
    let label_text = text_of(label);
    let item_text = text_of(item);
    let value = item_text.replacen(&label_text, "", 1).trim().to_string();
    (label_text.trim_end_matches(':').trim().to_string(), value)
}

fn basic_from_info_box(page: &Page) -> Option<BasicStats> {
    let box_selector = Selector::parse("div.b-list__info-box_style_small-width").unwrap();
    let item_selector = Selector::parse("li.b-list__box-list-item").unwrap();
    let any_item = Selector::parse("li").unwrap();

    let container = page.document.select(&box_selector).next()?;
    let mut items: Vec<ElementRef> = container.select(&item_selector).collect();
    if items.is_empty() {
        items = container.select(&any_item).collect();
    }

    let stats: BasicStats = items
        .into_iter()
        .filter_map(|item| split_item(item, LABEL_SELECTORS))
        .map(|(label, value)| (label.to_uppercase(), value))
        .filter(|(label, _)| BASIC_LABELS.contains(&label.as_str()))
        .collect();
    if stats.is_empty() {
        None
    } else {
        Some(stats)
    }
}

fn basic_from_any_item(page: &Page) -> Option<BasicStats> {
    let item_selector = Selector::parse("li.b-list__box-list-item").unwrap();

    let stats: BasicStats = page
        .document
        .select(&item_selector)
        .filter_map(|item| split_item(item, &[".b-list__box-item-title"]))
        .map(|(label, value)| (label.to_uppercase(), value))
        .filter(|(label, _)| BASIC_LABELS.contains(&label.as_str()))
        .collect();
    if stats.is_empty() {
        None
    } else {
        Some(stats)
    }
}

/// Slot in `CareerRates` for a career statistic label
fn career_slot<'a>(career: &'a mut CareerRates, label: &str) -> Option<&'a mut Option<f64>> {
    let slot = match label {
        "SLpM" => &mut career.slpm,
        "Str. Acc." => &mut career.str_acc,
        "SApM" => &mut career.sapm,
        "Str. Def" | "Str. Def." => &mut career.str_def,
        "TD Avg." => &mut career.td_avg,
        "TD Acc." => &mut career.td_acc,
        "TD Def." => &mut career.td_def,
        "Sub. Avg." => &mut career.sub_avg,
        _ => return None,
    };
    Some(slot)
}

fn parse_rate(label: &str, value: &str, rules: &PercentRules) -> Option<f64> {
    match value.strip_suffix('%') {
        Some(pct) => {
            let pct: f64 = pct.trim().parse().ok()?;
            rules.career_rates.to_ratio(label, pct)
        }
        None => value.parse().ok(),
    }
}

fn career_rates(page: &Page, rules: &PercentRules) -> CareerRates {
    let lowercase_labels = Selector::parse("i.b-list__box-item-title_font_lowercase").unwrap();
    let item_selector = Selector::parse("li.b-list__box-list-item").unwrap();
    let label_selector = Selector::parse("i.b-list__box-item-title").unwrap();

    let mut career = CareerRates::default();

    for label in page.document.select(&lowercase_labels) {
        let Some(item) = label
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "li")
            .or_else(|| parent_element(label))
        else {
            continue;
        };
        let (name, value) = label_and_value(item, label);
        if let Some(slot) = career_slot(&mut career, &name) {
            if let Some(rate) = parse_rate(&name, &value, rules) {
                *slot = Some(rate);
            }
        }
    }

    // fill whatever the lowercase labels did not cover
    for item in page.document.select(&item_selector) {
        let Some(label) = item.select(&label_selector).next() else {
            continue;
        };
        let (name, value) = label_and_value(item, label);
        if let Some(slot) = career_slot(&mut career, &name) {
            if slot.is_none() {
                *slot = parse_rate(&name, &value, rules);
            }
        }
    }

    career
}

fn history(page: &Page) -> Vec<HistoryRow> {
    let row_selector = Selector::parse("tbody.b-fight-details__table-body tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();
    let link_selector = Selector::parse("a").unwrap();

    page.document
        .select(&row_selector)
        .filter_map(|row| {
            let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
            if cells.is_empty() {
                return None;
            }
            let outcome = cells
                .first()
                .and_then(|cell| BoutOutcome::from_flag(&text_of(*cell)));
            let fighters = cells
                .get(1)
                .map(|cell| cell.select(&link_selector).filter_map(|a| page.link(a)).collect())
                .unwrap_or_default();
            let event = cells
                .get(6)
                .and_then(|cell| cell.select(&link_selector).next())
                .and_then(|a| page.link(a));
            Some(HistoryRow {
                outcome,
                fighters,
                event,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://ufcstats.com/fighter-details/jj";

    fn profile_html() -> &'static str {
        r#"<html><body>
        <h2 class="b-content__title">
          <span class="b-content__title-highlight"> Jon Jones </span>
          <span class="b-content__title-record">Record: 27-1-0 (1 NC)</span>
        </h2>
        <p class="b-content__Nickname"> "Bones" </p>
        <div class="b-list__info-box b-list__info-box_style_small-width">
          <ul class="b-list__box-list">
            <li class="b-list__box-list-item"><i class="b-list__box-item-title">Height:</i> 6' 4" </li>
            <li class="b-list__box-list-item"><i class="b-list__box-item-title">Weight:</i> 248 lbs. </li>
            <li class="b-list__box-list-item"><i class="b-list__box-item-title">Reach:</i> 84.5" </li>
            <li class="b-list__box-list-item"><i class="b-list__box-item-title">STANCE:</i> Orthodox </li>
            <li class="b-list__box-list-item"><i class="b-list__box-item-title">DOB:</i> Jul 19, 1987 </li>
          </ul>
        </div>
        <div class="b-list__info-box-left">
          <ul>
            <li class="b-list__box-list-item"><i class="b-list__box-item-title b-list__box-item-title_font_lowercase">SLpM:</i> 4.29 </li>
            <li class="b-list__box-list-item"><i class="b-list__box-item-title b-list__box-item-title_font_lowercase">Str. Acc.:</i> 57% </li>
            <li class="b-list__box-list-item"><i class="b-list__box-item-title">TD Def.:</i> 95% </li>
          </ul>
        </div>
        <table><tbody class="b-fight-details__table-body">
          <tr class="b-fight-details__table-row"></tr>
          <tr class="b-fight-details__table-row">
            <td><p><i>next</i></p></td>
            <td><p><a href="/fighter-details/jj">Jon Jones</a></p><p><a href="/fighter-details/ta">Tom Aspinall</a></p></td>
            <td></td><td></td><td></td><td></td>
            <td><p><a href="/event-details/e3">UFC 310</a></p></td>
          </tr>
          <tr class="b-fight-details__table-row">
            <td><p><i>win</i></p></td>
            <td><p><a href="/fighter-details/jj">Jon Jones</a></p><p><a href="/fighter-details/sm">Stipe Miocic</a></p></td>
            <td></td><td></td><td></td><td></td>
            <td><p><a href="/event-details/e2">UFC 309</a></p></td>
          </tr>
          <tr class="b-fight-details__table-row">
            <td><p><i>win</i></p></td>
            <td><p><a href="/fighter-details/jj">Jon Jones</a></p><p><a href="/fighter-details/cg">Ciryl Gane</a></p></td>
            <td></td><td></td><td></td><td></td>
            <td><p><a href="/event-details/e1">UFC 285</a></p></td>
          </tr>
        </tbody></table>
        </body></html>"#
    }

    #[test]
    fn test_extract_profile() {
        let page = Page::parse(profile_html(), URL);
        let fighter = extract(&page, &PercentRules::default()).unwrap();

        assert_eq!(fighter.name, "Jon Jones");
        assert_eq!(fighter.nickname.as_deref(), Some("Bones"));
        assert_eq!(fighter.height, Some(76));
        assert_eq!(fighter.weight, Some(248.0));
        assert_eq!(fighter.reach, Some(84.5));
        assert_eq!(fighter.stance.as_deref(), Some("Orthodox"));
        assert_eq!(fighter.dob, NaiveDate::from_ymd_opt(1987, 7, 19));

        let record = fighter.record.unwrap();
        assert_eq!((record.wins, record.losses, record.no_contests), (27, 1, 1));

        assert_eq!(fighter.career.slpm, Some(4.29));
        assert_eq!(fighter.career.str_acc, Some(0.57));
        assert_eq!(fighter.career.td_def, Some(0.95));
        assert_eq!(fighter.career.sapm, None);
    }

    #[test]
    fn test_history_links_and_streaks() {
        let page = Page::parse(profile_html(), URL);
        let fighter = extract(&page, &PercentRules::default()).unwrap();

        assert_eq!(fighter.history.len(), 3);
        let urls: Vec<&str> = fighter.linked_urls().collect();
        assert!(urls.contains(&"http://ufcstats.com/fighter-details/sm"));
        assert!(urls.contains(&"http://ufcstats.com/event-details/e1"));

        let today = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let update = fighter.to_update(today);
        assert_eq!(update.win_streak, Some(2));
        assert_eq!(update.loss_streak, Some(0));
        assert_eq!(update.age, Some(37));
    }

    #[test]
    fn test_missing_basic_stats_are_unset() {
        let html = r#"<span class="b-content__title-highlight">Israel</span>
            <ul><li class="b-list__box-list-item"><i class="b-list__box-item-title">Reach:</i> -- </li></ul>"#;
        let page = Page::parse(html, URL);
        let fighter = extract(&page, &PercentRules::default()).unwrap();

        assert_eq!(fighter.name, "Israel");
        assert_eq!(fighter.reach, None);
        assert_eq!(fighter.record, None);
        assert!(fighter.history.is_empty());
        assert_eq!(fighter.to_update(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).win_streak, None);
    }

    #[test]
    fn test_empty_info_box_falls_back_to_list_items() {
        let html = r#"<span class="b-content__title-highlight">Jon Jones</span>
            <div class="b-list__info-box b-list__info-box_style_small-width"><ul></ul></div>
            <ul>
              <li class="b-list__box-list-item"><i class="b-list__box-item-title">Height:</i> 6' 4" </li>
              <li class="b-list__box-list-item"><i class="b-list__box-item-title">Reach:</i> 84" </li>
            </ul>"#;
        let page = Page::parse(html, URL);
        let fighter = extract(&page, &PercentRules::default()).unwrap();

        assert_eq!(fighter.height, Some(76));
        assert_eq!(fighter.reach, Some(84.0));
    }

    #[test]
    fn test_missing_name_is_an_error() {
        let page = Page::parse("<p>nobody</p>", URL);
        assert!(extract(&page, &PercentRules::default()).is_err());
    }
}
