//! Per-round statistics tables
//!
//! A round-group table interleaves `thead` blocks announcing `Round N` with
//! the data row for that round. The table is flattened into a node list and
//! reconciled by a two-state machine, so rows are only attributed to a round
//! when they directly follow its header.

use super::columns::{apply_row, CellPair, Column, TableKind};
use super::stat_text::PercentRules;
use super::text_of;
use crate::StatLine;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::collections::BTreeMap;

static ROUND_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)round\s+(\d+)").unwrap());

/// One structural node of a round-group table
#[derive(Debug, Clone, PartialEq)]
pub enum RoundNode {
    /// A header block, with its round number when it announces one
    Header(Option<u32>),
    /// A data row, `None` when it has no cells
    Row(Option<Vec<Option<CellPair>>>),
}

/// A data row attributed to a round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRow {
    pub round: u32,
    pub cells: Vec<Option<CellPair>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundState {
    AwaitingHeader,
    HeaderSeen(u32),
}

/// Cells of a data row, each holding the two fighters' values
pub fn row_cells(row: ElementRef) -> Vec<Option<CellPair>> {
    let td_selector = Selector::parse("td").unwrap();
    let p_selector = Selector::parse("p").unwrap();

    row.select(&td_selector)
        .map(|td| {
            let values: Vec<String> = td.select(&p_selector).map(text_of).collect();
            match values.as_slice() {
                [first, second, ..] => Some([first.clone(), second.clone()]),
                _ => None,
            }
        })
        .collect()
}

/// Header labels of the first header row of a table
pub fn column_headers(table: ElementRef) -> Vec<String> {
    let row_selector = Selector::parse("thead tr, tr").unwrap();
    let th_selector = Selector::parse("th").unwrap();

    table
        .select(&row_selector)
        .find(|row| row.select(&th_selector).next().is_some())
        .map(|row| row.select(&th_selector).map(text_of).collect())
        .unwrap_or_default()
}

/// Flatten a round-group table into header and row nodes in document order
pub fn round_nodes(table: ElementRef) -> Vec<RoundNode> {
    let node_selector = Selector::parse("thead, tr").unwrap();
    let colspan_selector = Selector::parse("th[colspan]").unwrap();
    let td_selector = Selector::parse("td").unwrap();

    let mut nodes = Vec::new();
    for element in table.select(&node_selector) {
        if element.value().name() == "thead" {
            let round = element
                .select(&colspan_selector)
                .find_map(|th| {
                    ROUND_LABEL
                        .captures(&text_of(th))
                        .and_then(|caps| caps[1].parse().ok())
                });
            nodes.push(RoundNode::Header(round));
            continue;
        }

        let in_header = element
            .ancestors()
            .take_while(|node| node.id() != table.id())
            .filter_map(ElementRef::wrap)
            .any(|parent| parent.value().name() == "thead");
        if in_header {
            continue;
        }

        if element.select(&td_selector).next().is_none() {
            nodes.push(RoundNode::Row(None));
        } else {
            nodes.push(RoundNode::Row(Some(row_cells(element))));
        }
    }
    nodes
}

/// Attribute data rows to rounds
pub fn reconcile(nodes: Vec<RoundNode>) -> Vec<RoundRow> {
    let mut state = RoundState::AwaitingHeader;
    let mut rows = Vec::new();

    for node in nodes {
        state = match (state, node) {
            (_, RoundNode::Header(Some(round))) => RoundState::HeaderSeen(round),
            (_, RoundNode::Header(None)) => RoundState::AwaitingHeader,
            (_, RoundNode::Row(None)) => RoundState::AwaitingHeader,
            (RoundState::HeaderSeen(round), RoundNode::Row(Some(cells))) => {
                rows.push(RoundRow { round, cells });
                RoundState::AwaitingHeader
            }
            (RoundState::AwaitingHeader, RoundNode::Row(Some(_))) => RoundState::AwaitingHeader,
        };
    }
    rows
}

/// Per-round statistics for both fighters, in table row order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundLedger {
    rounds: BTreeMap<u32, [StatLine; 2]>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a general-table row, creating the round if needed
    pub fn record_general(&mut self, row: &RoundRow, layout: &[Option<Column>], rules: &PercentRules) {
        let lines = self.rounds.entry(row.round).or_default();
        apply_row(lines, &row.cells, layout, TableKind::General, rules);
    }

    /// Enrich an existing round with a strikes-table row
    pub fn enrich_strikes(&mut self, row: &RoundRow, layout: &[Option<Column>], rules: &PercentRules) {
        match self.rounds.get_mut(&row.round) {
            Some(lines) => apply_row(lines, &row.cells, layout, TableKind::Strikes, rules),
            None => log::warn!(
                "Strikes row for round {} has no general row, skipping",
                row.round
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn get(&self, round: u32) -> Option<&[StatLine; 2]> {
        self.rounds.get(&round)
    }

    /// Rounds in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[StatLine; 2])> {
        self.rounds.iter().map(|(round, lines)| (*round, lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn cells(values: &[(&str, &str)]) -> Vec<Option<CellPair>> {
        values
            .iter()
            .map(|(a, b)| Some([a.to_string(), b.to_string()]))
            .collect()
    }

    fn row(values: &[(&str, &str)]) -> RoundNode {
        RoundNode::Row(Some(cells(values)))
    }

    #[test]
    fn test_reconcile_state_machine() {
        let nodes = vec![
            RoundNode::Header(None),
            row(&[("A", "B"), ("9", "9")]),
            RoundNode::Header(Some(1)),
            row(&[("A", "B"), ("1", "0")]),
            row(&[("A", "B"), ("7", "7")]),
            RoundNode::Header(Some(2)),
            RoundNode::Row(None),
            row(&[("A", "B"), ("8", "8")]),
            RoundNode::Header(Some(3)),
            row(&[("A", "B"), ("0", "1")]),
        ];

        let rows = reconcile(nodes);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].round, 1);
        assert_eq!(rows[0].cells[1], Some(["1".to_string(), "0".to_string()]));
        assert_eq!(rows[1].round, 3);
    }

    #[test]
    fn test_round_nodes_from_table() {
        let html = r#"
            <table>
              <thead><tr><th>Fighter</th><th>KD</th><th>Sig. str.</th></tr></thead>
              <thead><tr><th colspan="3">Round 1</th></tr></thead>
              <tbody><tr>
                <td><p>A</p><p>B</p></td>
                <td><p>1</p><p>0</p></td>
                <td><p>5 of 9</p><p>3 of 8</p></td>
              </tr></tbody>
              <thead><tr><th colspan="3">Round 2</th></tr></thead>
              <tbody><tr>
                <td><p>A</p><p>B</p></td>
                <td><p>0</p><p>0</p></td>
                <td><p>4 of 6</p><p>2 of 2</p></td>
              </tr></tbody>
            </table>"#;
        let doc = Html::parse_fragment(html);
        let table = doc.select(&Selector::parse("table").unwrap()).next().unwrap();

        let nodes = round_nodes(table);
        assert_eq!(nodes[0], RoundNode::Header(None));
        assert_eq!(nodes[1], RoundNode::Header(Some(1)));
        assert!(matches!(nodes[2], RoundNode::Row(Some(_))));

        let headers = column_headers(table);
        assert_eq!(headers, vec!["Fighter", "KD", "Sig. str."]);

        let rows = reconcile(nodes);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].round, 2);
        assert_eq!(rows[1].cells[2], Some(["4 of 6".to_string(), "2 of 2".to_string()]));
    }

    #[test]
    fn test_ledger_two_passes_idempotent() {
        let rules = PercentRules::default();
        let general = vec![RoundRow {
            round: 1,
            cells: cells(&[("A", "B"), ("1", "0"), ("5 of 9", "3 of 8")]),
        }];
        let strikes = vec![
            RoundRow {
                round: 1,
                cells: cells(&[("A", "B"), ("5 of 9", "3 of 8"), ("55%", "37%"), ("2 of 4", "1 of 3")]),
            },
            RoundRow {
                round: 4,
                cells: cells(&[("A", "B"), ("1 of 1", "0 of 0")]),
            },
        ];
        let general_layout = Column::fixed_layout(TableKind::General);
        let strikes_layout = Column::fixed_layout(TableKind::Strikes);

        let mut ledger = RoundLedger::new();
        for _ in 0..2 {
            for row in &general {
                ledger.record_general(row, &general_layout, &rules);
            }
            for row in &strikes {
                ledger.enrich_strikes(row, &strikes_layout, &rules);
            }
        }

        assert_eq!(ledger.len(), 1);
        let lines = ledger.get(1).unwrap();
        assert_eq!(lines[0].knockdowns, Some(1));
        assert_eq!(lines[0].sig_strikes_landed, Some(5));
        assert_eq!(lines[0].sig_strikes_pct, Some(0.55));
        assert_eq!(lines[1].head_attempted, Some(3));
        assert!(ledger.get(4).is_none());
    }
}
