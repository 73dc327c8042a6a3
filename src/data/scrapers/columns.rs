//! Statistic columns of the fight detail tables

use super::stat_text::{parse_stat, PercentRules, PercentScale, StatTriple};
use crate::StatLine;

/// The two values of a table cell, one per fighter, in row order
pub type CellPair = [String; 2];

/// Which of the two table families a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Knockdowns, strikes, takedowns, submissions, reversals and control
    General,
    /// Significant strikes broken down by target and position
    Strikes,
}

/// A statistic column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Fighter,
    Knockdowns,
    SigStrikes,
    SigStrikesPct,
    TotalStrikes,
    Takedowns,
    TakedownsPct,
    SubmissionAttempts,
    Reversals,
    Control,
    Head,
    Body,
    Leg,
    Distance,
    Clinch,
    Ground,
}

const GENERAL_LAYOUT: &[Column] = &[
    Column::Fighter,
    Column::Knockdowns,
    Column::SigStrikes,
    Column::SigStrikesPct,
    Column::TotalStrikes,
    Column::Takedowns,
    Column::TakedownsPct,
    Column::SubmissionAttempts,
    Column::Reversals,
    Column::Control,
];

const STRIKES_LAYOUT: &[Column] = &[
    Column::Fighter,
    Column::SigStrikes,
    Column::SigStrikesPct,
    Column::Head,
    Column::Body,
    Column::Leg,
    Column::Distance,
    Column::Clinch,
    Column::Ground,
];

/// Lowercase a header label and collapse its whitespace
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Column {
    /// Recognise a table header label
    pub fn from_header(label: &str) -> Option<Self> {
        let column = match normalize_label(label).as_str() {
            "fighter" => Column::Fighter,
            "kd" => Column::Knockdowns,
            "sig. str." | "sig. str" => Column::SigStrikes,
            "sig. str. %" | "sig. str.%" => Column::SigStrikesPct,
            "total str." | "total str" => Column::TotalStrikes,
            "td" => Column::Takedowns,
            "td %" | "td%" => Column::TakedownsPct,
            "sub. att" | "sub. att." => Column::SubmissionAttempts,
            "rev." | "rev" => Column::Reversals,
            "ctrl" => Column::Control,
            "head" => Column::Head,
            "body" => Column::Body,
            "leg" => Column::Leg,
            "distance" => Column::Distance,
            "clinch" => Column::Clinch,
            "ground" => Column::Ground,
            _ => return None,
        };
        Some(column)
    }

    /// Fixed column order used when a table's headers are unreadable
    pub fn fixed_layout(kind: TableKind) -> Vec<Option<Column>> {
        let layout = match kind {
            TableKind::General => GENERAL_LAYOUT,
            TableKind::Strikes => STRIKES_LAYOUT,
        };
        layout.iter().copied().map(Some).collect()
    }

    /// Column per index from header labels, or the fixed layout when fewer
    /// than two statistic headers are recognised
    pub fn layout(headers: &[String], kind: TableKind) -> Vec<Option<Column>> {
        let layout: Vec<Option<Column>> = headers.iter().map(|h| Column::from_header(h)).collect();
        let recognised = layout
            .iter()
            .filter(|c| matches!(c, Some(c) if *c != Column::Fighter))
            .count();
        if recognised >= 2 {
            layout
        } else {
            Column::fixed_layout(kind)
        }
    }

    /// Write a parsed value into `line`
    ///
    /// Significant strike counts from the strikes table and the takedown
    /// percentage column only fill fields that are still unset.
    pub fn apply(
        self,
        triple: StatTriple,
        line: &mut StatLine,
        kind: TableKind,
        rules: &PercentRules,
    ) {
        let mut delta = StatLine::default();
        let mut fill_only = false;

        match self {
            Column::Fighter => return,
            Column::Knockdowns => delta.knockdowns = Some(triple.primary),
            Column::SigStrikes => {
                delta.sig_strikes_landed = Some(triple.primary);
                delta.sig_strikes_attempted = triple.secondary;
                fill_only = kind == TableKind::Strikes;
            }
            Column::SigStrikesPct => {
                delta.sig_strikes_pct = percent(triple, rules.sig_strikes_pct, "sig. str. %");
                fill_only = kind == TableKind::Strikes;
            }
            Column::TotalStrikes => {
                delta.total_strikes_landed = Some(triple.primary);
                delta.total_strikes_attempted = triple.secondary;
            }
            Column::Takedowns => {
                delta.takedowns_landed = Some(triple.primary);
                delta.takedowns_attempted = triple.secondary;
                delta.takedowns_pct = triple.ratio;
            }
            Column::TakedownsPct => {
                delta.takedowns_pct = percent(triple, rules.takedowns_pct, "td %");
                fill_only = true;
            }
            Column::SubmissionAttempts => delta.submission_attempts = Some(triple.primary),
            Column::Reversals => delta.reversals = Some(triple.primary),
            Column::Control => delta.control_time_seconds = Some(triple.primary),
            Column::Head => {
                delta.head_landed = Some(triple.primary);
                delta.head_attempted = triple.secondary;
            }
            Column::Body => {
                delta.body_landed = Some(triple.primary);
                delta.body_attempted = triple.secondary;
            }
            Column::Leg => {
                delta.leg_landed = Some(triple.primary);
                delta.leg_attempted = triple.secondary;
            }
            Column::Distance => {
                delta.distance_landed = Some(triple.primary);
                delta.distance_attempted = triple.secondary;
            }
            Column::Clinch => {
                delta.clinch_landed = Some(triple.primary);
                delta.clinch_attempted = triple.secondary;
            }
            Column::Ground => {
                delta.ground_landed = Some(triple.primary);
                delta.ground_attempted = triple.secondary;
            }
        }

        if fill_only {
            line.fill_missing(&delta);
        } else {
            line.merge(&delta);
        }
    }
}

fn percent(triple: StatTriple, scale: PercentScale, field: &str) -> Option<f64> {
    // "x of y" and dash placeholders already carry a ratio
    if triple.secondary.is_some() {
        return triple.ratio;
    }
    scale.to_ratio(field, triple.primary as f64)
}

/// Apply every cell of a data row to the two fighters' lines
pub fn apply_row(
    lines: &mut [StatLine; 2],
    cells: &[Option<CellPair>],
    layout: &[Option<Column>],
    kind: TableKind,
    rules: &PercentRules,
) {
    for (cell, column) in cells.iter().zip(layout.iter()) {
        let (Some(pair), Some(column)) = (cell, column) else {
            continue;
        };
        for (line, text) in lines.iter_mut().zip(pair.iter()) {
            if let Some(triple) = parse_stat(text) {
                column.apply(triple, line, kind, rules);
            }
        }
    }
}
