use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::match_record::{MatchRecord, MatchResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub wins: u64,
    pub losses: u64,
    pub games: u64,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub wins: u64,
    pub losses: u64,
    pub games: u64,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub totals: Totals,
    pub daily: Vec<DailySummary>,
}

#[derive(Default, Clone, Copy)]
struct Tally {
    wins: u64,
    losses: u64,
}

impl Tally {
    fn record(&mut self, result: MatchResult) {
        match result {
            MatchResult::Win => self.wins += 1,
            MatchResult::Loss => self.losses += 1,
        }
    }

    fn games(&self) -> u64 {
        self.wins + self.losses
    }

    // zero games count as a ratio of 0
    fn ratio(&self) -> f64 {
        match self.games() {
            0 => 0.0,
            games => self.wins as f64 / games as f64,
        }
    }
}

/// Aggregates win/loss counts per day and overall. Input order does not
/// matter; `daily` always comes out sorted by date.
pub fn summarize(matches: &[MatchRecord]) -> Summary {
    let mut total = Tally::default();
    let mut by_day: BTreeMap<NaiveDate, Tally> = BTreeMap::new();

    for record in matches {
        total.record(record.result);
        by_day.entry(record.date).or_default().record(record.result);
    }

    let daily = by_day
        .into_iter()
        .map(|(date, tally)| DailySummary {
            date,
            wins: tally.wins,
            losses: tally.losses,
            games: tally.games(),
            ratio: tally.ratio(),
        })
        .collect();

    Summary {
        totals: Totals {
            wins: total.wins,
            losses: total.losses,
            games: total.games(),
            ratio: total.ratio(),
        },
        daily,
    }
}
