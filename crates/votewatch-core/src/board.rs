//! Table and podium selection over a payload's nominee rows.
//!
//! The podium always reads the full row set ordered by `rank`; the table
//! applies the user's filter and sort on top. The two never share state, so a
//! search can not hide a podium entry.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::nominee::Nominee;

/// Number of places on the podium.
pub const PODIUM_PLACES: usize = 3;

#[derive(Error, Debug, PartialEq)]
pub enum BoardError {
    #[error("unknown sort key '{0}' (expected rank, count, percent or subject)")]
    UnknownSortKey(String),
    #[error("unknown sort direction '{0}' (expected asc or desc)")]
    UnknownDirection(String),
}

/// Direction of a vote delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn from_delta(delta: i64) -> Self {
        match delta.cmp(&0) {
            Ordering::Greater => Trend::Up,
            Ordering::Less => Trend::Down,
            Ordering::Equal => Trend::Flat,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Flat => "—",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Rank,
    Count,
    Percent,
    Subject,
}

impl FromStr for SortKey {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rank" => Ok(SortKey::Rank),
            "count" | "votes" => Ok(SortKey::Count),
            "percent" | "%" => Ok(SortKey::Percent),
            "subject" | "name" => Ok(SortKey::Subject),
            _ => Err(BoardError::UnknownSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Rank => "rank",
            SortKey::Count => "count",
            SortKey::Percent => "percent",
            SortKey::Subject => "subject",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "up" => Ok(SortDirection::Asc),
            "desc" | "down" => Ok(SortDirection::Desc),
            _ => Err(BoardError::UnknownDirection(s.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// User-applied table controls. Defaults to rank ascending, no filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardQuery {
    pub filter: String,
    pub sort_key: SortKey,
    pub direction: SortDirection,
}

/// Clamp an upstream percent into `[0, 100]` for rendering. NaN renders as 0.
pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// Case-insensitive substring match against `subject` and `etc`.
///
/// The query is trimmed; an empty query matches everything.
pub fn matches_filter(nominee: &Nominee, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    nominee.subject.to_lowercase().contains(&needle)
        || nominee
            .etc
            .as_deref()
            .is_some_and(|etc| etc.to_lowercase().contains(&needle))
}

/// Locale-style name ordering: case-insensitive first, raw order as tiebreak.
pub fn compare_subject(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare_by(key: SortKey, a: &Nominee, b: &Nominee) -> Ordering {
    match key {
        SortKey::Rank => a.rank.cmp(&b.rank),
        SortKey::Count => a.count.cmp(&b.count),
        SortKey::Percent => a.percent.total_cmp(&b.percent),
        SortKey::Subject => compare_subject(&a.subject, &b.subject),
    }
}

/// Stable sort; equal keys keep their payload order in both directions.
pub fn sort_nominees(rows: &mut [&Nominee], key: SortKey, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ord = compare_by(key, a, b);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

/// Rows for the table: filtered, then sorted.
pub fn select<'a>(rows: &'a [Nominee], query: &BoardQuery) -> Vec<&'a Nominee> {
    let mut selected: Vec<&Nominee> = rows
        .iter()
        .filter(|n| matches_filter(n, &query.filter))
        .collect();
    sort_nominees(&mut selected, query.sort_key, query.direction);
    selected
}

/// Top three rows by ascending rank, taken from the unfiltered row set.
pub fn podium(rows: &[Nominee]) -> [Option<&Nominee>; PODIUM_PLACES] {
    let mut ranked: Vec<&Nominee> = rows.iter().collect();
    sort_nominees(&mut ranked, SortKey::Rank, SortDirection::Asc);
    let mut places = [None; PODIUM_PLACES];
    for (slot, nominee) in places.iter_mut().zip(ranked) {
        *slot = Some(nominee);
    }
    places
}
