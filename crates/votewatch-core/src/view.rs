//! Leaderboard view state: snapshot rotation, request generations, and the
//! rows/podium a renderer draws.
//!
//! Every fetch is started with [`Leaderboard::begin_request`], which hands out
//! a [`RequestTicket`] carrying a monotonically increasing sequence number.
//! Completions are fed back through [`Leaderboard::apply`] in whatever order
//! they arrive. A completion older than the last applied one is dropped, so a
//! slow manual refresh can never overwrite a newer scheduled poll.

use std::fmt::Display;

use tracing::debug;

use crate::board::{self, BoardQuery, PODIUM_PLACES, Trend};
use crate::nominee::{Nominee, VoteEnvelope};
use crate::snapshot::SnapshotPair;

/// Sequence tag for one in-flight fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket {
    seq: u64,
}

impl RequestTicket {
    pub fn seq(self) -> u64 {
        self.seq
    }
}

/// What the renderer should show while requests are outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing has loaded yet and a fetch is pending: draw skeleton placeholders.
    FirstLoad,
    /// Data is on screen and a refresh is in flight: pulse the live indicator.
    Revalidating,
    Idle,
}

/// Result of feeding one completion into the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// New data with a new signature; snapshots rotated.
    Rotated,
    /// New data with the same signature; snapshots untouched.
    Unchanged,
    /// The fetch failed; previous rows are kept and the error is set.
    Failed,
    /// An older request finished after a newer one was applied; ignored.
    Stale,
}

/// One rendered nominee with its delta against the previous snapshot.
#[derive(Debug, Clone, Copy)]
pub struct BoardRow<'a> {
    pub nominee: &'a Nominee,
    pub before: u64,
    pub delta: i64,
    pub trend: Trend,
    /// Percent clamped to `[0, 100]`.
    pub percent: f64,
}

#[derive(Debug, Default)]
pub struct Leaderboard {
    snapshots: SnapshotPair,
    rows: Vec<Nominee>,
    error: Option<String>,
    next_seq: u64,
    applied_seq: Option<u64>,
    in_flight: usize,
    loaded: bool,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a new fetch. Must be called before the request is issued.
    pub fn begin_request(&mut self) -> RequestTicket {
        let ticket = RequestTicket { seq: self.next_seq };
        self.next_seq += 1;
        self.in_flight += 1;
        ticket
    }

    /// Apply a completed fetch.
    pub fn apply<E: Display>(
        &mut self,
        ticket: RequestTicket,
        result: Result<VoteEnvelope, E>,
    ) -> Applied {
        self.in_flight = self.in_flight.saturating_sub(1);

        if let Some(last) = self.applied_seq
            && ticket.seq < last
        {
            debug!(seq = ticket.seq, last, "dropping stale completion");
            return Applied::Stale;
        }
        self.applied_seq = Some(ticket.seq);

        match result {
            Ok(envelope) => {
                let rotated = self.snapshots.observe(&envelope.nominee);
                self.rows = envelope.nominee;
                self.error = None;
                self.loaded = true;
                if rotated {
                    debug!(seq = ticket.seq, rows = self.rows.len(), "snapshots rotated");
                    Applied::Rotated
                } else {
                    Applied::Unchanged
                }
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Applied::Failed
            }
        }
    }

    pub fn load_state(&self) -> LoadState {
        let pending = self.in_flight > 0 || self.applied_seq.is_none();
        if !self.loaded && pending {
            LoadState::FirstLoad
        } else if self.loaded && self.in_flight > 0 {
            LoadState::Revalidating
        } else {
            LoadState::Idle
        }
    }

    pub fn has_data(&self) -> bool {
        self.loaded
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Rows of the last applied payload, in payload order.
    pub fn rows(&self) -> &[Nominee] {
        &self.rows
    }

    pub fn snapshots(&self) -> &SnapshotPair {
        &self.snapshots
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn row<'a>(&self, nominee: &'a Nominee) -> BoardRow<'a> {
        let delta = self.snapshots.delta(nominee);
        BoardRow {
            nominee,
            before: self.snapshots.before_count(nominee),
            delta,
            trend: Trend::from_delta(delta),
            percent: board::clamp_percent(nominee.percent),
        }
    }

    /// Filtered and sorted table rows.
    pub fn table(&self, query: &BoardQuery) -> Vec<BoardRow<'_>> {
        board::select(&self.rows, query)
            .into_iter()
            .map(|n| self.row(n))
            .collect()
    }

    /// Podium places 1–3 from the unfiltered rows.
    pub fn podium(&self) -> [Option<BoardRow<'_>>; PODIUM_PLACES] {
        board::podium(&self.rows).map(|place| place.map(|n| self.row(n)))
    }
}
