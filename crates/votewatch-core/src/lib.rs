//! Core types for votewatch: the upstream nominee payload, snapshot diffing,
//! and the leaderboard view state.

pub mod board;
pub mod nominee;
pub mod snapshot;
pub mod view;

pub use board::{BoardError, BoardQuery, SortDirection, SortKey, Trend, clamp_percent};
pub use nominee::{EnvelopeError, FileRef, Nominee, ResponseStatus, VoteEnvelope};
pub use snapshot::{Snapshot, SnapshotPair, VoteState, signature};
pub use view::{Applied, BoardRow, Leaderboard, LoadState, RequestTicket};
