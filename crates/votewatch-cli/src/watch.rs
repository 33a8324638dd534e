//! The `watch` loop: polls the proxy, applies completions to the view and
//! redraws the terminal.
//!
//! One task owns the [`Leaderboard`]. Fetches run as spawned tasks and report
//! back over an mpsc channel tagged with their request ticket, so a slow poll
//! that lands after a newer manual refresh is dropped by the view.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};
use votewatch_client::{ClientError, ProxyClient, UpstreamQuery};
use votewatch_core::{
    Applied, BoardQuery, Leaderboard, RequestTicket, SortDirection, SortKey, VoteEnvelope,
};

use crate::display::{self, Frame};

type Completion = (RequestTicket, Result<VoteEnvelope, ClientError>);

pub struct WatchOptions {
    pub refresh: Duration,
    pub upstream: UpstreamQuery,
    pub board: BoardQuery,
    pub title: String,
    /// Print the first completed fetch and exit instead of running interactively.
    pub once: bool,
}

/// One interactive input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh,
    Filter(String),
    Sort(SortKey, SortDirection),
    Quit,
}

/// Parse an input line. `sort <key>` without a direction keeps `current`.
pub fn parse_command(line: &str, current: SortDirection) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("r") {
        return Ok(Command::Refresh);
    }
    if line.eq_ignore_ascii_case("q") {
        return Ok(Command::Quit);
    }
    if let Some(filter) = line.strip_prefix('/') {
        return Ok(Command::Filter(filter.trim().to_string()));
    }

    let mut words = line.split_whitespace();
    match words.next() {
        Some(w) if w.eq_ignore_ascii_case("sort") => {
            let key: SortKey = words
                .next()
                .ok_or_else(|| anyhow!("usage: sort <rank|count|percent|subject> [asc|desc]"))?
                .parse()?;
            let direction = match words.next() {
                Some(d) => d.parse()?,
                None => current,
            };
            Ok(Command::Sort(key, direction))
        }
        _ => bail!("unknown command: {line}"),
    }
}

/// Input-driven state: the table controls and the cache-buster.
#[derive(Debug, Default)]
pub struct Controls {
    pub board: BoardQuery,
    pub bust: u64,
    /// Feedback for the last line, cleared by the next one.
    pub notice: Option<String>,
}

/// What the loop does after an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Quit,
    Revalidate,
}

impl Controls {
    pub fn new(board: BoardQuery) -> Self {
        Self {
            board,
            ..Self::default()
        }
    }

    /// Apply one input line. Every line except `q` counts as focus regained
    /// and revalidates; a manual refresh also bumps the cache-buster.
    pub fn handle_line(&mut self, line: &str) -> Step {
        self.notice = None;
        match parse_command(line, self.board.direction) {
            Ok(Command::Quit) => return Step::Quit,
            Ok(Command::Refresh) => self.bust += 1,
            Ok(Command::Filter(filter)) => self.board.filter = filter,
            Ok(Command::Sort(key, direction)) => {
                self.board.sort_key = key;
                self.board.direction = direction;
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
        Step::Revalidate
    }
}

/// Feed a completion into the view, stamping the update time on success.
fn absorb(
    view: &mut Leaderboard,
    (ticket, result): Completion,
    updated_at: &mut Option<String>,
) -> Applied {
    let applied = view.apply(ticket, result);
    match applied {
        Applied::Rotated | Applied::Unchanged => {
            *updated_at = Some(Local::now().format("%H:%M:%S").to_string());
        }
        Applied::Failed => {
            warn!(error = view.error().unwrap_or_default(), "leaderboard fetch failed");
        }
        Applied::Stale => debug!(seq = ticket.seq(), "stale completion dropped"),
    }
    applied
}

pub async fn run(client: ProxyClient, opts: WatchOptions) -> Result<()> {
    let client = Arc::new(client);
    let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();

    let mut view = Leaderboard::new();
    let mut controls = Controls::new(opts.board.clone());
    let mut updated_at: Option<String> = None;

    let mut ticker = time::interval(opts.refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = !opts.once;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                spawn_fetch(&client, &mut view, &opts.upstream, controls.bust, &tx);
            }
            Some(completion) = rx.recv() => {
                // A stale completion still lowers the in-flight count, so it
                // falls through to the redraw.
                let applied = absorb(&mut view, completion, &mut updated_at);
                if opts.once && applied != Applied::Stale {
                    let frame = build_frame(&opts, &controls.board, updated_at.as_deref(), None);
                    print!("{}", display::render(&view, &frame));
                    return match view.error() {
                        Some(err) => Err(anyhow!("{err}")),
                        None => Ok(()),
                    };
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match controls.handle_line(&line) {
                    Step::Quit => break,
                    Step::Revalidate => {
                        spawn_fetch(&client, &mut view, &opts.upstream, controls.bust, &tx);
                    }
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "stdin unreadable; interactive commands disabled");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }

        if !opts.once {
            let frame = build_frame(
                &opts,
                &controls.board,
                updated_at.as_deref(),
                controls.notice.as_deref(),
            );
            redraw(&display::render(&view, &frame))?;
        }
    }

    Ok(())
}

fn build_frame<'a>(
    opts: &'a WatchOptions,
    board: &'a BoardQuery,
    updated_at: Option<&'a str>,
    notice: Option<&'a str>,
) -> Frame<'a> {
    Frame {
        title: &opts.title,
        refresh: opts.refresh,
        query: board,
        updated_at,
        notice,
    }
}

fn redraw(frame: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "\x1b[2J\x1b[H{frame}")?;
    stdout.flush()?;
    Ok(())
}
