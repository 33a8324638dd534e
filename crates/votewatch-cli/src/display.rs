//! Terminal rendering of the leaderboard view.
//!
//! Builds the whole frame as a `String` so the watch loop can clear the
//! screen and print it in one write: header, podium, error panel, table.

use std::fmt::Write;
use std::time::Duration;

use votewatch_core::{BoardQuery, BoardRow, Leaderboard, LoadState};

const NAME_WIDTH: usize = 24;
const BRAND_WIDTH: usize = 16;
const BAR_WIDTH: usize = 10;
const SKELETON_ROWS: usize = 8;

/// Everything the frame shows besides the view state itself.
pub struct Frame<'a> {
    pub title: &'a str,
    pub refresh: Duration,
    pub query: &'a BoardQuery,
    /// Local time of the last applied payload, pre-formatted.
    pub updated_at: Option<&'a str>,
    /// One-line feedback for the last interactive command.
    pub notice: Option<&'a str>,
}

// ── Public API ──

pub fn render(view: &Leaderboard, frame: &Frame<'_>) -> String {
    let mut out = String::new();
    render_header(&mut out, view, frame);
    if view.has_data() {
        render_podium(&mut out, view);
    }
    if let Some(err) = view.error() {
        render_error(&mut out, err);
    }
    render_table(&mut out, view, frame.query);
    if let Some(notice) = frame.notice {
        let _ = writeln!(out, "{notice}");
    }
    let _ = writeln!(
        out,
        "[Enter] refresh  [/text] filter  [sort <rank|count|percent|subject> <asc|desc>]  [q] quit"
    );
    out
}

// ── Sections ──

fn render_header(out: &mut String, view: &Leaderboard, frame: &Frame<'_>) {
    let _ = writeln!(out, "=== {} ===", frame.title);

    let indicator = match view.load_state() {
        LoadState::FirstLoad => "○ loading",
        LoadState::Revalidating => "◉ updating",
        LoadState::Idle => "● live",
    };
    let _ = writeln!(
        out,
        "{indicator} • refresh {}s",
        frame.refresh.as_millis().div_ceil(1000)
    );

    let mut status = if view.has_data() {
        format!("Total: {} nominee", view.rows().len())
    } else if view.error().is_some() {
        "Failed to fetch data.".to_string()
    } else {
        "Fetching data…".to_string()
    };
    let filter = frame.query.filter.trim();
    if !filter.is_empty() {
        let _ = write!(status, " | filter: \"{filter}\"");
    }
    let _ = write!(
        status,
        " | sort: {} {}",
        frame.query.sort_key, frame.query.direction
    );
    if let Some(at) = frame.updated_at {
        let _ = write!(status, " | updated {at}");
    }
    let _ = writeln!(out, "{status}");
    let _ = writeln!(out);
}

fn render_podium(out: &mut String, view: &Leaderboard) {
    let _ = writeln!(out, "Podium");
    for (i, place) in view.podium().iter().enumerate() {
        let place_no = i + 1;
        match place {
            Some(row) => {
                let _ = writeln!(
                    out,
                    "  {place_no}. {:<name$} {:<brand$} {:>12}  {} {:>6.2}%",
                    truncate(&row.nominee.subject, NAME_WIDTH),
                    truncate(row.nominee.etc.as_deref().unwrap_or("—"), BRAND_WIDTH),
                    fmt_num(row.nominee.count),
                    progress_bar(row.percent),
                    row.percent,
                    name = NAME_WIDTH,
                    brand = BRAND_WIDTH,
                );
            }
            None => {
                let _ = writeln!(out, "  {place_no}. —");
            }
        }
    }
    let _ = writeln!(out);
}

fn render_error(out: &mut String, err: &str) {
    let _ = writeln!(out, "! Could not load the latest data: {err}");
    let _ = writeln!(out, "  Check the proxy token/headers or the connection. Press Enter to retry.");
    let _ = writeln!(out);
}

fn render_table(out: &mut String, view: &Leaderboard, query: &BoardQuery) {
    let _ = writeln!(
        out,
        "{:>5}  {:<name$} {:<brand$} {:>12} {:>12} {:>10} {:>8}  Progress",
        "Rank",
        "Name",
        "Brand",
        "Before",
        "Now",
        "Δ",
        "%",
        name = NAME_WIDTH,
        brand = BRAND_WIDTH,
    );

    if view.load_state() == LoadState::FirstLoad {
        for _ in 0..SKELETON_ROWS {
            let _ = writeln!(
                out,
                "{:>5}  {:<name$} {:<brand$} {:>12} {:>12} {:>10} {:>8}  {}",
                "··",
                "·".repeat(12),
                "·".repeat(8),
                "·····",
                "·····",
                "···",
                "···",
                "·".repeat(BAR_WIDTH),
                name = NAME_WIDTH,
                brand = BRAND_WIDTH,
            );
        }
        return;
    }
    if !view.has_data() {
        let _ = writeln!(out, "  (no data)");
        return;
    }

    let rows = view.table(query);
    if rows.is_empty() {
        let _ = writeln!(out, "  (no nominee matches the filter)");
        return;
    }
    for row in &rows {
        let _ = writeln!(out, "{}", format_row(row));
    }
}

fn format_row(row: &BoardRow<'_>) -> String {
    format!(
        "{:>5}  {:<name$} {:<brand$} {:>12} {:>12} {:>10} {:>7.2}%  {}",
        format!("#{}", row.nominee.rank),
        truncate(&row.nominee.subject, NAME_WIDTH),
        truncate(row.nominee.etc.as_deref().unwrap_or("-"), BRAND_WIDTH),
        fmt_num(row.before),
        fmt_num(row.nominee.count),
        format!("{} {}", row.trend.arrow(), fmt_delta(row.delta)),
        row.percent,
        progress_bar(row.percent),
        name = NAME_WIDTH,
        brand = BRAND_WIDTH,
    )
}

// ── Helpers ──

/// `1234567` → `1,234,567`.
pub fn fmt_num(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `0` → `0`, `20` → `+20`, `-1500` → `-1,500`.
pub fn fmt_delta(delta: i64) -> String {
    match delta {
        0 => "0".to_string(),
        d if d > 0 => format!("+{}", fmt_num(d.unsigned_abs())),
        d => format!("-{}", fmt_num(d.unsigned_abs())),
    }
}

/// Bar for an already-clamped percent.
fn progress_bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use votewatch_core::{Nominee, ResponseStatus, VoteEnvelope};

    fn nominee(key: i64, subject: &str, count: u64, rank: u32, percent: f64) -> Nominee {
        Nominee {
            key_nominee: key,
            key_brand: 0,
            subject: subject.into(),
            etc: None,
            percent,
            count,
            rank,
            file: None,
            other_file: None,
        }
    }

    fn ok(rows: Vec<Nominee>) -> Result<VoteEnvelope, String> {
        Ok(VoteEnvelope {
            status: ResponseStatus::default(),
            nominee: rows,
        })
    }

    fn frame(query: &BoardQuery) -> Frame<'_> {
        Frame {
            title: "Test Board",
            refresh: Duration::from_secs(10),
            query,
            updated_at: None,
            notice: None,
        }
    }

    #[test]
    fn number_formatting() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(999), "999");
        assert_eq!(fmt_num(1000), "1,000");
        assert_eq!(fmt_num(1234567), "1,234,567");
        assert_eq!(fmt_delta(0), "0");
        assert_eq!(fmt_delta(20), "+20");
        assert_eq!(fmt_delta(-1500), "-1,500");
    }

    #[test]
    fn progress_bar_scales() {
        assert_eq!(progress_bar(0.0), "░".repeat(10));
        assert_eq!(progress_bar(100.0), "█".repeat(10));
        assert_eq!(progress_bar(50.0), format!("{}{}", "█".repeat(5), "░".repeat(5)));
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 10), "abcdefg...");
    }

    #[test]
    fn skeletons_only_before_first_success() {
        let mut view = Leaderboard::new();
        let query = BoardQuery::default();
        let _pending = view.begin_request();
        let first = render(&view, &frame(&query));
        assert!(first.contains("○ loading"));
        assert!(first.contains("··"));

        let t = view.begin_request();
        view.apply(t, ok(vec![nominee(1, "A", 100, 1, 50.0)]));
        let t = view.begin_request();
        let loaded = render(&view, &frame(&query));
        assert!(loaded.contains("◉ updating"));
        assert!(!loaded.contains("·····"));

        let failed: Result<VoteEnvelope, String> = Err("boom".into());
        view.apply(t, failed);
        let errored = render(&view, &frame(&query));
        assert!(!errored.contains("·····"));
    }

    #[test]
    fn failed_first_fetch_shows_empty_table() {
        let mut view = Leaderboard::new();
        let t = view.begin_request();
        let failed: Result<VoteEnvelope, String> = Err("proxy returned 500".into());
        view.apply(t, failed);

        let query = BoardQuery::default();
        let out = render(&view, &frame(&query));
        assert!(out.contains("! Could not load the latest data: proxy returned 500"));
        assert!(out.contains("(no data)"));
        assert!(!out.contains("·····"));
        assert!(!out.contains("Podium"));

        let _retry = view.begin_request();
        let out = render(&view, &frame(&query));
        assert!(out.contains("·····"));
    }

    #[test]
    fn renders_deltas_after_second_poll() {
        let mut view = Leaderboard::new();
        let t = view.begin_request();
        view.apply(t, ok(vec![nominee(1, "A", 100, 1, 50.0), nominee(2, "B", 80, 2, 40.0)]));
        let t = view.begin_request();
        view.apply(t, ok(vec![nominee(1, "A", 120, 1, 50.0), nominee(2, "B", 80, 2, 40.0)]));

        let query = BoardQuery::default();
        let out = render(&view, &frame(&query));
        assert!(out.contains("▲ +20"));
        assert!(out.contains("— 0"));
        assert!(out.contains("Total: 2 nominee"));
    }

    #[test]
    fn error_panel_keeps_podium_and_table() {
        let mut view = Leaderboard::new();
        let t = view.begin_request();
        view.apply(t, ok(vec![nominee(1, "Aster", 100, 1, 150.0)]));
        let t = view.begin_request();
        let failed: Result<VoteEnvelope, String> = Err("proxy returned 504".into());
        view.apply(t, failed);

        let query = BoardQuery::default();
        let out = render(&view, &frame(&query));
        assert!(out.contains("! Could not load the latest data: proxy returned 504"));
        assert!(out.contains("Podium"));
        assert!(out.contains("Aster"));
        assert!(out.contains("100.00%"));
        assert!(!out.contains("150.00%"));
    }
}
