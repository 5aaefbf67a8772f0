//! Contest phase gating.
//!
//! # Responsibilities
//! - Derive the contest phase from wall time and the configured window
//! - Derive the ranking freeze instant consumed by leaderboard rendering
//! - Provide the fixed event timezone
//!
//! # Design Decisions
//! - Phase is a pure function of (now, window); nothing is cached, so a
//!   long-running process can never serve a stale phase
//! - Both window bounds are evaluated against the current calendar day in
//!   the event zone; a window with start > end is an operator
//!   misconfiguration and is surfaced as a startup warning, not reinterpreted
//! - `now` is always passed in explicitly, which keeps the gate testable
//!   at any simulated hour

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// The event runs on JST (UTC+9). Fixed for the process lifetime.
pub fn event_zone() -> FixedOffset {
    // UTC+9 is within FixedOffset's valid range.
    FixedOffset::east_opt(9 * 3600).expect("UTC+9 is a valid fixed offset")
}

/// Where the contest is relative to the configured window, right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestPhase {
    NotStarted,
    Started,
    Ended,
}

impl ContestPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContestPhase::NotStarted => "not_started",
            ContestPhase::Started => "started",
            ContestPhase::Ended => "ended",
        }
    }
}

/// The daily contest window. Immutable after process start.
///
/// A `None` bound disables that side of the gate entirely.
#[derive(Debug, Clone, Copy)]
pub struct ContestWindow {
    starts_at_hour: Option<u32>,
    ends_at_hour: Option<u32>,
    zone: FixedOffset,
}

impl ContestWindow {
    pub fn new(starts_at_hour: Option<u32>, ends_at_hour: Option<u32>) -> Self {
        Self {
            starts_at_hour,
            ends_at_hour,
            zone: event_zone(),
        }
    }

    /// Compute the phase for the given instant.
    ///
    /// Bounds are instantiated on the current calendar day in the event
    /// zone. `now == starts_at` and `now == ends_at` are both `Started`
    /// (strict before/after comparison).
    pub fn phase(&self, now: DateTime<Utc>) -> ContestPhase {
        let local = now.with_timezone(&self.zone).naive_local();
        let day = local.date();

        if let Some(starts_at) = self.starts_at_hour.and_then(|h| day.and_hms_opt(h, 0, 0)) {
            if local < starts_at {
                return ContestPhase::NotStarted;
            }
        }
        if let Some(ends_at) = self.ends_at_hour.and_then(|h| day.and_hms_opt(h, 0, 0)) {
            if local > ends_at {
                return ContestPhase::Ended;
            }
        }

        ContestPhase::Started
    }

    /// The instant public ranking freezes: one hour before today's end
    /// bound, or a far-future sentinel when the end bound is disabled.
    pub fn ranking_freeze_at(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        let local = now.with_timezone(&self.zone).naive_local();
        let day = local.date();

        if let Some(ends_at) = self.ends_at_hour.and_then(|h| day.and_hms_opt(h, 0, 0)) {
            let frozen = ends_at - chrono::Duration::hours(1);
            return self
                .zone
                .from_local_datetime(&frozen)
                .single()
                .expect("fixed-offset conversions are unambiguous");
        }

        // No end bound: effectively never freeze.
        self.zone
            .with_ymd_and_hms(2038, 1, 1, 0, 0, 0)
            .single()
            .expect("fixed-offset conversions are unambiguous")
    }

    /// True when the configured bounds cross midnight (start > end).
    /// The window is still evaluated per calendar day; see module docs.
    pub fn spans_midnight(&self) -> bool {
        match (self.starts_at_hour, self.ends_at_hour) {
            (Some(start), Some(end)) => start > end,
            _ => false,
        }
    }
}

/// Source of "now" for phase decisions.
///
/// Production uses the system clock; tests pin a fixed instant so the gate
/// can be exercised at any simulated hour.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(instant) => *instant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        let day = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let local = day.and_hms_opt(hour, minute, 0).unwrap();
        event_zone()
            .from_local_datetime(&local)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn phase_follows_the_window() {
        let window = ContestWindow::new(Some(10), Some(18));

        assert_eq!(window.phase(at(9, 0)), ContestPhase::NotStarted);
        assert_eq!(window.phase(at(12, 0)), ContestPhase::Started);
        assert_eq!(window.phase(at(19, 0)), ContestPhase::Ended);
    }

    #[test]
    fn bounds_are_inclusive_instants() {
        let window = ContestWindow::new(Some(10), Some(18));

        // Strict comparison: exactly on the bound is Started.
        assert_eq!(window.phase(at(10, 0)), ContestPhase::Started);
        assert_eq!(window.phase(at(18, 0)), ContestPhase::Started);
        assert_eq!(window.phase(at(18, 1)), ContestPhase::Ended);
    }

    #[test]
    fn disabled_sides_never_trigger() {
        let open_start = ContestWindow::new(None, Some(18));
        assert_eq!(open_start.phase(at(0, 0)), ContestPhase::Started);
        assert_eq!(open_start.phase(at(19, 0)), ContestPhase::Ended);

        let open_end = ContestWindow::new(Some(10), None);
        assert_eq!(open_end.phase(at(9, 0)), ContestPhase::NotStarted);
        assert_eq!(open_end.phase(at(23, 59)), ContestPhase::Started);

        let unbounded = ContestWindow::new(None, None);
        assert_eq!(unbounded.phase(at(3, 0)), ContestPhase::Started);
    }

    #[test]
    fn freeze_is_one_hour_before_end() {
        let window = ContestWindow::new(Some(10), Some(18));
        let frozen = window.ranking_freeze_at(at(12, 0));

        assert_eq!(frozen.naive_local().time().to_string(), "17:00:00");
        assert_eq!(frozen.naive_local().date().to_string(), "2026-08-06");
    }

    #[test]
    fn freeze_without_end_bound_is_far_future() {
        let window = ContestWindow::new(Some(10), None);
        let frozen = window.ranking_freeze_at(at(12, 0));

        assert_eq!(frozen.naive_local().date().to_string(), "2038-01-01");
    }

    #[test]
    fn midnight_spanning_window_is_flagged() {
        assert!(ContestWindow::new(Some(22), Some(6)).spans_midnight());
        assert!(!ContestWindow::new(Some(10), Some(18)).spans_midnight());
        assert!(!ContestWindow::new(None, Some(6)).spans_midnight());
    }

    #[test]
    fn fixed_clock_reports_the_pinned_instant() {
        let instant = at(12, 30);
        assert_eq!(Clock::Fixed(instant).now(), instant);
    }
}
