//! Daily focus statistics.
//!
//! One record per local calendar day. Records are only ever incremented;
//! the whole ledger can be cleared at once.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tomato_ipc::{DayStat, StatsSummary};

/// The streak walk never looks further back than this.
pub const STREAK_LOOKBACK_DAYS: i64 = 365;
const WEEK_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    #[serde(rename = "sessions")]
    pub sessions_completed: u32,
    #[serde(rename = "minutes")]
    pub minutes_focused: u32,
}

/// Receives completed focus sessions from the session clock.
pub trait FocusRecorder {
    fn record_focus_session(&mut self, day: NaiveDate, minutes: u32);
}

/// Persisted as a JSON object keyed by `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsLedger {
    days: BTreeMap<NaiveDate, DailyRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyAggregate {
    pub days: Vec<NaiveDate>,
    pub labels: Vec<String>,
    pub sessions: Vec<u32>,
    pub minutes: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub total_sessions: u32,
    pub total_minutes: u32,
    pub days_active: u32,
}

impl Totals {
    pub fn total_hours(&self) -> u32 {
        self.total_minutes / 60
    }

    pub fn average_sessions_per_day(&self) -> f64 {
        if self.days_active == 0 {
            0.0
        } else {
            f64::from(self.total_sessions) / f64::from(self.days_active)
        }
    }

    pub fn average_minutes_per_day(&self) -> u32 {
        self.total_minutes.checked_div(self.days_active).unwrap_or(0)
    }
}

impl StatsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Record for `date`, zero when nothing was recorded that day.
    pub fn day(&self, date: NaiveDate) -> DailyRecord {
        self.days.get(&date).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &DailyRecord)> {
        self.days.iter()
    }

    /// Consecutive active days ending at `as_of`.
    ///
    /// An empty `as_of` does not end the streak: the first session of the day
    /// may simply not have finished yet.
    pub fn streak_length(&self, as_of: NaiveDate) -> u32 {
        let mut streak = 0;
        for offset in 0..STREAK_LOOKBACK_DAYS {
            let date = as_of - Duration::days(offset);
            if self.day(date).sessions_completed > 0 {
                streak += 1;
            } else if offset > 0 {
                break;
            }
        }
        streak
    }

    /// The seven days ending at `as_of`, oldest first.
    pub fn weekly_aggregate(&self, as_of: NaiveDate) -> WeeklyAggregate {
        let mut week = WeeklyAggregate::default();
        for offset in (0..WEEK_DAYS).rev() {
            let date = as_of - Duration::days(offset);
            let record = self.day(date);
            week.days.push(date);
            week.labels.push(date.format("%a %b %-d").to_string());
            week.sessions.push(record.sessions_completed);
            week.minutes.push(record.minutes_focused);
        }
        week
    }

    pub fn totals(&self) -> Totals {
        self.days.values().fold(Totals::default(), |mut acc, r| {
            acc.total_sessions = acc.total_sessions.saturating_add(r.sessions_completed);
            acc.total_minutes = acc.total_minutes.saturating_add(r.minutes_focused);
            if r.sessions_completed > 0 {
                acc.days_active += 1;
            }
            acc
        })
    }

    pub fn clear(&mut self) {
        self.days.clear();
    }

    pub fn summary(&self, as_of: NaiveDate) -> StatsSummary {
        let today = self.day(as_of);
        let totals = self.totals();
        let week = self.weekly_aggregate(as_of);
        StatsSummary {
            today_sessions: today.sessions_completed,
            today_minutes: today.minutes_focused,
            streak: self.streak_length(as_of),
            total_sessions: totals.total_sessions,
            total_minutes: totals.total_minutes,
            days_active: totals.days_active,
            week: week
                .labels
                .into_iter()
                .zip(week.sessions)
                .zip(week.minutes)
                .map(|((label, sessions), minutes)| DayStat {
                    label,
                    sessions,
                    minutes,
                })
                .collect(),
        }
    }
}

impl FocusRecorder for StatsLedger {
    fn record_focus_session(&mut self, day: NaiveDate, minutes: u32) {
        let record = self.days.entry(day).or_default();
        record.sessions_completed = record.sessions_completed.saturating_add(1);
        record.minutes_focused = record.minutes_focused.saturating_add(minutes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_day_sessions_accumulate() {
        let mut ledger = StatsLedger::new();
        let today = day(2026, 10, 18);
        ledger.record_focus_session(today, 25);
        ledger.record_focus_session(today, 25);
        assert_eq!(
            ledger.day(today),
            DailyRecord {
                sessions_completed: 2,
                minutes_focused: 50
            }
        );
        assert_eq!(ledger.iter().count(), 1);
    }

    #[test]
    fn empty_today_does_not_break_streak() {
        let today = day(2026, 10, 18);
        let mut ledger = StatsLedger::new();
        ledger.record_focus_session(today - Duration::days(2), 25);
        ledger.record_focus_session(today - Duration::days(1), 25);
        assert_eq!(ledger.streak_length(today), 2);

        ledger.record_focus_session(today, 25);
        assert_eq!(ledger.streak_length(today), 3);
    }

    #[test]
    fn gap_yesterday_ends_streak() {
        let today = day(2026, 10, 18);
        let mut ledger = StatsLedger::new();
        ledger.record_focus_session(today - Duration::days(2), 25);
        assert_eq!(ledger.streak_length(today), 0);

        ledger.record_focus_session(today, 25);
        assert_eq!(ledger.streak_length(today), 1);
    }

    #[test]
    fn streak_walk_is_bounded() {
        let today = day(2026, 10, 18);
        let mut ledger = StatsLedger::new();
        for offset in 0..400 {
            ledger.record_focus_session(today - Duration::days(offset), 5);
        }
        assert_eq!(ledger.streak_length(today), 365);
    }

    #[test]
    fn streak_crosses_month_boundaries() {
        let mut ledger = StatsLedger::new();
        ledger.record_focus_session(day(2026, 2, 28), 25);
        ledger.record_focus_session(day(2026, 3, 1), 25);
        assert_eq!(ledger.streak_length(day(2026, 3, 1)), 2);
    }

    #[test]
    fn weekly_aggregate_is_oldest_first_with_zero_gaps() {
        let today = day(2026, 10, 18);
        let mut ledger = StatsLedger::new();
        ledger.record_focus_session(today, 25);
        ledger.record_focus_session(today - Duration::days(6), 30);
        ledger.record_focus_session(today - Duration::days(7), 99);

        let week = ledger.weekly_aggregate(today);
        assert_eq!(week.days.first(), Some(&day(2026, 10, 12)));
        assert_eq!(week.days.last(), Some(&today));
        assert_eq!(week.sessions, vec![1, 0, 0, 0, 0, 0, 1]);
        assert_eq!(week.minutes, vec![30, 0, 0, 0, 0, 0, 25]);
        assert_eq!(week.labels[6], "Sun Oct 18");
    }

    #[test]
    fn totals_and_averages() {
        let mut ledger = StatsLedger::new();
        ledger.record_focus_session(day(2026, 10, 1), 25);
        ledger.record_focus_session(day(2026, 10, 1), 25);
        ledger.record_focus_session(day(2026, 10, 3), 45);

        let totals = ledger.totals();
        assert_eq!(totals.total_sessions, 3);
        assert_eq!(totals.total_minutes, 95);
        assert_eq!(totals.days_active, 2);
        assert_eq!(totals.total_hours(), 1);
        assert_eq!(totals.average_sessions_per_day(), 1.5);
        assert_eq!(totals.average_minutes_per_day(), 47);
    }

    #[test]
    fn clear_then_totals_is_zero() {
        let mut ledger = StatsLedger::new();
        ledger.record_focus_session(day(2026, 10, 18), 25);
        ledger.clear();
        assert!(ledger.is_empty());
        let totals = ledger.totals();
        assert_eq!(totals.total_sessions, 0);
        assert_eq!(totals.total_minutes, 0);
        assert_eq!(totals.days_active, 0);
        assert_eq!(totals.average_minutes_per_day(), 0);
    }

    #[test]
    fn persisted_form_is_keyed_by_iso_date() {
        let mut ledger = StatsLedger::new();
        ledger.record_focus_session(day(2026, 10, 18), 25);
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "2026-10-18": { "sessions": 1, "minutes": 25 } })
        );
        let back: StatsLedger = serde_json::from_value(json).unwrap();
        assert_eq!(back, ledger);
    }

    #[test]
    fn summary_packs_today_and_week() {
        let today = day(2026, 10, 18);
        let mut ledger = StatsLedger::new();
        ledger.record_focus_session(today - Duration::days(1), 25);
        ledger.record_focus_session(today, 30);

        let summary = ledger.summary(today);
        assert_eq!(summary.today_sessions, 1);
        assert_eq!(summary.today_minutes, 30);
        assert_eq!(summary.streak, 2);
        assert_eq!(summary.total_minutes, 55);
        assert_eq!(summary.week.len(), 7);
        assert_eq!(summary.week[5].minutes, 25);
    }
}
