//! Pomodoro durations and behaviour switches.
//!
//! The persisted form uses camelCase field names
//! (`focusTime`, `shortBreak`, ...). Validation lives here but is applied by
//! the layers that accept user input; the session clock trusts what it gets.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;
use tomato_ipc::{SessionKind, SettingsUpdate};

pub const FOCUS_MINUTES: RangeInclusive<u32> = 1..=60;
pub const SHORT_BREAK_MINUTES: RangeInclusive<u32> = 1..=30;
pub const LONG_BREAK_MINUTES: RangeInclusive<u32> = 1..=60;
pub const LONG_BREAK_INTERVAL: RangeInclusive<u32> = 2..=10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "focusTime")]
    pub focus_minutes: u32,
    #[serde(rename = "shortBreak")]
    pub short_break_minutes: u32,
    #[serde(rename = "longBreak")]
    pub long_break_minutes: u32,
    /// Focus sessions per long break.
    #[serde(rename = "longBreakInterval")]
    pub long_break_interval: u32,
    #[serde(rename = "autoStart")]
    pub auto_start_next: bool,
    #[serde(rename = "notifications")]
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_interval: 4,
            auto_start_next: true,
            notifications_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
        value: u32,
    },
    #[error("Long break should be longer than short break")]
    LongBreakNotLonger,
}

impl Settings {
    pub fn minutes_for(&self, kind: SessionKind) -> u32 {
        match kind {
            SessionKind::Focus => self.focus_minutes,
            SessionKind::ShortBreak => self.short_break_minutes,
            SessionKind::LongBreak => self.long_break_minutes,
        }
    }

    /// Target duration of a session of `kind`, in seconds.
    pub fn duration_for(&self, kind: SessionKind) -> u64 {
        u64::from(self.minutes_for(kind)) * 60
    }

    /// Returns a copy with every field present in `update` replaced.
    pub fn merged(&self, update: &SettingsUpdate) -> Settings {
        Settings {
            focus_minutes: update.focus_time.unwrap_or(self.focus_minutes),
            short_break_minutes: update.short_break.unwrap_or(self.short_break_minutes),
            long_break_minutes: update.long_break.unwrap_or(self.long_break_minutes),
            long_break_interval: update
                .long_break_interval
                .unwrap_or(self.long_break_interval),
            auto_start_next: update.auto_start.unwrap_or(self.auto_start_next),
            notifications_enabled: update.notifications.unwrap_or(self.notifications_enabled),
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range("Focus time", FOCUS_MINUTES, self.focus_minutes)?;
        check_range("Short break", SHORT_BREAK_MINUTES, self.short_break_minutes)?;
        check_range("Long break", LONG_BREAK_MINUTES, self.long_break_minutes)?;
        check_range(
            "Long break interval",
            LONG_BREAK_INTERVAL,
            self.long_break_interval,
        )?;
        if self.long_break_minutes <= self.short_break_minutes {
            return Err(SettingsError::LongBreakNotLonger);
        }
        Ok(())
    }

    /// Length of one full cycle: every focus session, the short breaks
    /// between them and the closing long break.
    pub fn cycle_minutes(&self) -> u32 {
        self.focus_minutes * self.long_break_interval
            + self.short_break_minutes * self.long_break_interval.saturating_sub(1)
            + self.long_break_minutes
    }

    pub fn cycle_preview(&self) -> String {
        let total = self.cycle_minutes();
        format!(
            "Cycle preview: {} focus sessions ({}min each) + breaks = ~{}h {}m total",
            self.long_break_interval,
            self.focus_minutes,
            total / 60,
            total % 60
        )
    }
}

impl From<Settings> for SettingsUpdate {
    fn from(s: Settings) -> Self {
        SettingsUpdate {
            focus_time: Some(s.focus_minutes),
            short_break: Some(s.short_break_minutes),
            long_break: Some(s.long_break_minutes),
            long_break_interval: Some(s.long_break_interval),
            auto_start: Some(s.auto_start_next),
            notifications: Some(s.notifications_enabled),
        }
    }
}

fn check_range(
    field: &'static str,
    range: RangeInclusive<u32>,
    value: u32,
) -> Result<(), SettingsError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            field,
            min: *range.start(),
            max: *range.end(),
            value,
        })
    }
}
