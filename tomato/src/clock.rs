//! The session clock: focus / short break / long break state machine.
//!
//! Remaining time is always recomputed from the instant the session was
//! (re)started, never decremented per tick, so late or dropped ticks cannot
//! make the countdown drift. Every time-dependent call takes `now` from the
//! caller.

use crate::ledger::FocusRecorder;
use crate::settings::Settings;
use chrono::{DateTime, Duration, Local, NaiveDate};
use tomato_ipc::{SessionKind, SettingsUpdate, TimerState, TimerStatus};
use tracing::{debug, info};

/// Delay between a completion and the automatic start of the next session,
/// so the completion feedback registers first.
pub const AUTO_START_DELAY_MS: i64 = 1000;
/// A countdown cue is requested for each of the final seconds.
pub const COUNTDOWN_CUE_SECONDS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    Start,
    Countdown,
    Complete,
}

/// Side effects requested by the clock. Drained with [`SessionClock::take_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockEvent {
    Cue(CueKind),
    SessionCompleted {
        finished: SessionKind,
        next: SessionKind,
        notify: bool,
    },
    StatsChanged {
        day: NaiveDate,
        minutes: u32,
    },
}

#[derive(Debug, Clone, Copy)]
struct PendingStart {
    due: DateTime<Local>,
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct SessionClock {
    settings: Settings,
    session: SessionKind,
    state: TimerState,
    target: u64,
    remaining: u64,
    started_at: Option<DateTime<Local>>,
    completed_focus: u32,
    session_ordinal: u32,
    generation: u64,
    pending_start: Option<PendingStart>,
    last_countdown_cue: Option<u64>,
    events: Vec<ClockEvent>,
}

impl SessionClock {
    pub fn new(settings: Settings) -> Self {
        let target = settings.duration_for(SessionKind::Focus);
        Self {
            settings,
            session: SessionKind::Focus,
            state: TimerState::Paused,
            target,
            remaining: target,
            started_at: None,
            completed_focus: 0,
            session_ordinal: 0,
            generation: 0,
            pending_start: None,
            last_countdown_cue: None,
            events: Vec::new(),
        }
    }

    /// Starts or resumes the countdown. Returns `false` if already running.
    pub fn start(&mut self, now: DateTime<Local>) -> bool {
        self.cancel_pending_start();
        self.begin(now)
    }

    /// Freezes the countdown at its last computed value.
    pub fn pause(&mut self) -> bool {
        self.cancel_pending_start();
        self.halt()
    }

    pub fn toggle(&mut self, now: DateTime<Local>) {
        if self.is_running() {
            self.pause();
        } else {
            self.start(now);
        }
    }

    /// Recomputes the remaining time and completes the session on expiry.
    pub fn tick<R>(&mut self, now: DateTime<Local>, recorder: &mut R)
    where
        R: FocusRecorder + ?Sized,
    {
        let Some(started_at) = self.started_at.filter(|_| self.is_running()) else {
            return;
        };
        let elapsed = (now - started_at).num_seconds().max(0) as u64;
        self.remaining = self.target.saturating_sub(elapsed);

        if self.remaining == 0 {
            self.complete_session(now, recorder);
        } else if self.remaining <= COUNTDOWN_CUE_SECONDS
            && self.last_countdown_cue != Some(self.remaining)
        {
            self.last_countdown_cue = Some(self.remaining);
            self.events.push(ClockEvent::Cue(CueKind::Countdown));
        }
    }

    /// Host loop entry point: fires a due auto-start, then ticks.
    pub fn advance<R>(&mut self, now: DateTime<Local>, recorder: &mut R)
    where
        R: FocusRecorder + ?Sized,
    {
        if let Some(pending) = self.pending_start {
            if now >= pending.due {
                self.pending_start = None;
                if pending.generation == self.generation {
                    info!(session = ?self.session, "auto-starting next session");
                    self.begin(now);
                }
            }
        }
        self.tick(now, recorder);
    }

    /// Back to a full countdown of the current session type, paused.
    pub fn reset(&mut self) {
        self.cancel_pending_start();
        self.halt();
        self.rearm();
    }

    /// Ends the current session now, through the same path as expiry.
    /// Skipped focus sessions are credited to the statistics.
    pub fn skip<R>(&mut self, now: DateTime<Local>, recorder: &mut R)
    where
        R: FocusRecorder + ?Sized,
    {
        self.cancel_pending_start();
        self.halt();
        self.complete_session(now, recorder);
    }

    /// Merges `update`. A paused clock picks up the new duration at once; a
    /// running countdown keeps the target it started with.
    pub fn apply_settings(&mut self, update: &SettingsUpdate) {
        self.settings = self.settings.merged(update);
        if !self.settings.auto_start_next {
            self.cancel_pending_start();
        }
        if !self.is_running() {
            self.rearm();
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> SessionKind {
        self.session
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining
    }

    pub fn target_seconds(&self) -> u64 {
        self.target
    }

    pub fn completed_focus(&self) -> u32 {
        self.completed_focus
    }

    pub fn session_ordinal(&self) -> u32 {
        self.session_ordinal
    }

    /// Fraction of the current session already elapsed.
    pub fn progress(&self) -> f64 {
        if self.target == 0 {
            return 0.0;
        }
        (self.target - self.remaining) as f64 / self.target as f64
    }

    pub fn next_session(&self) -> SessionKind {
        match self.session {
            SessionKind::Focus => {
                let interval = self.settings.long_break_interval.max(1);
                if (self.session_ordinal + 1) % interval == 0 {
                    SessionKind::LongBreak
                } else {
                    SessionKind::ShortBreak
                }
            }
            SessionKind::ShortBreak | SessionKind::LongBreak => SessionKind::Focus,
        }
    }

    pub fn pending_auto_start(&self) -> Option<DateTime<Local>> {
        self.pending_start.map(|p| p.due)
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            state: self.state,
            session: self.session,
            next_session: self.next_session(),
            remaining: self.remaining,
            total: self.target,
            completed_focus: self.completed_focus,
            progress: self.progress(),
        }
    }

    pub fn take_events(&mut self) -> Vec<ClockEvent> {
        std::mem::take(&mut self.events)
    }

    fn begin(&mut self, now: DateTime<Local>) -> bool {
        if self.is_running() {
            return false;
        }
        let elapsed = self.target.saturating_sub(self.remaining);
        self.started_at = Some(now - Duration::seconds(elapsed as i64));
        self.state = TimerState::Running;
        self.last_countdown_cue = None;
        self.events.push(ClockEvent::Cue(CueKind::Start));
        debug!(session = ?self.session, remaining = self.remaining, "timer started");
        true
    }

    fn halt(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = TimerState::Paused;
        self.started_at = None;
        debug!(session = ?self.session, remaining = self.remaining, "timer paused");
        true
    }

    fn rearm(&mut self) {
        self.target = self.settings.duration_for(self.session);
        self.remaining = self.target;
        self.last_countdown_cue = None;
    }

    fn cancel_pending_start(&mut self) {
        self.generation += 1;
        if self.pending_start.take().is_some() {
            debug!("pending auto-start cancelled");
        }
    }

    fn complete_session<R>(&mut self, now: DateTime<Local>, recorder: &mut R)
    where
        R: FocusRecorder + ?Sized,
    {
        // Paused before any side effect: later ticks cannot complete it again.
        self.halt();
        let finished = self.session;
        let next = self.next_session();
        info!(?finished, ?next, "session complete");

        self.events.push(ClockEvent::SessionCompleted {
            finished,
            next,
            notify: self.settings.notifications_enabled,
        });
        self.events.push(ClockEvent::Cue(CueKind::Complete));

        if finished.counts_toward_stats() {
            let day = now.date_naive();
            let minutes = self.settings.focus_minutes;
            recorder.record_focus_session(day, minutes);
            self.session_ordinal += 1;
            self.completed_focus += 1;
            self.events.push(ClockEvent::StatsChanged { day, minutes });
        }

        self.session = next;
        self.rearm();

        if self.settings.auto_start_next {
            self.generation += 1;
            self.pending_start = Some(PendingStart {
                due: now + Duration::milliseconds(AUTO_START_DELAY_MS),
                generation: self.generation,
            });
        }
    }
}
