use crate::clock::{ClockEvent, SessionClock};
use crate::config::Config;
use crate::ledger::StatsLedger;
use crate::notify::{completion_message, Notifier};
use crate::persistence::Persistence;
use crate::settings::{Settings, SettingsError};
use anyhow::Result;
use chrono::{DateTime, Duration, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::{Path, PathBuf};
use tomato_ipc::{SettingsUpdate, StatsSummary, TimerStatus};
use tracing::{debug, info, warn};

const MESSAGE_TTL_MS: i64 = 3000;

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tab {
    #[default]
    Timer,
    Stats,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Timer, Tab::Stats, Tab::Settings];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Timer => "Timer",
            Tab::Stats => "Stats",
            Tab::Settings => "Settings",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Timer => 0,
            Tab::Stats => 1,
            Tab::Settings => 2,
        }
    }

    fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub enum AppMode {
    #[default]
    Normal,
    Help,
    EditingField(SettingsField),
    ConfirmClearStats,
    ConfirmRestoreDefaults,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SettingsField {
    FocusTime,
    ShortBreak,
    LongBreak,
    LongBreakInterval,
    AutoStart,
    Notifications,
}

impl SettingsField {
    pub const ALL: [SettingsField; 6] = [
        SettingsField::FocusTime,
        SettingsField::ShortBreak,
        SettingsField::LongBreak,
        SettingsField::LongBreakInterval,
        SettingsField::AutoStart,
        SettingsField::Notifications,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsField::FocusTime => "Focus time (min)",
            SettingsField::ShortBreak => "Short break (min)",
            SettingsField::LongBreak => "Long break (min)",
            SettingsField::LongBreakInterval => "Sessions per long break",
            SettingsField::AutoStart => "Auto-start next session",
            SettingsField::Notifications => "Notifications",
        }
    }

    pub fn is_toggle(self) -> bool {
        matches!(self, SettingsField::AutoStart | SettingsField::Notifications)
    }

    pub fn value(self, s: &Settings) -> String {
        match self {
            SettingsField::FocusTime => s.focus_minutes.to_string(),
            SettingsField::ShortBreak => s.short_break_minutes.to_string(),
            SettingsField::LongBreak => s.long_break_minutes.to_string(),
            SettingsField::LongBreakInterval => s.long_break_interval.to_string(),
            SettingsField::AutoStart => on_off(s.auto_start_next),
            SettingsField::Notifications => on_off(s.notifications_enabled),
        }
    }

    fn set_number(self, s: &mut Settings, value: u32) {
        match self {
            SettingsField::FocusTime => s.focus_minutes = value,
            SettingsField::ShortBreak => s.short_break_minutes = value,
            SettingsField::LongBreak => s.long_break_minutes = value,
            SettingsField::LongBreakInterval => s.long_break_interval = value,
            SettingsField::AutoStart | SettingsField::Notifications => {}
        }
    }

    fn flip(self, s: &mut Settings) {
        match self {
            SettingsField::AutoStart => s.auto_start_next = !s.auto_start_next,
            SettingsField::Notifications => s.notifications_enabled = !s.notifications_enabled,
            _ => {}
        }
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

fn on_off(value: bool) -> String {
    let text = if value { "on" } else { "off" };
    text.to_string()
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug)]
pub struct StatusMessage {
    pub text: String,
    pub level: MessageLevel,
    pub expires_at: DateTime<Local>,
}

/// Owns the session clock and the statistics ledger and carries out the
/// side effects the clock requests.
pub struct App {
    pub clock: SessionClock,
    pub ledger: StatsLedger,
    pub config: Config,
    pub tab: Tab,
    pub mode: AppMode,
    pub input_buffer: String,
    /// Settings tab form; committed with `w`.
    pub settings_draft: Settings,
    pub selected_field: SettingsField,
    pub message: Option<StatusMessage>,
    pub should_quit: bool,
    store: Persistence,
    notifier: Box<dyn Notifier>,
}

impl App {
    pub fn new(config: Config, store: Persistence, notifier: Box<dyn Notifier>) -> Self {
        let settings = store.load_settings();
        let ledger = store.load_stats();
        info!(
            focus = settings.focus_minutes,
            days = ledger.iter().count(),
            "loaded settings and stats from {:?}",
            store.dir()
        );
        Self {
            clock: SessionClock::new(settings),
            ledger,
            config,
            tab: Tab::default(),
            mode: AppMode::default(),
            input_buffer: String::new(),
            settings_draft: settings,
            selected_field: SettingsField::FocusTime,
            message: None,
            should_quit: false,
            store,
            notifier,
        }
    }

    pub fn start(&mut self, now: DateTime<Local>) {
        self.clock.start(now);
        self.dispatch_events(now);
    }

    pub fn pause(&mut self, now: DateTime<Local>) {
        self.clock.pause();
        self.dispatch_events(now);
    }

    pub fn toggle_timer(&mut self, now: DateTime<Local>) {
        self.clock.toggle(now);
        self.dispatch_events(now);
    }

    pub fn reset_timer(&mut self, now: DateTime<Local>) {
        self.clock.reset();
        self.dispatch_events(now);
    }

    pub fn skip_session(&mut self, now: DateTime<Local>) {
        self.clock.skip(now, &mut self.ledger);
        self.dispatch_events(now);
    }

    /// Called from the host loop on every iteration.
    pub fn on_tick(&mut self, now: DateTime<Local>) {
        self.clock.advance(now, &mut self.ledger);
        self.dispatch_events(now);
        if self.message.as_ref().is_some_and(|m| now >= m.expires_at) {
            self.message = None;
        }
    }

    fn dispatch_events(&mut self, now: DateTime<Local>) {
        for event in self.clock.take_events() {
            match event {
                ClockEvent::Cue(kind) => self.notifier.cue(kind),
                ClockEvent::SessionCompleted {
                    finished,
                    next,
                    notify,
                } => {
                    if notify {
                        let (title, body) = completion_message(finished, next);
                        self.notifier.notify(&title, &body);
                    }
                    self.flash(
                        format!("{} complete. Up next: {}", finished, next),
                        MessageLevel::Success,
                        now,
                    );
                }
                ClockEvent::StatsChanged { day, minutes } => {
                    debug!(%day, minutes, "focus session recorded");
                    self.persist_stats();
                }
            }
        }
    }

    fn persist_stats(&self) {
        if let Err(e) = self.store.save_stats(&self.ledger) {
            warn!("Could not save stats: {:#}", e);
        }
    }

    pub fn flash(&mut self, text: impl Into<String>, level: MessageLevel, now: DateTime<Local>) {
        self.message = Some(StatusMessage {
            text: text.into(),
            level,
            expires_at: now + Duration::milliseconds(MESSAGE_TTL_MS),
        });
    }

    /// Validates the merged settings, hands them to the clock and saves them.
    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<(), SettingsError> {
        let merged = self.clock.settings().merged(&update);
        merged.validate()?;
        self.clock.apply_settings(&update);
        self.settings_draft = merged;
        if let Err(e) = self.store.save_settings(&merged) {
            warn!("Could not save settings: {:#}", e);
        }
        info!(?merged, "settings updated");
        Ok(())
    }

    pub fn clear_stats(&mut self) {
        self.ledger.clear();
        self.persist_stats();
        info!("statistics cleared");
    }

    pub fn status(&self) -> TimerStatus {
        self.clock.status()
    }

    pub fn stats_summary(&self, now: DateTime<Local>) -> StatsSummary {
        self.ledger.summary(now.date_naive())
    }

    /// Validation problem with the unsaved settings form, if any.
    pub fn draft_error(&self) -> Option<SettingsError> {
        self.settings_draft.validate().err()
    }

    pub fn export_stats(&self, now: DateTime<Local>) -> Result<PathBuf> {
        self.store
            .export_stats(&self.ledger, &self.export_dir(), now.date_naive())
    }

    pub fn export_settings(&self, now: DateTime<Local>) -> Result<PathBuf> {
        self.store
            .export_settings(self.clock.settings(), &self.export_dir(), now.date_naive())
    }

    /// Replaces the current settings with a previously exported file.
    pub fn import_settings(&mut self, path: &Path) -> Result<()> {
        let settings = self.store.import_settings(path)?;
        self.update_settings(settings.into())?;
        info!("imported settings from {:?}", path);
        Ok(())
    }

    fn export_dir(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| self.store.dir().to_path_buf())
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: DateTime<Local>) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.mode {
            AppMode::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('?')) {
                    self.mode = AppMode::Normal;
                }
            }
            AppMode::ConfirmClearStats => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.clear_stats();
                    self.mode = AppMode::Normal;
                    self.flash("History reset successfully!", MessageLevel::Success, now);
                }
                KeyCode::Char('n') | KeyCode::Esc => self.mode = AppMode::Normal,
                _ => {}
            },
            AppMode::ConfirmRestoreDefaults => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.mode = AppMode::Normal;
                    self.settings_draft = Settings::default();
                    self.save_draft(now);
                }
                KeyCode::Char('n') | KeyCode::Esc => self.mode = AppMode::Normal,
                _ => {}
            },
            AppMode::EditingField(field) => self.handle_edit_key(field, key, now),
            AppMode::Normal => self.handle_normal_key(key, now),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, now: DateTime<Local>) {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('1') => self.tab = Tab::Timer,
            KeyCode::Char('2') => self.tab = Tab::Stats,
            KeyCode::Char('3') => self.tab = Tab::Settings,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::Char('h') | KeyCode::Char('?') => self.mode = AppMode::Help,
            KeyCode::Char('t') => self.config.appearance = self.config.appearance.toggled(),
            KeyCode::Char(' ') => self.toggle_timer(now),
            KeyCode::Char('r') => self.reset_timer(now),
            KeyCode::Char('s') => self.skip_session(now),
            _ => match self.tab {
                Tab::Timer => {
                    if key.code == KeyCode::Enter {
                        self.toggle_timer(now);
                    }
                }
                Tab::Stats => self.handle_stats_key(key, now),
                Tab::Settings => self.handle_settings_key(key, now),
            },
        }
    }

    fn handle_stats_key(&mut self, key: KeyEvent, now: DateTime<Local>) {
        match key.code {
            KeyCode::Char('c') => self.mode = AppMode::ConfirmClearStats,
            KeyCode::Char('e') => match self.export_stats(now) {
                Ok(path) => self.flash(
                    format!("Stats exported to {}", path.display()),
                    MessageLevel::Success,
                    now,
                ),
                Err(e) => {
                    warn!("Stats export failed: {:#}", e);
                    self.flash("Could not export stats", MessageLevel::Error, now);
                }
            },
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent, now: DateTime<Local>) {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.selected_field = self.selected_field.next(),
            KeyCode::Up | KeyCode::Char('k') => self.selected_field = self.selected_field.prev(),
            KeyCode::Enter => {
                let field = self.selected_field;
                if field.is_toggle() {
                    field.flip(&mut self.settings_draft);
                } else {
                    self.input_buffer.clear();
                    self.mode = AppMode::EditingField(field);
                }
            }
            KeyCode::Char('w') => self.save_draft(now),
            KeyCode::Char('d') => self.mode = AppMode::ConfirmRestoreDefaults,
            KeyCode::Char('x') => match self.export_settings(now) {
                Ok(path) => self.flash(
                    format!("Settings exported to {}", path.display()),
                    MessageLevel::Success,
                    now,
                ),
                Err(e) => {
                    warn!("Settings export failed: {:#}", e);
                    self.flash("Could not export settings", MessageLevel::Error, now);
                }
            },
            KeyCode::Esc => self.settings_draft = *self.clock.settings(),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, field: SettingsField, key: KeyEvent, now: DateTime<Local>) {
        match key.code {
            KeyCode::Esc => {
                self.input_buffer.clear();
                self.mode = AppMode::Normal;
            }
            KeyCode::Enter => {
                match self.input_buffer.parse::<u32>() {
                    Ok(value) => field.set_number(&mut self.settings_draft, value),
                    Err(_) => self.flash("Please enter a number", MessageLevel::Warning, now),
                }
                self.input_buffer.clear();
                self.mode = AppMode::Normal;
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() && self.input_buffer.len() < 3 => {
                self.input_buffer.push(c);
            }
            _ => {}
        }
    }

    fn save_draft(&mut self, now: DateTime<Local>) {
        match self.update_settings(self.settings_draft.into()) {
            Ok(()) => self.flash("Settings saved successfully! 🍅", MessageLevel::Success, now),
            Err(e) => self.flash(e.to_string(), MessageLevel::Error, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::CueKind;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};
    use tempfile::{tempdir, TempDir};

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        notes: Arc<Mutex<Vec<String>>>,
        cues: Arc<Mutex<Vec<CueKind>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str) {
            self.notes.lock().unwrap().push(format!("{title} / {body}"));
        }

        fn cue(&self, kind: CueKind) {
            self.cues.lock().unwrap().push(kind);
        }
    }

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_in(dir: &TempDir) -> (App, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let app = App::new(
            Config::default(),
            Persistence::with_dir(dir.path()),
            Box::new(notifier.clone()),
        );
        (app, notifier)
    }

    #[test]
    fn natural_completion_notifies_and_persists() {
        let dir = tempdir().unwrap();
        let (mut app, notifier) = app_in(&dir);
        app.start(t0());
        app.on_tick(t0() + Duration::seconds(25 * 60));

        assert_eq!(
            notifier.notes.lock().unwrap().as_slice(),
            ["Focus Time Complete! / Time for short break. Great work! 🍅"]
        );
        assert_eq!(
            notifier.cues.lock().unwrap().as_slice(),
            [CueKind::Start, CueKind::Complete]
        );

        let saved = Persistence::with_dir(dir.path()).load_stats();
        assert_eq!(saved.day(t0().date_naive()).sessions_completed, 1);
        assert!(app.message.is_some());
    }

    #[test]
    fn notifications_can_be_turned_off() {
        let dir = tempdir().unwrap();
        let (mut app, notifier) = app_in(&dir);
        app.update_settings(SettingsUpdate {
            notifications: Some(false),
            ..Default::default()
        })
        .unwrap();
        app.skip_session(t0());
        assert!(notifier.notes.lock().unwrap().is_empty());
        assert_eq!(app.ledger.day(t0().date_naive()).minutes_focused, 25);
    }

    #[test]
    fn invalid_settings_are_rejected_before_the_clock() {
        let dir = tempdir().unwrap();
        let (mut app, _) = app_in(&dir);
        let err = app
            .update_settings(SettingsUpdate {
                long_break: Some(3),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, SettingsError::LongBreakNotLonger);
        assert_eq!(app.clock.settings().long_break_minutes, 15);
        assert!(!Persistence::with_dir(dir.path()).settings_path().exists());
    }

    #[test]
    fn settings_form_edits_and_saves() {
        let dir = tempdir().unwrap();
        let (mut app, _) = app_in(&dir);
        for code in [
            KeyCode::Char('3'),
            KeyCode::Enter,
            KeyCode::Char('3'),
            KeyCode::Char('0'),
            KeyCode::Enter,
        ] {
            app.handle_key(key(code), t0());
        }
        assert_eq!(app.settings_draft.focus_minutes, 30);
        assert_eq!(app.clock.remaining_seconds(), 25 * 60);

        app.handle_key(key(KeyCode::Char('w')), t0());
        assert_eq!(app.clock.remaining_seconds(), 30 * 60);
        assert_eq!(
            Persistence::with_dir(dir.path()).load_settings().focus_minutes,
            30
        );
    }

    #[test]
    fn toggles_flip_in_the_draft_only() {
        let dir = tempdir().unwrap();
        let (mut app, _) = app_in(&dir);
        app.handle_key(key(KeyCode::Char('3')), t0());
        for _ in 0..4 {
            app.handle_key(key(KeyCode::Char('j')), t0());
        }
        assert_eq!(app.selected_field, SettingsField::AutoStart);
        app.handle_key(key(KeyCode::Enter), t0());
        assert!(!app.settings_draft.auto_start_next);
        assert!(app.clock.settings().auto_start_next);

        app.handle_key(key(KeyCode::Esc), t0());
        assert!(app.settings_draft.auto_start_next);
    }

    #[test]
    fn clearing_history_requires_confirmation() {
        let dir = tempdir().unwrap();
        let (mut app, _) = app_in(&dir);
        app.skip_session(t0());
        assert!(!app.ledger.is_empty());

        app.handle_key(key(KeyCode::Char('2')), t0());
        app.handle_key(key(KeyCode::Char('c')), t0());
        app.handle_key(key(KeyCode::Char('n')), t0());
        assert!(!app.ledger.is_empty());

        app.handle_key(key(KeyCode::Char('c')), t0());
        app.handle_key(key(KeyCode::Char('y')), t0());
        assert!(app.ledger.is_empty());
        assert!(Persistence::with_dir(dir.path()).load_stats().is_empty());
    }

    #[test]
    fn restoring_defaults_asks_first() {
        let dir = tempdir().unwrap();
        let (mut app, _) = app_in(&dir);
        app.update_settings(SettingsUpdate {
            focus_time: Some(40),
            ..Default::default()
        })
        .unwrap();

        app.handle_key(key(KeyCode::Char('3')), t0());
        app.handle_key(key(KeyCode::Char('d')), t0());
        assert_eq!(app.mode, AppMode::ConfirmRestoreDefaults);
        app.handle_key(key(KeyCode::Esc), t0());
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.clock.settings().focus_minutes, 40);

        app.handle_key(key(KeyCode::Char('d')), t0());
        app.handle_key(key(KeyCode::Char('y')), t0());
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(*app.clock.settings(), Settings::default());
        assert_eq!(
            Persistence::with_dir(dir.path()).load_settings(),
            Settings::default()
        );
    }

    #[test]
    fn timer_keys_drive_the_clock() {
        let dir = tempdir().unwrap();
        let (mut app, _) = app_in(&dir);
        app.handle_key(key(KeyCode::Char(' ')), t0());
        assert!(app.clock.is_running());
        app.handle_key(key(KeyCode::Char(' ')), t0());
        assert!(!app.clock.is_running());
        app.handle_key(key(KeyCode::Char('s')), t0());
        assert_eq!(app.clock.session(), tomato_ipc::SessionKind::ShortBreak);
        app.handle_key(key(KeyCode::Char('q')), t0());
        assert!(app.should_quit);
    }

    #[test]
    fn exported_settings_import_into_a_fresh_app() {
        let dir = tempdir().unwrap();
        let (mut app, _) = app_in(&dir);
        app.update_settings(SettingsUpdate {
            focus_time: Some(45),
            ..Default::default()
        })
        .unwrap();
        let path = app
            .store
            .export_settings(app.clock.settings(), dir.path(), t0().date_naive())
            .unwrap();

        let other = tempdir().unwrap();
        let (mut fresh, _) = app_in(&other);
        fresh.import_settings(&path).unwrap();
        assert_eq!(fresh.clock.settings().focus_minutes, 45);
        assert_eq!(fresh.settings_draft.focus_minutes, 45);
    }

    #[test]
    fn status_message_expires() {
        let dir = tempdir().unwrap();
        let (mut app, _) = app_in(&dir);
        app.flash("hello", MessageLevel::Info, t0());
        app.on_tick(t0() + Duration::seconds(2));
        assert!(app.message.is_some());
        app.on_tick(t0() + Duration::seconds(3));
        assert!(app.message.is_none());
    }
}
