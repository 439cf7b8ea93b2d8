use crate::clock::CueKind;
use std::io::Write;
use tomato_ipc::SessionKind;
use tracing::{debug, warn};

/// Where completion notifications and audible cues end up.
pub trait Notifier: Send {
    fn notify(&self, title: &str, body: &str);
    fn cue(&self, kind: CueKind);
}

/// Desktop notifications through the platform notification daemon, cues
/// through the terminal bell.
pub struct DesktopNotifier {
    sound: bool,
}

impl DesktopNotifier {
    pub fn new(sound: bool) -> Self {
        Self { sound }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        if let Err(e) = notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("tomato")
            .show()
        {
            warn!("Failed to send notification: {}", e);
        }
    }

    fn cue(&self, kind: CueKind) {
        if !self.sound {
            return;
        }
        let mut out = std::io::stdout();
        if let Err(e) = out.write_all(b"\x07").and_then(|_| out.flush()) {
            debug!(?kind, "terminal bell unavailable: {}", e);
        }
    }
}

/// Drops everything. Used when no desktop session is around.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, title: &str, _body: &str) {
        debug!(title, "notification suppressed");
    }

    fn cue(&self, _kind: CueKind) {}
}

/// Title and body of the notification shown when `finished` ends.
pub fn completion_message(finished: SessionKind, next: SessionKind) -> (String, String) {
    (
        format!("{} Complete!", finished.label()),
        format!(
            "Time for {}. Great work! 🍅",
            next.label().to_lowercase()
        ),
    )
}
