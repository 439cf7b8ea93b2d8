//! Inter-process communication between tomato and tomatoctl
//!
//! We use Unix domain sockets for local IPC. Every message is a single JSON
//! document terminated by a newline, one request and one response per
//! connection.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Commands that tomatoctl can send to tomato
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    Start,
    Pause,
    Toggle,
    Reset,
    Skip,
    Status,
    Stats,
    UpdateSettings(SettingsUpdate),
    ClearStats,
}

/// Responses from tomato back to tomatoctl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Ok,
    Status(TimerStatus),
    Stats(StatsSummary),
    Error(String),
}

/// The three kinds of interval a pomodoro cycle is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionKind {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn label(self) -> &'static str {
        match self {
            SessionKind::Focus => "Focus Time",
            SessionKind::ShortBreak => "Short Break",
            SessionKind::LongBreak => "Long Break",
        }
    }

    /// Only focus sessions are recorded in the statistics ledger.
    pub fn counts_toward_stats(self) -> bool {
        matches!(self, SessionKind::Focus)
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    Running,
    Paused,
}

/// Read-only snapshot of the session clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub state: TimerState,
    pub session: SessionKind,
    pub next_session: SessionKind,
    pub remaining: u64, // seconds
    pub total: u64,     // seconds
    pub completed_focus: u32,
    /// `(total - remaining) / total`, in `[0, 1]`
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStat {
    pub label: String,
    pub sessions: u32,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub today_sessions: u32,
    pub today_minutes: u32,
    pub streak: u32,
    pub total_sessions: u32,
    pub total_minutes: u32,
    pub days_active: u32,
    /// Oldest day first, seven entries.
    pub week: Vec<DayStat>,
}

/// Partial settings change. Absent fields keep their current value.
///
/// Field names match the persisted settings record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_break: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_break: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_break_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection refused - is tomato running?")]
    ConnectionRefused,

    #[error("Peer closed the connection before sending a message")]
    Closed,
}

pub const SOCKET_PATH: &str = "/tmp/tomato.sock";

/// Formats a second count as `mm:ss`.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Writes one newline-terminated JSON message and flushes.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut buf = serde_json::to_vec(message)?;
    buf.push(b'\n');
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one newline-terminated JSON message.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T, IpcError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(IpcError::Closed);
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn messages_survive_the_line_framing() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut server = BufReader::new(server);

        let update = SettingsUpdate {
            focus_time: Some(30),
            auto_start: Some(false),
            ..Default::default()
        };
        write_message(&mut client, &Command::UpdateSettings(update))
            .await
            .unwrap();
        write_message(&mut client, &Command::Status).await.unwrap();

        let first: Command = read_message(&mut server).await.unwrap();
        match first {
            Command::UpdateSettings(got) => assert_eq!(got, update),
            other => panic!("unexpected command {:?}", other),
        }
        let second: Command = read_message(&mut server).await.unwrap();
        assert!(matches!(second, Command::Status));
    }

    #[tokio::test]
    async fn reading_from_a_closed_peer_is_reported() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let mut reader = BufReader::new(server);
        let err = read_message::<_, Response>(&mut reader).await.unwrap_err();
        assert!(matches!(err, IpcError::Closed));
    }

    #[test]
    fn settings_update_uses_persisted_field_names() {
        let update = SettingsUpdate {
            focus_time: Some(30),
            long_break_interval: Some(3),
            ..Default::default()
        };
        let value = serde_json::to_value(update).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "focusTime": 30, "longBreakInterval": 3 })
        );
        assert!(SettingsUpdate::default().is_empty());
        assert!(!update.is_empty());
    }

    #[test]
    fn clock_format_pads_minutes_and_seconds() {
        assert_eq!(format_clock(25 * 60), "25:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(0), "00:00");
    }
}
