//! Unix domain socket server for IPC

use crate::app::App;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tomato_ipc::{read_message, write_message, Command, IpcError, Response};
use tracing::{debug, error, info, warn};

pub type SharedApp = Arc<Mutex<App>>;

/// Binds the socket, replacing a stale socket file left by an earlier run.
pub fn bind(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove stale socket {:?}", path))?;
    }
    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind IPC socket at {:?}", path))?;
    info!("IPC server listening on {:?}", path);
    Ok(listener)
}

pub async fn serve(listener: UnixListener, app: SharedApp) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let app = app.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, app).await {
                        error!("Error handling client: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}

async fn handle_client(stream: UnixStream, app: SharedApp) -> Result<(), IpcError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let response = match read_message::<_, Command>(&mut reader).await {
        Ok(command) => {
            debug!(?command, "IPC command received");
            let mut app = app.lock().await;
            handle_command(&mut app, command, Local::now())
        }
        Err(IpcError::Serialization(e)) => {
            warn!("Malformed IPC command: {}", e);
            Response::Error(format!("Malformed command: {}", e))
        }
        Err(e) => return Err(e),
    };

    write_message(&mut writer, &response).await
}

/// Applies one control command to the app and builds the reply.
pub fn handle_command(app: &mut App, command: Command, now: DateTime<Local>) -> Response {
    match command {
        Command::Start => {
            app.start(now);
            Response::Status(app.status())
        }
        Command::Pause => {
            app.pause(now);
            Response::Status(app.status())
        }
        Command::Toggle => {
            app.toggle_timer(now);
            Response::Status(app.status())
        }
        Command::Reset => {
            app.reset_timer(now);
            Response::Status(app.status())
        }
        Command::Skip => {
            app.skip_session(now);
            Response::Status(app.status())
        }
        Command::Status => Response::Status(app.status()),
        Command::Stats => Response::Stats(app.stats_summary(now)),
        Command::UpdateSettings(update) => {
            if update.is_empty() {
                return Response::Error("No settings given".to_string());
            }
            match app.update_settings(update) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_string()),
            }
        }
        Command::ClearStats => {
            app.clear_stats();
            Response::Ok
        }
    }
}
