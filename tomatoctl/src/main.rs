use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tomato_ipc::{
    format_clock, read_message, write_message, Command, IpcError, Response, SettingsUpdate,
    StatsSummary, TimerState, TimerStatus, SOCKET_PATH,
};

#[derive(Parser)]
#[command(name = "tomatoctl")]
#[command(about = "Control a running tomato timer", long_about = None)]
struct Cli {
    /// Control socket of the running timer
    #[arg(long, global = true, value_name = "PATH", default_value = SOCKET_PATH)]
    socket: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start or resume the current session
    Start,
    /// Pause the current session
    Pause,
    /// Start if paused, pause if running
    Toggle,
    /// Restart the current session from its full duration
    Reset,
    /// End the current session and move to the next one
    Skip,
    /// Show the current session
    Status,
    /// Show focus statistics
    Stats,
    /// Change timer settings
    Set {
        /// Focus session length in minutes (1-60)
        #[arg(long)]
        focus: Option<u32>,
        /// Short break length in minutes (1-30)
        #[arg(long)]
        short_break: Option<u32>,
        /// Long break length in minutes (1-60)
        #[arg(long)]
        long_break: Option<u32>,
        /// Focus sessions before a long break (2-10)
        #[arg(long)]
        interval: Option<u32>,
        #[arg(long, value_name = "BOOL")]
        auto_start: Option<bool>,
        #[arg(long, value_name = "BOOL")]
        notifications: Option<bool>,
    },
    /// Delete all recorded focus history
    ClearStats {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Start => Command::Start,
        Commands::Pause => Command::Pause,
        Commands::Toggle => Command::Toggle,
        Commands::Reset => Command::Reset,
        Commands::Skip => Command::Skip,
        Commands::Status => Command::Status,
        Commands::Stats => Command::Stats,
        Commands::Set {
            focus,
            short_break,
            long_break,
            interval,
            auto_start,
            notifications,
        } => {
            let update = SettingsUpdate {
                focus_time: focus,
                short_break,
                long_break,
                long_break_interval: interval,
                auto_start,
                notifications,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to change; pass at least one setting (see --help)");
            }
            Command::UpdateSettings(update)
        }
        Commands::ClearStats { yes } => {
            if !yes {
                anyhow::bail!("Refusing to clear statistics without --yes");
            }
            Command::ClearStats
        }
    };

    match send_command(&cli.socket, &command).await? {
        Response::Ok => println!("OK"),
        Response::Status(status) => print_status(&status),
        Response::Stats(stats) => print_stats(&stats),
        Response::Error(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn send_command(socket: &Path, cmd: &Command) -> Result<Response, IpcError> {
    let stream = UnixStream::connect(socket).await.map_err(|e| match e.kind() {
        ErrorKind::ConnectionRefused | ErrorKind::NotFound => IpcError::ConnectionRefused,
        _ => IpcError::Io(e),
    })?;
    let (reader, mut writer) = stream.into_split();

    write_message(&mut writer, cmd).await?;
    read_message(&mut BufReader::new(reader)).await
}

fn print_status(status: &TimerStatus) {
    let state = match status.state {
        TimerState::Running => "running",
        TimerState::Paused => "paused",
    };
    println!("{} ({})", status.session, state);
    println!(
        "Remaining: {} / {}",
        format_clock(status.remaining),
        format_clock(status.total)
    );
    println!("Completed focus sessions: {}", status.completed_focus);
    println!("Up next: {}", status.next_session);
}

fn print_stats(stats: &StatsSummary) {
    println!(
        "Today: {} sessions, {} minutes",
        stats.today_sessions, stats.today_minutes
    );
    println!("Streak: {} days", stats.streak);
    println!(
        "All time: {} sessions, {} minutes over {} days",
        stats.total_sessions, stats.total_minutes, stats.days_active
    );
    println!();
    for day in &stats.week {
        println!(
            "{:<12} {:>3} {}",
            day.label,
            day.sessions,
            "#".repeat(day.sessions as usize)
        );
    }
}
