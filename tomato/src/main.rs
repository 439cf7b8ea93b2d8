use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tomato::app::App;
use tomato::config::{self, Config};
use tomato::ipc::server;
use tomato::notify::DesktopNotifier;
use tomato::persistence::Persistence;
use tomato::ui;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tomato", version)]
#[command(about = "Pomodoro timer with focus statistics", long_about = None)]
struct Cli {
    /// Run without the terminal UI and take commands from tomatoctl only
    #[arg(long)]
    headless: bool,
    /// Config file to use instead of the platform default
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory for settings, statistics and the log file
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    /// Load settings from a file written by the settings export
    #[arg(long, value_name = "PATH")]
    import_settings: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = match cli.data_dir {
        Some(dir) => Persistence::with_dir(dir),
        None => Persistence::new()?,
    };
    init_tracing(store.dir())?;

    let config = load_config(cli.config.as_deref());
    let socket_path = config.socket_path.clone();
    let tick_rate = config.tick_rate();
    let notifier = Box::new(DesktopNotifier::new(config.sound));
    let mut app = App::new(config, store, notifier);
    if let Some(path) = &cli.import_settings {
        app.import_settings(path)?;
        println!("Imported settings from {}", path.display());
    }
    let app = Arc::new(Mutex::new(app));

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    {
        let _guard = runtime.enter();
        match server::bind(&socket_path) {
            Ok(listener) => {
                runtime.spawn(server::serve(listener, app.clone()));
            }
            Err(e) => warn!("Control socket disabled: {:#}", e),
        }
    }

    let res = if cli.headless {
        println!("tomato running headless, control socket at {:?}", socket_path);
        runtime.block_on(run_headless(app, tick_rate))
    } else {
        run_tui(&app, tick_rate)
    };

    runtime.shutdown_background();
    let _ = fs::remove_file(&socket_path);

    if let Err(err) = &res {
        error!("Exited with error: {:#}", err);
    }
    info!("tomato stopped");
    res
}

fn init_tracing(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create data directory {:?}", dir))?;
    let log_path = dir.join("tomato.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let filter = EnvFilter::try_from_env("TOMATO_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Config {
    let loaded = match path {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    loaded.unwrap_or_else(|e| {
        warn!("{:#}; using default config", e);
        Config::default()
    })
}

fn run_tui(app: &Mutex<App>, tick_rate: Duration) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, tick_rate);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &Mutex<App>, tick_rate: Duration) -> Result<()> {
    loop {
        {
            let mut app = app.blocking_lock();
            let now = Local::now();
            app.on_tick(now);
            terminal.draw(|f| ui::draw(f, &app, now))?;
            if app.should_quit {
                return Ok(());
            }
        }

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.blocking_lock().handle_key(key, Local::now());
                }
            }
        }
    }
}

async fn run_headless(app: Arc<Mutex<App>>, tick_rate: Duration) -> Result<()> {
    info!("running headless");
    let mut interval = tokio::time::interval(tick_rate);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => app.lock().await.on_tick(Local::now()),
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to listen for ctrl-c")?;
                info!("interrupted, shutting down");
                return Ok(());
            }
        }
    }
}
