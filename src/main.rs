mod action;
mod app;
mod auth;
mod azure;
mod config;
mod diff;
mod error;
mod event;
mod external;
mod forge;
mod highlight;
mod loader;
mod scheduler;
mod state;
#[cfg(test)]
mod testing;
mod tui;
mod types;
mod ui;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::action::Action;
use crate::app::App;
use crate::azure::AzureDevOps;
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::error::Result;
use crate::forge::Forge;
use crate::highlight::Highlighter;
use crate::loader::DataLoader;
use crate::tui::EventHandler;

const TICK_RATE: Duration = Duration::from_secs(1);

/// Terminal dashboard for Azure DevOps pull requests and pipeline builds
#[derive(Parser, Debug)]
#[command(name = "adboard", version, about)]
struct Cli {
    /// Configuration file (JSON, or TOML with a .toml extension)
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let (config, token) = match load(&cli.config) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    tui::install_panic_hook();
    let result = run(config, token).await;
    let restored = tui::restore();

    match result.and(restored.map_err(Into::into)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("exiting after error: {}", err);
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn load(path: &Path) -> Result<(Config, String)> {
    let config = Config::load(path)?;
    config.validate()?;
    let token = auth::load_token(&config)?;
    Ok((config, token))
}

/// Log to a file under the cache directory so output never lands on the
/// alternate screen. Falls back to stderr.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file() {
        Some(file) => registry
            .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .init(),
        None => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn log_file() -> Option<File> {
    let dir = dirs::cache_dir()?.join("adboard");
    std::fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("adboard.log"))
        .ok()
}

async fn run(config: Config, token: String) -> Result<()> {
    let forge: Arc<dyn Forge> = Arc::new(AzureDevOps::new(
        config.base_url(),
        &config.organization,
        token,
    )?);
    info!(forge = forge.name(), organization = %config.organization, "starting");
    let highlighter = Arc::new(Highlighter::new());

    let mut terminal = tui::init()?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let loader = DataLoader::new(forge, &config, highlighter, action_tx);

    let mut app = App::new(&config);
    let (width, height) = crossterm::terminal::size()?;
    app.update(Action::Resize(width, height));
    loader.dispatch(app.init());

    let mut events = EventHandler::new(TICK_RATE);
    terminal.draw(|frame| ui::render(frame, &app.state))?;

    loop {
        let action = tokio::select! {
            Some(event) = events.next() => app.handle_event(event),
            Some(action) = action_rx.recv() => action,
            else => break,
        };
        if matches!(action, Action::None) {
            continue;
        }

        for command in app.update(action) {
            loader.dispatch(command);
        }
        if app.should_quit {
            break;
        }

        terminal.draw(|frame| ui::render(frame, &app.state))?;
    }

    Ok(())
}
