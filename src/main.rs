//! Entry point for the **astrodistro** daemon.
//!
//! Spawns all [`CommandSource`](astrodistro::traits::CommandSource)s on
//! background threads and processes incoming commands on the main thread.
//!
//! When the `widget-gtk` feature is enabled (and `--headless` is not
//! given) the main thread runs the GLib main loop (GTK4 requires it) and
//! polls the command channel from there.  Otherwise a simple blocking loop
//! is used instead.

use astrodistro::command::Command;
use astrodistro::config::Config;
use astrodistro::daemon::{Daemon, Flow};
use astrodistro::grid::Grid;
use astrodistro::hyprland::display::HyprlandDisplay;
use astrodistro::hyprland::events::HyprlandEventSource;
use astrodistro::ipc::listener::{default_socket_path, remove_socket, UnixSocketListener};
use astrodistro::layout::LayoutStore;
use astrodistro::manager::GridWindowManager;
use astrodistro::ollama::assistant::OllamaAssistant;
use astrodistro::relay::{CommandRelay, RelayEvent};
use astrodistro::signals::{block_termination_signals, SignalSource};
use astrodistro::traits::{Assistant, CommandSource, DisplayServer};
use log::{error, info, warn};
use nix::sys::signal::SigSet;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Resolve the config directory (`$XDG_CONFIG_HOME/astrodistro`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("astrodistro")
}

/// Try to load the config from `$XDG_CONFIG_HOME/astrodistro/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    if !path.exists() {
        info!("no config file at {}, using defaults", path.display());
        return Config::default();
    }
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            Config::default()
        }
    }
}

/// Resolve the CSS stylesheet path.
#[cfg(feature = "widget-gtk")]
fn css_path() -> PathBuf {
    config_dir().join("style.css")
}

//  Main

fn main() {
    env_logger::init();

    // Before any thread exists, so every thread inherits the mask.
    let mask = match block_termination_signals() {
        Ok(mask) => mask,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let headless = std::env::args().any(|a| a == "--headless");
    let config = load_config();

    let assistant = match OllamaAssistant::connect(&config.assistant) {
        Ok(a) => Arc::new(a),
        Err(e) => {
            error!("{}", e);
            error!("start Ollama (`ollama serve`) and try again");
            std::process::exit(1);
        }
    };
    if config.assistant.pull_missing_model {
        if let Err(e) = assistant.ensure_model() {
            warn!("{}", e);
        }
    }

    let display = HyprlandDisplay::new();
    match display.screen_size() {
        Ok(size) => info!("screen is {}x{}", size.width, size.height),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }

    let store = LayoutStore::new(config.layout_path(&config_dir()));
    let mut manager = GridWindowManager::new(display, Grid::new(config.grid.size), store);
    manager.set_opacity(config.grid.opacity);
    manager.load_layout();
    match manager.adopt_existing_windows() {
        Ok(_) => {
            let restored = manager.apply_layout();
            info!("restored {} window(s) from the saved layout", restored.len());
        }
        Err(e) => warn!("cannot list existing windows: {}", e),
    }

    let widget = !headless && cfg!(feature = "widget-gtk");
    let (relay_tx, relay_rx) = relay_event_channel(widget);
    let relay = CommandRelay::spawn(
        assistant.clone(),
        Duration::from_millis(config.relay.delay_ms),
        relay_tx,
    );
    let daemon = Daemon::new(manager, assistant, relay);

    let socket_path = default_socket_path();
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx, &socket_path, mask);

    info!(
        "astrodistro running ({}x{} grid, model {})",
        config.grid.size, config.grid.size, config.assistant.model
    );
    start_event_loop(daemon, cmd_rx, relay_rx, config);
    // The listener thread is still blocked in accept.
    remove_socket(&socket_path);
    info!("bye");
}

//  Event loops

/// Relay progress is only reported when a widget will read it.
fn relay_event_channel(
    widget: bool,
) -> (
    Option<mpsc::Sender<RelayEvent>>,
    Option<mpsc::Receiver<RelayEvent>>,
) {
    if widget {
        let (tx, rx) = mpsc::channel();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    }
}

/// `relay_rx` is `None` when running headless.
#[cfg(feature = "widget-gtk")]
fn start_event_loop<D, A>(
    daemon: Daemon<D, A>,
    cmd_rx: mpsc::Receiver<Command>,
    relay_rx: Option<mpsc::Receiver<RelayEvent>>,
    config: Config,
) where
    D: DisplayServer + 'static,
    A: Assistant + 'static,
{
    use astrodistro::widget::gtk;

    let Some(relay_rx) = relay_rx else {
        return run_headless(daemon, cmd_rx);
    };
    match gtk::init() {
        Ok(()) => gtk::run_main_loop(daemon, cmd_rx, relay_rx, Some(css_path()), config.widget),
        Err(e) => {
            warn!("{}; running without the widget", e);
            // Nobody reads relay events from here on.
            drop(relay_rx);
            run_headless(daemon, cmd_rx);
        }
    }
}

#[cfg(not(feature = "widget-gtk"))]
fn start_event_loop<D, A>(
    daemon: Daemon<D, A>,
    cmd_rx: mpsc::Receiver<Command>,
    _relay_rx: Option<mpsc::Receiver<RelayEvent>>,
    _config: Config,
) where
    D: DisplayServer + 'static,
    A: Assistant + 'static,
{
    run_headless(daemon, cmd_rx);
}

fn run_headless<D, A>(mut daemon: Daemon<D, A>, cmd_rx: mpsc::Receiver<Command>)
where
    D: DisplayServer,
    A: Assistant + 'static,
{
    for cmd in cmd_rx {
        if daemon.handle(cmd) == Flow::Shutdown {
            daemon.shutdown();
            return;
        }
    }
    info!("all command sources closed, exiting");
    daemon.shutdown();
}

//  Helpers

fn spawn_source<S>(name: &'static str, mut source: S, tx: mpsc::Sender<Command>)
where
    S: CommandSource + 'static,
{
    std::thread::spawn(move || {
        if let Err(e) = source.run(tx) {
            error!("{} error: {}", name, e);
        }
    });
}

fn spawn_command_sources(tx: mpsc::Sender<Command>, socket_path: &Path, mask: SigSet) {
    spawn_source(
        "socket listener",
        UnixSocketListener::new(socket_path),
        tx.clone(),
    );
    spawn_source("window events", HyprlandEventSource::new(), tx.clone());
    spawn_source("signal handler", SignalSource::new(mask), tx);
}
