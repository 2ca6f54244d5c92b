//! Window lifecycle events from Hyprland's event socket.
//!
//! Hyprland broadcasts events on socket2 at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket2.sock`, one
//! `EVENT>>DATA\n` line each.  Two of them matter here:
//!
//! | Event | Data | Emitted command |
//! |-------|------|-----------------|
//! | `openwindow` | `ADDR,WORKSPACE,CLASS,TITLE` | [`Command::WindowCreated`] |
//! | `closewindow` | `ADDR` | [`Command::WindowDestroyed`] |
//!
//! Hyprland does not say what kind of window was opened.  Windows that it
//! opened floating (dialogs, pickers, popups) are reported as
//! [`WindowKind::Dialog`] so they are never forced into the grid.

use super::display::ClientJson;
use super::{ipc_json, normalize_address, socket_path, HyprlandError};
use crate::command::{Command, WindowId, WindowKind};
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::sync::mpsc;

/// A [`CommandSource`] that turns Hyprland window events into commands.
#[derive(Debug, Default)]
pub struct HyprlandEventSource;

impl HyprlandEventSource {
    pub fn new() -> Self {
        Self
    }
}

/// Parse a single event line from socket2.
fn parse_event_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(">>")
}

/// Map one event to a command.
///
/// `kind_of` decides the kind of a freshly opened window; it is only called
/// for `openwindow`.
fn parse_window_event(
    event: &str,
    data: &str,
    kind_of: impl FnOnce(&WindowId) -> WindowKind,
) -> Option<Command> {
    match event {
        "openwindow" => {
            let addr = data.split(',').next().filter(|a| !a.trim().is_empty())?;
            let id = WindowId::new(normalize_address(addr));
            let kind = kind_of(&id);
            Some(Command::WindowCreated { id, kind })
        }
        "closewindow" => {
            let addr = data.trim();
            if addr.is_empty() {
                return None;
            }
            Some(Command::WindowDestroyed(WindowId::new(normalize_address(addr))))
        }
        _ => None,
    }
}

/// Kind of `id` according to a `j/clients` snapshot.
fn kind_from_clients(clients: &[ClientJson], id: &WindowId) -> WindowKind {
    match clients
        .iter()
        .find(|c| normalize_address(&c.address) == id.as_str())
    {
        Some(c) if c.floating => WindowKind::Dialog,
        _ => WindowKind::Normal,
    }
}

fn query_kind(id: &WindowId) -> WindowKind {
    match ipc_json::<Vec<ClientJson>>("clients") {
        Ok(clients) => kind_from_clients(&clients, id),
        Err(e) => {
            debug!("could not classify {}: {}", id, e);
            WindowKind::Normal
        }
    }
}

impl CommandSource for HyprlandEventSource {
    type Error = HyprlandError;

    /// Connect to socket2 and forward window events.
    ///
    /// This method **blocks** until the socket closes.  Run it on a
    /// dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        let path = socket_path(".socket2.sock")?;
        let stream = UnixStream::connect(&path)
            .map_err(|e| HyprlandError(format!("connect to {}: {}", path.display(), e)))?;
        info!("window events connected to {}", path.display());

        for line in BufReader::new(stream).lines() {
            let line = line.map_err(|e| {
                error!("socket2 read error: {}", e);
                HyprlandError(format!("read error: {}", e))
            })?;
            let Some((event, data)) = parse_event_line(&line) else {
                continue;
            };
            if let Some(cmd) = parse_window_event(event, data, query_kind) {
                debug!("window event: {:?}", cmd);
                if sink.send(cmd).is_err() {
                    info!("sink closed, shutting down");
                    return Ok(());
                }
            }
        }

        warn!("socket2 stream ended");
        Ok(())
    }
}

//  Tests
