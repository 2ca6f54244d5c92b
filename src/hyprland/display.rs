//! [`DisplayServer`] implementation backed by Hyprland IPC.
//!
//! Every call opens a short-lived request on Hyprland's command socket.
//! Grid geometry is screen-local; it is translated to layout coordinates
//! by adding the origin of the focused monitor.

use super::{ipc_dispatch, ipc_json, HyprlandError};
use crate::command::WindowId;
use crate::grid::ScreenSize;
use crate::traits::DisplayServer;
use log::debug;
use serde::Deserialize;

/// Hyprland-backed display server.
#[derive(Debug, Default)]
pub struct HyprlandDisplay;

impl HyprlandDisplay {
    /// Create a new handle.
    ///
    /// No connection is opened eagerly.
    pub fn new() -> Self {
        Self
    }

    fn focused_monitor(&self) -> Result<MonitorJson, HyprlandError> {
        let monitors: Vec<MonitorJson> = ipc_json("monitors")?;
        pick_monitor(monitors).ok_or_else(|| HyprlandError("no monitors reported".into()))
    }
}

//  Minimal serde structs for the JSON we care about

/// Subset of the JSON object returned by `j/monitors`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MonitorJson {
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    #[serde(default = "unit_scale")]
    scale: f64,
    #[serde(default)]
    focused: bool,
}

fn unit_scale() -> f64 {
    1.0
}

/// Subset of the JSON object returned by `j/clients`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ClientJson {
    pub(crate) address: String,
    #[serde(default)]
    pub(crate) floating: bool,
}

/// The focused monitor, or the first one when none is marked focused.
fn pick_monitor(monitors: Vec<MonitorJson>) -> Option<MonitorJson> {
    let focused = monitors.iter().position(|m| m.focused).unwrap_or(0);
    monitors.into_iter().nth(focused)
}

/// Size in layout pixels: physical size divided by the monitor scale.
fn logical_size(monitor: &MonitorJson) -> ScreenSize {
    let scale = if monitor.scale > 0.0 { monitor.scale } else { 1.0 };
    ScreenSize::new(
        (monitor.width as f64 / scale).round() as u32,
        (monitor.height as f64 / scale).round() as u32,
    )
}

fn window(id: &WindowId) -> String {
    format!("address:{}", id)
}

fn setprop(id: &WindowId, prop: &str, value: &str) -> String {
    format!("setprop {} {} {}", window(id), prop, value)
}

//  DisplayServer implementation

impl DisplayServer for HyprlandDisplay {
    type Error = HyprlandError;

    fn screen_size(&self) -> Result<ScreenSize, Self::Error> {
        Ok(logical_size(&self.focused_monitor()?))
    }

    fn windows(&self) -> Result<Vec<WindowId>, Self::Error> {
        let clients: Vec<ClientJson> = ipc_json("clients")?;
        Ok(clients
            .into_iter()
            .map(|c| WindowId::new(super::normalize_address(&c.address)))
            .collect())
    }

    fn set_undecorated(&self, id: &WindowId) -> Result<(), Self::Error> {
        ipc_dispatch(&setprop(id, "decorate", "0"))
    }

    fn hide_from_taskbar(&self, id: &WindowId) -> Result<(), Self::Error> {
        // Hyprland has no skip-taskbar hint; bars list workspaces, not windows.
        debug!("hide_from_taskbar({}) is a no-op on hyprland", id);
        Ok(())
    }

    fn set_opacity(&self, id: &WindowId, opacity: f64) -> Result<(), Self::Error> {
        ipc_dispatch(&setprop(id, "alpha", &format!("{:.2}", opacity)))
    }

    fn move_window(&self, id: &WindowId, x: i32, y: i32) -> Result<(), Self::Error> {
        let monitor = self.focused_monitor()?;
        ipc_dispatch(&format!("setfloating {}", window(id)))?;
        ipc_dispatch(&format!(
            "movewindowpixel exact {} {},{}",
            monitor.x + x,
            monitor.y + y,
            window(id)
        ))
    }

    fn resize_window(&self, id: &WindowId, width: u32, height: u32) -> Result<(), Self::Error> {
        ipc_dispatch(&format!(
            "resizewindowpixel exact {} {},{}",
            width,
            height,
            window(id)
        ))
    }
}
