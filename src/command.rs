//! Commands and types used throughout astrodistro.
//!
//! This module defines the vocabulary that all components share:
//! [`Command`] describes every message the daemon reacts to, and
//! [`WindowId`] / [`WindowKind`] identify and classify the windows the
//! display system reports.
//!
//! Command sources send raw JSON; window kinds are parsed leniently
//! (e.g. `"normal"`, `"Dialog"`, `"splash_screen"`) and anything unknown
//! becomes [`WindowKind::Other`].

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque identifier of a window, assigned by the display system.
///
/// Stable for the lifetime of the window.  The string form is also the key
/// used in the persisted layout file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Type hint of a window.  Only [`Normal`](WindowKind::Normal) windows are
/// placed on the grid automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum WindowKind {
    #[default]
    Normal,
    Dialog,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Notification,
    Other,
}

impl WindowKind {
    /// Whether windows of this kind take part in grid placement.
    pub fn is_normal(self) -> bool {
        self == WindowKind::Normal
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKind::Normal => write!(f, "normal"),
            WindowKind::Dialog => write!(f, "dialog"),
            WindowKind::Dock => write!(f, "dock"),
            WindowKind::Toolbar => write!(f, "toolbar"),
            WindowKind::Menu => write!(f, "menu"),
            WindowKind::Utility => write!(f, "utility"),
            WindowKind::Splash => write!(f, "splash"),
            WindowKind::Notification => write!(f, "notification"),
            WindowKind::Other => write!(f, "other"),
        }
    }
}

/// Parse a window kind (case-insensitive; `_`, `-` and whitespace ignored).
fn parse_window_kind(s: &str) -> WindowKind {
    let normalized: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect();
    match normalized.as_str() {
        "normal" => WindowKind::Normal,
        "dialog" => WindowKind::Dialog,
        "dock" => WindowKind::Dock,
        "toolbar" => WindowKind::Toolbar,
        "menu" | "popupmenu" | "dropdownmenu" => WindowKind::Menu,
        "utility" => WindowKind::Utility,
        "splash" | "splashscreen" => WindowKind::Splash,
        "notification" => WindowKind::Notification,
        _ => WindowKind::Other,
    }
}

impl<'de> Deserialize<'de> for WindowKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(parse_window_kind(&s))
    }
}

/// Every message the daemon reacts to.
///
/// Commands are produced by [`CommandSource`](crate::traits::CommandSource)
/// implementations and consumed by the [`Daemon`](crate::daemon::Daemon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// The display system created a window.
    ///
    /// `kind` defaults to `normal` when omitted on the wire.
    WindowCreated {
        id: WindowId,
        #[serde(default)]
        kind: WindowKind,
    },

    /// The display system destroyed a window; its grid cell becomes free.
    WindowDestroyed(WindowId),

    /// Free-form text for the assistant, forwarded through the relay.
    Ask(String),

    /// Write the current layout to disk now.
    SaveLayout,

    /// Restore the loaded layout onto the registered windows.
    ApplyLayout,

    /// Forget the assistant's conversation history.
    ClearHistory,

    /// Log the assistant status and grid occupancy.
    Status,

    /// Save, clean up and exit.
    Shutdown,
}
