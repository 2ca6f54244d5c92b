//! Core traits that decouple astrodistro from any specific display server,
//! model server, or transport mechanism.
//!
//! Every concrete backend (Hyprland, Ollama, a Unix-socket listener, a test
//! harness, …) implements one of these traits.  The
//! [`GridWindowManager`](crate::manager::GridWindowManager) and the
//! [`CommandRelay`](crate::relay::CommandRelay) only depend on these
//! abstractions.

use crate::command::{Command, WindowId};
use crate::grid::ScreenSize;
use serde::Serialize;
use std::sync::mpsc;

/// Abstraction over the display system that shows the managed windows.
///
/// An implementation might talk to Hyprland via IPC, or it might be a
/// recording stub used in tests.  Window creation and destruction are not
/// part of this trait: they arrive as [`Command`]s from a
/// [`CommandSource`].
pub trait DisplayServer {
    /// The error type produced by this display server.
    type Error: std::error::Error + Send + 'static;

    /// Size of the screen the grid is laid over.
    fn screen_size(&self) -> Result<ScreenSize, Self::Error>;

    /// Windows that already exist, e.g. when the daemon restarts inside a
    /// running session.
    fn windows(&self) -> Result<Vec<WindowId>, Self::Error>;

    /// Remove title bar and borders.
    fn set_undecorated(&self, id: &WindowId) -> Result<(), Self::Error>;

    /// Keep the window out of taskbars and pagers.
    fn hide_from_taskbar(&self, id: &WindowId) -> Result<(), Self::Error>;

    /// Set the window opacity, `0.0` (invisible) to `1.0` (opaque).
    fn set_opacity(&self, id: &WindowId, opacity: f64) -> Result<(), Self::Error>;

    /// Move the window's top-left corner to `(x, y)`, screen-relative.
    fn move_window(&self, id: &WindowId, x: i32, y: i32) -> Result<(), Self::Error>;

    /// Resize the window to `width × height` pixels.
    fn resize_window(&self, id: &WindowId, width: u32, height: u32) -> Result<(), Self::Error>;
}

//  Assistant

/// Snapshot of an assistant's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantStatus {
    /// Whether a command is being processed right now.
    pub busy: bool,
    /// Model answering the commands.
    pub model: String,
    /// Number of messages in the trailing conversation history.
    pub history_length: usize,
}

/// A text-in, text-out assistant backend.
///
/// [`process_command`](Assistant::process_command) is synchronous; the
/// [`CommandRelay`](crate::relay::CommandRelay) calls it from its own worker
/// thread, one command at a time.
pub trait Assistant: Send + Sync {
    /// The error type produced by this assistant.
    type Error: std::error::Error + Send + 'static;

    /// Answer one command.  Implementations keep their own conversation
    /// history for context.
    fn process_command(&self, text: &str) -> Result<String, Self::Error>;

    /// Forget the conversation history.
    fn clear_history(&self);

    /// Current status.
    fn status(&self) -> AssistantStatus;
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (a Unix socket, Hyprland's
/// event stream, the process's termination signals, …) and forward parsed
/// commands into the provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    ///
    /// This method blocks the calling thread.  To run multiple sources
    /// concurrently, spawn each one on its own thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}
