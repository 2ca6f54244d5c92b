//! Main-thread dispatcher.
//!
//! [`Daemon`] owns the window manager and the relay and routes each
//! incoming [`Command`] to one of them.  It runs on the main thread, fed by
//! the command channel that every [`CommandSource`](crate::traits::CommandSource)
//! writes to.

use crate::command::Command;
use crate::manager::{GridWindowManager, PlacementOutcome};
use crate::relay::CommandRelay;
use crate::traits::{Assistant, DisplayServer};
use log::{debug, error, info};
use std::sync::Arc;

/// Whether the main loop should keep going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

pub struct Daemon<D: DisplayServer, A: Assistant + 'static> {
    manager: GridWindowManager<D>,
    relay: CommandRelay,
    assistant: Arc<A>,
}

impl<D: DisplayServer, A: Assistant + 'static> Daemon<D, A> {
    /// `relay` must have been spawned with the same `assistant`.
    pub fn new(manager: GridWindowManager<D>, assistant: Arc<A>, relay: CommandRelay) -> Self {
        Self {
            manager,
            relay,
            assistant,
        }
    }

    pub fn manager(&self) -> &GridWindowManager<D> {
        &self.manager
    }

    pub fn assistant(&self) -> &A {
        &self.assistant
    }

    /// Process one command.
    pub fn handle(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::WindowCreated { id, kind } => {
                match self.manager.on_window_created(id.clone(), kind) {
                    Ok(PlacementOutcome::Placed { .. }) | Ok(PlacementOutcome::Ignored) => {}
                    Ok(PlacementOutcome::Skipped) => debug!("{} left floating", id),
                    Err(e) => error!("placing {}: {}", id, e),
                }
            }
            Command::WindowDestroyed(id) => {
                if !self.manager.on_window_destroyed(&id) {
                    debug!("close of untracked window {}", id);
                }
            }
            Command::Ask(text) => {
                if text.trim().is_empty() {
                    debug!("ignoring empty command");
                } else {
                    self.relay.enqueue(text);
                }
            }
            Command::SaveLayout => match self.manager.save_layout() {
                Ok(()) => info!("layout saved"),
                Err(e) => error!("failed to save layout: {}", e),
            },
            Command::ApplyLayout => {
                // Re-read so edits made to the file by hand are picked up.
                self.manager.load_layout();
                let restored = self.manager.apply_layout();
                info!("restored {} window(s)", restored.len());
            }
            Command::ClearHistory => {
                self.assistant.clear_history();
                info!("conversation history cleared");
            }
            Command::Status => {
                let status = self.assistant.status();
                info!(
                    "assistant: model={} busy={} history={}; grid: {}/{} cells used, {} window(s) tracked",
                    status.model,
                    status.busy,
                    status.history_length,
                    self.manager.registry().placed_count(),
                    self.manager.grid().capacity(),
                    self.manager.registry().len()
                );
            }
            Command::Shutdown => return Flow::Shutdown,
        }
        Flow::Continue
    }

    /// Clear the assistant history and write the final layout.
    ///
    /// Commands still queued on the relay are abandoned.
    pub fn shutdown(self) {
        info!("shutting down");
        self.assistant.clear_history();
        drop(self.manager);
        drop(self.relay);
    }
}
