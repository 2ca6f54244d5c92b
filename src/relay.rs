//! Serialised command relay to the assistant.
//!
//! Text commands from any number of producers are queued on an unbounded
//! channel and handed to the [`Assistant`] by a single worker thread, one
//! at a time and in arrival order.  Producers never block and never see an
//! error; results are reported as [`RelayEvent`]s.

use crate::traits::Assistant;
use log::{debug, error, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Pause between two relayed commands unless configured otherwise.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Progress reported by the relay worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// The worker handed `command` to the assistant.
    Started(String),
    Answered { command: String, response: String },
    Failed { command: String, error: String },
}

/// Cheap, cloneable producer side of the relay queue.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<String>,
}

impl RelayHandle {
    /// Queue `text` for the assistant.
    ///
    /// Never blocks.  If the worker is gone the command is dropped with a
    /// warning.
    pub fn enqueue(&self, text: impl Into<String>) {
        let text = text.into();
        debug!("queueing command: {}", text);
        if let Err(mpsc::SendError(text)) = self.tx.send(text) {
            warn!("relay closed, dropping command: {}", text);
        }
    }
}

/// Owns the relay worker thread.
pub struct CommandRelay {
    handle: RelayHandle,
    worker: JoinHandle<()>,
}

impl CommandRelay {
    /// Start the worker.
    ///
    /// `delay` is slept after every command.  When `events` is given, the
    /// worker reports every step through it; a dropped receiver is ignored.
    pub fn spawn<A: Assistant + 'static>(
        assistant: Arc<A>,
        delay: Duration,
        events: Option<mpsc::Sender<RelayEvent>>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<String>();
        let worker = std::thread::spawn(move || run_worker(assistant.as_ref(), rx, delay, events));
        Self {
            handle: RelayHandle { tx },
            worker,
        }
    }

    /// See [`RelayHandle::enqueue`].
    pub fn enqueue(&self, text: impl Into<String>) {
        self.handle.enqueue(text);
    }

    /// Another producer for the same queue.
    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Close the queue and wait until every pending command is processed.
    ///
    /// Blocks for as long as any [`RelayHandle`] clone is still alive.
    pub fn join(self) {
        drop(self.handle);
        if self.worker.join().is_err() {
            error!("relay worker panicked");
        }
    }
}

fn run_worker<A: Assistant>(
    assistant: &A,
    rx: mpsc::Receiver<String>,
    delay: Duration,
    events: Option<mpsc::Sender<RelayEvent>>,
) {
    let emit = |event: RelayEvent| {
        if let Some(tx) = &events {
            let _ = tx.send(event);
        }
    };

    for command in rx {
        info!("processing command: {}", command);
        emit(RelayEvent::Started(command.clone()));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            assistant
                .process_command(&command)
                .map_err(|e| e.to_string())
        }))
        .unwrap_or_else(|payload| Err(panic_message(payload.as_ref())));
        match outcome {
            Ok(response) => {
                info!("assistant: {}", response);
                emit(RelayEvent::Answered { command, response });
            }
            Err(error) => {
                error!("command {:?} failed: {}", command, error);
                emit(RelayEvent::Failed { command, error });
            }
        }
        std::thread::sleep(delay);
    }
    debug!("relay queue closed");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("assistant panicked: {}", detail)
}
