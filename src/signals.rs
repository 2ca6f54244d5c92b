//! Termination signals as an ordinary [`Command`].
//!
//! SIGINT and SIGTERM are blocked before any thread is spawned, so every
//! thread inherits the mask and none of them is interrupted.  A
//! [`SignalSource`] thread then waits for them synchronously and sends
//! [`Command::Shutdown`], which the main loop handles like any other
//! command.

use crate::command::Command;
use crate::traits::CommandSource;
use log::info;
use nix::sys::signal::{SigSet, Signal};
use std::sync::mpsc;

/// Error from blocking or waiting for signals.
#[derive(Debug, thiserror::Error)]
#[error("signal handling error: {0}")]
pub struct SignalError(#[from] nix::Error);

/// Block SIGINT and SIGTERM on the calling thread.
///
/// Call this first in `main`, before spawning anything.
pub fn block_termination_signals() -> Result<SigSet, SignalError> {
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGINT);
    mask.add(Signal::SIGTERM);
    mask.thread_block()?;
    Ok(mask)
}

/// A [`CommandSource`] that sends [`Command::Shutdown`] for every signal in
/// its mask.
pub struct SignalSource {
    mask: SigSet,
}

impl SignalSource {
    /// `mask` must already be blocked on the thread that calls
    /// [`run`](CommandSource::run).
    pub fn new(mask: SigSet) -> Self {
        Self { mask }
    }
}

impl CommandSource for SignalSource {
    type Error = SignalError;

    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        loop {
            let signal = self.mask.wait()?;
            info!("received {:?}, shutting down", signal);
            if sink.send(Command::Shutdown).is_err() {
                return Ok(());
            }
        }
    }
}
