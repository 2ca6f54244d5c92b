//! IPC listener that accepts commands over a Unix socket.
//!
//! Scripts, key-bind helpers and speech front-ends connect to the socket
//! and send newline-delimited JSON commands.

pub mod listener;
