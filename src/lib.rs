//! **astrodistro**: a grid window manager add-on with a local assistant.
//!
//! Newly created windows are assigned to the cells of a fixed `N × N` grid,
//! row by row.  Occupancy is tracked in memory and the layout is persisted
//! to JSON after every placement, so a restarted daemon can put windows
//! back where they were.  Alongside, free-form text commands are relayed,
//! strictly one at a time, to a local language model and the answers are
//! shown in a small floating widget.
//!
//! # Architecture
//!
//! The crate is organised around three core traits:
//!
//! * [`traits::DisplayServer`] abstracts window geometry and decoration so
//!   the grid logic is not coupled to any specific compositor.
//! * [`traits::Assistant`] abstracts the model server behind a synchronous
//!   text-in, text-out call.
//! * [`traits::CommandSource`] abstracts the transport that delivers
//!   commands (a Unix socket, compositor events, termination signals, …)
//!   so the main loop is not coupled to any specific IPC mechanism.
//!
//! Concrete implementations live in [`hyprland`] (Hyprland IPC),
//! [`ollama`] (Ollama HTTP API), [`ipc`] (Unix-socket command listener)
//! and [`signals`].

pub mod command;
pub mod config;
pub mod daemon;
pub mod grid;
pub mod hyprland;
pub mod ipc;
pub mod layout;
pub mod manager;
pub mod ollama;
pub mod registry;
pub mod relay;
pub mod signals;
pub mod traits;
pub mod widget;
