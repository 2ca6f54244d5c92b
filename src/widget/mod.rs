//! Floating assistant widget.
//!
//! When the `widget-gtk` feature is enabled, [`gtk::run_main_loop`] takes
//! over the main thread and drives both command processing and the widget
//! through the GLib main loop.

#[cfg(feature = "widget-gtk")]
pub mod gtk;
