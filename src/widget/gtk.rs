//! GTK4 + layer-shell assistant widget that runs on the **main thread**.
//!
//! # Widget tree
//!
//! ```text
//! window                         (layer-shell, top-right, transparent)
//! └ .assistant-widget          (vertical box)
//!     ├ .assistant-orb         (fixed-size box; .busy while processing)
//!     └ .assistant-bubble      (label with the last command or answer;
//!                               .error after a failure)
//! ```
//!
//! The orb is always shown.  The bubble appears when a command starts,
//! shows the answer, lingers, then fades out.  Timing is controlled by
//! [`WidgetConfig`]; the look is fully CSS-configurable through
//! `$XDG_CONFIG_HOME/astrodistro/style.css`.

use crate::command::Command;
use crate::config::WidgetConfig;
use crate::daemon::{Daemon, Flow};
use crate::relay::RelayEvent;
use crate::traits::{Assistant, DisplayServer};
use gtk4::prelude::*;
use gtk4::{gdk, glib};
use gtk4_layer_shell::{Edge, LayerShell};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// GTK could not be started, usually because there is no display.
#[derive(Debug, thiserror::Error)]
#[error("widget error: {0}")]
pub struct WidgetError(String);

//  Default CSS

const DEFAULT_CSS: &str = r#"
window,
window.background {
    background-color: transparent;
    background: none;
}

.assistant-orb {
    border-radius: 9999px;
    background-image: radial-gradient(circle, rgba(120, 170, 255, 0.95), rgba(40, 60, 160, 0.85));
    box-shadow: 0 0 12px rgba(80, 120, 255, 0.6);
    transition: box-shadow 300ms ease-in-out;
}

.assistant-orb.busy {
    box-shadow: 0 0 28px rgba(140, 200, 255, 0.95);
}

.assistant-bubble {
    margin-top: 10px;
    padding: 10px 14px;
    border-radius: 12px;
    background-color: rgba(0, 0, 0, 0.75);
    color: white;
}

.assistant-bubble.error {
    color: #ff9090;
}
"#;

/// Characters per line in the answer bubble.
const BUBBLE_WIDTH_CHARS: i32 = 40;

//  Bubble visibility state machine

/// Tracks the show → linger → fade-out → hidden lifecycle of the bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Visibility {
    Hidden,
    /// Shown until something starts the linger timer.
    Visible,
    Lingering(Instant),
    Fading(Instant),
}

/// Bubble state after one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    next: Visibility,
    opacity: f64,
    visible: bool,
}

/// Advance `vis` to `now`.
fn step(vis: Visibility, now: Instant, linger: Duration, fade: Duration) -> Frame {
    let shown = |next| Frame {
        next,
        opacity: 1.0,
        visible: true,
    };
    let hidden = Frame {
        next: Visibility::Hidden,
        opacity: 1.0,
        visible: false,
    };
    match vis {
        Visibility::Hidden => hidden,
        Visibility::Visible => shown(Visibility::Visible),
        Visibility::Lingering(since) => {
            if now.saturating_duration_since(since) < linger {
                shown(vis)
            } else if fade.is_zero() {
                hidden
            } else {
                shown(Visibility::Fading(now))
            }
        }
        Visibility::Fading(since) => {
            let t = (now.saturating_duration_since(since).as_secs_f64() / fade.as_secs_f64())
                .min(1.0);
            if t >= 1.0 {
                hidden
            } else {
                Frame {
                    next: vis,
                    opacity: 1.0 - t,
                    visible: true,
                }
            }
        }
    }
}

//  Widget

struct AssistantWidget {
    window: gtk4::Window,
    orb: gtk4::Box,
    bubble: gtk4::Label,
    visibility: Visibility,
    linger: Duration,
    fade: Duration,
}

impl AssistantWidget {
    fn new(config: &WidgetConfig) -> Self {
        let window = gtk4::Window::new();
        window.init_layer_shell();
        window.set_layer(gtk4_layer_shell::Layer::Top);
        window.set_namespace("astrodistro");
        window.set_keyboard_mode(gtk4_layer_shell::KeyboardMode::None);
        window.set_anchor(Edge::Top, true);
        window.set_anchor(Edge::Right, true);
        window.set_margin(Edge::Top, config.margin);
        window.set_margin(Edge::Right, config.margin);
        window.set_decorated(false);
        window.remove_css_class("background");

        let container = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
        container.add_css_class("assistant-widget");
        container.set_halign(gtk4::Align::End);

        let orb = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
        orb.add_css_class("assistant-orb");
        orb.set_size_request(config.size, config.size);
        orb.set_halign(gtk4::Align::End);
        container.append(&orb);

        let bubble = gtk4::Label::new(None);
        bubble.add_css_class("assistant-bubble");
        bubble.set_wrap(true);
        bubble.set_max_width_chars(BUBBLE_WIDTH_CHARS);
        bubble.set_xalign(0.0);
        bubble.set_halign(gtk4::Align::End);
        bubble.set_visible(false);
        container.append(&bubble);

        window.set_child(Some(&container));
        window.present();

        Self {
            window,
            orb,
            bubble,
            visibility: Visibility::Hidden,
            linger: Duration::from_millis(config.linger_ms),
            fade: Duration::from_millis(config.fade_out_ms),
        }
    }

    fn show(&mut self, text: &str, error: bool) {
        self.bubble.set_label(text);
        if error {
            self.bubble.add_css_class("error");
        } else {
            self.bubble.remove_css_class("error");
        }
        self.bubble.set_opacity(1.0);
        self.bubble.set_visible(true);
        self.window.present();
    }

    fn on_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Started(command) => {
                self.orb.add_css_class("busy");
                self.show(&format!("› {}", command), false);
                self.visibility = Visibility::Visible;
            }
            RelayEvent::Answered { response, .. } => {
                self.orb.remove_css_class("busy");
                self.show(&response, false);
                self.visibility = Visibility::Lingering(Instant::now());
            }
            RelayEvent::Failed { error, .. } => {
                self.orb.remove_css_class("busy");
                self.show(&error, true);
                self.visibility = Visibility::Lingering(Instant::now());
            }
        }
    }

    fn tick(&mut self) {
        let frame = step(self.visibility, Instant::now(), self.linger, self.fade);
        self.visibility = frame.next;
        self.bubble.set_opacity(frame.opacity);
        if self.bubble.is_visible() != frame.visible {
            self.bubble.set_visible(frame.visible);
        }
    }
}

//  Public API

/// Initialise GTK on the calling thread.
///
/// Call before [`run_main_loop`]; on failure the caller can fall back to a
/// headless loop.
pub fn init() -> Result<(), WidgetError> {
    gtk4::init().map_err(|e| WidgetError(e.to_string()))?;
    info!("GTK4 initialised on main thread");
    Ok(())
}

/// Run the GLib main loop on the **current** (main) thread.
///
/// Commands and relay events are drained every 16 ms.  The loop exits on
/// [`Command::Shutdown`] or when every command source is gone, and then
/// shuts the daemon down.
pub fn run_main_loop<D, A>(
    daemon: Daemon<D, A>,
    cmd_rx: mpsc::Receiver<Command>,
    relay_rx: mpsc::Receiver<RelayEvent>,
    css_path: Option<PathBuf>,
    config: WidgetConfig,
) where
    D: DisplayServer + 'static,
    A: Assistant + 'static,
{
    load_css(&css_path);

    let mut widget = AssistantWidget::new(&config);
    info!(
        "widget ready ({}px orb, linger {}ms, fade {}ms)",
        config.size, config.linger_ms, config.fade_out_ms
    );

    let daemon = Rc::new(RefCell::new(Some(daemon)));
    let main_loop = glib::MainLoop::new(None, false);

    {
        let daemon = daemon.clone();
        let main_loop = main_loop.clone();
        glib::timeout_add_local(Duration::from_millis(16), move || {
            // 1. Drain commands.
            let mut stop = false;
            loop {
                match cmd_rx.try_recv() {
                    Ok(cmd) => {
                        debug!("command: {:?}", cmd);
                        let flow = daemon
                            .borrow_mut()
                            .as_mut()
                            .map_or(Flow::Shutdown, |d| d.handle(cmd));
                        if flow == Flow::Shutdown {
                            stop = true;
                            break;
                        }
                    }
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => {
                        info!("all command sources closed");
                        stop = true;
                        break;
                    }
                }
            }

            // 2. Drain relay events.
            while let Ok(event) = relay_rx.try_recv() {
                widget.on_event(event);
            }

            // 3. Advance bubble visibility.
            widget.tick();

            if stop {
                main_loop.quit();
                return glib::ControlFlow::Break;
            }
            glib::ControlFlow::Continue
        });
    }

    info!("entering GLib main loop");
    main_loop.run();
    info!("GLib main loop exited");

    let finished = daemon.borrow_mut().take();
    if let Some(daemon) = finished {
        daemon.shutdown();
    }
}

//  CSS loading

fn load_css(css_path: &Option<PathBuf>) {
    let provider = gtk4::CssProvider::new();
    let css_content = match css_path.as_ref().filter(|p| p.exists()) {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(content) => {
                info!("user CSS: {} ({} bytes)", p.display(), content.len());
                content
            }
            Err(e) => {
                warn!("CSS read failed ({}): {}, using built-in", p.display(), e);
                DEFAULT_CSS.to_string()
            }
        },
        None => {
            debug!("no user CSS, using built-in default");
            DEFAULT_CSS.to_string()
        }
    };

    #[allow(deprecated)]
    provider.load_from_data(&css_content);

    match gdk::Display::default() {
        Some(display) => gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        ),
        None => warn!("no GDK display, CSS will not be applied"),
    }
}
