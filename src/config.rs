//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/astrodistro/config.json`.
//! Every section is optional; a minimal `{}` file (or no file at all) gives
//! the compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "grid": { "size": 3, "opacity": 0.85 },
//!   "layout": { "path": "/home/me/.local/state/astrodistro/layout.json" },
//!   "assistant": { "model": "mistral", "history_limit": 8 },
//!   "relay": { "delay_ms": 250 },
//!   "widget": { "linger_ms": 6000 }
//! }
//! ```

use crate::grid::DEFAULT_GRID_SIZE;
use crate::manager::DEFAULT_OPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    /// Model server connection and conversation settings.
    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    /// Floating assistant widget.  Ignored without the `widget-gtk` feature.
    #[serde(default)]
    pub widget: WidgetConfig,
}

/// Grid dimension and the look of placed windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Rows and columns of the grid.
    pub size: usize,
    /// Opacity applied to every placed window, `0.0` to `1.0`.
    pub opacity: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_SIZE,
            opacity: DEFAULT_OPACITY,
        }
    }
}

/// Where the layout file lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Explicit layout file.  `None` means `layout.json` next to the config.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Root URL of the Ollama server.
    pub base_url: String,
    pub model: String,
    /// Messages (user and assistant) kept as conversation context.
    pub history_limit: usize,
    /// Upper bound on a single generate or pull request.
    pub request_timeout_secs: u64,
    /// Pull the model at startup when the server does not have it.
    pub pull_missing_model: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama2".into(),
            history_limit: 5,
            request_timeout_secs: 120,
            pull_missing_model: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Pause between two relayed commands (ms).
    pub delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { delay_ms: 100 }
    }
}

/// Widget geometry and timing.
///
/// Durations are in **milliseconds**.  Set `fade_out_ms` to `0` for an
/// instant hide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Edge length of the orb (px).
    pub size: i32,
    /// Distance from the top-right screen corner (px).
    pub margin: i32,
    /// How long an answer stays visible before fading.
    pub linger_ms: u64,
    pub fade_out_ms: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            size: 100,
            margin: 20,
            linger_ms: 4000,
            fade_out_ms: 400,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the daemon cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.size == 0 {
            return Err(ConfigError("grid.size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.grid.opacity) {
            return Err(ConfigError(format!(
                "grid.opacity must be within 0..=1, got {}",
                self.grid.opacity
            )));
        }
        Ok(())
    }

    /// The layout file: the configured path, or `layout.json` in `config_dir`.
    pub fn layout_path(&self, config_dir: &Path) -> PathBuf {
        self.layout
            .path
            .clone()
            .unwrap_or_else(|| config_dir.join("layout.json"))
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
