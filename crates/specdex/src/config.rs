//! Engine configuration.
//!
//! The document suffix and settle window are configuration inputs, not
//! negotiated by the core. A config file is optional: a missing file means
//! defaults, matching how embedders usually point the engine at a tree
//! programmatically via [`Config::new`].

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Default document suffix.
const DEFAULT_EXTENSION: &str = "md";

/// Default debounce window in milliseconds.
const DEFAULT_SETTLE_MS: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory of the spec tree.
    pub root: PathBuf,
    /// Recognized document suffix, without the dot.
    pub extension: String,
    /// Debounce window for file-system events, in milliseconds.
    pub settle_window_ms: u64,
    /// Whether discovery honors gitignore rules while walking.
    pub follow_gitignore: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extension: DEFAULT_EXTENSION.to_string(),
            settle_window_ms: DEFAULT_SETTLE_MS,
            follow_gitignore: true,
        }
    }
}

impl Config {
    /// Config for a spec tree rooted at `root`, everything else defaulted.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load from a YAML config file. A missing file yields defaults; an
    /// unreadable or unparseable one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .wrap_err_with(|| format!("Failed to read config file {}", path.display()));
            }
        };
        serde_yaml::from_str(&content)
            .wrap_err_with(|| format!("Config file {} has errors", path.display()))
    }

    /// The settle window as a [`Duration`].
    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }
}
