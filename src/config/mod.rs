use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Explicit runtime configuration, constructed once in `main` and passed to
/// every component. Nothing in the crate reads a global path constant.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the shared state directory tree.
    pub root: PathBuf,
    /// Sleep between response polls in a blocking producer.
    pub producer_poll: Duration,
    /// Tick of the responder's poll loop.
    pub responder_tick: Duration,
    /// How long a blocking producer waits for a response before falling back.
    pub request_timeout: Duration,
    /// Sessions older than this are removed regardless of liveness.
    pub stale_threshold: Duration,
    /// Discovery runs every Nth responder tick.
    pub discovery_every: u64,
    /// Process name discovery scans the process table for.
    pub monitored_process: String,
    /// Where the assistant keeps its per-project session logs.
    pub projects_root: PathBuf,
}

impl Config {
    /// Resolve the state root: CLI flag, then `TRAYBRIDGE_DIR`, then
    /// `~/.traybridge`.
    pub fn resolve(root_flag: Option<&Path>) -> Self {
        let root = root_flag
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("TRAYBRIDGE_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(default_root);
        Self::with_root(root)
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            producer_poll: Duration::from_millis(500),
            responder_tick: Duration::from_secs(2),
            request_timeout: Duration::from_secs(300),
            stale_threshold: Duration::from_secs(86400),
            discovery_every: 5,
            monitored_process: "claude".into(),
            projects_root: home_dir().join(".claude").join("projects"),
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"))
}

fn default_root() -> PathBuf {
    home_dir().join(".traybridge")
}

/// How elicitation (multiple-choice question) requests are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElicitationMode {
    /// Non-blocking: the request is informational, the terminal prompt
    /// handles the answer.
    #[default]
    Terminal,
    /// Blocking: the producer polls for an answer chosen in the tray.
    Menubar,
}

/// Settings shared between the responder and the hooks via `config.json`
/// in the state root. Written by the responder, read by producers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrayConfig {
    #[serde(default)]
    pub elicitation_mode: ElicitationMode,
}

impl TrayConfig {
    /// Read `config.json` from the state root. Missing or malformed files
    /// yield the defaults; producers must never fail on a bad config.
    pub fn load(config: &Config) -> Self {
        let path = config.root.join("config.json");
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        std::fs::create_dir_all(&config.root)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config.root.join("config.json"), json)?;
        Ok(())
    }
}
