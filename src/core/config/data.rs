use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_TYPING_TIMEOUT_SECS: u64 = 5;

/// Connection settings for one chat workspace.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Credential presented to the chat service.
    #[serde(default)]
    pub token: String,
    /// Name this client posts as on transports that do not authenticate;
    /// falls back to `$USER`.
    pub display_name: Option<String>,
    /// Channels joined on connect when the transport does not announce its own.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Newline-delimited JSON notification file to replay instead of a live connection.
    pub replay: Option<PathBuf>,
    /// Delay between replayed notifications.
    pub replay_delay_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Workspace used when `--workspace` is not given.
    pub default_workspace: Option<String>,
    #[serde(default)]
    pub workspaces: BTreeMap<String, WorkspaceConfig>,
    /// Turn on debug logging.
    #[serde(default)]
    pub debug: bool,
    /// Where tracing output goes; the terminal itself is owned by the UI.
    pub log_file: Option<PathBuf>,
    /// Interval of the timer producer.
    pub tick_interval_ms: Option<u64>,
    /// How long a "user is typing" indicator stays visible.
    pub typing_timeout_secs: Option<u64>,
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(
            self.tick_interval_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_TICK_INTERVAL_MS),
        )
    }

    pub fn typing_timeout(&self) -> Duration {
        Duration::from_secs(
            self.typing_timeout_secs
                .unwrap_or(DEFAULT_TYPING_TIMEOUT_SECS),
        )
    }
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
