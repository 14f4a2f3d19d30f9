//! TOML-backed settings, loaded once at startup and mutated behind a single
//! mutex thereafter.
//!
//! Grounded on `gossip-lib/src/settings.rs`'s `Settings` shape (a flat struct
//! with a `Default` impl providing every field's fallback, so a missing or
//! corrupt file still yields a usable config), adapted from the teacher's
//! LMDB-backed per-field load/save macros to a single TOML document, since
//! that's the on-disk format this overlay's settings are specified to use.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

fn default_column_order() -> Vec<String> {
    vec![
        "username".to_string(),
        "stars".to_string(),
        "fkdr".to_string(),
        "index".to_string(),
        "kdr".to_string(),
        "bblr".to_string(),
        "wlr".to_string(),
        "winstreak".to_string(),
    ]
}

fn default_rate_limit_window_seconds() -> u64 {
    60
}

fn default_rate_limit_count() -> usize {
    120
}

fn default_fetch_retry_limit() -> u32 {
    5
}

fn default_fetch_timeout_seconds() -> u64 {
    5
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .clamp(2, 16)
}

fn default_true() -> bool {
    true
}

/// Per-user settings, persisted as `settings.toml`. Every field carries a
/// `serde(default = ...)` so a hand-edited file missing keys (or an older
/// file predating a new key) still parses into a usable `Settings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// User-maintained nick -> real-username map (the mutable default layer
    /// of the `NickDatabase`).
    pub known_nicks: HashMap<String, String>,

    pub hypixel_api_key: Option<String>,
    pub antisniper_api_key: Option<String>,

    #[serde(default = "default_column_order")]
    pub column_order: Vec<String>,

    /// Which column the player table is currently sorted by.
    pub sort_column: String,

    pub show_on_tab: bool,
    pub show_on_tab_keybind: Option<String>,

    pub autowho: bool,
    pub chat_hotkey: Option<String>,

    #[serde(default = "default_fetch_retry_limit")]
    pub fetch_retry_limit: u32,
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,

    #[serde(default = "default_rate_limit_count")]
    pub rate_limit_count: usize,
    #[serde(default = "default_rate_limit_window_seconds")]
    pub rate_limit_window_seconds: u64,

    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    #[serde(default = "default_true")]
    pub autodenick_teammates: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            known_nicks: HashMap::new(),
            hypixel_api_key: None,
            antisniper_api_key: None,
            column_order: default_column_order(),
            sort_column: "index".to_string(),
            show_on_tab: true,
            show_on_tab_keybind: None,
            autowho: false,
            chat_hotkey: None,
            fetch_retry_limit: default_fetch_retry_limit(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
            rate_limit_count: default_rate_limit_count(),
            rate_limit_window_seconds: default_rate_limit_window_seconds(),
            worker_threads: default_worker_threads(),
            autodenick_teammates: true,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields `Settings::default()`
    /// (first run); a present-but-corrupt file is a hard error, since silently
    /// discarding a user's edits on a typo is worse than telling them.
    pub fn load(path: &Path) -> Result<Settings, Error> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let settings: Settings =
                    toml::from_str(&contents).map_err(|e| (e, file!(), line!()))?;
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no settings file at {}, using defaults", path.display());
                Ok(Settings::default())
            }
            Err(e) => Err((e, file!(), line!()).into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let contents = toml::to_string_pretty(self).map_err(|e| (e, file!(), line!()))?;
        std::fs::write(path, contents).map_err(|e| (e, file!(), line!()))?;
        Ok(())
    }
}
