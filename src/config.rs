//! Engine tuning and notes-folder resolution.
//!
//! All timing knobs live here as named constants so the relationships between
//! them stay visible: the recently-saved quiescence window must exceed the
//! watcher's per-path debounce, or a self-write's notification would arrive
//! after its suppression mark expired and be misread as an external edit.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Autosave debounce for rich (rendered) editing.
pub const DEFAULT_RICH_DEBOUNCE_MS: u64 = 500;

/// Autosave debounce for raw-source editing, where edits are burstier.
pub const DEFAULT_SOURCE_DEBOUNCE_MS: u64 = 300;

/// Coalescing window for save-triggered list refreshes.
pub const DEFAULT_LIST_REFRESH_DEBOUNCE_MS: u64 = 300;

/// How long a just-written note id suppresses watcher notifications.
/// Must exceed `DEFAULT_WATCHER_DEBOUNCE_MS`.
pub const DEFAULT_QUIESCENCE_MS: u64 = 3000;

/// Per-path debounce applied by the notes-folder watcher.
pub const DEFAULT_WATCHER_DEBOUNCE_MS: u64 = 500;

/// Notes folder used when none is configured.
pub const DEFAULT_NOTES_DIR: &str = "~/Notes";

fn default_rich_debounce_ms() -> u64 {
    DEFAULT_RICH_DEBOUNCE_MS
}

fn default_source_debounce_ms() -> u64 {
    DEFAULT_SOURCE_DEBOUNCE_MS
}

fn default_list_refresh_debounce_ms() -> u64 {
    DEFAULT_LIST_REFRESH_DEBOUNCE_MS
}

fn default_quiescence_ms() -> u64 {
    DEFAULT_QUIESCENCE_MS
}

fn default_watcher_debounce_ms() -> u64 {
    DEFAULT_WATCHER_DEBOUNCE_MS
}

fn default_notes_dir() -> String {
    DEFAULT_NOTES_DIR.to_string()
}

/// Engine configuration. Deserializable so an embedder can load it from its
/// own config file; every field falls back to the defaults above.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Notes folder; `~` is expanded at resolution time.
    pub notes_dir: String,
    pub rich_debounce_ms: u64,
    pub source_debounce_ms: u64,
    pub list_refresh_debounce_ms: u64,
    pub quiescence_ms: u64,
    pub watcher_debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            notes_dir: default_notes_dir(),
            rich_debounce_ms: default_rich_debounce_ms(),
            source_debounce_ms: default_source_debounce_ms(),
            list_refresh_debounce_ms: default_list_refresh_debounce_ms(),
            quiescence_ms: default_quiescence_ms(),
            watcher_debounce_ms: default_watcher_debounce_ms(),
        }
    }
}

impl EngineConfig {
    pub fn rich_debounce(&self) -> Duration {
        Duration::from_millis(self.rich_debounce_ms)
    }

    pub fn source_debounce(&self) -> Duration {
        Duration::from_millis(self.source_debounce_ms)
    }

    pub fn list_refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.list_refresh_debounce_ms)
    }

    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }

    pub fn watcher_debounce(&self) -> Duration {
        Duration::from_millis(self.watcher_debounce_ms)
    }

    /// Absolute notes folder, honoring `SCRATCH_NOTES_DIR` over the
    /// configured value and expanding `~`.
    pub fn resolve_notes_dir(&self) -> PathBuf {
        let raw = std::env::var("SCRATCH_NOTES_DIR").unwrap_or_else(|_| self.notes_dir.clone());
        PathBuf::from(shellexpand::tilde(&raw).as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_quiescence_above_watcher_debounce() {
        let config = EngineConfig::default();
        assert!(config.quiescence() > config.watcher_debounce());
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "rich_debounce_ms": 250 }"#).unwrap();
        assert_eq!(config.rich_debounce_ms, 250);
        assert_eq!(config.quiescence_ms, DEFAULT_QUIESCENCE_MS);
        assert_eq!(config.notes_dir, DEFAULT_NOTES_DIR);
    }

    #[test]
    fn tilde_paths_expand_to_home() {
        let config = EngineConfig::default();
        let dir = config.resolve_notes_dir();
        assert!(!dir.to_string_lossy().contains('~'));
    }
}
