//! Session configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes. `MOODBOARD_AUTOSAVE_MS` overrides the autosave delay.

use crate::error::ConfigError;
use mb_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const AUTOSAVE_ENV: &str = "MOODBOARD_AUTOSAVE_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period after the last element mutation before saving.
    pub autosave_delay_ms: u64,
    /// Interval of the cosmetic progress ticker.
    pub progress_tick_ms: u64,
    /// Upper bound of one random progress increment.
    pub progress_max_increment: u8,
    /// Per-call generation timeout; `None` waits indefinitely.
    pub generation_timeout_ms: Option<u64>,
    pub upload_max_bytes: usize,
    /// Lowercase, without the dot.
    pub allowed_extensions: Vec<String>,
    pub editor: EditorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: 2000,
            progress_tick_ms: 500,
            progress_max_increment: 10,
            generation_timeout_ms: None,
            upload_max_bytes: 10 * 1024 * 1024,
            allowed_extensions: ["jpg", "jpeg", "png", "gif", "webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            editor: EditorConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load from a JSON file, then apply environment overrides.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_autosave_override(std::env::var(AUTOSAVE_ENV).ok().as_deref())
    }

    fn with_autosave_override(mut self, value: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(raw) = value {
            self.autosave_delay_ms = raw.trim().parse().map_err(|_| ConfigError::Env {
                var: AUTOSAVE_ENV,
                value: raw.to_string(),
            })?;
            log::debug!("autosave delay overridden to {} ms", self.autosave_delay_ms);
        }
        Ok(self)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms.max(1))
    }

    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_ms.map(Duration::from_millis)
    }

    pub fn allows_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|e| *e == ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "progress_tick_ms": 100, "editor": { "group_drag": true } }"#)
                .unwrap();
        assert_eq!(config.progress_tick_ms, 100);
        assert_eq!(config.autosave_delay_ms, 2000);
        assert!(config.editor.group_drag);
        assert_eq!(config.editor.min_element_size, 50.0);
    }

    #[test]
    fn autosave_override_parses_millis() {
        let config = SessionConfig::default()
            .with_autosave_override(Some(" 750 "))
            .unwrap();
        assert_eq!(config.autosave_delay(), Duration::from_millis(750));

        let err = SessionConfig::default()
            .with_autosave_override(Some("soon"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: AUTOSAVE_ENV, .. }));
    }

    #[test]
    fn from_json_file_reports_missing_file() {
        let path = std::env::temp_dir().join("mb-session-config-does-not-exist.json");
        let err = SessionConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let config = SessionConfig::default();
        assert!(config.allows_extension("PNG"));
        assert!(config.allows_extension("webp"));
        assert!(!config.allows_extension("svg"));
    }
}
