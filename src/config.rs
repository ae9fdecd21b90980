//! Backup configuration.
//!
//! The engine receives everything it needs through an explicit
//! [`BackupConfig`] value; there is no process-wide state. User defaults
//! can optionally be loaded from a platform-specific JSON file and are
//! merged below CLI flags.

use std::collections::BTreeSet;

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::scanner::WalkerConfig;

/// Media extensions mirrored by default (lower-cased, leading dot).
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".heic", ".mov", ".mp4", ".m4v", ".gif", ".raw", ".aaf",
];

/// Configuration for one backup run, passed explicitly to the engine.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Allow-listed extensions (lower-cased, leading dot).
    pub extensions: BTreeSet<String>,
    /// Number of I/O threads for the destination index build.
    pub io_threads: usize,
    /// Walker options shared by the source and destination traversals.
    pub walker_config: WalkerConfig,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            io_threads: 4,
            walker_config: WalkerConfig::default(),
        }
    }
}

impl BackupConfig {
    /// Replace the extension allow-list.
    ///
    /// Entries are normalized: lower-cased, leading dot added if missing.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    /// Set the I/O thread count for the index build.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Check whether a file extension qualifies for mirroring.
    ///
    /// `extension` is the lower-cased, dot-prefixed form produced by
    /// [`crate::scanner::FileEntry::extension`]; `None` (no extension)
    /// never qualifies.
    #[must_use]
    pub fn allows_extension(&self, extension: Option<&str>) -> bool {
        extension.is_some_and(|ext| self.extensions.contains(ext))
    }
}

/// Normalize a user-supplied extension to `.lowercase` form.
fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

/// User defaults persisted in the platform config directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDefaults {
    /// Extension allow-list override.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    /// I/O thread count override.
    #[serde(default)]
    pub io_threads: Option<usize>,
}

impl UserDefaults {
    /// Load user defaults from the platform-specific path.
    ///
    /// Any failure (missing file, malformed JSON) falls back to empty
    /// defaults with a debug log.
    #[must_use]
    pub fn load() -> Self {
        match Self::load_internal() {
            Ok(defaults) => defaults,
            Err(e) => {
                log::debug!("Failed to load user defaults, using built-ins: {}", e);
                Self::default()
            }
        }
    }

    fn load_internal() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let defaults = serde_json::from_str(&content)?;
        Ok(defaults)
    }

    /// Apply these defaults under an existing config (config wins only
    /// where the default is absent; CLI-derived values are applied by the
    /// caller after this).
    #[must_use]
    pub fn apply_to(&self, mut config: BackupConfig) -> BackupConfig {
        if let Some(ref extensions) = self.extensions {
            config = config.with_extensions(extensions);
        }
        if let Some(io_threads) = self.io_threads {
            config = config.with_io_threads(io_threads);
        }
        config
    }

    /// Get the default platform-specific configuration path.
    fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "mediamirror", "mediamirror")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extensions_match_media_types() {
        let config = BackupConfig::default();
        assert!(config.allows_extension(Some(".jpg")));
        assert!(config.allows_extension(Some(".heic")));
        assert!(config.allows_extension(Some(".mov")));
        assert!(!config.allows_extension(Some(".txt")));
        assert!(!config.allows_extension(None));
    }

    #[test]
    fn test_with_extensions_normalizes() {
        let config = BackupConfig::default().with_extensions(["JPG", ".Png"]);
        assert!(config.allows_extension(Some(".jpg")));
        assert!(config.allows_extension(Some(".png")));
        assert!(!config.allows_extension(Some(".mov")));
    }

    #[test]
    fn test_io_threads_floor() {
        let config = BackupConfig::default().with_io_threads(0);
        assert_eq!(config.io_threads, 1);
    }

    #[test]
    fn test_user_defaults_apply() {
        let defaults = UserDefaults {
            extensions: Some(vec!["dng".to_string()]),
            io_threads: Some(8),
        };
        let config = defaults.apply_to(BackupConfig::default());

        assert!(config.allows_extension(Some(".dng")));
        assert!(!config.allows_extension(Some(".jpg")));
        assert_eq!(config.io_threads, 8);
    }

    #[test]
    fn test_empty_user_defaults_keep_builtins() {
        let config = UserDefaults::default().apply_to(BackupConfig::default());
        assert!(config.allows_extension(Some(".jpg")));
        assert_eq!(config.io_threads, 4);
    }
}
