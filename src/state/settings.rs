// SPDX-License-Identifier: MPL-2.0

use crate::config::{APP_ID, DEFAULT_LIKES_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_autoplay() -> bool {
    true
}

fn default_likes_page_size() -> usize {
    DEFAULT_LIKES_PAGE_SIZE
}

/// Persistent application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// When false, feed videos never start on their own
    #[serde(default = "default_autoplay")]
    pub autoplay_videos: bool,
    /// Liked-by users revealed per chunk in the post detail view
    #[serde(default = "default_likes_page_size")]
    pub likes_page_size: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            autoplay_videos: default_autoplay(),
            likes_page_size: default_likes_page_size(),
        }
    }
}

impl AppSettings {
    /// Get the settings file path (~/.config/io.github.sethcottle.Plaza/settings.json)
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_ID);
            p.push("settings.json");
            p
        })
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(_) => Self::default(),
        }
    }

    /// Parse settings JSON, falling back to defaults if it is corrupt
    pub fn parse(contents: &str) -> Self {
        let mut settings: Self = serde_json::from_str(contents).unwrap_or_default();
        if settings.likes_page_size == 0 {
            settings.likes_page_size = DEFAULT_LIKES_PAGE_SIZE;
        }
        settings
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), String> {
        let path = Self::settings_path().ok_or("Could not determine config directory")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {e}"))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {e}"))?;

        std::fs::write(path, json).map_err(|e| format!("Failed to write settings: {e}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings = AppSettings::parse(r#"{ "autoplay_videos": false }"#);
        assert!(!settings.autoplay_videos);
        assert_eq!(settings.likes_page_size, DEFAULT_LIKES_PAGE_SIZE);
    }

    #[test]
    fn test_corrupt_file_uses_defaults() {
        assert_eq!(AppSettings::parse("{ nope"), AppSettings::default());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let settings = AppSettings::parse(r#"{ "likes_page_size": 0 }"#);
        assert_eq!(settings.likes_page_size, DEFAULT_LIKES_PAGE_SIZE);
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("plaza-settings-{}", std::process::id()));
        let path = dir.join("settings.json");
        let settings = AppSettings {
            autoplay_videos: false,
            likes_page_size: 20,
        };
        settings.save_to(&path).unwrap();
        assert_eq!(AppSettings::load_from(&path), settings);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("plaza-settings-missing/settings.json");
        assert_eq!(AppSettings::load_from(&path), AppSettings::default());
    }
}
