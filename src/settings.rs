//! Editor settings, injected into each [`Project`](crate::project::Project) at construction.
//!
//! Stored as JSON. Missing keys take their defaults so older settings files keep loading.

use std::path::{Path, PathBuf};

use image::Rgb;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::canvas::Color;
use crate::components::history::DEFAULT_HISTORY_CAPACITY;
use crate::error::ProjectError;
use crate::view::ZoomMode;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub enabled: bool,
    pub color: [u8; 3],
    /// Grid lines appear only at or above this zoom, in percent.
    pub min_zoom_percent: u32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            color: [128, 128, 128],
            min_zoom_percent: 800,
        }
    }
}

impl GridSettings {
    pub fn color(&self) -> Color {
        Rgb(self.color)
    }

    pub fn visible_at(&self, zoom: f32) -> bool {
        self.enabled && zoom >= 2.0 && zoom * 100.0 >= self.min_zoom_percent as f32
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymmetryDefaults {
    pub horizontal: bool,
    pub vertical: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Theme name, passed through to the UI shell.
    pub theme: String,
    /// Maximum number of undo steps.
    pub history_capacity: usize,
    /// Auto-save interval in seconds (0 = disabled).
    pub autosave_seconds: u64,
    pub grid: GridSettings,
    /// Fill color for new projects.
    pub default_color: [u8; 3],
    /// Directory suggested for new project files.
    pub default_save_location: PathBuf,
    pub zoom_mode: ZoomMode,
    pub symmetry: SymmetryDefaults,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            autosave_seconds: 60,
            grid: GridSettings::default(),
            default_color: [255, 255, 255],
            default_save_location: default_projects_dir(),
            zoom_mode: ZoomMode::PowerOfTwo,
            symmetry: SymmetryDefaults::default(),
        }
    }
}

impl EditorSettings {
    pub fn default_color(&self) -> Color {
        Rgb(self.default_color)
    }

    /// Platform config location:
    ///   Linux:    `$XDG_CONFIG_HOME/beadgrid/settings.json` (or `~/.config/...`)
    ///   Windows:  `%APPDATA%\beadgrid\settings.json`
    ///   macOS:    `~/Library/Application Support/beadgrid/settings.json`
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                return Some(PathBuf::from(appdata).join("beadgrid").join(SETTINGS_FILE));
            }
        }
        #[cfg(target_os = "macos")]
        {
            if let Ok(home) = std::env::var("HOME") {
                return Some(
                    PathBuf::from(home)
                        .join("Library")
                        .join("Application Support")
                        .join("beadgrid")
                        .join(SETTINGS_FILE),
                );
            }
        }
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
            .ok()?;
        Some(config_dir.join("beadgrid").join(SETTINGS_FILE))
    }

    /// Load from the platform location, falling back to defaults on any problem.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("settings: {}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ProjectError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProjectError::FileNotFound(path.to_path_buf()),
            _ => ProjectError::ReadFailure {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        let mut settings: EditorSettings = serde_json::from_str(&text)
            .map_err(|e| ProjectError::CorruptData(format!("{}: {}", path.display(), e)))?;
        settings.history_capacity = settings.history_capacity.max(1);
        info!("settings loaded from {}", path.display());
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ProjectError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|_| ProjectError::PermissionDenied(parent.to_path_buf()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ProjectError::WriteFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| ProjectError::WriteFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self) -> Result<(), ProjectError> {
        match Self::settings_path() {
            Some(path) => self.save_to(&path),
            None => Err(ProjectError::InvalidRequest(
                "no settings directory for this platform".into(),
            )),
        }
    }
}

fn default_projects_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = EditorSettings::default();
        assert_eq!(s.history_capacity, 20);
        assert_eq!(s.autosave_seconds, 60);
        assert_eq!(s.zoom_mode, ZoomMode::PowerOfTwo);
        assert_eq!(s.default_color(), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: EditorSettings =
            serde_json::from_str(r#"{ "history_capacity": 5, "grid": { "enabled": false } }"#)
                .unwrap();
        assert_eq!(s.history_capacity, 5);
        assert!(!s.grid.enabled);
        assert_eq!(s.grid.min_zoom_percent, 800);
        assert_eq!(s.autosave_seconds, 60);
    }

    #[test]
    fn test_zoom_mode_names() {
        let s: EditorSettings = serde_json::from_str(r#"{ "zoom_mode": "continuous" }"#).unwrap();
        assert_eq!(s.zoom_mode, ZoomMode::Continuous);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = EditorSettings::default();
        s.theme = "light".into();
        s.history_capacity = 0;
        s.save_to(&path).unwrap();

        let loaded = EditorSettings::load_from(&path).unwrap();
        assert_eq!(loaded.theme, "light");
        // A zero capacity would make history useless; it is raised to 1
        assert_eq!(loaded.history_capacity, 1);
    }

    #[test]
    fn test_load_malformed_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EditorSettings::load_from(&path),
            Err(ProjectError::CorruptData(_))
        ));
    }

    #[test]
    fn test_grid_visibility_threshold() {
        let grid = GridSettings::default();
        assert!(!grid.visible_at(4.0));
        assert!(grid.visible_at(8.0));
        let off = GridSettings {
            enabled: false,
            ..GridSettings::default()
        };
        assert!(!off.visible_at(64.0));
    }
}
