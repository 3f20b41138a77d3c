use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::panels::Tab;
use crate::theme::ThemeVariant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: ThemeVariant,
    /// Panel shown on startup.
    #[serde(default)]
    pub last_tab: Tab,
    /// Remote tarball fetched when nothing is cached locally.
    #[serde(default)]
    pub archive_url: Option<String>,
    /// Overrides the per-user cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Vendors preselected on the graphics vendor panel.
    #[serde(default = "default_vendors")]
    pub default_vendors: Vec<String>,
    /// How many entries get selected after switching OS or vendor.
    #[serde(default = "default_reset_count")]
    pub reset_count: usize,
    #[serde(default = "default_chart_height")]
    pub chart_height: f32,
}

fn default_vendors() -> Vec<String> {
    vec![
        "NVIDIA Corporation".into(),
        "Advanced Micro Devices, Inc. [AMD/ATI]".into(),
        "Intel Corporation".into(),
    ]
}
fn default_reset_count() -> usize { 5 }
fn default_chart_height() -> f32 { 520.0 }

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: ThemeVariant::CatppuccinMocha,
            last_tab: Tab::default(),
            archive_url: None,
            cache_dir: None,
            default_vendors: default_vendors(),
            reset_count: default_reset_count(),
            chart_height: default_chart_height(),
        }
    }
}

impl Preferences {
    /// Linux → ~/.config/sharescope/, Windows → AppData/Local/sharescope/
    fn config_dir() -> PathBuf {
        dirs::config_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sharescope")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("preferences.json")
    }

    pub fn load() -> Self {
        let path = Self::config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => Self::from_json(&contents),
            Err(e) => {
                debug!(path = %path.display(), "no preferences file: {e}");
                Self::default()
            }
        }
    }

    fn from_json(contents: &str) -> Self {
        let mut prefs: Self = serde_json::from_str(contents).unwrap_or_else(|e| {
            warn!("invalid preferences file, using defaults: {e}");
            Self::default()
        });
        prefs.sanitize();
        prefs
    }

    /// Clamp numeric fields and drop blank strings.
    fn sanitize(&mut self) {
        self.reset_count = self.reset_count.clamp(1, 50);
        if !self.chart_height.is_finite() {
            self.chart_height = default_chart_height();
        }
        self.chart_height = self.chart_height.clamp(240.0, 1200.0);
        if self.archive_url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            self.archive_url = None;
        }
        self.default_vendors.retain(|v| !v.trim().is_empty());
    }

    pub fn save(&self) {
        let dir = Self::config_dir();
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("failed to create config directory: {e}");
            return;
        }

        let path = Self::config_path();
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(&path, &json) {
                    warn!("failed to save preferences: {e}");
                }
            }
            Err(e) => warn!("failed to serialize preferences: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let prefs = Preferences::default();
        assert_eq!(prefs.reset_count, 5);
        assert_eq!(prefs.last_tab, Tab::Oses);
        assert_eq!(prefs.default_vendors.len(), 3);
        assert!(prefs.archive_url.is_none());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut prefs = Preferences::default();
        prefs.last_tab = Tab::Devices;
        prefs.archive_url = Some("https://example.org/agg_data.tar.gz".into());
        let json = serde_json::to_string(&prefs).unwrap();
        let loaded: Preferences = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.last_tab, Tab::Devices);
        assert_eq!(loaded.archive_url, prefs.archive_url);
        assert_eq!(loaded.theme, prefs.theme);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let prefs = Preferences::from_json(r#"{"theme":"GruvboxLight"}"#);
        assert_eq!(prefs.theme, ThemeVariant::GruvboxLight);
        assert_eq!(prefs.reset_count, 5);
        assert_eq!(prefs.default_vendors, default_vendors());
    }

    #[test]
    fn test_sanitize_clamps() {
        let prefs = Preferences::from_json(
            r#"{"theme":"CatppuccinMocha","reset_count":0,"chart_height":99999.0,"archive_url":"  "}"#,
        );
        assert_eq!(prefs.reset_count, 1);
        assert_eq!(prefs.chart_height, 1200.0);
        assert!(prefs.archive_url.is_none());
    }

    #[test]
    fn test_garbage_falls_back_to_default() {
        let prefs = Preferences::from_json("not json at all");
        assert_eq!(prefs.reset_count, 5);
    }
}
