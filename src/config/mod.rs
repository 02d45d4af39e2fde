//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::http::DEFAULT_BASE_URL;
use crate::notifications::DEFAULT_TTL;
use crate::shared::state::DEFAULT_CONFIDENCE;
use crate::stream::{recent, DEFAULT_REFRESH};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Detection service settings
    pub service: ServiceConfig,
    /// Detection defaults
    pub detection: DetectionConfig,
    /// Notification settings
    pub notifications: NotificationConfig,
    /// Live stream settings
    pub stream: StreamConfig,
    /// Where results are written
    pub output: OutputConfig,
}

impl AppConfig {
    /// Reject values the dashboard cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.service.base_url.trim().is_empty() {
            bail!("service.base_url must not be empty");
        }
        let confidence = self.detection.default_confidence;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            bail!(
                "detection.default_confidence must be within 0.0..=1.0, got {}",
                confidence
            );
        }
        if self.notifications.ttl_ms == 0 {
            bail!("notifications.ttl_ms must be positive");
        }
        if self.stream.refresh_interval_ms == 0 {
            bail!("stream.refresh_interval_ms must be positive");
        }
        if self.stream.recent_capacity == 0 {
            bail!("stream.recent_capacity must be at least 1");
        }
        Ok(())
    }
}

/// Remote detection service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// API root, e.g. `http://localhost:5000/api`
    pub base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Confidence threshold at startup (0.0 - 1.0)
    pub default_confidence: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// How long a notification stays visible
    pub ttl_ms: u64,
}

impl NotificationConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL.as_millis() as u64,
        }
    }
}

/// Live stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Live statistics refresh period
    pub refresh_interval_ms: u64,
    /// Entries kept in the recent-events log
    pub recent_capacity: usize,
}

impl StreamConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH.as_millis() as u64,
            recent_capacity: recent::DEFAULT_CAPACITY,
        }
    }
}

/// Result output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for annotated images; nothing is saved when unset
    pub save_dir: Option<PathBuf>,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.service.base_url, "http://localhost:5000/api");
        assert!((config.detection.default_confidence - 0.5).abs() < 0.01);
        assert_eq!(config.notifications.ttl(), Duration::from_secs(5));
        assert_eq!(config.stream.refresh_interval(), Duration::from_secs(1));
        assert_eq!(config.stream.recent_capacity, 10);
        assert!(config.output.save_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.service.base_url = "http://10.0.0.7:5000/api".to_string();
        config.detection.default_confidence = 0.35;
        config.output.save_dir = Some(PathBuf::from("/tmp/results"));

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.service.base_url, "http://10.0.0.7:5000/api");
        assert!((parsed.detection.default_confidence - 0.35).abs() < 0.01);
        assert_eq!(parsed.output.save_dir, Some(PathBuf::from("/tmp/results")));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[stream]\nrecent_capacity = 25\n").unwrap();
        assert_eq!(parsed.stream.recent_capacity, 25);
        assert_eq!(parsed.stream.refresh_interval_ms, 1000);
        assert_eq!(parsed.notifications.ttl_ms, 5000);
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.notifications.ttl_ms = 8000;

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();

        let loaded = load_config(temp_file.path()).unwrap();
        assert_eq!(loaded.notifications.ttl_ms, 8000);
        assert_eq!(loaded.service.base_url, config.service.base_url);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[detection]\ndefault_confidence = 1.5").unwrap();

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("default_confidence"));
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        config.stream.recent_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.stream.refresh_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.detection.default_confidence = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.service.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
