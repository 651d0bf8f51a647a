use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_subjects")]
    pub subjects: Vec<String>,
    #[serde(default = "default_stats_days")]
    pub stats_days: u32,
    #[serde(default = "default_simulated_seconds")]
    pub simulated_seconds: u64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_api_base() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_user_id() -> String {
    "u1".to_string()
}
fn default_theme() -> String {
    "catppuccin-mocha".to_string()
}
fn default_utc_offset_minutes() -> i32 {
    9 * 60
}
fn default_flush_interval_secs() -> u64 {
    5
}
fn default_subjects() -> Vec<String> {
    // 국어, 수학, 영어
    vec![
        "\u{ad6d}\u{c5b4}".to_string(),
        "\u{c218}\u{d559}".to_string(),
        "\u{c601}\u{c5b4}".to_string(),
    ]
}
fn default_stats_days() -> u32 {
    7
}
fn default_simulated_seconds() -> u64 {
    60
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            user_id: default_user_id(),
            theme: default_theme(),
            utc_offset_minutes: default_utc_offset_minutes(),
            flush_interval_secs: default_flush_interval_secs(),
            subjects: default_subjects(),
            stats_days: default_stats_days(),
            simulated_seconds: default_simulated_seconds(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.normalize();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("studyquest")
            .join("config.toml")
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("studyquest")
    }

    /// Clamp values a hand-edited file can get wrong.
    pub fn normalize(&mut self) {
        // Offsets beyond +/-14h are not real zones.
        self.utc_offset_minutes = self.utc_offset_minutes.clamp(-14 * 60, 14 * 60);
        self.flush_interval_secs = self.flush_interval_secs.clamp(1, 300);
        self.stats_days = self.stats_days.clamp(1, 30);
        self.simulated_seconds = self.simulated_seconds.clamp(1, 3600);

        self.subjects.retain(|s| !s.trim().is_empty());
        if self.subjects.is_empty() {
            self.subjects = default_subjects();
        }
        if self.user_id.trim().is_empty() {
            self.user_id = default_user_id();
        }
        if self.api_base.trim().is_empty() {
            self.api_base = default_api_base();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api_base, "http://127.0.0.1:8000");
        assert_eq!(config.user_id, "u1");
        assert_eq!(config.utc_offset_minutes, 540);
        assert_eq!(config.flush_interval_secs, 5);
        assert_eq!(config.subjects.len(), 3);
    }

    #[test]
    fn test_config_partial_file_keeps_other_defaults() {
        let toml_str = r#"
api_base = "http://quests.local:9000"
user_id = "alice"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_base, "http://quests.local:9000");
        assert_eq!(config.user_id, "alice");
        assert_eq!(config.stats_days, 7);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.subjects, deserialized.subjects);
        assert_eq!(config.utc_offset_minutes, deserialized.utc_offset_minutes);
    }

    #[test]
    fn test_normalize_clamps_values() {
        let mut config = Config::default();
        config.utc_offset_minutes = 100_000;
        config.flush_interval_secs = 0;
        config.stats_days = 365;
        config.subjects = vec!["  ".to_string()];
        config.user_id = " ".to_string();
        config.normalize();

        assert_eq!(config.utc_offset_minutes, 14 * 60);
        assert_eq!(config.flush_interval_secs, 1);
        assert_eq!(config.stats_days, 30);
        assert_eq!(config.subjects, default_subjects());
        assert_eq!(config.user_id, "u1");
    }
}
