//! Auto-refresh settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::CategoryKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub enabled: bool,
    /// Interval string like "30m", "1h", "1d", or raw seconds
    pub interval: String,
    /// Whether to refresh immediately when the refresher starts
    pub on_start: bool,
    /// Keys reloaded on every tick
    pub categories: Vec<CategoryKey>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: "1h".to_string(),
            on_start: true,
            categories: vec![CategoryKey::Latest],
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Result<Duration, String> {
        let secs = Self::parse_interval(&self.interval)?;
        if secs == 0 {
            return Err("Refresh interval must be greater than zero".to_string());
        }
        Ok(Duration::from_secs(secs))
    }

    /// Parse interval string like "1h", "30m", "6h", "1d"
    pub fn parse_interval(s: &str) -> Result<u64, String> {
        let s = s.trim().to_lowercase();

        if let Some(hours) = s.strip_suffix('h') {
            hours
                .parse::<u64>()
                .map(|h| h * 3600)
                .map_err(|_| format!("Invalid hours: {}", hours))
        } else if let Some(minutes) = s.strip_suffix('m') {
            minutes
                .parse::<u64>()
                .map(|m| m * 60)
                .map_err(|_| format!("Invalid minutes: {}", minutes))
        } else if let Some(days) = s.strip_suffix('d') {
            days.parse::<u64>()
                .map(|d| d * 86400)
                .map_err(|_| format!("Invalid days: {}", days))
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map_err(|_| format!("Invalid seconds: {}", secs))
        } else {
            s.parse::<u64>()
                .map_err(|_| format!("Invalid interval: {}. Use format like '1h', '30m', '1d'", s))
        }
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs % 86400 == 0 {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}
