//! Server configuration from environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use skyward_llm::client::{DEFAULT_CHAT_URL, DEFAULT_MODEL};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    /// Control loop rate
    pub tick_hz: f64,
    pub settle_delay_secs: f64,
    /// Tracking log file; `None` keeps the log in memory only
    pub log_path: Option<PathBuf>,
    /// WebSocket URL of the object-detection service
    pub detection_url: Option<String>,
    pub detection_retry_secs: u64,
    /// JSON file with sphere obstacles for the simulated range sensor
    pub obstacles_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3100,
            llm_url: DEFAULT_CHAT_URL.to_string(),
            llm_model: DEFAULT_MODEL.to_string(),
            llm_timeout_secs: 30,
            tick_hz: 20.0,
            settle_delay_secs: 2.0,
            log_path: Some(PathBuf::from("drone_tracking_log.txt")),
            detection_url: None,
            detection_retry_secs: 5,
            obstacles_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_value(lookup("SKYWARD_PORT")).unwrap_or(defaults.server_port),
            llm_url: lookup("SKYWARD_LLM_URL").unwrap_or(defaults.llm_url),
            llm_model: lookup("SKYWARD_LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_timeout_secs: parse_value(lookup("SKYWARD_LLM_TIMEOUT_SECS"))
                .unwrap_or(defaults.llm_timeout_secs),
            tick_hz: parse_value(lookup("SKYWARD_TICK_HZ"))
                .filter(|hz: &f64| hz.is_finite() && *hz > 0.0)
                .unwrap_or(defaults.tick_hz),
            settle_delay_secs: parse_value(lookup("SKYWARD_SETTLE_SECS"))
                .filter(|secs: &f64| secs.is_finite() && *secs >= 0.0)
                .unwrap_or(defaults.settle_delay_secs),
            log_path: match lookup("SKYWARD_LOG_PATH") {
                Some(path) if path.trim().is_empty() => None,
                Some(path) => Some(PathBuf::from(path)),
                None => defaults.log_path,
            },
            detection_url: lookup("SKYWARD_DETECTION_URL").filter(|url| !url.trim().is_empty()),
            detection_retry_secs: parse_value(lookup("SKYWARD_DETECTION_RETRY_SECS"))
                .unwrap_or(defaults.detection_retry_secs),
            obstacles_path: lookup("SKYWARD_OBSTACLES").map(PathBuf::from),
        }
    }

    /// Tick period; rates that do not map to a non-zero period use 20 Hz.
    pub fn tick_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.tick_hz)
            .ok()
            .filter(|period| !period.is_zero())
            .unwrap_or(Duration::from_millis(50))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.settle_delay_secs).unwrap_or(Duration::from_secs(2))
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn detection_retry(&self) -> Duration {
        Duration::from_secs(self.detection_retry_secs)
    }
}

fn parse_value<T: FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|raw| raw.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server_port, 3100);
        assert_eq!(config.llm_url, "http://localhost:11434/api/chat");
        assert_eq!(config.llm_model, "llama3:8b");
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.detection_retry(), Duration::from_secs(5));
    }

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn non_finite_rates_fall_back_to_defaults() {
        let config = config_from(&[("SKYWARD_TICK_HZ", "inf"), ("SKYWARD_SETTLE_SECS", "inf")]);
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert_eq!(config.settle_delay(), Duration::from_secs(2));

        let config = config_from(&[("SKYWARD_TICK_HZ", "NaN"), ("SKYWARD_SETTLE_SECS", "-1")]);
        assert_eq!(config.tick_hz, 20.0);
        assert_eq!(config.settle_delay_secs, 2.0);
    }

    #[test]
    fn out_of_range_values_never_produce_unusable_durations() {
        let config = Config {
            tick_hz: 1e12,
            settle_delay_secs: f64::INFINITY,
            ..Config::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("SKYWARD_PORT", "8080"),
            ("SKYWARD_TICK_HZ", "10"),
            ("SKYWARD_LOG_PATH", ""),
            ("SKYWARD_DETECTION_URL", "ws://localhost:8765"),
        ]);
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert!(config.log_path.is_none());
        assert_eq!(config.detection_url.as_deref(), Some("ws://localhost:8765"));
    }
}
