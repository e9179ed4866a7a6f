//! Persistent application configuration model and defaults.

use std::path::PathBuf;

/// Built-in scan filter used until the operator sets one. Matches the common
/// audio extensions anywhere in a display name.
pub const DEFAULT_FILTER: &str = ".wav .mp3 .ogg";

/// Root configuration persisted to `soundlist.toml`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    /// Whitespace-separated substrings; a track is listed when its display
    /// name contains at least one of them.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Media store root. Falls back to the platform audio directory.
    #[serde(default)]
    pub media_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

fn default_log_level() -> String {
    "debug".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            media_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// The filter split into its substring terms, in order.
    pub fn filter_terms(&self) -> Vec<String> {
        self.filter
            .split_whitespace()
            .map(|term| term.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, DEFAULT_FILTER};

    #[test]
    fn test_default_config_has_expected_values() {
        let config = Config::default();

        assert_eq!(config.filter, DEFAULT_FILTER);
        assert_eq!(config.media_dir, None);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_partial_config_deserialization_fills_defaults() {
        let partial_config_toml = r#"
filter = "announcement chime"
"#;

        let parsed: Config = toml::from_str(partial_config_toml).expect("config should parse");
        assert_eq!(parsed.filter, "announcement chime");
        assert_eq!(parsed.media_dir, None);
        assert_eq!(parsed.log_level, "debug");
    }

    #[test]
    fn test_filter_terms_split_on_whitespace() {
        let config = Config {
            filter: "  wav\tmp3  chime ".to_string(),
            ..Config::default()
        };

        assert_eq!(config.filter_terms(), vec!["wav", "mp3", "chime"]);
        assert!(
            Config {
                filter: String::new(),
                ..Config::default()
            }
            .filter_terms()
            .is_empty()
        );
    }
}
