use std::path::{Path, PathBuf};

use log::warn;
use toml_edit::{value, DocumentMut, Item, Table};

use crate::config::Config;

const CONFIG_FILE_NAME: &str = "soundlist.toml";
const SESSION_FILE_NAME: &str = "soundlist_session.toml";

pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE_NAME)
}

pub fn session_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SESSION_FILE_NAME)
}

fn set_table_value_preserving_decor(table: &mut Table, key: &str, item: Item) {
    let existing_value_decor = table
        .get(key)
        .and_then(|current| current.as_value().map(|value| value.decor().clone()));
    table[key] = item;
    if let Some(existing_value_decor) = existing_value_decor {
        if let Some(next_value) = table[key].as_value_mut() {
            *next_value.decor_mut() = existing_value_decor;
        }
    }
}

pub fn serialize_config_with_preserved_comments(
    existing_text: &str,
    config: &Config,
) -> Result<String, String> {
    let mut document = existing_text
        .parse::<DocumentMut>()
        .map_err(|err| format!("failed to parse existing config as TOML document: {}", err))?;

    let root = document.as_table_mut();
    set_table_value_preserving_decor(root, "filter", value(config.filter.clone()));
    match &config.media_dir {
        Some(media_dir) => set_table_value_preserving_decor(
            root,
            "media_dir",
            value(media_dir.to_string_lossy().to_string()),
        ),
        None => {
            root.remove("media_dir");
        }
    }
    set_table_value_preserving_decor(root, "log_level", value(config.log_level.clone()));

    Ok(document.to_string())
}

pub fn load_config_file(path: &Path) -> Config {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(
                "Config file {} not readable ({}). Using defaults.",
                path.display(),
                err
            );
            return Config::default();
        }
    };

    match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "Failed to parse config file {} ({}). Using defaults.",
                path.display(),
                err
            );
            Config::default()
        }
    }
}

pub fn persist_config_file(config: &Config, path: &Path) {
    let existing_text = std::fs::read_to_string(path).ok();
    let config_text = if let Some(existing_text) = existing_text {
        match serialize_config_with_preserved_comments(&existing_text, config) {
            Ok(updated_text) => Some(updated_text),
            Err(err) => {
                warn!(
                    "Failed to preserve config comments for {} ({}). Falling back to plain serialization.",
                    path.display(),
                    err
                );
                toml::to_string(config).ok()
            }
        }
    } else {
        toml::to_string(config).ok()
    };

    let Some(config_text) = config_text else {
        log::error!("Failed to serialize config for {}", path.display());
        return;
    };

    if let Err(err) = std::fs::write(path, config_text) {
        log::error!("Failed to persist config to {}: {}", path.display(), err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_preserves_existing_comments() {
        let existing = "# scan filter, whitespace separated\nfilter = \".wav\" # old\nlog_level = \"debug\"\n";
        let config = Config {
            filter: "chime".to_string(),
            ..Config::default()
        };

        let updated =
            serialize_config_with_preserved_comments(existing, &config).expect("should serialize");

        assert!(updated.contains("# scan filter, whitespace separated"));
        assert!(updated.contains("\"chime\""));
        assert!(updated.contains("# old"));
    }

    #[test]
    fn test_serialize_adds_and_removes_media_dir() {
        let with_dir = Config {
            media_dir: Some(PathBuf::from("/media/sounds")),
            ..Config::default()
        };
        let updated = serialize_config_with_preserved_comments("", &with_dir)
            .expect("should serialize");
        assert!(updated.contains("/media/sounds"));

        let without_dir = Config::default();
        let updated = serialize_config_with_preserved_comments(&updated, &without_dir)
            .expect("should serialize");
        assert!(!updated.contains("media_dir"));
    }
}
