use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::TRENDING_PAGE_SIZE;
use crate::youtube::API_KEY_ENV;

const DEFAULT_ENV_PREFIX: &str = "TUBE_TUI";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_region_code")]
    pub region_code: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            region_code: default_region_code(),
            page_size: default_page_size(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_region_code() -> String {
    "US".into()
}

fn default_page_size() -> u32 {
    TRENDING_PAGE_SIZE
}

fn default_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_user_agent() -> String {
    format!(
        "tube-tui/{} (+https://github.com/danielmerja/tube-tui)",
        env!("CARGO_PKG_VERSION")
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_video_command")]
    pub video_command: Vec<String>,
    #[serde(default = "default_video_detach")]
    pub video_detach: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            video_command: default_video_command(),
            video_detach: default_video_detach(),
        }
    }
}

fn default_video_command() -> Vec<String> {
    vec!["mpv".into(), "--fs".into(), "%URL%".into()]
}

fn default_video_detach() -> bool {
    true
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
    /// Variable holding the API key; defaults to `YOUTUBE_API_KEY`.
    pub api_key_env: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let key_var = options.api_key_env.as_deref().unwrap_or(API_KEY_ENV);
    if let Ok(key) = env::var(key_var) {
        if !key.trim().is_empty() {
            cfg.catalog.api_key = key.trim().to_string();
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    for (key, value) in load_env(prefix) {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.catalog.api_key.is_empty() {
        base.catalog.api_key = other.catalog.api_key;
    }
    if !other.catalog.base_url.is_empty() {
        base.catalog.base_url = other.catalog.base_url;
    }
    if !other.catalog.region_code.is_empty() {
        base.catalog.region_code = other.catalog.region_code;
    }
    if other.catalog.page_size != 0 {
        base.catalog.page_size = other.catalog.page_size;
    }
    if !other.catalog.timeout.is_zero() {
        base.catalog.timeout = other.catalog.timeout;
    }
    if !other.catalog.user_agent.is_empty() {
        base.catalog.user_agent = other.catalog.user_agent;
    }

    if !other.player.video_command.is_empty() {
        base.player.video_command = other.player.video_command;
    }
    base.player.video_detach = other.player.video_detach;

    base
}

fn load_env(prefix: &str) -> HashMap<String, String> {
    let upper_prefix = format!("{}_", prefix.to_uppercase());
    env::vars()
        .filter_map(|(key, value)| {
            key.strip_prefix(&upper_prefix)
                .map(|stripped| (stripped.to_ascii_lowercase().replace("__", "."), value))
        })
        .collect()
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "catalog.api_key" => cfg.catalog.api_key = value.trim().to_string(),
        "catalog.base_url" => cfg.catalog.base_url = value,
        "catalog.region_code" => cfg.catalog.region_code = value,
        "catalog.user_agent" => cfg.catalog.user_agent = value,
        "catalog.page_size" => {
            if let Ok(parsed) = value.parse::<u32>() {
                if parsed > 0 {
                    cfg.catalog.page_size = parsed;
                }
            }
        }
        "catalog.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.catalog.timeout = duration;
            }
        }
        "player.video_command" => {
            cfg.player.video_command = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "player.video_detach" => {
            cfg.player.video_detach = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tube-tui").join("config.yaml"))
}

/// Writes the API key into the config file, keeping every other setting.
pub fn save_api_key(path: Option<PathBuf>, api_key: &str) -> Result<PathBuf> {
    let api_key = api_key.trim();
    anyhow::ensure!(!api_key.is_empty(), "config: catalog.api_key is required");

    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    let mut cfg = if path.exists() {
        read_config_file(&path)?
    } else {
        Config::default()
    };
    cfg.catalog.api_key = api_key.to_string();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(&cfg).context("config: failed to serialize config")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated(prefix: &str, config_file: Option<PathBuf>) -> LoadOptions {
        LoadOptions {
            config_file,
            env_prefix: Some(prefix.to_string()),
            api_key_env: Some(format!("{prefix}_KEY_UNSET")),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let dir = tempdir().unwrap();
        let cfg = load(isolated(
            "TUBE_TUI_TEST_DEFAULTS",
            Some(dir.path().join("missing.yaml")),
        ))
        .unwrap();
        assert_eq!(cfg.catalog.region_code, "US");
        assert_eq!(cfg.catalog.page_size, 24);
        assert_eq!(cfg.catalog.timeout, Duration::from_secs(15));
        assert!(cfg.catalog.api_key.is_empty());
        assert_eq!(cfg.player.video_command, vec!["mpv", "--fs", "%URL%"]);
    }

    #[test]
    fn reads_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "catalog:\n  region_code: GB\n  timeout: 30s\nplayer:\n  video_detach: false\n",
        )
        .unwrap();
        let cfg = load(isolated("TUBE_TUI_TEST_FILE", Some(path))).unwrap();
        assert_eq!(cfg.catalog.region_code, "GB");
        assert_eq!(cfg.catalog.timeout, Duration::from_secs(30));
        assert!(!cfg.player.video_detach);
        assert_eq!(cfg.catalog.page_size, 24);
    }

    #[test]
    fn legacy_ui_section_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "ui:\n  theme: dracula\ncatalog:\n  region_code: FR\n").unwrap();
        let cfg = load(isolated("TUBE_TUI_TEST_LEGACY", Some(path))).unwrap();
        assert_eq!(cfg.catalog.region_code, "FR");
        assert_eq!(cfg, Config {
            catalog: CatalogConfig {
                region_code: "FR".into(),
                ..CatalogConfig::default()
            },
            player: PlayerConfig::default(),
        });
    }

    #[test]
    fn save_api_key_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        save_api_key(Some(path.clone()), "  AIza-test ").unwrap();
        let saved = read_config_file(&path).unwrap();
        assert_eq!(saved.catalog.api_key, "AIza-test");
        assert!(save_api_key(Some(path), " ").is_err());
    }

    #[test]
    fn env_overrides() {
        env::set_var("TUBE_TUI_TEST_ENV_CATALOG__REGION_CODE", "DE");
        env::set_var("TUBE_TUI_TEST_ENV_CATALOG__PAGE_SIZE", "12");
        env::set_var("TUBE_TUI_TEST_ENV_CATALOG__TIMEOUT", "2s");
        let cfg = load(isolated("TUBE_TUI_TEST_ENV", None)).unwrap();
        assert_eq!(cfg.catalog.region_code, "DE");
        assert_eq!(cfg.catalog.page_size, 12);
        assert_eq!(cfg.catalog.timeout, Duration::from_secs(2));
        env::remove_var("TUBE_TUI_TEST_ENV_CATALOG__REGION_CODE");
        env::remove_var("TUBE_TUI_TEST_ENV_CATALOG__PAGE_SIZE");
        env::remove_var("TUBE_TUI_TEST_ENV_CATALOG__TIMEOUT");
    }

    #[test]
    fn api_key_comes_from_environment() {
        env::set_var("TUBE_TUI_TEST_KEY_VAR", " from-env ");
        let cfg = load(LoadOptions {
            config_file: None,
            env_prefix: Some("TUBE_TUI_TEST_KEY".into()),
            api_key_env: Some("TUBE_TUI_TEST_KEY_VAR".into()),
        })
        .unwrap();
        assert_eq!(cfg.catalog.api_key, "from-env");
        env::remove_var("TUBE_TUI_TEST_KEY_VAR");
    }
}
