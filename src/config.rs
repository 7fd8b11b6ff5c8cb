use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "STORYTUI";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub transition: TransitionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UIConfig {
    /// Character selected at startup. Empty means the first of the roster.
    #[serde(default)]
    pub default_character: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_mpv_path")]
    pub mpv_path: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mpv_path: default_mpv_path(),
            extra_args: Vec::new(),
        }
    }
}

fn default_mpv_path() -> String {
    "mpv".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaConfig {
    /// Directory media references are resolved against.
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
        }
    }
}

fn default_media_root() -> PathBuf {
    PathBuf::from("resources")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogConfig {
    /// Optional YAML file layering story sets over the built-in catalog.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionConfig {
    #[serde(default = "default_fade_out", with = "humantime_serde")]
    pub fade_out: Duration,
    #[serde(default = "default_fade_settle", with = "humantime_serde")]
    pub fade_settle: Duration,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            fade_out: default_fade_out(),
            fade_settle: default_fade_settle(),
        }
    }
}

fn default_fade_out() -> Duration {
    Duration::from_millis(300)
}

fn default_fade_settle() -> Duration {
    Duration::from_millis(50)
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
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

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

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
    if !other.ui.default_character.is_empty() {
        base.ui.default_character = other.ui.default_character;
    }

    if !other.player.mpv_path.is_empty() {
        base.player.mpv_path = other.player.mpv_path;
    }
    if !other.player.extra_args.is_empty() {
        base.player.extra_args = other.player.extra_args;
    }

    if other.media.root != default_media_root() {
        base.media.root = other.media.root;
    }

    if other.catalog.file.is_some() {
        base.catalog.file = other.catalog.file;
    }

    if other.transition.fade_out != default_fade_out() {
        base.transition.fade_out = other.transition.fade_out;
    }
    if other.transition.fade_settle != default_fade_settle() {
        base.transition.fade_settle = other.transition.fade_settle;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    if map.is_empty() {
        return Ok(Config::default());
    }

    let mut cfg = Config::default();

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "ui.default_character" => cfg.ui.default_character = value,
        "player.mpv_path" => cfg.player.mpv_path = value,
        "player.extra_args" => {
            cfg.player.extra_args = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "media.root" => cfg.media.root = PathBuf::from(value),
        "catalog.file" => cfg.catalog.file = Some(PathBuf::from(value)),
        "transition.fade_out" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.transition.fade_out = duration;
            }
        }
        "transition.fade_settle" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.transition.fade_settle = duration;
            }
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("story-tui").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(LoadOptions {
            env_prefix: Some("STORYTUI_TEST_NONE".into()),
            ..LoadOptions::default()
        })
        .unwrap();
        assert_eq!(cfg.player.mpv_path, "mpv");
        assert_eq!(cfg.transition.fade_out, Duration::from_millis(300));
        assert_eq!(cfg.transition.fade_settle, Duration::from_millis(50));
        assert_eq!(cfg.media.root, PathBuf::from("resources"));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ui:\n  default_character: Mikasa Ackerman\nplayer:\n  mpv_path: /opt/mpv/bin/mpv\ntransition:\n  fade_out: 450ms"
        )
        .unwrap();

        let cfg = load(LoadOptions {
            config_file: Some(file.path().to_path_buf()),
            env_prefix: Some("STORYTUI_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.ui.default_character, "Mikasa Ackerman");
        assert_eq!(cfg.player.mpv_path, "/opt/mpv/bin/mpv");
        assert_eq!(cfg.transition.fade_out, Duration::from_millis(450));
        // Untouched sections keep defaults.
        assert_eq!(cfg.transition.fade_settle, Duration::from_millis(50));
    }

    #[test]
    fn env_overrides() {
        env::set_var("STORYTUI_MEDIA__ROOT", "/srv/story-media");
        env::set_var("STORYTUI_TRANSITION__FADE_OUT", "200ms");
        let cfg = load(LoadOptions::default()).unwrap();
        assert_eq!(cfg.media.root, PathBuf::from("/srv/story-media"));
        assert_eq!(cfg.transition.fade_out, Duration::from_millis(200));
        env::remove_var("STORYTUI_MEDIA__ROOT");
        env::remove_var("STORYTUI_TRANSITION__FADE_OUT");
    }
}
