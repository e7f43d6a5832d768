//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::{config_dir, data_dir};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::app::session::DEFAULT_NEW_FOLDER_NAME;
use crate::domain::model::DEFAULT_ROOT_NAME;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".dataroom/config.toml";
static FALLBACK_STORAGE_DIR: &str = ".dataroom/storage";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Storage {
    #[serde(default)]
    dir: Option<String>,
    #[serde(default)]
    quota_bytes: Option<u64>,
}

impl Storage {
    fn default_quota_bytes() -> u64 {
        5 * 1024 * 1024
    }

    /// Directory holding the storage slots.
    pub fn dir(&self) -> PathBuf {
        match self.dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => data_dir()
                .map(|base| base.join("dataroom"))
                .unwrap_or_else(|| PathBuf::from(FALLBACK_STORAGE_DIR)),
        }
    }

    /// Quota across all slots; `None` when unlimited.
    pub fn quota_bytes(&self) -> Option<u64> {
        let quota = self.quota_bytes.unwrap_or_else(Self::default_quota_bytes);
        (quota > 0).then_some(quota)
    }

    pub fn set_dir(&mut self, dir: impl Into<String>) {
        self.dir = Some(dir.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "Defaults::default_root_name")]
    pub root_name: String,
    #[serde(default = "Defaults::default_new_folder_name")]
    pub new_folder_name: String,
}

impl Defaults {
    fn default_root_name() -> String {
        DEFAULT_ROOT_NAME.to_owned()
    }

    fn default_new_folder_name() -> String {
        DEFAULT_NEW_FOLDER_NAME.to_owned()
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            root_name: Self::default_root_name(),
            new_folder_name: Self::default_new_folder_name(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    storage_dir: Option<String>,
    quota_bytes: Option<u64>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            storage_dir: env::var("DATAROOM_STORAGE_DIR").ok(),
            quota_bytes: env::var("DATAROOM_QUOTA_BYTES")
                .ok()
                .and_then(|raw| raw.trim().parse().ok()),
        }
    }

    #[cfg(test)]
    fn for_tests(storage_dir: &str, quota_bytes: u64) -> Self {
        Self {
            storage_dir: Some(storage_dir.to_owned()),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            storage: merge_storage(self.storage, other.storage),
            defaults: merge_defaults(self.defaults, other.defaults),
        }
    }
}

fn merge_storage(mut base: Storage, overlay: Storage) -> Storage {
    if let Some(dir) = overlay.dir.filter(|dir| !dir.trim().is_empty()) {
        base.dir = Some(dir);
    }
    if let Some(quota) = overlay.quota_bytes {
        base.quota_bytes = Some(quota);
    }
    base
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        root_name: choose(base.root_name, overlay.root_name, Defaults::default_root_name),
        new_folder_name: choose(
            base.new_folder_name,
            overlay.new_folder_name,
            Defaults::default_new_folder_name,
        ),
    }
}

fn choose(base: String, overlay: String, default_fn: fn() -> String) -> String {
    if overlay != default_fn() && !overlay.trim().is_empty() {
        overlay
    } else {
        base
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("dataroom/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    Ok(Some(cwd.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(dir) = env.storage_dir.filter(|dir| !dir.trim().is_empty()) {
        config.storage.dir = Some(dir);
    }
    if let Some(quota) = env.quota_bytes {
        config.storage.quota_bytes = Some(quota);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_when_no_files() {
        let config = Config::load_with_layers(None, None, EnvOverrides::default())
            .expect("load default config");
        assert_eq!(config.defaults, Defaults::default());
        assert_eq!(config.storage.quota_bytes(), Some(5 * 1024 * 1024));
        assert!(config.storage.dir().ends_with("dataroom") || config.storage.dir().ends_with("storage"));
    }

    #[test]
    fn defaults_follow_domain_names() {
        let defaults: Defaults = toml::from_str("").expect("empty defaults table");
        assert_eq!(defaults.root_name, DEFAULT_ROOT_NAME);
        assert_eq!(defaults.new_folder_name, DEFAULT_NEW_FOLDER_NAME);
        assert_eq!(defaults, Defaults::default());
    }

    #[test]
    fn merge_global_and_workspace() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r#"
[storage]
dir = "/srv/dataroom"
[defaults]
root_name = "Deal Room"
"#,
        )?;

        let workspace_dir = temp.path().join("repo");
        fs::create_dir_all(workspace_dir.join(".dataroom"))?;
        fs::write(
            workspace_dir.join(".dataroom/config.toml"),
            r#"
[storage]
quota_bytes = 0
[defaults]
new_folder_name = "Untitled"
"#,
        )?;

        let config = Config::load_with_layers(
            Some(global),
            Some(workspace_dir.join(".dataroom/config.toml")),
            EnvOverrides::default(),
        )?;

        assert_eq!(config.storage.dir(), PathBuf::from("/srv/dataroom"));
        assert_eq!(config.storage.quota_bytes(), None);
        assert_eq!(config.defaults.root_name, "Deal Room");
        assert_eq!(config.defaults.new_folder_name, "Untitled");
        Ok(())
    }

    #[test]
    fn env_overrides_take_precedence() -> Result<()> {
        let overrides = EnvOverrides::for_tests("/tmp/slots", 1024);
        let config = Config::load_with_layers(None, None, overrides)?;
        assert_eq!(config.storage.dir(), PathBuf::from("/tmp/slots"));
        assert_eq!(config.storage.quota_bytes(), Some(1024));
        Ok(())
    }

    #[test]
    fn invalid_config_returns_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("broken.toml");
        fs::write(&file, "this is not toml")?;
        let result = Config::from_file(&file);
        assert!(result.is_err());
        Ok(())
    }
}
