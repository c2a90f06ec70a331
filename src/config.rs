//! Application configuration.
//!
//! Settings come from an optional `treinamentos.toml` and are then
//! overridden by the environment variables the hosted deployment already
//! uses (`SUPABASE_URL`, `SUPABASE_KEY`, `SENHA_EDICAO`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Default filename looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "treinamentos.toml";
/// Env var pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TREINAMENTOS_CONFIG";
pub const DEFAULT_TABLE: &str = "treinamentos";
pub const DEFAULT_TITLE: &str = "Painel de Treinamentos Pendentes";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("REST store selected but `{0}` is not set")]
    MissingRestSetting(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Rest,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub key: Option<String>,
    pub table: String,
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            url: None,
            key: None,
            table: DEFAULT_TABLE.to_string(),
            path: PathBuf::from("treinamentos.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub title: String,
    pub output_dir: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub edit_secret: Option<String>,
    pub export: ExportSettings,
}

impl AppConfig {
    /// Resolve the config file, parse it if present, then apply env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse `path`, or return defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// A URL + key pair in the environment switches the store to REST.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let env_url = non_empty("SUPABASE_URL");
        if let Some(key) = non_empty("SUPABASE_KEY") {
            self.store.key = Some(key);
        }
        if let Some(url) = env_url {
            self.store.url = Some(url);
            if self.store.key.is_some() {
                self.store.backend = StoreBackend::Rest;
            }
        }
        if let Some(secret) = non_empty("SENHA_EDICAO") {
            self.edit_secret = Some(secret);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Rest {
            if self.store.url.is_none() {
                return Err(ConfigError::MissingRestSetting("url"));
            }
            if self.store.key.is_none() {
                return Err(ConfigError::MissingRestSetting("key"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.table, "treinamentos");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "edit_secret = \"abc\"\n[export]\noutput_dir = \"saida\"\n",
        )
        .unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.edit_secret.as_deref(), Some("abc"));
        assert_eq!(config.export.output_dir, PathBuf::from("saida"));
        assert_eq!(config.export.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "store = 3").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn test_env_selects_rest_store() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_KEY", "k"),
            ("SENHA_EDICAO", "segredo"),
        ]));
        assert_eq!(config.store.backend, StoreBackend::Rest);
        assert_eq!(config.edit_secret.as_deref(), Some("segredo"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rest_backend_requires_url_and_key() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Rest;
        config.store.url = Some("https://x".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRestSetting("key"))
        ));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("SUPABASE_URL", "  "), ("SENHA_EDICAO", "")]));
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.edit_secret, None);
    }
}
