//! Configuration: the layered file/env settings loaded at startup and the
//! per-provider key/value store consulted on every call.

use crate::scraper::Locale;
use config::{Config, Environment, File, FileFormat};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Provider setting holding the API key
pub const API_KEY: &str = "apiKey";
/// Provider setting holding the fallback language (`fr`, `de-DE`, ...)
pub const FALLBACK_LANGUAGE: &str = "fallbackLanguage";
/// Provider setting toggling adult results in searches
pub const INCLUDE_ADULT: &str = "includeAdult";

const ENV_PREFIX: &str = "MEDIA_RESOLVER";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Read access to per-provider settings.
///
/// Values are looked up on every call, so a changed value is picked up by
/// the next request without restarting anything.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigStore: Send + Sync {
    fn get_value(&self, provider_id: &str, key: &str) -> Option<String>;
}

/// In-memory, runtime-mutable settings store
#[derive(Debug, Default)]
pub struct SettingsStore {
    values: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from the `providers` section of the loaded config
    pub fn from_config(config: &ResolverConfig) -> Self {
        let store = Self::new();
        for (provider_id, settings) in &config.providers {
            if let Some(key) = &settings.api_key {
                store.set_value(provider_id, API_KEY, key);
            }
            if let Some(language) = &settings.fallback_language {
                store.set_value(provider_id, FALLBACK_LANGUAGE, language);
            }
            store.set_value(provider_id, INCLUDE_ADULT, settings.include_adult.to_string());
        }
        store
    }

    pub fn set_value(&self, provider_id: &str, key: &str, value: impl Into<String>) {
        self.values
            .write()
            .entry(provider_id.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn remove_value(&self, provider_id: &str, key: &str) -> Option<String> {
        self.values
            .write()
            .get_mut(provider_id)
            .and_then(|settings| settings.remove(key))
    }
}

impl ConfigStore for SettingsStore {
    fn get_value(&self, provider_id: &str, key: &str) -> Option<String> {
        self.values
            .read()
            .get(provider_id)
            .and_then(|settings| settings.get(key))
            .cloned()
    }
}

/// Boolean setting; anything but `true` (case-insensitive) is false
pub fn get_bool(store: &dyn ConfigStore, provider_id: &str, key: &str) -> bool {
    store
        .get_value(provider_id, key)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    /// Per-provider settings keyed by provider id
    pub providers: HashMap<String, ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
    /// Also write daily-rotated log files here
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub episode_list_ttl_secs: u64,
    pub episode_list_max_entries: usize,
}

impl CacheConfig {
    pub const fn episode_list_ttl(&self) -> Duration {
        Duration::from_secs(self.episode_list_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            episode_list_ttl_secs: 600,
            episode_list_max_entries: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 20 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub fallback_language: Option<String>,
    pub include_adult: bool,
}

impl ResolverConfig {
    /// Load defaults, then the TOML file, then `MEDIA_RESOLVER__*` env vars.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(
                    File::from(path.to_path_buf())
                        .format(FileFormat::Toml)
                        .required(true),
                );
            }
            None => {
                if let Some(default) = Self::default_path() {
                    builder = builder.add_source(
                        File::from(default)
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        let config: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/media-resolver/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("media-resolver").join("config.toml"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.episode_list_max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.episode_list_max_entries must be at least 1".to_string(),
            ));
        }

        for (provider_id, settings) in &self.providers {
            if let Some(language) = &settings.fallback_language {
                language.parse::<Locale>().map_err(|e| {
                    ConfigError::Invalid(format!("providers.{provider_id}.fallback_language: {e}"))
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.cache.episode_list_ttl(), Duration::from_secs(600));
        assert_eq!(config.cache.episode_list_max_entries, 5);
        assert_eq!(config.logging.level, "info");
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            [logging]
            level = "debug"

            [cache]
            episode_list_max_entries = 2

            [providers.tvdb]
            api_key = "abc"
            fallback_language = "fr"
            "#,
        );

        let config = ResolverConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.cache.episode_list_max_entries, 2);
        assert_eq!(config.cache.episode_list_ttl_secs, 600);
        let tvdb = &config.providers["tvdb"];
        assert_eq!(tvdb.api_key.as_deref(), Some("abc"));
        assert_eq!(tvdb.fallback_language.as_deref(), Some("fr"));
    }

    #[test]
    fn test_invalid_fallback_language_rejected() {
        let file = write_config(
            r#"
            [providers.tmdb]
            fallback_language = "french"
            "#,
        );

        assert!(matches!(
            ResolverConfig::load(Some(file.path())),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        assert!(matches!(
            ResolverConfig::load(Some(&missing)),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_settings_store_seeded_and_mutable() {
        let mut config = ResolverConfig::default();
        config.providers.insert(
            "tmdb".to_string(),
            ProviderSettings {
                api_key: Some("k1".to_string()),
                fallback_language: None,
                include_adult: true,
            },
        );

        let store = SettingsStore::from_config(&config);
        assert_eq!(store.get_value("tmdb", API_KEY).as_deref(), Some("k1"));
        assert!(get_bool(&store, "tmdb", INCLUDE_ADULT));
        assert!(store.get_value("tmdb", FALLBACK_LANGUAGE).is_none());

        store.set_value("tmdb", API_KEY, "k2");
        assert_eq!(store.get_value("tmdb", API_KEY).as_deref(), Some("k2"));
        assert_eq!(store.remove_value("tmdb", API_KEY).as_deref(), Some("k2"));
        assert!(store.get_value("tvdb", API_KEY).is_none());
    }
}
