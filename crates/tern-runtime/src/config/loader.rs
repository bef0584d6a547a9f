//! Layered configuration loading with figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: accepts `tern.toml` and `config.toml`
//! - `yaml-config`: accepts `tern.yaml`, `tern.yml`, `config.yaml` and `config.yml`
//!
//! With both enabled, both formats are searched and merged.
//!
//! # Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic [`merge`](ConfigLoader::merge)
//! 3. Profile file (`tern.{profile}.toml` / `tern.{profile}.yaml`)
//! 4. Main file (`tern.toml` / `tern.yaml`)
//! 5. Environment variables (`TERN_*`)
//!
//! # Environment Variables
//!
//! `TERN_` prefix, `__` between levels:
//!
//! - `TERN_BOT__NICK=wren` → `bot.nick = "wren"`
//! - `TERN_DISPATCH__WORKERS=4` → `dispatch.workers = 4`
//! - `TERN_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./deploy/tern.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::TernConfig;
use super::validation::validate_config;

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "TERN_PROFILE";

/// Configuration profile, selecting `tern.{profile}.*` overlay files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `TERN_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a [`TernConfig`] from defaults, files, the environment and
/// programmatic overrides.
pub struct ConfigLoader {
    overrides: Vec<TernConfig>,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            overrides: Vec::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to search for config files.
    ///
    /// Without any search path, the current directory and
    /// `<user config dir>/tern` are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("tern")),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Uses `config` in place of the built-in defaults. Files and the
    /// environment still override it.
    pub fn merge(mut self, config: TernConfig) -> Self {
        self.overrides.push(config);
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<TernConfig> {
        let profile = self.profile.clone();
        let config: TernConfig = self.build_figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            nick = %config.bot.nick,
            logging_level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(TernConfig::default()));
        for config in &self.overrides {
            figment = figment.merge(Serialized::defaults(config));
        }

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with TERN_ prefix");
            figment = figment.merge(
                Env::prefixed("TERN_")
                    .ignore(&["PROFILE"])
                    .split("__"),
            );
        }
        Ok(figment)
    }

    /// Merges one file, picking the format from its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("tern"));
        }
        paths
    }

    /// Searches `search_paths × base_names` for one format.
    ///
    /// The profile variant of a name is merged before its base file; the
    /// first base file found ends the search.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for dir in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path = dir.join(format!("{stem}.{}.{ext}", self.profile));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile configuration");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = dir.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    return (merge_fn(figment, &base_path), true);
                }
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        #[allow(unused_variables)]
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["tern.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["tern.yaml", "tern.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads from the default locations, with environment overrides.
pub fn load_config() -> ConfigResult<TernConfig> {
    ConfigLoader::new().load()
}

/// Loads one file, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<TernConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap();
            assert_eq!(config, TernConfig::default());
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_file_then_env_then_merge() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "tern.toml",
                r##"
                [bot]
                nick = "wren"
                owner = "root"
                limit = { "#quiet" = ["admin"] }

                [dispatch]
                workers = 2

                [modules.config.seen]
                max_entries = 10
                "##,
            )?;
            jail.set_env("TERN_DISPATCH__WORKERS", "3");
            jail.set_env("TERN_LOGGING__LEVEL", "debug");

            let mut overrides = TernConfig::default();
            overrides.bot.nick = "finch".to_string();
            overrides.bot.prefix = "!".to_string();
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap();
            assert_eq!(config.bot.nick, "wren");
            assert_eq!(config.bot.owner.as_deref(), Some("root"));
            assert_eq!(config.bot.limit["#quiet"], vec!["admin"]);
            assert_eq!(config.dispatch.workers, 3);
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.modules.config_for("seen")["max_entries"], 10);

            let merged = ConfigLoader::new()
                .search_path(jail.directory())
                .merge(overrides)
                .load()
                .unwrap();
            assert_eq!(merged.bot.nick, "wren");
            assert_eq!(merged.bot.prefix, "!");
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_is_overridden_by_main_file() {
        Jail::expect_with(|jail| {
            jail.create_file("tern.production.toml", "[bot]\nnick = \"prod\"\nprefix = \"!\"")?;
            jail.create_file("tern.toml", "[bot]\nnick = \"main\"")?;

            let config = ConfigLoader::new()
                .profile("prod")
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap();
            assert_eq!(config.bot.nick, "main");
            assert_eq!(config.bot.prefix, "!");
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .file("/nonexistent/tern.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("tern.toml", "[dispatch]\nworkers = 0")?;
            let result = ConfigLoader::new()
                .file(jail.directory().join("tern.toml"))
                .without_env()
                .load();
            assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env(PROFILE_ENV, "production");
            assert_eq!(Profile::from_env(), Profile::Production);
            jail.set_env(PROFILE_ENV, "staging");
            assert_eq!(Profile::from_env(), Profile::Custom("staging".into()));
            Ok(())
        });
    }
}
