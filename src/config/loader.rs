//! Layered configuration loading
//!
//! Sources, lowest precedence first:
//! 1. `default.toml` (required)
//! 2. `{environment}.toml`
//! 3. `local.toml`
//! 4. `CONTACTS_*` environment variables
//!
//! A single file given by `CONTACTS_CONFIG_FILE` or `--config` replaces
//! steps 1-3.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

const CONFIG_DIR_ENV: &str = "CONTACTS_CONFIG_DIR";

const CONFIG_FILE_ENV: &str = "CONTACTS_CONFIG_FILE";

const DEFAULT_CONFIG_DIR: &str = "config";

/// `CONTACTS_SERVER__PORT` maps to `server.port`.
const ENV_PREFIX: &str = "CONTACTS";

const ENV_SEPARATOR: &str = "__";

/// Loads [`Settings`] from files and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    /// When set, the only file source
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Reads `CONTACTS_CONFIG_DIR`, `CONTACTS_CONFIG_FILE` and
    /// `CONTACTS_APP_ENV`.
    ///
    /// # Errors
    ///
    /// `MutualExclusivityError` when both the directory and the file
    /// variables are set.
    pub fn new() -> Result<Self, ConfigError> {
        let dir_from_env = std::env::var(CONFIG_DIR_ENV).ok();
        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if config_file.is_some() && dir_from_env.is_some() {
            return Err(ConfigError::mutual_exclusivity(format!(
                "{CONFIG_DIR_ENV} and {CONFIG_FILE_ENV} cannot both be set. \
                 Use {CONFIG_DIR_ENV} for layered configuration or \
                 {CONFIG_FILE_ENV} for a single configuration file."
            )));
        }

        Ok(Self {
            config_dir: dir_from_env
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            config_file,
            environment: AppEnvironment::from_env(),
        })
    }

    /// Loads only `path` instead of the layered directory files.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Selects the `{environment}.toml` overlay.
    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Builds, deserializes and validates the settings.
    ///
    /// # Errors
    ///
    /// - `FileNotFound` when the required file is missing
    /// - `ParseError` when the merged sources do not fit [`Settings`]
    /// - `ValidationError` from [`Settings::validate`]
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let config = self.build_config()?;
        let settings: Settings = config.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = Config::builder();

        let builder = match &self.config_file {
            Some(config_file) => add_file_source(builder, config_file, true)?,
            None => self.build_layered_config(builder)?,
        };

        // Environment variables always win.
        add_env_source(builder).build().map_err(ConfigError::from)
    }

    fn build_layered_config(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = add_file_source(builder, &self.config_dir.join("default.toml"), true)?;

        let env_path = self
            .config_dir
            .join(format!("{}.toml", self.environment.as_str()));
        let builder = add_file_source(builder, &env_path, false)?;

        add_file_source(builder, &self.config_dir.join("local.toml"), false)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: None,
            environment: AppEnvironment::default(),
        })
    }
}

fn add_file_source(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if required && !path.is_file() {
        return Err(ConfigError::file_not_found(format!(
            "Required configuration file not found: {}",
            path.display()
        )));
    }

    let name = path.to_str().ok_or_else(|| {
        ConfigError::ParseError(format!(
            "Configuration path is not valid UTF-8: {}",
            path.display()
        ))
    })?;

    Ok(builder.add_source(File::new(name, FileFormat::Toml).required(required)))
}

fn add_env_source(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .ignore_empty(true)
            .try_parsing(true),
    )
}
