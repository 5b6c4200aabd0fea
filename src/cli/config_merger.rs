//! Merges CLI overrides into file-based configuration
//!
//! Precedence, highest first: serve flags, global flags, environment
//! variables, configuration files.

use std::path::Path;

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, Settings};

/// Holds the file-based settings that CLI overrides are applied to
pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Loads the base settings the way `cli` asks for: the `--config` file
    /// if given, otherwise the layered directory with the `--env` overlay.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;
        if let Some(env) = cli.env {
            loader = loader.with_environment(env.into());
        }
        if let Some(path) = &cli.config {
            Self::validate_config_file_access(path)?;
            loader = loader.with_config_file(path);
        }

        Ok(Self::new(loader.load()?))
    }

    /// Re-checks the file at load time; it may have gone since parsing.
    fn validate_config_file_access(path: &Path) -> Result<(), ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::validation(
                "config_file",
                format!("Configuration file is not a readable file: '{}'", path.display()),
            ));
        }

        std::fs::File::open(path).map(|_| ()).map_err(|e| {
            ConfigError::validation(
                "config_file",
                format!("Cannot read configuration file '{}': {}", path.display(), e),
            )
        })
    }

    /// Returns the base settings with `cli` overrides applied and
    /// validated.
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        Self::apply_global_overrides(&mut config, cli);
        if let Some(command) = &cli.command {
            Self::apply_command_overrides(&mut config, command);
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_global_overrides(config: &mut Settings, cli: &Cli) {
        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }
    }

    fn apply_command_overrides(config: &mut Settings, command: &Commands) {
        match command {
            Commands::Serve {
                host,
                port,
                log_level,
                dry_run: _,
            } => {
                if let Some(host) = host {
                    config.server.host = host.clone();
                }
                if let Some(port) = port {
                    config.server.port = *port;
                }
                if let Some(level) = log_level {
                    config.logger.level = level.as_str().to_string();
                }
            }
        }
    }

    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}
