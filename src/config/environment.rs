//! Deployment environment selection

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

/// Deployment environment; selects the `{environment}.toml` overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    /// Environment variable naming the current environment
    pub const ENV_VAR: &'static str = "CONTACTS_APP_ENV";

    /// Reads `CONTACTS_APP_ENV`, falling back to `Development` when it is
    /// unset or unrecognised.
    pub fn from_env() -> Self {
        std::env::var(Self::ENV_VAR)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::EnvVarError(format!(
                "Invalid environment '{}'. Valid values are: development, test, staging, production",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_aliases() {
        let cases = [
            ("development", Environment::Development),
            ("dev", Environment::Development),
            ("test", Environment::Test),
            ("stage", Environment::Staging),
            ("prod", Environment::Production),
            (" Production ", Environment::Production),
        ];
        for (raw, expected) in cases {
            assert_eq!(raw.parse::<Environment>().unwrap(), expected, "{raw}");
        }
    }

    #[test]
    fn test_environment_invalid() {
        let err = "qa".parse::<Environment>().unwrap_err();
        assert!(err.to_string().contains("Invalid environment 'qa'"));
    }

    #[test]
    fn test_environment_display_matches_overlay_name() {
        assert_eq!(Environment::Staging.to_string(), "staging");
        assert_eq!(Environment::default(), Environment::Development);
    }
}
