//! Serve command handler

use crate::config::Settings;
use crate::error::AppResult;
use crate::server::Server;

/// Runs the server, or only reports on the configuration in dry-run mode
pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// # Errors
    /// - Configuration validation errors
    /// - Pool, bind or server errors when not in dry-run mode
    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            return self.validate_only();
        }
        Server::new(self.config).run().await?;
        Ok(())
    }

    /// Validates the configuration without touching the network or the
    /// database.
    pub fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        println!("✓ Configuration is valid");
        println!("✓ Server would bind to: {}", self.config.server.address());
        println!(
            "✓ Database pool: {}..{} connections, {}s timeout",
            self.config.database.min_connections,
            self.config.database.max_connections,
            self.config.database.connection_timeout
        );
        println!("✓ Log level: {}", self.config.logger.level);
        println!("Dry run completed successfully - configuration is ready for deployment");
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn create_valid_config() -> Settings {
        let mut config = Settings::default();
        config.database.url = "postgres://localhost/contacts".to_string();
        config
    }

    #[test]
    fn test_serve_handler_keeps_config() {
        let config = create_valid_config();
        let handler = ServeCommandHandler::new(config.clone());
        assert_eq!(handler.config(), &config);
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run() {
        let handler = ServeCommandHandler::new(create_valid_config());
        assert!(handler.execute(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run_invalid_config() {
        let mut config = create_valid_config();
        config.server.port = 0;

        let result = ServeCommandHandler::new(config).execute(true).await;
        match result {
            Err(AppError::Configuration { key, .. }) => assert_eq!(key, "server.port"),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }
}
