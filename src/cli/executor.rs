//! Dispatches a parsed command line

use super::handlers::ServeCommandHandler;
use super::parser::{Cli, Commands};
use crate::config::Settings;
use crate::error::{AppError, AppResult};

/// Runs the command `cli` names with the merged `settings`.
///
/// No subcommand means `serve`.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    cli.validate()
        .map_err(|reason| AppError::validation("cli_arguments", reason))?;

    match &cli.command {
        Some(Commands::Serve { host, port, .. }) => {
            warn_privileged_bind(host.as_deref(), *port);
            ServeCommandHandler::new(settings)
                .execute(cli.is_dry_run())
                .await
        }
        None => ServeCommandHandler::new(settings).execute(false).await,
    }
}

fn warn_privileged_bind(host: Option<&str>, port: Option<u16>) {
    if let (Some("0.0.0.0"), Some(port)) = (host, port)
        && port < 1024
    {
        tracing::warn!(
            port,
            "Binding to 0.0.0.0 on a privileged port typically requires root privileges"
        );
    }
}
