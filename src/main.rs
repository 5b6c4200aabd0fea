use clap::Parser;

use contacts_rs::cli::{Cli, execute_command, init_logger_from_settings, load_and_merge_config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_and_merge_config(&cli)
        .inspect_err(|e| eprintln!("Configuration error: {:#}", e))?;

    if !cli.is_dry_run() {
        init_logger_from_settings(&settings)
            .inspect_err(|e| eprintln!("Logger initialization error: {:#}", e))?;
    }

    execute_command(&cli, settings).await?;
    Ok(())
}
