use anyhow::Context;
use clap::Parser;
use indexrelay::cli::{self, CheckCommand, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Run(args) => cli::run::execute(&cli, args)
            .await
            .context("relay failed")?,
        Commands::Snapshot(args) => cli::snapshot::execute(&cli, args)
            .await
            .context("snapshot failed")?,
        Commands::Check(CheckCommand::Config) => {
            cli::check::execute_config(&cli.config).context("invalid configuration")?;
        }
    }
    Ok(())
}
