use std::process::ExitCode;

use clap::Parser;
use erc404_scripts::{
    cli::Cli,
    config::{NetworkConfig, ScriptConfig},
};
use tracing::Level;

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let Cli {
        network,
        rpc_url,
        priv_key,
        artifacts,
        deployments_path,
        verbose,
        command,
    } = Cli::parse();

    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = ScriptConfig {
        network: NetworkConfig::resolve(&network, rpc_url, |var| std::env::var(var).ok())?,
        private_key: priv_key.filter(|key| !key.is_empty()),
        artifacts_dir: artifacts,
        deployments_path,
    };

    let exit_code = command.run(&config).await?;
    Ok(ExitCode::from(exit_code))
}
