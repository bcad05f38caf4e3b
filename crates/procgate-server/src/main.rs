mod auth;
mod config;
mod connection;
mod gateway;
mod server;

use clap::Parser;
use config::Config;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Parser)]
#[command(name = "procgate", about = "Stored-procedure gateway over HTTP")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "PROCGATE_CONFIG", default_value = "config.example.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::from_path(&args.config)?;
    server::run(config).await?;
    Ok(())
}

#[cfg(test)]
mod tests;
