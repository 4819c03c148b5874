use std::io::BufRead;

use anyhow::{Context, Result};
use clap::Parser;
use keyward_authn::PasswordHasher;
use keyward_server::{
    config::{Cli, CliCommand, Config},
    logging, metrics,
};
use zeroize::Zeroizing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config;

    if let Some(CliCommand::HashPassword) = cli.command {
        return hash_password(&config);
    }

    if let Err(e) = logging::init_logging(logging::LogConfig::from_config(&config)) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    config.validate()?;
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        access_ttl_secs = config.access_ttl_secs,
        refresh_ttl_secs = config.refresh_ttl_secs,
        "Starting Keyward"
    );

    // Before the authenticator, so metric descriptions reach the exporter.
    if let Some(addr) = config.metrics_listen {
        metrics::init_exporter(addr).context("failed to start Prometheus exporter")?;
    }

    let auth = keyward_server::build_authenticator(&config).await?;
    keyward_server::serve(&config, auth).await
}

/// Reads one password line from stdin and prints its stored hash.
fn hash_password(config: &Config) -> Result<()> {
    let hasher = PasswordHasher::new(config.require_password_salt()?.expose().to_vec())?;

    let mut line = Zeroizing::new(String::new());
    std::io::stdin().lock().read_line(&mut line).context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("empty password");
    }

    println!("{}", hasher.hash(password));
    Ok(())
}
