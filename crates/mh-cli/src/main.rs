mod bridge;
mod cli;
mod commands;
mod error;
mod logger;
mod status_command;
mod unlock_command;

#[cfg(test)]
mod tests;

use crate::bridge::Bridge;
use crate::cli::Cli;
use crate::commands::Commands;
use crate::error::Result as CliResult;

use mh_config::{Config, LogLevel};

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("{hint}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = Config::load()?;
    config.validate()?;

    if let Some(level) = &cli.log_level {
        let Ok(level) = level.parse::<LogLevel>();
        config.logging.level = level;
    }

    let log_file = match &config.logging.file {
        Some(file) => Some(Config::config_dir()?.join(file)),
        None => None,
    };
    logger::initialize(config.logging.level, log_file.as_deref(), config.logging.colored)?;
    config.log_summary();

    let mut bridge = bridge::connect(&config)?;

    match cli.command {
        Commands::Status => status_command::run(&bridge).await,
        Commands::RequestLink { email } => request_link(&bridge, &email).await,
        Commands::Login { token } => login(&mut bridge, &token).await,
        Commands::Unlock { identity, token } => {
            unlock_command::run(&mut bridge, identity, token.as_deref()).await
        }
        Commands::SignOut => {
            bridge.machine.sign_out().await?;
            println!("Signed out. Stored sessions and cached PINs were removed.");
            Ok(())
        }
    }
}

async fn request_link(bridge: &Bridge, email: &str) -> CliResult<()> {
    bridge.client()?.request_magic_link(email).await?;
    println!("Magic link sent to {}", email.trim().to_lowercase());
    Ok(())
}

async fn login(bridge: &mut Bridge, token: &str) -> CliResult<()> {
    match bridge.machine.complete_authentication(token).await? {
        Some(identity) => {
            info!("Session stored for {identity}");
            println!("Signed in as {identity}. Run `mh unlock --identity {identity}` next.");
        }
        None => {
            println!("Signed in, but this account has not claimed an identity yet.");
            println!("Run `mh unlock --identity <name> --token <token>` with a fresh link to claim one.");
        }
    }
    Ok(())
}
