use crate::commands::Commands;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "mh")]
#[command(about = "Family messaging sign-in: magic links, identities and PIN unlock")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Override the log level from config (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub(crate) log_level: Option<String>,
}
