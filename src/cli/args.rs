// src/cli/args.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Self-hosted bookmark and feed manager
pub struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Run {
        /// Overrides the configured listen address
        #[arg(short, long, value_name = "ADDR")]
        listen: Option<String>,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Create an administrator account with a generated password
    #[command(name = "createadmin")]
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long)]
        nickname: String,

        #[arg(long)]
        displayname: String,
    },
}
