// src/cli/mod.rs
use crate::cli::args::{Cli, Commands};
use crate::cli::error::CliResult;
use crate::config::Settings;

pub mod args;
pub mod commands;
pub mod error;

pub fn execute_command(cli: Cli, settings: &Settings) -> CliResult<()> {
    match cli.command {
        Commands::Run { listen } => commands::run(settings, listen),
        Commands::Migrate => commands::migrate(settings),
        Commands::CreateAdmin {
            email,
            nickname,
            displayname,
        } => commands::create_admin(settings, &email, &nickname, &displayname),
    }
}
