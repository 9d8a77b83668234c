// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kash - a Telegram relay bot for an OpenAI-compatible completion backend.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod history;
mod logging;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kash_config::KashConfig;

/// Kash - relays Telegram chats to a completion backend.
#[derive(Parser, Debug)]
#[command(name = "kash", version, about, long_about = None)]
struct Cli {
    /// Explicit config file, layered over the default locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot.
    Serve,
    /// Print the resolved configuration.
    Config,
    /// Inspect or reset stored conversations.
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// Print a user's conversation log.
    Show {
        /// User id the log belongs to.
        user: String,
        /// Only print the last N records.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Delete a user's conversation log.
    Clear {
        /// User id the log belongs to.
        user: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match kash_config::load_and_validate(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            kash_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => {
            let _guard = logging::init_tracing(&config.logging);
            serve::run_serve(config).await
        }
        Some(Commands::Config) => print_config(&config),
        Some(Commands::History { action }) => match action {
            HistoryCommand::Show { user, limit } => history::show(&config, &user, limit).await,
            HistoryCommand::Clear { user } => history::clear(&config, &user).await,
        },
        None => {
            println!("kash: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("kash: {e}");
        std::process::exit(1);
    }
}

/// Prints the resolved configuration as TOML with the bot token masked.
fn print_config(config: &KashConfig) -> Result<(), kash_core::KashError> {
    println!("{}", render_config(config)?);
    Ok(())
}

fn render_config(config: &KashConfig) -> Result<String, kash_core::KashError> {
    let mut shown = config.clone();
    if shown.telegram.bot_token.is_some() {
        shown.telegram.bot_token = Some("***".into());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| kash_core::KashError::Config(format!("cannot render config: {e}")))
}
