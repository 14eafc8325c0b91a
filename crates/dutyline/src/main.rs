// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dutyline - human-in-the-loop decision routing for coding agents.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod link;
mod notify;
mod serve;
mod shutdown;
mod status;

/// Dutyline - route agent decision requests to a human over Slack and SMS.
#[derive(Parser, Debug)]
#[command(name = "dutyline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway and escalation scheduler.
    Serve,
    /// Show notification counts by status.
    Status,
    /// Create a test notification against the local database.
    Notify {
        /// Owner's email.
        #[arg(long)]
        email: String,
        /// Message text.
        message: String,
        /// Suggested answers (repeatable).
        #[arg(long)]
        option: Vec<String>,
    },
    /// Generate a Slack link code to DM to the bot.
    Link {
        /// Owner's email.
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match dutyline_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            dutyline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status) => status::run_status(config).await,
        Some(Commands::Notify {
            email,
            message,
            option,
        }) => notify::run_notify(config, &email, &message, option).await,
        Some(Commands::Link { email }) => link::run_link(config, &email).await,
        None => {
            println!("dutyline: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("dutyline: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this; the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0);
    }
}
