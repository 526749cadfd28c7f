//! MetamorphUI CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! mui-cli migrate
//!
//! # Delete expired email verification tokens
//! mui-cli tokens purge-expired
//! ```
//!
//! Both commands read `METAMORPH_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mui-cli")]
#[command(author, version, about = "MetamorphUI CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage email verification tokens
    Tokens {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Delete verification tokens past their expiry
    PurgeExpired,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Tokens { action } => match action {
            TokenAction::PurgeExpired => commands::tokens::purge_expired().await?,
        },
    }
    Ok(())
}
