//! Orbit CLI - Database migrations and admin setup.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! orbit-cli migrate
//!
//! # Produce a value for ADMIN_PASSWORD_HASH (prompts on stdin)
//! orbit-cli hash-password
//!
//! # Same, with the password as an argument
//! orbit-cli hash-password --password 'correct horse battery staple'
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "orbit-cli")]
#[command(author, version, about = "Orbit CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Hash the admin password for `ADMIN_PASSWORD_HASH`
    HashPassword {
        /// Password to hash (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::HashPassword { password } => commands::password::hash(password)?,
    }
    Ok(())
}
