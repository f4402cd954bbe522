//! Game Review System CLI - Database migrations and user management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! grs-cli migrate
//!
//! # Create a user
//! grs-cli user create -u alice -e alice@example.com -p 'correct horse' -r member
//!
//! # Grant the admin role to an existing user
//! grs-cli user promote -u alice
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Register a user and set their role
//! - `user promote` - Grant `admin` to an existing user

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "grs-cli")]
#[command(author, version, about = "Game Review System CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a new user
    Create {
        /// Username (3-32 characters: letters, digits, `_`, `-`, `.`)
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (8-128 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`member`, `admin`)
        #[arg(short, long, default_value = "member")]
        role: String,
    },
    /// Grant the admin role to an existing user
    Promote {
        /// Username of the account to promote
        #[arg(short, long)]
        username: String,
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
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                role,
            } => {
                commands::user::create(&username, &email, &password, &role).await?;
            }
            UserAction::Promote { username } => {
                commands::user::promote(&username).await?;
            }
        },
    }
    Ok(())
}
