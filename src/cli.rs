//! Command-line interface for the auth service.

use clap::{Parser, Subcommand};

/// Reiche Auth - authentication and session service for the Reiche
/// Academy platform
#[derive(Parser)]
#[command(name = "reiche-auth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service with the background scheduler
    #[command(alias = "-d", alias = "--daemon")]
    Serve,

    /// Create a default config file
    #[command(alias = "--init")]
    Init,

    /// Create a user account
    CreateUser {
        email: String,

        password: String,

        /// Display name (defaults to the email local part)
        #[arg(long)]
        name: Option<String>,

        /// Profile (role) id: 1 = ADMIN, 2 = CONSULTOR, 3 = GESTOR
        #[arg(long, default_value = "3")]
        profile_id: i32,

        /// Tenant company id; omit for a global account
        #[arg(long)]
        company_id: Option<i32>,
    },

    /// Run one token retention pass and exit
    CleanupTokens,
}
