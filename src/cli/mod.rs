//! CLI module - Command-line interface for Folio
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Folio - a small multi-author blog
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create an active account without going through email activation
    CreateUser {
        /// Login name
        username: String,
        /// Email address
        email: String,
        /// Password for the new account
        #[arg(long)]
        password: String,
        /// Grant superuser rights (may edit and delete any post)
        #[arg(long)]
        superuser: bool,
    },

    /// Mail a new activation link to an account that is not active yet
    ResendActivation {
        /// Login name of the inactive account
        username: String,
    },

    /// List user accounts
    Users,

    /// List all tags
    Tags,
}

pub use commands::*;
