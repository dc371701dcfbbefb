//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Fetch and stream mail over IMAP.
#[derive(Debug, Parser)]
#[command(name = "mailpipe", version, about)]
pub struct Cli {
    /// Accounts file. Defaults to `$CONFIG_DIR/mailpipe/accounts.json`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the account's mailbox names as JSON.
    List {
        /// Account email address.
        email: String,
    },
    /// Print one page of a mailbox as JSON, newest first.
    Fetch(PageArgs),
    /// Print the first page, then every new message, as server-sent events.
    Stream(PageArgs),
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// Account email address.
    pub email: String,

    /// Mailbox name.
    #[arg(short, long, default_value = "INBOX")]
    pub mailbox: String,

    /// Messages per page; zero or less means 50.
    #[arg(long, default_value_t = 50, allow_negative_numbers = true)]
    pub page_size: i64,

    /// Page number, 1 being the newest.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,
}
