//! Command-line interface definition.

use clap::{Parser, Subcommand};

use crate::domain::Platform;

#[derive(Parser, Debug)]
#[command(
    name = "vidwatch",
    version,
    about = "Watches video accounts and posts a Discord message for every new upload"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler until interrupted
    Run,

    /// Start monitoring an account
    Add {
        /// Platform: youtube, tiktok, instagram or facebook
        platform: Platform,

        /// URL of the account or channel
        url: String,

        /// Discord channel to post notifications in
        #[arg(long)]
        channel: String,

        /// Discord server the channel belongs to
        #[arg(long)]
        guild: Option<String>,
    },

    /// Stop monitoring an account
    Remove {
        /// Monitor id, as shown by `list`
        id: i64,
    },

    /// List all monitored accounts
    List,
}
