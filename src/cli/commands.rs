use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::domain::{Category, Channel, Importance};
use crate::services::DEFAULT_SAMPLE_SIZE;

#[derive(Parser)]
#[command(name = "newsdesk")]
#[command(about = "Local-first accounting and tax news curation with remote sync and channel dispatch")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage stored news
    News {
        #[command(subcommand)]
        command: NewsCommands,
    },

    /// Manage the source catalog
    Sources {
        #[command(subcommand)]
        command: SourceCommands,
    },

    /// Inspect delivery channel configurations
    Channels {
        #[command(subcommand)]
        command: ChannelCommands,
    },

    /// Send one news item to a delivery channel
    Send {
        /// Channel: telegram, whatsapp, teams or email
        channel: Channel,

        /// Id of the news item to send
        news_id: String,

        /// Channel configuration id (defaults to the newest active one)
        #[arg(long)]
        config: Option<String>,
    },

    /// Show backend and storage configuration
    Status,

    /// Drop every stored collection so the built-in data is reseeded
    Wipe,
}

#[derive(Subcommand)]
pub enum NewsCommands {
    /// List news, newest first
    List {
        /// Only this category
        #[arg(long)]
        category: Option<Category>,

        /// Only this importance
        #[arg(long)]
        importance: Option<Importance>,

        /// Case-insensitive text to look for in titles
        #[arg(long)]
        search: Option<String>,

        /// Sort field, prefix with '-' for descending
        #[arg(long)]
        order: Option<String>,

        /// Maximum number of items
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one news item
    Show {
        id: String,
    },

    /// Add a news item by hand
    Add {
        title: String,

        #[arg(long, default_value = "contabil")]
        category: Category,

        #[arg(long, default_value = "media")]
        importance: Importance,

        #[arg(long, default_value = "")]
        summary: String,

        #[arg(long, default_value = "")]
        content: String,

        /// Source name shown with the news
        #[arg(long, default_value = "")]
        source: String,

        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Publication date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        highlight: bool,
    },

    /// Delete a news item
    Delete {
        id: String,
    },

    /// Delete every news item
    Clear,

    /// Pull news for a source (demo news when no backend is configured)
    Fetch {
        /// Source id from the catalog
        #[arg(long)]
        source: Option<String>,

        /// Topic to look for
        #[arg(long)]
        topic: Option<String>,

        #[arg(long, default_value = "contabil")]
        category: Category,

        /// Send created news to channels that deliver automatically
        #[arg(long)]
        dispatch: bool,
    },

    /// Check a sample of news for implausible publication dates
    VerifyDates {
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,
    },

    /// Draft a news text about a topic without saving it
    Generate {
        topic: String,

        #[arg(long, default_value = "Contábil News")]
        source_name: String,

        #[arg(long, default_value = "contabil")]
        category: Category,
    },
}

#[derive(Subcommand)]
pub enum SourceCommands {
    /// List sources
    List,

    /// Restore the default source catalog
    Reset,

    /// Activate or deactivate a source
    Toggle {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ChannelCommands {
    /// List every channel configuration
    List,
}
