mod commands;

pub use commands::{ChannelCommands, Cli, Commands, NewsCommands, SourceCommands};
