use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stickies::placement::ScreenBounds;

#[derive(Parser, Debug)]
#[command(name = "stickies", version, about = "Sticky notes with focus timers")]
pub struct Cli {
    /// Notes file (defaults to the per-user data directory)
    #[arg(long, global = true)]
    pub data_file: Option<PathBuf>,
    /// Quiet period before edits are written, in milliseconds
    #[arg(long, global = true, default_value_t = 300)]
    pub debounce_ms: u64,
    /// Usable screen area used to place notes, as WIDTHxHEIGHT
    #[arg(long, global = true, value_parser = stickies::config::parse_screen)]
    pub screen: Option<ScreenBounds>,
    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List notes
    List {
        /// Only notes whose text contains this (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },
    /// Create a new note
    New {
        /// Note text
        #[arg(long)]
        content: Option<String>,
        /// Palette name or #AARRGGBB / #RRGGBB
        #[arg(long)]
        color: Option<String>,
        /// Timer length in minutes
        #[arg(long)]
        minutes: Option<i64>,
        /// Pin the note on top
        #[arg(long)]
        pin: bool,
    },
    /// Delete a note
    Delete {
        /// Note id or unique id prefix
        note_id: String,
    },
    /// Toggle a note's pin
    Pin {
        /// Note id or unique id prefix
        note_id: String,
    },
    /// Set a note's timer length
    Duration {
        /// Note id or unique id prefix
        note_id: String,
        /// New length in minutes
        #[arg(allow_negative_numbers = true)]
        minutes: i64,
    },
    /// Run a focus session in the foreground (Ctrl-C pauses and exits)
    Focus {
        /// Note id or unique id prefix
        note_id: String,
    },
}
