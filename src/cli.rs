use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidresolve")]
#[command(author, version, about = "Resolve video references into playable media streams")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a video and list or pick its formats
    Resolve {
        /// Video ID or URL
        #[arg(required = true)]
        reference: String,

        /// Pick a format by quality (highest, lowest, highestaudio, ...)
        #[arg(short, long, conflicts_with = "itag")]
        quality: Option<String>,

        /// Pick a format by itag, or the first available of a comma separated list
        #[arg(short, long)]
        itag: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply a transform program to a signed token
    Decipher {
        /// Program in compact notation, e.g. "r,s2,w7"
        #[arg(short, long)]
        program: String,

        /// Token to decipher
        token: String,
    },

    /// Extract the transform program from a saved player code blob
    Extract {
        /// Code blob file
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Build the segment index of a saved WebM prefix
    Index {
        /// File holding the stream prefix
        #[arg(required = true)]
        file: PathBuf,

        /// Byte range of the cue index, e.g. 4000-4811
        #[arg(short, long)]
        range: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
