use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelcache")]
#[command(author, version, about = "On-demand video transcoding cache")]
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
    /// Make sure an artifact exists for each source, transcoding if needed
    Convert {
        /// Source files or directories (directories are scanned recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the artifact path a source maps to under the current profile
    Path {
        /// Source file
        #[arg(required = true)]
        source: PathBuf,
    },

    /// Check whether an artifact is current and its source still exists
    ValidateArtifact {
        /// Artifact file
        #[arg(required = true)]
        artifact: PathBuf,
    },

    /// Probe a media file and display the values used for transcoding
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
