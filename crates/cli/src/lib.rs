use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fxgap")]
#[command(about = "fxgap - official vs parallel FX rate gap monitor")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the monitor service (periodic refresh + HTTP API)
    Serve {
        /// Path to the configuration file
        #[arg(short, long, default_value = "fxgap.yaml")]
        config: PathBuf,

        /// Override the HTTP port
        #[arg(long)]
        http: Option<u16>,
    },

    /// Run one refresh cycle and print the snapshot as JSON
    Fetch {
        /// Path to the configuration file
        #[arg(short, long, default_value = "fxgap.yaml")]
        config: PathBuf,

        /// Bypass the cached snapshot even if it is still fresh
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration without starting the monitor
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "fxgap.yaml")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "fxgap.yaml")]
        output: PathBuf,
    },
}
