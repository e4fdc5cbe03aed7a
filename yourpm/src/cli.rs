use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "yourpm")]
#[command(about = "Declarative package store and container tool manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Make the machine match a config file
    Switch {
        /// Config file (defaults to config.toml in the yourpm home)
        config: Option<PathBuf>,
    },
    /// Install a single artifact into the store and link it
    Install {
        name: String,
        version: String,
        url: String,
    },
    /// Remove containers or images that are no longer wanted
    Prune {
        #[command(subcommand)]
        target: PruneTarget,
    },
}

#[derive(Debug, Subcommand)]
pub enum PruneTarget {
    /// Remove managed containers that are undeclared or stopped
    Containers {
        /// Remove every managed container
        #[arg(long)]
        all: bool,
    },
    /// Remove dangling images
    Images {
        /// Remove every unused image
        #[arg(long)]
        all: bool,
    },
}
