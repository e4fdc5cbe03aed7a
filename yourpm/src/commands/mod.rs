//! CLI command implementations.

pub mod install;
pub mod prune;
pub mod switch;

use crate::cli::{Commands, PruneTarget};
use crate::environment::Environment;
use anyhow::Result;

pub fn dispatch(env: &Environment, command: Commands) -> Result<()> {
    match command {
        Commands::Switch { config } => switch::run(env, config.as_deref()),
        Commands::Install { name, version, url } => install::run(env, &name, &version, &url),
        Commands::Prune { target } => match target {
            PruneTarget::Containers { all } => prune::containers(env, all),
            PruneTarget::Images { all } => prune::images(env, all),
        },
    }
}
