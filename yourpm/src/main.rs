use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use yourpm::commands;
use yourpm::output::Output;
use yourpm::{Cli, Environment};

fn main() {
    // e.g. RUST_LOG=yourpm=debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        Output::error(format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let env = Environment::from_env().context("Could not determine home directory; set YOURPM_HOME")?;
    tracing::debug!(base = %env.base().display(), runtime = env.runtime_program(), "environment");
    commands::dispatch(&env, cli.command)
}
