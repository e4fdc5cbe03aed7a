//! Entry point behind every container command link.
//!
//! Invoked as `node`, `npm`, ... through a symlink; runs that command inside
//! the owning container and exits with its status.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use yourpm::executor;
use yourpm::{DockerCli, Environment};

fn main() {
    // Diagnostics go to stderr so the wrapped command owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("container-exec: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let mut argv = std::env::args();
    let argv0 = argv.next().unwrap_or_default();
    let command = executor::command_name(&argv0).context("Could not determine command name")?;
    let args: Vec<String> = argv.collect();

    let env = Environment::from_env().context("Could not determine home directory; set YOURPM_HOME")?;
    let runtime = DockerCli::new(env.runtime_program());
    tracing::debug!(command = %command, "dispatching to container");

    Ok(executor::run_command(&env, &runtime, &command, &args)?)
}
