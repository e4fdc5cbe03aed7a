use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::container::EnsureOutcome;
use crate::environment::Environment;
use crate::fetch::HttpFetcher;
use crate::manifest::{ContainerManifest, Manifest};
use crate::output::Output;
use crate::runtime::DockerCli;
use crate::switch::Switcher;

pub fn run(env: &Environment, config_path: Option<&Path>) -> Result<()> {
    let default_path = env.config_path();
    let path = config_path.unwrap_or(default_path.as_path());
    let config = Config::load(path)?;

    if !same_file(path, &default_path) {
        fs::create_dir_all(env.base())
            .with_context(|| format!("Failed to create {}", env.base().display()))?;
        fs::copy(path, &default_path).with_context(|| {
            format!("Failed to copy {} to {}", path.display(), default_path.display())
        })?;
    }

    let manifest = if config.packages.is_empty() && !env.manifest_path().exists() {
        Manifest::default()
    } else {
        Manifest::load(&env.manifest_path())?
    };
    let containers = if config.containers.is_empty() && !env.containers_path().exists() {
        ContainerManifest::default()
    } else {
        ContainerManifest::load(&env.containers_path())?
    };

    Output::info(format!("Switching to {}...", config.name));

    let fetcher = HttpFetcher::new();
    let runtime = DockerCli::new(env.runtime_program());
    let report = Switcher::new(env, &fetcher, &runtime).switch(&config, &manifest, &containers)?;

    for entry in &report.packages {
        Output::step(format!("{} {} ({})", entry.name(), entry.version(), entry.binaries().join(", ")));
    }
    for (name, outcome) in &report.containers {
        let state = match outcome {
            EnsureOutcome::Created => "created".to_string(),
            EnsureOutcome::Recreated { previous } => format!("recreated, was {previous}"),
            EnsureOutcome::Started => "started".to_string(),
            EnsureOutcome::Unchanged => "running".to_string(),
        };
        Output::step(format!("container {name} ({state})"));
    }
    for command in &report.gc.removed {
        Output::step(format!("removed stale link {command}"));
    }
    for (command, err) in &report.gc.failed {
        Output::warning(format!("Failed to remove link {command}: {err}"));
    }

    Output::success(format!("Switched to {}", config.name));
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
