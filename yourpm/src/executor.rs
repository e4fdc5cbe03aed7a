//! The shared container executor.
//!
//! Every container command in the store is a symlink to one `container-exec`
//! binary. It works out which command it was invoked as, makes sure the owning
//! container is up, and runs the command inside it.

use crate::config::Config;
use crate::container::{ContainerReconciler, ContainerSpec};
use crate::environment::Environment;
use crate::error::{Error, InstallError};
use crate::manifest::ContainerManifest;
use crate::runtime::RuntimeAdapter;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const EXECUTOR_NAME: &str = "container-exec";

const EXECUTOR_ENV: &str = "YOURPM_CONTAINER_EXEC";

/// Command name the executor was invoked as (base name of `argv[0]`).
pub fn command_name(argv0: &str) -> Option<String> {
    Path::new(argv0)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

/// Find the first declared container (in name order) whose definition
/// exposes `command`.
pub fn resolve_command(config: &Config, manifest: &ContainerManifest, command: &str) -> Option<ContainerSpec> {
    config.containers.iter().find_map(|(name, container)| {
        let definition = manifest.containers.get(name)?;
        definition
            .commands
            .iter()
            .any(|candidate| candidate == command)
            .then(|| ContainerSpec::from_definition(name, container, definition))
    })
}

/// Ensure the container owning `command` and run it there, returning the
/// command's exit code.
pub fn run_command(
    env: &Environment,
    runtime: &dyn RuntimeAdapter,
    command: &str,
    args: &[String],
) -> Result<i32, Error> {
    let config = Config::load(&env.config_path())?;
    let manifest = ContainerManifest::load(&env.containers_path())?;
    let spec = resolve_command(&config, &manifest, command)
        .ok_or_else(|| Error::UnknownCommand(command.to_string()))?;

    let reconciler = ContainerReconciler::new(runtime);
    let full_name = spec.instance_name();
    reconciler.ensure(&full_name, &spec.image, &spec)?;
    Ok(reconciler.execute_command(&full_name, &spec, command, args)?)
}

/// Where a fresh executor binary may be found: `YOURPM_CONTAINER_EXEC`, then
/// beside the running executable.
pub fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = std::env::var_os(EXECUTOR_ENV).filter(|value| !value.is_empty()) {
        candidates.push(PathBuf::from(path));
    }
    if let Some(dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        candidates.push(dir.join(EXECUTOR_NAME));
    }
    candidates
}

/// Copy the first existing candidate to `dest` unless `dest` already exists.
pub fn provision_executor(dest: &Path, candidates: &[PathBuf]) -> Result<PathBuf, InstallError> {
    if dest.is_file() {
        return Ok(dest.to_path_buf());
    }
    let source = candidates
        .iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| InstallError::ExecutorUnavailable {
            searched: candidates.to_vec(),
        })?;

    let dir = dest
        .parent()
        .ok_or_else(|| InstallError::io(dest, std::io::ErrorKind::InvalidInput.into()))?;
    fs::create_dir_all(dir).map_err(|err| InstallError::io(dir, err))?;

    let bytes = fs::read(source).map_err(|err| InstallError::io(source, err))?;
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|err| InstallError::io(dir, err))?;
    temp.write_all(&bytes).map_err(|err| InstallError::io(temp.path(), err))?;
    temp.persist(dest)
        .map_err(|err| InstallError::io(dest, err.error))?;
    yourpm_common::archive::set_executable(dest)?;

    tracing::info!(from = %source.display(), to = %dest.display(), "installed container executor");
    Ok(dest.to_path_buf())
}
