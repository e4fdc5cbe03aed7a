//! Container runtime adapters.
//!
//! [`RuntimeAdapter`] maps each lifecycle operation onto exactly one runtime
//! invocation. [`DockerCli`] drives the `docker` (or `podman`) CLI;
//! [`FakeRuntime`] keeps containers in memory for tests.

mod fake;

pub use fake::{FakeRuntime, RuntimeCall};

use crate::command_runner::{CommandRunner, RealCommandRunner};
use crate::error::RuntimeError;
use std::collections::BTreeMap;
use std::process::{ExitStatus, Output};
use std::sync::Arc;

/// Keep-alive command used when a container has no explicit command.
pub const KEEP_ALIVE: [&str; 3] = ["tail", "-f", "/dev/null"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub volumes: Vec<String>,
    pub workdir: Option<String>,
    /// `Some("")` clears the image entrypoint.
    pub entrypoint: Option<String>,
    /// Empty means [`KEEP_ALIVE`].
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    pub interactive: bool,
    pub tty: bool,
    pub workdir: Option<String>,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub status: String,
    pub image: String,
}

pub trait RuntimeAdapter: Send + Sync {
    fn exists(&self, name: &str) -> Result<bool, RuntimeError>;
    fn is_running(&self, name: &str) -> Result<bool, RuntimeError>;
    fn start(&self, name: &str) -> Result<(), RuntimeError>;
    fn stop(&self, name: &str) -> Result<(), RuntimeError>;
    /// Force-remove, stopping first if needed.
    fn remove(&self, name: &str) -> Result<(), RuntimeError>;
    fn create(&self, name: &str, image: &str, options: &CreateOptions) -> Result<(), RuntimeError>;
    /// Run a command with inherited stdio and return its exit code.
    fn exec(&self, name: &str, options: &ExecOptions) -> Result<i32, RuntimeError>;
    fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;
    fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;
    fn get_image(&self, name: &str) -> Result<String, RuntimeError>;
    fn list(&self, filters: &BTreeMap<String, String>) -> Result<Vec<Instance>, RuntimeError>;
    /// Dangling images only, or every unused image when `aggressive`.
    fn prune_images(&self, aggressive: bool) -> Result<(), RuntimeError>;
}

/// [`RuntimeAdapter`] backed by the docker-compatible CLI.
pub struct DockerCli {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_runner(program, Arc::new(RealCommandRunner))
    }

    pub fn with_runner(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    fn output(&self, args: &[String]) -> Result<Output, RuntimeError> {
        self.runner
            .run_output(&self.program, args)
            .map_err(|source| RuntimeError::Spawn {
                command: self.describe(args),
                source,
            })
    }

    /// Run and require success, returning trimmed stdout.
    fn checked(&self, args: &[String]) -> Result<String, RuntimeError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(RuntimeError::Failed {
                command: self.describe(args),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn names_matching(&self, name: &str, all: bool) -> Result<bool, RuntimeError> {
        let mut cmd = args(&["ps"]);
        if all {
            cmd.push("-a".to_string());
        }
        let filter = format!("name=^{name}$");
        cmd.extend(args(&["--filter", filter.as_str(), "--format", "{{.Names}}"]));
        let stdout = self.checked(&cmd)?;
        Ok(stdout.lines().any(|line| line.trim() == name))
    }
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

impl RuntimeAdapter for DockerCli {
    fn exists(&self, name: &str) -> Result<bool, RuntimeError> {
        self.names_matching(name, true)
    }

    fn is_running(&self, name: &str) -> Result<bool, RuntimeError> {
        self.names_matching(name, false)
    }

    fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.checked(&args(&["start", name])).map(drop)
    }

    fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.checked(&args(&["stop", name])).map(drop)
    }

    fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        self.checked(&args(&["rm", "-f", name])).map(drop)
    }

    fn create(&self, name: &str, image: &str, options: &CreateOptions) -> Result<(), RuntimeError> {
        let mut cmd = args(&["run", "-d", "--name", name]);
        if let Some(entrypoint) = &options.entrypoint {
            cmd.push("--entrypoint".to_string());
            cmd.push(entrypoint.clone());
        }
        for volume in &options.volumes {
            cmd.push("-v".to_string());
            cmd.push(volume.clone());
        }
        if let Some(workdir) = &options.workdir {
            cmd.push("-w".to_string());
            cmd.push(workdir.clone());
        }
        cmd.push(image.to_string());
        if options.command.is_empty() {
            cmd.extend(args(&KEEP_ALIVE));
        } else {
            cmd.extend(options.command.iter().cloned());
        }
        self.checked(&cmd).map(drop)
    }

    fn exec(&self, name: &str, options: &ExecOptions) -> Result<i32, RuntimeError> {
        let mut cmd = args(&["exec"]);
        match (options.interactive, options.tty) {
            (true, true) => cmd.push("-it".to_string()),
            (true, false) => cmd.push("-i".to_string()),
            _ => {}
        }
        if let Some(workdir) = &options.workdir {
            cmd.push("-w".to_string());
            cmd.push(workdir.clone());
        }
        cmd.push(name.to_string());
        cmd.extend(options.command.iter().cloned());

        let status = self
            .runner
            .run_status(&self.program, &cmd)
            .map_err(|source| RuntimeError::Spawn {
                command: self.describe(&cmd),
                source,
            })?;
        Ok(exit_code(status))
    }

    fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        Ok(self.output(&args(&["image", "inspect", image]))?.status.success())
    }

    fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        let cmd = args(&["pull", image]);
        let status = self
            .runner
            .run_status(&self.program, &cmd)
            .map_err(|source| RuntimeError::Spawn {
                command: self.describe(&cmd),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(RuntimeError::Failed {
                command: self.describe(&cmd),
                code: status.code(),
                stderr: String::new(),
            })
        }
    }

    fn get_image(&self, name: &str) -> Result<String, RuntimeError> {
        self.checked(&args(&["inspect", "--format", "{{.Config.Image}}", name]))
    }

    fn list(&self, filters: &BTreeMap<String, String>) -> Result<Vec<Instance>, RuntimeError> {
        let mut cmd = args(&["ps", "-a", "--format", "{{.Names}}|{{.Status}}|{{.Image}}"]);
        for (key, value) in filters {
            cmd.push("--filter".to_string());
            cmd.push(format!("{key}={value}"));
        }
        let stdout = self.checked(&cmd)?;
        Ok(parse_instances(&stdout))
    }

    fn prune_images(&self, aggressive: bool) -> Result<(), RuntimeError> {
        let mut cmd = args(&["image", "prune", "-f"]);
        if aggressive {
            cmd.push("-a".to_string());
        }
        self.checked(&cmd).map(drop)
    }
}

fn parse_instances(stdout: &str) -> Vec<Instance> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.trim().splitn(3, '|');
            let name = parts.next()?.trim();
            let status = parts.next()?.trim();
            let image = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(Instance {
                name: name.to_string(),
                status: status.to_string(),
                image: image.to_string(),
            })
        })
        .collect()
}
