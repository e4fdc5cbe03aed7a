//! Abstraction over external process execution.
//!
//! The container runtime is driven entirely through its CLI; [`CommandRunner`]
//! is the seam that lets [`DockerCli`](crate::runtime::DockerCli) be exercised
//! without spawning `docker`.

use std::io;
use std::process::{Command, ExitStatus, Output};

pub trait CommandRunner: Send + Sync {
    /// Run a command and capture stdout, stderr and exit status.
    fn run_output(&self, program: &str, args: &[String]) -> io::Result<Output>;

    /// Run a command with inherited stdio and return its exit status.
    fn run_status(&self, program: &str, args: &[String]) -> io::Result<ExitStatus>;
}

/// Delegates to [`std::process::Command`].
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run_output(&self, program: &str, args: &[String]) -> io::Result<Output> {
        tracing::trace!(program, ?args, "running");
        Command::new(program).args(args).output()
    }

    fn run_status(&self, program: &str, args: &[String]) -> io::Result<ExitStatus> {
        tracing::trace!(program, ?args, "running interactively");
        Command::new(program).args(args).status()
    }
}
