//! Container lifecycle reconciliation.
//!
//! Every decision re-queries the runtime; nothing about a container is
//! remembered between calls.

use crate::config::ContainerConfig;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::manifest::ContainerDefinition;
use crate::runtime::{CreateOptions, ExecOptions, RuntimeAdapter};
use is_terminal::IsTerminal;

/// Desired shape of one container-backed tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    /// `repository:version`.
    pub image: String,
    pub workdir: Option<String>,
    pub volumes: Vec<String>,
    pub commands: Vec<String>,
    /// Replaces the keep-alive command when non-empty.
    pub command: Vec<String>,
}

impl ContainerSpec {
    pub fn from_definition(name: &str, config: &ContainerConfig, definition: &ContainerDefinition) -> Self {
        Self {
            name: name.to_string(),
            image: config.image_ref(),
            workdir: definition
                .workdir
                .as_ref()
                .filter(|dir| !dir.trim().is_empty())
                .cloned(),
            volumes: definition.volumes.clone(),
            commands: definition.commands.clone(),
            command: definition.command.clone(),
        }
    }

    pub fn instance_name(&self) -> String {
        Environment::instance_name(&self.name)
    }

    fn create_options(&self) -> CreateOptions {
        CreateOptions {
            volumes: self.volumes.clone(),
            workdir: self.workdir.clone(),
            entrypoint: Some(String::new()),
            command: self.command.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    Recreated { previous: String },
    Started,
    Unchanged,
}

pub struct ContainerReconciler<'a> {
    runtime: &'a dyn RuntimeAdapter,
}

impl<'a> ContainerReconciler<'a> {
    pub fn new(runtime: &'a dyn RuntimeAdapter) -> Self {
        Self { runtime }
    }

    /// Make `full_name` exist, run `desired_image`, and be running.
    pub fn ensure(
        &self,
        full_name: &str,
        desired_image: &str,
        spec: &ContainerSpec,
    ) -> Result<EnsureOutcome, RuntimeError> {
        if !self.runtime.exists(full_name)? {
            self.runtime
                .create(full_name, desired_image, &spec.create_options())?;
            tracing::info!(container = full_name, image = desired_image, "created container");
            return Ok(EnsureOutcome::Created);
        }

        let current = self.runtime.get_image(full_name)?;
        if current != desired_image {
            self.runtime.remove(full_name)?;
            self.runtime
                .create(full_name, desired_image, &spec.create_options())?;
            tracing::info!(
                container = full_name,
                from = %current,
                to = desired_image,
                "recreated container for new image"
            );
            return Ok(EnsureOutcome::Recreated { previous: current });
        }

        if !self.runtime.is_running(full_name)? {
            self.runtime.start(full_name)?;
            tracing::info!(container = full_name, "started container");
            return Ok(EnsureOutcome::Started);
        }

        tracing::debug!(container = full_name, "container up to date");
        Ok(EnsureOutcome::Unchanged)
    }

    /// Run `command args...` inside the container with inherited stdio and
    /// return its exit code. A TTY is requested when stdin is a terminal.
    pub fn execute_command(
        &self,
        full_name: &str,
        spec: &ContainerSpec,
        command: &str,
        args: &[String],
    ) -> Result<i32, RuntimeError> {
        let tty = std::io::stdin().is_terminal();
        self.execute_with_tty(full_name, spec, command, args, tty)
    }

    fn execute_with_tty(
        &self,
        full_name: &str,
        spec: &ContainerSpec,
        command: &str,
        args: &[String],
        tty: bool,
    ) -> Result<i32, RuntimeError> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(command.to_string());
        argv.extend(args.iter().cloned());

        let options = ExecOptions {
            interactive: true,
            tty,
            workdir: spec.workdir.clone(),
            command: argv,
        };
        self.runtime.exec(full_name, &options)
    }

    /// Pull `image` unless the runtime already has it. Returns whether a pull
    /// happened.
    pub fn ensure_image(&self, image: &str) -> Result<bool, RuntimeError> {
        if self.runtime.image_exists(image)? {
            return Ok(false);
        }
        tracing::info!(image, "pulling image");
        self.runtime.pull_image(image)?;
        Ok(true)
    }
}
