use super::{CreateOptions, ExecOptions, Instance, RuntimeAdapter};
use crate::error::RuntimeError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Exists(String),
    IsRunning(String),
    Start(String),
    Stop(String),
    Remove(String),
    Create {
        name: String,
        image: String,
        options: CreateOptions,
    },
    Exec {
        name: String,
        options: ExecOptions,
    },
    ImageExists(String),
    PullImage(String),
    GetImage(String),
    List,
    PruneImages(bool),
}

impl RuntimeCall {
    /// Whether the call changes runtime state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            RuntimeCall::Start(_)
                | RuntimeCall::Stop(_)
                | RuntimeCall::Remove(_)
                | RuntimeCall::Create { .. }
                | RuntimeCall::PullImage(_)
                | RuntimeCall::PruneImages(_)
        )
    }
}

#[derive(Debug, Clone)]
struct FakeContainer {
    image: String,
    running: bool,
}

#[derive(Debug, Default)]
struct State {
    containers: BTreeMap<String, FakeContainer>,
    images: BTreeSet<String>,
    calls: Vec<RuntimeCall>,
    exec_exit_code: i32,
    failing: BTreeSet<String>,
}

/// In-memory [`RuntimeAdapter`] that records every call.
///
/// Names registered with [`FakeRuntime::fail_on`] make every operation that
/// targets them fail, which stands in for an unreachable daemon.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, name: &str, image: &str, running: bool) -> Self {
        self.lock().containers.insert(
            name.to_string(),
            FakeContainer {
                image: image.to_string(),
                running,
            },
        );
        self
    }

    pub fn with_image(self, image: &str) -> Self {
        self.lock().images.insert(image.to_string());
        self
    }

    pub fn with_exec_exit_code(self, code: i32) -> Self {
        self.lock().exec_exit_code = code;
        self
    }

    pub fn fail_on(self, name: &str) -> Self {
        self.lock().failing.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<RuntimeCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// `(image, running)` of a container, if it exists.
    pub fn container(&self, name: &str) -> Option<(String, bool)> {
        self.lock()
            .containers
            .get(name)
            .map(|container| (container.image.clone(), container.running))
    }

    pub fn has_image(&self, image: &str) -> bool {
        self.lock().images.contains(image)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record `call`, then fail if `target` is marked as failing.
    fn record(&self, call: RuntimeCall, target: &str) -> Result<MutexGuard<'_, State>, RuntimeError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.failing.contains(target) {
            return Err(RuntimeError::Failed {
                command: format!("fake {target}"),
                code: Some(1),
                stderr: "injected failure".to_string(),
            });
        }
        Ok(state)
    }

    fn missing(name: &str) -> RuntimeError {
        RuntimeError::Failed {
            command: format!("fake {name}"),
            code: Some(1),
            stderr: format!("No such container: {name}"),
        }
    }
}

impl RuntimeAdapter for FakeRuntime {
    fn exists(&self, name: &str) -> Result<bool, RuntimeError> {
        let state = self.record(RuntimeCall::Exists(name.to_string()), name)?;
        Ok(state.containers.contains_key(name))
    }

    fn is_running(&self, name: &str) -> Result<bool, RuntimeError> {
        let state = self.record(RuntimeCall::IsRunning(name.to_string()), name)?;
        Ok(state.containers.get(name).is_some_and(|c| c.running))
    }

    fn start(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.record(RuntimeCall::Start(name.to_string()), name)?;
        let container = state.containers.get_mut(name).ok_or_else(|| Self::missing(name))?;
        container.running = true;
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.record(RuntimeCall::Stop(name.to_string()), name)?;
        let container = state.containers.get_mut(name).ok_or_else(|| Self::missing(name))?;
        container.running = false;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.record(RuntimeCall::Remove(name.to_string()), name)?;
        state
            .containers
            .remove(name)
            .map(drop)
            .ok_or_else(|| Self::missing(name))
    }

    fn create(&self, name: &str, image: &str, options: &CreateOptions) -> Result<(), RuntimeError> {
        let call = RuntimeCall::Create {
            name: name.to_string(),
            image: image.to_string(),
            options: options.clone(),
        };
        let mut state = self.record(call, name)?;
        if state.containers.contains_key(name) {
            return Err(RuntimeError::Failed {
                command: format!("fake create {name}"),
                code: Some(125),
                stderr: format!("container name {name} is already in use"),
            });
        }
        state.images.insert(image.to_string());
        state.containers.insert(
            name.to_string(),
            FakeContainer {
                image: image.to_string(),
                running: true,
            },
        );
        Ok(())
    }

    fn exec(&self, name: &str, options: &ExecOptions) -> Result<i32, RuntimeError> {
        let call = RuntimeCall::Exec {
            name: name.to_string(),
            options: options.clone(),
        };
        let state = self.record(call, name)?;
        match state.containers.get(name) {
            Some(container) if container.running => Ok(state.exec_exit_code),
            _ => Err(Self::missing(name)),
        }
    }

    fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        let state = self.record(RuntimeCall::ImageExists(image.to_string()), image)?;
        Ok(state.images.contains(image))
    }

    fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        let mut state = self.record(RuntimeCall::PullImage(image.to_string()), image)?;
        state.images.insert(image.to_string());
        Ok(())
    }

    fn get_image(&self, name: &str) -> Result<String, RuntimeError> {
        let state = self.record(RuntimeCall::GetImage(name.to_string()), name)?;
        state
            .containers
            .get(name)
            .map(|container| container.image.clone())
            .ok_or_else(|| Self::missing(name))
    }

    fn list(&self, filters: &BTreeMap<String, String>) -> Result<Vec<Instance>, RuntimeError> {
        let state = self.record(RuntimeCall::List, "")?;
        let name_filter = filters.get("name");
        Ok(state
            .containers
            .iter()
            .filter(|(name, _)| name_filter.map_or(true, |needle| name.contains(needle.as_str())))
            .map(|(name, container)| Instance {
                name: name.clone(),
                status: if container.running {
                    "Up".to_string()
                } else {
                    "Exited (0)".to_string()
                },
                image: container.image.clone(),
            })
            .collect())
    }

    fn prune_images(&self, aggressive: bool) -> Result<(), RuntimeError> {
        let mut state = self.record(RuntimeCall::PruneImages(aggressive), "")?;
        if aggressive {
            let in_use: BTreeSet<String> = state
                .containers
                .values()
                .map(|container| container.image.clone())
                .collect();
            state.images.retain(|image| in_use.contains(image));
        }
        Ok(())
    }
}
