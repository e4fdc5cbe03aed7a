use std::path::{Path, PathBuf};

/// Prefix shared by every runtime instance this tool manages.
pub const INSTANCE_PREFIX: &str = "yourpm-";

const HOME_ENV: &str = "YOURPM_HOME";
const RUNTIME_ENV: &str = "YOURPM_RUNTIME";
const DEFAULT_RUNTIME: &str = "docker";
const PROFILE_NAME: &str = "default";

/// Filesystem layout and runtime selection, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    base: PathBuf,
    runtime_program: String,
}

impl Environment {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            runtime_program: DEFAULT_RUNTIME.to_string(),
        }
    }

    /// Resolve from `YOURPM_HOME` / `YOURPM_RUNTIME`, falling back to
    /// `~/.yourpm` and `docker`.
    pub fn from_env() -> Option<Self> {
        let base = match std::env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            Some(value) => PathBuf::from(value),
            None => dirs::home_dir()?.join(".yourpm"),
        };
        let mut env = Self::new(base);
        if let Ok(program) = std::env::var(RUNTIME_ENV) {
            if !program.trim().is_empty() {
                env.runtime_program = program.trim().to_string();
            }
        }
        Some(env)
    }

    pub fn with_runtime_program(mut self, program: impl Into<String>) -> Self {
        self.runtime_program = program.into();
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn runtime_program(&self) -> &str {
        &self.runtime_program
    }

    pub fn store_dir(&self) -> PathBuf {
        self.base.join("store")
    }

    pub fn profile_bin_dir(&self) -> PathBuf {
        self.base.join("profiles").join(PROFILE_NAME).join("bin")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.base.join("bin")
    }

    pub fn executor_path(&self) -> PathBuf {
        self.bin_dir().join(crate::executor::EXECUTOR_NAME)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.base.join("cache")
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base.join("manifest.toml")
    }

    pub fn containers_path(&self) -> PathBuf {
        self.base.join("containers.toml")
    }

    pub fn instance_name(logical: &str) -> String {
        format!("{INSTANCE_PREFIX}{logical}")
    }
}
