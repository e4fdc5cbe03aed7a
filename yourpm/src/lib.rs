pub mod cli;
pub mod command_runner;
pub mod commands;
pub mod config;
pub mod container;
pub mod environment;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod gc;
pub mod manifest;
pub mod output;
pub mod platform;
pub mod profile;
pub mod prune;
pub mod runtime;
pub mod store;
pub mod switch;

pub use cli::{Cli, Commands};
pub use config::{Config, ContainerConfig};
pub use container::{ContainerReconciler, ContainerSpec, EnsureOutcome};
pub use environment::Environment;
pub use error::{
    ConfigError, Error, FetchError, InstallError, LinkError, ManifestError, RuntimeError,
};
pub use fetch::{Fetcher, HttpFetcher};
pub use gc::{GcReport, SymlinkCollector};
pub use manifest::{ContainerManifest, Manifest};
pub use platform::Platform;
pub use profile::Profile;
pub use prune::{PruneReport, PruneService};
pub use runtime::{DockerCli, FakeRuntime, RuntimeAdapter};
pub use store::{EntryKind, Store, StoreEntry};
pub use switch::{SwitchReport, Switcher};

