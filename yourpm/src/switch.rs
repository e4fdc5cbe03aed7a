//! One reconciliation pass: packages, then containers, then link cleanup.

use crate::config::Config;
use crate::container::{ContainerReconciler, ContainerSpec, EnsureOutcome};
use crate::environment::Environment;
use crate::error::Error;
use crate::executor;
use crate::fetch::Fetcher;
use crate::gc::{GcReport, SymlinkCollector};
use crate::manifest::{ContainerManifest, Manifest};
use crate::platform::Platform;
use crate::profile::Profile;
use crate::runtime::RuntimeAdapter;
use crate::store::{Store, StoreEntry};
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct SwitchReport {
    pub packages: Vec<StoreEntry>,
    pub containers: Vec<(String, EnsureOutcome)>,
    pub gc: GcReport,
}

pub struct Switcher<'a> {
    env: &'a Environment,
    fetcher: &'a dyn Fetcher,
    runtime: &'a dyn RuntimeAdapter,
    platform: Platform,
    executor_candidates: Vec<PathBuf>,
}

impl<'a> Switcher<'a> {
    pub fn new(env: &'a Environment, fetcher: &'a dyn Fetcher, runtime: &'a dyn RuntimeAdapter) -> Self {
        Self {
            env,
            fetcher,
            runtime,
            platform: Platform::current(),
            executor_candidates: executor::default_candidates(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_executor_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.executor_candidates = candidates;
        self
    }

    /// Converge the machine on `config`. The first error aborts the pass;
    /// items already handled stay applied.
    pub fn switch(
        &self,
        config: &Config,
        manifest: &Manifest,
        containers: &ContainerManifest,
    ) -> Result<SwitchReport, Error> {
        let store = Store::new(self.env.store_dir());
        let profile = Profile::new(self.env.profile_bin_dir());
        let mut report = SwitchReport::default();

        for (name, version) in &config.packages {
            let entry = self.switch_package(&store, &profile, manifest, name, version)?;
            report.packages.push(entry);
        }

        let reconciler = ContainerReconciler::new(self.runtime);
        for (name, container) in &config.containers {
            let definition = containers.container(name)?;
            let spec = ContainerSpec::from_definition(name, container, definition);

            reconciler.ensure_image(&spec.image)?;
            let outcome = reconciler.ensure(&spec.instance_name(), &spec.image, &spec)?;

            let executor = executor::provision_executor(&self.env.executor_path(), &self.executor_candidates)?;
            let entry = store.install_container_commands(name, &container.version, &spec.commands, &executor)?;
            profile.link(entry.root(), entry.binaries())?;

            tracing::info!(container = %name, outcome = ?outcome, "container ready");
            report.containers.push((name.clone(), outcome));
        }

        let collector = SymlinkCollector::new(
            self.env.profile_bin_dir(),
            self.env.store_dir(),
            self.env.executor_path(),
        );
        report.gc = collector.cleanup_orphans(config)?;

        Ok(report)
    }

    fn switch_package(
        &self,
        store: &Store,
        profile: &Profile,
        manifest: &Manifest,
        name: &str,
        version: &str,
    ) -> Result<StoreEntry, Error> {
        let url = manifest.url(name, version, &self.platform)?;
        let binaries = manifest.binary_names(name)?;
        let download = self.env.cache_dir().join(cache_file_name(name, version, &url));

        self.fetcher.download(&url, &download)?;
        let entry = store.install(name, version, &download, &binaries)?;
        profile.link(entry.root(), entry.binaries())?;

        tracing::info!(package = name, version, "package ready");
        Ok(entry)
    }
}

/// `{name}-{version}-{last url segment}`, keeping the artifact's suffix so the
/// store can tell archives from raw binaries.
pub fn cache_file_name(name: &str, version: &str, url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().filter(|segment| !segment.is_empty()).unwrap_or(name);
    format!("{name}-{version}-{file}")
}
