use crate::config::Config;
use crate::environment::{Environment, INSTANCE_PREFIX};
use crate::error::{Error, RuntimeError};
use crate::gc::{GcReport, SymlinkCollector};
use crate::runtime::RuntimeAdapter;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub kept: Vec<String>,
    pub removed: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub gc: GcReport,
}

/// Bulk removal of managed containers and unused images.
pub struct PruneService<'a> {
    runtime: &'a dyn RuntimeAdapter,
    collector: SymlinkCollector,
}

impl<'a> PruneService<'a> {
    pub fn new(runtime: &'a dyn RuntimeAdapter, collector: SymlinkCollector) -> Self {
        Self { runtime, collector }
    }

    /// Remove managed instances, then sweep the profile.
    ///
    /// Selective mode keeps an instance only when `desired` declares it and it
    /// is running; aggressive mode removes every managed instance. A declared
    /// instance whose run state cannot be queried is neither kept nor removed:
    /// it lands in `failed` and is left for the next prune.
    pub fn prune_containers(&self, aggressive: bool, desired: &Config) -> Result<PruneReport, Error> {
        let mut filters = BTreeMap::new();
        filters.insert("name".to_string(), INSTANCE_PREFIX.to_string());
        let instances = self.runtime.list(&filters)?;

        let wanted: BTreeSet<String> = desired
            .containers
            .keys()
            .map(|name| Environment::instance_name(name))
            .collect();

        let mut report = PruneReport::default();
        for instance in instances
            .into_iter()
            .filter(|instance| instance.name.starts_with(INSTANCE_PREFIX))
        {
            let name = instance.name;
            if !aggressive && wanted.contains(&name) {
                match self.runtime.is_running(&name) {
                    Ok(true) => {
                        tracing::info!(container = %name, "keeping running container");
                        report.kept.push(name);
                        continue;
                    }
                    Ok(false) => {
                        tracing::info!(container = %name, "declared container is stopped, removing");
                    }
                    Err(err) => {
                        tracing::warn!(container = %name, error = %err, "could not query container state");
                        report.failed.push((name, err.to_string()));
                        continue;
                    }
                }
            }

            match self.runtime.remove(&name) {
                Ok(()) => {
                    tracing::info!(container = %name, "removed container");
                    report.removed.push(name);
                }
                Err(err) => {
                    tracing::warn!(container = %name, error = %err, "failed to remove container");
                    report.failed.push((name, err.to_string()));
                }
            }
        }

        report.gc = self.collector.cleanup_orphans(desired)?;
        Ok(report)
    }

    pub fn prune_images(&self, aggressive: bool) -> Result<(), RuntimeError> {
        if aggressive {
            tracing::info!("removing all unused images");
        } else {
            tracing::info!("removing dangling images");
        }
        self.runtime.prune_images(aggressive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContainerConfig;
    use crate::runtime::{FakeRuntime, RuntimeCall};
    use std::fs;

    fn desired(names: &[&str]) -> Config {
        let mut config = Config {
            name: "test".to_string(),
            ..Config::default()
        };
        for name in names {
            config.containers.insert(
                name.to_string(),
                ContainerConfig {
                    image: name.to_string(),
                    version: "1".to_string(),
                },
            );
        }
        config
    }

    fn collector(temp: &tempfile::TempDir) -> SymlinkCollector {
        let env = Environment::new(temp.path());
        SymlinkCollector::new(env.profile_bin_dir(), env.store_dir(), env.executor_path())
    }

    fn removed(runtime: &FakeRuntime) -> Vec<String> {
        runtime
            .mutations()
            .into_iter()
            .filter_map(|call| match call {
                RuntimeCall::Remove(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn selective_prune_keeps_desired_running_containers() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runtime = FakeRuntime::new()
            .with_container("yourpm-a", "a:1", true)
            .with_container("yourpm-b", "b:1", false)
            .with_container("yourpm-stray", "s:1", true)
            .with_container("unrelated", "u:1", true);
        let service = PruneService::new(&runtime, collector(&temp));

        let report = service.prune_containers(false, &desired(&["a", "b"])).unwrap();

        assert_eq!(report.kept, vec!["yourpm-a".to_string()]);
        assert_eq!(report.removed, vec!["yourpm-b".to_string(), "yourpm-stray".to_string()]);
        assert_eq!(removed(&runtime), report.removed);
        assert!(runtime.container("unrelated").is_some());
    }

    #[test]
    fn aggressive_prune_removes_everything_managed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runtime = FakeRuntime::new()
            .with_container("yourpm-a", "a:1", true)
            .with_container("yourpm-b", "b:1", false);
        let service = PruneService::new(&runtime, collector(&temp));

        let report = service.prune_containers(true, &desired(&["a"])).unwrap();

        assert!(report.kept.is_empty());
        assert_eq!(removed(&runtime), vec!["yourpm-a", "yourpm-b"]);
    }

    #[test]
    fn failures_are_recorded_and_batch_continues() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runtime = FakeRuntime::new()
            .with_container("yourpm-a", "a:1", false)
            .with_container("yourpm-b", "b:1", false)
            .fail_on("yourpm-a");
        let service = PruneService::new(&runtime, collector(&temp));

        let report = service.prune_containers(false, &desired(&["a"])).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "yourpm-a");
        assert_eq!(report.removed, vec!["yourpm-b".to_string()]);
        assert!(runtime.container("yourpm-a").is_some());
    }

    #[test]
    fn declared_container_with_unknown_state_is_left_alone() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runtime = FakeRuntime::new()
            .with_container("yourpm-a", "a:1", true)
            .fail_on("yourpm-a");
        let service = PruneService::new(&runtime, collector(&temp));

        let report = service.prune_containers(false, &desired(&["a"])).unwrap();

        assert!(report.kept.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "yourpm-a");
        assert!(removed(&runtime).is_empty());
        assert_eq!(runtime.container("yourpm-a"), Some(("a:1".to_string(), true)));
    }

    #[test]
    fn prune_sweeps_broken_links() {
        let temp = tempfile::tempdir().expect("tempdir");
        let env = Environment::new(temp.path());
        fs::create_dir_all(env.profile_bin_dir()).unwrap();
        std::os::unix::fs::symlink(
            env.store_dir().join("node-20/node"),
            env.profile_bin_dir().join("node"),
        )
        .unwrap();
        let runtime = FakeRuntime::new();
        let service = PruneService::new(&runtime, collector(&temp));

        let report = service.prune_containers(true, &Config::default()).unwrap();

        assert_eq!(report.gc.removed, vec!["node".to_string()]);
    }

    #[test]
    fn image_prune_passes_flag() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runtime = FakeRuntime::new();
        let service = PruneService::new(&runtime, collector(&temp));

        service.prune_images(false).unwrap();
        service.prune_images(true).unwrap();

        assert_eq!(
            runtime.mutations(),
            vec![RuntimeCall::PruneImages(false), RuntimeCall::PruneImages(true)]
        );
    }
}
