//! Removal of stale profile links.
//!
//! A link is stale when it no longer resolves, or when it exposes a command of
//! a container that the active config no longer declares. Package links are
//! never collected: their store entries are immutable and may still be wanted.

use crate::config::Config;
use crate::error::LinkError;
use crate::store::{EntryKind, EntryMetadata};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not a symlink; left alone.
    Ignore,
    Keep,
    RemoveBroken,
    RemoveInactiveContainer(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GcReport {
    pub removed: Vec<String>,
    pub kept: usize,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct SymlinkCollector {
    profile_bin: PathBuf,
    store_root: PathBuf,
    executor: PathBuf,
}

impl SymlinkCollector {
    pub fn new(
        profile_bin: impl Into<PathBuf>,
        store_root: impl Into<PathBuf>,
        executor: impl Into<PathBuf>,
    ) -> Self {
        Self {
            profile_bin: profile_bin.into(),
            store_root: store_root.into(),
            executor: executor.into(),
        }
    }

    pub fn cleanup_orphans(&self, config: &Config) -> Result<GcReport, LinkError> {
        let mut report = GcReport::default();
        if !self.profile_bin.is_dir() {
            return Ok(report);
        }

        let scan_err = |source| LinkError::Scan {
            path: self.profile_bin.clone(),
            source,
        };
        let mut entries = fs::read_dir(&self.profile_bin)
            .map_err(scan_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(scan_err)?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let command = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            let verdict = self.classify(&path, config);

            match verdict {
                Verdict::Ignore => {}
                Verdict::Keep => report.kept += 1,
                Verdict::RemoveBroken | Verdict::RemoveInactiveContainer(_) => {
                    match fs::remove_file(&path) {
                        Ok(()) => {
                            tracing::info!(command = %command, reason = ?verdict, "removed orphaned link");
                            report.removed.push(command);
                        }
                        Err(err) => {
                            tracing::warn!(command = %command, error = %err, "failed to remove link");
                            report.failed.push((command, err.to_string()));
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Decide the fate of one profile entry.
    pub fn classify(&self, link: &Path, config: &Config) -> Verdict {
        let is_symlink = fs::symlink_metadata(link)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if !is_symlink {
            return Verdict::Ignore;
        }

        let Ok(raw_target) = fs::read_link(link) else {
            return Verdict::Ignore;
        };
        if fs::metadata(link).is_err() {
            return Verdict::RemoveBroken;
        }

        let target = match link.parent() {
            Some(parent) if raw_target.is_relative() => parent.join(raw_target),
            _ => raw_target,
        };
        let Ok(relative) = target.strip_prefix(&self.store_root) else {
            return Verdict::Keep;
        };
        let mut components = relative.components();
        let Some(entry_name) = components.next() else {
            return Verdict::Keep;
        };
        let entry_name = entry_name.as_os_str().to_string_lossy().into_owned();
        let entry_dir = self.store_root.join(&entry_name);

        match EntryMetadata::read(&entry_dir) {
            Ok(Some(metadata)) => {
                if metadata.kind == EntryKind::Container && !config.declares_container(&metadata.name)
                {
                    Verdict::RemoveInactiveContainer(metadata.name)
                } else {
                    Verdict::Keep
                }
            }
            Ok(None) => self.classify_legacy(&target, &entry_name, config),
            Err(err) => {
                tracing::warn!(entry = %entry_dir.display(), error = %err, "unreadable entry metadata");
                self.classify_legacy(&target, &entry_name, config)
            }
        }
    }

    /// Entries without a metadata record are recognized by shape: a container
    /// entry holds symlinks to the shared executor.
    fn classify_legacy(&self, target: &Path, entry_name: &str, config: &Config) -> Verdict {
        let points_at_executor = fs::read_link(target)
            .map(|dest| dest == self.executor)
            .unwrap_or(false);
        if !points_at_executor {
            return Verdict::Keep;
        }

        let declared = config
            .containers
            .keys()
            .any(|name| entry_name.starts_with(&format!("{name}-")));
        if declared {
            Verdict::Keep
        } else {
            Verdict::RemoveInactiveContainer(entry_name.to_string())
        }
    }
}
