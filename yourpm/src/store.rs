//! Content-addressed store of installed artifacts.
//!
//! Every entry lives at `store/{name}-{version}` and is never modified once it
//! exists. Entries are assembled in a staging directory beside their final
//! location and renamed into place, so a directory at the entry path is always
//! complete.

use crate::error::InstallError;
use crate::profile::{create_symlink, remove_existing};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use yourpm_common::archive::{self, ArtifactKind};

pub const ENTRY_METADATA_FILE: &str = ".yourpm-entry.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Package,
    Container,
}

/// Record written into every entry directory describing what it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub name: String,
    pub version: String,
    pub kind: EntryKind,
    #[serde(default)]
    pub binaries: Vec<String>,
}

impl EntryMetadata {
    /// Read the record of `entry_dir`; `None` when the entry predates it.
    pub fn read(entry_dir: &Path) -> Result<Option<Self>, InstallError> {
        let path = entry_dir.join(ENTRY_METADATA_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(InstallError::io(path, err)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| InstallError::Metadata { path, source })
    }

    fn write(&self, entry_dir: &Path) -> Result<(), InstallError> {
        let path = entry_dir.join(ENTRY_METADATA_FILE);
        let content = serde_json::to_string_pretty(self).map_err(|source| InstallError::Metadata {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, content).map_err(|err| InstallError::io(path, err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    root: PathBuf,
    metadata: EntryMetadata,
}

impl StoreEntry {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    pub fn kind(&self) -> EntryKind {
        self.metadata.kind
    }

    pub fn binaries(&self) -> &[String] {
        &self.metadata.binaries
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(format!("{name}-{version}"))
    }

    /// Install a downloaded artifact as `name@version`.
    ///
    /// `.tar.gz`/`.tgz` sources are unpacked and each of `binaries` (or `name`
    /// when empty) is pulled out of the tree; any other source is taken as the
    /// binary itself. An existing entry is returned untouched.
    pub fn install(
        &self,
        name: &str,
        version: &str,
        source: &Path,
        binaries: &[String],
    ) -> Result<StoreEntry, InstallError> {
        let target = self.entry_path(name, version);
        let kind = archive::detect_artifact_kind(source);
        let requested = match kind {
            ArtifactKind::Raw => vec![name.to_string()],
            ArtifactKind::TarGz if binaries.is_empty() => vec![name.to_string()],
            ArtifactKind::TarGz => binaries.to_vec(),
        };

        if target.exists() {
            tracing::debug!(entry = %target.display(), "already installed");
            let metadata = EntryMetadata::read(&target)?.unwrap_or_else(|| EntryMetadata {
                name: name.to_string(),
                version: version.to_string(),
                kind: EntryKind::Package,
                binaries: requested,
            });
            return Ok(StoreEntry {
                root: target,
                metadata,
            });
        }

        if !source.is_file() {
            return Err(InstallError::SourceMissing(source.to_path_buf()));
        }

        fs::create_dir_all(&self.root).map_err(|err| InstallError::io(&self.root, err))?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)
            .map_err(|err| InstallError::io(&self.root, err))?;

        match kind {
            ArtifactKind::Raw => install_raw(source, staging.path(), name)?,
            ArtifactKind::TarGz => self.install_archive(source, staging.path(), &requested)?,
        }

        let metadata = EntryMetadata {
            name: name.to_string(),
            version: version.to_string(),
            kind: EntryKind::Package,
            binaries: requested,
        };
        metadata.write(staging.path())?;

        fs::rename(staging.path(), &target).map_err(|err| InstallError::io(&target, err))?;
        tracing::info!(package = name, version, entry = %target.display(), "installed");

        Ok(StoreEntry {
            root: target,
            metadata,
        })
    }

    fn install_archive(
        &self,
        source: &Path,
        staging: &Path,
        binaries: &[String],
    ) -> Result<(), InstallError> {
        let scratch = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(&self.root)
            .map_err(|err| InstallError::io(&self.root, err))?;
        archive::unpack_tar_gz(source, scratch.path())?;

        for binary in binaries {
            let found = archive::find_binary(scratch.path(), binary).ok_or_else(|| {
                InstallError::BinaryNotFound {
                    binary: binary.clone(),
                    archive: source.to_path_buf(),
                }
            })?;
            let dest = staging.join(binary);
            archive::relocate(&found, &dest)?;
            archive::set_executable(&dest)?;
        }

        Ok(())
    }

    /// Materialize the command entry of a container: one symlink per command,
    /// all pointing at the shared executor.
    pub fn install_container_commands(
        &self,
        name: &str,
        version: &str,
        commands: &[String],
        executor: &Path,
    ) -> Result<StoreEntry, InstallError> {
        let target = self.entry_path(name, version);
        fs::create_dir_all(&target).map_err(|err| InstallError::io(&target, err))?;

        for command in commands {
            let link = target.join(command);
            remove_existing(&link).map_err(|err| InstallError::io(&link, err))?;
            create_symlink(executor, &link).map_err(|err| InstallError::io(&link, err))?;
        }

        let metadata = EntryMetadata {
            name: name.to_string(),
            version: version.to_string(),
            kind: EntryKind::Container,
            binaries: commands.to_vec(),
        };
        metadata.write(&target)?;
        tracing::debug!(container = name, entry = %target.display(), "container commands ready");

        Ok(StoreEntry {
            root: target,
            metadata,
        })
    }
}

fn install_raw(source: &Path, staging: &Path, name: &str) -> Result<(), InstallError> {
    let dest = staging.join(name);
    fs::copy(source, &dest).map_err(|err| InstallError::io(&dest, err))?;
    archive::set_executable(&dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::os::unix::fs::PermissionsExt;

    fn write_tarball(path: &Path, files: &[(&str, &[u8])]) {
        let file = fs::File::create(path).expect("create tarball");
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).expect("append");
        }
        builder.into_inner().expect("tar").finish().expect("gzip");
    }

    fn is_executable(path: &Path) -> bool {
        fs::metadata(path).unwrap().permissions().mode() & 0o111 != 0
    }

    #[test]
    fn installs_raw_binary_as_package_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source = temp.path().join("jq-linux-amd64");
        fs::write(&source, b"#!/bin/sh\necho jq\n").unwrap();
        let store = Store::new(temp.path().join("store"));

        let entry = store.install("jq", "1.7.1", &source, &[]).expect("install");

        assert_eq!(entry.root(), temp.path().join("store/jq-1.7.1"));
        assert_eq!(entry.binaries(), ["jq".to_string()]);
        assert_eq!(entry.kind(), EntryKind::Package);
        assert!(is_executable(&entry.root().join("jq")));
        assert!(source.exists());
    }

    #[test]
    fn second_install_leaves_entry_untouched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source = temp.path().join("jq");
        fs::write(&source, b"v1").unwrap();
        let store = Store::new(temp.path().join("store"));
        let first = store.install("jq", "1.7.1", &source, &[]).expect("first");
        let sentinel = first.root().join("sentinel");
        fs::write(&sentinel, b"keep me").unwrap();

        fs::write(&source, b"v2").unwrap();
        let second = store.install("jq", "1.7.1", &source, &[]).expect("second");

        assert_eq!(second.root(), first.root());
        assert_eq!(fs::read(&sentinel).unwrap(), b"keep me");
        assert_eq!(fs::read(first.root().join("jq")).unwrap(), b"v1");
    }

    #[test]
    fn extracts_only_requested_binaries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source = temp.path().join("jq-1.7.tar.gz");
        write_tarball(
            &source,
            &[("tools/bin/jq", b"jq-binary"), ("tools/README", b"docs")],
        );
        let store = Store::new(temp.path().join("store"));

        let entry = store
            .install("jq", "1.7", &source, &["jq".to_string()])
            .expect("install");

        let mut names: Vec<_> = fs::read_dir(entry.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![ENTRY_METADATA_FILE.to_string(), "jq".to_string()]);
        assert!(is_executable(&entry.root().join("jq")));
        assert_eq!(fs::read(entry.root().join("jq")).unwrap(), b"jq-binary");
    }

    #[test]
    fn missing_binary_fails_without_partial_entry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source = temp.path().join("tools.tgz");
        write_tarball(&source, &[("tools/bin/jq", b"jq")]);
        let store = Store::new(temp.path().join("store"));

        let err = store
            .install("tools", "1", &source, &["jq".to_string(), "yq".to_string()])
            .expect_err("yq is missing");

        assert!(matches!(err, InstallError::BinaryNotFound { ref binary, .. } if binary == "yq"));
        assert!(!store.entry_path("tools", "1").exists());
        let leftovers: Vec<_> = fs::read_dir(store.root()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn missing_source_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = Store::new(temp.path().join("store"));

        let err = store
            .install("jq", "1", &temp.path().join("nope"), &[])
            .expect_err("missing");
        assert!(matches!(err, InstallError::SourceMissing(_)));
    }

    #[test]
    fn existing_entry_without_metadata_uses_requested_names() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = Store::new(temp.path().join("store"));
        fs::create_dir_all(store.entry_path("ripgrep", "14")).unwrap();

        let entry = store
            .install("ripgrep", "14", Path::new("/unused.tar.gz"), &["rg".to_string()])
            .expect("fast path");
        assert_eq!(entry.binaries(), ["rg".to_string()]);
    }

    #[test]
    fn container_commands_point_at_executor() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = temp.path().join("bin/container-exec");
        fs::create_dir_all(executor.parent().unwrap()).unwrap();
        fs::write(&executor, b"exec").unwrap();
        let store = Store::new(temp.path().join("store"));
        let commands = vec!["node".to_string(), "npm".to_string()];

        store
            .install_container_commands("node", "20", &commands, &executor)
            .expect("first");
        let entry = store
            .install_container_commands("node", "20", &commands, &executor)
            .expect("again");

        assert_eq!(entry.kind(), EntryKind::Container);
        for command in &commands {
            assert_eq!(fs::read_link(entry.root().join(command)).unwrap(), executor);
        }
        let metadata = EntryMetadata::read(entry.root()).unwrap().expect("record");
        assert_eq!(metadata.kind, EntryKind::Container);
        assert_eq!(metadata.binaries, commands);
    }

    #[test]
    fn metadata_serializes_kind_lowercase() {
        let metadata = EntryMetadata {
            name: "jq".to_string(),
            version: "1.7".to_string(),
            kind: EntryKind::Package,
            binaries: vec!["jq".to_string()],
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["kind"], "package");
    }
}
