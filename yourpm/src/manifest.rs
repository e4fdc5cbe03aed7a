//! Package and container catalogs.
//!
//! `manifest.toml` maps package names to per-platform download URLs;
//! `containers.toml` describes how container-backed tools are run.

use crate::error::ManifestError;
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub packages: BTreeMap<String, PackageDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageDefinition {
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub binaries: BinaryInfo,
    #[serde(default)]
    pub urls: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinaryInfo {
    #[serde(default)]
    pub names: Vec<String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        load_toml(path)
    }

    pub fn package(&self, name: &str) -> Result<&PackageDefinition, ManifestError> {
        self.packages
            .get(name)
            .ok_or_else(|| ManifestError::PackageNotFound(name.to_string()))
    }

    /// Download URL for `name@version` on `platform`, with `{version}`
    /// substituted.
    pub fn url(&self, name: &str, version: &str, platform: &Platform) -> Result<String, ManifestError> {
        let package = self.package(name)?;
        let template = platform
            .keys()
            .iter()
            .find_map(|key| package.urls.get(key))
            .ok_or_else(|| ManifestError::UnsupportedPlatform {
                package: name.to_string(),
                platform: platform.to_string(),
            })?;
        Ok(template.replace("{version}", version))
    }

    /// Binaries a package exposes; defaults to the package name itself.
    pub fn binary_names(&self, name: &str) -> Result<Vec<String>, ManifestError> {
        let package = self.package(name)?;
        if package.binaries.names.is_empty() {
            Ok(vec![name.to_string()])
        } else {
            Ok(package.binaries.names.clone())
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerManifest {
    #[serde(default)]
    pub containers: BTreeMap<String, ContainerDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Keep-alive command overriding `tail -f /dev/null`.
    #[serde(default)]
    pub command: Vec<String>,
}

impl ContainerManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        load_toml(path)
    }

    pub fn container(&self, name: &str) -> Result<&ContainerDefinition, ManifestError> {
        self.containers
            .get(name)
            .ok_or_else(|| ManifestError::ContainerNotFound(name.to_string()))
    }
}

fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
