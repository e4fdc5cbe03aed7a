use anyhow::Result;

use crate::environment::Environment;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::manifest::Manifest;
use crate::output::Output;
use crate::profile::Profile;
use crate::store::Store;
use crate::switch::cache_file_name;

pub fn run(env: &Environment, name: &str, version: &str, url: &str) -> Result<()> {
    // Archives may ship several binaries; the manifest knows which.
    let binaries = if env.manifest_path().exists() {
        let manifest = Manifest::load(&env.manifest_path())?;
        manifest.binary_names(name).unwrap_or_default()
    } else {
        Vec::new()
    };

    let download = env.cache_dir().join(cache_file_name(name, version, url));
    HttpFetcher::new().download(url, &download)?;

    let entry = Store::new(env.store_dir()).install(name, version, &download, &binaries)?;
    Profile::new(env.profile_bin_dir()).link(entry.root(), entry.binaries())?;

    Output::success(format!("Installed {name} {version}"));
    Output::kv("Store", entry.root().display().to_string());
    Output::kv("Commands", entry.binaries().join(", "));
    Ok(())
}
