use crate::error::LinkError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The active profile: a directory of command symlinks into the store.
#[derive(Debug, Clone)]
pub struct Profile {
    bin_dir: PathBuf,
}

impl Profile {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Point `bin_dir/command` at `store_path/command` for every command,
    /// replacing whatever was there before.
    pub fn link(&self, store_path: &Path, commands: &[String]) -> Result<(), LinkError> {
        fs::create_dir_all(&self.bin_dir).map_err(|source| LinkError::CreateDir {
            path: self.bin_dir.clone(),
            source,
        })?;

        for command in commands {
            let target = store_path.join(command);
            let link = self.bin_dir.join(command);
            let link_err = |source| LinkError::Symlink {
                command: command.clone(),
                target: target.clone(),
                source,
            };
            remove_existing(&link).map_err(link_err)?;
            create_symlink(&target, &link).map_err(link_err)?;
            tracing::debug!(command = %command, target = %target.display(), "linked");
        }

        Ok(())
    }
}

/// Remove a file or symlink; a missing path is not an error.
pub(crate) fn remove_existing(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

pub(crate) fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)?;
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link)?;
    }

    #[cfg(not(any(unix, windows)))]
    {
        fs::copy(target, link)?;
    }

    Ok(())
}
