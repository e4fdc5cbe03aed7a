use crate::error::CommonError;
use flate2::read::GzDecoder;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tar::Archive;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    TarGz,
    Raw,
}

/// Classify a downloaded artifact by its file name suffix.
pub fn detect_artifact_kind(path: &Path) -> ArtifactKind {
    let lower = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        ArtifactKind::TarGz
    } else {
        ArtifactKind::Raw
    }
}

/// Unpack a gzip-compressed tarball into `target_dir`.
///
/// Directory entries and regular files are materialized (file modes are kept);
/// every other entry type is skipped, as are entries whose path would land
/// outside `target_dir`. Returns the paths of the regular files written.
pub fn unpack_tar_gz(archive_path: &Path, target_dir: &Path) -> Result<Vec<PathBuf>, CommonError> {
    fs::create_dir_all(target_dir)?;
    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
    let mut extracted = Vec::new();

    for entry in archive
        .entries()
        .map_err(|err| archive_error(archive_path, err))?
    {
        let mut entry = entry.map_err(|err| archive_error(archive_path, err))?;
        let entry_type = entry.header().entry_type();
        let entry_path = entry
            .path()
            .map_err(|err| archive_error(archive_path, err))?
            .into_owned();

        if !entry_type.is_dir() && !entry_type.is_file() {
            tracing::debug!(entry = %entry_path.display(), "skipping non-regular archive entry");
            continue;
        }

        let unpacked = entry
            .unpack_in(target_dir)
            .map_err(|err| archive_error(archive_path, err))?;
        if !unpacked {
            tracing::warn!(entry = %entry_path.display(), "skipping archive entry outside target");
            continue;
        }

        if entry_type.is_file() {
            extracted.push(target_dir.join(entry_path));
        }
    }

    Ok(extracted)
}

/// Depth-first search for a regular file named `binary_name` below `root`.
///
/// Siblings are visited in file-name order so the result is deterministic when
/// an archive ships several files with the same base name.
pub fn find_binary(root: &Path, binary_name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == OsStr::new(binary_name))
        .map(|entry| entry.into_path())
}

/// Move `from` to `to`, falling back to copy + remove when a rename is not
/// possible (e.g. across filesystems).
pub fn relocate(from: &Path, to: &Path) -> Result<(), CommonError> {
    if let Err(err) = fs::rename(from, to) {
        fs::copy(from, to).map_err(|source| CommonError::Relocate {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })?;
        fs::remove_file(from)?;
        tracing::debug!("rename failed, copied instead: {}", err);
    }
    Ok(())
}

pub fn set_executable(path: &Path) -> Result<(), CommonError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

fn archive_error(path: &Path, err: std::io::Error) -> CommonError {
    CommonError::Archive {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
