// Staging, backup and swap of the install directory
//
// Everything is placed beside the install directory so the final renames never
// cross a filesystem boundary.

use crate::error::InstallError;
use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Scratch locations derived from the install directory `<parent>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPaths {
    pub install_dir: PathBuf,
    /// `<parent>/.<name>.download`, the archive as received
    pub download: PathBuf,
    /// `<parent>/.<name>.staging`, extraction target
    pub staging: PathBuf,
    /// `<parent>/.<name>.backup`, the previous install while the swap runs
    pub backup: PathBuf,
    /// `<parent>/.<name>.lock`
    pub lock: PathBuf,
}

impl StagedPaths {
    pub fn new(install_dir: &Path) -> Result<Self, InstallError> {
        let (parent, name) = match (install_dir.parent(), install_dir.file_name()) {
            (Some(parent), Some(name)) => (parent, name.to_string_lossy()),
            _ => {
                return Err(InstallError::fs(
                    install_dir,
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "install directory needs a parent directory and a name",
                    ),
                ));
            }
        };

        let sibling = |suffix: &str| parent.join(format!(".{}.{}", name, suffix));
        Ok(Self {
            install_dir: install_dir.to_path_buf(),
            download: sibling("download"),
            staging: sibling("staging"),
            backup: sibling("backup"),
            lock: sibling("lock"),
        })
    }

    pub fn parent(&self) -> &Path {
        self.install_dir.parent().unwrap_or(Path::new("."))
    }
}

/// Remove what an interrupted run left behind. A backup with no install
/// directory means the swap died halfway, so the backup is put back first.
pub fn cleanup_temp_dirs(paths: &StagedPaths) -> Result<(), InstallError> {
    if exists(&paths.backup) {
        if exists(&paths.install_dir) {
            debug!("Removing stale backup {}", paths.backup.display());
            remove_path(&paths.backup)?;
        } else {
            warn!(
                "Restoring {} from an interrupted install",
                paths.install_dir.display()
            );
            fs::rename(&paths.backup, &paths.install_dir)
                .map_err(|e| InstallError::fs(&paths.install_dir, e))?;
        }
    }

    for leftover in [&paths.staging, &paths.download] {
        if exists(leftover) {
            debug!("Removing leftover {}", leftover.display());
            remove_path(leftover)?;
        }
    }
    Ok(())
}

/// The single top-level directory an archive extracted into.
pub fn find_root(staging: &Path) -> Result<PathBuf, InstallError> {
    let entries = fs::read_dir(staging)
        .map_err(|e| InstallError::fs(staging, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| InstallError::fs(staging, e))?;

    match entries.as_slice() {
        [entry] if entry.file_type().is_ok_and(|t| t.is_dir()) => Ok(entry.path()),
        _ => Err(InstallError::MissingRoot {
            staging: staging.to_path_buf(),
        }),
    }
}

/// Move `root` into the install directory. The previous install is set aside
/// first and put back if the final rename fails.
pub fn promote(paths: &StagedPaths, root: &Path) -> Result<(), InstallError> {
    let had_previous = exists(&paths.install_dir);
    if had_previous {
        debug!(
            "Moving {} to {}",
            paths.install_dir.display(),
            paths.backup.display()
        );
        fs::rename(&paths.install_dir, &paths.backup)
            .map_err(|e| InstallError::fs(&paths.install_dir, e))?;
    }

    if let Err(e) = fs::rename(root, &paths.install_dir) {
        if had_previous {
            restore_backup(paths);
        }
        return Err(InstallError::fs(&paths.install_dir, e));
    }

    if had_previous {
        if let Err(e) = remove_path(&paths.backup) {
            // the new install is in place; a stale backup is cleaned up next run
            warn!("Failed to remove {}: {}", paths.backup.display(), e);
        }
    }
    Ok(())
}

fn restore_backup(paths: &StagedPaths) {
    warn!("Restoring previous install at {}", paths.install_dir.display());
    if let Err(e) = fs::rename(&paths.backup, &paths.install_dir) {
        warn!(
            "Failed to restore {} from {}: {}",
            paths.install_dir.display(),
            paths.backup.display(),
            e
        );
    }
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn remove_path(path: &Path) -> Result<(), InstallError> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|e| InstallError::fs(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths_in(temp_dir: &TempDir) -> StagedPaths {
        StagedPaths::new(&temp_dir.path().join("go")).unwrap()
    }

    #[test]
    fn staged_paths_are_hidden_siblings() {
        let paths = StagedPaths::new(Path::new("/usr/local/go")).unwrap();

        assert_eq!(paths.download, PathBuf::from("/usr/local/.go.download"));
        assert_eq!(paths.staging, PathBuf::from("/usr/local/.go.staging"));
        assert_eq!(paths.backup, PathBuf::from("/usr/local/.go.backup"));
        assert_eq!(paths.lock, PathBuf::from("/usr/local/.go.lock"));
        assert_eq!(paths.parent(), Path::new("/usr/local"));
    }

    #[test]
    fn staged_paths_reject_root() {
        assert!(matches!(
            StagedPaths::new(Path::new("/")),
            Err(InstallError::Filesystem { .. })
        ));
    }

    #[test]
    fn cleanup_removes_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let paths = paths_in(&temp_dir);
        fs::create_dir_all(paths.staging.join("go/bin")).unwrap();
        fs::write(&paths.download, b"partial").unwrap();
        fs::create_dir_all(&paths.install_dir).unwrap();
        fs::create_dir_all(&paths.backup).unwrap();

        cleanup_temp_dirs(&paths).unwrap();

        assert!(!paths.staging.exists());
        assert!(!paths.download.exists());
        assert!(!paths.backup.exists());
        assert!(paths.install_dir.exists());
    }

    #[test]
    fn cleanup_restores_orphaned_backup() {
        let temp_dir = TempDir::new().unwrap();
        let paths = paths_in(&temp_dir);
        fs::create_dir_all(&paths.backup).unwrap();
        fs::write(paths.backup.join("VERSION"), "go1.20.0").unwrap();

        cleanup_temp_dirs(&paths).unwrap();

        assert!(!paths.backup.exists());
        assert_eq!(
            fs::read_to_string(paths.install_dir.join("VERSION")).unwrap(),
            "go1.20.0"
        );
    }

    #[test]
    fn find_root_returns_single_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("go/bin")).unwrap();

        assert_eq!(find_root(temp_dir.path()).unwrap(), temp_dir.path().join("go"));
    }

    #[test]
    fn find_root_rejects_multiple_entries() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("go")).unwrap();
        fs::write(temp_dir.path().join("README"), "x").unwrap();

        assert!(matches!(
            find_root(temp_dir.path()),
            Err(InstallError::MissingRoot { .. })
        ));
    }

    #[test]
    fn find_root_rejects_lone_file_and_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            find_root(temp_dir.path()),
            Err(InstallError::MissingRoot { .. })
        ));

        fs::write(temp_dir.path().join("go"), "x").unwrap();
        assert!(matches!(
            find_root(temp_dir.path()),
            Err(InstallError::MissingRoot { .. })
        ));
    }

    #[test]
    fn promote_replaces_previous_install() {
        let temp_dir = TempDir::new().unwrap();
        let paths = paths_in(&temp_dir);
        fs::create_dir_all(&paths.install_dir).unwrap();
        fs::write(paths.install_dir.join("stale.txt"), "old").unwrap();
        let root = paths.staging.join("go");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("VERSION"), "go1.21.0").unwrap();

        promote(&paths, &root).unwrap();

        assert!(!paths.install_dir.join("stale.txt").exists());
        assert_eq!(
            fs::read_to_string(paths.install_dir.join("VERSION")).unwrap(),
            "go1.21.0"
        );
        assert!(!paths.backup.exists());
    }

    #[test]
    fn promote_into_empty_location() {
        let temp_dir = TempDir::new().unwrap();
        let paths = paths_in(&temp_dir);
        let root = paths.staging.join("go");
        fs::create_dir_all(&root).unwrap();

        promote(&paths, &root).unwrap();

        assert!(paths.install_dir.is_dir());
    }

    #[test]
    fn promote_restores_previous_install_when_root_is_missing() {
        let temp_dir = TempDir::new().unwrap();
        let paths = paths_in(&temp_dir);
        fs::create_dir_all(&paths.install_dir).unwrap();
        fs::write(paths.install_dir.join("VERSION"), "go1.20.0").unwrap();

        let result = promote(&paths, &paths.staging.join("go"));

        assert!(matches!(result, Err(InstallError::Filesystem { .. })));
        assert_eq!(
            fs::read_to_string(paths.install_dir.join("VERSION")).unwrap(),
            "go1.20.0"
        );
        assert!(!paths.backup.exists());
    }
}
