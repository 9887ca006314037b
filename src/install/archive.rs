//! Archive extraction into a staging directory.
//!
//! Entries are read one at a time from the decompressed stream. Directories and
//! regular files keep the permission bits declared in the archive; symlinks are
//! recreated on Unix when they stay inside the archive's root entry. Every other
//! entry kind is skipped, including symlinks stored in zip archives. No entry is
//! ever written through a symlink created by an earlier entry.

use crate::error::InstallError;
use crate::install::platform::ArchiveFormat;
use flate2::read::GzDecoder;
use log::debug;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::path::{Component, Path, PathBuf};
use tar::Archive;

/// Extract `archive` into `dest`, returning the number of entries written.
pub fn extract(format: ArchiveFormat, archive: &Path, dest: &Path) -> Result<usize, InstallError> {
    debug!("Extracting {} to {}", archive.display(), dest.display());
    match format {
        ArchiveFormat::TarGz => {
            let file = File::open(archive).map_err(|e| InstallError::fs(archive, e))?;
            extract_tar_gz(BufReader::new(file), dest)
        }
        ArchiveFormat::Zip => extract_zip(archive, dest),
    }
}

/// Extract a gzip-compressed tar stream.
pub fn extract_tar_gz<R: Read>(reader: R, dest: &Path) -> Result<usize, InstallError> {
    fs::create_dir_all(dest).map_err(|e| InstallError::fs(dest, e))?;

    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut dir_modes = Vec::new();
    let mut written = 0;

    for entry in archive.entries().map_err(decompress)? {
        let mut entry = entry.map_err(decompress)?;
        let raw = entry.path().map_err(decompress)?.into_owned();
        let relative = safe_relative(&raw)?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(&relative);
        let mode = entry.header().mode().map_err(decompress)?;
        let kind = entry.header().entry_type();
        if kind.is_dir() || kind.is_file() || kind.is_symlink() {
            reject_symlinked_path(dest, &relative)?;
        }

        if kind.is_dir() {
            fs::create_dir_all(&target).map_err(|e| InstallError::fs(&target, e))?;
            dir_modes.push((target, mode));
        } else if kind.is_file() {
            write_file(&mut entry, &target, Some(mode))?;
        } else if kind.is_symlink() {
            let link = entry
                .link_name()
                .map_err(decompress)?
                .ok_or_else(|| InstallError::UnsafeEntry { path: raw.clone() })?
                .into_owned();
            create_symlink(&target, &relative, &link)?;
        } else {
            debug!("Skipping {:?} entry {}", kind, raw.display());
            continue;
        }
        written += 1;
    }

    apply_dir_modes(dir_modes)?;
    Ok(written)
}

/// Extract a zip archive (Windows releases).
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize, InstallError> {
    let file = File::open(archive_path).map_err(|e| InstallError::fs(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(zip_error)?;
    fs::create_dir_all(dest).map_err(|e| InstallError::fs(dest, e))?;

    let mut dir_modes = Vec::new();
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_error)?;
        let raw = PathBuf::from(entry.name());
        let relative = safe_relative(&raw)?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(&relative);
        let mode = entry.unix_mode();
        if mode.is_some_and(is_symlink_mode) {
            debug!("Skipping symlink entry {}", raw.display());
            continue;
        }
        reject_symlinked_path(dest, &relative)?;

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| InstallError::fs(&target, e))?;
            if let Some(mode) = mode {
                dir_modes.push((target, mode));
            }
        } else {
            write_file(&mut entry, &target, mode)?;
        }
        written += 1;
    }

    apply_dir_modes(dir_modes)?;
    Ok(written)
}

/// Normalise an entry path, refusing absolute paths and `..` components.
fn safe_relative(path: &Path) -> Result<PathBuf, InstallError> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(InstallError::UnsafeEntry {
                    path: path.to_path_buf(),
                });
            }
        }
    }
    Ok(relative)
}

/// Refuse an entry when it or any of its ancestors under `dest` is already a
/// symlink on disk, so later entries cannot be redirected through earlier links.
fn reject_symlinked_path(dest: &Path, relative: &Path) -> Result<(), InstallError> {
    let mut current = dest.to_path_buf();
    for part in relative.iter() {
        current.push(part);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(InstallError::UnsafeEntry {
                    path: relative.to_path_buf(),
                });
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(InstallError::fs(&current, e)),
        }
    }
    Ok(())
}

fn is_symlink_mode(mode: u32) -> bool {
    mode & 0o170000 == 0o120000
}

/// Copy one entry's bytes into a fresh file. Read failures belong to the archive
/// stream, write failures to the filesystem.
fn write_file(reader: &mut impl Read, target: &Path, mode: Option<u32>) -> Result<(), InstallError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| InstallError::fs(parent, e))?;
    }

    let mut file = File::create(target).map_err(|e| InstallError::fs(target, e))?;
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(decompress(e)),
        };
        file.write_all(&buf[..n])
            .map_err(|e| InstallError::fs(target, e))?;
    }
    drop(file);

    if let Some(mode) = mode {
        set_mode(target, mode)?;
    }
    Ok(())
}

/// Recreate a symlink whose target resolves inside the same root entry.
fn create_symlink(target: &Path, relative: &Path, link: &Path) -> Result<(), InstallError> {
    let unsafe_entry = || InstallError::UnsafeEntry {
        path: relative.to_path_buf(),
    };

    let mut resolved: Vec<&OsStr> = relative
        .parent()
        .map(|parent| parent.iter().collect())
        .unwrap_or_default();
    for component in link.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            // the root entry itself must remain in the path
            Component::ParentDir if resolved.len() > 1 => {
                resolved.pop();
            }
            _ => return Err(unsafe_entry()),
        }
    }

    #[cfg(unix)]
    {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| InstallError::fs(parent, e))?;
        }
        std::os::unix::fs::symlink(link, target).map_err(|e| InstallError::fs(target, e))?;
    }
    #[cfg(not(unix))]
    {
        log::warn!(
            "Skipping symlink {} -> {}: not supported on this platform",
            target.display(),
            link.display()
        );
    }
    Ok(())
}

/// Directory modes go on last so read-only directories can still be filled.
fn apply_dir_modes(dir_modes: Vec<(PathBuf, u32)>) -> Result<(), InstallError> {
    for (path, mode) in dir_modes.into_iter().rev() {
        set_mode(&path, mode)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|e| InstallError::fs(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), InstallError> {
    Ok(())
}

fn decompress(source: io::Error) -> InstallError {
    InstallError::Decompress { source }
}

fn zip_error(e: zip::result::ZipError) -> InstallError {
    match e {
        zip::result::ZipError::Io(source) => decompress(source),
        other => decompress(io::Error::other(other)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Cursor;
    use tempfile::TempDir;

    pub(crate) enum TestEntry<'a> {
        Dir(&'a str, u32),
        File(&'a str, &'a [u8], u32),
        Symlink(&'a str, &'a str),
        /// Raw header name, bypassing the builder's path checks.
        RawFile(&'a str, &'a [u8]),
    }

    /// Build an in-memory `.tar.gz` from the given entries.
    pub(crate) fn tar_gz(entries: &[TestEntry<'_>]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for entry in entries {
            let mut header = tar::Header::new_gnu();
            match entry {
                TestEntry::Dir(path, mode) => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_size(0);
                    header.set_mode(*mode);
                    header.set_cksum();
                    builder
                        .append_data(&mut header, path, io::empty())
                        .unwrap();
                }
                TestEntry::File(path, data, mode) => {
                    header.set_size(data.len() as u64);
                    header.set_mode(*mode);
                    header.set_cksum();
                    builder.append_data(&mut header, path, *data).unwrap();
                }
                TestEntry::Symlink(path, target) => {
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_size(0);
                    header.set_mode(0o777);
                    header.set_path(path).unwrap();
                    let raw = header.as_old_mut();
                    raw.linkname[..target.len()].copy_from_slice(target.as_bytes());
                    header.set_cksum();
                    builder.append(&header, io::empty()).unwrap();
                }
                TestEntry::RawFile(name, data) => {
                    let raw = header.as_old_mut();
                    raw.name[..name.len()].copy_from_slice(name.as_bytes());
                    header.set_size(data.len() as u64);
                    header.set_mode(0o644);
                    header.set_cksum();
                    builder.append(&header, *data).unwrap();
                }
            }
        }

        builder.into_inner().unwrap().finish().unwrap()
    }

    fn go_archive() -> Vec<u8> {
        tar_gz(&[
            TestEntry::Dir("go/", 0o755),
            TestEntry::Dir("go/bin/", 0o755),
            TestEntry::File("go/bin/go", b"#!/bin/sh\necho go\n", 0o755),
            TestEntry::File("go/VERSION", b"go1.21.0\n", 0o644),
        ])
    }

    #[test]
    fn extract_tar_gz_writes_directories_and_files() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("staging");

        let written = extract_tar_gz(Cursor::new(go_archive()), &dest).unwrap();

        assert_eq!(written, 4);
        assert!(dest.join("go/bin").is_dir());
        assert_eq!(
            fs::read(dest.join("go/bin/go")).unwrap(),
            b"#!/bin/sh\necho go\n"
        );
        assert_eq!(fs::read_to_string(dest.join("go/VERSION")).unwrap(), "go1.21.0\n");
    }

    #[cfg(unix)]
    #[test]
    fn extract_tar_gz_preserves_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("staging");
        extract_tar_gz(Cursor::new(go_archive()), &dest).unwrap();

        let mode = |p: &str| fs::metadata(dest.join(p)).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode("go/bin/go"), 0o755);
        assert_eq!(mode("go/VERSION"), 0o644);
        assert_eq!(mode("go/bin"), 0o755);
    }

    #[test]
    fn extract_tar_gz_creates_missing_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let archive = tar_gz(&[TestEntry::File("go/src/runtime/proc.go", b"package runtime", 0o644)]);

        extract_tar_gz(Cursor::new(archive), temp_dir.path()).unwrap();

        assert!(temp_dir.path().join("go/src/runtime/proc.go").is_file());
    }

    #[test]
    fn extract_tar_gz_rejects_parent_directory_entries() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("staging");
        let archive = tar_gz(&[TestEntry::RawFile("go/../../evil", b"pwned")]);

        let result = extract_tar_gz(Cursor::new(archive), &dest);

        assert!(matches!(result, Err(InstallError::UnsafeEntry { .. })));
        assert!(!temp_dir.path().join("evil").exists());
    }

    #[test]
    fn extract_tar_gz_rejects_absolute_entries() {
        let temp_dir = TempDir::new().unwrap();
        let archive = tar_gz(&[TestEntry::RawFile("/tmp/evil", b"pwned")]);

        let result = extract_tar_gz(Cursor::new(archive), temp_dir.path());

        assert!(matches!(result, Err(InstallError::UnsafeEntry { .. })));
    }

    #[test]
    fn extract_tar_gz_reports_decompress_error_for_garbage() {
        let temp_dir = TempDir::new().unwrap();

        let result = extract_tar_gz(Cursor::new(b"<html>not found</html>".to_vec()), temp_dir.path());

        assert!(matches!(result, Err(InstallError::Decompress { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn extract_tar_gz_keeps_symlinks_inside_root() {
        let temp_dir = TempDir::new().unwrap();
        let archive = tar_gz(&[
            TestEntry::File("go/bin/go", b"go", 0o755),
            TestEntry::Symlink("go/pkg/tool/go", "../../bin/go"),
        ]);

        extract_tar_gz(Cursor::new(archive), temp_dir.path()).unwrap();

        let link = temp_dir.path().join("go/pkg/tool/go");
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("../../bin/go"));
        assert_eq!(fs::read(&link).unwrap(), b"go");
    }

    #[cfg(unix)]
    #[test]
    fn extract_tar_gz_refuses_to_write_through_earlier_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("a/b/staging");
        let archive = tar_gz(&[
            TestEntry::Dir("go/", 0o755),
            TestEntry::Symlink("go/a", "."),
            TestEntry::Symlink("go/a/a/a/d", "../../../escaped"),
            TestEntry::File("go/a/a/a/d/pwned", b"pwned", 0o644),
        ]);

        let result = extract_tar_gz(Cursor::new(archive), &dest);

        assert!(matches!(result, Err(InstallError::UnsafeEntry { .. })));
        assert!(fs::symlink_metadata(dest.join("go/d")).is_err());
        assert!(!temp_dir.path().join("escaped").exists());
        assert!(!temp_dir.path().join("a/escaped").exists());
        assert!(!temp_dir.path().join("a/b/escaped").exists());
    }

    #[cfg(unix)]
    #[test]
    fn extract_tar_gz_refuses_to_overwrite_a_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let archive = tar_gz(&[
            TestEntry::File("go/bin/go", b"go", 0o755),
            TestEntry::Symlink("go/gofmt", "bin/go"),
            TestEntry::File("go/gofmt", b"replaced", 0o755),
        ]);

        let result = extract_tar_gz(Cursor::new(archive), temp_dir.path());

        assert!(matches!(result, Err(InstallError::UnsafeEntry { .. })));
        assert_eq!(fs::read(temp_dir.path().join("go/bin/go")).unwrap(), b"go");
    }

    #[test]
    fn extract_tar_gz_rejects_symlinks_escaping_root() {
        let temp_dir = TempDir::new().unwrap();
        let archive = tar_gz(&[TestEntry::Symlink("go/passwd", "../../etc/passwd")]);

        let result = extract_tar_gz(Cursor::new(archive), temp_dir.path());

        assert!(matches!(result, Err(InstallError::UnsafeEntry { .. })));
    }

    #[test]
    fn extract_tar_gz_rejects_absolute_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let archive = tar_gz(&[TestEntry::Symlink("go/passwd", "/etc/passwd")]);

        let result = extract_tar_gz(Cursor::new(archive), temp_dir.path());

        assert!(matches!(result, Err(InstallError::UnsafeEntry { .. })));
    }

    #[test]
    fn extract_zip_writes_directories_and_files() {
        use zip::CompressionMethod;
        use zip::write::{FileOptions, ZipWriter};

        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("go.zip");
        let mut zip = ZipWriter::new(File::create(&archive_path).unwrap());
        let options = FileOptions::<()>::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(0o755);
        zip.add_directory("go/bin/", options).unwrap();
        zip.start_file("go/bin/go.exe", options).unwrap();
        zip.write_all(b"MZ").unwrap();
        zip.finish().unwrap();

        let dest = temp_dir.path().join("staging");
        let written = extract(ArchiveFormat::Zip, &archive_path, &dest).unwrap();

        assert_eq!(written, 2);
        assert_eq!(fs::read(dest.join("go/bin/go.exe")).unwrap(), b"MZ");
    }

    #[test]
    fn extract_zip_skips_symlink_entries() {
        use zip::CompressionMethod;
        use zip::write::{FileOptions, ZipWriter};

        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("go.zip");
        let mut zip = ZipWriter::new(File::create(&archive_path).unwrap());
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);
        zip.start_file("go/bin/go.exe", options).unwrap();
        zip.write_all(b"MZ").unwrap();
        zip.add_symlink("go/bin/gofmt.exe", "../../../outside", options)
            .unwrap();
        zip.finish().unwrap();

        let dest = temp_dir.path().join("staging");
        let written = extract(ArchiveFormat::Zip, &archive_path, &dest).unwrap();

        assert_eq!(written, 1);
        assert!(fs::symlink_metadata(dest.join("go/bin/gofmt.exe")).is_err());
    }

    #[test]
    fn extract_zip_reports_decompress_error_for_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("go.zip");
        fs::write(&archive_path, b"definitely not a zip").unwrap();

        let result = extract(ArchiveFormat::Zip, &archive_path, &temp_dir.path().join("staging"));

        assert!(matches!(result, Err(InstallError::Decompress { .. })));
    }
}
