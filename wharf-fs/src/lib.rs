//! Filesystem helpers for the dataset cache, built on `cap-std` and `camino`.
//!
//! Every helper resolves an ambient directory handle once and performs the
//! remaining work relative to it, so renames and removals stay inside the
//! directory that was opened.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// What, if anything, lives at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Nothing exists at the path.
    Missing,
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

/// Open a UTF-8 file path using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Create (or truncate) a file for writing, creating missing parents first.
pub fn create_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    dir.create(name.as_str())
}

/// Resolve an ambient directory for the given path and return the directory with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_string();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Open an existing directory using ambient authority.
pub fn open_dir(path: &Utf8Path) -> io::Result<fs_utf8::Dir> {
    fs_utf8::Dir::open_ambient_dir(path, ambient_authority())
}

/// Ensure the parent directory for `path` exists, handling absolute paths safely for cap-std.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    ensure_dir_all(parent)
}

/// Create `path` and every missing ancestor.
pub fn ensure_dir_all(path: &Utf8Path) -> io::Result<()> {
    if path.as_str().is_empty() || path == Utf8Path::new("/") {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(path)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Classify the entry at `path` without following a trailing symlink chain
/// further than `cap-std` allows.
pub fn path_kind(path: &Utf8Path) -> io::Result<PathKind> {
    if path.file_name().is_none() {
        return open_dir(path).map(|_| PathKind::Directory);
    }
    let (dir, name) = match open_dir_and_file(path) {
        Ok(pair) => pair,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(PathKind::Missing),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) if meta.is_dir() => Ok(PathKind::Directory),
        Ok(_) => Ok(PathKind::File),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(PathKind::Missing),
        Err(err) => Err(err),
    }
}

/// Read a whole file into memory.
pub fn read_file(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.read(name.as_str())
}

/// Write `contents` beside `path` under a temporary name, then rename it into
/// place. Readers observe either the previous file or the new one.
pub fn write_atomic(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    let temp_name = format!(".{name}.tmp-{}", std::process::id());
    if let Err(err) = dir.write(temp_name.as_str(), contents) {
        dir.remove_file(temp_name.as_str()).ok();
        return Err(err);
    }
    dir.rename(temp_name.as_str(), &dir, name.as_str())
        .inspect_err(|_| {
            dir.remove_file(temp_name.as_str()).ok();
        })
}

/// Swap the directory `staging` into `target`, removing whatever `target`
/// held before. Both paths must share a parent directory.
pub fn replace_dir(staging: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    if staging.parent() != target.parent() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "staging and target directories must share a parent",
        ));
    }
    let (dir, staging_name) = open_dir_and_file(staging)?;
    let target_name = target
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a directory name"))?;
    match dir.symlink_metadata(target_name) {
        Ok(meta) if meta.is_dir() => dir.remove_dir_all(target_name)?,
        Ok(_) => dir.remove_file(target_name)?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    dir.rename(staging_name.as_str(), &dir, target_name)
}

/// List every regular file below `root`, ordered by path relative to `root`.
///
/// The returned paths are joined onto `root`.
pub fn list_files_sorted(root: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    let dir = open_dir(root)?;
    let mut relative = Vec::new();
    collect_files(&dir, Utf8Path::new(""), &mut relative)?;
    relative.sort();
    Ok(relative.into_iter().map(|path| root.join(path)).collect())
}

fn collect_files(
    dir: &fs_utf8::Dir,
    prefix: &Utf8Path,
    out: &mut Vec<Utf8PathBuf>,
) -> io::Result<()> {
    for entry in dir.entries()? {
        let entry = entry?;
        let name = entry.file_name()?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let child = dir.open_dir(name.as_str())?;
            collect_files(&child, &prefix.join(&name), out)?;
        } else if file_type.is_file() {
            out.push(prefix.join(&name));
        }
    }
    Ok(())
}

/// Split an absolute or relative parent path into an ambient base directory and a relative suffix.
pub fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Windows absolute path with a drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;

            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        // Unix-style absolute path.
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;

    Ok((dir, relative))
}
