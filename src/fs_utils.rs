//! File utilities for path containment and crash-safe moves
//!
//! This module provides the filesystem primitives every store builds on:
//! - Root containment checks for paths composed from untrusted input
//! - Atomic rename with a copy+delete fallback across filesystems
//! - Recursive file enumeration that tolerates a missing root
//! - Display normalization of paths to forward-slash form

use crate::error::{ChatshelfError, Result};
use anyhow::Context;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Lexically normalizes a path, resolving `.` and `..` without touching the disk
///
/// Relative inputs are anchored at the current directory first so the result
/// is always absolute. `..` never climbs above the filesystem root.
pub fn lexical_absolute(path: &Path) -> PathBuf {
    let anchored = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in anchored.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if !at_root {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Returns true if `candidate` equals `root` or is nested under it
///
/// Both paths are normalized lexically. Comparison is component-wise, so
/// `/data/root-secret` is not inside `/data/root`.
///
/// # Examples
///
/// ```
/// use chatshelf::fs_utils::is_path_inside_root;
/// use std::path::Path;
///
/// assert!(is_path_inside_root(Path::new("/srv/r"), Path::new("/srv/r/a/b")));
/// assert!(!is_path_inside_root(Path::new("/srv/r"), Path::new("/srv/r-sibling/x")));
/// ```
pub fn is_path_inside_root(root: &Path, candidate: &Path) -> bool {
    let root = lexical_absolute(root);
    let candidate = lexical_absolute(candidate);
    candidate.starts_with(&root)
}

/// Resolves `relative_input` against `root` and guards containment
///
/// # Arguments
///
/// * `root` - The directory the result must stay inside
/// * `relative_input` - Untrusted path, usually read from persisted metadata
/// * `label` - Names the root in error messages
///
/// # Errors
///
/// Returns `ChatshelfError::OutOfBoundsPath` if the input is blank or the
/// resolved path is neither `root` itself nor nested under it.
///
/// # Examples
///
/// ```
/// use chatshelf::fs_utils::resolve_within_root;
/// use std::path::Path;
///
/// let ok = resolve_within_root(Path::new("/srv/trash"), "a/b.jsonl", "trash");
/// assert!(ok.is_ok());
///
/// let escaped = resolve_within_root(Path::new("/srv/trash"), "../etc/passwd", "trash");
/// assert!(escaped.is_err());
/// ```
pub fn resolve_within_root(root: &Path, relative_input: &str, label: &str) -> Result<PathBuf> {
    if relative_input.trim().is_empty() {
        return Err(ChatshelfError::OutOfBoundsPath {
            label: label.to_string(),
            path: "(empty)".to_string(),
        }
        .into());
    }

    let resolved_root = lexical_absolute(root);
    let resolved = lexical_absolute(&resolved_root.join(relative_input));

    if !resolved.starts_with(&resolved_root) {
        return Err(ChatshelfError::OutOfBoundsPath {
            label: label.to_string(),
            path: relative_input.to_string(),
        }
        .into());
    }

    Ok(resolved)
}

/// Renders a path with forward slashes regardless of host separator
pub fn normalize_path_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Returns `path` relative to `root` in display form, if it is inside `root`
pub fn relative_display(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(normalize_path_for_display)
}

/// Checks whether a path exists, propagating errors other than not-found
pub async fn path_exists(path: &Path) -> Result<bool> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(anyhow::Error::new(e).context(format!("Failed to stat {:?}", path))),
    }
}

/// Ensures parent directories exist for a given path
pub async fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create parent directories for {:?}", path))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
const CROSS_DEVICE_ERRNO: Option<i32> = Some(libc::EXDEV);
// ERROR_NOT_SAME_DEVICE
#[cfg(windows)]
const CROSS_DEVICE_ERRNO: Option<i32> = Some(17);
#[cfg(not(any(unix, windows)))]
const CROSS_DEVICE_ERRNO: Option<i32> = None;

fn is_cross_device(err: &io::Error) -> bool {
    CROSS_DEVICE_ERRNO.is_some() && err.raw_os_error() == CROSS_DEVICE_ERRNO
}

/// Moves a file, creating the destination's parent directories
///
/// Tries an atomic rename first. When source and destination live on
/// different filesystems, falls back to copy then delete-source. On success
/// `src` is gone and `dst` holds the original bytes. A failed fallback rolls
/// back the copy; if the rollback itself fails, both failures are reported.
///
/// # Errors
///
/// Returns `ChatshelfError::DestinationExists` if `dst` already exists,
/// `ChatshelfError::NotFound` if `src` is missing, or the underlying I/O error.
pub async fn move_path(src: &Path, dst: &Path) -> Result<()> {
    if path_exists(dst).await? {
        return Err(ChatshelfError::DestinationExists(normalize_path_for_display(dst)).into());
    }
    if !path_exists(src).await? {
        return Err(ChatshelfError::NotFound(normalize_path_for_display(src)).into());
    }

    ensure_parent_dirs(dst).await?;

    let rename_err = match tokio::fs::rename(src, dst).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    if !is_cross_device(&rename_err) {
        return Err(anyhow::Error::new(rename_err)
            .context(format!("Failed to move {:?} to {:?}", src, dst)));
    }

    tracing::debug!(src = ?src, dst = ?dst, "Rename crossed devices, falling back to copy+delete");
    copy_then_remove(src, dst).await
}

/// Copies `src` to `dst`, then deletes `src`, undoing the copy on failure
async fn copy_then_remove(src: &Path, dst: &Path) -> Result<()> {
    if let Err(copy_err) = tokio::fs::copy(src, dst).await {
        return match tokio::fs::remove_file(dst).await {
            Ok(()) => Err(anyhow::Error::new(copy_err)
                .context(format!("Failed to copy {:?} to {:?}", src, dst))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(anyhow::Error::new(copy_err)
                .context(format!("Failed to copy {:?} to {:?}", src, dst))),
            Err(cleanup_err) => Err(anyhow::anyhow!(
                "Failed to copy {:?} to {:?}: {}; partial copy left behind: {}",
                src,
                dst,
                copy_err,
                cleanup_err
            )),
        };
    }

    let removal = tokio::fs::remove_file(src).await;
    settle_source_removal(src, dst, removal).await
}

/// Rolls back the copy at `dst` when removing the source failed
async fn settle_source_removal(src: &Path, dst: &Path, removal: io::Result<()>) -> Result<()> {
    let Err(remove_err) = removal else {
        return Ok(());
    };
    match tokio::fs::remove_file(dst).await {
        Ok(()) => Err(anyhow::Error::new(remove_err)
            .context(format!("Copied {:?} but failed to remove source", src))),
        Err(cleanup_err) => Err(anyhow::anyhow!(
            "Copied {:?} to {:?} but failed to remove source: {}; copy could not be rolled back: {}",
            src,
            dst,
            remove_err,
            cleanup_err
        )),
    }
}

/// Fails if any existing component of `path` below `root` is a symbolic link
///
/// The lexical guard in [`resolve_within_root`] cannot see a directory that
/// was swapped for a link, so restore paths are checked on disk as well.
/// Components that do not exist yet end the walk.
///
/// # Errors
///
/// Returns `ChatshelfError::OutOfBoundsPath` if `path` is not lexically under
/// `root` or a component is a symlink.
pub async fn ensure_no_symlinks_below(root: &Path, path: &Path, label: &str) -> Result<()> {
    let root = lexical_absolute(root);
    let path = lexical_absolute(path);
    let out_of_bounds = || ChatshelfError::OutOfBoundsPath {
        label: label.to_string(),
        path: normalize_path_for_display(&path),
    };
    let relative = path.strip_prefix(&root).map_err(|_| out_of_bounds())?;

    let mut current = root;
    for component in relative.components() {
        current.push(component);
        match tokio::fs::symlink_metadata(&current).await {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                return Err(out_of_bounds().into());
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("Failed to stat {:?}", current)))
            }
        }
    }
    Ok(())
}

/// Recursively lists regular files under `root`
///
/// A missing `root` yields an empty list. Entries that vanish during the
/// walk are skipped; any other access error is propagated.
pub async fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || walk_files_blocking(&root))
        .await
        .context("File walk task panicked")?
}

fn walk_files_blocking(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let missing = e
                    .io_error()
                    .map(|io| io.kind() == io::ErrorKind::NotFound)
                    .unwrap_or(false);
                if missing {
                    if e.depth() == 0 {
                        return Ok(Vec::new());
                    }
                    tracing::debug!(path = ?e.path(), "Entry vanished during walk");
                    continue;
                }
                return Err(anyhow::Error::new(e).context(format!("Failed to walk {:?}", root)));
            }
        };

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}
