//! Source-tree traversal.
//!
//! Two modes over one recursive walk primitive. The walker is a pure
//! traversal: it emits events and performs no filtering itself. Entries are
//! visited in name order so record creation-sequence ids are deterministic
//! across platforms.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, instrument, warn};
use walkdir::WalkDir;

use docmill_base::{DocmillError, DocmillResult, ErrorKind};

/// File name of the package descriptor looked up in package-aware mode.
pub const PACKAGE_DESCRIPTOR: &str = "package.json";

/// Source subdirectory used when the descriptor declares none.
const DEFAULT_SOURCE_DIR: &str = "src";

/// One traversal emission.
#[derive(Debug)]
pub enum WalkEvent {
    /// A discovered candidate file (absolute path).
    File(PathBuf),
    /// A successfully parsed package descriptor.
    Descriptor { path: PathBuf, descriptor: Value },
}

/// Fixed-source mode: recursively enumerate every file under `dir`.
/// Directories are recursed unconditionally.
#[instrument(skip(callback))]
pub fn walk_source(
    dir: &Path,
    callback: &mut dyn FnMut(WalkEvent) -> DocmillResult<()>,
) -> DocmillResult<()> {
    debug!("walking source directory");
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|error| {
            let path = error
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dir.to_path_buf());
            match error.into_io_error() {
                Some(source) => file_error(path, source),
                None => Box::new(DocmillError::message(format!(
                    "walk failed under {}",
                    path.display()
                ))),
            }
        })?;
        if entry.file_type().is_file() {
            callback(WalkEvent::File(entry.into_path()))?;
        }
    }
    Ok(())
}

/// Package-aware root mode.
///
/// At each directory the walker checks for a package descriptor. Without
/// one it recurses normally. With one it emits a Descriptor event, resolves
/// the declared source subdirectory (`directories.src`, default `src`) and
/// descends only into that subdirectory, deliberately skipping the rest of
/// the package's tree (dependencies, build artifacts, config files).
///
/// Failure handling is deliberately split: a descriptor that exists but
/// cannot be read aborts the whole walk, while a descriptor that reads but
/// is not valid JSON abandons only that subtree; siblings continue at the
/// caller.
#[instrument(skip(callback))]
pub fn walk_root(
    dir: &Path,
    callback: &mut dyn FnMut(WalkEvent) -> DocmillResult<()>,
) -> DocmillResult<()> {
    let descriptor_path = dir.join(PACKAGE_DESCRIPTOR);
    if !descriptor_path.is_file() {
        for entry in sorted_entries(dir)? {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|source| file_error(path.clone(), source))?;
            if file_type.is_dir() {
                walk_root(&path, callback)?;
            } else if file_type.is_file() {
                callback(WalkEvent::File(path))?;
            }
        }
        return Ok(());
    }

    let content = fs::read_to_string(&descriptor_path).map_err(|source| {
        // Unreadable descriptor: unlike a parse failure, this aborts the
        // whole walk.
        Box::new(DocmillError::new(ErrorKind::Descriptor {
            path: descriptor_path.clone(),
            message: format!("descriptor could not be read: {}", source),
        }))
    })?;
    let descriptor: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(parse_error) => {
            // Malformed descriptor: abandon this subtree only.
            error!(
                path = %descriptor_path.display(),
                "skipping package with malformed descriptor: {}", parse_error
            );
            return Ok(());
        }
    };

    callback(WalkEvent::Descriptor {
        path: descriptor_path,
        descriptor: descriptor.clone(),
    })?;

    let source_dir = descriptor
        .get("directories")
        .and_then(|d| d.get("src"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SOURCE_DIR);
    let resolved = dir.join(source_dir);
    if !resolved.is_dir() {
        warn!(
            package = %dir.display(),
            source_dir,
            "package source directory missing, treating package as empty"
        );
        return Ok(());
    }

    walk_source(&resolved, callback)
}

fn sorted_entries(dir: &Path) -> DocmillResult<Vec<fs::DirEntry>> {
    let reader = fs::read_dir(dir).map_err(|source| file_error(dir.to_path_buf(), source))?;
    let mut entries = Vec::new();
    for entry in reader {
        entries.push(entry.map_err(|source| file_error(dir.to_path_buf(), source))?);
    }
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}

fn file_error(path: PathBuf, source: std::io::Error) -> Box<DocmillError> {
    Box::new(DocmillError::new(ErrorKind::File { path, source }))
}
