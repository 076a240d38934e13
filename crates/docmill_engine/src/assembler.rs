//! Synthetic records and the final aggregated output.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use docmill_base::{DocmillError, DocmillResult, ErrorKind};

use crate::config::{Config, SourceMode};
use crate::record::{DocRecord, RecordCollection, RecordKind};

/// Append the synthetic index record wrapping the raw text of the
/// designated index document. A missing index file is logged and skipped.
pub fn append_index_record(index_path: &Path, records: &mut RecordCollection) -> DocmillResult<()> {
    if !index_path.is_file() {
        debug!(path = %index_path.display(), "no index document, skipping index record");
        return Ok(());
    }
    let content = fs::read_to_string(index_path).map_err(|source| {
        Box::new(DocmillError::new(ErrorKind::File {
            path: index_path.to_path_buf(),
            source,
        }))
    })?;
    let name = index_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    records.append(
        DocRecord::new(RecordKind::Index, name.clone(), name)
            .with_extra("content", Value::String(content)),
    );
    Ok(())
}

/// Append the synthetic package record.
///
/// In package-aware root mode this wraps the first descriptor the walker
/// parsed. In single-source legacy mode it wraps the configured
/// descriptor's raw text under the distinct legacy kind. Either source
/// being absent is logged and skipped.
pub fn append_package_record(
    config: &Config,
    descriptors: &[(PathBuf, Value)],
    records: &mut RecordCollection,
) -> DocmillResult<()> {
    match &config.mode {
        SourceMode::Root(_) => {
            let Some((path, descriptor)) = descriptors.first() else {
                debug!("no package descriptor found during walk, skipping package record");
                return Ok(());
            };
            let name = descriptor
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("package")
                .to_string();
            records.append(
                DocRecord::new(RecordKind::Package, name.clone(), name)
                    .with_extra("package", descriptor.clone())
                    .with_extra("path", Value::String(path.display().to_string())),
            );
        }
        SourceMode::Source {
            package: Some(package_path),
            ..
        } => match fs::read_to_string(package_path) {
            Ok(content) => {
                let name = package_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "package".to_string());
                records.append(
                    DocRecord::new(RecordKind::LegacyPackage, name.clone(), name)
                        .with_extra("content", Value::String(content)),
                );
            }
            Err(read_error) => {
                warn!(
                    path = %package_path.display(),
                    "could not read package descriptor, skipping package record: {}", read_error
                );
            }
        },
        SourceMode::Source { package: None, .. } => {}
    }
    Ok(())
}

/// Serialize the final ordered record list, pretty-printed, to
/// `<destination>/index.json`. This write is the run's terminal data
/// artifact.
pub fn write_index(destination: &Path, records: &[DocRecord]) -> DocmillResult<()> {
    fs::create_dir_all(destination).map_err(|source| file_error(destination, source))?;
    let target = destination.join("index.json");
    let file = fs::File::create(&target).map_err(|source| file_error(&target, source))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records).map_err(|error| {
        Box::new(DocmillError::message(format!(
            "failed to serialize {}: {}",
            target.display(),
            error
        )))
    })?;
    writer
        .flush()
        .map_err(|source| file_error(&target, source))?;
    debug!(target = %target.display(), record_count = records.len(), "index written");
    Ok(())
}

fn file_error(path: &Path, source: std::io::Error) -> Box<DocmillError> {
    Box::new(DocmillError::new(ErrorKind::File {
        path: path.to_path_buf(),
        source,
    }))
}
