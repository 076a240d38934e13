use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use docmill_base::{DocmillError, DocmillResult, ErrorKind};

/// Raw configuration as deserialized from a `docmill.toml` file.
///
/// This is the unvalidated form: mutually exclusive fields are still plain
/// options here. [`Config::from_raw`] performs defaulting and validation
/// exactly once, before any traversal work starts.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    /// Package-aware root directory. Mutually exclusive with `source`.
    pub root: Option<PathBuf>,
    /// Fixed source directory. Mutually exclusive with `root`.
    pub source: Option<PathBuf>,
    /// Package descriptor path, only meaningful together with `source`.
    pub package: Option<PathBuf>,
    /// Output directory (required).
    pub destination: Option<PathBuf>,
    /// Include patterns (regular expressions over relative paths).
    pub includes: Option<Vec<String>>,
    /// Exclude patterns (regular expressions over relative paths).
    pub excludes: Option<Vec<String>>,
    /// Index document wrapped into the synthetic index record.
    pub index: Option<PathBuf>,
    /// Ordered plugin names; resolved to implementations by the host.
    #[serde(default)]
    pub plugins: Vec<String>,
}

/// Where source files come from. Encoding the mode as an enum makes the
/// root/source mutual exclusion unrepresentable after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// Package-aware traversal starting at a root directory.
    Root(PathBuf),
    /// Fixed-source traversal of one directory, with an optional package
    /// descriptor used for the legacy package record.
    Source {
        source: PathBuf,
        package: Option<PathBuf>,
    },
}

/// Normalized run parameters. Built once via [`Config::from_raw`] and
/// immutable for the remainder of the run, except for the single rewrite a
/// plugin may perform in its config hook immediately afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: SourceMode,
    pub destination: PathBuf,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub index: PathBuf,
    pub plugins: Vec<String>,
}

const DEFAULT_INCLUDES: &[&str] = &["\\.js$"];
const DEFAULT_EXCLUDES: &[&str] = &["\\.config\\.js$", "\\.test\\.js$"];
const DEFAULT_INDEX: &str = "README.md";

impl Config {
    /// Validate and default a raw configuration.
    ///
    /// Pre-flight failures (missing destination, root/source conflict,
    /// package without source) are reported here, before any file is
    /// touched.
    pub fn from_raw(raw: RawConfig) -> DocmillResult<Self> {
        let destination = raw.destination.ok_or_else(|| {
            config_error("'destination' is required")
        })?;

        let mode = match (raw.root, raw.source) {
            (Some(_), Some(_)) => {
                return Err(config_error("'root' and 'source' are mutually exclusive"));
            }
            (None, None) => {
                return Err(config_error("one of 'root' or 'source' is required"));
            }
            (Some(root), None) => {
                if raw.package.is_some() {
                    return Err(config_error("'package' requires 'source', not 'root'"));
                }
                SourceMode::Root(root)
            }
            (None, Some(source)) => SourceMode::Source {
                source,
                package: raw.package,
            },
        };

        let includes = raw
            .includes
            .unwrap_or_else(|| DEFAULT_INCLUDES.iter().map(|s| s.to_string()).collect());
        let excludes = raw
            .excludes
            .unwrap_or_else(|| DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect());
        let index = raw.index.unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX));

        Ok(Self {
            mode,
            destination,
            includes,
            excludes,
            index,
            plugins: raw.plugins,
        })
    }

    /// The directory relative paths are computed against: the root in
    /// package-aware mode, the source directory otherwise.
    pub fn source_base(&self) -> &Path {
        match &self.mode {
            SourceMode::Root(root) => root,
            SourceMode::Source { source, .. } => source,
        }
    }
}

/// Load a raw configuration from a TOML file.
pub fn load_config(path: &Path) -> DocmillResult<RawConfig> {
    debug!(path = %path.display(), "loading configuration");
    let content = fs::read_to_string(path).map_err(|source| {
        Box::new(DocmillError::new(ErrorKind::File {
            path: path.to_path_buf(),
            source,
        }))
    })?;
    let raw = toml::from_str(&content).map_err(|error| {
        Box::new(DocmillError::new(ErrorKind::Config {
            message: format!("failed to parse {}: {}", path.display(), error),
        }))
    })?;
    Ok(raw)
}

fn config_error(message: &str) -> Box<DocmillError> {
    Box::new(DocmillError::new(ErrorKind::Config {
        message: message.to_string(),
    }))
}
