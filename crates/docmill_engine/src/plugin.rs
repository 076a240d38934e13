//! The plugin hook lifecycle.
//!
//! A typed hook registry: plugins implement the fixed-signature [`Plugin`]
//! trait (every hook defaults to a no-op), and the [`PluginRunner`] holds
//! them in registration order and dispatches each hook by iterating the
//! list. There is no string-keyed lookup and no reflection on plugin
//! internals.

use std::fs;
use std::io;
use std::mem;
use std::path::Path;

use relative_path::RelativePath;
use tracing::{debug, instrument};

use docmill_base::{DocmillError, DocmillResult, ErrorKind};

use crate::config::Config;
use crate::record::DocRecord;

/// Capabilities a plugin may implement; an omitted hook is a no-op.
///
/// Hook order per run: `on_start` → `on_handle_config` → (generation) →
/// `on_handle_docs` → (output written) → `on_publish` → `on_complete`.
/// `on_handle_content` filters every value written during the publish phase.
pub trait Plugin {
    fn on_start(&mut self) -> DocmillResult<()> {
        Ok(())
    }

    /// May replace the run configuration, immediately after defaulting.
    fn on_handle_config(&mut self, config: Config) -> DocmillResult<Config> {
        Ok(config)
    }

    /// May insert, remove or reorder records after duplicate resolution.
    fn on_handle_docs(&mut self, records: Vec<DocRecord>) -> DocmillResult<Vec<DocRecord>> {
        Ok(records)
    }

    /// Filters content written through [`Publisher::write`].
    fn on_handle_content(
        &mut self,
        content: String,
        _path: &RelativePath,
    ) -> DocmillResult<String> {
        Ok(content)
    }

    /// Publish phase: the plugin may write, copy and read below the
    /// destination directory.
    fn on_publish(&mut self, _publisher: &mut Publisher<'_>) -> DocmillResult<()> {
        Ok(())
    }

    fn on_complete(&mut self) -> DocmillResult<()> {
        Ok(())
    }
}

/// Stand-in occupying a publishing plugin's slot while its `on_publish`
/// runs; every hook is the default no-op.
struct InertPlugin;

impl Plugin for InertPlugin {}

/// Ordered hook dispatch wrapping the whole run.
pub struct PluginRunner {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRunner {
    /// Initialize the runner with plugins in registration order.
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        debug!(plugin_count = plugins.len(), "plugin runner initialized");
        Self { plugins }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn run_start(&mut self) -> DocmillResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_start()?;
        }
        Ok(())
    }

    pub fn run_handle_config(&mut self, mut config: Config) -> DocmillResult<Config> {
        for plugin in &mut self.plugins {
            config = plugin.on_handle_config(config)?;
        }
        Ok(config)
    }

    pub fn run_handle_docs(&mut self, mut records: Vec<DocRecord>) -> DocmillResult<Vec<DocRecord>> {
        for plugin in &mut self.plugins {
            records = plugin.on_handle_docs(records)?;
        }
        Ok(records)
    }

    /// Run the publish phase: each plugin's `on_publish` in registration
    /// order, with the write/copy/read primitives rooted at the
    /// destination. Any failure is wrapped as a publish error for the
    /// top-level driver to log and map to a non-zero exit.
    #[instrument(skip(self, destination))]
    pub fn run_publish(&mut self, destination: &Path) -> DocmillResult<()> {
        for index in 0..self.plugins.len() {
            // Swap the active plugin out so the publisher can borrow the
            // remaining plugins as content filters.
            let mut active = mem::replace(&mut self.plugins[index], Box::new(InertPlugin));
            let mut publisher = Publisher {
                destination,
                filters: &mut self.plugins,
            };
            let outcome = active.on_publish(&mut publisher);
            self.plugins[index] = active;
            outcome.map_err(|error| {
                Box::new(DocmillError::new(ErrorKind::Publish {
                    message: error.to_string(),
                }))
            })?;
        }
        Ok(())
    }

    pub fn run_complete(&mut self) -> DocmillResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_complete()?;
        }
        Ok(())
    }
}

/// The three publish-phase primitives, each rooted at the destination
/// directory.
pub struct Publisher<'a> {
    destination: &'a Path,
    filters: &'a mut Vec<Box<dyn Plugin>>,
}

impl Publisher<'_> {
    /// Write content below the destination. The content is first passed
    /// through every plugin's `on_handle_content` filter, in registration
    /// order.
    pub fn write(&mut self, path: &RelativePath, content: String) -> DocmillResult<()> {
        let mut content = content;
        for plugin in self.filters.iter_mut() {
            content = plugin.on_handle_content(content, path)?;
        }
        let target = path.to_path(self.destination);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| file_error(parent, source))?;
        }
        fs::write(&target, content).map_err(|source| file_error(&target, source))
    }

    /// Read a file below the destination.
    pub fn read(&self, path: &RelativePath) -> DocmillResult<String> {
        let target = path.to_path(self.destination);
        fs::read_to_string(&target).map_err(|source| file_error(&target, source))
    }

    /// Copy an external file or directory tree to a location below the
    /// destination. Copied content is not passed through content filters.
    pub fn copy(&mut self, source: &Path, path: &RelativePath) -> DocmillResult<()> {
        let target = path.to_path(self.destination);
        copy_tree(source, &target)
    }
}

// Errors name the path the operation actually failed on: the source side
// for reads, the target side for directory creation and writes.
fn copy_tree(from: &Path, to: &Path) -> DocmillResult<()> {
    if from.is_dir() {
        fs::create_dir_all(to).map_err(|source| file_error(to, source))?;
        let reader = fs::read_dir(from).map_err(|source| file_error(from, source))?;
        for entry in reader {
            let entry = entry.map_err(|source| file_error(from, source))?;
            copy_tree(&entry.path(), &to.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|source| file_error(parent, source))?;
        }
        fs::copy(from, to).map_err(|io_error| {
            Box::new(
                DocmillError::new(ErrorKind::File {
                    path: from.to_path_buf(),
                    source: io_error,
                })
                .with_context(|| format!("copying to {}", to.display())),
            )
        })?;
    }
    Ok(())
}

fn file_error(path: &Path, source: io::Error) -> Box<DocmillError> {
    Box::new(DocmillError::new(ErrorKind::File {
        path: path.to_path_buf(),
        source,
    }))
}
