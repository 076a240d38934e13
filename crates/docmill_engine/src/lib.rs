pub mod assembler;
pub mod config;
pub mod driver;
pub mod generate;
pub mod matcher;
pub mod pipeline;
pub mod plugin;
pub mod record;
pub mod resolver;
pub mod walker;

pub use assembler::{append_index_record, append_package_record, write_index};
pub use config::{Config, RawConfig, SourceMode, load_config};
pub use driver::{Ast, FileOutcome, RecordExtractor, SourceParser, process_file, visit_nodes};
pub use generate::{ParseFailure, RunSummary, generate};
pub use matcher::PathMatcher;
pub use pipeline::{AstJob, AstPipeline};
pub use plugin::{Plugin, PluginRunner, Publisher};
pub use record::{Access, DocRecord, RecordCollection, RecordKind};
pub use resolver::resolve_duplicates;
pub use walker::{PACKAGE_DESCRIPTOR, WalkEvent, walk_root, walk_source};
