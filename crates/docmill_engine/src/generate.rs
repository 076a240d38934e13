//! The top-level generation run.
//!
//! All state is threaded explicitly: configuration, the record collection,
//! the descriptor list and the pipeline handle live in this function and
//! are passed to each component — there is no ambient or global
//! orchestration state. Inner components never halt the process; every
//! fatal condition propagates here as an error for the host to map to an
//! exit status.

use std::path::{Path, PathBuf};

use relative_path::RelativePathBuf;
use serde_json::Value;
use tracing::{error, info, instrument};

use docmill_base::{DocmillError, DocmillResult};

use crate::assembler::{append_index_record, append_package_record, write_index};
use crate::config::{Config, SourceMode};
use crate::driver::{FileOutcome, RecordExtractor, SourceParser, process_file};
use crate::matcher::PathMatcher;
use crate::pipeline::{AstJob, AstPipeline};
use crate::plugin::{Plugin, PluginRunner};
use crate::record::RecordCollection;
use crate::resolver::resolve_duplicates;
use crate::walker::{WalkEvent, walk_root, walk_source};

/// One recoverable per-file failure, reported alongside the results.
#[derive(Debug)]
pub struct ParseFailure {
    pub path: PathBuf,
    pub error: Box<DocmillError>,
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Files accepted by the path matcher and handed to the driver.
    pub files_matched: usize,
    /// Files that parsed and contributed records and an archived AST.
    pub files_parsed: usize,
    /// Records in the final written `index.json`.
    pub records_written: usize,
    /// Per-file parse failures (the files were skipped, the run continued).
    pub parse_failures: Vec<ParseFailure>,
}

/// Run the whole generation pipeline.
///
/// Hook order: `on_start` → `on_handle_config` → walk/extract/persist →
/// pipeline drain → synthetic records → duplicate resolution →
/// `on_handle_docs` → `index.json` write → publish phase → `on_complete`.
#[instrument(skip_all)]
pub fn generate(
    config: Config,
    plugins: Vec<Box<dyn Plugin>>,
    parser: &dyn SourceParser,
    extractor: &mut dyn RecordExtractor,
) -> DocmillResult<RunSummary> {
    let mut runner = PluginRunner::new(plugins);
    runner.run_start()?;
    let config = runner.run_handle_config(config)?;

    let matcher = PathMatcher::new(&config.includes, &config.excludes)?;
    let base = config.source_base().to_path_buf();

    let mut records = RecordCollection::new();
    let mut descriptors: Vec<(PathBuf, Value)> = Vec::new();
    let mut summary = RunSummary::default();
    let mut pipeline = AstPipeline::start(&config.destination)?;

    {
        let mut callback = |event: WalkEvent| -> DocmillResult<()> {
            match event {
                WalkEvent::File(absolute) => {
                    let Some(relative) = relative_to(&base, &absolute)? else {
                        return Ok(());
                    };
                    if !matcher.is_match(&relative) {
                        return Ok(());
                    }
                    summary.files_matched += 1;
                    match process_file(parser, extractor, &absolute, &mut records)? {
                        FileOutcome::Parsed(ast) => {
                            summary.files_parsed += 1;
                            pipeline.submit(AstJob {
                                relative_path: relative,
                                ast,
                            })?;
                        }
                        FileOutcome::Skipped(parse_error) => {
                            summary.parse_failures.push(ParseFailure {
                                path: absolute,
                                error: parse_error,
                            });
                        }
                    }
                    Ok(())
                }
                WalkEvent::Descriptor { path, descriptor } => {
                    descriptors.push((path, descriptor));
                    Ok(())
                }
            }
        };
        match &config.mode {
            SourceMode::Root(root) => walk_root(root, &mut callback)?,
            SourceMode::Source { source, .. } => walk_source(source, &mut callback)?,
        }
    }

    // Drain the pipeline before anything downstream of extraction runs.
    pipeline.close()?;

    append_index_record(&config.index, &mut records)?;
    append_package_record(&config, &descriptors, &mut records)?;

    let mut entries = records.into_entries();
    resolve_duplicates(&mut entries);
    let entries = runner.run_handle_docs(entries)?;

    write_index(&config.destination, &entries)?;
    summary.records_written = entries.len();

    if let Err(publish_error) = runner.run_publish(&config.destination) {
        error!("publish phase failed: {}", publish_error);
        return Err(publish_error);
    }
    runner.run_complete()?;

    info!(
        files_matched = summary.files_matched,
        files_parsed = summary.files_parsed,
        records_written = summary.records_written,
        parse_failures = summary.parse_failures.len(),
        "generation complete"
    );
    Ok(summary)
}

/// Relative form of a discovered path, or None for paths outside the base
/// (cannot happen for paths the walker emits).
fn relative_to(base: &Path, absolute: &Path) -> DocmillResult<Option<RelativePathBuf>> {
    let Ok(stripped) = absolute.strip_prefix(base) else {
        return Ok(None);
    };
    let relative = RelativePathBuf::from_path(stripped).map_err(|_| {
        Box::new(DocmillError::message(format!(
            "non-UTF-8 path cannot be processed: {}",
            absolute.display()
        )))
    })?;
    Ok(Some(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfig;
    use crate::driver::Ast;
    use crate::record::{DocRecord, RecordKind};
    use docmill_base::ErrorKind;
    use relative_path::RelativePath;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    /// Parses source files that contain a JSON AST; anything else is a
    /// syntax error.
    struct JsonParser;

    impl SourceParser for JsonParser {
        fn parse(&self, path: &Path) -> DocmillResult<Ast> {
            let text = fs::read_to_string(path).map_err(|e| {
                Box::new(DocmillError::new(ErrorKind::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }))
            })?;
            serde_json::from_str(&text).map_err(|e| {
                Box::new(DocmillError::new(ErrorKind::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }))
            })
        }
    }

    /// Emits one record per node carrying a "longname" field.
    struct LongnameExtractor;

    impl RecordExtractor for LongnameExtractor {
        fn extract(
            &mut self,
            node: &Ast,
            _parent: Option<&Ast>,
            records: &mut RecordCollection,
        ) -> DocmillResult<()> {
            if let Some(longname) = node.get("longname").and_then(Value::as_str) {
                let kind = match node.get("recordKind").and_then(Value::as_str) {
                    Some("member") => RecordKind::Member,
                    Some("method") => RecordKind::Method,
                    _ => RecordKind::Function,
                };
                records.append(DocRecord::new(kind, longname, longname));
            }
            Ok(())
        }
    }

    fn node(longname: &str, kind: &str) -> Value {
        json!({"type": "Node", "longname": longname, "recordKind": kind})
    }

    fn config_for(source: &Path, destination: &Path) -> Config {
        Config::from_raw(RawConfig {
            source: Some(source.to_path_buf()),
            destination: Some(destination.to_path_buf()),
            ..Default::default()
        })
        .unwrap()
    }

    fn read_index(destination: &Path) -> Vec<DocRecord> {
        let text = fs::read_to_string(destination.join("index.json")).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_end_to_end_run_with_parse_failure() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(
            src.path().join("good1.js"),
            json!({"type": "Program", "body": [node("good1", "function")]}).to_string(),
        )
        .unwrap();
        fs::write(
            src.path().join("good2.js"),
            json!({"type": "Program", "body": [node("good2", "function")]}).to_string(),
        )
        .unwrap();
        fs::write(src.path().join("bad.js"), "this is not an AST").unwrap();

        let config = config_for(src.path(), dest.path());
        let summary = generate(config, Vec::new(), &JsonParser, &mut LongnameExtractor).unwrap();

        assert_eq!(summary.files_matched, 3);
        assert_eq!(summary.files_parsed, 2);
        assert_eq!(summary.parse_failures.len(), 1);
        assert_eq!(summary.parse_failures[0].path, src.path().join("bad.js"));

        // The bad file does not prevent the good ones from being indexed.
        let index = read_index(dest.path());
        let longnames: Vec<_> = index.iter().map(|r| r.longname.as_str()).collect();
        assert_eq!(longnames, vec!["good1", "good2"]);
        assert_eq!(summary.records_written, 2);

        // ASTs are archived for parsed files only.
        assert!(dest.path().join("ast/source/good1.js.json").is_file());
        assert!(dest.path().join("ast/source/good2.js.json").is_file());
        assert!(!dest.path().join("ast/source/bad.js.json").exists());
    }

    #[test]
    fn test_excluded_files_are_never_parsed() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(
            src.path().join("app.js"),
            json!({"type": "Program", "body": [node("app", "function")]}).to_string(),
        )
        .unwrap();
        // Matches both the include and the default exclude pattern; exclude
        // must win, and the file must never reach the parser.
        fs::write(src.path().join("app.test.js"), "not even json").unwrap();

        let config = config_for(src.path(), dest.path());
        let summary = generate(config, Vec::new(), &JsonParser, &mut LongnameExtractor).unwrap();

        assert_eq!(summary.files_matched, 1);
        assert!(summary.parse_failures.is_empty());
        let index = read_index(dest.path());
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].longname, "app");
    }

    #[test]
    fn test_duplicate_resolution_applies_to_final_index() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(
            src.path().join("a.js"),
            json!({
                "type": "Program",
                "body": [node("Foo#x", "member"), node("Foo#x", "method")]
            })
            .to_string(),
        )
        .unwrap();

        let config = config_for(src.path(), dest.path());
        generate(config, Vec::new(), &JsonParser, &mut LongnameExtractor).unwrap();

        let index = read_index(dest.path());
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].kind, RecordKind::Method);
    }

    #[test]
    fn test_docs_hook_shapes_final_output() {
        struct Reverser;
        impl Plugin for Reverser {
            fn on_handle_docs(
                &mut self,
                mut records: Vec<DocRecord>,
            ) -> DocmillResult<Vec<DocRecord>> {
                records.reverse();
                Ok(records)
            }
        }

        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(
            src.path().join("a.js"),
            json!({
                "type": "Program",
                "body": [node("first", "function"), node("second", "function")]
            })
            .to_string(),
        )
        .unwrap();

        let config = config_for(src.path(), dest.path());
        generate(
            config,
            vec![Box::new(Reverser)],
            &JsonParser,
            &mut LongnameExtractor,
        )
        .unwrap();

        let longnames: Vec<_> = read_index(dest.path())
            .into_iter()
            .map(|r| r.longname)
            .collect();
        assert_eq!(longnames, vec!["second", "first"]);
    }

    #[test]
    fn test_publish_hook_runs_after_index_write() {
        struct IndexInspector;
        impl Plugin for IndexInspector {
            fn on_publish(&mut self, publisher: &mut crate::plugin::Publisher<'_>) -> DocmillResult<()> {
                // index.json must already exist when publish runs.
                let index = publisher.read(RelativePath::new("index.json"))?;
                publisher.write(
                    RelativePath::new("published.txt"),
                    format!("index bytes: {}", index.len()),
                )
            }
        }

        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(
            src.path().join("a.js"),
            json!({"type": "Program", "body": [node("a", "function")]}).to_string(),
        )
        .unwrap();

        let config = config_for(src.path(), dest.path());
        generate(
            config,
            vec![Box::new(IndexInspector)],
            &JsonParser,
            &mut LongnameExtractor,
        )
        .unwrap();

        assert!(dest.path().join("published.txt").is_file());
    }

    #[test]
    fn test_root_mode_produces_package_record() {
        let root = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let pkg = root.path().join("widget");
        fs::create_dir_all(pkg.join("src")).unwrap();
        fs::write(
            pkg.join("package.json"),
            json!({"name": "widget"}).to_string(),
        )
        .unwrap();
        fs::write(
            pkg.join("src/w.js"),
            json!({"type": "Program", "body": [node("w", "function")]}).to_string(),
        )
        .unwrap();

        let config = Config::from_raw(RawConfig {
            root: Some(root.path().to_path_buf()),
            destination: Some(dest.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        generate(config, Vec::new(), &JsonParser, &mut LongnameExtractor).unwrap();

        let index = read_index(dest.path());
        let kinds: Vec<_> = index.iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&RecordKind::Package));
        assert!(index.iter().any(|r| r.longname == "w"));
    }

    #[test]
    fn test_extraction_error_terminates_run() {
        struct PoisonExtractor;
        impl RecordExtractor for PoisonExtractor {
            fn extract(
                &mut self,
                _node: &Ast,
                _parent: Option<&Ast>,
                _records: &mut RecordCollection,
            ) -> DocmillResult<()> {
                Err(Box::new(DocmillError::message("model corrupted")))
            }
        }

        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(
            src.path().join("a.js"),
            json!({"type": "Program"}).to_string(),
        )
        .unwrap();

        let config = config_for(src.path(), dest.path());
        let error = generate(config, Vec::new(), &JsonParser, &mut PoisonExtractor).unwrap_err();
        assert!(error.to_string().contains("model corrupted"));
        // Fail-fast: no index is written.
        assert!(!dest.path().join("index.json").exists());
    }
}
