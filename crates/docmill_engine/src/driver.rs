//! Per-file extraction driving.
//!
//! The language parser and the node-by-node extraction logic are external
//! collaborators behind the [`SourceParser`] and [`RecordExtractor`] traits;
//! this module only isolates per-file failures and drives the depth-first
//! AST traversal with parent tracking.

use std::path::Path;

use serde_json::Value;
use tracing::warn;

use docmill_base::{DocmillError, DocmillResult, ErrorKind};

use crate::record::RecordCollection;

/// A parsed abstract syntax tree.
///
/// A *node* is a JSON object carrying a string `"type"` field; children are
/// node-valued fields and node elements of array-valued fields, visited in
/// field order.
pub type Ast = Value;

/// External parser collaborator. A parse failure is recoverable: the file
/// is skipped and the run continues.
pub trait SourceParser {
    fn parse(&self, path: &Path) -> DocmillResult<Ast>;
}

/// External extraction collaborator. Appends zero or more records per
/// (node, parent) pair. An extraction failure is fatal: it implies the
/// extraction model itself is corrupted, not that the input is malformed.
pub trait RecordExtractor {
    fn extract(
        &mut self,
        node: &Ast,
        parent: Option<&Ast>,
        records: &mut RecordCollection,
    ) -> DocmillResult<()>;
}

/// Outcome of processing one accepted file.
#[derive(Debug)]
pub enum FileOutcome {
    /// The file parsed and its records were extracted; the AST is handed to
    /// the persistence pipeline.
    Parsed(Ast),
    /// The file failed to parse and was skipped (recoverable).
    Skipped(Box<DocmillError>),
}

/// Returns true if the value is an AST node.
pub fn is_node(value: &Value) -> bool {
    value.get("type").is_some_and(Value::is_string)
}

/// Depth-first traversal with parent tracking. The visitor sees each node
/// before its children.
pub fn visit_nodes(
    node: &Ast,
    parent: Option<&Ast>,
    visit: &mut dyn FnMut(&Ast, Option<&Ast>) -> DocmillResult<()>,
) -> DocmillResult<()> {
    if !is_node(node) {
        return Ok(());
    }
    visit(node, parent)?;
    if let Some(object) = node.as_object() {
        for value in object.values() {
            match value {
                Value::Object(_) => visit_nodes(value, Some(node), visit)?,
                Value::Array(items) => {
                    for item in items {
                        visit_nodes(item, Some(node), visit)?;
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Process one accepted file: parse, then feed every (node, parent) pair to
/// the extractor.
///
/// Parse failures are logged and reported as [`FileOutcome::Skipped`].
/// Extraction failures are logged with file and node context and re-raised
/// as the `Err` variant to terminate the run.
pub fn process_file(
    parser: &dyn SourceParser,
    extractor: &mut dyn RecordExtractor,
    path: &Path,
    records: &mut RecordCollection,
) -> DocmillResult<FileOutcome> {
    let ast = match parser.parse(path) {
        Ok(ast) => ast,
        Err(error) => {
            warn!(path = %path.display(), "failed to parse source file: {}", error);
            return Ok(FileOutcome::Skipped(error));
        }
    };

    visit_nodes(&ast, None, &mut |node, parent| {
        extractor.extract(node, parent, records).map_err(|error| {
            let node_type = node
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            tracing::error!(
                path = %path.display(),
                node_type,
                "extraction failed: {}", error
            );
            Box::new(DocmillError::new(ErrorKind::Extraction {
                path: path.to_path_buf(),
                node_type: node_type.to_string(),
                message: error.to_string(),
            }))
        })
    })?;

    Ok(FileOutcome::Parsed(ast))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DocRecord, RecordKind};
    use serde_json::json;
    use std::path::PathBuf;

    struct StubParser {
        result: std::collections::HashMap<PathBuf, Ast>,
    }

    impl SourceParser for StubParser {
        fn parse(&self, path: &Path) -> DocmillResult<Ast> {
            self.result.get(path).cloned().ok_or_else(|| {
                Box::new(DocmillError::new(docmill_base::ErrorKind::Parse {
                    path: path.to_path_buf(),
                    message: "unexpected token".to_string(),
                }))
            })
        }
    }

    /// Records every visited node type; errors on a designated type.
    struct TypeCollector {
        visited: Vec<(String, Option<String>)>,
        poison: Option<String>,
    }

    impl RecordExtractor for TypeCollector {
        fn extract(
            &mut self,
            node: &Ast,
            parent: Option<&Ast>,
            records: &mut RecordCollection,
        ) -> DocmillResult<()> {
            let node_type = node["type"].as_str().unwrap().to_string();
            if self.poison.as_deref() == Some(node_type.as_str()) {
                return Err(Box::new(DocmillError::message("extraction model corrupted")));
            }
            let parent_type = parent.map(|p| p["type"].as_str().unwrap().to_string());
            self.visited.push((node_type.clone(), parent_type));
            records.append(DocRecord::new(RecordKind::Variable, node_type.clone(), node_type));
            Ok(())
        }
    }

    fn sample_ast() -> Ast {
        json!({
            "type": "Program",
            "body": [
                {
                    "type": "ClassDeclaration",
                    "id": {"type": "Identifier", "name": "Foo"},
                    "span": [0, 10]
                },
                {"type": "VariableDeclaration"}
            ]
        })
    }

    #[test]
    fn test_traversal_is_depth_first_with_parents() {
        let mut collector = TypeCollector {
            visited: vec![],
            poison: None,
        };
        let mut records = RecordCollection::new();
        let ast = sample_ast();
        visit_nodes(&ast, None, &mut |node, parent| {
            collector.extract(node, parent, &mut records)
        })
        .unwrap();

        assert_eq!(
            collector.visited,
            vec![
                ("Program".to_string(), None),
                ("ClassDeclaration".to_string(), Some("Program".to_string())),
                ("Identifier".to_string(), Some("ClassDeclaration".to_string())),
                ("VariableDeclaration".to_string(), Some("Program".to_string())),
            ]
        );
        // Sequence ids follow visit order.
        assert_eq!(records.entries()[0].sequence, 0);
        assert_eq!(records.entries()[3].sequence, 3);
    }

    #[test]
    fn test_non_node_values_are_skipped() {
        let ast = json!({"type": "Program", "meta": {"no_type_here": true}, "count": 3});
        let mut visited = 0;
        visit_nodes(&ast, None, &mut |_, _| {
            visited += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_parse_failure_is_recoverable() {
        let parser = StubParser {
            result: Default::default(),
        };
        let mut extractor = TypeCollector {
            visited: vec![],
            poison: None,
        };
        let mut records = RecordCollection::new();

        let outcome = process_file(
            &parser,
            &mut extractor,
            Path::new("bad.js"),
            &mut records,
        )
        .unwrap();

        assert!(matches!(outcome, FileOutcome::Skipped(_)));
        assert!(records.is_empty());
    }

    #[test]
    fn test_extraction_failure_is_fatal_with_node_context() {
        let mut map = std::collections::HashMap::new();
        map.insert(PathBuf::from("ok.js"), sample_ast());
        let parser = StubParser { result: map };
        let mut extractor = TypeCollector {
            visited: vec![],
            poison: Some("Identifier".to_string()),
        };
        let mut records = RecordCollection::new();

        let error = process_file(
            &parser,
            &mut extractor,
            Path::new("ok.js"),
            &mut records,
        )
        .unwrap_err();

        let message = error.to_string();
        assert!(message.contains("Identifier"));
        assert!(message.contains("ok.js"));
    }

    #[test]
    fn test_successful_file_returns_ast_for_persistence() {
        let mut map = std::collections::HashMap::new();
        map.insert(PathBuf::from("ok.js"), sample_ast());
        let parser = StubParser { result: map };
        let mut extractor = TypeCollector {
            visited: vec![],
            poison: None,
        };
        let mut records = RecordCollection::new();

        let outcome = process_file(
            &parser,
            &mut extractor,
            Path::new("ok.js"),
            &mut records,
        )
        .unwrap();

        match outcome {
            FileOutcome::Parsed(ast) => assert_eq!(ast, sample_ast()),
            other => panic!("expected Parsed, got {:?}", other),
        }
        assert_eq!(records.len(), 4);
    }
}
