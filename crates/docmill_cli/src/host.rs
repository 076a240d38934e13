//! Host-side collaborators.
//!
//! The engine treats the language parser and the node extraction logic as
//! external collaborators. This host wires in a minimal pair: source files
//! are expected to contain a pre-parsed AST in JSON form, and nodes carry
//! their documentation in a `doc` annotation object.

use std::fs;
use std::path::Path;

use serde_json::Value;

use docmill_base::{DocmillError, DocmillResult, ErrorKind};
use docmill_engine::{Access, Ast, DocRecord, RecordCollection, RecordExtractor, RecordKind, SourceParser};

/// Parses a source file that already contains its AST as JSON. Invalid
/// JSON is a recoverable syntax error: the file is skipped.
pub struct JsonAstParser;

impl SourceParser for JsonAstParser {
    fn parse(&self, path: &Path) -> DocmillResult<Ast> {
        let text = fs::read_to_string(path).map_err(|read_error| {
            Box::new(DocmillError::new(ErrorKind::Parse {
                path: path.to_path_buf(),
                message: read_error.to_string(),
            }))
        })?;
        serde_json::from_str(&text).map_err(|syntax_error| {
            Box::new(DocmillError::new(ErrorKind::Parse {
                path: path.to_path_buf(),
                message: syntax_error.to_string(),
            }))
        })
    }
}

/// Builds one record per node carrying a `doc` annotation object with at
/// least `kind` and `longname` fields. A malformed annotation is an
/// extraction-model error and terminates the run.
pub struct DocTagExtractor;

impl RecordExtractor for DocTagExtractor {
    fn extract(
        &mut self,
        node: &Ast,
        _parent: Option<&Ast>,
        records: &mut RecordCollection,
    ) -> DocmillResult<()> {
        let Some(doc) = node.get("doc").and_then(Value::as_object) else {
            return Ok(());
        };

        let kind: RecordKind = field(doc, "kind").and_then(|value| {
            serde_json::from_value(Value::String(value.to_string())).map_err(|_| {
                Box::new(DocmillError::message(format!(
                    "unknown record kind '{}' in doc annotation",
                    value
                )))
            })
        })?;
        let longname = field(doc, "longname")?;
        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_else(|| short_name(longname));

        let access = match doc.get("access").and_then(Value::as_str) {
            Some("private") => Access::Private,
            Some("protected") => Access::Protected,
            _ => Access::Public,
        };
        let is_static = doc.get("static").and_then(Value::as_bool).unwrap_or(false);

        let mut record = DocRecord::new(kind, longname, name)
            .with_static(is_static)
            .with_access(access);
        if let Some(description) = doc.get("description") {
            record = record.with_extra("description", description.clone());
        }
        records.append(record);
        Ok(())
    }
}

fn field<'a>(
    doc: &'a serde_json::Map<String, Value>,
    key: &str,
) -> DocmillResult<&'a str> {
    doc.get(key).and_then(Value::as_str).ok_or_else(|| {
        Box::new(DocmillError::message(format!(
            "doc annotation is missing required field '{}'",
            key
        )))
    })
}

/// Last segment of a longname: `Foo#bar` documents `bar`.
fn short_name(longname: &str) -> &str {
    longname
        .rsplit(['#', '.', '~'])
        .next()
        .unwrap_or(longname)
}
