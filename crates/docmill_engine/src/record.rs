//! The documentation record model.
//!
//! A [`DocRecord`] is one structured unit of extracted documentation for a
//! symbol. Records are created by the extraction collaborator during
//! traversal and are never mutated in place afterwards: the duplicate
//! resolver only filters them out, and a docs hook may replace the
//! collection wholesale.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of symbol (or synthetic source) a record documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Function,
    Class,
    Member,
    Method,
    #[serde(rename = "get")]
    Getter,
    #[serde(rename = "set")]
    Setter,
    Variable,
    /// Synthetic record wrapping the raw index document text.
    Index,
    /// Synthetic record wrapping the parsed package descriptor.
    Package,
    /// Synthetic record wrapping the raw descriptor text (single-source
    /// legacy mode).
    #[serde(rename = "legacy-package")]
    LegacyPackage,
}

/// Access level of a documented symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

/// One extracted documentation record ("doc entry").
///
/// `longname` is the scoped identifier correlating records that describe the
/// same symbol (e.g. `Foo#bar`). `sequence` is the creation-sequence id
/// assigned by the [`RecordCollection`] on append; it increases
/// monotonically in extraction order and is what the duplicate resolver uses
/// to pick the earliest of competing member records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocRecord {
    pub kind: RecordKind,
    pub longname: String,
    pub name: String,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub sequence: u64,
    /// Kind-specific payload, flattened into the serialized object.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl DocRecord {
    /// Create a record with default flags and an empty payload. The sequence
    /// id is assigned when the record is appended to a collection.
    pub fn new(kind: RecordKind, longname: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            longname: longname.into(),
            name: name.into(),
            is_static: false,
            access: Access::default(),
            sequence: 0,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Attach one kind-specific payload field.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// The process-wide record collection.
///
/// Appended to exclusively by the single traversal/extraction task, so no
/// locking is required. Assigns monotonically increasing sequence ids.
#[derive(Debug, Default)]
pub struct RecordCollection {
    entries: Vec<DocRecord>,
    next_sequence: u64,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, assigning it the next creation-sequence id.
    /// Returns the assigned id.
    pub fn append(&mut self, mut record: DocRecord) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        record.sequence = sequence;
        self.entries.push(record);
        sequence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DocRecord] {
        &self.entries
    }

    /// Consume the collection, yielding records in append order.
    pub fn into_entries(self) -> Vec<DocRecord> {
        self.entries
    }
}
