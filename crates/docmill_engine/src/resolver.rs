//! Cross-file duplicate resolution.

use std::collections::HashMap;

use tracing::debug;

use crate::record::{DocRecord, RecordKind};

#[derive(Default)]
struct LongnameInfo {
    has_non_member_kind: bool,
    first_member_sequence: Option<u64>,
}

/// Remove duplicate member-kind records from the complete collection.
///
/// Candidates for removal are exactly the records of kind `member`:
/// - If any other record shares the longname with a different kind, the
///   member is removed — accessor/method kinds document the symbol with
///   higher fidelity.
/// - If multiple members share a longname with no competing kind, only the
///   one with the lowest creation-sequence id survives (repeated assignment
///   sites collapse to the first).
///
/// Removal is one filter pass; the relative order of survivors is unchanged.
pub fn resolve_duplicates(records: &mut Vec<DocRecord>) {
    let mut by_longname: HashMap<String, LongnameInfo> = HashMap::new();
    for record in records.iter() {
        let info = by_longname.entry(record.longname.clone()).or_default();
        if record.kind == RecordKind::Member {
            let first = info.first_member_sequence.get_or_insert(record.sequence);
            if record.sequence < *first {
                *first = record.sequence;
            }
        } else {
            info.has_non_member_kind = true;
        }
    }

    let before = records.len();
    records.retain(|record| {
        if record.kind != RecordKind::Member {
            return true;
        }
        let info = &by_longname[&record.longname];
        !info.has_non_member_kind && info.first_member_sequence == Some(record.sequence)
    });
    debug!(
        removed = before - records.len(),
        remaining = records.len(),
        "duplicate resolution complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sequence: u64, kind: RecordKind, longname: &str) -> DocRecord {
        let mut r = DocRecord::new(kind, longname, longname.rsplit('#').next().unwrap());
        r.sequence = sequence;
        r
    }

    #[test]
    fn test_competing_kind_removes_member() {
        let mut records = vec![
            record(1, RecordKind::Member, "Foo#x"),
            record(2, RecordKind::Method, "Foo#x"),
        ];
        resolve_duplicates(&mut records);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::Method);
    }

    #[test]
    fn test_competing_kind_wins_independent_of_sequence_order() {
        let mut records = vec![
            record(1, RecordKind::Getter, "Foo#x"),
            record(2, RecordKind::Member, "Foo#x"),
        ];
        resolve_duplicates(&mut records);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::Getter);
    }

    #[test]
    fn test_duplicate_members_keep_lowest_sequence() {
        let mut records = vec![
            record(1, RecordKind::Member, "Foo#y"),
            record(2, RecordKind::Member, "Foo#y"),
            record(3, RecordKind::Member, "Foo#y"),
        ];
        resolve_duplicates(&mut records);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sequence, 1);
    }

    #[test]
    fn test_members_of_distinct_longnames_untouched() {
        let mut records = vec![
            record(1, RecordKind::Member, "Foo#a"),
            record(2, RecordKind::Member, "Foo#b"),
        ];
        resolve_duplicates(&mut records);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_non_member_kinds_never_removed() {
        let mut records = vec![
            record(1, RecordKind::Method, "Foo#x"),
            record(2, RecordKind::Method, "Foo#x"),
            record(3, RecordKind::Class, "Foo"),
            record(4, RecordKind::Index, "README.md"),
        ];
        resolve_duplicates(&mut records);
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn test_survivor_order_unchanged() {
        let mut records = vec![
            record(0, RecordKind::Class, "Foo"),
            record(1, RecordKind::Member, "Foo#x"),
            record(2, RecordKind::Variable, "bar"),
            record(3, RecordKind::Method, "Foo#x"),
            record(4, RecordKind::Member, "Foo#z"),
        ];
        resolve_duplicates(&mut records);
        let sequences: Vec<u64> = records.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 2, 3, 4]);
    }
}
