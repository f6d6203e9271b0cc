//! Data-quality diagnostics
//!
//! Issues are advisory. They describe suspicious keys and primary-locale
//! values and are returned as data; nothing here fails.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::hash::EMPTY_STRING_FNV32;
use crate::table::{EntryId, LocalizedStringTable};

/// Longest value excerpt shown in a repeated-string message
const MAX_EXCERPT_CHARS: usize = 20;

/// Category of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    /// More than one entry uses the same key.
    RepeatedKey,
    /// The key is zero.
    ZeroKey,
    /// The key equals the FNV-32 hash of an empty string.
    EmptyStringHashKey,
    /// More than one entry has the same primary value.
    RepeatedString,
    /// The primary value is empty.
    EmptyString,
}

/// A diagnostic about one or more entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// Entries involved, in table order.
    pub id_list: Vec<EntryId>,
    /// Distinct keys of the involved entries, in table order.
    pub key_list: Vec<u32>,
    pub message: String,
}

impl LocalizedStringTable {
    /// Scan keys and primary-locale values for problems.
    ///
    /// Key issues are reported first (in order of first occurrence), then
    /// value issues.
    #[must_use]
    pub fn get_issues(&self) -> Vec<Issue> {
        let primary = self.primary_locale();
        let mut key_map: IndexMap<u32, Vec<EntryId>> = IndexMap::new();
        let mut value_map: IndexMap<&str, Vec<EntryId>> = IndexMap::new();

        for entry in self.entries() {
            key_map.entry(entry.key()).or_default().push(entry.id());
            value_map
                .entry(entry.value(primary).unwrap_or(""))
                .or_default()
                .push(entry.id());
        }

        let mut issues = Vec::new();

        for (&key, ids) in &key_map {
            if ids.len() > 1 {
                issues.push(Issue {
                    kind: IssueKind::RepeatedKey,
                    id_list: ids.clone(),
                    key_list: vec![key],
                    message: format!("Repeated key: 0x{key:08X}"),
                });
            }

            if key == 0 {
                issues.push(Issue {
                    kind: IssueKind::ZeroKey,
                    id_list: ids.clone(),
                    key_list: vec![key],
                    message: "Key is 0x00000000".to_string(),
                });
            } else if key == EMPTY_STRING_FNV32 {
                issues.push(Issue {
                    kind: IssueKind::EmptyStringHashKey,
                    id_list: ids.clone(),
                    key_list: vec![key],
                    message: format!(
                        "Key is the FNV-32 hash of an empty string (0x{EMPTY_STRING_FNV32:08X})"
                    ),
                });
            }
        }

        for (value, ids) in &value_map {
            let (kind, message) = if value.is_empty() {
                (IssueKind::EmptyString, "Empty string value".to_string())
            } else if ids.len() > 1 {
                (
                    IssueKind::RepeatedString,
                    format!("Repeated string: \"{}\"", excerpt(value)),
                )
            } else {
                continue;
            };

            issues.push(Issue {
                kind,
                id_list: ids.clone(),
                key_list: self.distinct_keys(ids),
                message,
            });
        }

        issues
    }

    fn distinct_keys(&self, ids: &[EntryId]) -> Vec<u32> {
        ids.iter()
            .filter_map(|&id| self.get_entry(id).map(crate::table::Entry::key))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }
}

fn excerpt(value: &str) -> String {
    match value.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::EntryData;
    use pretty_assertions::assert_eq;

    const ENGLISH: u8 = 0;

    fn table(rows: &[(u32, &str)]) -> LocalizedStringTable {
        LocalizedStringTable::new(
            ENGLISH,
            [],
            rows.iter()
                .map(|&(key, value)| EntryData::new(key, [(ENGLISH, value.to_string())])),
        )
    }

    #[test]
    fn test_clean_table_has_no_issues() {
        let stbl = table(&[(0x1111, "A"), (0x2222, "B")]);
        assert!(stbl.get_issues().is_empty());
    }

    #[test]
    fn test_repeated_key() {
        let stbl = table(&[(0x1111, "A"), (0x1111, "B")]);
        assert_eq!(
            stbl.get_issues(),
            vec![Issue {
                kind: IssueKind::RepeatedKey,
                id_list: vec![0, 1],
                key_list: vec![0x1111],
                message: "Repeated key: 0x00001111".to_string(),
            }]
        );
    }

    #[test]
    fn test_zero_key() {
        let issues = table(&[(0, "A")]).get_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::ZeroKey);
        assert_eq!(issues[0].message, "Key is 0x00000000");
        assert_eq!(issues[0].id_list, vec![0]);
    }

    #[test]
    fn test_empty_string_hash_key() {
        let issues = table(&[(0x811C9DC5, "A")]).get_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::EmptyStringHashKey);
        assert!(issues[0].message.contains("0x811C9DC5"));
    }

    #[test]
    fn test_repeated_string_lists_distinct_keys() {
        let stbl = table(&[(0x1, "same"), (0x2, "other"), (0x1, "same"), (0x3, "same")]);
        let issues = stbl.get_issues();
        let repeated: Vec<_> = issues
            .iter()
            .filter(|issue| issue.kind == IssueKind::RepeatedString)
            .collect();

        assert_eq!(repeated.len(), 1);
        assert_eq!(repeated[0].message, "Repeated string: \"same\"");
        assert_eq!(repeated[0].id_list, vec![0, 2, 3]);
        assert_eq!(repeated[0].key_list, vec![0x1, 0x3]);
    }

    #[test]
    fn test_repeated_string_is_truncated() {
        let long = "abcdefghijklmnopqrstuvwxyz";
        let issues = table(&[(0x1, long), (0x2, long)]).get_issues();
        assert_eq!(
            issues[0].message,
            "Repeated string: \"abcdefghijklmnopqrst...\""
        );
    }

    #[test]
    fn test_empty_string_value() {
        let issues = table(&[(0x1, ""), (0x2, "")]).get_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::EmptyString);
        assert_eq!(issues[0].message, "Empty string value");
        assert_eq!(issues[0].id_list, vec![0, 1]);
    }

    #[test]
    fn test_only_primary_values_are_checked() {
        let mut stbl = LocalizedStringTable::new(ENGLISH, [1], []);
        stbl.add_entry(0x1, "One");
        stbl.add_entry(0x2, "Two");
        stbl.set_value(0, "Same", 1).unwrap();
        stbl.set_value(1, "Same", 1).unwrap();
        assert!(stbl.get_issues().is_empty());
    }
}
