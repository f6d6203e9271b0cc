//! Import resolution
//!
//! Uploaded files each yield one or more single-locale tables. Resolution
//! folds them into one [`LocalizedStringTable`]:
//!
//! 1. Tables are grouped by locale; the primary locale always gets a group.
//! 2. Each group's rows are deduplicated per `(key, value)`. The same key
//!    with different values stays as separate rows.
//! 3. Keys that only appear in other locales get an empty primary row.
//! 4. Primary rows become entries, in order.
//! 5. Non-empty values of other locales are attached to the first entry with
//!    their key when they differ from its primary text.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::locale::Locale;
use crate::table::{EntryData, LocalizedStringTable, StringRow};

/// A single-locale table parsed from one uploaded file or resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTable {
    pub locale: Locale,
    /// Instance ID with the locale byte cleared (0 when unknown).
    pub instance_base: u64,
    pub rows: Vec<StringRow>,
}

impl ParsedTable {
    pub fn new(locale: Locale, rows: Vec<StringRow>) -> Self {
        Self {
            locale,
            instance_base: 0,
            rows,
        }
    }
}

/// Combine parsed tables into one table with `primary_locale` as primary.
#[must_use]
pub fn resolve_string_tables(
    primary_locale: Locale,
    tables: &[ParsedTable],
) -> LocalizedStringTable {
    let mut locale_map: IndexMap<Locale, Vec<&ParsedTable>> = IndexMap::new();
    for table in tables {
        locale_map.entry(table.locale).or_default().push(table);
    }
    locale_map.entry(primary_locale).or_default();

    // Deduplicate rows per locale, noting which keys each side has seen
    let mut primary_keys: IndexSet<u32> = IndexSet::new();
    let mut other_keys: IndexSet<u32> = IndexSet::new();
    let mut resolved: IndexMap<Locale, Vec<StringRow>> = IndexMap::new();

    for (&locale, group) in &locale_map {
        let mut values_by_key: IndexMap<u32, IndexSet<&str>> = IndexMap::new();

        for row in group.iter().flat_map(|table| &table.rows) {
            values_by_key.entry(row.key).or_default().insert(&row.value);
            if locale == primary_locale {
                primary_keys.insert(row.key);
            } else {
                other_keys.insert(row.key);
            }
        }

        let rows = values_by_key
            .into_iter()
            .flat_map(|(key, values)| values.into_iter().map(move |value| StringRow::new(key, value)))
            .collect();
        resolved.insert(locale, rows);
    }

    let mut primary_rows = resolved.shift_remove(&primary_locale).unwrap_or_default();
    let synthesized = other_keys.difference(&primary_keys).count();
    primary_rows.extend(
        other_keys
            .difference(&primary_keys)
            .map(|&key| StringRow::new(key, "")),
    );

    // First occurrence wins when the primary locale repeats a key
    let mut key_indices: HashMap<u32, usize> = HashMap::with_capacity(primary_rows.len());
    let mut entries: Vec<EntryData> = Vec::with_capacity(primary_rows.len());
    for (index, StringRow { key, value }) in primary_rows.into_iter().enumerate() {
        key_indices.entry(key).or_insert(index);
        entries.push(EntryData::new(key, [(primary_locale, value)]));
    }

    for (&locale, rows) in &resolved {
        for row in rows.iter().filter(|row| !row.value.is_empty()) {
            let Some(&index) = key_indices.get(&row.key) else {
                continue;
            };
            let entry = &mut entries[index];
            if entry.values.get(&primary_locale) == Some(&row.value) {
                continue;
            }
            entry.values.insert(locale, row.value.clone());
        }
    }

    tracing::info!(
        files = tables.len(),
        locales = locale_map.len(),
        entries = entries.len(),
        synthesized,
        "Resolved string tables"
    );

    LocalizedStringTable::new(primary_locale, locale_map.keys().copied(), entries)
}
