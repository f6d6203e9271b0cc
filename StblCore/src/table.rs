//! Multi-locale string table
//!
//! A [`LocalizedStringTable`] holds one row per localizable string. Every
//! entry stores its text for the primary locale; other locales are stored
//! only where they differ from that text ("diff-against-primary"), and fall
//! back to the primary text when read through
//! [`LocalizedStringTable::get_value_with_fallback`].
//!
//! Entry IDs are process-local handles. They are assigned in insertion order,
//! never reused, and never serialized.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::container::ResourceContainer;
use crate::error::{Error, Result};
use crate::locale::Locale;

/// Process-local handle of an entry.
pub type EntryId = u32;

/// A single key/value pair of a single-locale string table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StringRow {
    pub key: u32,
    pub value: String,
}

impl StringRow {
    pub fn new(key: u32, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Entry contents used to build a table; IDs are assigned by the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryData {
    pub key: u32,
    pub values: BTreeMap<Locale, String>,
}

impl EntryData {
    pub fn new(key: u32, values: impl IntoIterator<Item = (Locale, String)>) -> Self {
        Self {
            key,
            values: values.into_iter().collect(),
        }
    }
}

/// One localizable string: a key plus its stored per-locale values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    id: EntryId,
    key: u32,
    values: BTreeMap<Locale, String>,
}

impl Entry {
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> u32 {
        self.key
    }

    /// Explicitly stored values, including the primary locale's.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<Locale, String> {
        &self.values
    }

    /// Explicitly stored value for `locale`, without fallback.
    #[must_use]
    pub fn value(&self, locale: Locale) -> Option<&str> {
        self.values.get(&locale).map(String::as_str)
    }

    /// Drop non-primary values that are identical to the primary value.
    fn prune_redundant(&mut self, primary: Locale) {
        let Some(primary_value) = self.values.get(&primary).cloned() else {
            return;
        };
        self.values
            .retain(|&locale, value| locale == primary || *value != primary_value);
    }
}

/// A string table that contains data for multiple languages.
#[derive(Debug, Clone)]
pub struct LocalizedStringTable {
    primary_locale: Locale,
    all_locales: IndexSet<Locale>,
    entries: IndexMap<EntryId, Entry>,
    next_id: EntryId,
    locales_cache: OnceCell<Rc<[Locale]>>,
    entries_cache: OnceCell<Rc<[EntryId]>>,
}

impl LocalizedStringTable {
    // ==================== Construction ====================

    /// Create a table from a primary locale, its locale set and initial
    /// entries.
    ///
    /// The primary locale and every locale an entry has a value for are added
    /// to the locale set if missing. Entries get sequential IDs starting at 0
    /// and their values are taken as given.
    pub fn new(
        primary_locale: Locale,
        all_locales: impl IntoIterator<Item = Locale>,
        entries: impl IntoIterator<Item = EntryData>,
    ) -> Self {
        let mut all_locales: IndexSet<Locale> = all_locales.into_iter().collect();
        all_locales.insert(primary_locale);

        let mut table = Self {
            primary_locale,
            all_locales,
            entries: IndexMap::new(),
            next_id: 0,
            locales_cache: OnceCell::new(),
            entries_cache: OnceCell::new(),
        };

        for EntryData { key, values } in entries {
            table.all_locales.extend(values.keys().copied());
            table.push_entry(key, values);
        }

        table
    }

    /// Create an empty table whose only locale is `primary_locale`.
    #[must_use]
    pub fn with_primary(primary_locale: Locale) -> Self {
        Self::new(primary_locale, [], [])
    }

    // ==================== Accessors ====================

    #[must_use]
    pub fn primary_locale(&self) -> Locale {
        self.primary_locale
    }

    /// All locales of this table in registration order.
    ///
    /// Repeated calls return the same allocation until the locale set
    /// changes.
    #[must_use]
    pub fn all_locales(&self) -> Rc<[Locale]> {
        Rc::clone(
            self.locales_cache
                .get_or_init(|| self.all_locales.iter().copied().collect()),
        )
    }

    /// IDs of all entries in iteration order.
    ///
    /// Repeated calls return the same allocation until an entry is added,
    /// deleted, replaced or imported.
    #[must_use]
    pub fn entry_ids(&self) -> Rc<[EntryId]> {
        Rc::clone(
            self.entries_cache
                .get_or_init(|| self.entries.keys().copied().collect()),
        )
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn num_locales(&self) -> usize {
        self.all_locales.len()
    }

    #[must_use]
    pub fn has_locale(&self, locale: Locale) -> bool {
        self.all_locales.contains(&locale)
    }

    #[must_use]
    pub fn get_entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    #[must_use]
    pub fn has_entry(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Explicitly stored value of an entry, without fallback.
    ///
    /// `None` means the entry inherits from the primary locale (or that the
    /// entry or locale does not exist). Editors use this to tell overrides
    /// apart from inherited text.
    #[must_use]
    pub fn get_value(&self, id: EntryId, locale: Locale) -> Option<&str> {
        self.entries.get(&id).and_then(|entry| entry.value(locale))
    }

    #[must_use]
    pub fn get_primary_value(&self, id: EntryId) -> Option<&str> {
        self.get_value(id, self.primary_locale)
    }

    /// Value of an entry in `locale`, falling back to the primary locale and
    /// then to an empty string. Exports must read through this.
    #[must_use]
    pub fn get_value_with_fallback(&self, id: EntryId, locale: Locale) -> &str {
        self.get_value(id, locale)
            .or_else(|| self.get_primary_value(id))
            .unwrap_or("")
    }

    // ==================== Entry Mutation ====================

    /// Add an entry whose only value is `text` in the primary locale.
    pub fn add_entry(&mut self, key: u32, text: impl Into<String>) -> &Entry {
        let values = BTreeMap::from([(self.primary_locale, text.into())]);
        let id = self.push_entry(key, values);
        &self.entries[&id]
    }

    /// Remove an entry and return it.
    pub fn delete_entry(&mut self, id: EntryId) -> Result<Entry> {
        let entry = self
            .entries
            .shift_remove(&id)
            .ok_or(Error::EntryNotFound { id })?;
        self.invalidate_entries();
        Ok(entry)
    }

    /// Overwrite the key of an entry. Duplicate keys are allowed.
    pub fn set_key(&mut self, id: EntryId, key: u32) -> Result<()> {
        self.entry_mut(id)?.key = key;
        Ok(())
    }

    /// Set the text of an entry for `locale`.
    ///
    /// Writing to a non-primary locale the same text as the primary value
    /// removes the override instead of storing a copy.
    pub fn set_value(&mut self, id: EntryId, text: impl Into<String>, locale: Locale) -> Result<()> {
        if !self.has_locale(locale) {
            return Err(Error::UnknownLocale { locale });
        }

        let primary = self.primary_locale;
        let entry = self.entry_mut(id)?;
        let text = text.into();

        if locale == primary {
            entry.values.insert(locale, text);
            return Ok(());
        }

        // A missing primary value reads as empty, the same as through fallback
        if entry.value(primary).unwrap_or("") == text {
            entry.values.remove(&locale);
        } else {
            entry.values.insert(locale, text);
        }
        Ok(())
    }

    pub fn set_primary_value(&mut self, id: EntryId, text: impl Into<String>) -> Result<()> {
        self.set_value(id, text, self.primary_locale)
    }

    // ==================== Locale Mutation ====================

    /// Make `locale` the primary locale.
    ///
    /// The locale is registered if needed, and every entry without a value
    /// for it gets an empty placeholder. Values of the previous primary
    /// locale are kept as ordinary translations.
    pub fn set_primary_locale(&mut self, locale: Locale) {
        if locale == self.primary_locale {
            return;
        }

        if self.all_locales.insert(locale) {
            self.invalidate_locales();
        }

        let mut filled = 0usize;
        for entry in self.entries.values_mut() {
            if !entry.values.contains_key(&locale) {
                entry.values.insert(locale, String::new());
                filled += 1;
            }
        }

        tracing::debug!(
            from = self.primary_locale,
            to = locale,
            placeholders = filled,
            "Switched primary locale"
        );
        self.primary_locale = locale;
    }

    /// Replace the locale set.
    ///
    /// The primary locale is always kept. Values of removed locales are
    /// deleted from every entry; added locales start with no overrides.
    pub fn replace_locales(&mut self, locales: &[Locale]) {
        let mut target: IndexSet<Locale> = locales.iter().copied().collect();
        target.insert(self.primary_locale);

        let removed: Vec<Locale> = self
            .all_locales
            .iter()
            .copied()
            .filter(|locale| !target.contains(locale))
            .collect();

        if !removed.is_empty() {
            self.all_locales.retain(|locale| target.contains(locale));
            for entry in self.entries.values_mut() {
                entry.values.retain(|locale, _| !removed.contains(locale));
            }
        }

        for locale in target {
            self.all_locales.insert(locale);
        }

        self.invalidate_locales();
    }

    // ==================== Bulk Operations ====================

    /// Merge another table into this one.
    ///
    /// With `overwrite_keys`, a source entry whose key already exists here
    /// updates the first entry with that key (source values win per locale).
    /// Otherwise every source entry is appended as a new entry, even when
    /// its key collides.
    pub fn import_entries(&mut self, source: &LocalizedStringTable, overwrite_keys: bool) {
        let mut locales_changed = false;
        for &locale in &source.all_locales {
            locales_changed |= self.all_locales.insert(locale);
        }
        if locales_changed {
            self.invalidate_locales();
        }

        let mut key_map: IndexMap<u32, EntryId> = IndexMap::new();
        if overwrite_keys {
            for entry in self.entries.values() {
                key_map.entry(entry.key).or_insert(entry.id);
            }
        }

        let primary = self.primary_locale;
        let mut merged = 0usize;
        let mut added = 0usize;

        for source_entry in source.entries.values() {
            if let Some(existing) = key_map
                .get(&source_entry.key)
                .and_then(|id| self.entries.get_mut(id))
            {
                existing.values.extend(
                    source_entry
                        .values
                        .iter()
                        .map(|(&locale, value)| (locale, value.clone())),
                );
                existing.prune_redundant(primary);
                merged += 1;
            } else {
                let mut values = source_entry.values.clone();
                values.entry(primary).or_insert_with(|| {
                    source
                        .get_value_with_fallback(source_entry.id, primary)
                        .to_string()
                });
                let id = self.push_entry(source_entry.key, values);
                self.entries[&id].prune_redundant(primary);
                added += 1;
            }
        }

        tracing::debug!(merged, added, overwrite_keys, "Imported entries");
        self.invalidate_entries();
    }

    /// Import rows of a single-locale table.
    ///
    /// Rows for the primary locale are all added as new entries. Rows for
    /// another registered locale update the translation of the first entry
    /// with the same key, adding an entry (with the row's text as primary
    /// value) when the key is new.
    pub fn import_rows(&mut self, rows: &[StringRow], locale: Locale) -> Result<()> {
        if locale == self.primary_locale {
            for row in rows {
                self.push_entry(
                    row.key,
                    BTreeMap::from([(locale, row.value.clone())]),
                );
            }
        } else if !self.has_locale(locale) {
            return Err(Error::UnknownLocale { locale });
        } else {
            for row in rows {
                let existing = self
                    .entries
                    .values()
                    .find(|entry| entry.key == row.key)
                    .map(Entry::id);
                let id = match existing {
                    Some(id) => id,
                    None => self.push_entry(
                        row.key,
                        BTreeMap::from([(self.primary_locale, row.value.clone())]),
                    ),
                };
                self.set_value(id, row.value.clone(), locale)?;
            }
        }

        self.invalidate_entries();
        Ok(())
    }

    /// Replace the primary-locale contents with `rows`.
    ///
    /// Entries whose key appears in `rows` get the new primary text (their
    /// translations are kept), entries whose key is absent are deleted, and
    /// new keys become new entries.
    pub fn replace_entries(&mut self, rows: &[StringRow]) {
        let mut new_entries: IndexMap<u32, &str> = IndexMap::new();
        for row in rows {
            new_entries.insert(row.key, &row.value);
        }

        let primary = self.primary_locale;
        let mut updated = 0usize;
        let mut deleted = 0usize;
        self.entries.retain(|_, entry| {
            if let Some(value) = new_entries.shift_remove(&entry.key) {
                entry.values.insert(primary, value.to_string());
                updated += 1;
                true
            } else {
                deleted += 1;
                false
            }
        });

        let added = new_entries.len();
        for (key, value) in new_entries {
            self.push_entry(key, BTreeMap::from([(primary, value.to_string())]));
        }

        tracing::debug!(updated, deleted, added, "Replaced entries");
        self.invalidate_entries();
    }

    // ==================== Export ====================

    /// Rows for `locale` in entry order, read with fallback.
    #[must_use]
    pub fn get_json(&self, locale: Locale) -> Vec<StringRow> {
        self.entries
            .values()
            .map(|entry| StringRow::new(entry.key, self.get_value_with_fallback(entry.id, locale)))
            .collect()
    }

    /// Pretty-printed JSON array of `{ "key", "value" }` rows for `locale`.
    pub fn to_json_string(&self, locale: Locale) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.get_json(locale))?)
    }

    /// Build the single-locale resource for `locale` through `container`.
    pub fn to_resource(&self, locale: Locale, container: &impl ResourceContainer) -> Result<Vec<u8>> {
        container.build_buffer(&self.get_json(locale))
    }

    // ==================== Internals ====================

    fn push_entry(&mut self, key: u32, values: BTreeMap<Locale, String>) -> EntryId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, Entry { id, key, values });
        self.invalidate_entries();
        id
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut Entry> {
        self.entries.get_mut(&id).ok_or(Error::EntryNotFound { id })
    }

    fn invalidate_entries(&mut self) {
        self.entries_cache.take();
    }

    fn invalidate_locales(&mut self) {
        self.locales_cache.take();
    }
}
