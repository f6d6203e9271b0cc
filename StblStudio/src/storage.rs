//! Project persistence
//!
//! Projects are written to a key/value store as two records: the metadata
//! under `metadata/<uuid>` and the serialized table under `stbls/<uuid>`.
//!
//! Writes are staged and committed separately so a caller can hand the
//! commit to a background queue. Every staged write carries a version from a
//! single counter; committing a write older than the last one applied to the
//! same key is refused, so out-of-order completion can never overwrite newer
//! data.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use stblcore::LocalizedStringTable;

use crate::error::{Error, Result};
use crate::project::{Project, ProjectMetaData};

const METADATA_PREFIX: &str = "metadata";
const STBLS_PREFIX: &str = "stbls";

/// Minimal key/value storage backend.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
}

/// Store backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.records.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.records.remove(key);
        Ok(())
    }
}

/// Store keeping one file per key below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|segment| !segment.is_empty() && *segment != "..")
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl KeyValueStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// A write that has been versioned but not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub key: String,
    pub version: u64,
    /// `None` deletes the record.
    pub value: Option<String>,
}

/// Versioned project persistence over a [`KeyValueStore`].
#[derive(Debug)]
pub struct ProjectStore<S> {
    store: S,
    next_version: u64,
    applied: HashMap<String, u64>,
}

impl<S: KeyValueStore> ProjectStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            next_version: 1,
            applied: HashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    // ==================== Staging ====================

    /// Version a write of `value` to `key` without applying it.
    pub fn stage(&mut self, key: impl Into<String>, value: Option<String>) -> PendingWrite {
        let version = self.next_version;
        self.next_version += 1;
        PendingWrite {
            key: key.into(),
            version,
            value,
        }
    }

    /// Stage the metadata and table records of `project`.
    ///
    /// The metadata snapshot is refreshed from the table first.
    pub fn stage_project(&mut self, project: &mut Project) -> Result<Vec<PendingWrite>> {
        project.refresh_meta();
        let meta = project.meta().serialize()?;
        let stbl = project.stbl()?.serialize()?;
        Ok(vec![
            self.stage(metadata_key(project.uuid()), Some(meta)),
            self.stage(stbl_key(project.uuid()), Some(stbl)),
        ])
    }

    /// Stage the metadata record only.
    pub fn stage_metadata(&mut self, project: &Project) -> Result<PendingWrite> {
        let meta = project.meta().serialize()?;
        Ok(self.stage(metadata_key(project.uuid()), Some(meta)))
    }

    // ==================== Committing ====================

    /// Apply a staged write unless a newer one for the same key already
    /// landed.
    pub fn commit(&mut self, write: PendingWrite) -> Result<()> {
        if let Some(&applied) = self.applied.get(&write.key) {
            if write.version <= applied {
                tracing::warn!(
                    key = %write.key,
                    version = write.version,
                    applied,
                    "Dropping stale write"
                );
                return Err(Error::StaleWrite {
                    key: write.key,
                    version: write.version,
                    applied,
                });
            }
        }

        match write.value {
            Some(value) => self.store.set(&write.key, value)?,
            None => self.store.delete(&write.key)?,
        }
        self.applied.insert(write.key, write.version);
        Ok(())
    }

    /// Commit several writes in order, stopping at the first failure.
    pub fn commit_all(&mut self, writes: Vec<PendingWrite>) -> Result<()> {
        writes.into_iter().try_for_each(|write| self.commit(write))
    }

    // ==================== Convenience ====================

    /// Stage and immediately commit `project`.
    pub fn save_project(&mut self, project: &mut Project) -> Result<()> {
        let writes = self.stage_project(project)?;
        self.commit_all(writes)
    }

    /// Load a project's metadata, leaving its table unloaded.
    pub fn load_metadata(&self, uuid: &str) -> Result<Project> {
        let key = metadata_key(uuid);
        let data = self.store.get(&key)?.ok_or(Error::MissingRecord(key))?;
        Ok(Project::unloaded(uuid, ProjectMetaData::deserialize(&data)?))
    }

    /// Load the table of `project` if it is not loaded yet.
    pub fn load_stbl(&self, project: &mut Project) -> Result<()> {
        if project.is_loaded() {
            return Ok(());
        }
        let key = stbl_key(project.uuid());
        let data = self.store.get(&key)?.ok_or(Error::MissingRecord(key))?;
        project.set_stbl(LocalizedStringTable::deserialize(&data)?);
        Ok(())
    }

    /// Load metadata and table of a project.
    pub fn load_project(&self, uuid: &str) -> Result<Project> {
        let mut project = self.load_metadata(uuid)?;
        self.load_stbl(&mut project)?;
        Ok(project)
    }

    /// Delete both records of a project.
    pub fn delete_project(&mut self, uuid: &str) -> Result<()> {
        let writes = vec![
            self.stage(metadata_key(uuid), None),
            self.stage(stbl_key(uuid), None),
        ];
        self.commit_all(writes)
    }
}

fn metadata_key(uuid: &str) -> String {
    format!("{METADATA_PREFIX}/{uuid}")
}

fn stbl_key(uuid: &str) -> String {
    format!("{STBLS_PREFIX}/{uuid}")
}
