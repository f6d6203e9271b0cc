//! Projects and their metadata
//!
//! A project pairs a string table with the metadata needed to list it
//! without decoding the table. Metadata layout (little-endian):
//!
//! ```text
//! u8  version
//! u32 group
//! u64 instance (locale in the high byte)
//! u8  number of locales
//! u32 number of entries
//! NUL-terminated UTF-8 name
//! ```

use std::io::{BufRead, Cursor, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use stblcore::locale::{Locale, instance_base, locale_of_instance, set_high_byte};
use stblcore::LocalizedStringTable;

use crate::error::{Error, Result};

/// Current metadata format version.
pub const META_DATA_VERSION: u8 = 0;

/// Group used for string tables created by this tool
pub const DEFAULT_GROUP: u32 = 0x8000_0000;

/// Listing information about a project.
///
/// Counts and the primary locale are a snapshot for display; the string
/// table is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetaData {
    pub group: u32,
    /// Instance with the locale byte cleared
    pub instance: u64,
    pub name: String,
    pub num_entries: u32,
    pub num_locales: u8,
    pub primary_locale: Locale,
}

impl ProjectMetaData {
    /// Encode as base64 text.
    pub fn serialize(&self) -> Result<String> {
        if self.name.contains('\0') {
            return Err(Error::InvalidMetadata(
                "project name contains a NUL character".to_string(),
            ));
        }

        // version, numLocales: 1 byte each; group, numEntries: 4 bytes each;
        // instance: 8 bytes; name terminator: 1 byte
        let mut writer = Vec::with_capacity(19 + self.name.len());
        writer.write_u8(META_DATA_VERSION)?;
        writer.write_u32::<LittleEndian>(self.group)?;
        writer.write_u64::<LittleEndian>(set_high_byte(self.primary_locale, self.instance))?;
        writer.write_u8(self.num_locales)?;
        writer.write_u32::<LittleEndian>(self.num_entries)?;
        writer.write_all(self.name.as_bytes())?;
        writer.write_u8(0)?;

        Ok(STANDARD.encode(writer))
    }

    /// Decode from base64 text.
    pub fn deserialize(data: &str) -> Result<Self> {
        let bytes = STANDARD.decode(data.trim())?;
        let mut cursor = Cursor::new(bytes.as_slice());

        let read_err = |field: &str| Error::InvalidMetadata(format!("truncated {field}"));

        // Version is unused for now
        cursor.read_u8().map_err(|_| read_err("version"))?;
        let group = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| read_err("group"))?;
        let full_instance = cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| read_err("instance"))?;
        let num_locales = cursor.read_u8().map_err(|_| read_err("locale count"))?;
        let num_entries = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| read_err("entry count"))?;

        let mut name = Vec::new();
        cursor.read_until(0, &mut name)?;
        if name.last() == Some(&0) {
            name.pop();
        }
        let name = String::from_utf8(name)
            .map_err(|err| Error::InvalidMetadata(format!("project name is not UTF-8: {err}")))?;

        Ok(Self {
            group,
            instance: instance_base(full_instance),
            name,
            num_entries,
            num_locales,
            primary_locale: locale_of_instance(full_instance),
        })
    }
}

/// A named string table project.
#[derive(Debug, Clone)]
pub struct Project {
    uuid: String,
    meta: ProjectMetaData,
    stbl: Option<LocalizedStringTable>,
}

impl Project {
    /// Create a project with a fresh UUID around `stbl`.
    pub fn create(name: impl Into<String>, group: u32, instance: u64, stbl: LocalizedStringTable) -> Self {
        let mut project = Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            meta: ProjectMetaData {
                group,
                instance: instance_base(instance),
                name: name.into(),
                num_entries: 0,
                num_locales: 0,
                primary_locale: stbl.primary_locale(),
            },
            stbl: Some(stbl),
        };
        project.refresh_meta();
        project
    }

    /// A project whose string table has not been loaded yet.
    pub fn unloaded(uuid: impl Into<String>, meta: ProjectMetaData) -> Self {
        Self {
            uuid: uuid.into(),
            meta,
            stbl: None,
        }
    }

    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    #[must_use]
    pub fn meta(&self) -> &ProjectMetaData {
        &self.meta
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.meta.name = name.into();
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.stbl.is_some()
    }

    pub fn stbl(&self) -> Result<&LocalizedStringTable> {
        self.stbl.as_ref().ok_or_else(|| Error::ProjectNotLoaded {
            uuid: self.uuid.clone(),
        })
    }

    pub fn stbl_mut(&mut self) -> Result<&mut LocalizedStringTable> {
        let uuid = &self.uuid;
        self.stbl.as_mut().ok_or_else(|| Error::ProjectNotLoaded { uuid: uuid.clone() })
    }

    /// Attach a loaded table and resync the metadata snapshot.
    pub fn set_stbl(&mut self, stbl: LocalizedStringTable) {
        self.stbl = Some(stbl);
        self.refresh_meta();
    }

    /// Copy counts and primary locale from the table into the metadata.
    pub fn refresh_meta(&mut self) {
        if let Some(stbl) = &self.stbl {
            self.meta.num_entries = stbl.num_entries() as u32;
            self.meta.num_locales = stbl.num_locales() as u8;
            self.meta.primary_locale = stbl.primary_locale();
        }
    }
}
