//! Binary string table codec
//!
//! Layout (little-endian):
//!
//! ```text
//! u8  version              (FORMAT_VERSION)
//! u8  primary locale
//! u8  number of locales
//! u32 number of entries
//! [locale: u8, has_data: u8] * number of locales
//! [key: u32] * number of entries              (entry order)
//! for each locale with has_data == 1, in header order:
//!     [NUL-terminated UTF-8 string] * number of entries
//! ```
//!
//! There is no index table: rows line up purely by order, so decoding
//! replays the same passes as encoding. An empty string decodes to "no
//! value", which reads back through fallback as the primary text.

use std::io::{BufRead, Cursor, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::locale::Locale;
use crate::table::{EntryData, LocalizedStringTable};

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 0;

/// Size of the fixed header in bytes
const HEADER_SIZE: usize = 7;

/// Encode a table to its binary form.
pub fn encode_table(table: &LocalizedStringTable) -> Result<Vec<u8>> {
    let locales = table.all_locales();
    let num_locales = u8::try_from(locales.len()).map_err(|_| Error::TooManyLocales {
        count: locales.len(),
    })?;
    let num_entries = table.num_entries() as u32;

    let has_data: Vec<bool> = locales
        .iter()
        .map(|locale| table.entries().any(|entry| entry.values().contains_key(locale)))
        .collect();

    let mut writer = Vec::with_capacity(HEADER_SIZE + locales.len() * 2 + table.num_entries() * 4);

    // Header
    writer.write_u8(FORMAT_VERSION)?;
    writer.write_u8(table.primary_locale())?;
    writer.write_u8(num_locales)?;
    writer.write_u32::<LittleEndian>(num_entries)?;

    // Locale flags
    for (&locale, &flag) in locales.iter().zip(&has_data) {
        writer.write_u8(locale)?;
        writer.write_u8(u8::from(flag))?;
    }

    // Keys
    for entry in table.entries() {
        writer.write_u32::<LittleEndian>(entry.key())?;
    }

    // String blocks
    for (&locale, _) in locales.iter().zip(&has_data).filter(|(_, flag)| **flag) {
        for entry in table.entries() {
            let value = entry.value(locale).unwrap_or("");
            if value.contains('\0') {
                return Err(Error::NulInValue {
                    id: entry.id(),
                    locale,
                });
            }
            writer.write_all(value.as_bytes())?;
            writer.write_u8(0)?;
        }
    }

    tracing::debug!(
        entries = num_entries,
        locales = num_locales,
        bytes = writer.len(),
        "Encoded string table"
    );
    Ok(writer)
}

/// Decode a table from its binary form.
///
/// Entry IDs are assigned fresh, in stored order. Missing primary values are
/// not filled in.
pub fn decode_table(data: &[u8]) -> Result<LocalizedStringTable> {
    let mut cursor = Cursor::new(data);

    let version = cursor.read_u8().map_err(|_| truncated("version"))?;
    if version > FORMAT_VERSION {
        tracing::warn!(version, "String table written by a newer format version");
    }

    let primary_locale = cursor.read_u8().map_err(|_| truncated("primary locale"))?;
    let num_locales = cursor.read_u8().map_err(|_| truncated("locale count"))?;
    let num_entries = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| truncated("entry count"))? as usize;

    let remaining = data.len().saturating_sub(HEADER_SIZE);
    let required = (usize::from(num_locales) * 2).saturating_add(num_entries.saturating_mul(4));
    if required > remaining {
        return Err(Error::malformed(format!(
            "header declares {num_locales} locales and {num_entries} entries, \
             but only {remaining} bytes follow"
        )));
    }

    let mut locales: Vec<(Locale, bool)> = Vec::with_capacity(usize::from(num_locales));
    for _ in 0..num_locales {
        let locale = cursor.read_u8().map_err(|_| truncated("locale table"))?;
        let has_data = cursor.read_u8().map_err(|_| truncated("locale table"))? != 0;
        locales.push((locale, has_data));
    }

    let mut entries = Vec::with_capacity(num_entries);
    for _ in 0..num_entries {
        let key = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| truncated("key table"))?;
        entries.push(EntryData {
            key,
            ..EntryData::default()
        });
    }

    for &(locale, _) in locales.iter().filter(|(_, has_data)| *has_data) {
        for entry in &mut entries {
            let value = read_cstring(&mut cursor, locale)?;
            if !value.is_empty() {
                entry.values.insert(locale, value);
            }
        }
    }

    let trailing = data.len() - cursor.position() as usize;
    if trailing > 0 {
        tracing::debug!(trailing, "Ignoring trailing bytes after string table");
    }

    Ok(LocalizedStringTable::new(
        primary_locale,
        locales.into_iter().map(|(locale, _)| locale),
        entries,
    ))
}

fn truncated(section: &str) -> Error {
    Error::malformed(format!("unexpected end of data in {section}"))
}

fn read_cstring(cursor: &mut Cursor<&[u8]>, locale: Locale) -> Result<String> {
    let mut bytes = Vec::new();
    cursor.read_until(0, &mut bytes)?;
    if bytes.pop() != Some(0) {
        return Err(Error::malformed(format!(
            "unterminated string in block for locale {locale}"
        )));
    }
    String::from_utf8(bytes)
        .map_err(|err| Error::malformed(format!("invalid UTF-8 for locale {locale}: {err}")))
}

impl LocalizedStringTable {
    /// Encode this table and wrap it in base64.
    pub fn serialize(&self) -> Result<String> {
        Ok(STANDARD.encode(encode_table(self)?))
    }

    /// Inverse of [`LocalizedStringTable::serialize`].
    pub fn deserialize(data: &str) -> Result<Self> {
        let bytes = STANDARD.decode(data.trim())?;
        decode_table(&bytes)
    }
}
