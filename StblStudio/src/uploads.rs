//! Upload parsing
//!
//! Turns user supplied files into single-locale [`ParsedTable`]s and feeds
//! them to the resolver. Supported formats, chosen by extension:
//!
//! - `json` - array of `{ key, value }` rows; keys may be numbers or hex
//!   strings and the value may also be named `string`
//! - `txt` - one string per non-blank line, each given a fresh key
//! - `csv` - one column per locale (numeric locale ids in the header)
//! - anything else - a binary resource decoded by a [`ResourceContainer`]
//!
//! Failures are collected per file so one bad upload does not sink the batch.

use std::sync::OnceLock;

use indexmap::IndexSet;
use regex::Regex;
use serde_json::Value;
use stblcore::container::ResourceContainer;
use stblcore::hash::fnv32;
use stblcore::locale::{Locale, instance_base, locale_of_instance};
use stblcore::resolver::{ParsedTable, resolve_string_tables};
use stblcore::{LocalizedStringTable, StringRow};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// A file handed in by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// A file that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub filename: String,
    pub message: String,
}

/// Everything parsed from a batch of uploads.
#[derive(Debug, Clone, Default)]
pub struct ParsedFilesResult {
    pub errors: Vec<ParseFailure>,
    pub tables: Vec<ParsedTable>,
    /// Distinct instance bases, in order of first appearance
    pub instances: IndexSet<u64>,
    /// Distinct locales, in order of first appearance
    pub locales: IndexSet<Locale>,
}

/// Parse every file, collecting failures instead of stopping.
pub fn parse_files(
    files: &[UploadedFile],
    settings: &Settings,
    container: Option<&dyn ResourceContainer>,
) -> ParsedFilesResult {
    let mut result = ParsedFilesResult::default();

    for file in files {
        let parsed = parse_file(file, settings.default_locale(), container).and_then(|tables| {
            if tables.is_empty() {
                Err(Error::Upload("No string tables found.".to_string()))
            } else {
                Ok(tables)
            }
        });

        match parsed {
            Ok(tables) => result.tables.extend(tables),
            Err(err) => {
                tracing::warn!(file = %file.name, %err, "Error while reading upload");
                result.errors.push(ParseFailure {
                    filename: file.name.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    for table in &result.tables {
        result.locales.insert(table.locale);
        result.instances.insert(table.instance_base);
    }

    tracing::debug!(
        tables = result.tables.len(),
        errors = result.errors.len(),
        "Parsed uploads"
    );
    result
}

/// Parse `files` and resolve them into one table.
pub fn import_files(
    primary_locale: Locale,
    files: &[UploadedFile],
    settings: &Settings,
    container: Option<&dyn ResourceContainer>,
) -> (LocalizedStringTable, Vec<ParseFailure>) {
    let parsed = parse_files(files, settings, container);
    let stbl = resolve_string_tables(primary_locale, &parsed.tables);
    (stbl, parsed.errors)
}

fn parse_file(
    file: &UploadedFile,
    default_locale: Locale,
    container: Option<&dyn ResourceContainer>,
) -> Result<Vec<ParsedTable>> {
    let extension = file
        .name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "package" => Err(Error::Upload(
            "Package files are not supported; extract the string tables first.".to_string(),
        )),
        "txt" => Ok(vec![parse_plain_text(&file.data, default_locale)?]),
        "csv" => parse_csv(&file.data),
        _ => {
            let (locale, instance_base) = locale_from_filename(&file.name, default_locale);
            let rows = if extension == "json" {
                normalize_json(&file.data)?
            } else {
                let container = container.ok_or_else(|| {
                    Error::Upload(format!("No container available to read '.{extension}' files."))
                })?;
                container.parse_buffer(&file.data)?
            };
            Ok(vec![ParsedTable {
                locale,
                instance_base,
                rows,
            }])
        }
    }
}

// ============================================================================
// Resource keys
// ============================================================================

fn resource_key_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| {
            Regex::new(r"([a-fA-F0-9]{8})[_!]?([a-fA-F0-9]{8})[_!]?([a-fA-F0-9]{16})").ok()
        })
        .as_ref()
}

/// Locale and instance base from an S4S/S4PI style file name, or the
/// default locale with instance 0.
fn locale_from_filename(filename: &str, default_locale: Locale) -> (Locale, u64) {
    let instance = resource_key_regex()
        .and_then(|regex| regex.captures(filename))
        .and_then(|caps| caps.get(3))
        .and_then(|m| u64::from_str_radix(m.as_str(), 16).ok());

    match instance {
        Some(instance) => (locale_of_instance(instance), instance_base(instance)),
        None => (default_locale, 0),
    }
}

fn fresh_key() -> u32 {
    fnv32(&Uuid::new_v4().to_string())
}

// ============================================================================
// JSON
// ============================================================================

/// Parse loosely formatted JSON rows.
///
/// Property names are matched case-insensitively. String keys are read as
/// hexadecimal, with or without a `0x` prefix.
fn normalize_json(data: &[u8]) -> Result<Vec<StringRow>> {
    let json: Value = serde_json::from_slice(data)?;
    let Value::Array(items) = json else {
        return Err(Error::Upload("String table JSON must be an array.".to_string()));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mut key = None;
            let mut value = None;

            if let Value::Object(props) = item {
                for (prop, prop_value) in props {
                    match prop.to_ascii_lowercase().as_str() {
                        "key" => key = Some(json_key(prop_value, index)?),
                        "value" | "string" => value = prop_value.as_str(),
                        _ => {}
                    }
                }
            }

            let key = key.ok_or_else(|| {
                Error::Upload(format!("Entry at index {index} does not have a key."))
            })?;
            let value = value.ok_or_else(|| {
                Error::Upload(format!("Entry at index {index} does not have a string value."))
            })?;
            Ok(StringRow::new(key, value))
        })
        .collect()
}

fn json_key(value: &Value, index: usize) -> Result<u32> {
    let out_of_bounds =
        || Error::Upload(format!("Key of entry at index {index} is out of bounds ({value})."));

    let wide = match value {
        Value::String(text) => {
            let digits = text.trim();
            let digits = digits
                .strip_prefix("0x")
                .or_else(|| digits.strip_prefix("0X"))
                .unwrap_or(digits);
            u64::from_str_radix(digits, 16).map_err(|_| {
                Error::Upload(format!("Key of entry at index {index} is not hexadecimal ({text})."))
            })?
        }
        Value::Number(number) => number.as_u64().ok_or_else(out_of_bounds)?,
        _ => return Err(Error::Upload(format!("Entry at index {index} does not have a key."))),
    };

    u32::try_from(wide).map_err(|_| out_of_bounds())
}

// ============================================================================
// Plain text
// ============================================================================

fn parse_plain_text(data: &[u8], locale: Locale) -> Result<ParsedTable> {
    let text = decode_utf8(data)?;
    let rows = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(|line| StringRow::new(fresh_key(), line))
        .collect();

    Ok(ParsedTable::new(locale, rows))
}

// ============================================================================
// CSV
// ============================================================================

/// One table per column. Every data row gets a fresh key shared by all of
/// its columns; missing cells are read as empty strings.
fn parse_csv(data: &[u8]) -> Result<Vec<ParsedTable>> {
    let text = decode_utf8(data)?;
    let mut records = read_csv_records(text).into_iter();

    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };

    let locales = header
        .iter()
        .map(|name| name.trim().parse::<Locale>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::Upload("Unrecognized locale name found in CSV.".to_string()))?;

    let mut tables: Vec<ParsedTable> = locales
        .iter()
        .map(|&locale| ParsedTable::new(locale, Vec::new()))
        .collect();

    for record in records {
        let key = fresh_key();
        for (column, table) in tables.iter_mut().enumerate() {
            let value = record.get(column).cloned().unwrap_or_default();
            table.rows.push(StringRow::new(key, value));
        }
    }

    Ok(tables)
}

/// Split CSV text into records.
///
/// Quoted fields may contain commas, newlines and doubled quotes. Lines
/// starting with `#` and blank lines are skipped.
fn read_csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut at_line_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if at_line_start && !in_quotes {
            at_line_start = false;
            if c == '#' {
                while chars.next_if(|&next| next != '\n').is_some() {}
                chars.next();
                at_line_start = true;
                continue;
            }
        }

        match c {
            '"' if in_quotes => {
                if chars.next_if_eq(&'"').is_some() {
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => record.push(std::mem::take(&mut field)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
                at_line_start = true;
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }

    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.iter().all(|field| field.trim().is_empty());
    if !blank {
        records.push(record);
    }
}

fn decode_utf8(data: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(data)
        .map_err(|err| Error::Upload(format!("File is not valid UTF-8: {err}")))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}
