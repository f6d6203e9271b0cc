//! Error types for `StblCore`

use thiserror::Error;

use crate::locale::Locale;
use crate::table::EntryId;

/// The error type for `StblCore` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error while writing a binary buffer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Table Errors ====================
    /// The locale is not registered in the table's locale set.
    #[error("locale {locale} is not in this string table")]
    UnknownLocale {
        /// The locale that was requested.
        locale: Locale,
    },

    /// No entry with the given ID exists.
    #[error("no entry with ID {id}")]
    EntryNotFound {
        /// The missing entry ID.
        id: EntryId,
    },

    // ==================== Codec Errors ====================
    /// The serialized table is truncated or internally inconsistent.
    #[error("malformed string table binary: {message}")]
    MalformedBinary {
        /// Description of what is malformed.
        message: String,
    },

    /// A value cannot be written as a NUL-terminated string.
    #[error("value of entry {id} for locale {locale} contains a NUL character")]
    NulInValue {
        /// The entry ID.
        id: EntryId,
        /// The locale of the offending value.
        locale: Locale,
    },

    /// The table has more locales than the header can count.
    #[error("too many locales to encode: {count}")]
    TooManyLocales {
        /// The number of locales in the table.
        count: usize,
    },

    /// The textual envelope is not valid base64.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    // ==================== Collaborator Errors ====================
    /// A resource container failed to build or parse a buffer.
    #[error("resource container error: {0}")]
    Container(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedBinary {
            message: message.into(),
        }
    }
}

/// A specialized Result type for `StblCore` operations.
pub type Result<T> = std::result::Result<T, Error>;
