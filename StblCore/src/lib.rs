//! # `StblCore`
//!
//! Multi-locale string tables for localization pipelines.
//!
//! - **Table** - [`LocalizedStringTable`]: entries keyed by a 32-bit hash with
//!   per-locale text, stored as differences against a movable primary locale
//! - **Codec** - compact binary form with a base64 envelope
//! - **Issues** - duplicate/suspicious key and value diagnostics
//! - **Resolver** - merge single-locale tables parsed from uploads
//!
//! ## Quick Start
//!
//! ```
//! use stblcore::prelude::*;
//!
//! let mut stbl = LocalizedStringTable::new(0, [0, 2], []);
//! let id = stbl.add_entry(fnv32("greeting"), "Hello").id();
//! stbl.set_value(id, "Bonjour", 2)?;
//!
//! let restored = LocalizedStringTable::deserialize(&stbl.serialize()?)?;
//! assert_eq!(restored.get_value_with_fallback(0, 2), "Bonjour");
//! assert!(restored.get_issues().is_empty());
//! # Ok::<(), stblcore::Error>(())
//! ```

pub mod codec;
pub mod container;
pub mod error;
pub mod hash;
pub mod issues;
pub mod locale;
pub mod resolver;
pub mod table;

// Re-exports for convenience
pub use error::{Error, Result};
pub use table::{Entry, EntryData, EntryId, LocalizedStringTable, StringRow};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::codec::{decode_table, encode_table};
    pub use crate::container::ResourceContainer;
    pub use crate::error::{Error, Result};
    pub use crate::hash::{EMPTY_STRING_FNV32, fnv32};
    pub use crate::issues::{Issue, IssueKind};
    pub use crate::locale::{Locale, instance_base, locale_of_instance, set_high_byte};
    pub use crate::resolver::{ParsedTable, resolve_string_tables};
    pub use crate::table::{Entry, EntryData, EntryId, LocalizedStringTable, StringRow};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
