//! Resource container seam
//!
//! The target content format wraps a single-locale string table in its own
//! binary resource. That format is owned by an external library; the core
//! only needs the round trip `rows -> buffer -> rows` to preserve order.

use crate::error::Result;
use crate::table::StringRow;

/// Converts single-locale rows to and from a binary resource buffer.
pub trait ResourceContainer {
    /// Build a resource buffer from rows, in order.
    fn build_buffer(&self, rows: &[StringRow]) -> Result<Vec<u8>>;

    /// Recover the rows stored in a resource buffer, in order.
    fn parse_buffer(&self, buffer: &[u8]) -> Result<Vec<StringRow>>;
}
