//! Key hashing
//!
//! String table keys are 32-bit FNV-1 hashes. The table itself treats keys as
//! opaque; these helpers exist for callers that mint new keys.

const FNV32_PRIME: u32 = 0x0100_0193;

/// FNV-32 offset basis, which is also the hash of an empty input.
pub const EMPTY_STRING_FNV32: u32 = 0x811C9DC5;

/// 32-bit FNV-1 hash of the UTF-8 bytes of `value`.
#[must_use]
pub fn fnv32(value: &str) -> u32 {
    fnv32_bytes(value.as_bytes())
}

/// 32-bit FNV-1 hash of raw bytes.
#[must_use]
pub fn fnv32_bytes(bytes: &[u8]) -> u32 {
    bytes.iter().fold(EMPTY_STRING_FNV32, |hash, &b| {
        hash.wrapping_mul(FNV32_PRIME) ^ u32::from(b)
    })
}
