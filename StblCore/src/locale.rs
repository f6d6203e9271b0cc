//! Locale identifiers and instance helpers
//!
//! A locale is a small integer. Locale names and the full catalog live with
//! the caller; this crate only moves the numbers around.
//!
//! String table resources carry their locale in the high byte of the 64-bit
//! instance ID, so one "instance base" is shared by every translation of the
//! same table.

/// Integer identifier for a language/region variant.
pub type Locale = u8;

const LOCALE_SHIFT: u32 = 56;
const INSTANCE_BASE_MASK: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Locale stored in the high byte of a string table instance.
#[must_use]
pub fn locale_of_instance(instance: u64) -> Locale {
    (instance >> LOCALE_SHIFT) as Locale
}

/// Instance with its locale byte cleared.
#[must_use]
pub fn instance_base(instance: u64) -> u64 {
    instance & INSTANCE_BASE_MASK
}

/// Replace the locale byte of `instance` with `locale`.
#[must_use]
pub fn set_high_byte(locale: Locale, instance: u64) -> u64 {
    (u64::from(locale) << LOCALE_SHIFT) | instance_base(instance)
}
