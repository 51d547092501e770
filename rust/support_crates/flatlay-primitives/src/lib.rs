//! Fixed-width value types that have no direct `std` counterpart but belong to the
//! scalar whitelist of the flatlay wire format.
//!
//! Every type here is `#[repr(C)]`, has no padding and implements [`bytemuck::Pod`],
//! so its in-memory image is also its wire image.

pub mod datetime;
pub mod decimal;
pub mod guid;

pub use datetime::{DateTime, DateTimeOffset, TimeSpan};
pub use decimal::Decimal;
pub use guid::Guid;

pub const TICKS_PER_MILLISECOND: i64 = 10_000;
pub const TICKS_PER_SECOND: i64 = TICKS_PER_MILLISECOND * 1000;
pub const TICKS_PER_MINUTE: i64 = TICKS_PER_SECOND * 60;
pub const TICKS_PER_HOUR: i64 = TICKS_PER_MINUTE * 60;
pub const TICKS_PER_DAY: i64 = TICKS_PER_HOUR * 24;
/// Ticks between 0001-01-01 and the Unix epoch.
pub const TICKS_TILL_UNIX_TIME: i64 = 621_355_968_000_000_000;
pub const MAX_TICKS: i64 = 3_652_059 * TICKS_PER_DAY - 1;
