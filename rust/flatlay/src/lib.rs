//! Schema-driven flat binary codecs.
//!
//! `flatlay` turns a type with a statically known shape into a pair of encode and
//! decode functions over a compact, headerless byte layout. The layout of a type is
//! fixed by its members: fixed-width scalars and enums are written as their native
//! memory image, nullable scalars get a one-byte presence flag, and strings and
//! sequences of fixed-width elements get an `i32` byte-length prefix (`-1` for null).
//!
//! ```
//! use flatlay::Flat;
//!
//! #[derive(Debug, Default, PartialEq, Flat)]
//! pub struct Point {
//!     pub x: i32,
//!     pub y: i32,
//! }
//!
//! let bytes = flatlay::encode(&Point { x: 5, y: 7 }).unwrap();
//! assert_eq!(bytes.len(), 8);
//! assert_eq!(flatlay::decode::<Point>(&bytes).unwrap(), Point { x: 5, y: 7 });
//! ```
//!
//! The first use of a type runs the pipeline once and caches the result:
//! [`members::enumerate`] picks the eligible members, [`plan::plan`] lays them
//! out, [`render::render`] renders the codec for the configured [`Strategy`] and a
//! [`BuildHost`] compiles it. See [`registry`] for the cache itself.
//!
//! The wire format carries no type information. Decoding bytes with a type other
//! than the one that encoded them is not detected: it succeeds whenever the
//! buffer is long enough and yields whatever the bytes mean under the decoding
//! type's layout. Types that share a prefix of identical members decode that
//! prefix correctly. Members whose type has no layout (maps, nested structs,
//! sequences of strings, ...) are dropped silently; see [`members::report`].

extern crate self as flatlay;

pub mod classify;
pub mod config;
pub mod host;
pub mod members;
pub mod plan;
pub mod reflect;
pub mod registry;
pub mod render;
pub mod strategy;
pub mod wire;

mod std_impls;

use futures::future::{self, Ready};

pub use flatlay_common::{error, verify_arg};
pub use flatlay_common::error::{Error, ErrorKind};
pub use flatlay_common::Result;
pub use flatlay_macros::Flat;
pub use flatlay_primitives::{DateTime, DateTimeOffset, Decimal, Guid, TimeSpan};

pub use classify::{classify, FixedElement, LayoutKind, ScalarKind, TypeDescriptor};
pub use config::{serialize_properties, set_serialize_properties, Config};
pub use host::{BuildHost, ClosureHost, CompiledCodec};
pub use members::{
    Accessor, Exclusion, Getter, MemberDescriptor, MemberInfo, MemberOrigin, Setter, Visibility,
};
pub use plan::LayoutPlan;
pub use reflect::{Flat, Reflect, ValueError, ValueResult};
pub use registry::{CodecEntry, CodecRegistry};
pub use render::RenderedUnit;
pub use strategy::{AddressMode, StringEncoding, Strategy};

/// Encodes `value` into a freshly allocated buffer of exactly its encoded size.
pub fn encode<T: Flat>(value: &T) -> Result<Vec<u8>> {
    registry::global().encode(value)
}

/// Appends the encoding of `value` to `sink` and returns the number of bytes added.
pub fn encode_into<T: Flat>(value: &T, sink: &mut Vec<u8>) -> Result<usize> {
    registry::global().encode_into(value, sink)
}

/// Encoded size of `value`.
pub fn encoded_len<T: Flat>(value: &T) -> Result<usize> {
    registry::global().encoded_len(value)
}

/// Decodes a value from the start of `bytes`.
///
/// Fails with a buffer-too-short error ([`Error::is_buffer_too_short`]) when
/// `bytes` ends before the layout does. Trailing bytes are ignored.
pub fn decode<T: Flat>(bytes: &[u8]) -> Result<T> {
    registry::global().decode(bytes)
}

/// Decodes a value from the start of `bytes` and returns it with the number of
/// bytes it occupied, so that records can be read back to back.
pub fn decode_prefix<T: Flat>(bytes: &[u8]) -> Result<(T, usize)> {
    registry::global().decode_prefix(bytes)
}

/// [`encode`] handed through a completed future.
pub fn encode_async<T: Flat>(value: &T) -> Ready<Result<Vec<u8>>> {
    future::ready(encode(value))
}

/// [`decode`] handed through a completed future.
pub fn decode_async<T: Flat>(bytes: &[u8]) -> Ready<Result<T>> {
    future::ready(decode(bytes))
}

/// Layout of `T` in the process-wide registry, building its codec if needed.
pub fn layout_of<T: Flat>() -> Result<std::sync::Arc<LayoutPlan>> {
    registry::global().layout_of::<T>()
}
