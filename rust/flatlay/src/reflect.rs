//! Type-erased value access used by compiled codecs.
//!
//! [`Flat`] is the static side: it tells the classifier what shape a type has and,
//! for composites, lists the members the enumerator may pick from. [`Reflect`] is
//! the dynamic side: an object-safe view through which the build host reads and
//! writes member values without knowing their concrete types.
//!
//! Both traits are implemented for the scalar whitelist, `String`, `Option<T>`,
//! `Vec<T>`, `Box<[T]>` and a few shapes the layout never supports (maps), and are
//! derived for user structs and fieldless enums with `#[derive(Flat)]`.

use bytemuck::{CheckedBitPattern, NoUninit, Pod};

use crate::classify::TypeDescriptor;
use crate::error::Error;
use crate::members::MemberInfo;

pub type ValueResult<T> = std::result::Result<T, ValueError>;

/// Failure reported by a [`Reflect`] accessor. The codec attaches the member name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The value does not support the requested kind of access.
    Unsupported,
    /// The bytes do not form a valid value of the target type.
    Invalid(String),
}

impl ValueError {
    pub(crate) fn into_error(self, member: &str, expected: &'static str) -> Error {
        match self {
            ValueError::Unsupported => Error::type_mismatch(member, expected),
            ValueError::Invalid(message) => Error::invalid_value(member, message),
        }
    }
}

/// Object-safe access to a single member value.
///
/// Every method has a default that reports [`ValueError::Unsupported`] (or `None`),
/// so an implementation only overrides the group matching its own layout kind.
pub trait Reflect: Send + Sync + 'static {
    /// Writes the native representation of a fixed-width value into `dst`,
    /// which is exactly as long as the value's width.
    fn store_scalar(&self, dst: &mut [u8]) -> ValueResult<()> {
        let _ = dst;
        Err(ValueError::Unsupported)
    }

    /// Replaces the value with the one whose native representation is `src`.
    fn load_scalar(&mut self, src: &[u8]) -> ValueResult<()> {
        let _ = src;
        Err(ValueError::Unsupported)
    }

    /// For nullable wrappers, returns `Some(inner)` where `inner` is `None` when the
    /// value is null. Returns `None` for anything that is not a wrapper.
    fn nullable(&self) -> Option<Option<&dyn Reflect>> {
        None
    }

    /// Sets a nullable wrapper to null.
    fn set_null(&mut self) -> ValueResult<()> {
        Err(ValueError::Unsupported)
    }

    /// Makes a nullable wrapper present (holding a default inner value) and
    /// returns the inner value for loading.
    fn present_mut(&mut self) -> Option<&mut dyn Reflect> {
        None
    }

    fn text(&self) -> Option<&str> {
        None
    }

    fn set_text(&mut self, text: String) -> ValueResult<()> {
        let _ = text;
        Err(ValueError::Unsupported)
    }

    /// Number of elements of a fixed-element-size sequence.
    fn element_count(&self) -> Option<usize> {
        None
    }

    /// Copies the element bytes of a sequence into `dst`, which holds exactly
    /// `element_count() * element width` bytes.
    fn store_elements(&self, dst: &mut [u8]) -> ValueResult<()> {
        let _ = dst;
        Err(ValueError::Unsupported)
    }

    /// Replaces the sequence with the elements encoded in `src`.
    fn load_elements(&mut self, src: &[u8]) -> ValueResult<()> {
        let _ = src;
        Err(ValueError::Unsupported)
    }
}

/// A type with a statically known shape that can take part in a flat layout.
///
/// Implemented by `#[derive(Flat)]` for structs with named fields and for fieldless
/// enums. Decoding starts from `Default::default()`, so members that the layout
/// drops keep their default values.
pub trait Flat: Reflect + Default + Sized {
    /// Structural description consumed by the type classifier.
    fn descriptor() -> TypeDescriptor;

    /// Name used for diagnostics and in rendered codec source.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Declared members of a composite type, fields first in declaration order,
    /// then properties in attribute order. Empty for everything else.
    fn members() -> Vec<MemberInfo<Self>> {
        Vec::new()
    }

    /// Writes the native representation of `items` into `dst` back to back.
    fn store_slice(items: &[Self], dst: &mut [u8]) -> ValueResult<()> {
        let _ = (items, dst);
        Err(ValueError::Unsupported)
    }

    /// Materializes a sequence from back-to-back native representations.
    fn load_slice(src: &[u8]) -> ValueResult<Vec<Self>> {
        let _ = src;
        Err(ValueError::Unsupported)
    }
}

pub fn store_pod<T: NoUninit>(value: &T, dst: &mut [u8]) -> ValueResult<()> {
    let bytes = bytemuck::bytes_of(value);
    if bytes.len() != dst.len() {
        return Err(width_mismatch(bytes.len(), dst.len()));
    }
    dst.copy_from_slice(bytes);
    Ok(())
}

/// Reads a value from unaligned bytes, rejecting bit patterns that are not valid
/// for `T` (e.g. `2u8` as a `bool`).
pub fn load_checked<T: CheckedBitPattern>(src: &[u8]) -> ValueResult<T> {
    bytemuck::checked::try_pod_read_unaligned(src).map_err(|e| {
        ValueError::Invalid(format!(
            "{} bytes are not a valid {}: {e:?}",
            src.len(),
            std::any::type_name::<T>()
        ))
    })
}

pub fn store_pod_slice<T: NoUninit>(items: &[T], dst: &mut [u8]) -> ValueResult<()> {
    let bytes: &[u8] = bytemuck::cast_slice(items);
    if bytes.len() != dst.len() {
        return Err(width_mismatch(bytes.len(), dst.len()));
    }
    dst.copy_from_slice(bytes);
    Ok(())
}

/// Bulk-copies `src` into a freshly allocated vector of plain-old-data elements.
pub fn load_pod_slice<T: Pod>(src: &[u8]) -> ValueResult<Vec<T>> {
    let width = std::mem::size_of::<T>();
    if src.len() % width != 0 {
        return Err(ragged(src.len(), width));
    }
    let mut items = vec![T::zeroed(); src.len() / width];
    bytemuck::cast_slice_mut::<T, u8>(&mut items).copy_from_slice(src);
    Ok(items)
}

pub fn load_checked_slice<T: CheckedBitPattern>(src: &[u8]) -> ValueResult<Vec<T>> {
    let width = std::mem::size_of::<T>();
    if src.len() % width != 0 {
        return Err(ragged(src.len(), width));
    }
    src.chunks_exact(width).map(load_checked).collect()
}

/// Element-wise fallback for types without a plain memory image (enums).
pub fn store_each<T: Reflect>(items: &[T], dst: &mut [u8], width: usize) -> ValueResult<()> {
    if items.len() * width != dst.len() {
        return Err(width_mismatch(items.len() * width, dst.len()));
    }
    items
        .iter()
        .zip(dst.chunks_exact_mut(width))
        .try_for_each(|(item, chunk)| item.store_scalar(chunk))
}

pub fn load_each<T: Flat>(src: &[u8], width: usize) -> ValueResult<Vec<T>> {
    if src.len() % width != 0 {
        return Err(ragged(src.len(), width));
    }
    src.chunks_exact(width)
        .map(|chunk| {
            let mut item = T::default();
            item.load_scalar(chunk)?;
            Ok(item)
        })
        .collect()
}

#[cold]
fn width_mismatch(expected: usize, actual: usize) -> ValueError {
    ValueError::Invalid(format!(
        "region of {actual} bytes does not match value width {expected}"
    ))
}

#[cold]
fn ragged(len: usize, width: usize) -> ValueError {
    ValueError::Invalid(format!(
        "{len} bytes is not a whole number of {width}-byte elements"
    ))
}
