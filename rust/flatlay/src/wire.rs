//! Wire primitives shared by rendered codec source and the closure build host.
//!
//! Every step of a codec starts with [`Cursor::begin`], which folds the bytes the
//! previous step committed into the absolute offset, and then claims the regions
//! it touches relative to that offset. The [`checked`] module takes every region
//! through a bounds-checked slice accessor. The [`raw`] module takes regions
//! through pointer arithmetic: its fixed-width scalar functions are `unsafe` and
//! rely on a preceding [`Cursor::guard`] covering the whole run, while the
//! variable-length ones guard their own regions.

use crate::error::Error;
use crate::plan::{LENGTH_PREFIX, PRESENCE_FLAG};
use crate::reflect::Reflect;
use crate::strategy::StringEncoding;
use crate::Result;

/// Presence flag of a nullable value that holds a value.
pub const FLAG_PRESENT: u8 = 0;
/// Presence flag of a null value.
pub const FLAG_NULL: u8 = 1;
/// Length prefix of a null string or sequence.
pub const NULL_LENGTH: i32 = -1;

/// Two-counter position within a wire buffer.
///
/// `offset` is the absolute start of the current step; `written` is the number of
/// bytes the current step has committed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    offset: usize,
    written: usize,
}

impl Cursor {
    pub const fn new() -> Cursor {
        Cursor {
            offset: 0,
            written: 0,
        }
    }

    /// Starts a new step at the end of the previous one and returns its offset.
    #[inline]
    pub fn begin(&mut self) -> usize {
        self.offset += self.written;
        self.written = 0;
        self.offset
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Absolute position of the next unclaimed byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset + self.written
    }

    #[inline]
    fn commit(&mut self, len: usize) {
        self.written += len;
    }

    /// Verifies that `needed` bytes starting at the current position fit in a
    /// buffer of `available` bytes.
    #[inline]
    pub fn guard(&self, available: usize, needed: usize, member: &str) -> Result<()> {
        let start = self.position();
        match start.checked_add(needed) {
            Some(end) if end <= available => Ok(()),
            _ => Err(Error::buffer_too_short(member, start, needed, available)),
        }
    }
}

/// Region addressing of one strategy.
trait Addressing {
    /// Whether [`Addressing::region`] verifies bounds itself.
    const CHECKED: bool;

    /// # Safety
    ///
    /// Unless `CHECKED` is set, `pos + len <= buf.len()` must hold.
    unsafe fn region<'a>(buf: &'a [u8], pos: usize, len: usize, member: &str)
    -> Result<&'a [u8]>;

    /// # Safety
    ///
    /// Unless `CHECKED` is set, `pos + len <= buf.len()` must hold.
    unsafe fn region_mut<'a>(
        buf: &'a mut [u8],
        pos: usize,
        len: usize,
        member: &str,
    ) -> Result<&'a mut [u8]>;
}

enum Checked {}

enum Raw {}

impl Addressing for Checked {
    const CHECKED: bool = true;

    unsafe fn region<'a>(
        buf: &'a [u8],
        pos: usize,
        len: usize,
        member: &str,
    ) -> Result<&'a [u8]> {
        let available = buf.len();
        pos.checked_add(len)
            .and_then(|end| buf.get(pos..end))
            .ok_or_else(|| Error::buffer_too_short(member, pos, len, available))
    }

    unsafe fn region_mut<'a>(
        buf: &'a mut [u8],
        pos: usize,
        len: usize,
        member: &str,
    ) -> Result<&'a mut [u8]> {
        let available = buf.len();
        pos.checked_add(len)
            .and_then(|end| buf.get_mut(pos..end))
            .ok_or_else(|| Error::buffer_too_short(member, pos, len, available))
    }
}

impl Addressing for Raw {
    const CHECKED: bool = false;

    unsafe fn region<'a>(
        buf: &'a [u8],
        pos: usize,
        len: usize,
        _member: &str,
    ) -> Result<&'a [u8]> {
        debug_assert!(pos + len <= buf.len());
        // SAFETY: the caller guarantees `pos + len <= buf.len()`.
        Ok(unsafe { std::slice::from_raw_parts(buf.as_ptr().add(pos), len) })
    }

    unsafe fn region_mut<'a>(
        buf: &'a mut [u8],
        pos: usize,
        len: usize,
        _member: &str,
    ) -> Result<&'a mut [u8]> {
        debug_assert!(pos + len <= buf.len());
        // SAFETY: the caller guarantees `pos + len <= buf.len()`.
        Ok(unsafe { std::slice::from_raw_parts_mut(buf.as_mut_ptr().add(pos), len) })
    }
}

/// Claims the next `len` bytes of the current step after verifying they exist.
fn claim<'a, A: Addressing>(
    buf: &'a [u8],
    cursor: &mut Cursor,
    len: usize,
    member: &str,
) -> Result<&'a [u8]> {
    if !A::CHECKED {
        cursor.guard(buf.len(), len, member)?;
    }
    // SAFETY: raw regions were guarded above.
    let region = unsafe { A::region(buf, cursor.position(), len, member)? };
    cursor.commit(len);
    Ok(region)
}

fn claim_mut<'a, A: Addressing>(
    buf: &'a mut [u8],
    cursor: &mut Cursor,
    len: usize,
    member: &str,
) -> Result<&'a mut [u8]> {
    if !A::CHECKED {
        cursor.guard(buf.len(), len, member)?;
    }
    let pos = cursor.position();
    // SAFETY: raw regions were guarded above.
    let region = unsafe { A::region_mut(buf, pos, len, member)? };
    cursor.commit(len);
    Ok(region)
}

/// # Safety
///
/// For raw addressing the region must have been guarded by the caller.
unsafe fn claim_unguarded<'a, A: Addressing>(
    buf: &'a [u8],
    cursor: &mut Cursor,
    len: usize,
    member: &str,
) -> Result<&'a [u8]> {
    // SAFETY: forwarded to the caller.
    let region = unsafe { A::region(buf, cursor.position(), len, member)? };
    cursor.commit(len);
    Ok(region)
}

/// # Safety
///
/// For raw addressing the region must have been guarded by the caller.
unsafe fn claim_mut_unguarded<'a, A: Addressing>(
    buf: &'a mut [u8],
    cursor: &mut Cursor,
    len: usize,
    member: &str,
) -> Result<&'a mut [u8]> {
    let pos = cursor.position();
    // SAFETY: forwarded to the caller.
    let region = unsafe { A::region_mut(buf, pos, len, member)? };
    cursor.commit(len);
    Ok(region)
}

/// # Safety
///
/// See [`claim_mut_unguarded`].
unsafe fn write_scalar_in<A: Addressing>(
    buf: &mut [u8],
    cursor: &mut Cursor,
    member: &str,
    value: &dyn Reflect,
    width: usize,
) -> Result<()> {
    cursor.begin();
    // SAFETY: forwarded to the caller.
    let dst = unsafe { claim_mut_unguarded::<A>(buf, cursor, width, member)? };
    value
        .store_scalar(dst)
        .map_err(|e| e.into_error(member, "fixed-width scalar"))
}

/// # Safety
///
/// See [`claim_unguarded`].
unsafe fn read_scalar_in<A: Addressing>(
    buf: &[u8],
    cursor: &mut Cursor,
    member: &str,
    slot: &mut dyn Reflect,
    width: usize,
) -> Result<()> {
    cursor.begin();
    // SAFETY: forwarded to the caller.
    let src = unsafe { claim_unguarded::<A>(buf, cursor, width, member)? };
    slot.load_scalar(src)
        .map_err(|e| e.into_error(member, "fixed-width scalar"))
}

fn write_flagged_in<A: Addressing>(
    buf: &mut [u8],
    cursor: &mut Cursor,
    member: &str,
    value: &dyn Reflect,
    width: usize,
) -> Result<()> {
    cursor.begin();
    match present(value, true, member, "nullable scalar")? {
        None => claim_mut::<A>(buf, cursor, PRESENCE_FLAG, member)?[0] = FLAG_NULL,
        Some(inner) => {
            claim_mut::<A>(buf, cursor, PRESENCE_FLAG, member)?[0] = FLAG_PRESENT;
            let dst = claim_mut::<A>(buf, cursor, width, member)?;
            inner
                .store_scalar(dst)
                .map_err(|e| e.into_error(member, "nullable scalar"))?;
        }
    }
    Ok(())
}

fn read_flagged_in<A: Addressing>(
    buf: &[u8],
    cursor: &mut Cursor,
    member: &str,
    slot: &mut dyn Reflect,
    width: usize,
) -> Result<()> {
    cursor.begin();
    let flag = claim::<A>(buf, cursor, PRESENCE_FLAG, member)?[0];
    if flag != FLAG_PRESENT {
        return slot
            .set_null()
            .map_err(|e| e.into_error(member, "nullable scalar"));
    }
    let src = claim::<A>(buf, cursor, width, member)?;
    let target = slot
        .present_mut()
        .ok_or_else(|| Error::type_mismatch(member, "nullable scalar"))?;
    target
        .load_scalar(src)
        .map_err(|e| e.into_error(member, "nullable scalar"))
}

fn write_text_in<A: Addressing>(
    buf: &mut [u8],
    cursor: &mut Cursor,
    member: &str,
    value: &dyn Reflect,
    nullable: bool,
    encoding: StringEncoding,
) -> Result<()> {
    cursor.begin();
    let Some(text) = text_of(value, nullable, member)? else {
        return write_length::<A>(buf, cursor, member, NULL_LENGTH);
    };
    let len = encoding.byte_len(text);
    write_length::<A>(buf, cursor, member, length_prefix(member, len)?)?;
    if len == 0 {
        return Ok(());
    }
    let dst = claim_mut::<A>(buf, cursor, len, member)?;
    match encoding {
        StringEncoding::Utf8 => dst.copy_from_slice(text.as_bytes()),
        StringEncoding::Utf16 => {
            for (chunk, unit) in dst.chunks_exact_mut(2).zip(text.encode_utf16()) {
                chunk.copy_from_slice(&unit.to_ne_bytes());
            }
        }
    }
    Ok(())
}

fn read_text_in<A: Addressing>(
    buf: &[u8],
    cursor: &mut Cursor,
    member: &str,
    slot: &mut dyn Reflect,
    nullable: bool,
    encoding: StringEncoding,
) -> Result<()> {
    cursor.begin();
    let Some(len) = read_length::<A>(buf, cursor, member)? else {
        return set_null(slot, nullable, member, "string");
    };
    let src = claim::<A>(buf, cursor, len, member)?;
    let text = decode_text(src, encoding, member)?;
    target_of(slot, nullable, member, "string")?
        .set_text(text)
        .map_err(|e| e.into_error(member, "string"))
}

fn write_elements_in<A: Addressing>(
    buf: &mut [u8],
    cursor: &mut Cursor,
    member: &str,
    value: &dyn Reflect,
    nullable: bool,
    width: usize,
) -> Result<()> {
    cursor.begin();
    let Some(sequence) = present(value, nullable, member, "sequence")? else {
        return write_length::<A>(buf, cursor, member, NULL_LENGTH);
    };
    let len = payload_len(sequence, member, width)?;
    write_length::<A>(buf, cursor, member, length_prefix(member, len)?)?;
    if len == 0 {
        return Ok(());
    }
    let dst = claim_mut::<A>(buf, cursor, len, member)?;
    sequence
        .store_elements(dst)
        .map_err(|e| e.into_error(member, "sequence"))
}

fn read_elements_in<A: Addressing>(
    buf: &[u8],
    cursor: &mut Cursor,
    member: &str,
    slot: &mut dyn Reflect,
    nullable: bool,
    width: usize,
) -> Result<()> {
    cursor.begin();
    let Some(len) = read_length::<A>(buf, cursor, member)? else {
        return set_null(slot, nullable, member, "sequence");
    };
    if len % width != 0 {
        return Err(Error::invalid_value(
            member,
            format!("payload of {len} bytes is not a multiple of the element width {width}"),
        ));
    }
    let src = claim::<A>(buf, cursor, len, member)?;
    target_of(slot, nullable, member, "sequence")?
        .load_elements(src)
        .map_err(|e| e.into_error(member, "sequence"))
}

fn write_length<A: Addressing>(
    buf: &mut [u8],
    cursor: &mut Cursor,
    member: &str,
    len: i32,
) -> Result<()> {
    claim_mut::<A>(buf, cursor, LENGTH_PREFIX, member)?.copy_from_slice(&len.to_ne_bytes());
    Ok(())
}

/// Reads a length prefix; any negative length means null.
fn read_length<A: Addressing>(
    buf: &[u8],
    cursor: &mut Cursor,
    member: &str,
) -> Result<Option<usize>> {
    let src = claim::<A>(buf, cursor, LENGTH_PREFIX, member)?;
    let mut raw = [0u8; LENGTH_PREFIX];
    raw.copy_from_slice(src);
    Ok(usize::try_from(i32::from_ne_bytes(raw)).ok())
}

fn length_prefix(member: &str, len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::length_overflow(member, len))
}

fn payload_len(sequence: &dyn Reflect, member: &str, width: usize) -> Result<usize> {
    let count = sequence
        .element_count()
        .ok_or_else(|| Error::type_mismatch(member, "sequence"))?;
    count
        .checked_mul(width)
        .ok_or_else(|| Error::length_overflow(member, count))
}

fn decode_text(src: &[u8], encoding: StringEncoding, member: &str) -> Result<String> {
    match encoding {
        StringEncoding::Utf8 => std::str::from_utf8(src)
            .map(str::to_owned)
            .map_err(|e| Error::invalid_value(member, e.to_string())),
        StringEncoding::Utf16 => {
            if src.len() % 2 != 0 {
                return Err(Error::invalid_value(
                    member,
                    format!("odd UTF-16 payload of {} bytes", src.len()),
                ));
            }
            let units = src
                .chunks_exact(2)
                .map(|chunk| u16::from_ne_bytes([chunk[0], chunk[1]]));
            char::decode_utf16(units)
                .collect::<std::result::Result<String, _>>()
                .map_err(|e| Error::invalid_value(member, e.to_string()))
        }
    }
}

/// Resolves a possibly nullable value to its inner value, `None` when null.
fn present<'a>(
    value: &'a dyn Reflect,
    nullable: bool,
    member: &str,
    expected: &'static str,
) -> Result<Option<&'a dyn Reflect>> {
    if !nullable {
        return Ok(Some(value));
    }
    value
        .nullable()
        .ok_or_else(|| Error::type_mismatch(member, expected))
}

fn text_of<'a>(value: &'a dyn Reflect, nullable: bool, member: &str) -> Result<Option<&'a str>> {
    match present(value, nullable, member, "string")? {
        None => Ok(None),
        Some(inner) => inner
            .text()
            .map(Some)
            .ok_or_else(|| Error::type_mismatch(member, "string")),
    }
}

fn target_of<'a>(
    slot: &'a mut dyn Reflect,
    nullable: bool,
    member: &str,
    expected: &'static str,
) -> Result<&'a mut dyn Reflect> {
    if !nullable {
        return Ok(slot);
    }
    slot.present_mut()
        .ok_or_else(|| Error::type_mismatch(member, expected))
}

fn set_null(
    slot: &mut dyn Reflect,
    nullable: bool,
    member: &str,
    expected: &'static str,
) -> Result<()> {
    if !nullable {
        return Err(Error::invalid_value(
            member,
            format!("null length prefix for a non-nullable {expected}"),
        ));
    }
    slot.set_null().map_err(|e| e.into_error(member, expected))
}

/// Realized bytes of a nullable scalar beyond its presence flag.
pub fn presence_len(value: &dyn Reflect, member: &str, width: usize) -> Result<usize> {
    match present(value, true, member, "nullable scalar")? {
        Some(_) => Ok(width),
        None => Ok(0),
    }
}

/// Realized payload bytes of a string.
pub fn text_len(
    value: &dyn Reflect,
    member: &str,
    nullable: bool,
    encoding: StringEncoding,
) -> Result<usize> {
    Ok(text_of(value, nullable, member)?.map_or(0, |text| encoding.byte_len(text)))
}

/// Realized payload bytes of an array or list.
pub fn elements_len(
    value: &dyn Reflect,
    member: &str,
    nullable: bool,
    width: usize,
) -> Result<usize> {
    match present(value, nullable, member, "sequence")? {
        Some(sequence) => payload_len(sequence, member, width),
        None => Ok(0),
    }
}

macro_rules! guarded_ops {
    ($mode:ty) => {
        pub fn write_flagged(
            buf: &mut [u8],
            cursor: &mut Cursor,
            member: &str,
            value: &dyn Reflect,
            width: usize,
        ) -> Result<()> {
            super::write_flagged_in::<$mode>(buf, cursor, member, value, width)
        }

        pub fn read_flagged(
            buf: &[u8],
            cursor: &mut Cursor,
            member: &str,
            slot: &mut dyn Reflect,
            width: usize,
        ) -> Result<()> {
            super::read_flagged_in::<$mode>(buf, cursor, member, slot, width)
        }

        pub fn write_text(
            buf: &mut [u8],
            cursor: &mut Cursor,
            member: &str,
            value: &dyn Reflect,
            nullable: bool,
            encoding: StringEncoding,
        ) -> Result<()> {
            super::write_text_in::<$mode>(buf, cursor, member, value, nullable, encoding)
        }

        pub fn read_text(
            buf: &[u8],
            cursor: &mut Cursor,
            member: &str,
            slot: &mut dyn Reflect,
            nullable: bool,
            encoding: StringEncoding,
        ) -> Result<()> {
            super::read_text_in::<$mode>(buf, cursor, member, slot, nullable, encoding)
        }

        pub fn write_elements(
            buf: &mut [u8],
            cursor: &mut Cursor,
            member: &str,
            value: &dyn Reflect,
            nullable: bool,
            width: usize,
        ) -> Result<()> {
            super::write_elements_in::<$mode>(buf, cursor, member, value, nullable, width)
        }

        pub fn read_elements(
            buf: &[u8],
            cursor: &mut Cursor,
            member: &str,
            slot: &mut dyn Reflect,
            nullable: bool,
            width: usize,
        ) -> Result<()> {
            super::read_elements_in::<$mode>(buf, cursor, member, slot, nullable, width)
        }
    };
}

/// Bounds-checked primitives. Every region access is verified.
pub mod checked {
    use super::{Checked, Cursor};
    use crate::reflect::Reflect;
    use crate::strategy::StringEncoding;
    use crate::Result;

    pub fn write_scalar(
        buf: &mut [u8],
        cursor: &mut Cursor,
        member: &str,
        value: &dyn Reflect,
        width: usize,
    ) -> Result<()> {
        // SAFETY: checked addressing verifies every region.
        unsafe { super::write_scalar_in::<Checked>(buf, cursor, member, value, width) }
    }

    pub fn read_scalar(
        buf: &[u8],
        cursor: &mut Cursor,
        member: &str,
        slot: &mut dyn Reflect,
        width: usize,
    ) -> Result<()> {
        // SAFETY: checked addressing verifies every region.
        unsafe { super::read_scalar_in::<Checked>(buf, cursor, member, slot, width) }
    }

    guarded_ops!(Checked);
}

/// Pointer-arithmetic primitives.
pub mod raw {
    use super::{Cursor, Raw};
    use crate::reflect::Reflect;
    use crate::strategy::StringEncoding;
    use crate::Result;

    /// Writes a fixed-width scalar without bounds checks.
    ///
    /// # Safety
    ///
    /// A [`Cursor::guard`] issued at the start of this step's run must cover
    /// `width` bytes from the current position.
    pub unsafe fn write_scalar(
        buf: &mut [u8],
        cursor: &mut Cursor,
        member: &str,
        value: &dyn Reflect,
        width: usize,
    ) -> Result<()> {
        // SAFETY: forwarded to the caller.
        unsafe { super::write_scalar_in::<Raw>(buf, cursor, member, value, width) }
    }

    /// Reads a fixed-width scalar without bounds checks.
    ///
    /// # Safety
    ///
    /// Same as [`write_scalar`].
    pub unsafe fn read_scalar(
        buf: &[u8],
        cursor: &mut Cursor,
        member: &str,
        slot: &mut dyn Reflect,
        width: usize,
    ) -> Result<()> {
        // SAFETY: forwarded to the caller.
        unsafe { super::read_scalar_in::<Raw>(buf, cursor, member, slot, width) }
    }

    guarded_ops!(Raw);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_threads_two_counters() {
        let mut cursor = Cursor::new();
        assert_eq!(cursor.begin(), 0);
        cursor.commit(4);
        assert_eq!((cursor.offset(), cursor.written()), (0, 4));
        assert_eq!(cursor.begin(), 4);
        cursor.commit(1);
        cursor.commit(8);
        assert_eq!(cursor.position(), 13);
        assert_eq!(cursor.begin(), 13);
        assert_eq!(cursor.written(), 0);
    }

    #[test]
    fn test_guard() {
        let mut cursor = Cursor::new();
        cursor.begin();
        cursor.commit(6);
        assert!(cursor.guard(10, 4, "x").is_ok());
        let err = cursor.guard(10, 5, "x").unwrap_err();
        assert!(err.is_buffer_too_short());
        assert!(cursor.guard(10, usize::MAX, "x").is_err());
    }

    #[test]
    fn test_checked_scalar_reports_short_buffer() {
        let mut buf = [0u8; 6];
        let mut cursor = Cursor::new();
        checked::write_scalar(&mut buf, &mut cursor, "a", &7i32, 4).unwrap();
        let err = checked::write_scalar(&mut buf, &mut cursor, "b", &7i32, 4).unwrap_err();
        assert!(err.is_buffer_too_short());
        assert_eq!(&buf[..4], &7i32.to_ne_bytes());
    }

    #[test]
    fn test_flagged() {
        let mut buf = [0xAAu8; 6];
        let mut cursor = Cursor::new();
        raw::write_flagged(&mut buf, &mut cursor, "a", &Some(3u32), 4).unwrap();
        raw::write_flagged(&mut buf, &mut cursor, "b", &None::<u32>, 4).unwrap();
        assert_eq!(cursor.position(), 6);
        assert_eq!(buf[0], FLAG_PRESENT);
        assert_eq!(&buf[1..5], &3u32.to_ne_bytes());
        assert_eq!(buf[5], FLAG_NULL);

        let mut cursor = Cursor::new();
        let mut a: Option<u32> = None;
        let mut b: Option<u32> = Some(9);
        checked::read_flagged(&buf, &mut cursor, "a", &mut a, 4).unwrap();
        checked::read_flagged(&buf, &mut cursor, "b", &mut b, 4).unwrap();
        assert_eq!((a, b), (Some(3), None));
    }

    #[test]
    fn test_text_null_and_empty() {
        let mut buf = [0u8; 8];
        let mut cursor = Cursor::new();
        checked::write_text(&mut buf, &mut cursor, "a", &None::<String>, true, StringEncoding::Utf8)
            .unwrap();
        checked::write_text(&mut buf, &mut cursor, "b", &String::new(), false, StringEncoding::Utf8)
            .unwrap();
        assert_eq!(&buf[..4], &(-1i32).to_ne_bytes());
        assert_eq!(&buf[4..], &0i32.to_ne_bytes());

        let mut cursor = Cursor::new();
        let mut a = Some("x".to_string());
        let mut b = "y".to_string();
        checked::read_text(&buf, &mut cursor, "a", &mut a, true, StringEncoding::Utf8).unwrap();
        checked::read_text(&buf, &mut cursor, "b", &mut b, false, StringEncoding::Utf8).unwrap();
        assert_eq!(a, None);
        assert_eq!(b, "");

        let mut cursor = Cursor::new();
        let mut c = String::new();
        let err = checked::read_text(&buf, &mut cursor, "c", &mut c, false, StringEncoding::Utf8)
            .unwrap_err();
        assert!(matches!(err.kind(), crate::ErrorKind::InvalidValue { .. }));
    }

    #[test]
    fn test_utf16_text() {
        let text = "hé😀".to_string();
        let len = text_len(&text, "t", false, StringEncoding::Utf16).unwrap();
        assert_eq!(len, 8);
        let mut buf = vec![0u8; 4 + len];
        let mut cursor = Cursor::new();
        raw::write_text(&mut buf, &mut cursor, "t", &text, false, StringEncoding::Utf16).unwrap();
        assert_eq!(&buf[..4], &8i32.to_ne_bytes());
        assert_eq!(&buf[4..6], &u16::from(b'h').to_ne_bytes());

        let mut cursor = Cursor::new();
        let mut back = String::new();
        raw::read_text(&buf, &mut cursor, "t", &mut back, false, StringEncoding::Utf16).unwrap();
        assert_eq!(back, text);
    }

    #[test]
    fn test_elements() {
        let values = vec![1u16, 2, 3];
        let mut buf = [0u8; 10];
        let mut cursor = Cursor::new();
        checked::write_elements(&mut buf, &mut cursor, "v", &values, false, 2).unwrap();
        assert_eq!(&buf[..4], &6i32.to_ne_bytes());

        let mut cursor = Cursor::new();
        let mut back: Option<Box<[u16]>> = None;
        raw::read_elements(&buf, &mut cursor, "v", &mut back, true, 2).unwrap();
        assert_eq!(back.as_deref(), Some(&[1u16, 2, 3][..]));

        // Payload that does not split into whole elements.
        let mut cursor = Cursor::new();
        let mut wide: Vec<u32> = Vec::new();
        let err = checked::read_elements(&buf, &mut cursor, "v", &mut wide, false, 4).unwrap_err();
        assert!(matches!(err.kind(), crate::ErrorKind::InvalidValue { .. }));
    }

    #[test]
    fn test_negative_length_is_null() {
        let buf = (-7i32).to_ne_bytes();
        let mut cursor = Cursor::new();
        let mut list = Some(vec![1u8]);
        checked::read_elements(&buf, &mut cursor, "v", &mut list, true, 1).unwrap();
        assert_eq!(list, None);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_raw_guarded_ops_check_bounds() {
        let buf = 100i32.to_ne_bytes();
        let mut cursor = Cursor::new();
        let mut text = String::new();
        let err = raw::read_text(&buf, &mut cursor, "t", &mut text, false, StringEncoding::Utf8)
            .unwrap_err();
        assert!(err.is_buffer_too_short());
    }
}
