use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use uuid::Uuid;

/// 16-byte GUID, mixed-endian layout compatible with the .NET `Guid` struct:
/// the first three groups are stored little-endian, the last eight bytes as-is.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Pod, Zeroable)]
#[repr(C)]
pub struct Guid([u8; 16]);

impl Guid {
    /// Generates a new random (v4) GUID.
    pub fn new_v4() -> Guid {
        Uuid::new_v4().into()
    }

    /// Returns the NIL (all zero) GUID.
    pub const fn nil() -> Guid {
        Guid([0; 16])
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Guid {
        Guid(bytes)
    }

    pub const fn bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0; 16]
    }

    /// Parses a GUID from a canonical, braced or hyphen-less hexadecimal string.
    pub fn parse_str(input: &str) -> Result<Guid, uuid::Error> {
        Uuid::parse_str(input.trim_matches(|c| c == '{' || c == '}')).map(Guid::from)
    }

    pub fn from_fields(a: u32, b: u16, c: u16, d: &[u8; 8]) -> Guid {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&a.to_le_bytes());
        bytes[4..6].copy_from_slice(&b.to_le_bytes());
        bytes[6..8].copy_from_slice(&c.to_le_bytes());
        bytes[8..].copy_from_slice(d);
        Guid(bytes)
    }

    pub fn to_fields(&self) -> (u32, u16, u16, [u8; 8]) {
        let b = &self.0;
        let mut d = [0u8; 8];
        d.copy_from_slice(&b[8..]);
        (
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            u16::from_le_bytes([b[4], b[5]]),
            u16::from_le_bytes([b[6], b[7]]),
            d,
        )
    }
}

impl From<Uuid> for Guid {
    fn from(u: Uuid) -> Self {
        Guid(u.to_bytes_le())
    }
}

impl From<Guid> for Uuid {
    fn from(g: Guid) -> Self {
        Uuid::from_bytes_le(g.0)
    }
}

impl FromStr for Guid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Guid::parse_str(s)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Uuid::from(*self).fmt(f)
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}
