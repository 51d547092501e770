use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// How compiled codecs address the wire buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Every region is taken through a checked slice accessor.
    #[default]
    Checked,
    /// Runs of fixed-width members are covered by one bounds guard, after which
    /// regions are taken through unchecked pointer arithmetic.
    Raw,
}

/// Character encoding of string payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StringEncoding {
    #[default]
    Utf8,
    /// UTF-16 code units in native byte order.
    Utf16,
}

impl StringEncoding {
    /// Encoded payload length of `text`, in bytes.
    pub fn byte_len(self, text: &str) -> usize {
        match self {
            StringEncoding::Utf8 => text.len(),
            StringEncoding::Utf16 => text.encode_utf16().count() * 2,
        }
    }

    /// Width of one code unit.
    pub const fn unit_width(self) -> usize {
        match self {
            StringEncoding::Utf8 => 1,
            StringEncoding::Utf16 => 2,
        }
    }
}

/// Code generation strategy: an addressing mode and a string encoding.
///
/// Both modes produce byte-identical output for every member other than strings,
/// and for strings too when they share an encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Strategy {
    pub address: AddressMode,
    pub strings: StringEncoding,
}

impl Strategy {
    pub const BOUNDS_CHECKED: Strategy = Strategy {
        address: AddressMode::Checked,
        strings: StringEncoding::Utf8,
    };

    pub const RAW_POINTER: Strategy = Strategy {
        address: AddressMode::Raw,
        strings: StringEncoding::Utf16,
    };

    pub const fn new(address: AddressMode, strings: StringEncoding) -> Strategy {
        Strategy { address, strings }
    }

    /// Fragment used in rendered codec type names.
    pub(crate) fn suffix(&self) -> &'static str {
        match (self.address, self.strings) {
            (AddressMode::Checked, StringEncoding::Utf8) => "Checked",
            (AddressMode::Checked, StringEncoding::Utf16) => "CheckedUtf16",
            (AddressMode::Raw, StringEncoding::Utf16) => "Raw",
            (AddressMode::Raw, StringEncoding::Utf8) => "RawUtf8",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match (self.address, self.strings) {
            (AddressMode::Checked, StringEncoding::Utf8) => "checked",
            (AddressMode::Checked, StringEncoding::Utf16) => "checked-utf16",
            (AddressMode::Raw, StringEncoding::Utf16) => "raw",
            (AddressMode::Raw, StringEncoding::Utf8) => "raw-utf8",
        })
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "checked" => Ok(Strategy::BOUNDS_CHECKED),
            "checked-utf16" => Ok(Strategy::new(AddressMode::Checked, StringEncoding::Utf16)),
            "raw" => Ok(Strategy::RAW_POINTER),
            "raw-utf8" => Ok(Strategy::new(AddressMode::Raw, StringEncoding::Utf8)),
            other => Err(Error::invalid_arg(
                "strategy",
                format!(
                    "unknown strategy '{other}', expected checked, checked-utf16, raw or raw-utf8"
                ),
            )),
        }
    }
}
