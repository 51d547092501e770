// Layout of core::option::Option<i32>.
// Total size: 1 + 4?core::option::Option<i32>.
pub struct OptionI32CheckedCodec;

impl OptionI32CheckedCodec {
    pub fn encode(value: &core::option::Option<i32>) -> ::flatlay::Result<::std::vec::Vec<u8>> {
        let mut buffer = ::std::vec![0u8; Self::encoded_len(value)?];
        let written = Self::write(value, &mut buffer)?;
        buffer.truncate(written);
        Ok(buffer)
    }

    pub fn encoded_len(value: &core::option::Option<i32>) -> ::flatlay::Result<usize> {
        let mut size = 1usize;
        size += ::flatlay::wire::presence_len(value, "core::option::Option<i32>", 4)?;
        Ok(size)
    }

    pub fn write(value: &core::option::Option<i32>, buffer: &mut [u8]) -> ::flatlay::Result<usize> {
        let mut cursor = ::flatlay::wire::Cursor::new();
        ::flatlay::wire::checked::write_flagged(buffer, &mut cursor, "core::option::Option<i32>", value, 4)?;
        Ok(cursor.position())
    }

    pub fn decode(buffer: &[u8]) -> ::flatlay::Result<core::option::Option<i32>> {
        Self::read(buffer).map(|(value, _)| value)
    }

    pub fn read(buffer: &[u8]) -> ::flatlay::Result<(core::option::Option<i32>, usize)> {
        let mut cursor = ::flatlay::wire::Cursor::new();
        let mut value = <core::option::Option<i32> as ::core::default::Default>::default();
        ::flatlay::wire::checked::read_flagged(buffer, &mut cursor, "core::option::Option<i32>", &mut value, 4)?;
        Ok((value, cursor.position()))
    }
}
