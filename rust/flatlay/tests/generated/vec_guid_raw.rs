// Layout of alloc::vec::Vec<flatlay_primitives::guid::Guid>.
// Total size: 4 + len(alloc::vec::Vec<flatlay_primitives::guid::Guid>) * 16.
pub struct VecGuidRawCodec;

impl VecGuidRawCodec {
    pub fn encode(value: &std::vec::Vec<::flatlay::Guid>) -> ::flatlay::Result<::std::vec::Vec<u8>> {
        let mut buffer = ::std::vec![0u8; Self::encoded_len(value)?];
        let written = Self::write(value, &mut buffer)?;
        buffer.truncate(written);
        Ok(buffer)
    }

    pub fn encoded_len(value: &std::vec::Vec<::flatlay::Guid>) -> ::flatlay::Result<usize> {
        let mut size = 4usize;
        size += ::flatlay::wire::elements_len(value, "alloc::vec::Vec<flatlay_primitives::guid::Guid>", false, 16)?;
        Ok(size)
    }

    pub fn write(value: &std::vec::Vec<::flatlay::Guid>, buffer: &mut [u8]) -> ::flatlay::Result<usize> {
        let mut cursor = ::flatlay::wire::Cursor::new();
        ::flatlay::wire::raw::write_elements(buffer, &mut cursor, "alloc::vec::Vec<flatlay_primitives::guid::Guid>", value, false, 16)?;
        Ok(cursor.position())
    }

    pub fn decode(buffer: &[u8]) -> ::flatlay::Result<std::vec::Vec<::flatlay::Guid>> {
        Self::read(buffer).map(|(value, _)| value)
    }

    pub fn read(buffer: &[u8]) -> ::flatlay::Result<(std::vec::Vec<::flatlay::Guid>, usize)> {
        let mut cursor = ::flatlay::wire::Cursor::new();
        let mut value = <std::vec::Vec<::flatlay::Guid> as ::core::default::Default>::default();
        ::flatlay::wire::raw::read_elements(buffer, &mut cursor, "alloc::vec::Vec<flatlay_primitives::guid::Guid>", &mut value, false, 16)?;
        Ok((value, cursor.position()))
    }
}
