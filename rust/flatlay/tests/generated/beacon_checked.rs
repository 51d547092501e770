// Layout of Beacon.
// Total size: 25 + 1?status + chars(site) * charWidth + len(readings) * 4 + 8?spare + chars(note) * charWidth.
pub struct BeaconCheckedCodec;

impl BeaconCheckedCodec {
    pub fn encode(value: &Beacon) -> ::flatlay::Result<::std::vec::Vec<u8>> {
        let mut buffer = ::std::vec![0u8; Self::encoded_len(value)?];
        let written = Self::write(value, &mut buffer)?;
        buffer.truncate(written);
        Ok(buffer)
    }

    pub fn encoded_len(value: &Beacon) -> ::flatlay::Result<usize> {
        let mut size = 25usize;
        size += ::flatlay::wire::presence_len(&value.status, "status", 1)?;
        size += ::flatlay::wire::text_len(&value.site, "site", false, ::flatlay::StringEncoding::Utf8)?;
        size += ::flatlay::wire::elements_len(&value.readings, "readings", false, 4)?;
        size += ::flatlay::wire::presence_len(&value.spare, "spare", 8)?;
        size += ::flatlay::wire::text_len(&value.note, "note", true, ::flatlay::StringEncoding::Utf8)?;
        Ok(size)
    }

    pub fn write(value: &Beacon, buffer: &mut [u8]) -> ::flatlay::Result<usize> {
        let mut cursor = ::flatlay::wire::Cursor::new();
        ::flatlay::wire::checked::write_scalar(buffer, &mut cursor, "seq", &value.seq, 8)?;
        ::flatlay::wire::checked::write_scalar(buffer, &mut cursor, "type", &value.r#type, 2)?;
        ::flatlay::wire::checked::write_scalar(buffer, &mut cursor, "level", &value.level, 1)?;
        ::flatlay::wire::checked::write_flagged(buffer, &mut cursor, "status", &value.status, 1)?;
        ::flatlay::wire::checked::write_text(buffer, &mut cursor, "site", &value.site, false, ::flatlay::StringEncoding::Utf8)?;
        ::flatlay::wire::checked::write_elements(buffer, &mut cursor, "readings", &value.readings, false, 4)?;
        ::flatlay::wire::checked::write_flagged(buffer, &mut cursor, "spare", &value.spare, 8)?;
        ::flatlay::wire::checked::write_text(buffer, &mut cursor, "note", &value.note, true, ::flatlay::StringEncoding::Utf8)?;
        Ok(cursor.position())
    }

    pub fn decode(buffer: &[u8]) -> ::flatlay::Result<Beacon> {
        Self::read(buffer).map(|(value, _)| value)
    }

    pub fn read(buffer: &[u8]) -> ::flatlay::Result<(Beacon, usize)> {
        let mut cursor = ::flatlay::wire::Cursor::new();
        let mut value = <Beacon as ::core::default::Default>::default();
        ::flatlay::wire::checked::read_scalar(buffer, &mut cursor, "seq", &mut value.seq, 8)?;
        ::flatlay::wire::checked::read_scalar(buffer, &mut cursor, "type", &mut value.r#type, 2)?;
        ::flatlay::wire::checked::read_scalar(buffer, &mut cursor, "level", &mut value.level, 1)?;
        ::flatlay::wire::checked::read_flagged(buffer, &mut cursor, "status", &mut value.status, 1)?;
        ::flatlay::wire::checked::read_text(buffer, &mut cursor, "site", &mut value.site, false, ::flatlay::StringEncoding::Utf8)?;
        ::flatlay::wire::checked::read_elements(buffer, &mut cursor, "readings", &mut value.readings, false, 4)?;
        ::flatlay::wire::checked::read_flagged(buffer, &mut cursor, "spare", &mut value.spare, 8)?;
        ::flatlay::wire::checked::read_text(buffer, &mut cursor, "note", &mut value.note, true, ::flatlay::StringEncoding::Utf8)?;
        Ok((value, cursor.position()))
    }
}
