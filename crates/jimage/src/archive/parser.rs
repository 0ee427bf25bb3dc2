use std::{io::Cursor, marker::PhantomData};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};

use crate::{
    archive::{AttributeKind, Header, Index, Location, HEADER_SIZE},
    Archive, JImageError,
};

const MAGIC: u32 = 0xCAFEDADA;

/// Images are written in the byte order of the platform that built them, so
/// the order is taken from the magic identifier.
pub(crate) fn parse_archive(buf: &[u8]) -> Result<Archive<'_>, JImageError> {
    let magic = buf.get(..4).ok_or(JImageError::Truncated {
        what: "magic identifier",
        offset: 0,
    })?;

    if LittleEndian::read_u32(magic) == MAGIC {
        Parser::<LittleEndian>::new(buf).parse_archive()
    } else if BigEndian::read_u32(magic) == MAGIC {
        Parser::<BigEndian>::new(buf).parse_archive()
    } else {
        Err(JImageError::InvalidMagicIdentifier(BigEndian::read_u32(magic)))
    }
}

pub(crate) struct Parser<'a, E: ByteOrder> {
    r: Cursor<&'a [u8]>,
    phantom: PhantomData<E>,
}

impl<'a, E: ByteOrder> Parser<'a, E> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            r: Cursor::new(buf),
            phantom: PhantomData,
        }
    }

    fn parse_archive(mut self) -> Result<Archive<'a>, JImageError> {
        let header = self.parse_header()?;
        let index = self.parse_index(&header)?;
        let resource_data_start = self.r.position() as usize;
        log::debug!(
            "jimage {}.{}: {} resources, resource data at {}",
            header.version.0,
            header.version.1,
            header.resource_count,
            resource_data_start
        );

        Ok(Archive {
            buf: self.r.into_inner(),
            header,
            index,
            resource_data_start,
        })
    }

    fn parse_header(&mut self) -> Result<Header, JImageError> {
        self.parse_magic_identifier()?;
        let version = self.parse_version()?;
        let flags = self.read_u32("header")?;
        let resource_count = self.read_u32("header")?;
        let table_length = self.read_u32("header")?;
        let attributes_size = self.read_u32("header")?;
        let strings_size = self.read_u32("header")?;
        debug_assert_eq!(self.r.position() as usize, HEADER_SIZE);

        Ok(Header {
            version,
            flags,
            resource_count,
            table_length,
            attributes_size,
            strings_size,
        })
    }

    fn parse_index(&mut self, header: &Header) -> Result<Index<'a>, JImageError> {
        let table_length = header.table_length as usize;
        self.ensure(header.redirect_table_size() + header.attribute_offsets_size(), "index")?;

        let mut redirect_table = vec![0i32; table_length];
        self.r
            .read_i32_into::<E>(&mut redirect_table)
            .map_err(|_| self.truncated("redirect table"))?;

        let mut attribute_offsets = vec![0u32; table_length];
        self.r
            .read_u32_into::<E>(&mut attribute_offsets)
            .map_err(|_| self.truncated("attribute offsets"))?;

        let attribute_data = self.read_bytes(header.attributes_size as usize, "locations")?;
        let strings_data = self.read_bytes(header.strings_size as usize, "strings")?;

        Ok(Index {
            redirect_table,
            attribute_offsets,
            attribute_data,
            strings_data,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<(), JImageError> {
        match self.read_u32("magic identifier")? {
            MAGIC => Ok(()),
            magic_identifier => Err(JImageError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    /// The version is one word with the major version in the high half.
    fn parse_version(&mut self) -> Result<(u16, u16), JImageError> {
        let version = self.read_u32("version")?;
        Ok(((version >> 16) as u16, version as u16))
    }

    fn read_bytes(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], JImageError> {
        self.ensure(n, what)?;
        let start = self.r.position() as usize;
        let buf: &'a [u8] = *self.r.get_ref();
        self.r.set_position((start + n) as u64);
        Ok(&buf[start..start + n])
    }

    fn ensure(&self, n: usize, what: &'static str) -> Result<(), JImageError> {
        let remaining = self.r.get_ref().len() - self.r.position() as usize;
        if n > remaining {
            Err(self.truncated(what))
        } else {
            Ok(())
        }
    }

    fn truncated(&self, what: &'static str) -> JImageError {
        JImageError::Truncated {
            what,
            offset: self.r.position() as usize,
        }
    }

    fn read_u32(&mut self, what: &'static str) -> Result<u32, JImageError> {
        self.ensure(4, what)?;
        self.r.read_u32::<E>().map_err(|_| self.truncated(what))
    }
}

/// Decodes the attribute stream of one location. Values are big-endian
/// regardless of the image's byte order.
pub(crate) fn parse_location(data: &[u8]) -> Result<Location, JImageError> {
    let mut r = Cursor::new(data);
    let mut attributes = [0; AttributeKind::Total as usize];
    while let Some((kind, value)) = parse_attribute(&mut r)? {
        attributes[kind as usize] = value;
    }

    Ok(Location { attributes })
}

fn parse_attribute(r: &mut Cursor<&[u8]>) -> Result<Option<(AttributeKind, u64)>, JImageError> {
    let truncated = |r: &Cursor<&[u8]>| JImageError::Truncated {
        what: "location attribute",
        offset: r.position() as usize,
    };

    let header_byte = r.read_u8().map_err(|_| truncated(&*r))?;
    let kind = header_byte >> 3;
    let length = header_byte as usize & 0x7;

    if kind == 0 {
        return Ok(None);
    }

    let kind = AttributeKind::try_from(kind).map_err(JImageError::InvalidAttributeKind)?;

    let mut value = 0u64;
    for _ in 0..=length {
        let b = r.read_u8().map_err(|_| truncated(&*r))?;
        value = value << 8 | b as u64;
    }

    Ok(Some((kind, value)))
}

#[cfg(test)]
mod parse_magic_identifier_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_the_correct_identifier() {
        assert!(Parser::<LittleEndian>::new(&[0xda, 0xda, 0xfe, 0xca])
            .parse_magic_identifier()
            .is_ok());
        assert!(Parser::<BigEndian>::new(&[0xca, 0xfe, 0xda, 0xda])
            .parse_magic_identifier()
            .is_ok());
    }

    #[test]
    fn it_should_fail_if_there_is_not_enough_data() {
        assert_eq!(
            Parser::<LittleEndian>::new(&[0xca, 0xfe, 0xda]).parse_magic_identifier(),
            Err(JImageError::Truncated {
                what: "magic identifier",
                offset: 0
            })
        );
        assert!(parse_archive(&[0xda, 0xda]).is_err());
    }

    #[test]
    fn it_should_fail_if_the_magic_identifier_is_incorrect() {
        assert_eq!(
            parse_archive(&[0xca, 0xfe, 0xba, 0xbe]).err(),
            Some(JImageError::InvalidMagicIdentifier(0xcafebabe))
        );
    }
}

#[cfg(test)]
mod parse_version_tests {
    use super::*;

    #[test]
    fn it_should_follow_the_byte_order_for_the_version() {
        assert_eq!(
            Parser::<BigEndian>::new(&[0x00, 0x01, 0x00, 0x02])
                .parse_version()
                .unwrap(),
            (1, 2)
        );
    }

    #[test]
    fn it_should_be_able_to_parse_a_version() {
        assert_eq!(
            Parser::<LittleEndian>::new(&[0x34, 0x12, 0x78, 0x56])
                .parse_version()
                .unwrap(),
            (0x5678, 0x1234)
        );
    }
}

#[cfg(test)]
mod parse_attribute_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_an_attribute() {
        assert_eq!(
            parse_attribute(&mut Cursor::new(&[0x22, 0x03, 0x35, 0x62][..])).unwrap(),
            Some((AttributeKind::Extension, 0x33562))
        );
    }

    #[test]
    fn it_should_fail_if_there_are_not_enough_bytes_read() {
        assert!(parse_attribute(&mut Cursor::new(&[0x22, 0x03, 0x35][..])).is_err());
    }

    #[test]
    fn it_should_reject_unknown_kinds() {
        assert_eq!(
            parse_location(&[0x48, 0x01, 0x00]).err(),
            Some(JImageError::InvalidAttributeKind(9))
        );
    }

    #[test]
    fn it_should_stop_at_the_end_marker() {
        let location = parse_location(&[0x08, 0x05, 0x28, 0x10, 0x00, 0x18, 0x07]).unwrap();
        assert_eq!(location.attributes[AttributeKind::Module as usize], 5);
        assert_eq!(location.attributes[AttributeKind::Offset as usize], 16);
        assert_eq!(location.attributes[AttributeKind::Base as usize], 0);
    }
}
