mod parser;

use std::{
    convert::TryFrom,
    fmt::{self, Debug},
};

pub use crate::JImageError;

use self::parser::{parse_archive, parse_location};

pub(crate) const HEADER_SIZE: usize = 28;

const HASH_MULTIPLIER: i32 = 0x01000193;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AttributeKind {
    Module = 1,
    Parent,
    Base,
    Extension,
    Offset,
    Compressed,
    Uncompressed,

    Total,
}

impl TryFrom<u8> for AttributeKind {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(AttributeKind::Module),
            2 => Ok(AttributeKind::Parent),
            3 => Ok(AttributeKind::Base),
            4 => Ok(AttributeKind::Extension),
            5 => Ok(AttributeKind::Offset),
            6 => Ok(AttributeKind::Compressed),
            7 => Ok(AttributeKind::Uncompressed),
            _ => Err(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: (u16, u16),
    pub flags: u32,
    pub resource_count: u32,
    pub table_length: u32,
    pub attributes_size: u32,
    pub strings_size: u32,
}

impl Header {
    pub fn index_size(&self) -> usize {
        HEADER_SIZE
            + self.redirect_table_size()
            + self.attribute_offsets_size()
            + self.attributes_size as usize
            + self.strings_size as usize
    }

    pub fn redirect_table_size(&self) -> usize {
        self.table_length as usize * std::mem::size_of::<i32>()
    }

    pub fn attribute_offsets_size(&self) -> usize {
        self.table_length as usize * std::mem::size_of::<u32>()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " Major Version:  {}", self.version.0)?;
        writeln!(f, " Minor Version:  {}", self.version.1)?;
        writeln!(f, " Flags:          {}", self.flags)?;
        writeln!(f, " Resource Count: {}", self.resource_count)?;
        writeln!(f, " Table Length:   {}", self.table_length)?;
        writeln!(f, " Offsets Size:   {}", self.attribute_offsets_size())?;
        writeln!(f, " Redirects Size: {}", self.redirect_table_size())?;
        writeln!(f, " Locations Size: {}", self.attributes_size)?;
        writeln!(f, " Strings Size:   {}", self.strings_size)?;
        writeln!(f, " Index Size:     {}", self.index_size())?;

        Ok(())
    }
}

/// The lookup tables following the header. Location and string data are
/// borrowed from the image buffer.
#[derive(Debug)]
pub struct Index<'a> {
    redirect_table: Vec<i32>,
    attribute_offsets: Vec<u32>,
    attribute_data: &'a [u8],
    strings_data: &'a [u8],
}

impl Index<'_> {
    pub fn len(&self) -> usize {
        self.attribute_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_offsets.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Location {
    pub(crate) attributes: [u64; AttributeKind::Total as usize],
}

impl Location {
    fn get(&self, kind: AttributeKind) -> u64 {
        self.attributes[kind as usize]
    }
}

/// A parsed jimage. The image is kept borrowed and resources are decoded
/// lazily from its index.
pub struct Archive<'a> {
    buf: &'a [u8],
    header: Header,
    index: Index<'a>,
    resource_data_start: usize,
}

impl<'a> Archive<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, JImageError> {
        parse_archive(buf)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn index(&self) -> &Index<'a> {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn resources(&self) -> Resources<'_> {
        Resources {
            archive: self,
            slot: 0,
        }
    }

    /// Looks `path` up through the image's perfect hash, e.g.
    /// `/java.base/java/lang/Object.class`.
    pub fn by_name(&self, path: &str) -> Option<Resource<'_>> {
        let len = self.index.redirect_table.len();
        if len == 0 {
            return None;
        }

        let slot = hash(path, HASH_MULTIPLIER) as usize % len;
        let slot = match self.index.redirect_table[slot] {
            0 => return None,
            seed if seed > 0 => hash(path, seed) as usize % len,
            value => (-1 - value as i64) as usize,
        };

        match self.resource_at(slot) {
            Ok(resource) if resource.matches(path) => Some(resource),
            Ok(_) => None,
            Err(err) => {
                log::warn!("{}: {}", path, err);
                None
            }
        }
    }

    fn resource_at(&self, slot: usize) -> Result<Resource<'_>, JImageError> {
        let offset = *self
            .index
            .attribute_offsets
            .get(slot)
            .ok_or(JImageError::InvalidLocationOffset(slot as u32))?;
        let data = self
            .index
            .attribute_data
            .get(offset as usize..)
            .ok_or(JImageError::InvalidLocationOffset(offset))?;

        Ok(Resource {
            archive: self,
            location: parse_location(data)?,
        })
    }
}

impl Debug for Archive<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("header", &self.header)
            .field("resource_data_start", &self.resource_data_start)
            .finish()
    }
}

fn hash(data: &str, seed: i32) -> i32 {
    let hash_code = data.bytes().fold(seed as u32, |useed, byte| {
        (useed.wrapping_mul(HASH_MULTIPLIER as u32)) ^ byte as u32
    });
    (hash_code & 0x7fff_ffff) as i32
}

pub struct Resources<'a> {
    archive: &'a Archive<'a>,
    slot: usize,
}

impl<'a> Iterator for Resources<'a> {
    type Item = Result<Resource<'a>, JImageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.slot >= self.archive.len() {
            return None;
        }

        let resource = self.archive.resource_at(self.slot);
        self.slot += 1;
        Some(resource)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.archive.len().saturating_sub(self.slot);
        (remaining, Some(remaining))
    }
}

pub struct Resource<'a> {
    archive: &'a Archive<'a>,
    location: Location,
}

impl fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.full_name())
            .field("attributes", &self.location.attributes)
            .finish()
    }
}

impl<'a> Resource<'a> {
    pub fn module(&self) -> &'a str {
        self.string_at(AttributeKind::Module)
    }

    pub fn parent(&self) -> &'a str {
        self.string_at(AttributeKind::Parent)
    }

    pub fn base(&self) -> &'a str {
        self.string_at(AttributeKind::Base)
    }

    pub fn extension(&self) -> &'a str {
        self.string_at(AttributeKind::Extension)
    }

    /// Offset of the payload relative to the end of the index.
    pub fn offset(&self) -> usize {
        self.location.get(AttributeKind::Offset) as usize
    }

    pub fn compressed_size(&self) -> usize {
        self.location.get(AttributeKind::Compressed) as usize
    }

    pub fn uncompressed_size(&self) -> usize {
        self.location.get(AttributeKind::Uncompressed) as usize
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed_size() != 0
    }

    pub fn is_class(&self) -> bool {
        self.extension() == "class"
    }

    pub fn bytes(&self) -> Result<&'a [u8], JImageError> {
        if self.is_compressed() {
            return Err(JImageError::CompressedResource(self.full_name()));
        }

        let offset = self.archive.resource_data_start + self.offset();
        let size = self.uncompressed_size();
        offset
            .checked_add(size)
            .and_then(|end| self.archive.buf.get(offset..end))
            .ok_or_else(|| JImageError::ResourceOutOfBounds {
                name: self.full_name(),
                offset,
                size,
            })
    }

    pub fn full_name(&self) -> String {
        let mut s = String::with_capacity(32);

        if let Some(module) = self.try_string(AttributeKind::Module) {
            s.push('/');
            s.push_str(module);
            s.push('/');
        }

        if let Some(parent) = self.try_string(AttributeKind::Parent) {
            s.push_str(parent);
            s.push('/');
        }

        if let Some(base) = self.try_string(AttributeKind::Base) {
            s.push_str(base);
        }

        if let Some(extension) = self.try_string(AttributeKind::Extension) {
            s.push('.');
            s.push_str(extension);
        }

        s
    }

    /// Compares `path` piecewise against `/module/parent/base.extension`
    /// without allocating.
    fn matches(&self, path: &str) -> bool {
        let path = match self.try_string(AttributeKind::Module) {
            Some(module) => match path
                .strip_prefix('/')
                .and_then(|p| p.strip_prefix(module))
                .and_then(|p| p.strip_prefix('/'))
            {
                Some(rest) => rest,
                None => return false,
            },
            None => path,
        };

        let path = match self.try_string(AttributeKind::Parent) {
            Some(parent) => match path
                .strip_prefix(parent)
                .and_then(|p| p.strip_prefix('/'))
            {
                Some(rest) => rest,
                None => return false,
            },
            None => path,
        };

        let path = match path.strip_prefix(self.base()) {
            Some(rest) => rest,
            None => return false,
        };

        match self.try_string(AttributeKind::Extension) {
            Some(extension) => path
                .strip_prefix('.')
                .map_or(false, |p| p == extension),
            None => path.is_empty(),
        }
    }

    fn string_at(&self, kind: AttributeKind) -> &'a str {
        self.try_string(kind).unwrap_or_default()
    }

    fn try_string(&self, kind: AttributeKind) -> Option<&'a str> {
        let offset = self.location.get(kind) as usize;
        let bytes = self
            .archive
            .index
            .strings_data
            .get(offset..)?
            .split(|n| *n == 0)
            .next()?;

        if bytes.is_empty() {
            return None;
        }

        std::str::from_utf8(bytes).ok()
    }
}
