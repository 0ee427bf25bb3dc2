use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JImageError {
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Truncated {what} at offset {offset}")]
    Truncated { what: &'static str, offset: usize },
    #[error("Invalid attribute kind: {0}")]
    InvalidAttributeKind(u8),
    #[error("Location offset {0} is outside the attribute data")]
    InvalidLocationOffset(u32),
    #[error("Resource {0} is compressed")]
    CompressedResource(String),
    #[error("Resource {name} ({size} bytes at {offset}) lies outside the image")]
    ResourceOutOfBounds {
        name: String,
        offset: usize,
        size: usize,
    },
}
