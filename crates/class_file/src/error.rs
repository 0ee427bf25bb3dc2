use thiserror::Error;

use crate::{diagnostics::Section, reader::ReadError};

/// Problems that leave nothing worth returning. Everything else is recorded
/// in [`crate::Diagnostics`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassFileError {
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Truncated {section}: {source}")]
    Truncated {
        section: Section,
        #[source]
        source: ReadError,
    },
    #[error("Invalid cp info tag {tag} for entry #{index} at offset {offset}")]
    InvalidCpInfoTag { tag: u8, index: u16, offset: usize },
}

impl ClassFileError {
    /// Byte offset the error refers to.
    pub fn offset(&self) -> usize {
        match self {
            ClassFileError::InvalidMagicIdentifier(_) => 0,
            ClassFileError::Truncated {
                source: ReadError::UnexpectedEndOfData { offset, .. },
                ..
            } => *offset,
            ClassFileError::InvalidCpInfoTag { offset, .. } => *offset,
        }
    }
}
