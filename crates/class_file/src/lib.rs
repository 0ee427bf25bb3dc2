// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

#[macro_use]
mod constant_pool;

mod access_flags;
pub mod attributes;
mod class_file;
pub mod descriptor;
mod diagnostics;
mod error;
mod parser;
mod reader;
mod resolver;
mod writer;

pub use self::class_file::{ClassFile, FieldInfo, MemberInfo, MethodInfo};
pub use access_flags::AccessFlags;
pub use attributes::{
    standard_registry, Attribute, AttributeDecoder, AttributeLocation, AttributeRegistry,
    AttributeTable, DecodedAttribute,
};
pub use constant_pool::{
    ClassInfo, ConstantPool, CpInfo, DynamicInfo, MethodHandleInfo, MethodTypeInfo,
    NameAndTypeInfo, RefInfo,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Section, Severity, Site};
pub use error::ClassFileError;
pub use parser::{ParseState, Parser};
pub use reader::{ByteReader, ReadError};
pub use resolver::{InnerClassInfo, MemberRef, SymbolResolver};
pub use writer::ClassWriter;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;

pub const MAGIC: u32 = 0xCAFE_BABE;

/// Newest major version this crate knows about (Java 25).
pub const MAX_MAJOR_VERSION: u16 = 69;
