use std::fmt;

use thiserror::Error;

use crate::{
    attributes::AttributeLocation, descriptor::DescriptorError, reader::ReadError, AccessFlags,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// Part of the class file being read when something went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Header,
    ConstantPool,
    Interfaces,
    Fields,
    Methods,
    Attributes,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Header => "header",
            Section::ConstantPool => "constant pool",
            Section::Interfaces => "interfaces",
            Section::Fields => "fields",
            Section::Methods => "methods",
            Section::Attributes => "attributes",
        })
    }
}

/// Where a constant pool reference was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Site {
    Pool(u16),
    ThisClass,
    SuperClass,
    Interface(usize),
    Field(usize),
    Method(usize),
    AttributeName,
    Attribute(String),
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Pool(index) => write!(f, "constant pool entry #{}", index),
            Site::ThisClass => f.write_str("this_class"),
            Site::SuperClass => f.write_str("super_class"),
            Site::Interface(i) => write!(f, "interface {}", i),
            Site::Field(i) => write!(f, "field {}", i),
            Site::Method(i) => write!(f, "method {}", i),
            Site::AttributeName => f.write_str("attribute name"),
            Site::Attribute(name) => write!(f, "{} attribute", name),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    #[error("{site} references #{index}, which is not a constant pool entry")]
    DanglingReference { site: Site, index: u16 },
    #[error("{site} references #{index}: expected {expected}, found {found}")]
    TypeMismatch {
        site: Site,
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
    #[error("method handle #{index} has invalid reference kind {kind}")]
    InvalidReferenceKind { index: u16, kind: u8 },
    #[error("8-byte constant #{index} has no room for its second slot")]
    WideConstantAtEnd { index: u16 },
    #[error("constant pool count is 0")]
    EmptyConstantPoolCount,
    #[error("Utf8 entry #{index} is not valid modified UTF-8")]
    InvalidUtf8 { index: u16 },
    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("malformed {name} attribute: {reason}")]
    MalformedAttribute { name: String, reason: String },
    #[error("{name} attribute is not allowed on a {location:?}")]
    MisplacedAttribute {
        name: String,
        location: AttributeLocation,
    },
    #[error("{site} has invalid descriptor {descriptor:?}: {source}")]
    InvalidDescriptor {
        site: Site,
        descriptor: String,
        source: DescriptorError,
    },
    #[error("{site} has conflicting access flags {flags:?}")]
    ConflictingAccessFlags { site: Site, flags: AccessFlags },
    #[error("{site} duplicates {name}{descriptor}")]
    DuplicateMember {
        site: Site,
        name: String,
        descriptor: String,
    },
    #[error("class {0} has no super class")]
    MissingSuperClass(String),
    #[error("truncated {section}: {source}")]
    UnexpectedEndOfData { section: Section, source: ReadError },
    #[error("{0} trailing bytes after the class attributes")]
    TrailingBytes(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub offset: usize,
}

impl Diagnostic {
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}: {}", self.severity, self.offset, self.kind)
    }
}

/// Append-only log of recoverable problems found while parsing.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, severity: Severity, kind: DiagnosticKind, offset: usize) {
        log::debug!("{} at offset {}: {}", severity, offset, kind);
        self.0.push(Diagnostic {
            severity,
            kind,
            offset,
        });
    }

    pub fn warn(&mut self, kind: DiagnosticKind, offset: usize) {
        self.add(Severity::Warning, kind, offset)
    }

    pub fn error(&mut self, kind: DiagnosticKind, offset: usize) {
        self.add(Severity::Error, kind, offset)
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
