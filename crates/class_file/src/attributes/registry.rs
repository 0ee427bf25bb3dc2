use std::{collections::HashMap, fmt, mem};

use bitflags::bitflags;
use lazy_static::lazy_static;
use thiserror::Error;

use super::{decoders, DecodedAttribute};
use crate::{
    constant_pool::ConstantPool,
    diagnostics::{DiagnosticKind, Diagnostics},
    reader::{ByteReader, ReadError},
};

bitflags! {
    /// Structures an attribute can be attached to.
    pub struct AttributeLocation: u8 {
        const CLASS = 0x01;
        const FIELD = 0x02;
        const METHOD = 0x04;
        const CODE = 0x08;
        const RECORD_COMPONENT = 0x10;
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("{0}")]
    Invalid(String),
}

/// Decodes the payload of one attribute kind.
///
/// Decoders are shared between threads parsing different buffers, so they
/// must not keep per-parse state.
pub trait AttributeDecoder: Send + Sync {
    fn locations(&self) -> AttributeLocation {
        AttributeLocation::all()
    }

    /// `r` covers exactly the attribute's payload.
    fn decode(
        &self,
        r: &mut ByteReader<'_>,
        cx: &mut DecodeContext<'_>,
    ) -> Result<DecodedAttribute, DecodeError>;
}

pub(super) type DecodeFn =
    fn(&mut ByteReader<'_>, &mut DecodeContext<'_>) -> Result<DecodedAttribute, DecodeError>;

pub(super) struct StandardDecoder {
    pub(super) locations: AttributeLocation,
    pub(super) decode: DecodeFn,
}

impl AttributeDecoder for StandardDecoder {
    fn locations(&self) -> AttributeLocation {
        self.locations
    }

    fn decode(
        &self,
        r: &mut ByteReader<'_>,
        cx: &mut DecodeContext<'_>,
    ) -> Result<DecodedAttribute, DecodeError> {
        (self.decode)(r, cx)
    }
}

/// Maps attribute names to decoders. Built before parsing starts and only
/// read afterwards.
#[derive(Default)]
pub struct AttributeRegistry {
    decoders: HashMap<String, Box<dyn AttributeDecoder>>,
}

impl AttributeRegistry {
    /// An empty registry: every attribute is kept raw.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with decoders for the standard attributes of JVMS §4.7.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        decoders::register_standard(&mut registry);
        registry
    }

    /// Adds or replaces the decoder for `name`, returning the previous one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        decoder: impl AttributeDecoder + 'static,
    ) -> Option<Box<dyn AttributeDecoder>> {
        self.decoders.insert(name.into(), Box::new(decoder))
    }

    pub fn with(
        mut self,
        name: impl Into<String>,
        decoder: impl AttributeDecoder + 'static,
    ) -> Self {
        self.register(name, decoder);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn AttributeDecoder> {
        self.decoders.get(name).map(|d| d.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }
}

impl fmt::Debug for AttributeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names().collect::<Vec<_>>();
        names.sort_unstable();
        f.debug_struct("AttributeRegistry")
            .field("decoders", &names)
            .finish()
    }
}

lazy_static! {
    static ref STANDARD_REGISTRY: AttributeRegistry = AttributeRegistry::standard();
}

/// The shared registry used by [`crate::ClassFile::parse`].
pub fn standard_registry() -> &'static AttributeRegistry {
    &STANDARD_REGISTRY
}

/// State available to decoders: the finished constant pool, the registry
/// (for nested attribute tables) and the diagnostics of the current parse.
pub struct DecodeContext<'a> {
    pub pool: &'a ConstantPool,
    pub location: AttributeLocation,
    registry: &'a AttributeRegistry,
    pub(crate) diagnostics: &'a mut Diagnostics,
}

impl<'a> DecodeContext<'a> {
    pub fn new(
        pool: &'a ConstantPool,
        registry: &'a AttributeRegistry,
        location: AttributeLocation,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            pool,
            location,
            registry,
            diagnostics,
        }
    }

    /// Runs `f` with the location switched, e.g. for the attributes nested in
    /// a Code attribute.
    pub fn nested<T>(&mut self, location: AttributeLocation, f: impl FnOnce(&mut Self) -> T) -> T {
        let outer = mem::replace(&mut self.location, location);
        let result = f(self);
        self.location = outer;
        result
    }

    pub(super) fn decode(
        &mut self,
        name: &str,
        payload: &mut ByteReader<'_>,
        offset: usize,
    ) -> Option<DecodedAttribute> {
        let registry = self.registry;
        let decoder = registry.get(name)?;

        if !decoder.locations().contains(self.location) {
            self.diagnostics.warn(
                DiagnosticKind::MisplacedAttribute {
                    name: name.to_owned(),
                    location: self.location,
                },
                offset,
            );
            return None;
        }

        let malformed = |reason: String| DiagnosticKind::MalformedAttribute {
            name: name.to_owned(),
            reason,
        };

        match decoder.decode(payload, self) {
            Ok(decoded) if payload.remaining() == 0 => Some(decoded),
            Ok(_) => {
                let reason = format!("{} bytes left undecoded", payload.remaining());
                self.diagnostics.warn(malformed(reason), offset);
                None
            }
            Err(e) => {
                self.diagnostics.warn(malformed(e.to_string()), offset);
                None
            }
        }
    }
}
