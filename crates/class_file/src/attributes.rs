mod decoders;
mod registry;

use std::{any::Any, fmt};

pub use registry::{
    standard_registry, AttributeDecoder, AttributeLocation, AttributeRegistry, DecodeContext,
    DecodeError,
};

use crate::{
    constant_pool::Expect,
    diagnostics::Site,
    reader::{ByteReader, ReadError},
    AccessFlags,
};

/// A named, length-prefixed record attached to a class, field, method, code
/// attribute or record component. The raw bytes are always kept, whether or
/// not a decoder understood them.
pub struct Attribute {
    pub attribute_name_index: u16,
    /// The name, when `attribute_name_index` is a Utf8 entry.
    pub name: Option<String>,
    /// Offset of the attribute header in the parsed buffer.
    pub offset: usize,
    pub info: Vec<u8>,
    pub decoded: Option<DecodedAttribute>,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("attribute_name_index", &self.attribute_name_index)
            .field("name", &self.name)
            .field("info", &format!("({} bytes)", self.info.len()))
            .field("decoded", &self.decoded)
            .finish()
    }
}

impl Attribute {
    fn read(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<Attribute, ReadError> {
        let offset = r.position();
        let attribute_name_index = r.read_u2()?;
        let attribute_length = r.read_u4()?;
        let mut payload = r.sub_reader(attribute_length as usize)?;

        let name = if cx.pool.check_reference(
            Site::AttributeName,
            attribute_name_index,
            Expect::Utf8,
            offset,
            cx.diagnostics,
        ) {
            cx.pool.utf8(attribute_name_index).map(str::to_owned)
        } else {
            None
        };

        let decoded = match &name {
            Some(name) => cx.decode(name, &mut payload, offset),
            None => None,
        };

        Ok(Attribute {
            attribute_name_index,
            name,
            offset,
            info: payload.as_slice().to_vec(),
            decoded,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct AttributeTable(pub Vec<Attribute>);

impl AttributeTable {
    /// Reads `count` attributes. Payloads the registry cannot decode are kept
    /// raw; only running out of data is an error.
    pub fn read(
        r: &mut ByteReader<'_>,
        cx: &mut DecodeContext<'_>,
        count: u16,
    ) -> Result<AttributeTable, ReadError> {
        let mut table = AttributeTable::default();
        table.read_into(r, cx, count)?;
        Ok(table)
    }

    /// Like [`AttributeTable::read`], but keeps the attributes read before a
    /// truncation.
    pub fn read_into(
        &mut self,
        r: &mut ByteReader<'_>,
        cx: &mut DecodeContext<'_>,
        count: u16,
    ) -> Result<(), ReadError> {
        for _ in 0..count {
            let attribute = Attribute::read(r, cx)?;
            self.0.push(attribute);
        }
        Ok(())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| a.name() == Some(name))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn decoded(&self, name: &str) -> Option<&DecodedAttribute> {
        self.find_by_name(name)?.decoded.as_ref()
    }

    pub fn code_attribute(&self) -> Option<&CodeAttribute> {
        match self.decoded("Code")? {
            DecodedAttribute::Code(code) => Some(code),
            _ => None,
        }
    }

    pub fn inner_classes(&self) -> Option<&[InnerClass]> {
        match self.decoded("InnerClasses")? {
            DecodedAttribute::InnerClasses(classes) => Some(classes),
            _ => None,
        }
    }

    pub fn source_file(&self) -> Option<u16> {
        match self.decoded("SourceFile")? {
            DecodedAttribute::SourceFile(index) => Some(*index),
            _ => None,
        }
    }

    pub fn module(&self) -> Option<&ModuleAttribute> {
        match self.decoded("Module")? {
            DecodedAttribute::Module(module) => Some(module),
            _ => None,
        }
    }

    pub fn bootstrap_methods(&self) -> Option<&[BootstrapMethod]> {
        match self.decoded("BootstrapMethods")? {
            DecodedAttribute::BootstrapMethods(methods) => Some(methods),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a AttributeTable {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug)]
pub enum DecodedAttribute {
    ConstantValue(u16),
    Code(CodeAttribute),
    Exceptions(Vec<u16>),
    InnerClasses(Vec<InnerClass>),
    EnclosingMethod(EnclosingMethod),
    Synthetic,
    Signature(u16),
    SourceFile(u16),
    LineNumberTable(Vec<LineNumber>),
    LocalVariableTable(Vec<LocalVariable>),
    LocalVariableTypeTable(Vec<LocalVariable>),
    Deprecated,
    BootstrapMethods(Vec<BootstrapMethod>),
    MethodParameters(Vec<MethodParameter>),
    Module(ModuleAttribute),
    ModulePackages(Vec<u16>),
    ModuleMainClass(u16),
    NestHost(u16),
    NestMembers(Vec<u16>),
    PermittedSubclasses(Vec<u16>),
    Record(Vec<RecordComponent>),
    /// Payload produced by a decoder registered by the caller.
    Custom(Box<dyn Any + Send + Sync>),
}

impl DecodedAttribute {
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            DecodedAttribute::Custom(payload) => payload.downcast_ref(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Debug)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: AttributeTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    pub inner_class_info_index: u16,
    /// Zero when the inner class is not a member of another class.
    pub outer_class_info_index: u16,
    /// Zero for anonymous classes.
    pub inner_name_index: u16,
    pub inner_class_access_flags: AccessFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub class_index: u16,
    pub method_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    /// Descriptor for LocalVariableTable, signature for LocalVariableTypeTable.
    pub descriptor_index: u16,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    pub bootstrap_method_ref: u16,
    pub bootstrap_arguments: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameter {
    pub name_index: u16,
    pub access_flags: AccessFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAttribute {
    pub module_name_index: u16,
    pub module_flags: u16,
    pub module_version_index: u16,
    pub requires: Vec<ModuleRequires>,
    pub exports: Vec<ModuleExports>,
    pub opens: Vec<ModuleExports>,
    pub uses: Vec<u16>,
    pub provides: Vec<ModuleProvides>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequires {
    pub requires_index: u16,
    pub requires_flags: u16,
    pub requires_version_index: u16,
}

/// An `exports` or `opens` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExports {
    pub package_index: u16,
    pub flags: u16,
    pub to_index: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProvides {
    pub provides_index: u16,
    pub provides_with_index: Vec<u16>,
}

#[derive(Debug)]
pub struct RecordComponent {
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: AttributeTable,
}
