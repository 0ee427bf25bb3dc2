use crate::{
    attributes::{AttributeRegistry, AttributeTable},
    parser::Parser,
    resolver::SymbolResolver,
    AccessFlags, ConstantPool, Diagnostics, Result,
};

/// An in-memory class file. Never mutated after parsing; indices are kept as
/// they appear in the file and resolved through [`SymbolResolver`].
#[derive(Debug)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    /// Zero only for `java/lang/Object` and module descriptors.
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: AttributeTable,
}

impl ClassFile {
    /// Parses `buf` with the standard attribute decoders.
    ///
    /// `Err` is only returned when not even the header could be read; any
    /// other problem is reported in the returned [`Diagnostics`].
    pub fn parse(buf: &[u8]) -> Result<(ClassFile, Diagnostics)> {
        Self::parse_with(buf, crate::standard_registry())
    }

    pub fn parse_with(
        buf: &[u8],
        registry: &AttributeRegistry,
    ) -> Result<(ClassFile, Diagnostics)> {
        let mut parser = Parser::with_registry(buf, registry);
        let class_file = parser.parse()?;
        Ok((class_file, parser.into_diagnostics()))
    }

    pub fn resolver(&self) -> SymbolResolver<'_> {
        SymbolResolver::new(self)
    }

    pub fn class_name(&self) -> Option<&str> {
        self.resolver().this_class_name()
    }

    /// `None` when there is no super class or the index does not resolve.
    pub fn super_class(&self) -> Option<&str> {
        self.resolver().super_class_name()
    }

    pub fn field_name(&self, field: &FieldInfo) -> Option<&str> {
        self.constant_pool.utf8(field.name_index)
    }

    pub fn field_descriptor(&self, field: &FieldInfo) -> Option<&str> {
        self.constant_pool.utf8(field.descriptor_index)
    }

    pub fn method_name(&self, method: &MethodInfo) -> Option<&str> {
        self.constant_pool.utf8(method.name_index)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Option<&str> {
        self.constant_pool.utf8(method.descriptor_index)
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| {
            self.method_name(m) == Some(name) && self.method_descriptor(m) == Some(descriptor)
        })
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(AccessFlags::INTERFACE)
    }

    pub fn is_module(&self) -> bool {
        self.access_flags.contains(AccessFlags::MODULE)
    }
}

/// A `field_info` or `method_info` record; both share the same layout.
#[derive(Debug)]
pub struct MemberInfo {
    /// Offset of the record in the parsed buffer.
    pub offset: usize,
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: AttributeTable,
}

pub type FieldInfo = MemberInfo;
pub type MethodInfo = MemberInfo;
