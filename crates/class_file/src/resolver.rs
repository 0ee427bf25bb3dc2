use crate::{
    constant_pool::{ClassInfo, CpInfo, NameAndTypeInfo, RefInfo},
    AccessFlags, ClassFile, FieldInfo, MethodInfo,
};

/// A resolved Fieldref, Methodref or InterfaceMethodref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// An InnerClasses entry with its indices resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerClassInfo<'a> {
    pub inner_class: &'a str,
    pub outer_class: Option<&'a str>,
    /// `None` for anonymous classes.
    pub inner_name: Option<&'a str>,
    pub access_flags: AccessFlags,
}

/// Read-only view over a parsed class that turns pool indices into names.
/// Every lookup yields `None` on an invalid index; the problem itself was
/// already reported when the class was parsed.
#[derive(Debug, Clone, Copy)]
pub struct SymbolResolver<'a> {
    class_file: &'a ClassFile,
}

impl<'a> SymbolResolver<'a> {
    pub fn new(class_file: &'a ClassFile) -> Self {
        Self { class_file }
    }

    pub fn resolve_class_name(&self, index: u16) -> Option<&'a str> {
        self.class_file.constant_pool.class_name(index)
    }

    pub fn resolve_name_and_type(&self, index: u16) -> Option<(&'a str, &'a str)> {
        let pool = &self.class_file.constant_pool;
        let NameAndTypeInfo {
            name_index,
            descriptor_index,
        } = cp_info!(pool, index, NameAndType)?;
        Some((pool.utf8(*name_index)?, pool.utf8(*descriptor_index)?))
    }

    /// Accepts both Methodref and InterfaceMethodref entries.
    pub fn resolve_method_ref(&self, index: u16) -> Option<MemberRef<'a>> {
        match self.class_file.constant_pool.get(index)? {
            CpInfo::MethodRef(ref_info) | CpInfo::InterfaceMethodRef(ref_info) => {
                self.resolve_ref_info(ref_info)
            }
            _ => None,
        }
    }

    pub fn resolve_field_ref(&self, index: u16) -> Option<MemberRef<'a>> {
        let ref_info = cp_info!(self.class_file.constant_pool, index, FieldRef)?;
        self.resolve_ref_info(ref_info)
    }

    fn resolve_ref_info(&self, ref_info: &RefInfo) -> Option<MemberRef<'a>> {
        let owner = self.resolve_class_name(ref_info.class_index)?;
        let (name, descriptor) = self.resolve_name_and_type(ref_info.name_and_type_index)?;
        Some(MemberRef {
            owner,
            name,
            descriptor,
        })
    }

    pub fn resolve_string(&self, index: u16) -> Option<&'a str> {
        match self.class_file.constant_pool.get(index)? {
            CpInfo::String { string_index } => self.class_file.constant_pool.utf8(*string_index),
            _ => None,
        }
    }

    pub fn this_class_name(&self) -> Option<&'a str> {
        self.resolve_class_name(self.class_file.this_class)
    }

    pub fn super_class_name(&self) -> Option<&'a str> {
        match self.class_file.super_class {
            0 => None,
            index => self.resolve_class_name(index),
        }
    }

    /// Unresolvable interfaces are skipped.
    pub fn interface_names(&self) -> Vec<&'a str> {
        self.class_file
            .interfaces
            .iter()
            .filter_map(|&index| self.resolve_class_name(index))
            .collect()
    }

    pub fn field_name(&self, field: &FieldInfo) -> Option<&'a str> {
        self.class_file.constant_pool.utf8(field.name_index)
    }

    pub fn field_descriptor(&self, field: &FieldInfo) -> Option<&'a str> {
        self.class_file.constant_pool.utf8(field.descriptor_index)
    }

    pub fn method_name(&self, method: &MethodInfo) -> Option<&'a str> {
        self.class_file.constant_pool.utf8(method.name_index)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Option<&'a str> {
        self.class_file.constant_pool.utf8(method.descriptor_index)
    }

    /// Names of every Class entry in the pool other than this class, sorted
    /// and without duplicates. Array classes are included as written.
    pub fn referenced_classes(&self) -> Vec<&'a str> {
        let pool = &self.class_file.constant_pool;
        let this_class = self.this_class_name();

        let mut names = pool
            .iter()
            .filter_map(|(_, cp_info)| match cp_info {
                CpInfo::Class(ClassInfo { name_index }) => pool.utf8(*name_index),
                _ => None,
            })
            .filter(|&name| Some(name) != this_class)
            .collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Resolved entries of the class's InnerClasses attribute; empty when it
    /// is missing or could not be decoded.
    pub fn inner_classes(&self) -> Vec<InnerClassInfo<'a>> {
        let entries = match self.class_file.attributes.inner_classes() {
            Some(entries) => entries,
            None => return Vec::new(),
        };

        entries
            .iter()
            .filter_map(|entry| {
                let outer_class = match entry.outer_class_info_index {
                    0 => None,
                    index => Some(self.resolve_class_name(index)?),
                };
                let inner_name = match entry.inner_name_index {
                    0 => None,
                    index => Some(self.class_file.constant_pool.utf8(index)?),
                };

                Some(InnerClassInfo {
                    inner_class: self.resolve_class_name(entry.inner_class_info_index)?,
                    outer_class,
                    inner_name,
                    access_flags: entry.inner_class_access_flags,
                })
            })
            .collect()
    }
}
