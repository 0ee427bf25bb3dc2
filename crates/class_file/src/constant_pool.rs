use std::fmt;

use crate::{
    diagnostics::{DiagnosticKind, Diagnostics, Section, Site},
    reader::ByteReader,
    ClassFileError, Result,
};

/// Looks up `$index` in the pool and yields the payload of variant `$i`, or
/// `None` for any other entry.
macro_rules! cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.get($index) {
            Some($crate::constant_pool::CpInfo::$i(n)) => Some(n),
            _ => None,
        }
    };
}

/// The class file's symbol table. Indices are 1-based; a Long or Double
/// occupies two slots and the second one is never a valid entry.
#[derive(Debug, Default, Clone)]
pub struct ConstantPool {
    count: u16,
    cp_infos: Vec<CpInfo>,
    offsets: Vec<usize>,
}

impl ConstantPool {
    pub fn new(cp_infos: Vec<CpInfo>) -> Self {
        let offsets = vec![0; cp_infos.len()];
        Self {
            count: (cp_infos.len() + 1) as u16,
            cp_infos,
            offsets,
        }
    }

    /// Reads the `count - 1` slots that follow the constant pool count.
    /// References between entries are not checked here; see
    /// [`ConstantPool::validate`].
    pub fn build(
        r: &mut ByteReader<'_>,
        count: u16,
        diagnostics: &mut Diagnostics,
    ) -> Result<ConstantPool> {
        if count == 0 {
            diagnostics.error(DiagnosticKind::EmptyConstantPoolCount, r.position());
            return Ok(ConstantPool::default());
        }

        let declared = count;
        let count = count as u32;
        let mut cp_infos = Vec::with_capacity(count as usize - 1);
        let mut offsets = Vec::with_capacity(count as usize - 1);
        let mut index = 1u32;
        while index < count {
            let offset = r.position();
            let (cp_info, slot_size) = parse_cp_info(r, index as u16, diagnostics)?;
            cp_infos.push(cp_info);
            offsets.push(offset);

            if slot_size == 2 {
                if index + 1 < count {
                    cp_infos.push(CpInfo::Unusable);
                    offsets.push(offset);
                } else {
                    diagnostics.error(
                        DiagnosticKind::WideConstantAtEnd {
                            index: index as u16,
                        },
                        offset,
                    );
                }
            }

            index += slot_size;
        }

        log::trace!("read {} constant pool slots", cp_infos.len());
        Ok(ConstantPool {
            count: declared,
            cp_infos,
            offsets,
        })
    }

    /// Checks every reference between entries, recording one diagnostic per
    /// reference that does not resolve to an entry of the expected kind.
    pub fn validate(&self, diagnostics: &mut Diagnostics) {
        for (index, cp_info) in self.iter() {
            let offset = self.offset_of(index).unwrap_or_default();

            if let CpInfo::MethodHandle(MethodHandleInfo { reference_kind, .. }) = cp_info {
                if !(1..=9).contains(reference_kind) {
                    diagnostics.error(
                        DiagnosticKind::InvalidReferenceKind {
                            index,
                            kind: *reference_kind,
                        },
                        offset,
                    );
                    continue;
                }
            }

            for (target, expected) in cp_info.references() {
                self.check_reference(Site::Pool(index), target, expected, offset, diagnostics);
            }
        }
    }

    /// Records a diagnostic and returns `false` when `index` does not name an
    /// entry of the expected kind.
    pub(crate) fn check_reference(
        &self,
        site: Site,
        index: u16,
        expected: Expect,
        offset: usize,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        match self.get(index) {
            Some(cp_info) if expected.matches(cp_info) => true,
            Some(cp_info) => {
                diagnostics.error(
                    DiagnosticKind::TypeMismatch {
                        site,
                        index,
                        expected: expected.name(),
                        found: cp_info.kind_name(),
                    },
                    offset,
                );
                false
            }
            None => {
                diagnostics.error(DiagnosticKind::DanglingReference { site, index }, offset);
                false
            }
        }
    }

    /// Never panics: index 0, out-of-range indices and the second slot of a
    /// Long or Double all yield `None`.
    pub fn get(&self, index: u16) -> Option<&CpInfo> {
        if index == 0 {
            return None;
        }

        match self.cp_infos.get(index as usize - 1) {
            Some(CpInfo::Unusable) | None => None,
            Some(cp_info) => Some(cp_info),
        }
    }

    /// The constant pool count as it appears in the class file. A pool read
    /// from a count of 0 keeps that count.
    pub fn len(&self) -> u16 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.cp_infos.is_empty()
    }

    /// Byte offset of the entry's tag in the parsed buffer.
    pub fn offset_of(&self, index: u16) -> Option<usize> {
        self.get(index)?;
        self.offsets.get(index as usize - 1).copied()
    }

    /// Entries with their indices, skipping the gaps after Long and Double.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpInfo)> {
        self.cp_infos
            .iter()
            .enumerate()
            .filter(|(_, cp_info)| !matches!(cp_info, CpInfo::Unusable))
            .map(|(i, cp_info)| ((i + 1) as u16, cp_info))
    }

    pub fn utf8(&self, index: u16) -> Option<&str> {
        cp_info!(self, index, Utf8).map(String::as_str)
    }

    /// Name of the Class entry at `index`.
    pub fn class_name(&self, index: u16) -> Option<&str> {
        let ClassInfo { name_index } = cp_info!(self, index, Class)?;
        self.utf8(*name_index)
    }
}

/// Iterates every slot, including the `Unusable` ones.
impl<'a> IntoIterator for &'a ConstantPool {
    type Item = &'a CpInfo;
    type IntoIter = std::slice::Iter<'a, CpInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.cp_infos.iter()
    }
}

/// Entry kinds a reference may be required to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expect {
    Utf8,
    Class,
    NameAndType,
    FieldRef,
    MethodRef,
    InterfaceMethodRef,
    AnyMethodRef,
    MethodHandle,
    Module,
    Package,
    /// Integer, Float, Long, Double or String, as ConstantValue allows.
    Constant,
    /// Anything `ldc` or a bootstrap argument may load.
    Loadable,
}

impl Expect {
    fn matches(self, cp_info: &CpInfo) -> bool {
        matches!(
            (self, cp_info),
            (Expect::Utf8, CpInfo::Utf8(_))
                | (Expect::Class, CpInfo::Class(_))
                | (Expect::NameAndType, CpInfo::NameAndType(_))
                | (Expect::FieldRef, CpInfo::FieldRef(_))
                | (Expect::MethodRef, CpInfo::MethodRef(_))
                | (Expect::InterfaceMethodRef, CpInfo::InterfaceMethodRef(_))
                | (Expect::AnyMethodRef, CpInfo::MethodRef(_))
                | (Expect::AnyMethodRef, CpInfo::InterfaceMethodRef(_))
                | (Expect::MethodHandle, CpInfo::MethodHandle(_))
                | (Expect::Module, CpInfo::Module { .. })
                | (Expect::Package, CpInfo::Package { .. })
                | (
                    Expect::Constant | Expect::Loadable,
                    CpInfo::Integer(_)
                        | CpInfo::Float(_)
                        | CpInfo::Long(_)
                        | CpInfo::Double(_)
                        | CpInfo::String { .. }
                )
                | (
                    Expect::Loadable,
                    CpInfo::Class(_)
                        | CpInfo::MethodHandle(_)
                        | CpInfo::MethodType(_)
                        | CpInfo::Dynamic(_)
                )
        )
    }

    fn name(self) -> &'static str {
        match self {
            Expect::Utf8 => "Utf8",
            Expect::Class => "Class",
            Expect::NameAndType => "NameAndType",
            Expect::FieldRef => "Fieldref",
            Expect::MethodRef => "Methodref",
            Expect::InterfaceMethodRef => "InterfaceMethodref",
            Expect::AnyMethodRef => "Methodref or InterfaceMethodref",
            Expect::MethodHandle => "MethodHandle",
            Expect::Module => "Module",
            Expect::Package => "Package",
            Expect::Constant => "constant value",
            Expect::Loadable => "loadable constant",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(ClassInfo),
    String { string_index: u16 },
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Module { name_index: u16 },
    Package { name_index: u16 },
    Unusable,
}

impl CpInfo {
    pub fn tag(&self) -> u8 {
        match self {
            CpInfo::Utf8(_) => 1,
            CpInfo::Integer(_) => 3,
            CpInfo::Float(_) => 4,
            CpInfo::Long(_) => 5,
            CpInfo::Double(_) => 6,
            CpInfo::Class(_) => 7,
            CpInfo::String { .. } => 8,
            CpInfo::FieldRef(_) => 9,
            CpInfo::MethodRef(_) => 10,
            CpInfo::InterfaceMethodRef(_) => 11,
            CpInfo::NameAndType(_) => 12,
            CpInfo::MethodHandle(_) => 15,
            CpInfo::MethodType(_) => 16,
            CpInfo::Dynamic(_) => 17,
            CpInfo::InvokeDynamic(_) => 18,
            CpInfo::Module { .. } => 19,
            CpInfo::Package { .. } => 20,
            CpInfo::Unusable => 0,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            CpInfo::Utf8(_) => "Utf8",
            CpInfo::Integer(_) => "Integer",
            CpInfo::Float(_) => "Float",
            CpInfo::Long(_) => "Long",
            CpInfo::Double(_) => "Double",
            CpInfo::Class(_) => "Class",
            CpInfo::String { .. } => "String",
            CpInfo::FieldRef(_) => "Fieldref",
            CpInfo::MethodRef(_) => "Methodref",
            CpInfo::InterfaceMethodRef(_) => "InterfaceMethodref",
            CpInfo::NameAndType(_) => "NameAndType",
            CpInfo::MethodHandle(_) => "MethodHandle",
            CpInfo::MethodType(_) => "MethodType",
            CpInfo::Dynamic(_) => "Dynamic",
            CpInfo::InvokeDynamic(_) => "InvokeDynamic",
            CpInfo::Module { .. } => "Module",
            CpInfo::Package { .. } => "Package",
            CpInfo::Unusable => "(unusable)",
        }
    }

    /// Indices this entry refers to, with the kind each must resolve to.
    pub(crate) fn references(&self) -> Vec<(u16, Expect)> {
        match self {
            CpInfo::Class(ClassInfo { name_index }) => vec![(*name_index, Expect::Utf8)],
            CpInfo::String { string_index } => vec![(*string_index, Expect::Utf8)],
            CpInfo::FieldRef(r) | CpInfo::MethodRef(r) | CpInfo::InterfaceMethodRef(r) => vec![
                (r.class_index, Expect::Class),
                (r.name_and_type_index, Expect::NameAndType),
            ],
            CpInfo::NameAndType(nat) => vec![
                (nat.name_index, Expect::Utf8),
                (nat.descriptor_index, Expect::Utf8),
            ],
            CpInfo::MethodHandle(handle) => {
                let expected = match handle.reference_kind {
                    1..=4 => Expect::FieldRef,
                    5 | 8 => Expect::MethodRef,
                    6 | 7 => Expect::AnyMethodRef,
                    9 => Expect::InterfaceMethodRef,
                    _ => return Vec::new(),
                };
                vec![(handle.reference_index, expected)]
            }
            CpInfo::MethodType(MethodTypeInfo { descriptor_index }) => {
                vec![(*descriptor_index, Expect::Utf8)]
            }
            CpInfo::Dynamic(d) | CpInfo::InvokeDynamic(d) => {
                vec![(d.name_and_type_index, Expect::NameAndType)]
            }
            CpInfo::Module { name_index } | CpInfo::Package { name_index } => {
                vec![(*name_index, Expect::Utf8)]
            }
            CpInfo::Utf8(_)
            | CpInfo::Integer(_)
            | CpInfo::Float(_)
            | CpInfo::Long(_)
            | CpInfo::Double(_)
            | CpInfo::Unusable => Vec::new(),
        }
    }

    /// Long and Double take two pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, CpInfo::Long(_) | CpInfo::Double(_))
    }
}

impl fmt::Display for CpInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpInfo::Utf8(s) => write!(f, "Utf8 {:?}", s),
            CpInfo::Integer(v) => write!(f, "Integer {}", v),
            CpInfo::Float(v) => write!(f, "Float {}", v),
            CpInfo::Long(v) => write!(f, "Long {}", v),
            CpInfo::Double(v) => write!(f, "Double {}", v),
            CpInfo::Class(c) => write!(f, "Class #{}", c.name_index),
            CpInfo::String { string_index } => write!(f, "String #{}", string_index),
            CpInfo::FieldRef(r) | CpInfo::MethodRef(r) | CpInfo::InterfaceMethodRef(r) => write!(
                f,
                "{} #{}.#{}",
                self.kind_name(),
                r.class_index,
                r.name_and_type_index
            ),
            CpInfo::NameAndType(nat) => write!(
                f,
                "NameAndType #{}:#{}",
                nat.name_index, nat.descriptor_index
            ),
            CpInfo::MethodHandle(h) => {
                write!(f, "MethodHandle {}:#{}", h.reference_kind, h.reference_index)
            }
            CpInfo::MethodType(t) => write!(f, "MethodType #{}", t.descriptor_index),
            CpInfo::Dynamic(d) | CpInfo::InvokeDynamic(d) => write!(
                f,
                "{} #{}:#{}",
                self.kind_name(),
                d.bootstrap_method_attr_index,
                d.name_and_type_index
            ),
            CpInfo::Module { name_index } | CpInfo::Package { name_index } => {
                write!(f, "{} #{}", self.kind_name(), name_index)
            }
            CpInfo::Unusable => f.write_str("(unusable)"),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassInfo {
    // The value of the name_index item must be a valid index into the constant_pool table.
    // The constant_pool entry at that index must be a CONSTANT_Utf8_info structure (§4.4.7)
    // representing a valid binary class or interface name encoded in internal form (§4.2.1).
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

/// Payload of both CONSTANT_Dynamic and CONSTANT_InvokeDynamic.
#[derive(Debug, PartialEq, Clone)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

fn parse_cp_info(
    r: &mut ByteReader<'_>,
    index: u16,
    diagnostics: &mut Diagnostics,
) -> Result<(CpInfo, u32)> {
    let offset = r.position();
    let truncated = |source| ClassFileError::Truncated {
        section: Section::ConstantPool,
        source,
    };

    let tag = r.read_u1().map_err(truncated)?;
    let cp_info = match tag {
        1 => parse_utf8(r, index, diagnostics),
        3 => r.read_i4().map(CpInfo::Integer),
        4 => r.read_u4().map(|bits| CpInfo::Float(f32::from_bits(bits))),
        5 => r.read_i8().map(CpInfo::Long),
        6 => r.read_u8().map(|bits| CpInfo::Double(f64::from_bits(bits))),
        7 => r
            .read_u2()
            .map(|name_index| CpInfo::Class(ClassInfo { name_index })),
        8 => r
            .read_u2()
            .map(|string_index| CpInfo::String { string_index }),
        9 => parse_ref_info(r).map(CpInfo::FieldRef),
        10 => parse_ref_info(r).map(CpInfo::MethodRef),
        11 => parse_ref_info(r).map(CpInfo::InterfaceMethodRef),
        12 => parse_name_and_type_info(r).map(CpInfo::NameAndType),
        15 => parse_method_handle(r).map(CpInfo::MethodHandle),
        16 => r
            .read_u2()
            .map(|descriptor_index| CpInfo::MethodType(MethodTypeInfo { descriptor_index })),
        17 => parse_dynamic_info(r).map(CpInfo::Dynamic),
        18 => parse_dynamic_info(r).map(CpInfo::InvokeDynamic),
        19 => r.read_u2().map(|name_index| CpInfo::Module { name_index }),
        20 => r.read_u2().map(|name_index| CpInfo::Package { name_index }),
        _ => return Err(ClassFileError::InvalidCpInfoTag { tag, index, offset }),
    }
    .map_err(truncated)?;

    let slot_size = if cp_info.is_wide() { 2 } else { 1 };
    Ok((cp_info, slot_size))
}

fn parse_utf8(
    r: &mut ByteReader<'_>,
    index: u16,
    diagnostics: &mut Diagnostics,
) -> std::result::Result<CpInfo, crate::ReadError> {
    let offset = r.position();
    let length = r.read_u2()?;
    let bytes = r.read_bytes(length as usize)?;

    let s = match cesu8::from_java_cesu8(bytes) {
        Ok(s) => s.into_owned(),
        Err(_) => {
            diagnostics.warn(DiagnosticKind::InvalidUtf8 { index }, offset);
            String::from_utf8_lossy(bytes).into_owned()
        }
    };

    Ok(CpInfo::Utf8(s))
}

fn parse_ref_info(r: &mut ByteReader<'_>) -> std::result::Result<RefInfo, crate::ReadError> {
    Ok(RefInfo {
        class_index: r.read_u2()?,
        name_and_type_index: r.read_u2()?,
    })
}

fn parse_name_and_type_info(
    r: &mut ByteReader<'_>,
) -> std::result::Result<NameAndTypeInfo, crate::ReadError> {
    Ok(NameAndTypeInfo {
        name_index: r.read_u2()?,
        descriptor_index: r.read_u2()?,
    })
}

fn parse_method_handle(
    r: &mut ByteReader<'_>,
) -> std::result::Result<MethodHandleInfo, crate::ReadError> {
    Ok(MethodHandleInfo {
        reference_kind: r.read_u1()?,
        reference_index: r.read_u2()?,
    })
}

fn parse_dynamic_info(
    r: &mut ByteReader<'_>,
) -> std::result::Result<DynamicInfo, crate::ReadError> {
    Ok(DynamicInfo {
        bootstrap_method_attr_index: r.read_u2()?,
        name_and_type_index: r.read_u2()?,
    })
}
