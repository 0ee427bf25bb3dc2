use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    attributes::AttributeTable, class_file::MemberInfo, ClassFile, ConstantPool, CpInfo,
};

type Endian = BigEndian;

/// Encodes a [`ClassFile`] back into the class file format.
///
/// Attributes are written from their raw bytes, so a parsed class is written
/// back unchanged as long as its strings survive modified UTF-8 decoding.
pub struct ClassWriter;

impl ClassWriter {
    pub fn write(class_file: &ClassFile) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        Self::write_to(class_file, &mut buf)?;
        Ok(buf)
    }

    pub fn write_to<W: Write>(class_file: &ClassFile, mut w: W) -> io::Result<()> {
        w.write_u32::<Endian>(class_file.magic)?;
        w.write_u16::<Endian>(class_file.minor_version)?;
        w.write_u16::<Endian>(class_file.major_version)?;

        write_constant_pool(&mut w, &class_file.constant_pool)?;

        w.write_u16::<Endian>(class_file.access_flags.bits())?;
        w.write_u16::<Endian>(class_file.this_class)?;
        w.write_u16::<Endian>(class_file.super_class)?;

        write_len(&mut w, class_file.interfaces.len())?;
        for &interface in &class_file.interfaces {
            w.write_u16::<Endian>(interface)?;
        }

        for members in [&class_file.fields, &class_file.methods] {
            write_len(&mut w, members.len())?;
            for member in members {
                write_member(&mut w, member)?;
            }
        }

        write_attributes(&mut w, &class_file.attributes)
    }
}

fn write_len<W: Write>(w: &mut W, len: usize) -> io::Result<()> {
    let len = u16::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} entries do not fit in a u2 count", len),
        )
    })?;
    w.write_u16::<Endian>(len)
}

fn write_constant_pool<W: Write>(w: &mut W, pool: &ConstantPool) -> io::Result<()> {
    w.write_u16::<Endian>(pool.len())?;

    for cp_info in pool {
        if let CpInfo::Unusable = cp_info {
            continue;
        }

        w.write_u8(cp_info.tag())?;
        match cp_info {
            CpInfo::Utf8(s) => {
                let bytes = cesu8::to_java_cesu8(s);
                write_len(w, bytes.len())?;
                w.write_all(&bytes)?;
            }
            CpInfo::Integer(v) => w.write_i32::<Endian>(*v)?,
            CpInfo::Float(v) => w.write_u32::<Endian>(v.to_bits())?,
            CpInfo::Long(v) => w.write_i64::<Endian>(*v)?,
            CpInfo::Double(v) => w.write_u64::<Endian>(v.to_bits())?,
            CpInfo::Class(c) => w.write_u16::<Endian>(c.name_index)?,
            CpInfo::String { string_index } => w.write_u16::<Endian>(*string_index)?,
            CpInfo::FieldRef(r) | CpInfo::MethodRef(r) | CpInfo::InterfaceMethodRef(r) => {
                w.write_u16::<Endian>(r.class_index)?;
                w.write_u16::<Endian>(r.name_and_type_index)?;
            }
            CpInfo::NameAndType(nat) => {
                w.write_u16::<Endian>(nat.name_index)?;
                w.write_u16::<Endian>(nat.descriptor_index)?;
            }
            CpInfo::MethodHandle(h) => {
                w.write_u8(h.reference_kind)?;
                w.write_u16::<Endian>(h.reference_index)?;
            }
            CpInfo::MethodType(t) => w.write_u16::<Endian>(t.descriptor_index)?,
            CpInfo::Dynamic(d) | CpInfo::InvokeDynamic(d) => {
                w.write_u16::<Endian>(d.bootstrap_method_attr_index)?;
                w.write_u16::<Endian>(d.name_and_type_index)?;
            }
            CpInfo::Module { name_index } | CpInfo::Package { name_index } => {
                w.write_u16::<Endian>(*name_index)?
            }
            CpInfo::Unusable => {}
        }
    }
    Ok(())
}

fn write_member<W: Write>(w: &mut W, member: &MemberInfo) -> io::Result<()> {
    w.write_u16::<Endian>(member.access_flags.bits())?;
    w.write_u16::<Endian>(member.name_index)?;
    w.write_u16::<Endian>(member.descriptor_index)?;
    write_attributes(w, &member.attributes)
}

fn write_attributes<W: Write>(w: &mut W, attributes: &AttributeTable) -> io::Result<()> {
    write_len(w, attributes.len())?;
    for attribute in attributes {
        w.write_u16::<Endian>(attribute.attribute_name_index)?;
        w.write_u32::<Endian>(attribute.info.len() as u32)?;
        w.write_all(&attribute.info)?;
    }
    Ok(())
}
