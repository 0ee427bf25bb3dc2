#![allow(dead_code)]

use byteorder::{BigEndian, WriteBytesExt};

type Endian = BigEndian;

pub fn init() {
    let _ = pretty_env_logger::try_init();
}

/// Assembles class files byte by byte. Pool entries are appended in call
/// order and each helper returns the index it was given.
pub struct ClassBuilder {
    pub major_version: u16,
    pool: Vec<u8>,
    slots: u16,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

impl ClassBuilder {
    pub fn new() -> Self {
        Self {
            major_version: 52,
            pool: Vec::new(),
            slots: 0,
            access_flags: 0x0021,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// A public class `name` extending `java/lang/Object`.
    pub fn class_named(name: &str) -> Self {
        let mut builder = Self::new();
        builder.this_class = builder.class(name);
        builder.super_class = builder.class("java/lang/Object");
        builder
    }

    pub fn entry(&mut self, tag: u8, payload: &[u8]) -> u16 {
        let index = self.slots + 1;
        self.pool.push(tag);
        self.pool.extend_from_slice(payload);
        self.slots += if tag == 5 || tag == 6 { 2 } else { 1 };
        index
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        let mut payload = Vec::new();
        payload.write_u16::<Endian>(s.len() as u16).unwrap();
        payload.extend_from_slice(s.as_bytes());
        self.entry(1, &payload)
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.entry(3, &value.to_be_bytes())
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.entry(5, &value.to_be_bytes())
    }

    pub fn double(&mut self, value: f64) -> u16 {
        self.entry(6, &value.to_bits().to_be_bytes())
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.entry(7, &name_index.to_be_bytes())
    }

    pub fn string(&mut self, s: &str) -> u16 {
        let string_index = self.utf8(s);
        self.entry(8, &string_index.to_be_bytes())
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.entry(12, &pair(name_index, descriptor_index))
    }

    pub fn field_ref(&mut self, class_index: u16, name_and_type_index: u16) -> u16 {
        self.entry(9, &pair(class_index, name_and_type_index))
    }

    pub fn method_ref(&mut self, class_index: u16, name_and_type_index: u16) -> u16 {
        self.entry(10, &pair(class_index, name_and_type_index))
    }

    pub fn interface(&mut self, index: u16) -> &mut Self {
        self.interfaces.push(index);
        self
    }

    pub fn field(&mut self, access_flags: u16, name: &str, descriptor: &str) -> &mut Self {
        let member = self.member(access_flags, name, descriptor, &[]);
        self.fields.push(member);
        self
    }

    pub fn method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: &[Vec<u8>],
    ) -> &mut Self {
        let member = self.member(access_flags, name, descriptor, attributes);
        self.methods.push(member);
        self
    }

    pub fn class_attribute(&mut self, attribute: Vec<u8>) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    /// A `Code` attribute holding `code` and no nested attributes.
    pub fn code(&mut self, code: &[u8]) -> Vec<u8> {
        let name_index = self.utf8("Code");
        let mut info = Vec::new();
        info.write_u16::<Endian>(1).unwrap();
        info.write_u16::<Endian>(1).unwrap();
        info.write_u32::<Endian>(code.len() as u32).unwrap();
        info.extend_from_slice(code);
        info.write_u16::<Endian>(0).unwrap();
        info.write_u16::<Endian>(0).unwrap();
        attribute(name_index, &info)
    }

    fn member(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: &[Vec<u8>],
    ) -> Vec<u8> {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);

        let mut member = Vec::new();
        member.write_u16::<Endian>(access_flags).unwrap();
        member.write_u16::<Endian>(name_index).unwrap();
        member.write_u16::<Endian>(descriptor_index).unwrap();
        write_table(&mut member, attributes);
        member
    }

    /// Offset of the first byte after the constant pool.
    pub fn pool_end(&self) -> usize {
        10 + self.pool.len()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<Endian>(0xCAFEBABE).unwrap();
        buf.write_u16::<Endian>(0).unwrap();
        buf.write_u16::<Endian>(self.major_version).unwrap();
        buf.write_u16::<Endian>(self.slots + 1).unwrap();
        buf.extend_from_slice(&self.pool);
        buf.write_u16::<Endian>(self.access_flags).unwrap();
        buf.write_u16::<Endian>(self.this_class).unwrap();
        buf.write_u16::<Endian>(self.super_class).unwrap();
        buf.write_u16::<Endian>(self.interfaces.len() as u16).unwrap();
        for &interface in &self.interfaces {
            buf.write_u16::<Endian>(interface).unwrap();
        }
        write_table(&mut buf, &self.fields);
        write_table(&mut buf, &self.methods);
        write_table(&mut buf, &self.attributes);
        buf
    }
}

pub fn attribute(name_index: u16, info: &[u8]) -> Vec<u8> {
    let mut attribute = Vec::new();
    attribute.write_u16::<Endian>(name_index).unwrap();
    attribute.write_u32::<Endian>(info.len() as u32).unwrap();
    attribute.extend_from_slice(info);
    attribute
}

fn pair(a: u16, b: u16) -> [u8; 4] {
    let [a0, a1] = a.to_be_bytes();
    let [b0, b1] = b.to_be_bytes();
    [a0, a1, b0, b1]
}

fn write_table(buf: &mut Vec<u8>, records: &[Vec<u8>]) {
    buf.write_u16::<Endian>(records.len() as u16).unwrap();
    for record in records {
        buf.extend_from_slice(record);
    }
}
