use std::{collections::HashSet, fmt};

use crate::{
    attributes::{AttributeLocation, AttributeRegistry, AttributeTable, DecodeContext},
    class_file::MemberInfo,
    constant_pool::Expect,
    descriptor::{
        parse_field_descriptor, parse_instance_method_descriptor, parse_method_descriptor,
    },
    diagnostics::{DiagnosticKind, Section, Site},
    reader::{ByteReader, ReadError},
    AccessFlags, ClassFile, ClassFileError, ConstantPool, Diagnostics, Result, MAGIC,
    MAX_MAJOR_VERSION,
};

const MIN_MAJOR_VERSION: u16 = 45;
const JAVA_LANG_OBJECT: &str = "java/lang/Object";

/// How far a [`Parser`] got. Reaching `HeaderRead` means a model will be
/// returned; after that the parser always ends in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParseState {
    Start,
    MagicChecked,
    PoolBuilt,
    HeaderRead,
    FieldsRead,
    MethodsRead,
    AttributesRead,
    Done,
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Single-use, top-to-bottom class file parser.
pub struct Parser<'a> {
    r: ByteReader<'a>,
    registry: &'a AttributeRegistry,
    diagnostics: Diagnostics,
    state: ParseState,
}

impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_registry(buf, crate::standard_registry())
    }

    pub fn with_registry(buf: &'a [u8], registry: &'a AttributeRegistry) -> Self {
        Self {
            r: ByteReader::new(buf),
            registry,
            diagnostics: Diagnostics::new(),
            state: ParseState::Start,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        let magic = self.parse_magic_identifier()?;
        let (major_version, minor_version) = self.parse_version()?;
        self.transition(ParseState::MagicChecked);

        let constant_pool = self.parse_constant_pool()?;
        self.transition(ParseState::PoolBuilt);

        let access_flags = AccessFlags::from_bits_truncate(self.read_header_u2()?);
        let this_class = self.read_header_u2()?;
        let super_class = self.read_header_u2()?;
        self.check_header(&constant_pool, access_flags, this_class, super_class);
        self.transition(ParseState::HeaderRead);

        let mut class_file = ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: AttributeTable::default(),
        };

        match self.parse_body(&mut class_file) {
            Ok(()) => {
                let trailing = self.r.remaining();
                if trailing > 0 {
                    self.diagnostics
                        .warn(DiagnosticKind::TrailingBytes(trailing), self.r.position());
                }
            }
            Err((section, source)) => {
                let ReadError::UnexpectedEndOfData { offset, .. } = source;
                self.diagnostics
                    .error(DiagnosticKind::UnexpectedEndOfData { section, source }, offset);
            }
        }

        self.transition(ParseState::Done);
        Ok(class_file)
    }

    fn transition(&mut self, state: ParseState) {
        log::trace!("{} -> {} at offset {}", self.state, state, self.r.position());
        self.state = state;
    }

    fn parse_magic_identifier(&mut self) -> Result<u32> {
        match self.read_header_u4()? {
            MAGIC => Ok(MAGIC),
            magic_identifier => Err(ClassFileError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let offset = self.r.position();
        let minor = self.read_header_u2()?;
        let major = self.read_header_u2()?;

        if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&major) {
            self.diagnostics
                .warn(DiagnosticKind::UnsupportedVersion { major, minor }, offset);
        }
        Ok((major, minor))
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let constant_pool_count = self.r.read_u2().map_err(|source| ClassFileError::Truncated {
            section: Section::ConstantPool,
            source,
        })?;

        let constant_pool =
            ConstantPool::build(&mut self.r, constant_pool_count, &mut self.diagnostics)?;
        constant_pool.validate(&mut self.diagnostics);
        Ok(constant_pool)
    }

    fn check_header(
        &mut self,
        pool: &ConstantPool,
        access_flags: AccessFlags,
        this_class: u16,
        super_class: u16,
    ) {
        // access_flags, this_class and super_class are the last six bytes read
        let offset = self.r.position() - 6;

        if !access_flags.is_valid_for_class() {
            self.diagnostics.warn(
                DiagnosticKind::ConflictingAccessFlags {
                    site: Site::ThisClass,
                    flags: access_flags,
                },
                offset,
            );
        }

        pool.check_reference(
            Site::ThisClass,
            this_class,
            Expect::Class,
            offset + 2,
            &mut self.diagnostics,
        );

        if super_class != 0 {
            pool.check_reference(
                Site::SuperClass,
                super_class,
                Expect::Class,
                offset + 4,
                &mut self.diagnostics,
            );
        } else if !access_flags.contains(AccessFlags::MODULE) {
            let name = pool.class_name(this_class).unwrap_or_default();
            if name != JAVA_LANG_OBJECT {
                self.diagnostics
                    .warn(DiagnosticKind::MissingSuperClass(name.to_owned()), offset + 4);
            }
        }
    }

    /// Everything after the header. Stops at the first truncation, keeping
    /// what was read so far in `class_file`.
    fn parse_body(
        &mut self,
        class_file: &mut ClassFile,
    ) -> std::result::Result<(), (Section, ReadError)> {
        self.parse_interfaces(&class_file.constant_pool, &mut class_file.interfaces)
            .map_err(in_section(Section::Interfaces))?;

        self.parse_members(
            &class_file.constant_pool,
            AttributeLocation::FIELD,
            &mut class_file.fields,
        )
        .map_err(in_section(Section::Fields))?;
        self.transition(ParseState::FieldsRead);

        self.parse_members(
            &class_file.constant_pool,
            AttributeLocation::METHOD,
            &mut class_file.methods,
        )
        .map_err(in_section(Section::Methods))?;
        self.transition(ParseState::MethodsRead);

        let attributes_count = self
            .r
            .read_u2()
            .map_err(in_section(Section::Attributes))?;
        let mut cx = DecodeContext::new(
            &class_file.constant_pool,
            self.registry,
            AttributeLocation::CLASS,
            &mut self.diagnostics,
        );
        class_file
            .attributes
            .read_into(&mut self.r, &mut cx, attributes_count)
            .map_err(in_section(Section::Attributes))?;
        self.transition(ParseState::AttributesRead);

        Ok(())
    }

    fn parse_interfaces(
        &mut self,
        pool: &ConstantPool,
        interfaces: &mut Vec<u16>,
    ) -> std::result::Result<(), ReadError> {
        let interfaces_count = self.r.read_u2()?;
        for i in 0..interfaces_count as usize {
            let offset = self.r.position();
            let index = self.r.read_u2()?;
            pool.check_reference(
                Site::Interface(i),
                index,
                Expect::Class,
                offset,
                &mut self.diagnostics,
            );
            interfaces.push(index);
        }
        Ok(())
    }

    fn parse_members(
        &mut self,
        pool: &ConstantPool,
        location: AttributeLocation,
        members: &mut Vec<MemberInfo>,
    ) -> std::result::Result<(), ReadError> {
        let mut seen = HashSet::new();

        let count = self.r.read_u2()?;
        for i in 0..count as usize {
            let offset = self.r.position();
            let access_flags = AccessFlags::from_bits_truncate(self.r.read_u2()?);
            let name_index = self.r.read_u2()?;
            let descriptor_index = self.r.read_u2()?;
            let attributes_count = self.r.read_u2()?;

            let site = if location == AttributeLocation::FIELD {
                Site::Field(i)
            } else {
                Site::Method(i)
            };
            self.check_member(
                pool,
                site,
                offset,
                access_flags,
                name_index,
                descriptor_index,
                &mut seen,
            );

            let mut attributes = AttributeTable::default();
            let mut cx = DecodeContext::new(pool, self.registry, location, &mut self.diagnostics);
            let result = attributes.read_into(&mut self.r, &mut cx, attributes_count);

            members.push(MemberInfo {
                offset,
                access_flags,
                name_index,
                descriptor_index,
                attributes,
            });
            result?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn check_member(
        &mut self,
        pool: &ConstantPool,
        site: Site,
        offset: usize,
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
        seen: &mut HashSet<(String, String)>,
    ) {
        let is_field = matches!(site, Site::Field(_));

        let valid_flags = if is_field {
            access_flags.is_valid_for_field()
        } else {
            access_flags.is_valid_for_method()
        };
        if !valid_flags {
            self.diagnostics.warn(
                DiagnosticKind::ConflictingAccessFlags {
                    site: site.clone(),
                    flags: access_flags,
                },
                offset,
            );
        }

        let name_ok = pool.check_reference(
            site.clone(),
            name_index,
            Expect::Utf8,
            offset + 2,
            &mut self.diagnostics,
        );
        let descriptor_ok = pool.check_reference(
            site.clone(),
            descriptor_index,
            Expect::Utf8,
            offset + 4,
            &mut self.diagnostics,
        );
        if !(name_ok && descriptor_ok) {
            return;
        }

        let (name, descriptor) = match (pool.utf8(name_index), pool.utf8(descriptor_index)) {
            (Some(name), Some(descriptor)) => (name, descriptor),
            _ => return,
        };

        let parsed = if is_field {
            parse_field_descriptor(descriptor).map(drop)
        } else if access_flags.contains(AccessFlags::STATIC) {
            parse_method_descriptor(descriptor).map(drop)
        } else {
            parse_instance_method_descriptor(descriptor).map(drop)
        };
        if let Err(source) = parsed {
            self.diagnostics.error(
                DiagnosticKind::InvalidDescriptor {
                    site: site.clone(),
                    descriptor: descriptor.to_owned(),
                    source,
                },
                offset + 4,
            );
        }

        if !seen.insert((name.to_owned(), descriptor.to_owned())) {
            self.diagnostics.error(
                DiagnosticKind::DuplicateMember {
                    site,
                    name: name.to_owned(),
                    descriptor: descriptor.to_owned(),
                },
                offset,
            );
        }
    }

    fn read_header_u2(&mut self) -> Result<u16> {
        self.r.read_u2().map_err(|source| ClassFileError::Truncated {
            section: Section::Header,
            source,
        })
    }

    fn read_header_u4(&mut self) -> Result<u32> {
        self.r.read_u4().map_err(|source| ClassFileError::Truncated {
            section: Section::Header,
            source,
        })
    }
}

fn in_section(section: Section) -> impl Fn(ReadError) -> (Section, ReadError) {
    move |e| (section, e)
}
