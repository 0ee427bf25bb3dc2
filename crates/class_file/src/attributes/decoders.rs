//! Decoders for the attributes defined in JVMS §4.7.

use super::{
    registry::{DecodeFn, StandardDecoder},
    AttributeLocation, AttributeRegistry, AttributeTable, BootstrapMethod, CodeAttribute,
    DecodeContext, DecodeError, DecodedAttribute, EnclosingMethod, ExceptionTableEntry,
    InnerClass, LineNumber, LocalVariable, MethodParameter, ModuleAttribute, ModuleExports,
    ModuleProvides, ModuleRequires, RecordComponent,
};
use crate::{constant_pool::Expect, diagnostics::Site, reader::ByteReader, AccessFlags};

type Result<T> = std::result::Result<T, DecodeError>;

const MEMBER: AttributeLocation = AttributeLocation::from_bits_truncate(
    AttributeLocation::CLASS.bits()
        | AttributeLocation::FIELD.bits()
        | AttributeLocation::METHOD.bits(),
);
const SIGNATURE: AttributeLocation = AttributeLocation::from_bits_truncate(
    MEMBER.bits() | AttributeLocation::RECORD_COMPONENT.bits(),
);

pub(super) fn register_standard(registry: &mut AttributeRegistry) {
    use AttributeLocation as L;

    let mut add = |name: &str, locations: AttributeLocation, decode: DecodeFn| {
        registry.register(name, StandardDecoder { locations, decode });
    };

    add("ConstantValue", L::FIELD, constant_value);
    add("Code", L::METHOD, code);
    add("Exceptions", L::METHOD, exceptions);
    add("InnerClasses", L::CLASS, inner_classes);
    add("EnclosingMethod", L::CLASS, enclosing_method);
    add("Synthetic", MEMBER, synthetic);
    add("Signature", SIGNATURE, signature);
    add("SourceFile", L::CLASS, source_file);
    add("LineNumberTable", L::CODE, line_number_table);
    add("LocalVariableTable", L::CODE, local_variable_table);
    add("LocalVariableTypeTable", L::CODE, local_variable_type_table);
    add("Deprecated", MEMBER, deprecated);
    add("BootstrapMethods", L::CLASS, bootstrap_methods);
    add("MethodParameters", L::METHOD, method_parameters);
    add("Module", L::CLASS, module);
    add("ModulePackages", L::CLASS, module_packages);
    add("ModuleMainClass", L::CLASS, module_main_class);
    add("NestHost", L::CLASS, nest_host);
    add("NestMembers", L::CLASS, nest_members);
    add("PermittedSubclasses", L::CLASS, permitted_subclasses);
    add("Record", L::CLASS, record);
}

/// Reads a u2 index and checks that it names an entry of the expected kind.
fn index(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
    attribute: &str,
    expected: Expect,
) -> Result<u16> {
    let offset = r.position();
    let index = r.read_u2()?;
    cx.pool.check_reference(
        Site::Attribute(attribute.to_owned()),
        index,
        expected,
        offset,
        cx.diagnostics,
    );
    Ok(index)
}

/// Like [`index`], but zero is allowed and means "absent".
fn optional_index(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
    attribute: &str,
    expected: Expect,
) -> Result<u16> {
    let offset = r.position();
    let index = r.read_u2()?;
    if index != 0 {
        cx.pool.check_reference(
            Site::Attribute(attribute.to_owned()),
            index,
            expected,
            offset,
            cx.diagnostics,
        );
    }
    Ok(index)
}

/// A u2 count followed by that many indices, each checked like [`index`].
fn index_list(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
    attribute: &str,
    expected: Expect,
) -> Result<Vec<u16>> {
    let count = r.read_u2()?;
    (0..count)
        .map(|_| index(r, cx, attribute, expected))
        .collect()
}

fn constant_value(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    index(r, cx, "ConstantValue", Expect::Constant).map(DecodedAttribute::ConstantValue)
}

fn code(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    let max_stack = r.read_u2()?;
    let max_locals = r.read_u2()?;
    let code_length = r.read_u4()?;
    if code_length == 0 || code_length > u16::MAX as u32 {
        return Err(DecodeError::Invalid(format!(
            "code length {} is out of range",
            code_length
        )));
    }
    let code = r.read_bytes(code_length as usize)?.to_vec();

    let exception_table_length = r.read_u2()?;
    let mut exception_table = Vec::with_capacity(exception_table_length as usize);
    for _ in 0..exception_table_length {
        exception_table.push(ExceptionTableEntry {
            start_pc: r.read_u2()?,
            end_pc: r.read_u2()?,
            handler_pc: r.read_u2()?,
            catch_type: r.read_u2()?,
        });
    }

    let attributes_count = r.read_u2()?;
    let attributes = cx.nested(AttributeLocation::CODE, |cx| {
        AttributeTable::read(r, cx, attributes_count)
    })?;

    Ok(DecodedAttribute::Code(CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes,
    }))
}

fn exceptions(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    index_list(r, cx, "Exceptions", Expect::Class).map(DecodedAttribute::Exceptions)
}

fn inner_classes(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    const NAME: &str = "InnerClasses";

    let number_of_classes = r.read_u2()?;
    let mut classes = Vec::with_capacity(number_of_classes as usize);
    for _ in 0..number_of_classes {
        classes.push(InnerClass {
            inner_class_info_index: index(r, cx, NAME, Expect::Class)?,
            outer_class_info_index: optional_index(r, cx, NAME, Expect::Class)?,
            inner_name_index: optional_index(r, cx, NAME, Expect::Utf8)?,
            inner_class_access_flags: AccessFlags::from_bits_truncate(r.read_u2()?),
        });
    }
    Ok(DecodedAttribute::InnerClasses(classes))
}

fn enclosing_method(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
) -> Result<DecodedAttribute> {
    const NAME: &str = "EnclosingMethod";

    Ok(DecodedAttribute::EnclosingMethod(EnclosingMethod {
        class_index: index(r, cx, NAME, Expect::Class)?,
        method_index: optional_index(r, cx, NAME, Expect::NameAndType)?,
    }))
}

fn synthetic(_: &mut ByteReader<'_>, _: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    Ok(DecodedAttribute::Synthetic)
}

fn deprecated(_: &mut ByteReader<'_>, _: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    Ok(DecodedAttribute::Deprecated)
}

fn signature(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    index(r, cx, "Signature", Expect::Utf8).map(DecodedAttribute::Signature)
}

fn source_file(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    index(r, cx, "SourceFile", Expect::Utf8).map(DecodedAttribute::SourceFile)
}

fn line_number_table(
    r: &mut ByteReader<'_>,
    _: &mut DecodeContext<'_>,
) -> Result<DecodedAttribute> {
    let length = r.read_u2()?;
    let mut lines = Vec::with_capacity(length as usize);
    for _ in 0..length {
        lines.push(LineNumber {
            start_pc: r.read_u2()?,
            line_number: r.read_u2()?,
        });
    }
    Ok(DecodedAttribute::LineNumberTable(lines))
}

fn local_variables(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
    attribute: &str,
) -> Result<Vec<LocalVariable>> {
    let length = r.read_u2()?;
    let mut variables = Vec::with_capacity(length as usize);
    for _ in 0..length {
        variables.push(LocalVariable {
            start_pc: r.read_u2()?,
            length: r.read_u2()?,
            name_index: index(r, cx, attribute, Expect::Utf8)?,
            descriptor_index: index(r, cx, attribute, Expect::Utf8)?,
            index: r.read_u2()?,
        });
    }
    Ok(variables)
}

fn local_variable_table(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
) -> Result<DecodedAttribute> {
    local_variables(r, cx, "LocalVariableTable").map(DecodedAttribute::LocalVariableTable)
}

fn local_variable_type_table(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
) -> Result<DecodedAttribute> {
    local_variables(r, cx, "LocalVariableTypeTable")
        .map(DecodedAttribute::LocalVariableTypeTable)
}

fn bootstrap_methods(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
) -> Result<DecodedAttribute> {
    const NAME: &str = "BootstrapMethods";

    let num_bootstrap_methods = r.read_u2()?;
    let mut methods = Vec::with_capacity(num_bootstrap_methods as usize);
    for _ in 0..num_bootstrap_methods {
        methods.push(BootstrapMethod {
            bootstrap_method_ref: index(r, cx, NAME, Expect::MethodHandle)?,
            bootstrap_arguments: index_list(r, cx, NAME, Expect::Loadable)?,
        });
    }
    Ok(DecodedAttribute::BootstrapMethods(methods))
}

fn method_parameters(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
) -> Result<DecodedAttribute> {
    let parameters_count = r.read_u1()?;
    let mut parameters = Vec::with_capacity(parameters_count as usize);
    for _ in 0..parameters_count {
        parameters.push(MethodParameter {
            name_index: optional_index(r, cx, "MethodParameters", Expect::Utf8)?,
            access_flags: AccessFlags::from_bits_truncate(r.read_u2()?),
        });
    }
    Ok(DecodedAttribute::MethodParameters(parameters))
}

const MODULE: &str = "Module";

fn module_exports(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<ModuleExports> {
    Ok(ModuleExports {
        package_index: index(r, cx, MODULE, Expect::Package)?,
        flags: r.read_u2()?,
        to_index: index_list(r, cx, MODULE, Expect::Module)?,
    })
}

fn module(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    let module_name_index = index(r, cx, MODULE, Expect::Module)?;
    let module_flags = r.read_u2()?;
    let module_version_index = optional_index(r, cx, MODULE, Expect::Utf8)?;

    let requires_count = r.read_u2()?;
    let mut requires = Vec::with_capacity(requires_count as usize);
    for _ in 0..requires_count {
        requires.push(ModuleRequires {
            requires_index: index(r, cx, MODULE, Expect::Module)?,
            requires_flags: r.read_u2()?,
            requires_version_index: optional_index(r, cx, MODULE, Expect::Utf8)?,
        });
    }

    let exports_count = r.read_u2()?;
    let exports = (0..exports_count)
        .map(|_| module_exports(r, cx))
        .collect::<Result<Vec<_>>>()?;

    let opens_count = r.read_u2()?;
    let opens = (0..opens_count)
        .map(|_| module_exports(r, cx))
        .collect::<Result<Vec<_>>>()?;

    let uses = index_list(r, cx, MODULE, Expect::Class)?;

    let provides_count = r.read_u2()?;
    let mut provides = Vec::with_capacity(provides_count as usize);
    for _ in 0..provides_count {
        provides.push(ModuleProvides {
            provides_index: index(r, cx, MODULE, Expect::Class)?,
            provides_with_index: index_list(r, cx, MODULE, Expect::Class)?,
        });
    }

    Ok(DecodedAttribute::Module(ModuleAttribute {
        module_name_index,
        module_flags,
        module_version_index,
        requires,
        exports,
        opens,
        uses,
        provides,
    }))
}

fn module_packages(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    index_list(r, cx, "ModulePackages", Expect::Package).map(DecodedAttribute::ModulePackages)
}

fn module_main_class(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
) -> Result<DecodedAttribute> {
    index(r, cx, "ModuleMainClass", Expect::Class).map(DecodedAttribute::ModuleMainClass)
}

fn nest_host(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    index(r, cx, "NestHost", Expect::Class).map(DecodedAttribute::NestHost)
}

fn nest_members(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    index_list(r, cx, "NestMembers", Expect::Class).map(DecodedAttribute::NestMembers)
}

fn permitted_subclasses(
    r: &mut ByteReader<'_>,
    cx: &mut DecodeContext<'_>,
) -> Result<DecodedAttribute> {
    index_list(r, cx, "PermittedSubclasses", Expect::Class)
        .map(DecodedAttribute::PermittedSubclasses)
}

fn record(r: &mut ByteReader<'_>, cx: &mut DecodeContext<'_>) -> Result<DecodedAttribute> {
    const NAME: &str = "Record";

    let components_count = r.read_u2()?;
    let mut components = Vec::with_capacity(components_count as usize);
    for _ in 0..components_count {
        let name_index = index(r, cx, NAME, Expect::Utf8)?;
        let descriptor_index = index(r, cx, NAME, Expect::Utf8)?;
        let attributes_count = r.read_u2()?;
        let attributes = cx.nested(AttributeLocation::RECORD_COMPONENT, |cx| {
            AttributeTable::read(r, cx, attributes_count)
        })?;
        components.push(RecordComponent {
            name_index,
            descriptor_index,
            attributes,
        });
    }
    Ok(DecodedAttribute::Record(components))
}
