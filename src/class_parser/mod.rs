use std::io::{Cursor, Read};
use std::string::FromUtf8Error;

use thiserror::Error;

use crate::class_parser::types::{AttributeInfo, BootstrapMethod, FieldInfo, MethodInfo, ParsedClass, U1, U2, U4};
use crate::class_parser::be_reader::BEReader;
use crate::class_parser::constants::{CPInfo, CPTag};

pub mod types;
pub mod constants;
mod be_reader;
#[cfg(test)]
pub(crate) mod writer;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("Unknown constant pool tag {0}")]
    UnknownTag(u8),
    #[error("Not a class file")]
    BadMagic,
    #[error("Class file is longer than expected")]
    TrailingBytes,
    #[error("Format error at constant pool item {0}")]
    ConstantPool(U2),
    #[error("Malformed {0} attribute")]
    Attribute(&'static str),
}

fn parse_cp_info(reader: &mut impl Read, constant_pool: &mut Vec<CPInfo>) -> Result<(), ParseError> {
    let raw = U1::read(reader)?;
    let tag = CPTag::try_from(raw).map_err(|_| ParseError::UnknownTag(raw))?;

    let info = match tag {
        CPTag::Utf8 => {
            let mut buf = vec![0; U2::read(reader)? as usize];
            reader.read_exact(&mut buf)?;
            CPInfo::Utf8(String::from_utf8(buf)?)
        }
        CPTag::Class => CPInfo::Class(U2::read(reader)?),
        CPTag::String => CPInfo::String(U2::read(reader)?),
        CPTag::MethodType => CPInfo::MethodType(U2::read(reader)?),
        CPTag::Module => CPInfo::Module(U2::read(reader)?),
        CPTag::Package => CPInfo::Package(U2::read(reader)?),
        CPTag::Integer => CPInfo::Integer(U4::read(reader)?),
        CPTag::Float => CPInfo::Float(U4::read(reader)?),
        CPTag::Long => CPInfo::Long(U4::read(reader)?, U4::read(reader)?),
        CPTag::Double => CPInfo::Double(U4::read(reader)?, U4::read(reader)?),
        CPTag::MethodHandle => CPInfo::MethodHandle(U1::read(reader)?, U2::read(reader)?),
        CPTag::Fieldref => CPInfo::Fieldref(U2::read(reader)?, U2::read(reader)?),
        CPTag::Methodref => CPInfo::Methodref(U2::read(reader)?, U2::read(reader)?),
        CPTag::InterfaceMethodref => CPInfo::InterfaceMethodref(U2::read(reader)?, U2::read(reader)?),
        CPTag::NameAndType => CPInfo::NameAndType(U2::read(reader)?, U2::read(reader)?),
        CPTag::Dynamic => CPInfo::Dynamic(U2::read(reader)?, U2::read(reader)?),
        CPTag::InvokeDynamic => CPInfo::InvokeDynamic(U2::read(reader)?, U2::read(reader)?),
    };

    constant_pool.push(info);
    if tag.is_wide() {
        constant_pool.push(CPInfo::Hole);
    }

    Ok(())
}

fn parse_field_info(reader: &mut impl Read) -> Result<FieldInfo, ParseError> {
    let access_flags = U2::read(reader)?;
    let name_index = U2::read(reader)?;
    let descriptor_index = U2::read(reader)?;
    let attributes_count = U2::read(reader)?;

    let mut attributes = Vec::with_capacity(attributes_count as usize);
    for _ in 0..attributes_count {
        attributes.push(parse_attributes_info(reader)?);
    }

    Ok(FieldInfo {
        access_flags,
        name_index,
        descriptor_index,
        attributes,
    })
}

fn parse_method_info(reader: &mut impl Read) -> Result<MethodInfo, ParseError> {
    let access_flags = U2::read(reader)?;
    let name_index = U2::read(reader)?;
    let descriptor_index = U2::read(reader)?;
    let attributes_count = U2::read(reader)?;

    let mut attributes = Vec::with_capacity(attributes_count as usize);
    for _ in 0..attributes_count {
        attributes.push(parse_attributes_info(reader)?);
    }

    Ok(MethodInfo {
        access_flags,
        name_index,
        descriptor_index,
        attributes,
    })
}

fn parse_attributes_info(reader: &mut impl Read) -> Result<AttributeInfo, ParseError> {
    let attribute_name_index = U2::read(reader)?;
    let attribute_length = U4::read(reader)?;

    let mut vec = vec![0; attribute_length as usize];
    reader.read_exact(&mut vec)?;

    Ok(AttributeInfo {
        attribute_name_index,
        info: vec,
    })
}

fn parse_bootstrap_methods(info: &[u8]) -> Result<Vec<BootstrapMethod>, ParseError> {
    let mut cursor = Cursor::new(info);
    let malformed = |_| ParseError::Attribute("BootstrapMethods");

    let count = U2::read(&mut cursor).map_err(malformed)?;
    let mut methods = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let bootstrap_method_ref = U2::read(&mut cursor).map_err(malformed)?;
        let argument_count = U2::read(&mut cursor).map_err(malformed)?;

        let mut bootstrap_arguments = Vec::with_capacity(argument_count as usize);
        for _ in 0..argument_count {
            bootstrap_arguments.push(U2::read(&mut cursor).map_err(malformed)?);
        }

        methods.push(BootstrapMethod { bootstrap_method_ref, bootstrap_arguments });
    }

    if cursor.check_if_empty() {
        Ok(methods)
    } else {
        Err(ParseError::Attribute("BootstrapMethods"))
    }
}

// the method with the same name is unstable for cursor
trait ReadStatus {
    fn check_if_empty(&mut self) -> bool;
}
impl ReadStatus for Cursor<&[u8]> {
    fn check_if_empty(&mut self) -> bool {
        let mut buf = Vec::new();
        if let Ok(size) = self.read_to_end(&mut buf) {
            size == 0
        } else {
            false
        }
    }
}

pub fn parse_class(buf: &[u8]) -> Result<ParsedClass, ParseError> {
    let mut cursor = Cursor::new(buf);

    let magic = U4::read(&mut cursor)?;
    if magic != 0xCAFEBABE {
        return Err(ParseError::BadMagic);
    }

    let minor_version = U2::read(&mut cursor)?;
    let major_version = U2::read(&mut cursor)?;

    let constant_pool_count = U2::read(&mut cursor)?.saturating_sub(1);
    let mut constant_pool = Vec::with_capacity(constant_pool_count as usize);
    while constant_pool.len() < constant_pool_count as usize {
        parse_cp_info(&mut cursor, &mut constant_pool)?;
    }

    let access_flags = U2::read(&mut cursor)?;
    let this_class = U2::read(&mut cursor)?;
    let super_class = U2::read(&mut cursor)?;

    let interfaces_count = U2::read(&mut cursor)?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(U2::read(&mut cursor)?);
    }

    let fields_count = U2::read(&mut cursor)?;
    let mut fields = Vec::with_capacity(fields_count as usize);
    for _ in 0..fields_count {
        fields.push(parse_field_info(&mut cursor)?);
    }

    let methods_count = U2::read(&mut cursor)?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        methods.push(parse_method_info(&mut cursor)?);
    }

    let attributes_count = U2::read(&mut cursor)?;
    let mut attributes = Vec::with_capacity(attributes_count as usize);
    for _ in 0..attributes_count {
        attributes.push(parse_attributes_info(&mut cursor)?);
    }

    if !cursor.check_if_empty() {
        return Err(ParseError::TrailingBytes);
    }

    let mut parsed_class = ParsedClass {
        minor_version,
        major_version,
        constant_pool,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
        bootstrap_methods: vec![]
    };

    let mut bootstrap_methods = None;
    for a in &parsed_class.attributes {
        if parsed_class.utf8(a.attribute_name_index)? == "BootstrapMethods" {
            bootstrap_methods = Some(parse_bootstrap_methods(&a.info)?);
        }
    }
    parsed_class.bootstrap_methods = bootstrap_methods.unwrap_or_default();

    Ok(parsed_class)
}

#[cfg(test)]
mod tests {
    use crate::class_parser::constants::CPInfo;
    use crate::class_parser::{parse_class, ParseError};
    use crate::class_parser::writer::ClassFileWriter;

    #[test]
    fn parses_bootstrap_methods() {
        let mut w = ClassFileWriter::new("p/Indy", Some("java/lang/Object"));
        let bsm = w.method_handle(6, "p/Indy", "bsm",
            "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/Class;I)Ljava/lang/Object;");
        let arg = w.integer(42);
        let l = w.long(-5);
        w.bootstrap_method(bsm, &[arg, l]);
        w.field(0x0008, "count", "I");
        w.method(0x0009, "run", "()V");

        let parsed = parse_class(&w.finish()).unwrap();
        assert_eq!(parsed.bootstrap_methods.len(), 1);
        assert_eq!(parsed.bootstrap_methods[0].bootstrap_method_ref, bsm);
        assert_eq!(parsed.bootstrap_methods[0].bootstrap_arguments, vec![arg, l]);
        assert_eq!(parsed.constant_pool[arg as usize - 1], CPInfo::Integer(42));
        assert_eq!(parsed.constant_pool[l as usize], CPInfo::Hole);
        assert_eq!(parsed.fields.len(), 1);
        assert_eq!(parsed.methods.len(), 1);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_class(&[0xCA, 0xFE, 0xBA, 0xBF, 0, 0]), Err(ParseError::BadMagic)));

        let mut bytes = ClassFileWriter::new("A", Some("java/lang/Object")).finish();
        bytes.push(0);
        assert!(matches!(parse_class(&bytes), Err(ParseError::TrailingBytes)));

        let bytes = ClassFileWriter::new("A", Some("java/lang/Object")).finish();
        assert!(matches!(parse_class(&bytes[..12]), Err(ParseError::Io(_))));
    }
}
