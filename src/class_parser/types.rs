use crate::class_parser::constants::CPInfo;
use crate::class_parser::ParseError;

pub type U1 = u8;
pub type U2 = u16;
pub type U4 = u32;

#[derive(Debug)]
pub struct FieldInfo {
    pub access_flags: U2,
    pub name_index: U2,
    pub descriptor_index: U2,
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug)]
pub struct MethodInfo {
    pub access_flags: U2,
    pub name_index: U2,
    pub descriptor_index: U2,
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug)]
pub struct AttributeInfo {
    pub attribute_name_index: U2,
    pub info: Vec<u8>,
}

/// Entry of the BootstrapMethods attribute
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BootstrapMethod {
    pub bootstrap_method_ref: U2,
    pub bootstrap_arguments: Vec<U2>,
}

#[derive(Debug)]
pub struct ParsedClass {
    pub minor_version: U2,
    pub major_version: U2,
    /// Item `i` is stored at `i - 1`
    pub constant_pool: Vec<CPInfo>,
    pub access_flags: U2,
    pub this_class: U2,
    pub super_class: U2,
    pub interfaces: Vec<U2>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
    pub bootstrap_methods: Vec<BootstrapMethod>,
}

impl ParsedClass {
    pub fn entry(&self, index: U2) -> Result<&CPInfo, ParseError> {
        (index as usize).checked_sub(1)
            .and_then(|i| self.constant_pool.get(i))
            .ok_or(ParseError::ConstantPool(index))
    }

    pub fn utf8(&self, index: U2) -> Result<&str, ParseError> {
        match self.entry(index)? {
            CPInfo::Utf8(s) => Ok(s),
            _ => Err(ParseError::ConstantPool(index))
        }
    }

    pub fn class_name(&self, index: U2) -> Result<&str, ParseError> {
        match self.entry(index)? {
            CPInfo::Class(name) => self.utf8(*name),
            _ => Err(ParseError::ConstantPool(index))
        }
    }

    pub fn name_and_type(&self, index: U2) -> Result<(&str, &str), ParseError> {
        match self.entry(index)? {
            CPInfo::NameAndType(name, descriptor) => Ok((self.utf8(*name)?, self.utf8(*descriptor)?)),
            _ => Err(ParseError::ConstantPool(index))
        }
    }
}
