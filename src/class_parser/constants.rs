#![allow(non_camel_case_types)]

use num_enum::{IntoPrimitive, TryFromPrimitive};
use crate::class_parser::types::{U1, U2, U4};

#[derive(TryFromPrimitive, IntoPrimitive, Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum CPTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    Fieldref = 9,
    Methodref = 10,
    InterfaceMethodref = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

impl CPTag {
    /// Long and Double take up two constant pool slots
    pub fn is_wide(self) -> bool {
        matches!(self, CPTag::Long | CPTag::Double)
    }
}

/// Raw constant pool item, indices not yet followed
#[derive(Debug, Clone, PartialEq)]
pub enum CPInfo {
    Class(U2),
    String(U2),
    MethodType(U2),
    Module(U2),
    Package(U2),
    Integer(U4),
    Float(U4),
    /// reference kind, reference index
    MethodHandle(U1, U2),
    Fieldref(U2, U2),
    Methodref(U2, U2),
    InterfaceMethodref(U2, U2),
    NameAndType(U2, U2),
    /// bootstrap method attribute index, name and type index
    Dynamic(U2, U2),
    InvokeDynamic(U2, U2),
    /// high and low word
    Long(U4, U4),
    Double(U4, U4),
    Utf8(std::string::String),
    /// Unusable slot following a Long or Double
    Hole,
}

impl CPInfo {
    pub fn tag(&self) -> Option<CPTag> {
        Some(match self {
            CPInfo::Class(_) => CPTag::Class,
            CPInfo::String(_) => CPTag::String,
            CPInfo::MethodType(_) => CPTag::MethodType,
            CPInfo::Module(_) => CPTag::Module,
            CPInfo::Package(_) => CPTag::Package,
            CPInfo::Integer(_) => CPTag::Integer,
            CPInfo::Float(_) => CPTag::Float,
            CPInfo::MethodHandle(..) => CPTag::MethodHandle,
            CPInfo::Fieldref(..) => CPTag::Fieldref,
            CPInfo::Methodref(..) => CPTag::Methodref,
            CPInfo::InterfaceMethodref(..) => CPTag::InterfaceMethodref,
            CPInfo::NameAndType(..) => CPTag::NameAndType,
            CPInfo::Dynamic(..) => CPTag::Dynamic,
            CPInfo::InvokeDynamic(..) => CPTag::InvokeDynamic,
            CPInfo::Long(..) => CPTag::Long,
            CPInfo::Double(..) => CPTag::Double,
            CPInfo::Utf8(_) => CPTag::Utf8,
            CPInfo::Hole => return None
        })
    }
}

#[derive(IntoPrimitive, Clone, Copy)]
#[repr(u16)]
pub enum AccessFlagClass {
    ACC_PUBLIC = 0x0001,
    ACC_FINAL = 0x0010,
    ACC_SUPER = 0x0020,
    ACC_INTERFACE = 0x0200,
    ACC_ABSTRACT = 0x0400,
}

#[derive(IntoPrimitive, Clone, Copy)]
#[repr(u16)]
pub enum AccessFlagField {
    ACC_STATIC = 0x0008,
    ACC_FINAL = 0x0010,
}

#[derive(IntoPrimitive, Clone, Copy)]
#[repr(u16)]
pub enum AccessFlagMethod {
    ACC_PUBLIC = 0x0001,
    ACC_PRIVATE = 0x0002,
    ACC_PROTECTED = 0x0004,
    ACC_STATIC = 0x0008,
    ACC_FINAL = 0x0010,
    ACC_VARARGS = 0x0080,
    ACC_NATIVE = 0x0100,
    ACC_ABSTRACT = 0x0400,
}
