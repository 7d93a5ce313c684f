use std::fmt::{Display, Formatter};

use crate::class_parser::constants::AccessFlagField;
use crate::helper::has_flag;

/// Objects start with a two word header, so no instance field lives at offset 0.
pub const OBJECT_HEADER_SIZE: u32 = 16;
pub const FIELD_SLOT_SIZE: u32 = 8;

pub const STATIC_FIELD_TAG: u64 = 1;
pub const FINAL_FIELD_TAG: u64 = 2;

/// Deepest array type a descriptor may name
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum FieldType {
    B,
    C,
    D,
    F,
    I,
    J,
    L(String),
    S,
    Z,
    A(Box<FieldType>), // [
    V
}

impl FieldType {
    pub const PRIMITIVES: [FieldType; 9] = [FieldType::Z, FieldType::B, FieldType::C, FieldType::S,
        FieldType::I, FieldType::J, FieldType::F, FieldType::D, FieldType::V];

    pub fn is_primitive(&self) -> bool {
        !matches!(self, FieldType::L(_) | FieldType::A(_))
    }

    /// Name of the primitive class (`int`, `void`, ...)
    pub fn primitive_name(&self) -> Option<&'static str> {
        match self {
            FieldType::B => Some("byte"),
            FieldType::C => Some("char"),
            FieldType::D => Some("double"),
            FieldType::F => Some("float"),
            FieldType::I => Some("int"),
            FieldType::J => Some("long"),
            FieldType::S => Some("short"),
            FieldType::Z => Some("boolean"),
            FieldType::V => Some("void"),
            FieldType::L(_) | FieldType::A(_) => None
        }
    }

    pub fn dimensions(&self) -> usize {
        match self {
            FieldType::A(component) => 1 + component.dimensions(),
            _ => 0
        }
    }

    /// Name under which the class of this type is registered: the primitive name, the binary
    /// name, or the descriptor for arrays.
    pub fn class_name(&self) -> String {
        match self {
            FieldType::L(name) => name.clone(),
            FieldType::A(_) => self.to_string(),
            primitive => primitive.primitive_name().unwrap_or_default().to_string()
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::L(name) => write!(f, "L{};", name),
            FieldType::A(component) => write!(f, "[{}", component),
            FieldType::B => write!(f, "B"),
            FieldType::C => write!(f, "C"),
            FieldType::D => write!(f, "D"),
            FieldType::F => write!(f, "F"),
            FieldType::I => write!(f, "I"),
            FieldType::J => write!(f, "J"),
            FieldType::S => write!(f, "S"),
            FieldType::Z => write!(f, "Z"),
            FieldType::V => write!(f, "V"),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Field {
    pub flag: u16,
    pub name: String,
    pub descriptor: FieldType,
    /// Byte offset for instance fields, storage slot for static fields
    pub slot: u32,
}

impl Field {
    pub fn is_static(&self) -> bool {
        has_flag(self.flag, AccessFlagField::ACC_STATIC)
    }

    pub fn is_final(&self) -> bool {
        has_flag(self.flag, AccessFlagField::ACC_FINAL)
    }

    /// Direct target stored in a resolved MemberName
    pub fn target(&self) -> u64 {
        if self.is_static() {
            let mut target = (self.slot as u64 * FIELD_SLOT_SIZE as u64) | STATIC_FIELD_TAG;
            if self.is_final() {
                target |= FINAL_FIELD_TAG;
            }
            target
        } else {
            self.slot as u64
        }
    }
}
