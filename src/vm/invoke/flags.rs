use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display, EnumString};

pub const IS_METHOD: i32 = 0x0001_0000;
pub const IS_CONSTRUCTOR: i32 = 0x0002_0000;
pub const IS_FIELD: i32 = 0x0004_0000;
pub const IS_TYPE: i32 = 0x0008_0000;
pub const CALLER_SENSITIVE: i32 = 0x0010_0000;

pub const REFERENCE_KIND_SHIFT: u32 = 24;
pub const REFERENCE_KIND_MASK: i32 = 0xF;

pub const MODIFIERS_MASK: i32 = 0xFFFF;
/// Modifier bits a field MemberName carries
pub const FIELD_ACCESS_MASK: u16 = 0x50DF;
/// Modifier bits a method or constructor MemberName carries
pub const METHOD_ACCESS_MASK: u16 = 0x1DFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, EnumString, Display)]
#[repr(u8)]
#[strum(serialize_all = "camelCase")]
pub enum RefKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl RefKind {
    pub fn is_field(self) -> bool {
        (self as u8) <= RefKind::PutStatic as u8
    }

    pub fn is_static_field(self) -> bool {
        matches!(self, RefKind::GetStatic | RefKind::PutStatic)
    }

    pub fn is_put(self) -> bool {
        matches!(self, RefKind::PutField | RefKind::PutStatic)
    }

    /// The field kind with the same direction for a static or an instance field
    pub fn for_field(self, is_static: bool) -> RefKind {
        match (self.is_put(), is_static) {
            (true, true) => RefKind::PutStatic,
            (true, false) => RefKind::PutField,
            (false, true) => RefKind::GetStatic,
            (false, false) => RefKind::GetField,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Constructor,
    Field,
    Type,
}

impl MemberKind {
    pub fn bit(self) -> i32 {
        match self {
            MemberKind::Method => IS_METHOD,
            MemberKind::Constructor => IS_CONSTRUCTOR,
            MemberKind::Field => IS_FIELD,
            MemberKind::Type => IS_TYPE,
        }
    }
}

/// Decoded form of `MemberName.flags`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberFlags {
    pub kind: Option<MemberKind>,
    pub ref_kind: Option<RefKind>,
    pub modifiers: u16,
    pub caller_sensitive: bool,
}

impl MemberFlags {
    pub fn new(kind: MemberKind, ref_kind: RefKind, modifiers: u16) -> MemberFlags {
        MemberFlags {
            kind: Some(kind),
            ref_kind: Some(ref_kind),
            modifiers,
            caller_sensitive: false
        }
    }

    pub fn decode(flags: i32) -> MemberFlags {
        let kind = [MemberKind::Method, MemberKind::Constructor, MemberKind::Field, MemberKind::Type]
            .into_iter()
            .find(|k| flags & k.bit() != 0);
        let ref_kind = ((flags >> REFERENCE_KIND_SHIFT) & REFERENCE_KIND_MASK) as u8;

        MemberFlags {
            kind,
            ref_kind: RefKind::try_from(ref_kind).ok(),
            modifiers: (flags & MODIFIERS_MASK) as u16,
            caller_sensitive: flags & CALLER_SENSITIVE != 0
        }
    }

    pub fn encode(&self) -> i32 {
        let mut flags = self.modifiers as i32;
        if let Some(kind) = self.kind {
            flags |= kind.bit();
        }
        if let Some(ref_kind) = self.ref_kind {
            flags |= (u8::from(ref_kind) as i32) << REFERENCE_KIND_SHIFT;
        }
        if self.caller_sensitive {
            flags |= CALLER_SENSITIVE;
        }
        flags
    }

    pub fn is_static(&self) -> bool {
        self.modifiers & 0x0008 != 0
    }
}

bitflags! {
    /// `matchFlags` of MethodHandleNatives.getMembers
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MatchFlags: i32 {
        const IS_METHOD = IS_METHOD;
        const IS_CONSTRUCTOR = IS_CONSTRUCTOR;
        const IS_FIELD = IS_FIELD;
        const IS_TYPE = IS_TYPE;
        const SEARCH_SUPERCLASSES = 0x0010_0000;
        const SEARCH_INTERFACES = 0x0020_0000;
    }
}
