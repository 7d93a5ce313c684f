use std::num::NonZeroU32;
use crate::vm::class::class::ClassId;
use crate::vm::invoke::flags::RefKind;

/// Stable reference to a heap object. Survives relocation, the way a JNI reference does.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Handle(pub(crate) NonZeroU32);

impl Handle {
    pub fn index(self) -> usize {
        self.0.get() as usize - 1
    }

    pub(crate) fn from_index(index: usize) -> Handle {
        Handle(NonZeroU32::new(index as u32 + 1).unwrap_or(NonZeroU32::MIN))
    }
}

/// Current address of an object. Only valid until the heap relocates; every allocation is a
/// potential relocation point, so these must be re-fetched from a `Handle` afterwards.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ObjectPtr {
    pub(crate) addr: u32,
    pub(crate) epoch: u32,
}

/// java/lang/invoke/MemberName
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberName {
    pub flags: i32,
    pub name: Option<Handle>,
    pub type_: Option<Handle>,
    pub clazz: Option<Handle>,
    pub vmindex: u64,
    pub vmtarget: u64,
}

impl MemberName {
    pub fn is_resolved(&self) -> bool {
        self.vmindex != 0 && self.vmtarget != 0
    }
}

/// java/lang/invoke/MethodType
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodType {
    pub rtype: Handle,
    pub ptypes: Vec<Handle>,
    pub descriptor: Option<Handle>,
}

/// java/lang/invoke/MethodHandle (direct handles only)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MethodHandle {
    pub kind: RefKind,
    pub member: Handle,
}

/// java/lang/reflect/Field
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReflectField {
    pub declaring_class: Handle,
    pub slot: u16,
    pub name: Handle,
    pub type_: Handle,
    pub modifiers: u16,
}

/// java/lang/reflect/Method and java/lang/reflect/Constructor
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReflectMethod {
    pub declaring_class: Handle,
    pub slot: u16,
    pub name: Option<Handle>,
    pub signature: Handle,
    pub modifiers: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectArray {
    pub component: ClassId,
    pub elements: Vec<Option<Handle>>,
}

/// java/lang/invoke/CallSite
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CallSite {
    pub target: Option<Handle>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HeapObject {
    String(String),
    /// Class mirror (java/lang/Class)
    Class(ClassId),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    MethodType(MethodType),
    MethodHandle(MethodHandle),
    MemberName(MemberName),
    Field(ReflectField),
    Method(ReflectMethod),
    Constructor(ReflectMethod),
    ObjectArray(ObjectArray),
    IntArray(Vec<i32>),
    CallSite(CallSite),
}

impl HeapObject {
    pub fn type_name(&self) -> &'static str {
        match self {
            HeapObject::String(_) => "java/lang/String",
            HeapObject::Class(_) => "java/lang/Class",
            HeapObject::Integer(_) => "java/lang/Integer",
            HeapObject::Float(_) => "java/lang/Float",
            HeapObject::Long(_) => "java/lang/Long",
            HeapObject::Double(_) => "java/lang/Double",
            HeapObject::MethodType(_) => "java/lang/invoke/MethodType",
            HeapObject::MethodHandle(_) => "java/lang/invoke/MethodHandle",
            HeapObject::MemberName(_) => "java/lang/invoke/MemberName",
            HeapObject::Field(_) => "java/lang/reflect/Field",
            HeapObject::Method(_) => "java/lang/reflect/Method",
            HeapObject::Constructor(_) => "java/lang/reflect/Constructor",
            HeapObject::ObjectArray(_) => "[Ljava/lang/Object;",
            HeapObject::IntArray(_) => "[I",
            HeapObject::CallSite(_) => "java/lang/invoke/CallSite",
        }
    }

    pub fn as_member_name(&self) -> Option<&MemberName> {
        match self {
            HeapObject::MemberName(mn) => Some(mn),
            _ => None
        }
    }

    pub fn as_member_name_mut(&mut self) -> Option<&mut MemberName> {
        match self {
            HeapObject::MemberName(mn) => Some(mn),
            _ => None
        }
    }

    pub fn as_object_array(&self) -> Option<&ObjectArray> {
        match self {
            HeapObject::ObjectArray(array) => Some(array),
            _ => None
        }
    }

    pub fn as_object_array_mut(&mut self) -> Option<&mut ObjectArray> {
        match self {
            HeapObject::ObjectArray(array) => Some(array),
            _ => None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeapObject::String(s) => Some(s),
            _ => None
        }
    }
}

/// Argument/return value crossing the native method boundary.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum JValue {
    Int(i32),
    Long(i64),
    Boolean(bool),
    Ref(Option<Handle>),
}

impl JValue {
    pub fn as_ref(&self) -> Option<Handle> {
        match self {
            JValue::Ref(r) => *r,
            _ => None
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            JValue::Int(i) => *i,
            JValue::Boolean(b) => *b as i32,
            JValue::Long(l) => *l as i32,
            JValue::Ref(_) => 0,
        }
    }

    pub fn as_bool(&self) -> bool {
        self.as_int() != 0
    }
}
