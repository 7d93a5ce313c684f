use std::fmt::{Debug, Display, Formatter};

use smallvec::SmallVec;

use crate::class_parser::constants::AccessFlagMethod;
use crate::helper::has_flag;
use crate::vm::class::field::FieldType;
use crate::vm::object::JValue;
use crate::vm::thread::thread::VMThread;
use crate::vm::vm::Vm;

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub ret: FieldType
}

impl Display for MethodDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for p in &self.parameters {
            write!(f, "{}", p)?;
        }
        write!(f, "){}", self.ret)
    }
}

/// How invocations of a method are dispatched
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Dispatch {
    /// Static, private or initializer; no dispatch slot
    Direct,
    /// vtable index
    Virtual(u16),
    /// Index among the declaring interface's methods
    Interface(u16),
}

pub const MAX_NO_OF_ARGS: usize = 16;

pub type NativeArgs = SmallVec<[JValue; MAX_NO_OF_ARGS]>;

pub type NativeFnPtr = fn(&Vm, &mut VMThread, NativeArgs) -> Option<JValue>;

#[derive(Clone)]
pub struct Method {
    pub flag: u16,
    pub name: String,
    pub descriptor: MethodDescriptor,
    pub dispatch: Dispatch,
    pub caller_sensitive: bool,
    pub native: Option<NativeFnPtr>,
}

impl Debug for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{} {:?}", self.name, self.descriptor, self.dispatch)
    }
}

impl Method {
    pub fn is_static(&self) -> bool {
        has_flag(self.flag, AccessFlagMethod::ACC_STATIC)
    }

    pub fn is_final(&self) -> bool {
        has_flag(self.flag, AccessFlagMethod::ACC_FINAL)
    }

    pub fn is_private(&self) -> bool {
        has_flag(self.flag, AccessFlagMethod::ACC_PRIVATE)
    }

    pub fn is_abstract(&self) -> bool {
        has_flag(self.flag, AccessFlagMethod::ACC_ABSTRACT)
    }

    pub fn is_native(&self) -> bool {
        has_flag(self.flag, AccessFlagMethod::ACC_NATIVE)
    }

    pub fn is_initializer(&self) -> bool {
        self.name.starts_with('<')
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>" && self.descriptor.ret == FieldType::V
    }
}
