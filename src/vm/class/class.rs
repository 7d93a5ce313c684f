use std::fmt::{Debug, Formatter};

use smallvec::SmallVec;

use crate::class_parser::constants::{AccessFlagClass, AccessFlagMethod};
use crate::helper::has_flag;
use crate::vm::class::constant_pool::ConstantPool;
use crate::vm::class::field::{Field, FieldType};
use crate::vm::class::method::Method;
use crate::vm::object::Handle;

/// Index of a class in the VM's class table
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassKind {
    Primitive(FieldType),
    Array { component: ClassId },
    Instance,
}

/// Declared field of a class
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub class: ClassId,
    pub index: u16,
}

/// Declared method of a class
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: ClassId,
    pub index: u16,
}

impl MethodRef {
    /// Direct target stored in a resolved MemberName. Never zero.
    pub fn target(self) -> u64 {
        ((self.class.0 as u64 + 1) << 16) | self.index as u64
    }
}

/// Runtime representation of a class in the method area
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub flag: u16,
    pub kind: ClassKind,
    pub superclass: Option<ClassId>,
    pub interfaces: SmallVec<[ClassId; 4]>,
    /// Every ancestor, root first
    pub superclasses: Vec<ClassId>,
    /// Every implemented interface, own interfaces first
    pub itable: Vec<ClassId>,
    pub vtable: Vec<MethodRef>,
    pub constant_pool: ConstantPool,
    /// Flattened BootstrapMethods table: [bsm_cp_index, arg_count, args...]*
    pub bootstrap_methods: Vec<u16>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub instance_size: u32,
    pub static_slots: u32,
    pub mirror: Handle,
}

impl Debug for Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.id.0)
    }
}

impl Class {
    pub fn is_interface(&self) -> bool {
        has_flag(self.flag, AccessFlagClass::ACC_INTERFACE)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ClassKind::Primitive(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ClassKind::Array { .. })
    }

    pub fn package(&self) -> &str {
        match self.name.rfind('/') {
            Some(i) => &self.name[..i],
            None => ""
        }
    }

    pub fn is_subclass_of(&self, other: ClassId) -> bool {
        self.id == other || self.superclasses.contains(&other)
    }

    pub fn implements(&self, interface: ClassId) -> bool {
        self.id == interface || self.itable.contains(&interface)
    }

    pub fn field(&self, index: u16) -> Option<&Field> {
        self.fields.get(index as usize)
    }

    pub fn method(&self, index: u16) -> Option<&Method> {
        self.methods.get(index as usize)
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<(u16, &Method)> {
        self.methods.iter().enumerate()
            .find(|(_, m)| m.name == name && m.descriptor.to_string() == descriptor)
            .map(|(i, m)| (i as u16, m))
    }

    pub fn find_field(&self, name: &str, descriptor: Option<&str>) -> Option<(u16, &Field)> {
        self.fields.iter().enumerate()
            .find(|(_, f)| f.name == name
                && descriptor.map_or(true, |d| f.descriptor.to_string() == d))
            .map(|(i, f)| (i as u16, f))
    }

    /// Walks the BootstrapMethods table to entry `bsm_index`: (bsm cp index, static arguments)
    pub fn bootstrap_method(&self, bsm_index: u16) -> Option<(u16, &[u16])> {
        let table = &self.bootstrap_methods;
        let mut pos = 0;
        for _ in 0..bsm_index {
            let count = *table.get(pos + 1)? as usize;
            pos += 2 + count;
        }

        let bsm = *table.get(pos)?;
        let count = *table.get(pos + 1)? as usize;
        let args = table.get(pos + 2..pos + 2 + count)?;

        Some((bsm, args))
    }
}

/// Methods inheriting a vtable slot must agree in name and descriptor
pub fn overrides(method: &Method, inherited: &Method) -> bool {
    method.name == inherited.name
        && method.descriptor == inherited.descriptor
        && !has_flag(inherited.flag, AccessFlagMethod::ACC_PRIVATE)
}
