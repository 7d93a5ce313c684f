use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::class_parser::constants::CPTag;
use crate::helper::split_slots;
use crate::vm::class::class::Class;
use crate::vm::error::VmResult;
use crate::vm::invoke::flags::RefKind;
use crate::vm::object::Handle;
use crate::vm::vm::Vm;

/// Symbolic reference to a field or method: owning class entry, name and descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicRef {
    pub class: u16,
    pub name: String,
    pub descriptor: String,
}

/// A constant pool slot. Loadable reference kinds memoize their resolved value once.
#[derive(Debug, Clone)]
pub enum CPEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    /// 64 bit literals are kept as two 32 bit slots in platform order
    Long([u32; 2]),
    Double([u32; 2]),
    Class { name: String, resolved: OnceCell<Handle> },
    String { value: String, resolved: OnceCell<Handle> },
    MethodType { descriptor: String, resolved: OnceCell<Handle> },
    MethodHandle { kind: RefKind, reference: u16, resolved: OnceCell<Handle> },
    Dynamic { bsm_index: u16, name: String, descriptor: String, resolved: OnceCell<Handle> },
    Fieldref(SymbolicRef),
    Methodref(SymbolicRef),
    InterfaceMethodref(SymbolicRef),
    NameAndType { name: String, descriptor: String },
    InvokeDynamic { bsm_index: u16, name: String, descriptor: String },
    Hole
}

/// Resolution entry point of the class linker for one kind of slot
pub type SlotResolver = fn(&Vm, &Arc<Class>, u16) -> VmResult<Handle>;

fn resolve_class_slot(vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
    vm.linker().resolve_class(vm, class, index)
}

fn resolve_string_slot(vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
    vm.linker().resolve_string(vm, class, index)
}

fn resolve_method_type_slot(vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
    vm.linker().resolve_method_type(vm, class, index)
}

fn resolve_method_handle_slot(vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
    vm.linker().resolve_method_handle(vm, class, index)
}

fn resolve_dynamic_slot(vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
    vm.linker().resolve_dynamic_constant(vm, class, index)
}

impl CPEntry {
    pub fn class(name: &str) -> CPEntry {
        CPEntry::Class { name: name.to_string(), resolved: OnceCell::new() }
    }

    pub fn string(value: &str) -> CPEntry {
        CPEntry::String { value: value.to_string(), resolved: OnceCell::new() }
    }

    pub fn method_type(descriptor: &str) -> CPEntry {
        CPEntry::MethodType { descriptor: descriptor.to_string(), resolved: OnceCell::new() }
    }

    pub fn method_handle(kind: RefKind, reference: u16) -> CPEntry {
        CPEntry::MethodHandle { kind, reference, resolved: OnceCell::new() }
    }

    pub fn dynamic(bsm_index: u16, name: &str, descriptor: &str) -> CPEntry {
        CPEntry::Dynamic {
            bsm_index,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            resolved: OnceCell::new()
        }
    }

    pub fn long(value: i64) -> CPEntry {
        let (a, b) = split_slots(value as u64);
        CPEntry::Long([a, b])
    }

    pub fn double(value: f64) -> CPEntry {
        let (a, b) = split_slots(value.to_bits());
        CPEntry::Double([a, b])
    }

    pub fn member(class: u16, name: &str, descriptor: &str) -> SymbolicRef {
        SymbolicRef { class, name: name.to_string(), descriptor: descriptor.to_string() }
    }

    pub fn tag(&self) -> Option<CPTag> {
        match self {
            CPEntry::Utf8(_) => Some(CPTag::Utf8),
            CPEntry::Integer(_) => Some(CPTag::Integer),
            CPEntry::Float(_) => Some(CPTag::Float),
            CPEntry::Long(_) => Some(CPTag::Long),
            CPEntry::Double(_) => Some(CPTag::Double),
            CPEntry::Class { .. } => Some(CPTag::Class),
            CPEntry::String { .. } => Some(CPTag::String),
            CPEntry::MethodType { .. } => Some(CPTag::MethodType),
            CPEntry::MethodHandle { .. } => Some(CPTag::MethodHandle),
            CPEntry::Dynamic { .. } => Some(CPTag::Dynamic),
            CPEntry::Fieldref(_) => Some(CPTag::Fieldref),
            CPEntry::Methodref(_) => Some(CPTag::Methodref),
            CPEntry::InterfaceMethodref(_) => Some(CPTag::InterfaceMethodref),
            CPEntry::NameAndType { .. } => Some(CPTag::NameAndType),
            CPEntry::InvokeDynamic { .. } => Some(CPTag::InvokeDynamic),
            CPEntry::Hole => None
        }
    }

    /// Memo cell of a lazily resolved slot
    pub fn memo(&self) -> Option<&OnceCell<Handle>> {
        match self {
            CPEntry::Class { resolved, .. }
            | CPEntry::String { resolved, .. }
            | CPEntry::MethodType { resolved, .. }
            | CPEntry::MethodHandle { resolved, .. }
            | CPEntry::Dynamic { resolved, .. } => Some(resolved),
            _ => None
        }
    }

    pub fn resolver(&self) -> Option<SlotResolver> {
        match self {
            CPEntry::Class { .. } => Some(resolve_class_slot),
            CPEntry::String { .. } => Some(resolve_string_slot),
            CPEntry::MethodType { .. } => Some(resolve_method_type_slot),
            CPEntry::MethodHandle { .. } => Some(resolve_method_handle_slot),
            CPEntry::Dynamic { .. } => Some(resolve_dynamic_slot),
            _ => None
        }
    }

    /// Number of pool indices the entry occupies
    pub fn width(&self) -> usize {
        match self {
            CPEntry::Long(_) | CPEntry::Double(_) => 2,
            _ => 1
        }
    }
}

/// Constant pool indexed like the class file: index 0 is unused.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    entries: Vec<CPEntry>
}

impl ConstantPool {
    /// Builds a pool from entries in class file order. Long and Double get their trailing hole.
    pub fn new(entries: Vec<CPEntry>) -> ConstantPool {
        let mut pool = Vec::with_capacity(entries.len() + 1);
        pool.push(CPEntry::Hole);
        for e in entries {
            let width = e.width();
            pool.push(e);
            if width == 2 {
                pool.push(CPEntry::Hole);
            }
        }

        ConstantPool { entries: pool }
    }

    pub fn get(&self, index: u16) -> Option<&CPEntry> {
        match self.entries.get(index as usize) {
            Some(CPEntry::Hole) | None => None,
            entry => entry
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        ConstantPool::new(vec![])
    }
}

#[cfg(test)]
mod tests {
    use crate::class_parser::constants::CPTag;
    use crate::helper::join_slots;
    use crate::vm::class::constant_pool::{ConstantPool, CPEntry};

    #[test]
    fn wide_entries_take_two_indices() {
        let pool = ConstantPool::new(vec![
            CPEntry::long(-2),
            CPEntry::Integer(5),
            CPEntry::double(0.5),
            CPEntry::class("java/lang/Object"),
        ]);

        assert_eq!(pool.len(), 7);
        assert!(pool.get(0).is_none());
        assert!(pool.get(2).is_none());
        assert_eq!(pool.get(3).and_then(CPEntry::tag), Some(CPTag::Integer));
        assert_eq!(pool.get(6).and_then(CPEntry::tag), Some(CPTag::Class));

        match pool.get(1) {
            Some(CPEntry::Long([a, b])) => assert_eq!(join_slots(*a, *b) as i64, -2),
            other => panic!("{:?}", other)
        }
        assert!(pool.get(6).unwrap().resolver().is_some());
        assert!(pool.get(3).unwrap().memo().is_none());
    }
}
