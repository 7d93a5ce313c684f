use std::collections::HashMap;

use parking_lot::RwLock;

use crate::vm::class::class::{FieldRef, MethodRef};
use crate::vm::error::{Exception, VmResult};
use crate::vm::invoke::signature::class_for_field_type;
use crate::vm::object::{Handle, HeapObject, ReflectField, ReflectMethod};
use crate::vm::vm::Vm;

/// Compiled member behind a `vmindex`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberId {
    Field(FieldRef),
    Method(MethodRef),
}

#[derive(Debug, Default)]
struct Registry {
    members: Vec<MemberId>,
    ids: HashMap<MemberId, u64>,
}

/// Hands out stable, non-zero identity handles for compiled members
#[derive(Debug, Default)]
pub struct IdRegistry {
    inner: RwLock<Registry>,
}

impl IdRegistry {
    pub fn id(&self, member: MemberId) -> u64 {
        if let Some(id) = self.inner.read().ids.get(&member) {
            return *id;
        }

        let mut registry = self.inner.write();
        if let Some(id) = registry.ids.get(&member) {
            return *id;
        }
        registry.members.push(member);
        let id = registry.members.len() as u64;
        registry.ids.insert(member, id);
        id
    }

    pub fn field_id(&self, field: FieldRef) -> u64 {
        self.id(MemberId::Field(field))
    }

    pub fn method_id(&self, method: MethodRef) -> u64 {
        self.id(MemberId::Method(method))
    }

    pub fn get(&self, id: u64) -> Option<MemberId> {
        let index = (id as usize).checked_sub(1)?;
        self.inner.read().members.get(index).copied()
    }
}

/// Builds java/lang/reflect objects for compiled members
pub trait ReflectionFactory: Send + Sync {
    fn create_field_object(&self, vm: &Vm, field: FieldRef) -> VmResult<Handle>;
    fn create_method_object(&self, vm: &Vm, method: MethodRef) -> VmResult<Handle>;
    fn create_constructor_object(&self, vm: &Vm, method: MethodRef) -> VmResult<Handle>;
}

pub struct HeapReflectionFactory;

impl HeapReflectionFactory {
    fn method_object(vm: &Vm, method: MethodRef, constructor: bool) -> VmResult<Handle> {
        let class = vm.class(method.class);
        let m = class.method(method.index)
            .ok_or_else(|| Exception::internal("method slot out of range"))?;

        let name = if constructor { None } else { Some(vm.intern(&m.name)?) };
        let signature = vm.intern(&m.descriptor.to_string())?;
        let reflect = ReflectMethod {
            declaring_class: class.mirror,
            slot: method.index,
            name,
            signature,
            modifiers: m.flag
        };

        vm.heap.allocate(if constructor {
            HeapObject::Constructor(reflect)
        } else {
            HeapObject::Method(reflect)
        })
    }
}

impl ReflectionFactory for HeapReflectionFactory {
    fn create_field_object(&self, vm: &Vm, field: FieldRef) -> VmResult<Handle> {
        let class = vm.class(field.class);
        let f = class.field(field.index)
            .ok_or_else(|| Exception::internal("field slot out of range"))?;

        let type_ = class_for_field_type(vm, &f.descriptor)?.mirror;
        let name = vm.intern(&f.name)?;

        vm.heap.allocate(HeapObject::Field(ReflectField {
            declaring_class: class.mirror,
            slot: field.index,
            name,
            type_,
            modifiers: f.flag
        }))
    }

    fn create_method_object(&self, vm: &Vm, method: MethodRef) -> VmResult<Handle> {
        HeapReflectionFactory::method_object(vm, method, false)
    }

    fn create_constructor_object(&self, vm: &Vm, method: MethodRef) -> VmResult<Handle> {
        HeapReflectionFactory::method_object(vm, method, true)
    }
}
