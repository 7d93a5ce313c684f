use std::sync::Arc;

use smallvec::smallvec;

use crate::class_parser::constants::AccessFlagClass;
use crate::vm::class::class::{Class, ClassKind};
use crate::vm::class::constant_pool::ConstantPool;
use crate::vm::class::field::{FieldType, OBJECT_HEADER_SIZE};
use crate::vm::error::{Exception, ExceptionKind, VmResult};
use crate::vm::invoke::signature::signature_of;
use crate::vm::vm::Vm;

const ARRAY_FLAGS: u16 = AccessFlagClass::ACC_FINAL as u16 | AccessFlagClass::ACC_ABSTRACT as u16;

impl Vm {
    /// `int`, `void`, ...: no superclass, no members
    pub(crate) fn define_primitive_class(&self, component: FieldType) -> VmResult<Arc<Class>> {
        let name = component.primitive_name()
            .ok_or_else(|| Exception::internal(format!("{} is not a primitive type", component)))?;

        self.add_class(name, |id, mirror| Class {
            id,
            name: name.to_string(),
            flag: AccessFlagClass::ACC_PUBLIC as u16 | ARRAY_FLAGS,
            kind: ClassKind::Primitive(component),
            superclass: None,
            interfaces: Default::default(),
            superclasses: vec![],
            itable: vec![],
            vtable: vec![],
            constant_pool: ConstantPool::default(),
            bootstrap_methods: vec![],
            fields: vec![],
            methods: vec![],
            instance_size: 0,
            static_slots: 0,
            mirror
        })
    }

    /// The array class with the given component. Named by its descriptor, like `[I`.
    pub fn define_array_class(&self, component: &Arc<Class>) -> VmResult<Arc<Class>> {
        if component.kind == ClassKind::Primitive(FieldType::V) {
            return Err(Exception::with_message(ExceptionKind::NoClassDefFound, "[V"));
        }

        let name = format!("[{}", signature_of(self, component)?);
        if let Some(class) = self.find_class(&name) {
            return Ok(class);
        }

        let object = self.core_class("java/lang/Object")?;
        let cloneable = self.core_class("java/lang/Cloneable")?;
        let serializable = self.core_class("java/io/Serializable")?;
        let flag = (component.flag & AccessFlagClass::ACC_PUBLIC as u16) | ARRAY_FLAGS;

        self.add_class(&name, |id, mirror| Class {
            id,
            name: name.clone(),
            flag,
            kind: ClassKind::Array { component: component.id },
            superclass: Some(object.id),
            interfaces: smallvec![cloneable.id, serializable.id],
            superclasses: vec![object.id],
            itable: vec![cloneable.id, serializable.id],
            vtable: object.vtable.clone(),
            constant_pool: ConstantPool::default(),
            bootstrap_methods: vec![],
            fields: vec![],
            methods: vec![],
            instance_size: OBJECT_HEADER_SIZE,
            static_slots: 0,
            mirror
        })
    }
}
