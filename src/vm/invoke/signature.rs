use std::sync::Arc;

use tracing::trace;

use crate::vm::class::class::{Class, ClassKind};
use crate::vm::class::field::FieldType;
use crate::vm::class::method::MethodDescriptor;
use crate::vm::error::{Exception, ExceptionKind, VmResult};
use crate::vm::object::{Handle, HeapObject, MethodType};
use crate::vm::vm::Vm;

fn reserve(buf: &mut String, additional: usize) -> VmResult<()> {
    buf.try_reserve(additional).map_err(|_| Exception::native_oom())
}

fn primitive_char(t: &FieldType) -> Option<char> {
    match t {
        FieldType::L(_) | FieldType::A(_) => None,
        primitive => primitive.to_string().chars().next()
    }
}

fn append_signature(vm: &Vm, class: &Class, buf: &mut String) -> VmResult<()> {
    let mut dimensions = 0;
    let mut base = vm.class(class.id);
    while let ClassKind::Array { component } = base.kind {
        dimensions += 1;
        base = vm.class(component);
    }

    let base_len = match &base.kind {
        ClassKind::Primitive(_) => 1,
        _ => base.name.len() + 2
    };
    reserve(buf, dimensions + base_len)?;

    for _ in 0..dimensions {
        buf.push('[');
    }
    match &base.kind {
        ClassKind::Primitive(t) => buf.push(primitive_char(t)
            .ok_or_else(|| Exception::internal("primitive class without a descriptor letter"))?),
        _ => {
            buf.push('L');
            buf.push_str(&base.name);
            buf.push(';');
        }
    }

    Ok(())
}

/// Descriptor of a class: `I`, `Ljava/lang/String;`, `[[J`, ...
pub fn signature_of(vm: &Vm, class: &Class) -> VmResult<String> {
    let mut buf = String::new();
    append_signature(vm, class, &mut buf)?;
    Ok(buf)
}

/// Descriptor of the class a `java/lang/Class` object stands for
pub fn signature_of_mirror(vm: &Vm, mirror: Handle) -> VmResult<String> {
    let class = vm.class_of_mirror(mirror)
        .ok_or_else(|| Exception::with_message(ExceptionKind::IllegalArgument, "not a class object"))?;
    signature_of(vm, &class)
}

/// `(` params `)` return, from class objects
pub fn method_descriptor(vm: &Vm, rtype: Handle, ptypes: &[Handle]) -> VmResult<String> {
    let mut buf = String::new();
    reserve(&mut buf, 2)?;
    buf.push('(');
    for p in ptypes {
        let class = vm.class_of_mirror(*p)
            .ok_or_else(|| Exception::with_message(ExceptionKind::IllegalArgument, "parameter type is not a class"))?;
        append_signature(vm, &class, &mut buf)?;
    }
    buf.push(')');

    let class = vm.class_of_mirror(rtype)
        .ok_or_else(|| Exception::with_message(ExceptionKind::IllegalArgument, "return type is not a class"))?;
    append_signature(vm, &class, &mut buf)?;

    Ok(buf)
}

pub fn class_for_field_type(vm: &Vm, t: &FieldType) -> VmResult<Arc<Class>> {
    vm.load_class(&t.class_name())
}

/// Loads the class a field descriptor (or `V`) names
pub fn class_for_descriptor(vm: &Vm, descriptor: &str) -> VmResult<Arc<Class>> {
    let t = FieldType::parse_return(descriptor)
        .ok_or_else(|| Exception::with_message(ExceptionKind::ClassFormat,
                                               format!("invalid type descriptor {}", descriptor)))?;
    class_for_field_type(vm, &t)
}

/// Builds a `java/lang/invoke/MethodType` from a method descriptor
pub fn method_type_from_descriptor(vm: &Vm, descriptor: &str) -> VmResult<Handle> {
    let parsed = MethodDescriptor::parse(descriptor)
        .ok_or_else(|| Exception::with_message(ExceptionKind::ClassFormat,
                                               format!("invalid method descriptor {}", descriptor)))?;

    let mut ptypes = Vec::with_capacity(parsed.parameters.len());
    for p in &parsed.parameters {
        ptypes.push(class_for_field_type(vm, p)?.mirror);
    }
    let rtype = class_for_field_type(vm, &parsed.ret)?.mirror;
    let descriptor = vm.intern(descriptor)?;

    trace!(descriptor = %parsed, "creating MethodType");
    vm.heap.allocate(HeapObject::MethodType(MethodType {
        rtype,
        ptypes,
        descriptor: Some(descriptor)
    }))
}

enum TypeShape {
    MethodType(MethodType),
    String(String),
    Class,
}

/// Signature of a MemberName's `type`: a MethodType, a descriptor string or a class object.
/// A MethodType without a cached descriptor gets one stored.
pub fn type_to_signature(vm: &Vm, type_: Handle) -> VmResult<String> {
    let shape = vm.heap.read(type_, |obj| match obj {
        HeapObject::MethodType(mt) => Some(TypeShape::MethodType(mt.clone())),
        HeapObject::String(s) => Some(TypeShape::String(s.clone())),
        HeapObject::Class(_) => Some(TypeShape::Class),
        _ => None
    });

    match shape {
        Some(TypeShape::MethodType(mt)) => {
            if let Some(descriptor) = mt.descriptor {
                return vm.string_value(descriptor);
            }

            let signature = method_descriptor(vm, mt.rtype, &mt.ptypes)?;
            let interned = vm.intern(&signature)?;

            // interning may have moved the MethodType
            vm.heap.write(type_, |obj| {
                if let HeapObject::MethodType(mt) = obj {
                    mt.descriptor.get_or_insert(interned);
                }
            });
            Ok(signature)
        }
        Some(TypeShape::String(s)) => Ok(s),
        Some(TypeShape::Class) => signature_of_mirror(vm, type_),
        None => Err(Exception::with_message(ExceptionKind::InternalError,
                                            "MemberName type is neither a MethodType, a String nor a Class"))
    }
}
