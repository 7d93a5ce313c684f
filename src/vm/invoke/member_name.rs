//! The `MemberName` state machine: `init` fills a descriptor from a reflection object, `expand`
//! recovers symbolic fields from a resolved one, `resolve` turns symbolic fields into a vmindex
//! and vmtarget.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::vm::class::class::{Class, FieldRef, MethodRef};
use crate::vm::class::method::{Dispatch, Method};
use crate::vm::error::{Exception, ExceptionKind, VmResult};
use crate::vm::invoke::flags::{MemberFlags, MemberKind, RefKind, FIELD_ACCESS_MASK, METHOD_ACCESS_MASK};
use crate::vm::invoke::lookup::{lookup_field, lookup_method};
use crate::vm::invoke::signature::{class_for_field_type, type_to_signature};
use crate::vm::object::{Handle, HeapObject, MemberName, ReflectField, ReflectMethod};
use crate::vm::reflect::MemberId;
use crate::vm::vm::Vm;

pub fn read_member_name(vm: &Vm, mn: Handle) -> VmResult<MemberName> {
    vm.heap.read(mn, |obj| obj.as_member_name().copied())
        .ok_or_else(|| Exception::internal("not a MemberName"))
}

/// Applies `update` to the MemberName in one heap critical section
fn update_member_name(vm: &Vm, mn: Handle, update: impl FnOnce(&mut MemberName)) -> VmResult<()> {
    vm.heap.write(mn, |obj| obj.as_member_name_mut().map(update))
        .ok_or_else(|| Exception::internal("not a MemberName"))
}

/// Reference kind a method is invoked with when nothing else asks for a particular one
pub fn method_ref_kind(method: &Method) -> RefKind {
    match method.dispatch {
        Dispatch::Interface(_) => RefKind::InvokeInterface,
        _ if method.is_static() => RefKind::InvokeStatic,
        Dispatch::Direct => RefKind::InvokeSpecial,
        _ if method.is_final() => RefKind::InvokeSpecial,
        Dispatch::Virtual(_) => RefKind::InvokeVirtual,
    }
}

fn method_flags(method: &Method, kind: MemberKind, ref_kind: RefKind) -> MemberFlags {
    MemberFlags {
        kind: Some(kind),
        ref_kind: Some(ref_kind),
        modifiers: method.flag & METHOD_ACCESS_MASK,
        caller_sensitive: method.caller_sensitive
    }
}

enum Reflected {
    Field(ReflectField),
    Method(ReflectMethod),
    Constructor(ReflectMethod),
}

/// Populates `mn` from a `java/lang/reflect/{Field,Method,Constructor}` object
pub fn init(vm: &Vm, mn: Handle, ref_obj: Handle) -> VmResult<()> {
    let reflected = vm.heap.read(ref_obj, |obj| match obj {
        HeapObject::Field(f) => Some(Reflected::Field(*f)),
        HeapObject::Method(m) => Some(Reflected::Method(*m)),
        HeapObject::Constructor(c) => Some(Reflected::Constructor(*c)),
        _ => None
    }).ok_or_else(|| Exception::with_message(ExceptionKind::IllegalArgument, "unrecognized reflection object"))?;

    match reflected {
        Reflected::Field(f) => {
            let class = declaring_class(vm, f.declaring_class)?;
            let field = class.field(f.slot)
                .ok_or_else(|| Exception::internal("field slot out of range"))?;

            let ref_kind = if field.is_static() { RefKind::GetStatic } else { RefKind::GetField };
            let flags = MemberFlags::new(MemberKind::Field, ref_kind, field.flag & FIELD_ACCESS_MASK);
            let vmindex = vm.ids.field_id(FieldRef { class: class.id, index: f.slot });
            let vmtarget = field.target();

            trace!(class = %class.name, field = %field.name, vmindex, vmtarget, "init field");
            update_member_name(vm, mn, |m| {
                m.flags = flags.encode();
                m.name = Some(f.name);
                m.type_ = Some(f.type_);
                m.clazz = Some(f.declaring_class);
                m.vmindex = vmindex;
                m.vmtarget = vmtarget;
            })
        }
        Reflected::Method(r) => init_method(vm, mn, r, false),
        Reflected::Constructor(r) => init_method(vm, mn, r, true),
    }
}

fn init_method(vm: &Vm, mn: Handle, r: ReflectMethod, constructor: bool) -> VmResult<()> {
    let class = declaring_class(vm, r.declaring_class)?;
    let method = class.method(r.slot)
        .ok_or_else(|| Exception::internal("method slot out of range"))?;
    let method_ref = MethodRef { class: class.id, index: r.slot };

    let flags = if constructor {
        method_flags(method, MemberKind::Constructor, RefKind::InvokeSpecial)
    } else {
        method_flags(method, MemberKind::Method, method_ref_kind(method))
    };
    let vmindex = vm.ids.method_id(method_ref);
    let vmtarget = method_ref.target();

    trace!(class = %class.name, method = %method.name, vmindex, vmtarget, "init method");
    update_member_name(vm, mn, |m| {
        m.flags = flags.encode();
        m.name = if constructor { None } else { r.name };
        m.type_ = Some(r.signature);
        m.clazz = Some(r.declaring_class);
        m.vmindex = vmindex;
        m.vmtarget = vmtarget;
    })
}

fn declaring_class(vm: &Vm, mirror: Handle) -> VmResult<Arc<Class>> {
    vm.class_of_mirror(mirror)
        .ok_or_else(|| Exception::internal("declaring class is not a class object"))
}

/// Fills missing name, type and (for methods) declaring class from the member behind `vmindex`
pub fn expand(vm: &Vm, mn: Handle) -> VmResult<()> {
    let m = read_member_name(vm, mn)?;
    let flags = MemberFlags::decode(m.flags);

    match flags.kind {
        Some(MemberKind::Field) => {
            if m.clazz.is_none() || m.vmindex == 0 {
                return Err(Exception::with_message(ExceptionKind::IllegalArgument, "nothing to expand"));
            }
            let field_ref = match vm.ids.get(m.vmindex) {
                Some(MemberId::Field(field_ref)) => field_ref,
                _ => return Err(Exception::with_message(ExceptionKind::IllegalArgument, "nothing to expand"))
            };
            let class = vm.class(field_ref.class);
            let field = class.field(field_ref.index)
                .ok_or_else(|| Exception::internal("field slot out of range"))?;

            let name = match m.name {
                None => Some(vm.intern(&field.name)?),
                Some(_) => None
            };
            let type_ = match m.type_ {
                None => Some(class_for_field_type(vm, &field.descriptor)?.mirror),
                Some(_) => None
            };

            update_member_name(vm, mn, |m| {
                if m.name.is_none() {
                    m.name = name;
                }
                if m.type_.is_none() {
                    m.type_ = type_;
                }
            })
        }
        Some(MemberKind::Method) | Some(MemberKind::Constructor) => {
            if m.vmindex == 0 {
                return Err(Exception::internal("nothing to expand"));
            }
            let method_ref = match vm.ids.get(m.vmindex) {
                Some(MemberId::Method(method_ref)) => method_ref,
                _ => return Err(Exception::internal("nothing to expand"))
            };
            let class = vm.class(method_ref.class);
            let method = class.method(method_ref.index)
                .ok_or_else(|| Exception::internal("method slot out of range"))?;

            let name = match m.name {
                None => Some(vm.intern(&method.name)?),
                Some(_) => None
            };
            let type_ = match m.type_ {
                None => Some(vm.intern(&method.descriptor.to_string())?),
                Some(_) => None
            };

            update_member_name(vm, mn, |m| {
                if m.clazz.is_none() {
                    m.clazz = Some(class.mirror);
                }
                if m.name.is_none() {
                    m.name = name;
                }
                if m.type_.is_none() {
                    m.type_ = type_;
                }
            })
        }
        _ => Err(Exception::internal("nothing to expand"))
    }
}

/// Resolves `mn` against its declaring class. Returns `mn` itself on success and when it is
/// already resolved. A speculative resolution swallows every failure and returns `None`.
pub fn resolve(vm: &Vm, mn: Handle, caller: Option<Handle>, speculative: bool) -> VmResult<Option<Handle>> {
    match resolve_member(vm, mn, caller, speculative) {
        Ok(Some(resolved)) => Ok(Some(resolved)),
        Ok(None) if speculative => Ok(None),
        Ok(None) => Err(resolution_failure(vm, mn)),
        Err(e) if speculative => {
            warn!(exception = %e, member = %vm.describe(Some(mn)), "speculative resolution failed");
            Ok(None)
        }
        Err(e) => Err(e)
    }
}

fn resolution_failure(vm: &Vm, mn: Handle) -> Exception {
    let kind = read_member_name(vm, mn).ok()
        .and_then(|m| MemberFlags::decode(m.flags).kind);

    match kind {
        Some(MemberKind::Field) =>
            Exception::with_message(ExceptionKind::NoSuchField, "field resolution failed"),
        Some(MemberKind::Method) | Some(MemberKind::Constructor) =>
            Exception::with_message(ExceptionKind::NoSuchMethod, "method resolution failed"),
        _ => Exception::with_message(ExceptionKind::LinkageError, "resolution failed"),
    }
}

/// `Ok(None)` when the member does not exist
fn resolve_member(vm: &Vm, mn: Handle, caller: Option<Handle>, speculative: bool) -> VmResult<Option<Handle>> {
    let m = read_member_name(vm, mn)?;
    if m.vmtarget != 0 {
        return Ok(Some(mn));
    }

    let flags = MemberFlags::decode(m.flags);
    let ref_kind = flags.ref_kind
        .ok_or_else(|| Exception::internal("obsolete MemberName format"))?;

    let (name, type_, clazz) = match (m.name, m.type_, m.clazz) {
        (Some(name), Some(type_), Some(clazz)) => (name, type_, clazz),
        _ => return Ok(None)
    };

    let mut defc = match vm.class_of_mirror(clazz) {
        Some(defc) => defc,
        None => return Ok(None)
    };
    if defc.is_primitive() {
        return Ok(None);
    }
    if defc.is_array() {
        defc = vm.core_class("java/lang/Object")?;
    }

    let caller = match caller {
        Some(caller) => Some(vm.class_of_mirror(caller)
            .ok_or_else(|| Exception::with_message(ExceptionKind::IllegalArgument, "caller is not a class"))?),
        None => None
    };

    let name = vm.string_value(name)?;
    let signature = type_to_signature(vm, type_)?;
    trace!(class = %defc.name, %name, %signature, %ref_kind, "resolving");

    match flags.kind {
        Some(MemberKind::Method) | Some(MemberKind::Constructor) => {
            let constructor = flags.kind == Some(MemberKind::Constructor);
            if (name == "<init>") != constructor || name == "<clinit>" {
                return Ok(None);
            }

            let found = match lookup_method(vm, &defc, &name, &signature, ref_kind, caller.as_ref(), speculative)? {
                Some(found) => found,
                None => return Ok(None)
            };
            let declaring = vm.class(found.class);
            let method = declaring.method(found.index)
                .ok_or_else(|| Exception::internal("method slot out of range"))?;

            let ref_kind = match ref_kind {
                RefKind::InvokeInterface if !declaring.is_interface() => RefKind::InvokeVirtual,
                ref_kind => ref_kind
            };
            let kind = if constructor { MemberKind::Constructor } else { MemberKind::Method };
            let flags = method_flags(method, kind, ref_kind);

            commit(vm, mn, flags, declaring.mirror, vm.ids.method_id(found), found.target())?;
        }
        Some(MemberKind::Field) => {
            let (found, ref_kind) = match lookup_field(vm, &defc, &name, &signature, ref_kind,
                                                       caller.as_ref(), speculative)? {
                Some(found) => found,
                None => return Ok(None)
            };
            let declaring = vm.class(found.class);
            let field = declaring.field(found.index)
                .ok_or_else(|| Exception::internal("field slot out of range"))?;

            let flags = MemberFlags::new(MemberKind::Field, ref_kind, field.flag & FIELD_ACCESS_MASK);
            commit(vm, mn, flags, declaring.mirror, vm.ids.field_id(found), field.target())?;
        }
        _ => return Ok(None)
    }

    Ok(Some(mn))
}

fn commit(vm: &Vm, mn: Handle, flags: MemberFlags, clazz: Handle, vmindex: u64, vmtarget: u64) -> VmResult<()> {
    debug!(member = %vm.describe(Some(mn)), vmindex, vmtarget, "resolved");
    update_member_name(vm, mn, |m| {
        m.flags = flags.encode();
        m.clazz = Some(clazz);
        m.vmindex = vmindex;
        m.vmtarget = vmtarget;
    })
}

/// A resolved field MemberName, checked for the static bit
fn resolved_field(vm: &Vm, mn: Handle, want_static: bool) -> VmResult<MemberName> {
    let m = read_member_name(vm, mn)?;
    let flags = MemberFlags::decode(m.flags);

    if m.clazz.is_none() || !m.is_resolved() {
        return Err(Exception::internal("mname not resolved"));
    }
    if flags.kind != Some(MemberKind::Field) || flags.is_static() != want_static {
        return Err(Exception::internal(if want_static { "not a static field" } else { "not an instance field" }));
    }

    Ok(m)
}

/// Byte offset of a resolved instance field
pub fn object_field_offset(vm: &Vm, mn: Handle) -> VmResult<i64> {
    resolved_field(vm, mn, false).map(|m| m.vmtarget as i64)
}

/// Storage offset of a resolved static field
pub fn static_field_offset(vm: &Vm, mn: Handle) -> VmResult<i64> {
    resolved_field(vm, mn, true).map(|m| m.vmtarget as i64)
}

/// Object holding a resolved static field: the declaring class
pub fn static_field_base(vm: &Vm, mn: Handle) -> VmResult<Handle> {
    resolved_field(vm, mn, true)?.clazz
        .ok_or_else(|| Exception::internal("mname not resolved"))
}

/// `Object[2]`: (offset, declaring class) for fields, (dispatch index or -1, mn) for methods
pub fn get_member_vm_info(vm: &Vm, mn: Handle) -> VmResult<Handle> {
    let m = read_member_name(vm, mn)?;
    if m.vmindex == 0 {
        return Err(Exception::internal("mname not resolved"));
    }

    let (index, second) = match vm.ids.get(m.vmindex) {
        Some(MemberId::Field(_)) => (m.vmtarget as i64, m.clazz),
        Some(MemberId::Method(method_ref)) => {
            let class = vm.class(method_ref.class);
            let index = match class.method(method_ref.index).map(|method| method.dispatch) {
                Some(Dispatch::Virtual(i)) | Some(Dispatch::Interface(i)) => i as i64,
                _ => -1
            };
            (index, Some(mn))
        }
        None => return Err(Exception::internal("unknown vmindex"))
    };

    let object = vm.core_class("java/lang/Object")?;
    let info = vm.new_object_array(object.id, 2)?;
    let index = vm.box_long(index)?;

    vm.heap.write(info, |obj| {
        if let Some(array) = obj.as_object_array_mut() {
            array.elements[0] = Some(index);
            array.elements[1] = second;
        }
    });

    Ok(info)
}
