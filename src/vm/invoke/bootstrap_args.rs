use std::sync::Arc;

use tracing::trace;

use crate::vm::class::class::Class;
use crate::vm::class::constant_pool::CPEntry;
use crate::vm::error::{Exception, ExceptionKind, VmResult};
use crate::vm::invoke::constant_ref::resolve_ref_to_object;
use crate::vm::invoke::signature::{class_for_descriptor, method_type_from_descriptor};
use crate::vm::object::Handle;
use crate::vm::vm::Vm;

/// Pseudo index of the bootstrap method handle
pub const BSM_INDEX: i32 = -4;
pub const NAME_INDEX: i32 = -3;
pub const TYPE_INDEX: i32 = -2;
pub const ARG_COUNT_INDEX: i32 = -1;

fn linkage_error(message: String) -> Exception {
    Exception::with_message(ExceptionKind::LinkageError, message)
}

/// Copies the bootstrap arguments `start..end` of the dynamic constant at `cp_index` into
/// `buf[pos..]`. Negative indices stand for the bootstrap method (-4), the name (-3), the type
/// (-2) and the static argument count (-1).
#[allow(clippy::too_many_arguments)]
pub fn copy_out_bootstrap_arguments(vm: &Vm, caller: &Arc<Class>, arg_count: i32, cp_index: i32,
                                    start: i32, end: i32, buf: Handle, pos: i32, resolve: bool,
                                    if_not_available: Option<Handle>) -> VmResult<()> {
    let len = vm.heap.with(vm.heap.resolve(buf), |o| o.as_object_array().map(|a| a.elements.len()))
        .ok_or_else(|| Exception::internal("bootstrap argument buffer is not an Object[]"))?;

    if start < BSM_INDEX || start > end || pos < 0
        || pos as i64 + (end as i64 - start as i64) > len as i64 {
        return Err(linkage_error(format!("bad bootstrap argument range {}..{} at {} for length {}",
                                         start, end, pos, len)));
    }

    let index = u16::try_from(cp_index)
        .map_err(|_| linkage_error(format!("constant pool index {} out of range", cp_index)))?;
    let (bsm_index, name, descriptor) = match caller.constant_pool.get(index) {
        Some(CPEntry::Dynamic { bsm_index, name, descriptor, .. }) => (*bsm_index, name, descriptor),
        _ => return Err(linkage_error(format!("{}: constant pool index {} is not a dynamic constant",
                                              caller.name, cp_index)))
    };

    let (bsm, args) = caller.bootstrap_method(bsm_index)
        .ok_or_else(|| linkage_error(format!("{}: no bootstrap method #{}", caller.name, bsm_index)))?;
    if args.len() != arg_count as usize || arg_count < 0 {
        return Err(Exception::internal(format!("bootstrap argument count mismatch: {} declared, {} stored",
                                               arg_count, args.len())));
    }

    trace!(class = %caller.name, cp_index, start, end, pos, resolve, "copying bootstrap arguments");

    for (offset, i) in (start..end).enumerate() {
        let value = match i {
            BSM_INDEX => resolve_ref_to_object(vm, caller, bsm, true)?,
            NAME_INDEX => Some(vm.intern(name)?),
            TYPE_INDEX if descriptor.starts_with('(') => Some(method_type_from_descriptor(vm, descriptor)?),
            TYPE_INDEX => Some(class_for_descriptor(vm, descriptor)?.mirror),
            ARG_COUNT_INDEX => Some(vm.box_int(arg_count)?),
            i => {
                let arg = *args.get(i as usize)
                    .ok_or_else(|| linkage_error(format!("bootstrap argument {} out of range", i)))?;
                match resolve_ref_to_object(vm, caller, arg, resolve)? {
                    None if !resolve => if_not_available,
                    value => value
                }
            }
        };

        // computing the value may have moved the buffer
        let at = pos as usize + offset;
        let target = vm.heap.resolve(buf);
        vm.heap.with_mut(target, |o| {
            if let Some(array) = o.as_object_array_mut() {
                array.elements[at] = value;
            }
        });
    }

    Ok(())
}
