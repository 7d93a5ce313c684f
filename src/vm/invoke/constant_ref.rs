use std::sync::Arc;

use tracing::trace;

use crate::helper::join_slots;
use crate::vm::class::class::Class;
use crate::vm::class::constant_pool::CPEntry;
use crate::vm::error::{Exception, ExceptionKind, VmResult};
use crate::vm::object::{Handle, HeapObject};
use crate::vm::vm::Vm;

/// Runtime object for a constant pool slot of `class`.
///
/// Memoized slots are returned as they are. Lazily resolvable slots go through the class linker
/// when `resolve` is set and yield `None` otherwise. Numeric literals are boxed into a fresh
/// object on every call. Slots that have no object form yield `None`.
pub fn resolve_ref_to_object(vm: &Vm, class: &Arc<Class>, index: u16, resolve: bool) -> VmResult<Option<Handle>> {
    if index == 0 || index as usize >= class.constant_pool.len() {
        return Err(Exception::with_message(ExceptionKind::LinkageError,
            format!("{}: constant pool index {} out of range", class.name, index)));
    }

    let entry = match class.constant_pool.get(index) {
        Some(entry) => entry,
        None => return Ok(None)
    };

    if let Some(value) = entry.memo().and_then(|memo| memo.get()) {
        return Ok(Some(*value));
    }

    if let Some(resolver) = entry.resolver() {
        if !resolve {
            return Ok(None);
        }
        let value = resolver(vm, class, index)?;
        trace!(class = %class.name, index, "resolved constant");
        return Ok(Some(value));
    }

    let boxed = match entry {
        CPEntry::Integer(v) => HeapObject::Integer(*v),
        CPEntry::Float(v) => HeapObject::Float(*v),
        CPEntry::Long([a, b]) => HeapObject::Long(join_slots(*a, *b) as i64),
        CPEntry::Double([a, b]) => HeapObject::Double(f64::from_bits(join_slots(*a, *b))),
        _ => return Ok(None)
    };

    vm.heap.allocate(boxed).map(Some)
}
