use std::sync::Arc;

use tracing::trace;

use crate::vm::class::class::{Class, FieldRef, MethodRef};
use crate::vm::error::VmResult;
use crate::vm::invoke::flags::MatchFlags;
use crate::vm::invoke::member_name::init;
use crate::vm::object::{Handle, HeapObject};
use crate::vm::vm::Vm;

/// Invalid arguments
pub const BAD_ARGUMENTS: i32 = -1;
/// A result slot that should have received a match holds no MemberName
pub const BAD_RESULT_SLOT: i32 = -99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Field(FieldRef),
    Method(MethodRef),
    Constructor(MethodRef),
}

struct Filter {
    name: Option<String>,
    signature: Option<String>,
    fields: bool,
    methods: bool,
    constructors: bool,
}

impl Filter {
    fn new(name: Option<String>, signature: Option<String>, flags: MatchFlags) -> Filter {
        let mut filter = Filter {
            fields: flags.contains(MatchFlags::IS_FIELD),
            methods: flags.contains(MatchFlags::IS_METHOD),
            constructors: flags.contains(MatchFlags::IS_CONSTRUCTOR),
            name,
            signature
        };

        // a signature can only match one kind of member
        if let Some(signature) = &filter.signature {
            if signature.starts_with('(') {
                filter.fields = false;
            } else {
                filter.methods = false;
                filter.constructors = false;
            }
        }
        filter
    }

    fn matches(&self, name: &str, signature: impl FnOnce() -> String) -> bool {
        self.name.as_deref().map_or(true, |n| n == name)
            && self.signature.as_ref().map_or(true, |s| *s == signature())
    }

    /// Matching members declared by `class`: fields first, then methods
    fn collect(&self, class: &Class, out: &mut Vec<Candidate>) {
        if self.fields {
            for (i, f) in class.fields.iter().enumerate() {
                if self.matches(&f.name, || f.descriptor.to_string()) {
                    out.push(Candidate::Field(FieldRef { class: class.id, index: i as u16 }));
                }
            }
        }

        if self.methods || self.constructors {
            for (i, m) in class.methods.iter().enumerate() {
                let method_ref = MethodRef { class: class.id, index: i as u16 };
                let candidate = if m.name == "<init>" {
                    if !self.constructors {
                        continue;
                    }
                    Candidate::Constructor(method_ref)
                } else if m.name == "<clinit>" || !self.methods {
                    continue;
                } else {
                    Candidate::Method(method_ref)
                };

                if self.matches(&m.name, || m.descriptor.to_string()) {
                    out.push(candidate);
                }
            }
        }
    }
}

fn optional_string(vm: &Vm, s: Option<Handle>) -> VmResult<Option<String>> {
    s.map(|s| vm.string_value(s)).transpose()
}

/// Classes searched for `defc`, in order
fn search_order(vm: &Vm, defc: &Arc<Class>, flags: MatchFlags) -> Vec<Arc<Class>> {
    let mut classes = vec![defc.clone()];
    if flags.contains(MatchFlags::SEARCH_SUPERCLASSES) {
        classes.extend(defc.superclasses.iter().rev().map(|id| vm.class(*id)));
    }
    if flags.contains(MatchFlags::SEARCH_INTERFACES) {
        classes.extend(defc.itable.iter().map(|id| vm.class(*id)));
    }
    classes
}

/// Enumerates the members of `defc` matching name, signature and kind. The first `skip` matches
/// are only counted; the following ones initialize the MemberNames already in `results` until it
/// is full. Returns the number of matches, [`BAD_ARGUMENTS`] or [`BAD_RESULT_SLOT`].
#[allow(clippy::too_many_arguments)]
pub fn get_members(vm: &Vm, defc: Option<Handle>, match_name: Option<Handle>, match_sig: Option<Handle>,
                   match_flags: i32, caller: Option<Handle>, skip: i32, results: Option<Handle>) -> VmResult<i32> {
    let (defc, results) = match (defc.and_then(|d| vm.class_of_mirror(d)), results) {
        (Some(defc), Some(results)) => (defc, results),
        _ => return Ok(BAD_ARGUMENTS)
    };
    if let Some(caller) = caller {
        if vm.class_of_mirror(caller).is_none() {
            return Ok(BAD_ARGUMENTS);
        }
    }

    let flags = MatchFlags::from_bits_truncate(match_flags);
    if defc.is_interface() && flags.contains(MatchFlags::IS_FIELD) {
        return Ok(BAD_ARGUMENTS);
    }

    let capacity = match vm.heap.read(results, |o| o.as_object_array().map(|a| a.elements.len())) {
        Some(capacity) => capacity,
        None => return Ok(BAD_ARGUMENTS)
    };

    let name = optional_string(vm, match_name)?;
    let signature = optional_string(vm, match_sig)?;
    if name.as_deref() == Some("") || signature.as_deref() == Some("") {
        return Ok(0);
    }

    trace!(class = %defc.name, ?name, ?signature, ?flags, skip, capacity, "enumerating members");
    let filter = Filter::new(name, signature, flags);

    let mut candidates = vec![];
    if !defc.is_primitive() && !defc.is_array() {
        for class in search_order(vm, &defc, flags) {
            filter.collect(&class, &mut candidates);
        }
    }

    let skip = skip.max(0) as usize;
    for (fill, candidate) in candidates.iter().skip(skip).take(capacity).enumerate() {
        // creating reflection objects allocates, so the array address is taken afresh
        let array = vm.heap.resolve(results);
        let slot = vm.heap.with(array, |o| o.as_object_array().and_then(|a| a.elements[fill]));
        let slot = match slot {
            Some(slot) if vm.heap.read(slot, |o| matches!(o, HeapObject::MemberName(_))) => slot,
            _ => return Ok(BAD_RESULT_SLOT)
        };

        let reflected = match *candidate {
            Candidate::Field(f) => vm.reflection().create_field_object(vm, f)?,
            Candidate::Method(m) => vm.reflection().create_method_object(vm, m)?,
            Candidate::Constructor(m) => vm.reflection().create_constructor_object(vm, m)?,
        };
        init(vm, slot, reflected)?;
    }

    Ok(candidates.len() as i32)
}
