use std::sync::Arc;

use tracing::trace;

use crate::vm::class::class::{Class, FieldRef, MethodRef};
use crate::vm::class_loader::resolve::LookupOptions;
use crate::vm::error::VmResult;
use crate::vm::invoke::flags::RefKind;
use crate::vm::vm::Vm;

pub const METHOD_HANDLE: &str = "java/lang/invoke/MethodHandle";

/// Signature polymorphic intrinsics of `java/lang/invoke/MethodHandle`
pub const POLYMORPHIC_INTRINSICS: [&str; 5] =
    ["invokeBasic", "linkToVirtual", "linkToStatic", "linkToSpecial", "linkToInterface"];

/// Search mode for a method reference of kind `ref_kind` against `class`
pub fn lookup_options(class: &Class, ref_kind: RefKind, speculative: bool) -> LookupOptions {
    let mut options = match ref_kind {
        RefKind::InvokeInterface => LookupOptions::INTERFACE,
        RefKind::InvokeStatic if class.is_interface() => LookupOptions::STATIC | LookupOptions::INTERFACE,
        RefKind::InvokeStatic => LookupOptions::STATIC,
        RefKind::InvokeSpecial => LookupOptions::VIRTUAL | LookupOptions::ALLOW_FORWARDING
            | LookupOptions::HANDLE_DEFAULT_METHOD_CONFLICTS,
        _ => LookupOptions::VIRTUAL
    };

    if speculative {
        options |= LookupOptions::NO_THROW;
    }
    options
}

pub fn is_polymorphic_intrinsic(class: &Class, name: &str) -> bool {
    class.name == METHOD_HANDLE && POLYMORPHIC_INTRINSICS.contains(&name)
}

pub fn lookup_method(vm: &Vm, class: &Arc<Class>, name: &str, signature: &str, ref_kind: RefKind,
                     caller: Option<&Arc<Class>>, speculative: bool) -> VmResult<Option<MethodRef>> {
    let mut options = lookup_options(class, ref_kind, speculative);
    let mut signature = Some(signature);

    if is_polymorphic_intrinsic(class, name) {
        options |= LookupOptions::PARTIAL_SIGNATURE;
        signature = None;
    }

    trace!(class = %class.name, name, ?signature, ?options, "looking up method");
    vm.linker().lookup_method(vm, class, name, signature, caller, options)
}

/// Looks for an instance field first, then a static one. The returned reference kind keeps the
/// get/put direction of `ref_kind` and matches the field found.
pub fn lookup_field(vm: &Vm, class: &Arc<Class>, name: &str, signature: &str, ref_kind: RefKind,
                    caller: Option<&Arc<Class>>, speculative: bool) -> VmResult<Option<(FieldRef, RefKind)>> {
    let options = if speculative { LookupOptions::NO_THROW } else { LookupOptions::empty() };
    let linker = vm.linker();

    match linker.instance_field(vm, class, name, Some(signature), caller, options) {
        Ok(Some(field)) => return Ok(Some((field, ref_kind.for_field(false)))),
        Ok(None) => {}
        Err(e) => trace!(exception = %e, "no instance field, trying static"),
    }

    let field = linker.static_field(vm, class, name, Some(signature), caller, options)?;
    Ok(field.map(|f| (f, ref_kind.for_field(true))))
}

#[cfg(test)]
mod tests {
    use crate::vm::class_loader::resolve::LookupOptions;
    use crate::vm::error::ExceptionKind;
    use crate::vm::invoke::flags::RefKind;
    use crate::vm::invoke::lookup::{lookup_field, lookup_method, lookup_options, METHOD_HANDLE};
    use crate::vm::testing::{define_hierarchy, test_vm};

    #[test]
    fn options_follow_reference_kind() {
        let vm = test_vm();
        let h = define_hierarchy(&vm);

        assert_eq!(lookup_options(&h.c, RefKind::InvokeInterface, false), LookupOptions::INTERFACE);
        assert_eq!(lookup_options(&h.c, RefKind::InvokeStatic, false), LookupOptions::STATIC);
        assert_eq!(lookup_options(&h.i, RefKind::InvokeStatic, false),
                   LookupOptions::STATIC | LookupOptions::INTERFACE);
        assert_eq!(lookup_options(&h.c, RefKind::InvokeSpecial, false),
                   LookupOptions::VIRTUAL | LookupOptions::ALLOW_FORWARDING
                       | LookupOptions::HANDLE_DEFAULT_METHOD_CONFLICTS);
        assert_eq!(lookup_options(&h.c, RefKind::NewInvokeSpecial, true),
                   LookupOptions::VIRTUAL | LookupOptions::NO_THROW);
        assert_eq!(lookup_options(&h.c, RefKind::InvokeVirtual, false), LookupOptions::VIRTUAL);
    }

    #[test]
    fn polymorphic_intrinsics_ignore_signature() {
        let vm = test_vm();
        let mh = vm.core_class(METHOD_HANDLE).unwrap();

        let found = lookup_method(&vm, &mh, "invokeBasic", "(IJLjava/lang/String;)V", RefKind::InvokeVirtual,
                                  None, false).unwrap().unwrap();
        assert_eq!(vm.class(found.class).methods[found.index as usize].name, "invokeBasic");

        let found = lookup_method(&vm, &mh, "linkToStatic", "(Ljava/lang/invoke/MemberName;)I",
                                  RefKind::InvokeStatic, None, false).unwrap();
        assert!(found.is_some());

        // ordinary methods still need an exact signature
        let err = lookup_method(&vm, &mh, "type", "()I", RefKind::InvokeVirtual, None, false).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::NoSuchMethod);
    }

    #[test]
    fn field_lookup_corrects_reference_kind() {
        let vm = test_vm();
        let h = define_hierarchy(&vm);

        let (field, kind) = lookup_field(&vm, &h.a, "f", "I", RefKind::PutStatic, None, false).unwrap().unwrap();
        assert_eq!(field.class, h.b.id);
        assert_eq!(kind, RefKind::PutField);

        let (field, kind) = lookup_field(&vm, &h.a, "sc", "J", RefKind::GetField, None, false).unwrap().unwrap();
        assert_eq!(field.class, h.b.id);
        assert_eq!(kind, RefKind::GetStatic);
        let (_, kind) = lookup_field(&vm, &h.a, "sc", "J", RefKind::GetField, None, true).unwrap().unwrap();
        assert_eq!(kind, RefKind::GetStatic);

        let err = lookup_field(&vm, &h.a, "f", "J", RefKind::GetField, None, false).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::NoSuchField);
        assert_eq!(lookup_field(&vm, &h.a, "f", "J", RefKind::GetField, None, true).unwrap(), None);
    }
}
