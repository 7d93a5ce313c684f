//! Shared fixtures for unit tests

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::vm::class::class::{Class, FieldRef, MethodRef};
use crate::vm::class_loader::bootstrap::ClassDef;
use crate::vm::class_loader::resolve::{BootstrapInvoker, BootstrapLinker, ClassLinker, LookupOptions};
use crate::vm::error::VmResult;
use crate::vm::invoke::flags::{MemberFlags, MemberKind, RefKind};
use crate::vm::object::{Handle, HeapObject, MemberName};
use crate::vm::pool::object::HeapConfig;
use crate::vm::reflect::HeapReflectionFactory;
use crate::vm::vm::{Vm, VmConfig};

const PUBLIC: u16 = 0x0001;
const PRIVATE: u16 = 0x0002;
const PROTECTED: u16 = 0x0004;
const STATIC: u16 = 0x0008;
const FINAL: u16 = 0x0010;

pub fn test_vm() -> Vm {
    Vm::new(VmConfig::default()).unwrap()
}

pub fn test_vm_with(heap: HeapConfig) -> Vm {
    Vm::new(VmConfig { heap, ..Default::default() }).unwrap()
}

/// Relocates the heap on every allocation
pub fn stress_vm() -> Vm {
    test_vm_with(HeapConfig { relocate_every: NonZeroUsize::new(1), ..Default::default() })
}

/// `p/A extends p/B extends p/C`, `p/A implements p/I`
pub struct Hierarchy {
    pub a: Arc<Class>,
    pub b: Arc<Class>,
    pub c: Arc<Class>,
    pub i: Arc<Class>,
}

pub fn define_hierarchy(vm: &Vm) -> Hierarchy {
    let i = vm.define_class(ClassDef::interface("p/I")
        .field(PUBLIC | STATIC | FINAL, "CONST", "I")
        .method(PUBLIC, "greet", "()V")).unwrap();

    let c = vm.define_class(ClassDef::new("p/C")
        .field(PUBLIC, "c", "I")
        .method(PUBLIC, "<init>", "()V")
        .method(PUBLIC, "m", "()V")
        .method(PUBLIC | STATIC, "sm", "()V")
        .method(PUBLIC, "onlyInC", "()I")
        .method(PRIVATE, "secret", "()V")
        .method(PROTECTED, "prot", "()V")
        .method(PUBLIC | FINAL, "fin", "()V")).unwrap();

    let b = vm.define_class(ClassDef::new("p/B")
        .extends("p/C")
        .field(PUBLIC, "f", "I")
        .field(PUBLIC | STATIC, "sc", "J")
        .method(PUBLIC, "m", "()V")).unwrap();

    let a = vm.define_class(ClassDef::new("p/A")
        .extends("p/B")
        .implements("p/I")
        .field(PUBLIC, "a", "I")
        .method(PUBLIC, "m", "()V")).unwrap();

    Hierarchy { a, b, c, i }
}

pub fn new_member_name(vm: &Vm) -> Handle {
    vm.heap.allocate(HeapObject::MemberName(MemberName::default())).unwrap()
}

/// Unresolved MemberName carrying a symbolic reference
pub fn member_name(vm: &Vm, class: &Class, name: &str, descriptor: &str, kind: MemberKind,
                   ref_kind: RefKind) -> Handle {
    let name = vm.intern(name).unwrap();
    let type_ = vm.intern(descriptor).unwrap();

    vm.heap.allocate(HeapObject::MemberName(MemberName {
        flags: MemberFlags::new(kind, ref_kind, 0).encode(),
        name: Some(name),
        type_: Some(type_),
        clazz: Some(class.mirror),
        ..Default::default()
    })).unwrap()
}

/// `MemberName[]` filled with fresh MemberNames
pub fn member_name_array(vm: &Vm, len: usize) -> (Handle, Vec<Handle>) {
    let component = vm.core_class("java/lang/invoke/MemberName").unwrap();
    let array = vm.new_object_array(component.id, len).unwrap();
    let slots: Vec<Handle> = (0..len).map(|_| new_member_name(vm)).collect();

    vm.heap.write(array, |o| {
        let elements = &mut o.as_object_array_mut().unwrap().elements;
        for (slot, mn) in elements.iter_mut().zip(&slots) {
            *slot = Some(*mn);
        }
    });

    (array, slots)
}

#[derive(Clone, Default)]
pub struct LookupCounter(Arc<AtomicUsize>);

impl LookupCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts member lookups and delegates everything to a [`BootstrapLinker`]
pub struct CountingLinker {
    inner: BootstrapLinker,
    lookups: LookupCounter,
}

impl CountingLinker {
    pub fn vm() -> (Vm, LookupCounter) {
        let lookups = LookupCounter::default();
        let linker = CountingLinker {
            inner: BootstrapLinker::new(vec![]),
            lookups: lookups.clone()
        };
        let vm = Vm::with_collaborators(VmConfig::default(), Box::new(linker), Box::new(HeapReflectionFactory))
            .unwrap();
        (vm, lookups)
    }
}

impl ClassLinker for CountingLinker {
    fn load_class(&self, vm: &Vm, name: &str) -> VmResult<Arc<Class>> {
        self.inner.load_class(vm, name)
    }

    fn resolve_class(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
        self.inner.resolve_class(vm, class, index)
    }

    fn resolve_string(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
        self.inner.resolve_string(vm, class, index)
    }

    fn resolve_method_type(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
        self.inner.resolve_method_type(vm, class, index)
    }

    fn resolve_method_handle(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
        self.inner.resolve_method_handle(vm, class, index)
    }

    fn resolve_dynamic_constant(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
        self.inner.resolve_dynamic_constant(vm, class, index)
    }

    fn lookup_method(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                     caller: Option<&Arc<Class>>, options: LookupOptions) -> VmResult<Option<MethodRef>> {
        self.lookups.bump();
        self.inner.lookup_method(vm, class, name, signature, caller, options)
    }

    fn instance_field(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                      caller: Option<&Arc<Class>>, options: LookupOptions) -> VmResult<Option<FieldRef>> {
        self.lookups.bump();
        self.inner.instance_field(vm, class, name, signature, caller, options)
    }

    fn static_field(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                    caller: Option<&Arc<Class>>, options: LookupOptions) -> VmResult<Option<FieldRef>> {
        self.lookups.bump();
        self.inner.static_field(vm, class, name, signature, caller, options)
    }
}

pub type Calls = Arc<Mutex<Vec<Vec<Option<Handle>>>>>;

/// Records the argument arrays it is called with and returns the string `computed`
#[derive(Clone, Default)]
pub struct RecordingInvoker {
    calls: Calls,
}

impl RecordingInvoker {
    pub fn vm() -> (Vm, Calls) {
        let invoker = RecordingInvoker::default();
        let calls = invoker.calls.clone();
        let linker = BootstrapLinker::new(vec![]).with_invoker(Box::new(invoker));
        let vm = Vm::with_collaborators(VmConfig::default(), Box::new(linker), Box::new(HeapReflectionFactory))
            .unwrap();
        (vm, calls)
    }
}

impl BootstrapInvoker for RecordingInvoker {
    fn invoke_bootstrap(&self, vm: &Vm, _caller: &Arc<Class>, args: Handle) -> VmResult<Option<Handle>> {
        let elements = vm.heap.read(args, |o| o.as_object_array().map(|a| a.elements.clone()))
            .unwrap_or_default();
        self.calls.lock().push(elements);
        vm.intern("computed").map(Some)
    }
}
