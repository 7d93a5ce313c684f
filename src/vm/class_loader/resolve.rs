use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use bitflags::bitflags;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::class_parser::constants::AccessFlagMethod;
use crate::helper::has_flag;
use crate::vm::class::class::{Class, FieldRef, MethodRef};
use crate::vm::class::constant_pool::{CPEntry, SymbolicRef};
use crate::vm::class::field::FieldType;
use crate::vm::class::method::Method;
use crate::vm::error::{Exception, ExceptionKind, VmResult};
use crate::vm::invoke::bootstrap_args::copy_out_bootstrap_arguments;
use crate::vm::invoke::flags::{MemberFlags, MemberKind, RefKind};
use crate::vm::invoke::member_name;
use crate::vm::invoke::signature::{class_for_field_type, method_type_from_descriptor};
use crate::vm::object::{Handle, HeapObject, MemberName, MethodHandle};
use crate::vm::vm::Vm;

bitflags! {
    /// Search mode of a method lookup
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LookupOptions: u32 {
        const VIRTUAL = 0x01;
        const STATIC = 0x02;
        const INTERFACE = 0x04;
        const ALLOW_FORWARDING = 0x08;
        const HANDLE_DEFAULT_METHOD_CONFLICTS = 0x10;
        /// Not found and inaccessible members yield `None` instead of an error
        const NO_THROW = 0x20;
        /// Match on name only
        const PARTIAL_SIGNATURE = 0x40;
    }
}

/// Runs bootstrap methods of dynamically computed constants
pub trait BootstrapInvoker: Send + Sync {
    /// `args` is an `Object[]` of `[bsm, name, type, argCount, args...]`
    fn invoke_bootstrap(&self, vm: &Vm, caller: &Arc<Class>, args: Handle) -> VmResult<Option<Handle>>;
}

/// Class loading and constant pool resolution
pub trait ClassLinker: Send + Sync {
    fn load_class(&self, vm: &Vm, name: &str) -> VmResult<Arc<Class>>;

    fn resolve_class(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle>;
    fn resolve_string(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle>;
    fn resolve_method_type(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle>;
    fn resolve_method_handle(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle>;
    fn resolve_dynamic_constant(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle>;

    fn lookup_method(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                     caller: Option<&Arc<Class>>, options: LookupOptions) -> VmResult<Option<MethodRef>>;
    fn instance_field(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                      caller: Option<&Arc<Class>>, options: LookupOptions) -> VmResult<Option<FieldRef>>;
    fn static_field(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                    caller: Option<&Arc<Class>>, options: LookupOptions) -> VmResult<Option<FieldRef>>;
}

/// The only class loader: defines bootstrap classes, array classes and class files found on the
/// class path.
pub struct BootstrapLinker {
    classpath: Vec<PathBuf>,
    invoker: Option<Box<dyn BootstrapInvoker>>,
    /// Class files being defined, per loading thread
    loading: Mutex<HashSet<(ThreadId, String)>>,
}

impl BootstrapLinker {
    pub fn new(classpath: Vec<PathBuf>) -> Self {
        BootstrapLinker {
            classpath,
            invoker: None,
            loading: Mutex::new(HashSet::new())
        }
    }

    pub fn with_invoker(mut self, invoker: Box<dyn BootstrapInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    fn find_class_file(&self, name: &str) -> Option<Vec<u8>> {
        let file = name.replace('.', "/") + ".class";
        self.classpath.iter()
            .find_map(|dir| fs::read(dir.join(&file)).ok())
    }
}

fn entry(class: &Class, index: u16) -> VmResult<&CPEntry> {
    class.constant_pool.get(index).ok_or_else(|| Exception::with_message(ExceptionKind::LinkageError,
        format!("{}: invalid constant pool index {}", class.name, index)))
}

/// Stores a computed value into a memo cell. The first stored value wins.
fn memoize(cell: &OnceCell<Handle>, compute: impl FnOnce() -> VmResult<Handle>) -> VmResult<Handle> {
    if let Some(value) = cell.get() {
        return Ok(*value);
    }

    let value = compute()?;
    let _ = cell.set(value);
    Ok(cell.get().copied().unwrap_or(value))
}

fn is_accessible(declaring: &Class, flag: u16, caller: &Class) -> bool {
    if has_flag(flag, AccessFlagMethod::ACC_PUBLIC) {
        true
    } else if has_flag(flag, AccessFlagMethod::ACC_PRIVATE) {
        declaring.id == caller.id
    } else if declaring.package() == caller.package() {
        true
    } else if has_flag(flag, AccessFlagMethod::ACC_PROTECTED) {
        caller.is_subclass_of(declaring.id)
    } else {
        false
    }
}

fn not_found<T>(options: LookupOptions, e: Exception) -> VmResult<Option<T>> {
    if options.contains(LookupOptions::NO_THROW) {
        trace!(exception = %e, "lookup failed quietly");
        Ok(None)
    } else {
        Err(e)
    }
}

fn method_matches(m: &Method, name: &str, signature: Option<&str>, options: LookupOptions) -> bool {
    m.name == name && (options.contains(LookupOptions::PARTIAL_SIGNATURE)
        || signature.map_or(true, |s| m.descriptor.to_string() == s))
}

impl BootstrapLinker {
    fn search_methods(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                      options: LookupOptions) -> VmResult<Option<MethodRef>> {
        let find_in = |c: &Class| c.methods.iter().enumerate()
            .find(|(_, m)| method_matches(m, name, signature, options))
            .map(|(i, _)| MethodRef { class: c.id, index: i as u16 });

        if let Some(found) = find_in(class) {
            return Ok(Some(found));
        }

        // Initializers are never inherited
        if name.starts_with('<') {
            return Ok(None);
        }

        for ancestor in class.superclasses.iter().rev() {
            if let Some(found) = find_in(&vm.class(*ancestor)) {
                return Ok(Some(found));
            }
        }

        // Maximally specific superinterface methods
        let mut candidates: Vec<MethodRef> = vec![];
        for interface in &class.itable {
            let interface = vm.class(*interface);
            if let Some(found) = find_in(&interface) {
                let m = &interface.methods[found.index as usize];
                if !m.is_static() && !m.is_private() {
                    candidates.push(found);
                }
            }
        }
        let shadowed: Vec<bool> = candidates.iter()
            .map(|c| candidates.iter().any(|other| other.class != c.class
                && vm.class(other.class).implements(c.class)))
            .collect();
        let candidates: Vec<MethodRef> = candidates.into_iter().zip(shadowed)
            .filter(|(_, shadowed)| !shadowed)
            .map(|(c, _)| c)
            .collect();

        let concrete: Vec<&MethodRef> = candidates.iter()
            .filter(|c| !vm.class(c.class).methods[c.index as usize].is_abstract())
            .collect();

        if concrete.len() > 1 && options.contains(LookupOptions::HANDLE_DEFAULT_METHOD_CONFLICTS) {
            return Err(Exception::with_message(ExceptionKind::IncompatibleClassChange,
                format!("conflicting default methods: {}.{} and {}.{}",
                        vm.class(concrete[0].class).name, name,
                        vm.class(concrete[1].class).name, name)));
        }

        Ok(concrete.first().copied().or_else(|| candidates.first()).copied())
    }

    /// Field resolution order: declared fields, superinterfaces, then the superclass
    fn search_field(vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>) -> Option<FieldRef> {
        if let Some((index, _)) = class.find_field(name, signature) {
            return Some(FieldRef { class: class.id, index });
        }

        for interface in &class.interfaces {
            if let Some(found) = Self::search_field(vm, &vm.class(*interface), name, signature) {
                return Some(found);
            }
        }

        class.superclass.and_then(|s| Self::search_field(vm, &vm.class(s), name, signature))
    }

    fn lookup_field(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                    caller: Option<&Arc<Class>>, options: LookupOptions, want_static: bool)
                    -> VmResult<Option<FieldRef>> {
        let found = match Self::search_field(vm, class, name, signature) {
            Some(found) => found,
            None => return not_found(options, Exception::with_message(ExceptionKind::NoSuchField,
                                                                      format!("{}.{}", class.name, name)))
        };

        let declaring = vm.class(found.class);
        let field = &declaring.fields[found.index as usize];

        if field.is_static() != want_static {
            if options.contains(LookupOptions::NO_THROW) {
                return Ok(None);
            }
            return Err(Exception::with_message(ExceptionKind::IncompatibleClassChange,
                format!("{}.{} is {}static", declaring.name, name, if want_static { "not " } else { "" })));
        }

        if let Some(caller) = caller {
            if !is_accessible(&declaring, field.flag, caller) {
                return not_found(options, Exception::with_message(ExceptionKind::IllegalAccess,
                    format!("{} cannot access {}.{}", caller.name, declaring.name, name)));
            }
        }

        Ok(Some(found))
    }

    fn member_ref(class: &Class, index: u16) -> VmResult<(MemberKind, &SymbolicRef)> {
        match entry(class, index)? {
            CPEntry::Fieldref(r) => Ok((MemberKind::Field, r)),
            CPEntry::Methodref(r) | CPEntry::InterfaceMethodref(r) => {
                let kind = if r.name == "<init>" { MemberKind::Constructor } else { MemberKind::Method };
                Ok((kind, r))
            }
            other => Err(Exception::with_message(ExceptionKind::LinkageError,
                                                 format!("expected a member reference, found {:?}", other.tag())))
        }
    }
}

impl ClassLinker for BootstrapLinker {
    fn load_class(&self, vm: &Vm, name: &str) -> VmResult<Arc<Class>> {
        if let Some(class) = vm.find_class(name) {
            return Ok(class);
        }

        if name.starts_with('[') {
            let t = FieldType::parse(name)
                .ok_or_else(|| Exception::with_message(ExceptionKind::NoClassDefFound, name))?;
            let component = match t {
                FieldType::A(component) => class_for_field_type(vm, &component)?,
                _ => return Err(Exception::with_message(ExceptionKind::NoClassDefFound, name))
            };
            return vm.define_array_class(&component);
        }

        let bytes = self.find_class_file(name)
            .ok_or_else(|| Exception::with_message(ExceptionKind::NoClassDefFound, name))?;

        // defining a class loads its supertypes first
        let key = (thread::current().id(), name.to_string());
        if !self.loading.lock().insert(key.clone()) {
            return Err(Exception::with_message(ExceptionKind::ClassCircularity, name));
        }

        debug!("Loading {} from the class path", name);
        let class = vm.derive_class(&bytes);
        self.loading.lock().remove(&key);
        let class = class?;
        if class.name != name {
            return Err(Exception::with_message(ExceptionKind::NoClassDefFound,
                format!("{} (wrong name: {})", name, class.name)));
        }

        Ok(class)
    }

    fn resolve_class(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
        match entry(class, index)? {
            CPEntry::Class { name, resolved } => memoize(resolved, || Ok(self.load_class(vm, name)?.mirror)),
            _ => Err(Exception::internal("not a class constant"))
        }
    }

    fn resolve_string(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
        match entry(class, index)? {
            CPEntry::String { value, resolved } => memoize(resolved, || vm.intern(value)),
            _ => Err(Exception::internal("not a string constant"))
        }
    }

    fn resolve_method_type(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
        match entry(class, index)? {
            CPEntry::MethodType { descriptor, resolved } =>
                memoize(resolved, || method_type_from_descriptor(vm, descriptor)),
            _ => Err(Exception::internal("not a method type constant"))
        }
    }

    fn resolve_method_handle(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
        let (kind, reference, resolved) = match entry(class, index)? {
            CPEntry::MethodHandle { kind, reference, resolved } => (*kind, *reference, resolved),
            _ => return Err(Exception::internal("not a method handle constant"))
        };

        memoize(resolved, || {
            let (member_kind, r) = Self::member_ref(class, reference)?;
            let clazz = self.resolve_class(vm, class, r.class)?;
            let name = vm.intern(&r.name)?;
            let type_ = vm.intern(&r.descriptor)?;

            let flags = MemberFlags { kind: Some(member_kind), ref_kind: Some(kind), ..Default::default() };
            let mn = vm.heap.allocate(HeapObject::MemberName(MemberName {
                flags: flags.encode(),
                name: Some(name),
                type_: Some(type_),
                clazz: Some(clazz),
                ..Default::default()
            }))?;

            let member = member_name::resolve(vm, mn, Some(class.mirror), false)?
                .ok_or_else(|| Exception::with_message(ExceptionKind::LinkageError, r.name.clone()))?;

            trace!(class = %class.name, index, "resolved method handle constant");
            vm.heap.allocate(HeapObject::MethodHandle(MethodHandle { kind, member }))
        })
    }

    fn resolve_dynamic_constant(&self, vm: &Vm, class: &Arc<Class>, index: u16) -> VmResult<Handle> {
        let (bsm_index, resolved) = match entry(class, index)? {
            CPEntry::Dynamic { bsm_index, resolved, .. } => (*bsm_index, resolved),
            _ => return Err(Exception::internal("not a dynamic constant"))
        };

        memoize(resolved, || {
            let invoker = self.invoker.as_ref().ok_or_else(|| Exception::with_message(
                ExceptionKind::BootstrapMethod, "no bootstrap method invoker installed"))?;

            let (_, args) = class.bootstrap_method(bsm_index)
                .ok_or_else(|| Exception::internal("bootstrap method index out of range"))?;
            let arg_count = args.len() as i32;

            let object = vm.core_class("java/lang/Object")?;
            let buf = vm.new_object_array(object.id, arg_count as usize + 4)?;
            copy_out_bootstrap_arguments(vm, class, arg_count, index as i32, -4, arg_count,
                                         buf, 0, true, None)?;

            invoker.invoke_bootstrap(vm, class, buf)?
                .ok_or_else(|| Exception::with_message(ExceptionKind::BootstrapMethod,
                    "bootstrap method returned null"))
        })
    }

    fn lookup_method(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                     caller: Option<&Arc<Class>>, options: LookupOptions) -> VmResult<Option<MethodRef>> {
        trace!(class = %class.name, name, ?signature, ?options, "method lookup");

        if options.contains(LookupOptions::VIRTUAL) && class.is_interface()
            && !options.contains(LookupOptions::ALLOW_FORWARDING) {
            return Err(Exception::with_message(ExceptionKind::IncompatibleClassChange,
                format!("{} is an interface", class.name)));
        }
        if options.contains(LookupOptions::INTERFACE) && !class.is_interface() {
            return Err(Exception::with_message(ExceptionKind::IncompatibleClassChange,
                format!("{} is not an interface", class.name)));
        }

        let found = match self.search_methods(vm, class, name, signature, options)? {
            Some(found) => found,
            None => return not_found(options, Exception::with_message(ExceptionKind::NoSuchMethod,
                format!("{}.{}{}", class.name, name, signature.unwrap_or(""))))
        };

        let declaring = vm.class(found.class);
        let method = &declaring.methods[found.index as usize];

        if options.contains(LookupOptions::STATIC) != method.is_static() {
            return Err(Exception::with_message(ExceptionKind::IncompatibleClassChange,
                format!("{}.{} is {}static", declaring.name, name,
                        if method.is_static() { "" } else { "not " })));
        }

        if let Some(caller) = caller {
            if !is_accessible(&declaring, method.flag, caller) {
                return not_found(options, Exception::with_message(ExceptionKind::IllegalAccess,
                    format!("{} cannot access {}.{}", caller.name, declaring.name, name)));
            }
        }

        Ok(Some(found))
    }

    fn instance_field(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                      caller: Option<&Arc<Class>>, options: LookupOptions) -> VmResult<Option<FieldRef>> {
        self.lookup_field(vm, class, name, signature, caller, options, false)
    }

    fn static_field(&self, vm: &Vm, class: &Arc<Class>, name: &str, signature: Option<&str>,
                    caller: Option<&Arc<Class>>, options: LookupOptions) -> VmResult<Option<FieldRef>> {
        self.lookup_field(vm, class, name, signature, caller, options, true)
    }
}

#[cfg(test)]
mod tests {
    use crate::vm::class::constant_pool::CPEntry;
    use crate::vm::class_loader::bootstrap::ClassDef;
    use crate::vm::class_loader::resolve::LookupOptions;
    use crate::vm::error::ExceptionKind;
    use crate::vm::object::HeapObject;
    use crate::vm::testing::{define_hierarchy, test_vm};

    #[test]
    fn virtual_lookup_walks_superclasses() {
        let vm = test_vm();
        let h = define_hierarchy(&vm);

        let found = vm.linker().lookup_method(&vm, &h.a, "onlyInC", Some("()I"), None, LookupOptions::VIRTUAL)
            .unwrap().unwrap();
        assert_eq!(found.class, h.c.id);

        let found = vm.linker().lookup_method(&vm, &h.a, "m", Some("()V"), None, LookupOptions::VIRTUAL)
            .unwrap().unwrap();
        assert_eq!(found.class, h.a.id);

        let err = vm.linker().lookup_method(&vm, &h.a, "<init>", Some("()V"), None, LookupOptions::VIRTUAL)
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::NoSuchMethod);

        let quiet = vm.linker().lookup_method(&vm, &h.a, "missing", None, None,
                                              LookupOptions::VIRTUAL | LookupOptions::NO_THROW).unwrap();
        assert!(quiet.is_none());
    }

    #[test]
    fn static_mismatch_and_interfaces() {
        let vm = test_vm();
        let h = define_hierarchy(&vm);

        let err = vm.linker().lookup_method(&vm, &h.c, "sm", Some("()V"), None, LookupOptions::VIRTUAL)
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::IncompatibleClassChange);

        let err = vm.linker().lookup_method(&vm, &h.c, "sm", Some("()V"), None, LookupOptions::INTERFACE)
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::IncompatibleClassChange);

        let found = vm.linker().lookup_method(&vm, &h.a, "greet", Some("()V"), None, LookupOptions::VIRTUAL)
            .unwrap().unwrap();
        assert_eq!(found.class, h.i.id);
    }

    #[test]
    fn default_method_conflicts() {
        let vm = test_vm();
        let left = vm.define_class(ClassDef::interface("p/Left").method(0x0001, "d", "()V")).unwrap();
        let right = vm.define_class(ClassDef::interface("p/Right").method(0x0001, "d", "()V")).unwrap();
        let both = vm.define_class(ClassDef::new("p/Both").implements("p/Left").implements("p/Right")).unwrap();

        let found = vm.linker().lookup_method(&vm, &both, "d", Some("()V"), None, LookupOptions::VIRTUAL)
            .unwrap().unwrap();
        assert_eq!(found.class, left.id);

        let err = vm.linker().lookup_method(&vm, &both, "d", Some("()V"), None,
            LookupOptions::VIRTUAL | LookupOptions::HANDLE_DEFAULT_METHOD_CONFLICTS).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::IncompatibleClassChange);
        assert_ne!(left.id, right.id);
    }

    #[test]
    fn access_checks() {
        let vm = test_vm();
        let h = define_hierarchy(&vm);
        let outsider = vm.define_class(ClassDef::new("q/Outsider")).unwrap();

        let err = vm.linker().lookup_method(&vm, &h.c, "secret", Some("()V"), Some(&outsider),
                                            LookupOptions::VIRTUAL).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::IllegalAccess);

        let found = vm.linker().lookup_method(&vm, &h.c, "secret", Some("()V"), Some(&h.c),
                                              LookupOptions::VIRTUAL).unwrap();
        assert!(found.is_some());

        // protected members are visible to subclasses in other packages
        let sub = vm.define_class(ClassDef::new("q/Sub").extends("p/C")).unwrap();
        let found = vm.linker().lookup_method(&vm, &h.c, "prot", Some("()V"), Some(&sub),
                                              LookupOptions::VIRTUAL).unwrap();
        assert!(found.is_some());
        let denied = vm.linker().lookup_method(&vm, &h.c, "prot", Some("()V"), Some(&outsider),
                                               LookupOptions::VIRTUAL | LookupOptions::NO_THROW).unwrap();
        assert!(denied.is_none());
    }

    #[test]
    fn field_lookup_order() {
        let vm = test_vm();
        let h = define_hierarchy(&vm);

        let found = vm.linker().instance_field(&vm, &h.a, "c", Some("I"), None, LookupOptions::empty())
            .unwrap().unwrap();
        assert_eq!(found.class, h.c.id);

        // interface constants come before superclass fields
        let found = vm.linker().static_field(&vm, &h.a, "CONST", Some("I"), None, LookupOptions::empty())
            .unwrap().unwrap();
        assert_eq!(found.class, h.i.id);

        let err = vm.linker().instance_field(&vm, &h.a, "sc", Some("J"), None, LookupOptions::empty())
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::IncompatibleClassChange);
        let quiet = vm.linker().instance_field(&vm, &h.a, "sc", Some("J"), None, LookupOptions::NO_THROW)
            .unwrap();
        assert!(quiet.is_none());
        let quiet = vm.linker().static_field(&vm, &h.a, "c", Some("I"), None, LookupOptions::NO_THROW)
            .unwrap();
        assert!(quiet.is_none());

        let err = vm.linker().static_field(&vm, &h.a, "nope", None, None, LookupOptions::empty())
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::NoSuchField);
    }

    #[test]
    fn memoized_constants() {
        let vm = test_vm();
        let class = vm.define_class(ClassDef::new("p/Consts")
            .constant(CPEntry::class("java/lang/String"))
            .constant(CPEntry::string("hello"))
            .constant(CPEntry::method_type("(I)V"))).unwrap();

        let a = vm.linker().resolve_class(&vm, &class, 1).unwrap();
        assert_eq!(a, vm.load_class("java/lang/String").unwrap().mirror);
        assert_eq!(vm.linker().resolve_class(&vm, &class, 1).unwrap(), a);

        let s = vm.linker().resolve_string(&vm, &class, 2).unwrap();
        assert_eq!(s, vm.intern("hello").unwrap());

        let mt = vm.linker().resolve_method_type(&vm, &class, 3).unwrap();
        assert_eq!(vm.linker().resolve_method_type(&vm, &class, 3).unwrap(), mt);
        assert!(vm.heap.read(mt, |o| matches!(o, HeapObject::MethodType(_))));

        let err = vm.linker().resolve_string(&vm, &class, 1).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::InternalError);
    }

    #[test]
    fn class_path_loading() {
        use crate::class_parser::writer::ClassFileWriter;

        let dir = std::env::temp_dir().join(format!("jvm-invoke-cp-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("p")).unwrap();
        let mut w = ClassFileWriter::new("p/FromDisk", Some("java/lang/Object"));
        w.field(0x0001, "x", "I");
        w.method(0x0001, "<init>", "()V");
        std::fs::write(dir.join("p/FromDisk.class"), w.finish()).unwrap();

        let vm = crate::vm::vm::Vm::new(crate::vm::vm::VmConfig {
            classpath: vec![dir.clone()],
            ..Default::default()
        }).unwrap();

        let class = vm.load_class("p/FromDisk").unwrap();
        assert_eq!(class.fields[0].name, "x");
        assert_eq!(vm.load_class("p/FromDisk").unwrap().id, class.id);

        let err = vm.load_class("p/Missing").unwrap_err();
        assert_eq!(err.kind, ExceptionKind::NoClassDefFound);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn superclass_cycle_on_class_path() {
        use crate::class_parser::writer::ClassFileWriter;

        let dir = std::env::temp_dir().join(format!("jvm-invoke-cycle-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("p")).unwrap();
        for (name, superclass) in [("p/CycA", "p/CycB"), ("p/CycB", "p/CycA")] {
            let w = ClassFileWriter::new(name, Some(superclass));
            std::fs::write(dir.join(format!("{}.class", name)), w.finish()).unwrap();
        }

        let vm = crate::vm::vm::Vm::new(crate::vm::vm::VmConfig {
            classpath: vec![dir.clone()],
            ..Default::default()
        }).unwrap();

        let err = vm.load_class("p/CycA").unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ClassCircularity);
        assert!(vm.find_class("p/CycA").is_none());

        // a failed attempt leaves nothing behind
        let err = vm.load_class("p/CycB").unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ClassCircularity);

        let _ = std::fs::remove_dir_all(dir);
    }
}
