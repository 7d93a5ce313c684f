use std::sync::Arc;

use smallvec::SmallVec;

use crate::class_parser::constants::{AccessFlagClass, AccessFlagField, AccessFlagMethod, CPInfo};
use crate::class_parser::parse_class;
use crate::class_parser::types::{AttributeInfo, ParsedClass, U2};
use crate::class_parser::ParseError;
use crate::helper::{has_flag, slots_from_class_file};
use crate::vm::class::class::{overrides, Class, ClassKind, MethodRef};
use crate::vm::class::constant_pool::{CPEntry, ConstantPool, SymbolicRef};
use crate::vm::class::field::{Field, FieldType, FIELD_SLOT_SIZE, OBJECT_HEADER_SIZE};
use crate::vm::class::method::{Dispatch, Method, MethodDescriptor};
use crate::vm::class_loader::native::{init_native_store, NativeMethodRef, NATIVE_FN_STORE};
use crate::vm::error::{Exception, ExceptionKind, VmResult};
use crate::vm::invoke::flags::RefKind;
use crate::vm::invoke::natives::{METHOD_HANDLE_NATIVES, NATIVES};
use crate::vm::vm::Vm;

const PUBLIC: u16 = AccessFlagMethod::ACC_PUBLIC as u16;
const PRIVATE: u16 = AccessFlagMethod::ACC_PRIVATE as u16;
const STATIC: u16 = AccessFlagMethod::ACC_STATIC as u16;
const FINAL: u16 = AccessFlagMethod::ACC_FINAL as u16;
const NATIVE: u16 = AccessFlagMethod::ACC_NATIVE as u16;
const VARARGS: u16 = AccessFlagMethod::ACC_VARARGS as u16;
const ABSTRACT: u16 = AccessFlagClass::ACC_ABSTRACT as u16;
const INTERFACE: u16 = AccessFlagClass::ACC_INTERFACE as u16;

const CALLER_SENSITIVE_ANNOTATION: &str = "Ljdk/internal/reflect/CallerSensitive;";

#[derive(Debug, Clone)]
struct MethodDef {
    flag: u16,
    name: String,
    descriptor: String,
    caller_sensitive: bool,
}

/// Declaration of a class, either written out by hand or read from a class file
#[derive(Debug, Clone)]
pub struct ClassDef {
    name: String,
    flag: u16,
    superclass: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<(u16, String, String)>,
    methods: Vec<MethodDef>,
    constants: Vec<CPEntry>,
    bootstrap_methods: Vec<u16>,
}

impl ClassDef {
    /// Public class extending `java/lang/Object`
    pub fn new(name: &str) -> ClassDef {
        ClassDef::root(name)
            .flags(PUBLIC | AccessFlagClass::ACC_SUPER as u16)
            .extends("java/lang/Object")
    }

    pub fn interface(name: &str) -> ClassDef {
        ClassDef::root(name)
            .flags(PUBLIC | INTERFACE | ABSTRACT)
            .extends("java/lang/Object")
    }

    /// Class without a superclass
    pub fn root(name: &str) -> ClassDef {
        ClassDef {
            name: name.to_string(),
            flag: 0,
            superclass: None,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            constants: vec![],
            bootstrap_methods: vec![]
        }
    }

    pub fn flags(mut self, flag: u16) -> ClassDef {
        self.flag = flag;
        self
    }

    pub fn extends(mut self, superclass: &str) -> ClassDef {
        self.superclass = Some(superclass.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> ClassDef {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn field(mut self, flag: u16, name: &str, descriptor: &str) -> ClassDef {
        self.fields.push((flag, name.to_string(), descriptor.to_string()));
        self
    }

    pub fn method(mut self, flag: u16, name: &str, descriptor: &str) -> ClassDef {
        self.methods.push(MethodDef {
            flag,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            caller_sensitive: false
        });
        self
    }

    /// A method whose behaviour depends on its immediate caller
    pub fn caller_sensitive_method(mut self, flag: u16, name: &str, descriptor: &str) -> ClassDef {
        self = self.method(flag, name, descriptor);
        if let Some(m) = self.methods.last_mut() {
            m.caller_sensitive = true;
        }
        self
    }

    /// Appends a constant pool entry. The first entry gets index 1.
    pub fn constant(mut self, entry: CPEntry) -> ClassDef {
        self.constants.push(entry);
        self
    }

    /// Appends a BootstrapMethods entry
    pub fn bootstrap(mut self, method_handle: u16, arguments: &[u16]) -> ClassDef {
        self.bootstrap_methods.push(method_handle);
        self.bootstrap_methods.push(arguments.len() as u16);
        self.bootstrap_methods.extend_from_slice(arguments);
        self
    }
}

enum VtableSlot {
    Inherited(MethodRef),
    Own(u16),
}

fn class_format(message: String) -> Exception {
    Exception::with_message(ExceptionKind::ClassFormat, message)
}

impl Vm {
    /// Lays out and registers a class. Superclass and interfaces are loaded first.
    pub fn define_class(&self, def: ClassDef) -> VmResult<Arc<Class>> {
        if let Some(existing) = self.find_class(&def.name) {
            return Ok(existing);
        }

        let superclass = match &def.superclass {
            Some(name) => Some(self.load_class(name)?),
            None => None
        };
        if let Some(s) = &superclass {
            if s.is_interface() || s.is_array() || s.is_primitive() || has_flag(s.flag, AccessFlagClass::ACC_FINAL) {
                return Err(Exception::with_message(ExceptionKind::IncompatibleClassChange,
                    format!("{} cannot extend {}", def.name, s.name)));
            }
        }

        let mut interfaces: SmallVec<[_; 4]> = SmallVec::new();
        let mut itable = vec![];
        for name in &def.interfaces {
            let interface = self.load_class(name)?;
            if !interface.is_interface() {
                return Err(Exception::with_message(ExceptionKind::IncompatibleClassChange,
                    format!("{} cannot implement class {}", def.name, interface.name)));
            }
            interfaces.push(interface.id);
            for id in std::iter::once(interface.id).chain(interface.itable.iter().copied()) {
                if !itable.contains(&id) {
                    itable.push(id);
                }
            }
        }
        if let Some(s) = &superclass {
            for id in &s.itable {
                if !itable.contains(id) {
                    itable.push(*id);
                }
            }
        }

        let superclasses = match &superclass {
            Some(s) => {
                let mut ancestors = s.superclasses.clone();
                ancestors.push(s.id);
                ancestors
            }
            None => vec![]
        };

        let mut instance_size = superclass.as_ref().map_or(OBJECT_HEADER_SIZE, |s| s.instance_size);
        let mut static_slots = 0;
        let mut fields = Vec::with_capacity(def.fields.len());
        for (flag, name, descriptor) in def.fields {
            let t = FieldType::parse(&descriptor)
                .ok_or_else(|| class_format(format!("Could not parse field descriptor {}", descriptor)))?;
            let slot = if has_flag(flag, AccessFlagField::ACC_STATIC) {
                static_slots += 1;
                static_slots - 1
            } else {
                instance_size += FIELD_SLOT_SIZE;
                instance_size - FIELD_SLOT_SIZE
            };
            fields.push(Field { flag, name, descriptor: t, slot });
        }

        let is_interface = has_flag(def.flag, AccessFlagClass::ACC_INTERFACE);
        let mut vtable: Vec<VtableSlot> = match &superclass {
            Some(s) if !is_interface => s.vtable.iter().map(|r| VtableSlot::Inherited(*r)).collect(),
            _ => vec![]
        };

        let mut methods = Vec::with_capacity(def.methods.len());
        for (index, m) in def.methods.into_iter().enumerate() {
            let descriptor = MethodDescriptor::parse(&m.descriptor)
                .ok_or_else(|| class_format(format!("Could not parse method descriptor {}", m.descriptor)))?;

            let mut method = Method {
                flag: m.flag,
                name: m.name,
                descriptor,
                dispatch: Dispatch::Direct,
                caller_sensitive: m.caller_sensitive,
                native: None
            };

            if method.is_native() {
                let native_store = NATIVE_FN_STORE.get_or_init(init_native_store);
                method.native = native_store.get(&NativeMethodRef {
                    class_name: def.name.clone(),
                    method_name: method.name.clone(),
                    descriptor: method.descriptor.clone()
                }).copied();
            }

            if !method.is_static() && !method.is_private() && !method.is_initializer() {
                method.dispatch = if is_interface {
                    Dispatch::Interface(index as u16)
                } else {
                    let inherited = vtable.iter().position(|slot| match slot {
                        VtableSlot::Inherited(r) => self.class(r.class).method(r.index)
                            .map_or(false, |inherited| overrides(&method, inherited)),
                        VtableSlot::Own(_) => false
                    });
                    let slot = match inherited {
                        Some(slot) => {
                            vtable[slot] = VtableSlot::Own(index as u16);
                            slot
                        }
                        None => {
                            vtable.push(VtableSlot::Own(index as u16));
                            vtable.len() - 1
                        }
                    };
                    Dispatch::Virtual(slot as u16)
                };
            }

            methods.push(method);
        }

        let name = def.name;
        let flag = def.flag;
        let constant_pool = ConstantPool::new(def.constants);
        let bootstrap_methods = def.bootstrap_methods;

        self.add_class(&name, |id, mirror| Class {
            id,
            name: name.clone(),
            flag,
            kind: ClassKind::Instance,
            superclass: superclass.as_ref().map(|s| s.id),
            interfaces,
            superclasses,
            itable,
            vtable: vtable.into_iter().map(|slot| match slot {
                VtableSlot::Inherited(r) => r,
                VtableSlot::Own(index) => MethodRef { class: id, index }
            }).collect(),
            constant_pool,
            bootstrap_methods,
            fields,
            methods,
            instance_size,
            static_slots,
            mirror
        })
    }

    /// Defines a class from the bytes of a class file
    pub fn derive_class(&self, buf: &[u8]) -> VmResult<Arc<Class>> {
        let parsed_class = parse_class(buf)?;

        let name = parsed_class.class_name(parsed_class.this_class)?;
        let mut def = ClassDef::root(name).flags(parsed_class.access_flags);
        if parsed_class.super_class != 0 {
            def = def.extends(parsed_class.class_name(parsed_class.super_class)?);
        }
        for interface in &parsed_class.interfaces {
            def = def.implements(parsed_class.class_name(*interface)?);
        }

        for f in &parsed_class.fields {
            def = def.field(f.access_flags, parsed_class.utf8(f.name_index)?,
                            parsed_class.utf8(f.descriptor_index)?);
        }
        for m in &parsed_class.methods {
            let name = parsed_class.utf8(m.name_index)?;
            let descriptor = parsed_class.utf8(m.descriptor_index)?;
            def = if is_caller_sensitive(&parsed_class, &m.attributes)? {
                def.caller_sensitive_method(m.access_flags, name, descriptor)
            } else {
                def.method(m.access_flags, name, descriptor)
            };
        }

        def.constants = load_cp_entries(&parsed_class)?;
        for bsm in &parsed_class.bootstrap_methods {
            def = def.bootstrap(bsm.bootstrap_method_ref, &bsm.bootstrap_arguments);
        }

        self.define_class(def)
    }
}

fn member(parsed_class: &ParsedClass, class: U2, nt: U2) -> Result<SymbolicRef, ParseError> {
    let (name, descriptor) = parsed_class.name_and_type(nt)?;
    Ok(SymbolicRef { class, name: name.to_string(), descriptor: descriptor.to_string() })
}

fn load_cp_entries(parsed_class: &ParsedClass) -> Result<Vec<CPEntry>, ParseError> {
    let mut constant_pool = Vec::with_capacity(parsed_class.constant_pool.len());

    for (i, entry) in parsed_class.constant_pool.iter().enumerate() {
        let index = i as U2 + 1;
        let entry = match entry {
            // ConstantPool re-inserts the slot after wide entries
            CPInfo::Hole => continue,
            CPInfo::Utf8(s) => CPEntry::Utf8(s.clone()),
            CPInfo::Integer(v) => CPEntry::Integer(*v as i32),
            CPInfo::Float(v) => CPEntry::Float(f32::from_bits(*v)),
            CPInfo::Long(high, low) => {
                let (a, b) = slots_from_class_file(*high, *low);
                CPEntry::Long([a, b])
            }
            CPInfo::Double(high, low) => {
                let (a, b) = slots_from_class_file(*high, *low);
                CPEntry::Double([a, b])
            }
            CPInfo::Class(name) => CPEntry::class(parsed_class.utf8(*name)?),
            CPInfo::String(value) => CPEntry::string(parsed_class.utf8(*value)?),
            CPInfo::MethodType(descriptor) => CPEntry::method_type(parsed_class.utf8(*descriptor)?),
            CPInfo::MethodHandle(kind, reference) => {
                let kind = RefKind::try_from(*kind).map_err(|_| ParseError::ConstantPool(index))?;
                CPEntry::method_handle(kind, *reference)
            }
            CPInfo::Fieldref(class, nt) => CPEntry::Fieldref(member(parsed_class, *class, *nt)?),
            CPInfo::Methodref(class, nt) => CPEntry::Methodref(member(parsed_class, *class, *nt)?),
            CPInfo::InterfaceMethodref(class, nt) =>
                CPEntry::InterfaceMethodref(member(parsed_class, *class, *nt)?),
            CPInfo::NameAndType(..) => {
                let (name, descriptor) = parsed_class.name_and_type(index)?;
                CPEntry::NameAndType { name: name.to_string(), descriptor: descriptor.to_string() }
            }
            CPInfo::Dynamic(bsm_index, nt) => {
                let (name, descriptor) = parsed_class.name_and_type(*nt)?;
                CPEntry::dynamic(*bsm_index, name, descriptor)
            }
            CPInfo::InvokeDynamic(bsm_index, nt) => {
                let (name, descriptor) = parsed_class.name_and_type(*nt)?;
                CPEntry::InvokeDynamic { bsm_index: *bsm_index, name: name.to_string(), descriptor: descriptor.to_string() }
            }
            CPInfo::Module(_) | CPInfo::Package(_) => CPEntry::Utf8(String::new()),
        };
        constant_pool.push(entry);
    }

    Ok(constant_pool)
}

/// Looks for `@CallerSensitive` among the runtime visible annotations of a method
fn is_caller_sensitive(parsed_class: &ParsedClass, attributes: &[AttributeInfo]) -> Result<bool, ParseError> {
    for a in attributes {
        if parsed_class.utf8(a.attribute_name_index)? != "RuntimeVisibleAnnotations" {
            continue;
        }

        let mut reader = AnnotationReader { buf: &a.info, pos: 0 };
        let count = reader.u2()?;
        for _ in 0..count {
            let type_index = reader.annotation()?;
            if parsed_class.utf8(type_index)? == CALLER_SENSITIVE_ANNOTATION {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

struct AnnotationReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl AnnotationReader<'_> {
    fn u1(&mut self) -> Result<u8, ParseError> {
        let b = *self.buf.get(self.pos).ok_or(ParseError::Attribute("RuntimeVisibleAnnotations"))?;
        self.pos += 1;
        Ok(b)
    }

    fn u2(&mut self) -> Result<U2, ParseError> {
        Ok(u16::from_be_bytes([self.u1()?, self.u1()?]))
    }

    /// Skips one annotation and returns its type index
    fn annotation(&mut self) -> Result<U2, ParseError> {
        let type_index = self.u2()?;
        let pairs = self.u2()?;
        for _ in 0..pairs {
            self.u2()?;
            self.element_value()?;
        }
        Ok(type_index)
    }

    fn element_value(&mut self) -> Result<(), ParseError> {
        match self.u1()? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => {
                self.u2()?;
            }
            b'e' => {
                self.u2()?;
                self.u2()?;
            }
            b'@' => {
                self.annotation()?;
            }
            b'[' => {
                let count = self.u2()?;
                for _ in 0..count {
                    self.element_value()?;
                }
            }
            _ => return Err(ParseError::Attribute("RuntimeVisibleAnnotations"))
        }
        Ok(())
    }
}

/// Defines the classes the natives depend on, the primitive classes and `Object[]`
pub fn load_bootstrap_classes(vm: &Vm) -> VmResult<()> {
    const OBJECT_ARRAY: &str = "([Ljava/lang/Object;)Ljava/lang/Object;";

    vm.define_class(ClassDef::root("java/lang/Object")
        .flags(PUBLIC)
        .method(PUBLIC, "<init>", "()V")
        .method(PUBLIC | NATIVE, "hashCode", "()I")
        .method(PUBLIC, "equals", "(Ljava/lang/Object;)Z")
        .method(PUBLIC, "toString", "()Ljava/lang/String;")
        .method(AccessFlagMethod::ACC_PROTECTED as u16 | NATIVE, "clone", "()Ljava/lang/Object;"))?;
    vm.define_class(ClassDef::interface("java/lang/Cloneable"))?;
    vm.define_class(ClassDef::interface("java/io/Serializable"))?;

    vm.define_class(ClassDef::new("java/lang/String")
        .flags(PUBLIC | FINAL)
        .implements("java/io/Serializable")
        .field(PRIVATE | FINAL, "value", "[B")
        .method(PUBLIC, "<init>", "()V")
        .method(PUBLIC, "length", "()I")
        .method(PUBLIC, "intern", "()Ljava/lang/String;"))?;
    vm.define_class(ClassDef::new("java/lang/Class")
        .flags(PUBLIC | FINAL)
        .implements("java/io/Serializable")
        .method(PRIVATE, "<init>", "()V")
        .method(PUBLIC, "getName", "()Ljava/lang/String;")
        .caller_sensitive_method(PUBLIC | STATIC, "forName", "(Ljava/lang/String;)Ljava/lang/Class;"))?;

    vm.define_class(ClassDef::new("java/lang/Number")
        .flags(PUBLIC | ABSTRACT)
        .implements("java/io/Serializable")
        .method(PUBLIC | ABSTRACT, "intValue", "()I")
        .method(PUBLIC | ABSTRACT, "longValue", "()J"))?;
    for (name, descriptor) in [("java/lang/Integer", "I"), ("java/lang/Long", "J"),
                               ("java/lang/Float", "F"), ("java/lang/Double", "D")] {
        vm.define_class(ClassDef::new(name)
            .flags(PUBLIC | FINAL)
            .extends("java/lang/Number")
            .field(PRIVATE | FINAL, "value", descriptor)
            .method(PUBLIC, "intValue", "()I")
            .method(PUBLIC, "longValue", "()J"))?;
    }

    vm.define_class(ClassDef::new("java/lang/reflect/AccessibleObject"))?;
    vm.define_class(ClassDef::new("java/lang/reflect/Executable")
        .flags(PUBLIC | ABSTRACT)
        .extends("java/lang/reflect/AccessibleObject"))?;
    vm.define_class(ClassDef::new("java/lang/reflect/Field")
        .flags(PUBLIC | FINAL)
        .extends("java/lang/reflect/AccessibleObject")
        .field(PRIVATE, "clazz", "Ljava/lang/Class;")
        .field(PRIVATE, "slot", "I")
        .field(PRIVATE, "name", "Ljava/lang/String;")
        .field(PRIVATE, "type", "Ljava/lang/Class;")
        .field(PRIVATE, "modifiers", "I"))?;
    for name in ["java/lang/reflect/Method", "java/lang/reflect/Constructor"] {
        vm.define_class(ClassDef::new(name)
            .flags(PUBLIC | FINAL)
            .extends("java/lang/reflect/Executable")
            .field(PRIVATE, "clazz", "Ljava/lang/Class;")
            .field(PRIVATE, "slot", "I")
            .field(PRIVATE, "signature", "Ljava/lang/String;")
            .field(PRIVATE, "modifiers", "I"))?;
    }

    vm.define_class(ClassDef::new("java/lang/invoke/MethodType")
        .flags(PUBLIC | FINAL)
        .implements("java/io/Serializable")
        .field(PRIVATE | FINAL, "rtype", "Ljava/lang/Class;")
        .field(PRIVATE | FINAL, "ptypes", "[Ljava/lang/Class;")
        .field(PRIVATE, "methodDescriptor", "Ljava/lang/String;")
        .method(PUBLIC, "toMethodDescriptorString", "()Ljava/lang/String;"))?;
    vm.define_class(ClassDef::new("java/lang/invoke/MemberName")
        .flags(FINAL)
        .field(PRIVATE, "clazz", "Ljava/lang/Class;")
        .field(PRIVATE, "name", "Ljava/lang/String;")
        .field(PRIVATE, "type", "Ljava/lang/Object;")
        .field(PRIVATE, "flags", "I")
        .field(PRIVATE, "method", "Ljava/lang/invoke/ResolvedMethodName;")
        .method(PUBLIC, "<init>", "()V")
        .method(PUBLIC, "getName", "()Ljava/lang/String;"))?;
    vm.define_class(ClassDef::new("java/lang/invoke/MethodHandle")
        .flags(PUBLIC | ABSTRACT)
        .field(PRIVATE | FINAL, "type", "Ljava/lang/invoke/MethodType;")
        .method(PUBLIC | FINAL | NATIVE | VARARGS, "invokeExact", OBJECT_ARRAY)
        .method(PUBLIC | FINAL | NATIVE | VARARGS, "invoke", OBJECT_ARRAY)
        .method(FINAL | NATIVE | VARARGS, "invokeBasic", OBJECT_ARRAY)
        .method(STATIC | NATIVE | VARARGS, "linkToVirtual", OBJECT_ARRAY)
        .method(STATIC | NATIVE | VARARGS, "linkToStatic", OBJECT_ARRAY)
        .method(STATIC | NATIVE | VARARGS, "linkToSpecial", OBJECT_ARRAY)
        .method(STATIC | NATIVE | VARARGS, "linkToInterface", OBJECT_ARRAY)
        .method(PUBLIC, "type", "()Ljava/lang/invoke/MethodType;"))?;
    vm.define_class(ClassDef::new("java/lang/invoke/CallSite")
        .flags(PUBLIC | ABSTRACT)
        .field(0, "target", "Ljava/lang/invoke/MethodHandle;")
        .method(PUBLIC, "getTarget", "()Ljava/lang/invoke/MethodHandle;"))?;
    vm.define_class(ClassDef::new("java/lang/invoke/MethodHandles$Lookup")
        .flags(PUBLIC | FINAL)
        .field(PRIVATE | FINAL, "lookupClass", "Ljava/lang/Class;"))?;
    vm.define_class(ClassDef::new("java/lang/invoke/MethodHandles")
        .flags(PUBLIC)
        .caller_sensitive_method(PUBLIC | STATIC, "lookup", "()Ljava/lang/invoke/MethodHandles$Lookup;"))?;
    vm.define_class(ClassDef::new("java/lang/invoke/MethodHandleNatives$CallSiteContext")
        .flags(FINAL)
        .method(PRIVATE, "<init>", "()V"))?;

    let mut natives = ClassDef::new(METHOD_HANDLE_NATIVES).flags(0);
    for (name, descriptor, _) in NATIVES {
        natives = natives.method(STATIC | NATIVE, name, descriptor);
    }
    vm.define_class(natives)?;

    for t in FieldType::PRIMITIVES {
        vm.define_primitive_class(t)?;
    }
    vm.load_class("[Ljava/lang/Object;")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::class_parser::writer::ClassFileWriter;
    use crate::vm::class::class::{ClassKind, MethodRef};
    use crate::vm::class::constant_pool::CPEntry;
    use crate::vm::class::field::FieldType;
    use crate::vm::class::method::Dispatch;
    use crate::vm::class_loader::bootstrap::ClassDef;
    use crate::vm::error::ExceptionKind;
    use crate::vm::invoke::flags::RefKind;
    use crate::vm::invoke::natives::{METHOD_HANDLE_NATIVES, NATIVES};
    use crate::vm::testing::{define_hierarchy, test_vm};

    #[test]
    fn field_layout_continues_superclass() {
        let vm = test_vm();
        let h = define_hierarchy(&vm);

        let (_, c) = h.c.find_field("c", Some("I")).unwrap();
        let (_, f) = h.b.find_field("f", Some("I")).unwrap();
        assert_eq!(c.slot, 16);
        assert_eq!(f.slot, 24);
        assert_eq!(h.a.instance_size, h.b.instance_size + 8);

        let (_, sc) = h.b.find_field("sc", Some("J")).unwrap();
        assert_eq!(sc.slot, 0);
        assert_eq!(sc.target(), 1);
    }

    #[test]
    fn vtable_overrides_keep_slots() {
        let vm = test_vm();
        let h = define_hierarchy(&vm);

        let (c_index, c_m) = h.c.find_method("m", "()V").unwrap();
        let (a_index, a_m) = h.a.find_method("m", "()V").unwrap();
        let slot = match c_m.dispatch {
            Dispatch::Virtual(slot) => slot,
            other => panic!("{:?}", other)
        };
        assert_eq!(a_m.dispatch, Dispatch::Virtual(slot));
        assert_eq!(h.c.vtable[slot as usize], MethodRef { class: h.c.id, index: c_index });
        assert_eq!(h.a.vtable[slot as usize], MethodRef { class: h.a.id, index: a_index });

        let (_, sm) = h.c.find_method("sm", "()V").unwrap();
        assert_eq!(sm.dispatch, Dispatch::Direct);
        let (_, init) = h.c.find_method("<init>", "()V").unwrap();
        assert_eq!(init.dispatch, Dispatch::Direct);

        let (index, greet) = h.i.find_method("greet", "()V").unwrap();
        assert_eq!(greet.dispatch, Dispatch::Interface(index));
    }

    #[test]
    fn ancestors_and_interfaces() {
        let vm = test_vm();
        let h = define_hierarchy(&vm);
        let object = vm.core_class("java/lang/Object").unwrap();

        assert_eq!(h.a.superclasses, vec![object.id, h.c.id, h.b.id]);
        assert!(h.a.itable.contains(&h.i.id));
        assert!(h.a.is_subclass_of(h.c.id));

        let err = vm.define_class(ClassDef::new("p/Bad").extends("p/I")).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::IncompatibleClassChange);
        let err = vm.define_class(ClassDef::new("p/Bad").implements("p/C")).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::IncompatibleClassChange);
        let err = vm.define_class(ClassDef::new("p/Bad").method(0, "x", "(")).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ClassFormat);
    }

    #[test]
    fn bootstrap_classes() {
        let vm = test_vm();
        for t in FieldType::PRIMITIVES {
            let class = vm.core_class(t.primitive_name().unwrap()).unwrap();
            assert_eq!(class.kind, ClassKind::Primitive(t));
        }

        let natives = vm.core_class(METHOD_HANDLE_NATIVES).unwrap();
        assert_eq!(natives.methods.len(), NATIVES.len());
        assert!(natives.methods.iter().all(|m| m.native.is_some()));

        // no implementation is registered for Object.hashCode
        let object = vm.core_class("java/lang/Object").unwrap();
        assert!(object.find_method("hashCode", "()I").unwrap().1.native.is_none());

        let class = vm.core_class("java/lang/Class").unwrap();
        assert!(class.find_method("forName", "(Ljava/lang/String;)Ljava/lang/Class;").unwrap().1.caller_sensitive);
    }

    #[test]
    fn derives_parsed_class_files() {
        let vm = test_vm();
        let mut w = ClassFileWriter::new("p/Parsed", Some("java/lang/Object"));
        w.implements("java/io/Serializable");
        w.field(0x0008, "counter", "J");
        w.method(0x0001, "<init>", "()V");
        let answer = w.integer(42);
        let big = w.long(-7);
        let mh = w.method_handle(RefKind::InvokeStatic.into(), "java/lang/Class", "forName",
                                 "(Ljava/lang/String;)Ljava/lang/Class;");
        let bsm = w.bootstrap_method(mh, &[answer, big]);
        let dynamic = w.dynamic(bsm, "value", "Ljava/lang/Object;");
        let class = vm.derive_class(&w.finish()).unwrap();

        assert_eq!(class.name, "p/Parsed");
        assert!(class.implements(vm.core_class("java/io/Serializable").unwrap().id));
        assert!(class.fields[0].is_static());
        assert!(matches!(class.constant_pool.get(answer), Some(CPEntry::Integer(42))));
        assert!(matches!(class.constant_pool.get(big), Some(CPEntry::Long(_))));
        assert!(matches!(class.constant_pool.get(mh),
                         Some(CPEntry::MethodHandle { kind: RefKind::InvokeStatic, .. })));
        assert!(matches!(class.constant_pool.get(dynamic), Some(CPEntry::Dynamic { .. })));

        let (bsm_ref, args) = class.bootstrap_method(bsm).unwrap();
        assert_eq!(bsm_ref, mh);
        assert_eq!(args, &[answer, big]);

        let err = vm.derive_class(&[0xCA, 0xFE]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ClassFormat);
    }
}
