use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

use crate::vm::class::class::{Class, ClassId};
use crate::vm::class_loader::bootstrap::load_bootstrap_classes;
use crate::vm::class_loader::resolve::{BootstrapLinker, ClassLinker};
use crate::vm::error::{Exception, ExceptionKind, VmResult};
use crate::vm::object::{Handle, HeapObject, ObjectArray};
use crate::vm::pool::object::{Heap, HeapConfig};
use crate::vm::pool::string::StringPool;
use crate::vm::reflect::{HeapReflectionFactory, IdRegistry, ReflectionFactory};

#[derive(Debug, Clone, Default)]
pub struct VmConfig {
    pub heap: HeapConfig,
    /// Directories searched for class files
    pub classpath: Vec<PathBuf>,
}

/// Proof of being in VM-internal context. Garbage collection waits until every guard is dropped.
pub type VmAccess<'a> = RwLockReadGuard<'a, ()>;

pub struct Vm {
    pub heap: Heap,
    pub string_pool: StringPool,
    pub ids: IdRegistry,
    classes: RwLock<Vec<Arc<Class>>>, // Class objects are never moved or unloaded
    bootstrap_cl_class_list: RwLock<HashMap<String, ClassId>>,
    linker: Box<dyn ClassLinker>,
    reflection: Box<dyn ReflectionFactory>,
    access: RwLock<()>,
}

impl Vm {
    pub fn new(config: VmConfig) -> VmResult<Vm> {
        let linker = BootstrapLinker::new(config.classpath.clone());
        Vm::with_collaborators(config, Box::new(linker), Box::new(HeapReflectionFactory))
    }

    pub fn with_collaborators(config: VmConfig, linker: Box<dyn ClassLinker>,
                              reflection: Box<dyn ReflectionFactory>) -> VmResult<Vm> {
        let vm = Vm {
            heap: Heap::new(config.heap),
            string_pool: Default::default(),
            ids: Default::default(),
            classes: Default::default(),
            bootstrap_cl_class_list: Default::default(),
            linker,
            reflection,
            access: RwLock::new(()),
        };

        load_bootstrap_classes(&vm)?;

        Ok(vm)
    }

    pub fn linker(&self) -> &dyn ClassLinker {
        self.linker.as_ref()
    }

    pub fn reflection(&self) -> &dyn ReflectionFactory {
        self.reflection.as_ref()
    }

    /// Enters VM-internal context for the lifetime of the returned guard
    pub fn enter(&self) -> VmAccess<'_> {
        self.access.read()
    }

    /// Stops the world and relocates every object
    pub fn collect_garbage(&self) {
        let _world = self.access.write();
        self.heap.relocate();
    }

    /// Registers a class under its name. `make` receives the id and mirror reserved for it.
    /// If a class with that name already exists, it is returned instead.
    pub(crate) fn add_class(&self, name: &str, make: impl FnOnce(ClassId, Handle) -> Class)
                            -> VmResult<Arc<Class>> {
        let mut classes = self.classes.write();
        let mut by_name = self.bootstrap_cl_class_list.write();

        if let Some(id) = by_name.get(name) {
            return Ok(classes[id.0 as usize].clone());
        }

        let id = ClassId(classes.len() as u32);
        let mirror = self.heap.allocate(HeapObject::Class(id))?;
        let class = Arc::new(make(id, mirror));

        classes.push(class.clone());
        by_name.insert(name.to_string(), id);

        debug!("Defined class {} as #{}", name, id.0);
        Ok(class)
    }

    pub fn class(&self, id: ClassId) -> Arc<Class> {
        self.classes.read()[id.0 as usize].clone()
    }

    pub fn find_class(&self, name: &str) -> Option<Arc<Class>> {
        let id = *self.bootstrap_cl_class_list.read().get(name)?;
        Some(self.class(id))
    }

    pub fn load_class(&self, name: &str) -> VmResult<Arc<Class>> {
        self.linker.load_class(self, name)
    }

    /// Classes the VM itself defines at startup
    pub fn core_class(&self, name: &str) -> VmResult<Arc<Class>> {
        self.find_class(name)
            .ok_or_else(|| Exception::internal(format!("core class {} is missing", name)))
    }

    /// The class a `java/lang/Class` object stands for
    pub fn class_of_mirror(&self, mirror: Handle) -> Option<Arc<Class>> {
        let id = self.heap.read(mirror, |obj| match obj {
            HeapObject::Class(id) => Some(*id),
            _ => None
        })?;
        Some(self.class(id))
    }

    pub fn intern(&self, value: &str) -> VmResult<Handle> {
        self.string_pool.intern_string(&self.heap, value)
    }

    pub fn string_value(&self, string: Handle) -> VmResult<String> {
        StringPool::get_string(&self.heap, string)
            .ok_or_else(|| Exception::with_message(ExceptionKind::InternalError, "not a string"))
    }

    pub fn new_object_array(&self, component: ClassId, length: usize) -> VmResult<Handle> {
        self.heap.allocate(HeapObject::ObjectArray(ObjectArray {
            component,
            elements: vec![None; length]
        }))
    }

    pub fn box_int(&self, value: i32) -> VmResult<Handle> {
        self.heap.allocate(HeapObject::Integer(value))
    }

    pub fn box_long(&self, value: i64) -> VmResult<Handle> {
        self.heap.allocate(HeapObject::Long(value))
    }

    /// Human readable rendering of a reference, for diagnostics
    pub fn describe(&self, obj: Option<Handle>) -> String {
        let obj = match obj {
            None => return "null".to_string(),
            Some(obj) => obj
        };

        let value = self.heap.read(obj, |o| o.clone());
        match value {
            HeapObject::String(s) => format!("\"{}\"", s),
            HeapObject::Class(id) => format!("class {}", self.class(id).name),
            HeapObject::Integer(i) => format!("Integer({})", i),
            HeapObject::Float(f) => format!("Float({})", f),
            HeapObject::Long(l) => format!("Long({})", l),
            HeapObject::Double(d) => format!("Double({})", d),
            HeapObject::MethodType(mt) => {
                let params: Vec<String> = mt.ptypes.iter().map(|p| self.describe(Some(*p))).collect();
                format!("MethodType({}){}", params.join(", "), self.describe(Some(mt.rtype)))
            }
            HeapObject::MethodHandle(mh) => format!("MethodHandle[{}]({})", mh.kind,
                                                    self.describe(Some(mh.member))),
            HeapObject::MemberName(mn) => format!("MemberName({} {} {} flags={:#x})",
                                                  self.describe(mn.clazz), self.describe(mn.name),
                                                  self.describe(mn.type_), mn.flags),
            HeapObject::ObjectArray(a) => {
                let elems: Vec<String> = a.elements.iter().map(|e| self.describe(*e)).collect();
                format!("[{}]", elems.join(", "))
            }
            other => other.type_name().to_string()
        }
    }
}
