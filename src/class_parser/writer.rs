//! Minimal class file emitter used by tests.

use std::collections::HashMap;

use crate::class_parser::types::U2;

pub struct ClassFileWriter {
    pool: Vec<Vec<u8>>,
    pool_count: U2,
    utf8: HashMap<String, U2>,
    access_flags: U2,
    this_class: U2,
    super_class: U2,
    interfaces: Vec<U2>,
    fields: Vec<u8>,
    field_count: U2,
    methods: Vec<u8>,
    method_count: U2,
    bootstrap_methods: Vec<(U2, Vec<U2>)>,
}

impl ClassFileWriter {
    pub fn new(name: &str, superclass: Option<&str>) -> Self {
        let mut w = ClassFileWriter {
            pool: vec![],
            pool_count: 1,
            utf8: Default::default(),
            access_flags: 0x0021,
            this_class: 0,
            super_class: 0,
            interfaces: vec![],
            fields: vec![],
            field_count: 0,
            methods: vec![],
            method_count: 0,
            bootstrap_methods: vec![],
        };
        w.this_class = w.class(name);
        let super_class = match superclass {
            Some(s) => w.class(s),
            None => 0
        };
        w.super_class = super_class;
        w
    }

    fn push(&mut self, bytes: Vec<u8>, slots: U2) -> U2 {
        let index = self.pool_count;
        self.pool.push(bytes);
        self.pool_count += slots;
        index
    }

    pub fn access_flags(&mut self, flags: U2) {
        self.access_flags = flags;
    }

    pub fn utf8(&mut self, value: &str) -> U2 {
        if let Some(index) = self.utf8.get(value) {
            return *index;
        }
        let mut bytes = vec![1];
        bytes.extend_from_slice(&(value.len() as U2).to_be_bytes());
        bytes.extend_from_slice(value.as_bytes());
        let index = self.push(bytes, 1);
        self.utf8.insert(value.to_string(), index);
        index
    }

    pub fn class(&mut self, name: &str) -> U2 {
        let name = self.utf8(name);
        let mut bytes = vec![7];
        bytes.extend_from_slice(&name.to_be_bytes());
        self.push(bytes, 1)
    }

    pub fn string(&mut self, value: &str) -> U2 {
        let value = self.utf8(value);
        let mut bytes = vec![8];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push(bytes, 1)
    }

    pub fn integer(&mut self, value: i32) -> U2 {
        let mut bytes = vec![3];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push(bytes, 1)
    }

    pub fn long(&mut self, value: i64) -> U2 {
        let mut bytes = vec![5];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push(bytes, 2)
    }

    pub fn double(&mut self, value: f64) -> U2 {
        let mut bytes = vec![6];
        bytes.extend_from_slice(&value.to_bits().to_be_bytes());
        self.push(bytes, 2)
    }

    pub fn method_type(&mut self, descriptor: &str) -> U2 {
        let descriptor = self.utf8(descriptor);
        let mut bytes = vec![16];
        bytes.extend_from_slice(&descriptor.to_be_bytes());
        self.push(bytes, 1)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> U2 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut bytes = vec![12];
        bytes.extend_from_slice(&name.to_be_bytes());
        bytes.extend_from_slice(&descriptor.to_be_bytes());
        self.push(bytes, 1)
    }

    fn member_ref(&mut self, tag: u8, class: &str, name: &str, descriptor: &str) -> U2 {
        let class = self.class(class);
        let nat = self.name_and_type(name, descriptor);
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&class.to_be_bytes());
        bytes.extend_from_slice(&nat.to_be_bytes());
        self.push(bytes, 1)
    }

    pub fn method_handle(&mut self, kind: u8, class: &str, name: &str, descriptor: &str) -> U2 {
        let tag = if kind <= 4 { 9 } else { 10 };
        let reference = self.member_ref(tag, class, name, descriptor);
        let mut bytes = vec![15, kind];
        bytes.extend_from_slice(&reference.to_be_bytes());
        self.push(bytes, 1)
    }

    pub fn dynamic(&mut self, bsm_index: U2, name: &str, descriptor: &str) -> U2 {
        let nat = self.name_and_type(name, descriptor);
        let mut bytes = vec![17];
        bytes.extend_from_slice(&bsm_index.to_be_bytes());
        bytes.extend_from_slice(&nat.to_be_bytes());
        self.push(bytes, 1)
    }

    pub fn implements(&mut self, interface: &str) {
        let index = self.class(interface);
        self.interfaces.push(index);
    }

    pub fn field(&mut self, flags: U2, name: &str, descriptor: &str) {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        for v in [flags, name, descriptor, 0] {
            self.fields.extend_from_slice(&v.to_be_bytes());
        }
        self.field_count += 1;
    }

    pub fn method(&mut self, flags: U2, name: &str, descriptor: &str) {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        for v in [flags, name, descriptor, 0] {
            self.methods.extend_from_slice(&v.to_be_bytes());
        }
        self.method_count += 1;
    }

    /// Returns the index of the new BootstrapMethods entry
    pub fn bootstrap_method(&mut self, method_handle: U2, arguments: &[U2]) -> U2 {
        self.bootstrap_methods.push((method_handle, arguments.to_vec()));
        self.bootstrap_methods.len() as U2 - 1
    }

    pub fn finish(mut self) -> Vec<u8> {
        let attribute_name = if self.bootstrap_methods.is_empty() {
            None
        } else {
            Some(self.utf8("BootstrapMethods"))
        };

        let mut out = vec![];
        out.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&55u16.to_be_bytes());
        out.extend_from_slice(&self.pool_count.to_be_bytes());
        for entry in &self.pool {
            out.extend_from_slice(entry);
        }
        for v in [self.access_flags, self.this_class, self.super_class, self.interfaces.len() as U2] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        for i in &self.interfaces {
            out.extend_from_slice(&i.to_be_bytes());
        }
        out.extend_from_slice(&self.field_count.to_be_bytes());
        out.extend_from_slice(&self.fields);
        out.extend_from_slice(&self.method_count.to_be_bytes());
        out.extend_from_slice(&self.methods);

        match attribute_name {
            None => out.extend_from_slice(&0u16.to_be_bytes()),
            Some(name) => {
                let mut info = vec![];
                info.extend_from_slice(&(self.bootstrap_methods.len() as U2).to_be_bytes());
                for (bsm, args) in &self.bootstrap_methods {
                    info.extend_from_slice(&bsm.to_be_bytes());
                    info.extend_from_slice(&(args.len() as U2).to_be_bytes());
                    for a in args {
                        info.extend_from_slice(&a.to_be_bytes());
                    }
                }
                out.extend_from_slice(&1u16.to_be_bytes());
                out.extend_from_slice(&name.to_be_bytes());
                out.extend_from_slice(&(info.len() as u32).to_be_bytes());
                out.extend_from_slice(&info);
            }
        }

        out
    }
}
