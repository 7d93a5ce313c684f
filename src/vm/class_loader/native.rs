use std::collections::HashMap;

use once_cell::sync::OnceCell;
use tracing::error;

use crate::vm::class::method::{MethodDescriptor, NativeFnPtr};
use crate::vm::invoke::natives::{METHOD_HANDLE_NATIVES, NATIVES};

#[derive(Debug, Eq, Hash, PartialEq)]
pub struct NativeMethodRef {
    pub class_name: String,
    pub method_name: String,
    pub descriptor: MethodDescriptor
}

pub static NATIVE_FN_STORE: OnceCell<HashMap<NativeMethodRef, NativeFnPtr>> = OnceCell::new();

fn register(native_store: &mut HashMap<NativeMethodRef, NativeFnPtr>, class_name: &str, method_name: &str,
            descriptor: &str, fn_ptr: NativeFnPtr) {
    match MethodDescriptor::parse(descriptor) {
        Some(descriptor) => {
            native_store.insert(NativeMethodRef {
                class_name: class_name.to_string(),
                method_name: method_name.to_string(),
                descriptor
            }, fn_ptr);
        }
        None => error!("Malformed descriptor for native {}.{}{}", class_name, method_name, descriptor)
    }
}

pub fn init_native_store() -> HashMap<NativeMethodRef, NativeFnPtr> {
    let mut native_store: HashMap<NativeMethodRef, NativeFnPtr> = Default::default();

    for (method_name, descriptor, fn_ptr) in NATIVES {
        register(&mut native_store, METHOD_HANDLE_NATIVES, method_name, descriptor, *fn_ptr);
    }

    native_store
}
