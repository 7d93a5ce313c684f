use tracing::trace;

use crate::vm::class::method::NativeArgs;
use crate::vm::error::{Exception, ExceptionKind, VmResult};
use crate::vm::object::JValue;
use crate::vm::vm::Vm;

/// Per-thread VM state. A native reports failure by leaving an exception pending here.
#[derive(Debug, Default)]
pub struct VMThread {
    pending_exception: Option<Exception>,
}

impl VMThread {
    pub fn new() -> VMThread {
        VMThread {
            pending_exception: None
        }
    }

    pub fn pending_exception(&self) -> Option<&Exception> {
        self.pending_exception.as_ref()
    }

    pub fn take_exception(&mut self) -> Option<Exception> {
        self.pending_exception.take()
    }

    pub fn throw(&mut self, exception: Exception) {
        trace!(exception = %exception, "exception pending");
        self.pending_exception = Some(exception);
    }

    /// Unwraps a native's result, leaving the error pending
    pub fn check<T>(&mut self, result: VmResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.throw(e);
                None
            }
        }
    }

    /// Invokes a native method declared by a loaded class
    pub fn invoke_native(&mut self, vm: &Vm, class_name: &str, method_name: &str, descriptor: &str,
                         args: NativeArgs) -> Option<JValue> {
        let class = match vm.load_class(class_name) {
            Ok(class) => class,
            Err(e) => {
                self.throw(e);
                return None;
            }
        };

        let native = class.find_method(method_name, descriptor)
            .and_then(|(_, m)| m.native);

        match native {
            Some(fn_ptr) => fn_ptr(vm, self, args),
            None => {
                self.throw(Exception::with_message(ExceptionKind::LinkageError,
                    format!("no native implementation for {}.{}{}", class_name, method_name, descriptor)));
                None
            }
        }
    }
}
