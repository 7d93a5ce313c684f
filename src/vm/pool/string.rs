use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::vm::error::VmResult;
use crate::vm::object::{Handle, HeapObject};
use crate::vm::pool::object::Heap;

#[derive(Debug, Default)]
pub struct StringPool {
    interned_string: RwLock<HashMap<String, Handle>>
}

impl StringPool {
    /// Allocates a fresh, non-interned string
    pub fn add_string(&self, heap: &Heap, value: &str) -> VmResult<Handle> {
        heap.allocate(HeapObject::String(value.to_string()))
    }

    pub fn intern_string(&self, heap: &Heap, value: &str) -> VmResult<Handle> {
        {
            let interned_map = self.interned_string.read();
            if let Some(handle) = interned_map.get(value) {
                return Ok(*handle);
            }
        }

        let obj = self.add_string(heap, value)?;

        let mut interned_map = self.interned_string.write();
        let interned = *interned_map.entry(value.to_string()).or_insert(obj);
        drop(interned_map);

        if interned != obj {
            // Lost the race against another thread interning the same value
            heap.release(obj);
        } else {
            debug!("Interned string {}", value);
        }

        Ok(interned)
    }

    pub fn get_string(heap: &Heap, handle: Handle) -> Option<String> {
        heap.read(handle, |obj| obj.as_str().map(str::to_string))
    }
}
