use std::num::NonZeroUsize;

use parking_lot::Mutex;
use tracing::debug;

use crate::vm::error::{Exception, VmResult};
use crate::vm::object::{Handle, HeapObject, ObjectPtr};

#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Maximum number of live objects
    pub capacity: usize,
    /// Relocate every object on each n-th allocation (stress mode)
    pub relocate_every: Option<NonZeroUsize>,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            capacity: 1 << 20,
            relocate_every: None
        }
    }
}

#[derive(Debug, Default)]
struct HeapState {
    space: Vec<Option<HeapObject>>,
    handles: Vec<Option<u32>>, // handle index -> current address
    free_handles: Vec<usize>,
    epoch: u32,
    allocations: usize,
    live: usize,
}

impl HeapState {
    fn relocate(&mut self) {
        let mut space = Vec::with_capacity(self.live);

        // Reversed, so that every surviving object ends up at a different address
        for addr in self.handles.iter_mut().rev().flatten() {
            let obj = self.space[*addr as usize].take();
            *addr = space.len() as u32;
            space.push(obj);
        }

        self.space = space;
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn check(&self, ptr: ObjectPtr) -> usize {
        assert_eq!(ptr.epoch, self.epoch, "stale object pointer used across a relocation");
        ptr.addr as usize
    }

    fn address_of(&self, handle: Handle) -> u32 {
        match self.handles.get(handle.index()) {
            Some(Some(addr)) => *addr,
            _ => panic!("dangling handle {:?}", handle)
        }
    }
}

/// Object store with stable handles. Every allocation is a potential relocation point.
#[derive(Debug)]
pub struct Heap {
    config: HeapConfig,
    state: Mutex<HeapState>,
}

impl Heap {
    pub fn new(config: HeapConfig) -> Heap {
        Heap {
            config,
            state: Mutex::new(HeapState::default())
        }
    }

    pub fn allocate(&self, obj: HeapObject) -> VmResult<Handle> {
        let mut state = self.state.lock();

        state.allocations += 1;
        if let Some(n) = self.config.relocate_every {
            if state.allocations % n.get() == 0 {
                state.relocate();
            }
        }

        if state.live >= self.config.capacity {
            return Err(Exception::heap_oom());
        }

        let addr = state.space.len() as u32;
        state.space.push(Some(obj));
        state.live += 1;

        let handle = match state.free_handles.pop() {
            Some(index) => {
                state.handles[index] = Some(addr);
                index
            }
            None => {
                state.handles.push(Some(addr));
                state.handles.len() - 1
            }
        };

        Ok(Handle::from_index(handle))
    }

    /// Current address of the object behind `handle`
    pub fn resolve(&self, handle: Handle) -> ObjectPtr {
        let state = self.state.lock();
        ObjectPtr {
            addr: state.address_of(handle),
            epoch: state.epoch
        }
    }

    pub fn with<R>(&self, ptr: ObjectPtr, f: impl FnOnce(&HeapObject) -> R) -> R {
        let state = self.state.lock();
        let addr = state.check(ptr);
        match &state.space[addr] {
            Some(obj) => f(obj),
            None => panic!("object at {} was released", addr)
        }
    }

    pub fn with_mut<R>(&self, ptr: ObjectPtr, f: impl FnOnce(&mut HeapObject) -> R) -> R {
        let mut state = self.state.lock();
        let addr = state.check(ptr);
        match &mut state.space[addr] {
            Some(obj) => f(obj),
            None => panic!("object at {} was released", addr)
        }
    }

    /// Resolves `handle` and reads the object within a single critical section
    pub fn read<R>(&self, handle: Handle, f: impl FnOnce(&HeapObject) -> R) -> R {
        let state = self.state.lock();
        let addr = state.address_of(handle) as usize;
        match &state.space[addr] {
            Some(obj) => f(obj),
            None => panic!("object at {} was released", addr)
        }
    }

    pub fn write<R>(&self, handle: Handle, f: impl FnOnce(&mut HeapObject) -> R) -> R {
        let mut state = self.state.lock();
        let addr = state.address_of(handle) as usize;
        match &mut state.space[addr] {
            Some(obj) => f(obj),
            None => panic!("object at {} was released", addr)
        }
    }

    pub fn release(&self, handle: Handle) {
        let mut state = self.state.lock();
        let addr = state.address_of(handle) as usize;

        state.space[addr] = None;
        state.handles[handle.index()] = None;
        state.free_handles.push(handle.index());
        state.live -= 1;
    }

    /// Moves every live object. Outstanding `ObjectPtr`s become invalid.
    pub fn relocate(&self) {
        let mut state = self.state.lock();
        state.relocate();

        debug!(epoch = state.epoch, live = state.live, "heap relocated");
    }

    pub fn epoch(&self) -> u32 {
        self.state.lock().epoch
    }

    pub fn live_objects(&self) -> usize {
        self.state.lock().live
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new(HeapConfig::default())
    }
}
