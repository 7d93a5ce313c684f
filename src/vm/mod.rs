pub mod vm;
pub mod error;
pub mod object;
pub mod class;
pub mod class_loader;
pub mod pool;
pub mod reflect;
pub mod thread;
pub mod invoke;
#[cfg(test)]
pub(crate) mod testing;
