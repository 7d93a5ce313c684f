pub mod array;
pub mod bootstrap;
pub mod native;
pub mod resolve;
