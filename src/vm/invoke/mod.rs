pub mod flags;
pub mod signature;
pub mod constant_ref;
pub mod lookup;
pub mod member_name;
pub mod members;
pub mod bootstrap_args;
pub mod natives;
