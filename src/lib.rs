pub mod class_parser;
pub mod helper;
pub mod vm;
