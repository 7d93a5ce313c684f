use strum_macros::{Display, IntoStaticStr};
use thiserror::Error;

use crate::class_parser::ParseError;

/// Throwables the linkage natives can leave pending on a thread. The string form is the binary
/// name of the Java class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum ExceptionKind {
    #[strum(serialize = "java/lang/NullPointerException")]
    NullPointer,
    #[strum(serialize = "java/lang/IllegalArgumentException")]
    IllegalArgument,
    #[strum(serialize = "java/lang/InternalError")]
    InternalError,
    #[strum(serialize = "java/lang/LinkageError")]
    LinkageError,
    #[strum(serialize = "java/lang/NoSuchFieldError")]
    NoSuchField,
    #[strum(serialize = "java/lang/NoSuchMethodError")]
    NoSuchMethod,
    #[strum(serialize = "java/lang/IncompatibleClassChangeError")]
    IncompatibleClassChange,
    #[strum(serialize = "java/lang/IllegalAccessError")]
    IllegalAccess,
    #[strum(serialize = "java/lang/NoClassDefFoundError")]
    NoClassDefFound,
    #[strum(serialize = "java/lang/ClassFormatError")]
    ClassFormat,
    #[strum(serialize = "java/lang/ClassCircularityError")]
    ClassCircularity,
    #[strum(serialize = "java/lang/BootstrapMethodError")]
    BootstrapMethod,
    #[strum(serialize = "java/lang/ArrayIndexOutOfBoundsException")]
    ArrayIndexOutOfBounds,
    #[strum(serialize = "java/lang/OutOfMemoryError")]
    OutOfMemory,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}", format_message(.message))]
pub struct Exception {
    pub kind: ExceptionKind,
    pub message: Option<String>,
}

fn format_message(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {}", message),
        None => String::new()
    }
}

impl Exception {
    pub fn new(kind: ExceptionKind) -> Self {
        Exception { kind, message: None }
    }

    pub fn with_message(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Exception { kind, message: Some(message.into()) }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(ExceptionKind::InternalError, message)
    }

    pub fn heap_oom() -> Self {
        Self::with_message(ExceptionKind::OutOfMemory, "Java heap space")
    }

    pub fn native_oom() -> Self {
        Self::with_message(ExceptionKind::OutOfMemory, "native memory exhausted")
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.into()
    }
}

impl From<ParseError> for Exception {
    fn from(e: ParseError) -> Self {
        Exception::with_message(ExceptionKind::ClassFormat, e.to_string())
    }
}

pub type VmResult<T> = Result<T, Exception>;

#[cfg(test)]
mod tests {
    use crate::vm::error::{Exception, ExceptionKind};

    #[test]
    fn display_uses_class_name() {
        let e = Exception::new(ExceptionKind::NoSuchField);
        assert_eq!(e.to_string(), "java/lang/NoSuchFieldError");

        let e = Exception::with_message(ExceptionKind::LinkageError, "bad index");
        assert_eq!(e.to_string(), "java/lang/LinkageError: bad index");
        assert_eq!(e.class_name(), "java/lang/LinkageError");
    }
}
