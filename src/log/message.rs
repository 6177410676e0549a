use super::{Error, ErrorKind};
use std::fmt::Display;

pub const UNRECOGNIZED_TAG: &str = "unrecognized tag";
pub const UNEXPECTED_TAG: &str = "unexpected tag";
pub const ILLEGAL_POSITION: &str = "illegal position";
pub const DUPLICATE_ELSE: &str = "duplicate else";
pub const DUPLICATE_EXTENDS: &str = "duplicate extends";
pub const MISMATCHED_TERMINATOR: &str = "mismatched terminator";
pub const INVALID_HELPER: &str = "invalid helper";
pub const NOT_ITERABLE: &str = "value is not iterable";
pub const TOO_DEEP: &str = "templates nested too deeply";
pub const MISSING_TEMPLATE: &str = "missing template";
pub const INVALID_SYNTAX_CONFIG: &str = "invalid syntax configuration";

/// Return an [`Error`] explaining that a construct reached the end of the
/// source without its terminator.
pub fn error_unterminated<T>(construct: T, terminator: &str) -> Error
where
    T: Display,
{
    Error::build(ErrorKind::Unterminated)
        .with_reason(format!("unterminated `{construct}`"))
        .with_help(format!(
            "`{construct}` opened here is never closed, add `{terminator}` before the end of the template"
        ))
}

/// Return an [`Error`] explaining that the write operation failed.
///
/// This is likely caused by a failure during a `write!` macro operation.
pub fn error_write() -> Error {
    Error::build(ErrorKind::Render)
        .with_reason("write failure")
        .with_help("failed to write result of render, are you low on memory?")
}

/// Return an [`Error`] describing a helper that is not registered.
pub fn error_missing_helper(name: &str) -> Error {
    Error::build(ErrorKind::Helper)
        .with_reason(INVALID_HELPER)
        .with_help(format!(
            "template wants to use the `{name}` helper, but a helper with that name \
            was not found in this engine, did you add it with `.add_helper`?"
        ))
}

/// Return an [`Error`] describing a template that the loader could not find.
pub fn error_missing_template(spec: &str) -> Error {
    Error::build(ErrorKind::Load)
        .with_reason(MISSING_TEMPLATE)
        .with_help(format!("template `{spec}` could not be loaded"))
}

/// Return an [`Error`] describing a lock that was poisoned by a panicking
/// thread.
pub fn error_poisoned() -> Error {
    Error::build(ErrorKind::Load)
        .with_reason("template compile lock is poisoned")
        .with_help("another thread panicked while compiling a template")
}
