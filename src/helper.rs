//! Contains the `Helper` trait and the built-in helpers.
//!
//! A helper is any type which implements the [`Helper`][`crate::helper::Helper`] trait.
//! You can assign a helper to a [`TemplateEngine`][`crate::TemplateEngine`] with the
//! [`add_helper`][`crate::TemplateEngine::add_helper()`] method, and it will be available
//! in any [`Template`][`crate::Template`] rendered by that engine.
//!
//! Given this tag:
//!
//! ```text
//! {{ lowercase person.name }}
//! ```
//!
//! The first word is the name of the helper, and the second is a dotted path
//! that is resolved exactly like `{{ person.name }}` would be. The resolved
//! value is the only argument the helper receives, and the value it returns
//! is rendered in place of the tag.
//!
//! Every engine starts out with two helpers, `lowercase` and `uppercase`.
//!
//! # Examples
//!
//! You can either create a struct and implement the trait on that, or just create
//! a function matching the trait signature. Vellum will accept both.
//!
//! Here we use a function:
//!
//! ```rust
//! use vellum::{
//!     helper::serde::{json, Value},
//!     Engine, Error, ErrorKind, MemoryLoader, TemplateEngine,
//! };
//!
//! fn reverse(value: &Value) -> Result<Value, Error> {
//!     match value {
//!         Value::String(string) => Ok(json!(string.chars().rev().collect::<String>())),
//!         _ => Err(Error::build(ErrorKind::Helper)
//!                 .with_reason("helper `reverse` requires string input")),
//!     }
//! }
//!
//! let loader = MemoryLoader::new().with("page.tmpl", "{{ reverse name }}");
//! let engine = TemplateEngine::new(loader)
//!     .with_helper("reverse", reverse)
//!     .unwrap();
//!
//! let result = engine.render("page", &json!({ "name": "abc" }));
//! assert_eq!(result.unwrap(), "cba");
//! ```
//!
//! If you return an [`Error`][`crate::Error`] from your helper without setting a
//! visualization, Vellum will generate one that points to the tag.
//!
//! If you were to pass a number to the helper and print the error with `{:#}`,
//! you would see:
//!
//! ```text
//! error: helper `reverse` requires string input
//!   --> page.tmpl:1:1
//!    |
//!  1 | {{ reverse name }}
//!    | ^^^^^^^^^^^^^^^^^^
//!    |
//! ```

pub mod serde {
    //! Contains types from `serde_json`.
    pub use serde_json::*;
}

use crate::{
    log::{Error, ErrorKind},
    render::describe,
};
use serde_json::Value;

/// Describes a type which can be used to transform the value of a tag.
pub trait Helper: Send + Sync {
    /// Execute the helper with the given input and return a new Value as output.
    fn apply(&self, input: &Value) -> Result<Value, Error>;
}

/// Allows assignment of any function matching the signature of `apply` as a `Helper`,
/// instead of requiring a struct be created.
impl<F> Helper for F
where
    F: Fn(&Value) -> Result<Value, Error> + Send + Sync,
{
    fn apply(&self, input: &Value) -> Result<Value, Error> {
        self(input)
    }
}

/// Lowercase the given value.
///
/// # Errors
///
/// Returns an [`Error`] if the value is not a string.
pub fn lowercase(value: &Value) -> Result<Value, Error> {
    match value {
        Value::String(string) => Ok(Value::String(string.to_lowercase())),
        _ => Err(error_requires_string("lowercase", value)),
    }
}

/// Uppercase the given value.
///
/// # Errors
///
/// Returns an [`Error`] if the value is not a string.
pub fn uppercase(value: &Value) -> Result<Value, Error> {
    match value {
        Value::String(string) => Ok(Value::String(string.to_uppercase())),
        _ => Err(error_requires_string("uppercase", value)),
    }
}

fn error_requires_string(name: &str, value: &Value) -> Error {
    let found = describe(value);

    Error::build(ErrorKind::Helper)
        .with_reason(format!("helper `{name}` requires string input"))
        .with_help(format!("the value passed to `{name}` is {found}"))
}

#[cfg(test)]
mod tests {
    use super::{lowercase, uppercase, Helper};
    use crate::log::{Error, ErrorKind};
    use serde_json::{json, Value};

    #[test]
    fn test_case_folding() {
        assert_eq!(lowercase(&json!("AbC")).unwrap(), json!("abc"));
        assert_eq!(uppercase(&json!("AbC")).unwrap(), json!("ABC"));
    }

    #[test]
    fn test_case_folding_requires_string() {
        let error = lowercase(&json!(10)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Helper);
        assert_eq!(error.help(), Some("the value passed to `lowercase` is a number"));
    }

    #[test]
    fn test_function_is_helper() {
        let helper: Box<dyn Helper> = Box::new(faux_helper);

        assert_eq!(helper.apply(&Value::Null).unwrap(), json!("faux"));
    }

    /// A Helper used to test the blanket implementation.
    fn faux_helper(_: &Value) -> Result<Value, Error> {
        Ok(json!("faux"))
    }
}
