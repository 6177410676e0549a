//! Vellum - Template Compiler
//!
//! Compiles templates with inheritance, composition and indentation-aware
//! output into programs that render against a `serde_json::Value` model.
//!
//! ```
//! use vellum::{helper::serde::json, Engine, MemoryLoader, TemplateEngine};
//!
//! let loader = MemoryLoader::new()
//!     .with("list.tmpl", "{{#for v in items}}{{ v }}{{#non-last}}, {{/non-last}}{{/for}}");
//! let engine = TemplateEngine::new(loader);
//!
//! let output = engine.render("list", &json!({"items": ["a", "b", "c"]}));
//! assert_eq!(output.unwrap(), "a, b, c");
//! ```
pub mod helper;

mod compile;
mod engine;
mod log;
mod render;
mod store;

pub use compile::{compile, compile_with, Builder, Syntax, Template};
pub use engine::{Engine, FileLoader, Loader, MemoryLoader, Overrides, TemplateEngine};
pub use log::{Error, ErrorKind, Pointer, Visual};
pub use render::render;
pub use store::Store;
