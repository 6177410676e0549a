use crate::{
    compile::generate::program::Program,
    engine::{Engine, Overrides},
    log::Error,
    render::Renderer,
};
use serde_json::Value;

/// A compiled [`Template`] that can be rendered with a model.
///
/// A `Template` keeps no state between renders, so one instance may be
/// rendered any number of times, from any number of threads.
#[derive(Debug, Clone)]
pub struct Template {
    /// The spec of the [`Template`].
    spec: String,
    /// The source text from which this [`Template`] was generated.
    source: String,
    /// The executable program generated during compilation.
    program: Program,
}

impl Template {
    #[inline]
    pub(crate) fn new(spec: &str, source: &str, program: Program) -> Self {
        Self {
            spec: spec.into(),
            source: source.into(),
            program,
        }
    }

    /// Return the spec of the [`Template`].
    #[inline]
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Return the source text of the [`Template`].
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub(crate) fn program(&self) -> &Program {
        &self.program
    }

    /// Render the [`Template`] against the model.
    ///
    /// The `engine` is used to resolve `call` and `extends` tags and helpers.
    /// The `overrides` replace the content of the named blocks.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if rendering fails, which may happen when a helper
    /// is missing or returns an `Error` itself, or the template cannot be
    /// rendered for a reason that will be described by the `Error`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vellum::{compile, helper::serde::json, TemplateEngine};
    /// use std::collections::HashMap;
    ///
    /// let template = compile("page", "<h1>{{#block title}}Default{{/block}}</h1>").unwrap();
    /// let overrides = HashMap::from([("title".to_string(), "Home".to_string())]);
    ///
    /// let result = template.render(&TemplateEngine::default(), &json!({}), Some(&overrides));
    /// assert_eq!(result.unwrap(), "<h1>Home</h1>");
    /// ```
    pub fn render(
        &self,
        engine: &dyn Engine,
        model: &Value,
        overrides: Option<&Overrides>,
    ) -> Result<String, Error> {
        Renderer::new(engine, self, model, overrides).render()
    }
}
