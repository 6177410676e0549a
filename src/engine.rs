mod loader;

pub use loader::{FileLoader, Loader, MemoryLoader};

use crate::{
    compile::{compile_with, Syntax, Template},
    helper::{self, Helper},
    log::{error_poisoned, Error, ErrorKind, INVALID_HELPER},
};
use dashmap::DashMap;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Block name to rendered replacement content, passed from an extending
/// template to the template it extends.
pub type Overrides = HashMap<String, String>;

/// Compiles and renders templates by spec, and provides the helpers that
/// templates may use.
///
/// A rendering [`Template`] calls back into its `Engine` for every `call`
/// and `extends` tag, and for every helper.
pub trait Engine: Sync {
    /// Return the compiled [`Template`] with the given spec, compiling it
    /// first if needed.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the template cannot be loaded or compiled.
    fn compile(&self, spec: &str) -> Result<Arc<Template>, Error>;

    /// Render the [`Template`] with the given spec against the model.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the template cannot be compiled, or
    /// rendering it fails.
    fn render(&self, spec: &str, model: &Value) -> Result<String, Error>;

    /// Return the helper with the given name, if it exists.
    fn helper(&self, name: &str) -> Option<Arc<dyn Helper>>;
}

/// An [`Engine`] that loads templates through a [`Loader`] and keeps every
/// compiled [`Template`] in a cache.
///
/// # Examples
///
/// ```
/// use vellum::{helper::serde::json, Engine, MemoryLoader, TemplateEngine};
///
/// let loader = MemoryLoader::new()
///     .with("base.tmpl", "<title>{{#block title}}Default{{/block}}</title>")
///     .with("home.tmpl", "{{#extends base}}{{#override title}}Home{{/override}}");
/// let engine = TemplateEngine::new(loader);
///
/// let result = engine.render("home", &json!({}));
/// assert_eq!(result.unwrap(), "<title>Home</title>");
/// ```
pub struct TemplateEngine {
    /// Reads template source text.
    loader: Box<dyn Loader>,
    /// Syntax used to compile every template.
    syntax: Syntax,
    /// Appended to every spec that does not already end with it.
    suffix: String,
    /// Compiled templates by normalized spec.
    templates: DashMap<String, Arc<Template>>,
    /// Per-spec locks, so a spec is compiled once without blocking lookups
    /// of other specs.
    compile_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Helpers that this engine is aware of.
    helpers: HashMap<String, Arc<dyn Helper>>,
}

impl TemplateEngine {
    /// Create a new [`TemplateEngine`] that loads templates with the given
    /// [`Loader`].
    ///
    /// The engine uses the default `Syntax`, the `.tmpl` suffix, and has the
    /// `lowercase` and `uppercase` helpers.
    pub fn new<L>(loader: L) -> Self
    where
        L: Loader + 'static,
    {
        Self {
            loader: Box::new(loader),
            syntax: Syntax::default(),
            suffix: ".tmpl".into(),
            templates: DashMap::new(),
            compile_locks: DashMap::new(),
            helpers: HashMap::new(),
        }
        .with_helper_must("lowercase", helper::lowercase)
        .with_helper_must("uppercase", helper::uppercase)
    }

    /// Set the [`Syntax`] used to compile templates.
    ///
    /// Templates already in the cache are discarded.
    pub fn set_syntax(&mut self, syntax: Syntax) {
        self.syntax = syntax;
        self.clear();
    }

    /// Set the [`Syntax`] used to compile templates.
    ///
    /// Returns the [`TemplateEngine`], so additional methods may be chained.
    #[inline]
    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.set_syntax(syntax);

        self
    }

    /// Set the suffix appended to specs that do not already end with it.
    ///
    /// Templates already in the cache are discarded.
    pub fn set_suffix(&mut self, suffix: &str) {
        self.suffix = suffix.into();
        self.clear();
    }

    /// Set the suffix appended to specs that do not already end with it.
    ///
    /// Returns the [`TemplateEngine`], so additional methods may be chained.
    #[inline]
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.set_suffix(suffix);

        self
    }

    /// Add a [`Helper`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the name is not an identifier, or a `Helper`
    /// with the given name already exists in the engine.
    ///
    /// # Examples
    ///
    /// ```
    /// use vellum::{helper::serde::Value, Error, TemplateEngine};
    ///
    /// fn identity(value: &Value) -> Result<Value, Error> {
    ///     Ok(value.clone())
    /// }
    ///
    /// let mut engine = TemplateEngine::default();
    ///
    /// assert!(engine.add_helper("identity", identity).is_ok());
    /// assert!(engine.add_helper("identity", identity).is_err());
    /// assert!(engine.add_helper("not valid", identity).is_err());
    /// ```
    pub fn add_helper<T>(&mut self, name: &str, helper: T) -> Result<(), Error>
    where
        T: Helper + 'static,
    {
        if !is_identifier(name) {
            return Err(Error::build(ErrorKind::Config)
                .with_reason(INVALID_HELPER)
                .with_help(format!(
                    "`{name}` is not a valid helper name, names must be identifiers"
                )));
        }
        if self.helpers.contains_key(name) {
            return Err(Error::build(ErrorKind::Config)
                .with_reason(INVALID_HELPER)
                .with_help(format!(
                    "helper with name `{name}` already exists in engine, \
                    overwrite it with `.with_helper_must`"
                )));
        }

        self.helpers.insert(name.into(), Arc::new(helper));
        Ok(())
    }

    /// Add a [`Helper`].
    ///
    /// Returns the [`TemplateEngine`], so additional methods may be chained.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the name is not an identifier, or a `Helper`
    /// with the given name already exists in the engine.
    #[inline]
    pub fn with_helper<T>(mut self, name: &str, helper: T) -> Result<Self, Error>
    where
        T: Helper + 'static,
    {
        self.add_helper(name, helper)?;

        Ok(self)
    }

    /// Add a [`Helper`].
    ///
    /// If a `Helper` with the given name already exists in the engine, it is
    /// overwritten.
    ///
    /// Returns the [`TemplateEngine`], so additional methods may be chained.
    #[inline]
    pub fn with_helper_must<T>(mut self, name: &str, helper: T) -> Self
    where
        T: Helper + 'static,
    {
        self.helpers.insert(name.into(), Arc::new(helper));

        self
    }

    /// Return the cached [`Template`] with the given spec, without
    /// compiling it.
    pub fn get_template(&self, spec: &str) -> Option<Arc<Template>> {
        let key = self.normalize(spec);

        self.templates
            .get(&key)
            .map(|template| Arc::clone(template.value()))
    }

    /// Return the cache key of a spec: no leading `/`, and ending with the
    /// suffix.
    fn normalize(&self, spec: &str) -> String {
        let spec = spec.trim_start_matches('/');
        if self.suffix.is_empty() || spec.ends_with(&self.suffix) {
            spec.to_owned()
        } else {
            format!("{spec}{}", self.suffix)
        }
    }

    /// Discard every cached template.
    fn clear(&mut self) {
        self.templates.clear();
        self.compile_locks.clear();
    }
}

impl Engine for TemplateEngine {
    fn compile(&self, spec: &str) -> Result<Arc<Template>, Error> {
        let key = self.normalize(spec);
        if let Some(template) = self.get_template(&key) {
            tracing::trace!(spec = %key, "template cache hit");
            return Ok(template);
        }

        let lock = Arc::clone(self.compile_locks.entry(key.clone()).or_default().value());
        let _guard = lock.lock().map_err(|_| error_poisoned())?;
        // Another thread may have compiled it while we waited.
        if let Some(template) = self.get_template(&key) {
            return Ok(template);
        }

        tracing::debug!(spec = %key, "compiling template");
        let source = self.loader.load(&key)?;
        let template = Arc::new(compile_with(&key, &source, &self.syntax)?);
        self.templates.insert(key, Arc::clone(&template));

        Ok(template)
    }

    fn render(&self, spec: &str, model: &Value) -> Result<String, Error> {
        self.compile(spec)?.render(self, model, None)
    }

    fn helper(&self, name: &str) -> Option<Arc<dyn Helper>> {
        self.helpers.get(name).cloned()
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(MemoryLoader::new())
    }
}

/// Return true if the name is an identifier.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || unicode_ident::is_xid_start(first) => {
            chars.all(unicode_ident::is_xid_continue)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{is_identifier, Engine, Loader, MemoryLoader, TemplateEngine};
    use crate::{log::ErrorKind, Builder, Error, FileLoader};
    use serde_json::{json, Value};
    use std::{
        fs,
        sync::{Arc, Barrier},
        thread,
    };

    #[test]
    fn test_add_helper() {
        let mut engine = TemplateEngine::default();
        engine.add_helper("faux", faux_helper).unwrap();

        assert!(engine.helper("faux").is_some());
        assert!(engine.helper("ghost").is_none());
        assert!(engine.helper("lowercase").is_some());
    }

    #[test]
    fn test_add_helper_duplicate() {
        assert!(TemplateEngine::default()
            .with_helper_must("faux", faux_helper)
            .with_helper("faux", faux_helper)
            .is_err());
    }

    #[test]
    fn test_add_helper_invalid_name() {
        let error = TemplateEngine::default()
            .with_helper("9lives", faux_helper)
            .err()
            .unwrap();

        assert_eq!(error.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("lowercase"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("größe"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("two words"));
        assert!(!is_identifier("non-last"));
    }

    #[test]
    fn test_compile_is_cached() {
        let engine = helper_engine(&[("a.tmpl", "a")]);
        let first = engine.compile("a").unwrap();
        let second = engine.compile("/a.tmpl").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.spec(), "a.tmpl");
        assert!(engine.get_template("a").is_some());
    }

    #[test]
    fn test_compile_missing() {
        let error = TemplateEngine::default().compile("ghost").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Load);
    }

    #[test]
    fn test_compile_error_is_not_cached() {
        let engine = helper_engine(&[("bad.tmpl", "{{#for v in items}}")]);

        assert!(engine.compile("bad").is_err());
        assert!(engine.get_template("bad").is_none());
    }

    #[test]
    fn test_custom_suffix_and_syntax() {
        let syntax = Builder::new().with_delimiters("<%", "%>").build().unwrap();
        let engine = TemplateEngine::new(MemoryLoader::new().with("page.html", "hi <% name %>"))
            .with_suffix(".html")
            .with_syntax(syntax);

        assert_eq!(
            engine.render("page", &json!({"name": "you"})).unwrap(),
            "hi you"
        );
    }

    #[test]
    fn test_render_from_files() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("parts")).unwrap();
        fs::write(root.path().join("page.tmpl"), "[{{#call parts/item}}]").unwrap();
        fs::write(root.path().join("parts/item.tmpl"), "{{#call /leaf}}").unwrap();
        fs::write(root.path().join("leaf.tmpl"), "{{ name }}").unwrap();

        let engine = TemplateEngine::new(FileLoader::new(root.path()));

        assert_eq!(
            engine.render("page", &json!({"name": "leaf"})).unwrap(),
            "[leaf]"
        );
    }

    #[test]
    fn test_concurrent_renders_are_isolated() {
        let engine = helper_engine(&[
            (
                "list.tmpl",
                "{{#for v in items}}{{#use v}}{{ name }}{{/use}}{{#non-last}},{{/non-last}}{{/for}}",
            ),
        ]);
        let models: Vec<(Value, String)> = (0..8)
            .map(|n| {
                let items: Vec<Value> = (0..50).map(|i| json!({"name": format!("{n}-{i}")})).collect();
                let expect = (0..50)
                    .map(|i| format!("{n}-{i}"))
                    .collect::<Vec<_>>()
                    .join(",");
                (json!({ "items": items }), expect)
            })
            .collect();

        thread::scope(|scope| {
            for (model, expect) in &models {
                let engine = &engine;
                scope.spawn(move || {
                    for _ in 0..10 {
                        assert_eq!(&engine.render("list", model).unwrap(), expect);
                    }
                });
            }
        });
    }

    #[test]
    fn test_slow_compile_does_not_block_other_specs() {
        let barrier = Arc::new(Barrier::new(2));
        let engine = TemplateEngine::new(GatedLoader {
            barrier: Arc::clone(&barrier),
        });
        engine.compile("cached").unwrap();

        thread::scope(|scope| {
            let slow = scope.spawn(|| engine.render("slow", &json!({})));

            // The slow template is now loading.
            barrier.wait();
            assert!(engine.compile("cached").is_ok());
            assert_eq!(engine.render("fast", &json!({})).unwrap(), "fast");
            barrier.wait();

            assert_eq!(slow.join().unwrap().unwrap(), "slow");
        });
    }

    /// A Loader that holds `slow.tmpl` until the test lets it go.
    struct GatedLoader {
        barrier: Arc<Barrier>,
    }

    impl Loader for GatedLoader {
        fn load(&self, spec: &str) -> Result<String, Error> {
            if spec == "slow.tmpl" {
                self.barrier.wait();
                self.barrier.wait();
            }

            Ok(spec.trim_end_matches(".tmpl").to_owned())
        }
    }

    /// Return a new TemplateEngine holding the given templates in memory.
    fn helper_engine(templates: &[(&str, &str)]) -> TemplateEngine {
        let mut loader = MemoryLoader::new();
        for (spec, source) in templates {
            loader.insert(*spec, *source);
        }

        TemplateEngine::new(loader)
    }

    /// A Helper used to test TemplateEngine.
    fn faux_helper(_: &Value) -> Result<Value, Error> {
        Ok(json!("faux"))
    }
}
