mod pipe;
mod value;

pub(crate) use value::describe;

use crate::{
    compile::{
        program::{Access, Body, Node, Parent, Root},
        tree::Position,
        Template,
    },
    engine::{Engine, Overrides, TemplateEngine},
    log::{error_missing_helper, error_write, Error, ErrorKind, NOT_ITERABLE, TOO_DEEP},
};
use pipe::Pipe;
use serde_json::Value;
use std::fmt::Write;
use value::{entries, is_truthy, navigate};

/// Render a [`Template`].
///
/// Provides a shortcut to quickly render a `Template` when no advanced features
/// are needed. The `Template` is rendered with a default
/// [`TemplateEngine`], which knows the built-in helpers but cannot load
/// other templates.
///
/// # Examples
///
/// ```
/// use vellum::{compile, helper::serde::json, render};
///
/// let template = compile("page", "hello, {{ uppercase name }}!");
/// assert!(template.is_ok());
///
/// let output = render(&template.unwrap(), &json!({"name": "taylor"}));
/// assert_eq!(output.unwrap(), "hello, TAYLOR!");
/// ```
pub fn render(template: &Template, model: &Value) -> Result<String, Error> {
    template.render(&TemplateEngine::default(), model, None)
}

/// Deepest chain of calls and extends that a render may follow.
const MAX_DEPTH: usize = 64;

/// Position of a loop.
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    index: usize,
    len: usize,
}

/// Executes the program of one [`Template`] against one model.
///
/// All loop and use bindings live in the frame of a single `Renderer`, so
/// concurrent renders never observe each other.
pub struct Renderer<'a> {
    /// Engine used for calls, extends and helpers.
    engine: &'a dyn Engine,
    /// The template being rendered.
    template: &'a Template,
    /// The ambient model.
    model: &'a Value,
    /// Replacement content for blocks, from an extending template.
    overrides: Option<&'a Overrides>,
    /// Values bound by loops and uses.
    slots: Vec<Value>,
    /// Loop positions.
    cursors: Vec<Cursor>,
    /// Number of calls and extends that led to this render.
    depth: usize,
}

impl<'a> Renderer<'a> {
    /// Create a new Renderer.
    pub fn new(
        engine: &'a dyn Engine,
        template: &'a Template,
        model: &'a Value,
        overrides: Option<&'a Overrides>,
    ) -> Self {
        let program = template.program();

        Self {
            engine,
            template,
            model,
            overrides,
            slots: vec![Value::Null; program.slots],
            cursors: vec![Cursor::default(); program.cursors],
            depth: 0,
        }
    }

    /// Render the [`Template`] stored inside the [`Renderer`].
    ///
    /// When the template extends another one, the output is entirely the
    /// render of that parent.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if a helper is missing or fails, a loop source is
    /// not iterable, or a called or extended template cannot be rendered.
    pub fn render(mut self) -> Result<String, Error> {
        let template = self.template;
        let program = template.program();
        tracing::trace!(template = template.spec(), "render");

        if let Some(parent) = &program.parent {
            return self.render_parent(parent);
        }

        let mut buffer = String::with_capacity(template.source().len());
        self.render_nodes(&program.nodes, &mut Pipe::new(&mut buffer))?;

        Ok(buffer)
    }

    /// Render the overrides, then render the parent template with them.
    ///
    /// Overrides start from the ones passed into this render. Every local
    /// override is appended to the entry of its name, in document order.
    fn render_parent(&mut self, parent: &'a Parent) -> Result<String, Error> {
        let mut merged = self.overrides.cloned().unwrap_or_default();
        for (name, body) in &parent.overrides {
            let mut buffer = String::new();
            self.render_body(body, &mut Pipe::new(&mut buffer))?;
            merged.entry(name.clone()).or_default().push_str(&buffer);
        }

        let target = self
            .engine
            .compile(&parent.spec)
            .map_err(|e| self.locate(e, &parent.position))?;

        self.render_nested(&target, self.model, Some(&merged))
            .map_err(|e| self.locate(e, &parent.position))
    }

    /// Render another template one level deeper than this one.
    fn render_nested(
        &self,
        template: &Template,
        model: &Value,
        overrides: Option<&Overrides>,
    ) -> Result<String, Error> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::build(ErrorKind::Render)
                .with_reason(TOO_DEEP)
                .with_help(format!(
                    "`{}` is nested more than {MAX_DEPTH} templates deep, \
                    does a template call or extend itself?",
                    template.spec()
                )));
        }

        let mut renderer = Renderer::new(self.engine, template, model, overrides);
        renderer.depth = self.depth + 1;

        renderer.render()
    }

    fn render_nodes(&mut self, nodes: &'a [Node], pipe: &mut Pipe) -> Result<(), Error> {
        for node in nodes {
            match node {
                Node::Text(text) => pipe.write_str(text).map_err(|_| error_write())?,
                Node::Eval {
                    value,
                    helper,
                    indent,
                    position,
                } => {
                    let mut value = self.lookup(value);
                    if let Some(name) = helper {
                        value = self
                            .apply_helper(name, &value)
                            .map_err(|e| self.locate(e, position))?;
                    }

                    let mut text = String::new();
                    Pipe::new(&mut text)
                        .write_value(&value)
                        .map_err(|_| error_write())?;
                    pipe.write_reflow(&text, *indent)
                        .map_err(|_| error_write())?;
                }
                Node::Call {
                    spec,
                    model,
                    indent,
                    position,
                } => {
                    let model = self.lookup(model);
                    let text = self
                        .engine
                        .compile(spec)
                        .and_then(|target| self.render_nested(&target, &model, None))
                        .map_err(|e| self.locate(e, position))?;
                    pipe.write_reflow(&text, *indent)
                        .map_err(|_| error_write())?;
                }
                Node::Block { name, indent, body } => {
                    match self.overrides.and_then(|o| o.get(name)) {
                        Some(text) => pipe
                            .write_reflow(text, *indent)
                            .map_err(|_| error_write())?,
                        None => self.render_body(body, pipe)?,
                    }
                }
                Node::For {
                    source,
                    value,
                    key,
                    cursor,
                    body,
                    position,
                } => {
                    let found = self.lookup(source);
                    let kind = describe(&found);
                    // Keys are fixed before the first iteration.
                    let items = entries(found).ok_or_else(|| {
                        self.locate(
                            Error::build(ErrorKind::Render)
                                .with_reason(NOT_ITERABLE)
                                .with_help(format!(
                                    "`{}` is {kind}, expected an array or an object",
                                    source.text
                                )),
                            position,
                        )
                    })?;

                    let len = items.len();
                    for (index, (k, v)) in items.into_iter().enumerate() {
                        self.slots[*value] = v;
                        self.slots[*key] = k;
                        self.cursors[*cursor] = Cursor { index, len };
                        self.render_body(body, pipe)?;
                    }
                }
                Node::Case { kind, cursor, body } => {
                    let Cursor { index, len } = self.cursors[*cursor];
                    if kind.holds(index, len) {
                        self.render_body(body, pipe)?;
                    }
                }
                Node::Use { source, slot, body } => {
                    self.slots[*slot] = self.lookup(source);
                    self.render_body(body, pipe)?;
                }
                Node::Branch {
                    cond,
                    then_body,
                    else_body,
                } => {
                    if is_truthy(&self.lookup(cond)) {
                        self.render_body(then_body, pipe)?;
                    } else {
                        self.render_body(else_body, pipe)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Render the body into a fresh buffer, and write it trimmed.
    fn render_body(&mut self, body: &'a Body, pipe: &mut Pipe) -> Result<(), Error> {
        if body.nodes.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        self.render_nodes(&body.nodes, &mut Pipe::new(&mut buffer))?;

        pipe.write_str(body.trim.apply(&buffer))
            .map_err(|_| error_write())
    }

    /// Return the value at the end of the resolved path.
    fn lookup(&self, access: &Access) -> Value {
        let root = match &access.root {
            Root::Model => self.model,
            Root::Slot(slot) => &self.slots[*slot],
            Root::Literal(value) => value,
        };

        navigate(root, &access.path).clone()
    }

    fn apply_helper(&self, name: &str, value: &Value) -> Result<Value, Error> {
        let helper = self
            .engine
            .helper(name)
            .ok_or_else(|| error_missing_helper(name))?;

        helper.apply(value)
    }

    /// Point the error at the tag, unless it already belongs to a template.
    fn locate(&self, error: Error, position: &Position) -> Error {
        if error.get_name().is_some() {
            return error;
        }

        let source = self.template.source();
        let snippet: String = source
            .split('\n')
            .nth(position.line.saturating_sub(1))
            .unwrap_or_default()
            .chars()
            .skip(position.column.saturating_sub(1))
            .take(position.width)
            .collect();

        error
            .with_pointer(source, position.line, position.column, &snippet)
            .with_name(self.template.spec())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        compile, engine::Engine, helper::serde::json, log::ErrorKind, render, Error,
        MemoryLoader, TemplateEngine,
    };
    use serde_json::Value;

    #[test]
    fn test_render_plain_text() {
        helper_render_auto("hello, world", json!({}), "hello, world");
    }

    #[test]
    fn test_render_eval() {
        helper_render_auto(
            "{{ person.name }} is {{ person.age }}{{ ghost }}",
            json!({"person": {"name": "taylor", "age": 30}}),
            "taylor is 30",
        );
    }

    #[test]
    fn test_render_for() {
        let source = "{{#for v in items}}{{ v }}{{/for}}";

        helper_render_auto(source, json!({"items": ["a", "b", "c"]}), "abc");
        helper_render_auto(source, json!({"items": []}), "");
    }

    #[test]
    fn test_render_for_keys() {
        helper_render_auto(
            "{{#for v, k in items}}{{ k }}={{ v }};{{/for}}",
            json!({"items": ["a", "b"]}),
            "0=a;1=b;",
        );
        helper_render_auto(
            "{{#for v, k in items}}{{#if k}}[{{ uppercase k }}]{{/if}}{{/for}}",
            json!({"items": ["a", "b"]}),
            "[0][1]",
        );
        helper_render_auto(
            "{{#for v, k in items}}{{ k }}={{ v }};{{/for}}",
            json!({"items": {"x": 1, "y": 2}}),
            "x=1;y=2;",
        );
    }

    #[test]
    fn test_render_cases() {
        let source = "{{#for v in items}}{{#first}}X{{/first}}{{ v }}{{#last}}Y{{/last}}{{/for}}";

        helper_render_auto(source, json!({"items": [1, 2, 3]}), "X123Y");
        helper_render_auto(source, json!({"items": [1]}), "X1Y");
        helper_render_auto(source, json!({"items": []}), "");
    }

    #[test]
    fn test_render_separators() {
        helper_render_auto(
            "{{#for v in items}}{{#non-first}}, {{/non-first}}{{ v }}{{#non-last}};{{/non-last}}{{/for}}",
            json!({"items": ["a", "b", "c"]}),
            "a;, b;, c",
        );
    }

    #[test]
    fn test_render_nested_loops() {
        helper_render_auto(
            "{{#for row in rows}}{{#for cell in row}}{{ cell }}{{#non-last}} {{/non-last}}{{/for}}{{#non-last}}|{{/non-last}}{{/for}}",
            json!({"rows": [[1, 2], [3]]}),
            "1 2|3",
        );
    }

    #[test]
    fn test_render_loop_variable_shadows_model() {
        helper_render_auto(
            "{{#for name in names}}{{ name }}{{/for}}/{{ name }}",
            json!({"names": ["a", "b"], "name": "outer"}),
            "ab/outer",
        );
    }

    #[test]
    fn test_render_use() {
        helper_render_auto(
            "{{#use person}}{{ name }}{{#use pet}}+{{ name }}{{/use}}{{/use}}",
            json!({"person": {"name": "taylor", "pet": {"name": "rex"}}}),
            "taylor+rex",
        );
    }

    #[test]
    fn test_render_loop_variable_inside_use() {
        helper_render_auto(
            "{{#for p in people}}{{#use p.pet}}{{ p.name }}:{{ name }} {{/use}}{{/for}}",
            json!({"people": [{"name": "a", "pet": {"name": "x"}}]}),
            "a:x ",
        );
    }

    #[test]
    fn test_render_branch() {
        let source = "{{#if show}}yes{{#else}}no{{/if}}";

        helper_render_auto(source, json!({"show": true}), "yes");
        helper_render_auto(source, json!({"show": 0}), "no");
        helper_render_auto(source, json!({}), "no");
        helper_render_auto("{{#if show}}yes{{/if}}", json!({}), "");
    }

    #[test]
    fn test_render_branch_empty_collections() {
        helper_render_auto(
            "{{#if xs}}T{{#else}}F{{/if}}|{{#if o}}T{{#else}}F{{/if}}",
            json!({"xs": [], "o": {}}),
            "T|T",
        );
    }

    #[test]
    fn test_render_branch_trim() {
        helper_render_auto("{{#if true -}}\n  X{{/if}}", json!({}), "X");
        helper_render_auto("{{#if true}}X  \n{{/-if}}", json!({}), "X");
        helper_render_auto(
            "{{#if false}}a{{#else -}}\n  b\n{{/-if}}",
            json!({}),
            "b",
        );
    }

    #[test]
    fn test_render_loop_trim() {
        helper_render_auto(
            "{{#for v in items -}}\n  {{ v }}\n{{/-for}}",
            json!({"items": [1, 2]}),
            "12",
        );
    }

    #[test]
    fn test_render_helper() {
        helper_render_auto("{{ lowercase name }}", json!({"name": "AB"}), "ab");
    }

    #[test]
    fn test_render_missing_helper() {
        let error = helper_render_err("a\n  {{ shout name }}", json!({"name": "x"}));

        assert_eq!(error.kind(), ErrorKind::Helper);
        assert_eq!(error.get_name(), Some("t"));
        assert!(format!("{error:#}").contains("t:2:3"));
    }

    #[test]
    fn test_render_helper_failure() {
        let error = helper_render_err("{{ uppercase n }}", json!({"n": 1}));

        assert_eq!(error.kind(), ErrorKind::Helper);
    }

    #[test]
    fn test_render_not_iterable() {
        for source in [json!(null), json!(1), json!("text"), json!(true)] {
            let error = helper_render_err(
                "{{#for v in items}}{{ v }}{{/for}}",
                json!({ "items": source }),
            );

            assert_eq!(error.kind(), ErrorKind::Render);
        }
    }

    #[test]
    fn test_render_reflow_eval() {
        helper_render_auto(
            "<p>\n  {{ text }}\n</p>",
            json!({"text": "one\ntwo"}),
            "<p>\n  one\n  two\n</p>",
        );
        helper_render_auto(
            "<p>\n  {{ text -}}\n</p>",
            json!({"text": "one\ntwo"}),
            "<p>\n  one\ntwo\n</p>",
        );
    }

    #[test]
    fn test_render_empty_marker() {
        helper_render_auto("a<!>b", json!({}), "ab");
    }

    #[test]
    fn test_render_stringify() {
        helper_render_auto(
            "{{ list }} {{ map }} {{ nothing }}|",
            json!({"list": [1, "a"], "map": {"k": true}, "nothing": null}),
            "[1, a] {k: true} |",
        );
    }

    #[test]
    fn test_call() {
        let engine = helper_engine(&[
            ("page.tmpl", "<ul>\n  {{#call item with person}}\n</ul>"),
            ("item.tmpl", "<li>{{ name }}</li>\n<li>{{ age }}</li>"),
        ]);

        assert_eq!(
            engine
                .render("page", &json!({"person": {"name": "a", "age": 1}}))
                .unwrap(),
            "<ul>\n  <li>a</li>\n  <li>1</li>\n</ul>"
        );
    }

    #[test]
    fn test_call_defaults_to_top_level_model() {
        let engine = helper_engine(&[
            ("page.tmpl", "{{#use person}}{{#call name}}{{/use}}"),
            ("name.tmpl", "{{ name }}"),
        ]);

        assert_eq!(
            engine
                .render("page", &json!({"person": {"name": "a"}, "name": "outer"}))
                .unwrap(),
            "outer"
        );
    }

    #[test]
    fn test_call_missing_template() {
        let engine = helper_engine(&[("page.tmpl", "{{#call ghost}}")]);
        let error = engine.render("page", &json!({})).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Load);
        assert_eq!(error.get_name(), Some("page.tmpl"));
    }

    #[test]
    fn test_call_error_keeps_origin() {
        let engine = helper_engine(&[
            ("page.tmpl", "{{#call item}}"),
            ("item.tmpl", "{{ shout name }}"),
        ]);
        let error = engine.render("page", &json!({})).unwrap_err();

        assert_eq!(error.get_name(), Some("item.tmpl"));
    }

    #[test]
    fn test_extends_override() {
        let engine = helper_engine(&[
            (
                "base.tmpl",
                "<title>{{#block \"title\"}}Default{{/block}}</title>{{#block footer}}(c){{/block}}",
            ),
            (
                "child.tmpl",
                "{{#extends \"base\"}}{{#override \"title\"}}Hi{{/override}}{{/extends}}",
            ),
        ]);

        assert_eq!(
            engine.render("child", &json!({})).unwrap(),
            "<title>Hi</title>(c)"
        );
        assert_eq!(
            engine.render("base", &json!({})).unwrap(),
            "<title>Default</title>(c)"
        );
    }

    #[test]
    fn test_extends_discards_own_output() {
        let engine = helper_engine(&[
            ("base.tmpl", "[{{#block a/}}]"),
            (
                "child.tmpl",
                "\n{{#extends base}}\nignored\n{{#override a}}x{{/override}}\n{{/extends}}\nafter",
            ),
        ]);

        assert_eq!(engine.render("child", &json!({})).unwrap(), "[x]");
    }

    #[test]
    fn test_extends_overrides_concatenate() {
        let engine = helper_engine(&[
            ("base.tmpl", "{{#block a/}}"),
            (
                "child.tmpl",
                "{{#extends base}}{{#override a}}1{{/override}}{{#override a}}2{{/override}}",
            ),
        ]);

        assert_eq!(engine.render("child", &json!({})).unwrap(), "12");
    }

    #[test]
    fn test_call_cycle() {
        let engine = helper_engine(&[
            ("a.tmpl", "{{#call b}}"),
            ("b.tmpl", "{{#call a}}"),
            ("self.tmpl", "{{#extends self}}"),
        ]);

        for spec in ["a", "self"] {
            let error = engine.render(spec, &json!({})).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Render);
        }
    }

    #[test]
    fn test_extends_chain_appends_overrides() {
        let engine = helper_engine(&[
            ("base.tmpl", "{{#block a}}base-a{{/block}} {{#block b}}base-b{{/block}}"),
            (
                "middle.tmpl",
                "{{#extends base}}{{#override a}}middle-a{{/override}}{{#override b}}middle-b{{/override}}",
            ),
            ("leaf.tmpl", "{{#extends middle}}{{#override a}}leaf-a{{/override}}"),
        ]);

        assert_eq!(
            engine.render("leaf", &json!({})).unwrap(),
            "leaf-amiddle-a middle-b"
        );
    }

    #[test]
    fn test_extends_override_uses_model() {
        let engine = helper_engine(&[
            ("layout/base.tmpl", "<h1>{{#block title}}{{/block}}</h1>"),
            (
                "pages/home.tmpl",
                "{{#extends ../layout/base}}{{#override title}}{{ uppercase name }}{{/override}}",
            ),
        ]);

        assert_eq!(
            engine.render("pages/home", &json!({"name": "home"})).unwrap(),
            "<h1>HOME</h1>"
        );
    }

    #[test]
    fn test_block_override_reflow() {
        let engine = helper_engine(&[
            ("base.tmpl", "<div>\n  {{#block body/}}\n</div>"),
            (
                "child.tmpl",
                "{{#extends base}}{{#override body -}}\n<p>a</p>\n<p>b</p>\n{{/-override}}",
            ),
        ]);

        assert_eq!(
            engine.render("child", &json!({})).unwrap(),
            "<div>\n  <p>a</p>\n  <p>b</p>\n</div>"
        );
    }

    #[test]
    fn test_block_default_is_trimmed() {
        helper_render_auto(
            "[{{#block a -}}\n  text\n{{/-block}}]",
            json!({}),
            "[text]",
        );
    }

    #[test]
    fn test_rerender_keeps_no_state() {
        let template = compile("t", "{{#for v in items}}{{ v }}{{/for}}").unwrap();

        assert_eq!(render(&template, &json!({"items": [1, 2]})).unwrap(), "12");
        assert_eq!(render(&template, &json!({"items": [3]})).unwrap(), "3");
    }

    /// Compile the source and assert that rendering it against the model
    /// produces `expect`.
    fn helper_render_auto(source: &str, model: Value, expect: &str) {
        let template = compile("t", source).unwrap();
        let result = render(&template, &model).unwrap();

        assert_eq!(result, expect, "rendering {source:?}");
    }

    /// Compile the source and return the error from rendering it.
    fn helper_render_err(source: &str, model: Value) -> Error {
        let template = compile("t", source).unwrap();

        render(&template, &model).unwrap_err()
    }

    /// Return a new TemplateEngine holding the given templates in memory.
    fn helper_engine(templates: &[(&str, &str)]) -> TemplateEngine {
        let mut loader = MemoryLoader::new();
        for (spec, source) in templates {
            loader.insert(*spec, *source);
        }

        TemplateEngine::new(loader)
    }
}
