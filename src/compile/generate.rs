//! Vellum generator.
//!
//! Walks a parsed tree and produces a [`Program`]. Names are resolved
//! against a stack of [`Scope`] instances while walking, so the program
//! holds typed slot indices instead of names.
pub mod program;
pub mod scope;

use crate::{
    compile::tree::{
        Block, Branch, Call, Case, Eval, Extends, For, Fragment, Override, Trim, Use,
    },
    log::{Error, ErrorKind, ILLEGAL_POSITION},
};
use program::{Access, Body, Node, Parent, Program, Root};
use scope::{Scope, ScopeKind};
use serde_json::Value;

pub struct Generator<'a> {
    /// Spec of the template being generated.
    spec: &'a str,
    /// Open scopes, innermost last.
    scopes: Vec<Scope>,
    /// Next scope id, scoped to this compile.
    next_id: usize,
    /// Number of slots allocated so far.
    slots: usize,
    /// Number of loop cursors allocated so far.
    cursors: usize,
    /// Set by an "extends".
    parent: Option<Parent>,
}

impl<'a> Generator<'a> {
    /// Create a new [`Generator`] for the template with the given spec.
    #[inline]
    pub fn new(spec: &'a str) -> Self {
        Self {
            spec,
            scopes: vec![],
            next_id: 0,
            slots: 0,
            cursors: 0,
            parent: None,
        }
    }

    /// Generate a [`Program`] from the tree.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the tree holds a fragment in a position
    /// the parser would have rejected.
    pub fn generate(mut self, tree: Vec<Fragment>) -> Result<Program, Error> {
        self.open(ScopeKind::Root);
        let nodes = self.generate_all(tree)?;
        self.close();

        Ok(Program {
            nodes,
            parent: self.parent,
            slots: self.slots,
            cursors: self.cursors,
        })
    }

    fn generate_all(&mut self, fragments: Vec<Fragment>) -> Result<Vec<Node>, Error> {
        let mut nodes = Vec::with_capacity(fragments.len());

        for fragment in fragments {
            let node = match fragment {
                Fragment::Text(text) => Node::Text(text),
                Fragment::Eval(eval) => self.generate_eval(eval),
                Fragment::Call(call) => self.generate_call(call),
                Fragment::Extends(extends) => {
                    self.generate_extends(extends)?;
                    continue;
                }
                Fragment::Block(block) => self.generate_block(block)?,
                Fragment::For(f) => self.generate_for(f)?,
                Fragment::Case(case) => self.generate_case(case)?,
                Fragment::Use(u) => self.generate_use(u)?,
                Fragment::Branch(branch) => self.generate_branch(branch)?,
                Fragment::Override(o) => {
                    return Err(Error::build(ErrorKind::Structural)
                        .with_reason(ILLEGAL_POSITION)
                        .with_name(self.spec)
                        .with_help(format!(
                            "override `{}` is only legal inside `extends`",
                            o.name
                        )))
                }
            };
            nodes.push(node);
        }

        Ok(nodes)
    }

    fn generate_eval(&mut self, eval: Eval) -> Node {
        // With an argument, the expression names a helper.
        let (value, helper) = match eval.args {
            Some(args) => (self.resolve(&args), Some(eval.expr)),
            None => (self.resolve(&eval.expr), None),
        };

        Node::Eval {
            value,
            helper,
            indent: eval.indent,
            position: eval.position,
        }
    }

    fn generate_call(&mut self, call: Call) -> Node {
        // Without a model, the callee sees the top-level model even inside a use.
        let model = match call.model {
            Some(model) => self.resolve(&model),
            None => Access {
                root: Root::Model,
                path: vec![],
                text: String::new(),
            },
        };

        Node::Call {
            spec: resolve_target(self.spec, &call.spec),
            model,
            indent: call.indent,
            position: call.position,
        }
    }

    fn generate_extends(&mut self, extends: Extends) -> Result<(), Error> {
        let mut overrides = Vec::with_capacity(extends.overrides.len());
        for Override {
            name,
            children,
            trim,
        } in extends.overrides
        {
            let body = self.generate_body(ScopeKind::Override, children, trim, |_| {})?;
            overrides.push((name, body));
        }

        self.parent = Some(Parent {
            spec: resolve_target(self.spec, &extends.spec),
            overrides,
            position: extends.position,
        });

        Ok(())
    }

    fn generate_block(&mut self, block: Block) -> Result<Node, Error> {
        let body = self.generate_body(ScopeKind::Block, block.children, block.trim, |_| {})?;

        Ok(Node::Block {
            name: block.name,
            indent: block.indent,
            body,
        })
    }

    fn generate_for(&mut self, f: For) -> Result<Node, Error> {
        let source = self.resolve(&f.source);
        let value = self.slot();
        let key = self.slot();
        let cursor = self.cursor();

        let body = self.generate_body(ScopeKind::For, f.children, f.trim, |scope| {
            scope.declare(&f.value, value);
            if let Some(name) = &f.key {
                scope.declare(name, key);
            }
            scope.cursor = Some(cursor);
        })?;

        Ok(Node::For {
            source,
            value,
            key,
            cursor,
            body,
            position: f.position,
        })
    }

    fn generate_case(&mut self, case: Case) -> Result<Node, Error> {
        let cursor = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.cursor)
            .ok_or_else(|| {
                Error::build(ErrorKind::Structural)
                    .with_reason(ILLEGAL_POSITION)
                    .with_name(self.spec)
                    .with_help(format!("`{}` is only legal inside a `for`", case.kind))
            })?;
        let body = self.generate_body(ScopeKind::Case, case.children, case.trim, |_| {})?;

        Ok(Node::Case {
            kind: case.kind,
            cursor,
            body,
        })
    }

    fn generate_use(&mut self, u: Use) -> Result<Node, Error> {
        let source = self.resolve(&u.source);
        let slot = self.slot();
        let body = self.generate_body(ScopeKind::Use, u.children, u.trim, |scope| {
            scope.model = Some(slot);
        })?;

        Ok(Node::Use { source, slot, body })
    }

    fn generate_branch(&mut self, branch: Branch) -> Result<Node, Error> {
        let cond = self.resolve(&branch.cond);
        let then_body = self.generate_body(
            ScopeKind::Branch,
            branch.then_branch,
            branch.then_trim,
            |_| {},
        )?;
        let else_body = self.generate_body(
            ScopeKind::Branch,
            branch.else_branch,
            branch.else_trim,
            |_| {},
        )?;

        Ok(Node::Branch {
            cond,
            then_body,
            else_body,
        })
    }

    /// Generate children inside a new scope, prepared by `setup`.
    fn generate_body<F>(
        &mut self,
        kind: ScopeKind,
        children: Vec<Fragment>,
        trim: Trim,
        setup: F,
    ) -> Result<Body, Error>
    where
        F: FnOnce(&mut Scope),
    {
        let scope = self.open(kind);
        setup(scope);
        let nodes = self.generate_all(children);
        self.close();

        Ok(Body {
            nodes: nodes?,
            trim,
        })
    }

    /// Resolve a dotted path.
    ///
    /// The first segment is looked up as a local, innermost scope first.
    /// Failing that, the lone segments `true` and `false` are literals, and
    /// anything else is read from the nearest substituted model.
    fn resolve(&self, text: &str) -> Access {
        let mut segments = text
            .split('.')
            .filter(|s| !s.is_empty())
            .map(String::from);
        let head = segments.next().unwrap_or_default();
        let rest: Vec<String> = segments.collect();

        for scope in self.scopes.iter().rev() {
            if let Some(slot) = scope.local(&head) {
                return Access {
                    root: Root::Slot(slot),
                    path: rest,
                    text: text.to_owned(),
                };
            }
        }

        if rest.is_empty() {
            let literal = match head.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            };
            if let Some(value) = literal {
                return Access {
                    root: Root::Literal(value),
                    path: vec![],
                    text: text.to_owned(),
                };
            }
        }

        let mut path = vec![head];
        path.extend(rest);
        Access {
            root: self.model_root(),
            path,
            text: text.to_owned(),
        }
    }

    /// Return the nearest use model, or the top-level model.
    fn model_root(&self) -> Root {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.model)
            .map_or(Root::Model, Root::Slot)
    }

    /// Push a new [`Scope`], returning it so it can be prepared.
    fn open(&mut self, kind: ScopeKind) -> &mut Scope {
        let id = self.next_id;
        self.next_id += 1;
        tracing::trace!(template = self.spec, scope = id, %kind, "open scope");

        self.scopes.push(Scope::new(id, kind));
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn close(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            tracing::trace!(
                template = self.spec,
                scope = scope.id,
                kind = %scope.kind,
                "close scope"
            );
        }
    }

    /// Allocate a value slot.
    fn slot(&mut self) -> usize {
        self.slots += 1;
        self.slots - 1
    }

    /// Allocate a loop cursor.
    fn cursor(&mut self) -> usize {
        self.cursors += 1;
        self.cursors - 1
    }
}

/// Resolve the spec named by a "call" or "extends" against the spec of the
/// template that names it.
///
/// A leading `/` makes the target relative to the loader root, otherwise it
/// is relative to the directory of `current`. The segments `.` and `..` are
/// normalized, and `..` never climbs above the root.
pub fn resolve_target(current: &str, target: &str) -> String {
    let (mut parts, target): (Vec<&str>, &str) = match target.strip_prefix('/') {
        Some(rooted) => (vec![], rooted),
        None => {
            let mut parts: Vec<&str> = current.split('/').filter(|s| !s.is_empty()).collect();
            parts.pop();
            (parts, target)
        }
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(segment),
        }
    }

    parts.join("/")
}
