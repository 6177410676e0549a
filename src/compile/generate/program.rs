//! The executable form of a template.
//!
//! Every dotted path is resolved while generating, so rendering never
//! searches for names. A path starts from one of three roots: the
//! ambient model passed to the render, a storage slot of the render
//! frame, or a literal.
use crate::compile::tree::{CaseKind, Position, Trim};
use serde_json::Value;

/// A generated template, ready to be rendered any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top level nodes.
    pub nodes: Vec<Node>,
    /// Set when the template extends another one.
    pub parent: Option<Parent>,
    /// Number of value slots a render frame must provide.
    pub slots: usize,
    /// Number of loop cursors a render frame must provide.
    pub cursors: usize,
}

/// The template named by an "extends", with the overrides to pass to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parent {
    /// Resolved spec of the parent template.
    pub spec: String,
    /// Override bodies, in document order.
    pub overrides: Vec<(String, Body)>,
    pub position: Position,
}

/// Where a resolved path starts.
#[derive(Debug, Clone, PartialEq)]
pub enum Root {
    /// The model passed to the render.
    Model,
    /// A storage slot of the render frame.
    Slot(usize),
    /// A constant.
    Literal(Value),
}

/// A resolved dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct Access {
    pub root: Root,
    /// Remaining segments, walked from the root.
    pub path: Vec<String>,
    /// The path as written in the template.
    pub text: String,
}

/// Nodes rendered into a fresh buffer, then trimmed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub nodes: Vec<Node>,
    pub trim: Trim,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Eval {
        value: Access,
        helper: Option<String>,
        indent: usize,
        position: Position,
    },
    Call {
        spec: String,
        model: Access,
        indent: usize,
        position: Position,
    },
    Block {
        name: String,
        indent: usize,
        body: Body,
    },
    For {
        source: Access,
        value: usize,
        key: usize,
        cursor: usize,
        body: Body,
        position: Position,
    },
    Case {
        kind: CaseKind,
        cursor: usize,
        body: Body,
    },
    Use {
        source: Access,
        slot: usize,
        body: Body,
    },
    Branch {
        cond: Access,
        then_body: Body,
        else_body: Body,
    },
}
