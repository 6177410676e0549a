use std::fmt::Display;

/// Describes the internal state of a [`Parser`][`super::Parser`].
#[derive(Debug)]
pub struct State {
    /// True until the first fragment that is not blank text is parsed at
    /// the top level.
    pub first: bool,
    /// Number of open container constructs.
    pub depth: usize,
    /// One entry per open "for", true while a case is open directly in it.
    pub loops: Vec<bool>,
    /// Number of open "if" constructs.
    pub branches: usize,
    /// Number of open "override" constructs.
    pub overrides: usize,
    /// True while parsing the body of an "extends".
    pub extending: bool,
    /// True once an "extends" has been seen.
    pub extended: bool,
}

impl State {
    /// Create a new [`State`] for the start of a template.
    #[inline]
    pub fn new() -> Self {
        Self {
            first: true,
            depth: 0,
            loops: vec![],
            branches: 0,
            overrides: 0,
            extending: false,
            extended: false,
        }
    }
}

/// Container constructs, used to describe faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Extends,
    Block,
    For,
    Case,
    Use,
    Override,
    Branch,
}

impl Construct {
    /// Return the name of the closing tag.
    pub fn terminator(&self) -> &'static str {
        match self {
            Construct::Extends => "/extends",
            Construct::Block => "/block",
            Construct::For => "/for",
            Construct::Case => "/first, /last, /non-first or /non-last",
            Construct::Use => "/use",
            Construct::Override => "/override",
            Construct::Branch => "/if",
        }
    }
}

impl Display for Construct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Construct::Extends => write!(f, "extends"),
            Construct::Block => write!(f, "block"),
            Construct::For => write!(f, "for"),
            Construct::Case => write!(f, "case"),
            Construct::Use => write!(f, "use"),
            Construct::Override => write!(f, "override"),
            Construct::Branch => write!(f, "if"),
        }
    }
}
