use std::fmt::Display;

/// The construct that opened a [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Root,
    Block,
    For,
    Case,
    Use,
    Override,
    Branch,
}

impl Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeKind::Root => write!(f, "root"),
            ScopeKind::Block => write!(f, "block"),
            ScopeKind::For => write!(f, "for"),
            ScopeKind::Case => write!(f, "case"),
            ScopeKind::Use => write!(f, "use"),
            ScopeKind::Override => write!(f, "override"),
            ScopeKind::Branch => write!(f, "if"),
        }
    }
}

/// A lexical frame opened while generating the children of a construct.
///
/// Names declared in a scope map to storage slots of the render frame.
/// Loop cursors live in their own table, so no user name can reach them.
#[derive(Debug)]
pub struct Scope {
    /// Unique within one compile.
    pub id: usize,
    pub kind: ScopeKind,
    /// Declared names and their slots, in declaration order.
    locals: Vec<(String, usize)>,
    /// Slot holding the model substituted by a "use".
    pub model: Option<usize>,
    /// Cursor of the loop that opened this scope.
    pub cursor: Option<usize>,
}

impl Scope {
    /// Create a new, empty [`Scope`].
    #[inline]
    pub fn new(id: usize, kind: ScopeKind) -> Self {
        Self {
            id,
            kind,
            locals: vec![],
            model: None,
            cursor: None,
        }
    }

    /// Bind the name to the slot.
    pub fn declare(&mut self, name: &str, slot: usize) {
        self.locals.push((name.to_owned(), slot));
    }

    /// Return the slot of a declared name.
    ///
    /// A name declared twice resolves to the later declaration.
    pub fn local(&self, name: &str) -> Option<usize> {
        self.locals
            .iter()
            .rev()
            .find(|(local, _)| local == name)
            .map(|(_, slot)| *slot)
    }
}

#[cfg(test)]
mod tests {
    use super::{Scope, ScopeKind};

    #[test]
    fn test_later_declaration_wins() {
        let mut scope = Scope::new(0, ScopeKind::For);
        scope.declare("v", 0);
        scope.declare("v", 1);

        assert_eq!(scope.local("v"), Some(1));
        assert_eq!(scope.local("k"), None);
    }
}
