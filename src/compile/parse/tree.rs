use std::fmt::Display;

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Raw text.
    Text(String),
    /// Render a value, optionally passed through a helper.
    Eval(Eval),
    /// Render another template.
    Call(Call),
    /// Render a parent template with this template's overrides.
    Extends(Extends),
    /// A named, overridable region.
    Block(Block),
    /// A loop.
    For(For),
    /// A guard on the position of the enclosing loop.
    Case(Case),
    /// Substitute the ambient model.
    Use(Use),
    /// Replacement content for a block of the parent template.
    Override(Override),
    /// Conditional rendering.
    Branch(Branch),
}

/// Location of a tag within its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// One indexed line.
    pub line: usize,
    /// One indexed column, counted in characters.
    pub column: usize,
    /// Width of the tag, counted in characters.
    pub width: usize,
}

/// Whitespace suppression requested by a construct's delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trim {
    /// Trim the leading whitespace of the body.
    pub start: bool,
    /// Trim the trailing whitespace of the body.
    pub end: bool,
}

impl Trim {
    /// Apply the trim flags to the rendered body.
    pub fn apply<'a>(&self, text: &'a str) -> &'a str {
        let text = if self.start { text.trim_start() } else { text };
        if self.end {
            text.trim_end()
        } else {
            text
        }
    }
}

/// `{{ expr }}` or `{{ helper arg }}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Eval {
    /// A dotted path, or the helper name when `args` is present.
    pub expr: String,
    /// The dotted path passed to the helper.
    pub args: Option<String>,
    /// Spaces inserted after every line break of the output.
    pub indent: usize,
    pub position: Position,
}

/// `{{#call spec with model}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub spec: String,
    pub model: Option<String>,
    /// Spaces inserted after every line break of the output.
    pub indent: usize,
    pub position: Position,
}

/// `{{#extends spec}}`, spanning to the end of the template.
#[derive(Debug, Clone, PartialEq)]
pub struct Extends {
    pub spec: String,
    pub overrides: Vec<Override>,
    pub position: Position,
}

/// `{{#block name}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    /// Spaces inserted after every line break of replacement content.
    pub indent: usize,
    /// Default content, empty for the self-closing form.
    pub children: Vec<Fragment>,
    pub trim: Trim,
}

/// `{{#for value, key in source}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub value: String,
    pub key: Option<String>,
    pub source: String,
    pub children: Vec<Fragment>,
    pub trim: Trim,
    pub position: Position,
}

/// The position guarded by a [`Case`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    First,
    Last,
    NonFirst,
    NonLast,
}

impl CaseKind {
    /// Return the [`CaseKind`] named by a tag.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "first" => Some(CaseKind::First),
            "last" => Some(CaseKind::Last),
            "non-first" => Some(CaseKind::NonFirst),
            "non-last" => Some(CaseKind::NonLast),
            _ => None,
        }
    }

    /// Return true if the guard holds at `index` of a loop over `len` keys.
    pub fn holds(&self, index: usize, len: usize) -> bool {
        match self {
            CaseKind::First => index == 0,
            CaseKind::Last => index + 1 == len,
            CaseKind::NonFirst => index > 0,
            CaseKind::NonLast => index + 1 < len,
        }
    }
}

impl Display for CaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseKind::First => write!(f, "first"),
            CaseKind::Last => write!(f, "last"),
            CaseKind::NonFirst => write!(f, "non-first"),
            CaseKind::NonLast => write!(f, "non-last"),
        }
    }
}

/// `{{#first}}` and the other loop position guards.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub kind: CaseKind,
    pub children: Vec<Fragment>,
    pub trim: Trim,
}

/// `{{#use source}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Use {
    pub source: String,
    pub children: Vec<Fragment>,
    pub trim: Trim,
}

/// `{{#override name}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub name: String,
    pub children: Vec<Fragment>,
    pub trim: Trim,
}

/// `{{#if cond}} ... {{#else}} ... {{/if}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub cond: String,
    pub then_branch: Vec<Fragment>,
    pub else_branch: Vec<Fragment>,
    /// Trim flags of the if side.
    pub then_trim: Trim,
    /// Trim flags of the else side.
    pub else_trim: Trim,
}

#[cfg(test)]
mod tests {
    use super::{CaseKind, Trim};

    #[test]
    fn test_case_holds() {
        let len = 3;
        let fired = |kind: CaseKind| (0..len).filter(|i| kind.holds(*i, len)).collect::<Vec<_>>();

        assert_eq!(fired(CaseKind::First), vec![0]);
        assert_eq!(fired(CaseKind::Last), vec![2]);
        assert_eq!(fired(CaseKind::NonFirst), vec![1, 2]);
        assert_eq!(fired(CaseKind::NonLast), vec![0, 1]);
    }

    #[test]
    fn test_trim_apply() {
        let both = Trim {
            start: true,
            end: true,
        };

        assert_eq!(both.apply("\n  x \n"), "x");
        assert_eq!(Trim::default().apply("\n  x \n"), "\n  x \n");
    }
}
