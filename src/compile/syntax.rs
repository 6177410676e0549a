//! The syntax registry.
//!
//! A [`Syntax`] holds the delimiters used to find tags within template
//! source, and the ordered table of patterns used to classify each tag.
//! The table is consulted by the tokenizer to stamp a [`TokenKind`] on every
//! tag, and by the parser to pull the parts of a tag back out.
use crate::{
    compile::lex::token::TokenKind,
    log::{Error, ErrorKind, INVALID_SYNTAX_CONFIG},
};
use regex::{Captures, Regex};

/// Dotted identifier path, such as `person.name`.
const PATH: &str = r"[\w.]+";
/// Template spec, such as `layouts/base` or `../shared/nav.tmpl`.
const SPEC: &str = r"[\w./-]+";
/// Block or override name.
const NAME: &str = r"\w+";
/// Loop position guards.
const CASE: &str = r"first|last|non-first|non-last";

/// Provides methods to build a [`Syntax`].
///
/// # Examples
///
/// ```
/// use vellum::Builder;
///
/// let syntax = Builder::new()
///     .with_delimiters("<%", "%>")
///     .with_whitespace('~')
///     .with_empty_marker("<empty>")
///     .build();
///
/// assert!(syntax.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    delimiters: (String, String),
    whitespace: char,
    empty: String,
}

impl Builder {
    /// Create a new [`Builder`].
    ///
    /// The `Builder` has default markers:
    ///
    /// ```text
    /// Tags: {{ name }} / {{#for ...}} / {{/for}}
    /// Whitespace: {{#for ... -}} / {{/-for}}
    /// Empty marker: <!>
    /// ```
    ///
    /// To proceed with these defaults, you may immediately call `build` to
    /// receive the [`Syntax`] instance.
    #[inline]
    pub fn new() -> Self {
        Self {
            delimiters: ("{{".into(), "}}".into()),
            whitespace: '-',
            empty: "<!>".into(),
        }
    }

    /// Set the tag delimiters.
    #[inline]
    pub fn set_delimiters(&mut self, begin: &str, end: &str) {
        self.delimiters = (begin.into(), end.into());
    }

    /// Set the tag delimiters.
    ///
    /// Returns the [`Builder`], so additional methods may be chained.
    #[inline]
    pub fn with_delimiters(mut self, begin: &str, end: &str) -> Self {
        self.set_delimiters(begin, end);

        self
    }

    /// Set the whitespace trim character.
    #[inline]
    pub fn set_whitespace(&mut self, character: char) {
        self.whitespace = character;
    }

    /// Set the whitespace trim character.
    ///
    /// Returns the [`Builder`], so additional methods may be chained.
    #[inline]
    pub fn with_whitespace(mut self, character: char) -> Self {
        self.set_whitespace(character);

        self
    }

    /// Set the empty marker, a literal that is deleted from all text.
    ///
    /// An empty string disables the marker.
    #[inline]
    pub fn set_empty_marker(&mut self, marker: &str) {
        self.empty = marker.into();
    }

    /// Set the empty marker.
    ///
    /// Returns the [`Builder`], so additional methods may be chained.
    #[inline]
    pub fn with_empty_marker(mut self, marker: &str) -> Self {
        self.set_empty_marker(marker);

        self
    }

    /// Return a [`Syntax`] from the markers in this [`Builder`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when a delimiter is empty or the whitespace
    /// character is itself whitespace.
    pub fn build(self) -> Result<Syntax, Error> {
        let (begin, end) = &self.delimiters;
        if begin.is_empty() || end.is_empty() {
            return Err(Error::build(ErrorKind::Config)
                .with_reason(INVALID_SYNTAX_CONFIG)
                .with_help("tag delimiters must not be empty"));
        }
        if self.whitespace.is_whitespace() {
            return Err(Error::build(ErrorKind::Config)
                .with_reason(INVALID_SYNTAX_CONFIG)
                .with_help("the whitespace trim character must not be whitespace"));
        }

        let registry = Registry::new(begin, end, self.whitespace).map_err(|e| {
            Error::build(ErrorKind::Config)
                .with_reason(INVALID_SYNTAX_CONFIG)
                .with_help(format!("tag patterns failed to compile: {e}"))
        })?;

        Ok(Syntax {
            empty: self.empty,
            registry,
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Delimiters, trim marker and empty marker, along with the compiled
/// registry of tag patterns.
#[derive(Debug, Clone)]
pub struct Syntax {
    empty: String,
    registry: Registry,
}

impl Syntax {
    /// Return the empty marker.
    #[inline]
    pub fn empty_marker(&self) -> &str {
        &self.empty
    }

    /// Return the registry of tag patterns.
    #[inline]
    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Syntax {
    fn default() -> Self {
        Builder::new()
            .build()
            .expect("default syntax must always compile")
    }
}

/// The ordered table of tag patterns.
#[derive(Debug, Clone)]
pub(crate) struct Registry {
    /// Finds the next, shortest, delimited tag on a line.
    frame: Regex,
    /// Classification patterns, consulted in order.
    patterns: Vec<(TokenKind, Regex)>,
}

impl Registry {
    /// Compile the registry for the given delimiters and trim character.
    fn new(begin: &str, end: &str, whitespace: char) -> Result<Self, regex::Error> {
        let b = regex::escape(begin);
        let e = regex::escape(end);
        let t = regex::escape(&whitespace.to_string());

        let table = [
            (
                TokenKind::Eval,
                format!(r"^{b}\s*(?P<expr>{PATH})(?:\s+(?P<args>{PATH}))?\s*(?P<rtrim>{t}?){e}$"),
            ),
            (
                TokenKind::Call,
                format!(
                    r#"^{b}#call\s+"?(?P<spec>{SPEC})"?(?:\s+with\s+(?P<model>{PATH}))?\s*(?P<rtrim>{t}?){e}$"#
                ),
            ),
            (
                TokenKind::Extends,
                format!(r#"^{b}#extends\s+"?(?P<spec>{SPEC})"?\s*{e}$"#),
            ),
            (
                TokenKind::Block,
                format!(
                    r#"^{b}#block\s+"?(?P<name>{NAME})"?\s*(?P<rtrim>{t}?)(?P<close>/?){e}$"#
                ),
            ),
            (
                TokenKind::For,
                format!(
                    r"^{b}#for\s+(?P<value>\w+)\s*(?:,\s*(?P<key>\w+))?\s+in\s+(?P<source>{PATH})\s*(?P<rtrim>{t}?){e}$"
                ),
            ),
            (
                TokenKind::Case,
                format!(r"^{b}#(?P<case>{CASE})\s*(?P<rtrim>{t}?){e}$"),
            ),
            (
                TokenKind::Use,
                format!(r"^{b}#use\s+(?P<source>{PATH})\s*(?P<rtrim>{t}?){e}$"),
            ),
            (
                TokenKind::Override,
                format!(r#"^{b}#override\s+"?(?P<name>{NAME})"?\s*(?P<rtrim>{t}?){e}$"#),
            ),
            (
                TokenKind::Branch,
                format!(r"^{b}#if\s+(?P<cond>{PATH})\s*(?P<rtrim>{t}?){e}$"),
            ),
            (
                TokenKind::Else,
                format!(r"^{b}#(?P<ltrim>{t}?)else\s*(?P<rtrim>{t}?){e}$"),
            ),
            (
                TokenKind::EndBlock,
                format!(r"^{b}/(?P<ltrim>{t}?)block\s*{e}$"),
            ),
            (
                TokenKind::EndFor,
                format!(r"^{b}/(?P<ltrim>{t}?)for\s*{e}$"),
            ),
            (
                TokenKind::EndCase,
                format!(r"^{b}/(?P<ltrim>{t}?)(?P<case>{CASE})\s*{e}$"),
            ),
            (
                TokenKind::EndUse,
                format!(r"^{b}/(?P<ltrim>{t}?)use\s*{e}$"),
            ),
            (
                TokenKind::EndOverride,
                format!(r"^{b}/(?P<ltrim>{t}?)override\s*{e}$"),
            ),
            (
                TokenKind::EndBranch,
                format!(r"^{b}/(?P<ltrim>{t}?)if\s*{e}$"),
            ),
            (
                TokenKind::EndExtends,
                format!(r"^{b}/extends\s*{e}$"),
            ),
        ];

        let mut patterns = Vec::with_capacity(table.len());
        for (kind, pattern) in table {
            patterns.push((kind, Regex::new(&pattern)?));
        }

        Ok(Self {
            frame: Regex::new(&format!("{b}.+?{e}"))?,
            patterns,
        })
    }

    /// Return the byte range of the next delimited tag within the line.
    pub fn find_tag(&self, line: &str) -> Option<(usize, usize)> {
        self.frame.find(line).map(|m| (m.start(), m.end()))
    }

    /// Return the kind of the first pattern in the table that matches the
    /// given tag text.
    pub fn classify(&self, text: &str) -> Option<TokenKind> {
        self.patterns
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(kind, _)| *kind)
    }

    /// Match the tag text against the pattern for the given kind.
    pub fn captures<'t>(&self, kind: TokenKind, text: &'t str) -> Option<Tag<'t>> {
        self.patterns
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, pattern)| pattern.captures(text))
            .map(Tag)
    }
}

/// The parts of a classified tag.
pub(crate) struct Tag<'t>(Captures<'t>);

impl<'t> Tag<'t> {
    /// Return the named part, if it matched anything.
    pub fn get(&self, name: &str) -> Option<&'t str> {
        self.0
            .name(name)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Return the named part, or an empty string.
    pub fn must(&self, name: &str) -> &'t str {
        self.get(name).unwrap_or_default()
    }

    /// Return true if the named flag part matched.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}
