use super::{Pointer, RED, RESET};
use crate::log::Visual;
use std::fmt::{Debug, Display, Formatter, Result};

/// Classifies an [`Error`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    /// A tag that matches no pattern in the syntax registry.
    Lexical,
    /// A tag found in a position where it is not legal.
    Structural,
    /// A container tag that reached the end of the source without its
    /// terminator.
    Unterminated,
    /// A second `extends` tag in one template.
    DuplicateExtends,
    /// A failure while rendering a compiled template.
    Render,
    /// A helper that is missing, or that returned an error.
    Helper,
    /// A template that could not be loaded.
    Load,
    /// An invalid `Syntax` or engine configuration.
    Config,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ErrorKind::Lexical => write!(f, "lexical error"),
            ErrorKind::Structural => write!(f, "structural error"),
            ErrorKind::Unterminated => write!(f, "unterminated construct"),
            ErrorKind::DuplicateExtends => write!(f, "duplicate extends"),
            ErrorKind::Render => write!(f, "render error"),
            ErrorKind::Helper => write!(f, "helper error"),
            ErrorKind::Load => write!(f, "load error"),
            ErrorKind::Config => write!(f, "configuration error"),
        }
    }
}

/// Describes an error, and allows adding a contextual help text and visualization.
///
/// # Examples
///
/// Creating an [`Error`] that includes a [`Visual`] of type [`Pointer`]:
///
/// ```
/// use vellum::{Error, ErrorKind};
///
/// Error::build(ErrorKind::Lexical)
///     .with_reason("unrecognized tag")
///     .with_pointer("{{#update name}}", 1, 1, "{{#update name}}")
///     .with_name("page.tmpl")
///     .with_help("expected one of `call`, `for`, `if`");
/// ```
///
/// When printed with `println!("{:#}", error)` the [`Error`] produces this output:
///
/// ```text
/// error: unrecognized tag
///   --> page.tmpl:1:1
///    |
///  1 | {{#update name}}
///    | ^^^^^^^^^^^^^^^^
///    |
///   = help: expected one of `call`, `for`, `if`
/// ```
pub struct Error {
    /// Classifies the [`Error`].
    kind: ErrorKind,
    /// Describes the cause of the [`Error`].
    reason: String,
    /// A visualization to help illustrate the [`Error`].
    visual: Option<Box<dyn Visual>>,
    /// Additional information to display with the [`Error`].
    help: Option<String>,
    /// The name of the Template that the [`Error`] comes from.
    name: Option<String>,
    /// Every fault recorded during a failed compile.
    faults: Vec<Error>,
}

impl Error {
    /// Create a new [`Error`] of the given kind.
    ///
    /// The reason text starts out as the description of the kind, the
    /// additional fields may be populated using the various methods
    /// defined on `Error`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vellum::{Error, ErrorKind};
    ///
    /// let error = Error::build(ErrorKind::Helper)
    ///     .with_help("expected a string");
    ///
    /// assert_eq!(error.to_string(), "\x1B[31merror\x1B[0m: helper error");
    /// ```
    pub fn build(kind: ErrorKind) -> Self {
        Error {
            kind,
            reason: kind.to_string(),
            name: None,
            visual: None,
            help: None,
            faults: vec![],
        }
    }

    /// Create the terminal [`Error`] of a failed compile from every fault
    /// recorded while compiling.
    ///
    /// The kind of the returned `Error` is the kind of the first fault.
    pub(crate) fn compile(name: &str, faults: Vec<Error>) -> Self {
        let kind = faults
            .first()
            .map(|fault| fault.kind)
            .unwrap_or(ErrorKind::Structural);
        let count = faults.len();

        Error {
            kind,
            reason: format!("could not compile `{name}` due to {count} previous error(s)"),
            name: Some(name.to_owned()),
            visual: None,
            help: None,
            faults,
        }
    }

    /// Set the reason text, which is a short summary of the [`Error`].
    pub fn with_reason<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.reason = text.into();

        self
    }

    /// Set the name text, which is the name of the
    /// [`Template`][`crate::Template`] that the [`Error`] is related to.
    ///
    /// A name that was already set is kept, so an `Error` bubbling up
    /// through nested templates keeps pointing at its origin.
    pub fn with_name<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        if self.name.is_none() {
            self.name = Some(text.into());
        }

        self
    }

    /// Set the [`Visual`], which is a visualization that helps illustrate the
    /// cause of the error.
    pub fn with_visual(mut self, visual: impl Visual + 'static) -> Self {
        self.visual = Some(Box::new(visual));

        self
    }

    /// Set the visualization to a new [`Pointer`] at the given one indexed
    /// line and column of the source text, highlighting `snippet`.
    ///
    /// A visualization that was already set is kept.
    pub fn with_pointer(mut self, source: &str, line: usize, column: usize, snippet: &str) -> Self {
        if self.visual.is_none() {
            self.visual = Some(Box::new(Pointer::new(source, line, column, snippet)));
        }

        self
    }

    /// Set the help text, which is contextual information to accompany the
    /// reason text.
    pub fn with_help<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.help = Some(text.into());

        self
    }

    /// Return the [`ErrorKind`].
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return the reason text.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Return the help text, if any.
    #[inline]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Return the name of the `Template` that the error is related to.
    #[inline]
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Return every fault recorded by a failed compile.
    ///
    /// Empty for errors that are not the result of a compile.
    #[inline]
    pub fn faults(&self) -> &[Error] {
        &self.faults
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if !f.alternate() {
            writeln!(f, "{self:#}")?;
        }
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .field("name", &self.name)
            .field("visual", &self.visual)
            .field("help", &self.help)
            .field("faults", &self.faults)
            .finish()?;

        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let header = format!("{RED}error{RESET}");
        write!(f, "{header}: {}", self.reason)?;

        if !f.alternate() {
            return Ok(());
        }
        if let Some(visual) = &self.visual {
            visual.display(f, self.name.as_deref(), self.help.as_deref())?;
        } else if let Some(help) = &self.help {
            write!(f, "\n = help: {help}")?;
        }
        for fault in &self.faults {
            write!(f, "\n{fault:#}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.reason == other.reason
            && self.help == other.help
            && self.name == other.name
            && self.faults == other.faults
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn test_compile_error_takes_first_kind() {
        let faults = vec![
            Error::build(ErrorKind::Unterminated),
            Error::build(ErrorKind::Lexical),
        ];
        let error = Error::compile("page.tmpl", faults);

        assert_eq!(error.kind(), ErrorKind::Unterminated);
        assert_eq!(error.faults().len(), 2);
        assert_eq!(error.get_name(), Some("page.tmpl"));
    }

    #[test]
    fn test_name_is_kept() {
        let error = Error::build(ErrorKind::Render)
            .with_name("inner.tmpl")
            .with_name("outer.tmpl");

        assert_eq!(error.get_name(), Some("inner.tmpl"));
    }

    #[test]
    fn test_alternate_lists_faults() {
        let error = Error::compile(
            "page.tmpl",
            vec![Error::build(ErrorKind::Lexical).with_reason("unrecognized tag")],
        );
        let printed = format!("{error:#}");

        assert!(printed.contains("could not compile `page.tmpl`"));
        assert!(printed.contains("unrecognized tag"));
    }
}
