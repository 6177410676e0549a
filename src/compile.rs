mod generate;
mod lex;
mod parse;
mod syntax;
mod template;

pub(crate) use generate::program;
pub(crate) use parse::tree;
pub use syntax::{Builder, Syntax};
pub use template::Template;

use crate::log::Error;
use generate::Generator;
use lex::Lexer;
use parse::Parser;

/// Compile a [`Template`] from the given text with the default [`Syntax`].
///
/// Provides a shortcut to quickly compile a `Template` without creating
/// an engine. The `spec` names the template in errors, and is the base
/// that `call` and `extends` targets are resolved against.
///
/// # Errors
///
/// Returns an [`Error`] holding every fault found in the text.
///
/// # Examples
///
/// ```
/// use vellum::compile;
///
/// let template = compile("page", "{{ name }}");
/// assert!(template.is_ok());
///
/// let error = compile("page", "{{#for v in items}}").unwrap_err();
/// assert_eq!(error.faults()[0].reason(), "unterminated `for`");
/// ```
pub fn compile(spec: &str, text: &str) -> Result<Template, Error> {
    compile_with(spec, text, &Syntax::default())
}

/// Compile a [`Template`] from the given text with the given [`Syntax`].
///
/// # Errors
///
/// Returns an [`Error`] holding every fault found in the text.
///
/// # Examples
///
/// ```
/// use vellum::{compile_with, Builder};
///
/// let syntax = Builder::new().with_delimiters("<%", "%>").build().unwrap();
/// let template = compile_with("page", "<% name %>", &syntax);
/// assert!(template.is_ok());
/// ```
pub fn compile_with(spec: &str, text: &str, syntax: &Syntax) -> Result<Template, Error> {
    let tokens = Lexer::new(text, spec, syntax).tokenize()?;
    let tree = Parser::new(text, spec, syntax, tokens).parse()?;
    let program = Generator::new(spec).generate(tree)?;

    Ok(Template::new(spec, text, program))
}

#[cfg(test)]
mod tests {
    use super::compile;
    use crate::log::ErrorKind;

    #[test]
    fn test_compile_lexical_error_stops_before_parse() {
        let error = compile("t", "{{#nope}}{{#for v in items}}").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Lexical);
        assert_eq!(error.faults().len(), 1);
    }

    #[test]
    fn test_compile_reports_unterminated_constructs() {
        let expect = [
            ("{{#block a}}", "block"),
            ("{{#for v in items}}", "for"),
            ("{{#for v in items}}{{#first}}{{/for}}", "case"),
            ("{{#use a}}", "use"),
            ("{{#extends a}}{{#override b}}", "override"),
            ("{{#if a}}", "if"),
            ("{{#if a}}{{#else}}", "if"),
        ];

        for (source, construct) in expect {
            let error = compile("t", source).unwrap_err();
            let reason = format!("unterminated `{construct}`");

            assert!(
                error
                    .faults()
                    .iter()
                    .any(|f| f.kind() == ErrorKind::Unterminated && f.reason() == reason),
                "compiling {source}"
            );
        }
    }

    #[test]
    fn test_compile_structural_errors() {
        for source in [
            "{{#first}}X{{/first}}",
            "{{#for v in items}}{{#block a}}{{/block}}{{/for}}",
            "{{#if a}}{{#block a/}}{{/if}}",
            "{{#override a}}{{/override}}",
            "{{#extends a}}{{#override b}}{{#override c}}{{/override}}{{/override}}",
            "{{#extends a}}{{ x }}",
            "{{#extends a}}{{#for v in xs}}{{/for}}",
            "{{#if c}}{{#extends a}}{{/if}}",
            "{{#else}}",
            "{{/block}}",
        ] {
            let error = compile("t", source).unwrap_err();

            assert_eq!(error.kind(), ErrorKind::Structural, "compiling {source}");
        }
    }
}
