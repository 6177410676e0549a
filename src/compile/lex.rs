pub mod token;

use crate::{
    compile::{lex::token::Token, syntax::Syntax},
    log::{Error, ErrorKind, UNRECOGNIZED_TAG},
};
use std::sync::Arc;
use token::TokenKind;

/// A piece of a line that has not been classified yet.
#[derive(Debug, PartialEq)]
struct Piece {
    line: usize,
    column: usize,
    text: String,
    tag: bool,
}

/// Splits template source into a classified [`Token`] stream.
pub struct Lexer<'source> {
    /// Reference to the source text.
    source: &'source str,
    /// Name of the template, stamped on every `Token`.
    name: Arc<str>,
    /// Delimiters, empty marker and the tag pattern table.
    syntax: &'source Syntax,
}

impl<'source> Lexer<'source> {
    /// Create a new [`Lexer`] over the given source.
    #[inline]
    pub fn new(source: &'source str, name: &str, syntax: &'source Syntax) -> Self {
        Self {
            source,
            name: Arc::from(name),
            syntax,
        }
    }

    /// Read the full source as classified [`Token`] instances.
    ///
    /// # Errors
    ///
    /// Every unrecognized tag is logged, and once the whole source has been
    /// read a single [`Error`] holding all of them is returned.
    pub fn tokenize(self) -> Result<Vec<Token>, Error> {
        let pieces = self.scan();

        self.classify(pieces)
    }

    /// Split every line into text and tag pieces, keeping line breaks.
    fn scan(&self) -> Vec<Piece> {
        let registry = self.syntax.registry();
        let lines: Vec<&str> = self.source.split('\n').collect();
        let last = lines.len() - 1;
        let mut pieces: Vec<Piece> = vec![];

        for (index, text) in lines.into_iter().enumerate() {
            let line = index + 1;
            let mut column = 1;
            let mut rest = text;

            while !rest.is_empty() {
                match registry.find_tag(rest) {
                    Some((begin, end)) => {
                        let before = &rest[..begin];
                        if !before.is_empty() {
                            pieces.push(Piece {
                                line,
                                column,
                                text: before.to_owned(),
                                tag: false,
                            });
                        }
                        column += before.chars().count();

                        let tag = &rest[begin..end];
                        pieces.push(Piece {
                            line,
                            column,
                            text: tag.to_owned(),
                            tag: true,
                        });
                        column += tag.chars().count();
                        rest = &rest[end..];
                    }
                    None => {
                        pieces.push(Piece {
                            line,
                            column,
                            text: rest.to_owned(),
                            tag: false,
                        });
                        column += rest.chars().count();
                        rest = "";
                    }
                }
            }

            if index < last {
                match pieces.last_mut() {
                    Some(piece) if !piece.tag => piece.text.push('\n'),
                    _ => pieces.push(Piece {
                        line,
                        column,
                        text: "\n".into(),
                        tag: false,
                    }),
                }
            }
        }

        pieces
    }

    /// Stamp a [`TokenKind`] on every tag, strip the empty marker from text
    /// and merge neighboring text.
    fn classify(&self, pieces: Vec<Piece>) -> Result<Vec<Token>, Error> {
        let registry = self.syntax.registry();
        let empty = self.syntax.empty_marker();
        let mut tokens: Vec<Token> = Vec::with_capacity(pieces.len());
        let mut faults = vec![];

        for piece in pieces {
            if piece.tag {
                match registry.classify(&piece.text) {
                    Some(kind) => tokens.push(self.token(piece, kind)),
                    None => {
                        tracing::error!(
                            source = %self.name,
                            line = piece.line,
                            column = piece.column,
                            "unrecognized tag `{}`",
                            piece.text
                        );
                        faults.push(
                            Error::build(ErrorKind::Lexical)
                                .with_reason(format!("{UNRECOGNIZED_TAG} `{}`", piece.text))
                                .with_pointer(self.source, piece.line, piece.column, &piece.text)
                                .with_name(&*self.name)
                                .with_help("the tag does not match any known construct"),
                        );
                    }
                }
                continue;
            }

            let text = if empty.is_empty() {
                piece.text
            } else {
                piece.text.replace(empty, "")
            };
            if text.is_empty() {
                continue;
            }
            match tokens.last_mut() {
                Some(last) if last.kind == TokenKind::Text => last.text.push_str(&text),
                _ => tokens.push(self.token(Piece { text, ..piece }, TokenKind::Text)),
            }
        }

        if !faults.is_empty() {
            return Err(Error::compile(&self.name, faults));
        }

        Ok(tokens)
    }

    fn token(&self, piece: Piece, kind: TokenKind) -> Token {
        Token {
            source: Arc::clone(&self.name),
            line: piece.line,
            column: piece.column,
            text: piece.text,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Lexer;
    use crate::{
        compile::{lex::token::TokenKind, syntax::Syntax},
        log::ErrorKind,
        Builder,
    };

    #[test]
    fn test_lex_plain_text() {
        let syntax = Syntax::default();
        let tokens = Lexer::new("lorem<!> ipsum\ndolor<!>", "t", &syntax)
            .tokenize()
            .unwrap();

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert_eq!(tokens[0].text, "lorem ipsum\ndolor");
    }

    #[test]
    fn test_lex_empty_source() {
        let syntax = Syntax::default();

        assert!(Lexer::new("", "t", &syntax).tokenize().unwrap().is_empty());
    }

    #[test]
    fn test_lex_marker_only_text_is_dropped() {
        let expect = vec![(TokenKind::Eval, 1, 1, "{{ a }}"), (TokenKind::Eval, 1, 11, "{{ b }}")];

        helper_lex_auto("{{ a }}<!>{{ b }}", expect);
    }

    #[test]
    fn test_lex_positions() {
        let expect = vec![
            (TokenKind::Text, 1, 1, "hello "),
            (TokenKind::Eval, 1, 7, "{{ name }}"),
            (TokenKind::Text, 1, 17, "!\n  "),
            (TokenKind::Branch, 2, 3, "{{#if ok}}"),
            (TokenKind::Text, 2, 13, "yes"),
            (TokenKind::EndBranch, 2, 16, "{{/if}}"),
        ];

        helper_lex_auto("hello {{ name }}!\n  {{#if ok}}yes{{/if}}", expect);
    }

    #[test]
    fn test_lex_newline_after_tag() {
        let expect = vec![
            (TokenKind::Text, 1, 1, "a\n"),
            (TokenKind::Eval, 2, 1, "{{ b }}"),
            (TokenKind::Text, 2, 8, "\nc"),
        ];

        helper_lex_auto("a\n{{ b }}\nc", expect);
    }

    #[test]
    fn test_lex_blank_lines() {
        let expect = vec![
            (TokenKind::For, 1, 1, "{{#for v in items}}"),
            (TokenKind::Text, 1, 20, "\n\n"),
            (TokenKind::EndFor, 3, 1, "{{/for}}"),
        ];

        helper_lex_auto("{{#for v in items}}\n\n{{/for}}", expect);
    }

    #[test]
    fn test_lex_columns_count_characters() {
        let expect = vec![
            (TokenKind::Text, 1, 1, "héllo "),
            (TokenKind::Eval, 1, 7, "{{ name }}"),
        ];

        helper_lex_auto("héllo {{ name }}", expect);
    }

    #[test]
    fn test_lex_reports_every_unrecognized_tag() {
        let syntax = Syntax::default();
        let error = Lexer::new("{{#nope}}\nok\n{{ a b c }}", "page.tmpl", &syntax)
            .tokenize()
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Lexical);
        assert_eq!(error.faults().len(), 2);
        assert_eq!(error.get_name(), Some("page.tmpl"));
    }

    #[test]
    fn test_lex_custom_empty_marker() {
        let syntax = Builder::new().with_empty_marker("@@").build().unwrap();
        let tokens = Lexer::new("a@@b<!>", "t", &syntax).tokenize().unwrap();

        assert_eq!(tokens[0].text, "ab<!>");
    }

    /// Tokenize the source with the default syntax and compare every token's
    /// kind, line, column and text against `expect`.
    fn helper_lex_auto(source: &str, expect: Vec<(TokenKind, usize, usize, &str)>) {
        let syntax = Syntax::default();
        let tokens = Lexer::new(source, "t", &syntax).tokenize().unwrap();
        let actual: Vec<_> = tokens
            .iter()
            .map(|t| (t.kind, t.line, t.column, t.text.as_str()))
            .collect();

        assert_eq!(actual, expect);
    }
}
