use std::{fmt::Display, sync::Arc};

/// Types stamped on tokens by the tokenizer.
///
/// Every tag is classified by the first matching pattern in the syntax
/// registry, everything else is [`TokenKind::Text`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    /// Raw text.
    Text,
    /// `{{ expr }}` or `{{ helper arg }}`.
    Eval,
    /// `{{#call spec}}` or `{{#call spec with model}}`.
    Call,
    /// `{{#extends spec}}`.
    Extends,
    /// `{{#block name}}` or `{{#block name/}}`.
    Block,
    /// `{{#for value, key in expr}}`.
    For,
    /// `{{#first}}`, `{{#last}}`, `{{#non-first}}` or `{{#non-last}}`.
    Case,
    /// `{{#use expr}}`.
    Use,
    /// `{{#override name}}`.
    Override,
    /// `{{#if cond}}`.
    Branch,
    /// `{{#else}}`.
    Else,
    /// `{{/block}}`.
    EndBlock,
    /// `{{/for}}`.
    EndFor,
    /// `{{/first}}` and the other case terminators.
    EndCase,
    /// `{{/use}}`.
    EndUse,
    /// `{{/override}}`.
    EndOverride,
    /// `{{/if}}`.
    EndBranch,
    /// `{{/extends}}`.
    EndExtends,
}

impl TokenKind {
    /// Return true if a fragment may begin with this kind.
    pub fn is_leading(&self) -> bool {
        matches!(
            self,
            TokenKind::Text
                | TokenKind::Eval
                | TokenKind::Call
                | TokenKind::Extends
                | TokenKind::Block
                | TokenKind::For
                | TokenKind::Case
                | TokenKind::Use
                | TokenKind::Override
                | TokenKind::Branch
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Text => write!(f, "text"),
            TokenKind::Eval => write!(f, "eval"),
            TokenKind::Call => write!(f, "call"),
            TokenKind::Extends => write!(f, "extends"),
            TokenKind::Block => write!(f, "block"),
            TokenKind::For => write!(f, "for"),
            TokenKind::Case => write!(f, "case"),
            TokenKind::Use => write!(f, "use"),
            TokenKind::Override => write!(f, "override"),
            TokenKind::Branch => write!(f, "if"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::EndBlock => write!(f, "end block"),
            TokenKind::EndFor => write!(f, "end for"),
            TokenKind::EndCase => write!(f, "end case"),
            TokenKind::EndUse => write!(f, "end use"),
            TokenKind::EndOverride => write!(f, "end override"),
            TokenKind::EndBranch => write!(f, "end if"),
            TokenKind::EndExtends => write!(f, "end extends"),
        }
    }
}

/// A classified piece of template source.
#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    /// Name of the template the token was read from.
    pub source: Arc<str>,
    /// One indexed line of the first character.
    pub line: usize,
    /// One indexed column of the first character, counted in characters.
    pub column: usize,
    /// The raw text of the token.
    pub text: String,
    /// The classified type.
    pub kind: TokenKind,
}
