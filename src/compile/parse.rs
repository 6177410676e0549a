//! Vellum parser.
//!
//! Consumes the classified tokens produced by the [`Lexer`][`super::lex::Lexer`]
//! and builds the tree of [`Fragment`] instances that the generator turns into
//! an executable program.
//!
//! The parser does not stop at the first problem. Every fault is logged and
//! recorded, parsing continues with the next token, and a single `Error`
//! holding every fault is returned at the end.
pub mod tree;

mod state;

use crate::{
    compile::{
        lex::token::{Token, TokenKind},
        syntax::{Registry, Syntax, Tag},
    },
    log::{
        error_unterminated, Error, ErrorKind, DUPLICATE_ELSE, DUPLICATE_EXTENDS,
        ILLEGAL_POSITION, MISMATCHED_TERMINATOR, UNEXPECTED_TAG,
    },
};
use state::{Construct, State};
use std::vec::IntoIter;
use tree::{
    Block, Branch, Call, Case, CaseKind, Eval, Extends, For, Fragment, Override, Position, Trim,
    Use,
};

pub struct Parser<'source> {
    /// Reference to the source text, used to build pointers.
    source: &'source str,
    /// Name of the template.
    name: &'source str,
    /// Pattern table used to pull the parts back out of a tag.
    registry: &'source Registry,
    /// Remaining tokens.
    tokens: IntoIter<Token>,
    /// Tracks the constructs that are currently open.
    state: State,
    /// Every fault seen so far.
    faults: Vec<Error>,
}

impl<'source> Parser<'source> {
    /// Create a new [`Parser`] over the given tokens.
    #[inline]
    pub fn new(
        source: &'source str,
        name: &'source str,
        syntax: &'source Syntax,
        tokens: Vec<Token>,
    ) -> Self {
        Self {
            source,
            name,
            registry: syntax.registry(),
            tokens: tokens.into_iter(),
            state: State::new(),
            faults: vec![],
        }
    }

    /// Parse the tokens into a tree of [`Fragment`] instances.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] holding every fault seen while parsing.
    pub fn parse(mut self) -> Result<Vec<Fragment>, Error> {
        let mut tree = vec![];

        while let Some(token) = self.next() {
            if !token.kind.is_leading() {
                self.fault_unexpected(&token, None);
                continue;
            }

            let blank = token.kind == TokenKind::Text && token.text.trim().is_empty();
            if let Some(fragment) = self.parse_fragment(token) {
                tree.push(fragment);
            }
            if !blank {
                self.state.first = false;
            }
        }

        if !self.faults.is_empty() {
            return Err(Error::compile(self.name, self.faults));
        }

        Ok(tree)
    }

    /// Parse the fragment that begins with the given token.
    ///
    /// Returns `None` when the fragment is illegal, the fault has
    /// already been recorded.
    fn parse_fragment(&mut self, token: Token) -> Option<Fragment> {
        match token.kind {
            TokenKind::Text => Some(Fragment::Text(token.text)),
            TokenKind::Eval => self.parse_eval(token).map(Fragment::Eval),
            TokenKind::Call => self.parse_call(token).map(Fragment::Call),
            TokenKind::Extends => self.parse_extends(token).map(Fragment::Extends),
            TokenKind::Block => self.parse_block(token).map(Fragment::Block),
            TokenKind::For => self.parse_for(token).map(Fragment::For),
            TokenKind::Case => self.parse_case(token).map(Fragment::Case),
            TokenKind::Use => self.parse_use(token).map(Fragment::Use),
            TokenKind::Override => self.parse_override(token).map(Fragment::Override),
            TokenKind::Branch => self.parse_branch(token).map(Fragment::Branch),
            _ => {
                self.fault_unexpected(&token, None);
                None
            }
        }
    }

    fn parse_eval(&mut self, token: Token) -> Option<Eval> {
        let tag = self.tag(&token)?;

        Some(Eval {
            expr: tag.must("expr").into(),
            args: tag.get("args").map(Into::into),
            indent: indent(&token, tag.flag("rtrim")),
            position: position(&token),
        })
    }

    fn parse_call(&mut self, token: Token) -> Option<Call> {
        let tag = self.tag(&token)?;

        Some(Call {
            spec: tag.must("spec").into(),
            model: tag.get("model").map(Into::into),
            indent: indent(&token, tag.flag("rtrim")),
            position: position(&token),
        })
    }

    /// Parse an "extends" and its overrides, up to `{{/extends}}` or the
    /// end of the source.
    fn parse_extends(&mut self, token: Token) -> Option<Extends> {
        if self.state.depth > 0 {
            // Nested, there is no body to consume.
            self.fault(
                &token,
                Error::build(ErrorKind::Structural)
                    .with_reason(ILLEGAL_POSITION)
                    .with_help("`extends` cannot appear inside another construct"),
            );
            return None;
        }

        let mut legal = true;
        if self.state.extended {
            legal = false;
            self.fault(
                &token,
                Error::build(ErrorKind::DuplicateExtends)
                    .with_reason(DUPLICATE_EXTENDS)
                    .with_help("a template may only extend one other template"),
            );
        } else if !self.state.first {
            legal = false;
            self.fault(
                &token,
                Error::build(ErrorKind::Structural)
                    .with_reason(ILLEGAL_POSITION)
                    .with_help("`extends` must be the first tag of the template"),
            );
        }

        let spec = self.tag(&token)?.must("spec").to_owned();
        self.state.extended = true;
        self.state.extending = true;

        let mut overrides = vec![];
        while let Some(next) = self.next() {
            match next.kind {
                // Text between overrides is never rendered.
                TokenKind::Text => continue,
                TokenKind::Override => {
                    if let Some(o) = self.parse_override(next) {
                        overrides.push(o);
                    }
                }
                TokenKind::EndExtends => break,
                TokenKind::Extends => self.fault(
                    &next,
                    Error::build(ErrorKind::DuplicateExtends)
                        .with_reason(DUPLICATE_EXTENDS)
                        .with_help("a template may only extend one other template"),
                ),
                _ => self.fault_unexpected(&next, Some(Construct::Extends)),
            }
        }
        self.state.extending = false;

        legal.then(|| Extends {
            spec,
            overrides,
            position: position(&token),
        })
    }

    fn parse_block(&mut self, token: Token) -> Option<Block> {
        let tag = self.tag(&token)?;
        let name = tag.must("name").to_owned();
        let rtrim = tag.flag("rtrim");
        let close = tag.flag("close");

        let legal = self.state.loops.is_empty() && self.state.branches == 0;
        if !legal {
            self.fault(
                &token,
                Error::build(ErrorKind::Structural)
                    .with_reason(ILLEGAL_POSITION)
                    .with_help(format!(
                        "block `{name}` cannot appear inside a `for` or an `if`"
                    )),
            );
        }

        let mut trim = Trim {
            start: rtrim,
            end: rtrim && close,
        };
        let mut children = vec![];
        if !close {
            self.state.depth += 1;
            let (body, end) = self.parse_children(Construct::Block, &[TokenKind::EndBlock]);
            self.state.depth -= 1;

            trim.end = self.close(&token, Construct::Block, end.as_ref())?;
            children = body;
        }

        legal.then(|| Block {
            name,
            indent: token.column - 1,
            children,
            trim,
        })
    }

    fn parse_for(&mut self, token: Token) -> Option<For> {
        let tag = self.tag(&token)?;
        let value = tag.must("value").to_owned();
        let key = tag.get("key").map(String::from);
        let source = tag.must("source").to_owned();
        let start = tag.flag("rtrim");

        self.state.depth += 1;
        self.state.loops.push(false);
        let (children, end) = self.parse_children(Construct::For, &[TokenKind::EndFor]);
        self.state.loops.pop();
        self.state.depth -= 1;

        let end = self.close(&token, Construct::For, end.as_ref())?;

        Some(For {
            value,
            key,
            source,
            children,
            trim: Trim { start, end },
            position: position(&token),
        })
    }

    fn parse_case(&mut self, token: Token) -> Option<Case> {
        let tag = self.tag(&token)?;
        let name = tag.must("case").to_owned();
        let start = tag.flag("rtrim");
        let kind = CaseKind::from_name(&name)?;

        let legal = matches!(self.state.loops.last(), Some(false));
        if !legal {
            let help = if self.state.loops.is_empty() {
                format!("`{name}` is only legal inside a `for`")
            } else {
                format!("`{name}` cannot open while another case of the same loop is open")
            };
            self.fault(
                &token,
                Error::build(ErrorKind::Structural)
                    .with_reason(ILLEGAL_POSITION)
                    .with_help(help),
            );
        }

        self.set_case_open(legal, true);
        self.state.depth += 1;
        let (children, end) = self.parse_children(Construct::Case, &[TokenKind::EndCase]);
        self.state.depth -= 1;
        self.set_case_open(legal, false);

        if let Some(end) = &end {
            let closed = self
                .registry
                .captures(end.kind, &end.text)
                .and_then(|t| t.get("case").map(String::from));
            if closed.as_deref() != Some(name.as_str()) {
                self.fault(
                    end,
                    Error::build(ErrorKind::Structural)
                        .with_reason(MISMATCHED_TERMINATOR)
                        .with_help(format!("`{name}` must be closed with `/{name}`")),
                );
            }
        }
        let end = self.close(&token, Construct::Case, end.as_ref())?;

        legal.then_some(Case {
            kind,
            children,
            trim: Trim { start, end },
        })
    }

    fn parse_use(&mut self, token: Token) -> Option<Use> {
        let tag = self.tag(&token)?;
        let source = tag.must("source").to_owned();
        let start = tag.flag("rtrim");

        self.state.depth += 1;
        let (children, end) = self.parse_children(Construct::Use, &[TokenKind::EndUse]);
        self.state.depth -= 1;

        let end = self.close(&token, Construct::Use, end.as_ref())?;

        Some(Use {
            source,
            children,
            trim: Trim { start, end },
        })
    }

    fn parse_override(&mut self, token: Token) -> Option<Override> {
        let tag = self.tag(&token)?;
        let name = tag.must("name").to_owned();
        let start = tag.flag("rtrim");

        let legal = self.state.extending && self.state.overrides == 0;
        if !legal {
            let help = if self.state.extending {
                format!("override `{name}` cannot appear inside another override")
            } else {
                format!("override `{name}` is only legal inside `extends`")
            };
            self.fault(
                &token,
                Error::build(ErrorKind::Structural)
                    .with_reason(ILLEGAL_POSITION)
                    .with_help(help),
            );
        }

        self.state.depth += 1;
        self.state.overrides += 1;
        let (children, end) = self.parse_children(Construct::Override, &[TokenKind::EndOverride]);
        self.state.overrides -= 1;
        self.state.depth -= 1;

        let end = self.close(&token, Construct::Override, end.as_ref())?;

        legal.then_some(Override {
            name,
            children,
            trim: Trim { start, end },
        })
    }

    /// Parse an "if", with an optional else side.
    fn parse_branch(&mut self, token: Token) -> Option<Branch> {
        let tag = self.tag(&token)?;
        let cond = tag.must("cond").to_owned();
        let mut then_trim = Trim {
            start: tag.flag("rtrim"),
            end: false,
        };
        let mut else_trim = Trim::default();
        let stops = [TokenKind::Else, TokenKind::EndBranch];

        self.state.depth += 1;
        self.state.branches += 1;
        let (then_branch, mut end) = self.parse_children(Construct::Branch, &stops);
        let mut else_branch = vec![];
        let mut seen_else = false;

        while let Some(next) = end.take() {
            if next.kind != TokenKind::Else {
                end = Some(next);
                break;
            }
            if seen_else {
                self.fault(
                    &next,
                    Error::build(ErrorKind::Structural)
                        .with_reason(DUPLICATE_ELSE)
                        .with_help("an `if` may only have one `else`"),
                );
            } else {
                then_trim.end = self.flag(&next, "ltrim");
                else_trim.start = self.flag(&next, "rtrim");
                seen_else = true;
            }

            let (more, next_end) = self.parse_children(Construct::Branch, &stops);
            else_branch.extend(more);
            end = next_end;
        }
        self.state.branches -= 1;
        self.state.depth -= 1;

        let ltrim = self.close(&token, Construct::Branch, end.as_ref())?;
        if seen_else {
            else_trim.end = ltrim;
        } else {
            then_trim.end = ltrim;
        }

        Some(Branch {
            cond,
            then_branch,
            else_branch,
            then_trim,
            else_trim,
        })
    }

    /// Parse fragments until one of the `stops` is found.
    ///
    /// Returns the fragments and the token that stopped the parse, which
    /// is `None` when the end of the source was reached first.
    fn parse_children(
        &mut self,
        construct: Construct,
        stops: &[TokenKind],
    ) -> (Vec<Fragment>, Option<Token>) {
        let mut children = vec![];

        while let Some(token) = self.next() {
            if stops.contains(&token.kind) {
                return (children, Some(token));
            }
            if !token.kind.is_leading() {
                self.fault_unexpected(&token, Some(construct));
                continue;
            }
            if let Some(fragment) = self.parse_fragment(token) {
                children.push(fragment);
            }
        }

        (children, None)
    }

    /// Check that a construct was terminated.
    ///
    /// Returns the `ltrim` flag of the terminator, or `None` after recording
    /// an unterminated fault pointing at the opening tag.
    fn close(&mut self, open: &Token, construct: Construct, end: Option<&Token>) -> Option<bool> {
        match end {
            Some(end) => Some(self.flag(end, "ltrim")),
            None => {
                self.fault(open, error_unterminated(construct, construct.terminator()));
                None
            }
        }
    }

    /// Mark the case of the innermost loop as open or closed.
    fn set_case_open(&mut self, legal: bool, open: bool) {
        if !legal {
            return;
        }
        if let Some(last) = self.state.loops.last_mut() {
            *last = open;
        }
    }

    /// Return the parts of a classified tag.
    fn tag<'t>(&mut self, token: &'t Token) -> Option<Tag<'t>> {
        let registry = self.registry;
        let tag = registry.captures(token.kind, &token.text);
        if tag.is_none() {
            self.fault_unexpected(token, None);
        }

        tag
    }

    /// Return true if the named flag of the tag matched.
    fn flag(&self, token: &Token, name: &str) -> bool {
        self.registry
            .captures(token.kind, &token.text)
            .map_or(false, |tag| tag.flag(name))
    }

    /// Record a fault for a tag that is not legal where it was found.
    fn fault_unexpected(&mut self, token: &Token, within: Option<Construct>) {
        let help = match within {
            Some(construct) => format!("`{}` is not legal inside `{construct}`", token.kind),
            None => format!("`{}` is not legal here", token.kind),
        };

        self.fault(
            token,
            Error::build(ErrorKind::Structural)
                .with_reason(format!("{UNEXPECTED_TAG} `{}`", token.text))
                .with_help(help),
        );
    }

    /// Log the fault, and record it with a pointer to the token.
    fn fault(&mut self, token: &Token, error: Error) {
        tracing::error!(
            source = %token.source,
            line = token.line,
            column = token.column,
            "{}: {}",
            error.reason(),
            error.help().unwrap_or_default()
        );

        self.faults.push(
            error
                .with_pointer(self.source, token.line, token.column, &token.text)
                .with_name(self.name),
        );
    }

    /// Return the next token.
    #[inline]
    fn next(&mut self) -> Option<Token> {
        self.tokens.next()
    }
}

/// Return the indentation of output that replaces the token, which is zero
/// when the tag ends with the trim character.
fn indent(token: &Token, rtrim: bool) -> usize {
    if rtrim {
        0
    } else {
        token.column - 1
    }
}

fn position(token: &Token) -> Position {
    Position {
        line: token.line,
        column: token.column,
        width: token.text.chars().count(),
    }
}
