use std::{
    cmp::max,
    fmt::{Formatter, Result},
};

use super::{
    super::{RESET, YELLOW},
    {get_width, Visual, BLANK, EQUAL, HIGHLIGHT, PIPE},
};

/// A type of `Visual` that points to a specific location within source text.
#[derive(Debug, PartialEq)]
pub struct Pointer {
    /// The line that the Pointer is pointing to.
    ///
    /// This number is one indexed, as reported by the tokenizer.
    line: usize,
    /// The column that the Pointer is pointing to.
    ///
    /// This number is one indexed and counts characters.
    column: usize,
    /// The width of the object being highlighted.
    length: usize,
    /// The actual line of text that is being pointed to.
    text: String,
}

impl Pointer {
    /// Create a new Pointer at the given one indexed line and column of the
    /// source text, highlighting `snippet`.
    pub fn new(source: &str, line: usize, column: usize, snippet: &str) -> Self {
        let text = source
            .split('\n')
            .nth(line.saturating_sub(1))
            .unwrap_or_default()
            .trim_end_matches('\r')
            .to_string();

        Self {
            line: max(1, line),
            column: max(1, column),
            length: max(1, get_width(snippet)),
            text,
        }
    }
}

impl Visual for Pointer {
    fn display(
        &self,
        formatter: &mut Formatter<'_>,
        template: Option<&str>,
        help: Option<&str>,
    ) -> Result {
        let num = self.line.to_string();
        let col = self.column;
        let pad = get_width(&num);
        let prefix: String = self.text.chars().take(self.column - 1).collect();
        let align = get_width(&prefix) + self.length;

        let name = template.unwrap_or("?");
        let text = &self.text;
        let underline = HIGHLIGHT.repeat(self.length);

        write!(
            formatter,
            "\n {BLANK:pad$}--> {name}:{num}:{col}\
             \n {BLANK:pad$} {PIPE}\
             \n {num:>} {PIPE} {text}\
             \n {BLANK:pad$} {PIPE} {YELLOW}{underline:>align$}{RESET}\
             \n {BLANK:pad$} {PIPE}\n",
        )?;

        if let Some(help) = help {
            writeln!(formatter, "{BLANK:pad$} {EQUAL} help: {help}")?;
        }

        Ok(())
    }
}
