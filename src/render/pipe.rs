use serde_json::{Map, Value};
use std::fmt::{Arguments, Display, Result, Write};

/// Wraps some underlying buffer by providing methods that write to it
/// in different formats.
pub struct Pipe<'buffer> {
    buffer: &'buffer mut (dyn Write + 'buffer),
}

impl<'buffer> Pipe<'buffer> {
    /// Create a new Pipe that writes to the given buffer.
    pub fn new(buffer: &'buffer mut String) -> Self {
        Self { buffer }
    }

    /// Write the given Value to the Pipe buffer.
    ///
    /// Strings are written verbatim and null writes nothing.
    ///
    /// # Errors
    ///
    /// The Pipe supports all Value types, so the only error that will
    /// be returned is propagated from the [write!] macro itself.
    pub fn write_value(&mut self, value: &Value) -> Result {
        match value {
            Value::Null => Ok(()),
            Value::String(string) => self.write_str(string),
            Value::Array(array) => self.write_array(array),
            Value::Object(object) => self.write_object(object),
            _ => self.write_display(value),
        }
    }

    /// Write the text, following every line break with `indent` spaces.
    pub fn write_reflow(&mut self, text: &str, indent: usize) -> Result {
        if indent == 0 {
            return self.write_str(text);
        }

        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            self.write_str(first)?;
        }
        for line in lines {
            write!(self.buffer, "\n{:indent$}{line}", "")?;
        }

        Ok(())
    }

    /// Write the value to the buffer using the Display implementation.
    fn write_display(&mut self, value: impl Display) -> Result {
        write!(self.buffer, "{}", value)
    }

    /// Write the value to the buffer as a comma separated list and
    /// surrounded by brackets.
    fn write_array(&mut self, value: &[Value]) -> Result {
        write!(self.buffer, "[")?;
        for (index, item) in value.iter().enumerate() {
            if index > 0 {
                write!(self.buffer, ", ")?;
            }
            self.write_value(item)?;
        }
        write!(self.buffer, "]")
    }

    /// Write the value to the buffer as key/value pairs and surrounded
    /// by curly braces.
    fn write_object(&mut self, value: &Map<String, Value>) -> Result {
        write!(self.buffer, "{{")?;
        for (index, (key, value)) in value.iter().enumerate() {
            if index > 0 {
                write!(self.buffer, ", ")?;
            }
            write!(self.buffer, "{}: ", key)?;
            self.write_value(value)?;
        }
        write!(self.buffer, "}}")
    }
}

impl Write for Pipe<'_> {
    #[inline]
    fn write_str(&mut self, s: &str) -> Result {
        Write::write_str(self.buffer, s)
    }

    #[inline]
    fn write_char(&mut self, c: char) -> Result {
        Write::write_char(self.buffer, c)
    }

    #[inline]
    fn write_fmt(&mut self, args: Arguments<'_>) -> Result {
        Write::write_fmt(self.buffer, args)
    }
}
