use std::fmt;

/// Errors produced when parsing DSL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
    line: usize,
    column: usize,
}

impl ParseError {
    /// Build an error at byte `offset` of `input`.
    pub(crate) fn at(input: &str, offset: usize, message: impl Into<String>) -> Self {
        let consumed = input.get(..offset).unwrap_or(input);
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rsplit('\n')
            .next()
            .map_or(0, |tail| tail.chars().count())
            + 1;
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    /// 1-based line of the error.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column of the error, in characters.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}:{}", self.line, self.column)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}
