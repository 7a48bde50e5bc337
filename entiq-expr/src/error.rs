//! Parse errors for expression strings.

use thiserror::Error;

/// Result type for expression parsing.
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors produced while parsing an expression string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// The input could not be parsed as the requested construct.
    #[error("could not parse {expected}: `{input}`")]
    Invalid {
        /// What the caller asked for ("expression", "predicate", "path").
        expected: &'static str,
        /// The offending input, truncated for display.
        input: String,
    },

    /// Parsing succeeded but left unconsumed input behind.
    #[error("unexpected trailing input after {expected}: `{rest}`")]
    TrailingInput {
        expected: &'static str,
        rest: String,
    },

    /// The input was empty or all whitespace.
    #[error("empty {expected}")]
    Empty { expected: &'static str },
}

impl ExprError {
    pub(crate) fn invalid(expected: &'static str, input: &str) -> Self {
        Self::Invalid {
            expected,
            input: truncate(input),
        }
    }

    pub(crate) fn trailing(expected: &'static str, rest: &str) -> Self {
        Self::TrailingInput {
            expected,
            rest: truncate(rest),
        }
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 60;
    if s.len() <= MAX {
        s.to_string()
    } else {
        let mut end = MAX;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
