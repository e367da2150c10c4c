//! Errors produced while compiling a regex.

use thiserror::Error;

/// Represents an error encountered during regex compilation.
///
/// Failing to find a match is not an error; see [`crate::MatchResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The pattern text is malformed.
    /// `offset` is the index of the code point at which parsing failed.
    #[error("{text} at offset {offset}")]
    Syntax { offset: usize, text: String },

    /// The pattern is well formed, but uses a construct which the automaton
    /// cannot execute, or exceeds one of the automaton size limits.
    #[error("unsupported regex: {text}")]
    Unsupported { text: String },
}

impl Error {
    pub(crate) fn syntax<S: ToString>(offset: usize, text: S) -> Error {
        Error::Syntax {
            offset,
            text: text.to_string(),
        }
    }

    pub(crate) fn unsupported<S: ToString>(text: S) -> Error {
        Error::Unsupported {
            text: text.to_string(),
        }
    }

    /// \return whether this is a syntax error.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax { .. })
    }

    /// \return whether this reports a construct the engine cannot execute.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }

    /// \return the pattern offset of a syntax error.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Syntax { offset, .. } => Some(*offset),
            Error::Unsupported { .. } => None,
        }
    }

    /// \return the human-readable message, without the offset.
    pub fn text(&self) -> &str {
        match self {
            Error::Syntax { text, .. } | Error::Unsupported { text } => text,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
