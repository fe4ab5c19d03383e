use thiserror::Error;

use crate::edn::lexer::Position;

pub type EdnResult<T> = Result<T, EdnError>;

/// Error type returned by tag handlers and literal converters.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum EdnError {
    #[error("Syntax error at line {line}, column {column} (offset {offset}): {message}")]
    Syntax {
        offset: usize,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Cannot convert `{literal}` at offset {offset}: {source}")]
    Conversion {
        /// Tag name when the literal was a tagged form.
        tag: Option<String>,
        /// Source text of the literal, tag included.
        literal: String,
        offset: usize,
        #[source]
        source: HandlerError,
    },
}

impl EdnError {
    pub fn syntax(at: Position, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset: at.offset,
            line: at.line,
            column: at.column,
            message: message.into(),
        }
    }

    pub fn conversion(
        literal: impl Into<String>,
        offset: usize,
        source: impl Into<HandlerError>,
    ) -> Self {
        Self::Conversion {
            tag: None,
            literal: literal.into(),
            offset,
            source: source.into(),
        }
    }

    pub fn tag_conversion(
        tag: impl Into<String>,
        literal: impl Into<String>,
        offset: usize,
        source: HandlerError,
    ) -> Self {
        Self::Conversion {
            tag: Some(tag.into()),
            literal: literal.into(),
            offset,
            source,
        }
    }

    /// Byte offset into the source where the problem was detected.
    pub fn offset(&self) -> usize {
        match self {
            Self::Syntax { offset, .. } | Self::Conversion { offset, .. } => *offset,
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }

    /// The human-readable part of the error without position prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Syntax { message, .. } => message.clone(),
            Self::Conversion { source, .. } => source.to_string(),
        }
    }
}
