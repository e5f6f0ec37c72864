use crate::diagrams::sequence::InactiveParticipant;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{source} at line {line}, column {column}")]
    ActivationMismatch {
        source: InactiveParticipant,
        line: usize,
        column: usize,
    },

    #[error("Invalid directive config: {message}")]
    ConfigParse { message: String },
}

impl Error {
    /// 1-based `(line, column)` of the offending statement, when the error came from the parser.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Self::Syntax { line, column, .. } | Self::ActivationMismatch { line, column, .. } => {
                Some((*line, *column))
            }
            Self::ConfigParse { .. } => None,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
        }
    }
}
