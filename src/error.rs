/// Crate-wide error type.
///
/// User mistakes (wrong answers, missed clicks, empty names) are not errors;
/// they are ordinary transitions. These variants cover storage faults and
/// misuse of the session state machine.

use thiserror::Error;

use crate::domain::challenge::OptionId;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt leaderboard record on line {line}: {reason}")]
    CorruptRecord { line: usize, reason: String },

    #[error("session invariant violated: {0}")]
    SessionInvariantViolation(&'static str),

    #[error("no option with id {0} in the current challenge")]
    UnknownOption(OptionId),

    #[error("invalid player name {0:?}")]
    InvalidName(String),
}

pub type QuizResult<T> = Result<T, QuizError>;
