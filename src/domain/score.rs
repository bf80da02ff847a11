/// Leaderboard entry: who finished, and how long the run took.

use crate::error::{QuizError, QuizResult};

/// Field separator of the on-disk record format.
pub const DELIMITER: char = ',';

#[derive(Clone, Debug, PartialEq)]
pub struct ScoreRecord {
    name: String,
    elapsed_seconds: f64,
}

impl ScoreRecord {
    /// Names must be non-empty and free of the delimiter; elapsed time must be
    /// a finite, non-negative number of seconds.
    pub fn new(name: &str, elapsed_seconds: f64) -> QuizResult<Self> {
        validate_name(name)?;
        if !elapsed_seconds.is_finite() || elapsed_seconds < 0.0 {
            return Err(QuizError::SessionInvariantViolation(
                "elapsed time must be a non-negative number of seconds",
            ));
        }
        Ok(ScoreRecord { name: name.to_string(), elapsed_seconds })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }
}

pub fn validate_name(name: &str) -> QuizResult<()> {
    if name.trim().is_empty() || name.contains(DELIMITER) || name.contains('\n') {
        return Err(QuizError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Stable ascending sort by elapsed time; equal times keep their file order.
pub fn sort_by_elapsed(records: &mut [ScoreRecord]) {
    records.sort_by(|a, b| a.elapsed_seconds.total_cmp(&b.elapsed_seconds));
}
