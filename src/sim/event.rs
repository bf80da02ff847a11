/// Events emitted by session operations.
/// The presentation layer consumes these for status messages and sound.

use crate::domain::challenge::OptionId;
use crate::sim::level::Level;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    SessionStarted { name: String },
    NameRejected,
    AnswerCorrect { level: Level },
    AnswerWrong { level: Level },
    SelectionToggled { id: OptionId, selected: bool },
    TargetFound { elapsed_seconds: f64 },
    TargetMissed,
    RecordSaved { name: String, elapsed_seconds: f64 },
    Abandoned { level: Level },
}
