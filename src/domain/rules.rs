/// Answer rules, truth-table driven.
///
/// Pure functions over challenge data and the current selection set.
/// They decide "right, wrong, or not yet" without touching session state
/// or storage; the session applies the verdict.
///
/// ### Single choice
/// ┌───────────────────────────┬───────────┐
/// │ Condition                 │ Verdict   │
/// ├───────────────────────────┼───────────┤
/// │ id not in options         │ (unknown) │
/// │ option.correct            │ Correct   │
/// │ otherwise                 │ Incorrect │
/// └───────────────────────────┴───────────┘
///
/// ### Multi choice (evaluated after every toggle)
/// ┌───────────────────────────────────┬────────────┐
/// │ Condition                         │ Verdict    │
/// ├───────────────────────────────────┼────────────┤
/// │ |selected| < required             │ Pending    │
/// │ every selected option correct     │ Correct    │
/// │ otherwise                         │ Incorrect  │
/// └───────────────────────────────────┴────────────┘
///
/// ### Spot click
/// Hit iff `x0 <= x <= x1 && y0 <= y <= y1`. Everything else is a miss,
/// including points outside the picture.

use std::collections::BTreeSet;

use super::challenge::{BoundingBox, OptionId, QuizOption};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Verdict {
    Correct,
    Incorrect,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SelectionVerdict {
    Pending,
    Decided(Verdict),
}

/// `None` when the id does not name one of the options.
pub fn judge_single(options: &[QuizOption], id: OptionId) -> Option<Verdict> {
    let opt = options.iter().find(|o| o.id == id)?;
    Some(if opt.correct { Verdict::Correct } else { Verdict::Incorrect })
}

/// Flip membership of `id`. Returns true if the option is now selected.
pub fn toggle(selections: &mut BTreeSet<OptionId>, id: OptionId) -> bool {
    if selections.remove(&id) {
        false
    } else {
        selections.insert(id);
        true
    }
}

pub fn judge_selection(
    options: &[QuizOption],
    selections: &BTreeSet<OptionId>,
    required: usize,
) -> SelectionVerdict {
    if selections.len() < required {
        return SelectionVerdict::Pending;
    }
    let all_correct = selections.iter().all(|id| {
        options.iter().any(|o| o.id == *id && o.correct)
    });
    if all_correct {
        SelectionVerdict::Decided(Verdict::Correct)
    } else {
        SelectionVerdict::Decided(Verdict::Incorrect)
    }
}

pub fn spot_hit(target: &BoundingBox, x: i64, y: i64) -> bool {
    target.contains(x, y)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
