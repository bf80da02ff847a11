/// Challenge definitions: what each level asks and what counts as an answer.
///
/// Options carry a stable `OptionId` so selection tracking never depends on
/// two options happening to share the same label and correctness flag.

use std::fmt;

/// Stable identifier of an option within one challenge.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OptionId(pub u8);

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizOption {
    pub id: OptionId,
    pub label: String,
    pub correct: bool,
}

/// Build an option list with ids assigned in display order.
pub fn options_from(pairs: &[(&str, bool)]) -> Vec<QuizOption> {
    pairs.iter()
        .enumerate()
        .map(|(i, &(label, correct))| QuizOption {
            id: OptionId(i as u8),
            label: label.to_string(),
            correct,
        })
        .collect()
}

/// Axis-aligned region in scene pixel coordinates. Both corners are inclusive.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BoundingBox {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl BoundingBox {
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        BoundingBox { x0, y0, x1, y1 }
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        self.x0 <= x && x <= self.x1 && self.y0 <= y && y <= self.y1
    }
}

/// Source images a spot challenge is drawn from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRef {
    pub background: String,
    pub overlay: String,
}

#[derive(Clone, Debug)]
pub enum Challenge {
    SingleChoice {
        prompt: String,
        options: Vec<QuizOption>,
    },
    MultiChoice {
        prompt: String,
        options: Vec<QuizOption>,
        required: usize,
    },
    SpotTarget {
        prompt: String,
        target: BoundingBox,
        asset: AssetRef,
    },
}

impl Challenge {
    pub fn prompt(&self) -> &str {
        match self {
            Challenge::SingleChoice { prompt, .. }
            | Challenge::MultiChoice { prompt, .. }
            | Challenge::SpotTarget { prompt, .. } => prompt,
        }
    }

    /// Options of a choice challenge; empty for a spot target.
    pub fn options(&self) -> &[QuizOption] {
        match self {
            Challenge::SingleChoice { options, .. }
            | Challenge::MultiChoice { options, .. } => options,
            Challenge::SpotTarget { .. } => &[],
        }
    }
}
