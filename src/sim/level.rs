/// Levels and the built-in quiz.
///
/// ## Progression
///   Menu → Level1 → Level2 → Level3 → Menu
///
/// Success moves one step along the ring; failure in Level1/Level2 drops
/// straight back to Menu. A Level3 miss stays put. The session applies
/// these; this module only names the states and holds the challenges.
///
/// ## Built-in challenges
///   1. Single choice, capital of France
///   2. Multi choice, the two largest planets
///   3. Spot target, the monkey hidden in the forest picture

use crate::domain::challenge::{options_from, AssetRef, Challenge};
use crate::sim::scene::SceneLayout;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Level {
    Menu,
    Level1,
    Level2,
    Level3,
}

impl Level {
    /// Where a success leads.
    pub fn next(self) -> Level {
        match self {
            Level::Menu => Level::Level1,
            Level::Level1 => Level::Level2,
            Level::Level2 => Level::Level3,
            Level::Level3 => Level::Menu,
        }
    }

    /// 1-based level number; `None` for the menu.
    pub fn number(self) -> Option<u8> {
        match self {
            Level::Menu => None,
            Level::Level1 => Some(1),
            Level::Level2 => Some(2),
            Level::Level3 => Some(3),
        }
    }
}

/// The three challenges, indexed by level.
#[derive(Clone, Debug)]
pub struct Quiz {
    levels: [Challenge; 3],
}

impl Quiz {
    pub fn new(level1: Challenge, level2: Challenge, level3: Challenge) -> Self {
        Quiz { levels: [level1, level2, level3] }
    }

    /// The game's fixed question set. The spot target comes from the scene.
    pub fn standard(layout: &SceneLayout, asset: AssetRef) -> Self {
        Quiz::new(
            Challenge::SingleChoice {
                prompt: "What is the capital of France?".into(),
                options: options_from(&[
                    ("Berlin", false), ("Paris", true), ("London", false), ("Rome", false),
                ]),
            },
            Challenge::MultiChoice {
                prompt: "Select the two largest planets:".into(),
                options: options_from(&[
                    ("Earth", false), ("Jupiter", true), ("Mars", false),
                    ("Venus", false), ("Saturn", true), ("Mercury", false),
                ]),
                required: 2,
            },
            Challenge::SpotTarget {
                prompt: "Find the hidden Monkey in the image".into(),
                target: layout.target_box(),
                asset,
            },
        )
    }

    pub fn challenge(&self, level: Level) -> Option<&Challenge> {
        level.number().map(|n| &self.levels[n as usize - 1])
    }
}
