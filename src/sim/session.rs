/// Session controller: the level/score state machine plus its leaderboard.
///
/// ## Transition table
///
/// ┌──────────┬───────────────────────────────────┬─────────┬────────┐
/// │ From     │ Input                             │ To      │ Score  │
/// ├──────────┼───────────────────────────────────┼─────────┼────────┤
/// │ Menu     │ begin, name non-empty             │ Level1  │        │
/// │ Menu     │ begin, name empty / has ','       │ Menu    │        │
/// │ Level1   │ correct option                    │ Level2  │ +1     │
/// │ Level1   │ wrong option                      │ Menu    │        │
/// │ Level2   │ toggle, < required selected       │ Level2  │        │
/// │ Level2   │ toggle, required reached, all ok  │ Level3  │ +1     │
/// │ Level2   │ toggle, required reached, not ok  │ Menu    │        │
/// │ Level3   │ click inside target               │ Menu    │ +1     │
/// │ Level3   │ click outside target              │ Level3  │        │
/// │ any      │ abandon                           │ Menu    │        │
/// └──────────┴───────────────────────────────────┴─────────┴────────┘
///
/// Score never goes down. Selections are cleared whenever Level2 is entered.
/// The only durable side effect is the Level3 record append: the hit is
/// decided first (pure), then appended, then committed. A failed append
/// leaves the player in Level3 so the click can be retried.

use std::collections::BTreeSet;
use std::time::Instant;

use crate::domain::challenge::{Challenge, OptionId};
use crate::domain::rules::{self, SelectionVerdict, Verdict};
use crate::domain::score::{self, ScoreRecord};
use crate::error::{QuizError, QuizResult};
use crate::sim::event::GameEvent;
use crate::sim::leaderboard::{self, ScoreStore};
use crate::sim::level::{Level, Quiz};

#[derive(Clone, Debug)]
pub struct SessionState {
    pub level: Level,
    pub score: u32,
    pub player_name: String,
    pub started_at: Option<Instant>,
    pub selections: BTreeSet<OptionId>,
}

/// Outcome of a Level3 click, before anything is written.
#[derive(Clone, Debug, PartialEq)]
pub enum SpotDecision {
    Miss,
    Hit(ScoreRecord),
}

impl SessionState {
    pub fn new() -> Self {
        SessionState {
            level: Level::Menu,
            score: 0,
            player_name: String::new(),
            started_at: None,
            selections: BTreeSet::new(),
        }
    }

    fn enter(&mut self, level: Level) {
        if level == Level::Level2 {
            self.selections.clear();
        }
        self.level = level;
    }

    fn advance(&mut self) {
        self.score += 1;
        self.enter(self.level.next());
    }

    fn back_to_menu(&mut self) {
        self.selections.clear();
        self.level = Level::Menu;
    }

    /// Decide a Level3 click without changing anything.
    pub fn judge_spot_click(&self, quiz: &Quiz, x: i64, y: i64, now: Instant) -> QuizResult<SpotDecision> {
        let target = match (self.level, quiz.challenge(self.level)) {
            (Level::Level3, Some(Challenge::SpotTarget { target, .. })) => *target,
            _ => return Err(QuizError::SessionInvariantViolation("spot click outside level 3")),
        };
        if !rules::spot_hit(&target, x, y) {
            return Ok(SpotDecision::Miss);
        }
        let started = self.started_at
            .ok_or(QuizError::SessionInvariantViolation("level 3 reached without a start time"))?;
        let elapsed = now.checked_duration_since(started)
            .ok_or(QuizError::SessionInvariantViolation("clock moved backwards during session"))?;
        let record = ScoreRecord::new(&self.player_name, elapsed.as_secs_f64())?;
        Ok(SpotDecision::Hit(record))
    }
}

pub struct Session {
    state: SessionState,
    quiz: Quiz,
    store: Box<dyn ScoreStore>,
}

impl Session {
    pub fn new(quiz: Quiz, store: Box<dyn ScoreStore>) -> Self {
        Session { state: SessionState::new(), quiz, store }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn level(&self) -> Level {
        self.state.level
    }

    pub fn score(&self) -> u32 {
        self.state.score
    }

    pub fn current_challenge(&self) -> Option<&Challenge> {
        self.quiz.challenge(self.state.level)
    }

    pub fn is_selected(&self, id: OptionId) -> bool {
        self.state.selections.contains(&id)
    }

    // ── Menu ──

    pub fn begin_session(&mut self, name: &str) -> QuizResult<Vec<GameEvent>> {
        self.begin_session_at(name, Instant::now())
    }

    pub fn begin_session_at(&mut self, name: &str, now: Instant) -> QuizResult<Vec<GameEvent>> {
        if self.state.level != Level::Menu {
            return Err(QuizError::SessionInvariantViolation("session started outside the menu"));
        }
        let name = name.trim();
        if name.is_empty() {
            return Ok(vec![GameEvent::NameRejected]);
        }
        if let Err(e) = score::validate_name(name) {
            log::warn!("{e}; staying at menu");
            return Ok(vec![GameEvent::NameRejected]);
        }
        self.state.player_name = name.to_string();
        self.state.started_at = Some(now);
        self.state.enter(Level::Level1);
        log::info!("session started for {name} (score {})", self.state.score);
        Ok(vec![GameEvent::SessionStarted { name: name.to_string() }])
    }

    // ── Level 1 ──

    pub fn submit_single_choice(&mut self, id: OptionId) -> QuizResult<Vec<GameEvent>> {
        let options = match (self.state.level, self.quiz.challenge(self.state.level)) {
            (Level::Level1, Some(Challenge::SingleChoice { options, .. })) => options,
            _ => return Err(QuizError::SessionInvariantViolation("single choice outside level 1")),
        };
        let level = self.state.level;
        match rules::judge_single(options, id).ok_or(QuizError::UnknownOption(id))? {
            Verdict::Correct => {
                self.state.advance();
                log::info!("level 1 passed, score {}", self.state.score);
                Ok(vec![GameEvent::AnswerCorrect { level }])
            }
            Verdict::Incorrect => {
                self.state.back_to_menu();
                log::info!("level 1 failed with option {id}");
                Ok(vec![GameEvent::AnswerWrong { level }])
            }
        }
    }

    // ── Level 2 ──

    pub fn toggle_multi_choice(&mut self, id: OptionId) -> QuizResult<Vec<GameEvent>> {
        let (options, required) = match (self.state.level, self.quiz.challenge(self.state.level)) {
            (Level::Level2, Some(Challenge::MultiChoice { options, required, .. })) => (options, *required),
            _ => return Err(QuizError::SessionInvariantViolation("multi choice outside level 2")),
        };
        if !options.iter().any(|o| o.id == id) {
            return Err(QuizError::UnknownOption(id));
        }

        let level = self.state.level;
        let selected = rules::toggle(&mut self.state.selections, id);
        let mut events = vec![GameEvent::SelectionToggled { id, selected }];

        match rules::judge_selection(options, &self.state.selections, required) {
            SelectionVerdict::Pending => {}
            SelectionVerdict::Decided(Verdict::Correct) => {
                self.state.advance();
                log::info!("level 2 passed, score {}", self.state.score);
                events.push(GameEvent::AnswerCorrect { level });
            }
            SelectionVerdict::Decided(Verdict::Incorrect) => {
                log::info!("level 2 failed with {:?}", self.state.selections);
                self.state.back_to_menu();
                events.push(GameEvent::AnswerWrong { level });
            }
        }
        Ok(events)
    }

    // ── Level 3 ──

    pub fn submit_spot_click(&mut self, x: i64, y: i64) -> QuizResult<Vec<GameEvent>> {
        self.submit_spot_click_at(x, y, Instant::now())
    }

    pub fn submit_spot_click_at(&mut self, x: i64, y: i64, now: Instant) -> QuizResult<Vec<GameEvent>> {
        let record = match self.state.judge_spot_click(&self.quiz, x, y, now)? {
            SpotDecision::Miss => return Ok(vec![GameEvent::TargetMissed]),
            SpotDecision::Hit(record) => record,
        };

        self.store.append(&record)?;

        self.state.advance();
        self.state.started_at = None;
        let elapsed_seconds = record.elapsed_seconds();
        Ok(vec![
            GameEvent::TargetFound { elapsed_seconds },
            GameEvent::RecordSaved { name: record.name().to_string(), elapsed_seconds },
        ])
    }

    // ── Any level ──

    /// Leave the current level without finishing it. Counts as a failure.
    pub fn abandon(&mut self) -> Vec<GameEvent> {
        let level = self.state.level;
        if level == Level::Menu {
            return vec![];
        }
        self.state.back_to_menu();
        self.state.started_at = None;
        log::info!("level {:?} abandoned", level);
        vec![GameEvent::Abandoned { level }]
    }

    pub fn request_scoreboard(&self) -> QuizResult<Vec<ScoreRecord>> {
        leaderboard::sorted(self.store.as_ref())
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::challenge::AssetRef;
    use crate::sim::leaderboard::MemoryLeaderboard;
    use crate::sim::scene::SceneLayout;

    // Standard quiz: Paris = #1; Jupiter = #1, Saturn = #4; target (44,44)-(56,56).
    const PARIS: OptionId = OptionId(1);
    const BERLIN: OptionId = OptionId(0);
    const EARTH: OptionId = OptionId(0);
    const JUPITER: OptionId = OptionId(1);
    const MARS: OptionId = OptionId(2);
    const SATURN: OptionId = OptionId(4);

    fn quiz() -> Quiz {
        let layout = SceneLayout { background: (100, 100), overlay: (12, 12) };
        Quiz::standard(&layout, AssetRef { background: "bg".into(), overlay: "ov".into() })
    }

    fn session_with(store: MemoryLeaderboard) -> Session {
        Session::new(quiz(), Box::new(store))
    }

    fn session() -> Session {
        session_with(MemoryLeaderboard::default())
    }

    /// Session already in Level3, started at `t0`.
    fn at_level3(t0: Instant) -> Session {
        let mut s = session();
        s.begin_session_at("Ann", t0).unwrap();
        s.submit_single_choice(PARIS).unwrap();
        s.toggle_multi_choice(JUPITER).unwrap();
        s.toggle_multi_choice(SATURN).unwrap();
        assert_eq!(s.level(), Level::Level3);
        s
    }

    // ── Begin ──

    #[test]
    fn empty_name_stays_at_menu() {
        let mut s = session();
        let ev = s.begin_session("").unwrap();
        assert_eq!(ev, vec![GameEvent::NameRejected]);
        assert_eq!(s.level(), Level::Menu);
        assert_eq!(s.score(), 0);
        assert!(s.request_scoreboard().unwrap().is_empty());

        s.begin_session("   ").unwrap();
        assert_eq!(s.level(), Level::Menu);
    }

    #[test]
    fn name_with_delimiter_is_rejected() {
        let mut s = session();
        assert_eq!(s.begin_session("Ann,Lee").unwrap(), vec![GameEvent::NameRejected]);
        assert_eq!(s.level(), Level::Menu);
    }

    #[test]
    fn begin_sets_name_and_clock() {
        let t0 = Instant::now();
        let mut s = session();
        s.begin_session_at("  Ann ", t0).unwrap();
        assert_eq!(s.level(), Level::Level1);
        assert_eq!(s.state().player_name, "Ann");
        assert_eq!(s.state().started_at, Some(t0));
    }

    #[test]
    fn begin_outside_menu_is_misuse() {
        let mut s = session();
        s.begin_session("Ann").unwrap();
        assert!(matches!(
            s.begin_session("Bob"),
            Err(QuizError::SessionInvariantViolation(_)),
        ));
    }

    // ── Level 1 ──

    #[test]
    fn level1_correct_advances_and_scores() {
        let mut s = session();
        s.begin_session("Ann").unwrap();
        let ev = s.submit_single_choice(PARIS).unwrap();
        assert_eq!(ev, vec![GameEvent::AnswerCorrect { level: Level::Level1 }]);
        assert_eq!(s.level(), Level::Level2);
        assert_eq!(s.score(), 1);
    }

    #[test]
    fn level1_each_wrong_option_returns_to_menu() {
        for id in [0u8, 2, 3] {
            let mut s = session();
            s.begin_session("Ann").unwrap();
            s.submit_single_choice(OptionId(id)).unwrap();
            assert_eq!(s.level(), Level::Menu, "option {id}");
            assert_eq!(s.score(), 0);
        }
    }

    #[test]
    fn failure_keeps_earlier_score() {
        let mut s = session();
        s.begin_session("Ann").unwrap();
        s.submit_single_choice(PARIS).unwrap();
        s.toggle_multi_choice(EARTH).unwrap();
        s.toggle_multi_choice(MARS).unwrap();
        assert_eq!(s.level(), Level::Menu);
        assert_eq!(s.score(), 1);

        // A new run starts from the kept score.
        s.begin_session("Ann").unwrap();
        s.submit_single_choice(BERLIN).unwrap();
        assert_eq!(s.score(), 1);
    }

    #[test]
    fn unknown_option_is_an_error() {
        let mut s = session();
        s.begin_session("Ann").unwrap();
        assert!(matches!(
            s.submit_single_choice(OptionId(99)),
            Err(QuizError::UnknownOption(OptionId(99))),
        ));
        assert_eq!(s.level(), Level::Level1);
    }

    #[test]
    fn wrong_level_operations_are_misuse() {
        let mut s = session();
        assert!(s.submit_single_choice(PARIS).is_err());
        assert!(s.toggle_multi_choice(JUPITER).is_err());
        assert!(s.submit_spot_click(50, 50).is_err());
        assert_eq!(s.level(), Level::Menu);
    }

    // ── Level 2 ──

    #[test]
    fn level2_all_pairs() {
        let opts = quiz().challenge(Level::Level2).unwrap().options().to_vec();
        for a in &opts {
            for b in &opts {
                if a.id == b.id { continue; }
                let mut s = session();
                s.begin_session("Ann").unwrap();
                s.submit_single_choice(PARIS).unwrap();
                s.toggle_multi_choice(a.id).unwrap();
                assert_eq!(s.level(), Level::Level2);
                s.toggle_multi_choice(b.id).unwrap();
                if a.correct && b.correct {
                    assert_eq!(s.level(), Level::Level3);
                    assert_eq!(s.score(), 2);
                } else {
                    assert_eq!(s.level(), Level::Menu);
                    assert_eq!(s.score(), 1);
                }
            }
        }
    }

    #[test]
    fn level2_toggle_twice_restores_selection() {
        let mut s = session();
        s.begin_session("Ann").unwrap();
        s.submit_single_choice(PARIS).unwrap();
        let before = s.state().selections.clone();

        let ev = s.toggle_multi_choice(SATURN).unwrap();
        assert_eq!(ev, vec![GameEvent::SelectionToggled { id: SATURN, selected: true }]);
        let ev = s.toggle_multi_choice(SATURN).unwrap();
        assert_eq!(ev, vec![GameEvent::SelectionToggled { id: SATURN, selected: false }]);

        assert_eq!(s.state().selections, before);
        assert_eq!(s.level(), Level::Level2);
    }

    #[test]
    fn level2_wrong_pair_reports_both_events() {
        let mut s = session();
        s.begin_session("Ann").unwrap();
        s.submit_single_choice(PARIS).unwrap();
        s.toggle_multi_choice(MARS).unwrap();
        let ev = s.toggle_multi_choice(JUPITER).unwrap();
        assert_eq!(ev, vec![
            GameEvent::SelectionToggled { id: JUPITER, selected: true },
            GameEvent::AnswerWrong { level: Level::Level2 },
        ]);
    }

    #[test]
    fn selections_cleared_on_reentry() {
        let mut s = session();
        s.begin_session("Ann").unwrap();
        s.submit_single_choice(PARIS).unwrap();
        s.toggle_multi_choice(JUPITER).unwrap();
        s.abandon();
        assert!(s.state().selections.is_empty());

        s.begin_session("Ann").unwrap();
        s.submit_single_choice(PARIS).unwrap();
        assert!(s.state().selections.is_empty());
        assert!(!s.is_selected(JUPITER));
    }

    // ── Level 3 ──

    #[test]
    fn spot_boundaries_hit_and_miss() {
        let t0 = Instant::now();
        for (x, y) in [(44, 50), (56, 50), (50, 44), (50, 56), (44, 44), (56, 56)] {
            let mut s = at_level3(t0);
            s.submit_spot_click_at(x, y, t0).unwrap();
            assert_eq!(s.level(), Level::Menu, "({x},{y}) should hit");
        }
        for (x, y) in [(43, 50), (57, 50), (50, 43), (50, 57), (-5, 500)] {
            let mut s = at_level3(t0);
            let ev = s.submit_spot_click_at(x, y, t0).unwrap();
            assert_eq!(ev, vec![GameEvent::TargetMissed]);
            assert_eq!(s.level(), Level::Level3, "({x},{y}) should miss");
            assert_eq!(s.score(), 2);
        }
    }

    #[test]
    fn misses_carry_no_penalty() {
        let t0 = Instant::now();
        let mut s = at_level3(t0);
        for _ in 0..5 {
            s.submit_spot_click_at(0, 0, t0).unwrap();
        }
        assert_eq!(s.score(), 2);
        assert!(s.request_scoreboard().unwrap().is_empty());
    }

    #[test]
    fn full_playthrough_records_once() {
        let t0 = Instant::now();
        let mut s = at_level3(t0);
        let ev = s.submit_spot_click_at(50, 50, t0 + Duration::from_millis(4250)).unwrap();
        assert_eq!(ev, vec![
            GameEvent::TargetFound { elapsed_seconds: 4.25 },
            GameEvent::RecordSaved { name: "Ann".into(), elapsed_seconds: 4.25 },
        ]);
        assert_eq!(s.level(), Level::Menu);
        assert_eq!(s.score(), 3);

        let board = s.request_scoreboard().unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].name(), "Ann");
        assert!(board[0].elapsed_seconds() >= 0.0);

        // Completion closes the run: a stray click is misuse, not a second record.
        assert!(s.submit_spot_click_at(50, 50, t0).is_err());
        assert_eq!(s.request_scoreboard().unwrap().len(), 1);
    }

    #[test]
    fn scoreboard_sorted_across_runs() {
        let t0 = Instant::now();
        let mut s = session();
        for (name, secs) in [("Slow", 30), ("Fast", 5), ("Mid", 12)] {
            s.begin_session_at(name, t0).unwrap();
            s.submit_single_choice(PARIS).unwrap();
            s.toggle_multi_choice(JUPITER).unwrap();
            s.toggle_multi_choice(SATURN).unwrap();
            s.submit_spot_click_at(50, 50, t0 + Duration::from_secs(secs)).unwrap();
        }
        let names: Vec<String> = s.request_scoreboard().unwrap()
            .iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["Fast", "Mid", "Slow"]);
        assert_eq!(s.score(), 9);
    }

    #[test]
    fn failed_append_stays_in_level3() {
        let t0 = Instant::now();
        let mut s = session_with(MemoryLeaderboard { records: vec![], fail_writes: true });
        s.begin_session_at("Ann", t0).unwrap();
        s.submit_single_choice(PARIS).unwrap();
        s.toggle_multi_choice(JUPITER).unwrap();
        s.toggle_multi_choice(SATURN).unwrap();

        assert!(matches!(s.submit_spot_click_at(50, 50, t0), Err(QuizError::Io(_))));
        assert_eq!(s.level(), Level::Level3);
        assert_eq!(s.score(), 2);
    }

    #[test]
    fn missing_start_time_is_invariant_violation() {
        let mut state = SessionState::new();
        state.level = Level::Level3;
        state.player_name = "Ann".into();
        let err = state.judge_spot_click(&quiz(), 50, 50, Instant::now()).unwrap_err();
        assert!(matches!(err, QuizError::SessionInvariantViolation(_)));

        // A miss never needs the clock.
        assert_eq!(state.judge_spot_click(&quiz(), 0, 0, Instant::now()).unwrap(), SpotDecision::Miss);
    }

    #[test]
    fn clock_regression_is_rejected_not_negative() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(10);
        let mut s = at_level3(later);
        let err = s.submit_spot_click_at(50, 50, t0).unwrap_err();
        assert!(matches!(err, QuizError::SessionInvariantViolation(_)));
        assert_eq!(s.level(), Level::Level3);
    }

    #[test]
    fn judge_is_pure() {
        let t0 = Instant::now();
        let s = at_level3(t0);
        let before = s.state().clone();
        let d = s.state().judge_spot_click(&quiz(), 50, 50, t0 + Duration::from_secs(1)).unwrap();
        assert!(matches!(d, SpotDecision::Hit(ref r) if r.elapsed_seconds() >= 0.0));
        assert_eq!(s.state().level, before.level);
        assert_eq!(s.state().score, before.score);
    }

    // ── Abandon ──

    #[test]
    fn abandon_returns_to_menu_without_record() {
        let t0 = Instant::now();
        let mut s = at_level3(t0);
        let ev = s.abandon();
        assert_eq!(ev, vec![GameEvent::Abandoned { level: Level::Level3 }]);
        assert_eq!(s.level(), Level::Menu);
        assert_eq!(s.score(), 2);
        assert!(s.request_scoreboard().unwrap().is_empty());
        assert!(s.abandon().is_empty());
    }
}
