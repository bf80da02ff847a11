/// AppState: everything the front end shows, around one `Session`.
///
/// The session owns game rules and scoring. This layer adds the screens
/// that exist only on the menu side (name prompt, scoreboard), cursors,
/// the Level3 crosshair, and the timed status message. Nothing here touches
/// the terminal, so input handling is testable as plain method calls.
///
/// ## Screens
///   session at Menu   → Menu | NamePrompt | Scoreboard   (menu_screen)
///   session in level  → Level(l)
///
/// The name prompt is modal: while it is open the only accepted inputs are
/// `type_char`, `backspace`, `submit_name` and `cancel_name`.

use crate::domain::challenge::{BoundingBox, Challenge, OptionId};
use crate::domain::score::{ScoreRecord, DELIMITER};
use crate::error::{QuizError, QuizResult};
use crate::sim::event::GameEvent;
use crate::sim::level::Level;
use crate::sim::scene::{Scene, SceneViewport};
use crate::sim::session::Session;

pub const NAME_MAX_LEN: usize = 24;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Screen {
    Menu,
    NamePrompt,
    Scoreboard,
    Level(Level),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum MenuScreen {
    Main,
    NamePrompt,
    Scoreboard,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MenuItem {
    Start,
    Score,
    Quit,
}

pub const MENU_ITEMS: [MenuItem; 3] = [MenuItem::Start, MenuItem::Score, MenuItem::Quit];

impl MenuItem {
    pub fn label(self) -> &'static str {
        match self {
            MenuItem::Start => "Start",
            MenuItem::Score => "Score",
            MenuItem::Quit => "Quit",
        }
    }
}

pub struct AppState {
    pub session: Session,
    pub scene: Scene,

    menu_screen: MenuScreen,
    pub menu_cursor: usize,
    pub name_buffer: String,
    pub scoreboard: Vec<ScoreRecord>,
    pub scoreboard_rows: usize,

    // ── Level screens ──
    pub option_cursor: usize,
    /// Terminal row of each option line, filled in by the renderer.
    pub option_rows: Vec<(u16, OptionId)>,
    /// Crosshair position in scene pixels.
    pub crosshair: (i64, i64),
    /// Where the scene was last drawn, filled in by the renderer.
    pub viewport: SceneViewport,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub message_ticks: u32,
    pub anim_tick: u32,
    pub quit_requested: bool,
}

impl AppState {
    pub fn new(session: Session, scene: Scene, message_ticks: u32, scoreboard_rows: usize) -> Self {
        let crosshair = crosshair_start(&scene);
        AppState {
            session,
            scene,
            menu_screen: MenuScreen::Main,
            menu_cursor: 0,
            name_buffer: String::new(),
            scoreboard: vec![],
            scoreboard_rows,
            option_cursor: 0,
            option_rows: vec![],
            crosshair,
            viewport: SceneViewport::default(),
            message: String::new(),
            message_timer: 0,
            message_ticks,
            anim_tick: 0,
            quit_requested: false,
        }
    }

    pub fn screen(&self) -> Screen {
        match self.session.level() {
            Level::Menu => match self.menu_screen {
                MenuScreen::Main => Screen::Menu,
                MenuScreen::NamePrompt => Screen::NamePrompt,
                MenuScreen::Scoreboard => Screen::Scoreboard,
            },
            level => Screen::Level(level),
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Advance timers by one tick.
    pub fn tick(&mut self) {
        self.anim_tick = self.anim_tick.wrapping_add(1);
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }

    // ── Menu ──

    pub fn move_menu(&mut self, delta: i32) {
        self.menu_cursor = wrap(self.menu_cursor, delta, MENU_ITEMS.len());
    }

    pub fn activate_menu(&mut self, item: MenuItem) {
        match item {
            MenuItem::Start => self.open_name_prompt(),
            MenuItem::Score => self.open_scoreboard(),
            MenuItem::Quit => self.quit_requested = true,
        }
    }

    pub fn open_name_prompt(&mut self) {
        if self.screen() != Screen::Menu {
            return;
        }
        self.name_buffer.clear();
        self.menu_screen = MenuScreen::NamePrompt;
    }

    pub fn type_char(&mut self, c: char) {
        if self.screen() != Screen::NamePrompt {
            return;
        }
        if c == DELIMITER || c.is_control() || self.name_buffer.chars().count() >= NAME_MAX_LEN {
            return;
        }
        self.name_buffer.push(c);
    }

    pub fn backspace(&mut self) {
        if self.screen() == Screen::NamePrompt {
            self.name_buffer.pop();
        }
    }

    /// Close the prompt and try to start a session with the typed name.
    /// An empty name lands back on the menu without a message.
    pub fn submit_name(&mut self) -> Vec<GameEvent> {
        if self.screen() != Screen::NamePrompt {
            return vec![];
        }
        self.menu_screen = MenuScreen::Main;
        let name = std::mem::take(&mut self.name_buffer);
        let result = self.session.begin_session(&name);
        self.absorb(result)
    }

    pub fn cancel_name(&mut self) {
        if self.screen() == Screen::NamePrompt {
            self.name_buffer.clear();
            self.menu_screen = MenuScreen::Main;
        }
    }

    pub fn open_scoreboard(&mut self) {
        if self.screen() != Screen::Menu {
            return;
        }
        match self.session.request_scoreboard() {
            Ok(records) => {
                self.scoreboard = records;
                self.menu_screen = MenuScreen::Scoreboard;
            }
            Err(e) => {
                log::error!("could not read leaderboard: {e}");
                let ticks = self.message_ticks;
                self.set_message(&format!("Could not read scores: {e}"), ticks);
            }
        }
    }

    pub fn close_scoreboard(&mut self) {
        if self.screen() == Screen::Scoreboard {
            self.menu_screen = MenuScreen::Main;
        }
    }

    // ── Level 1 / 2 ──

    fn option_count(&self) -> usize {
        self.session.current_challenge().map_or(0, |c| c.options().len())
    }

    pub fn move_option(&mut self, delta: i32) {
        self.option_cursor = wrap(self.option_cursor, delta, self.option_count());
    }

    /// Answer (Level1) or toggle (Level2) the option at `index`.
    pub fn choose_option(&mut self, index: usize) -> Vec<GameEvent> {
        let id = match self.session.current_challenge() {
            Some(c) => match c.options().get(index) {
                Some(o) => o.id,
                None => return vec![],
            },
            None => return vec![],
        };
        self.option_cursor = index;
        let result = match self.session.level() {
            Level::Level1 => self.session.submit_single_choice(id),
            Level::Level2 => self.session.toggle_multi_choice(id),
            _ => return vec![],
        };
        self.absorb(result)
    }

    /// Mouse click on a terminal row of the option list.
    pub fn click_option_row(&mut self, row: u16) -> Vec<GameEvent> {
        let hit = self.option_rows.iter().find(|(r, _)| *r == row).map(|(_, id)| *id);
        let index = hit.and_then(|id| {
            self.session.current_challenge()
                .and_then(|c| c.options().iter().position(|o| o.id == id))
        });
        match index {
            Some(i) => self.choose_option(i),
            None => vec![],
        }
    }

    // ── Level 3 ──

    pub fn move_crosshair(&mut self, dx: i32, dy: i32) {
        let (sx, sy) = self.viewport.step();
        let max_x = self.scene.width().saturating_sub(1) as i64;
        let max_y = self.scene.height().saturating_sub(1) as i64;
        self.crosshair.0 = (self.crosshair.0 + dx as i64 * sx).clamp(0, max_x);
        self.crosshair.1 = (self.crosshair.1 + dy as i64 * sy).clamp(0, max_y);
    }

    pub fn fire_crosshair(&mut self) -> Vec<GameEvent> {
        let (x, y) = self.crosshair;
        self.spot_click(x, y)
    }

    /// Mouse click on a terminal cell. Cells off the picture are ignored.
    /// A cell shows several scene pixels; if any of them belongs to the
    /// target the click counts as on the target.
    pub fn click_cell(&mut self, col: u16, row: u16) -> Vec<GameEvent> {
        let rect = match self.viewport.cell_rect(col, row) {
            Some(r) => r,
            None => return vec![],
        };
        let (x, y) = match self.session.current_challenge() {
            Some(Challenge::SpotTarget { target, .. }) => aim_within(&rect, target),
            _ => return vec![],
        };
        self.crosshair = (x, y);
        self.spot_click(x, y)
    }

    fn spot_click(&mut self, x: i64, y: i64) -> Vec<GameEvent> {
        if self.session.level() != Level::Level3 {
            return vec![];
        }
        let result = self.session.submit_spot_click(x, y);
        self.absorb(result)
    }

    // ── Any level ──

    pub fn abandon(&mut self) -> Vec<GameEvent> {
        let events = self.session.abandon();
        self.after_transition(&events);
        events
    }

    // ── Result handling ──

    /// Turn a session result into events: update cursors and the status
    /// line, and recover from misuse by returning to the menu.
    fn absorb(&mut self, result: QuizResult<Vec<GameEvent>>) -> Vec<GameEvent> {
        match result {
            Ok(events) => {
                self.after_transition(&events);
                events
            }
            Err(e) => {
                log::error!("{e}");
                let ticks = self.message_ticks;
                self.set_message(&format!("Error: {e}"), ticks);
                if matches!(e, QuizError::SessionInvariantViolation(_)) {
                    let events = self.session.abandon();
                    self.after_transition(&events);
                    return events;
                }
                vec![]
            }
        }
    }

    fn after_transition(&mut self, events: &[GameEvent]) {
        let entered_level = events.iter().any(|e| matches!(e,
            GameEvent::SessionStarted { .. } | GameEvent::AnswerCorrect { .. }
        ));
        if entered_level {
            self.option_cursor = 0;
            self.option_rows.clear();
            if let Some(Challenge::SpotTarget { .. }) = self.session.current_challenge() {
                self.crosshair = crosshair_start(&self.scene);
            }
        }
        if self.session.level() == Level::Menu {
            self.option_rows.clear();
        }

        let ticks = self.message_ticks;
        for event in events {
            if let Some(msg) = status_text(event) {
                self.set_message(&msg, ticks);
            }
        }
    }
}

/// Status line text for an event, if it deserves one.
pub fn status_text(event: &GameEvent) -> Option<String> {
    match event {
        GameEvent::SessionStarted { name } => Some(format!("Good luck, {name}!")),
        GameEvent::AnswerCorrect { level: Level::Level1 } => Some("Correct! Well done!".into()),
        GameEvent::AnswerCorrect { .. } => Some("Correct! Nice job!".into()),
        GameEvent::AnswerWrong { level: Level::Level1 } => Some("Incorrect. Try again!".into()),
        GameEvent::AnswerWrong { .. } => Some("Incorrect. That's not quite right!".into()),
        GameEvent::TargetFound { elapsed_seconds } => {
            Some(format!("Found! You found the Monkey in {elapsed_seconds:.2}s"))
        }
        GameEvent::TargetMissed => Some("Try again: that's not the right spot!".into()),
        GameEvent::Abandoned { .. } => Some("Back to the menu.".into()),
        GameEvent::NameRejected
        | GameEvent::SelectionToggled { .. }
        | GameEvent::RecordSaved { .. } => None,
    }
}

/// Where the crosshair appears on entering Level 3: a quarter of the way
/// into the picture, away from the centred target. Top-left corner if the
/// target covers that point.
fn crosshair_start(scene: &Scene) -> (i64, i64) {
    let p = (scene.width() as i64 / 4, scene.height() as i64 / 4);
    if scene.target_box().contains(p.0, p.1) { (0, 0) } else { p }
}

/// Point inside `cell` to click: the target pixel nearest the target's
/// middle when the two overlap, else the middle of the cell.
fn aim_within(cell: &BoundingBox, target: &BoundingBox) -> (i64, i64) {
    let overlaps = cell.x0 <= target.x1 && target.x0 <= cell.x1
        && cell.y0 <= target.y1 && target.y0 <= cell.y1;
    if overlaps {
        let mx = (target.x0 + target.x1).div_euclid(2);
        let my = (target.y0 + target.y1).div_euclid(2);
        (mx.clamp(cell.x0, cell.x1), my.clamp(cell.y0, cell.y1))
    } else {
        ((cell.x0 + cell.x1).div_euclid(2), (cell.y0 + cell.y1).div_euclid(2))
    }
}

fn wrap(cursor: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (cursor as i64 + delta as i64).rem_euclid(len as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::challenge::AssetRef;
    use crate::sim::leaderboard::MemoryLeaderboard;
    use crate::sim::level::Quiz;
    use crate::sim::scene::SceneLayout;

    fn app() -> AppState {
        let layout = SceneLayout { background: (100, 100), overlay: (12, 12) };
        let asset = AssetRef { background: "bg".into(), overlay: "ov".into() };
        let quiz = Quiz::standard(&layout, asset.clone());
        let session = Session::new(quiz, Box::new(MemoryLeaderboard::default()));
        let mut app = AppState::new(session, Scene::procedural(layout, asset), 40, 10);
        app.viewport = SceneViewport { col: 0, row: 2, cols: 50, rows: 25, scene_w: 100, scene_h: 100 };
        app
    }

    fn type_name(app: &mut AppState, name: &str) {
        for c in name.chars() {
            app.type_char(c);
        }
    }

    #[test]
    fn menu_cursor_wraps() {
        let mut a = app();
        a.move_menu(-1);
        assert_eq!(MENU_ITEMS[a.menu_cursor], MenuItem::Quit);
        a.move_menu(1);
        assert_eq!(MENU_ITEMS[a.menu_cursor], MenuItem::Start);
    }

    #[test]
    fn name_prompt_flow() {
        let mut a = app();
        a.activate_menu(MenuItem::Start);
        assert_eq!(a.screen(), Screen::NamePrompt);
        type_name(&mut a, "An,n");
        assert_eq!(a.name_buffer, "Ann");
        a.backspace();
        a.type_char('n');
        let ev = a.submit_name();
        assert_eq!(ev, vec![GameEvent::SessionStarted { name: "Ann".into() }]);
        assert_eq!(a.screen(), Screen::Level(Level::Level1));
        assert_eq!(a.message, "Good luck, Ann!");
    }

    #[test]
    fn empty_or_cancelled_name_returns_silently() {
        let mut a = app();
        a.open_name_prompt();
        let ev = a.submit_name();
        assert_eq!(ev, vec![GameEvent::NameRejected]);
        assert_eq!(a.screen(), Screen::Menu);
        assert!(a.message.is_empty());

        a.open_name_prompt();
        type_name(&mut a, "Bob");
        a.cancel_name();
        assert_eq!(a.screen(), Screen::Menu);
        assert!(a.name_buffer.is_empty());
    }

    #[test]
    fn prompt_blocks_other_actions() {
        let mut a = app();
        a.open_name_prompt();
        a.open_scoreboard();
        assert_eq!(a.screen(), Screen::NamePrompt);
        assert!(a.choose_option(1).is_empty());
        assert!(a.fire_crosshair().is_empty());
        assert_eq!(a.session.level(), Level::Menu);
    }

    #[test]
    fn name_length_is_capped() {
        let mut a = app();
        a.open_name_prompt();
        type_name(&mut a, &"x".repeat(NAME_MAX_LEN + 5));
        assert_eq!(a.name_buffer.chars().count(), NAME_MAX_LEN);
    }

    #[test]
    fn keyboard_playthrough() {
        let mut a = app();
        a.open_name_prompt();
        type_name(&mut a, "Ann");
        a.submit_name();

        a.move_option(1);
        assert_eq!(a.option_cursor, 1);
        a.choose_option(a.option_cursor);
        assert_eq!(a.screen(), Screen::Level(Level::Level2));
        assert_eq!(a.option_cursor, 0);

        a.choose_option(1);
        assert_eq!(a.screen(), Screen::Level(Level::Level2));
        a.choose_option(4);
        assert_eq!(a.screen(), Screen::Level(Level::Level3));
        assert_eq!(a.crosshair, (25, 25));

        // Firing straight away misses; walk onto the target first.
        assert_eq!(a.fire_crosshair(), vec![GameEvent::TargetMissed]);
        for _ in 0..10 {
            a.move_crosshair(1, 0);
        }
        for _ in 0..5 {
            a.move_crosshair(0, 1);
        }
        assert_eq!(a.crosshair, (45, 45));
        let ev = a.fire_crosshair();
        assert!(matches!(ev[0], GameEvent::TargetFound { .. }));
        assert_eq!(a.screen(), Screen::Menu);
        assert_eq!(a.session.score(), 3);

        a.open_scoreboard();
        assert_eq!(a.screen(), Screen::Scoreboard);
        assert_eq!(a.scoreboard.len(), 1);
        a.close_scoreboard();
        assert_eq!(a.screen(), Screen::Menu);
    }

    #[test]
    fn wrong_answer_sets_message() {
        let mut a = app();
        a.open_name_prompt();
        type_name(&mut a, "Ann");
        a.submit_name();
        a.choose_option(0);
        assert_eq!(a.screen(), Screen::Menu);
        assert_eq!(a.message, "Incorrect. Try again!");
    }

    #[test]
    fn mouse_on_option_rows() {
        let mut a = app();
        a.open_name_prompt();
        type_name(&mut a, "Ann");
        a.submit_name();
        a.option_rows = vec![(5, OptionId(0)), (6, OptionId(1))];
        assert!(a.click_option_row(9).is_empty());
        a.click_option_row(6);
        assert_eq!(a.screen(), Screen::Level(Level::Level2));
    }

    #[test]
    fn crosshair_clamps_and_clicks_miss() {
        let mut a = app();
        a.open_name_prompt();
        type_name(&mut a, "Ann");
        a.submit_name();
        a.choose_option(1);
        a.choose_option(1);
        a.choose_option(4);

        for _ in 0..100 {
            a.move_crosshair(-1, -1);
        }
        assert_eq!(a.crosshair, (0, 0));
        let ev = a.fire_crosshair();
        assert_eq!(ev, vec![GameEvent::TargetMissed]);
        assert_eq!(a.screen(), Screen::Level(Level::Level3));

        // Off-picture cell is ignored entirely.
        assert!(a.click_cell(200, 1).is_empty());

        let (col, row) = a.viewport.to_cell(50, 50).unwrap();
        let ev = a.click_cell(col, row);
        assert!(matches!(ev[0], GameEvent::TargetFound { .. }));
    }

    #[test]
    fn crosshair_starts_off_target() {
        let a = app();
        let target = a.scene.target_box();
        assert!(!target.contains(a.crosshair.0, a.crosshair.1));

        // Overlay covering the whole picture: fall back to the corner.
        let layout = SceneLayout { background: (8, 8), overlay: (8, 8) };
        let asset = AssetRef { background: "bg".into(), overlay: "ov".into() };
        assert_eq!(crosshair_start(&Scene::procedural(layout, asset)), (0, 0));
    }

    #[test]
    fn small_target_in_large_picture_is_clickable() {
        let layout = SceneLayout { background: (1000, 1000), overlay: (12, 12) };
        let asset = AssetRef { background: "bg".into(), overlay: "ov".into() };
        let quiz = Quiz::standard(&layout, asset.clone());
        let session = Session::new(quiz, Box::new(MemoryLeaderboard::default()));
        let mut a = AppState::new(session, Scene::procedural(layout, asset), 40, 10);
        a.viewport = SceneViewport::fit(80, 3, 18, 1000, 1000);
        assert_eq!((a.viewport.cols, a.viewport.rows), (36, 18));

        a.open_name_prompt();
        type_name(&mut a, "Ann");
        a.submit_name();
        a.choose_option(1);
        a.choose_option(1);
        a.choose_option(4);
        assert_eq!(a.screen(), Screen::Level(Level::Level3));

        let (col, row) = a.viewport.to_cell(500, 500).unwrap();
        let ev = a.click_cell(col, row);
        assert!(matches!(ev[0], GameEvent::TargetFound { .. }));
        assert!(a.scene.target_box().contains(a.crosshair.0, a.crosshair.1));
    }

    #[test]
    fn aim_snaps_into_overlap_only() {
        let target = BoundingBox::new(494, 494, 506, 506);
        let cell = BoundingBox::new(473, 500, 500, 555);
        assert_eq!(aim_within(&cell, &target), (500, 500));
        let far = BoundingBox::new(0, 0, 27, 55);
        assert_eq!(aim_within(&far, &target), (13, 27));
    }

    #[test]
    fn message_expires() {
        let mut a = app();
        a.set_message("hi", 2);
        a.tick();
        assert_eq!(a.message, "hi");
        a.tick();
        assert!(a.message.is_empty());
    }

    #[test]
    fn abandon_from_level() {
        let mut a = app();
        a.open_name_prompt();
        type_name(&mut a, "Ann");
        a.submit_name();
        let ev = a.abandon();
        assert_eq!(ev, vec![GameEvent::Abandoned { level: Level::Level1 }]);
        assert_eq!(a.screen(), Screen::Menu);
    }
}
