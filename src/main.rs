/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::OpenOptions;
use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use config::GameConfig;
use error::QuizResult;
use sim::app::{AppState, Screen, MENU_ITEMS};
use sim::event::GameEvent;
use sim::leaderboard::FileLeaderboard;
use sim::level::{Level, Quiz};
use sim::scene::Scene;
use sim::session::Session;
use ui::gamepad::{Dir, GamepadState};
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_logging(&config.log_path);
    let store = FileLeaderboard::new(&config.leaderboard_path);
    log::info!(
        "funquiz {} starting, leaderboard at {}",
        env!("CARGO_PKG_VERSION"),
        store.path().display(),
    );

    let scene = Scene::load(&config.scene);
    let quiz = Quiz::standard(&scene.layout, scene.asset.clone());
    let session = Session::new(quiz, Box::new(store));
    let mut app = AppState::new(
        session,
        scene,
        config.display.message_ticks,
        config.scoreboard_rows,
    );

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let result = game_loop(&mut app, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        log::error!("game loop stopped: {e}");
        eprintln!("Game error: {e}");
    }

    log::info!("exiting with score {}", app.session.score());
    println!();
    println!("Thanks for playing Fun Quiz!");
    println!("Final Score: {}", app.session.score());
}

/// Log to a file: stdout belongs to the alternate screen while playing.
/// Level comes from `RUST_LOG`, default `info`.
fn init_logging(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {e}; logging disabled", path.display());
            return;
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn game_loop(
    app: &mut AppState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> QuizResult<()> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let tick_rate = Duration::from_millis(config.display.tick_rate_ms);
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if kb.resized {
            renderer.invalidate()?;
        }

        let events = handle_input(app, sound, &kb, &gp);
        process_sound_events(sound, &events);
        if app.quit_requested {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        renderer.render(app)?;
        std::thread::sleep(FRAME_SLEEP);
    }
    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    let decided = events.iter().any(|e| matches!(e,
        GameEvent::AnswerCorrect { .. } | GameEvent::AnswerWrong { .. }
    ));
    for event in events {
        match event {
            GameEvent::SessionStarted { .. } => sfx.play_move(),
            GameEvent::AnswerCorrect { .. } => sfx.play_correct(),
            GameEvent::AnswerWrong { .. } => sfx.play_wrong(),
            // The verdict sound covers the final toggle.
            GameEvent::SelectionToggled { .. } if !decided => sfx.play_toggle(),
            GameEvent::TargetFound { .. } => sfx.play_found(),
            GameEvent::TargetMissed => sfx.play_miss(),
            _ => {}
        }
    }
}

// ── Key Constants ──

const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];

fn up(kb: &InputState, gp: &GamepadState) -> bool {
    kb.any_pressed(KEYS_UP) || gp.dir_pressed(Dir::Up)
}

fn down(kb: &InputState, gp: &GamepadState) -> bool {
    kb.any_pressed(KEYS_DOWN) || gp.dir_pressed(Dir::Down)
}

fn confirm(kb: &InputState, gp: &GamepadState) -> bool {
    kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed()
}

fn cancel(kb: &InputState, gp: &GamepadState) -> bool {
    kb.was_pressed(KeyCode::Esc) || gp.cancel_pressed()
}

/// One action per frame, so a key that changes the level cannot also act
/// on the level it lands in.
fn handle_input(
    app: &mut AppState,
    sound: Option<&SoundEngine>,
    kb: &InputState,
    gp: &GamepadState,
) -> Vec<GameEvent> {
    let blip = || if let Some(s) = sound { s.play_move() };

    match app.screen() {
        Screen::Menu => {
            if up(kb, gp) {
                app.move_menu(-1);
                blip();
            } else if down(kb, gp) {
                app.move_menu(1);
                blip();
            } else if confirm(kb, gp) {
                app.activate_menu(MENU_ITEMS[app.menu_cursor]);
            } else if kb.letter_pressed('q') || kb.was_pressed(KeyCode::Esc) {
                app.quit_requested = true;
            }
            vec![]
        }

        Screen::NamePrompt => {
            if kb.was_pressed(KeyCode::Enter) || gp.confirm_pressed() {
                return app.submit_name();
            }
            if cancel(kb, gp) {
                app.cancel_name();
                return vec![];
            }
            if kb.was_pressed(KeyCode::Backspace) {
                app.backspace();
            }
            for c in kb.typed_chars() {
                app.type_char(c);
            }
            vec![]
        }

        Screen::Scoreboard => {
            if confirm(kb, gp) || cancel(kb, gp) || kb.letter_pressed('q') {
                app.close_scoreboard();
            }
            vec![]
        }

        Screen::Level(Level::Level3) => {
            if cancel(kb, gp) {
                return app.abandon();
            }
            if let Some(&(col, row)) = kb.clicks.first() {
                return app.click_cell(col, row);
            }
            if confirm(kb, gp) {
                return app.fire_crosshair();
            }
            let dx = kb.any_pressed(KEYS_RIGHT) as i32 - kb.any_pressed(KEYS_LEFT) as i32;
            let dy = kb.any_pressed(KEYS_DOWN) as i32 - kb.any_pressed(KEYS_UP) as i32;
            let (dx, dy) = match gp.any_dir() {
                Some(Dir::Up) => (dx, dy - 1),
                Some(Dir::Down) => (dx, dy + 1),
                Some(Dir::Left) => (dx - 1, dy),
                Some(Dir::Right) => (dx + 1, dy),
                None => (dx, dy),
            };
            if dx != 0 || dy != 0 {
                app.move_crosshair(dx.signum(), dy.signum());
            }
            vec![]
        }

        Screen::Level(_) => {
            if cancel(kb, gp) {
                return app.abandon();
            }
            if let Some(&(_, row)) = kb.clicks.first() {
                return app.click_option_row(row);
            }
            if let Some(index) = kb.digit_pressed() {
                return app.choose_option(index);
            }
            if confirm(kb, gp) {
                return app.choose_option(app.option_cursor);
            }
            if up(kb, gp) {
                app.move_option(-1);
                blip();
            } else if down(kb, gp) {
                app.move_option(1);
                blip();
            }
            vec![]
        }
    }
}
