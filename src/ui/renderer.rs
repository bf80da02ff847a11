/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// Each frame:
///   1. Compose the current screen into `front`
///   2. Compare with `back` (the previous frame) cell by cell
///   3. Queue commands only for changed cells, flush once
///   4. Swap front/back
///
/// The Level 3 picture uses upper half blocks: fg = top pixel, bg = bottom
/// pixel, so one terminal row shows two scene rows. The renderer records
/// where the picture and the option lines landed in `AppState` so that
/// mouse clicks can be mapped back.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::challenge::{Challenge, QuizOption};
use crate::sim::app::{AppState, Screen, MENU_ITEMS};
use crate::sim::level::Level;
use crate::sim::scene::SceneViewport;

// ── Palette ──

const BASE_BG: Color = Color::Rgb { r: 18, g: 24, b: 20 };
const TITLE: Color = Color::Rgb { r: 255, g: 200, b: 60 };
const HI: Color = Color::Rgb { r: 90, g: 230, b: 110 };
const TEXT: Color = Color::Rgb { r: 220, g: 220, b: 220 };
const DIM: Color = Color::Rgb { r: 110, g: 120, b: 110 };
const SEL_BG: Color = Color::Rgb { r: 40, g: 70, b: 45 };
const BAR_BG: Color = Color::Rgb { r: 200, g: 180, b: 60 };

// ── Cell / FrameBuffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BLANK: Cell = Cell { ch: ' ', fg: TEXT, bg: BASE_BG };

    /// Never produced by compose, so every position is repainted.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };
}

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell { ch, fg, bg });
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell { ch: ' ', fg: Color::Black, bg });
        }
    }
}

// ── Layout ──

const HUD_ROW: usize = 0;
const PROMPT_ROW: usize = 2;
const OPTIONS_ROW: usize = 4;
const PICTURE_ROW: usize = 3;
/// Rows kept free under the picture: gap, message bar, help line.
const FOOTER_ROWS: usize = 3;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<Screen>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(BASE_BG),
            Clear(ClearType::All)
        )?;
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            DisableMouseCapture,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Repaint every cell on the next frame.
    pub fn invalidate(&mut self) -> io::Result<()> {
        self.back.cells.fill(Cell::INVALID);
        queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))
    }

    pub fn render(&mut self, app: &mut AppState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.invalidate()?;
        }

        let screen = app.screen();
        if self.last_screen != Some(screen) {
            self.invalidate()?;
            self.last_screen = Some(screen);
        }

        self.front.clear();
        self.compose_hud(app);
        match screen {
            Screen::Menu => self.compose_menu(app),
            Screen::NamePrompt => self.compose_name_prompt(app),
            Screen::Scoreboard => self.compose_scoreboard(app),
            Screen::Level(Level::Level3) => self.compose_spot(app),
            Screen::Level(_) => self.compose_options(app),
        }
        self.compose_footer(app, screen);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = TEXT;
        let mut last_bg = BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(TEXT), SetBackgroundColor(BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }
        self.writer.flush()
    }

    // ── Compose ──

    fn compose_hud(&mut self, app: &AppState) {
        let state = app.session.state();
        let level = match state.level.number() {
            Some(n) => format!("Level {n}/3"),
            None => "Menu".to_string(),
        };
        let mut hud = format!(" FUN QUIZ   {level}   Score: {}", state.score);
        if state.level != Level::Menu {
            hud.push_str(&format!("   Player: {}", state.player_name));
        }
        self.front.put_str(0, HUD_ROW, &hud, TITLE, BASE_BG);
    }

    fn compose_menu(&mut self, app: &AppState) {
        let banner = [
            r"  ___              ___       _    ",
            r" | __|_  _  _ _   / _ \ _  _(_)___",
            r" | _|| || || ' \ | (_) | || | |_ /",
            r" |_|  \_,_||_||_| \__\_\\_,_|_/__|",
        ];
        for (i, line) in banner.iter().enumerate() {
            self.front.put_str(4, 2 + i, line, TITLE, BASE_BG);
        }

        let base = 8;
        for (i, item) in MENU_ITEMS.iter().enumerate() {
            let selected = i == app.menu_cursor;
            let (marker, fg, bg) = if selected { ("▸ ", HI, SEL_BG) } else { ("  ", TEXT, BASE_BG) };
            self.front.put_str(8, base + i * 2, &format!("{marker}{:<10}", item.label()), fg, bg);
        }
    }

    fn compose_name_prompt(&mut self, app: &AppState) {
        self.compose_menu(app);

        let (x, y, w) = (6, 8, 40);
        for row in y..y + 5 {
            for col in x..x + w {
                self.front.set(col, row, Cell { ch: ' ', fg: TEXT, bg: SEL_BG });
            }
        }
        self.front.put_str(x + 2, y + 1, "Enter your name:", TITLE, SEL_BG);
        let blink = (app.anim_tick / 8) % 2 == 0;
        let caret = if blink { "_" } else { " " };
        self.front.put_str(x + 2, y + 3, &format!("> {}{caret}", app.name_buffer), TEXT, SEL_BG);
    }

    fn compose_scoreboard(&mut self, app: &AppState) {
        self.front.put_str(4, PROMPT_ROW, "High Scores (fastest first)", TITLE, BASE_BG);
        let current = format!("Your score: {}", app.session.score());
        self.front.put_str(36, PROMPT_ROW, &current, HI, BASE_BG);
        self.front.put_str(4, PROMPT_ROW + 2, &format!("{:<6}{:<26}{:>10}", "Rank", "Name", "Time"), DIM, BASE_BG);

        if app.scoreboard.is_empty() {
            self.front.put_str(4, PROMPT_ROW + 4, "No scores yet. Be the first!", TEXT, BASE_BG);
            return;
        }
        let room = self.front.height.saturating_sub(PROMPT_ROW + 3 + FOOTER_ROWS);
        let shown = app.scoreboard.iter().take(app.scoreboard_rows.min(room));
        for (i, rec) in shown.enumerate() {
            let fg = if i == 0 { HI } else { TEXT };
            let line = format!("{:<6}{:<26}{:>9.2}s", i + 1, rec.name(), rec.elapsed_seconds());
            self.front.put_str(4, PROMPT_ROW + 3 + i, &line, fg, BASE_BG);
        }
    }

    /// Level 1 and Level 2: prompt plus a numbered option list.
    fn compose_options(&mut self, app: &mut AppState) {
        let challenge = match app.session.current_challenge() {
            Some(c) => c,
            None => return,
        };
        self.front.put_str(4, PROMPT_ROW, challenge.prompt(), TITLE, BASE_BG);

        let multi = match challenge {
            Challenge::MultiChoice { required, .. } => Some(*required),
            _ => None,
        };
        let options: Vec<QuizOption> = challenge.options().to_vec();

        app.option_rows.clear();
        for (i, opt) in options.iter().enumerate() {
            let row = OPTIONS_ROW + i;
            let focused = i == app.option_cursor;
            let check = match multi {
                Some(_) if app.session.is_selected(opt.id) => "[x] ",
                Some(_) => "[ ] ",
                None => "",
            };
            let (fg, bg) = if focused { (HI, SEL_BG) } else { (TEXT, BASE_BG) };
            let line = format!(" {}  {check}{:<20}", i + 1, opt.label);
            self.front.put_str(6, row, &line, fg, bg);
            app.option_rows.push((row as u16, opt.id));
        }

        if let Some(required) = multi {
            let count = app.session.state().selections.len();
            let note = format!("Selected {count} of {required}");
            self.front.put_str(6, OPTIONS_ROW + options.len() + 1, &note, DIM, BASE_BG);
        }
    }

    fn compose_spot(&mut self, app: &mut AppState) {
        if let Some(c) = app.session.current_challenge() {
            self.front.put_str(4, PROMPT_ROW, c.prompt(), TITLE, BASE_BG);
        }

        let max_rows = self.front.height.saturating_sub(PICTURE_ROW + FOOTER_ROWS);
        let vp = SceneViewport::fit(
            self.front.width as u16,
            PICTURE_ROW as u16,
            max_rows as u16,
            app.scene.width(),
            app.scene.height(),
        );
        app.viewport = vp;
        if vp.is_empty() || max_rows == 0 {
            return;
        }

        let (w, h) = (vp.scene_w as u64, vp.scene_h as u64);
        let (cols, rows) = (vp.cols as u64, vp.rows as u64);
        for r in 0..rows {
            // Sample the centres of the upper and lower halves of the cell.
            let y_top = ((4 * r + 1) * h / (4 * rows)) as u32;
            let y_bot = ((4 * r + 3) * h / (4 * rows)) as u32;
            for c in 0..cols {
                let x = ((2 * c + 1) * w / (2 * cols)) as u32;
                let [tr, tg, tb] = app.scene.color_at(x, y_top);
                let [br, bg, bb] = app.scene.color_at(x, y_bot);
                self.front.set(
                    vp.col as usize + c as usize,
                    vp.row as usize + r as usize,
                    Cell {
                        ch: '▀',
                        fg: Color::Rgb { r: tr, g: tg, b: tb },
                        bg: Color::Rgb { r: br, g: bg, b: bb },
                    },
                );
            }
        }

        if let Some((cx, cy)) = vp.to_cell(app.crosshair.0, app.crosshair.1) {
            let blink = (app.anim_tick / 6) % 2 == 0;
            let (fg, bg) = if blink { (Color::Black, Color::White) } else { (Color::White, Color::Black) };
            self.front.set(cx as usize, cy as usize, Cell { ch: '+', fg, bg });
        }
    }

    fn compose_footer(&mut self, app: &AppState, screen: Screen) {
        let h = self.front.height;
        if h < 3 {
            return;
        }

        if !app.message.is_empty() {
            let row = h - 2;
            self.front.fill_row(row, BAR_BG);
            self.front.put_str(0, row, &format!(" ◈ {} ", app.message), Color::Black, BAR_BG);
        }

        let help = match screen {
            Screen::Menu => " ↑↓ Move   Enter Select   Q Quit",
            Screen::NamePrompt => " Type your name   Enter Start   Esc Cancel",
            Screen::Scoreboard => " Enter / Esc Back",
            Screen::Level(Level::Level2) => " ↑↓ Move   Enter/Space Toggle   1-9 Pick   Click   Esc Give up",
            Screen::Level(Level::Level3) => " Click the picture, or arrows + Enter   Esc Give up",
            Screen::Level(_) => " ↑↓ Move   Enter Answer   1-9 Pick   Click   Esc Give up",
        };
        self.front.put_str(0, h - 1, help, DIM, BASE_BG);
    }
}
