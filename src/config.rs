/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Runs before logging is set up, so problems go to stderr.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "funquiz";

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub display: DisplayConfig,
    pub scene: SceneConfig,
    pub gamepad: GamepadConfig,
    pub leaderboard_path: PathBuf,
    pub log_path: PathBuf,
    pub scoreboard_rows: usize,
}

#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub tick_rate_ms: u64,
    pub message_ticks: u32,  // how long a status message stays up
}

#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub background: PathBuf,
    pub overlay: PathBuf,
    /// Used when the image files cannot be read.
    pub fallback_background: (u32, u32),
    pub fallback_overlay: (u32, u32),
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    display: TomlDisplay,
    #[serde(default)]
    scene: TomlScene,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_leaderboard_file")]
    leaderboard_file: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_scoreboard_rows")]
    scoreboard_rows: usize,
}

#[derive(Deserialize, Debug)]
struct TomlDisplay {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_message_ticks")]
    message_ticks: u32,
}

#[derive(Deserialize, Debug)]
struct TomlScene {
    #[serde(default = "default_background")]
    background: String,
    #[serde(default = "default_overlay")]
    overlay: String,
    #[serde(default = "default_bg_size")]
    background_width: u32,
    #[serde(default = "default_bg_size")]
    background_height: u32,
    #[serde(default = "default_ov_size")]
    overlay_width: u32,
    #[serde(default = "default_ov_size")]
    overlay_height: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

// ── Defaults ──

fn default_leaderboard_file() -> String { "scores.txt".into() }
fn default_log_file() -> String { "funquiz.log".into() }
fn default_scoreboard_rows() -> usize { 10 }
fn default_tick_rate() -> u64 { 50 }
fn default_message_ticks() -> u32 { 40 }  // 2s at 50ms tick
fn default_background() -> String { "forrest.png".into() }
fn default_overlay() -> String { "monkey.png".into() }
fn default_bg_size() -> u32 { 100 }
fn default_ov_size() -> u32 { 12 }
fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["B".into(), "Select".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            leaderboard_file: default_leaderboard_file(),
            log_file: default_log_file(),
            scoreboard_rows: default_scoreboard_rows(),
        }
    }
}

impl Default for TomlDisplay {
    fn default() -> Self {
        TomlDisplay {
            tick_rate_ms: default_tick_rate(),
            message_ticks: default_message_ticks(),
        }
    }
}

impl Default for TomlScene {
    fn default() -> Self {
        TomlScene {
            background: default_background(),
            overlay: default_overlay(),
            background_width: default_bg_size(),
            background_height: default_bg_size(),
            overlay_width: default_ov_size(),
            overlay_height: default_ov_size(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs, &data_dir())
    }

    fn resolve(cfg: TomlConfig, search_dirs: &[PathBuf], data_dir: &Path) -> Self {
        GameConfig {
            display: DisplayConfig {
                tick_rate_ms: cfg.display.tick_rate_ms.max(1),
                message_ticks: cfg.display.message_ticks,
            },
            scene: SceneConfig {
                background: find_asset(&cfg.scene.background, search_dirs),
                overlay: find_asset(&cfg.scene.overlay, search_dirs),
                fallback_background: (cfg.scene.background_width, cfg.scene.background_height),
                fallback_overlay: (cfg.scene.overlay_width, cfg.scene.overlay_height),
            },
            gamepad: GamepadConfig {
                confirm: cfg.gamepad.confirm,
                cancel: cfg.gamepad.cancel,
            },
            leaderboard_path: in_data_dir(&cfg.general.leaderboard_file, data_dir),
            log_path: in_data_dir(&cfg.general.log_file, data_dir),
            scoreboard_rows: cfg.general.scoreboard_rows.max(1),
        }
    }
}

fn in_data_dir(name: &str, data_dir: &Path) -> PathBuf {
    let p = PathBuf::from(name);
    if p.is_absolute() { p } else { data_dir.join(p) }
}

/// First existing match in the search dirs, else the path as given (CWD-relative).
fn find_asset(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let p = PathBuf::from(name);
    if p.is_absolute() {
        return p;
    }
    search_dirs.iter()
        .map(|d| d.join(&p))
        .find(|c| c.is_file())
        .unwrap_or(p)
}

/// Where the leaderboard and log live.
pub fn data_dir() -> PathBuf {
    // 1. Exe directory, if writable (portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let test_path = parent.join(".write_test_funquiz");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home for system installs
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share").join(APP_DIR);
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. Fallback to CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.contains(&cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share").join(APP_DIR);
        if xdg.is_dir() && !dirs.contains(&xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share").join(APP_DIR);
    if sys.is_dir() && !dirs.contains(&sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text),
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Warning: config.toml parse error: {e}");
            eprintln!("Using default settings.");
            TomlConfig::default()
        }
    }
}
