/// Leaderboard persistence: append-only flat file.
///
/// ## File format:
///   One record per line: `<name>,<elapsed_seconds>`
///   Elapsed time is written with two decimals. Names cannot contain ','.
///
/// ## Rules:
///   - Appends open the file in append mode; existing lines are never rewritten.
///   - A missing file is an empty leaderboard.
///   - A malformed line (including one that is not valid UTF-8) is reported
///     as `CorruptRecord`, logged and skipped. The rest of the file still loads.
///   - Names are stored and read back exactly; only the time field tolerates
///     surrounding whitespace.
///
/// The session owns its store, so all appends go through a single writer.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::domain::score::{self, ScoreRecord, DELIMITER};
use crate::error::{QuizError, QuizResult};

/// Storage seam for completed runs.
pub trait ScoreStore {
    /// Durably add one record after all existing ones.
    fn append(&mut self, record: &ScoreRecord) -> QuizResult<()>;

    /// Every readable record, in file order.
    fn load_all(&self) -> QuizResult<Vec<ScoreRecord>>;
}

// ══════════════════════════════════════════════════════════════
// File-backed store
// ══════════════════════════════════════════════════════════════

pub struct FileLeaderboard {
    path: PathBuf,
}

impl FileLeaderboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileLeaderboard { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreStore for FileLeaderboard {
    fn append(&mut self, record: &ScoreRecord) -> QuizResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(serialize_record(record).as_bytes())?;
        file.sync_all()?;
        log::info!(
            "leaderboard: appended {} ({:.2}s) to {}",
            record.name(), record.elapsed_seconds(), self.path.display(),
        );
        Ok(())
    }

    fn load_all(&self) -> QuizResult<Vec<ScoreRecord>> {
        let content = match std::fs::read(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        let (records, corrupt) = parse_leaderboard(&content);
        for err in &corrupt {
            log::warn!("{}: {err}", self.path.display());
        }
        Ok(records)
    }
}

/// Records sorted ascending by elapsed time (ties keep file order).
pub fn sorted(store: &dyn ScoreStore) -> QuizResult<Vec<ScoreRecord>> {
    let mut records = store.load_all()?;
    score::sort_by_elapsed(&mut records);
    Ok(records)
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

pub fn serialize_record(record: &ScoreRecord) -> String {
    format!("{}{}{:.2}\n", record.name(), DELIMITER, record.elapsed_seconds())
}

/// Parse one line. `line_no` is 1-based, for error reporting.
pub fn parse_record(line_no: usize, line: &str) -> QuizResult<ScoreRecord> {
    let corrupt = |reason: String| QuizError::CorruptRecord { line: line_no, reason };

    let fields: Vec<&str> = line.split(DELIMITER).collect();
    if fields.len() != 2 {
        return Err(corrupt(format!("expected 2 fields, found {}", fields.len())));
    }
    let name = fields[0];
    if name.trim().is_empty() {
        return Err(corrupt("empty name".into()));
    }
    let elapsed: f64 = fields[1].trim().parse()
        .map_err(|_| corrupt(format!("non-numeric time {:?}", fields[1].trim())))?;
    if !elapsed.is_finite() || elapsed < 0.0 {
        return Err(corrupt(format!("invalid time {elapsed}")));
    }
    ScoreRecord::new(name, elapsed).map_err(|e| corrupt(e.to_string()))
}

/// Parse a whole file. Lines are decoded one at a time, so a damaged line
/// cannot hide the others. Blank lines are ignored; bad lines are returned
/// separately so the caller decides how loudly to report them.
pub fn parse_leaderboard(content: &[u8]) -> (Vec<ScoreRecord>, Vec<QuizError>) {
    let mut records = vec![];
    let mut corrupt = vec![];
    for (idx, raw) in content.split(|&b| b == b'\n').enumerate() {
        let line_no = idx + 1;
        let line = match std::str::from_utf8(raw) {
            Ok(l) => l.trim_end_matches('\r'),
            Err(_) => {
                corrupt.push(QuizError::CorruptRecord { line: line_no, reason: "invalid UTF-8".into() });
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(line_no, line) {
            Ok(r) => records.push(r),
            Err(e) => corrupt.push(e),
        }
    }
    (records, corrupt)
}

// ══════════════════════════════════════════════════════════════
// In-memory store for tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
#[derive(Default)]
pub struct MemoryLeaderboard {
    pub records: Vec<ScoreRecord>,
    pub fail_writes: bool,
}

#[cfg(test)]
impl ScoreStore for MemoryLeaderboard {
    fn append(&mut self, record: &ScoreRecord) -> QuizResult<()> {
        if self.fail_writes {
            return Err(std::io::Error::new(ErrorKind::Other, "disk full").into());
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn load_all(&self) -> QuizResult<Vec<ScoreRecord>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "funquiz-board-{}-{}", std::process::id(), tag,
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("scores.txt")
    }

    fn rec(name: &str, secs: f64) -> ScoreRecord {
        ScoreRecord::new(name, secs).unwrap()
    }

    #[test]
    fn missing_file_is_empty() {
        let store = FileLeaderboard::new(temp_path("missing"));
        assert!(store.load_all().unwrap().is_empty());
        assert!(sorted(&store).unwrap().is_empty());
    }

    #[test]
    fn append_then_load_returns_all() {
        let path = temp_path("roundtrip");
        let mut store = FileLeaderboard::new(&path);
        let input = vec![rec("Ann", 12.5), rec("Bob", 3.25), rec("Cy", 7.0)];
        for r in &input {
            store.append(r).unwrap();
        }
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, input);

        let names: Vec<String> = sorted(&store).unwrap().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["Bob", "Cy", "Ann"]);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn append_never_rewrites_existing_lines() {
        let path = temp_path("append-only");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "Old,1.00\n").unwrap();

        let mut store = FileLeaderboard::new(&path);
        store.append(&rec("New", 2.0)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Old,1.00\nNew,2.00\n");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn time_written_with_two_decimals() {
        assert_eq!(serialize_record(&rec("Ann", 4.0)), "Ann,4.00\n");
        assert_eq!(serialize_record(&rec("Ann", 4.256)), "Ann,4.26\n");
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let content = "Ann,4.00\n\nno-comma\nBob,abc\nCy,1,2\n,3.0\nDee,-1\nEve,2.5\r\n";
        let (records, corrupt) = parse_leaderboard(content.as_bytes());
        let names: Vec<&str> = records.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["Ann", "Eve"]);
        assert_eq!(corrupt.len(), 5);
        match &corrupt[0] {
            QuizError::CorruptRecord { line, .. } => assert_eq!(*line, 3),
            other => panic!("expected CorruptRecord, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_file_still_loads_good_lines() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "Ann,4.00\ngarbage\nBob,1.50\n").unwrap();

        let store = FileLeaderboard::new(&path);
        let sorted = sorted(&store).unwrap();
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].name(), "Bob");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let path = temp_path("utf8");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"Ann,4.00\nBo\xffb,1.00\nCy,2.00\n").unwrap();

        let store = FileLeaderboard::new(&path);
        let names: Vec<String> = store.load_all().unwrap().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["Ann", "Cy"]);

        let (_, corrupt) = parse_leaderboard(b"Ann,4.00\nBo\xffb,1.00\n");
        match &corrupt[..] {
            [QuizError::CorruptRecord { line, reason }] => {
                assert_eq!(*line, 2);
                assert_eq!(reason, "invalid UTF-8");
            }
            other => panic!("expected one CorruptRecord, got {other:?}"),
        }

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn names_read_back_exactly_as_written() {
        let written = rec(" Ann Lee ", 3.0);
        let line = serialize_record(&written);
        let read = parse_record(1, line.trim_end_matches('\n')).unwrap();
        assert_eq!(read.name(), " Ann Lee ");
        assert_eq!(read, written);

        // The time field may carry stray spaces.
        assert_eq!(parse_record(1, "Bob, 2.50 ").unwrap().elapsed_seconds(), 2.5);
    }

    #[test]
    fn sort_keeps_file_order_on_ties() {
        let mut store = MemoryLeaderboard::default();
        store.append(&rec("first", 5.0)).unwrap();
        store.append(&rec("fast", 1.0)).unwrap();
        store.append(&rec("second", 5.0)).unwrap();
        let names: Vec<String> = sorted(&store).unwrap().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["fast", "first", "second"]);
    }
}
