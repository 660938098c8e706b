//! Result storage
//!
//! Each run replaces the stored game set wholesale. Runs themselves are kept
//! as a log with their outcome.

use crate::rows::{GameRecord, YearSource};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub type RunId = u64;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Unknown run {0}")]
    UnknownRun(RunId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            _ => RunStatus::Running,
        }
    }
}

/// One processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: RunId,
    pub filename: String,
    pub document_date: Option<String>,
    pub status: RunStatus,
    pub game_count: Option<usize>,
    pub error: Option<String>,
    /// Unix seconds
    pub started_at: u64,
    pub finished_at: Option<u64>,
}

impl RunRecord {
    fn new(id: RunId, filename: &str, document_date: Option<&str>) -> Self {
        Self {
            id,
            filename: filename.to_string(),
            document_date: document_date.map(str::to_string),
            status: RunStatus::Running,
            game_count: None,
            error: None,
            started_at: unix_now(),
            finished_at: None,
        }
    }

    fn complete(&mut self, count: usize) {
        self.status = RunStatus::Completed;
        self.game_count = Some(count);
        self.finished_at = Some(unix_now());
    }

    fn fail(&mut self, error: &str) {
        self.status = RunStatus::Failed;
        self.error = Some(error.to_string());
        self.finished_at = Some(unix_now());
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Storage for extracted games and the run log
pub trait GameStore {
    /// Replace every stored game; all or nothing
    fn replace_all(&mut self, games: &[GameRecord]) -> Result<(), StoreError>;

    fn record_run(&mut self, filename: &str, document_date: Option<&str>)
        -> Result<RunId, StoreError>;

    fn mark_run_completed(&mut self, run: RunId, count: usize) -> Result<(), StoreError>;

    fn mark_run_failed(&mut self, run: RunId, error: &str) -> Result<(), StoreError>;

    fn games(&self) -> Result<Vec<GameRecord>, StoreError>;

    fn latest_run(&self) -> Result<Option<RunRecord>, StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    games: Vec<GameRecord>,
    runs: Vec<RunRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    fn run_mut(&mut self, run: RunId) -> Result<&mut RunRecord, StoreError> {
        self.runs
            .iter_mut()
            .find(|r| r.id == run)
            .ok_or(StoreError::UnknownRun(run))
    }
}

impl GameStore for MemoryStore {
    fn replace_all(&mut self, games: &[GameRecord]) -> Result<(), StoreError> {
        self.games = games.to_vec();
        Ok(())
    }

    fn record_run(
        &mut self,
        filename: &str,
        document_date: Option<&str>,
    ) -> Result<RunId, StoreError> {
        let id = self.runs.len() as RunId + 1;
        self.runs.push(RunRecord::new(id, filename, document_date));
        Ok(id)
    }

    fn mark_run_completed(&mut self, run: RunId, count: usize) -> Result<(), StoreError> {
        self.run_mut(run)?.complete(count);
        Ok(())
    }

    fn mark_run_failed(&mut self, run: RunId, error: &str) -> Result<(), StoreError> {
        self.run_mut(run)?.fail(error);
        Ok(())
    }

    fn games(&self) -> Result<Vec<GameRecord>, StoreError> {
        Ok(self.games.clone())
    }

    fn latest_run(&self) -> Result<Option<RunRecord>, StoreError> {
        Ok(self.runs.last().cloned())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// A directory holding `games.json` and `runs.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub const GAMES_FILE: &'static str = "games.json";
    pub const RUNS_FILE: &'static str = "runs.json";

    /// Open (and create if needed) the store directory
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn read<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, StoreError> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(T::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Write through a temp file and rename so readers never see half a file
    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{}.tmp", name));
        let data = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn update_run(
        &self,
        run: RunId,
        f: impl FnOnce(&mut RunRecord),
    ) -> Result<(), StoreError> {
        let mut runs: Vec<RunRecord> = self.read(Self::RUNS_FILE)?;
        let record = runs
            .iter_mut()
            .find(|r| r.id == run)
            .ok_or(StoreError::UnknownRun(run))?;
        f(record);
        self.write(Self::RUNS_FILE, &runs)
    }
}

impl GameStore for JsonFileStore {
    fn replace_all(&mut self, games: &[GameRecord]) -> Result<(), StoreError> {
        self.write(Self::GAMES_FILE, games)
    }

    fn record_run(
        &mut self,
        filename: &str,
        document_date: Option<&str>,
    ) -> Result<RunId, StoreError> {
        let mut runs: Vec<RunRecord> = self.read(Self::RUNS_FILE)?;
        let id = runs.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        runs.push(RunRecord::new(id, filename, document_date));
        self.write(Self::RUNS_FILE, &runs)?;
        Ok(id)
    }

    fn mark_run_completed(&mut self, run: RunId, count: usize) -> Result<(), StoreError> {
        self.update_run(run, |r| r.complete(count))
    }

    fn mark_run_failed(&mut self, run: RunId, error: &str) -> Result<(), StoreError> {
        self.update_run(run, |r| r.fail(error))
    }

    fn games(&self) -> Result<Vec<GameRecord>, StoreError> {
        self.read(Self::GAMES_FILE)
    }

    fn latest_run(&self) -> Result<Option<RunRecord>, StoreError> {
        let runs: Vec<RunRecord> = self.read(Self::RUNS_FILE)?;
        Ok(runs.into_iter().max_by_key(|r| r.id))
    }
}

// ============================================================================
// SQLite store
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS games (
                id            INTEGER PRIMARY KEY,
                field         TEXT NOT NULL,
                time          TEXT NOT NULL,
                team1         TEXT NOT NULL,
                team2         TEXT NOT NULL,
                year          TEXT NOT NULL,
                game_duration TEXT NOT NULL,
                game_type     TEXT NOT NULL,
                year_source   TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_games_field ON games(field);

            CREATE TABLE IF NOT EXISTS runs (
                id            INTEGER PRIMARY KEY,
                filename      TEXT NOT NULL,
                document_date TEXT,
                status        TEXT NOT NULL CHECK(status IN ('running','completed','failed')),
                game_count    INTEGER,
                error         TEXT,
                started_at    INTEGER NOT NULL,
                finished_at   INTEGER
            );
            ",
        )?;
        Ok(Self { conn })
    }

    fn finish_run(
        &self,
        run: RunId,
        status: RunStatus,
        count: Option<usize>,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, game_count = ?2, error = ?3, finished_at = ?4
             WHERE id = ?5",
            params![
                status.as_str(),
                count.map(|c| c as i64),
                error,
                unix_now() as i64,
                run as i64
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownRun(run));
        }
        Ok(())
    }
}

impl GameStore for SqliteStore {
    fn replace_all(&mut self, games: &[GameRecord]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM games", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO games
                 (field, time, team1, team2, year, game_duration, game_type, year_source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for g in games {
                stmt.execute(params![
                    g.field,
                    g.time,
                    g.team1,
                    g.team2,
                    g.year,
                    g.game_duration,
                    g.game_type,
                    g.year_source.as_str()
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn record_run(
        &mut self,
        filename: &str,
        document_date: Option<&str>,
    ) -> Result<RunId, StoreError> {
        self.conn.execute(
            "INSERT INTO runs (filename, document_date, status, started_at)
             VALUES (?1, ?2, 'running', ?3)",
            params![filename, document_date, unix_now() as i64],
        )?;
        Ok(self.conn.last_insert_rowid() as RunId)
    }

    fn mark_run_completed(&mut self, run: RunId, count: usize) -> Result<(), StoreError> {
        self.finish_run(run, RunStatus::Completed, Some(count), None)
    }

    fn mark_run_failed(&mut self, run: RunId, error: &str) -> Result<(), StoreError> {
        self.finish_run(run, RunStatus::Failed, None, Some(error))
    }

    fn games(&self) -> Result<Vec<GameRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT field, time, team1, team2, year, game_duration, game_type, year_source
             FROM games ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let source: String = row.get(7)?;
                Ok(GameRecord {
                    field: row.get(0)?,
                    time: row.get(1)?,
                    team1: row.get(2)?,
                    team2: row.get(3)?,
                    year: row.get(4)?,
                    game_duration: row.get(5)?,
                    game_type: row.get(6)?,
                    year_source: YearSource::parse(&source).unwrap_or(YearSource::Header),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn latest_run(&self) -> Result<Option<RunRecord>, StoreError> {
        let run = self
            .conn
            .query_row(
                "SELECT id, filename, document_date, status, game_count, error,
                        started_at, finished_at
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    let status: String = row.get(3)?;
                    let count: Option<i64> = row.get(4)?;
                    let started: i64 = row.get(6)?;
                    let finished: Option<i64> = row.get(7)?;
                    Ok(RunRecord {
                        id: row.get::<_, i64>(0)? as RunId,
                        filename: row.get(1)?,
                        document_date: row.get(2)?,
                        status: RunStatus::parse(&status),
                        game_count: count.map(|c| c as usize),
                        error: row.get(5)?,
                        started_at: started as u64,
                        finished_at: finished.map(|f| f as u64),
                    })
                },
            )
            .optional()?;
        Ok(run)
    }
}
