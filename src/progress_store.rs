use std::{
    cmp::Reverse,
    collections::{HashMap, HashSet},
    fmt, fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use color_eyre::eyre::{Context, Result, eyre};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    log_util::log_debug,
    output_manager::OutputManager,
    question_bank::{Chapter, Mode},
    quiz_engine::HistoryEntry,
};

const DATABASE_FILENAME: &str = "groundschool.sqlite";
pub const HISTORY_KEY: &str = "quizHistory";

pub fn answered_key(mode: Mode, chapter: Chapter) -> String {
    format!("answeredQuestions-{}-{}", mode.key(), chapter)
}

/// Key-value persistence for history and practice progress. Last write wins.
pub trait ProgressStore: fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<S: ProgressStore + ?Sized> ProgressStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryProgressStore {
    values: HashMap<String, String>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Progress kept in a single SQLite table under the data directory.
#[derive(Debug)]
pub struct SqliteProgressStore {
    connection: Connection,
    path: PathBuf,
}

impl SqliteProgressStore {
    pub fn open_default() -> Result<Self> {
        let db_path = database_path()?;
        Self::open_at_path(&db_path)
    }

    pub fn open_at_path(db_path: &Path) -> Result<Self> {
        let connection = connection_for_path(db_path)?;
        initialize_schema(&connection)?;
        Ok(Self {
            connection,
            path: db_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for SqliteProgressStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.connection
            .query_row(
                "SELECT value FROM progress WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .wrap_err_with(|| format!("failed to read progress key {}", key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.connection
            .execute(
                "INSERT OR REPLACE INTO progress (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, &now],
            )
            .wrap_err_with(|| format!("failed to write progress key {}", key))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.connection
            .execute("DELETE FROM progress WHERE key = ?1", params![key])
            .wrap_err_with(|| format!("failed to remove progress key {}", key))?;
        Ok(())
    }
}

fn initialize_schema(connection: &Connection) -> Result<()> {
    connection
        .execute(
            "CREATE TABLE IF NOT EXISTS progress (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .wrap_err("failed to create progress table")?;
    Ok(())
}

fn database_path() -> Result<PathBuf> {
    let manager = OutputManager::new();
    let mut output_dir = manager.output_directory().map_err(|err| eyre!(err))?;
    fs::create_dir_all(&output_dir).wrap_err_with(|| {
        format!(
            "failed to create data directory at {}",
            output_dir.display()
        )
    })?;
    output_dir.push(DATABASE_FILENAME);
    Ok(output_dir)
}

fn connection_for_path(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| {
            format!(
                "failed to create directory for progress store at {}",
                parent.display()
            )
        })?;
    }

    Connection::open(db_path)
        .wrap_err_with(|| format!("failed to open progress store at {}", db_path.display()))
}

/// Read a JSON value, treating absent or unparsable data as the default.
fn read_json<T, S>(store: &S, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
    S: ProgressStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            log_debug("ProgressStore", &format!(
                "ignoring malformed value for {}: {}",
                key, err
            ));
            Ok(T::default())
        }
    }
}

fn write_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: ProgressStore + ?Sized,
{
    let serialized = serde_json::to_string(value)
        .wrap_err_with(|| format!("failed to serialise value for {}", key))?;
    store.set(key, &serialized)
}

/// History entries in the order they were appended.
pub fn load_history<S: ProgressStore + ?Sized>(store: &S) -> Result<Vec<HistoryEntry>> {
    read_json(store, HISTORY_KEY)
}

pub fn append_history<S: ProgressStore + ?Sized>(store: &mut S, entry: &HistoryEntry) -> Result<()> {
    let mut history = load_history(&*store)?;
    history.push(entry.clone());
    write_json(store, HISTORY_KEY, &history)?;
    log_debug("ProgressStore", &format!(
        "appended history entry ({} total)",
        history.len()
    ));
    Ok(())
}

/// History entries newest first. Entries sharing a timestamp keep their insertion order.
pub fn list_history<S: ProgressStore + ?Sized>(store: &S) -> Result<Vec<HistoryEntry>> {
    let mut history = load_history(store)?;
    history.sort_by_key(|entry| Reverse(entry.timestamp));
    Ok(history)
}

pub fn clear_history<S: ProgressStore + ?Sized>(store: &mut S) -> Result<()> {
    store.remove(HISTORY_KEY)?;
    log_debug("ProgressStore", "cleared history");
    Ok(())
}

pub fn answered_set<S: ProgressStore + ?Sized>(
    store: &S,
    mode: Mode,
    chapter: Chapter,
) -> Result<HashSet<u32>> {
    let ids: Vec<u32> = read_json(store, &answered_key(mode, chapter))?;
    Ok(ids.into_iter().collect())
}

pub fn answered_count<S: ProgressStore + ?Sized>(
    store: &S,
    mode: Mode,
    chapter: Chapter,
) -> Result<usize> {
    Ok(answered_set(store, mode, chapter)?.len())
}

pub fn record_answered<S: ProgressStore + ?Sized>(
    store: &mut S,
    mode: Mode,
    chapter: Chapter,
    question_id: u32,
) -> Result<()> {
    let key = answered_key(mode, chapter);
    let mut ids: Vec<u32> = read_json(&*store, &key)?;
    if !ids.contains(&question_id) {
        ids.push(question_id);
    }
    write_json(store, &key, &ids)
}

pub fn clear_chapter_progress<S: ProgressStore + ?Sized>(
    store: &mut S,
    mode: Mode,
    chapter: Chapter,
) -> Result<()> {
    store.remove(&answered_key(mode, chapter))?;
    log_debug("ProgressStore", &format!(
        "cleared {} chapter {} progress",
        mode, chapter
    ));
    Ok(())
}
