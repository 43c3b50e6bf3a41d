use anyhow::{anyhow, Context};
use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// What a best score measures, and which direction counts as better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum Metric {
    Time,
    Moves,
    Score,
}

impl Metric {
    /// Lower wins for `Time` and `Moves`, higher wins for `Score`.
    pub fn is_better(&self, candidate: i64, current: i64) -> bool {
        match self {
            Metric::Time | Metric::Moves => candidate < current,
            Metric::Score => candidate > current,
        }
    }

    fn key_suffix(&self) -> &'static str {
        match self {
            Metric::Time => "BestTime",
            Metric::Moves => "BestMoves",
            Metric::Score => "HighScore",
        }
    }
}

/// Storage key for a (game, metric) pair, e.g. `memoryGameBestTime`.
pub fn storage_key(game_key: &str, metric: Metric) -> String {
    format!("{}{}", game_key, metric.key_suffix())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestScoreRecord {
    pub game_key: String,
    pub metric: Metric,
    pub value: i64,
}

/// String key-value persistence behind the best-score store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// In-process store. `unavailable()` builds one that fails every call.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    available: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            entries: HashMap::new(),
            available: false,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        if !self.available {
            return Err(anyhow!("memory store unavailable"));
        }
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        if !self.available {
            return Err(anyhow!("memory store unavailable"));
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// SQLite-backed store, one row per key.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS best_scores (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }

    /// All stored (key, value, updated_at) rows ordered by key.
    pub fn entries(&self) -> rusqlite::Result<Vec<(String, String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM best_scores ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM best_scores WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("reading best score {key}"))?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO best_scores (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                params![key, value, Local::now().to_rfc3339()],
            )
            .with_context(|| format!("writing best score {key}"))?;
        Ok(())
    }
}

/// Single JSON object file of key/value strings.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let map = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(map)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut map = self.load()?;
        map.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&map)?)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

/// Best-score facade shared by every engine.
///
/// Cloning shares the underlying store. Storage failures never escape: `get`
/// reports absent and `offer` reports no update.
#[derive(Clone)]
pub struct BestScores {
    store: Rc<RefCell<dyn KeyValueStore>>,
}

impl std::fmt::Debug for BestScores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestScores").finish_non_exhaustive()
    }
}

impl Default for BestScores {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl BestScores {
    pub fn new<S: KeyValueStore + 'static>(store: S) -> Self {
        Self {
            store: Rc::new(RefCell::new(store)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Reads and parses a stored value. An unparsable value counts as absent; a
    /// store that cannot be read is an error.
    fn read(&self, key: &str) -> anyhow::Result<Option<i64>> {
        let store = self
            .store
            .try_borrow()
            .map_err(|e| anyhow!("best-score store busy: {e}"))?;
        match store.get(key)? {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(value) => Ok(Some(value)),
                Err(_) => {
                    debug!(%key, %raw, "ignoring unparsable best score");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn get(&self, game_key: &str, metric: Metric) -> Option<i64> {
        let key = storage_key(game_key, metric);
        self.read(&key).unwrap_or_else(|e| {
            warn!(%key, error = %e, "best-score store unavailable");
            None
        })
    }

    /// Stores `value` if nothing is recorded yet or it beats the record. A failed
    /// read never leads to a write.
    pub fn offer(&self, game_key: &str, metric: Metric, value: i64) -> bool {
        let key = storage_key(game_key, metric);
        match self.read(&key) {
            Ok(Some(current)) if !metric.is_better(value, current) => return false,
            Ok(_) => {}
            Err(e) => {
                warn!(%key, error = %e, "cannot read best score, not updating");
                return false;
            }
        }

        let mut store = match self.store.try_borrow_mut() {
            Ok(store) => store,
            Err(e) => {
                warn!(%key, error = %e, "best-score store busy");
                return false;
            }
        };
        match store.set(&key, &value.to_string()) {
            Ok(()) => {
                info!(game = game_key, %metric, value, "new best score");
                true
            }
            Err(e) => {
                warn!(%key, error = %e, "failed to persist best score");
                false
            }
        }
    }

    /// Every stored record for the given (game, metric) pairs.
    pub fn records(&self, keys: &[(&str, Metric)]) -> Vec<BestScoreRecord> {
        keys.iter()
            .filter_map(|&(game_key, metric)| {
                self.get(game_key, metric).map(|value| BestScoreRecord {
                    game_key: game_key.to_string(),
                    metric,
                    value,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn storage_keys_follow_game_naming() {
        assert_eq!(storage_key("bugSmasher", Metric::Score), "bugSmasherHighScore");
        assert_eq!(storage_key("memoryGame", Metric::Time), "memoryGameBestTime");
        assert_eq!(storage_key("memoryGame", Metric::Moves), "memoryGameBestMoves");
    }

    #[test]
    fn metric_ordering() {
        assert!(Metric::Time.is_better(10, 11));
        assert!(!Metric::Time.is_better(11, 11));
        assert!(Metric::Moves.is_better(3, 9));
        assert!(Metric::Score.is_better(12, 11));
        assert!(!Metric::Score.is_better(11, 11));
    }

    #[test]
    fn first_offer_always_wins() {
        let scores = BestScores::in_memory();
        assert_eq!(scores.get("g", Metric::Score), None);
        assert!(scores.offer("g", Metric::Score, 0));
        assert_eq!(scores.get("g", Metric::Score), Some(0));
    }

    #[test]
    fn offer_keeps_best_value() {
        let scores = BestScores::in_memory();
        let offers = [40, 12, 55, 55, 3, 54];
        let mut best = None;
        for v in offers {
            let updated = scores.offer("g", Metric::Score, v);
            let expected = best.map_or(true, |b| v > b);
            assert_eq!(updated, expected, "offer {v}");
            if expected {
                best = Some(v);
            }
        }
        assert_eq!(scores.get("g", Metric::Score), Some(55));

        for v in [30, 18, 18, 25, 12, 40] {
            scores.offer("g", Metric::Time, v);
        }
        assert_eq!(scores.get("g", Metric::Time), Some(12));
    }

    #[test]
    fn metrics_are_independent() {
        let scores = BestScores::in_memory();
        scores.offer("memoryGame", Metric::Time, 40);
        scores.offer("memoryGame", Metric::Moves, 9);
        assert_eq!(scores.get("memoryGame", Metric::Time), Some(40));
        assert_eq!(scores.get("memoryGame", Metric::Moves), Some(9));
        assert_eq!(scores.get("memoryGame", Metric::Score), None);
    }

    #[test]
    fn unavailable_store_degrades() {
        let scores = BestScores::new(MemoryStore::unavailable());
        assert!(!scores.offer("g", Metric::Score, 100));
        assert_eq!(scores.get("g", Metric::Score), None);
    }

    /// Holds records but fails every read.
    struct WriteOnlyStore(MemoryStore);

    impl KeyValueStore for WriteOnlyStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow!("read failed"))
        }

        fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
            self.0.set(key, value)
        }
    }

    #[test]
    fn failed_read_never_overwrites_record() {
        let mut inner = MemoryStore::new();
        inner.set("bugSmasherHighScore", "500").unwrap();
        let store = Rc::new(RefCell::new(WriteOnlyStore(inner)));
        let scores = BestScores {
            store: store.clone(),
        };

        assert!(!scores.offer("bugSmasher", Metric::Score, 10));
        assert_eq!(
            store.borrow().0.get("bugSmasherHighScore").unwrap(),
            Some("500".to_string())
        );
    }

    #[test]
    fn default_memory_store_is_usable() {
        let scores = BestScores::new(MemoryStore::default());
        assert!(scores.offer("g", Metric::Score, 1));
        assert_eq!(scores.get("g", Metric::Score), Some(1));
    }

    #[test]
    fn unparsable_value_is_absent() {
        let mut store = MemoryStore::new();
        store.set("gHighScore", "not-a-number").unwrap();
        let scores = BestScores::new(store);
        assert_eq!(scores.get("g", Metric::Score), None);
        assert!(scores.offer("g", Metric::Score, 1));
        assert_eq!(scores.get("g", Metric::Score), Some(1));
    }

    #[test]
    fn clones_share_the_store() {
        let scores = BestScores::in_memory();
        let other = scores.clone();
        other.offer("g", Metric::Moves, 7);
        assert_eq!(scores.get("g", Metric::Moves), Some(7));
    }

    #[test]
    fn records_lists_present_values_only() {
        let scores = BestScores::in_memory();
        scores.offer("a", Metric::Score, 5);
        let records = scores.records(&[("a", Metric::Score), ("b", Metric::Time)]);
        assert_eq!(
            records,
            vec![BestScoreRecord {
                game_key: "a".into(),
                metric: Metric::Score,
                value: 5
            }]
        );
    }

    #[test]
    fn sqlite_store_upserts() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("2".to_string()));

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "k");
        assert_eq!(entries[0].1, "2");
    }

    #[test]
    fn sqlite_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("scores.db");
        {
            let scores = BestScores::new(SqliteStore::open(&path).unwrap());
            assert!(scores.offer("bugSmasher", Metric::Score, 120));
        }
        let scores = BestScores::new(SqliteStore::open(&path).unwrap());
        assert_eq!(scores.get("bugSmasher", Metric::Score), Some(120));
        assert!(!scores.offer("bugSmasher", Metric::Score, 80));
    }

    #[test]
    fn json_store_roundtrips_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.json");
        let mut store = JsonFileStore::with_path(&path);
        assert_eq!(store.get("x").unwrap(), None);
        store.set("x", "3").unwrap();
        store.set("y", "4").unwrap();

        let reopened = JsonFileStore::with_path(&path);
        assert_eq!(reopened.get("x").unwrap(), Some("3".into()));
        assert_eq!(reopened.get("y").unwrap(), Some("4".into()));
    }

    #[test]
    fn corrupt_json_file_degrades() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(&path, b"{ not json").unwrap();
        let scores = BestScores::new(JsonFileStore::with_path(&path));
        assert_eq!(scores.get("g", Metric::Score), None);
        assert!(!scores.offer("g", Metric::Score, 9));
    }
}
