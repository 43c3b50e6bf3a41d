use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::games::GameKind;
use crate::score::{BestScores, JsonFileStore, MemoryStore, SqliteStore};

/// Where best scores are kept.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Json,
    Memory,
}

impl StoreBackend {
    /// Opens the backend at `path` (or its default location). A durable backend that
    /// cannot be opened falls back to memory so games stay playable.
    pub fn open(&self, path: Option<&Path>) -> BestScores {
        match self {
            StoreBackend::Sqlite => {
                let path = path.map(Path::to_path_buf).or_else(AppDirs::db_path);
                match path.map(SqliteStore::open) {
                    Some(Ok(store)) => BestScores::new(store),
                    Some(Err(e)) => {
                        warn!(error = %e, "cannot open score database, using memory");
                        BestScores::in_memory()
                    }
                    None => {
                        warn!("no state directory, using memory for scores");
                        BestScores::in_memory()
                    }
                }
            }
            StoreBackend::Json => {
                match path.map(Path::to_path_buf).or_else(AppDirs::json_scores_path) {
                    Some(p) => BestScores::new(JsonFileStore::with_path(p)),
                    None => {
                        warn!("no state directory, using memory for scores");
                        BestScores::in_memory()
                    }
                }
            }
            StoreBackend::Memory => BestScores::new(MemoryStore::new()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_game: GameKind,
    pub backend: StoreBackend,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_game: GameKind::Typing,
            backend: StoreBackend::Sqlite,
            seed: None,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => warn!(path = %self.path.display(), error = %e, "ignoring bad config"),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Metric;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
        let cfg = Config {
            default_game: GameKind::BugSmasher,
            backend: StoreBackend::Json,
            seed: Some(42),
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn missing_or_corrupt_config_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"{{{").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "default_game": "memory" }"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.default_game, GameKind::Memory);
        assert_eq!(cfg.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn backends_open_at_explicit_paths() {
        let dir = tempdir().unwrap();
        for (backend, file) in [(StoreBackend::Sqlite, "s.db"), (StoreBackend::Json, "s.json")] {
            let path = dir.path().join(file);
            let scores = backend.open(Some(&path));
            assert!(scores.offer("g", Metric::Score, 3));
            let reopened = backend.open(Some(&path));
            assert_eq!(reopened.get("g", Metric::Score), Some(3), "{backend}");
        }
    }

    #[test]
    fn memory_backend_is_not_durable() {
        let first = StoreBackend::Memory.open(None);
        first.offer("g", Metric::Score, 3);
        assert_eq!(StoreBackend::Memory.open(None).get("g", Metric::Score), None);
    }
}
