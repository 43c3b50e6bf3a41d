use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "arcade";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/arcade`, or the platform local data dir without `$HOME`.
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("scores.db"))
    }

    pub fn json_scores_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("scores.json"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("arcade.log"))
    }

    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("arcade_config.json"))
    }
}
