//! High score persistence.
//!
//! The score lives under a fixed key inside a small JSON object so the file can
//! carry other values without this module needing to know about them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

pub const HIGH_SCORE_KEY: &str = "snakeHighScore";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads and writes the single persisted high score.
pub trait HighScoreStore {
    /// `Ok(None)` when nothing usable is stored.
    fn load(&self) -> Result<Option<u32>, StoreError>;
    fn save(&mut self, score: u32) -> Result<(), StoreError>;
}

impl<S: HighScoreStore + ?Sized> HighScoreStore for Box<S> {
    fn load(&self) -> Result<Option<u32>, StoreError> {
        (**self).load()
    }

    fn save(&mut self, score: u32) -> Result<(), StoreError> {
        (**self).save(score)
    }
}

/// Keeps the score in memory only. Used when saving is turned off.
#[derive(Debug, Default)]
pub struct MemoryStore {
    score: Option<u32>,
}

impl MemoryStore {
    #[cfg(test)]
    pub fn with_score(score: u32) -> Self {
        MemoryStore { score: Some(score) }
    }
}

impl HighScoreStore for MemoryStore {
    fn load(&self) -> Result<Option<u32>, StoreError> {
        Ok(self.score)
    }

    fn save(&mut self, score: u32) -> Result<(), StoreError> {
        self.score = Some(score);
        Ok(())
    }
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonFileStore { path: path.as_ref().to_path_buf() }
    }

    /// `<data dir>/gridsnake/scores.json`, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("gridsnake"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scores.json")
    }

    fn read_map(&self) -> Result<Map<String, Value>, StoreError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_str(&json)? {
            Value::Object(map) => Ok(map),
            other => {
                log::warn!("Ignoring non-object score file {}: {}", self.path.display(), other);
                Ok(Map::new())
            }
        }
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

impl HighScoreStore for JsonFileStore {
    fn load(&self) -> Result<Option<u32>, StoreError> {
        let map = self.read_map()?;

        Ok(map.get(HIGH_SCORE_KEY).and_then(|value| {
            let score = value.as_u64().and_then(|n| u32::try_from(n).ok());
            if score.is_none() {
                log::warn!("Stored high score {} is not a valid score", value);
            }
            score
        }))
    }

    fn save(&mut self, score: u32) -> Result<(), StoreError> {
        // A corrupt file is replaced rather than blocking the save.
        let mut map = self.read_map().unwrap_or_else(|e| {
            log::warn!("Overwriting unreadable score file: {}", e);
            Map::new()
        });
        map.insert(HIGH_SCORE_KEY.to_string(), Value::from(score));

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(&Value::Object(map))?;
        fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }
}
