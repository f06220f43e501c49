//! Game-state persistence and the optional SQLite settlement-history export.
//!
//! [`GameRepo`] is the authoritative store: one JSON document per game,
//! keyed by [`GameId`]. [`FileGameRepo`] writes atomically (serialize to a
//! temp file, rename over the target) so a crash mid-write never leaves a
//! corrupt document behind. [`InMemoryGameRepo`] backs tests.
//!
//! [`export_settlement_history`] is a side door: it writes one row per
//! concluded day-ahead auction to a SQLite file for offline analysis. It
//! never participates in the authoritative round trip, and its failure must
//! never block gameplay.

use crate::error::{GameError, Result};
use crate::ids::GameId;
use crate::state::GameState;
use rusqlite::Connection;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One settlement row: a concluded day-ahead auction for one player.
#[derive(Debug, Clone)]
pub struct SettlementRow {
    pub game_id: i64,
    pub round: u32,
    pub player_id: i64,
    pub cashflow: f64,
}

/// Storage contract for authoritative game state.
pub trait GameRepo {
    fn save(&self, state: &GameState) -> Result<()>;
    fn load(&self, id: GameId) -> Result<Option<GameState>>;
    fn list(&self) -> Result<Vec<GameId>>;
    fn delete(&self, id: GameId) -> Result<()>;
}

/// A file-backed repo: one `<game_id>.json` per game under `root`.
pub struct FileGameRepo {
    root: PathBuf,
}

impl FileGameRepo {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(FileGameRepo { root })
    }

    fn path_for(&self, id: GameId) -> PathBuf {
        self.root.join(format!("{}.json", id.value()))
    }
}

impl GameRepo for FileGameRepo {
    fn save(&self, state: &GameState) -> Result<()> {
        let target = self.path_for(state.game_id);
        let tmp = target.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| GameError::PersistenceError(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    fn load(&self, id: GameId) -> Result<Option<GameState>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        let state = serde_json::from_str(&contents)
            .map_err(|e| GameError::PersistenceError(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        Ok(Some(state))
    }

    fn list(&self) -> Result<Vec<GameId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if let Ok(value) = stem.parse::<i64>() {
                        ids.push(GameId::new(value));
                    }
                }
            }
        }
        Ok(ids)
    }

    fn delete(&self, id: GameId) -> Result<()> {
        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// An in-memory repo for tests: no filesystem, no atomicity concerns.
#[derive(Default)]
pub struct InMemoryGameRepo {
    games: std::sync::Mutex<std::collections::HashMap<GameId, GameState>>,
}

impl InMemoryGameRepo {
    pub fn new() -> Self {
        InMemoryGameRepo { games: std::sync::Mutex::new(std::collections::HashMap::new()) }
    }
}

impl GameRepo for InMemoryGameRepo {
    fn save(&self, state: &GameState) -> Result<()> {
        self.games.lock().unwrap().insert(state.game_id, state.clone());
        Ok(())
    }

    fn load(&self, id: GameId) -> Result<Option<GameState>> {
        Ok(self.games.lock().unwrap().get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<GameId>> {
        Ok(self.games.lock().unwrap().keys().copied().collect())
    }

    fn delete(&self, id: GameId) -> Result<()> {
        self.games.lock().unwrap().remove(&id);
        Ok(())
    }
}

/// Appends one row per player to a `settlements` table in `db_path` for the
/// just-concluded auction. Creates the table and file if they don't exist
/// yet. Intentionally infallible to the caller's gameplay path: callers
/// should log a failure here, not propagate it into `handle_player_message`.
pub fn export_settlement_history(db_path: impl AsRef<Path>, rows: &[SettlementRow]) -> rusqlite::Result<()> {
    let conn = Connection::open(db_path)?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settlements (
            id INTEGER PRIMARY KEY,
            game_id INTEGER NOT NULL,
            round INTEGER NOT NULL,
            player_id INTEGER NOT NULL,
            cashflow REAL NOT NULL
        )",
        [],
    )?;
    let mut stmt =
        conn.prepare("INSERT INTO settlements (game_id, round, player_id, cashflow) VALUES (?1, ?2, ?3, ?4)")?;
    for row in rows {
        stmt.execute(rusqlite::params![row.game_id, row.round, row.player_id, row.cashflow])?;
    }
    Ok(())
}
