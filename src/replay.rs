//! Records every inbound message the manager accepted, tagged with the
//! round and phase it was applied in, so a game can be replayed from its
//! initial settings for debugging or as a test fixture.
//!
//! Because engine logic is deterministic and all sampling is seeded from
//! `(game_id, round, asset_id)`, replaying a logged sequence against a fresh
//! initial state (same `game_id`, same settings) reproduces the exact same
//! state trace, modulo solver numerical tolerance.

use crate::error::{GameError, Result};
use crate::ids::{GameId, Round};
use crate::message::ToGameMessage;
use crate::state::Phase;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// One accepted message, tagged with where in the game it landed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedAction {
    pub round: Round,
    pub phase: Phase,
    pub message: ToGameMessage,
}

/// The full inbound history of one game, sufficient to replay it from its
/// initial settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub game_id: GameId,
    pub actions: Vec<LoggedAction>,
}

impl ActionLog {
    pub fn new(game_id: GameId) -> Self {
        ActionLog { game_id, actions: Vec::new() }
    }

    pub fn record(&mut self, round: Round, phase: Phase, message: ToGameMessage) {
        self.actions.push(LoggedAction { round, phase, message });
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| GameError::PersistenceError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let log = serde_json::from_reader(reader)
            .map_err(|e| GameError::PersistenceError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        Ok(log)
    }
}

/// Replays `log` against `state`, applying each logged message through
/// `handle_message` in order. Stops at the first error, returning the state
/// reached so far alongside it.
pub fn replay(mut state: crate::state::GameState, log: &ActionLog) -> Result<crate::state::GameState> {
    for logged in &log.actions {
        let (next, _outbound) = crate::engine::handle_message(state, logged.message.clone())?;
        state = next;
    }
    Ok(state)
}
