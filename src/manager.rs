//! The session coordinator: loads state, dispatches through the engine,
//! drains the bounded phase-conclusion loop, persists, and fans outbound
//! messages to the front end. This is the only place that holds a lock per
//! `game_id` — everything it calls into (Engine, Referee, Finance) is pure.

use crate::error::{GameError, Result};
use crate::ids::GameId;
use crate::init;
use crate::message::ToGameMessage;
use crate::database::GameRepo;
use crate::session::FrontEnd;
use crate::state::GameState;
use log::{error, info};
use std::collections::HashMap;
use std::sync::Mutex;

/// At most this many internal `ConcludePhase` re-dispatches happen within a
/// single external call; one cycle through all four phases is the worst
/// realistic case, so this is a backstop against a runaway loop, not a
/// normal operating limit.
const MAX_PHASE_TRANSITIONS: usize = 4;

/// Coordinates a repository of games plus a per-game lock so that state
/// mutations for a given `game_id` are serialised while distinct games
/// proceed independently.
pub struct GameManager<R: GameRepo, F: FrontEnd> {
    repo: R,
    front_end: F,
    locks: Mutex<HashMap<GameId, std::sync::Arc<Mutex<()>>>>,
    next_game_id: Mutex<i64>,
}

impl<R: GameRepo, F: FrontEnd> GameManager<R, F> {
    pub fn new(repo: R, front_end: F) -> Self {
        GameManager { repo, front_end, locks: Mutex::new(HashMap::new()), next_game_id: Mutex::new(1) }
    }

    fn lock_for(&self, game_id: GameId) -> std::sync::Arc<Mutex<()>> {
        self.locks.lock().unwrap().entry(game_id).or_insert_with(|| std::sync::Arc::new(Mutex::new(()))).clone()
    }

    /// Initializes a new game with default settings and persists it.
    pub fn new_game(&self, player_names: Vec<String>, settings: crate::config::GameSettings) -> Result<GameId> {
        if player_names.is_empty() {
            return Err(GameError::ProtocolError("player_names must not be empty".to_string()));
        }
        let game_id = {
            let mut next = self.next_game_id.lock().unwrap();
            let id = GameId::new(*next);
            *next += 1;
            id
        };
        let state = init::initialize_game(game_id, settings, &player_names);
        self.repo.save(&state)?;
        info!("created game {} with {} players", game_id, player_names.len());
        Ok(game_id)
    }

    pub fn list_games(&self) -> Result<Vec<GameId>> {
        self.repo.list()
    }

    pub fn get_game_state(&self, game_id: GameId) -> Result<Option<GameState>> {
        self.repo.load(game_id)
    }

    pub fn delete_game_state(&self, game_id: GameId) -> Result<()> {
        self.repo.delete(game_id)
    }

    /// Applies one inbound message, draining the internal `ConcludePhase`
    /// re-dispatch loop, persists the resulting state, and fans the
    /// accumulated outbound messages out through the front end.
    pub fn handle_player_message(&self, game_id: GameId, msg: ToGameMessage) -> Result<()> {
        let lock = self.lock_for(game_id);
        let _guard = lock.lock().unwrap();

        let Some(mut state) = self.repo.load(game_id)? else {
            return Err(GameError::ProtocolError(format!("game {} does not exist", game_id)));
        };

        let mut all_outbound = Vec::new();
        let mut pending = Some(msg);
        let mut transitions = 0usize;

        while let Some(next_msg) = pending.take() {
            let (new_state, outbound) = crate::engine::handle_message(state, next_msg)?;
            state = new_state;
            pending = crate::engine::maybe_conclude_phase(&state).filter(|_| transitions < MAX_PHASE_TRANSITIONS);
            all_outbound.extend(outbound);
            if pending.is_some() {
                transitions += 1;
            }
        }

        if let Err(e) = self.repo.save(&state) {
            error!("failed to persist game {}: {}", game_id, e);
            return Err(e);
        }

        info!(
            "game {}: applied message, produced {} outbound messages across {} phase transitions",
            game_id,
            all_outbound.len(),
            transitions
        );

        for message in &all_outbound {
            self.front_end.send(game_id, message.player_id(), message);
        }

        Ok(())
    }
}
