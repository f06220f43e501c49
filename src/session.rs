//! The session layer: maps transport connections to `(game_id, player_id)`
//! pairs and defines the narrow contract a concrete transport implements to
//! receive outbound messages.
//!
//! Nothing here knows about WebSockets, HTTP, or any wire format; it is a
//! process-wide registry plus a trait. A concrete transport (or a test
//! double) plugs into [`FrontEnd`].

use crate::ids::{GameId, PlayerId};
use crate::message::ToPlayerMessage;
use std::collections::HashMap;
use std::sync::RwLock;

/// Destination for outbound per-player messages. Implementations decide how
/// a message actually reaches a client (WebSocket frame, in-process channel,
/// a recording test double).
pub trait FrontEnd: Send + Sync {
    fn send(&self, game_id: GameId, player_id: PlayerId, message: &ToPlayerMessage);
}

/// A process-wide `game_id -> player_id -> session handle` map. Structural
/// mutation (connect/disconnect) takes the registry-wide lock; callers doing
/// a one-off existence check can do so under a read lock.
#[derive(Default)]
pub struct SessionRegistry<H> {
    sessions: RwLock<HashMap<(GameId, PlayerId), H>>,
}

impl<H: Clone> SessionRegistry<H> {
    pub fn new() -> Self {
        SessionRegistry { sessions: RwLock::new(HashMap::new()) }
    }

    pub fn connect(&self, game_id: GameId, player_id: PlayerId, handle: H) {
        self.sessions.write().unwrap().insert((game_id, player_id), handle);
    }

    pub fn disconnect(&self, game_id: GameId, player_id: PlayerId) {
        self.sessions.write().unwrap().remove(&(game_id, player_id));
    }

    pub fn get(&self, game_id: GameId, player_id: PlayerId) -> Option<H> {
        self.sessions.read().unwrap().get(&(game_id, player_id)).cloned()
    }

    pub fn is_connected(&self, game_id: GameId, player_id: PlayerId) -> bool {
        self.sessions.read().unwrap().contains_key(&(game_id, player_id))
    }

    pub fn connected_players(&self, game_id: GameId) -> Vec<PlayerId> {
        self.sessions.read().unwrap().keys().filter(|(g, _)| *g == game_id).map(|(_, p)| *p).collect()
    }
}

/// A [`FrontEnd`] that records every send instead of delivering it anywhere;
/// used by the manager's own tests and by callers wiring up a dry run.
#[derive(Default)]
pub struct RecordingFrontEnd {
    sent: RwLock<Vec<(GameId, PlayerId, ToPlayerMessage)>>,
}

impl RecordingFrontEnd {
    pub fn new() -> Self {
        RecordingFrontEnd { sent: RwLock::new(Vec::new()) }
    }

    pub fn sent_messages(&self) -> Vec<(GameId, PlayerId, ToPlayerMessage)> {
        self.sent.read().unwrap().clone()
    }
}

impl FrontEnd for RecordingFrontEnd {
    fn send(&self, game_id: GameId, player_id: PlayerId, message: &ToPlayerMessage) {
        self.sent.write().unwrap().push((game_id, player_id, message.clone()));
    }
}
