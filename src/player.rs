//! Players: the humans competing in a game, plus the NPC "house" player.

use crate::ids::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single participant. `still_alive` is only ever flipped by the referee;
/// `money` only by the finance calculator and purchase handling; `is_having_turn`
/// only by the engine's turn bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub money: f64,
    pub is_having_turn: bool,
    pub still_alive: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, color: impl Into<String>, money: f64) -> Self {
        Player { id, name: name.into(), color: color.into(), money, is_having_turn: true, still_alive: true }
    }

    /// The house player: owns unsold inventory, collects orphan congestion rent,
    /// never takes a turn and can never be eliminated.
    pub fn make_npc() -> Self {
        Player {
            id: PlayerId::NPC,
            name: "NPC".to_string(),
            color: "#808080".to_string(),
            money: 0.0,
            is_having_turn: false,
            still_alive: true,
        }
    }
}

/// Keyed collection of players, indexed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerRepo {
    items: HashMap<PlayerId, Player>,
}

impl PlayerRepo {
    pub fn new() -> Self {
        PlayerRepo { items: HashMap::new() }
    }

    pub fn insert(&mut self, player: Player) {
        self.items.insert(player.id, player);
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Player> {
        self.items.values()
    }

    /// Every player except the NPC.
    pub fn human_players(&self) -> impl Iterator<Item = &Player> {
        self.items.values().filter(|p| !p.id.is_npc())
    }

    pub fn human_player_ids(&self) -> Vec<PlayerId> {
        self.human_players().map(|p| p.id).collect()
    }

    pub fn n_human_players(&self) -> usize {
        self.human_players().count()
    }

    pub fn only_alive(&self) -> impl Iterator<Item = &Player> {
        self.human_players().filter(|p| p.still_alive)
    }

    /// Humans still alive whose turn flag is set.
    pub fn get_currently_playing(&self) -> Vec<PlayerId> {
        self.only_alive().filter(|p| p.is_having_turn).map(|p| p.id).collect()
    }

    pub fn are_all_players_finished(&self) -> bool {
        self.get_currently_playing().is_empty()
    }

    pub fn add_money(&mut self, id: PlayerId, amount: f64) {
        if let Some(p) = self.items.get_mut(&id) {
            p.money += amount;
        }
    }

    pub fn subtract_money(&mut self, id: PlayerId, amount: f64) {
        self.add_money(id, -amount);
    }

    pub fn end_turn(&mut self, id: PlayerId) {
        if let Some(p) = self.items.get_mut(&id) {
            p.is_having_turn = false;
        }
    }

    /// Sets the turn flag on every living human; the NPC never has a turn.
    pub fn start_all_turns(&mut self) {
        for p in self.items.values_mut() {
            if !p.id.is_npc() {
                p.is_having_turn = p.still_alive;
            }
        }
    }

    pub fn eliminate_player(&mut self, id: PlayerId) {
        if let Some(p) = self.items.get_mut(&id) {
            p.still_alive = false;
            p.is_having_turn = false;
        }
    }
}
