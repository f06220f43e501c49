//! Grid buses: the nodes assets connect to and lines run between.

use crate::ids::{BusId, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    pub x: f64,
    pub y: f64,
    pub player_id: PlayerId,
    pub max_lines: usize,
    pub max_assets: usize,
}

impl Bus {
    pub fn new(id: BusId, x: f64, y: f64, player_id: PlayerId) -> Self {
        Bus { id, x, y, player_id, max_lines: 5, max_assets: 5 }
    }

    pub fn total_sockets(&self) -> usize {
        self.max_lines + self.max_assets
    }

    pub fn point(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusRepo {
    items: HashMap<BusId, Bus>,
}

impl BusRepo {
    pub fn new() -> Self {
        BusRepo { items: HashMap::new() }
    }

    pub fn insert(&mut self, bus: Bus) {
        self.items.insert(bus.id, bus);
    }

    pub fn get(&self, id: BusId) -> Option<&Bus> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: BusId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Bus> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn npc_bus_ids(&self) -> Vec<BusId> {
        self.items.values().filter(|b| b.player_id.is_npc()).map(|b| b.id).collect()
    }

    pub fn player_bus_ids(&self) -> Vec<BusId> {
        self.items.values().filter(|b| !b.player_id.is_npc()).map(|b| b.id).collect()
    }

    /// Every human owns exactly one home bus; this looks it up.
    pub fn get_bus_for_player(&self, player_id: PlayerId) -> Option<BusId> {
        let mut found = self.items.values().filter(|b| b.player_id == player_id);
        let first = found.next()?;
        debug_assert!(found.next().is_none(), "player {player_id} owns more than one bus");
        Some(first.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_home_bus_for_player() {
        let mut repo = BusRepo::new();
        repo.insert(Bus::new(BusId(0), 0.0, 0.0, PlayerId(1)));
        repo.insert(Bus::new(BusId(1), 1.0, 1.0, PlayerId::NPC));
        assert_eq!(repo.get_bus_for_player(PlayerId(1)), Some(BusId(0)));
        assert_eq!(repo.get_bus_for_player(PlayerId(2)), None);
    }

    #[test]
    fn npc_and_player_buses_partition() {
        let mut repo = BusRepo::new();
        repo.insert(Bus::new(BusId(0), 0.0, 0.0, PlayerId(1)));
        repo.insert(Bus::new(BusId(1), 1.0, 1.0, PlayerId::NPC));
        assert_eq!(repo.npc_bus_ids(), vec![BusId(1)]);
        assert_eq!(repo.player_bus_ids(), vec![BusId(0)]);
    }
}
