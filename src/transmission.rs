//! Transmission lines connecting pairs of buses.

use crate::ids::{BusId, PlayerId, TransmissionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transmission {
    pub id: TransmissionId,
    pub owner_player: PlayerId,
    pub bus1: BusId,
    pub bus2: BusId,
    pub reactance: f64,
    pub capacity: f64,
    pub health: u32,
    pub fixed_operating_cost: f64,
    pub is_for_sale: bool,
    pub minimum_acquisition_price: f64,
    pub is_active: bool,
    pub birthday: u32,
}

impl Transmission {
    pub fn new(
        id: TransmissionId,
        owner_player: PlayerId,
        bus1: BusId,
        bus2: BusId,
        reactance: f64,
        birthday: u32,
    ) -> Self {
        assert!(bus2 > bus1, "transmission buses must be ordered bus1 < bus2");
        assert!(reactance > 0.0, "reactance must be positive");
        Transmission {
            id,
            owner_player,
            bus1,
            bus2,
            reactance,
            capacity: 100.0,
            health: 5,
            fixed_operating_cost: 0.0,
            is_for_sale: false,
            minimum_acquisition_price: 0.0,
            is_active: true,
            birthday,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.is_active
    }

    pub fn is_closed(&self) -> bool {
        self.is_active
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransmissionRepo {
    items: HashMap<TransmissionId, Transmission>,
}

impl TransmissionRepo {
    pub fn new() -> Self {
        TransmissionRepo { items: HashMap::new() }
    }

    pub fn insert(&mut self, line: Transmission) {
        self.items.insert(line.id, line);
    }

    pub fn get(&self, id: TransmissionId) -> Option<&Transmission> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: TransmissionId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Transmission> {
        self.items.values()
    }

    pub fn only_open(&self) -> impl Iterator<Item = &Transmission> {
        self.items.values().filter(|t| t.is_open())
    }

    pub fn only_closed(&self) -> impl Iterator<Item = &Transmission> {
        self.items.values().filter(|t| t.is_closed())
    }

    pub fn get_all_for_player(&self, player_id: PlayerId) -> Vec<&Transmission> {
        self.items.values().filter(|t| t.owner_player == player_id).collect()
    }

    pub fn get_all_at_bus(&self, bus: BusId) -> Vec<&Transmission> {
        self.items.values().filter(|t| t.bus1 == bus || t.bus2 == bus).collect()
    }

    /// Normalizes argument order so `(b, a)` finds the same lines as `(a, b)`.
    pub fn get_all_between_buses(&self, a: BusId, b: BusId) -> Vec<&Transmission> {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        self.items.values().filter(|t| t.bus1 == lo && t.bus2 == hi).collect()
    }

    pub fn open_line(&mut self, id: TransmissionId) {
        if let Some(t) = self.items.get_mut(&id) {
            t.is_active = false;
        }
    }

    pub fn close_line(&mut self, id: TransmissionId) {
        if let Some(t) = self.items.get_mut(&id) {
            t.is_active = true;
        }
    }

    pub fn change_owner(&mut self, id: TransmissionId, new_owner: PlayerId) {
        if let Some(t) = self.items.get_mut(&id) {
            t.owner_player = new_owner;
            t.is_for_sale = false;
        }
    }

    /// Decrements health by one; clamps at zero and opens the line on reaching it.
    pub fn wear_transmission(&mut self, id: TransmissionId) {
        if let Some(t) = self.items.get_mut(&id) {
            if t.health > 0 {
                t.health -= 1;
                if t.health == 0 {
                    t.is_active = false;
                }
            }
        }
    }

    pub fn delete_for_player(&mut self, player_id: PlayerId) {
        self.items.retain(|_, t| t.owner_player != player_id);
    }
}
