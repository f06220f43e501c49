//! Generators and loads: the productive and consuming assets connected to buses.

use crate::ids::{AssetId, BusId, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetType {
    Generator,
    Load,
}

/// A generator or a load sitting at a bus. A freezer is a special load with
/// finite "ice cream" health: it must be kept dispatched or it melts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub owner_player: PlayerId,
    pub asset_type: AssetType,
    pub bus: BusId,
    pub power_expected: f64,
    pub power_std: f64,
    pub is_for_sale: bool,
    pub minimum_acquisition_price: f64,
    pub fixed_operating_cost: f64,
    pub marginal_cost: f64,
    pub bid_price: f64,
    pub is_freezer: bool,
    pub health: u32,
    pub is_active: bool,
    pub birthday: u32,
}

impl Asset {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AssetId,
        owner_player: PlayerId,
        asset_type: AssetType,
        bus: BusId,
        power_expected: f64,
        power_std: f64,
        is_freezer: bool,
        health: u32,
        birthday: u32,
    ) -> Self {
        assert!(
            !is_freezer || asset_type == AssetType::Load,
            "only loads can be freezers"
        );
        Asset {
            id,
            owner_player,
            asset_type,
            bus,
            power_expected,
            power_std,
            is_for_sale: false,
            minimum_acquisition_price: 0.0,
            fixed_operating_cost: 0.0,
            marginal_cost: 0.0,
            bid_price: 0.0,
            is_freezer,
            health,
            is_active: true,
            birthday,
        }
    }

    /// +1 for a generator (injects power, is paid), -1 for a load (withdraws, pays).
    pub fn cashflow_sign(&self) -> f64 {
        match self.asset_type {
            AssetType::Generator => 1.0,
            AssetType::Load => -1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetRepo {
    items: HashMap<AssetId, Asset>,
}

impl AssetRepo {
    pub fn new() -> Self {
        AssetRepo { items: HashMap::new() }
    }

    pub fn insert(&mut self, asset: Asset) {
        self.items.insert(asset.id, asset);
    }

    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Asset> {
        self.items.values()
    }

    pub fn get_all_at_bus(&self, bus: BusId) -> Vec<&Asset> {
        self.items.values().filter(|a| a.bus == bus).collect()
    }

    pub fn get_all_for_player(&self, player_id: PlayerId, only_active: bool) -> Vec<&Asset> {
        self.items
            .values()
            .filter(|a| a.owner_player == player_id && (!only_active || a.is_active))
            .collect()
    }

    pub fn only_freezers(&self) -> impl Iterator<Item = &Asset> {
        self.items.values().filter(|a| a.is_freezer)
    }

    pub fn only_non_freezers(&self) -> impl Iterator<Item = &Asset> {
        self.items.values().filter(|a| !a.is_freezer)
    }

    pub fn only_active(&self) -> impl Iterator<Item = &Asset> {
        self.items.values().filter(|a| a.is_active)
    }

    pub fn only_for_sale(&self) -> impl Iterator<Item = &Asset> {
        self.items.values().filter(|a| a.is_for_sale)
    }

    pub fn change_owner(&mut self, id: AssetId, new_owner: PlayerId) {
        if let Some(a) = self.items.get_mut(&id) {
            a.owner_player = new_owner;
            a.is_for_sale = false;
        }
    }

    pub fn update_bid_price(&mut self, id: AssetId, bid_price: f64) {
        if let Some(a) = self.items.get_mut(&id) {
            a.bid_price = bid_price;
        }
    }

    pub fn set_active(&mut self, id: AssetId, active: bool) {
        if let Some(a) = self.items.get_mut(&id) {
            a.is_active = active;
        }
    }

    pub fn batch_deactivate(&mut self, ids: &[AssetId]) {
        for id in ids {
            self.set_active(*id, false);
        }
    }

    /// Decrements health by one; clamps at zero and deactivates on reaching it.
    pub fn melt_ice_cream(&mut self, id: AssetId) {
        if let Some(a) = self.items.get_mut(&id) {
            if a.health > 0 {
                a.health -= 1;
                if a.health == 0 {
                    a.is_active = false;
                }
            }
        }
    }

    /// Same decrement rule as [`Self::melt_ice_cream`], for non-freezer wear.
    pub fn wear_asset(&mut self, id: AssetId) {
        self.melt_ice_cream(id);
    }

    pub fn delete_for_player(&mut self, player_id: PlayerId) {
        self.items.retain(|_, a| a.owner_player != player_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(id: i64, bus: i64) -> Asset {
        Asset::new(AssetId(id), PlayerId::NPC, AssetType::Generator, BusId(bus), 10.0, 1.0, false, 0, 1)
    }

    #[test]
    #[should_panic(expected = "only loads can be freezers")]
    fn generator_cannot_be_a_freezer() {
        Asset::new(AssetId(0), PlayerId::NPC, AssetType::Generator, BusId(0), 10.0, 1.0, true, 3, 1);
    }

    #[test]
    fn melt_ice_cream_deactivates_at_zero_health() {
        let mut repo = AssetRepo::new();
        let mut freezer = Asset::new(AssetId(0), PlayerId(1), AssetType::Load, BusId(0), 5.0, 0.5, true, 1, 1);
        freezer.is_active = true;
        repo.insert(freezer);

        repo.melt_ice_cream(AssetId(0));
        let a = repo.get(AssetId(0)).unwrap();
        assert_eq!(a.health, 0);
        assert!(!a.is_active);
    }

    #[test]
    fn cashflow_sign_matches_asset_type() {
        let gen = generator(0, 0);
        assert_eq!(gen.cashflow_sign(), 1.0);
        let load = Asset::new(AssetId(1), PlayerId::NPC, AssetType::Load, BusId(0), 5.0, 1.0, false, 0, 1);
        assert_eq!(load.cashflow_sign(), -1.0);
    }

    #[test]
    fn get_all_for_player_respects_only_active() {
        let mut repo = AssetRepo::new();
        let mut a = generator(0, 0);
        a.owner_player = PlayerId(1);
        a.is_active = false;
        repo.insert(a);
        assert_eq!(repo.get_all_for_player(PlayerId(1), true).len(), 0);
        assert_eq!(repo.get_all_for_player(PlayerId(1), false).len(), 1);
    }
}
