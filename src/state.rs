//! The aggregate game state and its phase machine.

use crate::asset::AssetRepo;
use crate::bus::BusRepo;
use crate::config::GameSettings;
use crate::ids::GameId;
use crate::market_result::MarketCouplingResult;
use crate::player::PlayerRepo;
use crate::transmission::TransmissionRepo;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, FromRepr};

/// The four turn segments every round cycles through. All living humans act
/// (or pass) in a phase before it concludes and the game advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, FromRepr)]
#[repr(u8)]
pub enum Phase {
    Construction = 0,
    SneakyTricks = 1,
    Bidding = 2,
    DayAheadAuction = 3,
}

impl Phase {
    /// The phase that follows this one, wrapping back to `Construction`.
    pub fn get_next(&self) -> Phase {
        let next = (*self as u8 + 1) % 4;
        Phase::from_repr(next).expect("phase cycle is mod 4")
    }

    /// Whether advancing past this phase completes a round.
    pub fn wraps_round(&self) -> bool {
        matches!(self, Phase::DayAheadAuction)
    }
}

/// The full authoritative state of one game. Every mutation goes through a
/// method that returns a new value; nothing here is mutated through a
/// shared reference from outside this module's owners (Engine/Referee/Finance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    pub settings: GameSettings,
    pub phase: Phase,
    pub round: u32,
    pub players: PlayerRepo,
    pub buses: BusRepo,
    pub assets: AssetRepo,
    pub transmission: TransmissionRepo,
    pub market_coupling_result: Option<MarketCouplingResult>,
}

impl GameState {
    pub fn new(game_id: GameId, settings: GameSettings) -> Self {
        GameState {
            game_id,
            settings,
            phase: Phase::Construction,
            round: 1,
            players: PlayerRepo::new(),
            buses: BusRepo::new(),
            assets: AssetRepo::new(),
            transmission: TransmissionRepo::new(),
            market_coupling_result: None,
        }
    }

    pub fn remaining_asset_space_at_bus(&self, bus: crate::ids::BusId) -> Option<usize> {
        let b = self.buses.get(bus)?;
        let used = self.assets.get_all_at_bus(bus).len();
        Some(b.max_assets.saturating_sub(used))
    }

    pub fn remaining_line_space_at_bus(&self, bus: crate::ids::BusId) -> Option<usize> {
        let b = self.buses.get(bus)?;
        let used = self.transmission.get_all_at_bus(bus).len();
        Some(b.max_lines.saturating_sub(used))
    }

    /// Adds an asset, failing if its home bus has no free asset socket.
    pub fn add_asset(&mut self, asset: crate::asset::Asset) -> crate::error::Result<()> {
        let remaining = self.remaining_asset_space_at_bus(asset.bus).ok_or_else(|| {
            crate::error::GameError::BusFull(format!("bus {} does not exist", asset.bus))
        })?;
        if remaining == 0 {
            return Err(crate::error::GameError::BusFull(format!(
                "bus {} has no free asset sockets",
                asset.bus
            )));
        }
        self.assets.insert(asset);
        Ok(())
    }

    /// Adds a transmission line, failing if either endpoint bus has no free
    /// line socket.
    pub fn add_transmission_line(
        &mut self,
        line: crate::transmission::Transmission,
    ) -> crate::error::Result<()> {
        for bus in [line.bus1, line.bus2] {
            let remaining = self.remaining_line_space_at_bus(bus).ok_or_else(|| {
                crate::error::GameError::BusFull(format!("bus {} does not exist", bus))
            })?;
            if remaining == 0 {
                return Err(crate::error::GameError::BusFull(format!(
                    "bus {} has no free line sockets",
                    bus
                )));
            }
        }
        self.transmission.insert(line);
        Ok(())
    }

    /// Sets every living human's turn flag, used at the start of a phase.
    pub fn start_all_turns(&mut self) {
        self.players.start_all_turns();
    }

    /// Advances phase, incrementing round on wraparound, and resets turns.
    pub fn advance_phase(&mut self) {
        let wraps = self.phase.wraps_round();
        self.phase = self.phase.get_next();
        if wraps {
            self.round += 1;
        }
        self.start_all_turns();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_cycles_through_all_four_and_wraps() {
        assert_eq!(Phase::Construction.get_next(), Phase::SneakyTricks);
        assert_eq!(Phase::SneakyTricks.get_next(), Phase::Bidding);
        assert_eq!(Phase::Bidding.get_next(), Phase::DayAheadAuction);
        assert_eq!(Phase::DayAheadAuction.get_next(), Phase::Construction);
    }

    #[test]
    fn only_day_ahead_auction_wraps_the_round() {
        assert!(!Phase::Construction.wraps_round());
        assert!(!Phase::SneakyTricks.wraps_round());
        assert!(!Phase::Bidding.wraps_round());
        assert!(Phase::DayAheadAuction.wraps_round());
    }

    #[test]
    fn advance_phase_increments_round_only_on_wrap() {
        let mut state = GameState::new(GameId(1), GameSettings::default());
        assert_eq!(state.round, 1);
        state.phase = Phase::DayAheadAuction;
        state.advance_phase();
        assert_eq!(state.phase, Phase::Construction);
        assert_eq!(state.round, 2);
    }

    #[test]
    fn add_asset_rejects_full_bus() {
        use crate::asset::{Asset, AssetType};
        use crate::bus::Bus;
        use crate::ids::{AssetId, BusId, PlayerId};

        let mut state = GameState::new(GameId(1), GameSettings::default());
        let mut bus = Bus::new(BusId(0), 0.0, 0.0, PlayerId::NPC);
        bus.max_assets = 1;
        state.buses.insert(bus);

        let a1 = Asset::new(AssetId(0), PlayerId::NPC, AssetType::Generator, BusId(0), 5.0, 1.0, false, 0, 1);
        assert!(state.add_asset(a1).is_ok());

        let a2 = Asset::new(AssetId(1), PlayerId::NPC, AssetType::Generator, BusId(0), 5.0, 1.0, false, 0, 1);
        assert!(state.add_asset(a2).is_err());
    }
}
