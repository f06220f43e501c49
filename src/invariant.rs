//! Trait-based invariant checking, run against a [`GameState`] from tests or
//! behind a debug-only assertion hook after each `DA_AUCTION` conclusion.
//!
//! Each impl here corresponds to one property named in the testable-properties
//! list: dispatch balance, the congestion/price-spread relationship, no
//! paradoxical acceptance, health/active equivalence, and purchase
//! conservation.

use crate::ids::{PlayerId, Round};
use crate::state::{GameState, Phase};
use std::fmt;

/// A violated invariant, carrying the round/phase at which it was detected.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub invariant_name: String,
    pub description: String,
    pub round: Round,
    pub phase: Phase,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invariant violation '{}' at round {} phase {:?}: {}",
            self.invariant_name, self.round, self.phase, self.description
        )
    }
}

impl std::error::Error for InvariantViolation {}

/// A property that should always hold for a [`GameState`]. `before` is the
/// state immediately preceding the transition under test, when the caller
/// has one available; invariants that only need the current snapshot
/// ignore it.
pub trait Invariant {
    fn name(&self) -> &str;
    fn check(&self, before: Option<&GameState>, state: &GameState) -> Result<(), InvariantViolation>;
}

fn violation(name: &str, state: &GameState, description: impl Into<String>) -> InvariantViolation {
    InvariantViolation { invariant_name: name.to_string(), description: description.into(), round: state.round, phase: state.phase }
}

/// `Σ dispatch(generators) = Σ dispatch(loads)` within `1e-5`.
pub struct DispatchBalanceInvariant;

impl Invariant for DispatchBalanceInvariant {
    fn name(&self) -> &str {
        "dispatch_balance"
    }

    fn check(&self, _before: Option<&GameState>, state: &GameState) -> Result<(), InvariantViolation> {
        let Some(mcr) = &state.market_coupling_result else { return Ok(()) };
        let mut generation = 0.0;
        let mut consumption = 0.0;
        for asset in state.assets.only_active() {
            let dispatch = mcr.dispatch(asset.id).abs();
            match asset.asset_type {
                crate::asset::AssetType::Generator => generation += dispatch,
                crate::asset::AssetType::Load => consumption += dispatch,
            }
        }
        if (generation - consumption).abs() > 1e-5 {
            return Err(violation(
                self.name(),
                state,
                format!("generation {} does not balance consumption {}", generation, consumption),
            ));
        }
        Ok(())
    }
}

/// Uncongested lines must not sustain a price spread across their endpoints.
pub struct CongestionPriceSpreadInvariant;

impl Invariant for CongestionPriceSpreadInvariant {
    fn name(&self) -> &str {
        "congestion_price_spread"
    }

    fn check(&self, _before: Option<&GameState>, state: &GameState) -> Result<(), InvariantViolation> {
        const FLOW_EPSILON: f64 = 1e-5;
        const PRICE_TOLERANCE: f64 = 1.0;
        let Some(mcr) = &state.market_coupling_result else { return Ok(()) };
        for line in state.transmission.only_closed() {
            let flow = mcr.flow(line.id);
            let congested = (line.capacity - flow.abs()).abs() <= FLOW_EPSILON;
            if congested {
                continue;
            }
            let spread = (mcr.bus_price(line.bus1) - mcr.bus_price(line.bus2)).abs();
            if spread > PRICE_TOLERANCE {
                return Err(violation(
                    self.name(),
                    state,
                    format!("uncongested line {} has a price spread of {}", line.id, spread),
                ));
            }
        }
        Ok(())
    }
}

/// No asset clears at a price its own bid would reject.
pub struct NoParadoxicalAcceptanceInvariant;

impl Invariant for NoParadoxicalAcceptanceInvariant {
    fn name(&self) -> &str {
        "no_paradoxical_acceptance"
    }

    fn check(&self, _before: Option<&GameState>, state: &GameState) -> Result<(), InvariantViolation> {
        const DISPATCH_THRESHOLD: f64 = 0.5;
        let Some(mcr) = &state.market_coupling_result else { return Ok(()) };
        for asset in state.assets.only_active() {
            let dispatch = mcr.dispatch(asset.id).abs();
            if dispatch <= DISPATCH_THRESHOLD {
                continue;
            }
            let price = mcr.bus_price(asset.bus);
            let ok = match asset.asset_type {
                crate::asset::AssetType::Generator => asset.bid_price <= price,
                crate::asset::AssetType::Load => asset.bid_price >= price,
            };
            if !ok {
                return Err(violation(
                    self.name(),
                    state,
                    format!("asset {} dispatched at a price its bid {} would reject ({})", asset.id, asset.bid_price, price),
                ));
            }
        }
        Ok(())
    }
}

/// `health == 0 <=> is_active == false` for every asset and transmission line.
pub struct HealthActiveEquivalenceInvariant;

impl Invariant for HealthActiveEquivalenceInvariant {
    fn name(&self) -> &str {
        "health_active_equivalence"
    }

    fn check(&self, _before: Option<&GameState>, state: &GameState) -> Result<(), InvariantViolation> {
        for asset in state.assets.all() {
            if asset.health == 0 && asset.is_active {
                return Err(violation(self.name(), state, format!("asset {} has zero health but is still active", asset.id)));
            }
        }
        for line in state.transmission.all() {
            if line.health == 0 && line.is_closed() {
                return Err(violation(self.name(), state, format!("transmission {} has zero health but is still closed", line.id)));
            }
        }
        Ok(())
    }
}

/// A player who comes to own an asset or transmission line they didn't own
/// before must have paid exactly its `minimum_acquisition_price`; no other
/// player's balance moves as a side effect of that transfer. Only checkable
/// when a `before` snapshot is supplied — without one this is vacuously Ok.
pub struct PurchaseConservationInvariant;

impl PurchaseConservationInvariant {
    const TOLERANCE: f64 = 1e-9;

    fn check_transfer(&self, before: &GameState, after: &GameState, buyer: PlayerId, price: f64) -> Result<(), InvariantViolation> {
        let (Some(before_buyer), Some(after_buyer)) = (before.players.get(buyer), after.players.get(buyer)) else {
            return Ok(());
        };
        let spent = before_buyer.money - after_buyer.money;
        if (spent - price).abs() > Self::TOLERANCE {
            return Err(violation(
                self.name(),
                after,
                format!("player {} spent {} acquiring an entity whose minimum acquisition price is {}", buyer, spent, price),
            ));
        }
        Ok(())
    }
}

impl Invariant for PurchaseConservationInvariant {
    fn name(&self) -> &str {
        "purchase_conservation"
    }

    fn check(&self, before: Option<&GameState>, after: &GameState) -> Result<(), InvariantViolation> {
        let Some(before) = before else { return Ok(()) };

        for asset in after.assets.all() {
            if let Some(prev) = before.assets.get(asset.id) {
                if prev.owner_player != asset.owner_player {
                    self.check_transfer(before, after, asset.owner_player, asset.minimum_acquisition_price)?;
                }
            }
        }
        for line in after.transmission.all() {
            if let Some(prev) = before.transmission.get(line.id) {
                if prev.owner_player != line.owner_player {
                    self.check_transfer(before, after, line.owner_player, line.minimum_acquisition_price)?;
                }
            }
        }
        Ok(())
    }
}

/// Runs every invariant in sequence, short-circuiting on the first failure
/// (callers that want every violation should call each `Invariant` directly).
/// `before` is threaded through to invariants that check a transition; pass
/// `None` when only a single snapshot is available.
pub fn check_all(before: Option<&GameState>, after: &GameState) -> Result<(), InvariantViolation> {
    DispatchBalanceInvariant.check(before, after)?;
    CongestionPriceSpreadInvariant.check(before, after)?;
    NoParadoxicalAcceptanceInvariant.check(before, after)?;
    HealthActiveEquivalenceInvariant.check(before, after)?;
    PurchaseConservationInvariant.check(before, after)?;
    Ok(())
}
