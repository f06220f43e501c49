//! The outcome of a single market-coupling clearing.

use crate::ids::{AssetId, BusId, TransmissionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Prices, flows, and dispatch for one cleared snapshot of the grid.
///
/// All three tables are dense over the *active* entities that took part in
/// the optimisation; entities left out (open lines, inactive assets) are
/// zero-filled by the solver adapter before this value is constructed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketCouplingResult {
    pub bus_prices: HashMap<BusId, f64>,
    pub transmission_flows: HashMap<TransmissionId, f64>,
    pub assets_dispatch: HashMap<AssetId, f64>,
}

impl MarketCouplingResult {
    pub fn bus_price(&self, bus: BusId) -> f64 {
        self.bus_prices.get(&bus).copied().unwrap_or(0.0)
    }

    pub fn flow(&self, line: TransmissionId) -> f64 {
        self.transmission_flows.get(&line).copied().unwrap_or(0.0)
    }

    pub fn dispatch(&self, asset: AssetId) -> f64 {
        self.assets_dispatch.get(&asset).copied().unwrap_or(0.0)
    }
}
