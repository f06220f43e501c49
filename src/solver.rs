//! DC optimal power flow "market coupling" problem and its reference solver.
//!
//! The actual clearing algorithm is kept behind the narrow [`Solver`] trait so
//! any LP/QP backend can stand in for [`ReferenceSolver`] without touching
//! the engine or referee. [`ReferenceSolver`] implements zonal price coupling:
//! it clears each connected island by merit order, computes the resulting
//! line flows from the DC power-flow equations, and whenever a flow exceeds
//! its line's capacity it treats that line as a fixed-capacity interconnector
//! and re-clears the two sides independently, repeating until every flow is
//! within its line's limit or a small iteration budget is exhausted.

use crate::asset::{Asset, AssetType};
use crate::bus::Bus;
use crate::ids::{AssetId, BusId, TransmissionId};
use crate::market_result::MarketCouplingResult;
use crate::transmission::Transmission;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One decision variable: an asset's injection at its bus, bounded to its
/// sampled capacity for this snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AssetVariable {
    pub asset_id: AssetId,
    pub bus: BusId,
    pub sign: f64,
    pub sampled_capacity: f64,
    pub bid_price: f64,
}

/// One line available to carry flow in this snapshot.
#[derive(Debug, Clone, Copy)]
pub struct LineVariable {
    pub line_id: TransmissionId,
    pub bus1: BusId,
    pub bus2: BusId,
    pub reactance: f64,
    pub capacity: f64,
}

/// A fully-formed snapshot ready to hand to a [`Solver`]: every bus, every
/// closed line, every active asset with its already-sampled capacity for
/// this round.
#[derive(Debug, Clone)]
pub struct Problem {
    pub buses: Vec<BusId>,
    pub lines: Vec<LineVariable>,
    pub assets: Vec<AssetVariable>,
}

impl Problem {
    /// Builds a snapshot from the live game entities plus a pre-sampled
    /// capacity for each active asset (see [`crate::engine::sample_power`]).
    pub fn build(
        all_buses: impl IntoIterator<Item = Bus>,
        lines: impl IntoIterator<Item = Transmission>,
        assets: impl IntoIterator<Item = (Asset, f64)>,
    ) -> Problem {
        let bus_ids: Vec<BusId> = all_buses.into_iter().map(|b| b.id).collect();
        let line_vars: Vec<LineVariable> = lines
            .into_iter()
            .filter(|l| l.is_closed())
            .map(|l| LineVariable {
                line_id: l.id,
                bus1: l.bus1,
                bus2: l.bus2,
                reactance: l.reactance,
                capacity: l.capacity,
            })
            .collect();
        let asset_vars: Vec<AssetVariable> = assets
            .into_iter()
            .filter(|(a, _)| a.is_active)
            .map(|(a, sampled)| AssetVariable {
                asset_id: a.id,
                bus: a.bus,
                sign: a.cashflow_sign(),
                sampled_capacity: sampled.max(0.0),
                bid_price: a.bid_price,
            })
            .collect();
        Problem { buses: bus_ids, lines: line_vars, assets: asset_vars }
    }
}

#[derive(Debug, Clone)]
pub struct SolverFailure {
    pub message: String,
}

impl fmt::Display for SolverFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SolverFailure {}

pub type SolverSolution = MarketCouplingResult;

/// Narrow interface the engine depends on. `ReferenceSolver` is the crate's
/// own implementation; a production deployment can substitute any backend
/// that honours this contract.
pub trait Solver {
    fn solve(&self, problem: &Problem) -> Result<SolverSolution, SolverFailure>;
}

/// A merit-order + DC power-flow reference implementation good enough for
/// the small snapshots this game produces.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceSolver;

const MAX_SPLIT_ITERATIONS: usize = 64;
const FLOW_TOLERANCE: f64 = 1e-6;

impl Solver for ReferenceSolver {
    fn solve(&self, problem: &Problem) -> Result<SolverSolution, SolverFailure> {
        if problem.buses.is_empty() {
            return Ok(MarketCouplingResult::default());
        }

        let mut open_lines: Vec<LineVariable> = problem.lines.clone();
        // Fixed injections/withdrawals at a bus caused by a line that was cut
        // because it saturated; these feed the merit-order balance in the
        // zone that line now borders.
        let mut pinned_injections: HashMap<BusId, f64> = HashMap::new();
        let mut pinned_flows: HashMap<TransmissionId, f64> = HashMap::new();

        for _ in 0..MAX_SPLIT_ITERATIONS {
            let components = connected_components(&problem.buses, &open_lines);
            let mut dispatch: HashMap<AssetId, f64> = HashMap::new();
            let mut bus_prices: HashMap<BusId, f64> = HashMap::new();

            for component in &components {
                let component_set: HashSet<BusId> = component.iter().copied().collect();
                let pinned_total: f64 =
                    component.iter().filter_map(|b| pinned_injections.get(b)).sum();
                let component_assets: Vec<&AssetVariable> =
                    problem.assets.iter().filter(|a| component_set.contains(&a.bus)).collect();

                let (price, asset_dispatch) = clear_merit_order(&component_assets, pinned_total);
                for b in component {
                    bus_prices.insert(*b, price);
                }
                dispatch.extend(asset_dispatch);
            }

            let mut injections: HashMap<BusId, f64> = HashMap::new();
            for bus in &problem.buses {
                injections.insert(*bus, pinned_injections.get(bus).copied().unwrap_or(0.0));
            }
            for asset in &problem.assets {
                let d = dispatch.get(&asset.asset_id).copied().unwrap_or(0.0);
                *injections.entry(asset.bus).or_insert(0.0) += asset.sign * d;
            }

            let mut flows: HashMap<TransmissionId, f64> = pinned_flows.clone();
            let mut worst: Option<(usize, f64)> = None;
            for component in &components {
                let lines_in_component: Vec<LineVariable> = open_lines
                    .iter()
                    .filter(|l| component.contains(&l.bus1) && component.contains(&l.bus2))
                    .copied()
                    .collect();
                if lines_in_component.is_empty() {
                    continue;
                }
                let angles = solve_angles(component, &lines_in_component, &injections)?;
                for line in &lines_in_component {
                    let theta1 = angles[&line.bus1];
                    let theta2 = angles[&line.bus2];
                    let flow = (theta1 - theta2) / line.reactance;
                    flows.insert(line.line_id, flow);
                    let violation = flow.abs() - line.capacity;
                    if violation > FLOW_TOLERANCE {
                        let idx = open_lines.iter().position(|l| l.line_id == line.line_id).unwrap();
                        if worst.map(|(_, v)| violation > v).unwrap_or(true) {
                            worst = Some((idx, violation));
                        }
                    }
                }
            }

            match worst {
                None => {
                    return Ok(MarketCouplingResult {
                        bus_prices,
                        transmission_flows: flows,
                        assets_dispatch: dispatch,
                    });
                }
                Some((idx, _)) => {
                    let cut = open_lines.remove(idx);
                    let signed_capacity = if flows[&cut.line_id] >= 0.0 { cut.capacity } else { -cut.capacity };
                    *pinned_injections.entry(cut.bus1).or_insert(0.0) -= signed_capacity;
                    *pinned_injections.entry(cut.bus2).or_insert(0.0) += signed_capacity;
                    pinned_flows.insert(cut.line_id, signed_capacity);
                }
            }
        }

        Err(SolverFailure { message: "zonal splitting did not converge within iteration budget".to_string() })
    }
}

/// Clears a single connected zone by merit order: generators sorted by
/// ascending bid (cheapest first), loads by descending bid (most willing to
/// pay first), matched until supply meets demand plus any pinned net import.
/// Returns the clearing price and each asset's dispatch.
fn clear_merit_order(assets: &[&AssetVariable], pinned_net_injection: f64) -> (f64, HashMap<AssetId, f64>) {
    let mut generators: Vec<&&AssetVariable> = assets.iter().filter(|a| a.sign > 0.0).collect();
    let mut loads: Vec<&&AssetVariable> = assets.iter().filter(|a| a.sign < 0.0).collect();
    generators.sort_by(|a, b| a.bid_price.partial_cmp(&b.bid_price).unwrap());
    loads.sort_by(|a, b| b.bid_price.partial_cmp(&a.bid_price).unwrap());

    let mut dispatch: HashMap<AssetId, f64> = HashMap::new();
    for a in assets {
        dispatch.insert(a.asset_id, 0.0);
    }

    // Demand to serve: all load capacity, reduced by any pinned export this
    // zone must still deliver (a negative pinned_net_injection means the
    // zone must net-export that much through a cut line).
    let total_load_capacity: f64 = loads.iter().map(|l| l.sampled_capacity).sum();
    let mut remaining_demand = total_load_capacity + pinned_net_injection.max(0.0);
    let mut remaining_export = (-pinned_net_injection).max(0.0);

    let mut price = 0.0;
    let mut gen_iter = generators.iter().peekable();
    while remaining_demand > FLOW_TOLERANCE || remaining_export > FLOW_TOLERANCE {
        let Some(gen) = gen_iter.next() else { break };
        let take = gen.sampled_capacity.min(remaining_demand + remaining_export);
        if take <= 0.0 {
            continue;
        }
        *dispatch.get_mut(&gen.asset_id).unwrap() += take;
        let to_export = take.min(remaining_export);
        remaining_export -= to_export;
        remaining_demand -= take - to_export;
        price = gen.bid_price;
    }

    let mut to_serve = total_load_capacity.min(
        dispatch.values().copied().sum::<f64>() + pinned_net_injection.min(0.0).abs(),
    );
    for load in &loads {
        if to_serve <= FLOW_TOLERANCE {
            break;
        }
        let take = load.sampled_capacity.min(to_serve);
        *dispatch.get_mut(&load.asset_id).unwrap() += take;
        to_serve -= take;
        if price == 0.0 {
            price = load.bid_price;
        }
    }

    (price, dispatch)
}

/// Solves the DC power-flow angle equations `B * theta = P` for one
/// connected component via Gaussian elimination on the reduced (slack-bus
/// removed) susceptance matrix. The first bus in `component` is the slack
/// reference with angle fixed at zero.
fn solve_angles(
    component: &[BusId],
    lines: &[LineVariable],
    injections: &HashMap<BusId, f64>,
) -> Result<HashMap<BusId, f64>, SolverFailure> {
    let slack = component[0];
    let others: Vec<BusId> = component.iter().copied().filter(|b| *b != slack).collect();
    let n = others.len();
    if n == 0 {
        return Ok([(slack, 0.0)].into_iter().collect());
    }
    let index: HashMap<BusId, usize> = others.iter().enumerate().map(|(i, b)| (*b, i)).collect();

    let mut b_matrix = vec![vec![0.0_f64; n]; n];
    let mut p_vector = vec![0.0_f64; n];
    for bus in &others {
        p_vector[index[bus]] = injections.get(bus).copied().unwrap_or(0.0);
    }

    for line in lines {
        let susceptance = 1.0 / line.reactance;
        let i = index.get(&line.bus1).copied();
        let j = index.get(&line.bus2).copied();
        if let Some(i) = i {
            b_matrix[i][i] += susceptance;
        }
        if let Some(j) = j {
            b_matrix[j][j] += susceptance;
        }
        if let (Some(i), Some(j)) = (i, j) {
            b_matrix[i][j] -= susceptance;
            b_matrix[j][i] -= susceptance;
        }
    }

    let theta = gaussian_solve(b_matrix, p_vector)
        .ok_or_else(|| SolverFailure { message: "singular power-flow system".to_string() })?;

    let mut result = HashMap::new();
    result.insert(slack, 0.0);
    for (bus, idx) in index {
        result.insert(bus, theta[idx]);
    }
    Ok(result)
}

/// Dense Gaussian elimination with partial pivoting. Returns `None` on a
/// numerically singular system (an isolated or over-decoupled component).
fn gaussian_solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().partial_cmp(&a[j][col].abs()).unwrap())?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let sum: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - sum) / a[row][row];
    }
    Some(x)
}

fn connected_components(buses: &[BusId], lines: &[LineVariable]) -> Vec<Vec<BusId>> {
    let mut adjacency: HashMap<BusId, Vec<BusId>> = buses.iter().map(|b| (*b, Vec::new())).collect();
    for line in lines {
        adjacency.entry(line.bus1).or_default().push(line.bus2);
        adjacency.entry(line.bus2).or_default().push(line.bus1);
    }

    let mut visited: HashSet<BusId> = HashSet::new();
    let mut components = Vec::new();
    for &start in buses {
        if visited.contains(&start) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start];
        while let Some(b) = stack.pop() {
            if !visited.insert(b) {
                continue;
            }
            component.push(b);
            for &neighbor in adjacency.get(&b).into_iter().flatten() {
                if !visited.contains(&neighbor) {
                    stack.push(neighbor);
                }
            }
        }
        components.push(component);
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: i64, bus: i64, sign: f64, cap: f64, bid: f64) -> AssetVariable {
        AssetVariable { asset_id: AssetId(id), bus: BusId(bus), sign, sampled_capacity: cap, bid_price: bid }
    }

    #[test]
    fn connected_components_splits_disjoint_buses() {
        let buses = vec![BusId(0), BusId(1), BusId(2)];
        let lines = vec![LineVariable {
            line_id: TransmissionId(0),
            bus1: BusId(0),
            bus2: BusId(1),
            reactance: 0.1,
            capacity: 10.0,
        }];
        let components = connected_components(&buses, &lines);
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn gaussian_solve_handles_simple_system() {
        let a = vec![vec![2.0, 0.0], vec![0.0, 2.0]];
        let b = vec![4.0, 6.0];
        let x = gaussian_solve(a, b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn uncongested_two_bus_network_clears_at_single_price() {
        let problem = Problem {
            buses: vec![BusId(0), BusId(1)],
            lines: vec![LineVariable {
                line_id: TransmissionId(0),
                bus1: BusId(0),
                bus2: BusId(1),
                reactance: 0.1,
                capacity: 1000.0,
            }],
            assets: vec![asset(0, 0, 1.0, 50.0, 10.0), asset(1, 1, -1.0, 50.0, 10.0)],
        };
        let result = ReferenceSolver.solve(&problem).unwrap();
        assert_eq!(result.bus_price(BusId(0)), result.bus_price(BusId(1)));
        assert!((result.dispatch(AssetId(0)) - 50.0).abs() < 1e-6);
    }

    #[test]
    fn congested_line_is_pinned_at_capacity() {
        let problem = Problem {
            buses: vec![BusId(0), BusId(1)],
            lines: vec![LineVariable {
                line_id: TransmissionId(0),
                bus1: BusId(0),
                bus2: BusId(1),
                reactance: 0.1,
                capacity: 5.0,
            }],
            assets: vec![asset(0, 0, 1.0, 50.0, 10.0), asset(1, 1, -1.0, 50.0, 10.0)],
        };
        let result = ReferenceSolver.solve(&problem).unwrap();
        assert!(result.flow(TransmissionId(0)).abs() <= 5.0 + 1e-6);
    }

    #[test]
    fn empty_problem_returns_empty_result() {
        let problem = Problem { buses: vec![], lines: vec![], assets: vec![] };
        let result = ReferenceSolver.solve(&problem).unwrap();
        assert!(result.bus_prices.is_empty());
    }
}
