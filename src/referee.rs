//! Rule enforcement: purchase validation, debt handling, wear, melting,
//! elimination, and game-over detection. Every function here is pure: it
//! takes a state and returns the next state plus the messages that resulted.

use crate::ids::{AssetId, PlayerId, PurchaseId, TransmissionId};
use crate::message::{
    BuyResponse, GameOverMessage, IceCreamMeltedMessage, LoadsDeactivatedMessage,
    PlayerEliminatedMessage, TransmissionWornMessage,
};
use crate::message::AssetWornMessage;
use crate::state::GameState;

/// Checks whether `player_id` may buy `purchase_id`, returning the failure
/// responses to send if not (empty means the purchase may proceed).
pub fn validate_purchase(
    state: &GameState,
    player_id: PlayerId,
    purchase_id: PurchaseId,
) -> Vec<BuyResponse> {
    let fail = |message: String| {
        vec![BuyResponse { player_id, success: false, message, purchase_id }]
    };

    let Some(player) = state.players.get(player_id) else {
        return fail(format!("player {} does not exist", player_id));
    };

    match purchase_id {
        PurchaseId::Asset(id) => {
            let Some(asset) = state.assets.get(id) else {
                return fail(format!("asset {} does not exist", id));
            };
            if !asset.is_for_sale {
                return fail(format!("asset {} is not for sale", id));
            }
            if player.money < asset.minimum_acquisition_price {
                return fail(format!("player {} cannot afford asset {}", player_id, id));
            }
        }
        PurchaseId::Transmission(id) => {
            let Some(line) = state.transmission.get(id) else {
                return fail(format!("transmission {} does not exist", id));
            };
            if !line.is_for_sale {
                return fail(format!("transmission {} is not for sale", id));
            }
            if player.money < line.minimum_acquisition_price {
                return fail(format!("player {} cannot afford transmission {}", player_id, id));
            }
        }
    }
    Vec::new()
}

/// Deactivates every load owned by a human whose money has gone negative,
/// emitting one notification per affected player.
pub fn deactivate_loads_of_players_in_debt(state: &mut GameState) -> Vec<LoadsDeactivatedMessage> {
    let mut messages = Vec::new();
    let debtors: Vec<PlayerId> =
        state.players.human_players().filter(|p| p.money < 0.0).map(|p| p.id).collect();

    for player_id in debtors {
        let load_ids: Vec<AssetId> = state
            .assets
            .get_all_for_player(player_id, false)
            .into_iter()
            .filter(|a| a.asset_type == crate::asset::AssetType::Load)
            .map(|a| a.id)
            .collect();
        if load_ids.is_empty() {
            continue;
        }
        state.assets.batch_deactivate(&load_ids);
        let name = state.players.get(player_id).map(|p| p.name.clone()).unwrap_or_default();
        messages.push(LoadsDeactivatedMessage {
            player_id,
            asset_ids: load_ids.clone(),
            message: format!(
                "Player {} has negative balance, all their loads ({:?}) have been deactivated.",
                name, load_ids
            ),
        });
    }
    messages
}

/// Melts one ice cream from every freezer that received exactly zero
/// dispatch in the just-cleared market. Freezers already at zero health are
/// left alone (they already stopped producing notifications).
pub fn melt_ice_creams(state: &mut GameState) -> Vec<IceCreamMeltedMessage> {
    let mcr = state.market_coupling_result.clone().unwrap_or_default();
    let melted_ids: Vec<AssetId> = state
        .assets
        .only_freezers()
        .filter(|f| f.health > 0 && mcr.dispatch(f.id) == 0.0)
        .map(|f| f.id)
        .collect();

    for id in &melted_ids {
        state.assets.melt_ice_cream(*id);
    }

    melted_ids
        .into_iter()
        .map(|id| {
            let asset = state.assets.get(id).expect("melted asset still exists");
            let message = if asset.health > 0 {
                format!(
                    "Ice cream melted in Freezer {} due to insufficient power dispatch. You only have {} ice creams left in this freezer.",
                    id, asset.health
                )
            } else {
                format!("Your Freezer {} has no ice creams left, you will not survive global warming.", id)
            };
            IceCreamMeltedMessage { player_id: asset.owner_player, asset_id: id, message }
        })
        .collect()
}

/// Wears one health point off every active line whose flow is at (or
/// numerically indistinguishable from) its capacity.
pub fn wear_congested_transmission(state: &mut GameState) -> Vec<TransmissionWornMessage> {
    const TOLERANCE: f64 = 1e-5;
    let mcr = state.market_coupling_result.clone().unwrap_or_default();
    let worn_ids: Vec<TransmissionId> = state
        .transmission
        .only_closed()
        .filter(|l| l.health > 0 && (l.capacity - mcr.flow(l.id).abs()).abs() <= TOLERANCE)
        .map(|l| l.id)
        .collect();

    for id in &worn_ids {
        state.transmission.wear_transmission(*id);
    }

    worn_ids
        .into_iter()
        .map(|id| {
            let line = state.transmission.get(id).expect("worn line still exists");
            let message = format!(
                "Transmission line {} has worn due to congestion, it can only withstand {} more congested periods.",
                id, line.health
            );
            TransmissionWornMessage { player_id: line.owner_player, transmission_id: id, message }
        })
        .collect()
}

/// Wears one health point off every non-freezer asset, regardless of
/// dispatch or congestion; this happens once per concluded auction.
pub fn wear_non_freezer_assets(state: &mut GameState) -> Vec<AssetWornMessage> {
    let worn_ids: Vec<AssetId> =
        state.assets.only_non_freezers().filter(|a| a.health > 0).map(|a| a.id).collect();

    for id in &worn_ids {
        state.assets.wear_asset(*id);
    }

    worn_ids
        .into_iter()
        .map(|id| {
            let asset = state.assets.get(id).expect("worn asset still exists");
            let message = if asset.health > 0 {
                format!("Asset {} has worn with time, it can only operate during the next {} rounds.", id, asset.health)
            } else {
                format!("Asset {} has worn with time and is no longer operational.", id)
            };
            AssetWornMessage { player_id: asset.owner_player, asset_id: id, message }
        })
        .collect()
}

/// Eliminates any living human whose owned freezers collectively hold zero
/// remaining ice-cream health.
pub fn eliminate_players(state: &mut GameState) -> Vec<PlayerEliminatedMessage> {
    let mut eliminated = Vec::new();
    let candidates: Vec<PlayerId> = state.players.only_alive().map(|p| p.id).collect();

    for player_id in candidates {
        let total_health: u32 = state
            .assets
            .get_all_for_player(player_id, false)
            .into_iter()
            .filter(|a| a.is_freezer)
            .map(|a| a.health)
            .sum();
        if total_health == 0 {
            state.players.eliminate_player(player_id);
            eliminated.push(PlayerEliminatedMessage { player_id });
        }
    }
    eliminated
}

/// Declares the game over once at most one human remains alive, addressed
/// to every human player (winner and eliminated alike), never to the NPC.
pub fn check_game_over(state: &GameState) -> Vec<GameOverMessage> {
    let living: Vec<PlayerId> = state.players.only_alive().map(|p| p.id).collect();
    if living.len() > 1 {
        return Vec::new();
    }
    let winner = living.first().copied();
    state
        .players
        .human_player_ids()
        .into_iter()
        .map(|player_id| GameOverMessage { player_id, winner })
        .collect()
}
