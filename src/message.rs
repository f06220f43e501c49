//! Inbound and outbound game messages, and the transport-level envelope
//! they travel inside.
//!
//! Every variant below corresponds to one wire `message_type`. The engine
//! only ever speaks this vocabulary: it neither knows nor cares how a
//! message arrived (WebSocket frame, CLI injection, replay log).

use crate::error::{GameError, Result};
use crate::ids::{AssetId, GameId, PlayerId, PurchaseId, Round, TransmissionId};
use crate::state::{GameState, Phase};
use serde::{Deserialize, Serialize};

/// An action open or close a player can request of a line they own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineAction {
    Open,
    Close,
}

/// An action to start up or shut down an asset a player owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetAction {
    Startup,
    Shutdown,
}

/// The outcome of an open/close or startup/shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperateResult {
    Success,
    NoChange,
    Failure,
}

/// Every message the engine can accept, tagged by `message_type` on the
/// wire. `ConcludePhase` is internal: it never arrives over a transport, it
/// is produced by the engine itself and fed back through the manager's
/// phase-conclusion loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ToGameMessage {
    ConcludePhase { phase: Phase },
    BuyRequest { player_id: PlayerId, purchase_id: PurchaseId },
    UpdateBidRequest { player_id: PlayerId, asset_id: AssetId, bid_price: f64 },
    OperateLineRequest { player_id: PlayerId, transmission_id: TransmissionId, action: LineAction },
    OperateAssetRequest { player_id: PlayerId, asset_id: AssetId, action: AssetAction },
    EndTurn { player_id: PlayerId },
}

impl ToGameMessage {
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            ToGameMessage::ConcludePhase { .. } => None,
            ToGameMessage::BuyRequest { player_id, .. }
            | ToGameMessage::UpdateBidRequest { player_id, .. }
            | ToGameMessage::OperateLineRequest { player_id, .. }
            | ToGameMessage::OperateAssetRequest { player_id, .. }
            | ToGameMessage::EndTurn { player_id } => Some(*player_id),
        }
    }
}

/// The `message_type` values a client is allowed to send. `conclude_phase`
/// is deliberately excluded: it is an internal re-dispatch the engine feeds
/// to itself, never a valid inbound wire message.
const INBOUND_MESSAGE_TYPES: &[&str] =
    &["buy_request", "update_bid_request", "operate_line_request", "operate_asset_request", "end_turn"];

/// Decodes a raw JSON envelope body into a [`ToGameMessage`], distinguishing
/// an unrecognised `message_type` (`GameError::UnsupportedMessage`) from any
/// other malformed envelope — missing tag, bad JSON, wrong field shape
/// (`GameError::ProtocolError`).
pub fn decode_to_game_message(raw: &str) -> Result<ToGameMessage> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| GameError::ProtocolError(format!("invalid JSON: {}", e)))?;
    let message_type = value
        .get("message_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GameError::ProtocolError("envelope is missing a message_type field".to_string()))?;
    if !INBOUND_MESSAGE_TYPES.contains(&message_type) {
        return Err(GameError::UnsupportedMessage(message_type.to_string()));
    }
    serde_json::from_value(value).map_err(|e| GameError::ProtocolError(format!("invalid message: {}", e)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyResponse {
    pub player_id: PlayerId,
    pub success: bool,
    pub message: String,
    pub purchase_id: PurchaseId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateBidResponse {
    pub player_id: PlayerId,
    pub success: bool,
    pub message: String,
    pub asset_id: AssetId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperateLineResponse {
    pub player_id: PlayerId,
    pub transmission_id: TransmissionId,
    pub result: OperateResult,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperateAssetResponse {
    pub player_id: PlayerId,
    pub asset_id: AssetId,
    pub result: OperateResult,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadsDeactivatedMessage {
    pub player_id: PlayerId,
    pub asset_ids: Vec<AssetId>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCreamMeltedMessage {
    pub player_id: PlayerId,
    pub asset_id: AssetId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetWornMessage {
    pub player_id: PlayerId,
    pub asset_id: AssetId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionWornMessage {
    pub player_id: PlayerId,
    pub transmission_id: TransmissionId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEliminatedMessage {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOverMessage {
    pub player_id: PlayerId,
    pub winner: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionClearedMessage {
    pub player_id: PlayerId,
    pub cashflow: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub player_id: PlayerId,
    pub game_state: GameState,
}

/// Every message the engine can emit, tagged by `message_type` on the wire.
/// Each variant's implicit destination is read off its own `player_id`
/// field by the manager's fan-out step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ToPlayerMessage {
    GameUpdate(GameUpdate),
    BuyResponse(BuyResponse),
    UpdateBidResponse(UpdateBidResponse),
    OperateLineResponse(OperateLineResponse),
    OperateAssetResponse(OperateAssetResponse),
    LoadsDeactivated(LoadsDeactivatedMessage),
    IceCreamMelted(IceCreamMeltedMessage),
    AssetWorn(AssetWornMessage),
    TransmissionWorn(TransmissionWornMessage),
    PlayerEliminated(PlayerEliminatedMessage),
    GameOver(GameOverMessage),
    AuctionCleared(AuctionClearedMessage),
}

impl ToPlayerMessage {
    pub fn player_id(&self) -> PlayerId {
        match self {
            ToPlayerMessage::GameUpdate(m) => m.player_id,
            ToPlayerMessage::BuyResponse(m) => m.player_id,
            ToPlayerMessage::UpdateBidResponse(m) => m.player_id,
            ToPlayerMessage::OperateLineResponse(m) => m.player_id,
            ToPlayerMessage::OperateAssetResponse(m) => m.player_id,
            ToPlayerMessage::LoadsDeactivated(m) => m.player_id,
            ToPlayerMessage::IceCreamMelted(m) => m.player_id,
            ToPlayerMessage::AssetWorn(m) => m.player_id,
            ToPlayerMessage::TransmissionWorn(m) => m.player_id,
            ToPlayerMessage::PlayerEliminated(m) => m.player_id,
            ToPlayerMessage::GameOver(m) => m.player_id,
            ToPlayerMessage::AuctionCleared(m) => m.player_id,
        }
    }
}

/// The symmetric wire envelope carried by whatever transport hosts a game
/// session. `round` is populated on outbound envelopes for client
/// bookkeeping and ignored on inbound ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<M> {
    pub game_id: GameId,
    pub player_id: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<Round>,
    #[serde(flatten)]
    pub message: M,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AssetId;

    #[test]
    fn to_game_message_round_trips_through_json() {
        let msg = ToGameMessage::UpdateBidRequest { player_id: PlayerId(1), asset_id: AssetId(2), bid_price: 9.5 };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"message_type\":\"update_bid_request\""));
        let back: ToGameMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn conclude_phase_has_no_player_id() {
        let msg = ToGameMessage::ConcludePhase { phase: Phase::Construction };
        assert_eq!(msg.player_id(), None);
    }

    #[test]
    fn to_player_message_reports_destination_player() {
        let msg = ToPlayerMessage::AuctionCleared(AuctionClearedMessage { player_id: PlayerId(3), cashflow: 12.0 });
        assert_eq!(msg.player_id(), PlayerId(3));
    }

    #[test]
    fn purchase_id_tag_distinguishes_asset_from_transmission() {
        let buy = ToGameMessage::BuyRequest { player_id: PlayerId(0), purchase_id: PurchaseId::Asset(AssetId(5)) };
        let json = serde_json::to_string(&buy).unwrap();
        assert!(json.contains("\"kind\":\"Asset\""));
    }

    #[test]
    fn decode_accepts_a_recognised_message_type() {
        let raw = r#"{"message_type":"end_turn","player_id":0}"#;
        let msg = decode_to_game_message(raw).unwrap();
        assert_eq!(msg, ToGameMessage::EndTurn { player_id: PlayerId(0) });
    }

    #[test]
    fn decode_rejects_an_unrecognised_message_type_as_unsupported() {
        let raw = r#"{"message_type":"teleport_request","player_id":0}"#;
        let err = decode_to_game_message(raw).unwrap_err();
        assert!(matches!(err, GameError::UnsupportedMessage(ref kind) if kind == "teleport_request"));
    }

    #[test]
    fn decode_rejects_conclude_phase_as_unsupported_since_it_is_internal_only() {
        let raw = r#"{"message_type":"conclude_phase","phase":"construction"}"#;
        let err = decode_to_game_message(raw).unwrap_err();
        assert!(matches!(err, GameError::UnsupportedMessage(_)));
    }

    #[test]
    fn decode_reports_a_missing_message_type_as_a_protocol_error() {
        let raw = r#"{"player_id":0}"#;
        let err = decode_to_game_message(raw).unwrap_err();
        assert!(matches!(err, GameError::ProtocolError(_)));
    }

    #[test]
    fn decode_reports_malformed_json_as_a_protocol_error() {
        let err = decode_to_game_message("not json").unwrap_err();
        assert!(matches!(err, GameError::ProtocolError(_)));
    }
}
