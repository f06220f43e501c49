//! Strongly typed identifiers used throughout the game core.
//!
//! Every entity kind gets its own nominal integer type so that, for example,
//! a `BusId` can never be passed where an `AssetId` is expected. All ids are
//! plain `i64` wrappers: negative values are reserved (see [`PlayerId::NPC`]),
//! everything else is assigned sequentially by the repository that owns it.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                $name(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                $name(value)
            }
        }
    };
}

id_type!(GameId);
id_type!(PlayerId);
id_type!(AssetId);
id_type!(BusId);
id_type!(TransmissionId);

impl PlayerId {
    /// The sentinel identifier for the house/bank player.
    ///
    /// The NPC owns every unsold asset and line at game start and collects
    /// congestion rent that belongs to no human. It is a full repository
    /// entry but is excluded from every "human players" view and must never
    /// be the destination of an outbound message.
    pub const NPC: PlayerId = PlayerId(-1);

    pub fn is_npc(&self) -> bool {
        *self == PlayerId::NPC
    }
}

/// The 1-based count of completed phase cycles.
pub type Round = u32;

/// Tags a generic purchase request by the kind of entity being bought,
/// mirroring the two concrete things a player can acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum PurchaseId {
    Asset(AssetId),
    Transmission(TransmissionId),
}

impl fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseId::Asset(id) => write!(f, "asset {}", id),
            PurchaseId::Transmission(id) => write!(f, "transmission {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npc_is_recognized() {
        assert!(PlayerId::NPC.is_npc());
        assert!(!PlayerId(0).is_npc());
        assert!(!PlayerId(3).is_npc());
    }

    #[test]
    fn ids_round_trip_through_json() {
        let id = AssetId(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let back: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn purchase_id_distinguishes_kinds() {
        let a = PurchaseId::Asset(AssetId(1));
        let t = PurchaseId::Transmission(TransmissionId(1));
        assert_ne!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&t).unwrap());
    }
}
