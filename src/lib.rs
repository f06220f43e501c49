//! # PowerFlow Game
//!
//! A deterministic, message-driven game core for a multiplayer turn-based
//! electricity-market simulation. Players buy generators, loads, and
//! transmission lines on a shared grid, bid into a day-ahead auction each
//! round, and get settled by a zonal market-coupling solver.
//!
//! ## Overview
//!
//! The crate is organized around a single entry point, [`engine::handle_message`],
//! that takes a [`state::GameState`] and a [`message::ToGameMessage`] and
//! returns the next state plus any outbound messages. Everything upstream of
//! that function — persistence, session routing, the phase-conclusion loop —
//! lives in [`manager::GameManager`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use powerflow_game::{GameManager, GameSettings, InMemoryGameRepo, RecordingFrontEnd};
//!
//! let manager = GameManager::new(InMemoryGameRepo::new(), RecordingFrontEnd::new());
//! let game_id = manager.new_game(vec!["Alice".to_string(), "Bob".to_string()], GameSettings::default()).unwrap();
//! let state = manager.get_game_state(game_id).unwrap().unwrap();
//! println!("game {} has {} buses", game_id, state.buses.len());
//! ```

pub mod asset;
pub mod bus;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod finance;
pub mod ids;
pub mod init;
pub mod invariant;
pub mod manager;
pub mod market_result;
pub mod message;
pub mod player;
pub mod referee;
pub mod replay;
pub mod session;
pub mod solver;
pub mod state;
pub mod transmission;

pub use asset::{Asset, AssetRepo, AssetType};
pub use bus::{Bus, BusRepo};
pub use config::{GameSettings, PresetName};
pub use database::{export_settlement_history, FileGameRepo, GameRepo, InMemoryGameRepo, SettlementRow};
pub use engine::{handle_message, maybe_conclude_phase};
pub use error::{GameError, Result};
pub use finance::cashflows_after_delivery;
pub use ids::{AssetId, BusId, GameId, PlayerId, PurchaseId, Round, TransmissionId};
pub use init::initialize_game;
pub use invariant::{check_all, Invariant, InvariantViolation};
pub use manager::GameManager;
pub use market_result::MarketCouplingResult;
pub use message::{decode_to_game_message, Envelope, ToGameMessage, ToPlayerMessage};
pub use player::{Player, PlayerRepo};
pub use replay::{replay, ActionLog, LoggedAction};
pub use session::{FrontEnd, RecordingFrontEnd, SessionRegistry};
pub use solver::{Problem, ReferenceSolver, Solver, SolverFailure, SolverSolution};
pub use state::{GameState, Phase};
pub use transmission::{Transmission, TransmissionRepo};
