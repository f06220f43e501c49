//! Error types for the game core.
//!
//! Rule violations are data, not exceptions: a rejected purchase or bid is
//! reported back to the caller as a failure response, never as a
//! `GameError`. The variants here are reserved for conditions that leave no
//! sensible response to construct — a broken config file, a dead solver, a
//! storage failure — and always leave the game state untouched.
//!
//! # Examples
//!
//! ```
//! use powerflow_game::{GameError, GameSettings};
//!
//! let result = GameSettings::from_file("nonexistent.yaml");
//! match result {
//!     Ok(_) => println!("settings loaded"),
//!     Err(GameError::ConfigError(msg)) => println!("bad config: {}", msg),
//!     Err(e) => println!("other error: {}", e),
//! }
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// The error taxonomy for everything outside of in-game rule enforcement.
#[derive(Debug)]
pub enum GameError {
    /// A message variant the engine does not recognise.
    UnsupportedMessage(String),

    /// An entity with no free socket was asked to accept another asset or line.
    BusFull(String),

    /// The market-coupling solver did not return an optimal solution.
    OptimizationError(String),

    /// Reading or writing persisted game state failed.
    PersistenceError(io::Error),

    /// Sending or receiving over a session transport failed.
    TransportError(String),

    /// A malformed envelope: bad JSON, unknown message type, missing field.
    ProtocolError(String),

    /// The settings file was missing, unparseable, or failed validation.
    ConfigError(String),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::UnsupportedMessage(kind) => write!(f, "unsupported message: {}", kind),
            GameError::BusFull(msg) => write!(f, "bus full: {}", msg),
            GameError::OptimizationError(msg) => write!(f, "market coupling failed: {}", msg),
            GameError::PersistenceError(e) => write!(f, "persistence error: {}", e),
            GameError::TransportError(msg) => write!(f, "transport error: {}", msg),
            GameError::ProtocolError(msg) => write!(f, "protocol error: {}", msg),
            GameError::ConfigError(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl StdError for GameError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            GameError::PersistenceError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for GameError {
    fn from(err: io::Error) -> Self {
        GameError::PersistenceError(err)
    }
}

/// Type alias for `Result` with [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_maps_to_persistence_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: GameError = io_err.into();
        assert!(matches!(err, GameError::PersistenceError(_)));
    }

    #[test]
    fn display_messages_are_descriptive() {
        let err = GameError::BusFull("bus 3 has no free sockets".to_string());
        assert_eq!(err.to_string(), "bus full: bus 3 has no free sockets");
    }
}
