//! Error types shared by the environment and the solvers.

use thiserror::Error;

use crate::rl::config::ConfigError;

/// Errors raised by the card game environment and the learning algorithms.
///
/// Every variant is recoverable at the call site. None of them leaves a value
/// table half-updated: a failing value-iteration sweep is discarded before it is
/// committed.
#[derive(Debug, Error)]
pub enum GameError {
    /// The deck cannot be dealt into two playable hands.
    #[error("invalid configuration for deck size {deck_size}: {reason}")]
    InvalidConfiguration {
        /// Requested deck size.
        deck_size: usize,
        /// Why the deck size was rejected.
        reason: String,
    },

    /// The action index is not a legal card position.
    #[error("action {action} is out of range ({legal} legal actions)")]
    OutOfRange {
        /// Requested action index.
        action: usize,
        /// Number of legal actions in the current state.
        legal: usize,
    },

    /// A state space was built for a different deck than the environment plays.
    #[error("state space was enumerated for {found} cards but the environment deals {expected}")]
    ConfigurationMismatch {
        /// Deck size of the environment.
        expected: usize,
        /// Deck size the state space was enumerated for.
        found: usize,
    },

    /// Value iteration hit its sweep cap before the residual fell below the threshold.
    #[error("value iteration did not converge after {sweeps} sweeps (residual {residual:.3e}, threshold {threshold:.3e})")]
    NonConvergence {
        /// Sweeps performed.
        sweeps: usize,
        /// Bellman residual of the last sweep.
        residual: f64,
        /// Requested convergence threshold.
        threshold: f64,
    },

    /// A state handed to the injection hook violates the deal invariants.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid solver or game configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GameError>;
