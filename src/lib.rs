//! # Card Game RL
//!
//! Tabular reinforcement learning on a two-player card game: an agent and a
//! fixed-order opponent each play one card per round, the higher card wins.
//!
//! ## Features
//!
//! - **Exhaustive State Enumeration**: Every reachable state for a deck size
//! - **Value Iteration**: Synchronous sweeps with optional rayon parallelism
//! - **TD(0) Prediction**: Random-behaviour episodes with reproducible seeds
//! - **Simulation**: Replay games with a policy or a value table
//!
//! ## Quick Start
//!
//! ```ignore
//! use card_game_rl::games::card_game::{enumerate_states, CardGameEnv};
//! use card_game_rl::rl::{ValueIteration, ValueIterationConfig};
//!
//! // 1. Create an environment and enumerate its states
//! let env = CardGameEnv::with_seed(8, 42)?;
//! let space = enumerate_states(8)?;
//!
//! // 2. Solve
//! let result = ValueIteration::new(env, ValueIterationConfig::default())?.solve(&space)?;
//!
//! // 3. Inspect
//! result.ensure_converged()?;
//! let action = result.policy.action(&some_state);
//! ```
//!
//! ## Modules
//!
//! - [`rl`]: Environment traits, value iteration, TD(0) and the simulator
//! - [`games`]: The card game environment and its state enumerator
//! - [`error`]: Crate error type
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐      ┌──────────────────────┐
//! │  State Enumerator   │─────▶│   Value Iteration    │──┐
//! └─────────────────────┘      │  (StateInjection)    │  │ values, policy
//!                              └──────────────────────┘  ▼
//! ┌─────────────────────┐      ┌──────────────────────┐  ┌───────────┐
//! │  CardGameEnv        │─────▶│   TD(0) Learner      │─▶│ Simulator │
//! │  (Environment)      │      │  (Environment only)  │  └───────────┘
//! └─────────────────────┘      └──────────────────────┘
//! ```

#![warn(missing_docs)]

/// Crate error type.
pub mod error;

/// Game implementations module.
///
/// Contains the card game used by the learning algorithms.
pub mod games;

/// Reinforcement learning module.
///
/// This is the core module containing the environment traits and the
/// generic planning and learning algorithms.
pub mod rl;

// Re-export commonly used types at crate root for convenience
pub use error::{GameError, Result};
pub use rl::{Environment, GameState, Policy, StateInjection, ValueIteration, ValueIterationConfig, ValueTable};
