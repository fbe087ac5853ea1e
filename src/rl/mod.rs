//! Tabular reinforcement learning over a finite card game.
//!
//! This module provides the planning and learning algorithms. They are
//! generic over the [`Environment`] trait, so any small episodic game with a
//! hashable state can be plugged in.
//!
//! # Algorithms
//!
//! - **Value Iteration**: synchronous Bellman sweeps over an enumerated state
//!   space, producing optimal values and a greedy policy
//! - **TD(0)**: incremental value prediction from episodes of a uniformly
//!   random agent
//! - **Simulator**: replays a full game with a policy or with one-step
//!   lookahead on a value table
//!
//! # Usage
//!
//! 1. Enumerate the state space for the deck size
//! 2. Create a `ValueIteration` engine with an environment and a config
//! 3. Call `solve()` and read `values` / `policy` off the result
//! 4. Replay games with `Simulator::play_policy`
//!
//! # Example
//!
//! ```
//! use card_game_rl::games::card_game::{enumerate_states, CardGameEnv};
//! use card_game_rl::rl::{Simulator, ValueIteration, ValueIterationConfig};
//!
//! let env = CardGameEnv::with_seed(6, 7).unwrap();
//! let space = enumerate_states(6).unwrap();
//!
//! let result = ValueIteration::new(env.clone(), ValueIterationConfig::default())
//!     .unwrap()
//!     .solve(&space)
//!     .unwrap();
//! println!("{} sweeps, residual {:e}", result.stats.sweeps, result.stats.residual);
//!
//! let mut simulator = Simulator::new(env, Some(0));
//! let record = simulator.play_policy(&result.policy, Some(1)).unwrap();
//! assert_eq!(record.rounds.len(), 3);
//! ```
//!
//! # Theory
//!
//! **Bellman optimality backup**, with the visibility coin resolved exactly:
//! ```text
//! V(s) = max_a Σ_s' P(s' | s, a) (r(s, a) + γ V(s'))
//! ```
//!
//! **TD(0) update** from a sampled transition `(s, r, s')`:
//! ```text
//! V(s) <- V(s) + α (r + γ V(s') - V(s))
//! ```
//!
//! # References
//!
//! - Sutton, R., Barto, A. "Reinforcement Learning: An Introduction", 2nd ed. (2018), ch. 4 and 6
//! - Bellman, R. "Dynamic Programming" (1957)

pub mod config;
pub mod env;
pub mod simulator;
pub mod table;
pub mod td;
pub mod value_iteration;

// Re-export main types for convenient access
pub use config::{BackupRule, ConfigError, GameConfig, SweepStats, TdConfig, TdStats, ValueIterationConfig};
pub use env::{Environment, GameState, Outcome, StateInjection, StateSpace, Transition};
pub use simulator::{GameOutcome, GameRecord, RoundRecord, RoundWinner, Simulator};
pub use table::{Policy, ValueTable, ValueTrace};
pub use td::{TdLearner, TdResult};
pub use value_iteration::{ValueIteration, ValueIterationResult};
