//! Card game with a partially shown opponent deck.
//!
//! ## Game Rules
//!
//! - Deck of `n` cards numbered `1..=n`
//! - The opponent holds `n/2` shuffled cards and always plays its top card
//! - The agent holds the remaining cards and chooses which one to play
//! - Higher card wins the round: `+1` for the agent, `-1` otherwise
//! - Before every round a fair coin decides whether the opponent's next card
//!   is shown to the agent
//!
//! ## Example Round
//!
//! ```text
//! Agent: [2, 4]   Opponent: [3, 1]   Shown: 3
//!   agent plays 4 vs 3  -> +1
//! Agent: [2]      Opponent: [1]      Shown: ?
//!   agent plays 2 vs 1  -> +1
//! ```

pub mod enumerate;
pub mod env;
pub mod state;

pub use enumerate::{enumerate_states, expected_state_count, MAX_ENUMERATED_STATES};
pub use env::{hand_sizes, CardGameEnv, PlayedCards};
pub use state::{Card, CardState, Signal};
