//! Game environments for the learning algorithms.
//!
//! ## Available Games
//!
//! - [`card_game`]: two-hand card game where the opponent's next card is
//!   sometimes shown to the agent
//!
//! ## Adding New Games
//!
//! 1. Create a new module under `src/games/`
//! 2. Define a state type implementing `GameState`
//! 3. Implement `Environment` (and `StateInjection` to plan with value iteration)
//! 4. Provide a state enumerator if the game is small enough for value iteration

pub mod card_game;
