//! Environment traits shared by the learning algorithms.
//!
//! Any environment that implements [`Environment`] can be learned with TD(0)
//! and replayed by the simulator. Value iteration additionally needs the
//! privileged [`StateInjection`] hook to plan from arbitrary states.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::Result;

/// Trait for state keys used in value tables and policies.
///
/// A state must be an immutable value: two states are equal iff all their
/// components are equal, and equal states hash identically.
pub trait GameState: Clone + Eq + Hash + Debug + Send + Sync {
    /// Whether no further action is possible from this state.
    fn is_terminal(&self) -> bool;

    /// Number of legal actions (0 for terminal states).
    fn num_actions(&self) -> usize;

    /// Generate a compact human-readable key for this state.
    fn key(&self) -> String;
}

/// Result of one environment step.
///
/// `I` carries game-specific details of what happened (for the card game,
/// the two cards played).
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S, I> {
    /// State after the step.
    pub state: S,
    /// Immediate reward for the agent.
    pub reward: f64,
    /// Whether the episode is over.
    pub done: bool,
    /// Game-specific step details.
    pub info: I,
}

/// One possible result of an action together with its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<S, I> {
    /// Probability of this outcome given the pre-transition state and action.
    pub probability: f64,
    /// The transition that happens in this outcome.
    pub transition: Transition<S, I>,
}

/// The interface an agent uses to play the game.
///
/// `Clone` is the snapshot operation: a clone is a fully independent copy of
/// the environment (decks, signal and random number generator), so tentative
/// actions are evaluated on a clone, never by mutating and rolling back.
pub trait Environment: Clone + Send + Sync {
    /// The state key type.
    type State: GameState;

    /// Details reported with every transition.
    type Info: Clone + Debug + PartialEq + Send + Sync;

    /// Number of cards in the full deck this environment deals.
    fn deck_size(&self) -> usize;

    /// Start a new episode and return the initial state.
    ///
    /// With `Some(seed)` the environment's generator is reseeded first, which
    /// makes the deal and every later visibility coin reproducible.
    fn reset(&mut self, seed: Option<u64>) -> Self::State;

    /// Play the card at index `action` of the agent's deck.
    ///
    /// # Errors
    /// `GameError::OutOfRange` if `action >= self.num_actions()`.
    fn step(&mut self, action: usize) -> Result<Transition<Self::State, Self::Info>>;

    /// The current state.
    fn state(&self) -> Self::State;

    /// Number of legal actions in the current state.
    fn num_actions(&self) -> usize;
}

/// Privileged planning hook used only by the value-iteration engine.
///
/// Agents interact through [`Environment`] alone; the TD learner and the
/// simulator are bounded on that trait and cannot force a configuration.
pub trait StateInjection: Environment {
    /// Force the environment into the configuration encoded by `state`.
    ///
    /// # Errors
    /// `GameError::InvalidState` if the state violates the deal invariants.
    fn inject(&mut self, state: &Self::State) -> Result<()>;

    /// Every outcome of taking `action` from the current configuration.
    ///
    /// The environment itself is left untouched; each outcome is produced on
    /// an independent copy. Probabilities sum to 1.
    fn outcomes(&self, action: usize) -> Result<Vec<Outcome<Self::State, Self::Info>>>;
}

/// A finite set of states enumerated for one deck size.
///
/// Consumed by value iteration, which refuses to plan with an environment
/// that deals a different deck.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSpace<S> {
    deck_size: usize,
    states: Vec<S>,
}

impl<S> StateSpace<S> {
    /// Wrap `states` enumerated for a deck of `deck_size` cards.
    pub fn new(deck_size: usize, states: Vec<S>) -> Self {
        Self { deck_size, states }
    }

    /// Deck size the states were enumerated for.
    pub fn deck_size(&self) -> usize {
        self.deck_size
    }

    /// All states, in enumeration order.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the space holds no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
