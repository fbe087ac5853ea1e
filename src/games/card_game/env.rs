//! The card game environment.
//!
//! ## Rules
//!
//! - Cards `1..=n` are shuffled; the opponent gets the first `n/2` in shuffle
//!   order, the agent gets the rest (sorted).
//! - Each round the agent picks any of its cards, the opponent plays its top
//!   card. Higher card wins: reward `+1` for the agent, otherwise `-1`.
//! - After the deal and after every round a fair coin decides whether the
//!   opponent's next card is shown to the agent.
//! - The game ends when the opponent's deck is empty.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{GameError, Result};
use crate::games::card_game::state::{Card, CardState, Signal};
use crate::rl::config::GameConfig;
use crate::rl::env::{Environment, Outcome, StateInjection, Transition};

/// Card game environment with the opponent-card-shown visibility rule.
///
/// Owns its random number generator. Cloning yields an independent snapshot
/// that will also produce the same future coin flips.
#[derive(Debug, Clone)]
pub struct CardGameEnv {
    config: GameConfig,
    agent: Vec<Card>,
    opponent: Vec<Card>,
    signal: Signal,
    round: usize,
    rng: StdRng,
}

/// The two cards played in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayedCards {
    /// Card the agent played.
    pub agent: Card,
    /// Card the opponent played.
    pub opponent: Card,
}

impl PlayedCards {
    /// Whether the agent's card beat the opponent's.
    pub fn agent_wins(&self) -> bool {
        self.agent > self.opponent
    }
}

impl fmt::Display for PlayedCards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.agent, self.opponent)
    }
}

/// Number of cards dealt to (agent, opponent) for a deck of `deck_size`.
///
/// For odd decks the agent receives the extra card.
pub fn hand_sizes(deck_size: usize) -> (usize, usize) {
    let opponent = deck_size / 2;
    (deck_size - opponent, opponent)
}

impl CardGameEnv {
    /// Create a new environment. No cards are dealt until [`Environment::reset`].
    ///
    /// # Errors
    /// `GameError::InvalidConfiguration` if the deck has fewer than two cards.
    pub fn new(config: GameConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            agent: Vec::new(),
            opponent: Vec::new(),
            signal: Signal::Hidden,
            round: 0,
            rng,
        })
    }

    /// Shorthand for `CardGameEnv::new(GameConfig::new(deck_size).with_seed(seed))`.
    pub fn with_seed(deck_size: usize, seed: u64) -> Result<Self> {
        Self::new(GameConfig::new(deck_size).with_seed(seed))
    }

    /// Reseed the environment's random number generator.
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// The game configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Rounds played since the last reset.
    pub fn round(&self) -> usize {
        self.round
    }

    /// Current visibility signal.
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Remove the chosen agent card and the opponent's top card.
    ///
    /// Returns the played cards and the reward. The signal is left as is.
    fn play_round(&mut self, action: usize) -> Result<(PlayedCards, f64)> {
        let legal = self.num_actions();
        if action >= legal {
            return Err(GameError::OutOfRange { action, legal });
        }

        let played = PlayedCards {
            agent: self.agent.remove(action),
            opponent: self.opponent.remove(0),
        };
        self.round += 1;

        let reward = if played.agent_wins() { 1.0 } else { -1.0 };
        Ok((played, reward))
    }

    /// Flip the visibility coin for the current opponent deck.
    ///
    /// The coin is consumed even when the opponent has no cards left.
    fn flip_signal(&mut self) -> Signal {
        let reveal = self.rng.gen_bool(0.5);
        signal_for(&self.opponent, reveal)
    }

    fn transition(&self, info: PlayedCards, reward: f64) -> Transition<CardState, PlayedCards> {
        Transition {
            state: self.state(),
            reward,
            done: self.opponent.is_empty(),
            info,
        }
    }

    fn validate_injection(&self, state: &CardState) -> Result<()> {
        let deck_size = self.config.deck_size;
        let mut seen = vec![false; deck_size + 1];

        for &card in state.agent().iter().chain(state.opponent()) {
            let index = card as usize;
            if card == 0 || index > deck_size {
                return Err(GameError::InvalidState(format!(
                    "card {} is outside 1..={}",
                    card, deck_size
                )));
            }
            if seen[index] {
                return Err(GameError::InvalidState(format!("card {} appears twice", card)));
            }
            seen[index] = true;
        }

        let extra = deck_size % 2;
        if state.agent().len() != state.opponent().len() + extra {
            return Err(GameError::InvalidState(format!(
                "agent holds {} cards but opponent holds {}",
                state.agent().len(),
                state.opponent().len()
            )));
        }

        if let Some(card) = state.signal().shown_card() {
            if state.opponent().first() != Some(&card) {
                return Err(GameError::InvalidState(format!(
                    "shown card {} is not the opponent's top card",
                    card
                )));
            }
        }

        Ok(())
    }
}

fn signal_for(opponent: &[Card], reveal: bool) -> Signal {
    match opponent.first() {
        Some(&top) if reveal => Signal::Shown(top),
        _ => Signal::Hidden,
    }
}

impl Environment for CardGameEnv {
    type State = CardState;
    type Info = PlayedCards;

    fn deck_size(&self) -> usize {
        self.config.deck_size
    }

    fn reset(&mut self, seed: Option<u64>) -> CardState {
        if let Some(seed) = seed {
            self.seed(seed);
        }

        // deck_size <= 255 is enforced by GameConfig::validate
        let mut deck: Vec<Card> = (1..=self.config.deck_size as Card).collect();
        deck.shuffle(&mut self.rng);

        let (_, opponent_len) = hand_sizes(self.config.deck_size);
        self.opponent = deck[..opponent_len].to_vec();
        self.agent = deck[opponent_len..].to_vec();
        self.agent.sort_unstable();
        self.round = 0;
        self.signal = self.flip_signal();

        self.state()
    }

    fn step(&mut self, action: usize) -> Result<Transition<CardState, PlayedCards>> {
        let (info, reward) = self.play_round(action)?;
        self.signal = self.flip_signal();
        Ok(self.transition(info, reward))
    }

    fn state(&self) -> CardState {
        CardState::new(self.agent.clone(), self.opponent.clone(), self.signal)
    }

    fn num_actions(&self) -> usize {
        if self.opponent.is_empty() {
            0
        } else {
            self.agent.len()
        }
    }
}

impl StateInjection for CardGameEnv {
    fn inject(&mut self, state: &CardState) -> Result<()> {
        self.validate_injection(state)?;

        let (_, opponent_len) = hand_sizes(self.config.deck_size);
        self.agent = state.agent().to_vec();
        self.opponent = state.opponent().to_vec();
        self.signal = state.signal();
        self.round = opponent_len - state.rounds_left();
        Ok(())
    }

    fn outcomes(&self, action: usize) -> Result<Vec<Outcome<CardState, PlayedCards>>> {
        let mut played = self.clone();
        let (info, reward) = played.play_round(action)?;

        if played.opponent.is_empty() {
            played.signal = Signal::Hidden;
            return Ok(vec![Outcome {
                probability: 1.0,
                transition: played.transition(info, reward),
            }]);
        }

        Ok([true, false]
            .into_iter()
            .map(|reveal| {
                let mut branch = played.clone();
                branch.signal = signal_for(&branch.opponent, reveal);
                Outcome {
                    probability: 0.5,
                    transition: branch.transition(info, reward),
                }
            })
            .collect())
    }
}

impl fmt::Display for CardGameEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Round {} | Agent Deck: {:?}, Opponent Deck: {:?}, Opponent Card Shown: {}",
            self.round, self.agent, self.opponent, self.signal
        )
    }
}
