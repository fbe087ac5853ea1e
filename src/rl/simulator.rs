//! Replay full games with a learned policy or value function.

use std::fmt;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rl::env::{Environment, GameState};
use crate::rl::table::{Policy, ValueTable};

/// Who won a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundWinner {
    /// The agent played the higher card.
    Agent,
    /// The opponent played the higher card.
    Opponent,
}

/// Result of a whole game, by the sign of the total reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// Positive total reward.
    AgentWins,
    /// Negative total reward.
    OpponentWins,
    /// Zero total reward.
    Tie,
}

impl GameOutcome {
    /// Classify a total reward.
    pub fn from_total(total: f64) -> Self {
        if total > 0.0 {
            GameOutcome::AgentWins
        } else if total < 0.0 {
            GameOutcome::OpponentWins
        } else {
            GameOutcome::Tie
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::AgentWins => write!(f, "Agent wins"),
            GameOutcome::OpponentWins => write!(f, "Opponent wins"),
            GameOutcome::Tie => write!(f, "Tie"),
        }
    }
}

/// One played round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRecord<S, I> {
    /// State the action was chosen in.
    pub state: S,
    /// Index of the action taken.
    pub action: usize,
    /// Step details reported by the environment.
    pub info: I,
    /// Reward of the round.
    pub reward: f64,
    /// Winner of the round.
    pub winner: RoundWinner,
}

/// Full record of a simulated game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord<S, I> {
    /// Rounds in play order.
    pub rounds: Vec<RoundRecord<S, I>>,
    /// Sum of all round rewards.
    pub total_reward: f64,
    /// Outcome derived from `total_reward`.
    pub outcome: GameOutcome,
}

/// Plays games on its own environment.
///
/// The random number generator is only used when a policy has no entry for
/// the current state.
pub struct Simulator<E: Environment> {
    env: E,
    rng: StdRng,
}

impl<E: Environment> Simulator<E> {
    /// Create a simulator. `seed` seeds the fallback action generator.
    pub fn new(env: E, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { env, rng }
    }

    /// Play one game following `policy`.
    ///
    /// States without a policy entry get a uniformly random legal action.
    pub fn play_policy(&mut self, policy: &Policy<E::State>, seed: Option<u64>) -> Result<GameRecord<E::State, E::Info>> {
        self.play(seed, |env, rng| {
            let state = env.state();
            Ok(match policy.action(&state) {
                Some(action) => action,
                None => rng.gen_range(0..env.num_actions()),
            })
        })
    }

    /// Play one game greedily with respect to `values`.
    ///
    /// Each action is tried on a clone of the environment and scored by the
    /// value of the state it leads to. The first best action wins.
    pub fn play_values(&mut self, values: &ValueTable<E::State>, seed: Option<u64>) -> Result<GameRecord<E::State, E::Info>> {
        self.play(seed, |env, _| {
            let mut best_score = f64::NEG_INFINITY;
            let mut best_action = 0;
            for action in 0..env.num_actions() {
                let mut lookahead = env.clone();
                let transition = lookahead.step(action)?;
                let score = values.get(&transition.state);
                if score > best_score {
                    best_score = score;
                    best_action = action;
                }
            }
            Ok(best_action)
        })
    }

    fn play<F>(&mut self, seed: Option<u64>, mut choose: F) -> Result<GameRecord<E::State, E::Info>>
    where
        F: FnMut(&E, &mut StdRng) -> Result<usize>,
    {
        let mut state = self.env.reset(seed);
        let mut rounds = Vec::new();
        let mut total_reward = 0.0;

        while !state.is_terminal() {
            let action = choose(&self.env, &mut self.rng)?;
            let transition = self.env.step(action)?;
            let winner = if transition.reward > 0.0 {
                RoundWinner::Agent
            } else {
                RoundWinner::Opponent
            };

            debug!(
                "round {}: {} | {:?} -> {:?} ({:+})",
                rounds.len() + 1,
                state.key(),
                transition.info,
                winner,
                transition.reward
            );

            total_reward += transition.reward;
            rounds.push(RoundRecord {
                state,
                action,
                info: transition.info,
                reward: transition.reward,
                winner,
            });
            state = transition.state;
        }

        let outcome = GameOutcome::from_total(total_reward);
        debug!("game over: total reward {}, {}", total_reward, outcome);

        Ok(GameRecord {
            rounds,
            total_reward,
            outcome,
        })
    }

    /// Get reference to the environment.
    pub fn env(&self) -> &E {
        &self.env
    }
}

impl<S, I> GameRecord<S, I> {
    /// Number of rounds the agent won.
    pub fn rounds_won(&self) -> usize {
        self.rounds
            .iter()
            .filter(|r| r.winner == RoundWinner::Agent)
            .count()
    }
}
