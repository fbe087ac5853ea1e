//! TD(0) prediction from random-behaviour episodes.
//!
//! The learner plays whole episodes with a uniformly random agent and after
//! every step moves the value of the left state toward the one-step target:
//!
//! ```text
//! V(s) <- V(s) + α (r + γ V(s') - V(s))
//! ```
//!
//! Terminal states are pinned at 0. The result therefore estimates the value
//! of the *random* policy, not the optimal one.

use std::hash::Hash;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::rl::config::{TdConfig, TdStats};
use crate::rl::env::{Environment, GameState};
use crate::rl::table::{ValueTable, ValueTrace};

/// Tabular TD(0) learner.
///
/// Owns the environment it plays on and a random number generator that
/// supplies both the episode seeds and the agent's actions.
pub struct TdLearner<E: Environment> {
    env: E,
    config: TdConfig,
    rng: StdRng,
}

/// Output of a TD(0) run.
#[derive(Debug, Clone)]
pub struct TdResult<S: Eq + Hash> {
    /// Learned values. Only visited states have an entry.
    pub values: ValueTable<S>,

    /// How often each state occurred across all episodes.
    pub visits: FxHashMap<S, u64>,

    /// `(episode seed, total reward)` for every episode, in play order.
    pub episode_returns: Vec<(u64, f64)>,

    /// Per-episode values of the tracked states.
    pub trace: ValueTrace<S>,

    /// Episode and update counts and timing.
    pub stats: TdStats,
}

impl<S: Eq + Hash> TdResult<S> {
    /// Number of times `state` occurred.
    pub fn visits(&self, state: &S) -> u64 {
        self.visits.get(state).copied().unwrap_or(0)
    }

    /// Returns of every episode dealt with `seed`.
    pub fn returns_for_seed(&self, seed: u64) -> impl Iterator<Item = f64> + '_ {
        self.episode_returns
            .iter()
            .filter(move |(s, _)| *s == seed)
            .map(|(_, r)| *r)
    }
}

impl<E: Environment> TdLearner<E> {
    /// Create a new learner.
    ///
    /// # Errors
    /// `GameError::Config` if the configuration is invalid.
    pub fn new(env: E, config: TdConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self { env, config, rng })
    }

    /// Run `config.episodes` episodes and return the learned values.
    pub fn learn(&mut self) -> Result<TdResult<E::State>> {
        let start_time = Instant::now();
        let episodes = self.config.episodes;

        let pb = if self.config.show_progress {
            ProgressBar::new(episodes)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template(
            "  TD(0) [{bar:40}] {pos}/{len} [{elapsed} < {eta}, {per_sec}] {msg}",
        ) {
            pb.set_style(style);
        }

        let mut values = ValueTable::new();
        let mut visits: FxHashMap<E::State, u64> = FxHashMap::default();
        let mut episode_returns = Vec::with_capacity(episodes as usize);
        let mut trace = ValueTrace::default();
        let mut stats = TdStats::new();

        info!(
            "TD(0) for {} episodes (alpha {}, gamma {})",
            episodes, self.config.alpha, self.config.gamma
        );

        for episode in 1..=episodes {
            let seed = self.next_episode_seed();
            let (total, updates) = self.run_episode(seed, &mut values, &mut visits)?;

            episode_returns.push((seed, total));
            stats.episodes = episode;
            stats.updates += updates;

            // Sampling needs a non-empty table, so the first chance is after episode 1.
            let track_from = self.config.track_after.max(1);
            if self.config.tracked_states > 0 && episode >= track_from {
                if episode == track_from {
                    trace = ValueTrace::new(self.sample_tracked(&values));
                }
                trace.record(&values);
            }

            pb.inc(1);
            if episode % 1000 == 0 {
                pb.set_message(format!("{} states", values.len()));
                debug!("episode {}: {} states in table", episode, values.len());
            }
        }

        pb.finish_and_clear();

        stats.states = values.len();
        stats.mean_return = if episode_returns.is_empty() {
            0.0
        } else {
            episode_returns.iter().map(|(_, r)| r).sum::<f64>() / episode_returns.len() as f64
        };
        stats.elapsed_seconds = start_time.elapsed().as_secs_f64();
        stats.update_rate();

        info!(
            "TD(0) finished: {} states, mean return {:.3} ({:.0} episodes/s)",
            stats.states, stats.mean_return, stats.episodes_per_second
        );

        Ok(TdResult {
            values,
            visits,
            episode_returns,
            trace,
            stats,
        })
    }

    /// Play one episode from the deal given by `seed`, updating `values` after
    /// every step. Returns (total reward, number of updates).
    fn run_episode(
        &mut self,
        seed: u64,
        values: &mut ValueTable<E::State>,
        visits: &mut FxHashMap<E::State, u64>,
    ) -> Result<(f64, u64)> {
        let mut state = self.env.reset(Some(seed));
        let mut total = 0.0;
        let mut updates = 0;

        while !state.is_terminal() {
            *visits.entry(state.clone()).or_insert(0) += 1;

            let action = self.rng.gen_range(0..self.env.num_actions());
            let transition = self.env.step(action)?;
            total += transition.reward;

            let next_value = if transition.done || transition.state.is_terminal() {
                values.set(transition.state.clone(), 0.0);
                0.0
            } else {
                values.get(&transition.state)
            };

            let target = transition.reward + self.config.gamma * next_value;
            let value = values.entry(state);
            *value += self.config.alpha * (target - *value);
            updates += 1;

            state = transition.state;
        }

        *visits.entry(state).or_insert(0) += 1;
        Ok((total, updates))
    }

    fn next_episode_seed(&mut self) -> u64 {
        match self.config.seed_pool {
            Some(pool) => self.rng.gen_range(0..=pool),
            None => self.rng.gen(),
        }
    }

    /// Sample up to `tracked_states` states from the table, in key order first
    /// so the choice does not depend on hash map iteration.
    fn sample_tracked(&mut self, values: &ValueTable<E::State>) -> Vec<E::State> {
        let mut known: Vec<&E::State> = values.iter().map(|(s, _)| s).collect();
        known.sort_by_cached_key(|s| s.key());
        known
            .choose_multiple(&mut self.rng, self.config.tracked_states)
            .map(|s| (*s).clone())
            .collect()
    }

    /// Get reference to the environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &TdConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use crate::games::card_game::{enumerate_states, CardGameEnv, CardState};
    use crate::rl::config::{BackupRule, ValueIterationConfig};
    use crate::rl::value_iteration::ValueIteration;
    use rustc_hash::FxHashSet;

    fn learn(deck_size: usize, config: TdConfig) -> TdResult<CardState> {
        let env = CardGameEnv::with_seed(deck_size, 0).unwrap();
        TdLearner::new(env, config).unwrap().learn().unwrap()
    }

    #[test]
    fn test_terminal_states_stay_at_zero() {
        let result = learn(6, TdConfig::new().with_episodes(500).with_seed(1));
        let terminals: Vec<&CardState> = result
            .values
            .iter()
            .map(|(s, _)| s)
            .filter(|s| s.is_terminal())
            .collect();
        assert!(!terminals.is_empty());
        for state in terminals {
            assert_eq!(result.values.get(state), 0.0);
        }
    }

    #[test]
    fn test_values_only_for_visited_states() {
        let result = learn(6, TdConfig::new().with_episodes(200).with_seed(2));
        for (state, _) in result.values.iter() {
            assert!(result.visits(state) > 0, "{} never visited", state);
        }
        assert_eq!(result.stats.episodes, 200);
        assert_eq!(result.stats.updates, 200 * 3);
        assert_eq!(result.episode_returns.len(), 200);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let config = TdConfig::new().with_episodes(300).with_seed(7);
        let first = learn(6, config.clone());
        let second = learn(6, config);
        assert_eq!(first.values, second.values);
        assert_eq!(first.episode_returns, second.episode_returns);
    }

    #[test]
    fn test_seed_pool_repeats_deals() {
        let result = learn(6, TdConfig::new().with_episodes(400).with_seed(3).with_seed_pool(9));
        let seeds: FxHashSet<u64> = result.episode_returns.iter().map(|(s, _)| *s).collect();
        assert!(seeds.iter().all(|&s| s <= 9));
        assert!(seeds.len() <= 10);

        let seed = result.episode_returns[0].0;
        assert!(result.returns_for_seed(seed).count() > 1);
        // Returns of one deal are bounded by the number of rounds.
        assert!(result.returns_for_seed(seed).all(|r| r.abs() <= 3.0));
    }

    #[test]
    fn test_tracked_states_start_after_warmup() {
        let result = learn(
            4,
            TdConfig::new()
                .with_episodes(250)
                .with_seed(4)
                .with_tracked_states(3),
        );
        assert_eq!(result.trace.states().len(), 3);
        for (_, history) in result.trace.iter() {
            assert_eq!(history.len(), 151);
        }
    }

    #[test]
    fn test_tracking_from_first_episode() {
        let config = TdConfig::from_json_str(
            r#"{"episodes": 50, "alpha": 0.2, "gamma": 0.9, "seed": 6, "tracked_states": 3, "track_after": 0}"#,
        )
        .unwrap();
        let result = learn(4, config);
        assert_eq!(result.trace.states().len(), 3);
        for (_, history) in result.trace.iter() {
            assert_eq!(history.len(), 50);
        }

        let result = learn(
            4,
            TdConfig::new()
                .with_episodes(40)
                .with_seed(6)
                .with_tracked_states(2)
                .with_track_after(10),
        );
        assert_eq!(result.trace.states().len(), 2);
        for (_, history) in result.trace.iter() {
            assert_eq!(history.len(), 31);
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let env = CardGameEnv::with_seed(4, 0).unwrap();
        assert!(matches!(
            TdLearner::new(env.clone(), TdConfig::new().with_alpha(0.0)),
            Err(GameError::Config(_))
        ));
        assert!(matches!(
            TdLearner::new(env, TdConfig::new().with_episodes(0)),
            Err(GameError::Config(_))
        ));
    }

    #[test]
    fn test_matches_random_policy_values() {
        let deck_size = 4;
        let truth = ValueIteration::new(
            CardGameEnv::with_seed(deck_size, 0).unwrap(),
            ValueIterationConfig::new()
                .with_gamma(1.0)
                .with_theta(1e-9)
                .with_backup(BackupRule::UniformRandom),
        )
        .unwrap()
        .solve(&enumerate_states(deck_size).unwrap())
        .unwrap();

        let result = learn(
            deck_size,
            TdConfig::new()
                .with_episodes(80_000)
                .with_alpha(0.005)
                .with_gamma(1.0)
                .with_seed(2024),
        );

        let mut compared = 0;
        for (state, value) in result.values.iter() {
            if result.visits(state) < 2000 {
                continue;
            }
            let expected = truth.values.get(state);
            assert!(
                (value - expected).abs() < 0.15,
                "{}: learned {} vs {}",
                state,
                value,
                expected
            );
            compared += 1;
        }
        assert!(compared >= 20, "only {} well-visited states", compared);
    }
}
