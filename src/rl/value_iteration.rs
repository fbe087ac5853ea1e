//! Value Iteration over an enumerated state space.
//!
//! Each sweep applies a Bellman backup to every state in the space:
//! - **Greedy**: `V(s) = max_a Σ p (r + γ V(s'))`, recording the first argmax
//! - **UniformRandom**: `V(s) = mean_a Σ p (r + γ V(s'))`
//!
//! Sweeps are synchronous. Every backup reads the previous sweep's table, and
//! the new table is committed only once the whole sweep succeeded. Iteration
//! stops when the sup-norm residual `max_s |V_new(s) - V_old(s)|` drops below
//! θ, or when the sweep cap is reached.

use std::hash::Hash;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{GameError, Result};
use crate::rl::config::{BackupRule, SweepStats, ValueIterationConfig};
use crate::rl::env::{GameState, StateInjection, StateSpace};
use crate::rl::table::{Policy, ValueTable, ValueTrace};

/// Dynamic-programming engine computing state values and a greedy policy.
///
/// # Example
/// ```
/// use card_game_rl::games::card_game::{enumerate_states, CardGameEnv};
/// use card_game_rl::rl::{ValueIteration, ValueIterationConfig};
///
/// let env = CardGameEnv::with_seed(4, 42).unwrap();
/// let space = enumerate_states(4).unwrap();
/// let config = ValueIterationConfig::default().with_gamma(1.0).with_theta(1e-6);
///
/// let result = ValueIteration::new(env, config).unwrap().solve(&space).unwrap();
/// assert!(result.converged());
/// ```
#[derive(Debug, Clone)]
pub struct ValueIteration<E: StateInjection> {
    /// Template environment. Backups run on clones of it.
    env: E,

    /// Configuration for the engine.
    config: ValueIterationConfig,
}

/// Output of a value-iteration run.
#[derive(Debug, Clone)]
pub struct ValueIterationResult<S: Eq + Hash> {
    /// Final state values. Every enumerated state has an entry.
    pub values: ValueTable<S>,

    /// Greedy policy from the last sweep (empty for `BackupRule::UniformRandom`).
    pub policy: Policy<S>,

    /// Sweep count, residuals and timing.
    pub stats: SweepStats,

    /// Per-sweep values of the tracked states.
    pub trace: ValueTrace<S>,

    threshold: f64,
}

impl<S: Eq + Hash> ValueIterationResult<S> {
    /// Whether the residual fell below the threshold before the sweep cap.
    pub fn converged(&self) -> bool {
        self.stats.converged
    }

    /// Turn a capped run into an error.
    ///
    /// The values and policy stay available on `self` either way.
    pub fn ensure_converged(&self) -> Result<()> {
        if self.stats.converged {
            Ok(())
        } else {
            Err(GameError::NonConvergence {
                sweeps: self.stats.sweeps,
                residual: self.stats.residual,
                threshold: self.threshold,
            })
        }
    }
}

/// Result of backing up a single state.
struct Backup {
    value: f64,
    action: Option<usize>,
}

/// Result of a full sweep, not yet committed.
struct Sweep<S: Eq + Hash> {
    values: ValueTable<S>,
    policy: Policy<S>,
    residual: f64,
}

impl<E: StateInjection> ValueIteration<E> {
    /// Create a new engine for the given environment.
    ///
    /// # Errors
    /// `GameError::Config` if the configuration is invalid.
    pub fn new(env: E, config: ValueIterationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { env, config })
    }

    /// Sweep `space` until convergence or until the sweep cap.
    ///
    /// Hitting the cap is not an error: the result carries `converged = false`
    /// together with the last values, policy and residual.
    ///
    /// # Errors
    /// - `GameError::ConfigurationMismatch` if `space` was enumerated for a
    ///   different deck size than the environment deals.
    /// - Any error raised while backing up a state. The sweep in progress is
    ///   discarded.
    pub fn solve(&self, space: &StateSpace<E::State>) -> Result<ValueIterationResult<E::State>> {
        if space.deck_size() != self.env.deck_size() {
            return Err(GameError::ConfigurationMismatch {
                expected: self.env.deck_size(),
                found: space.deck_size(),
            });
        }

        let start_time = Instant::now();
        let states = space.states();

        let mut values: ValueTable<E::State> = states.iter().map(|s| (s.clone(), 0.0)).collect();
        let mut policy;
        let mut stats = SweepStats::new();
        stats.states = states.len();
        let mut trace = ValueTrace::new(tracked_states(states, self.config.tracked_states));

        info!(
            "value iteration over {} states (gamma {}, theta {:e}, {:?})",
            states.len(),
            self.config.gamma,
            self.config.theta,
            self.config.backup
        );

        loop {
            let sweep = self.sweep(states, &values)?;
            values = sweep.values;
            policy = sweep.policy;
            stats.record_sweep(sweep.residual);
            trace.record(&values);

            debug!("sweep {}: residual {:.6e}", stats.sweeps, sweep.residual);

            if sweep.residual < self.config.theta {
                stats.converged = true;
                break;
            }
            if stats.sweeps >= self.config.max_sweeps {
                warn!(
                    "value iteration stopped at the {}-sweep cap with residual {:.6e} (threshold {:e})",
                    self.config.max_sweeps, sweep.residual, self.config.theta
                );
                break;
            }
        }

        stats.elapsed_seconds = start_time.elapsed().as_secs_f64();
        stats.update_rate();

        if stats.converged {
            info!(
                "value iteration converged after {} sweeps (residual {:.6e}, {:.2}s)",
                stats.sweeps, stats.residual, stats.elapsed_seconds
            );
        }

        Ok(ValueIterationResult {
            values,
            policy,
            stats,
            trace,
            threshold: self.config.theta,
        })
    }

    /// Run one synchronous sweep against the frozen table `values`.
    fn sweep(&self, states: &[E::State], values: &ValueTable<E::State>) -> Result<Sweep<E::State>> {
        let backups: Vec<Backup> = if self.config.parallel {
            // Each worker plans on its own environment copy.
            states
                .par_iter()
                .map_init(|| self.env.clone(), |env, state| self.backup(env, state, values))
                .collect::<Result<Vec<_>>>()?
        } else {
            let mut env = self.env.clone();
            states
                .iter()
                .map(|state| self.backup(&mut env, state, values))
                .collect::<Result<Vec<_>>>()?
        };

        let mut new_values = ValueTable::with_capacity(states.len());
        let mut policy = Policy::new();
        let mut residual: f64 = 0.0;

        for (state, backup) in states.iter().zip(backups) {
            residual = residual.max((backup.value - values.get(state)).abs());
            if let Some(action) = backup.action {
                policy.set(state.clone(), action);
            }
            new_values.set(state.clone(), backup.value);
        }

        Ok(Sweep {
            values: new_values,
            policy,
            residual,
        })
    }

    /// Back up a single state using `env` as the transition oracle.
    fn backup(&self, env: &mut E, state: &E::State, values: &ValueTable<E::State>) -> Result<Backup> {
        let num_actions = state.num_actions();
        if state.is_terminal() || num_actions == 0 {
            return Ok(Backup {
                value: 0.0,
                action: None,
            });
        }

        env.inject(state)?;

        match self.config.backup {
            BackupRule::Greedy => {
                let mut best_value = f64::NEG_INFINITY;
                let mut best_action = 0;
                for action in 0..num_actions {
                    let q = self.action_value(env, action, values)?;
                    // Strict comparison keeps the first maximizer.
                    if q > best_value {
                        best_value = q;
                        best_action = action;
                    }
                }
                Ok(Backup {
                    value: best_value,
                    action: Some(best_action),
                })
            }
            BackupRule::UniformRandom => {
                let mut total = 0.0;
                for action in 0..num_actions {
                    total += self.action_value(env, action, values)?;
                }
                Ok(Backup {
                    value: total / num_actions as f64,
                    action: None,
                })
            }
        }
    }

    /// Expected `r + γ V(s')` of `action` from the injected configuration.
    fn action_value(&self, env: &E, action: usize, values: &ValueTable<E::State>) -> Result<f64> {
        let outcomes = env.outcomes(action)?;
        Ok(outcomes
            .iter()
            .map(|outcome| {
                let next = &outcome.transition.state;
                let next_value = if next.is_terminal() { 0.0 } else { values.get(next) };
                outcome.probability * (outcome.transition.reward + self.config.gamma * next_value)
            })
            .sum())
    }

    /// Get reference to the template environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &ValueIterationConfig {
        &self.config
    }
}

/// Pick up to `count` non-terminal states to trace, most actions first.
fn tracked_states<S: GameState>(states: &[S], count: usize) -> Vec<S> {
    if count == 0 {
        return Vec::new();
    }
    let mut candidates: Vec<&S> = states.iter().filter(|s| !s.is_terminal()).collect();
    candidates.sort_by(|a, b| b.num_actions().cmp(&a.num_actions()));
    candidates.into_iter().take(count).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::card_game::{enumerate_states, CardGameEnv, CardState, Signal};
    use crate::rl::env::Environment;

    fn solve(deck_size: usize, config: ValueIterationConfig) -> ValueIterationResult<CardState> {
        let env = CardGameEnv::with_seed(deck_size, 42).unwrap();
        let space = enumerate_states(deck_size).unwrap();
        ValueIteration::new(env, config).unwrap().solve(&space).unwrap()
    }

    /// Best total reward against a known opponent deck, by trying every play order.
    fn brute_force_optimum(agent: &[u8], opponent: &[u8]) -> f64 {
        match opponent.split_first() {
            None => 0.0,
            Some((&top, rest)) => (0..agent.len())
                .map(|i| {
                    let mut remaining = agent.to_vec();
                    let card = remaining.remove(i);
                    let reward = if card > top { 1.0 } else { -1.0 };
                    reward + brute_force_optimum(&remaining, rest)
                })
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }

    #[test]
    fn test_converges_quickly_without_discount() {
        let result = solve(4, ValueIterationConfig::new().with_gamma(1.0).with_theta(1e-6));
        assert!(result.converged());
        assert!(result.stats.sweeps <= 20, "took {} sweeps", result.stats.sweeps);
        assert!(result.stats.residual < 1e-6);
        assert_eq!(result.stats.states, 49);
        assert!(result.ensure_converged().is_ok());
    }

    #[test]
    fn test_values_match_brute_force() {
        let result = solve(6, ValueIterationConfig::new().with_gamma(1.0).with_theta(1e-9));
        for (state, value) in result.values.iter() {
            let expected = brute_force_optimum(state.agent(), state.opponent());
            assert!((value - expected).abs() < 1e-9, "{}: {} vs {}", state, value, expected);
        }
    }

    #[test]
    fn test_known_state_value_and_policy() {
        let result = solve(4, ValueIterationConfig::new().with_gamma(1.0).with_theta(1e-6));

        // Holding 2 and 4 against 1 then 3: play 2 first, win both rounds.
        let state = CardState::new(vec![2, 4], vec![1, 3], Signal::Shown(1));
        assert_eq!(result.values.get(&state), 2.0);
        assert_eq!(result.policy.action(&state), Some(0));

        // Every order wins both rounds; ties go to the first action.
        let state = CardState::new(vec![3, 4], vec![1, 2], Signal::Hidden);
        assert_eq!(result.values.get(&state), 2.0);
        assert_eq!(result.policy.action(&state), Some(0));
    }

    #[test]
    fn test_terminal_states_are_zero_without_policy() {
        for deck_size in [4, 5] {
            let result = solve(deck_size, ValueIterationConfig::new().with_gamma(0.9));
            let terminals: Vec<&CardState> = result
                .values
                .iter()
                .map(|(s, _)| s)
                .filter(|s| s.is_terminal())
                .collect();
            assert!(!terminals.is_empty());
            for state in terminals {
                assert_eq!(result.values.get(state), 0.0);
                assert!(!result.policy.contains(state));
            }
        }
    }

    #[test]
    fn test_policy_covers_non_terminal_states() {
        let result = solve(6, ValueIterationConfig::new().with_gamma(0.9));
        for (state, _) in result.values.iter() {
            match result.policy.action(state) {
                Some(action) => assert!(action < state.num_actions()),
                None => assert!(state.is_terminal()),
            }
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        let config = ValueIterationConfig::new().with_gamma(0.8).with_theta(1e-8);
        let first = solve(6, config.clone());
        let second = solve(6, config);
        assert_eq!(first.values, second.values);
        assert_eq!(first.policy, second.policy);
        assert_eq!(first.stats.residual_history, second.stats.residual_history);
    }

    #[test]
    fn test_parallel_sweeps_match_serial() {
        let config = ValueIterationConfig::new().with_gamma(0.9).with_theta(1e-8);
        let serial = solve(6, config.clone());
        let parallel = solve(6, config.with_parallel(true));
        assert_eq!(serial.values, parallel.values);
        assert_eq!(serial.policy, parallel.policy);
        assert_eq!(serial.stats.sweeps, parallel.stats.sweeps);
    }

    #[test]
    fn test_residual_is_non_increasing() {
        let result = solve(6, ValueIterationConfig::new().with_gamma(0.9).with_theta(1e-10));
        let history = &result.stats.residual_history;
        assert!(history.len() >= 2);
        for pair in history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12, "residual grew: {:?}", history);
        }
    }

    #[test]
    fn test_sweep_cap_reports_non_convergence() {
        let result = solve(
            6,
            ValueIterationConfig::new().with_gamma(1.0).with_theta(1e-6).with_max_sweeps(1),
        );
        assert!(!result.converged());
        assert_eq!(result.stats.sweeps, 1);
        assert!(!result.values.is_empty());
        assert!(!result.policy.is_empty());
        assert!(matches!(
            result.ensure_converged(),
            Err(GameError::NonConvergence { sweeps: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_state_space() {
        let env = CardGameEnv::with_seed(6, 0).unwrap();
        let space = enumerate_states(4).unwrap();
        let engine = ValueIteration::new(env, ValueIterationConfig::default()).unwrap();
        assert!(matches!(
            engine.solve(&space),
            Err(GameError::ConfigurationMismatch { expected: 6, found: 4 })
        ));
    }

    #[test]
    fn test_invalid_state_aborts_sweep() {
        let env = CardGameEnv::with_seed(4, 0).unwrap();
        let bogus = CardState::new(vec![1, 1], vec![2, 3], Signal::Hidden);
        let space = StateSpace::new(4, vec![bogus]);
        let engine = ValueIteration::new(env, ValueIterationConfig::default()).unwrap();
        assert!(matches!(engine.solve(&space), Err(GameError::InvalidState(_))));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let env = CardGameEnv::with_seed(4, 0).unwrap();
        assert!(matches!(
            ValueIteration::new(env, ValueIterationConfig::new().with_gamma(1.5)),
            Err(GameError::Config(_))
        ));
    }

    #[test]
    fn test_uniform_random_backup() {
        let result = solve(
            4,
            ValueIterationConfig::new()
                .with_gamma(1.0)
                .with_theta(1e-9)
                .with_backup(BackupRule::UniformRandom),
        );
        assert!(result.converged());
        assert!(result.policy.is_empty());

        // 2 vs 1 then 3: play 2 first (+2) or 4 first (0), averaged.
        let state = CardState::new(vec![2, 4], vec![1, 3], Signal::Hidden);
        assert!((result.values.get(&state) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tracked_states_record_every_sweep() {
        let result = solve(
            6,
            ValueIterationConfig::new().with_gamma(0.9).with_tracked_states(5),
        );
        assert_eq!(result.trace.states().len(), 5);
        for (state, history) in result.trace.iter() {
            assert_eq!(state.num_actions(), 3);
            assert_eq!(history.len(), result.stats.sweeps);
            assert_eq!(*history.last().unwrap(), result.values.get(state));
        }
    }

    #[test]
    fn test_greedy_play_reaches_brute_force_optimum() {
        let result = solve(4, ValueIterationConfig::new().with_gamma(1.0).with_theta(1e-6));
        let mut env = CardGameEnv::with_seed(4, 0).unwrap();

        for seed in 0..20 {
            let start = env.reset(Some(seed));
            let optimum = brute_force_optimum(start.agent(), start.opponent());

            let mut state = start;
            let mut total = 0.0;
            while !state.is_terminal() {
                let action = result.policy.action(&state).unwrap();
                let transition = env.step(action).unwrap();
                total += transition.reward;
                state = transition.state;
            }
            assert_eq!(total, optimum, "seed {}", seed);
        }
    }
}
