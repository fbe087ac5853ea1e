//! Configuration options for the environment and the learning algorithms.
//!
//! Every config is a plain serde struct with sensible defaults, `with_*`
//! builder methods and a `validate()` check. Configs can also be loaded from
//! JSON with `from_json_str` / `from_json_file`.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::GameError;

/// Largest deck that still fits card values into a `u8`.
pub const MAX_DECK_SIZE: usize = u8::MAX as usize;

/// Configuration of the card game itself.
///
/// # Example
/// ```
/// use card_game_rl::rl::GameConfig;
///
/// let config = GameConfig::new(6).with_seed(7);
/// assert!(config.validate().is_ok());
/// assert!(GameConfig::new(1).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of cards in the full deck (cards are numbered `1..=deck_size`).
    pub deck_size: usize,

    /// Seed for the environment's own random number generator.
    ///
    /// If `None`, the generator is seeded from entropy. `reset` can always
    /// reseed explicitly.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            deck_size: 10,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Create a configuration for a deck of `deck_size` cards.
    pub fn new(deck_size: usize) -> Self {
        Self {
            deck_size,
            ..Default::default()
        }
    }

    /// Builder method: set the environment seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that the deck can be dealt into two playable hands.
    pub fn validate(&self) -> Result<(), GameError> {
        validate_deck_size(self.deck_size)
    }

    /// Load a game configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        let config: Self = read_json_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a game configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, GameError> {
        let config: Self = parse_json(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Reject decks that cannot be played or whose cards do not fit a `u8`.
pub(crate) fn validate_deck_size(deck_size: usize) -> Result<(), GameError> {
    if deck_size < 2 {
        return Err(GameError::InvalidConfiguration {
            deck_size,
            reason: "at least two cards are needed to deal both hands".to_string(),
        });
    }
    if deck_size > MAX_DECK_SIZE {
        return Err(GameError::InvalidConfiguration {
            deck_size,
            reason: format!("card values are limited to 1..={}", MAX_DECK_SIZE),
        });
    }
    Ok(())
}

/// Which Bellman backup a value-iteration sweep applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackupRule {
    /// Bellman optimality: take the best action and record it in the policy.
    #[default]
    Greedy,
    /// Bellman expectation for the uniformly random policy. No policy is produced.
    UniformRandom,
}

/// Configuration for the value-iteration engine.
///
/// # Example
/// ```
/// use card_game_rl::rl::ValueIterationConfig;
///
/// let config = ValueIterationConfig::default();
/// assert_eq!(config.gamma, 0.9);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueIterationConfig {
    /// Discount factor γ in (0, 1].
    pub gamma: f64,

    /// Convergence threshold θ on the sup-norm Bellman residual.
    pub theta: f64,

    /// Hard cap on the number of sweeps.
    ///
    /// Reaching it is reported as non-convergence, never as success.
    pub max_sweeps: usize,

    /// Backup applied to every non-terminal state.
    #[serde(default)]
    pub backup: BackupRule,

    /// Run the backups of a sweep on the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,

    /// Number of states whose value is recorded after every sweep.
    #[serde(default)]
    pub tracked_states: usize,
}

impl Default for ValueIterationConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            theta: 1e-4,
            max_sweeps: 500,
            backup: BackupRule::Greedy,
            parallel: false,
            tracked_states: 0,
        }
    }
}

impl ValueIterationConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the discount factor.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Builder method: set the convergence threshold.
    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    /// Builder method: set the sweep cap.
    pub fn with_max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.max_sweeps = max_sweeps;
        self
    }

    /// Builder method: choose the backup rule.
    pub fn with_backup(mut self, backup: BackupRule) -> Self {
        self.backup = backup;
        self
    }

    /// Builder method: enable or disable parallel sweeps.
    pub fn with_parallel(mut self, enable: bool) -> Self {
        self.parallel = enable;
        self
    }

    /// Builder method: record the value of up to `count` states per sweep.
    pub fn with_tracked_states(mut self, count: usize) -> Self {
        self.tracked_states = count;
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discount(self.gamma)?;
        if !(self.theta > 0.0) {
            return Err(ConfigError::InvalidThreshold(self.theta));
        }
        if self.max_sweeps == 0 {
            return Err(ConfigError::ZeroBudget("max_sweeps"));
        }
        Ok(())
    }

    /// Load a value-iteration configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = read_json_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a value-iteration configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = parse_json(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration for the TD(0) learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TdConfig {
    /// Number of episodes to play.
    pub episodes: u64,

    /// Constant step size α in (0, 1].
    pub alpha: f64,

    /// Discount factor γ in (0, 1].
    pub gamma: f64,

    /// Seed for the learner's random number generator.
    ///
    /// Episode seeds and behaviour actions are drawn from it. If `None`, a
    /// random seed is used.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Draw episode seeds from `0..=seed_pool` so that deals repeat.
    ///
    /// `None` draws unrestricted 64-bit seeds.
    #[serde(default)]
    pub seed_pool: Option<u64>,

    /// Number of states whose value is recorded after every episode.
    #[serde(default)]
    pub tracked_states: usize,

    /// Episode after which the tracked states are sampled from the table.
    ///
    /// `0` behaves like `1`: states are sampled after the first episode.
    #[serde(default = "default_track_after")]
    pub track_after: u64,

    /// Show an `indicatif` progress bar while learning.
    #[serde(default)]
    pub show_progress: bool,
}

fn default_track_after() -> u64 {
    100
}

impl Default for TdConfig {
    fn default() -> Self {
        Self {
            episodes: 10_000,
            alpha: 0.2,
            gamma: 0.9,
            seed: None,
            seed_pool: None,
            tracked_states: 0,
            track_after: default_track_after(),
            show_progress: false,
        }
    }
}

impl TdConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the number of episodes.
    pub fn with_episodes(mut self, episodes: u64) -> Self {
        self.episodes = episodes;
        self
    }

    /// Builder method: set the step size.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Builder method: set the discount factor.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Builder method: set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: restrict episode seeds to `0..=pool`.
    pub fn with_seed_pool(mut self, pool: u64) -> Self {
        self.seed_pool = Some(pool);
        self
    }

    /// Builder method: record the value of `count` sampled states per episode.
    pub fn with_tracked_states(mut self, count: usize) -> Self {
        self.tracked_states = count;
        self
    }

    /// Builder method: set the episode after which tracked states are sampled.
    pub fn with_track_after(mut self, episode: u64) -> Self {
        self.track_after = episode;
        self
    }

    /// Builder method: show a progress bar.
    pub fn with_progress(mut self, enable: bool) -> Self {
        self.show_progress = enable;
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::InvalidStepSize(self.alpha));
        }
        validate_discount(self.gamma)?;
        if self.episodes == 0 {
            return Err(ConfigError::ZeroBudget("episodes"));
        }
        Ok(())
    }

    /// Load a TD(0) configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = read_json_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TD(0) configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = parse_json(json)?;
        config.validate()?;
        Ok(config)
    }
}

fn validate_discount(gamma: f64) -> Result<(), ConfigError> {
    if gamma > 0.0 && gamma <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDiscount(gamma))
    }
}

fn read_json_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
    parse_json(&content)
}

fn parse_json<T: DeserializeOwned>(json: &str) -> Result<T, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Errors that can occur when validating or loading a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Discount factor is outside (0, 1].
    #[error("discount factor {0} is out of range (0, 1]")]
    InvalidDiscount(f64),
    /// Convergence threshold is not strictly positive.
    #[error("convergence threshold {0} must be positive")]
    InvalidThreshold(f64),
    /// Step size is outside (0, 1].
    #[error("step size {0} is out of range (0, 1]")]
    InvalidStepSize(f64),
    /// A sweep or episode budget of zero.
    #[error("{0} must be at least 1")]
    ZeroBudget(&'static str),
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(String),
    /// The config file is not valid JSON for this config.
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Statistics of one value-iteration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepStats {
    /// Number of sweeps performed.
    pub sweeps: usize,

    /// Bellman residual of the last sweep.
    pub residual: f64,

    /// Residual after every sweep, in order.
    pub residual_history: Vec<f64>,

    /// Whether the residual fell below the threshold before the sweep cap.
    pub converged: bool,

    /// Number of states in the swept state space.
    pub states: usize,

    /// Total time spent sweeping (in seconds).
    pub elapsed_seconds: f64,

    /// Sweeps per second.
    pub sweeps_per_second: f64,
}

impl SweepStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the residual of a finished sweep.
    pub fn record_sweep(&mut self, residual: f64) {
        self.sweeps += 1;
        self.residual = residual;
        self.residual_history.push(residual);
    }

    /// Update sweeps per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.sweeps_per_second = self.sweeps as f64 / self.elapsed_seconds;
        }
    }
}

/// Statistics of one TD(0) run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TdStats {
    /// Episodes played.
    pub episodes: u64,

    /// Transitions (TD updates) performed.
    pub updates: u64,

    /// Distinct states with a value entry.
    pub states: usize,

    /// Mean undiscounted episode return.
    pub mean_return: f64,

    /// Total time spent learning (in seconds).
    pub elapsed_seconds: f64,

    /// Episodes per second.
    pub episodes_per_second: f64,
}

impl TdStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update episodes per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.episodes_per_second = self.episodes as f64 / self.elapsed_seconds;
        }
    }
}
