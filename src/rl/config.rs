//! DQN hyperparameter configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the Double-DQN agent
///
/// # Example
///
/// ```rust
/// use snake_dqn::rl::DqnConfig;
///
/// let config = DqnConfig {
///     learning_rate: 5e-4,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnConfig {
    /// Step size for every network update
    ///
    /// Default: 0.001
    pub learning_rate: f32,

    /// Replay buffer capacity; the oldest transition is evicted past this
    ///
    /// Default: 100 000
    pub buffer_size: usize,

    /// Exploration rate before any training
    ///
    /// Default: 1.0
    pub epsilon_start: f32,

    /// Floor for the exploration rate
    ///
    /// Default: 0.01
    pub epsilon_min: f32,

    /// Multiplier applied to epsilon after every training update
    ///
    /// Default: 0.995
    pub epsilon_decay: f32,

    /// Discount factor for future rewards
    ///
    /// Default: 0.95
    pub gamma: f32,

    /// Transitions sampled per `train()` call
    ///
    /// Default: 64
    pub batch_size: usize,

    /// Training updates between hard target-network syncs
    ///
    /// Default: 100
    pub target_update_frequency: u64,

    /// Hidden layer widths, input and output excluded
    ///
    /// Default: [128, 128]
    pub hidden_layers: Vec<usize>,

    /// Episodes per generation
    ///
    /// Default: 100
    pub generation_size: u64,

    /// Episode rewards kept for the rolling average
    ///
    /// Default: 100
    pub reward_history_size: usize,
}

impl DqnConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer sizes of the Q-network for the given observation/action sizes
    pub fn layer_sizes(&self, state_size: usize, action_size: usize) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        sizes.push(state_size);
        sizes.extend_from_slice(&self.hidden_layers);
        sizes.push(action_size);
        sizes
    }

    /// Validate configuration parameters
    ///
    /// Checks that all hyperparameters are in valid ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::Invalid(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }

        if !(0.0..=1.0).contains(&self.epsilon_start) || !(0.0..=1.0).contains(&self.epsilon_min) {
            return Err(ConfigError::Invalid(format!(
                "epsilon values must be in [0, 1], got start {} and min {}",
                self.epsilon_start, self.epsilon_min
            )));
        }

        if self.epsilon_min > self.epsilon_start {
            return Err(ConfigError::Invalid(format!(
                "epsilon_min ({}) cannot exceed epsilon_start ({})",
                self.epsilon_min, self.epsilon_start
            )));
        }

        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "epsilon_decay must be in (0, 1], got {}",
                self.epsilon_decay
            )));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".to_string()));
        }

        if self.buffer_size < self.batch_size {
            return Err(ConfigError::Invalid(format!(
                "buffer_size ({}) cannot be smaller than batch_size ({})",
                self.buffer_size, self.batch_size
            )));
        }

        if self.target_update_frequency == 0 {
            return Err(ConfigError::Invalid(
                "target_update_frequency must be at least 1".to_string(),
            ));
        }

        if self.hidden_layers.iter().any(|&width| width == 0) {
            return Err(ConfigError::Invalid(
                "hidden layer widths must be positive".to_string(),
            ));
        }

        if self.generation_size == 0 {
            return Err(ConfigError::Invalid(
                "generation_size must be at least 1".to_string(),
            ));
        }

        if self.reward_history_size == 0 {
            return Err(ConfigError::Invalid(
                "reward_history_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            buffer_size: 100_000,
            epsilon_start: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
            gamma: 0.95,
            batch_size: 64,
            target_update_frequency: 100,
            hidden_layers: vec![128, 128],
            generation_size: 100,
            reward_history_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DqnConfig::default();
        assert_eq!(config.learning_rate, 0.001);
        assert_eq!(config.buffer_size, 100_000);
        assert_eq!(config.epsilon_start, 1.0);
        assert_eq!(config.epsilon_min, 0.01);
        assert_eq!(config.epsilon_decay, 0.995);
        assert_eq!(config.gamma, 0.95);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.target_update_frequency, 100);
        assert_eq!(config.hidden_layers, vec![128, 128]);
        assert_eq!(config.generation_size, 100);
        assert_eq!(config.reward_history_size, 100);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(DqnConfig::new().validate().is_ok());
    }

    #[test]
    fn test_layer_sizes() {
        let config = DqnConfig::default();
        assert_eq!(config.layer_sizes(14, 4), vec![14, 128, 128, 4]);

        let config = DqnConfig {
            hidden_layers: vec![],
            ..Default::default()
        };
        assert_eq!(config.layer_sizes(28, 4), vec![28, 4]);
    }

    #[test]
    fn test_validation_learning_rate() {
        let mut config = DqnConfig::default();
        config.learning_rate = -0.1;
        assert!(config.validate().is_err());

        config.learning_rate = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_gamma_out_of_range() {
        let mut config = DqnConfig::default();
        config.gamma = 1.5;
        assert!(config.validate().is_err());

        config.gamma = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_epsilon_schedule() {
        let mut config = DqnConfig::default();
        config.epsilon_min = 0.5;
        config.epsilon_start = 0.1;
        assert!(config.validate().is_err());

        let mut config = DqnConfig::default();
        config.epsilon_decay = 0.0;
        assert!(config.validate().is_err());

        config.epsilon_decay = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_batch_and_buffer() {
        let mut config = DqnConfig::default();
        config.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = DqnConfig::default();
        config.buffer_size = 32;
        assert!(config.validate().is_err());

        config.buffer_size = 64;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_counters() {
        let mut config = DqnConfig::default();
        config.target_update_frequency = 0;
        assert!(config.validate().is_err());

        let mut config = DqnConfig::default();
        config.generation_size = 0;
        assert!(config.validate().is_err());

        let mut config = DqnConfig::default();
        config.hidden_layers = vec![128, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_config() {
        let config = DqnConfig {
            learning_rate: 1e-3,
            gamma: 0.99,
            batch_size: 32,
            ..Default::default()
        };
        assert_eq!(config.gamma, 0.99);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.epsilon_decay, 0.995); // From default
        assert!(config.validate().is_ok());
    }
}
