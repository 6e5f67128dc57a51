//! Double-DQN agent
//!
//! Ties together the live Q-network, a periodically synchronised target
//! network and the replay buffer. Actions are chosen epsilon-greedily;
//! regression targets pick the next action with the live network and
//! evaluate it with the target network.

use std::collections::VecDeque;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::buffer::{Experience, ReplayBuffer};
use super::config::DqnConfig;
use super::network::Network;
use crate::error::{ConfigError, ModelError};

/// Index of the largest value; ties go to the lowest index
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}

/// Double-DQN agent with experience replay
///
/// # Example
///
/// ```rust
/// use snake_dqn::rl::{DqnAgent, DqnConfig};
///
/// let config = DqnConfig {
///     hidden_layers: vec![16],
///     ..Default::default()
/// };
/// let mut agent = DqnAgent::with_seed(14, 4, config, 7).unwrap();
///
/// let action = agent.select_action(&[0.0; 14]);
/// assert!(action < 4);
/// ```
pub struct DqnAgent {
    q_network: Network,
    target_network: Network,
    buffer: ReplayBuffer,
    config: DqnConfig,
    action_size: usize,

    epsilon: f32,

    /// Successful `train()` calls
    step_count: u64,
    episode_count: u64,
    generation: u64,

    /// Reward accumulated since the last `end_episode`
    episode_reward: f32,
    reward_history: VecDeque<f32>,

    rng: StdRng,
}

impl DqnAgent {
    /// Create an agent for `state_size` inputs and `action_size` actions
    pub fn new(state_size: usize, action_size: usize, config: DqnConfig) -> Result<Self, ConfigError> {
        Self::from_rng(state_size, action_size, config, StdRng::from_entropy())
    }

    /// Create an agent whose initial weights, exploration and sampling are
    /// reproducible from `seed`
    pub fn with_seed(
        state_size: usize,
        action_size: usize,
        config: DqnConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::from_rng(state_size, action_size, config, StdRng::seed_from_u64(seed))
    }

    fn from_rng(
        state_size: usize,
        action_size: usize,
        config: DqnConfig,
        mut rng: StdRng,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if state_size == 0 || action_size == 0 {
            return Err(ConfigError::Invalid(format!(
                "state and action sizes must be positive, got {state_size} and {action_size}"
            )));
        }

        let layer_sizes = config.layer_sizes(state_size, action_size);
        let q_network = Network::with_rng(&layer_sizes, config.learning_rate, &mut rng);
        let target_network = q_network.clone();

        Ok(Self {
            q_network,
            target_network,
            buffer: ReplayBuffer::new(config.buffer_size),
            action_size,
            epsilon: config.epsilon_start,
            step_count: 0,
            episode_count: 0,
            generation: 0,
            episode_reward: 0.0,
            reward_history: VecDeque::with_capacity(config.reward_history_size),
            config,
            rng,
        })
    }

    /// Epsilon-greedy action
    pub fn select_action(&mut self, state: &[f32]) -> usize {
        if self.rng.gen::<f32>() < self.epsilon {
            self.rng.gen_range(0..self.action_size)
        } else {
            self.greedy_action(state)
        }
    }

    /// Highest-valued action, ignoring epsilon
    pub fn greedy_action(&self, state: &[f32]) -> usize {
        argmax(&self.q_network.forward(state))
    }

    /// Store a transition and add its reward to the running episode total
    pub fn remember(
        &mut self,
        state: Vec<f32>,
        action: usize,
        reward: f32,
        next_state: Vec<f32>,
        done: bool,
    ) {
        self.buffer
            .add(Experience::new(state, action, reward, next_state, done));
        self.episode_reward += reward;
    }

    /// One Double-DQN update on a sampled batch
    ///
    /// Returns the mean loss over the batch, or 0.0 without touching anything
    /// while the buffer holds fewer than `batch_size` transitions.
    pub fn train(&mut self) -> f32 {
        if self.buffer.len() < self.config.batch_size {
            return 0.0;
        }

        let batch = self.buffer.sample(self.config.batch_size, &mut self.rng);
        let mut total_loss = 0.0;

        for experience in &batch {
            let mut target = self.q_network.forward(&experience.state);

            target[experience.action] = if experience.done {
                experience.reward
            } else {
                let best_next = argmax(&self.q_network.forward(&experience.next_state));
                let next_value = self.target_network.forward(&experience.next_state)[best_next];
                experience.reward + self.config.gamma * next_value
            };

            total_loss += self.q_network.train_step(&experience.state, &target);
        }

        self.step_count += 1;
        if self.step_count % self.config.target_update_frequency == 0 {
            self.update_target_network();
            debug!(step = self.step_count, "target network synchronised");
        }

        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);

        total_loss / batch.len() as f32
    }

    /// Hard copy of the live network into the target network
    pub fn update_target_network(&mut self) {
        self.target_network = self.q_network.clone();
    }

    /// Close the current episode's bookkeeping
    pub fn end_episode(&mut self) {
        self.episode_count += 1;

        if self.reward_history.len() >= self.config.reward_history_size {
            self.reward_history.pop_front();
        }
        self.reward_history.push_back(self.episode_reward);
        self.episode_reward = 0.0;

        if self.episode_count % self.config.generation_size == 0 {
            self.generation += 1;
            info!(
                generation = self.generation,
                episodes = self.episode_count,
                "generation complete"
            );
        }
    }

    /// Mean of the last `min(window, history)` episode rewards, 0 when empty
    pub fn average_reward(&self, window: usize) -> f32 {
        let count = window.min(self.reward_history.len());
        if count == 0 {
            return 0.0;
        }
        self.reward_history.iter().rev().take(count).sum::<f32>() / count as f32
    }

    pub fn save_model(&self, path: &Path) -> Result<(), ModelError> {
        self.q_network.save(path)
    }

    /// Load the live network and resync the target network from it
    ///
    /// The model must have this agent's state and action sizes; otherwise
    /// both networks are left as they were.
    pub fn load_model(&mut self, path: &Path) -> Result<(), ModelError> {
        self.q_network.load_matching(path)?;
        self.update_target_network();
        info!(path = %path.display(), "model loaded");
        Ok(())
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Override the exploration rate, clamped to `[epsilon_min, epsilon_start]`
    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon.clamp(self.config.epsilon_min, self.config.epsilon_start);
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn episode_count(&self) -> u64 {
        self.episode_count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Episodes completed within the current generation
    pub fn generation_progress(&self) -> u64 {
        self.episode_count % self.config.generation_size
    }

    /// Reward accumulated in the episode still in progress
    pub fn episode_reward(&self) -> f32 {
        self.episode_reward
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn q_network(&self) -> &Network {
        &self.q_network
    }

    pub fn target_network(&self) -> &Network {
        &self.target_network
    }

    /// Restore counters from a previous run
    pub fn restore_progress(&mut self, step_count: u64, episode_count: u64, generation: u64) {
        self.step_count = step_count;
        self.episode_count = episode_count;
        self.generation = generation;
    }
}
