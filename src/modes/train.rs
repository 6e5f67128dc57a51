//! Training mode for the DQN agent
//!
//! Runs episodes in the Snake environment, stores every transition in the
//! agent's replay buffer, trains once per environment step once enough
//! transitions are buffered, and periodically saves checkpoints.
//!
//! Work is done in ticks of `steps_per_tick` environment steps; raising it
//! only changes how much happens per tick, not per step.
//!
//! # Example
//!
//! ```rust,no_run
//! use snake_dqn::modes::{TrainConfig, TrainMode};
//! use std::path::PathBuf;
//!
//! let config = TrainConfig::new(10_000, PathBuf::from("models/snake.json"));
//! let mut train_mode = TrainMode::new(config)?;
//! train_mode.run()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::game::GameConfig;
use crate::metrics::TrainingStats;
use crate::rl::{DqnAgent, DqnConfig, ModelMetadata, SnakeEnvironment};

/// Configuration for training mode
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Number of episodes to train in this run
    pub num_episodes: u64,

    /// Path to save the final trained model
    pub save_path: PathBuf,

    /// Save a checkpoint every N episodes
    pub checkpoint_frequency: u64,

    /// Log training progress every N episodes
    pub log_frequency: u64,

    /// Environment steps per tick
    pub steps_per_tick: usize,

    /// Buffered transitions required before training starts
    pub min_buffer_size: usize,

    /// Continue from the model at `save_path` if it exists
    pub resume: bool,

    /// Game configuration (grid size, rewards)
    pub game_config: GameConfig,

    /// DQN hyperparameters
    pub dqn_config: DqnConfig,
}

impl TrainConfig {
    /// Create a new training configuration with defaults
    pub fn new(num_episodes: u64, save_path: PathBuf) -> Self {
        let dqn_config = DqnConfig::default();
        Self {
            num_episodes,
            save_path,
            checkpoint_frequency: 1000,
            log_frequency: 100,
            steps_per_tick: 1,
            min_buffer_size: dqn_config.batch_size,
            resume: false,
            game_config: GameConfig::default(),
            dqn_config,
        }
    }
}

/// Training mode for the DQN agent
pub struct TrainMode {
    agent: DqnAgent,
    env: SnakeEnvironment,
    stats: TrainingStats,
    config: TrainConfig,

    /// Observation the next action is chosen from
    observation: Vec<f32>,

    /// Steps taken in the episode in progress
    episode_steps: u32,

    /// Episodes finished in this run
    episodes_run: u64,
}

impl TrainMode {
    /// Create a new training mode
    pub fn new(config: TrainConfig) -> Result<Self> {
        let env = SnakeEnvironment::new(config.game_config.clone());
        let agent = DqnAgent::new(env.state_size(), env.action_size(), config.dqn_config.clone())
            .context("Invalid DQN configuration")?;
        Self::assemble(config, env, agent)
    }

    /// Create a training mode with reproducible environment and agent
    pub fn with_seed(config: TrainConfig, seed: u64) -> Result<Self> {
        let env = SnakeEnvironment::with_seed(config.game_config.clone(), seed);
        let agent = DqnAgent::with_seed(
            env.state_size(),
            env.action_size(),
            config.dqn_config.clone(),
            seed,
        )
        .context("Invalid DQN configuration")?;
        Self::assemble(config, env, agent)
    }

    fn assemble(config: TrainConfig, mut env: SnakeEnvironment, agent: DqnAgent) -> Result<Self> {
        config
            .game_config
            .validate()
            .context("Invalid game configuration")?;
        anyhow::ensure!(config.steps_per_tick > 0, "steps_per_tick must be at least 1");
        anyhow::ensure!(
            config.checkpoint_frequency > 0 && config.log_frequency > 0,
            "checkpoint and log frequencies must be at least 1"
        );

        let observation = env.reset();
        let stats = TrainingStats::new(config.dqn_config.reward_history_size);

        let mut train_mode = Self {
            agent,
            env,
            stats,
            config,
            observation,
            episode_steps: 0,
            episodes_run: 0,
        };

        if train_mode.config.resume && train_mode.config.save_path.exists() {
            train_mode.resume()?;
        }

        Ok(train_mode)
    }

    /// Load the saved model and, when available, its training progress
    fn resume(&mut self) -> Result<()> {
        let path = self.config.save_path.clone();
        self.agent
            .load_model(&path)
            .with_context(|| format!("Failed to resume from {:?}", path))?;

        match ModelMetadata::load(&path) {
            Ok(metadata) => {
                self.agent.restore_progress(
                    metadata.training_steps,
                    metadata.episodes_trained,
                    metadata.generation,
                );
                self.agent.set_epsilon(metadata.epsilon);
                self.stats.set_best_score(metadata.best_score);
                info!(
                    episodes = metadata.episodes_trained,
                    generation = metadata.generation,
                    epsilon = metadata.epsilon,
                    "resumed training progress"
                );
            }
            Err(err) => warn!("no usable metadata next to {:?}: {err:#}", path),
        }

        Ok(())
    }

    /// Run the training loop
    ///
    /// Trains the agent for `num_episodes` episodes, logging progress and
    /// saving checkpoints periodically, then saves the final model.
    pub fn run(&mut self) -> Result<()> {
        self.print_header();

        while self.episodes_run < self.config.num_episodes {
            self.tick()?;
        }

        self.save_with_metadata(&self.config.save_path)
            .with_context(|| format!("Failed to save final model to {:?}", self.config.save_path))?;

        info!(path = ?self.config.save_path, "training complete");
        info!("{}", self.stats.format_summary());

        Ok(())
    }

    /// Advance by up to `steps_per_tick` environment steps
    ///
    /// Stops early once the run's episode budget is spent. Returns the number
    /// of episodes that finished during the tick.
    pub fn tick(&mut self) -> Result<u64> {
        let mut finished = 0;

        for _ in 0..self.config.steps_per_tick {
            if self.episodes_run >= self.config.num_episodes {
                break;
            }
            if self.step()? {
                finished += 1;
            }
        }

        Ok(finished)
    }

    /// One environment step plus at most one training update
    ///
    /// Returns true when the step ended the episode.
    fn step(&mut self) -> Result<bool> {
        let action = self.agent.select_action(&self.observation);
        let (reward, done) = self.env.step(action);
        let next_observation = self.env.get_state();

        let observation = std::mem::replace(&mut self.observation, next_observation.clone());
        self.agent
            .remember(observation, action, reward, next_observation, done);
        self.episode_steps += 1;

        let buffered = self.agent.buffer_len();
        if buffered >= self.config.min_buffer_size && buffered >= self.config.dqn_config.batch_size {
            let loss = self.agent.train();
            self.stats.record_loss(loss);
        }

        if done {
            self.finish_episode()?;
        }

        Ok(done)
    }

    fn finish_episode(&mut self) -> Result<()> {
        let reward = self.agent.episode_reward();
        let score = self.env.state().score;
        let is_best = self.stats.record_episode(reward, self.episode_steps, score);

        self.agent.end_episode();
        self.episodes_run += 1;
        let episode = self.agent.episode_count();

        if is_best {
            let best_path = self.best_model_path();
            self.save_with_metadata(&best_path)
                .with_context(|| format!("Failed to save best model to {:?}", best_path))?;
            info!(episode, score, path = ?best_path, "new best score");
        }

        if episode % self.config.log_frequency == 0 {
            self.print_progress();
        }

        if episode % self.config.checkpoint_frequency == 0 {
            self.save_checkpoint()?;
        }

        self.observation = self.env.reset();
        self.episode_steps = 0;
        Ok(())
    }

    /// Save a checkpoint of the current model, named by generation and episode
    fn save_checkpoint(&self) -> Result<()> {
        let checkpoint_path = self.checkpoint_path();

        self.save_with_metadata(&checkpoint_path)
            .with_context(|| format!("Failed to save checkpoint to {:?}", checkpoint_path))?;

        info!(path = ?checkpoint_path, "checkpoint saved");
        Ok(())
    }

    fn save_with_metadata(&self, path: &Path) -> Result<()> {
        self.agent.save_model(path)?;

        ModelMetadata::new(
            self.config.dqn_config.clone(),
            self.config.game_config.clone(),
            self.agent.step_count(),
            self.agent.episode_count(),
            self.agent.generation(),
            self.agent.epsilon(),
            self.stats.best_score(),
        )
        .save(path)
    }

    fn output_dir(&self) -> &Path {
        self.config.save_path.parent().unwrap_or(Path::new("."))
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.output_dir().join(format!(
            "checkpoint_gen{}_ep{}.json",
            self.agent.generation(),
            self.agent.episode_count()
        ))
    }

    fn best_model_path(&self) -> PathBuf {
        let stem = self
            .config
            .save_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model");
        self.output_dir().join(format!("{stem}_best.json"))
    }

    fn print_header(&self) {
        let game = &self.config.game_config;
        let dqn = &self.config.dqn_config;

        info!(
            episodes = self.config.num_episodes,
            width = game.grid_width,
            height = game.grid_height,
            wrap_around = game.wrap_around,
            dynamic_size = game.dynamic_size,
            extended_observation = game.extended_observation,
            "DQN training - Snake"
        );
        info!(
            learning_rate = dqn.learning_rate,
            gamma = dqn.gamma,
            batch_size = dqn.batch_size,
            buffer_size = dqn.buffer_size,
            target_update_frequency = dqn.target_update_frequency,
            hidden_layers = ?dqn.hidden_layers,
            "DQN config"
        );
        info!(
            steps_per_tick = self.config.steps_per_tick,
            checkpoint_frequency = self.config.checkpoint_frequency,
            log_frequency = self.config.log_frequency,
            save_path = ?self.config.save_path,
            "run settings"
        );
    }

    fn print_progress(&self) {
        info!(
            generation = self.agent.generation(),
            generation_progress = self.agent.generation_progress(),
            epsilon = self.agent.epsilon(),
            buffer = self.agent.buffer_len(),
            avg_reward = self.agent.average_reward(self.config.dqn_config.reward_history_size),
            "[Episode {}] {}",
            self.agent.episode_count(),
            self.stats.format_summary()
        );
    }

    pub fn agent(&self) -> &DqnAgent {
        &self.agent
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }
}
