//! Evaluation mode for trained agents
//!
//! Loads a saved model and plays a number of episodes greedily (no
//! exploration, no training), reporting each score and the overall high score.
//!
//! When the model has a metadata sidecar, its game configuration is used so
//! the observation layout matches the one the network was trained on.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::game::GameConfig;
use crate::metrics::GameMetrics;
use crate::rl::{DqnAgent, DqnConfig, ModelMetadata, SnakeEnvironment};

/// Configuration for evaluation mode
#[derive(Debug, Clone)]
pub struct PlayConfig {
    pub model_path: PathBuf,

    pub num_episodes: u32,

    /// Used when the model has no metadata sidecar
    pub game_config: GameConfig,
}

impl PlayConfig {
    pub fn new(model_path: PathBuf, num_episodes: u32) -> Self {
        Self {
            model_path,
            num_episodes,
            game_config: GameConfig::default(),
        }
    }
}

/// Result of one evaluation episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeOutcome {
    pub score: u32,
    pub steps: u32,
    pub reward: f32,
}

/// Greedy evaluation of a trained model
pub struct PlayMode {
    agent: DqnAgent,
    env: SnakeEnvironment,
    metrics: GameMetrics,
    num_episodes: u32,
}

impl PlayMode {
    /// Load the model and build a matching environment
    pub fn new(config: PlayConfig) -> Result<Self> {
        let game_config = Self::resolve_game_config(&config);
        let env = SnakeEnvironment::new(game_config);
        Self::with_env(env, &config.model_path, config.num_episodes)
    }

    /// Like [`PlayMode::new`], with reproducible spawning
    pub fn with_seed(config: PlayConfig, seed: u64) -> Result<Self> {
        let game_config = Self::resolve_game_config(&config);
        let env = SnakeEnvironment::with_seed(game_config, seed);
        Self::with_env(env, &config.model_path, config.num_episodes)
    }

    fn resolve_game_config(config: &PlayConfig) -> GameConfig {
        match ModelMetadata::load(&config.model_path) {
            Ok(metadata) => {
                info!(
                    episodes_trained = metadata.episodes_trained,
                    training_steps = metadata.training_steps,
                    generation = metadata.generation,
                    best_score = metadata.best_score,
                    version = %metadata.version,
                    "loaded model metadata"
                );
                metadata.game_config
            }
            Err(err) => {
                warn!("using command-line game settings: {err:#}");
                config.game_config.clone()
            }
        }
    }

    fn with_env(env: SnakeEnvironment, model_path: &Path, num_episodes: u32) -> Result<Self> {
        let dqn_config = DqnConfig {
            buffer_size: 1,
            batch_size: 1,
            ..Default::default()
        };
        let mut agent = DqnAgent::new(env.state_size(), env.action_size(), dqn_config)
            .context("Failed to build agent")?;

        agent
            .load_model(model_path)
            .with_context(|| format!("Failed to load model from {:?}", model_path))?;

        Ok(Self {
            agent,
            env,
            metrics: GameMetrics::new(),
            num_episodes,
        })
    }

    /// Play every episode and return their outcomes
    pub fn run(&mut self) -> Result<Vec<EpisodeOutcome>> {
        let mut outcomes = Vec::with_capacity(self.num_episodes as usize);

        for episode in 1..=self.num_episodes {
            let outcome = self.play_episode();
            info!(
                episode,
                score = outcome.score,
                steps = outcome.steps,
                reward = outcome.reward,
                "episode finished"
            );
            outcomes.push(outcome);
        }

        info!(
            games = self.metrics.games_played,
            high_score = self.metrics.high_score,
            average_score = self.metrics.average_score(),
            elapsed = %self.metrics.format_time(),
            "evaluation complete"
        );

        Ok(outcomes)
    }

    /// One greedy episode; always ends through a terminal step
    pub fn play_episode(&mut self) -> EpisodeOutcome {
        self.metrics.on_game_start();

        let mut observation = self.env.reset();
        let mut reward = 0.0;
        let mut steps = 0;

        loop {
            let action = self.agent.greedy_action(&observation);
            let (step_reward, done) = self.env.step(action);
            reward += step_reward;
            steps += 1;

            if done {
                break;
            }
            observation = self.env.get_state();
        }

        let score = self.env.state().score;
        self.metrics.on_game_over(score, steps);

        EpisodeOutcome {
            score,
            steps,
            reward,
        }
    }

    pub fn metrics(&self) -> &GameMetrics {
        &self.metrics
    }
}
