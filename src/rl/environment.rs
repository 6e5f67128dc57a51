use super::observation::{create_observation, observation_size};
use crate::game::{Direction, GameConfig, GameEngine, GameState, StepInfo};

/// Snake environment for reinforcement learning
///
/// Wraps the game engine and provides the interface the agent trains against:
/// - Vector observations (see [`create_observation`])
/// - Discrete action space (4 actions: Up, Right, Down, Left)
/// - Standard RL interface (reset, step, get_state)
pub struct SnakeEnvironment {
    engine: GameEngine,
    state: GameState,
    last_info: StepInfo,
}

impl SnakeEnvironment {
    /// Create a new Snake environment
    pub fn new(config: GameConfig) -> Self {
        Self::from_engine(GameEngine::new(config))
    }

    /// Create an environment with reproducible spawning
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self::from_engine(GameEngine::with_seed(config, seed))
    }

    fn from_engine(mut engine: GameEngine) -> Self {
        let state = engine.reset();
        Self {
            engine,
            state,
            last_info: StepInfo::default(),
        }
    }

    /// Reset the environment and return initial observation
    pub fn reset(&mut self) -> Vec<f32> {
        self.state = self.engine.reset();
        self.last_info = StepInfo::default();
        self.get_state()
    }

    /// Step the environment with a discrete action
    ///
    /// Actions:
    /// - 0: Move Up
    /// - 1: Move Right
    /// - 2: Move Down
    /// - 3: Move Left
    ///
    /// Requesting the reverse of the current heading keeps the heading.
    ///
    /// Returns: (reward, done)
    ///
    /// # Panics
    ///
    /// Panics if `action` is not below 4.
    pub fn step(&mut self, action: usize) -> (f32, bool) {
        let direction = Direction::from_index(action);
        let result = self.engine.step(&mut self.state, direction);
        self.last_info = result.info;
        (result.reward, result.terminated)
    }

    /// Observation of the current state
    pub fn get_state(&self) -> Vec<f32> {
        create_observation(&self.state, self.engine.config().extended_observation)
    }

    /// Length of the vectors returned by [`SnakeEnvironment::get_state`]
    pub fn state_size(&self) -> usize {
        observation_size(self.engine.config().extended_observation)
    }

    pub fn action_size(&self) -> usize {
        Direction::COUNT
    }

    /// Details of the most recent step
    pub fn last_info(&self) -> &StepInfo {
        &self.last_info
    }

    /// Get reference to current game state (for testing/debugging)
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        self.engine.config()
    }
}
