use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the grid world
///
/// Grid geometry, obstacle placement rules and the whole reward table live here
/// so the engine never reads process-wide constants. Penalties are stored as
/// signed values and simply added to the step reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Width of the game grid at reset
    pub grid_width: usize,
    /// Height of the game grid at reset
    pub grid_height: usize,
    /// Leaving one edge re-enters from the opposite edge
    pub wrap_around: bool,
    /// Grow the grid when the snake fills it
    pub dynamic_size: bool,

    /// Width/height never grow past `initial * max_expansion_factor`
    pub max_expansion_factor: usize,
    /// Occupancy at which the grid grows
    pub expansion_threshold: f32,
    /// Cells added to each dimension per expansion
    pub expansion_increment: usize,

    /// Minimum number of obstacles placed at reset
    pub obstacles_min: usize,
    /// Maximum number of obstacles placed at reset (inclusive)
    pub obstacles_max: usize,
    /// One more obstacle every N points (0 disables)
    pub obstacle_add_interval: u32,
    /// Obstacles keep at least this Chebyshev distance + 1 from the body
    pub obstacle_safe_radius: i32,
    /// Rejection-sampling budget for one food placement
    pub food_spawn_attempts: usize,
    /// Rejection-sampling budget for one obstacle placement
    pub obstacle_spawn_attempts: usize,

    /// Episode step limit is `width * height * max_steps_factor`
    pub max_steps_factor: u32,
    /// Number of recent head positions remembered for cycle detection
    pub cycle_history_len: usize,
    /// Emit the 28-feature observation instead of the 14-feature one
    pub extended_observation: bool,

    // Rewards
    /// Reward for eating food
    pub food_reward: f32,
    /// Reward for dying (wall, self, obstacle, timeout)
    pub death_penalty: f32,
    /// Base reward of a step that does not eat
    pub step_penalty: f32,
    /// Added when the head gets closer to food
    pub approach_reward: f32,
    /// Added when the head gets farther from food
    pub retreat_penalty: f32,
    /// Added when the head revisits a recent position
    pub cycle_penalty: f32,
    /// Added when the new head has at least 3 free neighbours
    pub open_space_bonus: f32,
    /// Added when the new head has at most 1 free neighbour
    pub trap_penalty: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 20,
            grid_height: 15,
            wrap_around: true,
            dynamic_size: true,
            max_expansion_factor: 3,
            expansion_threshold: 0.9,
            expansion_increment: 2,
            obstacles_min: 2,
            obstacles_max: 3,
            obstacle_add_interval: 10,
            obstacle_safe_radius: 3,
            food_spawn_attempts: 1000,
            obstacle_spawn_attempts: 200,
            max_steps_factor: 2,
            cycle_history_len: 10,
            extended_observation: false,
            food_reward: 10.0,
            death_penalty: -10.0,
            step_penalty: -0.01,
            approach_reward: 0.1,
            retreat_penalty: -0.1,
            cycle_penalty: -0.05,
            open_space_bonus: 0.02,
            trap_penalty: -0.1,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid_width: width,
            grid_height: height,
            ..Default::default()
        }
    }

    /// Create a small grid for testing
    pub fn small() -> Self {
        Self::new(10, 10)
    }

    /// Same grid with no obstacles and no shaping terms
    ///
    /// Only food, step and death rewards remain.
    pub fn plain(width: usize, height: usize) -> Self {
        Self {
            obstacles_min: 0,
            obstacles_max: 0,
            obstacle_add_interval: 0,
            approach_reward: 0.0,
            retreat_penalty: 0.0,
            cycle_penalty: 0.0,
            open_space_bonus: 0.0,
            trap_penalty: 0.0,
            ..Self::new(width, height)
        }
    }

    /// Upper bound on the grid width reachable through expansion
    pub fn max_width(&self) -> usize {
        self.grid_width * self.max_expansion_factor
    }

    /// Upper bound on the grid height reachable through expansion
    pub fn max_height(&self) -> usize {
        self.grid_height * self.max_expansion_factor
    }

    /// Episode step limit for a grid of the given size
    pub fn max_steps_for(&self, width: usize, height: usize) -> u32 {
        (width * height) as u32 * self.max_steps_factor
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width < 3 || self.grid_height < 3 {
            return Err(ConfigError::Invalid(format!(
                "grid must be at least 3x3, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }

        if self.max_expansion_factor == 0 {
            return Err(ConfigError::Invalid(
                "max_expansion_factor must be at least 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.expansion_threshold) {
            return Err(ConfigError::Invalid(format!(
                "expansion_threshold must be in [0, 1], got {}",
                self.expansion_threshold
            )));
        }

        if self.food_spawn_attempts == 0 {
            return Err(ConfigError::Invalid(
                "food_spawn_attempts must be at least 1".to_string(),
            ));
        }

        if self.obstacles_min > self.obstacles_max {
            return Err(ConfigError::Invalid(format!(
                "obstacles_min ({}) cannot exceed obstacles_max ({})",
                self.obstacles_min, self.obstacles_max
            )));
        }

        if self.obstacle_safe_radius < 0 {
            return Err(ConfigError::Invalid(format!(
                "obstacle_safe_radius must be non-negative, got {}",
                self.obstacle_safe_radius
            )));
        }

        if self.max_steps_factor == 0 {
            return Err(ConfigError::Invalid(
                "max_steps_factor must be at least 1".to_string(),
            ));
        }

        let penalties = [
            ("death_penalty", self.death_penalty),
            ("step_penalty", self.step_penalty),
            ("retreat_penalty", self.retreat_penalty),
            ("cycle_penalty", self.cycle_penalty),
            ("trap_penalty", self.trap_penalty),
        ];
        for (name, value) in penalties {
            if value > 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be non-positive, got {value}"
                )));
            }
        }

        let bonuses = [
            ("food_reward", self.food_reward),
            ("approach_reward", self.approach_reward),
            ("open_space_bonus", self.open_space_bonus),
        ];
        for (name, value) in bonuses {
            if value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }

        Ok(())
    }
}
