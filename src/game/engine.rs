use super::{
    action::Direction,
    config::GameConfig,
    state::{CollisionType, GameState, Position, Snake},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

/// Information about a step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepInfo {
    /// Whether the snake ate food this step
    pub ate_food: bool,
    /// Type of collision if one occurred
    pub collision_type: Option<CollisionType>,
    /// Whether the grid grew this step
    pub expanded: bool,
}

/// Result of a game step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Reward for this step (for RL training)
    pub reward: f32,
    /// Whether the game has terminated
    pub terminated: bool,
    /// Additional information about the step
    pub info: StepInfo,
}

/// The game engine that handles all game logic
///
/// The engine holds the rules and the random source; the mutable episode data
/// lives in [`GameState`] so callers can inspect or stage it directly.
pub struct GameEngine {
    config: GameConfig,
    rng: StdRng,
}

impl GameEngine {
    /// Create a new game engine with the given configuration
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create an engine with a reproducible random source
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Reset the game to initial state
    ///
    /// One-cell snake in the grid centre heading right, fresh food, and an
    /// initial obstacle count drawn from `obstacles_min..=obstacles_max`.
    pub fn reset(&mut self) -> GameState {
        let width = self.config.grid_width;
        let height = self.config.grid_height;
        let center = Position::new((width / 2) as i32, (height / 2) as i32);

        let snake = Snake::new(center, Direction::Right, 1);
        let mut state = GameState::new(
            snake,
            center,
            width,
            height,
            self.config.wrap_around,
            self.config.max_steps_for(width, height),
        );

        self.spawn_food(&mut state);

        let initial_obstacles = self
            .rng
            .gen_range(self.config.obstacles_min..=self.config.obstacles_max);
        self.add_obstacles(&mut state, initial_obstacles);

        state
    }

    /// Execute one step of the game
    pub fn step(&mut self, state: &mut GameState, direction: Direction) -> StepResult {
        if !state.is_alive {
            return StepResult {
                reward: 0.0,
                terminated: true,
                info: StepInfo::default(),
            };
        }

        state.steps += 1;

        // Update direction (prevent 180° turns)
        if !state.snake.direction.is_opposite(direction) {
            state.snake.direction = direction;
        }

        let old_head = state.snake.head();
        let new_head = match state.resolve(old_head.moved_in_direction(state.snake.direction)) {
            Some(pos) => pos,
            None => return self.terminate(state, CollisionType::Wall, false),
        };

        let ate_food = new_head == state.food;

        // The tail moves away this step unless the snake grows
        if state.snake.collides(new_head, !ate_food) {
            return self.terminate(state, CollisionType::SelfCollision, false);
        }
        if state.is_obstacle(new_head) {
            return self.terminate(state, CollisionType::Obstacle, false);
        }

        state.snake.advance(new_head, ate_food);

        let mut reward;
        let mut expanded = false;

        if ate_food {
            state.score += 1;
            reward = self.config.food_reward;
            self.spawn_food(state);
            state.recent_heads.clear();

            expanded = self.try_expand(state);

            let interval = self.config.obstacle_add_interval;
            if interval > 0 && state.score % interval == 0 {
                self.add_obstacles(state, 1);
            }
        } else {
            reward = self.config.step_penalty + self.distance_shaping(old_head, new_head, state.food);
        }

        reward += self.cycle_shaping(state, new_head);
        reward += self.space_shaping(state, new_head);

        if state.steps > state.max_steps {
            return self.terminate(state, CollisionType::Timeout, ate_food);
        }

        StepResult {
            reward,
            terminated: false,
            info: StepInfo {
                ate_food,
                collision_type: None,
                expanded,
            },
        }
    }

    /// Move food to a random free cell
    ///
    /// Gives up after `food_spawn_attempts` misses and leaves the food where it
    /// was; returns whether the food moved.
    pub fn spawn_food(&mut self, state: &mut GameState) -> bool {
        for _ in 0..self.config.food_spawn_attempts {
            let pos = self.random_cell(state);
            if state.is_cell_free(pos) {
                state.food = pos;
                return true;
            }
        }

        debug!(
            width = state.grid_width,
            height = state.grid_height,
            "no free cell found for food"
        );
        false
    }

    /// Try to place `count` obstacles, returning how many were placed
    ///
    /// Each obstacle gets its own attempt budget; an obstacle that exhausts it
    /// is skipped.
    pub fn add_obstacles(&mut self, state: &mut GameState, count: usize) -> usize {
        let mut placed = 0;

        for _ in 0..count {
            for _ in 0..self.config.obstacle_spawn_attempts {
                let pos = self.random_cell(state);
                if self.obstacle_allowed(state, pos) {
                    state.obstacles.insert(pos);
                    placed += 1;
                    break;
                }
            }
        }

        if placed < count {
            debug!(requested = count, placed, "obstacle placement budget exhausted");
        }

        placed
    }

    fn terminate(
        &self,
        state: &mut GameState,
        collision: CollisionType,
        ate_food: bool,
    ) -> StepResult {
        state.is_alive = false;

        StepResult {
            reward: self.config.death_penalty,
            terminated: true,
            info: StepInfo {
                ate_food,
                collision_type: Some(collision),
                expanded: false,
            },
        }
    }

    fn random_cell(&mut self, state: &GameState) -> Position {
        let x = self.rng.gen_range(0..state.grid_width) as i32;
        let y = self.rng.gen_range(0..state.grid_height) as i32;
        Position::new(x, y)
    }

    fn obstacle_allowed(&self, state: &GameState, pos: Position) -> bool {
        let radius = self.config.obstacle_safe_radius;
        let near_snake = state
            .snake
            .body
            .iter()
            .any(|segment| segment.chebyshev_distance(pos) <= radius);

        !near_snake && pos != state.food && state.is_cell_free(pos) && !would_create_trap(state, pos)
    }

    fn try_expand(&self, state: &mut GameState) -> bool {
        let max_width = self.config.max_width();
        let max_height = self.config.max_height();

        if !self.config.dynamic_size
            || state.occupancy() < self.config.expansion_threshold
            || (state.grid_width >= max_width && state.grid_height >= max_height)
        {
            return false;
        }

        // Each axis grows by the increment but never past its cap
        state.grid_width = (state.grid_width + self.config.expansion_increment).min(max_width);
        state.grid_height = (state.grid_height + self.config.expansion_increment).min(max_height);
        state.max_steps = self
            .config
            .max_steps_for(state.grid_width, state.grid_height);

        debug!(
            width = state.grid_width,
            height = state.grid_height,
            "grid expanded"
        );
        true
    }

    fn distance_shaping(&self, old_head: Position, new_head: Position, food: Position) -> f32 {
        let before = old_head.manhattan_distance(food);
        let after = new_head.manhattan_distance(food);

        match after.cmp(&before) {
            std::cmp::Ordering::Less => self.config.approach_reward,
            std::cmp::Ordering::Greater => self.config.retreat_penalty,
            std::cmp::Ordering::Equal => 0.0,
        }
    }

    fn cycle_shaping(&self, state: &mut GameState, new_head: Position) -> f32 {
        let revisit = state.recent_heads.contains(&new_head);

        state.recent_heads.push_back(new_head);
        while state.recent_heads.len() > self.config.cycle_history_len {
            state.recent_heads.pop_front();
        }

        if revisit {
            self.config.cycle_penalty
        } else {
            0.0
        }
    }

    fn space_shaping(&self, state: &GameState, new_head: Position) -> f32 {
        match state.free_neighbor_count(new_head) {
            0 | 1 => self.config.trap_penalty,
            2 => 0.0,
            _ => self.config.open_space_bonus,
        }
    }
}

/// An obstacle at `pos` would leave 3 or more of its neighbours blocked
///
/// Walls count as blocked only without wrap-around; with wrap-around the
/// neighbours are taken on the torus.
fn would_create_trap(state: &GameState, pos: Position) -> bool {
    let blocked = pos
        .neighbors()
        .iter()
        .filter(|&&n| match state.resolve(n) {
            Some(cell) => state.is_obstacle(cell),
            None => true,
        })
        .count();

    blocked >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_engine(width: usize, height: usize, wrap_around: bool) -> GameEngine {
        let config = GameConfig {
            wrap_around,
            dynamic_size: false,
            ..GameConfig::plain(width, height)
        };
        GameEngine::with_seed(config, 7)
    }

    /// State with a snake of the given body and food out of the way
    fn staged_state(engine: &GameEngine, body: &[(i32, i32)], direction: Direction) -> GameState {
        let config = engine.config();
        let mut snake = Snake::new(Position::new(body[0].0, body[0].1), direction, 1);
        for &(x, y) in &body[1..] {
            snake.body.push_back(Position::new(x, y));
        }
        let mut state = GameState::new(
            snake,
            Position::new(0, 0),
            config.grid_width,
            config.grid_height,
            config.wrap_around,
            config.max_steps_for(config.grid_width, config.grid_height),
        );
        state.score = body.len() as u32 - 1;
        state
    }

    #[test]
    fn test_reset() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 1);
        let state = engine.reset();

        assert!(state.is_alive);
        assert_eq!(state.score, 0);
        assert_eq!(state.steps, 0);
        assert_eq!(state.snake.len(), 1);
        assert_eq!(state.snake.head(), Position::new(10, 7));
        assert_eq!(state.snake.direction, Direction::Right);
        assert_eq!(state.max_steps, 600);
        assert!(state.obstacles.len() <= 3);
    }

    #[test]
    fn test_reset_obstacle_rules() {
        let config = GameConfig::default();
        let mut engine = GameEngine::with_seed(config.clone(), 3);

        for _ in 0..50 {
            let state = engine.reset();
            assert!(state.obstacles.len() <= config.obstacles_max);
            assert!(!state.obstacles.contains(&state.food));
            for obstacle in &state.obstacles {
                assert!(
                    state.snake.head().chebyshev_distance(*obstacle) > config.obstacle_safe_radius
                );
            }
            assert!(state.is_cell_free(state.food));
        }
    }

    #[test]
    fn test_basic_movement() {
        let mut engine = plain_engine(10, 10, false);
        let mut state = engine.reset();
        state.food = Position::new(0, 0);
        let initial_head = state.snake.head();

        let result = engine.step(&mut state, Direction::Right);

        assert!(!result.terminated);
        assert!(!result.info.ate_food);
        assert_eq!(state.steps, 1);
        assert_eq!(state.snake.head(), initial_head.moved_by(1, 0));
        assert_eq!(result.reward, engine.config().step_penalty);
    }

    #[test]
    fn test_food_consumption() {
        let mut engine = plain_engine(10, 10, false);
        let mut state = engine.reset();

        let head = state.snake.head();
        state.food = head.moved_in_direction(state.snake.direction);

        let result = engine.step(&mut state, Direction::Right);

        assert!(result.info.ate_food);
        assert_eq!(state.score, 1);
        assert_eq!(state.snake.len(), 2);
        assert_eq!(state.snake.len(), state.score as usize + 1);
        assert_eq!(result.reward, engine.config().food_reward);
        assert!(!state.snake.contains(state.food));
    }

    #[test]
    fn test_length_matches_score_over_random_play() {
        let mut engine = GameEngine::with_seed(GameConfig::small(), 11);
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..20 {
            let mut state = engine.reset();
            for _ in 0..300 {
                let dir = Direction::from_index(rng.gen_range(0..4));
                let result = engine.step(&mut state, dir);
                assert_eq!(state.snake.len(), state.score as usize + 1);
                if result.info.ate_food {
                    assert!(!state.snake.contains(state.food));
                    assert!(!state.is_obstacle(state.food));
                }
                if result.terminated {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_wall_collision() {
        let mut engine = plain_engine(10, 10, false);
        let mut state = staged_state(&engine, &[(0, 5)], Direction::Left);

        let result = engine.step(&mut state, Direction::Left);

        assert!(result.terminated);
        assert!(!state.is_alive);
        assert_eq!(result.reward, engine.config().death_penalty);
        assert_eq!(result.info.collision_type, Some(CollisionType::Wall));
    }

    #[test]
    fn test_wrap_around() {
        let mut engine = plain_engine(20, 15, true);
        let mut state = staged_state(&engine, &[(19, 7)], Direction::Right);

        let result = engine.step(&mut state, Direction::Right);

        assert!(!result.terminated);
        assert_eq!(state.snake.head(), Position::new(0, 7));
    }

    #[test]
    fn test_self_collision() {
        let mut engine = plain_engine(10, 10, false);
        let mut state = staged_state(
            &engine,
            &[(5, 5), (4, 5), (3, 5), (2, 5), (1, 5)],
            Direction::Right,
        );

        engine.step(&mut state, Direction::Down); // (5,6)
        engine.step(&mut state, Direction::Left); // (4,6)
        let result = engine.step(&mut state, Direction::Up); // (4,5) is body

        assert!(result.terminated);
        assert_eq!(
            result.info.collision_type,
            Some(CollisionType::SelfCollision)
        );
    }

    #[test]
    fn test_moving_into_vacated_tail() {
        let mut engine = plain_engine(10, 10, false);
        let body = [(5, 5), (6, 5), (6, 6), (5, 6)];
        let mut state = staged_state(&engine, &body, Direction::Left);

        let result = engine.step(&mut state, Direction::Down);

        assert!(!result.terminated);
        assert_eq!(state.snake.head(), Position::new(5, 6));
        assert_eq!(state.snake.len(), 4);
    }

    #[test]
    fn test_tail_blocks_when_eating() {
        let mut engine = plain_engine(10, 10, false);
        let body = [(5, 5), (6, 5), (6, 6), (5, 6)];
        let mut state = staged_state(&engine, &body, Direction::Left);
        state.food = Position::new(5, 6);

        let result = engine.step(&mut state, Direction::Down);

        assert!(result.terminated);
        assert_eq!(
            result.info.collision_type,
            Some(CollisionType::SelfCollision)
        );
    }

    #[test]
    fn test_obstacle_collision() {
        let mut engine = plain_engine(10, 10, false);
        let mut state = staged_state(&engine, &[(5, 5)], Direction::Right);
        state.obstacles.insert(Position::new(6, 5));

        let result = engine.step(&mut state, Direction::Right);

        assert!(result.terminated);
        assert_eq!(result.info.collision_type, Some(CollisionType::Obstacle));
    }

    #[test]
    fn test_prevent_180_degree_turn() {
        let mut engine = plain_engine(10, 10, false);
        let mut state = engine.reset();
        state.food = Position::new(0, 0);
        assert_eq!(state.snake.direction, Direction::Right);

        engine.step(&mut state, Direction::Left);

        assert_eq!(state.snake.direction, Direction::Right);
    }

    #[test]
    fn test_timeout() {
        let mut engine = plain_engine(10, 10, false);
        let mut state = staged_state(&engine, &[(2, 2)], Direction::Right);
        state.max_steps = 1;

        let first = engine.step(&mut state, Direction::Right);
        assert!(!first.terminated);

        let second = engine.step(&mut state, Direction::Right);
        assert!(second.terminated);
        assert_eq!(second.reward, engine.config().death_penalty);
        assert_eq!(second.info.collision_type, Some(CollisionType::Timeout));
    }

    #[test]
    fn test_terminated_game_no_update() {
        let mut engine = plain_engine(10, 10, false);
        let mut state = engine.reset();
        state.is_alive = false;
        let steps_before = state.steps;

        let result = engine.step(&mut state, Direction::Up);

        assert!(result.terminated);
        assert_eq!(result.reward, 0.0);
        assert_eq!(state.steps, steps_before);
    }

    #[test]
    fn test_distance_shaping() {
        let config = GameConfig {
            approach_reward: 0.1,
            retreat_penalty: -0.1,
            wrap_around: false,
            dynamic_size: false,
            ..GameConfig::plain(10, 10)
        };
        let mut engine = GameEngine::with_seed(config.clone(), 2);

        let mut state = staged_state(&engine, &[(5, 5)], Direction::Right);
        state.food = Position::new(9, 5);
        let closer = engine.step(&mut state, Direction::Right);
        assert!((closer.reward - (config.step_penalty + 0.1)).abs() < 1e-6);

        let mut state = staged_state(&engine, &[(5, 5)], Direction::Left);
        state.food = Position::new(9, 5);
        let farther = engine.step(&mut state, Direction::Left);
        assert!((farther.reward - (config.step_penalty - 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_cycle_penalty() {
        let config = GameConfig {
            cycle_penalty: -0.05,
            wrap_around: false,
            dynamic_size: false,
            ..GameConfig::plain(10, 10)
        };
        let mut engine = GameEngine::with_seed(config.clone(), 2);

        let mut state = staged_state(&engine, &[(5, 5)], Direction::Right);
        state.recent_heads.push_back(Position::new(6, 5));
        let result = engine.step(&mut state, Direction::Right);

        assert!((result.reward - (config.step_penalty - 0.05)).abs() < 1e-6);
        assert_eq!(state.recent_heads.back(), Some(&Position::new(6, 5)));
    }

    #[test]
    fn test_cycle_history_is_bounded() {
        let mut engine = plain_engine(30, 30, true);
        let mut state = staged_state(&engine, &[(1, 1)], Direction::Right);

        for _ in 0..25 {
            engine.step(&mut state, Direction::Right);
        }

        assert_eq!(state.recent_heads.len(), engine.config().cycle_history_len);
    }

    #[test]
    fn test_space_shaping() {
        let config = GameConfig {
            open_space_bonus: 0.02,
            trap_penalty: -0.1,
            wrap_around: false,
            dynamic_size: false,
            ..GameConfig::plain(10, 10)
        };
        let mut engine = GameEngine::with_seed(config.clone(), 2);

        // Open field: all four neighbours of (6,5) are free
        let mut state = staged_state(&engine, &[(5, 5)], Direction::Right);
        let open = engine.step(&mut state, Direction::Right);
        assert!((open.reward - (config.step_penalty + 0.02)).abs() < 1e-6);

        // Corridor end: obstacles above, below and ahead of (6,5)
        let mut state = staged_state(&engine, &[(5, 5)], Direction::Right);
        state.obstacles.insert(Position::new(6, 4));
        state.obstacles.insert(Position::new(6, 6));
        state.obstacles.insert(Position::new(7, 5));
        let trapped = engine.step(&mut state, Direction::Right);
        assert!((trapped.reward - (config.step_penalty - 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_grid_expansion() {
        let config = GameConfig {
            dynamic_size: true,
            expansion_threshold: 0.1,
            ..GameConfig::plain(4, 4)
        };
        let mut engine = GameEngine::with_seed(config.clone(), 4);

        let mut state = staged_state(&engine, &[(1, 1)], Direction::Right);
        state.score = 0;
        state.food = Position::new(2, 1);

        let result = engine.step(&mut state, Direction::Right);

        assert!(result.info.expanded);
        assert_eq!(state.grid_width, 6);
        assert_eq!(state.grid_height, 6);
        assert_eq!(state.max_steps, config.max_steps_for(6, 6));
    }

    #[test]
    fn test_grid_expansion_is_capped() {
        let config = GameConfig {
            dynamic_size: true,
            expansion_threshold: 0.0,
            max_expansion_factor: 1,
            ..GameConfig::plain(4, 4)
        };
        let mut engine = GameEngine::with_seed(config, 4);

        let mut state = staged_state(&engine, &[(1, 1)], Direction::Right);
        state.score = 0;
        state.food = Position::new(2, 1);

        let result = engine.step(&mut state, Direction::Right);

        assert!(!result.info.expanded);
        assert_eq!(state.grid_width, 4);
    }

    #[test]
    fn test_grid_expansion_clamps_to_cap() {
        // Odd width with an even factor: the last increment would overshoot 14
        let config = GameConfig {
            dynamic_size: true,
            expansion_threshold: 0.0,
            max_expansion_factor: 2,
            ..GameConfig::plain(7, 5)
        };
        let mut engine = GameEngine::with_seed(config.clone(), 4);

        let mut state = staged_state(&engine, &[(1, 1)], Direction::Right);
        state.score = 0;
        state.grid_width = 13;
        state.grid_height = 9;
        state.food = Position::new(2, 1);

        let result = engine.step(&mut state, Direction::Right);

        assert!(result.info.expanded);
        assert_eq!(state.grid_width, 14);
        assert_eq!(state.grid_height, 10);
        assert_eq!(state.max_steps, config.max_steps_for(14, 10));

        // Both axes at their caps: no further growth
        state.food = Position::new(3, 1);
        let result = engine.step(&mut state, Direction::Right);

        assert!(!result.info.expanded);
        assert_eq!(state.grid_width, 14);
        assert_eq!(state.grid_height, 10);
    }

    #[test]
    fn test_obstacle_added_on_interval() {
        let config = GameConfig {
            obstacle_add_interval: 1,
            obstacle_safe_radius: 0,
            wrap_around: false,
            dynamic_size: false,
            ..GameConfig::plain(20, 20)
        };
        let mut engine = GameEngine::with_seed(config, 9);

        let mut state = staged_state(&engine, &[(5, 5)], Direction::Right);
        state.score = 0;
        state.food = Position::new(6, 5);

        engine.step(&mut state, Direction::Right);

        assert_eq!(state.score, 1);
        assert_eq!(state.obstacles.len(), 1);
        assert!(!state.obstacles.contains(&state.food));
    }

    #[test]
    fn test_trap_rule() {
        let engine = plain_engine(10, 10, false);
        let mut state = staged_state(&engine, &[(0, 9)], Direction::Right);
        state.obstacles.insert(Position::new(5, 4));
        state.obstacles.insert(Position::new(4, 5));

        // (5,5) would have up and left blocked: 2 is fine
        assert!(!would_create_trap(&state, Position::new(5, 5)));

        state.obstacles.insert(Position::new(6, 5));
        assert!(would_create_trap(&state, Position::new(5, 5)));

        // Corner cell: two walls plus one obstacle
        state.obstacles.insert(Position::new(1, 0));
        assert!(would_create_trap(&state, Position::new(0, 0)));
    }

    #[test]
    fn test_trap_rule_wraps_neighbors() {
        let engine = plain_engine(10, 10, true);
        let mut state = staged_state(&engine, &[(5, 5)], Direction::Right);
        state.wrap_around = true;

        // Corner cell on a torus has no walls
        assert!(!would_create_trap(&state, Position::new(0, 0)));

        state.obstacles.insert(Position::new(9, 0));
        state.obstacles.insert(Position::new(0, 9));
        state.obstacles.insert(Position::new(1, 0));
        assert!(would_create_trap(&state, Position::new(0, 0)));
    }

    #[test]
    fn test_spawn_food_gives_up_on_full_grid() {
        let mut engine = plain_engine(3, 3, false);
        let mut state = staged_state(&engine, &[(1, 1)], Direction::Right);
        for x in 0..3 {
            for y in 0..3 {
                if (x, y) != (1, 1) {
                    state.obstacles.insert(Position::new(x, y));
                }
            }
        }
        let before = state.food;

        assert!(!engine.spawn_food(&mut state));
        assert_eq!(state.food, before);
    }

    #[test]
    fn test_add_obstacles_skips_when_no_room() {
        let config = GameConfig {
            obstacle_safe_radius: 5,
            ..GameConfig::plain(5, 5)
        };
        let mut engine = GameEngine::with_seed(config, 1);
        let mut state = staged_state(&engine, &[(2, 2)], Direction::Right);

        let placed = engine.add_obstacles(&mut state, 3);

        assert_eq!(placed, 0);
        assert!(state.obstacles.is_empty());
    }
}
