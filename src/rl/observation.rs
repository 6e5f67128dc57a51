use crate::game::{Direction, GameState, Position};

/// Length of the compact observation
pub const BASIC_OBSERVATION_SIZE: usize = 14;

/// Length of the observation with ray casts and look-ahead features
pub const EXTENDED_OBSERVATION_SIZE: usize = 28;

/// Observation length for the chosen variant
pub fn observation_size(extended: bool) -> usize {
    if extended {
        EXTENDED_OBSERVATION_SIZE
    } else {
        BASIC_OBSERVATION_SIZE
    }
}

/// Create the observation vector from game state
///
/// Layout of the compact variant:
/// - 0..3: danger straight / right / left of the current heading
/// - 3..7: food is up / right / down / left of the head (not exclusive)
/// - 7..11: current heading one-hot (up, right, down, left)
/// - 11..13: food offset (dx / width, dy / height)
/// - 13: occupancy
///
/// The extended variant appends:
/// - 14..18: ray distance to the nearest obstacle (up, right, down, left)
/// - 18..22: ray distance to the snake's own body (up, right, down, left)
/// - 22: body length / (width + height), capped at 1
/// - 23: Manhattan distance to food / (width + height)
/// - 24..28: free neighbours / 4 of the cell one step ahead in each direction
pub fn create_observation(state: &GameState, extended: bool) -> Vec<f32> {
    let mut features = Vec::with_capacity(observation_size(extended));

    push_danger_features(state, &mut features);
    push_food_direction_features(state, &mut features);
    push_heading_features(state, &mut features);
    push_food_offset_features(state, &mut features);
    features.push(state.occupancy());

    if extended {
        for dir in Direction::ALL {
            features.push(ray_distance(state, dir, |s, pos| s.is_obstacle(pos)));
        }
        for dir in Direction::ALL {
            features.push(ray_distance(state, dir, |s, pos| {
                s.snake.body.iter().skip(1).any(|&segment| segment == pos)
            }));
        }
        push_extended_scalars(state, &mut features);
        push_lookahead_features(state, &mut features);
    }

    features
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn push_danger_features(state: &GameState, features: &mut Vec<f32>) {
    let head = state.snake.head();
    let heading = state.snake.direction;

    for dir in [heading, heading.turn_right(), heading.turn_left()] {
        features.push(flag(state.is_danger(head.moved_in_direction(dir))));
    }
}

fn push_food_direction_features(state: &GameState, features: &mut Vec<f32>) {
    let head = state.snake.head();
    let food = state.food;

    features.push(flag(food.y < head.y));
    features.push(flag(food.x > head.x));
    features.push(flag(food.y > head.y));
    features.push(flag(food.x < head.x));
}

fn push_heading_features(state: &GameState, features: &mut Vec<f32>) {
    for dir in Direction::ALL {
        features.push(flag(state.snake.direction == dir));
    }
}

fn push_food_offset_features(state: &GameState, features: &mut Vec<f32>) {
    let head = state.snake.head();
    features.push((state.food.x - head.x) as f32 / state.grid_width as f32);
    features.push((state.food.y - head.y) as f32 / state.grid_height as f32);
}

fn push_extended_scalars(state: &GameState, features: &mut Vec<f32>) {
    let perimeter = (state.grid_width + state.grid_height) as f32;
    let head = state.snake.head();

    features.push((state.snake.len() as f32 / perimeter).min(1.0));
    features.push(head.manhattan_distance(state.food) as f32 / perimeter);
}

fn push_lookahead_features(state: &GameState, features: &mut Vec<f32>) {
    let head = state.snake.head();

    for dir in Direction::ALL {
        let value = match state.resolve(head.moved_in_direction(dir)) {
            Some(ahead) => state.free_neighbor_count(ahead) as f32 / 4.0,
            None => 0.0,
        };
        features.push(value);
    }
}

/// March from the head until `hit` matches, up to `max(width, height)` cells
///
/// Returns the hit distance divided by that cap, or 1.0 when nothing is hit
/// (including running off the grid without wrap-around).
fn ray_distance<F>(state: &GameState, dir: Direction, hit: F) -> f32
where
    F: Fn(&GameState, Position) -> bool,
{
    let cap = state.grid_width.max(state.grid_height);
    let mut pos = state.snake.head();

    for distance in 1..=cap {
        pos = match state.resolve(pos.moved_in_direction(dir)) {
            Some(next) => next,
            None => break,
        };
        if hit(state, pos) {
            return distance as f32 / cap as f32;
        }
    }

    1.0
}
