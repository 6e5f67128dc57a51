use std::collections::{HashSet, VecDeque};

use super::action::Direction;

/// A position on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move position by delta
    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Move position in a direction
    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }

    pub fn manhattan_distance(&self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn euclidean_distance(&self, other: Position) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Largest per-axis distance (king moves on a chessboard)
    pub fn chebyshev_distance(&self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// The 4 orthogonal neighbours, in action-index order (up, right, down, left)
    pub fn neighbors(&self) -> [Position; 4] {
        Direction::ALL.map(|dir| self.moved_in_direction(dir))
    }
}

/// The snake in the game
#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    /// Body segments, with head at index 0
    pub body: VecDeque<Position>,
    /// Current direction of movement
    pub direction: Direction,
}

impl Snake {
    /// Create a new snake with given starting position and direction
    pub fn new(head: Position, direction: Direction, length: usize) -> Self {
        let mut body = VecDeque::with_capacity(length.max(1));
        body.push_back(head);

        // Add initial body segments behind the head
        let (dx, dy) = direction.delta();
        let (back_dx, back_dy) = (-dx, -dy);

        for i in 1..length {
            let prev = body[i - 1];
            body.push_back(prev.moved_by(back_dx, back_dy));
        }

        Self { body, direction }
    }

    /// Get the head position
    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Get the tail position (last segment)
    pub fn tail(&self) -> Position {
        self.body[self.body.len() - 1]
    }

    /// Check if position hits any segment
    ///
    /// With `tail_exempt` the last segment is ignored, because it moves away
    /// during a step that does not grow the snake.
    pub fn collides(&self, pos: Position, tail_exempt: bool) -> bool {
        let checked = if tail_exempt {
            self.body.len() - 1
        } else {
            self.body.len()
        };
        self.body.iter().take(checked).any(|&segment| segment == pos)
    }

    /// Check if position is any segment, head included
    pub fn contains(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    /// Advance the head to `new_head`, dropping the tail unless growing
    pub fn advance(&mut self, new_head: Position, grow: bool) {
        self.body.push_front(new_head);
        if !grow {
            self.body.pop_back();
        }
    }

    /// Get the length of the snake
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Check if the snake is empty (should never happen in practice)
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Type of collision that ended an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionType {
    /// Snake left the grid with wrap-around disabled
    Wall,
    /// Snake hit itself
    SelfCollision,
    /// Snake hit an obstacle
    Obstacle,
    /// Episode ran past its step limit
    Timeout,
}

/// Complete game state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub snake: Snake,
    pub food: Position,
    pub obstacles: HashSet<Position>,
    pub grid_width: usize,
    pub grid_height: usize,
    pub wrap_around: bool,
    pub score: u32,
    pub steps: u32,
    pub max_steps: u32,
    /// Recent head positions, newest last
    pub recent_heads: VecDeque<Position>,
    pub is_alive: bool,
}

impl GameState {
    /// Create a new game state
    pub fn new(
        snake: Snake,
        food: Position,
        grid_width: usize,
        grid_height: usize,
        wrap_around: bool,
        max_steps: u32,
    ) -> Self {
        Self {
            snake,
            food,
            obstacles: HashSet::new(),
            grid_width,
            grid_height,
            wrap_around,
            score: 0,
            steps: 0,
            max_steps,
            recent_heads: VecDeque::new(),
            is_alive: true,
        }
    }

    /// Check if a position is within the grid bounds
    pub fn is_in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.x < self.grid_width as i32
            && pos.y >= 0
            && pos.y < self.grid_height as i32
    }

    /// Wrap a position onto the torus
    pub fn wrapped(&self, pos: Position) -> Position {
        Position::new(
            pos.x.rem_euclid(self.grid_width as i32),
            pos.y.rem_euclid(self.grid_height as i32),
        )
    }

    /// Map a raw position onto the grid
    ///
    /// Wraps when wrap-around is on; otherwise `None` for off-grid cells.
    pub fn resolve(&self, pos: Position) -> Option<Position> {
        if self.wrap_around {
            Some(self.wrapped(pos))
        } else if self.is_in_bounds(pos) {
            Some(pos)
        } else {
            None
        }
    }

    /// Check if a position is occupied by the snake
    pub fn is_occupied_by_snake(&self, pos: Position) -> bool {
        self.snake.contains(pos)
    }

    pub fn is_obstacle(&self, pos: Position) -> bool {
        self.obstacles.contains(&pos)
    }

    /// Neither body nor obstacle
    pub fn is_cell_free(&self, pos: Position) -> bool {
        !self.is_occupied_by_snake(pos) && !self.is_obstacle(pos)
    }

    /// Off-grid (without wrap-around), body or obstacle
    pub fn is_danger(&self, pos: Position) -> bool {
        match self.resolve(pos) {
            Some(cell) => !self.is_cell_free(cell),
            None => true,
        }
    }

    /// Number of the 4 neighbours of `pos` that are not dangerous
    pub fn free_neighbor_count(&self, pos: Position) -> usize {
        pos.neighbors()
            .iter()
            .filter(|&&n| !self.is_danger(n))
            .count()
    }

    /// Fraction of grid cells covered by the snake
    pub fn occupancy(&self) -> f32 {
        let total = self.grid_width * self.grid_height;
        if total == 0 {
            return 0.0;
        }
        self.snake.len() as f32 / total as f32
    }
}
