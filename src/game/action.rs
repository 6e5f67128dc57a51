/// Direction the snake can move
///
/// The declaration order is also the action index order used by the agent:
/// `0 = Up`, `1 = Right`, `2 = Down`, `3 = Left`. Turning right is `+1 mod 4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// All directions in action-index order
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Number of discrete actions
    pub const COUNT: usize = 4;

    /// Returns true if turning from self to other would be a 180-degree turn
    pub fn is_opposite(&self, other: Direction) -> bool {
        matches!(
            (self, other),
            (Direction::Up, Direction::Down)
                | (Direction::Down, Direction::Up)
                | (Direction::Left, Direction::Right)
                | (Direction::Right, Direction::Left)
        )
    }

    /// Returns the delta (dx, dy) for moving in this direction
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    /// Action index of this direction
    pub fn index(&self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }

    /// Convert an action index back to a direction
    ///
    /// # Panics
    ///
    /// Panics if `index >= 4`; the action space is fixed.
    pub fn from_index(index: usize) -> Self {
        assert!(
            index < Self::COUNT,
            "action index {index} out of range 0..{}",
            Self::COUNT
        );
        Self::ALL[index]
    }

    /// Direction after a 90-degree clockwise turn
    pub fn turn_right(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::COUNT]
    }

    /// Direction after a 90-degree counter-clockwise turn
    pub fn turn_left(&self) -> Self {
        Self::ALL[(self.index() + 3) % Self::COUNT]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_directions() {
        assert!(Direction::Up.is_opposite(Direction::Down));
        assert!(Direction::Down.is_opposite(Direction::Up));
        assert!(Direction::Left.is_opposite(Direction::Right));
        assert!(Direction::Right.is_opposite(Direction::Left));

        assert!(!Direction::Up.is_opposite(Direction::Left));
        assert!(!Direction::Up.is_opposite(Direction::Right));
        assert!(!Direction::Up.is_opposite(Direction::Up));
    }

    #[test]
    fn test_direction_delta() {
        assert_eq!(Direction::Up.delta(), (0, -1));
        assert_eq!(Direction::Down.delta(), (0, 1));
        assert_eq!(Direction::Left.delta(), (-1, 0));
        assert_eq!(Direction::Right.delta(), (1, 0));
    }

    #[test]
    fn test_index_round_trip() {
        for (i, dir) in Direction::ALL.iter().enumerate() {
            assert_eq!(dir.index(), i);
            assert_eq!(Direction::from_index(i), *dir);
        }
    }

    #[test]
    #[should_panic]
    fn test_from_index_out_of_range() {
        Direction::from_index(4);
    }

    #[test]
    fn test_relative_turns() {
        assert_eq!(Direction::Up.turn_right(), Direction::Right);
        assert_eq!(Direction::Left.turn_right(), Direction::Up);
        assert_eq!(Direction::Up.turn_left(), Direction::Left);
        assert_eq!(Direction::Right.turn_left(), Direction::Up);
    }
}
