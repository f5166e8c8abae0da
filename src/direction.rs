use crate::error::OutOfRangeError;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// One of the four grid directions. The discriminant is the raw slot index
/// used by [`RoomNode`](crate::room::RoomNode).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

pub const DIRECTIONS: &[Direction; 4] = &[
    Direction::Up,
    Direction::Right,
    Direction::Down,
    Direction::Left,
];

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Adjacent cell of `pos`, or `None` past the edge of the `i32` grid.
    pub fn step(self, pos: &Vector2<i32>) -> Option<Vector2<i32>> {
        let offset = self.to_vec2();
        Some(Vector2::new(
            pos.x.checked_add(offset.x)?,
            pos.y.checked_add(offset.y)?,
        ))
    }

    /// Grid offset of the adjacent cell. `y` grows downward.
    pub fn to_vec2(self) -> Vector2<i32> {
        match self {
            Direction::Up => Vector2::new(0, -1),
            Direction::Right => Vector2::new(1, 0),
            Direction::Down => Vector2::new(0, 1),
            Direction::Left => Vector2::new(-1, 0),
        }
    }

    pub fn from_offset(offset: &Vector2<i32>) -> Option<Direction> {
        DIRECTIONS
            .iter()
            .copied()
            .find(|dir| dir.to_vec2() == *offset)
    }
}

/// Conversion from a raw direction index into [`Direction`].
///
/// Every direction-indexed accessor takes `impl AsDirection`, so callers holding
/// a [`Direction`] can never fail while callers holding a raw integer get an
/// [`OutOfRangeError`] for anything outside `0..=3`.
pub trait AsDirection: Copy {
    fn as_direction(self) -> Result<Direction, OutOfRangeError>;
}

impl AsDirection for Direction {
    #[inline]
    fn as_direction(self) -> Result<Direction, OutOfRangeError> {
        Ok(self)
    }
}

fn from_raw(raw: i128) -> Result<Direction, OutOfRangeError> {
    match raw {
        0 => Ok(Direction::Up),
        1 => Ok(Direction::Right),
        2 => Ok(Direction::Down),
        3 => Ok(Direction::Left),
        _ => Err(OutOfRangeError(raw)),
    }
}

impl AsDirection for u8 {
    fn as_direction(self) -> Result<Direction, OutOfRangeError> {
        from_raw(self as i128)
    }
}

impl AsDirection for i32 {
    fn as_direction(self) -> Result<Direction, OutOfRangeError> {
        from_raw(self as i128)
    }
}

impl AsDirection for usize {
    fn as_direction(self) -> Result<Direction, OutOfRangeError> {
        from_raw(self as i128)
    }
}

impl TryFrom<u8> for Direction {
    type Error = OutOfRangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        value.as_direction()
    }
}

impl TryFrom<usize> for Direction {
    type Error = OutOfRangeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        value.as_direction()
    }
}

/// Opposite of a raw direction.
pub fn opposite(direction: impl AsDirection) -> Result<Direction, OutOfRangeError> {
    Ok(direction.as_direction()?.opposite())
}
