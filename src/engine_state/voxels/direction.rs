//! # Direction Module
//!
//! The six axis-aligned faces of a chunk (or block). Traversal, occlusion data and
//! face culling all index their per-face state by `Direction as usize`.

use cgmath::Vector3;
use num_derive::FromPrimitive;

/// One of the six faces of a cube.
///
/// The order is: [DOWN, UP, NORTH, SOUTH, WEST, EAST]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum Direction {
    /// Facing negative Y
    DOWN = 0,

    /// Facing positive Y
    UP = 1,

    /// Facing negative Z
    NORTH = 2,

    /// Facing positive Z
    SOUTH = 3,

    /// Facing negative X
    WEST = 4,

    /// Facing positive X
    EAST = 5,
}

impl Direction {
    /// Number of faces
    pub const COUNT: usize = 6;

    /// All six faces in index order.
    pub const ALL: [Direction; 6] = [
        Direction::DOWN,
        Direction::UP,
        Direction::NORTH,
        Direction::SOUTH,
        Direction::WEST,
        Direction::EAST,
    ];

    /// The four faces on the horizontal plane.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::WEST,
        Direction::NORTH,
        Direction::EAST,
        Direction::SOUTH,
    ];

    /// Returns the unit offset to the neighbor across this face.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            Direction::DOWN => Vector3::new(0, -1, 0),
            Direction::UP => Vector3::new(0, 1, 0),
            Direction::NORTH => Vector3::new(0, 0, -1),
            Direction::SOUTH => Vector3::new(0, 0, 1),
            Direction::WEST => Vector3::new(-1, 0, 0),
            Direction::EAST => Vector3::new(1, 0, 0),
        }
    }

    /// Returns the face on the other side of the cube.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::DOWN => Direction::UP,
            Direction::UP => Direction::DOWN,
            Direction::NORTH => Direction::SOUTH,
            Direction::SOUTH => Direction::NORTH,
            Direction::WEST => Direction::EAST,
            Direction::EAST => Direction::WEST,
        }
    }

    /// Looks a direction up by its index.
    ///
    /// # Panics
    /// Panics if `index >= 6`.
    pub fn from_index(index: usize) -> Direction {
        <Direction as num::FromPrimitive>::from_usize(index)
            .unwrap_or_else(|| panic!("direction index {} out of range", index))
    }

    /// Returns the face whose normal is closest to `vector`.
    ///
    /// Ties resolve in index order, so a zero vector maps to `DOWN`.
    pub fn facing(vector: Vector3<f32>) -> Direction {
        let mut best = Direction::DOWN;
        let mut best_dot = f32::MIN;

        for direction in Direction::ALL {
            let normal = direction.offset().cast::<f32>().unwrap_or(Vector3::new(0.0, 0.0, 0.0));
            let dot = normal.x * vector.x + normal.y * vector.y + normal.z * vector.z;
            if dot > best_dot {
                best_dot = dot;
                best = direction;
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_eq!(direction.offset() + direction.opposite().offset(), Vector3::new(0, 0, 0));
        }
    }

    #[test]
    fn test_index_order() {
        for (i, direction) in Direction::ALL.iter().enumerate() {
            assert_eq!(*direction as usize, i);
            assert_eq!(Direction::from_index(i), *direction);
        }
    }

    #[test]
    fn test_facing() {
        assert_eq!(Direction::facing(Vector3::new(1.0, 0.0, 0.1)), Direction::EAST);
        assert_eq!(Direction::facing(Vector3::new(0.0, 0.0, -3.0)), Direction::NORTH);
        assert_eq!(Direction::facing(Vector3::new(0.2, -0.9, 0.0)), Direction::DOWN);
    }
}
