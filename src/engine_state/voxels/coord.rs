//! Chunk and column coordinates on the 16-unit grid.

use cgmath::{Point3, Vector3};

use super::direction::Direction;
use crate::engine_state::camera_state::frustum::Aabb;

/// Edge length of a chunk in blocks
pub const CHUNK_SIZE: i32 = 16;
/// `log2(CHUNK_SIZE)`
pub const CHUNK_SHIFT: i32 = 4;
/// Number of chunk slots in a column
pub const COLUMN_HEIGHT: i32 = 16;

/// Identifies one cubic section of the world grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoordinate {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the chunk containing the block at `(x, y, z)`.
    pub fn from_block(x: i32, y: i32, z: i32) -> Self {
        Self::new(x >> CHUNK_SHIFT, y >> CHUNK_SHIFT, z >> CHUNK_SHIFT)
    }

    /// Returns the chunk containing a world-space position.
    pub fn from_position(position: Point3<f32>) -> Self {
        Self::from_block(
            position.x.floor() as i32,
            position.y.floor() as i32,
            position.z.floor() as i32,
        )
    }

    /// World-space block position of the chunk's minimum corner.
    pub fn origin(&self) -> Point3<i32> {
        Point3::new(self.x << CHUNK_SHIFT, self.y << CHUNK_SHIFT, self.z << CHUNK_SHIFT)
    }

    /// World-space centre of the chunk.
    pub fn center(&self) -> Point3<f32> {
        let origin = self.origin();
        Point3::new(
            origin.x as f32 + 8.0,
            origin.y as f32 + 8.0,
            origin.z as f32 + 8.0,
        )
    }

    /// Axis-aligned bounds of the chunk in world space.
    pub fn bounding_box(&self) -> Aabb {
        let origin = self.origin().cast::<f32>().unwrap_or(Point3::new(0.0, 0.0, 0.0));
        let size = CHUNK_SIZE as f32;
        Aabb::new(origin, origin + Vector3::new(size, size, size))
    }

    /// The column this chunk belongs to.
    pub fn column(&self) -> ColumnCoordinate {
        ColumnCoordinate::new(self.x, self.z)
    }

    /// The neighbor across `direction`.
    pub fn adjacent(&self, direction: Direction) -> ChunkCoordinate {
        let offset = direction.offset();
        Self::new(self.x + offset.x, self.y + offset.y, self.z + offset.z)
    }

    /// Whether the y slot exists in a column.
    pub fn is_within_column_height(&self) -> bool {
        (0..COLUMN_HEIGHT).contains(&self.y)
    }
}

/// Identifies a vertical stack of chunks sharing `(x, z)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnCoordinate {
    pub x: i32,
    pub z: i32,
}

impl ColumnCoordinate {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk at slot `y` of this column.
    pub fn chunk(&self, y: i32) -> ChunkCoordinate {
        ChunkCoordinate::new(self.x, y, self.z)
    }
}
