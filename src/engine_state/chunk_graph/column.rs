//! Vertical stack of chunk nodes sharing one (x, z) column.

use super::node::ChunkNode;
use crate::engine_state::voxels::coord::{ChunkCoordinate, ColumnCoordinate, COLUMN_HEIGHT};

/// The chunk nodes of one column, indexed by y-slot.
#[derive(Debug)]
pub struct ColumnNode {
    coord: ColumnCoordinate,
    chunks: Vec<Option<ChunkNode>>,
    chunk_present: bool,
}

impl ColumnNode {
    /// Creates an empty column.
    ///
    /// # Arguments
    /// * `coord` - Column position
    /// * `chunk_present` - Whether the host currently has this column loaded
    pub fn new(coord: ColumnCoordinate, chunk_present: bool) -> Self {
        Self {
            coord,
            chunks: (0..COLUMN_HEIGHT).map(|_| None).collect(),
            chunk_present,
        }
    }

    pub fn coord(&self) -> ColumnCoordinate {
        self.coord
    }

    pub fn is_chunk_present(&self) -> bool {
        self.chunk_present
    }

    pub fn set_chunk_present(&mut self, present: bool) {
        self.chunk_present = present;
    }

    fn slot(y: i32) -> Option<usize> {
        (0..COLUMN_HEIGHT).contains(&y).then_some(y as usize)
    }

    pub fn get(&self, y: i32) -> Option<&ChunkNode> {
        Self::slot(y).and_then(|slot| self.chunks[slot].as_ref())
    }

    pub fn get_mut(&mut self, y: i32) -> Option<&mut ChunkNode> {
        Self::slot(y).and_then(|slot| self.chunks[slot].as_mut())
    }

    /// Returns the node at `y`, creating it with `create` if the slot is empty.
    ///
    /// # Returns
    /// `None` if `y` is outside the column
    pub fn get_or_create(
        &mut self,
        y: i32,
        create: impl FnOnce(ChunkCoordinate) -> ChunkNode,
    ) -> Option<&mut ChunkNode> {
        let slot = Self::slot(y)?;
        let coord = self.coord.chunk(y);
        Some(self.chunks[slot].get_or_insert_with(|| create(coord)))
    }

    /// Takes the node at `y` out of the column.
    pub fn remove(&mut self, y: i32) -> Option<ChunkNode> {
        Self::slot(y).and_then(|slot| self.chunks[slot].take())
    }

    /// Takes every node out of the column.
    pub fn drain(&mut self) -> impl Iterator<Item = ChunkNode> + '_ {
        self.chunks.iter_mut().filter_map(Option::take)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ChunkNode> {
        self.chunks.iter().flatten()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut ChunkNode> {
        self.chunks.iter_mut().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(Option::is_none)
    }
}
