//! # World Module
//!
//! The world-data boundary of the renderer. [`WorldSource`] is what the renderer
//! reads from the host; [`World`] is a sparse in-memory implementation used by the
//! demo binary and by tests.
//!
//! ## Architecture
//!
//! The renderer never holds a borrow into live world data across frames. Workers
//! only see [`ChunkSnapshot`]s captured on the main thread, so a `WorldSource`
//! needs no internal synchronization unless the host mutates it from elsewhere,
//! in which case wrapping it in an `MtResource` makes each capture atomic.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::core::MtResource;

use super::{
    block_state::{Biome, BlockState, Light},
    coord::{ChunkCoordinate, ColumnCoordinate, CHUNK_SHIFT, CHUNK_SIZE, COLUMN_HEIGHT},
    snapshot::ChunkSnapshot,
};

/// World height in blocks
pub const WORLD_HEIGHT: i32 = CHUNK_SIZE * COLUMN_HEIGHT;

/// Read access to host world data.
pub trait WorldSource {
    /// Block at a world position; air outside the world.
    fn block_state(&self, x: i32, y: i32, z: i32) -> BlockState;

    /// Light at a world position.
    fn light(&self, x: i32, y: i32, z: i32) -> Light;

    /// Biome at a world column.
    fn biome(&self, x: i32, z: i32) -> Biome;

    /// Whether the host has the world chunk column loaded.
    fn is_chunk_loaded(&self, column: ColumnCoordinate) -> bool;

    /// Captures a snapshot of a chunk and its immediate neighborhood.
    ///
    /// Returns `None` if the chunk's column is not loaded.
    fn capture_section(&self, coord: ChunkCoordinate) -> Option<Arc<ChunkSnapshot>> {
        ChunkSnapshot::capture(self, coord)
    }
}

impl<W: WorldSource + Send + Sync + 'static> WorldSource for MtResource<W> {
    fn block_state(&self, x: i32, y: i32, z: i32) -> BlockState {
        self.get().block_state(x, y, z)
    }

    fn light(&self, x: i32, y: i32, z: i32) -> Light {
        self.get().light(x, y, z)
    }

    fn biome(&self, x: i32, z: i32) -> Biome {
        self.get().biome(x, z)
    }

    fn is_chunk_loaded(&self, column: ColumnCoordinate) -> bool {
        self.get().is_chunk_loaded(column)
    }

    /// Holds the read lock for the whole capture so the snapshot is self-consistent.
    fn capture_section(&self, coord: ChunkCoordinate) -> Option<Arc<ChunkSnapshot>> {
        let world = self.get();
        ChunkSnapshot::capture(&*world, coord)
    }
}

const SECTION_VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Block and light storage for one chunk.
struct Section {
    blocks: Box<[BlockState]>,
    light: Box<[Light]>,
}

impl Section {
    fn new() -> Self {
        Self {
            blocks: vec![BlockState::AIR; SECTION_VOLUME].into_boxed_slice(),
            light: vec![Light::FULL_SKY; SECTION_VOLUME].into_boxed_slice(),
        }
    }

    fn index(x: i32, y: i32, z: i32) -> usize {
        let mask = CHUNK_SIZE - 1;
        (((y & mask) << 8) | ((z & mask) << 4) | (x & mask)) as usize
    }
}

/// A sparse in-memory voxel world.
///
/// Sections are created on first write. A column must be loaded for the
/// renderer to build or traverse any of its chunks.
///
/// # Examples
///
/// ```
/// use voxel_chunk_graph::engine_state::voxels::{
///     block_state::BlockState,
///     coord::ColumnCoordinate,
///     world::{World, WorldSource},
/// };
///
/// let mut world = World::new();
/// world.load_column(ColumnCoordinate::new(0, 0));
/// world.set_block(1, 64, 1, BlockState::solid(1, 0xFFFFFFFF, 0));
/// assert!(world.block_state(1, 64, 1).opaque);
/// ```
#[derive(Default)]
pub struct World {
    sections: HashMap<ChunkCoordinate, Section>,
    loaded_columns: HashSet<ColumnCoordinate>,
    biomes: HashMap<ColumnCoordinate, Biome>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a column as loaded.
    pub fn load_column(&mut self, column: ColumnCoordinate) {
        self.loaded_columns.insert(column);
    }

    /// Unloads a column and drops its block data.
    pub fn unload_column(&mut self, column: ColumnCoordinate) {
        self.loaded_columns.remove(&column);
        self.sections.retain(|coord, _| coord.column() != column);
    }

    /// Sets a block, creating its section if needed. Writes outside the world height are ignored.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, state: BlockState) {
        if !(0..WORLD_HEIGHT).contains(&y) {
            return;
        }
        let section = self
            .sections
            .entry(ChunkCoordinate::from_block(x, y, z))
            .or_insert_with(Section::new);
        section.blocks[Section::index(x, y, z)] = state;
    }

    /// Sets the light value at a block position.
    pub fn set_light(&mut self, x: i32, y: i32, z: i32, light: Light) {
        if !(0..WORLD_HEIGHT).contains(&y) {
            return;
        }
        let section = self
            .sections
            .entry(ChunkCoordinate::from_block(x, y, z))
            .or_insert_with(Section::new);
        section.light[Section::index(x, y, z)] = light;
    }

    /// Sets the biome of a whole column.
    pub fn set_biome(&mut self, column: ColumnCoordinate, biome: Biome) {
        self.biomes.insert(column, biome);
    }

    /// Fills a chunk completely with one block state.
    pub fn fill_chunk(&mut self, coord: ChunkCoordinate, state: BlockState) {
        let section = self.sections.entry(coord).or_insert_with(Section::new);
        section.blocks.iter_mut().for_each(|block| *block = state);
    }

    /// Loaded columns, in no particular order.
    pub fn loaded_columns(&self) -> impl Iterator<Item = ColumnCoordinate> + '_ {
        self.loaded_columns.iter().copied()
    }
}

impl WorldSource for World {
    fn block_state(&self, x: i32, y: i32, z: i32) -> BlockState {
        self.sections
            .get(&ChunkCoordinate::from_block(x, y, z))
            .map(|section| section.blocks[Section::index(x, y, z)])
            .unwrap_or(BlockState::AIR)
    }

    fn light(&self, x: i32, y: i32, z: i32) -> Light {
        self.sections
            .get(&ChunkCoordinate::from_block(x, y, z))
            .map(|section| section.light[Section::index(x, y, z)])
            .unwrap_or(Light::FULL_SKY)
    }

    fn biome(&self, x: i32, z: i32) -> Biome {
        self.biomes
            .get(&ColumnCoordinate::new(x >> CHUNK_SHIFT, z >> CHUNK_SHIFT))
            .copied()
            .unwrap_or_default()
    }

    fn is_chunk_loaded(&self, column: ColumnCoordinate) -> bool {
        self.loaded_columns.contains(&column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloaded_column_has_no_snapshot() {
        let mut world = World::new();
        world.set_block(0, 0, 0, BlockState::solid(1, 0, 0));
        assert!(world.capture_section(ChunkCoordinate::new(0, 0, 0)).is_none());

        world.load_column(ColumnCoordinate::new(0, 0));
        assert!(world.capture_section(ChunkCoordinate::new(0, 0, 0)).is_some());
    }

    #[test]
    fn test_unload_drops_sections() {
        let mut world = World::new();
        let column = ColumnCoordinate::new(-1, 2);
        world.load_column(column);
        world.set_block(-5, 10, 40, BlockState::solid(1, 0, 0));
        assert!(!world.block_state(-5, 10, 40).is_air());

        world.unload_column(column);
        assert!(world.block_state(-5, 10, 40).is_air());
        assert!(!world.is_chunk_loaded(column));
    }

    #[test]
    fn test_shared_world_captures() {
        let mut world = World::new();
        world.load_column(ColumnCoordinate::new(0, 0));
        world.set_block(3, 3, 3, BlockState::solid(2, 0, 0));
        let shared = MtResource::new(world);
        let snapshot = shared.capture_section(ChunkCoordinate::new(0, 0, 0)).unwrap();
        assert_eq!(snapshot.block_state(3, 3, 3).id, 2);
    }
}
