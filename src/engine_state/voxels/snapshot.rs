//! # Chunk Snapshot
//!
//! An immutable copy of one chunk's block, light and biome data plus a one-block
//! border from its neighbors. Build workers read only from snapshots, never from
//! the live world, so a build needs no locking and cannot observe a half-applied edit.

use std::sync::Arc;

use cgmath::Point3;

use super::{
    block_state::{Biome, BlockState, Light},
    coord::{ChunkCoordinate, CHUNK_SIZE},
    world::WorldSource,
};

/// Width of the captured neighborhood along each axis
pub const SNAPSHOT_SIZE: i32 = CHUNK_SIZE + 2;
const SNAPSHOT_VOLUME: usize = (SNAPSHOT_SIZE * SNAPSHOT_SIZE * SNAPSHOT_SIZE) as usize;
const SNAPSHOT_AREA: usize = (SNAPSHOT_SIZE * SNAPSHOT_SIZE) as usize;

/// Read-only view of a chunk and its border.
///
/// Local coordinates run from `-1` to `16` inclusive on each axis, where `0..16`
/// is the chunk itself.
pub struct ChunkSnapshot {
    coord: ChunkCoordinate,
    blocks: Box<[BlockState]>,
    light: Box<[Light]>,
    biomes: Box<[Biome]>,
}

impl ChunkSnapshot {
    /// Copies the neighborhood of `coord` out of `world`.
    ///
    /// # Returns
    /// `None` if the chunk's column is not loaded.
    pub fn capture<W: WorldSource + ?Sized>(
        world: &W,
        coord: ChunkCoordinate,
    ) -> Option<Arc<ChunkSnapshot>> {
        if !world.is_chunk_loaded(coord.column()) {
            return None;
        }

        let origin = coord.origin();
        let mut blocks = Vec::with_capacity(SNAPSHOT_VOLUME);
        let mut light = Vec::with_capacity(SNAPSHOT_VOLUME);

        for y in -1..=CHUNK_SIZE {
            for z in -1..=CHUNK_SIZE {
                for x in -1..=CHUNK_SIZE {
                    let (wx, wy, wz) = (origin.x + x, origin.y + y, origin.z + z);
                    blocks.push(world.block_state(wx, wy, wz));
                    light.push(world.light(wx, wy, wz));
                }
            }
        }

        let mut biomes = Vec::with_capacity(SNAPSHOT_AREA);
        for z in -1..=CHUNK_SIZE {
            for x in -1..=CHUNK_SIZE {
                biomes.push(world.biome(origin.x + x, origin.z + z));
            }
        }

        Some(Arc::new(ChunkSnapshot {
            coord,
            blocks: blocks.into_boxed_slice(),
            light: light.into_boxed_slice(),
            biomes: biomes.into_boxed_slice(),
        }))
    }

    fn index(x: i32, y: i32, z: i32) -> usize {
        debug_assert!(
            (-1..=CHUNK_SIZE).contains(&x)
                && (-1..=CHUNK_SIZE).contains(&y)
                && (-1..=CHUNK_SIZE).contains(&z),
            "snapshot access out of range: ({}, {}, {})",
            x,
            y,
            z
        );
        (((y + 1) * SNAPSHOT_SIZE + (z + 1)) * SNAPSHOT_SIZE + (x + 1)) as usize
    }

    pub fn coord(&self) -> ChunkCoordinate {
        self.coord
    }

    pub fn origin(&self) -> Point3<i32> {
        self.coord.origin()
    }

    /// Block at a local position.
    pub fn block_state(&self, x: i32, y: i32, z: i32) -> BlockState {
        self.blocks[Self::index(x, y, z)]
    }

    /// Light at a local position.
    pub fn light(&self, x: i32, y: i32, z: i32) -> Light {
        self.light[Self::index(x, y, z)]
    }

    /// Biome at a local column.
    pub fn biome(&self, x: i32, z: i32) -> Biome {
        self.biomes[((z + 1) * SNAPSHOT_SIZE + (x + 1)) as usize]
    }

    /// Whether the chunk itself (not its border) contains only air.
    pub fn is_empty(&self) -> bool {
        (0..CHUNK_SIZE).all(|y| {
            (0..CHUNK_SIZE).all(|z| (0..CHUNK_SIZE).all(|x| self.block_state(x, y, z).is_air()))
        })
    }
}
