//! # Terrain Generation
//!
//! Fills columns of a [`World`] with Perlin-noise terrain so the renderer has
//! something realistic to traverse: rolling hills from 2D noise, caves carved by
//! 3D noise, water below sea level and the occasional block-entity.

use noise::{NoiseFn, Perlin};

use super::{
    block_state::{Biome, BlockState},
    coord::{ColumnCoordinate, CHUNK_SIZE},
    world::{World, WORLD_HEIGHT},
};

/// Scaling factor applied to world coordinates when sampling the height map.
pub const HEIGHT_SCALE_FACTOR: f64 = 0.01;
/// Scaling factor applied to world coordinates when sampling cave noise.
pub const CAVE_SCALE_FACTOR: f64 = 0.05;
/// Cave noise above this threshold is carved out.
pub const CAVE_THRESHOLD: f64 = 0.45;
/// Base terrain height in blocks.
pub const BASE_HEIGHT: f64 = 64.0;
/// Height variation in blocks.
pub const HEIGHT_AMPLITUDE: f64 = 24.0;
/// Air at or below this height is filled with water.
pub const SEA_LEVEL: i32 = 62;

pub const STONE: BlockState = BlockState::solid(1, 0xFF_80_80_80, 1);
pub const DIRT: BlockState = BlockState::solid(2, 0xFF_3B_5A_86, 2);
pub const GRASS: BlockState = BlockState::solid(3, 0xFF_FF_FF_FF, 3).with_tint();
pub const WATER: BlockState = BlockState::translucent(4, 0xB0_FF_60_30, 4).with_animation();
pub const LEAVES: BlockState = BlockState::cutout(5, 0xFF_FF_FF_FF, 5).with_tint();
pub const CHEST: BlockState = BlockState::cutout(6, 0xFF_20_60_A0, 6).with_block_entity(1, false);
pub const BEACON: BlockState = BlockState::cutout(7, 0xFF_FF_FF_C0, 7).with_block_entity(2, true);

/// Deterministic terrain generator.
pub struct TerrainGenerator {
    height: Perlin,
    caves: Perlin,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            height: Perlin::new(seed),
            caves: Perlin::new(seed.wrapping_add(1)),
        }
    }

    /// Surface height of the world column at `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let sample = self
            .height
            .get([x as f64 * HEIGHT_SCALE_FACTOR, z as f64 * HEIGHT_SCALE_FACTOR]);
        (BASE_HEIGHT + sample * HEIGHT_AMPLITUDE) as i32
    }

    fn is_cave(&self, x: i32, y: i32, z: i32) -> bool {
        let sample = self.caves.get([
            x as f64 * CAVE_SCALE_FACTOR,
            y as f64 * CAVE_SCALE_FACTOR,
            z as f64 * CAVE_SCALE_FACTOR,
        ]);
        sample > CAVE_THRESHOLD
    }

    /// Generates one column into `world` and marks it loaded.
    pub fn generate_column(&self, world: &mut World, column: ColumnCoordinate) {
        let base_x = column.x * CHUNK_SIZE;
        let base_z = column.z * CHUNK_SIZE;

        for lz in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let (x, z) = (base_x + lx, base_z + lz);
                let surface = self.surface_height(x, z).clamp(1, WORLD_HEIGHT - 2);

                for y in 0..=surface.max(SEA_LEVEL) {
                    let state = if y > surface {
                        WATER
                    } else if y > 0 && self.is_cave(x, y, z) {
                        continue;
                    } else if y == surface {
                        if y < SEA_LEVEL { DIRT } else { GRASS }
                    } else if y > surface - 4 {
                        DIRT
                    } else {
                        STONE
                    };
                    world.set_block(x, y, z, state);
                }

                if surface >= SEA_LEVEL && (x * 31 + z * 17).rem_euclid(211) == 0 {
                    world.set_block(x, surface + 1, z, CHEST);
                }
            }
        }

        if (column.x + column.z).rem_euclid(13) == 0 {
            let surface = self.surface_height(base_x + 8, base_z + 8).clamp(1, WORLD_HEIGHT - 3);
            world.set_block(base_x + 8, surface + 1, base_z + 8, BEACON);
        }

        let temperature = self.height.get([column.x as f64 * 0.1, column.z as f64 * 0.1]);
        let tint = if temperature > 0.0 { 0xFF_40_C0_60 } else { 0xFF_60_A0_80 };
        world.set_biome(
            column,
            Biome {
                id: if temperature > 0.0 { 1 } else { 2 },
                tint,
            },
        );
        world.load_column(column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::world::WorldSource;

    #[test]
    fn test_generation_is_deterministic_and_loads_column() {
        let generator = TerrainGenerator::new(7);
        let mut a = World::new();
        let mut b = World::new();
        let column = ColumnCoordinate::new(2, -3);
        generator.generate_column(&mut a, column);
        generator.generate_column(&mut b, column);

        assert!(a.is_chunk_loaded(column));
        for y in [0, 30, 60, 70] {
            assert_eq!(a.block_state(40, y, -40), b.block_state(40, y, -40));
        }
        assert!(!a.block_state(35, 0, -45).is_air());
    }
}
