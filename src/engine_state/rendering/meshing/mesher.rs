//! # Chunk Mesher
//!
//! Turns a [`ChunkSnapshot`] into a [`MeshInfo`] on a worker thread.
//!
//! ## Algorithm
//!
//! Every visible block emits one quad per face that is not hidden by its
//! neighbor. A face is hidden by an opaque neighbor, or by a neighbor of the same
//! non-opaque block (adjacent water or glass shares no interior faces). Each face
//! takes the light of the cell it faces into and a fixed directional shade.
//! Opaque blocks also feed the occlusion builder that produces the chunk's
//! face connectivity.

use std::sync::Arc;

use cgmath::Vector3;

use super::{build_buffers::ChunkBuildBuffers, mesh_info::MeshInfo, quad::*};
use crate::engine_state::{
    rendering::vertex::QuadEncoder,
    voxels::{
        block_state::{BlockEntity, BlockState},
        coord::CHUNK_SIZE,
        direction::Direction,
        occlusion::OcclusionDataBuilder,
        snapshot::ChunkSnapshot,
    },
};

/// Sprites per row in the texture atlas
pub const ATLAS_SPRITES_PER_ROW: u32 = 16;

/// Corners of each face of a unit cube, wound counter-clockwise seen from outside.
const FACE_CORNERS: [[[f32; 3]; 4]; 6] = [
    // DOWN
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
    // UP
    [[0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]],
    // NORTH
    [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
    // SOUTH
    [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
    // WEST
    [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
    // EAST
    [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]],
];

const FACE_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

/// Directional shading, darkest underneath.
fn face_shade(direction: Direction) -> f32 {
    match direction {
        Direction::DOWN => 0.5,
        Direction::UP => 1.0,
        Direction::NORTH | Direction::SOUTH => 0.8,
        Direction::WEST | Direction::EAST => 0.6,
    }
}

fn is_face_hidden(state: &BlockState, neighbor: &BlockState) -> bool {
    neighbor.opaque || (!state.opaque && neighbor.id == state.id)
}

/// Builds the mesh of one chunk.
///
/// # Arguments
/// * `snapshot` - the chunk's captured neighborhood
/// * `encoder` - quad encoder of the configured vertex format
/// * `camera` - camera position relative to the chunk origin, for translucency sorting
pub fn build_chunk_mesh(
    snapshot: &ChunkSnapshot,
    encoder: Arc<dyn QuadEncoder>,
    camera: Vector3<f32>,
) -> MeshInfo {
    let mut buffers = ChunkBuildBuffers::new(encoder);
    let mut occlusion = OcclusionDataBuilder::new();
    let mut block_entities = Vec::new();
    let mut global_block_entities = Vec::new();
    let mut animated_sprites = Vec::new();
    let origin = snapshot.origin();

    for y in 0..CHUNK_SIZE {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let state = snapshot.block_state(x, y, z);
                if state.is_air() {
                    continue;
                }

                if state.opaque {
                    occlusion.mark_closed(x, y, z);
                }

                if let Some(kind) = state.block_entity {
                    let entity = BlockEntity {
                        position: origin + Vector3::new(x, y, z),
                        kind: kind.kind,
                        global: kind.global,
                    };
                    if kind.global {
                        global_block_entities.push(entity);
                    } else {
                        block_entities.push(entity);
                    }
                }

                let Some(pass) = state.render_pass else {
                    continue;
                };

                let mut emitted = false;
                for direction in Direction::ALL {
                    let offset = direction.offset();
                    let (nx, ny, nz) = (x + offset.x, y + offset.y, z + offset.z);
                    if is_face_hidden(&state, &snapshot.block_state(nx, ny, nz)) {
                        continue;
                    }

                    let mut color = state.color;
                    if state.tinted {
                        color = multiply_color(color, snapshot.biome(x, z).tint);
                    }
                    color = shade_color(color, face_shade(direction));

                    let quad = make_face_quad(
                        direction,
                        [x as f32, y as f32, z as f32],
                        color,
                        pack_light(snapshot.light(nx, ny, nz)),
                        state.sprite,
                    );
                    buffers.get(pass).add_quad(&quad);
                    emitted = true;
                }

                if emitted && state.animated && !animated_sprites.contains(&state.sprite) {
                    animated_sprites.push(state.sprite);
                }
            }
        }
    }

    let layers = buffers.create_meshes(camera);
    MeshInfo::new(
        layers,
        occlusion.build(),
        block_entities,
        global_block_entities,
        animated_sprites,
    )
}

/// Quad for one face of the block at chunk-local `position`.
fn make_face_quad(
    direction: Direction,
    position: [f32; 3],
    color: u32,
    light: u32,
    sprite: u32,
) -> ModelQuad {
    let tile = 1.0 / ATLAS_SPRITES_PER_ROW as f32;
    let u0 = (sprite % ATLAS_SPRITES_PER_ROW) as f32 * tile;
    let v0 = (sprite / ATLAS_SPRITES_PER_ROW) as f32 * tile;

    let corners = FACE_CORNERS[direction as usize];
    let mut positions = [[0.0f32; 3]; 4];
    let mut tex_coords = [[0.0f32; 2]; 4];
    for i in 0..4 {
        positions[i] = [
            position[0] + corners[i][0],
            position[1] + corners[i][1],
            position[2] + corners[i][2],
        ];
        tex_coords[i] = [u0 + FACE_UVS[i][0] * tile, v0 + FACE_UVS[i][1] * tile];
    }

    ModelQuad {
        positions,
        colors: [color; 4],
        tex_coords,
        light: [light; 4],
        sprite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        rendering::{
            render_pass::BlockRenderPass,
            vertex::{WideQuadEncoder, WIDE_FORMAT},
        },
        voxels::{
            coord::{ChunkCoordinate, ColumnCoordinate},
            world::World,
        },
    };

    fn snapshot_of(world: &World) -> Arc<ChunkSnapshot> {
        ChunkSnapshot::capture(world, ChunkCoordinate::new(0, 0, 0)).unwrap()
    }

    fn loaded_world() -> World {
        let mut world = World::new();
        world.load_column(ColumnCoordinate::new(0, 0));
        world
    }

    #[test]
    fn test_single_block_emits_six_faces() {
        let mut world = loaded_world();
        world.set_block(4, 4, 4, BlockState::solid(1, 0xFFFFFFFF, 0));
        let mesh = build_chunk_mesh(&snapshot_of(&world), Arc::new(WideQuadEncoder), Vector3::new(0.0, 0.0, 0.0));

        let layer = mesh.layer(BlockRenderPass::Solid).unwrap();
        assert_eq!(layer.vertex_count, 24);
        assert_eq!(layer.data.len(), 24 * WIDE_FORMAT.stride as usize);
        assert!(!mesh.is_empty());
    }

    #[test]
    fn test_shared_faces_are_culled() {
        let mut world = loaded_world();
        world.set_block(4, 4, 4, BlockState::solid(1, 0xFFFFFFFF, 0));
        world.set_block(5, 4, 4, BlockState::solid(1, 0xFFFFFFFF, 0));
        world.set_block(0, 10, 0, BlockState::translucent(9, 0x80FFFFFF, 0));
        world.set_block(1, 10, 0, BlockState::translucent(9, 0x80FFFFFF, 0));
        let mesh = build_chunk_mesh(&snapshot_of(&world), Arc::new(WideQuadEncoder), Vector3::new(0.0, 0.0, 0.0));

        assert_eq!(mesh.layer(BlockRenderPass::Solid).unwrap().vertex_count, 40);
        assert_eq!(mesh.layer(BlockRenderPass::Translucent).unwrap().vertex_count, 40);
    }

    #[test]
    fn test_air_chunk_is_empty_and_open() {
        let world = loaded_world();
        let mesh = build_chunk_mesh(&snapshot_of(&world), Arc::new(WideQuadEncoder), Vector3::new(0.0, 0.0, 0.0));
        assert!(mesh.is_empty());
        assert!(mesh.is_visible_through(Direction::UP, Direction::DOWN));
    }

    #[test]
    fn test_block_entities_and_animated_sprites_are_collected() {
        let mut world = loaded_world();
        world.set_block(1, 1, 1, BlockState::cutout(5, 0xFFFFFFFF, 2).with_block_entity(1, false));
        world.set_block(3, 1, 1, BlockState::cutout(6, 0xFFFFFFFF, 2).with_block_entity(2, true));
        world.set_block(6, 1, 1, BlockState::translucent(7, 0xFFFFFFFF, 9).with_animation());
        let mesh = build_chunk_mesh(&snapshot_of(&world), Arc::new(WideQuadEncoder), Vector3::new(0.0, 0.0, 0.0));

        assert_eq!(mesh.block_entities().len(), 1);
        assert_eq!(mesh.block_entities()[0].position, cgmath::Point3::new(1, 1, 1));
        assert_eq!(mesh.global_block_entities().len(), 1);
        assert_eq!(mesh.animated_sprites(), &[9]);
    }
}
