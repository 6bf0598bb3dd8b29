//! Task that produces a chunk's `MeshInfo` on a worker thread.
//!
//! Every task carries the generation it was scheduled with. The main thread only
//! applies a result whose generation still matches the node's pending build, so a
//! superseded task can finish harmlessly.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use cgmath::Vector3;

use crate::engine_state::{
    rendering::{
        meshing::{
            build_buffers::sort_encoded_quads,
            mesh_info::{MeshInfo, MeshLayer},
            mesher::build_chunk_mesh,
        },
        render_pass::BlockRenderPass,
        vertex::{QuadEncoder, VertexFormat},
    },
    task_management::task::Task,
    voxels::{coord::ChunkCoordinate, snapshot::ChunkSnapshot},
};

/// Identifies one scheduled build of one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BuildTicket {
    pub coord: ChunkCoordinate,
    pub generation: u64,
}

/// What a build task does.
pub enum ChunkBuildKind {
    /// Mesh a captured section from scratch
    Rebuild {
        snapshot: Arc<ChunkSnapshot>,
        encoder: Arc<dyn QuadEncoder>,
        /// Camera position relative to the chunk origin
        camera: Vector3<f32>,
    },
    /// The section holds no blocks; produce the empty mesh
    Empty,
    /// Reorder the translucent layer of `mesh` for a new camera position
    Sort {
        mesh: Arc<MeshInfo>,
        /// Camera position relative to the chunk origin
        camera: Vector3<f32>,
    },
}

/// A unit of chunk build work.
///
/// # Fields
/// - `ticket`: chunk and generation the result belongs to
/// - `cancelled`: shared with the scheduling node; set when the build is superseded
/// - `kind`: the work to do
pub struct ChunkBuildTask {
    ticket: BuildTicket,
    cancelled: Arc<AtomicBool>,
    kind: ChunkBuildKind,
}

impl ChunkBuildTask {
    /// Creates a new build task.
    ///
    /// # Arguments
    /// * `ticket` - Chunk and generation this build was scheduled under
    /// * `cancelled` - Flag the scheduler sets when the build is superseded
    /// * `kind` - The work to do
    pub fn new(ticket: BuildTicket, cancelled: Arc<AtomicBool>, kind: ChunkBuildKind) -> Self {
        Self {
            ticket,
            cancelled,
            kind,
        }
    }

    pub fn ticket(&self) -> BuildTicket {
        self.ticket
    }

    pub fn is_sort(&self) -> bool {
        matches!(self.kind, ChunkBuildKind::Sort { .. })
    }
}

impl Task for ChunkBuildTask {
    type Id = BuildTicket;
    type Output = MeshInfo;

    fn id(&self) -> BuildTicket {
        self.ticket
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn process(&self) -> MeshInfo {
        match &self.kind {
            ChunkBuildKind::Rebuild {
                snapshot,
                encoder,
                camera,
            } => build_chunk_mesh(snapshot, encoder.clone(), *camera),
            ChunkBuildKind::Empty => MeshInfo::default(),
            ChunkBuildKind::Sort { mesh, camera } => resort_translucent_layer(mesh, *camera),
        }
    }
}

/// Copy of `mesh` with its translucent layer reordered back-to-front from `camera`.
fn resort_translucent_layer(mesh: &MeshInfo, camera: Vector3<f32>) -> MeshInfo {
    let Some(layer) = mesh.layer(BlockRenderPass::Translucent) else {
        return mesh.clone();
    };

    let format = VertexFormat::of(layer.format);
    let mut data = layer.data.to_vec();
    sort_encoded_quads(format, &mut data, camera);

    mesh.with_layer(MeshLayer {
        pass: layer.pass,
        format: layer.format,
        data: Arc::from(data),
        vertex_count: layer.vertex_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        rendering::vertex::{QuadEncoderRegistry, VertexFormatKind},
        voxels::{
            block_state::BlockState,
            terrain::{STONE, WATER},
            world::World,
        },
    };

    fn ticket() -> BuildTicket {
        BuildTicket {
            coord: ChunkCoordinate::new(0, 0, 0),
            generation: 1,
        }
    }

    fn snapshot_with(blocks: &[(i32, i32, i32, BlockState)]) -> Arc<ChunkSnapshot> {
        let mut world = World::new();
        world.load_column(ChunkCoordinate::new(0, 0, 0).column());
        for &(x, y, z, state) in blocks {
            world.set_block(x, y, z, state);
        }
        ChunkSnapshot::capture(&world, ChunkCoordinate::new(0, 0, 0)).unwrap()
    }

    #[test]
    fn test_rebuild_produces_geometry() {
        let encoder = QuadEncoderRegistry::with_defaults()
            .unwrap()
            .get(VertexFormatKind::Wide)
            .unwrap();
        let task = ChunkBuildTask::new(
            ticket(),
            Arc::new(AtomicBool::new(false)),
            ChunkBuildKind::Rebuild {
                snapshot: snapshot_with(&[(3, 3, 3, STONE)]),
                encoder,
                camera: Vector3::new(8.0, 8.0, 8.0),
            },
        );

        let mesh = task.process();
        assert_eq!(mesh.layer(BlockRenderPass::Solid).unwrap().vertex_count, 24);
        assert_eq!(task.id(), ticket());
    }

    #[test]
    fn test_empty_build_is_see_through() {
        let task = ChunkBuildTask::new(ticket(), Arc::new(AtomicBool::new(false)), ChunkBuildKind::Empty);
        let mesh = task.process();
        assert!(mesh.is_empty());
        assert_eq!(*mesh.visibility(), crate::engine_state::voxels::occlusion::VisibilityData::all());
    }

    #[test]
    fn test_sort_reorders_translucent_layer_only() {
        let encoder = QuadEncoderRegistry::with_defaults()
            .unwrap()
            .get(VertexFormatKind::Compact)
            .unwrap();
        let snapshot = snapshot_with(&[(1, 1, 1, STONE), (1, 1, 8, WATER), (1, 1, 14, WATER)]);
        let mesh = Arc::new(build_chunk_mesh(&snapshot, encoder, Vector3::new(1.5, 1.5, 0.0)));
        let before = mesh.layer(BlockRenderPass::Translucent).unwrap().data.clone();

        let task = ChunkBuildTask::new(
            ticket(),
            Arc::new(AtomicBool::new(false)),
            ChunkBuildKind::Sort {
                mesh: mesh.clone(),
                camera: Vector3::new(1.5, 1.5, 16.0),
            },
        );
        assert!(task.is_sort());
        let sorted = task.process();

        let after = &sorted.layer(BlockRenderPass::Translucent).unwrap().data;
        assert_eq!(after.len(), before.len());
        assert_ne!(after[..], before[..]);
        assert!(Arc::ptr_eq(
            &sorted.layer(BlockRenderPass::Solid).unwrap().data,
            &mesh.layer(BlockRenderPass::Solid).unwrap().data
        ));
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = Arc::new(AtomicBool::new(false));
        let task = ChunkBuildTask::new(ticket(), flag.clone(), ChunkBuildKind::Empty);
        assert!(!task.is_cancelled());
        flag.store(true, Ordering::Release);
        assert!(task.is_cancelled());
    }
}
