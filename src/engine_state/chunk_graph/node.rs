//! Per-chunk render node.
//!
//! A `ChunkNode` carries everything the renderer tracks for one chunk: its
//! current mesh, its GPU allocation, its build state and the scratch state the
//! visibility traversal writes each frame.

use std::sync::Arc;

use crate::engine_state::{
    camera_state::frustum::Aabb,
    rendering::{
        backend::ChunkRenderState,
        builder::{ChunkBuilder, PendingBuild},
        meshing::mesh_info::MeshInfo,
    },
    voxels::{coord::ChunkCoordinate, direction::Direction},
};

/// Render state of one chunk.
///
/// # Fields
/// - `render_state`: GPU allocation handed out by the render backend
/// - `pending`: the build in flight, if any
/// - `rebuild_frame`: last frame the traversal enqueued this node
/// - `last_visible_frame`: last frame the traversal marked this node visible
/// - `direction`: face the traversal entered through this frame
/// - `culling_state`: one bit per direction travelled on the way here
#[derive(Debug)]
pub struct ChunkNode {
    coord: ChunkCoordinate,
    mesh: Arc<MeshInfo>,
    pub render_state: ChunkRenderState,
    pub pending: Option<PendingBuild>,
    pub(crate) rebuild_frame: Option<u32>,
    pub(crate) last_visible_frame: Option<u32>,
    pub(crate) direction: Option<Direction>,
    culling_state: u8,
    needs_rebuild: bool,
    needs_important_rebuild: bool,
}

impl ChunkNode {
    /// Creates a node with an absent mesh that still needs its first build.
    pub fn new(coord: ChunkCoordinate, render_state: ChunkRenderState) -> Self {
        Self {
            coord,
            mesh: MeshInfo::absent(),
            render_state,
            pending: None,
            rebuild_frame: None,
            last_visible_frame: None,
            direction: None,
            culling_state: 0,
            needs_rebuild: true,
            needs_important_rebuild: false,
        }
    }

    pub fn coord(&self) -> ChunkCoordinate {
        self.coord
    }

    pub fn bounding_box(&self) -> Aabb {
        self.coord.bounding_box()
    }

    pub fn mesh(&self) -> &Arc<MeshInfo> {
        &self.mesh
    }

    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty()
    }

    pub fn last_visible_frame(&self) -> Option<u32> {
        self.last_visible_frame
    }

    /// Marks the node dirty. The latest request decides the importance.
    pub fn schedule_rebuild(&mut self, important: bool) {
        self.needs_rebuild = true;
        self.needs_important_rebuild = important;
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    pub fn needs_important_rebuild(&self) -> bool {
        self.needs_rebuild && self.needs_important_rebuild
    }

    /// Clears the dirty flags once a build has been scheduled for them.
    pub fn finish_scheduling(&mut self) {
        self.needs_rebuild = false;
        self.needs_important_rebuild = false;
    }

    /// Drops the dirty flags and cancels the build in flight.
    pub fn cancel_rebuild(&mut self) {
        self.finish_scheduling();
        ChunkBuilder::cancel(&mut self.pending);
    }

    /// Whether the build in flight was scheduled as `generation`.
    pub fn is_pending(&self, generation: u64) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation)
    }

    /// Whether the traversal already travelled in direction `from` to reach this node.
    pub fn can_cull(&self, from: Direction) -> bool {
        self.culling_state & (1 << from as u8) != 0
    }

    pub fn update_culling_state(&mut self, parent: u8, from: Direction) {
        self.culling_state = parent | (1 << from as u8);
    }

    pub fn culling_state(&self) -> u8 {
        self.culling_state
    }

    pub fn reset_graph_state(&mut self) {
        self.direction = None;
        self.culling_state = 0;
    }

    pub fn is_visible_through(&self, from: Direction, to: Direction) -> bool {
        self.mesh.is_visible_through(from, to)
    }

    /// Swaps in a new mesh.
    ///
    /// # Returns
    /// The mesh that was replaced
    pub fn set_mesh(&mut self, mesh: Arc<MeshInfo>) -> Arc<MeshInfo> {
        std::mem::replace(&mut self.mesh, mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::occlusion::VisibilityData;

    fn node() -> ChunkNode {
        ChunkNode::new(
            ChunkCoordinate::new(1, 2, 3),
            ChunkRenderState::Batched { allocated: false },
        )
    }

    #[test]
    fn test_new_node_needs_build_and_sees_through() {
        let node = node();
        assert!(node.needs_rebuild());
        assert!(!node.needs_important_rebuild());
        assert!(node.is_empty());
        assert!(node.is_visible_through(Direction::UP, Direction::WEST));
    }

    #[test]
    fn test_culling_state_accumulates_directions() {
        let mut parent = node();
        parent.update_culling_state(0, Direction::EAST);
        let mut child = node();
        child.update_culling_state(parent.culling_state(), Direction::UP);

        assert!(child.can_cull(Direction::EAST));
        assert!(child.can_cull(Direction::UP));
        assert!(!child.can_cull(Direction::WEST));

        child.reset_graph_state();
        assert!(!child.can_cull(Direction::EAST));
        assert!(child.direction.is_none());
    }

    #[test]
    fn test_important_flag_follows_latest_request() {
        let mut node = node();
        node.finish_scheduling();
        node.schedule_rebuild(true);
        assert!(node.needs_important_rebuild());
        node.schedule_rebuild(false);
        assert!(!node.needs_important_rebuild());
        node.cancel_rebuild();
        assert!(!node.needs_rebuild());
    }

    #[test]
    fn test_set_mesh_returns_previous() {
        let mut node = node();
        let solid = Arc::new(MeshInfo::new(
            vec![],
            VisibilityData::none(),
            vec![],
            vec![],
            vec![],
        ));
        let previous = node.set_mesh(solid.clone());
        assert!(previous.is_empty());
        assert!(Arc::ptr_eq(node.mesh(), &solid));
        assert!(!node.is_visible_through(Direction::UP, Direction::DOWN));
    }
}
