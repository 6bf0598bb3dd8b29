//! # Chunk Visibility Graph
//!
//! Decides every frame which chunks can be seen from the camera.
//!
//! ## Key Components
//!
//! * `ChunkGraph` - owns every chunk node, grouped in columns, and runs the traversal
//! * `ColumnNode` - the nodes of one (x, z) column and whether the host has it loaded
//! * `ChunkNode` - mesh, GPU allocation, build state and traversal scratch state of a chunk
//!
//! ## Algorithm
//!
//! A breadth-first search starts at the chunk containing the camera and spreads
//! through neighbouring chunks. A neighbour is skipped when it is out of the
//! render bounds, already reached this frame, or missing one of its four horizontal
//! neighbour columns. With culling on it is also skipped when the traversal would
//! turn back on itself, when the current chunk's geometry blocks the path from the
//! face it was entered through, or when the neighbour is outside the frustum.
//!
//! ## Performance Considerations
//!
//! * Per-frame state is stamped with the frame number instead of being cleared
//! * Nodes persist across frames; only the output lists are rebuilt
//! * Columns that the host unloads are swept lazily by `cleanup()`

pub mod column;
pub mod node;

use std::collections::{hash_map::Entry, HashMap, VecDeque};

use log::debug;

use column::ColumnNode;
use node::ChunkNode;

use crate::engine_state::{
    camera_state::{camera::Camera, frustum::FrustumTest},
    rendering::{backend::BackendKind, meshing::mesh_info::MeshInfo},
    voxels::{
        block_state::BlockEntity,
        coord::{ChunkCoordinate, ColumnCoordinate, CHUNK_SHIFT, CHUNK_SIZE, COLUMN_HEIGHT},
        direction::Direction,
        occlusion::OcclusionDataBuilder,
        world::WorldSource,
    },
};

/// Chunk-space box the traversal may enter this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct RenderBounds {
    min_x: i32,
    max_x: i32,
    min_z: i32,
    max_z: i32,
}

impl RenderBounds {
    fn contains(&self, coord: ChunkCoordinate) -> bool {
        coord.is_within_column_height()
            && (self.min_x..=self.max_x).contains(&coord.x)
            && (self.min_z..=self.max_z).contains(&coord.z)
    }
}

/// Spatial graph of chunk nodes and the per-frame visibility traversal.
pub struct ChunkGraph {
    columns: HashMap<ColumnCoordinate, ColumnNode>,
    unload_queue: Vec<ColumnCoordinate>,
    visible_chunks: Vec<ChunkCoordinate>,
    drawable_chunks: Vec<ChunkCoordinate>,
    visible_block_entities: Vec<BlockEntity>,
    iteration_queue: VecDeque<ChunkCoordinate>,
    bounds: RenderBounds,
    render_distance: i32,
    last_frame: Option<u32>,
    /// Faces the camera's own chunk may be left through this frame
    root: Option<(ChunkCoordinate, u8)>,
    chunk_culling: bool,
    use_culling: bool,
    use_fog_culling: bool,
    backend_kind: BackendKind,
}

impl ChunkGraph {
    /// Creates an empty graph.
    ///
    /// # Arguments
    /// * `render_distance` - Horizontal radius in chunks
    /// * `chunk_culling` - Occlusion and frustum culling during traversal
    /// * `use_fog_culling` - Stop expanding past the fog distance while culling
    /// * `backend_kind` - Backend whose render state new nodes start with
    pub fn new(
        render_distance: u32,
        chunk_culling: bool,
        use_fog_culling: bool,
        backend_kind: BackendKind,
    ) -> Self {
        Self {
            columns: HashMap::new(),
            unload_queue: Vec::new(),
            visible_chunks: Vec::new(),
            drawable_chunks: Vec::new(),
            visible_block_entities: Vec::new(),
            iteration_queue: VecDeque::new(),
            bounds: RenderBounds::default(),
            render_distance: render_distance as i32,
            last_frame: None,
            root: None,
            chunk_culling,
            use_culling: chunk_culling,
            use_fog_culling,
            backend_kind,
        }
    }

    pub fn render_distance(&self) -> u32 {
        self.render_distance as u32
    }

    /// Runs the visibility traversal for `frame`.
    ///
    /// Clears and refills the visible chunk, drawable chunk and visible
    /// block-entity lists. Chunks are listed in the order they were reached,
    /// which is roughly front to back.
    ///
    /// # Arguments
    /// * `world` - Source of loaded-column and block data
    /// * `camera` - Current camera
    /// * `frustum` - Test applied to chunk bounds while culling
    /// * `frame` - Frame counter; must differ from the previous call's
    /// * `spectator` - Whether the camera may sit inside solid blocks
    pub fn calculate_visible<W: WorldSource + ?Sized, F: FrustumTest + ?Sized>(
        &mut self,
        world: &W,
        camera: &Camera,
        frustum: &F,
        frame: u32,
        spectator: bool,
    ) {
        let max_distance_blocks = (self.render_distance * CHUNK_SIZE) as f32;
        let position = camera.position;

        self.bounds = RenderBounds {
            min_x: (position.x - max_distance_blocks).floor() as i32 >> CHUNK_SHIFT,
            max_x: (position.x + max_distance_blocks).floor() as i32 >> CHUNK_SHIFT,
            min_z: (position.z - max_distance_blocks).floor() as i32 >> CHUNK_SHIFT,
            max_z: (position.z + max_distance_blocks).floor() as i32 >> CHUNK_SHIFT,
        };

        self.last_frame = Some(frame);
        self.visible_chunks.clear();
        self.drawable_chunks.clear();
        self.visible_block_entities.clear();
        self.iteration_queue.clear();

        self.init(world, camera, frustum, frame, spectator);

        let fog_culling = self.use_culling && self.use_fog_culling;
        let max_chunk_distance = max_distance_blocks + CHUNK_SIZE as f32;

        while let Some(coord) = self.iteration_queue.pop_front() {
            self.mark_visible(coord);

            if fog_culling {
                let origin = coord.origin();
                let dx = origin.x as f32 + 0.5 - position.x;
                let dy = origin.y as f32 + 0.5 - position.y;
                let dz = origin.z as f32 + 0.5 - position.z;
                if dx * dx + dy * dy + dz * dz >= max_chunk_distance * max_chunk_distance {
                    continue;
                }
            }

            self.add_neighbors(world, coord, frustum, frame);
        }
    }

    fn mark_visible(&mut self, coord: ChunkCoordinate) {
        let frame = self.last_frame;
        let Some(node) = self.node_mut(coord) else {
            return;
        };
        node.last_visible_frame = frame;
        let drawable = !node.is_empty();
        let mesh = node.mesh().clone();

        self.visible_chunks.push(coord);
        if drawable {
            self.drawable_chunks.push(coord);
        }
        self.visible_block_entities
            .extend_from_slice(mesh.block_entities());
    }

    fn add_neighbors<W: WorldSource + ?Sized, F: FrustumTest + ?Sized>(
        &mut self,
        world: &W,
        coord: ChunkCoordinate,
        frustum: &F,
        frame: u32,
    ) {
        let Some(node) = self.node(coord) else {
            return;
        };
        let culling_state = node.culling_state();
        let entered = node.direction;
        let mesh = node.mesh().clone();

        let use_culling = self.use_culling;
        let allowed_faces = match self.root {
            Some((root, faces)) if root == coord && use_culling => faces,
            _ => u8::MAX,
        };

        for direction in Direction::ALL {
            if allowed_faces & (1 << direction as u8) == 0 {
                continue;
            }

            let adjacent = coord.adjacent(direction);
            if !self.bounds.contains(adjacent) {
                continue;
            }

            match self.get_or_create_node(world, adjacent) {
                Some(adjacent_node) if adjacent_node.rebuild_frame != Some(frame) => {}
                _ => continue,
            }

            if use_culling
                && !is_visible(culling_state, entered, &mesh, adjacent, direction, frustum)
            {
                continue;
            }

            if !self.has_chunk_neighbors(world, adjacent) {
                continue;
            }

            if let Some(adjacent_node) = self.node_mut(adjacent) {
                adjacent_node.direction = Some(direction);
                adjacent_node.rebuild_frame = Some(frame);
                adjacent_node.update_culling_state(culling_state, direction);
                self.iteration_queue.push_back(adjacent);
            }
        }
    }

    fn init<W: WorldSource + ?Sized, F: FrustumTest + ?Sized>(
        &mut self,
        world: &W,
        camera: &Camera,
        frustum: &F,
        frame: u32,
        spectator: bool,
    ) {
        let block = camera.block_position();
        let camera_chunk = ChunkCoordinate::from_block(block.x, block.y, block.z);
        let mut cull = self.chunk_culling;
        self.root = None;

        if self.get_or_create_node(world, camera_chunk).is_some() {
            let mut open_faces = if self.chunk_culling {
                open_chunk_faces(world, camera_chunk, block.x, block.y, block.z)
            } else {
                Direction::ALL.to_vec()
            };

            if open_faces.len() == 1 {
                let behind = camera.horizontal_facing().opposite();
                open_faces.retain(|face| *face != behind);
            }

            if spectator && world.block_state(block.x, block.y, block.z).opaque {
                cull = false;
            }

            let faces = open_faces
                .iter()
                .fold(0u8, |faces, face| faces | (1 << *face as u8));
            self.root = Some((camera_chunk, faces));

            if let Some(node) = self.node_mut(camera_chunk) {
                node.reset_graph_state();
                node.rebuild_frame = Some(frame);
            }
            self.iteration_queue.push_back(camera_chunk);
        } else {
            let y = if block.y > 0 { COLUMN_HEIGHT - 1 } else { 0 };
            let camera_column = camera_chunk.column();
            let mut seeds = Vec::new();

            for dx in -self.render_distance..=self.render_distance {
                for dz in -self.render_distance..=self.render_distance {
                    let coord = ChunkCoordinate::new(camera_column.x + dx, y, camera_column.z + dz);
                    let Some(node) = self.get_or_create_node(world, coord) else {
                        continue;
                    };
                    if !frustum.is_visible(&coord.bounding_box()) {
                        continue;
                    }
                    node.rebuild_frame = Some(frame);
                    node.reset_graph_state();
                    seeds.push(coord);
                }
            }

            seeds.sort_by_key(|coord| {
                let center = coord.origin();
                let dx = (block.x - (center.x + 8)) as i64;
                let dy = (block.y - (center.y + 8)) as i64;
                let dz = (block.z - (center.z + 8)) as i64;
                dx * dx + dy * dy + dz * dz
            });
            self.iteration_queue.extend(seeds);
        }

        self.use_culling = cull;
    }

    /// Whether all four horizontal neighbour columns of `coord` are loaded.
    fn has_chunk_neighbors<W: WorldSource + ?Sized>(&self, world: &W, coord: ChunkCoordinate) -> bool {
        Direction::HORIZONTAL.iter().all(|direction| {
            let column = coord.adjacent(*direction).column();
            match self.columns.get(&column) {
                Some(column) => column.is_chunk_present(),
                None => world.is_chunk_loaded(column),
            }
        })
    }

    /// Returns the node at `coord`, creating it and its column if needed.
    ///
    /// # Returns
    /// `None` if `coord` is outside the column height or its column has no
    /// backing world data
    pub fn get_or_create_node<W: WorldSource + ?Sized>(
        &mut self,
        world: &W,
        coord: ChunkCoordinate,
    ) -> Option<&mut ChunkNode> {
        if !coord.is_within_column_height() {
            return None;
        }

        let column_coord = coord.column();
        let column = match self.columns.entry(column_coord) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                if !world.is_chunk_loaded(column_coord) {
                    return None;
                }
                entry.insert(ColumnNode::new(column_coord, true))
            }
        };

        if !column.is_chunk_present() {
            return None;
        }

        let backend_kind = self.backend_kind;
        column.get_or_create(coord.y, |coord| {
            ChunkNode::new(coord, backend_kind.create_render_state())
        })
    }

    pub fn node(&self, coord: ChunkCoordinate) -> Option<&ChunkNode> {
        self.columns.get(&coord.column())?.get(coord.y)
    }

    pub fn node_mut(&mut self, coord: ChunkCoordinate) -> Option<&mut ChunkNode> {
        self.columns.get_mut(&coord.column())?.get_mut(coord.y)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ChunkNode> {
        self.columns.values().flat_map(ColumnNode::nodes)
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut ChunkNode> {
        self.columns.values_mut().flat_map(ColumnNode::nodes_mut)
    }

    /// Chunks the last traversal reached, in traversal order.
    pub fn visible_chunks(&self) -> &[ChunkCoordinate] {
        &self.visible_chunks
    }

    /// Visible chunks with a non-empty mesh, in traversal order.
    pub fn drawable_chunks(&self) -> &[ChunkCoordinate] {
        &self.drawable_chunks
    }

    /// Block-entities of every visible chunk.
    pub fn visible_block_entities(&self) -> &[BlockEntity] {
        &self.visible_block_entities
    }

    /// The host loaded a column.
    pub fn on_chunk_added(&mut self, column: ColumnCoordinate) {
        if let Some(column) = self.columns.get_mut(&column) {
            column.set_chunk_present(true);
        }
    }

    /// The host unloaded a column. Its nodes are removed by the next `cleanup()`.
    pub fn on_chunk_removed(&mut self, column: ColumnCoordinate) {
        if let Some(node) = self.columns.get_mut(&column) {
            node.set_chunk_present(false);
            self.unload_queue.push(column);
        }
    }

    /// Removes the nodes of every column unloaded since the last sweep.
    ///
    /// Columns that were loaded again in the meantime are kept.
    ///
    /// # Returns
    /// The removed nodes, so their builds and GPU memory can be released
    pub fn cleanup(&mut self) -> Vec<ChunkNode> {
        let mut removed = Vec::new();

        for column_coord in std::mem::take(&mut self.unload_queue) {
            let Entry::Occupied(mut entry) = self.columns.entry(column_coord) else {
                continue;
            };
            if entry.get().is_chunk_present() {
                continue;
            }
            removed.extend(entry.get_mut().drain());
            entry.remove();
        }

        if !removed.is_empty() {
            debug!("Unloaded {} chunk nodes", removed.len());
        }
        removed
    }

    /// Removes every node and clears all per-frame state.
    ///
    /// # Returns
    /// The removed nodes, so their builds and GPU memory can be released
    pub fn reset(&mut self) -> Vec<ChunkNode> {
        let removed = self
            .columns
            .drain()
            .flat_map(|(_, mut column)| column.drain().collect::<Vec<_>>())
            .collect();

        self.visible_chunks.clear();
        self.drawable_chunks.clear();
        self.visible_block_entities.clear();
        self.iteration_queue.clear();
        self.unload_queue.clear();
        self.root = None;
        removed
    }

    /// Whether the last traversal reached the chunk at `coord`.
    pub fn is_chunk_visible(&self, coord: ChunkCoordinate) -> bool {
        self.node(coord).is_some_and(|node| {
            node.last_visible_frame.is_some() && node.last_visible_frame == self.last_frame
        })
    }

    pub fn total_nodes(&self) -> usize {
        self.columns.values().map(|column| column.nodes().count()).sum()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Whether the traversal may step from a chunk into `adjacent`.
fn is_visible<F: FrustumTest + ?Sized>(
    culling_state: u8,
    entered: Option<Direction>,
    mesh: &MeshInfo,
    adjacent: ChunkCoordinate,
    direction: Direction,
    frustum: &F,
) -> bool {
    if culling_state & (1 << direction.opposite() as u8) != 0 {
        return false;
    }

    if let Some(entered) = entered {
        if !mesh.is_visible_through(entered.opposite(), direction) {
            return false;
        }
    }

    frustum.is_visible(&adjacent.bounding_box())
}

/// Faces of `chunk` reachable from the block at world `(x, y, z)` through non-opaque blocks.
fn open_chunk_faces<W: WorldSource + ?Sized>(
    world: &W,
    chunk: ChunkCoordinate,
    x: i32,
    y: i32,
    z: i32,
) -> Vec<Direction> {
    let origin = chunk.origin();
    let mut builder = OcclusionDataBuilder::new();
    let mut any_closed = false;

    for ly in 0..CHUNK_SIZE {
        for lz in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                if world
                    .block_state(origin.x + lx, origin.y + ly, origin.z + lz)
                    .opaque
                {
                    builder.mark_closed(lx, ly, lz);
                    any_closed = true;
                }
            }
        }
    }

    if !any_closed {
        return Direction::ALL.to_vec();
    }

    builder.open_faces(x - origin.x, y - origin.y, z - origin.z)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cgmath::{Deg, Point3};

    use super::*;
    use crate::engine_state::{
        camera_state::frustum::NoFrustum,
        rendering::{meshing::mesh_info::MeshLayer, render_pass::BlockRenderPass, vertex::VertexFormatKind},
        voxels::{block_state::BlockState, occlusion::VisibilityData, terrain::STONE, world::World},
    };

    fn world_with_columns(radius: i32) -> World {
        let mut world = World::new();
        for x in -radius..=radius {
            for z in -radius..=radius {
                world.load_column(ColumnCoordinate::new(x, z));
            }
        }
        world
    }

    fn graph() -> ChunkGraph {
        ChunkGraph::new(2, true, false, BackendKind::Batched)
    }

    fn camera_facing_east() -> Camera {
        Camera::new(Point3::new(8.5, 72.5, 8.5), Deg(0.0), Deg(0.0))
    }

    #[test]
    fn test_traversal_stays_within_render_distance() {
        let world = world_with_columns(3);
        let mut graph = graph();
        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 1, false);

        let visible = graph.visible_chunks();
        assert_eq!(visible[0], ChunkCoordinate::new(0, 4, 0));
        assert!(visible.contains(&ChunkCoordinate::new(1, 4, 0)));
        assert!(!visible.contains(&ChunkCoordinate::new(0, 4, -3)));
        assert!(visible.iter().all(|coord| (-2..=2).contains(&coord.x) && (-2..=2).contains(&coord.z)));
    }

    #[test]
    fn test_chunks_are_visited_once_per_frame() {
        let world = world_with_columns(3);
        let mut graph = graph();
        for frame in 1..=2 {
            graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, frame, false);
            let mut visible = graph.visible_chunks().to_vec();
            let count = visible.len();
            visible.sort();
            visible.dedup();
            assert_eq!(visible.len(), count);
            assert_eq!(count, 5 * 5 * COLUMN_HEIGHT as usize);
        }
    }

    #[test]
    fn test_wall_blocks_camera_chunk_face() {
        let mut world = world_with_columns(3);
        for y in 64..80 {
            for z in 0..16 {
                world.set_block(12, y, z, STONE);
            }
        }

        let mut graph = graph();
        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 1, false);
        assert!(!graph.visible_chunks().contains(&ChunkCoordinate::new(1, 4, 0)));
        assert!(graph.visible_chunks().contains(&ChunkCoordinate::new(-1, 4, 0)));
    }

    #[test]
    fn test_spectator_inside_blocks_disables_culling() {
        let mut world = world_with_columns(3);
        world.fill_chunk(ChunkCoordinate::new(0, 4, 0), STONE);

        let mut graph = graph();
        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 1, false);
        assert_eq!(graph.visible_chunks(), &[ChunkCoordinate::new(0, 4, 0)]);

        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 2, true);
        assert!(graph.visible_chunks().contains(&ChunkCoordinate::new(1, 4, 0)));
    }

    #[test]
    fn test_occluding_mesh_stops_traversal() {
        let world = world_with_columns(4);
        let mut graph = ChunkGraph::new(3, true, false, BackendKind::Batched);
        let sealed = ChunkCoordinate::new(1, 4, 0);
        graph.get_or_create_node(&world, sealed).unwrap().set_mesh(Arc::new(MeshInfo::new(
            vec![],
            VisibilityData::none(),
            vec![],
            vec![],
            vec![],
        )));

        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 1, false);
        assert!(graph.is_chunk_visible(sealed));
        // Reaching the chunk behind it would mean turning back on some axis.
        assert!(!graph.is_chunk_visible(ChunkCoordinate::new(2, 4, 0)));
        assert!(graph.is_chunk_visible(ChunkCoordinate::new(2, 4, 1)));
    }

    #[test]
    fn test_missing_neighbor_columns_stop_expansion() {
        let world = world_with_columns(1);
        let mut graph = graph();
        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 1, false);

        assert!(graph
            .visible_chunks()
            .iter()
            .all(|coord| coord.x == 0 && coord.z == 0));
    }

    #[test]
    fn test_out_of_bounds_camera_seeds_top_layer() {
        let world = world_with_columns(3);
        let mut graph = graph();
        let camera = Camera::new(Point3::new(8.5, 300.0, 8.5), Deg(0.0), Deg(-80.0));
        graph.calculate_visible(&world, &camera, &NoFrustum, 1, false);

        assert_eq!(graph.visible_chunks()[0], ChunkCoordinate::new(0, 15, 0));
        assert!(graph.is_chunk_visible(ChunkCoordinate::new(0, 0, 0)));
    }

    #[test]
    fn test_drawable_is_subset_of_visible() {
        let world = world_with_columns(3);
        let mut graph = graph();
        let solid = Arc::new(MeshInfo::new(
            vec![MeshLayer {
                pass: BlockRenderPass::Solid,
                format: VertexFormatKind::Wide,
                data: Arc::from(vec![0u8; 128]),
                vertex_count: 4,
            }],
            VisibilityData::all(),
            vec![],
            vec![],
            vec![],
        ));
        graph
            .get_or_create_node(&world, ChunkCoordinate::new(0, 3, 0))
            .unwrap()
            .set_mesh(solid);

        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 1, false);
        assert_eq!(graph.drawable_chunks(), &[ChunkCoordinate::new(0, 3, 0)]);
        assert!(graph
            .drawable_chunks()
            .iter()
            .all(|coord| graph.visible_chunks().contains(coord)));
    }

    #[test]
    fn test_unloaded_column_is_swept() {
        let world = world_with_columns(3);
        let mut graph = graph();
        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 1, false);
        let column = ColumnCoordinate::new(1, 0);
        let before = graph.total_nodes();

        graph.on_chunk_removed(column);
        assert!(graph.get_or_create_node(&world, column.chunk(4)).is_none());
        let removed = graph.cleanup();

        assert_eq!(removed.len(), COLUMN_HEIGHT as usize);
        assert_eq!(graph.total_nodes(), before - COLUMN_HEIGHT as usize);
        assert!(graph.node(column.chunk(4)).is_none());
        assert!(graph.cleanup().is_empty());
    }

    #[test]
    fn test_reset_removes_everything() {
        let world = world_with_columns(3);
        let mut graph = graph();
        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 1, false);
        let total = graph.total_nodes();

        assert_eq!(graph.reset().len(), total);
        assert_eq!(graph.total_nodes(), 0);
        assert!(graph.visible_chunks().is_empty());
        assert!(!graph.is_chunk_visible(ChunkCoordinate::new(0, 4, 0)));
    }

    #[test]
    fn test_fog_culling_stops_expansion_past_render_distance() {
        let world = world_with_columns(7);
        let camera = camera_facing_east();
        let mut clear = ChunkGraph::new(6, true, false, BackendKind::Batched);
        let mut foggy = ChunkGraph::new(6, true, true, BackendKind::Batched);
        clear.calculate_visible(&world, &camera, &NoFrustum, 1, false);
        foggy.calculate_visible(&world, &camera, &NoFrustum, 1, false);

        assert!(foggy.visible_chunks().len() < clear.visible_chunks().len());
        let corner = ChunkCoordinate::new(6, 10, 6);
        assert!(clear.is_chunk_visible(corner));
        assert!(!foggy.is_chunk_visible(corner));
        assert!(foggy.is_chunk_visible(ChunkCoordinate::new(1, 4, 0)));

        // Chunks past the fog limit are still listed, they just go no further.
        let limit = (6 * CHUNK_SIZE + CHUNK_SIZE) as f32;
        assert!(foggy.visible_chunks().iter().any(|coord| {
            let origin = coord.origin();
            let dx = origin.x as f32 + 0.5 - camera.position.x;
            let dy = origin.y as f32 + 0.5 - camera.position.y;
            let dz = origin.z as f32 + 0.5 - camera.position.z;
            dx * dx + dy * dy + dz * dz >= limit * limit
        }));
    }

    fn world_with_west_tunnel() -> World {
        let mut world = world_with_columns(3);
        world.fill_chunk(ChunkCoordinate::new(0, 4, 0), STONE);
        for x in 0..=8 {
            world.set_block(x, 72, 8, BlockState::AIR);
        }
        world
    }

    #[test]
    fn test_single_open_face_behind_camera_is_dropped() {
        let world = world_with_west_tunnel();
        let mut graph = graph();

        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 1, false);
        assert_eq!(graph.visible_chunks(), &[ChunkCoordinate::new(0, 4, 0)]);

        let facing_west = Camera::new(Point3::new(8.5, 72.5, 8.5), Deg(180.0), Deg(0.0));
        graph.calculate_visible(&world, &facing_west, &NoFrustum, 2, false);
        assert!(graph.is_chunk_visible(ChunkCoordinate::new(-1, 4, 0)));
        assert!(graph.visible_chunks().len() > 1);
    }

    #[test]
    fn test_disabled_culling_ignores_camera_chunk_faces() {
        let world = world_with_west_tunnel();
        let mut graph = ChunkGraph::new(2, false, false, BackendKind::Batched);
        graph.calculate_visible(&world, &camera_facing_east(), &NoFrustum, 1, false);

        assert_eq!(graph.visible_chunks().len(), 5 * 5 * COLUMN_HEIGHT as usize);
        assert!(graph.is_chunk_visible(ChunkCoordinate::new(1, 4, 0)));
    }
}
