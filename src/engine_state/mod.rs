//! # Engine State Module
//!
//! The chunk renderer and every subsystem it coordinates.
//!
//! ## Key Components
//!
//! * `ChunkRenderer` - the long-lived context object a host drives once per frame
//! * `buffer_state` - the seam to the graphics API, plus wgpu and host-memory devices
//! * `camera_state` - camera, projection and frustum tests
//! * `chunk_graph` - chunk nodes and the visibility traversal
//! * `rendering` - meshing, build scheduling, region allocation and draw lists
//! * `task_management` - the worker pool chunk builds run on
//! * `voxels` - world access, snapshots and occlusion data
//!
//! ## Frame Flow
//!
//! 1. `update_graph` re-runs the traversal when the camera moved or a mesh changed
//! 2. `update_chunks` sweeps unloaded columns, applies finished builds and schedules new ones
//! 3. The host asks `render_pass` for the draw batches of each pass
//!
//! ## Performance Considerations
//!
//! * The traversal only runs when something it depends on changed
//! * Ambient rebuilds are capped per frame; important ones are not
//! * Only the main thread touches the graph, the backend and the buffer device

use std::{collections::HashSet, sync::Arc};

use cgmath::{EuclideanSpace, MetricSpace, Point3, Vector3};
use log::{debug, info, trace};

use crate::{
    config::{GpuCapabilities, RendererConfig},
    engine_state::{
        buffer_state::BufferDevice,
        camera_state::{
            camera::Camera,
            frustum::{Aabb, FrustumTest},
        },
        chunk_graph::{node::ChunkNode, ChunkGraph},
        rendering::{
            backend::{BackendKind, ChunkRenderBackend, DrawBatch},
            builder::{ChunkBuildResult, ChunkBuilder},
            meshing::mesh_info::MeshInfo,
            render_pass::BlockRenderPass,
            vertex::QuadEncoderRegistry,
        },
        voxels::{
            block_state::{BlockEntity, SpriteId},
            coord::{ChunkCoordinate, ColumnCoordinate, CHUNK_SHIFT, COLUMN_HEIGHT},
            world::WorldSource,
        },
    },
    error::Result,
};

pub mod buffer_state;
pub mod camera_state;
pub mod chunk_graph;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// Drives visibility, mesh builds and GPU uploads for one world.
///
/// Owns the world source `W` and buffer device `D`; every other component gets
/// references from here.
///
/// # Examples
///
/// ```
/// use cgmath::{Deg, Point3};
/// use voxel_chunk_graph::config::{GpuCapabilities, RendererConfig};
/// use voxel_chunk_graph::engine_state::{
///     buffer_state::HostBufferState,
///     camera_state::{camera::Camera, frustum::NoFrustum},
///     rendering::{render_pass::BlockRenderPass, vertex::QuadEncoderRegistry},
///     voxels::world::World,
///     ChunkRenderer,
/// };
///
/// let encoders = QuadEncoderRegistry::with_defaults().unwrap();
/// let mut renderer = ChunkRenderer::new(
///     World::new(),
///     HostBufferState::new(),
///     RendererConfig::default(),
///     GpuCapabilities::all(),
///     &encoders,
/// )
/// .unwrap();
///
/// let camera = Camera::new(Point3::new(8.0, 72.0, 8.0), Deg(0.0), Deg(0.0));
/// renderer.update(&camera, &NoFrustum, 1, false);
/// let batches = renderer.render_pass(BlockRenderPass::Solid);
/// assert!(batches.is_empty());
/// ```
pub struct ChunkRenderer<W: WorldSource, D: BufferDevice> {
    world: W,
    device: D,
    config: RendererConfig,
    capabilities: GpuCapabilities,
    graph: ChunkGraph,
    backend: ChunkRenderBackend,
    builder: ChunkBuilder,
    global_block_entities: HashSet<BlockEntity>,
    last_camera: Option<Camera>,
    last_sort_position: Option<Point3<f32>>,
    dirty: bool,
}

impl<W: WorldSource, D: BufferDevice> ChunkRenderer<W, D> {
    /// Creates a renderer and starts its build workers.
    ///
    /// # Arguments
    /// * `world` - Source of block, light and biome data
    /// * `device` - Buffer device chunk meshes are uploaded into
    /// * `config` - Renderer settings
    /// * `capabilities` - What the GPU reported
    /// * `encoders` - Registry holding the encoder of `config.vertex_format`
    ///
    /// # Errors
    /// Returns a configuration error when `config` is invalid, asks for a feature
    /// the GPU lacks, or names a vertex format with no registered encoder.
    pub fn new(
        world: W,
        device: D,
        config: RendererConfig,
        capabilities: GpuCapabilities,
        encoders: &QuadEncoderRegistry,
    ) -> Result<Self> {
        config.validate()?;
        capabilities.check(&config)?;

        let encoder = encoders.get(config.vertex_format)?;
        let backend = ChunkRenderBackend::select(&config, &capabilities, encoder.format().stride)?;
        let graph = Self::create_graph(&config, &capabilities, backend.kind());
        let builder = ChunkBuilder::new(config.worker_count(), encoder);

        info!(
            "Chunk renderer ready: render distance {}, {} build workers",
            config.render_distance,
            config.worker_count()
        );

        Ok(Self {
            world,
            device,
            config,
            capabilities,
            graph,
            backend,
            builder,
            global_block_entities: HashSet::new(),
            last_camera: None,
            last_sort_position: None,
            dirty: true,
        })
    }

    fn create_graph(
        config: &RendererConfig,
        capabilities: &GpuCapabilities,
        backend_kind: BackendKind,
    ) -> ChunkGraph {
        ChunkGraph::new(
            config.render_distance,
            config.use_chunk_culling,
            config.fog_culling_enabled(capabilities),
            backend_kind,
        )
    }

    /// Runs one frame of chunk work.
    ///
    /// # Arguments
    /// * `camera` - Current camera
    /// * `frustum` - Test applied to chunk bounds while culling
    /// * `frame` - Frame counter; must increase between calls
    /// * `spectator` - Whether the camera may sit inside solid blocks
    pub fn update<F: FrustumTest + ?Sized>(
        &mut self,
        camera: &Camera,
        frustum: &F,
        frame: u32,
        spectator: bool,
    ) {
        if self.dirty || self.last_camera.as_ref() != Some(camera) {
            self.update_graph(camera, frustum, frame, spectator);
        }
        self.update_chunks(camera);
    }

    /// Re-runs the visibility traversal.
    pub fn update_graph<F: FrustumTest + ?Sized>(
        &mut self,
        camera: &Camera,
        frustum: &F,
        frame: u32,
        spectator: bool,
    ) {
        self.graph
            .calculate_visible(&self.world, camera, frustum, frame, spectator);
        self.last_camera = Some(*camera);
        self.dirty = false;
    }

    /// Sweeps unloaded columns, applies finished builds and schedules new ones.
    pub fn update_chunks(&mut self, camera: &Camera) {
        self.sweep_unloaded();

        self.builder.process();
        for result in self.builder.take_uploads() {
            self.apply_build_result(result);
        }

        self.schedule_rebuilds(camera.position.to_vec());
        self.schedule_translucency_sort(camera.position);
    }

    fn sweep_unloaded(&mut self) {
        let removed = self.graph.cleanup();
        if removed.is_empty() {
            return;
        }

        let count = removed.len();
        for mut node in removed {
            self.release_node(&mut node);
        }
        let regions = self.backend.cleanup(&mut self.device);
        debug!("Released {} unloaded chunks and {} regions", count, regions);
        self.dirty = true;
    }

    fn release_node(&mut self, node: &mut ChunkNode) {
        node.cancel_rebuild();
        self.backend
            .clear(&mut self.device, node.coord(), &mut node.render_state);
        for entity in node.mesh().global_block_entities() {
            self.global_block_entities.remove(entity);
        }
    }

    fn apply_build_result(&mut self, result: ChunkBuildResult) {
        let ChunkBuildResult { ticket, mesh } = result;

        let Some(node) = self.graph.node_mut(ticket.coord) else {
            trace!("Discarding build of removed chunk {:?}", ticket.coord);
            return;
        };
        if !node.is_pending(ticket.generation) {
            trace!(
                "Discarding superseded build {} of chunk {:?}",
                ticket.generation,
                ticket.coord
            );
            return;
        }
        node.pending = None;

        let Some(mesh) = mesh else {
            return;
        };

        self.backend
            .upload(&mut self.device, ticket.coord, &mut node.render_state, &mesh);
        let old = node.set_mesh(Arc::new(mesh));

        for entity in old.global_block_entities() {
            self.global_block_entities.remove(entity);
        }
        self.global_block_entities
            .extend(node.mesh().global_block_entities().iter().copied());
        self.dirty = true;
    }

    fn schedule_rebuilds(&mut self, camera: Vector3<f32>) {
        let mut ambient = Vec::new();

        for coord in self.graph.visible_chunks().to_vec() {
            let Some(node) = self.graph.node(coord) else {
                continue;
            };
            if node.needs_important_rebuild() {
                self.schedule_build(coord, camera, true);
            } else if node.needs_rebuild() {
                ambient.push(coord);
            }
        }

        for coord in ambient.into_iter().take(self.config.max_builds_per_frame) {
            self.schedule_build(coord, camera, false);
        }
    }

    fn schedule_build(&mut self, coord: ChunkCoordinate, camera: Vector3<f32>, important: bool) {
        let kind = self.builder.create_rebuild(&self.world, coord, camera);
        if let Some(node) = self.graph.node_mut(coord) {
            self.builder.schedule(&mut node.pending, coord, kind, important);
            node.finish_scheduling();
        }
    }

    fn schedule_translucency_sort(&mut self, position: Point3<f32>) {
        let Some(last) = self.last_sort_position else {
            self.last_sort_position = Some(position);
            return;
        };
        if last.distance(position) < self.config.translucency_resort_distance {
            return;
        }
        self.last_sort_position = Some(position);

        for coord in self.graph.drawable_chunks().to_vec() {
            let Some(node) = self.graph.node_mut(coord) else {
                continue;
            };
            if node.pending.is_some() || !node.mesh().has_translucent_layer() {
                continue;
            }
            let kind = self
                .builder
                .create_sort(coord, node.mesh().clone(), position.to_vec());
            self.builder.schedule(&mut node.pending, coord, kind, false);
        }
    }

    /// Draw batches of `pass` for every drawable chunk.
    ///
    /// Opaque passes come front to back, the translucent pass back to front.
    pub fn render_pass(&self, pass: BlockRenderPass) -> Vec<DrawBatch> {
        let mut builder = self.backend.begin_pass(pass);
        let drawable = self.graph.drawable_chunks();

        let order: Box<dyn Iterator<Item = &ChunkCoordinate>> = if pass.is_translucent() {
            Box::new(drawable.iter().rev())
        } else {
            Box::new(drawable.iter())
        };

        for coord in order {
            if let Some(node) = self.graph.node(*coord) {
                self.backend
                    .render_chunk(&mut builder, *coord, &node.render_state);
            }
        }

        self.backend.end_pass(builder)
    }

    /// The host loaded the column at `(x, z)`.
    ///
    /// Chunks that survived from an earlier load are rebuilt, since their
    /// neighbourhood may have changed while the column was gone.
    pub fn on_chunk_added(&mut self, x: i32, z: i32) {
        let column = ColumnCoordinate::new(x, z);
        self.graph.on_chunk_added(column);
        for y in 0..COLUMN_HEIGHT {
            if let Some(node) = self.graph.node_mut(column.chunk(y)) {
                node.schedule_rebuild(false);
            }
        }
        self.dirty = true;
    }

    /// The host unloaded the column at `(x, z)`. Its chunks are released next frame.
    pub fn on_chunk_removed(&mut self, x: i32, z: i32) {
        self.graph.on_chunk_removed(ColumnCoordinate::new(x, z));
        self.dirty = true;
    }

    /// Requests rebuilds of every chunk overlapping a block-space box.
    ///
    /// # Arguments
    /// * `min` - Inclusive minimum block position
    /// * `max` - Inclusive maximum block position
    /// * `important` - Build ahead of ambient work, e.g. for edits near the camera
    pub fn schedule_rebuild_for_area(&mut self, min: Point3<i32>, max: Point3<i32>, important: bool) {
        for x in (min.x >> CHUNK_SHIFT)..=(max.x >> CHUNK_SHIFT) {
            for z in (min.z >> CHUNK_SHIFT)..=(max.z >> CHUNK_SHIFT) {
                for y in (min.y >> CHUNK_SHIFT)..=(max.y >> CHUNK_SHIFT) {
                    self.schedule_rebuild_for_chunk(ChunkCoordinate::new(x, y, z), important);
                }
            }
        }
    }

    /// Requests rebuilds after the block at `(x, y, z)` changed, including
    /// neighbouring chunks whose faces it touches.
    pub fn schedule_rebuild_for_block(&mut self, x: i32, y: i32, z: i32, important: bool) {
        self.schedule_rebuild_for_area(
            Point3::new(x - 1, y - 1, z - 1),
            Point3::new(x + 1, y + 1, z + 1),
            important,
        );
    }

    /// Requests a rebuild of one chunk. Chunks without a node are built when
    /// the traversal first reaches them anyway.
    pub fn schedule_rebuild_for_chunk(&mut self, coord: ChunkCoordinate, important: bool) {
        if let Some(node) = self.graph.node_mut(coord) {
            node.schedule_rebuild(important);
        }
    }

    /// Whether the last traversal reached the chunk at `(x, y, z)`.
    pub fn is_chunk_visible(&self, x: i32, y: i32, z: i32) -> bool {
        self.graph.is_chunk_visible(ChunkCoordinate::new(x, y, z))
    }

    /// Whether an entity with `bounds` touches any visible chunk.
    ///
    /// Always true when entity culling is disabled.
    pub fn is_entity_visible(&self, bounds: &Aabb) -> bool {
        if !self.config.use_entity_culling {
            return true;
        }

        let min_x = (bounds.min.x - 0.5).floor() as i32 >> CHUNK_SHIFT;
        let min_y = (bounds.min.y - 0.5).floor() as i32 >> CHUNK_SHIFT;
        let min_z = (bounds.min.z - 0.5).floor() as i32 >> CHUNK_SHIFT;
        let max_x = (bounds.max.x + 0.5).floor() as i32 >> CHUNK_SHIFT;
        let max_y = (bounds.max.y + 0.5).floor() as i32 >> CHUNK_SHIFT;
        let max_z = (bounds.max.z + 0.5).floor() as i32 >> CHUNK_SHIFT;

        for x in min_x..=max_x {
            for z in min_z..=max_z {
                for y in min_y..=max_y {
                    if self.graph.is_chunk_visible(ChunkCoordinate::new(x, y, z)) {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Block-entities of every visible chunk.
    pub fn visible_block_entities(&self) -> &[BlockEntity] {
        self.graph.visible_block_entities()
    }

    /// Block-entities that render regardless of chunk visibility.
    pub fn global_block_entities(&self) -> impl Iterator<Item = &BlockEntity> {
        self.global_block_entities.iter()
    }

    /// Animated sprites the host should tick this frame.
    ///
    /// # Returns
    /// The sprites used by drawable chunks, or `None` when every animation
    /// should be ticked
    pub fn visible_animated_sprites(&self) -> Option<Vec<SpriteId>> {
        if !self.config.animate_only_visible_textures {
            return None;
        }

        let mut sprites: Vec<SpriteId> = self
            .graph
            .drawable_chunks()
            .iter()
            .filter_map(|coord| self.graph.node(*coord))
            .flat_map(|node| node.mesh().animated_sprites().iter().copied())
            .collect();
        sprites.sort_unstable();
        sprites.dedup();
        Some(sprites)
    }

    /// Overlay line with the visible and total chunk counts.
    pub fn debug_string(&self) -> String {
        format!(
            "C: {}/{}",
            self.graph.visible_chunks().len(),
            self.graph.total_nodes()
        )
    }

    /// Number of chunks the last traversal reached.
    pub fn completed_chunk_count(&self) -> usize {
        self.graph.visible_chunks().len()
    }

    /// Whether every visible chunk is built and uploaded, and the traversal has
    /// seen the results.
    pub fn is_build_complete(&self) -> bool {
        !self.dirty
            && self.builder.is_idle()
            && self.graph.visible_chunks().iter().all(|coord| {
                self.graph
                    .node(*coord)
                    .map_or(true, |node| !node.needs_rebuild() && node.pending.is_none())
            })
    }

    /// Changes the render distance, reloading when it differs.
    ///
    /// # Errors
    /// Returns `Error::Config` for a distance out of range; the renderer is unchanged.
    pub fn set_render_distance(&mut self, render_distance: u32) -> Result<()> {
        if render_distance == self.config.render_distance {
            return Ok(());
        }

        let config = RendererConfig {
            render_distance,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        self.reload()
    }

    /// Drops every chunk and starts over with fresh workers and storage.
    ///
    /// Chunk nodes are recreated lazily from the world's loaded columns as the
    /// traversal reaches them.
    pub fn reload(&mut self) -> Result<()> {
        self.release_all();

        let encoder = self.builder.encoder().clone();
        self.backend =
            ChunkRenderBackend::select(&self.config, &self.capabilities, encoder.format().stride)?;
        self.graph = Self::create_graph(&self.config, &self.capabilities, self.backend.kind());
        self.builder = ChunkBuilder::new(self.config.worker_count(), encoder);
        self.last_camera = None;
        self.last_sort_position = None;
        self.dirty = true;

        info!(
            "Reloaded chunk renderer with render distance {}",
            self.config.render_distance
        );
        Ok(())
    }

    /// Stops the workers and releases all GPU memory. Call `reload` before
    /// using the renderer again.
    pub fn destroy(&mut self) {
        self.release_all();
        info!("Chunk renderer destroyed");
    }

    fn release_all(&mut self) {
        self.builder.shutdown();
        for mut node in self.graph.reset() {
            self.release_node(&mut node);
        }
        self.backend.delete(&mut self.device);
        self.global_block_entities.clear();
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Mutable world access. Report edits through `schedule_rebuild_for_block`
    /// or `schedule_rebuild_for_area`.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn graph(&self) -> &ChunkGraph {
        &self.graph
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn region_count(&self) -> usize {
        self.backend.region_count()
    }

    /// Mesh of the chunk at `coord`, if it has a node.
    pub fn chunk_mesh(&self, coord: ChunkCoordinate) -> Option<&Arc<MeshInfo>> {
        self.graph.node(coord).map(ChunkNode::mesh)
    }
}

impl<W: WorldSource, D: BufferDevice> Drop for ChunkRenderer<W, D> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use cgmath::Deg;

    use super::*;
    use crate::engine_state::{
        buffer_state::HostBufferState,
        camera_state::frustum::NoFrustum,
        voxels::{
            terrain::{BEACON, STONE, WATER},
            world::World,
        },
    };

    const CAMERA_CHUNK: ChunkCoordinate = ChunkCoordinate::new(0, 4, 0);

    struct Harness {
        renderer: ChunkRenderer<World, HostBufferState>,
        camera: Camera,
        frame: u32,
    }

    impl Harness {
        fn new(config: RendererConfig) -> Self {
            let mut world = World::new();
            for x in -3..=3 {
                for z in -3..=3 {
                    world.load_column(ColumnCoordinate::new(x, z));
                }
            }
            world.set_block(2, 66, 2, STONE);

            let encoders = QuadEncoderRegistry::with_defaults().unwrap();
            let renderer = ChunkRenderer::new(
                world,
                HostBufferState::new(),
                config,
                GpuCapabilities::all(),
                &encoders,
            )
            .unwrap();

            Self {
                renderer,
                camera: Camera::new(Point3::new(8.5, 72.5, 8.5), Deg(0.0), Deg(0.0)),
                frame: 0,
            }
        }

        fn step(&mut self) {
            self.frame += 1;
            self.renderer
                .update(&self.camera, &NoFrustum, self.frame, false);
        }

        fn run_until_complete(&mut self) {
            let deadline = Instant::now() + Duration::from_secs(20);
            self.step();
            while !self.renderer.is_build_complete() {
                assert!(Instant::now() < deadline, "chunk builds did not finish");
                thread::sleep(Duration::from_millis(1));
                self.step();
            }
        }

        fn solid_vertices(&self, coord: ChunkCoordinate) -> u32 {
            self.renderer
                .chunk_mesh(coord)
                .and_then(|mesh| mesh.layer(BlockRenderPass::Solid))
                .map_or(0, |layer| layer.vertex_count)
        }
    }

    fn test_config() -> RendererConfig {
        RendererConfig {
            render_distance: 2,
            builder_threads: Some(2),
            max_builds_per_frame: 1024,
            ..Default::default()
        }
    }

    #[test]
    fn test_builds_complete_and_produce_draws() {
        let mut harness = Harness::new(test_config());
        harness.run_until_complete();

        assert_eq!(harness.solid_vertices(CAMERA_CHUNK), 24);
        assert_eq!(harness.renderer.graph().drawable_chunks(), &[CAMERA_CHUNK]);

        let batches = harness.renderer.render_pass(BlockRenderPass::Solid);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].draws.len(), 1);
        assert_eq!(batches[0].draws[0].vertex_count, 24);
        assert_eq!(batches[0].draws[0].translation, Vector3::new(0.0, 64.0, 0.0));
        assert!(harness.renderer.render_pass(BlockRenderPass::Translucent).is_empty());
        assert_eq!(harness.renderer.debug_string(), "C: 400/400");
    }

    #[test]
    fn test_superseded_build_is_never_applied() {
        let mut harness = Harness::new(test_config());
        harness.run_until_complete();

        harness.renderer.world_mut().set_block(6, 66, 6, STONE);
        harness.renderer.schedule_rebuild_for_block(6, 66, 6, true);
        harness.step();
        let first = harness
            .renderer
            .graph()
            .node(CAMERA_CHUNK)
            .and_then(|node| node.pending.clone())
            .unwrap();

        harness.renderer.world_mut().set_block(10, 66, 10, STONE);
        harness.renderer.schedule_rebuild_for_block(10, 66, 10, true);
        harness.step();
        let second = harness
            .renderer
            .graph()
            .node(CAMERA_CHUNK)
            .and_then(|node| node.pending.clone())
            .unwrap();
        assert!(second.generation > first.generation);

        harness.run_until_complete();
        assert_eq!(harness.solid_vertices(CAMERA_CHUNK), 72);
    }

    #[test]
    fn test_removed_column_frees_region_storage() {
        let mut harness = Harness::new(test_config());
        harness.run_until_complete();
        assert_eq!(harness.renderer.region_count(), 1);
        assert!(harness.renderer.device().buffer_count() > 0);

        harness
            .renderer
            .world_mut()
            .unload_column(ColumnCoordinate::new(0, 0));
        harness.renderer.on_chunk_removed(0, 0);
        harness.step();

        assert!(harness.renderer.graph().node(CAMERA_CHUNK).is_none());
        assert_eq!(harness.renderer.region_count(), 0);
        assert_eq!(harness.renderer.device().buffer_count(), 0);
    }

    #[test]
    fn test_per_chunk_backend_without_large_buffers() {
        let config = RendererConfig {
            use_large_buffers: false,
            ..test_config()
        };
        let mut harness = Harness::new(config);
        assert_eq!(harness.renderer.backend_kind(), BackendKind::PerChunk);
        harness.run_until_complete();

        let batches = harness.renderer.render_pass(BlockRenderPass::Solid);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].draws[0].first_vertex, 0);
        assert_eq!(harness.renderer.device().buffer_count(), 1);
    }

    #[test]
    fn test_entity_visibility_follows_chunks() {
        let mut harness = Harness::new(test_config());
        harness.step();

        let near = Aabb::new(Point3::new(4.0, 70.0, 4.0), Point3::new(5.0, 72.0, 5.0));
        let far = Aabb::new(Point3::new(200.0, 70.0, 4.0), Point3::new(201.0, 72.0, 5.0));
        assert!(harness.renderer.is_entity_visible(&near));
        assert!(!harness.renderer.is_entity_visible(&far));
        assert!(harness.renderer.is_chunk_visible(0, 4, 0));

        let mut unculled = Harness::new(RendererConfig {
            use_entity_culling: false,
            ..test_config()
        });
        unculled.step();
        assert!(unculled.renderer.is_entity_visible(&far));
    }

    #[test]
    fn test_global_block_entities_follow_mesh_swaps() {
        let mut harness = Harness::new(test_config());
        harness.renderer.world_mut().set_block(3, 70, 3, BEACON);
        harness.run_until_complete();
        assert_eq!(harness.renderer.global_block_entities().count(), 1);
        assert!(harness.renderer.visible_block_entities().is_empty());

        harness.renderer.world_mut().set_block(3, 70, 3, Default::default());
        harness.renderer.schedule_rebuild_for_block(3, 70, 3, true);
        harness.run_until_complete();
        assert_eq!(harness.renderer.global_block_entities().count(), 0);
    }

    #[test]
    fn test_camera_movement_resorts_translucent_chunks() {
        let mut harness = Harness::new(test_config());
        harness.renderer.world_mut().set_block(4, 66, 4, WATER);
        harness.renderer.world_mut().set_block(4, 66, 6, WATER);
        harness.run_until_complete();
        assert!(harness
            .renderer
            .chunk_mesh(CAMERA_CHUNK)
            .is_some_and(|mesh| mesh.has_translucent_layer()));
        assert!(harness.renderer.visible_animated_sprites().is_some_and(|sprites| sprites == [WATER.sprite]));

        harness.camera.translate(Vector3::new(0.0, 0.0, 4.0));
        harness.step();
        let pending = harness
            .renderer
            .graph()
            .node(CAMERA_CHUNK)
            .and_then(|node| node.pending.clone())
            .unwrap();
        assert!(pending.is_sort);

        harness.run_until_complete();
        assert!(harness
            .renderer
            .chunk_mesh(CAMERA_CHUNK)
            .is_some_and(|mesh| mesh.has_translucent_layer()));
    }

    #[test]
    fn test_render_distance_change_reloads() {
        let mut harness = Harness::new(test_config());
        harness.run_until_complete();

        harness.renderer.set_render_distance(3).unwrap();
        assert_eq!(harness.renderer.graph().total_nodes(), 0);
        assert_eq!(harness.renderer.device().buffer_count(), 0);
        assert!(harness.renderer.set_render_distance(64).is_err());

        harness.run_until_complete();
        assert_eq!(harness.solid_vertices(CAMERA_CHUNK), 24);
    }
}
