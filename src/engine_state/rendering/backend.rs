//! # Chunk Render Backends
//!
//! How uploaded chunk meshes are stored on the GPU and turned into draw lists.
//!
//! ## Key Components
//!
//! * `ChunkRenderBackend` - the closed set of storage strategies, picked once at startup
//! * `ChunkRenderState` - the per-chunk allocation a backend hands out
//! * `PassBuilder` - collects the draws of one render pass between `begin_pass` and `end_pass`
//! * `DrawBatch` - draws sharing a vertex buffer, ready for the host to issue
//!
//! ## Strategies
//!
//! * `Batched` packs every chunk of a region into one shared buffer, so a region's
//!   chunks draw from a single binding
//! * `PerChunk` gives each layer of each chunk its own buffer, for GPUs without large
//!   buffer support
//!
//! The backend never issues draw calls. It only reports which byte ranges to draw
//! and with which chunk translation.

use cgmath::Vector3;
use log::{debug, info};

use super::{
    meshing::mesh_info::MeshInfo,
    region::{ChunkRegionManager, LayerAllocation},
    render_pass::BlockRenderPass,
};
use crate::{
    config::{GpuCapabilities, RendererConfig},
    engine_state::{
        buffer_state::{BufferDevice, BufferHandle},
        voxels::coord::{ChunkCoordinate, CHUNK_SIZE},
    },
    error::Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Batched,
    PerChunk,
}

impl BackendKind {
    /// Fresh, unallocated state for a new chunk node.
    pub fn create_render_state(self) -> ChunkRenderState {
        match self {
            BackendKind::Batched => ChunkRenderState::Batched { allocated: false },
            BackendKind::PerChunk => ChunkRenderState::PerChunk { layers: Vec::new() },
        }
    }
}

/// A layer stored in a buffer of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnedLayer {
    pub pass: BlockRenderPass,
    pub buffer: BufferHandle,
    pub vertex_count: u32,
}

/// Per-chunk GPU allocation, owned by the chunk node.
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkRenderState {
    /// Lives in the region buffer covering the chunk, when `allocated`
    Batched { allocated: bool },
    /// One buffer per non-empty layer
    PerChunk { layers: Vec<OwnedLayer> },
}

impl ChunkRenderState {
    pub fn is_allocated(&self) -> bool {
        match self {
            ChunkRenderState::Batched { allocated } => *allocated,
            ChunkRenderState::PerChunk { layers } => !layers.is_empty(),
        }
    }
}

/// One draw of consecutive vertices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCommand {
    pub first_vertex: u32,
    pub vertex_count: u32,
    /// World-space origin of the chunk, added to its chunk-local vertex positions
    pub translation: Vector3<f32>,
}

/// Draws that share one vertex buffer binding.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawBatch {
    pub buffer: BufferHandle,
    pub draws: Vec<DrawCommand>,
}

/// Draw list of one render pass under construction.
pub struct PassBuilder {
    pass: BlockRenderPass,
    batches: Vec<DrawBatch>,
}

impl PassBuilder {
    pub fn pass(&self) -> BlockRenderPass {
        self.pass
    }

    fn push(&mut self, buffer: BufferHandle, draw: DrawCommand) {
        match self.batches.last_mut() {
            Some(batch) if batch.buffer == buffer => batch.draws.push(draw),
            _ => self.batches.push(DrawBatch {
                buffer,
                draws: vec![draw],
            }),
        }
    }
}

/// Storage strategy for chunk meshes.
pub enum ChunkRenderBackend {
    Batched { regions: ChunkRegionManager },
    PerChunk { stride: u32 },
}

impl ChunkRenderBackend {
    /// Picks the backend for this GPU and configuration.
    ///
    /// # Arguments
    /// * `config` - Renderer settings; `use_large_buffers` and `region_size` apply here
    /// * `capabilities` - What the GPU reported
    /// * `stride` - Vertex stride of the configured vertex format
    ///
    /// # Errors
    /// Returns `Error::Config` if the region size is not made of powers of two.
    pub fn select(
        config: &RendererConfig,
        capabilities: &GpuCapabilities,
        stride: u32,
    ) -> Result<Self> {
        let backend = if config.use_large_buffers && capabilities.large_buffers {
            ChunkRenderBackend::Batched {
                regions: ChunkRegionManager::new(config.region_size, stride)?,
            }
        } else {
            ChunkRenderBackend::PerChunk { stride }
        };

        info!(
            "Selected {:?} chunk render backend with {:?} vertices",
            backend.kind(),
            config.vertex_format
        );
        Ok(backend)
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            ChunkRenderBackend::Batched { .. } => BackendKind::Batched,
            ChunkRenderBackend::PerChunk { .. } => BackendKind::PerChunk,
        }
    }

    pub fn stride(&self) -> u32 {
        match self {
            ChunkRenderBackend::Batched { regions } => regions.stride(),
            ChunkRenderBackend::PerChunk { stride } => *stride,
        }
    }

    /// Fresh, unallocated state for a new chunk node.
    pub fn create_render_state(&self) -> ChunkRenderState {
        self.kind().create_render_state()
    }

    /// Replaces whatever `state` holds with the layers of `mesh`.
    pub fn upload(
        &mut self,
        device: &mut dyn BufferDevice,
        coord: ChunkCoordinate,
        state: &mut ChunkRenderState,
        mesh: &MeshInfo,
    ) {
        self.clear(device, coord, state);

        match (self, state) {
            (ChunkRenderBackend::Batched { regions }, ChunkRenderState::Batched { allocated }) => {
                if mesh.is_empty() {
                    return;
                }
                if regions.get_region(coord).is_none() {
                    debug!("Creating region for chunk {:?}", regions.get_index(coord));
                }
                *allocated = regions
                    .create_region(coord)
                    .allocate(device, coord, mesh)
                    .is_some();
            }
            (ChunkRenderBackend::PerChunk { .. }, ChunkRenderState::PerChunk { layers }) => {
                for layer in mesh.layers() {
                    let buffer = device.create_buffer("Chunk Layer Buffer", layer.data.len() as u64);
                    device.write_buffer(buffer, 0, &layer.data);
                    layers.push(OwnedLayer {
                        pass: layer.pass,
                        buffer,
                        vertex_count: layer.vertex_count,
                    });
                }
            }
            (backend, state) => panic!(
                "Render state {:?} does not belong to the {:?} backend",
                state,
                backend.kind()
            ),
        }
    }

    /// Releases the GPU memory held by `state`.
    pub fn clear(
        &mut self,
        device: &mut dyn BufferDevice,
        coord: ChunkCoordinate,
        state: &mut ChunkRenderState,
    ) {
        match (self, state) {
            (ChunkRenderBackend::Batched { regions }, ChunkRenderState::Batched { allocated }) => {
                if *allocated {
                    if let Some(region) = regions.get_region_mut(coord) {
                        region.free(coord);
                    }
                    *allocated = false;
                }
            }
            (_, ChunkRenderState::PerChunk { layers }) => {
                for layer in layers.drain(..) {
                    device.destroy_buffer(layer.buffer);
                }
            }
            (ChunkRenderBackend::PerChunk { .. }, ChunkRenderState::Batched { allocated }) => {
                *allocated = false;
            }
        }
    }

    pub fn begin_pass(&self, pass: BlockRenderPass) -> PassBuilder {
        PassBuilder {
            pass,
            batches: Vec::new(),
        }
    }

    /// Appends the draw of one chunk's layer for the builder's pass, if it has one.
    ///
    /// Consecutive chunks that share a buffer end up in the same batch, so callers
    /// should submit chunks in the order they want them drawn.
    pub fn render_chunk(
        &self,
        builder: &mut PassBuilder,
        coord: ChunkCoordinate,
        state: &ChunkRenderState,
    ) {
        match (self, state) {
            (ChunkRenderBackend::Batched { regions }, ChunkRenderState::Batched { allocated: true }) => {
                let Some(region) = regions.get_region(coord) else {
                    return;
                };
                let (Some(buffer), Some(slot)) = (region.buffer(), region.slot(coord)) else {
                    return;
                };
                let Some(layer) = slot.layer(builder.pass) else {
                    return;
                };
                let origin = region.origin();
                let offset = regions.get_render_offset(coord);
                let translation = Vector3::new(
                    (origin.x * CHUNK_SIZE + offset.x) as f32,
                    (origin.y * CHUNK_SIZE + offset.y) as f32,
                    (origin.z * CHUNK_SIZE + offset.z) as f32,
                );
                builder.push(buffer, draw_command(layer, regions.stride(), translation));
            }
            (ChunkRenderBackend::PerChunk { .. }, ChunkRenderState::PerChunk { layers }) => {
                let Some(layer) = layers.iter().find(|layer| layer.pass == builder.pass) else {
                    return;
                };
                let origin = coord.origin();
                builder.push(
                    layer.buffer,
                    DrawCommand {
                        first_vertex: 0,
                        vertex_count: layer.vertex_count,
                        translation: Vector3::new(origin.x as f32, origin.y as f32, origin.z as f32),
                    },
                );
            }
            _ => {}
        }
    }

    pub fn end_pass(&self, builder: PassBuilder) -> Vec<DrawBatch> {
        builder.batches
    }

    /// Releases storage no chunk uses any more.
    ///
    /// # Returns
    /// Number of region buffers released
    pub fn cleanup(&mut self, device: &mut dyn BufferDevice) -> usize {
        match self {
            ChunkRenderBackend::Batched { regions } => regions.cleanup(device),
            ChunkRenderBackend::PerChunk { .. } => 0,
        }
    }

    /// Releases all backend-owned storage. Per-chunk buffers are released through `clear`.
    pub fn delete(&mut self, device: &mut dyn BufferDevice) {
        if let ChunkRenderBackend::Batched { regions } = self {
            regions.delete(device);
        }
    }

    pub fn region_count(&self) -> usize {
        match self {
            ChunkRenderBackend::Batched { regions } => regions.region_count(),
            ChunkRenderBackend::PerChunk { .. } => 0,
        }
    }
}

fn draw_command(layer: &LayerAllocation, stride: u32, translation: Vector3<f32>) -> DrawCommand {
    DrawCommand {
        first_vertex: (layer.offset / stride as u64) as u32,
        vertex_count: layer.vertex_count,
        translation,
    }
}
