//! # Mesh Info
//!
//! The immutable result of a chunk build. A node holds its current mesh as an
//! `Arc<MeshInfo>` and replaces the whole value when a newer build is applied;
//! a `MeshInfo` is never mutated after construction.

use std::sync::Arc;

use crate::engine_state::{
    rendering::{render_pass::BlockRenderPass, vertex::VertexFormatKind},
    voxels::{
        block_state::{BlockEntity, SpriteId},
        direction::Direction,
        occlusion::VisibilityData,
    },
};

/// Encoded geometry for one render pass.
#[derive(Clone, Debug)]
pub struct MeshLayer {
    pub pass: BlockRenderPass,
    pub format: VertexFormatKind,
    pub data: Arc<[u8]>,
    pub vertex_count: u32,
}

/// Everything a finished build produced for one chunk.
#[derive(Clone, Debug, Default)]
pub struct MeshInfo {
    layers: Vec<MeshLayer>,
    visibility: VisibilityData,
    block_entities: Vec<BlockEntity>,
    global_block_entities: Vec<BlockEntity>,
    animated_sprites: Vec<SpriteId>,
}

impl MeshInfo {
    /// The mesh of a chunk that was never built, or was deleted.
    ///
    /// Absent meshes are fully see-through so traversal is not blocked by chunks
    /// still waiting for their first build.
    pub fn absent() -> Arc<MeshInfo> {
        Arc::new(MeshInfo::default())
    }

    pub fn new(
        layers: Vec<MeshLayer>,
        visibility: VisibilityData,
        block_entities: Vec<BlockEntity>,
        global_block_entities: Vec<BlockEntity>,
        animated_sprites: Vec<SpriteId>,
    ) -> Self {
        Self {
            layers: layers.into_iter().filter(|layer| layer.vertex_count > 0).collect(),
            visibility,
            block_entities,
            global_block_entities,
            animated_sprites,
        }
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[MeshLayer] {
        &self.layers
    }

    pub fn layer(&self, pass: BlockRenderPass) -> Option<&MeshLayer> {
        self.layers.iter().find(|layer| layer.pass == pass)
    }

    pub fn has_translucent_layer(&self) -> bool {
        self.layers.iter().any(|layer| layer.pass.is_translucent())
    }

    pub fn visibility(&self) -> &VisibilityData {
        &self.visibility
    }

    pub fn is_visible_through(&self, from: Direction, to: Direction) -> bool {
        self.visibility.is_visible_through(from, to)
    }

    /// Block-entities that render only while the chunk is visible.
    pub fn block_entities(&self) -> &[BlockEntity] {
        &self.block_entities
    }

    /// Block-entities that render regardless of chunk visibility.
    pub fn global_block_entities(&self) -> &[BlockEntity] {
        &self.global_block_entities
    }

    pub fn animated_sprites(&self) -> &[SpriteId] {
        &self.animated_sprites
    }

    /// Copy of this mesh with one layer replaced.
    pub fn with_layer(&self, layer: MeshLayer) -> MeshInfo {
        let mut copy = self.clone();
        match copy.layers.iter_mut().find(|existing| existing.pass == layer.pass) {
            Some(existing) => *existing = layer,
            None => copy.layers.push(layer),
        }
        copy
    }

    /// Total encoded size across layers.
    pub fn byte_size(&self) -> usize {
        self.layers.iter().map(|layer| layer.data.len()).sum()
    }
}
