//! # Block State Module
//!
//! The per-block data the mesher reads from a snapshot: render pass, opacity,
//! colour and texture, plus the light and biome values sampled alongside it.

use cgmath::Point3;

use crate::engine_state::rendering::render_pass::BlockRenderPass;

/// Identifier of a texture sprite in the host's atlas
pub type SpriteId = u32;

/// Describes a block-entity attached to a block state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockEntityKind {
    /// Host-defined kind identifier
    pub kind: u16,
    /// Global block-entities render regardless of chunk visibility
    pub global: bool,
}

/// A block-entity found while building a chunk mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockEntity {
    /// World-space block position
    pub position: Point3<i32>,
    /// Host-defined kind identifier
    pub kind: u16,
    /// Whether it renders regardless of chunk visibility
    pub global: bool,
}

/// Immutable description of a block.
///
/// # Fields
/// - `id`: host block id, `0` is air
/// - `render_pass`: pass the block's faces go to, `None` for invisible blocks
/// - `opaque`: full opaque cube; hides neighbor faces and blocks occlusion flood fills
/// - `color`: packed ABGR colour applied to every vertex
/// - `sprite`: texture sprite for all faces
/// - `animated`: the sprite is animated and must be ticked while visible
/// - `tinted`: colour is multiplied by the biome tint
/// - `block_entity`: attached block-entity, if any
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockState {
    pub id: u16,
    pub render_pass: Option<BlockRenderPass>,
    pub opaque: bool,
    pub color: u32,
    pub sprite: SpriteId,
    pub animated: bool,
    pub tinted: bool,
    pub block_entity: Option<BlockEntityKind>,
}

impl BlockState {
    /// Empty space
    pub const AIR: BlockState = BlockState {
        id: 0,
        render_pass: None,
        opaque: false,
        color: 0,
        sprite: 0,
        animated: false,
        tinted: false,
        block_entity: None,
    };

    /// A full opaque cube rendered in the solid pass.
    pub const fn solid(id: u16, color: u32, sprite: SpriteId) -> Self {
        BlockState {
            id,
            render_pass: Some(BlockRenderPass::Solid),
            opaque: true,
            color,
            sprite,
            animated: false,
            tinted: false,
            block_entity: None,
        }
    }

    /// A see-through cube rendered in the cutout pass.
    pub const fn cutout(id: u16, color: u32, sprite: SpriteId) -> Self {
        BlockState {
            id,
            render_pass: Some(BlockRenderPass::Cutout),
            opaque: false,
            color,
            sprite,
            animated: false,
            tinted: false,
            block_entity: None,
        }
    }

    /// A translucent cube (water, glass) rendered in the translucent pass.
    pub const fn translucent(id: u16, color: u32, sprite: SpriteId) -> Self {
        BlockState {
            id,
            render_pass: Some(BlockRenderPass::Translucent),
            opaque: false,
            color,
            sprite,
            animated: false,
            tinted: false,
            block_entity: None,
        }
    }

    pub const fn with_animation(mut self) -> Self {
        self.animated = true;
        self
    }

    pub const fn with_tint(mut self) -> Self {
        self.tinted = true;
        self
    }

    pub const fn with_block_entity(mut self, kind: u16, global: bool) -> Self {
        self.block_entity = Some(BlockEntityKind { kind, global });
        self
    }

    pub fn is_air(&self) -> bool {
        self.id == 0
    }
}

impl Default for BlockState {
    fn default() -> Self {
        BlockState::AIR
    }
}

/// Block and sky light at one position, each in `0..=15`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Light {
    pub block: u8,
    pub sky: u8,
}

impl Light {
    pub const FULL_SKY: Light = Light { block: 0, sky: 15 };

    pub const fn new(block: u8, sky: u8) -> Self {
        Self { block, sky }
    }

    /// Light-map coordinates as stored in vertex data.
    pub fn to_uv(self) -> [u16; 2] {
        [(self.block as u16) << 4, (self.sky as u16) << 4]
    }
}

/// Biome data relevant to meshing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Biome {
    pub id: u16,
    /// Packed ABGR tint for tinted blocks
    pub tint: u32,
}

impl Default for Biome {
    fn default() -> Self {
        Biome {
            id: 0,
            tint: 0xFF_FF_FF_FF,
        }
    }
}
