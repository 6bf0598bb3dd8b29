//! Model quads emitted by the mesher before encoding.

use crate::engine_state::voxels::block_state::{Light, SpriteId};

/// Four vertices of one block face, in chunk-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelQuad {
    pub positions: [[f32; 3]; 4],
    /// Packed ABGR colour per vertex
    pub colors: [u32; 4],
    pub tex_coords: [[f32; 2]; 4],
    /// Packed light-map coordinates per vertex, block in the low half and sky in the high half
    pub light: [u32; 4],
    pub sprite: SpriteId,
}

/// Packs a light value the way vertex data stores it.
pub fn pack_light(light: Light) -> u32 {
    let [block, sky] = light.to_uv();
    block as u32 | (sky as u32) << 16
}

/// Multiplies two packed ABGR colours channel by channel.
pub fn multiply_color(a: u32, b: u32) -> u32 {
    let mut out = 0u32;
    for shift in [0, 8, 16, 24] {
        let ca = (a >> shift) & 0xFF;
        let cb = (b >> shift) & 0xFF;
        out |= ((ca * cb + 127) / 255) << shift;
    }
    out
}

/// Scales the RGB channels of a packed ABGR colour, leaving alpha alone.
pub fn shade_color(color: u32, factor: f32) -> u32 {
    let mut out = color & 0xFF00_0000;
    for shift in [0, 8, 16] {
        let channel = ((color >> shift) & 0xFF) as f32 * factor;
        out |= (channel.round().clamp(0.0, 255.0) as u32) << shift;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_math() {
        assert_eq!(multiply_color(0xFFFF_FFFF, 0x8040_20FF), 0x8040_20FF);
        assert_eq!(multiply_color(0x0000_0000, 0xFFFF_FFFF), 0);
        assert_eq!(shade_color(0xFF64_64C8, 0.5), 0xFF32_3264);
    }

    #[test]
    fn test_pack_light() {
        assert_eq!(pack_light(Light::new(15, 0)), 0xF0);
        assert_eq!(pack_light(Light::new(0, 15)), 0xF0 << 16);
    }
}
