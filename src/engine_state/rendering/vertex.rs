//! Vertex formats and quad encoders for chunk meshes.
//!
//! Two layouts are supported. Both carry the same four attributes and differ in
//! precision and size:
//!
//! | Attribute | Wide (32 bytes)      | Compact (20 bytes)       |
//! |-----------|----------------------|--------------------------|
//! | position  | 3x f32 at 0          | 3x f16 at 0 (+2 padding) |
//! | color     | 4x u8 (norm) at 12   | 4x u8 (norm) at 8        |
//! | texture   | 2x f32 at 16         | 2x f16 at 12             |
//! | light     | 2x i16 at 24         | 2x i16 at 16             |
//!
//! Each format has exactly one [`QuadEncoder`], looked up through a
//! [`QuadEncoderRegistry`] by [`VertexFormatKind`].

use std::{collections::HashMap, sync::Arc};

use half::f16;
use serde::{Deserialize, Serialize};

use crate::{
    engine_state::rendering::meshing::quad::ModelQuad,
    error::{Error, Result},
};

/// Identifies one of the supported vertex layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VertexFormatKind {
    /// Full precision floats, 32-byte stride
    Wide,
    /// Half-precision position and texture, 20-byte stride
    Compact,
}

/// Component type of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexAttributeFormat {
    Float,
    HalfFloat,
    Short,
    UnsignedShort,
    Byte,
    UnsignedByte,
}

impl VertexAttributeFormat {
    /// Size of one component in bytes.
    pub const fn size(self) -> u32 {
        match self {
            VertexAttributeFormat::Float => 4,
            VertexAttributeFormat::HalfFloat
            | VertexAttributeFormat::Short
            | VertexAttributeFormat::UnsignedShort => 2,
            VertexAttributeFormat::Byte | VertexAttributeFormat::UnsignedByte => 1,
        }
    }
}

/// One attribute within a vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub format: VertexAttributeFormat,
    pub count: u32,
    pub normalized: bool,
    pub offset: u32,
}

impl VertexAttribute {
    pub const fn new(format: VertexAttributeFormat, count: u32, normalized: bool, offset: u32) -> Self {
        Self {
            format,
            count,
            normalized,
            offset,
        }
    }

    /// Bytes occupied by the attribute's components.
    pub const fn size(&self) -> u32 {
        self.format.size() * self.count
    }

    /// The matching wgpu attribute format.
    ///
    /// wgpu has no three-component half type, so a 3x half attribute is read as
    /// `Float16x4` and relies on the two padding bytes that follow it.
    pub fn to_wgpu(&self) -> wgpu::VertexFormat {
        use VertexAttributeFormat::*;
        match (self.format, self.count, self.normalized) {
            (Float, 2, _) => wgpu::VertexFormat::Float32x2,
            (Float, 3, _) => wgpu::VertexFormat::Float32x3,
            (HalfFloat, 2, _) => wgpu::VertexFormat::Float16x2,
            (HalfFloat, 3, _) | (HalfFloat, 4, _) => wgpu::VertexFormat::Float16x4,
            (UnsignedByte, 4, true) => wgpu::VertexFormat::Unorm8x4,
            (UnsignedByte, 4, false) => wgpu::VertexFormat::Uint8x4,
            (Byte, 4, true) => wgpu::VertexFormat::Snorm8x4,
            (Short, 2, false) => wgpu::VertexFormat::Sint16x2,
            (UnsignedShort, 2, false) => wgpu::VertexFormat::Uint16x2,
            other => panic!("vertex attribute {:?} has no wgpu equivalent", other),
        }
    }
}

/// A complete vertex layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexFormat {
    pub kind: VertexFormatKind,
    pub stride: u32,
    pub position: VertexAttribute,
    pub color: VertexAttribute,
    pub texture: VertexAttribute,
    pub light: VertexAttribute,
}

/// Full precision layout, bit compatible with a plain float vertex.
pub const WIDE_FORMAT: VertexFormat = VertexFormat {
    kind: VertexFormatKind::Wide,
    stride: 32,
    position: VertexAttribute::new(VertexAttributeFormat::Float, 3, false, 0),
    color: VertexAttribute::new(VertexAttributeFormat::UnsignedByte, 4, true, 12),
    texture: VertexAttribute::new(VertexAttributeFormat::Float, 2, false, 16),
    light: VertexAttribute::new(VertexAttributeFormat::Short, 2, false, 24),
};

/// Half-float layout for position and texture coordinates.
pub const COMPACT_FORMAT: VertexFormat = VertexFormat {
    kind: VertexFormatKind::Compact,
    stride: 20,
    position: VertexAttribute::new(VertexAttributeFormat::HalfFloat, 3, false, 0),
    color: VertexAttribute::new(VertexAttributeFormat::UnsignedByte, 4, true, 8),
    texture: VertexAttribute::new(VertexAttributeFormat::HalfFloat, 2, false, 12),
    light: VertexAttribute::new(VertexAttributeFormat::Short, 2, false, 16),
};

static WIDE_WGPU_ATTRIBUTES: [wgpu::VertexAttribute; 4] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3,
    },
    wgpu::VertexAttribute {
        offset: 12,
        shader_location: 1,
        format: wgpu::VertexFormat::Unorm8x4,
    },
    wgpu::VertexAttribute {
        offset: 16,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32x2,
    },
    wgpu::VertexAttribute {
        offset: 24,
        shader_location: 3,
        format: wgpu::VertexFormat::Sint16x2,
    },
];

static COMPACT_WGPU_ATTRIBUTES: [wgpu::VertexAttribute; 4] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float16x4,
    },
    wgpu::VertexAttribute {
        offset: 8,
        shader_location: 1,
        format: wgpu::VertexFormat::Unorm8x4,
    },
    wgpu::VertexAttribute {
        offset: 12,
        shader_location: 2,
        format: wgpu::VertexFormat::Float16x2,
    },
    wgpu::VertexAttribute {
        offset: 16,
        shader_location: 3,
        format: wgpu::VertexFormat::Sint16x2,
    },
];

impl VertexFormat {
    /// Looks up the layout for a format kind.
    pub fn of(kind: VertexFormatKind) -> &'static VertexFormat {
        match kind {
            VertexFormatKind::Wide => &WIDE_FORMAT,
            VertexFormatKind::Compact => &COMPACT_FORMAT,
        }
    }

    /// Attributes in shader location order.
    pub fn attributes(&self) -> [VertexAttribute; 4] {
        [self.position, self.color, self.texture, self.light]
    }

    /// Returns the vertex buffer layout description for the chunk shader pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position
    /// - `location = 1`: color (normalized RGBA)
    /// - `location = 2`: texture coordinates
    /// - `location = 3`: light-map coordinates
    pub fn desc(&self) -> wgpu::VertexBufferLayout<'static> {
        let attributes: &'static [wgpu::VertexAttribute] = match self.kind {
            VertexFormatKind::Wide => &WIDE_WGPU_ATTRIBUTES,
            VertexFormatKind::Compact => &COMPACT_WGPU_ATTRIBUTES,
        };
        wgpu::VertexBufferLayout {
            array_stride: self.stride as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }

    /// Reads vertex `index` back out of an encoded buffer.
    ///
    /// # Panics
    /// Panics if the buffer is too short.
    pub fn decode_vertex(&self, data: &[u8], index: usize) -> DecodedVertex {
        let base = index * self.stride as usize;
        let vertex = &data[base..base + self.stride as usize];

        let read_f32 = |offset: usize| {
            f32::from_le_bytes([vertex[offset], vertex[offset + 1], vertex[offset + 2], vertex[offset + 3]])
        };
        let read_f16 = |offset: usize| f16::from_le_bytes([vertex[offset], vertex[offset + 1]]).to_f32();
        let read_component = |attribute: &VertexAttribute, i: u32| {
            let offset = (attribute.offset + i * attribute.format.size()) as usize;
            match attribute.format {
                VertexAttributeFormat::Float => read_f32(offset),
                VertexAttributeFormat::HalfFloat => read_f16(offset),
                other => panic!("attribute format {:?} is not a float", other),
            }
        };

        let color_offset = self.color.offset as usize;
        let light_offset = self.light.offset as usize;

        DecodedVertex {
            position: [
                read_component(&self.position, 0),
                read_component(&self.position, 1),
                read_component(&self.position, 2),
            ],
            color: u32::from_le_bytes([
                vertex[color_offset],
                vertex[color_offset + 1],
                vertex[color_offset + 2],
                vertex[color_offset + 3],
            ]),
            texture: [read_component(&self.texture, 0), read_component(&self.texture, 1)],
            light: u32::from_le_bytes([
                vertex[light_offset],
                vertex[light_offset + 1],
                vertex[light_offset + 2],
                vertex[light_offset + 3],
            ]),
        }
    }
}

/// A vertex read back from an encoded buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedVertex {
    pub position: [f32; 3],
    pub color: u32,
    pub texture: [f32; 2],
    pub light: u32,
}

/// Memory layout of the wide format.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WideVertex {
    position: [f32; 3],
    color: u32,
    tex_coords: [f32; 2],
    light: u32,
    _padding: u32,
}

/// Memory layout of the compact format.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompactVertex {
    position: [f16; 3],
    _padding: u16,
    color: u32,
    tex_coords: [f16; 2],
    light: u32,
}

/// Turns model quads into the bytes of one vertex format.
pub trait QuadEncoder: Send + Sync {
    /// The layout this encoder writes.
    fn format(&self) -> &'static VertexFormat;

    /// Appends the four vertices of `quad` to `out`.
    fn encode(&self, quad: &ModelQuad, out: &mut Vec<u8>);
}

/// Encoder for [`WIDE_FORMAT`].
pub struct WideQuadEncoder;

impl QuadEncoder for WideQuadEncoder {
    fn format(&self) -> &'static VertexFormat {
        &WIDE_FORMAT
    }

    fn encode(&self, quad: &ModelQuad, out: &mut Vec<u8>) {
        for i in 0..4 {
            let vertex = WideVertex {
                position: quad.positions[i],
                color: quad.colors[i],
                tex_coords: quad.tex_coords[i],
                light: quad.light[i],
                _padding: 0,
            };
            out.extend_from_slice(bytemuck::bytes_of(&vertex));
        }
    }
}

/// Encoder for [`COMPACT_FORMAT`].
pub struct CompactQuadEncoder;

impl QuadEncoder for CompactQuadEncoder {
    fn format(&self) -> &'static VertexFormat {
        &COMPACT_FORMAT
    }

    fn encode(&self, quad: &ModelQuad, out: &mut Vec<u8>) {
        for i in 0..4 {
            let [x, y, z] = quad.positions[i];
            let [u, v] = quad.tex_coords[i];
            let vertex = CompactVertex {
                position: [f16::from_f32(x), f16::from_f32(y), f16::from_f32(z)],
                _padding: 0,
                color: quad.colors[i],
                tex_coords: [f16::from_f32(u), f16::from_f32(v)],
                light: quad.light[i],
            };
            out.extend_from_slice(bytemuck::bytes_of(&vertex));
        }
    }
}

/// Resolves the quad encoder for a vertex format.
///
/// Each format can be registered once; looking up a format that was never
/// registered is an error rather than a fallback.
#[derive(Default, Clone)]
pub struct QuadEncoderRegistry {
    encoders: HashMap<VertexFormatKind, Arc<dyn QuadEncoder>>,
}

impl QuadEncoderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the wide and compact encoders.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(WideQuadEncoder))?;
        registry.register(Arc::new(CompactQuadEncoder))?;
        Ok(registry)
    }

    /// Registers the encoder for its format.
    ///
    /// # Errors
    /// `Error::EncoderAlreadyRegistered` if the format already has an encoder.
    pub fn register(&mut self, encoder: Arc<dyn QuadEncoder>) -> Result<()> {
        let kind = encoder.format().kind;
        if self.encoders.contains_key(&kind) {
            return Err(Error::EncoderAlreadyRegistered(kind));
        }
        self.encoders.insert(kind, encoder);
        Ok(())
    }

    /// Returns the encoder for `kind`.
    ///
    /// # Errors
    /// `Error::EncoderMissing` if nothing was registered for it.
    pub fn get(&self, kind: VertexFormatKind) -> Result<Arc<dyn QuadEncoder>> {
        self.encoders
            .get(&kind)
            .cloned()
            .ok_or(Error::EncoderMissing(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quad() -> ModelQuad {
        ModelQuad {
            positions: [
                [1.25, 2.5, 3.75],
                [15.9, 0.1, 7.3],
                [0.0, 16.0, 8.001],
                [12.34, 5.67, 9.87],
            ],
            colors: [0xFF10_2030, 0x8040_5060, 0x0000_00FF, 0xFFFF_FFFF],
            tex_coords: [[0.0, 0.0], [0.25, 0.0], [0.25, 0.125], [0.0, 0.125]],
            light: [0x00F0_0000, 0x0010_0020, 0x00F0_00F0, 0],
            sprite: 3,
        }
    }

    #[test]
    fn test_struct_sizes_match_strides() {
        assert_eq!(std::mem::size_of::<WideVertex>(), WIDE_FORMAT.stride as usize);
        assert_eq!(std::mem::size_of::<CompactVertex>(), COMPACT_FORMAT.stride as usize);
    }

    #[test]
    fn test_wide_round_trip() {
        let quad = sample_quad();
        let mut data = Vec::new();
        WideQuadEncoder.encode(&quad, &mut data);
        assert_eq!(data.len(), 4 * 32);

        for i in 0..4 {
            let vertex = WIDE_FORMAT.decode_vertex(&data, i);
            assert_eq!(vertex.position, quad.positions[i]);
            assert_eq!(vertex.color, quad.colors[i]);
            assert_eq!(vertex.texture, quad.tex_coords[i]);
            assert_eq!(vertex.light, quad.light[i]);
        }
    }

    #[test]
    fn test_compact_round_trip_within_half_precision() {
        let quad = sample_quad();
        let mut data = Vec::new();
        CompactQuadEncoder.encode(&quad, &mut data);
        assert_eq!(data.len(), 4 * 20);

        let tolerance = 2f32.powi(-10);
        for i in 0..4 {
            let vertex = COMPACT_FORMAT.decode_vertex(&data, i);
            for axis in 0..3 {
                let expected = quad.positions[i][axis];
                let error = (vertex.position[axis] - expected).abs();
                assert!(error <= expected.abs().max(1.0) * tolerance);
            }
            assert_eq!(vertex.color, quad.colors[i]);
            assert_eq!(vertex.light, quad.light[i]);
        }
    }

    #[test]
    fn test_registry_rejects_double_registration() {
        let mut registry = QuadEncoderRegistry::with_defaults().unwrap();
        assert!(matches!(
            registry.register(Arc::new(WideQuadEncoder)),
            Err(Error::EncoderAlreadyRegistered(VertexFormatKind::Wide))
        ));
    }

    #[test]
    fn test_registry_reports_missing_encoder() {
        let mut registry = QuadEncoderRegistry::new();
        registry.register(Arc::new(WideQuadEncoder)).unwrap();
        assert!(registry.get(VertexFormatKind::Wide).is_ok());
        assert!(matches!(
            registry.get(VertexFormatKind::Compact),
            Err(Error::EncoderMissing(VertexFormatKind::Compact))
        ));
    }

    #[test]
    fn test_wgpu_layout_matches_declared_attributes() {
        for format in [&WIDE_FORMAT, &COMPACT_FORMAT] {
            let layout = format.desc();
            assert_eq!(layout.array_stride, format.stride as u64);
            for (wgpu_attribute, attribute) in layout.attributes.iter().zip(format.attributes()) {
                assert_eq!(wgpu_attribute.offset, attribute.offset as u64);
                assert_eq!(wgpu_attribute.format, attribute.to_wgpu());
            }
        }
    }
}
