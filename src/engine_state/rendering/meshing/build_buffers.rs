//! # Build Buffers
//!
//! Per-pass vertex accumulation for a single chunk build.
//!
//! ## Key Components
//!
//! * `ChunkMeshBuilder` - encodes quads for one pass into a growing byte buffer
//! * `ChunkBuildBuffers` - one builder per render pass, finalized into mesh layers
//!
//! ## Translucency
//!
//! Translucent geometry is drawn back-to-front. Before a translucent layer is
//! finalized its quads are reordered by descending distance from the camera,
//! measured in chunk-local space. [`sort_encoded_quads`] works directly on the
//! encoded bytes, so a layer can be re-sorted later without rebuilding geometry.

use std::{cmp::Ordering, sync::Arc};

use cgmath::Vector3;

use super::{mesh_info::MeshLayer, quad::ModelQuad};
use crate::engine_state::rendering::{
    render_pass::BlockRenderPass,
    vertex::{QuadEncoder, VertexFormat},
};

/// Accumulates encoded quads for one render pass.
pub struct ChunkMeshBuilder {
    encoder: Arc<dyn QuadEncoder>,
    data: Vec<u8>,
    vertex_count: u32,
}

impl ChunkMeshBuilder {
    pub fn new(encoder: Arc<dyn QuadEncoder>) -> Self {
        Self {
            encoder,
            data: Vec::new(),
            vertex_count: 0,
        }
    }

    pub fn format(&self) -> &'static VertexFormat {
        self.encoder.format()
    }

    /// Encodes and appends one quad.
    pub fn add_quad(&mut self, quad: &ModelQuad) {
        self.encoder.encode(quad, &mut self.data);
        self.vertex_count += 4;
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Orders the quads back-to-front relative to `camera` (chunk-local).
    pub fn sort_quads(&mut self, camera: Vector3<f32>) {
        sort_encoded_quads(self.encoder.format(), &mut self.data, camera);
    }

    /// Hands out the encoded bytes and resets the builder.
    pub fn end(&mut self) -> (Vec<u8>, u32) {
        let vertex_count = std::mem::take(&mut self.vertex_count);
        (std::mem::take(&mut self.data), vertex_count)
    }
}

/// Reorders the encoded quads in `data` by descending squared distance from `camera`.
///
/// The sort is stable, so quads at equal distance keep their emission order.
pub fn sort_encoded_quads(format: &VertexFormat, data: &mut Vec<u8>, camera: Vector3<f32>) {
    let quad_size = format.stride as usize * 4;
    let quad_count = data.len() / quad_size;
    if quad_count < 2 {
        return;
    }

    let mut keyed: Vec<(f32, usize)> = (0..quad_count)
        .map(|quad| {
            let mut centroid = [0.0f32; 3];
            for vertex in 0..4 {
                let position = format.decode_vertex(data, quad * 4 + vertex).position;
                for axis in 0..3 {
                    centroid[axis] += position[axis] * 0.25;
                }
            }
            let dx = centroid[0] - camera.x;
            let dy = centroid[1] - camera.y;
            let dz = centroid[2] - camera.z;
            (dx * dx + dy * dy + dz * dz, quad)
        })
        .collect();

    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut sorted = Vec::with_capacity(data.len());
    for (_, quad) in keyed {
        sorted.extend_from_slice(&data[quad * quad_size..(quad + 1) * quad_size]);
    }
    *data = sorted;
}

/// One mesh builder per render pass.
pub struct ChunkBuildBuffers {
    builders: Vec<ChunkMeshBuilder>,
}

impl ChunkBuildBuffers {
    pub fn new(encoder: Arc<dyn QuadEncoder>) -> Self {
        Self {
            builders: BlockRenderPass::ALL
                .iter()
                .map(|_| ChunkMeshBuilder::new(encoder.clone()))
                .collect(),
        }
    }

    /// The builder collecting geometry for `pass`.
    pub fn get(&mut self, pass: BlockRenderPass) -> &mut ChunkMeshBuilder {
        &mut self.builders[pass as usize]
    }

    /// Finalizes every non-empty pass into a mesh layer.
    ///
    /// # Arguments
    /// * `camera` - camera position relative to the chunk origin, used to sort translucent passes
    pub fn create_meshes(&mut self, camera: Vector3<f32>) -> Vec<MeshLayer> {
        let mut layers = Vec::new();

        for pass in BlockRenderPass::ALL {
            let builder = &mut self.builders[pass as usize];
            if builder.is_empty() {
                continue;
            }

            if pass.is_translucent() {
                builder.sort_quads(camera);
            }

            let format = builder.format().kind;
            let (data, vertex_count) = builder.end();
            layers.push(MeshLayer {
                pass,
                format,
                data: data.into(),
                vertex_count,
            });
        }

        layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::vertex::{WideQuadEncoder, WIDE_FORMAT};

    fn quad_at_depth(depth: f32, tag: u32) -> ModelQuad {
        ModelQuad {
            positions: [
                [depth, 0.0, 0.0],
                [depth, 1.0, 0.0],
                [depth, 1.0, 1.0],
                [depth, 0.0, 1.0],
            ],
            colors: [tag; 4],
            tex_coords: [[0.0, 0.0]; 4],
            light: [0; 4],
            sprite: 0,
        }
    }

    #[test]
    fn test_translucent_pass_is_sorted_back_to_front() {
        let mut buffers = ChunkBuildBuffers::new(Arc::new(WideQuadEncoder));
        let translucent = buffers.get(BlockRenderPass::Translucent);
        translucent.add_quad(&quad_at_depth(1.0, 1));
        translucent.add_quad(&quad_at_depth(5.0, 5));
        translucent.add_quad(&quad_at_depth(3.0, 3));

        let layers = buffers.create_meshes(Vector3::new(0.0, 0.5, 0.5));
        assert_eq!(layers.len(), 1);
        let layer = &layers[0];
        assert_eq!(layer.vertex_count, 12);

        let order: Vec<u32> = (0..3)
            .map(|quad| WIDE_FORMAT.decode_vertex(&layer.data, quad * 4).color)
            .collect();
        assert_eq!(order, vec![5, 3, 1]);
    }

    #[test]
    fn test_opaque_pass_keeps_emission_order() {
        let mut buffers = ChunkBuildBuffers::new(Arc::new(WideQuadEncoder));
        let solid = buffers.get(BlockRenderPass::Solid);
        solid.add_quad(&quad_at_depth(1.0, 1));
        solid.add_quad(&quad_at_depth(5.0, 5));

        let layers = buffers.create_meshes(Vector3::new(0.0, 0.0, 0.0));
        let layer = &layers[0];
        assert_eq!(layer.pass, BlockRenderPass::Solid);
        assert_eq!(WIDE_FORMAT.decode_vertex(&layer.data, 0).color, 1);
        assert_eq!(WIDE_FORMAT.decode_vertex(&layer.data, 4).color, 5);
    }

    #[test]
    fn test_empty_passes_produce_no_layers() {
        let mut buffers = ChunkBuildBuffers::new(Arc::new(WideQuadEncoder));
        assert!(buffers.create_meshes(Vector3::new(0.0, 0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_resort_after_camera_moves() {
        let mut data = Vec::new();
        WideQuadEncoder.encode(&quad_at_depth(1.0, 1), &mut data);
        WideQuadEncoder.encode(&quad_at_depth(5.0, 5), &mut data);

        sort_encoded_quads(&WIDE_FORMAT, &mut data, Vector3::new(0.0, 0.5, 0.5));
        assert_eq!(WIDE_FORMAT.decode_vertex(&data, 0).color, 5);

        sort_encoded_quads(&WIDE_FORMAT, &mut data, Vector3::new(8.0, 0.5, 0.5));
        assert_eq!(WIDE_FORMAT.decode_vertex(&data, 0).color, 1);
    }
}
