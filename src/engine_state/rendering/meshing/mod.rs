//! # Meshing
//!
//! CPU-side construction of chunk meshes.
//!
//! ## Key Components
//!
//! * `quad` - model quads and the colour/light packing helpers
//! * `build_buffers` - per-pass accumulation, encoding and translucency sorting
//! * `mesher` - converts a chunk snapshot into geometry and occlusion data
//! * `mesh_info` - the immutable result applied to a chunk node
//!
//! ## Performance Considerations
//!
//! * Meshing runs on worker threads against immutable snapshots, never the live world
//! * Quads are encoded as they are emitted so no intermediate vertex list is kept
//! * Re-sorting a translucent layer reorders encoded bytes without re-meshing

pub mod build_buffers;
pub mod mesh_info;
pub mod mesher;
pub mod quad;
