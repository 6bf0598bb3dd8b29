#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Chunk Graph
//!
//! Chunk visibility and mesh pipeline for a voxel renderer built on WGPU.
//!
//! Every frame a breadth-first traversal decides which 16³ chunks the camera can
//! see, dirty chunks are meshed on a pool of worker threads, and finished meshes
//! are packed into shared region buffers ready to draw.
//!
//! ## Key Modules
//!
//! * `config` - Renderer settings loaded from JSON, and the GPU capabilities they depend on
//! * `core` - Shared-ownership resource wrappers used throughout the crate
//! * `engine_state` - The chunk renderer: visibility graph, build scheduling, meshing and GPU storage
//! * `error` - The crate error type
//!
//! ## Architecture
//!
//! The renderer keeps a clear separation between:
//! * World access (`WorldSource`), owned by the host and read through snapshots
//! * GPU access (`BufferDevice`), implemented for wgpu and for host memory
//! * Everything in between, owned by one `ChunkRenderer` and driven from the main thread
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cgmath::{Deg, Point3};
//! use voxel_chunk_graph::config::{GpuCapabilities, RendererConfig};
//! use voxel_chunk_graph::engine_state::{
//!     buffer_state::HostBufferState,
//!     camera_state::{camera::Camera, frustum::NoFrustum},
//!     rendering::{render_pass::BlockRenderPass, vertex::QuadEncoderRegistry},
//!     voxels::world::World,
//!     ChunkRenderer,
//! };
//!
//! fn main() -> voxel_chunk_graph::error::Result<()> {
//!     voxel_chunk_graph::init_logger();
//!
//!     let encoders = QuadEncoderRegistry::with_defaults()?;
//!     let mut renderer = ChunkRenderer::new(
//!         World::new(),
//!         HostBufferState::new(),
//!         RendererConfig::load("renderer.json")?,
//!         GpuCapabilities::all(),
//!         &encoders,
//!     )?;
//!
//!     let camera = Camera::new(Point3::new(0.0, 80.0, 0.0), Deg(0.0), Deg(-20.0));
//!     for frame in 1.. {
//!         renderer.update(&camera, &NoFrustum, frame, false);
//!         for pass in BlockRenderPass::ALL {
//!             let _batches = renderer.render_pass(pass);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Performance Considerations
//!
//! * Traversal state is stamped per frame instead of cleared
//! * Workers only see immutable snapshots, so builds need no locking
//! * Chunks in one region share a buffer, so draws batch without rebinding

use log::info;

pub mod config;
pub mod core;
pub mod engine_state;
pub mod error;

/// Installs the stdout logger, filtered by `RUST_LOG`.
///
/// Only binaries should call this; the library itself never installs a logger.
pub fn init_logger() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");
}
