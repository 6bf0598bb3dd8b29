//! Rendering side of the chunk renderer.
//!
//! This module turns chunk snapshots into encoded meshes on worker threads and
//! keeps those meshes in GPU buffers. It never issues draw calls; the host reads
//! the draw batches produced by the selected backend.
//!
//! # Submodules
//! - `render_pass`: the block render passes and their draw order
//! - `vertex`: vertex formats and the quad encoders that write them
//! - `meshing`: CPU mesh construction and translucency sorting
//! - `tasks`: build tasks executed by the worker pool
//! - `builder`: scheduling, cancellation and the upload queue
//! - `region`: region buffers shared by neighbouring chunks
//! - `backend`: storage strategies and draw list generation

pub mod backend;
pub mod builder;
pub mod meshing;
pub mod region;
pub mod render_pass;
pub mod tasks;
pub mod vertex;
