//! Background tasks for the rendering system.
//!
//! These tasks run on the build workers so the main thread only applies finished
//! results.
//!
//! # Available Tasks
//! - `ChunkBuildTask`: meshes a chunk snapshot, produces an empty mesh, or re-sorts
//!   the translucent layer of an existing mesh

pub mod chunk_build_task;
