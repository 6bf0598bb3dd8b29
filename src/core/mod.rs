//! # Core Module
//!
//! Shared-ownership resource containers used by the chunk renderer.
//!
//! ## Key Components
//! - `MtResource`: thread-safe reference-counted resource with read-write locking,
//!   for worlds shared with threads outside the renderer
//! - `StResource`: single-threaded reference-counted resource with interior mutability,
//!   used for buffer bookkeeping on the render thread
//!
//! ## Usage
//! ```rust
//! use voxel_chunk_graph::core::{MtResource, StResource};
//!
//! let world_height = MtResource::new(256);
//! assert_eq!(*world_height.get(), 256);
//!
//! let uploads = StResource::new(Vec::<u64>::new());
//! uploads.get_mut().push(4096);
//! assert_eq!(uploads.get().len(), 1);
//! ```

pub mod mt_resource;
pub mod st_resource;

pub use mt_resource::MtResource;
pub use st_resource::StResource;
