//! # Camera State
//!
//! The camera data the chunk renderer reads each frame.
//!
//! ## Core Components
//! - `Camera`: position and orientation in world space
//! - `Projection`: perspective projection settings
//! - `Frustum`: planes extracted from the view-projection matrix
//! - `Aabb`: chunk and entity bounds tested against the frustum

pub mod camera;
pub mod frustum;
