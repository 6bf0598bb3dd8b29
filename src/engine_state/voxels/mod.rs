//! # Voxel Data
//!
//! World-side data the chunk renderer consumes, and the derived per-chunk data
//! it computes before meshing.
//!
//! ## Architecture
//!
//! * **Coordinates**: chunk and column addressing on the 16-unit grid
//! * **Direction**: the six faces used by traversal and face culling
//! * **Block state**: render pass, opacity, colour, light and biome values
//! * **World**: the `WorldSource` boundary plus an in-memory implementation
//! * **Snapshot**: immutable per-chunk copies handed to build workers
//! * **Occlusion**: face-to-face connectivity computed by flood fill
//! * **Terrain**: noise-based generator used by the demo and tests
//!
//! ## Data Flow
//!
//! 1. The host mutates its world and reports edits as rebuild requests
//! 2. The scheduler captures a `ChunkSnapshot` on the main thread
//! 3. A worker meshes the snapshot and computes its `VisibilityData`
//! 4. The finished mesh is applied to the chunk's graph node

pub mod block_state;
pub mod coord;
pub mod direction;
pub mod occlusion;
pub mod snapshot;
pub mod terrain;
pub mod world;
