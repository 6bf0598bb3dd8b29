//! # Chunk Build Scheduler
//!
//! Hands chunk builds to the worker pool and collects their results for upload.
//!
//! ## Key Components
//!
//! * `ChunkBuilder` - owns the workers, the quad encoder and the upload queue
//! * `PendingBuild` - what a chunk node remembers about its build in flight
//! * `ChunkBuildResult` - a finished build waiting to be applied on the main thread
//!
//! ## Cancellation
//!
//! Every scheduled build gets a fresh generation from a counter shared by all
//! chunks. Scheduling a chunk again raises the previous build's cancel flag, which
//! a worker checks before it starts. A build that already started still finishes;
//! the main thread then drops it because its generation no longer matches.
//!
//! ## Performance Considerations
//!
//! * Section snapshots are captured on the main thread, so workers never touch the world
//! * Important builds jump the queue, ambient ones wait their turn
//! * Results are only moved between queues here; applying them is the caller's job

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use cgmath::Vector3;
use log::{error, trace};

use super::{
    meshing::mesh_info::MeshInfo,
    tasks::chunk_build_task::{BuildTicket, ChunkBuildKind, ChunkBuildTask},
    vertex::QuadEncoder,
};
use crate::engine_state::{
    task_management::{task::TaskOutcome, TaskManager},
    voxels::{coord::ChunkCoordinate, snapshot::ChunkSnapshot, world::WorldSource},
};

/// The build a chunk node is waiting for.
#[derive(Clone, Debug)]
pub struct PendingBuild {
    pub generation: u64,
    pub is_sort: bool,
    cancelled: Arc<AtomicBool>,
}

impl PendingBuild {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A finished build waiting to be applied.
///
/// `mesh` is `None` when the build failed or was cancelled; the chunk keeps its
/// previous mesh in that case.
#[derive(Debug)]
pub struct ChunkBuildResult {
    pub ticket: BuildTicket,
    pub mesh: Option<MeshInfo>,
}

/// Schedules chunk builds on worker threads.
pub struct ChunkBuilder {
    tasks: TaskManager<ChunkBuildTask>,
    encoder: Arc<dyn QuadEncoder>,
    next_generation: u64,
    upload_queue: VecDeque<ChunkBuildResult>,
}

impl ChunkBuilder {
    /// Creates a scheduler and starts its workers.
    ///
    /// # Arguments
    /// * `worker_count` - Number of build workers to spawn
    /// * `encoder` - Quad encoder of the configured vertex format
    pub fn new(worker_count: usize, encoder: Arc<dyn QuadEncoder>) -> Self {
        Self {
            tasks: TaskManager::new(worker_count),
            encoder,
            next_generation: 0,
            upload_queue: VecDeque::new(),
        }
    }

    pub fn encoder(&self) -> &Arc<dyn QuadEncoder> {
        &self.encoder
    }

    /// Captures the section at `coord` for building.
    ///
    /// # Returns
    /// `None` when the section has no backing data or holds no blocks, in which
    /// case the chunk gets an empty mesh
    pub fn create_chunk_slice<W: WorldSource + ?Sized>(
        &self,
        world: &W,
        coord: ChunkCoordinate,
    ) -> Option<Arc<ChunkSnapshot>> {
        world
            .capture_section(coord)
            .filter(|snapshot| !snapshot.is_empty())
    }

    /// The build that brings the chunk at `coord` up to date with `world`.
    ///
    /// # Arguments
    /// * `camera` - Camera position in world space, for translucency sorting
    pub fn create_rebuild<W: WorldSource + ?Sized>(
        &self,
        world: &W,
        coord: ChunkCoordinate,
        camera: Vector3<f32>,
    ) -> ChunkBuildKind {
        match self.create_chunk_slice(world, coord) {
            Some(snapshot) => ChunkBuildKind::Rebuild {
                snapshot,
                encoder: self.encoder.clone(),
                camera: chunk_local(coord, camera),
            },
            None => ChunkBuildKind::Empty,
        }
    }

    /// A sort-only build that reorders the translucent layer of `mesh`.
    pub fn create_sort(
        &self,
        coord: ChunkCoordinate,
        mesh: Arc<MeshInfo>,
        camera: Vector3<f32>,
    ) -> ChunkBuildKind {
        ChunkBuildKind::Sort {
            mesh,
            camera: chunk_local(coord, camera),
        }
    }

    /// Schedules a build for `coord`, superseding the one in `pending`.
    ///
    /// # Arguments
    /// * `pending` - The node's build in flight; replaced by the new one
    /// * `coord` - Chunk the build belongs to
    /// * `kind` - Work to do
    /// * `important` - Run ahead of every queued ambient build
    ///
    /// # Returns
    /// The generation of the new build
    pub fn schedule(
        &mut self,
        pending: &mut Option<PendingBuild>,
        coord: ChunkCoordinate,
        kind: ChunkBuildKind,
        important: bool,
    ) -> u64 {
        Self::cancel(pending);

        self.next_generation += 1;
        let generation = self.next_generation;
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = ChunkBuildTask::new(BuildTicket { coord, generation }, cancelled.clone(), kind);
        let is_sort = task.is_sort();

        if important {
            self.tasks.publish_priority_task(task);
        } else {
            self.tasks.publish_task(task);
        }

        *pending = Some(PendingBuild {
            generation,
            is_sort,
            cancelled,
        });
        generation
    }

    /// Cancels the build in `pending`, if any.
    pub fn cancel(pending: &mut Option<PendingBuild>) {
        if let Some(build) = pending.take() {
            build.cancelled.store(true, Ordering::Release);
        }
    }

    /// Moves finished builds to the upload queue and feeds idle workers.
    pub fn process(&mut self) {
        for result in self.tasks.process_completed_tasks() {
            let mesh = match result.outcome {
                TaskOutcome::Completed(mesh) => Some(mesh),
                TaskOutcome::Cancelled => {
                    trace!("Build of chunk {:?} was cancelled before it started", result.id.coord);
                    None
                }
                TaskOutcome::Failed(message) => {
                    error!("Build of chunk {:?} failed: {}", result.id.coord, message);
                    None
                }
            };
            self.enqueue_upload(ChunkBuildResult {
                ticket: result.id,
                mesh,
            });
        }

        self.tasks.process_queued_tasks();
    }

    pub fn enqueue_upload(&mut self, result: ChunkBuildResult) {
        self.upload_queue.push_back(result);
    }

    /// Drains the upload queue in completion order.
    pub fn take_uploads(&mut self) -> Vec<ChunkBuildResult> {
        self.upload_queue.drain(..).collect()
    }

    /// Whether every scheduled build has been uploaded.
    pub fn is_idle(&self) -> bool {
        self.tasks.is_idle() && self.upload_queue.is_empty()
    }

    /// Builds queued or running.
    pub fn pending_count(&self) -> usize {
        self.tasks.queued_task_count() + self.tasks.tasks_in_flight()
    }

    /// Stops the workers and drops every queued build and upload.
    pub fn shutdown(&mut self) {
        self.tasks.shutdown();
        self.upload_queue.clear();
    }
}

fn chunk_local(coord: ChunkCoordinate, camera: Vector3<f32>) -> Vector3<f32> {
    let origin = coord.origin();
    Vector3::new(
        camera.x - origin.x as f32,
        camera.y - origin.y as f32,
        camera.z - origin.z as f32,
    )
}
