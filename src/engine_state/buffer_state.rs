//! # Buffer State Module
//!
//! This module provides the buffer devices that chunk meshes are uploaded into.
//! It handles buffer creation, writing, copying, destruction and analytics so GPU
//! memory use can be inspected at any time.
//!
//! ## Key Features
//!
//! * Buffers are referenced by opaque `BufferHandle`s
//! * Buffer usage analytics and memory tracking
//! * Safe buffer writing with bounds checking
//! * A host-memory device with the same contract, for headless runs and tests
//!
//! ## Architecture
//!
//! `BufferDevice` is the seam between the chunk renderer and the graphics API.
//! `WgpuBufferState` implements it on top of a wgpu device and queue, while
//! `HostBufferState` keeps buffer contents in plain vectors. Both share the
//! `BufferAnalytics` bookkeeping.
//!
//! ## Performance Considerations
//!
//! * Region buffers are grown by copying on the device, never through the CPU
//! * Writes go through the queue's staging path and need no mapping

use std::collections::HashMap;

use log::debug;
use wgpu::{Buffer, Device, Queue};

use crate::{
    config::GpuCapabilities,
    core::StResource,
    error::{Error, Result},
};

/// Buffers at least this large are needed to pack a region of chunk meshes
pub const LARGE_BUFFER_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Opaque reference to a buffer owned by a `BufferDevice`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

impl BufferHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Analytics data for a buffer
///
/// Tracks memory allocation, usage, and write operations for a buffer
/// to help identify optimization opportunities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferAnalytics {
    /// Total memory allocated for the buffer in bytes
    pub allocated_memory: u64,
    /// Highest byte written so far
    pub used_memory: u64,
    /// Number of times the buffer has been written to, including copies into it
    pub times_written: u64,
}

/// Operations the chunk renderer needs from a graphics device.
///
/// All offsets and sizes the renderer passes are multiples of four.
pub trait BufferDevice {
    /// Creates a zero-initialized buffer of `size` bytes.
    fn create_buffer(&mut self, label: &str, size: u64) -> BufferHandle;

    /// Writes `data` at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer does not exist or if the write would exceed buffer bounds
    fn write_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]);

    /// Copies `size` bytes between two buffers.
    ///
    /// # Panics
    ///
    /// Panics if either buffer does not exist or a range is out of bounds
    fn copy_buffer(
        &mut self,
        source: BufferHandle,
        source_offset: u64,
        destination: BufferHandle,
        destination_offset: u64,
        size: u64,
    );

    /// Releases a buffer. Unknown handles are ignored.
    fn destroy_buffer(&mut self, handle: BufferHandle);

    /// Analytics of a live buffer.
    fn analytics(&self, handle: BufferHandle) -> Option<BufferAnalytics>;

    /// Number of live buffers.
    fn buffer_count(&self) -> usize;

    /// Gets the total allocated memory across all buffers
    fn total_allocated_memory(&self) -> u64;

    /// Gets the total used memory across all buffers
    fn total_used_memory(&self) -> u64;
}

/// Handle allocation and analytics shared by every device implementation.
#[derive(Default)]
struct BufferRegistry {
    analytics: StResource<HashMap<BufferHandle, BufferAnalytics>>,
    next_id: u64,
}

impl BufferRegistry {
    fn register(&mut self, size: u64) -> BufferHandle {
        let handle = BufferHandle(self.next_id);
        self.next_id += 1;
        self.analytics.get_mut().insert(
            handle,
            BufferAnalytics {
                allocated_memory: size,
                ..Default::default()
            },
        );
        handle
    }

    fn record_write(&self, handle: BufferHandle, offset: u64, size: u64) {
        let mut dictionary = self.analytics.get_mut();
        let Some(analytics) = dictionary.get_mut(&handle) else {
            panic!("Buffer write to unknown buffer {:?}", handle);
        };

        if offset + size > analytics.allocated_memory {
            panic!(
                "Buffer write out of bounds for buffer {:?}: {}..{} exceeds {}",
                handle,
                offset,
                offset + size,
                analytics.allocated_memory
            );
        }

        analytics.used_memory = analytics.used_memory.max(offset + size);
        analytics.times_written += 1;
    }

    fn check_read(&self, handle: BufferHandle, offset: u64, size: u64) {
        let dictionary = self.analytics.get();
        let Some(analytics) = dictionary.get(&handle) else {
            panic!("Buffer read from unknown buffer {:?}", handle);
        };
        if offset + size > analytics.allocated_memory {
            panic!("Buffer read out of bounds for buffer {:?}", handle);
        }
    }

    fn remove(&self, handle: BufferHandle) -> bool {
        self.analytics.get_mut().remove(&handle).is_some()
    }

    fn get(&self, handle: BufferHandle) -> Option<BufferAnalytics> {
        self.analytics.get().get(&handle).copied()
    }

    fn count(&self) -> usize {
        self.analytics.get().len()
    }

    fn total_allocated(&self) -> u64 {
        self.analytics
            .get()
            .values()
            .fold(0, |acc, analytics| acc + analytics.allocated_memory)
    }

    fn total_used(&self) -> u64 {
        self.analytics
            .get()
            .values()
            .fold(0, |acc, analytics| acc + analytics.used_memory)
    }
}

/// Buffer device backed by wgpu.
///
/// # Examples
///
/// ```no_run
/// use voxel_chunk_graph::engine_state::buffer_state::{BufferDevice, WgpuBufferState};
///
/// let mut buffers = WgpuBufferState::request().unwrap();
/// let handle = buffers.create_buffer("Region Buffer", 4096);
/// buffers.write_buffer(handle, 0, &[0u8; 32]);
/// ```
pub struct WgpuBufferState {
    /// Reference to the GPU device
    pub device: Device,
    /// Reference to the GPU command queue
    pub queue: Queue,
    limits: wgpu::Limits,
    buffers: HashMap<BufferHandle, Buffer>,
    registry: BufferRegistry,
}

impl WgpuBufferState {
    /// Wraps an existing device and queue.
    pub fn new(device: Device, queue: Queue) -> Self {
        let limits = device.limits();
        Self {
            device,
            queue,
            limits,
            buffers: HashMap::new(),
            registry: BufferRegistry::default(),
        }
    }

    /// Creates a headless device on the best available adapter.
    ///
    /// # Errors
    /// Returns `Error::Gpu` if no adapter is available or device creation fails.
    pub fn request() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| Error::Gpu(e.to_string()))?;

        debug!("Using adapter {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Chunk Renderer Device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| Error::Gpu(e.to_string()))?;

        Ok(Self::new(device, queue))
    }

    /// What this device supports, for backend selection.
    pub fn capabilities(&self) -> GpuCapabilities {
        GpuCapabilities {
            large_buffers: self.limits.max_buffer_size >= LARGE_BUFFER_THRESHOLD,
            half_float_vertices: true,
            fog_distance: true,
        }
    }

    /// Gets a reference to a buffer
    ///
    /// # Returns
    ///
    /// `None` if the handle was destroyed or never created by this device
    pub fn get_buffer(&self, handle: BufferHandle) -> Option<&Buffer> {
        self.buffers.get(&handle)
    }
}

impl BufferDevice for WgpuBufferState {
    fn create_buffer(&mut self, label: &str, size: u64) -> BufferHandle {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let handle = self.registry.register(size);
        self.buffers.insert(handle, buffer);
        handle
    }

    fn write_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]) {
        self.registry.record_write(handle, offset, data.len() as u64);
        if let Some(buffer) = self.buffers.get(&handle) {
            self.queue.write_buffer(buffer, offset, data);
        }
    }

    fn copy_buffer(
        &mut self,
        source: BufferHandle,
        source_offset: u64,
        destination: BufferHandle,
        destination_offset: u64,
        size: u64,
    ) {
        self.registry.check_read(source, source_offset, size);
        self.registry.record_write(destination, destination_offset, size);

        let (Some(source_buffer), Some(destination_buffer)) =
            (self.buffers.get(&source), self.buffers.get(&destination))
        else {
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Buffer Copy Encoder"),
            });
        encoder.copy_buffer_to_buffer(
            source_buffer,
            source_offset,
            destination_buffer,
            destination_offset,
            size,
        );
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        self.registry.remove(handle);
        if let Some(buffer) = self.buffers.remove(&handle) {
            buffer.destroy();
        }
    }

    fn analytics(&self, handle: BufferHandle) -> Option<BufferAnalytics> {
        self.registry.get(handle)
    }

    fn buffer_count(&self) -> usize {
        self.registry.count()
    }

    fn total_allocated_memory(&self) -> u64 {
        self.registry.total_allocated()
    }

    fn total_used_memory(&self) -> u64 {
        self.registry.total_used()
    }
}

/// Buffer device that keeps contents in host memory.
///
/// Behaves like `WgpuBufferState`, including bounds panics, and lets callers read
/// back what was uploaded.
#[derive(Default)]
pub struct HostBufferState {
    buffers: HashMap<BufferHandle, Vec<u8>>,
    registry: BufferRegistry,
}

impl HostBufferState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of a live buffer.
    pub fn read_buffer(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle).map(Vec::as_slice)
    }
}

impl BufferDevice for HostBufferState {
    fn create_buffer(&mut self, _label: &str, size: u64) -> BufferHandle {
        let handle = self.registry.register(size);
        self.buffers.insert(handle, vec![0; size as usize]);
        handle
    }

    fn write_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]) {
        self.registry.record_write(handle, offset, data.len() as u64);
        if let Some(buffer) = self.buffers.get_mut(&handle) {
            let start = offset as usize;
            buffer[start..start + data.len()].copy_from_slice(data);
        }
    }

    fn copy_buffer(
        &mut self,
        source: BufferHandle,
        source_offset: u64,
        destination: BufferHandle,
        destination_offset: u64,
        size: u64,
    ) {
        self.registry.check_read(source, source_offset, size);
        let Some(source_buffer) = self.buffers.get(&source) else {
            return;
        };
        let start = source_offset as usize;
        let bytes = source_buffer[start..start + size as usize].to_vec();
        self.write_buffer(destination, destination_offset, &bytes);
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        self.registry.remove(handle);
        self.buffers.remove(&handle);
    }

    fn analytics(&self, handle: BufferHandle) -> Option<BufferAnalytics> {
        self.registry.get(handle)
    }

    fn buffer_count(&self) -> usize {
        self.registry.count()
    }

    fn total_allocated_memory(&self) -> u64 {
        self.registry.total_allocated()
    }

    fn total_used_memory(&self) -> u64 {
        self.registry.total_used()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_write_and_read_back() {
        let mut device = HostBufferState::new();
        let handle = device.create_buffer("test", 16);
        device.write_buffer(handle, 4, &[1, 2, 3, 4]);

        assert_eq!(device.read_buffer(handle).unwrap()[4..8], [1, 2, 3, 4]);
        let analytics = device.analytics(handle).unwrap();
        assert_eq!(analytics.used_memory, 8);
        assert_eq!(analytics.times_written, 1);
        assert_eq!(device.total_allocated_memory(), 16);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_write_out_of_bounds_panics() {
        let mut device = HostBufferState::new();
        let handle = device.create_buffer("test", 8);
        device.write_buffer(handle, 4, &[0; 8]);
    }

    #[test]
    fn test_copy_between_buffers() {
        let mut device = HostBufferState::new();
        let source = device.create_buffer("source", 8);
        let destination = device.create_buffer("destination", 16);
        device.write_buffer(source, 0, &[9; 8]);
        device.copy_buffer(source, 0, destination, 8, 8);

        assert_eq!(device.read_buffer(destination).unwrap()[8..], [9; 8]);
        assert_eq!(device.analytics(destination).unwrap().used_memory, 16);
        // Used memory is each buffer's high-water mark.
        assert_eq!(device.total_used_memory(), 24);
    }

    #[test]
    fn test_destroy_releases_memory() {
        let mut device = HostBufferState::new();
        let first = device.create_buffer("first", 32);
        let second = device.create_buffer("second", 64);
        assert_ne!(first, second);

        device.destroy_buffer(first);
        device.destroy_buffer(first);
        assert_eq!(device.buffer_count(), 1);
        assert_eq!(device.total_allocated_memory(), 64);
        assert!(device.read_buffer(first).is_none());
    }
}
