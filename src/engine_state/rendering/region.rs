//! Memory management for chunk meshes packed into shared region buffers.
//!
//! The world is partitioned into fixed-size regions of chunks. Each region owns a
//! single vertex buffer that holds the meshes of all its chunks back to back, which
//! lets the batched backend draw a whole region from one buffer binding.
//!
//! # Allocation Strategy
//! - Each chunk gets one contiguous range holding all of its layers
//! - Ranges are first-fit from a sorted free list and aligned to the vertex stride
//! - Freed ranges are merged with their neighbours
//! - A region that runs out of space doubles its buffer and copies the old contents
//!   on the device
//! - Empty regions are released by `cleanup()`

use std::collections::HashMap;

use cgmath::Vector3;
use log::debug;

use crate::{
    engine_state::{
        buffer_state::{BufferDevice, BufferHandle},
        rendering::{meshing::mesh_info::MeshInfo, render_pass::BlockRenderPass},
        voxels::coord::{ChunkCoordinate, CHUNK_SIZE},
    },
    error::{Error, Result},
};

/// Vertices reserved the first time a region buffer is created
const INITIAL_REGION_VERTICES: u64 = 4 * 1024;

/// Identifies a region by its position on the region grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionIndex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Where one render pass of a chunk lives inside its region buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerAllocation {
    pub pass: BlockRenderPass,
    /// Byte offset from the start of the region buffer
    pub offset: u64,
    pub vertex_count: u32,
}

/// A chunk's allocation inside a region.
#[derive(Clone, Debug)]
pub struct ChunkSlot {
    pub coord: ChunkCoordinate,
    pub layers: Vec<LayerAllocation>,
    start: u64,
    size: u64,
}

impl ChunkSlot {
    pub fn layer(&self, pass: BlockRenderPass) -> Option<&LayerAllocation> {
        self.layers.iter().find(|layer| layer.pass == pass)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FreeRange {
    start: u64,
    size: u64,
}

/// The shared buffer of one region and the chunks packed into it.
pub struct ChunkRegion {
    origin: ChunkCoordinate,
    dimensions: [u32; 3],
    stride: u64,
    slots: Vec<Option<ChunkSlot>>,
    buffer: Option<BufferHandle>,
    capacity: u64,
    free_ranges: Vec<FreeRange>,
}

impl ChunkRegion {
    fn new(origin: ChunkCoordinate, dimensions: [u32; 3], stride: u32) -> Self {
        let volume = dimensions.iter().map(|&dim| dim as usize).product();
        Self {
            origin,
            dimensions,
            stride: stride as u64,
            slots: vec![None; volume],
            buffer: None,
            capacity: 0,
            free_ranges: Vec::new(),
        }
    }

    /// The chunk coordinate of the region's minimum corner.
    pub fn origin(&self) -> ChunkCoordinate {
        self.origin
    }

    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// Size of the region buffer in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn slot(&self, coord: ChunkCoordinate) -> Option<&ChunkSlot> {
        self.slots[self.local_index(coord)].as_ref()
    }

    pub fn chunk_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Bytes not covered by any chunk allocation.
    pub fn free_bytes(&self) -> u64 {
        self.free_ranges.iter().map(|range| range.size).sum()
    }

    fn local_index(&self, coord: ChunkCoordinate) -> usize {
        let [dx, dy, dz] = self.dimensions.map(|dim| dim as i32);
        let x = (coord.x & (dx - 1)) as usize;
        let y = (coord.y & (dy - 1)) as usize;
        let z = (coord.z & (dz - 1)) as usize;
        (x * dy as usize + y) * dz as usize + z
    }

    /// Uploads every layer of `mesh` into one contiguous range.
    ///
    /// Any previous allocation for `coord` is released first. Empty meshes only
    /// release.
    ///
    /// # Arguments
    /// * `device` - Buffer device that owns the region buffer
    /// * `coord` - Chunk being uploaded; must lie inside this region
    /// * `mesh` - Finished mesh whose layers are all encoded with this region's stride
    ///
    /// # Returns
    /// The new slot, or `None` when the mesh has nothing to draw
    pub fn allocate(
        &mut self,
        device: &mut dyn BufferDevice,
        coord: ChunkCoordinate,
        mesh: &MeshInfo,
    ) -> Option<&ChunkSlot> {
        self.free(coord);

        let size: u64 = mesh.layers().iter().map(|layer| layer.data.len() as u64).sum();
        if size == 0 {
            return None;
        }
        let size = size.div_ceil(self.stride) * self.stride;

        let start = self.take_range(device, size);
        let buffer = self.buffer?;

        let mut offset = start;
        let mut layers = Vec::with_capacity(mesh.layers().len());
        for layer in mesh.layers() {
            device.write_buffer(buffer, offset, &layer.data);
            layers.push(LayerAllocation {
                pass: layer.pass,
                offset,
                vertex_count: layer.vertex_count,
            });
            offset += layer.data.len() as u64;
        }

        let index = self.local_index(coord);
        self.slots[index] = Some(ChunkSlot {
            coord,
            layers,
            start,
            size,
        });
        self.slots[index].as_ref()
    }

    /// Releases the allocation of `coord`, if any.
    pub fn free(&mut self, coord: ChunkCoordinate) -> bool {
        let index = self.local_index(coord);
        let Some(slot) = self.slots[index].take() else {
            return false;
        };
        self.release_range(FreeRange {
            start: slot.start,
            size: slot.size,
        });
        true
    }

    fn take_range(&mut self, device: &mut dyn BufferDevice, size: u64) -> u64 {
        loop {
            if let Some(position) = self.free_ranges.iter().position(|range| range.size >= size) {
                let range = &mut self.free_ranges[position];
                let start = range.start;
                range.start += size;
                range.size -= size;
                if range.size == 0 {
                    self.free_ranges.remove(position);
                }
                return start;
            }

            let initial = self.stride * INITIAL_REGION_VERTICES;
            let mut new_capacity = (self.capacity * 2).max(initial);
            while new_capacity - self.capacity + self.trailing_free() < size {
                new_capacity *= 2;
            }
            self.grow(device, new_capacity);
        }
    }

    fn trailing_free(&self) -> u64 {
        self.free_ranges
            .last()
            .filter(|range| range.start + range.size == self.capacity)
            .map_or(0, |range| range.size)
    }

    fn grow(&mut self, device: &mut dyn BufferDevice, new_capacity: u64) {
        debug!(
            "Growing region buffer at {:?} from {} to {} bytes",
            self.origin, self.capacity, new_capacity
        );

        let buffer = device.create_buffer("Chunk Region Buffer", new_capacity);
        if let Some(old_buffer) = self.buffer.take() {
            device.copy_buffer(old_buffer, 0, buffer, 0, self.capacity);
            device.destroy_buffer(old_buffer);
        }
        self.buffer = Some(buffer);

        let old_capacity = self.capacity;
        self.capacity = new_capacity;
        self.release_range(FreeRange {
            start: old_capacity,
            size: new_capacity - old_capacity,
        });
    }

    fn release_range(&mut self, range: FreeRange) {
        let position = self
            .free_ranges
            .partition_point(|existing| existing.start < range.start);
        self.free_ranges.insert(position, range);

        if position + 1 < self.free_ranges.len() {
            let next = self.free_ranges[position + 1];
            if range.start + range.size == next.start {
                self.free_ranges[position].size += next.size;
                self.free_ranges.remove(position + 1);
            }
        }
        if position > 0 {
            let previous = self.free_ranges[position - 1];
            if previous.start + previous.size == self.free_ranges[position].start {
                self.free_ranges[position - 1].size += self.free_ranges[position].size;
                self.free_ranges.remove(position);
            }
        }
    }

    fn delete(&mut self, device: &mut dyn BufferDevice) {
        if let Some(buffer) = self.buffer.take() {
            device.destroy_buffer(buffer);
        }
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.free_ranges.clear();
        self.capacity = 0;
    }
}

/// Maps chunk coordinates to regions and owns every region buffer.
pub struct ChunkRegionManager {
    dimensions: [u32; 3],
    shifts: [u32; 3],
    stride: u32,
    regions: HashMap<RegionIndex, ChunkRegion>,
}

impl ChunkRegionManager {
    /// Creates a manager for regions of `dimensions` chunks.
    ///
    /// # Arguments
    /// * `dimensions` - Region size in chunks along x, y and z
    /// * `stride` - Vertex stride of the meshes stored in the regions
    ///
    /// # Errors
    /// Returns `Error::Config` unless every dimension is a power of two.
    pub fn new(dimensions: [u32; 3], stride: u32) -> Result<Self> {
        if dimensions.iter().any(|dim| !dim.is_power_of_two()) {
            return Err(Error::Config(format!(
                "region size {:?} must be made of powers of two",
                dimensions
            )));
        }

        Ok(Self {
            dimensions,
            shifts: dimensions.map(u32::trailing_zeros),
            stride,
            regions: HashMap::new(),
        })
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// The region containing `coord`.
    pub fn get_index(&self, coord: ChunkCoordinate) -> RegionIndex {
        RegionIndex {
            x: coord.x >> self.shifts[0],
            y: coord.y >> self.shifts[1],
            z: coord.z >> self.shifts[2],
        }
    }

    /// The minimum chunk coordinate of the region containing `coord`.
    pub fn region_origin(&self, coord: ChunkCoordinate) -> ChunkCoordinate {
        let index = self.get_index(coord);
        ChunkCoordinate::new(
            index.x << self.shifts[0],
            index.y << self.shifts[1],
            index.z << self.shifts[2],
        )
    }

    /// Block offset of `coord` from the origin of its region.
    pub fn get_render_offset(&self, coord: ChunkCoordinate) -> Vector3<i32> {
        let origin = self.region_origin(coord);
        Vector3::new(
            (coord.x - origin.x) * CHUNK_SIZE,
            (coord.y - origin.y) * CHUNK_SIZE,
            (coord.z - origin.z) * CHUNK_SIZE,
        )
    }

    /// Returns the region containing `coord`, creating it if needed.
    pub fn create_region(&mut self, coord: ChunkCoordinate) -> &mut ChunkRegion {
        let index = self.get_index(coord);
        let origin = self.region_origin(coord);
        let (dimensions, stride) = (self.dimensions, self.stride);
        self.regions
            .entry(index)
            .or_insert_with(|| ChunkRegion::new(origin, dimensions, stride))
    }

    pub fn get_region(&self, coord: ChunkCoordinate) -> Option<&ChunkRegion> {
        self.regions.get(&self.get_index(coord))
    }

    pub fn get_region_mut(&mut self, coord: ChunkCoordinate) -> Option<&mut ChunkRegion> {
        let index = self.get_index(coord);
        self.regions.get_mut(&index)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Deletes every region that holds no chunk.
    ///
    /// # Returns
    /// Number of regions removed
    pub fn cleanup(&mut self, device: &mut dyn BufferDevice) -> usize {
        let empty: Vec<RegionIndex> = self
            .regions
            .iter()
            .filter(|(_, region)| region.is_empty())
            .map(|(index, _)| *index)
            .collect();

        for index in &empty {
            if let Some(mut region) = self.regions.remove(index) {
                region.delete(device);
            }
        }

        if !empty.is_empty() {
            debug!("Removed {} empty regions", empty.len());
        }
        empty.len()
    }

    /// Releases every region buffer.
    pub fn delete(&mut self, device: &mut dyn BufferDevice) {
        for (_, mut region) in self.regions.drain() {
            region.delete(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine_state::{
        buffer_state::HostBufferState,
        rendering::{meshing::mesh_info::MeshLayer, vertex::VertexFormatKind},
        voxels::occlusion::VisibilityData,
    };

    const STRIDE: u32 = 32;

    fn mesh(vertices: &[(BlockRenderPass, u32)], fill: u8) -> MeshInfo {
        let layers = vertices
            .iter()
            .map(|&(pass, count)| MeshLayer {
                pass,
                format: VertexFormatKind::Wide,
                data: Arc::from(vec![fill; (count * STRIDE) as usize]),
                vertex_count: count,
            })
            .collect();
        MeshInfo::new(layers, VisibilityData::all(), vec![], vec![], vec![])
    }

    #[test]
    fn test_region_index_uses_power_of_two_shifts() {
        let manager = ChunkRegionManager::new([4, 2, 8], STRIDE).unwrap();
        assert_eq!(
            manager.get_index(ChunkCoordinate::new(-1, 3, 9)),
            RegionIndex { x: -1, y: 1, z: 1 }
        );
        assert_eq!(
            manager.region_origin(ChunkCoordinate::new(-1, 3, 9)),
            ChunkCoordinate::new(-4, 2, 8)
        );
        assert_eq!(
            manager.get_render_offset(ChunkCoordinate::new(-1, 3, 9)),
            Vector3::new(48, 16, 16)
        );
    }

    #[test]
    fn test_non_power_of_two_is_rejected() {
        assert!(matches!(
            ChunkRegionManager::new([4, 3, 4], STRIDE),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_allocate_writes_layers_back_to_back() {
        let mut device = HostBufferState::new();
        let mut manager = ChunkRegionManager::new([4, 4, 4], STRIDE).unwrap();
        let coord = ChunkCoordinate::new(1, 2, 3);
        let mesh = mesh(
            &[(BlockRenderPass::Solid, 4), (BlockRenderPass::Translucent, 8)],
            7,
        );

        let region = manager.create_region(coord);
        let slot = region.allocate(&mut device, coord, &mesh).unwrap().clone();
        let solid = slot.layer(BlockRenderPass::Solid).unwrap();
        let translucent = slot.layer(BlockRenderPass::Translucent).unwrap();
        assert_eq!(translucent.offset, solid.offset + 4 * STRIDE as u64);
        assert_eq!(translucent.vertex_count, 8);

        let buffer = region.buffer().unwrap();
        let contents = device.read_buffer(buffer).unwrap();
        assert!(contents[..12 * STRIDE as usize].iter().all(|&byte| byte == 7));
    }

    #[test]
    fn test_freed_ranges_are_reused() {
        let mut device = HostBufferState::new();
        let mut manager = ChunkRegionManager::new([4, 4, 4], STRIDE).unwrap();
        let first = ChunkCoordinate::new(0, 0, 0);
        let second = ChunkCoordinate::new(1, 0, 0);
        let mesh = mesh(&[(BlockRenderPass::Solid, 6)], 1);

        let region = manager.create_region(first);
        region.allocate(&mut device, first, &mesh);
        region.allocate(&mut device, second, &mesh);
        assert!(region.free(first));
        let reused = region.allocate(&mut device, first, &mesh).unwrap();
        assert_eq!(reused.layers[0].offset, 0);
        assert_eq!(region.chunk_count(), 2);
    }

    #[test]
    fn test_region_grows_and_keeps_contents() {
        let mut device = HostBufferState::new();
        let mut manager = ChunkRegionManager::new([4, 4, 4], STRIDE).unwrap();
        let small = ChunkCoordinate::new(0, 0, 0);
        let large = ChunkCoordinate::new(0, 0, 1);

        let region = manager.create_region(small);
        region.allocate(&mut device, small, &mesh(&[(BlockRenderPass::Solid, 4)], 3));
        let initial_capacity = region.capacity();

        region.allocate(
            &mut device,
            large,
            &mesh(&[(BlockRenderPass::Solid, INITIAL_REGION_VERTICES as u32 * 3)], 5),
        );
        assert!(region.capacity() > initial_capacity);
        assert_eq!(device.buffer_count(), 1);

        let contents = device.read_buffer(region.buffer().unwrap()).unwrap();
        assert!(contents[..4 * STRIDE as usize].iter().all(|&byte| byte == 3));
        assert_eq!(
            region.free_bytes() + 4 * STRIDE as u64 + INITIAL_REGION_VERTICES * 3 * STRIDE as u64,
            region.capacity()
        );
    }

    #[test]
    fn test_cleanup_removes_empty_regions() {
        let mut device = HostBufferState::new();
        let mut manager = ChunkRegionManager::new([2, 2, 2], STRIDE).unwrap();
        let kept = ChunkCoordinate::new(0, 0, 0);
        let dropped = ChunkCoordinate::new(4, 0, 0);
        let mesh = mesh(&[(BlockRenderPass::Solid, 4)], 1);

        manager.create_region(kept).allocate(&mut device, kept, &mesh);
        manager.create_region(dropped).allocate(&mut device, dropped, &mesh);
        manager.get_region_mut(dropped).unwrap().free(dropped);

        assert_eq!(manager.cleanup(&mut device), 1);
        assert_eq!(manager.region_count(), 1);
        assert_eq!(device.buffer_count(), 1);

        manager.delete(&mut device);
        assert_eq!(device.buffer_count(), 0);
    }
}
