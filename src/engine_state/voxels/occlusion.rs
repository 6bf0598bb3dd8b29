//! # Occlusion Module
//!
//! Connectivity between the six faces of a chunk, derived from its opaque blocks.
//!
//! ## Key Components
//!
//! * `VisibilityData` - 6x6 bitmap of face pairs connected through open space
//! * `OcclusionDataBuilder` - flood fills the 16³ cells of a chunk to compute it
//!
//! ## Algorithm
//!
//! Every cell on the chunk's boundary that is not closed seeds a flood fill through
//! open cells. All faces touched by one connected component are mutually visible.
//! Mostly-open chunks (fewer than 256 closed cells) skip the fill and connect
//! everything; fully closed chunks connect nothing.

use std::collections::VecDeque;

use bitvec::prelude::*;

use super::{coord::CHUNK_SIZE, direction::Direction};

const SECTION_VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;
const MOSTLY_OPEN_THRESHOLD: usize = 256;

/// Which face pairs are visually connected through a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VisibilityData {
    bits: u64,
}

impl VisibilityData {
    /// Every face sees every other face.
    pub fn all() -> Self {
        Self {
            bits: (1u64 << (Direction::COUNT * Direction::COUNT)) - 1,
        }
    }

    /// No face sees any other face.
    pub fn none() -> Self {
        Self { bits: 0 }
    }

    fn bit(from: Direction, to: Direction) -> u64 {
        1u64 << (from as usize * Direction::COUNT + to as usize)
    }

    /// Connects two faces in both directions.
    pub fn set_visible_through(&mut self, from: Direction, to: Direction) {
        self.bits |= Self::bit(from, to) | Self::bit(to, from);
    }

    /// Whether something entering through `from` can leave through `to`.
    pub fn is_visible_through(&self, from: Direction, to: Direction) -> bool {
        self.bits & Self::bit(from, to) != 0
    }

    /// Connects every pair among `faces`.
    fn add_open_faces(&mut self, faces: &[bool; 6]) {
        for from in Direction::ALL {
            if !faces[from as usize] {
                continue;
            }
            for to in Direction::ALL {
                if faces[to as usize] {
                    self.set_visible_through(from, to);
                }
            }
        }
    }
}

impl Default for VisibilityData {
    fn default() -> Self {
        Self::all()
    }
}

/// Accumulates closed cells of one chunk and computes its [`VisibilityData`].
pub struct OcclusionDataBuilder {
    closed: BitArr!(for SECTION_VOLUME, in u64, Lsb0),
    open_count: usize,
}

impl Default for OcclusionDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OcclusionDataBuilder {
    pub fn new() -> Self {
        Self {
            closed: bitarr![u64, Lsb0; 0; SECTION_VOLUME],
            open_count: SECTION_VOLUME,
        }
    }

    fn pack(x: i32, y: i32, z: i32) -> usize {
        ((x & 15) | ((z & 15) << 4) | ((y & 15) << 8)) as usize
    }

    fn unpack(index: usize) -> (i32, i32, i32) {
        let index = index as i32;
        (index & 15, (index >> 8) & 15, (index >> 4) & 15)
    }

    /// Marks the cell at chunk-local `(x, y, z)` as opaque.
    pub fn mark_closed(&mut self, x: i32, y: i32, z: i32) {
        let index = Self::pack(x, y, z);
        if !self.closed[index] {
            self.closed.set(index, true);
            self.open_count -= 1;
        }
    }

    /// Computes the face connectivity of the chunk.
    pub fn build(mut self) -> VisibilityData {
        let mut data = VisibilityData::none();

        if SECTION_VOLUME - self.open_count < MOSTLY_OPEN_THRESHOLD {
            return VisibilityData::all();
        }

        if self.open_count == 0 {
            return data;
        }

        for index in 0..SECTION_VOLUME {
            let (x, y, z) = Self::unpack(index);
            if !Self::is_edge(x, y, z) || self.closed[index] {
                continue;
            }
            let faces = self.flood_fill(index);
            data.add_open_faces(&faces);
        }

        data
    }

    /// Faces reachable from the cell at chunk-local `(x, y, z)` through open cells.
    ///
    /// A closed starting cell reaches nothing.
    pub fn open_faces(mut self, x: i32, y: i32, z: i32) -> Vec<Direction> {
        let start = Self::pack(x, y, z);
        if self.closed[start] {
            return Vec::new();
        }
        let faces = self.flood_fill(start);
        Direction::ALL
            .into_iter()
            .filter(|direction| faces[*direction as usize])
            .collect()
    }

    fn is_edge(x: i32, y: i32, z: i32) -> bool {
        x == 0 || x == 15 || y == 0 || y == 15 || z == 0 || z == 15
    }

    /// Visits one open component, closing every cell on the way.
    fn flood_fill(&mut self, start: usize) -> [bool; 6] {
        let mut faces = [false; 6];
        let mut queue = VecDeque::new();
        queue.push_back(start);
        self.closed.set(start, true);

        while let Some(index) = queue.pop_front() {
            let (x, y, z) = Self::unpack(index);
            Self::touch_edge_faces(x, y, z, &mut faces);

            for direction in Direction::ALL {
                let offset = direction.offset();
                let (nx, ny, nz) = (x + offset.x, y + offset.y, z + offset.z);
                if !(0..CHUNK_SIZE).contains(&nx)
                    || !(0..CHUNK_SIZE).contains(&ny)
                    || !(0..CHUNK_SIZE).contains(&nz)
                {
                    continue;
                }
                let next = Self::pack(nx, ny, nz);
                if !self.closed[next] {
                    self.closed.set(next, true);
                    queue.push_back(next);
                }
            }
        }

        faces
    }

    fn touch_edge_faces(x: i32, y: i32, z: i32, faces: &mut [bool; 6]) {
        if x == 0 {
            faces[Direction::WEST as usize] = true;
        } else if x == 15 {
            faces[Direction::EAST as usize] = true;
        }
        if y == 0 {
            faces[Direction::DOWN as usize] = true;
        } else if y == 15 {
            faces[Direction::UP as usize] = true;
        }
        if z == 0 {
            faces[Direction::NORTH as usize] = true;
        } else if z == 15 {
            faces[Direction::SOUTH as usize] = true;
        }
    }
}
