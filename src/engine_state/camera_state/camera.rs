//! # Camera Implementation
//!
//! Camera position, orientation and projection as seen by the chunk renderer.
//!
//! ## Key Components
//! - `Camera`: position and orientation in world space
//! - `Projection`: perspective projection settings

use cgmath::*;
use std::f32::consts::FRAC_PI_2;

use crate::engine_state::voxels::{coord::ChunkCoordinate, direction::Direction};

/// Transformation matrix to convert from OpenGL's coordinate system to WGPU's.
///
/// Scales Z from [-1, 1] to [-0.5, 0.5] and then translates it to [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,  // Scale Z from [-1,1] to [-0.5,0.5]
    0.0, 0.0, 0.5, 1.0,  // Translate Z from [-0.5,0.5] to [0,1]
);

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// A first-person camera in 3D space.
///
/// A yaw of zero looks along positive X; positive yaw turns towards positive Z.
///
/// # Fields
/// - `position`: The camera's position in world space
/// - `yaw`: Horizontal rotation (around Y axis) in radians
/// - `pitch`: Vertical rotation (around X axis) in radians
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// The camera's position in world space
    pub position: Point3<f32>,
    /// Horizontal rotation (around Y axis) in radians
    pub yaw: Rad<f32>,
    /// Vertical rotation (around X axis) in radians
    pub pitch: Rad<f32>,
}

impl Camera {
    /// Creates a new camera with the specified position and orientation.
    ///
    /// # Arguments
    /// * `position` - Initial position of the camera in world space
    /// * `yaw` - Initial yaw (horizontal rotation around Y axis)
    /// * `pitch` - Initial pitch, clamped just short of straight up or down
    ///
    /// # Example
    /// ```rust
    /// use cgmath::{Deg, Point3};
    /// use voxel_chunk_graph::engine_state::camera_state::camera::Camera;
    ///
    /// let camera = Camera::new(Point3::new(8.0, 72.0, 8.0), Deg(0.0), Deg(0.0));
    /// assert_eq!(camera.chunk_coordinate().y, 4);
    /// ```
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        let pitch = pitch.into();
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: Rad(pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2)),
        }
    }

    /// The normalized direction the camera looks at.
    pub fn forward(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.0.sin_cos();
        Vector3::new(yaw_cos * pitch_cos, pitch_sin, yaw_sin * pitch_cos).normalize()
    }

    /// The view direction projected onto the horizontal plane.
    pub fn horizontal_plane(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        Vector3::new(yaw_cos, 0.0, yaw_sin)
    }

    /// The horizontal face the camera is looking towards.
    pub fn horizontal_facing(&self) -> Direction {
        Direction::facing(self.horizontal_plane())
    }

    /// The integer position of the block containing the camera.
    pub fn block_position(&self) -> Point3<i32> {
        Point3::new(
            self.position.x.floor() as i32,
            self.position.y.floor() as i32,
            self.position.z.floor() as i32,
        )
    }

    /// The chunk containing the camera.
    pub fn chunk_coordinate(&self) -> ChunkCoordinate {
        ChunkCoordinate::from_position(self.position)
    }

    /// Calculates the view matrix for this camera.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }

    /// Moves the camera by `offset` in world space.
    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.position += offset;
    }

    /// Turns the camera by the given yaw and pitch deltas.
    pub fn rotate(&mut self, yaw: Rad<f32>, pitch: Rad<f32>) {
        self.yaw += yaw;
        self.pitch = Rad((self.pitch + pitch).0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }
}

/// Perspective projection settings.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    /// Creates a projection for a viewport of `width` x `height` pixels.
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Updates the aspect ratio after a viewport resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Combines the perspective projection with the OpenGL to WGPU coordinate system transform.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}
