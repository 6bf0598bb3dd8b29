//! View frustum and bounding boxes for culling.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3, Vector4};

/// Axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Box of half-extent `radius` around `center`.
    pub fn around(center: Point3<f32>, radius: f32) -> Self {
        let extent = Vector3::new(radius, radius, radius);
        Self::new(center - extent, center + extent)
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// A plane defined by normal and distance from origin
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vector3<f32>, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Point3<f32>) -> f32 {
        self.normal.x * point.x + self.normal.y * point.y + self.normal.z * point.z + self.distance
    }
}

/// Anything the traversal can test chunk bounds against.
pub trait FrustumTest {
    fn is_visible(&self, aabb: &Aabb) -> bool;
}

/// View frustum with 6 planes (Near, Far, Left, Right, Top, Bottom)
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix with a `[0, 1]` depth range.
    pub fn from_view_projection(vp: &Matrix4<f32>) -> Self {
        let row = |i: usize| Vector4::new(vp.x[i], vp.y[i], vp.z[i], vp.w[i]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let left = Self::normalize_plane(r3 + r0);
        let right = Self::normalize_plane(r3 - r0);
        let bottom = Self::normalize_plane(r3 + r1);
        let top = Self::normalize_plane(r3 - r1);
        let near = Self::normalize_plane(r2);
        let far = Self::normalize_plane(r3 - r2);

        Self {
            planes: [near, far, left, right, top, bottom],
        }
    }

    fn normalize_plane(plane: Vector4<f32>) -> Plane {
        let normal = plane.truncate();
        let len = normal.magnitude();
        Plane {
            normal: normal / len,
            distance: plane.w / len,
        }
    }

    /// Check if point is inside frustum
    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Check if AABB intersects frustum (conservative test)
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            // p-vertex: the corner furthest along the plane normal
            let p = Point3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }
}

impl FrustumTest for Frustum {
    fn is_visible(&self, aabb: &Aabb) -> bool {
        self.intersects_aabb(aabb)
    }
}

/// Accepts every box. Used when the host has no frustum, and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFrustum;

impl FrustumTest for NoFrustum {
    fn is_visible(&self, _aabb: &Aabb) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::camera_state::camera::{Camera, Projection};
    use cgmath::Deg;

    fn frustum_looking_east() -> Frustum {
        let camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(0.0), Deg(0.0));
        let projection = Projection::new(800, 600, Deg(70.0), 0.1, 500.0);
        Frustum::from_view_projection(&(projection.calc_matrix() * camera.calc_matrix()))
    }

    #[test]
    fn test_plane_distance() {
        let plane = Plane::new(Vector3::unit_y(), 0.0);
        assert_eq!(plane.distance_to_point(Point3::new(0.0, 5.0, 0.0)), 5.0);
        assert_eq!(plane.distance_to_point(Point3::new(0.0, -3.0, 0.0)), -3.0);
    }

    #[test]
    fn test_frustum_contains_point_ahead() {
        let frustum = frustum_looking_east();
        assert!(frustum.contains_point(Point3::new(10.0, 0.0, 0.0)));
        assert!(!frustum.contains_point(Point3::new(-10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_frustum_culls_box_behind_camera() {
        let frustum = frustum_looking_east();
        let ahead = Aabb::new(Point3::new(16.0, -8.0, -8.0), Point3::new(32.0, 8.0, 8.0));
        let behind = Aabb::new(Point3::new(-32.0, -8.0, -8.0), Point3::new(-16.0, 8.0, 8.0));
        assert!(frustum.intersects_aabb(&ahead));
        assert!(!frustum.intersects_aabb(&behind));
    }

    #[test]
    fn test_aabb_intersection() {
        let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::around(Point3::new(1.2, 0.5, 0.5), 0.5);
        let c = Aabb::around(Point3::new(3.0, 0.5, 0.5), 0.5);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
