//! Bounding volumes, planes and view frustums
//!
//! Frustum planes store inward-facing normals: a point is inside when
//! `normal · p + distance >= 0` for all six planes.

use crate::foundation::math::{Vec3, Vec4};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Grow the box by `amount` on every side
    pub fn expanded(&self, amount: f32) -> Self {
        let delta = Vec3::new(amount, amount, amount);
        Self::new(self.min - delta, self.max + delta)
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Test ray intersection with this AABB using slab method
    /// Returns the distance to the entry point if the ray intersects, None otherwise
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv = |d: f32| if d == 0.0 { f32::INFINITY } else { 1.0 / d };
        let inv_dir = Vec3::new(inv(ray_dir.x), inv(ray_dir.y), inv(ray_dir.z));

        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        for axis in 0..3 {
            // A zero direction component only hits when the origin lies inside that slab
            if ray_dir[axis] == 0.0 {
                if ray_origin[axis] < self.min[axis] || ray_origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (self.min[axis] - ray_origin[axis]) * inv_dir[axis];
            let t2 = (self.max[axis] - ray_origin[axis]) * inv_dir[axis];
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Signed distance term
    pub distance: f32,
}

impl Plane {
    /// Plane through `point` with the given normal
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: -normal.dot(&point),
        }
    }

    /// Signed distance from the plane to a point (positive on the normal side)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }

    /// Plane as `(nx, ny, nz, d)`
    pub fn as_vec4(&self) -> Vec4 {
        Vec4::new(self.normal.x, self.normal.y, self.normal.z, self.distance)
    }
}

/// Index of each frustum plane in [`Frustum::planes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum FrustumPlane {
    /// Near clip plane
    Near = 0,
    /// Far clip plane
    Far = 1,
    /// Left side
    Left = 2,
    /// Right side
    Right = 3,
    /// Top side
    Top = 4,
    /// Bottom side
    Bottom = 5,
}

/// Frustum for visibility culling
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes defining the frustum, indexed by [`FrustumPlane`]
    pub planes: [Plane; 6],
    /// Corner points: near plane (4) then far plane (4), each in
    /// (top-left, top-right, bottom-right, bottom-left) order
    pub points: [Vec3; 8],
    /// Eye position
    pub position: Vec3,
}

impl Frustum {
    /// Perspective frustum looking along `direction`
    pub fn perspective(
        position: Vec3,
        direction: Vec3,
        up: Vec3,
        fov: f32,
        ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let dir = direction.normalize();
        let right = dir.cross(&up).normalize();
        let up = right.cross(&dir);

        let tan = (fov * 0.5).tan();
        let near_center = position + dir * near;
        let far_center = position + dir * far;

        let right_edge = dir + right * (tan * ratio);
        let left_edge = dir - right * (tan * ratio);
        let top_edge = dir + up * tan;
        let bottom_edge = dir - up * tan;

        let planes = [
            Plane::from_point_normal(near_center, dir),
            Plane::from_point_normal(far_center, -dir),
            Plane::from_point_normal(position, left_edge.cross(&up)),
            Plane::from_point_normal(position, up.cross(&right_edge)),
            Plane::from_point_normal(position, top_edge.cross(&right)),
            Plane::from_point_normal(position, right.cross(&bottom_edge)),
        ];

        let near_h = near * tan;
        let far_h = far * tan;
        let points = Self::corners(near_center, far_center, right, up, near_h * ratio, near_h, far_h * ratio, far_h);

        Self {
            planes,
            points,
            position,
        }
    }

    /// Orthographic box looking along `direction`; `half_width`/`half_height` are half extents
    pub fn orthographic(
        position: Vec3,
        direction: Vec3,
        up: Vec3,
        half_width: f32,
        half_height: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let dir = direction.normalize();
        let right = dir.cross(&up).normalize();
        let up = right.cross(&dir);

        let near_center = position + dir * near;
        let far_center = position + dir * far;

        let planes = [
            Plane::from_point_normal(near_center, dir),
            Plane::from_point_normal(far_center, -dir),
            Plane::from_point_normal(position - right * half_width, right),
            Plane::from_point_normal(position + right * half_width, -right),
            Plane::from_point_normal(position + up * half_height, -up),
            Plane::from_point_normal(position - up * half_height, up),
        ];
        let points = Self::corners(
            near_center,
            far_center,
            right,
            up,
            half_width,
            half_height,
            half_width,
            half_height,
        );

        Self {
            planes,
            points,
            position,
        }
    }

    fn corners(
        near_center: Vec3,
        far_center: Vec3,
        right: Vec3,
        up: Vec3,
        near_w: f32,
        near_h: f32,
        far_w: f32,
        far_h: f32,
    ) -> [Vec3; 8] {
        [
            near_center + up * near_h - right * near_w,
            near_center + up * near_h + right * near_w,
            near_center - up * near_h + right * near_w,
            near_center - up * near_h - right * near_w,
            far_center + up * far_h - right * far_w,
            far_center + up * far_h + right * far_w,
            far_center - up * far_h + right * far_w,
            far_center - up * far_h - right * far_w,
        ]
    }

    /// Plane by role
    pub const fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    /// Check whether a sphere is inside or intersects the frustum
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(center) >= -radius)
    }

    /// Check if a point is inside the frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.intersects_sphere(point, 0.0)
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        for plane in &self.planes {
            // Corner furthest along the plane normal
            let mut p = aabb.min;
            if plane.normal.x >= 0.0 {
                p.x = aabb.max.x;
            }
            if plane.normal.y >= 0.0 {
                p.y = aabb.max.y;
            }
            if plane.normal.z >= 0.0 {
                p.z = aabb.max.z;
            }

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }
}

/// Half-line used for picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Direction (normalized for camera rays)
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t`
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Ray/sphere intersection; returns the entry parameter (0 when starting inside)
pub fn ray_sphere_intersection(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = center - origin;
    let a = dir.norm_squared();
    if a == 0.0 {
        return None;
    }
    let b = to_center.dot(&dir);
    let c = to_center.norm_squared() - radius * radius;
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let t_far = (b + sqrt_d) / a;
    if t_far < 0.0 {
        return None;
    }
    Some(((b - sqrt_d) / a).max(0.0))
}

/// Möller-Trumbore ray/triangle intersection, both faces, `t >= 0`
pub fn ray_triangle_intersection(origin: Vec3, dir: Vec3, p0: Vec3, p1: Vec3, p2: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;
    let h = dir.cross(&edge2);
    let det = edge1.dot(&h);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - p0;
    let u = inv_det * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&edge1);
    let v = inv_det * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = inv_det * edge2.dot(&q);
    (t >= 0.0).then_some(t)
}
