//! Spatial partitioning data structures
//!
//! Provides the culling interface used by the render scene, the octree that
//! backs it, and the bounding-volume math shared by culling and ray casts.

mod culling;
mod geometry;
mod octree;

pub use culling::{CullResults, CullingConfig, CullingSystem, OctreeCullingSystem, MAX_CULL_BUCKETS};
pub use geometry::{ray_sphere_intersection, ray_triangle_intersection, Frustum, FrustumPlane, Plane, Ray, AABB};
pub use octree::{Octree, OctreeConfig, OctreeEntity, OctreeNode};
