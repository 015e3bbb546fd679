//! Culling system interface consumed by the render scene
//!
//! The scene only registers bounding spheres and asks "what intersects this
//! frustum". Results come back already split into independent buckets so the
//! caller can post-process them in parallel.
//!
//! This abstraction allows swapping different spatial partitioning schemes
//! (octree, grid, BVH, etc.) without changing the scene.

use super::geometry::{Frustum, AABB};
use super::octree::{Octree, OctreeConfig, OctreeEntity};
use crate::ecs::Entity;
use crate::foundation::math::Vec3;
use std::collections::HashMap;

/// Hard upper bound on buckets returned by one cull
pub const MAX_CULL_BUCKETS: usize = 64;

/// Culled entities, one inner list per independent bucket
pub type CullResults = Vec<Vec<Entity>>;

/// Spatial index answering frustum queries filtered by render layers
pub trait CullingSystem: Send + Sync {
    /// Register an entity's bounding sphere
    fn add(&mut self, entity: Entity, position: Vec3, radius: f32, layer_mask: u64);

    /// Unregister an entity; no-op when absent
    fn remove(&mut self, entity: Entity);

    /// Whether the entity is registered
    fn is_added(&self, entity: Entity) -> bool;

    /// Move a registered entity
    fn set_position(&mut self, entity: Entity, position: Vec3);

    /// Resize a registered entity's bounding sphere
    fn set_radius(&mut self, entity: Entity, radius: f32);

    /// Change a registered entity's render layers
    fn set_layer_mask(&mut self, entity: Entity, layer_mask: u64);

    /// Entities whose sphere intersects the frustum and whose layers intersect `layer_mask`
    fn cull(&self, frustum: &Frustum, layer_mask: u64) -> CullResults;

    /// Registered entities a ray might hit (broad phase only)
    fn ray_candidates(&self, origin: Vec3, dir: Vec3) -> Vec<Entity>;

    /// Bounding sphere of a registered entity
    fn sphere(&self, entity: Entity) -> Option<(Vec3, f32)>;

    /// Remove everything
    fn clear(&mut self);

    /// Number of registered entities
    fn len(&self) -> usize;

    /// Whether nothing is registered
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tuning for [`OctreeCullingSystem`]
#[derive(Debug, Clone)]
pub struct CullingConfig {
    /// Region covered by the octree; entities outside it are kept in a flat list
    pub bounds: AABB,
    /// Octree subdivision settings
    pub octree: OctreeConfig,
    /// Entities per bucket before a new bucket is started
    pub bucket_capacity: usize,
    /// Maximum bucket count (clamped to [`MAX_CULL_BUCKETS`])
    pub max_buckets: usize,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            bounds: AABB::new(Vec3::new(-4096.0, -4096.0, -4096.0), Vec3::new(4096.0, 4096.0, 4096.0)),
            octree: OctreeConfig::default(),
            bucket_capacity: 256,
            max_buckets: MAX_CULL_BUCKETS,
        }
    }
}

/// Octree-based implementation of [`CullingSystem`]
pub struct OctreeCullingSystem {
    octree: Octree,
    /// Entities whose center lies outside the octree bounds
    overflow: Vec<OctreeEntity>,
    /// Cache of entity data for quick lookups
    entity_cache: HashMap<Entity, OctreeEntity>,
    bucket_capacity: usize,
    max_buckets: usize,
}

impl OctreeCullingSystem {
    /// Create an empty culling system
    pub fn new(config: CullingConfig) -> Self {
        log::debug!("Creating OctreeCullingSystem with config: {config:?}");
        Self {
            octree: Octree::new(config.bounds, config.octree),
            overflow: Vec::new(),
            entity_cache: HashMap::new(),
            bucket_capacity: config.bucket_capacity.max(1),
            max_buckets: config.max_buckets.clamp(1, MAX_CULL_BUCKETS),
        }
    }

    fn insert_item(&mut self, item: OctreeEntity) {
        if !self.octree.insert(item) {
            self.overflow.push(item);
        }
        self.entity_cache.insert(item.id, item);
    }

    fn remove_item(&mut self, entity: Entity) -> Option<OctreeEntity> {
        let item = self.entity_cache.remove(&entity)?;
        if !self.octree.remove(entity, &item.position) {
            if let Some(index) = self.overflow.iter().position(|e| e.id == entity) {
                self.overflow.swap_remove(index);
            }
        }
        Some(item)
    }

    /// Octree requires remove + re-insert for updates
    fn update_item(&mut self, entity: Entity, update: impl FnOnce(&mut OctreeEntity)) {
        if let Some(mut item) = self.remove_item(entity) {
            update(&mut item);
            self.insert_item(item);
        }
    }
}

impl Default for OctreeCullingSystem {
    fn default() -> Self {
        Self::new(CullingConfig::default())
    }
}

/// Packs leaf slices into at most `max_buckets` buckets of roughly `capacity` entities
struct BucketWriter {
    buckets: CullResults,
    capacity: usize,
    max_buckets: usize,
}

impl BucketWriter {
    fn push_slice(&mut self, entities: &[Entity]) {
        for &entity in entities {
            let start_new = match self.buckets.last() {
                None => true,
                Some(last) => last.len() >= self.capacity && self.buckets.len() < self.max_buckets,
            };
            if start_new {
                self.buckets.push(Vec::with_capacity(self.capacity));
            }
            if let Some(last) = self.buckets.last_mut() {
                last.push(entity);
            }
        }
    }
}

impl CullingSystem for OctreeCullingSystem {
    fn add(&mut self, entity: Entity, position: Vec3, radius: f32, layer_mask: u64) {
        debug_assert!(!self.is_added(entity), "entity {entity} added to culling twice");
        self.insert_item(OctreeEntity {
            id: entity,
            position,
            radius,
            layer_mask,
        });
    }

    fn remove(&mut self, entity: Entity) {
        self.remove_item(entity);
    }

    fn is_added(&self, entity: Entity) -> bool {
        self.entity_cache.contains_key(&entity)
    }

    fn set_position(&mut self, entity: Entity, position: Vec3) {
        self.update_item(entity, |item| item.position = position);
    }

    fn set_radius(&mut self, entity: Entity, radius: f32) {
        self.update_item(entity, |item| item.radius = radius);
    }

    fn set_layer_mask(&mut self, entity: Entity, layer_mask: u64) {
        self.update_item(entity, |item| item.layer_mask = layer_mask);
    }

    fn cull(&self, frustum: &Frustum, layer_mask: u64) -> CullResults {
        let mut writer = BucketWriter {
            buckets: Vec::new(),
            capacity: self.bucket_capacity,
            max_buckets: self.max_buckets,
        };

        let outside: Vec<Entity> = self
            .overflow
            .iter()
            .filter(|e| e.layer_mask & layer_mask != 0 && frustum.intersects_sphere(e.position, e.radius))
            .map(|e| e.id)
            .collect();
        writer.push_slice(&outside);

        self.octree
            .query_frustum(frustum, layer_mask, &mut |leaf: &[Entity]| writer.push_slice(leaf));
        writer.buckets
    }

    fn ray_candidates(&self, origin: Vec3, dir: Vec3) -> Vec<Entity> {
        self.overflow
            .iter()
            .map(|e| e.id)
            .chain(self.octree.query_ray(origin, dir).into_iter().map(|e| e.id))
            .collect()
    }

    fn sphere(&self, entity: Entity) -> Option<(Vec3, f32)> {
        self.entity_cache.get(&entity).map(|e| (e.position, e.radius))
    }

    fn clear(&mut self) {
        self.octree.clear();
        self.overflow.clear();
        self.entity_cache.clear();
    }

    fn len(&self) -> usize {
        self.entity_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::World;
    use crate::foundation::math::utils::deg_to_rad;

    fn forward_frustum() -> Frustum {
        Frustum::perspective(
            Vec3::zeros(),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(0.0, 1.0, 0.0),
            deg_to_rad(90.0),
            1.0,
            0.1,
            1000.0,
        )
    }

    #[test]
    fn test_culling_insert_remove() {
        let mut world = World::new();
        let mut culling = OctreeCullingSystem::default();

        let entity = world.create_entity();
        culling.add(entity, Vec3::zeros(), 5.0, 1);
        assert!(culling.is_added(entity));
        assert_eq!(culling.len(), 1);

        culling.remove(entity);
        assert!(!culling.is_added(entity));
        assert!(culling.is_empty());
    }

    #[test]
    fn test_cull_filters_by_frustum_and_layer() {
        let mut world = World::new();
        let mut culling = OctreeCullingSystem::default();

        let visible = world.create_entity();
        let behind = world.create_entity();
        let other_layer = world.create_entity();
        culling.add(visible, Vec3::new(0.0, 0.0, -10.0), 1.0, 0b01);
        culling.add(behind, Vec3::new(0.0, 0.0, 10.0), 1.0, 0b01);
        culling.add(other_layer, Vec3::new(0.0, 0.0, -20.0), 1.0, 0b10);

        let results: Vec<Entity> = culling.cull(&forward_frustum(), 0b01).concat();
        assert_eq!(results, vec![visible]);
    }

    #[test]
    fn test_entities_outside_bounds_are_still_culled() {
        let mut world = World::new();
        let mut culling = OctreeCullingSystem::new(CullingConfig {
            bounds: AABB::new(Vec3::new(-10.0, -10.0, -10.0), Vec3::new(10.0, 10.0, 10.0)),
            ..CullingConfig::default()
        });
        let far = world.create_entity();
        culling.add(far, Vec3::new(0.0, 0.0, -500.0), 1.0, 1);
        assert_eq!(culling.cull(&forward_frustum(), 1).concat(), vec![far]);

        culling.set_position(far, Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(culling.sphere(far), Some((Vec3::new(0.0, 0.0, -5.0), 1.0)));
        assert_eq!(culling.cull(&forward_frustum(), 1).concat(), vec![far]);

        culling.set_position(far, Vec3::new(0.0, 0.0, 5.0));
        assert!(culling.cull(&forward_frustum(), 1).is_empty());
    }

    #[test]
    fn test_bucket_count_is_bounded() {
        let mut world = World::new();
        let mut culling = OctreeCullingSystem::new(CullingConfig {
            bucket_capacity: 1,
            max_buckets: 4,
            ..CullingConfig::default()
        });
        for i in 0..20 {
            let entity = world.create_entity();
            culling.add(entity, Vec3::new(i as f32, 0.0, -10.0 - i as f32), 0.5, 1);
        }
        let buckets = culling.cull(&forward_frustum(), 1);
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), 20);
    }
}
