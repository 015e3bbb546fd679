//! Octree spatial partitioning structure
//!
//! Efficiently divides 3D space into hierarchical regions for fast
//! frustum and ray queries. Each node subdivides into 8 octants when entity
//! density exceeds a threshold. Entities are stored by their center, so
//! queries expand node bounds by the largest radius seen.

use super::geometry::{Frustum, AABB};
use crate::ecs::Entity;
use crate::foundation::math::Vec3;

/// Configuration for octree behavior
#[derive(Debug, Clone)]
pub struct OctreeConfig {
    /// Maximum entities per node before subdivision
    pub max_entities_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum node size (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

/// Entity stored in octree with bounding sphere and render layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeEntity {
    /// Owning entity
    pub id: Entity,
    /// Bounding sphere center
    pub position: Vec3,
    /// Bounding sphere radius
    pub radius: f32,
    /// Render layers the entity draws into
    pub layer_mask: u64,
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,

    /// Entities contained in this node (if leaf)
    pub entities: Vec<OctreeEntity>,

    /// Child nodes (8 octants), None if this is a leaf
    pub children: Option<Box<[OctreeNode; 8]>>,

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

/// Octant index (0-7) of `position` relative to `center`
///
/// Bit 0 is +X, bit 1 is +Y, bit 2 is +Z.
fn octant_index(center: &Vec3, position: &Vec3) -> usize {
    let x_bit = usize::from(position.x >= center.x);
    let y_bit = usize::from(position.y >= center.y);
    let z_bit = usize::from(position.z >= center.z);
    (z_bit << 2) | (y_bit << 1) | x_bit
}

impl OctreeNode {
    /// Create a new leaf node
    pub const fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            entities: Vec::new(),
            children: None,
            depth,
        }
    }

    /// Check if this node is a leaf (has no children)
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Subdivide this node into 8 children
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }

        let center = self.bounds.center();
        let quarter_extents = self.bounds.extents() * 0.5;
        let depth = self.depth + 1;

        let mut children: Box<[Self; 8]> = Box::new(std::array::from_fn(|octant| {
            let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
            let child_center = Vec3::new(
                quarter_extents.x.mul_add(sign(1), center.x),
                quarter_extents.y.mul_add(sign(2), center.y),
                quarter_extents.z.mul_add(sign(4), center.z),
            );
            Self::new(AABB::from_center_extents(child_center, quarter_extents), depth)
        }));

        for entity in std::mem::take(&mut self.entities) {
            children[octant_index(&center, &entity.position)].entities.push(entity);
        }
        self.children = Some(children);
    }

    /// Insert an entity into this node
    pub fn insert(&mut self, entity: OctreeEntity, config: &OctreeConfig) -> bool {
        if !self.bounds.contains_point(entity.position) {
            return false;
        }

        if self.is_leaf() {
            let should_subdivide = self.entities.len() >= config.max_entities_per_node
                && self.depth < config.max_depth
                && self.bounds.extents().x > config.min_node_size;

            if !should_subdivide {
                self.entities.push(entity);
                return true;
            }
            self.subdivide();
        }

        let center = self.bounds.center();
        match self.children {
            Some(ref mut children) => children[octant_index(&center, &entity.position)].insert(entity, config),
            None => false,
        }
    }

    /// Remove an entity from this node
    pub fn remove(&mut self, entity_id: Entity, position: &Vec3) -> bool {
        if let Some(index) = self.entities.iter().position(|e| e.id == entity_id) {
            self.entities.swap_remove(index);
            return true;
        }

        // Descend along the stored position first, fall back to a full search
        let center = self.bounds.center();
        if let Some(ref mut children) = self.children {
            let hint = octant_index(&center, position);
            if children[hint].remove(entity_id, position) {
                return true;
            }
            return children
                .iter_mut()
                .enumerate()
                .any(|(octant, child)| octant != hint && child.remove(entity_id, position));
        }

        false
    }

    /// Collect entities whose sphere intersects the frustum, grouped by leaf
    pub fn query_frustum(
        &self,
        frustum: &Frustum,
        layer_mask: u64,
        max_entity_radius: f32,
        visit: &mut dyn FnMut(&[Entity]),
    ) {
        if !frustum.intersects_aabb(&self.bounds.expanded(max_entity_radius)) {
            return;
        }

        let visible: Vec<Entity> = self
            .entities
            .iter()
            .filter(|e| e.layer_mask & layer_mask != 0 && frustum.intersects_sphere(e.position, e.radius))
            .map(|e| e.id)
            .collect();
        if !visible.is_empty() {
            visit(&visible);
        }

        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.query_frustum(frustum, layer_mask, max_entity_radius, visit);
            }
        }
    }

    /// Query all entities in nodes the ray passes through, accounting for entity radius
    pub fn query_ray(&self, ray_origin: Vec3, ray_dir: Vec3, max_entity_radius: f32, results: &mut Vec<OctreeEntity>) {
        if self
            .bounds
            .expanded(max_entity_radius)
            .intersect_ray(ray_origin, ray_dir)
            .is_none()
        {
            return;
        }

        results.extend_from_slice(&self.entities);

        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.query_ray(ray_origin, ray_dir, max_entity_radius, results);
            }
        }
    }

    /// Count total entities in this node and all children
    pub fn count_entities(&self) -> usize {
        self.entities.len()
            + self
                .children
                .as_ref()
                .map_or(0, |children| children.iter().map(Self::count_entities).sum())
    }
}

/// Octree spatial partitioning structure
#[derive(Debug, Clone)]
pub struct Octree {
    /// Root node containing the entire world space
    pub root: OctreeNode,

    /// Configuration
    config: OctreeConfig,

    /// Cached maximum entity radius in the tree (grows on insert, reset on clear)
    max_entity_radius: f32,
}

impl Octree {
    /// Create a new octree with given world bounds
    pub const fn new(world_bounds: AABB, config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(world_bounds, 0),
            config,
            max_entity_radius: 0.0,
        }
    }

    /// World bounds covered by the tree
    pub const fn bounds(&self) -> &AABB {
        &self.root.bounds
    }

    /// Insert an entity into the octree; returns false when it lies outside the bounds
    pub fn insert(&mut self, entity: OctreeEntity) -> bool {
        if entity.radius > self.max_entity_radius {
            self.max_entity_radius = entity.radius;
        }
        self.root.insert(entity, &self.config)
    }

    /// Remove an entity from the octree
    pub fn remove(&mut self, entity_id: Entity, position: &Vec3) -> bool {
        self.root.remove(entity_id, position)
    }

    /// Visit entities inside the frustum, one slice per octree leaf
    pub fn query_frustum(&self, frustum: &Frustum, layer_mask: u64, visit: &mut dyn FnMut(&[Entity])) {
        self.root.query_frustum(frustum, layer_mask, self.max_entity_radius, visit);
    }

    /// Query all entities that potentially intersect a ray
    ///
    /// For actual intersection testing, you still need to test each entity individually
    pub fn query_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Vec<OctreeEntity> {
        let mut results = Vec::new();
        self.root.query_ray(ray_origin, ray_dir, self.max_entity_radius, &mut results);
        results
    }

    /// Get total entity count
    pub fn entity_count(&self) -> usize {
        self.root.count_entities()
    }

    /// Clear the octree
    pub fn clear(&mut self) {
        self.root = OctreeNode::new(self.root.bounds, 0);
        self.max_entity_radius = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::World;

    fn bounds() -> AABB {
        AABB::new(Vec3::new(-100.0, -100.0, -100.0), Vec3::new(100.0, 100.0, 100.0))
    }

    fn item(id: Entity, position: Vec3) -> OctreeEntity {
        OctreeEntity {
            id,
            position,
            radius: 1.0,
            layer_mask: 1,
        }
    }

    #[test]
    fn test_octree_basic_insertion() {
        let mut octree = Octree::new(bounds(), OctreeConfig::default());
        let mut world = World::new();

        let entity = world.create_entity();
        assert!(octree.insert(item(entity, Vec3::zeros())));
        assert_eq!(octree.entity_count(), 1);
        assert!(!octree.insert(item(entity, Vec3::new(500.0, 0.0, 0.0))));
    }

    #[test]
    fn test_octree_subdivision_and_removal() {
        let config = OctreeConfig {
            max_entities_per_node: 4,
            max_depth: 3,
            min_node_size: 1.0,
        };
        let mut octree = Octree::new(bounds(), config);
        let mut world = World::new();

        let entities: Vec<Entity> = (0..10).map(|_| world.create_entity()).collect();
        for (i, entity) in entities.iter().enumerate() {
            octree.insert(item(*entity, Vec3::new(i as f32 * 7.0 - 30.0, 0.0, 0.0)));
        }

        assert_eq!(octree.entity_count(), 10);
        assert!(octree.root.children.is_some());

        assert!(octree.remove(entities[3], &Vec3::new(-9.0, 0.0, 0.0)));
        assert!(!octree.remove(entities[3], &Vec3::new(-9.0, 0.0, 0.0)));
        assert_eq!(octree.entity_count(), 9);
    }

    #[test]
    fn test_octree_ray_query_finds_candidates() {
        let mut octree = Octree::new(bounds(), OctreeConfig::default());
        let mut world = World::new();
        let near = world.create_entity();
        let far = world.create_entity();
        octree.insert(item(near, Vec3::new(10.0, 0.0, 0.0)));
        octree.insert(item(far, Vec3::new(-50.0, 50.0, 50.0)));

        let hits = octree.query_ray(Vec3::new(-99.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(hits.iter().any(|e| e.id == near));
    }
}
