//! Visible-set construction and scene ray casts
//!
//! The visible-mesh query runs in three steps:
//! 1. the culling system returns candidates split into independent buckets
//! 2. buckets are processed in parallel on the rayon pool; each task only reads
//!    scene state and fills its own output list
//! 3. the per-bucket lists are concatenated in bucket order on the caller
//!
//! Bucket count is bounded by the culling configuration, which also bounds
//! the number of tasks per query.

use super::model_instances::ModelInstance;
use super::render_scene::RenderScene;
use crate::assets::{lock_resources, Handle, Material, Model, ResourceManager};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::Vec3;
use crate::spatial::{ray_sphere_intersection, Frustum};
use rayon::prelude::*;

/// One mesh to draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInstance {
    /// Entity owning the model instance
    pub owner: Entity,
    /// Model the mesh belongs to
    pub model: Handle<Model>,
    /// Index into the model's meshes
    pub mesh_index: usize,
    /// Material the mesh is drawn with
    pub material: Handle<Material>,
    /// Squared distance from the LOD reference point, scaled by the LOD multipliers
    pub depth: f32,
}

/// Closest intersection of a ray with scene geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastHit {
    /// Ray parameter of the hit
    pub t: f32,
    /// Entity that was hit
    pub entity: Entity,
    /// Kind of component that was hit
    pub component: ComponentType,
    /// Mesh index for model hits, `None` for terrain
    pub mesh: Option<usize>,
    /// Ray origin
    pub origin: Vec3,
    /// Ray direction
    pub dir: Vec3,
}

impl RayCastHit {
    /// World position of the hit
    pub fn position(&self) -> Vec3 {
        self.origin + self.dir * self.t
    }
}

/// Shared read-only state of one visible-mesh query
struct MeshQuery<'a> {
    world: &'a World,
    res: &'a ResourceManager,
    instances: &'a [ModelInstance],
    reference_point: Vec3,
    lod_scale: f32,
    layer_mask: u64,
}

impl MeshQuery<'_> {
    fn process_bucket(&self, bucket: &[Entity]) -> Vec<MeshInstance> {
        let mut output = Vec::with_capacity(bucket.len());
        for &entity in bucket {
            let Some(instance) = self
                .instances
                .get(entity.index())
                .filter(|r| r.entity == Some(entity))
            else {
                continue;
            };
            let Some(model) = instance.model else {
                continue;
            };
            let Some(data) = self.res.get(model) else {
                continue;
            };

            let depth = (self.world.position(entity) - self.reference_point).norm_squared() * self.lod_scale;
            let Some((from, to)) = data.lod_mesh_indices(depth) else {
                continue;
            };
            for mesh_index in from..=to {
                let Some((material, layer_mask)) = instance.mesh_material(data, mesh_index) else {
                    continue;
                };
                if layer_mask & self.layer_mask == 0 || !self.res.is_ready(material) {
                    continue;
                }
                output.push(MeshInstance {
                    owner: entity,
                    model,
                    mesh_index,
                    material,
                    depth,
                });
            }
        }
        output
    }
}

impl RenderScene {
    /// Meshes of the model instances inside the frustum, with LOD applied
    ///
    /// LOD distances are the squared distance to `lod_reference_point` scaled
    /// by the scene-wide multiplier and `lod_multiplier`. Only meshes whose
    /// layers intersect `layer_mask` and whose material is ready are emitted.
    pub fn model_instance_infos(
        &self,
        world: &World,
        frustum: &Frustum,
        lod_reference_point: Vec3,
        lod_multiplier: f32,
        layer_mask: u64,
    ) -> Vec<MeshInstance> {
        let buckets = self.culling.cull(frustum, layer_mask);
        let res = lock_resources(&self.resources);
        let query = MeshQuery {
            world,
            res: &res,
            instances: &self.model_instances,
            reference_point: lod_reference_point,
            lod_scale: self.global_lod_multiplier * lod_multiplier,
            layer_mask,
        };

        let partial: Vec<Vec<MeshInstance>> = buckets
            .par_iter()
            .map(|bucket| query.process_bucket(bucket))
            .collect();

        let total = partial.iter().map(Vec::len).sum();
        let mut merged = Vec::with_capacity(total);
        for bucket in partial {
            merged.extend(bucket);
        }
        log::trace!("Visible meshes: {total} from {} buckets", buckets.len());
        merged
    }

    /// Visible meshes as seen from a camera, using its LOD multiplier
    pub fn camera_visible_meshes(&self, world: &World, camera: Entity, layer_mask: u64) -> Vec<MeshInstance> {
        let frustum = self.camera_frustum(world, camera);
        let lod_multiplier = self.camera_lod_multiplier(camera);
        self.model_instance_infos(world, &frustum, world.position(camera), lod_multiplier, layer_mask)
    }

    /// Closest model or terrain hit along a ray, skipping `ignore`
    pub fn cast_ray(&self, world: &World, origin: Vec3, dir: Vec3, ignore: Option<Entity>) -> Option<RayCastHit> {
        let mut best = self.cast_ray_models(world, origin, dir, ignore);

        for entity in self.terrains.keys().copied().filter(|e| Some(*e) != ignore) {
            let Some(t) = self.cast_ray_terrain(world, entity, origin, dir) else {
                continue;
            };
            if best.map_or(true, |hit| t < hit.t) {
                best = Some(RayCastHit {
                    t,
                    entity,
                    component: ComponentType::Terrain,
                    mesh: None,
                    origin,
                    dir,
                });
            }
        }
        best
    }

    fn cast_ray_models(&self, world: &World, origin: Vec3, dir: Vec3, ignore: Option<Entity>) -> Option<RayCastHit> {
        let res = lock_resources(&self.resources);
        let mut best: Option<RayCastHit> = None;
        for entity in self.culling.ray_candidates(origin, dir) {
            if Some(entity) == ignore || !world.is_valid(entity) {
                continue;
            }
            let Some(instance) = self.model_instance_slot(entity) else {
                continue;
            };
            let Some(data) = instance.model.and_then(|model| res.get(model)) else {
                continue;
            };
            let Some((center, radius)) = self.culling.sphere(entity) else {
                continue;
            };
            let Some(sphere_t) = ray_sphere_intersection(origin, dir, center, radius) else {
                continue;
            };
            if best.is_some_and(|hit| hit.t < sphere_t) {
                continue;
            }

            let transform = world.transform(entity);
            let inv_rotation = transform.rotation.inverse();
            let inv_scale = transform.scale.map(|s| 1.0 / s);
            let local_origin = inv_scale.component_mul(&(inv_rotation * (origin - transform.position)));
            let local_dir = inv_scale.component_mul(&(inv_rotation * dir));
            let Some(hit) = data.cast_ray(&local_origin, &local_dir, instance.pose.as_ref()) else {
                continue;
            };
            if best.map_or(true, |b| hit.t < b.t) {
                best = Some(RayCastHit {
                    t: hit.t,
                    entity,
                    component: ComponentType::ModelInstance,
                    mesh: Some(hit.mesh_index),
                    origin,
                    dir,
                });
            }
        }
        best
    }
}
