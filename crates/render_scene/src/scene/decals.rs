//! Projected decals
//!
//! A decal is a box of size `scale` around its entity. The placement matrices
//! in [`DecalInfo`] are cached and refreshed whenever the entity moves or the
//! scale changes.

use super::render_scene::{component, component_mut, RenderScene};
use crate::assets::{lock_resources, Handle, Material, ResourceManager};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::{Mat4, Transform, Vec3};
use crate::spatial::Frustum;
use std::sync::Arc;

/// Cached placement of a decal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalInfo {
    /// World position of the box centre
    pub position: Vec3,
    /// Bounding sphere radius
    pub radius: f32,
    /// Unit box to world
    pub transform: Mat4,
    /// World to unit box
    pub inv_transform: Mat4,
    /// Projected material
    pub material: Option<Handle<Material>>,
}

impl Default for DecalInfo {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            radius: 0.0,
            transform: Mat4::identity(),
            inv_transform: Mat4::identity(),
            material: None,
        }
    }
}

/// Decal component
#[derive(Debug, Clone, PartialEq)]
pub struct Decal {
    pub(super) entity: Entity,
    pub(super) scale: Vec3,
    pub(super) material: Option<Handle<Material>>,
    pub(super) info: DecalInfo,
}

impl Decal {
    /// Owning entity
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Half extents of the projection box
    pub const fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Material reference
    pub const fn material(&self) -> Option<Handle<Material>> {
        self.material
    }

    /// Cached placement
    pub const fn info(&self) -> &DecalInfo {
        &self.info
    }
}

impl RenderScene {
    /// Add a unit decal without a material
    pub fn create_decal(&mut self, world: &mut World, entity: Entity) {
        self.decals.insert(
            entity,
            Decal {
                entity,
                scale: Vec3::new(1.0, 1.0, 1.0),
                material: None,
                info: DecalInfo::default(),
            },
        );
        self.update_decal_info(world, entity);
        world.on_component_created(entity, ComponentType::Decal);
    }

    /// Remove an entity's decal and release its material
    pub fn destroy_decal(&mut self, world: &mut World, entity: Entity) {
        self.destroy_component(world, ComponentType::Decal, entity);
    }

    pub(super) fn remove_decal(&mut self, res: &mut ResourceManager, entity: Entity) {
        if let Some(material) = self.decals.remove(&entity).and_then(|decal| decal.material) {
            res.unload(material);
        }
    }

    /// Decal component of an entity
    ///
    /// # Panics
    /// Panics if the entity has no decal.
    pub fn decal(&self, entity: Entity) -> &Decal {
        component(&self.decals, entity, ComponentType::Decal)
    }

    /// Entities with a decal
    pub fn decals(&self) -> impl Iterator<Item = Entity> + '_ {
        self.decals.keys().copied()
    }

    /// Cached placement of a decal
    pub fn decal_info(&self, entity: Entity) -> &DecalInfo {
        &self.decal(entity).info
    }

    pub(super) fn update_decal_info(&mut self, world: &World, entity: Entity) {
        let decal = component_mut(&mut self.decals, entity, ComponentType::Decal);
        let placement = Transform {
            scale: decal.scale,
            ..world.transform(entity)
        };
        let transform = placement.to_matrix();
        decal.info = DecalInfo {
            position: placement.position,
            radius: decal.scale.norm(),
            transform,
            inv_transform: transform.try_inverse().unwrap_or_else(Mat4::identity),
            material: decal.material,
        };
    }

    /// Assign the projected material by path; an empty path clears it
    pub fn set_decal_material_path(&mut self, world: &World, entity: Entity, path: &str) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let material = (!path.is_empty()).then(|| res.load::<Material>(path));
        self.set_decal_material(&mut res, entity, material);
        self.update_decal_info(world, entity);
    }

    /// Replace the material; takes ownership of one reference to `material`
    pub(super) fn set_decal_material(&mut self, res: &mut ResourceManager, entity: Entity, material: Option<Handle<Material>>) {
        let decal = component_mut(&mut self.decals, entity, ComponentType::Decal);
        if let Some(old) = std::mem::replace(&mut decal.material, material) {
            res.unload(old);
        }
        decal.info.material = material;
    }

    /// Path of the projected material, empty when none
    pub fn decal_material_path(&self, entity: Entity) -> String {
        self.decal(entity)
            .material
            .map(|material| lock_resources(&self.resources).path(material).to_string())
            .unwrap_or_default()
    }

    /// Half extents of the projection box
    pub fn decal_scale(&self, entity: Entity) -> Vec3 {
        self.decal(entity).scale
    }

    /// Resize the projection box
    pub fn set_decal_scale(&mut self, world: &World, entity: Entity, scale: Vec3) {
        component_mut(&mut self.decals, entity, ComponentType::Decal).scale = scale;
        self.update_decal_info(world, entity);
    }

    /// Decals whose bounding sphere intersects the frustum and whose material is ready
    pub fn decals_in_frustum(&self, frustum: &Frustum) -> Vec<DecalInfo> {
        let res = lock_resources(&self.resources);
        self.decals
            .values()
            .filter(|decal| decal.material.is_some_and(|material| res.is_ready(material)))
            .filter(|decal| frustum.intersects_sphere(decal.info.position, decal.info.radius))
            .map(|decal| decal.info)
            .collect()
    }
}
