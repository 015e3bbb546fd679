//! Global (directional) and point lights
//!
//! Point lights sit in a dense array for iteration with an entity → slot map
//! for lookups. Removal swaps the last light into the freed slot and repairs
//! that light's map entry.

use super::render_scene::{component, component_mut, missing_component, RenderScene};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::{Vec3, Vec4};
use crate::foundation::math::utils::deg_to_rad;
use crate::spatial::Frustum;

/// Directional light with fog and shadow cascade settings
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalLight {
    pub(super) entity: Entity,
    pub(super) diffuse_color: Vec3,
    pub(super) diffuse_intensity: f32,
    pub(super) indirect_intensity: f32,
    pub(super) fog_color: Vec3,
    pub(super) fog_density: f32,
    pub(super) fog_bottom: f32,
    pub(super) fog_height: f32,
    pub(super) cascades: Vec4,
}

impl GlobalLight {
    fn new(entity: Entity) -> Self {
        Self {
            entity,
            diffuse_color: Vec3::new(1.0, 1.0, 1.0),
            diffuse_intensity: 0.0,
            indirect_intensity: 1.0,
            fog_color: Vec3::new(1.0, 1.0, 1.0),
            fog_density: 0.0,
            fog_bottom: 0.0,
            fog_height: 10.0,
            cascades: Vec4::new(3.0, 8.0, 100.0, 300.0),
        }
    }

    /// Owning entity
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Diffuse colour
    pub const fn diffuse_color(&self) -> Vec3 {
        self.diffuse_color
    }

    /// Diffuse intensity
    pub const fn diffuse_intensity(&self) -> f32 {
        self.diffuse_intensity
    }

    /// Indirect (ambient) intensity
    pub const fn indirect_intensity(&self) -> f32 {
        self.indirect_intensity
    }

    /// Fog colour
    pub const fn fog_color(&self) -> Vec3 {
        self.fog_color
    }

    /// Fog density
    pub const fn fog_density(&self) -> f32 {
        self.fog_density
    }

    /// Height where fog starts
    pub const fn fog_bottom(&self) -> f32 {
        self.fog_bottom
    }

    /// Thickness of the fog layer
    pub const fn fog_height(&self) -> f32 {
        self.fog_height
    }

    /// Shadow cascade split distances
    pub const fn cascades(&self) -> Vec4 {
        self.cascades
    }
}

/// Local light with range-limited attenuation
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub(super) entity: Entity,
    pub(super) diffuse_color: Vec3,
    pub(super) diffuse_intensity: f32,
    pub(super) specular_color: Vec3,
    pub(super) specular_intensity: f32,
    pub(super) fov: f32,
    pub(super) attenuation_param: f32,
    pub(super) range: f32,
    pub(super) cast_shadows: bool,
}

impl PointLight {
    fn new(entity: Entity) -> Self {
        Self {
            entity,
            diffuse_color: Vec3::new(1.0, 1.0, 1.0),
            diffuse_intensity: 1.0,
            specular_color: Vec3::new(1.0, 1.0, 1.0),
            specular_intensity: 1.0,
            fov: deg_to_rad(360.0),
            attenuation_param: 2.0,
            range: 10.0,
            cast_shadows: false,
        }
    }

    /// Owning entity
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Diffuse colour
    pub const fn diffuse_color(&self) -> Vec3 {
        self.diffuse_color
    }

    /// Diffuse intensity
    pub const fn diffuse_intensity(&self) -> f32 {
        self.diffuse_intensity
    }

    /// Specular colour
    pub const fn specular_color(&self) -> Vec3 {
        self.specular_color
    }

    /// Specular intensity
    pub const fn specular_intensity(&self) -> f32 {
        self.specular_intensity
    }

    /// Cone angle in radians, 2π for omni lights
    pub const fn fov(&self) -> f32 {
        self.fov
    }

    /// Attenuation exponent
    pub const fn attenuation(&self) -> f32 {
        self.attenuation_param
    }

    /// Distance where the light fades to zero
    pub const fn range(&self) -> f32 {
        self.range
    }

    /// Whether the light renders a shadow map
    pub const fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }
}

/// Keep cascade splits positive and strictly increasing
fn clamp_cascades(cascades: Vec4) -> Vec4 {
    let x = cascades.x.max(0.02);
    let y = cascades.y.max(x + 0.01);
    let z = cascades.z.max(y + 0.01);
    let w = cascades.w.max(z + 0.01);
    Vec4::new(x, y, z, w)
}

impl RenderScene {
    /// Add a global light; it becomes active when it is the only one
    pub fn create_global_light(&mut self, world: &mut World, entity: Entity) {
        self.global_lights.insert(entity, GlobalLight::new(entity));
        if self.global_lights.len() == 1 {
            self.active_global_light = Some(entity);
        }
        world.on_component_created(entity, ComponentType::GlobalLight);
    }

    /// Remove an entity's global light
    pub fn destroy_global_light(&mut self, world: &mut World, entity: Entity) {
        self.destroy_component(world, ComponentType::GlobalLight, entity);
    }

    pub(super) fn remove_global_light(&mut self, entity: Entity) {
        self.global_lights.remove(&entity);
        if self.active_global_light == Some(entity) {
            self.active_global_light = None;
        }
    }

    /// Global light component of an entity
    ///
    /// # Panics
    /// Panics if the entity has no global light.
    pub fn global_light(&self, entity: Entity) -> &GlobalLight {
        component(&self.global_lights, entity, ComponentType::GlobalLight)
    }

    fn global_light_mut(&mut self, entity: Entity) -> &mut GlobalLight {
        component_mut(&mut self.global_lights, entity, ComponentType::GlobalLight)
    }

    /// Entities with a global light
    pub fn global_lights(&self) -> impl Iterator<Item = Entity> + '_ {
        self.global_lights.keys().copied()
    }

    /// Light used for the sun and fog
    pub const fn active_global_light(&self) -> Option<Entity> {
        self.active_global_light
    }

    /// Select the light used for the sun and fog
    pub fn set_active_global_light(&mut self, entity: Option<Entity>) {
        if let Some(entity) = entity {
            assert!(
                self.global_lights.contains_key(&entity),
                "entity {entity} has no global light component"
            );
        }
        self.active_global_light = entity;
    }

    /// Set the diffuse colour
    pub fn set_global_light_color(&mut self, entity: Entity, color: Vec3) {
        self.global_light_mut(entity).diffuse_color = color;
    }

    /// Set the diffuse intensity
    pub fn set_global_light_intensity(&mut self, entity: Entity, intensity: f32) {
        self.global_light_mut(entity).diffuse_intensity = intensity;
    }

    /// Set the indirect intensity
    pub fn set_global_light_indirect_intensity(&mut self, entity: Entity, intensity: f32) {
        self.global_light_mut(entity).indirect_intensity = intensity;
    }

    /// Set the fog colour
    pub fn set_fog_color(&mut self, entity: Entity, color: Vec3) {
        self.global_light_mut(entity).fog_color = color;
    }

    /// Set the fog density
    pub fn set_fog_density(&mut self, entity: Entity, density: f32) {
        self.global_light_mut(entity).fog_density = density;
    }

    /// Set the height where fog starts
    pub fn set_fog_bottom(&mut self, entity: Entity, bottom: f32) {
        self.global_light_mut(entity).fog_bottom = bottom;
    }

    /// Set the fog layer thickness
    pub fn set_fog_height(&mut self, entity: Entity, height: f32) {
        self.global_light_mut(entity).fog_height = height;
    }

    /// Shadow cascade split distances
    pub fn shadowmap_cascades(&self, entity: Entity) -> Vec4 {
        self.global_light(entity).cascades
    }

    /// Set cascade splits; they are clamped to stay positive and increasing
    pub fn set_shadowmap_cascades(&mut self, entity: Entity, cascades: Vec4) {
        self.global_light_mut(entity).cascades = clamp_cascades(cascades);
    }

    /// Add a point light
    pub fn create_point_light(&mut self, world: &mut World, entity: Entity) {
        assert!(
            !self.point_light_map.contains_key(&entity),
            "entity {entity} already has a point light"
        );
        self.point_light_map.insert(entity, self.point_lights.len());
        self.point_lights.push(PointLight::new(entity));
        world.on_component_created(entity, ComponentType::PointLight);
    }

    /// Remove an entity's point light
    pub fn destroy_point_light(&mut self, world: &mut World, entity: Entity) {
        self.destroy_component(world, ComponentType::PointLight, entity);
    }

    pub(super) fn remove_point_light(&mut self, entity: Entity) {
        let Some(index) = self.point_light_map.remove(&entity) else {
            return;
        };
        self.point_lights.swap_remove(index);
        if let Some(moved) = self.point_lights.get(index) {
            self.point_light_map.insert(moved.entity, index);
        }
    }

    fn point_light_index(&self, entity: Entity) -> usize {
        match self.point_light_map.get(&entity) {
            Some(&index) => index,
            None => missing_component(entity, ComponentType::PointLight),
        }
    }

    /// Point light component of an entity
    ///
    /// # Panics
    /// Panics if the entity has no point light.
    pub fn point_light(&self, entity: Entity) -> &PointLight {
        &self.point_lights[self.point_light_index(entity)]
    }

    fn point_light_mut(&mut self, entity: Entity) -> &mut PointLight {
        let index = self.point_light_index(entity);
        &mut self.point_lights[index]
    }

    /// All point lights in slot order
    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    /// Set the diffuse colour
    pub fn set_point_light_color(&mut self, entity: Entity, color: Vec3) {
        self.point_light_mut(entity).diffuse_color = color;
    }

    /// Set the diffuse intensity
    pub fn set_point_light_intensity(&mut self, entity: Entity, intensity: f32) {
        self.point_light_mut(entity).diffuse_intensity = intensity;
    }

    /// Set the specular colour
    pub fn set_point_light_specular_color(&mut self, entity: Entity, color: Vec3) {
        self.point_light_mut(entity).specular_color = color;
    }

    /// Set the specular intensity
    pub fn set_point_light_specular_intensity(&mut self, entity: Entity, intensity: f32) {
        self.point_light_mut(entity).specular_intensity = intensity;
    }

    /// Set the cone angle in radians
    pub fn set_point_light_fov(&mut self, entity: Entity, fov: f32) {
        self.point_light_mut(entity).fov = fov;
    }

    /// Set the attenuation exponent
    pub fn set_point_light_attenuation(&mut self, entity: Entity, attenuation: f32) {
        self.point_light_mut(entity).attenuation_param = attenuation;
    }

    /// Set the range
    pub fn set_point_light_range(&mut self, entity: Entity, range: f32) {
        self.point_light_mut(entity).range = range;
    }

    /// Enable or disable shadow casting
    pub fn set_point_light_cast_shadows(&mut self, entity: Entity, cast_shadows: bool) {
        self.point_light_mut(entity).cast_shadows = cast_shadows;
    }

    /// Point lights whose range sphere intersects the frustum
    pub fn point_lights_in_frustum(&self, world: &World, frustum: &Frustum) -> Vec<Entity> {
        self.point_lights
            .iter()
            .filter(|light| frustum.intersects_sphere(world.position(light.entity), light.range))
            .map(|light| light.entity)
            .collect()
    }

    /// Up to `max_lights` point lights closest to `position`, nearest first
    pub fn closest_point_lights(&self, world: &World, position: Vec3, max_lights: usize) -> Vec<Entity> {
        let mut lights: Vec<(f32, Entity)> = self
            .point_lights
            .iter()
            .map(|light| ((world.position(light.entity) - position).norm_squared(), light.entity))
            .collect();
        lights.sort_by(|a, b| a.0.total_cmp(&b.0));
        lights.truncate(max_lights);
        lights.into_iter().map(|(_, entity)| entity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascades_are_clamped_monotonic() {
        let clamped = clamp_cascades(Vec4::new(0.0, 0.0, 50.0, 10.0));
        assert!((clamped.x - 0.02).abs() < 1e-6);
        assert!((clamped.y - 0.03).abs() < 1e-6);
        assert!((clamped.z - 50.0).abs() < 1e-6);
        assert!((clamped.w - 50.01).abs() < 1e-4);
    }

    #[test]
    fn test_valid_cascades_are_kept() {
        let cascades = Vec4::new(3.0, 8.0, 100.0, 300.0);
        assert_eq!(clamp_cascades(cascades), cascades);
    }
}
