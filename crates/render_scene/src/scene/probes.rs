//! Environment probes
//!
//! Each probe owns up to three baked cubemap textures. Their paths are derived
//! from the probe GUID, so a probe can be re-pointed at freshly baked data with
//! [`RenderScene::reload_environment_probe`].

use super::render_scene::{component, component_mut, RenderScene};
use crate::assets::{lock_resources, Handle, ResourceManager, Texture};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::Vec3;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Environment probe options
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProbeFlags: u32 {
        /// Bake and use a specular reflection cubemap
        const REFLECTION = 1 << 0;
        /// Use the per-probe sizes instead of the global ones
        const OVERRIDE_GLOBAL_SIZE = 1 << 1;
        /// Probe contributes to lighting
        const ENABLED = 1 << 2;
    }
}

impl Default for ProbeFlags {
    fn default() -> Self {
        Self::ENABLED
    }
}

/// Environment probe component
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentProbe {
    pub(super) entity: Entity,
    pub(super) guid: u64,
    pub(super) flags: ProbeFlags,
    pub(super) radius: f32,
    pub(super) radiance_size: u32,
    pub(super) irradiance_size: u32,
    pub(super) reflection_size: u32,
    pub(super) reflection: Option<Handle<Texture>>,
    pub(super) irradiance: Option<Handle<Texture>>,
    pub(super) radiance: Option<Handle<Texture>>,
}

impl EnvironmentProbe {
    /// Owning entity
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Identifier naming the baked texture files
    pub const fn guid(&self) -> u64 {
        self.guid
    }

    /// Option bits
    pub const fn flags(&self) -> ProbeFlags {
        self.flags
    }

    /// Influence radius
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Reflection cubemap
    pub const fn reflection(&self) -> Option<Handle<Texture>> {
        self.reflection
    }

    /// Diffuse irradiance cubemap
    pub const fn irradiance(&self) -> Option<Handle<Texture>> {
        self.irradiance
    }

    /// Prefiltered radiance cubemap
    pub const fn radiance(&self) -> Option<Handle<Texture>> {
        self.radiance
    }

    fn release_textures(&mut self, res: &mut ResourceManager) {
        for texture in [self.reflection.take(), self.irradiance.take(), self.radiance.take()]
            .into_iter()
            .flatten()
        {
            res.unload(texture);
        }
    }
}

/// Probe data handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeInfo {
    /// Owning entity
    pub entity: Entity,
    /// World position
    pub position: Vec3,
    /// Influence radius
    pub radius: f32,
    /// Reflection cubemap, when the probe bakes one
    pub reflection: Option<Handle<Texture>>,
    /// Diffuse irradiance cubemap
    pub irradiance: Option<Handle<Texture>>,
    /// Prefiltered radiance cubemap
    pub radiance: Option<Handle<Texture>>,
}

impl RenderScene {
    /// Add a probe with a fresh GUID, pointing at the placeholder texture
    pub fn create_environment_probe(&mut self, world: &mut World, entity: Entity) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let placeholder = self.config.default_probe_texture.clone();
        let probe = EnvironmentProbe {
            entity,
            guid: rand::random(),
            flags: ProbeFlags::default(),
            radius: 1.0,
            radiance_size: 128,
            irradiance_size: 32,
            reflection_size: 1024,
            reflection: Some(res.load::<Texture>(&placeholder)),
            irradiance: Some(res.load::<Texture>(&placeholder)),
            radiance: Some(res.load::<Texture>(&placeholder)),
        };
        log::debug!("Created environment probe {:x} on {entity}", probe.guid);
        self.environment_probes.insert(entity, probe);
        world.on_component_created(entity, ComponentType::EnvironmentProbe);
    }

    /// Remove an entity's probe and release its textures
    pub fn destroy_environment_probe(&mut self, world: &mut World, entity: Entity) {
        self.destroy_component(world, ComponentType::EnvironmentProbe, entity);
    }

    pub(super) fn remove_environment_probe(&mut self, res: &mut ResourceManager, entity: Entity) {
        if let Some(mut probe) = self.environment_probes.remove(&entity) {
            probe.release_textures(res);
        }
    }

    /// Environment probe component of an entity
    ///
    /// # Panics
    /// Panics if the entity has no probe.
    pub fn environment_probe(&self, entity: Entity) -> &EnvironmentProbe {
        component(&self.environment_probes, entity, ComponentType::EnvironmentProbe)
    }

    fn environment_probe_mut(&mut self, entity: Entity) -> &mut EnvironmentProbe {
        component_mut(&mut self.environment_probes, entity, ComponentType::EnvironmentProbe)
    }

    /// Enabled probes with their world positions
    pub fn environment_probes(&self, world: &World) -> Vec<ProbeInfo> {
        self.environment_probes
            .values()
            .filter(|probe| probe.flags.contains(ProbeFlags::ENABLED))
            .map(|probe| ProbeInfo {
                entity: probe.entity,
                position: world.position(probe.entity),
                radius: probe.radius,
                reflection: probe.reflection,
                irradiance: probe.irradiance,
                radiance: probe.radiance,
            })
            .collect()
    }

    /// Directory holding the baked probe textures of a world
    pub fn probe_directory(&self, world: &World) -> String {
        format!("{}/{}/probes", self.config.probe_root, world.name())
    }

    /// Point a probe at the textures baked for its GUID
    pub fn reload_environment_probe(&mut self, world: &World, entity: Entity) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        self.load_probe_textures(world, &mut res, entity);
    }

    pub(super) fn load_probe_textures(&mut self, world: &World, res: &mut ResourceManager, entity: Entity) {
        let directory = self.probe_directory(world);
        let probe = self.environment_probe_mut(entity);
        probe.release_textures(res);
        let guid = probe.guid;
        if probe.flags.contains(ProbeFlags::REFLECTION) {
            probe.reflection = Some(res.load(&format!("{directory}/{guid}.dds")));
        }
        probe.irradiance = Some(res.load(&format!("{directory}/{guid}_irradiance.dds")));
        probe.radiance = Some(res.load(&format!("{directory}/{guid}_radiance.dds")));
    }

    /// Probe GUID
    pub fn environment_probe_guid(&self, entity: Entity) -> u64 {
        self.environment_probe(entity).guid
    }

    /// Option bits
    pub fn environment_probe_flags(&self, entity: Entity) -> ProbeFlags {
        self.environment_probe(entity).flags
    }

    /// Whether the probe contributes to lighting
    pub fn is_environment_probe_enabled(&self, entity: Entity) -> bool {
        self.environment_probe(entity).flags.contains(ProbeFlags::ENABLED)
    }

    /// Enable or disable a probe
    pub fn enable_environment_probe(&mut self, entity: Entity, enable: bool) {
        self.environment_probe_mut(entity).flags.set(ProbeFlags::ENABLED, enable);
    }

    /// Whether the probe bakes a reflection cubemap
    pub fn is_environment_probe_reflection_enabled(&self, entity: Entity) -> bool {
        self.environment_probe(entity).flags.contains(ProbeFlags::REFLECTION)
    }

    /// Enable or disable the reflection cubemap
    pub fn enable_environment_probe_reflection(&mut self, entity: Entity, enable: bool) {
        self.environment_probe_mut(entity).flags.set(ProbeFlags::REFLECTION, enable);
    }

    /// Whether the per-probe sizes are used
    pub fn is_environment_probe_custom_size(&self, entity: Entity) -> bool {
        self.environment_probe(entity)
            .flags
            .contains(ProbeFlags::OVERRIDE_GLOBAL_SIZE)
    }

    /// Use or ignore the per-probe sizes
    pub fn enable_environment_probe_custom_size(&mut self, entity: Entity, enable: bool) {
        self.environment_probe_mut(entity)
            .flags
            .set(ProbeFlags::OVERRIDE_GLOBAL_SIZE, enable);
    }

    /// Influence radius
    pub fn environment_probe_radius(&self, entity: Entity) -> f32 {
        self.environment_probe(entity).radius
    }

    /// Set the influence radius
    pub fn set_environment_probe_radius(&mut self, entity: Entity, radius: f32) {
        self.environment_probe_mut(entity).radius = radius;
    }

    /// Radiance cubemap size in pixels
    pub fn environment_probe_radiance_size(&self, entity: Entity) -> u32 {
        self.environment_probe(entity).radiance_size
    }

    /// Set the radiance cubemap size
    pub fn set_environment_probe_radiance_size(&mut self, entity: Entity, size: u32) {
        self.environment_probe_mut(entity).radiance_size = size;
    }

    /// Irradiance cubemap size in pixels
    pub fn environment_probe_irradiance_size(&self, entity: Entity) -> u32 {
        self.environment_probe(entity).irradiance_size
    }

    /// Set the irradiance cubemap size
    pub fn set_environment_probe_irradiance_size(&mut self, entity: Entity, size: u32) {
        self.environment_probe_mut(entity).irradiance_size = size;
    }

    /// Reflection cubemap size in pixels
    pub fn environment_probe_reflection_size(&self, entity: Entity) -> u32 {
        self.environment_probe(entity).reflection_size
    }

    /// Set the reflection cubemap size
    pub fn set_environment_probe_reflection_size(&mut self, entity: Entity, size: u32) {
        self.environment_probe_mut(entity).reflection_size = size;
    }

    /// Reflection cubemap
    pub fn environment_probe_texture(&self, entity: Entity) -> Option<Handle<Texture>> {
        self.environment_probe(entity).reflection
    }

    /// Diffuse irradiance cubemap
    pub fn environment_probe_irradiance(&self, entity: Entity) -> Option<Handle<Texture>> {
        self.environment_probe(entity).irradiance
    }

    /// Prefiltered radiance cubemap
    pub fn environment_probe_radiance(&self, entity: Entity) -> Option<Handle<Texture>> {
        self.environment_probe(entity).radiance
    }
}
