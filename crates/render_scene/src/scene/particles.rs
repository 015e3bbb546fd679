//! Particle emitters
//!
//! Particles spawn at the emitter at the resource's rate, move with a
//! constant velocity and expire after their lifetime.

use super::render_scene::{component, component_mut, RenderScene};
use crate::assets::{lock_resources, Handle, ParticleEmitterResource, ResourceManager};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::Vec3;
use std::sync::Arc;

/// One live particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// World position
    pub position: Vec3,
    /// Units per second
    pub velocity: Vec3,
    /// Seconds left before expiry
    pub life: f32,
}

/// Particle emitter component
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEmitter {
    pub(super) entity: Entity,
    pub(super) resource: Option<Handle<ParticleEmitterResource>>,
    pub(super) particles: Vec<Particle>,
    pub(super) spawn_accumulator: f32,
}

impl ParticleEmitter {
    fn new(entity: Entity) -> Self {
        Self {
            entity,
            resource: None,
            particles: Vec::new(),
            spawn_accumulator: 0.0,
        }
    }

    /// Owning entity
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Emitter description reference
    pub const fn resource(&self) -> Option<Handle<ParticleEmitterResource>> {
        self.resource
    }

    /// Live particles, unordered
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Advance the simulation by `dt` seconds, spawning at `origin`
    pub fn update(&mut self, dt: f32, description: &ParticleEmitterResource, origin: Vec3) {
        let mut i = 0;
        while i < self.particles.len() {
            let particle = &mut self.particles[i];
            particle.life -= dt;
            if particle.life <= 0.0 {
                self.particles.swap_remove(i);
                continue;
            }
            particle.position += particle.velocity * dt;
            i += 1;
        }

        self.spawn_accumulator += dt * description.spawn_rate.max(0.0);
        while self.spawn_accumulator >= 1.0 {
            self.spawn_accumulator -= 1.0;
            self.particles.push(Particle {
                position: origin,
                velocity: description.initial_velocity,
                life: description.lifetime,
            });
        }
    }

    fn reset(&mut self) {
        self.particles.clear();
        self.spawn_accumulator = 0.0;
    }
}

impl RenderScene {
    /// Add an emitter without a description
    pub fn create_particle_emitter(&mut self, world: &mut World, entity: Entity) {
        self.particle_emitters.insert(entity, ParticleEmitter::new(entity));
        world.on_component_created(entity, ComponentType::ParticleEmitter);
    }

    /// Remove an entity's emitter and release its description
    pub fn destroy_particle_emitter(&mut self, world: &mut World, entity: Entity) {
        self.destroy_component(world, ComponentType::ParticleEmitter, entity);
    }

    pub(super) fn remove_particle_emitter(&mut self, res: &mut ResourceManager, entity: Entity) {
        if let Some(resource) = self
            .particle_emitters
            .remove(&entity)
            .and_then(|emitter| emitter.resource)
        {
            res.unload(resource);
        }
    }

    /// Particle emitter component of an entity
    ///
    /// # Panics
    /// Panics if the entity has no emitter.
    pub fn particle_emitter(&self, entity: Entity) -> &ParticleEmitter {
        component(&self.particle_emitters, entity, ComponentType::ParticleEmitter)
    }

    /// All emitters, by entity
    pub fn particle_emitters(&self) -> impl Iterator<Item = &ParticleEmitter> + '_ {
        self.particle_emitters.values()
    }

    /// Path of the emitter description, empty when none
    pub fn particle_emitter_path(&self, entity: Entity) -> String {
        self.particle_emitter(entity)
            .resource
            .map(|resource| lock_resources(&self.resources).path(resource).to_string())
            .unwrap_or_default()
    }

    /// Assign the emitter description by path; an empty path clears it
    pub fn set_particle_emitter_path(&mut self, entity: Entity, path: &str) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let resource = (!path.is_empty()).then(|| res.load::<ParticleEmitterResource>(path));
        self.set_particle_emitter_resource(&mut res, entity, resource);
    }

    /// Replace the description; takes ownership of one reference to `resource`
    pub(super) fn set_particle_emitter_resource(
        &mut self,
        res: &mut ResourceManager,
        entity: Entity,
        resource: Option<Handle<ParticleEmitterResource>>,
    ) {
        let emitter = component_mut(&mut self.particle_emitters, entity, ComponentType::ParticleEmitter);
        emitter.reset();
        if let Some(old) = std::mem::replace(&mut emitter.resource, resource) {
            res.unload(old);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter() -> ParticleEmitter {
        ParticleEmitter::new(Entity::new(0))
    }

    #[test]
    fn test_spawn_rate_accumulates() {
        let description = ParticleEmitterResource {
            spawn_rate: 4.0,
            lifetime: 10.0,
            initial_velocity: Vec3::new(0.0, 1.0, 0.0),
        };
        let mut emitter = emitter();
        emitter.update(0.1, &description, Vec3::zeros());
        assert!(emitter.particles().is_empty());
        emitter.update(0.2, &description, Vec3::zeros());
        assert_eq!(emitter.particles().len(), 1);
        emitter.update(0.5, &description, Vec3::zeros());
        assert_eq!(emitter.particles().len(), 3);
    }

    #[test]
    fn test_particles_move_and_expire() {
        let description = ParticleEmitterResource {
            spawn_rate: 1.0,
            lifetime: 1.5,
            initial_velocity: Vec3::new(2.0, 0.0, 0.0),
        };
        let mut emitter = emitter();
        emitter.update(1.0, &description, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(emitter.particles().len(), 1);
        emitter.update(0.5, &description, Vec3::zeros());
        let particle = emitter.particles()[0];
        assert!((particle.position.x - 2.0).abs() < 1e-5);
        emitter.update(1.2, &description, Vec3::zeros());
        assert!(emitter.particles().iter().all(|p| p.life > 0.0));
        assert!(emitter.particles().len() <= 2);
    }
}
