//! Particle emitter resource

use crate::foundation::math::Vec3;

/// Emitter description loaded from disk
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEmitterResource {
    /// Particles spawned per second
    pub spawn_rate: f32,
    /// Seconds each particle lives
    pub lifetime: f32,
    /// Velocity given to new particles
    pub initial_velocity: Vec3,
}

impl Default for ParticleEmitterResource {
    fn default() -> Self {
        Self {
            spawn_rate: 10.0,
            lifetime: 1.0,
            initial_velocity: Vec3::new(0.0, 1.0, 0.0),
        }
    }
}
