//! Render scene: owner of every renderable component
//!
//! Following Game Engine Architecture Chapter 16.2 - Runtime Object Model
//! Architectures (property-centric component tables).
//!
//! The [`RenderScene`] stores one table per component kind, keyed by
//! [`Entity`](crate::ecs::Entity). It takes references on the resources its
//! components use, listens to their state changes, keeps the culling system in
//! step with entity moves, and saves/loads itself in two formats:
//! - a binary stream for whole scenes ([`RenderScene::serialize`])
//! - named-field records per component for undo and copy/paste
//!   ([`RenderScene::serialize_component`])
//!
//! **Ownership**: the scene never owns the [`World`](crate::ecs::World); every
//! operation that reads transforms or announces component changes borrows it.

mod binary_format;
mod bone_attachments;
mod cameras;
mod decals;
mod lights;
mod model_instances;
mod particles;
mod probes;
mod properties;
mod render_scene;
mod terrain;
mod text_meshes;
mod visibility;

#[cfg(test)]
mod tests;

pub use bone_attachments::BoneAttachment;
pub use cameras::Camera;
pub use decals::{Decal, DecalInfo};
pub use lights::{GlobalLight, PointLight};
pub use model_instances::{CustomMesh, MeshBinding, ModelInstance, ModelInstanceFlags};
pub use particles::{Particle, ParticleEmitter};
pub use probes::{EnvironmentProbe, ProbeFlags, ProbeInfo};
pub use render_scene::{RenderScene, SCENE_VERSION};
pub use terrain::{GrassInfo, GrassRotationMode, GrassType, Terrain, TerrainInfo};
pub use text_meshes::{abgr_to_rgba, rgba_to_abgr, TextMesh, TextMeshFlags, TextMeshInfo};
pub use visibility::{MeshInstance, RayCastHit};

use crate::config::ConfigError;
use crate::serialization::SerializationError;
use thiserror::Error;

/// Errors surfaced by scene-level operations
#[derive(Debug, Error)]
pub enum SceneError {
    /// Reading or writing serialized data failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Scene configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A resource manager operation was rejected
    #[error("Resource error: {0}")]
    Resource(#[from] crate::assets::ResourceError),
}
