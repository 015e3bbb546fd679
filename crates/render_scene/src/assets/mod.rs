//! Asset management
//!
//! Reference-counted loadable resources and the payload types the render
//! scene reads from them.

pub mod font;
pub mod materials;
pub mod model;
pub mod particles;
pub mod resource_manager;

pub use font::{Font, FontResource};
pub use materials::{Material, Texture};
pub use model::{Bone, LodLevel, Mesh, MeshGeometry, Model, ModelHit, Pose};
pub use particles::ParticleEmitterResource;
pub use resource_manager::{
    lock_resources, Handle, ObserverId, Resource, ResourceConfig, ResourceError, ResourceId, ResourceKind,
    ResourceManager, ResourceState, SharedResources, StateChange,
};
