//! # Render Scene
//!
//! Component store for everything a renderer draws: model instances, lights,
//! cameras, terrains, decals, particle emitters, text meshes, bone attachments
//! and environment probes.
//!
//! ## Features
//!
//! - **Resource lifecycle**: reference-counted loads and state-change
//!   subscriptions, so instances follow their models and materials as they
//!   load, fail or reload
//! - **Culling**: octree-backed spatial index with layer masks, feeding a
//!   parallel visible-mesh query with LOD selection
//! - **Serialization**: a binary whole-scene stream and named-field
//!   per-component records for undo and copy/paste
//! - **Debug drawing**: timed line, triangle and point buffers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_scene::prelude::*;
//!
//! let resources = ResourceManager::shared(ResourceConfig::default());
//! let mut world = World::with_name("demo");
//! let mut scene = RenderScene::new(resources, SceneConfig::default());
//!
//! let entity = world.create_entity();
//! scene.create_model_instance(&mut world, entity);
//! scene.set_model_instance_path(&mut world, entity, "models/crate.fbx");
//! scene.process_resource_events(&mut world);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod debug;
pub mod ecs;
pub mod foundation;
pub mod scene;
pub mod scripting;
pub mod serialization;
pub mod spatial;

/// Common imports for scene users
pub mod prelude {
    pub use crate::{
        assets::{
            lock_resources, FontResource, Handle, Material, Model, ParticleEmitterResource, ResourceConfig,
            ResourceManager, ResourceState, SharedResources, Texture,
        },
        config::{Config, SceneConfig},
        debug::DebugDraw,
        ecs::{ComponentType, Entity, World},
        foundation::math::{Mat4, Quat, Transform, Vec2, Vec3, Vec4},
        scene::{MeshInstance, RayCastHit, RenderScene, SceneError},
        serialization::{ComponentRecord, SerializationError},
        spatial::{CullingSystem, Frustum, Ray},
    };
}
