//! Scene core: component tables, lifecycle dispatch and event routing

use super::bone_attachments::BoneAttachment;
use super::cameras::Camera;
use super::decals::Decal;
use super::lights::{GlobalLight, PointLight};
use super::model_instances::ModelInstance;
use super::particles::ParticleEmitter;
use super::probes::EnvironmentProbe;
use super::terrain::Terrain;
use super::text_meshes::TextMesh;
use crate::assets::{
    lock_resources, FontResource, Handle, Material, Model, ObserverId, ResourceId, ResourceKind, ResourceManager,
    SharedResources, Texture,
};
use crate::config::SceneConfig;
use crate::debug::DebugDraw;
use crate::ecs::{ComponentType, Entity, World, WorldEvent};
use crate::spatial::{CullingSystem, OctreeCullingSystem};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Latest scene data version, passed to structured component readers
pub const SCENE_VERSION: i32 = 1;

/// Who asked for an entity move to be propagated
///
/// Moves written by the attachment resolver must not feed back into the
/// cached relative transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MoveContext {
    /// The application moved the entity
    External,
    /// A bone attachment wrote the entity's transform
    Attachment,
}

/// Owner of all renderable component state
pub struct RenderScene {
    pub(super) config: SceneConfig,
    pub(super) resources: SharedResources,
    pub(super) observer: ObserverId,
    /// Subscription count per watched resource
    pub(super) subscriptions: HashMap<ResourceId, u32>,
    pub(super) culling: Box<dyn CullingSystem>,

    /// Dense, indexed by entity; holes have no entity
    pub(super) model_instances: Vec<ModelInstance>,
    /// Head of each model's dependency list
    pub(super) model_entity_map: HashMap<Handle<Model>, Entity>,
    /// Entities with a custom mesh using the material, one entry per mesh slot
    pub(super) material_users: HashMap<Handle<Material>, Vec<Entity>>,

    pub(super) cameras: BTreeMap<Entity, Camera>,
    pub(super) active_camera: Option<Entity>,
    pub(super) global_lights: BTreeMap<Entity, GlobalLight>,
    pub(super) active_global_light: Option<Entity>,
    pub(super) point_lights: Vec<PointLight>,
    pub(super) point_light_map: HashMap<Entity, usize>,
    pub(super) decals: BTreeMap<Entity, Decal>,
    pub(super) terrains: BTreeMap<Entity, Terrain>,
    pub(super) bone_attachments: BTreeMap<Entity, BoneAttachment>,
    pub(super) environment_probes: BTreeMap<Entity, EnvironmentProbe>,
    pub(super) text_meshes: BTreeMap<Entity, TextMesh>,
    pub(super) particle_emitters: BTreeMap<Entity, ParticleEmitter>,

    pub(super) debug: DebugDraw,
    pub(super) time: f32,
    pub(super) global_lod_multiplier: f32,
    pub(super) grass_enabled: bool,
}

/// Panic for a lookup on an entity lacking the component
#[track_caller]
pub(super) fn missing_component(entity: Entity, ty: ComponentType) -> ! {
    panic!("entity {entity} has no {} component", ty.name())
}

/// Shared access to a sparse table entry that must exist
#[track_caller]
pub(super) fn component<T>(table: &BTreeMap<Entity, T>, entity: Entity, ty: ComponentType) -> &T {
    match table.get(&entity) {
        Some(value) => value,
        None => missing_component(entity, ty),
    }
}

/// Exclusive access to a sparse table entry that must exist
#[track_caller]
pub(super) fn component_mut<T>(table: &mut BTreeMap<Entity, T>, entity: Entity, ty: ComponentType) -> &mut T {
    match table.get_mut(&entity) {
        Some(value) => value,
        None => missing_component(entity, ty),
    }
}

impl RenderScene {
    /// Create an empty scene using the octree culling system
    pub fn new(resources: SharedResources, config: SceneConfig) -> Self {
        let culling = Box::new(OctreeCullingSystem::new(config.culling()));
        Self::with_culling(resources, config, culling)
    }

    /// Create an empty scene with a caller-provided culling system
    pub fn with_culling(resources: SharedResources, config: SceneConfig, culling: Box<dyn CullingSystem>) -> Self {
        log::info!("Creating RenderScene with config: {config:?}");
        let observer = lock_resources(&resources).register_observer();
        Self {
            global_lod_multiplier: config.global_lod_multiplier,
            grass_enabled: config.grass_enabled,
            config,
            resources,
            observer,
            subscriptions: HashMap::new(),
            culling,
            model_instances: Vec::new(),
            model_entity_map: HashMap::new(),
            material_users: HashMap::new(),
            cameras: BTreeMap::new(),
            active_camera: None,
            global_lights: BTreeMap::new(),
            active_global_light: None,
            point_lights: Vec::new(),
            point_light_map: HashMap::new(),
            decals: BTreeMap::new(),
            terrains: BTreeMap::new(),
            bone_attachments: BTreeMap::new(),
            environment_probes: BTreeMap::new(),
            text_meshes: BTreeMap::new(),
            particle_emitters: BTreeMap::new(),
            debug: DebugDraw::new(),
            time: 0.0,
        }
    }

    /// Latest data version this scene writes
    pub const fn version(&self) -> i32 {
        SCENE_VERSION
    }

    /// Settings the scene was created with
    pub const fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Resource manager the scene loads from
    pub const fn resources(&self) -> &SharedResources {
        &self.resources
    }

    /// Culling system fed by model instances
    pub fn culling(&self) -> &dyn CullingSystem {
        self.culling.as_ref()
    }

    /// Debug geometry buffers
    pub const fn debug_draw(&self) -> &DebugDraw {
        &self.debug
    }

    /// Debug geometry buffers, for submitting primitives
    pub fn debug_draw_mut(&mut self) -> &mut DebugDraw {
        &mut self.debug
    }

    /// Seconds accumulated by [`Self::update`]
    pub const fn time(&self) -> f32 {
        self.time
    }

    /// Scene-wide LOD distance multiplier
    pub const fn global_lod_multiplier(&self) -> f32 {
        self.global_lod_multiplier
    }

    /// Change the scene-wide LOD distance multiplier
    pub fn set_global_lod_multiplier(&mut self, multiplier: f32) {
        self.global_lod_multiplier = multiplier;
    }

    /// Whether grass is reported by [`Self::grass_infos`]
    pub const fn is_grass_enabled(&self) -> bool {
        self.grass_enabled
    }

    /// Enable or disable grass
    pub fn enable_grass(&mut self, enabled: bool) {
        self.grass_enabled = enabled;
    }

    /// Whether the scene currently watches a resource's state changes
    pub fn is_watching(&self, resource: ResourceId) -> bool {
        self.subscriptions.contains_key(&resource)
    }

    pub(super) fn watch(&mut self, res: &mut ResourceManager, resource: ResourceId) {
        let count = self.subscriptions.entry(resource).or_insert(0);
        if *count == 0 {
            res.subscribe(resource, self.observer);
        }
        *count += 1;
    }

    pub(super) fn unwatch(&mut self, res: &mut ResourceManager, resource: ResourceId) {
        let Some(count) = self.subscriptions.get_mut(&resource) else {
            log::warn!("unwatch of {resource:?} which is not watched");
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.subscriptions.remove(&resource);
            res.unsubscribe(resource, self.observer);
        }
    }

    /// Whether the entity carries a component of the given kind in this scene
    pub fn has_component(&self, entity: Entity, ty: ComponentType) -> bool {
        match ty {
            ComponentType::ModelInstance => self.model_instance_slot(entity).is_some(),
            ComponentType::GlobalLight => self.global_lights.contains_key(&entity),
            ComponentType::PointLight => self.point_light_map.contains_key(&entity),
            ComponentType::Decal => self.decals.contains_key(&entity),
            ComponentType::Camera => self.cameras.contains_key(&entity),
            ComponentType::Terrain => self.terrains.contains_key(&entity),
            ComponentType::BoneAttachment => self.bone_attachments.contains_key(&entity),
            ComponentType::EnvironmentProbe => self.environment_probes.contains_key(&entity),
            ComponentType::ParticleEmitter => self.particle_emitters.contains_key(&entity),
            ComponentType::TextMesh => self.text_meshes.contains_key(&entity),
        }
    }

    /// Create a component with default values
    pub fn create_component(&mut self, world: &mut World, ty: ComponentType, entity: Entity) {
        match ty {
            ComponentType::ModelInstance => self.create_model_instance(world, entity),
            ComponentType::GlobalLight => self.create_global_light(world, entity),
            ComponentType::PointLight => self.create_point_light(world, entity),
            ComponentType::Decal => self.create_decal(world, entity),
            ComponentType::Camera => self.create_camera(world, entity),
            ComponentType::Terrain => self.create_terrain(world, entity),
            ComponentType::BoneAttachment => self.create_bone_attachment(world, entity),
            ComponentType::EnvironmentProbe => self.create_environment_probe(world, entity),
            ComponentType::ParticleEmitter => self.create_particle_emitter(world, entity),
            ComponentType::TextMesh => self.create_text_mesh(world, entity),
        }
    }

    /// Destroy a component, releasing every resource it holds
    pub fn destroy_component(&mut self, world: &mut World, ty: ComponentType, entity: Entity) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        self.remove_component(&mut res, ty, entity);
        world.on_component_destroyed(entity, ty);
    }

    pub(super) fn remove_component(&mut self, res: &mut ResourceManager, ty: ComponentType, entity: Entity) {
        log::debug!("Destroying {} on {entity}", ty.name());
        match ty {
            ComponentType::ModelInstance => self.remove_model_instance(res, entity),
            ComponentType::GlobalLight => self.remove_global_light(entity),
            ComponentType::PointLight => self.remove_point_light(entity),
            ComponentType::Decal => self.remove_decal(res, entity),
            ComponentType::Camera => self.remove_camera(entity),
            ComponentType::Terrain => self.remove_terrain(res, entity),
            ComponentType::BoneAttachment => self.remove_bone_attachment(entity),
            ComponentType::EnvironmentProbe => self.remove_environment_probe(res, entity),
            ComponentType::ParticleEmitter => self.remove_particle_emitter(res, entity),
            ComponentType::TextMesh => self.remove_text_mesh(res, entity),
        }
    }

    /// Every (kind, entity) pair owned by the scene, in section order
    pub(super) fn owned_components(&self) -> Vec<(ComponentType, Entity)> {
        let mut owned = Vec::new();
        for ty in ComponentType::ALL {
            let entities: Vec<Entity> = match ty {
                ComponentType::ModelInstance => self.model_instances.iter().filter_map(|r| r.entity).collect(),
                ComponentType::GlobalLight => self.global_lights.keys().copied().collect(),
                ComponentType::PointLight => self.point_lights.iter().map(|l| l.entity).collect(),
                ComponentType::Decal => self.decals.keys().copied().collect(),
                ComponentType::Camera => self.cameras.keys().copied().collect(),
                ComponentType::Terrain => self.terrains.keys().copied().collect(),
                ComponentType::BoneAttachment => self.bone_attachments.keys().copied().collect(),
                ComponentType::EnvironmentProbe => self.environment_probes.keys().copied().collect(),
                ComponentType::ParticleEmitter => self.particle_emitters.keys().copied().collect(),
                ComponentType::TextMesh => self.text_meshes.keys().copied().collect(),
            };
            owned.extend(entities.into_iter().map(|entity| (ty, entity)));
        }
        owned
    }

    /// Destroy every component and release every resource reference
    pub fn clear(&mut self, world: &mut World) {
        log::info!("Clearing render scene");
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        for (ty, entity) in self.owned_components() {
            self.remove_component(&mut res, ty, entity);
            world.on_component_destroyed(entity, ty);
        }
        self.model_instances.clear();
        self.culling.clear();
        self.debug.clear();
    }

    /// Dispatch the world's queued move and destroy notifications
    pub fn sync_from_world(&mut self, world: &mut World) {
        for event in world.drain_events() {
            match event {
                WorldEvent::EntityMoved(entity) => {
                    if world.is_valid(entity) {
                        self.on_entity_moved(world, entity);
                    }
                }
                WorldEvent::EntityDestroyed(entity) => self.on_entity_destroyed(world, entity),
            }
        }
    }

    /// Propagate an externally written transform
    pub fn on_entity_moved(&mut self, world: &mut World, entity: Entity) {
        let resources = Arc::clone(&self.resources);
        let res = lock_resources(&resources);
        self.entity_moved(world, &res, entity, MoveContext::External);
    }

    pub(super) fn entity_moved(&mut self, world: &mut World, res: &ResourceManager, entity: Entity, context: MoveContext) {
        if self.culling.is_added(entity) {
            let radius = self
                .model_instance_slot(entity)
                .and_then(|r| r.model)
                .and_then(|model| res.get(model))
                .map(Model::bounding_radius);
            let transform = world.transform(entity);
            if let Some(radius) = radius {
                self.culling.set_radius(entity, radius * transform.max_scale());
            }
            self.culling.set_position(entity, transform.position);
        }

        if self.decals.contains_key(&entity) {
            self.update_decal_info(world, entity);
        }

        self.update_attachment_children(world, res, entity);

        if context == MoveContext::External && !world.is_game_running() && self.bone_attachments.contains_key(&entity) {
            self.update_relative_transform(world, entity);
        }
    }

    /// Release every component of a destroyed entity
    pub fn on_entity_destroyed(&mut self, world: &mut World, entity: Entity) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        for ty in ComponentType::ALL {
            if self.has_component(entity, ty) {
                self.remove_component(&mut res, ty, entity);
                world.on_component_destroyed(entity, ty);
            }
        }
        for attachment in self.bone_attachments.values_mut() {
            if attachment.parent == Some(entity) {
                attachment.parent = None;
            }
        }
    }

    /// Drain the scene's resource notifications and update dependents
    pub fn process_resource_events(&mut self, world: &mut World) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        for change in res.drain_events(self.observer) {
            if !self.subscriptions.contains_key(&change.resource) {
                continue;
            }
            match change.resource.kind {
                ResourceKind::Model => {
                    if let Some(model) = change.resource.typed::<Model>() {
                        self.model_state_changed(world, &mut res, model, change.old_state, change.new_state);
                    }
                }
                ResourceKind::Material => {
                    if let Some(material) = change.resource.typed::<Material>() {
                        self.material_state_changed(&mut res, material);
                    }
                }
                ResourceKind::Font => {
                    if let Some(font) = change.resource.typed::<FontResource>() {
                        self.font_state_changed(&mut res, font);
                    }
                }
                ResourceKind::Texture => {
                    if let Some(texture) = change.resource.typed::<Texture>() {
                        self.heightmap_texture_changed(&mut res, texture);
                    }
                }
                ResourceKind::ParticleEmitter => {
                    log::warn!("Unexpected state change for {:?}", change.resource);
                }
            }
        }
    }

    /// Per-frame tick: ages debug geometry and simulates particle emitters
    pub fn update(&mut self, world: &World, dt: f32, paused: bool) {
        self.time += dt;
        self.debug.update(dt);

        if !world.is_game_running() || paused {
            return;
        }
        let resources = Arc::clone(&self.resources);
        let res = lock_resources(&resources);
        for emitter in self.particle_emitters.values_mut() {
            let Some(description) = emitter.resource.and_then(|handle| res.get(handle)) else {
                continue;
            };
            let origin = world.position(emitter.entity);
            emitter.update(dt, description, origin);
        }
    }
}

impl Drop for RenderScene {
    fn drop(&mut self) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        for (ty, entity) in self.owned_components() {
            self.remove_component(&mut res, ty, entity);
        }
        res.unregister_observer(self.observer);
    }
}
