//! Model instances and their resource dependencies
//!
//! Instances live in a dense table indexed by entity. Every instance sharing a
//! model is chained through `prev_model`/`next_model`, rooted in
//! `model_entity_map`, so a model's state change reaches all of its instances
//! without scanning the table. Per-instance material overrides ("custom
//! meshes") are indexed the other way round in `material_users`.

use super::render_scene::{missing_component, RenderScene};
use crate::assets::{lock_resources, Handle, Material, Model, Pose, ResourceManager, ResourceState};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::collections::swap_remove_item;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Model instance state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModelInstanceFlags: u8 {
        /// A bone attachment uses this instance's pose
        const IS_BONE_ATTACHMENT_PARENT = 1 << 0;
        /// Drawn and registered for culling
        const ENABLED = 1 << 1;
        /// Meshes are per-instance copies with their own materials
        const CUSTOM_MESHES = 1 << 2;
    }
}

impl ModelInstanceFlags {
    /// Bits written by the serializers; the rest are rebuilt on load
    pub const PERSISTENT: Self = Self::ENABLED;
}

/// Per-instance material override of one model mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomMesh {
    /// Material reference owned by the instance
    pub material: Option<Handle<Material>>,
    /// Layers of the material once it is ready, 0 before
    pub layer_mask: u64,
    /// Emptied on purpose; the model's own material is not filled back in
    pub cleared: bool,
}

/// Which mesh list an instance draws
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MeshBinding {
    /// No model data available
    #[default]
    None,
    /// The model's authored meshes
    Shared,
    /// Per-instance overrides, indexed like the model's meshes
    Custom(Vec<CustomMesh>),
}

/// Model component of one entity
#[derive(Debug, Clone, Default)]
pub struct ModelInstance {
    pub(super) entity: Option<Entity>,
    pub(super) model: Option<Handle<Model>>,
    pub(super) pose: Option<Pose>,
    pub(super) meshes: MeshBinding,
    pub(super) flags: ModelInstanceFlags,
    pub(super) prev_model: Option<Entity>,
    pub(super) next_model: Option<Entity>,
}

impl ModelInstance {
    /// Owning entity, `None` for a hole in the table
    pub const fn entity(&self) -> Option<Entity> {
        self.entity
    }

    /// Model reference
    pub const fn model(&self) -> Option<Handle<Model>> {
        self.model
    }

    /// Skeleton pose, present while the model is ready and has bones
    pub const fn pose(&self) -> Option<&Pose> {
        self.pose.as_ref()
    }

    /// Mesh list binding
    pub const fn meshes(&self) -> &MeshBinding {
        &self.meshes
    }

    /// State bits
    pub const fn flags(&self) -> ModelInstanceFlags {
        self.flags
    }

    /// Whether the instance is drawn
    pub const fn is_enabled(&self) -> bool {
        self.flags.contains(ModelInstanceFlags::ENABLED)
    }

    /// Whether materials were overridden per instance
    pub const fn has_custom_meshes(&self) -> bool {
        self.flags.contains(ModelInstanceFlags::CUSTOM_MESHES)
    }

    /// Material and layers of mesh `index`, resolved against the model when shared
    pub(super) fn mesh_material(&self, model: &Model, index: usize) -> Option<(Handle<Material>, u64)> {
        match &self.meshes {
            MeshBinding::Custom(meshes) => {
                let mesh = meshes.get(index)?;
                mesh.material.map(|material| (material, mesh.layer_mask))
            }
            MeshBinding::Shared => model.meshes().get(index).map(|mesh| (mesh.material, mesh.layer_mask)),
            MeshBinding::None => None,
        }
    }
}

impl RenderScene {
    pub(super) fn model_instance_slot(&self, entity: Entity) -> Option<&ModelInstance> {
        self.model_instances
            .get(entity.index())
            .filter(|r| r.entity == Some(entity))
    }

    #[track_caller]
    pub(super) fn instance(&self, entity: Entity) -> &ModelInstance {
        match self.model_instance_slot(entity) {
            Some(r) => r,
            None => missing_component(entity, ComponentType::ModelInstance),
        }
    }

    #[track_caller]
    pub(super) fn instance_mut(&mut self, entity: Entity) -> &mut ModelInstance {
        match self.model_instances.get_mut(entity.index()) {
            Some(r) if r.entity == Some(entity) => r,
            _ => missing_component(entity, ComponentType::ModelInstance),
        }
    }

    /// Model component of an entity
    ///
    /// # Panics
    /// Panics if the entity has no model instance.
    pub fn model_instance(&self, entity: Entity) -> &ModelInstance {
        self.instance(entity)
    }

    /// Entities with a model instance, in table order
    pub fn model_instance_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.model_instances.iter().filter_map(|r| r.entity)
    }

    /// Add an enabled model instance without a model
    pub fn create_model_instance(&mut self, world: &mut World, entity: Entity) {
        let index = entity.index();
        if self.model_instances.len() <= index {
            self.model_instances.resize_with(index + 1, ModelInstance::default);
        }
        assert!(
            self.model_instances[index].entity.is_none(),
            "entity {entity} already has a model instance"
        );

        let mut flags = ModelInstanceFlags::ENABLED;
        if self.bone_attachments.values().any(|a| a.parent == Some(entity)) {
            flags.insert(ModelInstanceFlags::IS_BONE_ATTACHMENT_PARENT);
        }
        self.model_instances[index] = ModelInstance {
            entity: Some(entity),
            flags,
            ..ModelInstance::default()
        };
        log::debug!("Created model instance on {entity}");
        world.on_component_created(entity, ComponentType::ModelInstance);
    }

    /// Remove an entity's model instance, releasing its model and custom materials
    pub fn destroy_model_instance(&mut self, world: &mut World, entity: Entity) {
        self.destroy_component(world, ComponentType::ModelInstance, entity);
    }

    pub(super) fn remove_model_instance(&mut self, res: &mut ResourceManager, entity: Entity) {
        self.detach_model(res, entity);
        *self.instance_mut(entity) = ModelInstance::default();
    }

    /// Assign a model by path; an empty path clears it
    pub fn set_model_instance_path(&mut self, world: &mut World, entity: Entity, path: &str) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let model = (!path.is_empty()).then(|| res.load::<Model>(path));
        self.set_model(world, &mut res, entity, model);
    }

    /// Path of the assigned model, empty when none
    pub fn model_instance_path(&self, entity: Entity) -> String {
        self.instance(entity)
            .model
            .map(|model| lock_resources(&self.resources).path(model).to_string())
            .unwrap_or_default()
    }

    /// Replace the instance's model; takes ownership of one reference to `model`
    pub(super) fn set_model(&mut self, world: &mut World, res: &mut ResourceManager, entity: Entity, model: Option<Handle<Model>>) {
        let current = self.instance(entity).model;
        if current.is_some() && current == model {
            if let Some(model) = model {
                res.unload(model);
            }
            return;
        }

        self.detach_model(res, entity);
        let Some(model) = model else {
            return;
        };
        self.instance_mut(entity).model = Some(model);
        self.add_to_model_entity_map(res, model, entity);
        if res.is_ready(model) {
            self.model_loaded(world, res, entity);
        }
    }

    fn detach_model(&mut self, res: &mut ResourceManager, entity: Entity) {
        let Some(old) = self.instance(entity).model else {
            return;
        };
        self.free_custom_meshes(res, entity);
        self.remove_from_model_entity_map(res, old, entity);
        self.culling.remove(entity);

        let r = self.instance_mut(entity);
        r.model = None;
        r.pose = None;
        r.meshes = MeshBinding::None;
        res.unload(old);
    }

    /// Entities sharing a model, most recently attached first
    pub fn model_dependents(&self, model: Handle<Model>) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut cursor = self.model_entity_map.get(&model).copied();
        while let Some(entity) = cursor {
            entities.push(entity);
            cursor = self.instance(entity).next_model;
        }
        entities
    }

    fn add_to_model_entity_map(&mut self, res: &mut ResourceManager, model: Handle<Model>, entity: Entity) {
        let head = self.model_entity_map.get(&model).copied();
        let r = self.instance_mut(entity);
        r.prev_model = None;
        r.next_model = head;
        match head {
            Some(head) => self.instance_mut(head).prev_model = Some(entity),
            None => self.watch(res, model.id()),
        }
        self.model_entity_map.insert(model, entity);
    }

    fn remove_from_model_entity_map(&mut self, res: &mut ResourceManager, model: Handle<Model>, entity: Entity) {
        let r = self.instance_mut(entity);
        let prev = r.prev_model.take();
        let next = r.next_model.take();
        if let Some(prev) = prev {
            self.instance_mut(prev).next_model = next;
        }
        if let Some(next) = next {
            self.instance_mut(next).prev_model = prev;
        }
        if self.model_entity_map.get(&model) == Some(&entity) {
            match next {
                Some(next) => {
                    self.model_entity_map.insert(model, next);
                }
                None => {
                    self.model_entity_map.remove(&model);
                    self.unwatch(res, model.id());
                }
            }
        }
    }

    pub(super) fn model_state_changed(
        &mut self,
        world: &mut World,
        res: &mut ResourceManager,
        model: Handle<Model>,
        old_state: ResourceState,
        new_state: ResourceState,
    ) {
        let dependents = self.model_dependents(model);
        if new_state == ResourceState::Ready {
            log::debug!("Model {} ready for {} instances", res.path(model), dependents.len());
            for entity in dependents {
                self.model_loaded(world, res, entity);
            }
        } else if old_state == ResourceState::Ready {
            for entity in dependents {
                self.model_unloaded(entity);
            }
        }
    }

    fn model_loaded(&mut self, world: &mut World, res: &mut ResourceManager, entity: Entity) {
        let Some(data) = self.instance(entity).model.and_then(|model| res.get(model)) else {
            return;
        };
        let pose = (data.bone_count() > 0).then(|| Pose::from_model(data));
        let radius = data.bounding_radius();

        let r = self.instance_mut(entity);
        r.pose = pose;
        let custom = r.flags.contains(ModelInstanceFlags::CUSTOM_MESHES);
        if custom {
            self.fill_custom_meshes(res, entity);
        } else {
            r.meshes = MeshBinding::Shared;
        }

        let flags = self.instance(entity).flags;
        if flags.contains(ModelInstanceFlags::ENABLED) && !self.culling.is_added(entity) {
            let transform = world.transform(entity);
            let layer_mask = self.layer_mask(res, entity);
            self.culling
                .add(entity, transform.position, radius * transform.max_scale(), layer_mask);
        }
        if flags.contains(ModelInstanceFlags::IS_BONE_ATTACHMENT_PARENT) {
            self.update_attachment_children(world, res, entity);
        }
    }

    fn model_unloaded(&mut self, entity: Entity) {
        self.culling.remove(entity);
        let r = self.instance_mut(entity);
        r.pose = None;
        if !r.flags.contains(ModelInstanceFlags::CUSTOM_MESHES) {
            r.meshes = MeshBinding::None;
        }
    }

    /// Render layers of all meshes the instance draws
    pub(super) fn layer_mask(&self, res: &ResourceManager, entity: Entity) -> u64 {
        let r = self.instance(entity);
        match &r.meshes {
            MeshBinding::Custom(meshes) => meshes.iter().fold(0, |mask, mesh| mask | mesh.layer_mask),
            MeshBinding::Shared => r
                .model
                .and_then(|model| res.get(model))
                .map_or(0, |data| data.meshes().iter().fold(0, |mask, mesh| mask | mesh.layer_mask)),
            MeshBinding::None => 0,
        }
    }

    fn refresh_culling_layers(&mut self, res: &ResourceManager, entity: Entity) {
        if self.culling.is_added(entity) {
            let layer_mask = self.layer_mask(res, entity);
            self.culling.set_layer_mask(entity, layer_mask);
        }
    }

    /// Show or hide an instance; hidden instances leave the culling system
    pub fn enable_model_instance(&mut self, world: &World, entity: Entity, enable: bool) {
        let resources = Arc::clone(&self.resources);
        let res = lock_resources(&resources);
        let r = self.instance_mut(entity);
        r.flags.set(ModelInstanceFlags::ENABLED, enable);
        let Some(radius) = r.model.and_then(|model| res.get(model)).map(Model::bounding_radius) else {
            return;
        };

        if !enable {
            self.culling.remove(entity);
        } else if !self.culling.is_added(entity) {
            let transform = world.transform(entity);
            let layer_mask = self.layer_mask(&res, entity);
            self.culling
                .add(entity, transform.position, radius * transform.max_scale(), layer_mask);
        }
    }

    /// Whether the instance is drawn
    pub fn is_model_instance_enabled(&self, entity: Entity) -> bool {
        self.instance(entity).is_enabled()
    }

    /// Number of material slots: custom meshes, else the ready model's meshes, else 0
    pub fn model_instance_material_count(&self, entity: Entity) -> usize {
        let r = self.instance(entity);
        match &r.meshes {
            MeshBinding::Custom(meshes) => meshes.len(),
            MeshBinding::Shared => r
                .model
                .and_then(|model| lock_resources(&self.resources).get(model).map(Model::mesh_count))
                .unwrap_or(0),
            MeshBinding::None => 0,
        }
    }

    /// Material path of slot `index`, empty when the slot has none
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn model_instance_material(&self, entity: Entity, index: usize) -> String {
        let res = lock_resources(&self.resources);
        let r = self.instance(entity);
        let material = match &r.meshes {
            MeshBinding::Custom(meshes) => meshes[index].material,
            MeshBinding::Shared => r
                .model
                .and_then(|model| res.get(model))
                .map(|data| data.mesh(index).material),
            MeshBinding::None => None,
        };
        material.map(|m| res.path(m).to_string()).unwrap_or_default()
    }

    /// Override the material of one mesh slot, switching the instance to custom meshes
    pub fn set_model_instance_material(&mut self, entity: Entity, index: usize, path: &str) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let r = self.instance(entity);
        let Some(model) = r.model else {
            log::warn!("Cannot override material {index} of {entity}: no model assigned");
            return;
        };

        let current_count = match &r.meshes {
            MeshBinding::Custom(meshes) => {
                let current = meshes.get(index).and_then(|m| m.material);
                if current.is_some_and(|m| res.path(m) == path) {
                    return;
                }
                meshes.len()
            }
            MeshBinding::Shared | MeshBinding::None => res.get(model).map_or(0, Model::mesh_count),
        };
        if !r.has_custom_meshes() || current_count <= index {
            self.allocate_custom_meshes(&mut res, entity, current_count.max(index + 1));
        }

        if path.is_empty() {
            let cleared = self.take_custom_material(entity, index);
            self.release_custom_mesh(&mut res, entity, cleared);
        } else {
            let material = res.load::<Material>(path);
            self.assign_custom_material(&mut res, entity, index, material);
        }
        self.refresh_culling_layers(&res, entity);
    }

    /// Switch to custom meshes holding `materials`, one reference owned per `Some`
    ///
    /// Used by the readers before the model is assigned. `None` slots were
    /// stored empty and stay cleared; slots past the end are filled from the
    /// model once it is ready.
    pub(super) fn restore_custom_materials(
        &mut self,
        res: &mut ResourceManager,
        entity: Entity,
        materials: Vec<Option<Handle<Material>>>,
    ) {
        self.free_custom_meshes(res, entity);
        let r = self.instance_mut(entity);
        r.meshes = MeshBinding::Custom(vec![CustomMesh::default(); materials.len()]);
        r.flags.insert(ModelInstanceFlags::CUSTOM_MESHES);
        for (slot, material) in materials.into_iter().enumerate() {
            match material {
                Some(material) => self.assign_custom_material(res, entity, slot, material),
                None => self.mark_slot_cleared(entity, slot),
            }
        }
    }

    /// Material paths of the custom meshes, `None` when the instance shares the model's meshes
    pub(super) fn custom_material_paths(&self, res: &ResourceManager, entity: Entity) -> Option<Vec<String>> {
        match &self.instance(entity).meshes {
            MeshBinding::Custom(meshes) => Some(
                meshes
                    .iter()
                    .map(|mesh| mesh.material.map(|m| res.path(m).to_string()).unwrap_or_default())
                    .collect(),
            ),
            MeshBinding::Shared | MeshBinding::None => None,
        }
    }

    fn authored_materials(&self, res: &ResourceManager, entity: Entity) -> Vec<Handle<Material>> {
        self.instance(entity)
            .model
            .and_then(|model| res.get(model))
            .map(|data| data.meshes().iter().map(|mesh| mesh.material).collect())
            .unwrap_or_default()
    }

    fn allocate_custom_meshes(&mut self, res: &mut ResourceManager, entity: Entity, count: usize) {
        if let MeshBinding::Custom(meshes) = &mut self.instance_mut(entity).meshes {
            let removed: Vec<CustomMesh> = if count < meshes.len() {
                meshes.drain(count..).collect()
            } else {
                meshes.resize(count, CustomMesh::default());
                Vec::new()
            };
            for mesh in removed {
                self.release_custom_mesh(res, entity, mesh);
            }
            return;
        }

        let r = self.instance_mut(entity);
        r.meshes = MeshBinding::Custom(vec![CustomMesh::default(); count]);
        r.flags.insert(ModelInstanceFlags::CUSTOM_MESHES);
        let authored = self.authored_materials(res, entity);
        for (slot, material) in authored.into_iter().enumerate().take(count) {
            res.add_ref(material);
            self.assign_custom_material(res, entity, slot, material);
        }
    }

    /// Fill unassigned custom slots with the model's own materials
    fn fill_custom_meshes(&mut self, res: &mut ResourceManager, entity: Entity) {
        let authored = self.authored_materials(res, entity);
        let empty_slots: Vec<usize> = match &mut self.instance_mut(entity).meshes {
            MeshBinding::Custom(meshes) => {
                if meshes.len() < authored.len() {
                    meshes.resize(authored.len(), CustomMesh::default());
                }
                meshes
                    .iter()
                    .enumerate()
                    .filter(|(slot, mesh)| mesh.material.is_none() && !mesh.cleared && *slot < authored.len())
                    .map(|(slot, _)| slot)
                    .collect()
            }
            MeshBinding::Shared | MeshBinding::None => Vec::new(),
        };
        for slot in empty_slots {
            let material = authored[slot];
            res.add_ref(material);
            self.assign_custom_material(res, entity, slot, material);
        }
    }

    /// Put `material` into a custom slot; takes ownership of one reference
    fn assign_custom_material(&mut self, res: &mut ResourceManager, entity: Entity, slot: usize, material: Handle<Material>) {
        let layer_mask = res.get(material).map_or(0, Material::layer_mask);
        let previous = match &mut self.instance_mut(entity).meshes {
            MeshBinding::Custom(meshes) => {
                let mesh = &mut meshes[slot];
                mesh.layer_mask = layer_mask;
                mesh.cleared = false;
                mesh.material.replace(material)
            }
            MeshBinding::Shared | MeshBinding::None => panic!("entity {entity} has no custom meshes"),
        };
        self.add_material_user(res, material, entity);
        self.release_custom_mesh(
            res,
            entity,
            CustomMesh {
                material: previous,
                ..CustomMesh::default()
            },
        );
    }

    /// Empty a custom slot for good, returning what it held
    fn take_custom_material(&mut self, entity: Entity, slot: usize) -> CustomMesh {
        let taken = match &mut self.instance_mut(entity).meshes {
            MeshBinding::Custom(meshes) => std::mem::take(&mut meshes[slot]),
            MeshBinding::Shared | MeshBinding::None => CustomMesh::default(),
        };
        self.mark_slot_cleared(entity, slot);
        taken
    }

    fn mark_slot_cleared(&mut self, entity: Entity, slot: usize) {
        if let MeshBinding::Custom(meshes) = &mut self.instance_mut(entity).meshes {
            if let Some(mesh) = meshes.get_mut(slot) {
                mesh.cleared = true;
            }
        }
    }

    fn release_custom_mesh(&mut self, res: &mut ResourceManager, entity: Entity, mesh: CustomMesh) {
        if let Some(material) = mesh.material {
            self.remove_material_user(res, material, entity);
            res.unload(material);
        }
    }

    fn free_custom_meshes(&mut self, res: &mut ResourceManager, entity: Entity) {
        let r = self.instance_mut(entity);
        r.flags.remove(ModelInstanceFlags::CUSTOM_MESHES);
        if let MeshBinding::Custom(meshes) = std::mem::take(&mut r.meshes) {
            for mesh in meshes {
                self.release_custom_mesh(res, entity, mesh);
            }
        }
    }

    fn add_material_user(&mut self, res: &mut ResourceManager, material: Handle<Material>, entity: Entity) {
        let users = self.material_users.entry(material).or_default();
        let first = users.is_empty();
        users.push(entity);
        if first {
            self.watch(res, material.id());
        }
    }

    fn remove_material_user(&mut self, res: &mut ResourceManager, material: Handle<Material>, entity: Entity) {
        let Some(users) = self.material_users.get_mut(&material) else {
            return;
        };
        swap_remove_item(users, &entity);
        if users.is_empty() {
            self.material_users.remove(&material);
            self.unwatch(res, material.id());
        }
    }

    /// Entities with a custom mesh using the material (one entry per slot)
    pub fn material_users(&self, material: Handle<Material>) -> &[Entity] {
        self.material_users.get(&material).map(Vec::as_slice).unwrap_or_default()
    }

    pub(super) fn material_state_changed(&mut self, res: &mut ResourceManager, material: Handle<Material>) {
        let layer_mask = res.get(material).map_or(0, Material::layer_mask);
        let mut users = self.material_users.get(&material).cloned().unwrap_or_default();
        users.sort_unstable();
        users.dedup();
        for entity in users {
            if let MeshBinding::Custom(meshes) = &mut self.instance_mut(entity).meshes {
                for mesh in meshes.iter_mut().filter(|mesh| mesh.material == Some(material)) {
                    mesh.layer_mask = layer_mask;
                }
            }
            self.refresh_culling_layers(res, entity);
        }
        self.terrain_material_changed(res, material);
    }

    /// Skeleton pose of an instance
    pub fn model_instance_pose(&self, entity: Entity) -> Option<&Pose> {
        self.instance(entity).pose.as_ref()
    }

    /// Pose for writing; call [`Self::unlock_pose`] when done
    pub fn lock_pose(&mut self, entity: Entity) -> Option<&mut Pose> {
        self.instance_mut(entity).pose.as_mut()
    }

    /// Finish a pose edit; a changed pose moves attached entities
    pub fn unlock_pose(&mut self, world: &mut World, entity: Entity, changed: bool) {
        if !changed {
            return;
        }
        if !self
            .instance(entity)
            .flags
            .contains(ModelInstanceFlags::IS_BONE_ATTACHMENT_PARENT)
        {
            return;
        }
        let resources = Arc::clone(&self.resources);
        let res = lock_resources(&resources);
        self.update_attachment_children(world, &res, entity);
    }
}
