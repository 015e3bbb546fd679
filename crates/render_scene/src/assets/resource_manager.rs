//! Resource Manager - reference-counted loadable assets with observable state
//!
//! **Implements**: Game Engine Architecture Chapter 7.2 (Resource Manager)
//!
//! Every loadable asset lives in a per-kind table keyed by path. `load` finds
//! or creates the entry and bumps its reference count, `unload` drops it again
//! and frees the entry at zero. The loading side (file I/O, decoding) is not
//! part of this module: it drives the state machine through
//! [`ResourceManager::finish_loading`], [`ResourceManager::fail_loading`] and
//! [`ResourceManager::begin_reload`].
//!
//! State changes are delivered through explicit subscriptions. A consumer
//! registers an [`ObserverId`], subscribes it to the resources it cares about
//! and drains the queued [`StateChange`]s on its own thread.
//!
//! **Ownership**: the application owns the ResourceManager and shares it with
//! the render scene via `Arc<Mutex<ResourceManager>>`.

use super::font::{Font, FontResource};
use super::materials::{Material, Texture};
use super::model::Model;
use super::particles::ParticleEmitterResource;
use crate::foundation::collections::{DefaultKey, HandleMap, TypedHandle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Handle to a loaded (or loading) resource of type `T`
pub type Handle<T> = TypedHandle<T>;

/// Resource manager shared between the scene and the loader
pub type SharedResources = Arc<Mutex<ResourceManager>>;

/// Lock a shared resource manager, recovering from a poisoned lock
pub fn lock_resources(resources: &SharedResources) -> MutexGuard<'_, ResourceManager> {
    resources.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resource Manager errors
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The handle no longer refers to a live entry (fully unloaded)
    #[error("unknown {kind:?} handle")]
    UnknownHandle {
        /// Kind of the stale handle
        kind: ResourceKind,
    },

    /// The operation does not apply to the entry's current state
    #[error("{path}: cannot {operation} while {state:?}")]
    InvalidState {
        /// Resource path
        path: String,
        /// Attempted operation
        operation: &'static str,
        /// Current state
        state: ResourceState,
    },
}

/// Lifecycle stage of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Requested, data not available yet (or dropped for a reload)
    Empty,
    /// Data is loaded and safe to use
    Ready,
    /// Loading failed; dependents treat it as not ready
    Failure,
}

/// Kinds of loadable resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Mesh set with skeleton and LODs
    Model,
    /// Material (render layers + textures)
    Material,
    /// Texture pixels
    Texture,
    /// Font face producing sized glyph sets
    Font,
    /// Particle emitter description
    ParticleEmitter,
}

/// Untyped resource identity, used in notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource kind
    pub kind: ResourceKind,
    /// Key inside the kind's table
    pub key: DefaultKey,
}

impl ResourceId {
    /// Typed handle if this id is of kind `T`
    pub fn typed<T: Resource>(&self) -> Option<Handle<T>> {
        (self.kind == T::KIND).then(|| Handle::new(self.key))
    }
}

impl<T: Resource> TypedHandle<T> {
    /// Untyped identity of this handle
    pub fn id(&self) -> ResourceId {
        ResourceId {
            kind: T::KIND,
            key: self.key(),
        }
    }
}

/// Observer registration returned by [`ResourceManager::register_observer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// Queued notification of a resource state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// Resource that changed
    pub resource: ResourceId,
    /// State before the transition
    pub old_state: ResourceState,
    /// State after the transition
    pub new_state: ResourceState,
}

/// Loadable resource payload stored by the manager
pub trait Resource: Sized + Send + Sync + 'static {
    /// Table discriminator
    const KIND: ResourceKind;

    /// Shared access to this kind's table
    fn table(manager: &ResourceManager) -> &ResourceTable<Self>;

    /// Exclusive access to this kind's table
    fn table_mut(manager: &mut ResourceManager) -> &mut ResourceTable<Self>;

    /// Release references this payload holds on other resources
    fn release_dependencies(self, _manager: &mut ResourceManager) {}
}

/// One loadable asset
#[derive(Debug)]
pub struct ResourceEntry<T> {
    path: String,
    ref_count: u32,
    state: ResourceState,
    data: Option<T>,
    observers: Vec<ObserverId>,
}

/// Per-kind storage: slot map of entries plus a path index
#[derive(Debug)]
pub struct ResourceTable<T> {
    entries: HandleMap<ResourceEntry<T>>,
    by_path: HashMap<String, DefaultKey>,
}

impl<T> ResourceTable<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HandleMap::with_capacity(capacity),
            by_path: HashMap::with_capacity(capacity),
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Configuration for Resource Manager
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// Initial capacity of each per-kind table
    pub initial_capacity: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self { initial_capacity: 64 }
    }
}

/// Resource Manager - central reference counting and state tracking
pub struct ResourceManager {
    models: ResourceTable<Model>,
    materials: ResourceTable<Material>,
    textures: ResourceTable<Texture>,
    fonts: ResourceTable<FontResource>,
    emitters: ResourceTable<ParticleEmitterResource>,
    event_queues: HashMap<ObserverId, Vec<StateChange>>,
    next_observer: u32,
}

macro_rules! impl_resource {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl Resource for $ty {
            const KIND: ResourceKind = ResourceKind::$kind;

            fn table(manager: &ResourceManager) -> &ResourceTable<Self> {
                &manager.$field
            }

            fn table_mut(manager: &mut ResourceManager) -> &mut ResourceTable<Self> {
                &mut manager.$field
            }
        }
    };
}

impl_resource!(Texture, Texture, textures);
impl_resource!(FontResource, Font, fonts);
impl_resource!(ParticleEmitterResource, ParticleEmitter, emitters);

impl Resource for Model {
    const KIND: ResourceKind = ResourceKind::Model;

    fn table(manager: &ResourceManager) -> &ResourceTable<Self> {
        &manager.models
    }

    fn table_mut(manager: &mut ResourceManager) -> &mut ResourceTable<Self> {
        &mut manager.models
    }

    fn release_dependencies(self, manager: &mut ResourceManager) {
        for mesh in self.meshes() {
            manager.unload(mesh.material);
        }
    }
}

impl Resource for Material {
    const KIND: ResourceKind = ResourceKind::Material;

    fn table(manager: &ResourceManager) -> &ResourceTable<Self> {
        &manager.materials
    }

    fn table_mut(manager: &mut ResourceManager) -> &mut ResourceTable<Self> {
        &mut manager.materials
    }

    fn release_dependencies(self, manager: &mut ResourceManager) {
        for texture in self.textures() {
            manager.unload(*texture);
        }
    }
}

impl ResourceManager {
    /// Create new Resource Manager
    pub fn new(config: ResourceConfig) -> Self {
        log::info!("Creating ResourceManager with config: {config:?}");
        let capacity = config.initial_capacity;
        Self {
            models: ResourceTable::with_capacity(capacity),
            materials: ResourceTable::with_capacity(capacity),
            textures: ResourceTable::with_capacity(capacity),
            fonts: ResourceTable::with_capacity(capacity),
            emitters: ResourceTable::with_capacity(capacity),
            event_queues: HashMap::new(),
            next_observer: 0,
        }
    }

    /// Create a manager wrapped for sharing with a scene
    pub fn shared(config: ResourceConfig) -> SharedResources {
        Arc::new(Mutex::new(Self::new(config)))
    }

    fn entry<T: Resource>(&self, handle: Handle<T>) -> &ResourceEntry<T> {
        match T::table(self).entries.get(handle.key()) {
            Some(entry) => entry,
            None => panic!("stale {:?} handle {:?}", T::KIND, handle),
        }
    }

    fn try_entry_mut<T: Resource>(&mut self, handle: Handle<T>) -> Result<&mut ResourceEntry<T>, ResourceError> {
        T::table_mut(self)
            .entries
            .get_mut(handle.key())
            .ok_or(ResourceError::UnknownHandle { kind: T::KIND })
    }

    /// Find or create the resource at `path` and take one reference to it
    pub fn load<T: Resource>(&mut self, path: &str) -> Handle<T> {
        let table = T::table_mut(self);
        let key = if let Some(&key) = table.by_path.get(path) {
            key
        } else {
            log::debug!("{:?} {path} requested", T::KIND);
            let key = table.entries.insert(ResourceEntry {
                path: path.to_string(),
                ref_count: 0,
                state: ResourceState::Empty,
                data: None,
                observers: Vec::new(),
            });
            table.by_path.insert(path.to_string(), key);
            key
        };
        if let Some(entry) = table.entries.get_mut(key) {
            entry.ref_count += 1;
        }
        Handle::new(key)
    }

    /// Take one more reference to an already loaded handle
    pub fn add_ref<T: Resource>(&mut self, handle: Handle<T>) {
        match T::table_mut(self).entries.get_mut(handle.key()) {
            Some(entry) => entry.ref_count += 1,
            None => panic!("add_ref on stale {:?} handle", T::KIND),
        }
    }

    /// Drop one reference; the entry and its data are freed at zero
    pub fn unload<T: Resource>(&mut self, handle: Handle<T>) {
        let table = T::table_mut(self);
        let Some(entry) = table.entries.get_mut(handle.key()) else {
            panic!("unload on stale {:?} handle", T::KIND);
        };
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return;
        }

        let Some(entry) = table.entries.remove(handle.key()) else {
            return;
        };
        table.by_path.remove(&entry.path);
        if !entry.observers.is_empty() {
            log::warn!("{:?} {} freed with {} observers still subscribed", T::KIND, entry.path, entry.observers.len());
        }
        log::debug!("{:?} {} freed", T::KIND, entry.path);
        if let Some(data) = entry.data {
            data.release_dependencies(self);
        }
    }

    /// Handle of an existing entry, without taking a reference
    pub fn find<T: Resource>(&self, path: &str) -> Option<Handle<T>> {
        T::table(self).by_path.get(path).map(|&key| Handle::new(key))
    }

    /// Number of live entries of kind `T`
    pub fn len<T: Resource>(&self) -> usize {
        T::table(self).len()
    }

    /// Paths of entries waiting for data, for the loader
    pub fn pending<T: Resource>(&self) -> Vec<(Handle<T>, String)> {
        T::table(self)
            .entries
            .iter()
            .filter(|(_, entry)| entry.state == ResourceState::Empty)
            .map(|(key, entry)| (Handle::new(key), entry.path.clone()))
            .collect()
    }

    /// Current state
    pub fn state<T: Resource>(&self, handle: Handle<T>) -> ResourceState {
        self.entry(handle).state
    }

    /// Whether the data is loaded
    pub fn is_ready<T: Resource>(&self, handle: Handle<T>) -> bool {
        self.state(handle) == ResourceState::Ready
    }

    /// Whether loading failed
    pub fn is_failure<T: Resource>(&self, handle: Handle<T>) -> bool {
        self.state(handle) == ResourceState::Failure
    }

    /// Path the resource was requested with
    pub fn path<T: Resource>(&self, handle: Handle<T>) -> &str {
        &self.entry(handle).path
    }

    /// Current reference count (0 for freed handles)
    pub fn ref_count<T: Resource>(&self, handle: Handle<T>) -> u32 {
        T::table(self)
            .entries
            .get(handle.key())
            .map_or(0, |entry| entry.ref_count)
    }

    /// Loaded data, `None` unless ready
    pub fn get<T: Resource>(&self, handle: Handle<T>) -> Option<&T> {
        let entry = T::table(self).entries.get(handle.key())?;
        match entry.state {
            ResourceState::Ready => entry.data.as_ref(),
            ResourceState::Empty | ResourceState::Failure => None,
        }
    }

    fn transition<T: Resource>(&mut self, handle: Handle<T>, new_state: ResourceState, data: Option<T>) -> Result<Option<T>, ResourceError> {
        let entry = self.try_entry_mut(handle)?;
        let old_state = entry.state;
        let previous = std::mem::replace(&mut entry.data, data);
        entry.state = new_state;
        log::debug!("{:?} {}: {old_state:?} -> {new_state:?}", T::KIND, entry.path);

        if old_state != new_state {
            let change = StateChange {
                resource: handle.id(),
                old_state,
                new_state,
            };
            let observers = entry.observers.clone();
            for observer in observers {
                if let Some(queue) = self.event_queues.get_mut(&observer) {
                    queue.push(change);
                }
            }
        }
        Ok(previous)
    }

    /// Loader callback: data is available
    pub fn finish_loading<T: Resource>(&mut self, handle: Handle<T>, data: T) -> Result<(), ResourceError> {
        if let Some(old) = self.transition(handle, ResourceState::Ready, Some(data))? {
            old.release_dependencies(self);
        }
        Ok(())
    }

    /// Loader callback: data could not be produced
    pub fn fail_loading<T: Resource>(&mut self, handle: Handle<T>) -> Result<(), ResourceError> {
        if let Some(old) = self.transition(handle, ResourceState::Failure, None)? {
            old.release_dependencies(self);
        }
        Ok(())
    }

    /// Drop the loaded data so it can be loaded again (Ready -> Empty)
    pub fn begin_reload<T: Resource>(&mut self, handle: Handle<T>) -> Result<(), ResourceError> {
        let entry = self.try_entry_mut(handle)?;
        if entry.state == ResourceState::Empty {
            return Err(ResourceError::InvalidState {
                path: entry.path.clone(),
                operation: "reload",
                state: entry.state,
            });
        }
        if let Some(old) = self.transition(handle, ResourceState::Empty, None)? {
            old.release_dependencies(self);
        }
        Ok(())
    }

    /// Register a new observer with an empty event queue
    pub fn register_observer(&mut self) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.event_queues.insert(id, Vec::new());
        id
    }

    /// Drop an observer and its pending events
    pub fn unregister_observer(&mut self, observer: ObserverId) {
        self.event_queues.remove(&observer);
    }

    fn observers_mut(&mut self, resource: ResourceId) -> Option<&mut Vec<ObserverId>> {
        fn get<T: Resource>(manager: &mut ResourceManager, key: DefaultKey) -> Option<&mut Vec<ObserverId>> {
            T::table_mut(manager).entries.get_mut(key).map(|entry| &mut entry.observers)
        }
        match resource.kind {
            ResourceKind::Model => get::<Model>(self, resource.key),
            ResourceKind::Material => get::<Material>(self, resource.key),
            ResourceKind::Texture => get::<Texture>(self, resource.key),
            ResourceKind::Font => get::<FontResource>(self, resource.key),
            ResourceKind::ParticleEmitter => get::<ParticleEmitterResource>(self, resource.key),
        }
    }

    /// Subscribe an observer to a resource's state changes (idempotent)
    pub fn subscribe(&mut self, resource: ResourceId, observer: ObserverId) {
        if let Some(observers) = self.observers_mut(resource) {
            if !observers.contains(&observer) {
                observers.push(observer);
            }
        }
    }

    /// Stop delivering a resource's state changes to an observer
    pub fn unsubscribe(&mut self, resource: ResourceId, observer: ObserverId) {
        if let Some(observers) = self.observers_mut(resource) {
            observers.retain(|o| *o != observer);
        }
        // Events already queued for this resource are stale now
        if let Some(queue) = self.event_queues.get_mut(&observer) {
            queue.retain(|change| change.resource != resource);
        }
    }

    /// Whether an observer is subscribed to a resource
    pub fn is_subscribed(&self, resource: ResourceId, observer: ObserverId) -> bool {
        fn has<T: Resource>(manager: &ResourceManager, key: DefaultKey, observer: ObserverId) -> bool {
            T::table(manager)
                .entries
                .get(key)
                .is_some_and(|entry| entry.observers.contains(&observer))
        }
        match resource.kind {
            ResourceKind::Model => has::<Model>(self, resource.key, observer),
            ResourceKind::Material => has::<Material>(self, resource.key, observer),
            ResourceKind::Texture => has::<Texture>(self, resource.key, observer),
            ResourceKind::Font => has::<FontResource>(self, resource.key, observer),
            ResourceKind::ParticleEmitter => has::<ParticleEmitterResource>(self, resource.key, observer),
        }
    }

    /// Take all queued notifications for an observer, oldest first
    pub fn drain_events(&mut self, observer: ObserverId) -> Vec<StateChange> {
        self.event_queues
            .get_mut(&observer)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Take a reference to the glyph set of a ready font at `size`
    pub fn acquire_font(&mut self, handle: Handle<FontResource>, size: u32) -> Option<Font> {
        let entry = self.fonts.entries.get_mut(handle.key())?;
        if entry.state != ResourceState::Ready {
            return None;
        }
        entry.data.as_mut().map(|font| font.acquire(size))
    }

    /// Release a glyph set obtained from [`Self::acquire_font`]
    pub fn release_font(&mut self, handle: Handle<FontResource>, font: Font) {
        if let Some(data) = self.fonts.entries.get_mut(handle.key()).and_then(|entry| entry.data.as_mut()) {
            data.release(font);
        }
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(ResourceConfig::default())
    }
}
