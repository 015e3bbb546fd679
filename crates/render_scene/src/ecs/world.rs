//! ECS World implementation

use super::{ComponentSet, ComponentType, Entity};
use crate::foundation::math::{Quat, Transform, Vec3};

/// Notification queued by the world for the render scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    /// The entity's transform was written from outside the scene
    EntityMoved(Entity),
    /// The entity was destroyed; its components must be released
    EntityDestroyed(Entity),
}

#[derive(Debug, Clone)]
struct EntityRecord {
    transform: Transform,
    components: ComponentSet,
}

/// ECS World containing all entities, their transforms and component registry
///
/// Entity ids are never recycled, so an id read back from a stream always
/// refers to the same slot.
pub struct World {
    name: String,
    entities: Vec<Option<EntityRecord>>,
    events: Vec<WorldEvent>,
    game_running: bool,
}

impl World {
    /// Create a new, unnamed world
    pub fn new() -> Self {
        Self::with_name("main")
    }

    /// Create a world with a name (used to derive per-world asset paths)
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            events: Vec::new(),
            game_running: false,
        }
    }

    /// World name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a new entity
    pub fn create_entity(&mut self) -> Entity {
        let entity = Entity::new(self.entities.len() as u32);
        self.entities.push(Some(EntityRecord {
            transform: Transform::identity(),
            components: ComponentSet::empty(),
        }));
        entity
    }

    /// Create an entity with a specific id, used when rebuilding a saved world
    ///
    /// # Panics
    /// Panics if the id is already alive.
    pub fn create_entity_at(&mut self, id: u32) -> Entity {
        let index = id as usize;
        if self.entities.len() <= index {
            self.entities.resize(index + 1, None);
        }
        assert!(self.entities[index].is_none(), "entity #{id} already exists");
        self.entities[index] = Some(EntityRecord {
            transform: Transform::identity(),
            components: ComponentSet::empty(),
        });
        Entity::new(id)
    }

    /// Destroy an entity and queue the notification for the scene
    pub fn destroy_entity(&mut self, entity: Entity) {
        if let Some(slot) = self.entities.get_mut(entity.index()) {
            if slot.take().is_some() {
                self.events.push(WorldEvent::EntityDestroyed(entity));
            }
        }
    }

    /// Whether the entity is alive
    pub fn is_valid(&self, entity: Entity) -> bool {
        matches!(self.entities.get(entity.index()), Some(Some(_)))
    }

    /// Get an iterator over all live entities
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_some())
            .map(|(index, _)| Entity::new(index as u32))
    }

    fn record(&self, entity: Entity) -> &EntityRecord {
        match self.entities.get(entity.index()) {
            Some(Some(record)) => record,
            _ => panic!("entity {entity} does not exist"),
        }
    }

    fn record_mut(&mut self, entity: Entity) -> &mut EntityRecord {
        match self.entities.get_mut(entity.index()) {
            Some(Some(record)) => record,
            _ => panic!("entity {entity} does not exist"),
        }
    }

    /// World transform of an entity
    pub fn transform(&self, entity: Entity) -> Transform {
        self.record(entity).transform
    }

    /// World position of an entity
    pub fn position(&self, entity: Entity) -> Vec3 {
        self.record(entity).transform.position
    }

    /// World rotation of an entity
    pub fn rotation(&self, entity: Entity) -> Quat {
        self.record(entity).transform.rotation
    }

    /// Set the transform and queue an [`WorldEvent::EntityMoved`]
    pub fn set_transform(&mut self, entity: Entity, transform: Transform) {
        self.record_mut(entity).transform = transform;
        self.events.push(WorldEvent::EntityMoved(entity));
    }

    /// Set only the position and queue an [`WorldEvent::EntityMoved`]
    pub fn set_position(&mut self, entity: Entity, position: Vec3) {
        let mut transform = self.transform(entity);
        transform.position = position;
        self.set_transform(entity, transform);
    }

    /// Set only the rotation and queue an [`WorldEvent::EntityMoved`]
    pub fn set_rotation(&mut self, entity: Entity, rotation: Quat) {
        let mut transform = self.transform(entity);
        transform.rotation = rotation;
        self.set_transform(entity, transform);
    }

    /// Set the transform without queuing an event.
    ///
    /// The caller is responsible for dispatching the move itself.
    pub fn set_transform_without_notify(&mut self, entity: Entity, transform: Transform) {
        self.record_mut(entity).transform = transform;
    }

    /// Take all queued events, oldest first
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Whether the game simulation is running (as opposed to editing)
    pub const fn is_game_running(&self) -> bool {
        self.game_running
    }

    /// Start or stop the game simulation
    pub fn set_game_running(&mut self, running: bool) {
        self.game_running = running;
    }

    /// Whether the entity has a component of the given kind
    pub fn has_component(&self, entity: Entity, ty: ComponentType) -> bool {
        matches!(
            self.entities.get(entity.index()),
            Some(Some(record)) if record.components.contains(ty.as_set())
        )
    }

    /// Component kinds attached to the entity
    pub fn components(&self, entity: Entity) -> ComponentSet {
        self.entities
            .get(entity.index())
            .and_then(Option::as_ref)
            .map_or(ComponentSet::empty(), |record| record.components)
    }

    /// Called by the scene after it created a component
    pub fn on_component_created(&mut self, entity: Entity, ty: ComponentType) {
        log::trace!("component {} created on {}", ty.name(), entity);
        self.record_mut(entity).components.insert(ty.as_set());
    }

    /// Called by the scene after it destroyed a component
    ///
    /// Tolerates entities that were already destroyed.
    pub fn on_component_destroyed(&mut self, entity: Entity, ty: ComponentType) {
        log::trace!("component {} destroyed on {}", ty.name(), entity);
        if let Some(Some(record)) = self.entities.get_mut(entity.index()) {
            record.components.remove(ty.as_set());
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
