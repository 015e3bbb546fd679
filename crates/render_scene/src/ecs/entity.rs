//! Entity implementation

/// Entity identifier
///
/// A plain index into the owning [`World`](super::World). An optional entity
/// (`Option<Entity>`) is written to streams as `-1` when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: u32,
}

impl Entity {
    /// Create a new entity with the given ID
    pub(crate) const fn new(id: u32) -> Self {
        Self { id }
    }

    /// Get the entity ID
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Get the entity ID as a table index
    pub const fn index(&self) -> usize {
        self.id as usize
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.id)
    }
}

/// Encode an optional entity for serialization (`-1` means none)
pub fn entity_to_i32(entity: Option<Entity>) -> i32 {
    entity.map_or(-1, |e| e.id as i32)
}

/// Decode an entity written by [`entity_to_i32`]
pub fn entity_from_i32(value: i32) -> Option<Entity> {
    u32::try_from(value).ok().map(Entity::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_sentinel_encoding() {
        assert_eq!(entity_to_i32(None), -1);
        assert_eq!(entity_from_i32(-1), None);
        assert_eq!(entity_from_i32(7), Some(Entity::new(7)));
        assert_eq!(entity_to_i32(Some(Entity::new(7))), 7);
    }
}
