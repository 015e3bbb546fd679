//! Component kinds owned by the render scene

use bitflags::bitflags;

/// Every component kind the render scene can attach to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// Mesh set from a model resource
    ModelInstance,
    /// Directional light with fog and shadow cascades
    GlobalLight,
    /// Local omni/spot light
    PointLight,
    /// Projected decal
    Decal,
    /// Camera
    Camera,
    /// Heightmap terrain with grass
    Terrain,
    /// Transform driven by a bone of another entity
    BoneAttachment,
    /// Reflection/irradiance probe
    EnvironmentProbe,
    /// Particle emitter
    ParticleEmitter,
    /// Text rendered in the world
    TextMesh,
}

impl ComponentType {
    /// All kinds, in binary serialization section order where it applies
    pub const ALL: [Self; 10] = [
        Self::Camera,
        Self::ModelInstance,
        Self::PointLight,
        Self::GlobalLight,
        Self::Terrain,
        Self::ParticleEmitter,
        Self::BoneAttachment,
        Self::EnvironmentProbe,
        Self::Decal,
        Self::TextMesh,
    ];

    /// Stable name used in structured records and diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Self::ModelInstance => "renderable",
            Self::GlobalLight => "global_light",
            Self::PointLight => "point_light",
            Self::Decal => "decal",
            Self::Camera => "camera",
            Self::Terrain => "terrain",
            Self::BoneAttachment => "bone_attachment",
            Self::EnvironmentProbe => "environment_probe",
            Self::ParticleEmitter => "particle_emitter",
            Self::TextMesh => "text_mesh",
        }
    }

    /// Look a kind up by its stable name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }

    /// Single-bit set for this kind
    pub const fn as_set(self) -> ComponentSet {
        match self {
            Self::ModelInstance => ComponentSet::MODEL_INSTANCE,
            Self::GlobalLight => ComponentSet::GLOBAL_LIGHT,
            Self::PointLight => ComponentSet::POINT_LIGHT,
            Self::Decal => ComponentSet::DECAL,
            Self::Camera => ComponentSet::CAMERA,
            Self::Terrain => ComponentSet::TERRAIN,
            Self::BoneAttachment => ComponentSet::BONE_ATTACHMENT,
            Self::EnvironmentProbe => ComponentSet::ENVIRONMENT_PROBE,
            Self::ParticleEmitter => ComponentSet::PARTICLE_EMITTER,
            Self::TextMesh => ComponentSet::TEXT_MESH,
        }
    }
}

bitflags! {
    /// Set of component kinds attached to one entity
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentSet: u16 {
        /// Model instance
        const MODEL_INSTANCE = 1 << 0;
        /// Global light
        const GLOBAL_LIGHT = 1 << 1;
        /// Point light
        const POINT_LIGHT = 1 << 2;
        /// Decal
        const DECAL = 1 << 3;
        /// Camera
        const CAMERA = 1 << 4;
        /// Terrain
        const TERRAIN = 1 << 5;
        /// Bone attachment
        const BONE_ATTACHMENT = 1 << 6;
        /// Environment probe
        const ENVIRONMENT_PROBE = 1 << 7;
        /// Particle emitter
        const PARTICLE_EMITTER = 1 << 8;
        /// Text mesh
        const TEXT_MESH = 1 << 9;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_names_round_trip() {
        for ty in ComponentType::ALL {
            assert_eq!(ComponentType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(ComponentType::from_name("audio_source"), None);
    }

    #[test]
    fn test_component_bits_are_distinct() {
        let mut all = ComponentSet::empty();
        for ty in ComponentType::ALL {
            assert!(!all.contains(ty.as_set()));
            all |= ty.as_set();
        }
        assert_eq!(all, ComponentSet::all());
    }
}
