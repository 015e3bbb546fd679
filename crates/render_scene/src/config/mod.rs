//! Configuration system
//!
//! Scene settings load from TOML or RON, picked by file extension.

use crate::foundation::math::Vec3;
use crate::spatial::{CullingConfig, OctreeConfig, AABB, MAX_CULL_BUCKETS};
pub use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Render scene settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Minimum corner of the region indexed by the culling octree
    pub culling_min: [f32; 3],
    /// Maximum corner of the region indexed by the culling octree
    pub culling_max: [f32; 3],
    /// Entities per octree node before it subdivides
    pub max_entities_per_node: usize,
    /// Octree depth limit
    pub max_depth: u32,
    /// Smallest octree node half-size
    pub min_node_size: f32,
    /// Upper bound on culling buckets (and parallel tasks) per query
    pub max_cull_buckets: usize,
    /// Entities per culling bucket
    pub cull_bucket_capacity: usize,
    /// Scene-wide LOD distance multiplier
    pub global_lod_multiplier: f32,
    /// Whether grass is produced for terrains
    pub grass_enabled: bool,
    /// Root directory of per-world data (probe textures)
    pub probe_root: String,
    /// Texture loaded into new environment probes
    pub default_probe_texture: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            culling_min: [-4096.0; 3],
            culling_max: [4096.0; 3],
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
            max_cull_buckets: MAX_CULL_BUCKETS,
            cull_bucket_capacity: 256,
            global_lod_multiplier: 1.0,
            grass_enabled: true,
            probe_root: "universes".to_string(),
            default_probe_texture: "models/common/default_probe.dds".to_string(),
        }
    }
}

impl Config for SceneConfig {}

impl SceneConfig {
    /// Culling system settings derived from this config
    pub fn culling(&self) -> CullingConfig {
        CullingConfig {
            bounds: AABB::new(Vec3::from(self.culling_min), Vec3::from(self.culling_max)),
            octree: OctreeConfig {
                max_entities_per_node: self.max_entities_per_node,
                max_depth: self.max_depth,
                min_node_size: self.min_node_size,
            },
            bucket_capacity: self.cull_bucket_capacity,
            max_buckets: self.max_cull_buckets,
        }
    }
}
