//! Entry points exposed to gameplay scripts
//!
//! Thin wrappers over the scene API with script-friendly argument types: no
//! panics on missing resources, plain integers for indices and colours.
//! [`FUNCTIONS`] lists the names a script binding layer registers.

use crate::assets::{lock_resources, Handle, Model, SharedResources, Texture};
use crate::ecs::{Entity, World};
use crate::foundation::math::{Vec2, Vec3};
use crate::scene::{GrassRotationMode, RenderScene};

/// Names of the exposed entry points, as registered with a script runtime
pub const FUNCTIONS: &[&str] = &[
    "castCameraRay",
    "getTexturePixel",
    "getModelBoneIndex",
    "setModelInstancePath",
    "enableModelInstance",
    "getTerrainHeightAt",
    "setTerrainHeightAt",
    "getTerrainNormalAt",
    "addTerrainGrass",
    "setTerrainGrass",
    "addDebugLine",
    "addDebugCross",
    "addDebugCircle",
    "addDebugSphere",
    "getGlobalLODMultiplier",
    "setGlobalLODMultiplier",
    "getActiveGlobalLight",
];

/// Whether a binding layer should expose `name`
pub fn is_exposed(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

/// World position hit by a ray through a screen position of `camera`
///
/// Without a position the ray goes through the centre of the viewport.
pub fn cast_camera_ray(
    scene: &RenderScene,
    world: &World,
    camera: Entity,
    screen_pos: Option<(f32, f32)>,
) -> Option<Vec3> {
    let (x, y) = screen_pos.unwrap_or_else(|| {
        let size = scene.camera_screen_size(camera);
        (size.x * 0.5, size.y * 0.5)
    });
    let ray = scene.camera_ray(world, camera, Vec2::new(x, y));
    scene
        .cast_ray(world, ray.origin, ray.direction, None)
        .map(|hit| hit.position())
}

/// Packed RGBA8 pixel of a texture, 0 unless it is ready and 4 bytes per pixel
pub fn texture_pixel(resources: &SharedResources, texture: Handle<Texture>, x: i64, y: i64) -> u32 {
    lock_resources(resources)
        .get(texture)
        .map_or(0, |data| data.pixel(x, y))
}

/// Index of a named bone, 0 when the model is not ready or lacks the bone
pub fn model_bone_index(resources: &SharedResources, model: Handle<Model>, bone: &str) -> usize {
    lock_resources(resources)
        .get(model)
        .and_then(|data| data.bone_index(bone))
        .unwrap_or(0)
}

/// Height of a terrain at a grid sample, in local units
pub fn terrain_height_at_sample(scene: &RenderScene, terrain: Entity, x: usize, z: usize) -> f32 {
    let scale = scene.terrain_scale(terrain);
    scene.terrain_height_at(terrain, x as f32 * scale.x, z as f32 * scale.z)
}

/// Append a grass type and configure it; returns its index
pub fn add_terrain_grass(
    scene: &mut RenderScene,
    terrain: Entity,
    model_path: &str,
    density: u32,
    distance: f32,
    rotation_mode: u32,
) -> usize {
    scene.add_grass(terrain, None);
    let index = scene.grass_count(terrain) - 1;
    set_terrain_grass(scene, terrain, index, model_path, density, distance, rotation_mode);
    index
}

/// Reconfigure an existing grass type; unknown rotation modes keep the current one
pub fn set_terrain_grass(
    scene: &mut RenderScene,
    terrain: Entity,
    index: usize,
    model_path: &str,
    density: u32,
    distance: f32,
    rotation_mode: u32,
) {
    scene.set_grass_path(terrain, index, model_path);
    scene.set_grass_density(terrain, index, density);
    scene.set_grass_distance(terrain, index, distance);
    match GrassRotationMode::from_u32(rotation_mode) {
        Some(mode) => scene.set_grass_rotation_mode(terrain, index, mode),
        None => log::warn!("Ignoring unknown grass rotation mode {rotation_mode}"),
    }
}
