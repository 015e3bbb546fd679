//! Heightmap terrains and their grass
//!
//! A terrain's heights come from the first texture of its material, copied
//! into a sample grid when the material becomes ready. All height, normal and
//! size queries work in the terrain's local space: `x`/`z` in world units
//! along the grid, `y` scaled by `scale.y`. Sample `(i, j)` sits at
//! `(i * scale.x, h, j * scale.z)`.

use super::render_scene::{component, component_mut, RenderScene};
use crate::assets::{lock_resources, Handle, Material, Model, ResourceManager, Texture};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::constants::PI;
use crate::foundation::math::utils::quat_from_euler;
use crate::foundation::math::{Mat4, Quat, RigidTransform, Vec2, Vec3};
use crate::spatial::{ray_triangle_intersection, Frustum, AABB};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Side of the square patches grass is generated in, in local units
pub const GRASS_PATCH_SIZE: f32 = 16.0;

/// How grass instances are oriented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum GrassRotationMode {
    /// Random rotation around every axis
    #[default]
    AllRandom = 0,
    /// Upright with a random yaw
    YUp = 1,
    /// Follows the terrain normal with a random yaw
    AlignWithNormal = 2,
}

impl GrassRotationMode {
    /// Decode a serialized mode
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::AllRandom),
            1 => Some(Self::YUp),
            2 => Some(Self::AlignWithNormal),
            _ => None,
        }
    }

    fn rotation(self, rng: &mut StdRng, normal: Vec3) -> Quat {
        let yaw = Quat::from_axis_angle(&Vec3::y_axis(), rng.gen_range(0.0..2.0 * PI));
        match self {
            Self::AllRandom => quat_from_euler(&Vec3::new(
                rng.gen_range(0.0..2.0 * PI),
                rng.gen_range(0.0..2.0 * PI),
                rng.gen_range(0.0..2.0 * PI),
            )),
            Self::YUp => yaw,
            Self::AlignWithNormal => {
                Quat::rotation_between(&Vec3::y(), &normal).unwrap_or_else(Quat::identity) * yaw
            }
        }
    }
}

/// One kind of grass planted on a terrain
#[derive(Debug, Clone, PartialEq)]
pub struct GrassType {
    /// Grass model reference
    pub model: Option<Handle<Model>>,
    /// Instances per patch
    pub density: u32,
    /// Distance from the viewer beyond which no grass is produced
    pub distance: f32,
    /// Instance orientation
    pub rotation_mode: GrassRotationMode,
}

impl Default for GrassType {
    fn default() -> Self {
        Self {
            model: None,
            density: 10,
            distance: 50.0,
            rotation_mode: GrassRotationMode::default(),
        }
    }
}

/// Height samples normalized to `[0, 1]`
#[derive(Debug, Clone, Default, PartialEq)]
struct Heightmap {
    width: usize,
    height: usize,
    samples: Vec<f32>,
}

impl Heightmap {
    fn from_texture(texture: &Texture) -> Self {
        let width = texture.width as usize;
        let height = texture.height as usize;
        let mut samples = Vec::with_capacity(width * height);
        for j in 0..i64::from(texture.height) {
            for i in 0..i64::from(texture.width) {
                samples.push(texture.height_sample(i, j));
            }
        }
        Self { width, height, samples }
    }

    fn sample(&self, i: i64, j: i64) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let i = i.clamp(0, self.width as i64 - 1) as usize;
        let j = j.clamp(0, self.height as i64 - 1) as usize;
        self.samples[i + j * self.width]
    }
}

/// Terrain component
#[derive(Debug, Clone, PartialEq)]
pub struct Terrain {
    pub(super) entity: Entity,
    pub(super) layer_mask: u64,
    pub(super) scale: Vec3,
    pub(super) material: Option<Handle<Material>>,
    pub(super) grass: Vec<GrassType>,
    heightmap: Option<Heightmap>,
    /// First texture of the ready material, watched until its heights are read
    heightmap_texture: Option<Handle<Texture>>,
}

impl Terrain {
    fn new(entity: Entity) -> Self {
        Self {
            entity,
            layer_mask: 1,
            scale: Vec3::new(1.0, 1.0, 1.0),
            material: None,
            grass: Vec::new(),
            heightmap: None,
            heightmap_texture: None,
        }
    }

    /// Owning entity
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Render layers
    pub const fn layer_mask(&self) -> u64 {
        self.layer_mask
    }

    /// Grid spacing in `x`/`z`, height range in `y`
    pub const fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Material reference; its first texture is the heightmap
    pub const fn material(&self) -> Option<Handle<Material>> {
        self.material
    }

    /// Grass kinds
    pub fn grass(&self) -> &[GrassType] {
        &self.grass
    }

    /// Whether height data is loaded
    pub const fn has_heightmap(&self) -> bool {
        self.heightmap.is_some()
    }

    /// Sample grid size
    pub fn resolution(&self) -> (usize, usize) {
        self.heightmap.as_ref().map_or((0, 0), |map| (map.width, map.height))
    }

    fn grid_height(&self, i: i64, j: i64) -> f32 {
        self.heightmap.as_ref().map_or(0.0, |map| map.sample(i, j)) * self.scale.y
    }

    /// Interpolated height at a local position
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let gx = x / self.scale.x;
        let gz = z / self.scale.z;
        let ix = gx.floor();
        let iz = gz.floor();
        let dec_x = gx - ix;
        let dec_z = gz - iz;
        let (i, j) = (ix as i64, iz as i64);
        let h0 = self.grid_height(i, j);
        if dec_x > dec_z {
            let h1 = self.grid_height(i + 1, j);
            let h2 = self.grid_height(i + 1, j + 1);
            h0 + (h1 - h0) * dec_x + (h2 - h1) * dec_z
        } else {
            let h1 = self.grid_height(i + 1, j + 1);
            let h2 = self.grid_height(i, j + 1);
            h0 + (h2 - h0) * dec_z + (h1 - h2) * dec_x
        }
    }

    /// Surface normal at a local position
    pub fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        let dx = self.scale.x;
        let dz = self.scale.z;
        let left = self.height_at(x - dx, z);
        let right = self.height_at(x + dx, z);
        let back = self.height_at(x, z - dz);
        let front = self.height_at(x, z + dz);
        Vec3::new((left - right) * dz, 2.0 * dx * dz, (back - front) * dx).normalize()
    }

    /// Extent in local `x` and `z`
    pub fn size(&self) -> Vec2 {
        let (width, height) = self.resolution();
        Vec2::new(
            width.saturating_sub(1) as f32 * self.scale.x,
            height.saturating_sub(1) as f32 * self.scale.z,
        )
    }

    /// Local bounds of the surface
    pub fn aabb(&self) -> AABB {
        let Some(map) = &self.heightmap else {
            return AABB::new(Vec3::zeros(), Vec3::zeros());
        };
        let (min, max) = map
            .samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        let (min, max) = if min > max { (0.0, 0.0) } else { (min, max) };
        let size = self.size();
        AABB::new(
            Vec3::new(0.0, min * self.scale.y, 0.0),
            Vec3::new(size.x, max * self.scale.y, size.y),
        )
    }

    /// Generate the grass patches of one kind near `viewer` (local space)
    fn grass_patches(
        &self,
        grass_index: usize,
        viewer: Vec3,
        transform: &RigidTransform,
        frustum: &Frustum,
        emit: &mut dyn FnMut(Vec<Mat4>),
    ) {
        let grass = &self.grass[grass_index];
        let size = self.size();
        let half_diagonal = GRASS_PATCH_SIZE * std::f32::consts::FRAC_1_SQRT_2;
        let reach = grass.distance + half_diagonal;
        let patch_range = |center: f32, extent: f32| {
            let first = ((center - reach) / GRASS_PATCH_SIZE).floor().max(0.0) as i64;
            let last = ((center + reach).min(extent) / GRASS_PATCH_SIZE).floor() as i64;
            first..=last
        };

        for pz in patch_range(viewer.z, size.y) {
            for px in patch_range(viewer.x, size.x) {
                let min_x = px as f32 * GRASS_PATCH_SIZE;
                let min_z = pz as f32 * GRASS_PATCH_SIZE;
                let center_x = min_x + GRASS_PATCH_SIZE * 0.5;
                let center_z = min_z + GRASS_PATCH_SIZE * 0.5;
                let center = Vec3::new(center_x, self.height_at(center_x, center_z), center_z);
                if (center.xz() - viewer.xz()).norm() > reach {
                    continue;
                }
                let patch_radius = half_diagonal + self.scale.y;
                if !frustum.intersects_sphere(transform.transform_point(&center), patch_radius) {
                    continue;
                }

                let mut rng = StdRng::seed_from_u64(patch_seed(self.entity, grass_index, px, pz));
                let mut matrices = Vec::with_capacity(grass.density as usize);
                for _ in 0..grass.density {
                    let x = min_x + rng.gen_range(0.0..GRASS_PATCH_SIZE);
                    let z = min_z + rng.gen_range(0.0..GRASS_PATCH_SIZE);
                    let rotation = grass.rotation_mode.rotation(&mut rng, self.normal_at(x, z));
                    if x > size.x || z > size.y {
                        continue;
                    }
                    let position = Vec3::new(x, self.height_at(x, z), z);
                    if (position.xz() - viewer.xz()).norm() > grass.distance {
                        continue;
                    }
                    matrices.push(Mat4::new_translation(&position) * rotation.to_homogeneous());
                }
                if !matrices.is_empty() {
                    emit(matrices);
                }
            }
        }
    }

    /// Closest hit of a local-space ray, walking the grid cell by cell
    fn cast_local_ray(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let (width, height) = self.resolution();
        if width < 2 || height < 2 {
            return None;
        }
        let entry = self.aabb().expanded(1e-3).intersect_ray(origin, dir)?;
        let start = origin + dir * entry;
        let (sx, sz) = (self.scale.x, self.scale.z);
        let last_x = width as i64 - 2;
        let last_z = height as i64 - 2;
        let mut cx = ((start.x / sx).floor() as i64).clamp(0, last_x);
        let mut cz = ((start.z / sz).floor() as i64).clamp(0, last_z);

        let axis = |d: f32, cell: i64, size: f32, from: f32| -> (i64, f32, f32) {
            if d == 0.0 {
                return (0, f32::INFINITY, f32::INFINITY);
            }
            let step = if d > 0.0 { 1 } else { -1 };
            let boundary = (cell + i64::from(d > 0.0)) as f32 * size;
            (step, entry + (boundary - from) / d, size / d.abs())
        };
        let (step_x, mut t_max_x, t_delta_x) = axis(dir.x, cx, sx, start.x);
        let (step_z, mut t_max_z, t_delta_z) = axis(dir.z, cz, sz, start.z);

        while (0..=last_x).contains(&cx) && (0..=last_z).contains(&cz) {
            let x = cx as f32 * sx;
            let z = cz as f32 * sz;
            let p0 = Vec3::new(x, self.grid_height(cx, cz), z);
            let p1 = Vec3::new(x + sx, self.grid_height(cx + 1, cz), z);
            let p2 = Vec3::new(x + sx, self.grid_height(cx + 1, cz + 1), z + sz);
            let p3 = Vec3::new(x, self.grid_height(cx, cz + 1), z + sz);
            let hit = [
                ray_triangle_intersection(origin, dir, p0, p1, p2),
                ray_triangle_intersection(origin, dir, p0, p2, p3),
            ]
            .into_iter()
            .flatten()
            .reduce(f32::min);
            if hit.is_some() {
                return hit;
            }

            if t_max_x.is_infinite() && t_max_z.is_infinite() {
                return None;
            }
            if t_max_x < t_max_z {
                cx += step_x;
                t_max_x += t_delta_x;
            } else {
                cz += step_z;
                t_max_z += t_delta_z;
            }
        }
        None
    }
}

/// Terrain data handed to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainInfo {
    /// Owning entity
    pub entity: Entity,
    /// Local to world, without the terrain scale
    pub transform: Mat4,
    /// Grid spacing and height range
    pub scale: Vec3,
    /// Surface material
    pub material: Handle<Material>,
    /// Render layers
    pub layer_mask: u64,
    /// Sample grid size
    pub resolution: (usize, usize),
}

/// One patch of grass instances
#[derive(Debug, Clone, PartialEq)]
pub struct GrassInfo {
    /// Terrain the grass grows on
    pub terrain: Entity,
    /// Index of the grass kind on that terrain
    pub grass_index: usize,
    /// Model drawn per instance
    pub model: Handle<Model>,
    /// World matrix per instance
    pub matrices: Vec<Mat4>,
}

fn patch_seed(entity: Entity, grass_index: usize, x: i64, z: i64) -> u64 {
    let mut seed = u64::from(entity.id());
    for part in [grass_index as u64, x as u64, z as u64] {
        seed = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15).rotate_left(17) ^ part;
    }
    seed
}

impl RenderScene {
    /// Add a flat terrain without a material
    pub fn create_terrain(&mut self, world: &mut World, entity: Entity) {
        self.terrains.insert(entity, Terrain::new(entity));
        world.on_component_created(entity, ComponentType::Terrain);
    }

    /// Remove an entity's terrain and release its material and grass models
    pub fn destroy_terrain(&mut self, world: &mut World, entity: Entity) {
        self.destroy_component(world, ComponentType::Terrain, entity);
    }

    pub(super) fn remove_terrain(&mut self, res: &mut ResourceManager, entity: Entity) {
        if !self.terrains.contains_key(&entity) {
            return;
        }
        self.set_terrain_material(res, entity, None);
        if let Some(terrain) = self.terrains.remove(&entity) {
            for model in terrain.grass.into_iter().filter_map(|grass| grass.model) {
                res.unload(model);
            }
        }
    }

    /// Terrain component of an entity
    ///
    /// # Panics
    /// Panics if the entity has no terrain.
    pub fn terrain(&self, entity: Entity) -> &Terrain {
        component(&self.terrains, entity, ComponentType::Terrain)
    }

    fn terrain_mut(&mut self, entity: Entity) -> &mut Terrain {
        component_mut(&mut self.terrains, entity, ComponentType::Terrain)
    }

    /// Entities with a terrain
    pub fn terrains(&self) -> impl Iterator<Item = Entity> + '_ {
        self.terrains.keys().copied()
    }

    /// Path of the terrain material, empty when none
    pub fn terrain_material_path(&self, entity: Entity) -> String {
        self.terrain(entity)
            .material
            .map(|material| lock_resources(&self.resources).path(material).to_string())
            .unwrap_or_default()
    }

    /// Assign the material by path; an empty path clears it
    pub fn set_terrain_material_path(&mut self, entity: Entity, path: &str) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let material = (!path.is_empty()).then(|| res.load::<Material>(path));
        self.set_terrain_material(&mut res, entity, material);
    }

    /// Replace the material; takes ownership of one reference to `material`
    pub(super) fn set_terrain_material(&mut self, res: &mut ResourceManager, entity: Entity, material: Option<Handle<Material>>) {
        let old = std::mem::replace(&mut self.terrain_mut(entity).material, material);
        if let Some(material) = material {
            self.watch(res, material.id());
        }
        // Stop watching the old heightmap before the old material frees it
        self.refresh_heightmap(res, entity);
        if let Some(old) = old {
            self.unwatch(res, old.id());
            res.unload(old);
        }
    }

    /// Re-read the heights and move the texture watch to the current heightmap
    fn refresh_heightmap(&mut self, res: &mut ResourceManager, entity: Entity) {
        let (material, watched) = {
            let terrain = self.terrain(entity);
            (terrain.material, terrain.heightmap_texture)
        };
        let texture = material
            .and_then(|material| res.get(material))
            .and_then(|material| material.texture(0));
        if texture != watched {
            if let Some(texture) = texture {
                self.watch(res, texture.id());
            }
            if let Some(watched) = watched {
                self.unwatch(res, watched.id());
            }
        }

        let heightmap = texture.and_then(|texture| res.get(texture)).map(Heightmap::from_texture);
        if material.is_some_and(|m| res.is_ready(m)) && heightmap.is_none() {
            log::debug!("Terrain {entity} waits for its heightmap texture");
        }
        let terrain = self.terrain_mut(entity);
        terrain.heightmap_texture = texture;
        terrain.heightmap = heightmap;
    }

    pub(super) fn heightmap_texture_changed(&mut self, res: &mut ResourceManager, texture: Handle<Texture>) {
        let affected: Vec<Entity> = self
            .terrains
            .values()
            .filter(|terrain| terrain.heightmap_texture == Some(texture))
            .map(|terrain| terrain.entity)
            .collect();
        for entity in affected {
            self.refresh_heightmap(res, entity);
        }
    }

    pub(super) fn terrain_material_changed(&mut self, res: &mut ResourceManager, material: Handle<Material>) {
        let affected: Vec<Entity> = self
            .terrains
            .values()
            .filter(|terrain| terrain.material == Some(material))
            .map(|terrain| terrain.entity)
            .collect();
        for entity in affected {
            self.refresh_heightmap(res, entity);
        }
    }

    /// Render layers
    pub fn terrain_layer_mask(&self, entity: Entity) -> u64 {
        self.terrain(entity).layer_mask
    }

    /// Set the render layers
    pub fn set_terrain_layer_mask(&mut self, entity: Entity, layer_mask: u64) {
        self.terrain_mut(entity).layer_mask = layer_mask;
    }

    /// Grid spacing (`x`, `z`) and height range (`y`)
    pub fn terrain_scale(&self, entity: Entity) -> Vec3 {
        self.terrain(entity).scale
    }

    /// Set the scale; the grid stays square so `z` follows `x`
    pub fn set_terrain_scale(&mut self, entity: Entity, scale: Vec3) {
        self.terrain_mut(entity).scale = Vec3::new(scale.x, scale.y, scale.x);
    }

    /// Interpolated height at a local position
    pub fn terrain_height_at(&self, entity: Entity, x: f32, z: f32) -> f32 {
        self.terrain(entity).height_at(x, z)
    }

    /// Surface normal at a local position
    pub fn terrain_normal_at(&self, entity: Entity, x: f32, z: f32) -> Vec3 {
        self.terrain(entity).normal_at(x, z)
    }

    /// Overwrite one height sample, given in local height units; ignored outside the grid
    pub fn set_terrain_height_at(&mut self, entity: Entity, x: usize, z: usize, height: f32) {
        let terrain = self.terrain_mut(entity);
        let scale_y = terrain.scale.y;
        let Some(map) = terrain.heightmap.as_mut() else {
            return;
        };
        if x < map.width && z < map.height && scale_y != 0.0 {
            map.samples[x + z * map.width] = height / scale_y;
        }
    }

    /// Extent in local `x` and `z`
    pub fn terrain_size(&self, entity: Entity) -> Vec2 {
        self.terrain(entity).size()
    }

    /// Local bounds of the surface
    pub fn terrain_aabb(&self, entity: Entity) -> AABB {
        self.terrain(entity).aabb()
    }

    /// Sample grid size
    pub fn terrain_resolution(&self, entity: Entity) -> (usize, usize) {
        self.terrain(entity).resolution()
    }

    /// World-space ray against one terrain; returns the ray parameter of the closest hit
    pub fn cast_ray_terrain(&self, world: &World, entity: Entity, origin: Vec3, dir: Vec3) -> Option<f32> {
        let terrain = self.terrain(entity);
        let material = terrain.material?;
        if !lock_resources(&self.resources).is_ready(material) {
            return None;
        }
        let transform = world.transform(entity).rigid_part();
        let inverse = transform.rotation.inverse();
        let local_origin = inverse * (origin - transform.position);
        let local_dir = inverse * dir;
        terrain.cast_local_ray(local_origin, local_dir)
    }

    /// Terrains with a loaded surface whose bounds intersect the frustum
    pub fn terrain_infos(&self, world: &World, frustum: &Frustum) -> Vec<TerrainInfo> {
        let res = lock_resources(&self.resources);
        self.terrains
            .values()
            .filter(|terrain| terrain.heightmap.is_some())
            .filter_map(|terrain| {
                let material = terrain.material.filter(|m| res.is_ready(*m))?;
                let transform = world.transform(terrain.entity).rigid_part();
                let aabb = terrain.aabb();
                let center = transform.transform_point(&aabb.center());
                frustum
                    .intersects_sphere(center, aabb.extents().norm())
                    .then(|| TerrainInfo {
                        entity: terrain.entity,
                        transform: transform.to_transform().to_matrix(),
                        scale: terrain.scale,
                        material,
                        layer_mask: terrain.layer_mask,
                        resolution: terrain.resolution(),
                    })
            })
            .collect()
    }

    /// Grass patches in the frustum, within each grass kind's distance of the frustum origin
    pub fn grass_infos(&self, world: &World, frustum: &Frustum) -> Vec<GrassInfo> {
        if !self.grass_enabled {
            return Vec::new();
        }
        let res = lock_resources(&self.resources);
        let mut infos = Vec::new();
        for terrain in self.terrains.values().filter(|t| t.heightmap.is_some()) {
            if !terrain.material.is_some_and(|m| res.is_ready(m)) {
                continue;
            }
            let transform = world.transform(terrain.entity).rigid_part();
            let world_matrix = transform.to_transform().to_matrix();
            let viewer = transform.inverse().transform_point(&frustum.position);
            for (grass_index, grass) in terrain.grass.iter().enumerate() {
                let Some(model) = grass.model.filter(|m| res.is_ready(*m)) else {
                    continue;
                };
                if grass.density == 0 {
                    continue;
                }
                terrain.grass_patches(grass_index, viewer, &transform, frustum, &mut |matrices| {
                    infos.push(GrassInfo {
                        terrain: terrain.entity,
                        grass_index,
                        model,
                        matrices: matrices.into_iter().map(|local| world_matrix * local).collect(),
                    });
                });
            }
        }
        infos
    }

    /// Number of grass kinds
    pub fn grass_count(&self, entity: Entity) -> usize {
        self.terrain(entity).grass.len()
    }

    /// Insert a default grass kind at `index`, or append when `None`
    pub fn add_grass(&mut self, entity: Entity, index: Option<usize>) {
        let grass = &mut self.terrain_mut(entity).grass;
        let index = index.map_or(grass.len(), |i| i.min(grass.len()));
        grass.insert(index, GrassType::default());
    }

    /// Remove a grass kind and release its model
    pub fn remove_grass(&mut self, entity: Entity, index: usize) {
        let removed = self.terrain_mut(entity).grass.remove(index);
        if let Some(model) = removed.model {
            lock_resources(&self.resources).unload(model);
        }
    }

    fn grass_mut(&mut self, entity: Entity, index: usize) -> &mut GrassType {
        &mut self.terrain_mut(entity).grass[index]
    }

    /// Model path of a grass kind, empty when none
    pub fn grass_path(&self, entity: Entity, index: usize) -> String {
        self.terrain(entity).grass[index]
            .model
            .map(|model| lock_resources(&self.resources).path(model).to_string())
            .unwrap_or_default()
    }

    /// Assign a grass kind's model by path; an empty path clears it
    pub fn set_grass_path(&mut self, entity: Entity, index: usize, path: &str) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let model = (!path.is_empty()).then(|| res.load::<Model>(path));
        if let Some(old) = std::mem::replace(&mut self.grass_mut(entity, index).model, model) {
            res.unload(old);
        }
    }

    /// Instances per patch
    pub fn grass_density(&self, entity: Entity, index: usize) -> u32 {
        self.terrain(entity).grass[index].density
    }

    /// Set the instances per patch
    pub fn set_grass_density(&mut self, entity: Entity, index: usize, density: u32) {
        self.grass_mut(entity, index).density = density;
    }

    /// Distance limit of a grass kind
    pub fn grass_distance(&self, entity: Entity, index: usize) -> f32 {
        self.terrain(entity).grass[index].distance
    }

    /// Set the distance limit, clamped to be non-negative
    pub fn set_grass_distance(&mut self, entity: Entity, index: usize, distance: f32) {
        self.grass_mut(entity, index).distance = distance.max(0.0);
    }

    /// Orientation policy of a grass kind
    pub fn grass_rotation_mode(&self, entity: Entity, index: usize) -> GrassRotationMode {
        self.terrain(entity).grass[index].rotation_mode
    }

    /// Set the orientation policy
    pub fn set_grass_rotation_mode(&mut self, entity: Entity, index: usize, mode: GrassRotationMode) {
        self.grass_mut(entity, index).rotation_mode = mode;
    }
}
