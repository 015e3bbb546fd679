//! Model resource: meshes, skeleton and LOD table
//!
//! Geometry is kept on the CPU only for picking. Skinned meshes use rigid
//! skinning (one bone per vertex), which is enough for ray casts against
//! animated poses.

use super::materials::Material;
use super::resource_manager::Handle;
use crate::foundation::math::{Quat, RigidTransform, Vec3};
use crate::spatial::ray_triangle_intersection;
use std::sync::Arc;

/// Maximum number of LOD levels a model can author
pub const MAX_LOD_COUNT: usize = 4;

/// Triangle soup used for ray casts
#[derive(Debug, Clone, Default)]
pub struct MeshGeometry {
    /// Vertex positions in model space
    pub positions: Vec<Vec3>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Bone per vertex; empty for static meshes
    pub bone_indices: Vec<u16>,
}

impl MeshGeometry {
    /// Static geometry
    pub const fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            bone_indices: Vec::new(),
        }
    }

    /// Attach a bone index to every vertex
    #[must_use]
    pub fn with_bones(mut self, bone_indices: Vec<u16>) -> Self {
        self.bone_indices = bone_indices;
        self
    }

    /// Whether vertices follow the pose
    pub fn is_skinned(&self) -> bool {
        !self.bone_indices.is_empty()
    }
}

/// One drawable part of a model
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Mesh name as authored
    pub name: String,
    /// Material reference; the owning model holds one reference per mesh
    pub material: Handle<Material>,
    /// Render layers this mesh draws into
    pub layer_mask: u64,
    /// Shared CPU geometry
    pub geometry: Arc<MeshGeometry>,
}

impl Mesh {
    /// Create a mesh
    pub fn new(name: impl Into<String>, material: Handle<Material>, layer_mask: u64, geometry: Arc<MeshGeometry>) -> Self {
        Self {
            name: name.into(),
            material,
            layer_mask,
            geometry,
        }
    }
}

/// Skeleton joint
#[derive(Debug, Clone)]
pub struct Bone {
    /// Joint name
    pub name: String,
    /// Bind pose in model space
    pub transform: RigidTransform,
    /// Parent joint
    pub parent: Option<usize>,
}

/// Mesh range drawn up to a given distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodLevel {
    /// First mesh index (inclusive)
    pub from_mesh: usize,
    /// Last mesh index (inclusive)
    pub to_mesh: usize,
    /// Squared distance up to which this level is used
    pub squared_distance: f32,
}

/// Runtime skeleton state of one model instance
///
/// Bone transforms are absolute (model space).
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Bone positions
    pub positions: Vec<Vec3>,
    /// Bone rotations
    pub rotations: Vec<Quat>,
}

impl Pose {
    /// Bind pose of a model
    pub fn from_model(model: &Model) -> Self {
        Self {
            positions: model.bones.iter().map(|b| b.transform.position).collect(),
            rotations: model.bones.iter().map(|b| b.transform.rotation).collect(),
        }
    }

    /// Number of bones
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the pose has no bones
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Model-space transform of one bone
    pub fn bone(&self, index: usize) -> Option<RigidTransform> {
        Some(RigidTransform::new(*self.positions.get(index)?, *self.rotations.get(index)?))
    }
}

/// Closest triangle hit on a model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelHit {
    /// Ray parameter
    pub t: f32,
    /// Mesh that was hit
    pub mesh_index: usize,
}

/// Loaded model data
#[derive(Debug, Clone)]
pub struct Model {
    meshes: Vec<Mesh>,
    bones: Vec<Bone>,
    bounding_radius: f32,
    lods: Vec<LodLevel>,
}

impl Model {
    /// Build a model; the bounding radius is taken from the geometry
    pub fn new(meshes: Vec<Mesh>, bones: Vec<Bone>) -> Self {
        let bounding_radius = meshes
            .iter()
            .flat_map(|mesh| mesh.geometry.positions.iter())
            .map(|p| p.norm())
            .fold(0.0_f32, f32::max);
        let last = meshes.len().saturating_sub(1);
        Self {
            meshes,
            bones,
            bounding_radius,
            lods: vec![LodLevel {
                from_mesh: 0,
                to_mesh: last,
                squared_distance: f32::MAX,
            }],
        }
    }

    /// Replace the LOD table; distances are plain (not squared) and must increase
    #[must_use]
    pub fn with_lods(mut self, lods: &[(usize, usize, f32)]) -> Self {
        debug_assert!(lods.len() <= MAX_LOD_COUNT);
        self.lods = lods
            .iter()
            .map(|&(from_mesh, to_mesh, distance)| LodLevel {
                from_mesh,
                to_mesh,
                squared_distance: distance * distance,
            })
            .collect();
        self
    }

    /// Override the computed bounding radius
    #[must_use]
    pub const fn with_bounding_radius(mut self, radius: f32) -> Self {
        self.bounding_radius = radius;
        self
    }

    /// Authored meshes
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Mesh by index
    pub fn mesh(&self, index: usize) -> &Mesh {
        &self.meshes[index]
    }

    /// Number of meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Skeleton
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Number of bones
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Bone index by name
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Radius of the bounding sphere around the model origin
    pub const fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// LOD levels
    pub fn lods(&self) -> &[LodLevel] {
        &self.lods
    }

    /// Inclusive mesh range for a squared view distance
    ///
    /// Picks the first level whose distance is beyond `squared_distance`,
    /// falling back to the last level.
    pub fn lod_mesh_indices(&self, squared_distance: f32) -> Option<(usize, usize)> {
        if self.meshes.is_empty() {
            return None;
        }
        let lod = self
            .lods
            .iter()
            .find(|lod| squared_distance < lod.squared_distance)
            .or_else(|| self.lods.last())?;
        Some((lod.from_mesh, lod.to_mesh.min(self.meshes.len() - 1)))
    }

    fn skinned_position(&self, geometry: &MeshGeometry, vertex: usize, pose: Option<&Pose>) -> Vec3 {
        let position = geometry.positions[vertex];
        let Some(pose) = pose else {
            return position;
        };
        let Some(&bone) = geometry.bone_indices.get(vertex) else {
            return position;
        };
        let bone = usize::from(bone);
        match (pose.bone(bone), self.bones.get(bone)) {
            (Some(current), Some(bind)) => current
                .combine(&bind.transform.inverse())
                .transform_point(&position),
            _ => position,
        }
    }

    /// Closest triangle hit in model space
    pub fn cast_ray(&self, origin: &Vec3, dir: &Vec3, pose: Option<&Pose>) -> Option<ModelHit> {
        let mut best: Option<ModelHit> = None;
        for (mesh_index, mesh) in self.meshes.iter().enumerate() {
            let geometry = mesh.geometry.as_ref();
            let skinned = geometry.is_skinned() && pose.is_some();
            for triangle in geometry.indices.chunks_exact(3) {
                let vertex = |i: usize| {
                    let index = triangle[i] as usize;
                    if skinned {
                        self.skinned_position(geometry, index, pose)
                    } else {
                        geometry.positions[index]
                    }
                };
                if let Some(t) = ray_triangle_intersection(*origin, *dir, vertex(0), vertex(1), vertex(2)) {
                    if best.map_or(true, |hit| t < hit.t) {
                        best = Some(ModelHit { t, mesh_index });
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    //! Geometry helpers shared by tests across the crate

    use super::*;

    /// Axis-aligned unit cube centered on the origin
    pub fn cube_geometry() -> Arc<MeshGeometry> {
        let positions = vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        let indices = vec![
            0, 1, 2, 0, 2, 3, // back
            4, 6, 5, 4, 7, 6, // front
            0, 4, 5, 0, 5, 1, // bottom
            3, 2, 6, 3, 6, 7, // top
            0, 3, 7, 0, 7, 4, // left
            1, 5, 6, 1, 6, 2, // right
        ];
        Arc::new(MeshGeometry::new(positions, indices))
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::cube_geometry;
    use super::*;
    use crate::assets::resource_manager::ResourceManager;

    fn two_mesh_model(resources: &mut ResourceManager) -> Model {
        let material = resources.load("materials/a.mat");
        let material_b = resources.load("materials/b.mat");
        Model::new(
            vec![
                Mesh::new("high", material, 1, cube_geometry()),
                Mesh::new("low", material_b, 1, cube_geometry()),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_lod_selection() {
        let mut resources = ResourceManager::default();
        let model = two_mesh_model(&mut resources).with_lods(&[(0, 0, 10.0), (1, 1, f32::MAX.sqrt())]);
        assert_eq!(model.lod_mesh_indices(25.0), Some((0, 0)));
        assert_eq!(model.lod_mesh_indices(200.0), Some((1, 1)));
        assert_eq!(model.lod_mesh_indices(f32::MAX), Some((1, 1)));
    }

    #[test]
    fn test_default_lod_covers_all_meshes() {
        let mut resources = ResourceManager::default();
        let model = two_mesh_model(&mut resources);
        assert_eq!(model.lod_mesh_indices(1.0e9), Some((0, 1)));
        assert!((model.bounding_radius() - 0.75_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_cast_ray_hits_closest_face() {
        let mut resources = ResourceManager::default();
        let model = two_mesh_model(&mut resources);
        let hit = model
            .cast_ray(&Vec3::new(0.0, 0.0, 5.0), &Vec3::new(0.0, 0.0, -1.0), None)
            .map(|hit| hit.t);
        assert!((hit.unwrap_or(0.0) - 4.5).abs() < 1e-5);
        assert!(model
            .cast_ray(&Vec3::new(3.0, 0.0, 5.0), &Vec3::new(0.0, 0.0, -1.0), None)
            .is_none());
    }

    #[test]
    fn test_skinned_ray_follows_pose() {
        let mut resources = ResourceManager::default();
        let material = resources.load("materials/a.mat");
        let geometry = MeshGeometry::new(cube_geometry().positions.clone(), cube_geometry().indices.clone())
            .with_bones(vec![0; 8]);
        let model = Model::new(
            vec![Mesh::new("skin", material, 1, Arc::new(geometry))],
            vec![Bone {
                name: "root".into(),
                transform: RigidTransform::default(),
                parent: None,
            }],
        );
        let mut pose = Pose::from_model(&model);
        pose.positions[0] = Vec3::new(10.0, 0.0, 0.0);

        let origin = Vec3::new(10.0, 0.0, 5.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);
        assert!(model.cast_ray(&origin, &dir, None).is_none());
        assert!(model.cast_ray(&origin, &dir, Some(&pose)).is_some());
        assert_eq!(model.bone_index("root"), Some(0));
    }
}
